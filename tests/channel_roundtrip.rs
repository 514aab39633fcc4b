// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only

//! End-to-end tests: embedder output relayed through wire quantization into
//! an extractor.

use std::sync::Arc;
use std::thread;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use rotsteg_core::{
    ByteQueue, ChannelConfig, Disposition, Embedder, EntityRotation, Extractor,
    ManualClock, MemorySink, PacketClass, PlayerRotation, QueueService, ReservedKeySet,
    TRANSMISSION_ERROR_BYTE,
};

const SENDER: &str = "alice";
const RECEIVER: &str = "bob";

const DEFAULT_KEYS: [i32; 22] = [
    -126, -100, -85, -72, -63, -51, -44, -30, -22, -11, -6, 5, 16, 26, 32, 48, 55, 62, 87, 99,
    112, 126,
];

/// Embedder on one side, extractor on the other, both on a shared clock.
struct Link {
    embedder: Embedder<ManualClock>,
    extractor: Extractor<ManualClock>,
    outbox: Arc<ByteQueue>,
    inbox: Arc<ByteQueue>,
    sent: usize,
}

impl Link {
    fn new(keys: &[i32], payload: &str) -> Self {
        Self::with_repeat_count(keys, payload, 1)
    }

    fn with_repeat_count(keys: &[i32], payload: &str, repeat_count: u32) -> Self {
        let clock = ManualClock::new(0);
        let keys = ReservedKeySet::new(keys).unwrap();
        let outbox = Arc::new(ByteQueue::from_text(payload));
        let inbox = Arc::new(ByteQueue::new());
        let embedder = Embedder::with_clock(
            ChannelConfig::embedder(RECEIVER, keys.clone())
                .with_init_delay_ms(0)
                .with_repeat_count(repeat_count),
            Arc::clone(&outbox),
            clock.clone(),
        )
        .unwrap()
        .with_seed(7);
        let extractor = Extractor::with_clock(
            ChannelConfig::extractor(SENDER, keys)
                .with_init_delay_ms(0)
                .with_repeat_count(repeat_count),
            Arc::clone(&inbox),
            clock,
        )
        .unwrap();
        Self { embedder, extractor, outbox, inbox, sent: 0 }
    }

    /// Natural motion: slow drift up in pitch, slow turn in yaw.
    fn natural(&self) -> PlayerRotation {
        let i = self.sent as f32;
        PlayerRotation::look(10.0 + 0.3 * i, 30.0 + 0.5 * i)
    }

    /// Embed one packet and return what the server would relay.
    fn embed(&mut self) -> EntityRotation {
        let mut packet = self.natural();
        self.sent += 1;
        let d = self.embedder.process(&mut packet, &|n: &str| n == RECEIVER).unwrap();
        assert!(matches!(d, Disposition::Processed(_)), "{d:?}");
        EntityRotation::relayed(SENDER, packet.angles.unwrap())
    }

    fn deliver(&mut self, relayed: &EntityRotation) {
        self.extractor.process(relayed, &|n: &str| n == SENDER);
    }

    fn step(&mut self) {
        let relayed = self.embed();
        self.deliver(&relayed);
    }

    fn run_until(&mut self, bytes: usize, limit: usize) {
        for _ in 0..limit {
            if self.inbox.size() >= bytes {
                return;
            }
            self.step();
        }
        panic!("only {} bytes after {limit} packets", self.inbox.size());
    }
}

#[test]
fn transmits_hi() {
    let mut link = Link::new(&[-100, -60, 100, 120], "HI");
    link.run_until(2, 200);
    assert_eq!(link.inbox.to_bytes(), vec![0x48, 0x49]);
    assert_eq!(link.inbox.read_all_as_text(), "HI");
    assert!(link.outbox.is_empty());
}

#[test]
fn transmits_with_single_sends() {
    let mut link = Link::with_repeat_count(&[-100, -60, 100, 120], "HI", 0);
    link.run_until(2, 100);
    assert_eq!(link.inbox.to_bytes(), vec![0x48, 0x49]);
}

#[test]
fn control_plane_appends_mid_session() {
    let mut link = Link::new(&[-100, -60, 100, 120], "");
    // let the channel sync up and idle on filler bytes first
    for _ in 0..8 {
        link.step();
    }
    assert!(link.inbox.is_empty());
    assert_eq!(link.embedder.pending_byte(), None);
    link.outbox.append_text("ok");
    link.run_until(2, 200);
    assert_eq!(link.inbox.read_all_as_bytes(), b"ok".to_vec());
}

#[test]
fn disconnect_resends_interrupted_byte() {
    let mut link = Link::new(&[-100, -60, 100, 120], "HI");
    // 5 initial sync + 3 sync + 4 data packets: half of 'H' is out
    for _ in 0..12 {
        link.step();
    }
    assert_eq!(link.embedder.bit_position(), 4);
    assert_eq!(link.extractor.bit_position(), 4);

    let mut p = link.natural();
    let gone = |_: &str| false;
    assert_eq!(link.embedder.process(&mut p, &gone).unwrap(), Disposition::PeerNotVisible);
    let relayed = EntityRotation::relayed(SENDER, p.angles.unwrap());
    assert_eq!(link.extractor.process(&relayed, &gone), Disposition::PeerNotVisible);
    assert_eq!(link.embedder.bit_position(), 0);
    assert_eq!(link.extractor.bit_position(), 0);

    link.run_until(2, 200);
    assert_eq!(link.inbox.to_bytes(), vec![0x48, 0x49]);
}

#[test]
fn lost_packets_surface_as_error_byte() {
    let mut link = Link::new(&[-100, -60, 100, 120], "HI");
    // 8 sync packets (8..16 is 'H' as four values sent twice each),
    // 3 sync packets, then 'I' in 19..27
    for i in 0..27 {
        let relayed = link.embed();
        // lose the last three values of 'H'
        if !(10..16).contains(&i) {
            link.deliver(&relayed);
        }
    }
    assert_eq!(link.inbox.to_bytes(), vec![TRANSMISSION_ERROR_BYTE, 0x49]);
}

#[test]
fn sync_signals_only_interrupted_bytes() {
    let keys = ReservedKeySet::new(&[-100, -60, 100, 120]).unwrap();
    let inbox = Arc::new(ByteQueue::new());
    let mut x = Extractor::with_clock(
        ChannelConfig::extractor(SENDER, keys).with_init_delay_ms(0),
        Arc::clone(&inbox),
        ManualClock::new(0),
    )
    .unwrap();
    let peers = |n: &str| n == SENDER;
    for (p, y) in [(-60, 10), (3, 100), (12, 120)] {
        x.process(&EntityRotation::look(SENDER, p, y), &peers);
    }
    assert!(inbox.is_empty());

    x.process(&EntityRotation::look(SENDER, 1, 1), &peers);
    x.process(&EntityRotation::look(SENDER, 3, 3), &peers);
    x.process(&EntityRotation::look(SENDER, 120, 0), &peers);
    assert_eq!(inbox.to_bytes(), vec![TRANSMISSION_ERROR_BYTE]);
    assert_eq!(x.bit_position(), 0);
    assert_eq!(x.current_byte(), 0);
}

#[test]
fn data_never_uses_reserved_values() {
    let keys = ReservedKeySet::new(&DEFAULT_KEYS).unwrap();
    let sink = MemorySink::new();
    let mut e = Embedder::with_clock(
        ChannelConfig::embedder(RECEIVER, keys.clone()).with_init_delay_ms(0),
        Arc::new(ByteQueue::from_text("The quick brown fox jumps over the lazy dog")),
        ManualClock::new(0),
    )
    .unwrap()
    .with_seed(42)
    .with_sink(sink.clone());

    let mut rng = ChaCha20Rng::seed_from_u64(3);
    let (mut pitch, mut yaw) = (0.0f32, 0.0f32);
    for _ in 0..2000 {
        pitch = (pitch + rng.gen_range(-6.0..6.0)).clamp(-90.0, 90.0);
        yaw += rng.gen_range(-9.0..9.0);
        let mut p = PlayerRotation::move_and_look(pitch, yaw);
        e.process(&mut p, &|n: &str| n == RECEIVER).unwrap();
        let a = p.angles.unwrap();
        assert!((-90.0..=90.0).contains(&a.pitch), "{a:?}");
        // never more than half a turn plus a few buckets away
        assert!((a.yaw - yaw).abs() < 190.0, "{a:?} from {yaw}");
    }

    let records = sink.embed_records();
    let data: Vec<_> = records.iter().filter(|r| r.class == PacketClass::Data).collect();
    assert!(data.len() > 1000);
    for r in data {
        let (p, y) = r.modified_wire;
        assert!(!keys.contains(p) && !keys.contains(y), "{r:?}");
        assert!((-64..=64).contains(&p), "{r:?}");
    }
    for r in records.iter().filter(|r| r.class != PacketClass::Data) {
        let (p, y) = r.modified_wire;
        assert!(keys.contains(p) || keys.contains(y), "{r:?}");
    }
}

#[test]
fn queue_is_fifo_across_threads() {
    let q = Arc::new(ByteQueue::new());
    let producer = {
        let q = Arc::clone(&q);
        thread::spawn(move || {
            for b in 1..=250u8 {
                q.push(b);
                if b % 50 == 0 {
                    thread::yield_now();
                }
            }
        })
    };

    let mut got = Vec::new();
    while got.len() < 250 {
        match q.get() {
            0 => thread::yield_now(),
            b => got.push(b),
        }
    }
    producer.join().unwrap();

    assert_eq!(got, (1..=250).collect::<Vec<u8>>());
    assert_eq!(q.get(), 0);
    assert_eq!(q.count(), 0);
}
