// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only

//! Embedder: rewrites outgoing rotations to carry payload bits.
//!
//! Every eligible packet is one of three things:
//!
//! 1. **Initial sync** (`|keys| + 1` packets after warm-up): one channel is
//!    moved onto the nearest reserved value so the extractor can lock on.
//! 2. **Sync burst** (3 packets every `sync_interval`): same marker, marks a
//!    byte boundary and resets the bit position.
//! 3. **Data**: pitch parity carries bit `n`, yaw parity bit `n + 1`. Each
//!    value is sent `repeat_count + 1` times with fresh jitter, then the next
//!    bit pair follows. Consecutive values always differ from the previous
//!    data value on the same channel, so the extractor can spot new bits.
//!
//! Synthetic values stay as close as possible to the natural rotation and
//! move in the direction of its recent trend.

use std::sync::Arc;

use log::{debug, info, trace};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

use crate::stego::clock::{Clock, InitGate, SystemClock};
use crate::stego::codec::{self, Channel, WireValue, PITCH_WIRE_LIMIT};
use crate::stego::config::{ChannelConfig, Role};
use crate::stego::error::StegoError;
use crate::stego::packet::{Angles, Disposition, OutgoingPacket, PeerView};
use crate::stego::queue::ByteQueue;
use crate::stego::telemetry::{EmbedRecord, NullSink, PacketClass, TelemetrySink};
use crate::stego::trend::TrendEstimator;
use crate::stego::{bit_at, byte_to_bits, BITS_PER_PACKET, SYNC_BURST};

/// Framing state. Copied, advanced, and only written back once the packet
/// has accepted its new angles.
#[derive(Debug, Clone, Copy)]
struct Framing {
    bit_pos: u8,
    /// Sends of the current data value so far.
    send_counter: u32,
    sync_countdown: u32,
    /// Initial sync packets sent since the last reset.
    garbage_sent: usize,
    /// Byte being transmitted; survives resets so it is resent from bit 0.
    pending: Option<u8>,
    /// Angles most recently written.
    on_wire: Angles,
    /// Angles of the most recent data packet.
    last_data: Angles,
}

impl Framing {
    fn new(sync_interval: u32) -> Self {
        Self {
            bit_pos: 0,
            send_counter: 0,
            sync_countdown: sync_interval,
            garbage_sent: 0,
            pending: None,
            on_wire: Angles::default(),
            last_data: Angles::default(),
        }
    }
}

/// Outcome of planning one packet.
struct Step {
    class: PacketClass,
    sync_channel: Option<Channel>,
    angles: Angles,
}

/// Embedding side of the channel.
pub struct Embedder<C: Clock = SystemClock> {
    config: ChannelConfig,
    queue: Arc<ByteQueue>,
    clock: C,
    sink: Box<dyn TelemetrySink + Send>,
    rng: ChaCha20Rng,
    trend: TrendEstimator,
    gate: InitGate,
    framing: Framing,
}

impl Embedder<SystemClock> {
    /// Embedder on wall-clock time, jitter seeded from OS entropy.
    pub fn new(config: ChannelConfig, queue: Arc<ByteQueue>) -> Result<Self, StegoError> {
        Self::with_clock(config, queue, SystemClock::new())
    }
}

impl<C: Clock> Embedder<C> {
    /// Embedder on an arbitrary clock.
    ///
    /// # Errors
    /// [`StegoError::InvalidConfig`] if `config` fails validation or is not
    /// an embedder config.
    pub fn with_clock(config: ChannelConfig, queue: Arc<ByteQueue>, clock: C) -> Result<Self, StegoError> {
        config.validate_for(Role::Embedder)?;
        Ok(Self {
            trend: TrendEstimator::new(config.history_len),
            gate: InitGate::new(config.init_delay_ms),
            framing: Framing::new(config.sync_interval),
            config,
            queue,
            clock,
            sink: Box::new(NullSink),
            rng: ChaCha20Rng::from_entropy(),
        })
    }

    /// Replace the jitter generator with a deterministic one.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = ChaCha20Rng::seed_from_u64(seed);
        self
    }

    pub fn with_sink<S: TelemetrySink + Send + 'static>(mut self, sink: S) -> Self {
        self.sink = Box::new(sink);
        self
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    pub fn queue(&self) -> &Arc<ByteQueue> {
        &self.queue
    }

    /// Bit index (0, 2, 4, 6) of the next data value within the byte.
    pub fn bit_position(&self) -> u8 {
        self.framing.bit_pos
    }

    /// Has the warm-up delay elapsed?
    pub fn is_initialized(&self) -> bool {
        self.gate.is_ready()
    }

    /// Byte currently being transmitted, if one has been pulled.
    pub fn pending_byte(&self) -> Option<u8> {
        self.framing.pending
    }

    pub fn sync_countdown(&self) -> u32 {
        self.framing.sync_countdown
    }

    /// Return to the pre-session state. Idempotent.
    ///
    /// The byte in flight is kept and restarts from bit 0 in the next
    /// session, so a disconnect never drops payload.
    pub fn reset(&mut self) {
        let pending = self.framing.pending;
        self.framing = Framing::new(self.config.sync_interval);
        self.framing.pending = pending;
        self.gate.reset();
    }

    /// Handle one outgoing packet, rewriting its rotation in place.
    ///
    /// # Errors
    /// [`StegoError::AnglesUnavailable`] / [`StegoError::AnglesUnwritable`]
    /// when an eligible packet's rotation cannot be read or written. The
    /// host must treat this as fatal; no framing state is advanced for the
    /// failed packet.
    pub fn process<P: OutgoingPacket + ?Sized>(
        &mut self,
        packet: &mut P,
        peers: &dyn PeerView,
    ) -> Result<Disposition, StegoError> {
        if !self.config.enabled {
            return Ok(Disposition::Disabled);
        }

        if !peers.is_visible(&self.config.peer) {
            if self.gate.is_ready() {
                debug!("peer {} left, resetting embedder", self.config.peer);
            }
            self.reset();
            return Ok(Disposition::PeerNotVisible);
        }

        let now = self.clock.now_ms();
        let was_ready = self.gate.is_ready();
        let ready = self.gate.poll(now);

        if !packet.kind().is_embeddable() {
            return Ok(Disposition::Ineligible);
        }

        let original = packet.angles().ok_or(StegoError::AnglesUnavailable)?;
        self.trend.observe(original);

        if !ready {
            return Ok(Disposition::Warmup);
        }
        if !was_ready {
            info!(
                "embedder ready for {}, queued payload: {}",
                self.config.peer,
                self.queue.to_bit_string()
            );
        }

        let mut next = self.framing;
        let step = self.plan(&mut next, original);

        if let Err(e) = packet.set_angles(step.angles) {
            // Keep a freshly pulled byte; everything else is retried.
            self.framing.pending = next.pending;
            return Err(e);
        }

        let (bit_pitch, bit_yaw) = next
            .pending
            .map_or((0, 0), |b| (bit_at(b, next.bit_pos), bit_at(b, next.bit_pos + 1)));
        self.sink.on_embed(&EmbedRecord {
            at_ms: now,
            class: step.class,
            sync_channel: step.sync_channel,
            original,
            modified: step.angles,
            original_wire: original.to_wire(),
            modified_wire: step.angles.to_wire(),
            bit_pitch,
            bit_yaw,
            send_counter: next.send_counter,
            bit_position: next.bit_pos,
            byte: next.pending,
        });

        if next.send_counter > self.config.repeat_count {
            next.send_counter = 0;
            next.bit_pos += BITS_PER_PACKET;
        }
        if next.bit_pos > 7 {
            if let Some(b) = next.pending {
                debug!("sent byte {b:#04x} ({})", byte_to_bits(b));
            }
            next.bit_pos = 0;
            next.pending = None;
        }

        self.framing = next;
        Ok(Disposition::Processed(step.class))
    }

    /// Decide what `original` becomes and advance `next` accordingly.
    fn plan(&mut self, next: &mut Framing, original: Angles) -> Step {
        if next.send_counter == 0 && next.sync_countdown <= SYNC_BURST {
            next.bit_pos = 0;
            next.sync_countdown = match next.sync_countdown {
                0 => self.config.sync_interval,
                n => n - 1,
            };
            let (angles, channel) = self.sync_marker(original);
            next.on_wire = angles;
            trace!("sync packet {:?} on {channel:?}", angles.to_wire());
            return Step { class: PacketClass::Sync, sync_channel: Some(channel), angles };
        }

        if next.garbage_sent <= self.config.reserved_keys.len() {
            if next.garbage_sent == self.config.reserved_keys.len() {
                // hand over to a regular burst right after the initial run
                next.sync_countdown = SYNC_BURST;
            }
            next.garbage_sent += 1;
            let (angles, channel) = self.sync_marker(original);
            next.on_wire = angles;
            trace!("initial sync packet {:?} on {channel:?}", angles.to_wire());
            return Step { class: PacketClass::SyncInitial, sync_channel: Some(channel), angles };
        }

        let angles = if next.send_counter == 0 {
            let byte = match next.pending {
                Some(b) => b,
                None => {
                    let b = self.queue.get();
                    debug!("sending byte {b:#04x} ({})", byte_to_bits(b));
                    next.pending = Some(b);
                    b
                }
            };
            Angles {
                pitch: self.data_pitch(bit_at(byte, next.bit_pos), original.pitch, next.last_data.pitch),
                yaw: self.data_yaw(bit_at(byte, next.bit_pos + 1), original.yaw, next.last_data.yaw),
            }
        } else {
            Angles {
                pitch: codec::randomize_angle(next.on_wire.pitch, Channel::Pitch, &mut self.rng),
                yaw: codec::randomize_angle(next.on_wire.yaw, Channel::Yaw, &mut self.rng),
            }
        };

        next.on_wire = angles;
        next.last_data = angles;
        next.send_counter += 1;
        next.sync_countdown = next.sync_countdown.saturating_sub(1);
        trace!(
            "data packet {:?} pos={} repeat={}",
            angles.to_wire(),
            next.bit_pos,
            next.send_counter
        );
        Step { class: PacketClass::Data, sync_channel: None, angles }
    }

    /// Move one channel onto its nearest reserved value.
    ///
    /// Whichever channel needs the smaller jump carries the marker; the
    /// other keeps its natural value unless that is itself reserved.
    fn sync_marker(&mut self, original: Angles) -> (Angles, Channel) {
        let keys = &self.config.reserved_keys;

        let pitch_key = keys.nearest_within(
            codec::wire_index(original.pitch),
            self.trend.step(Channel::Pitch) > 0,
            -PITCH_WIRE_LIMIT,
            PITCH_WIRE_LIMIT,
        );
        let yaw_key = keys.nearest(
            i32::from(codec::to_wire(original.yaw)),
            self.trend.step(Channel::Yaw) > 0,
        );

        let yaw_marker = codec::convert_wire_angle(yaw_key, original.yaw, Channel::Yaw, &mut self.rng);
        let pitch_marker = pitch_key.map(|k| {
            codec::randomize_angle(codec::to_angle(i32::from(k)), Channel::Pitch, &mut self.rng)
        });

        match pitch_marker {
            Some(pitch) if (pitch - original.pitch).abs() <= (yaw_marker - original.yaw).abs() => {
                let yaw = self.off_key(Channel::Yaw, original.yaw);
                (Angles { pitch, yaw }, Channel::Pitch)
            }
            _ => {
                let pitch = self.off_key(Channel::Pitch, original.pitch);
                (Angles { pitch, yaw: yaw_marker }, Channel::Yaw)
            }
        }
    }

    /// `current` if its wire value is not reserved, otherwise a value one
    /// wire unit further along the trend.
    fn off_key(&mut self, channel: Channel, current: f32) -> f32 {
        let wire = codec::wire_index(current);
        if !self.config.reserved_keys.contains_index(wire) {
            return current;
        }
        let mut nudged = wire + self.trend.step(channel);
        if let Some((lo, hi)) = channel.wire_bounds() {
            nudged = nudged.clamp(lo, hi);
        }
        codec::randomize_angle(codec::to_angle(nudged), channel, &mut self.rng)
    }

    /// Pitch value near `current` whose parity is `bit`.
    ///
    /// Single pass: fix parity, step past the previous data value, step past
    /// a reserved value, then fold back into `[-64, 64]` keeping parity.
    fn data_pitch(&mut self, bit: u8, current: f32, last: f32) -> f32 {
        let keys = &self.config.reserved_keys;
        let step = self.trend.step(Channel::Pitch);
        let prev = codec::wire_index(last);

        let mut wire = codec::wire_index(current);
        if codec::parity(wire) != bit {
            wire += step;
        }
        if wire == prev {
            wire += 2 * step;
        }
        if keys.contains_index(wire) {
            wire += 2 * step;
        }

        let unclamped = wire;
        if wire > PITCH_WIRE_LIMIT {
            // going down by 2 would land on the previous value
            wire -= if prev - wire == -2 { 4 } else { 2 };
        } else if wire < -PITCH_WIRE_LIMIT {
            wire += if prev - wire == 2 { 4 } else { 2 };
        }
        while wire > PITCH_WIRE_LIMIT {
            wire -= 2;
        }
        while wire < -PITCH_WIRE_LIMIT {
            wire += 2;
        }
        if wire != unclamped && keys.contains_index(wire) {
            wire -= 2 * wire.signum();
        }

        codec::randomize_angle(codec::to_angle(wire), Channel::Pitch, &mut self.rng)
    }

    /// Yaw value near `current` whose parity is `bit`. Works on the
    /// unwrapped bucket so the avatar keeps its turn count.
    fn data_yaw(&mut self, bit: u8, current: f32, last: f32) -> f32 {
        let keys = &self.config.reserved_keys;
        let step = self.trend.step(Channel::Yaw);
        let prev: WireValue = codec::to_wire(last);

        let mut wire = codec::wire_index(current);
        if codec::parity(wire) != bit {
            wire += step;
        }
        if wire as WireValue == prev {
            wire += 2 * step;
        }
        if keys.contains_index(wire) {
            wire += 2 * step;
        }

        codec::randomize_angle(codec::to_angle(wire), Channel::Yaw, &mut self.rng)
    }
}
