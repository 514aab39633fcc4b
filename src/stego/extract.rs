// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only

//! Extractor: recovers payload bytes from the peer's rotation updates.
//!
//! A wire value from the reserved key set on either channel marks a byte
//! boundary. Between markers, every change of the observed wire pair yields
//! two bits (pitch parity, yaw parity); unchanged pairs are resends. A marker
//! that interrupts a partial byte pushes [`TRANSMISSION_ERROR_BYTE`] instead
//! of the lost byte. Nothing here ever fails: framing faults are repaired
//! locally.

use std::sync::Arc;

use log::{debug, info, trace, warn};

use crate::stego::clock::{Clock, InitGate, SystemClock};
use crate::stego::codec::{self, WireValue};
use crate::stego::config::{ChannelConfig, Role};
use crate::stego::error::StegoError;
use crate::stego::packet::{Disposition, IncomingPacket, PeerView};
use crate::stego::queue::ByteQueue;
use crate::stego::telemetry::{ExtractRecord, NullSink, PacketClass, TelemetrySink};
use crate::stego::{
    byte_to_bits, with_bit, BITRATE_WINDOW_MS, BITS_PER_PACKET, TRANSMISSION_ERROR_BYTE,
};

/// Rolling bits-per-second estimate over [`BITRATE_WINDOW_MS`].
#[derive(Debug, Clone, Default)]
struct BitrateMeter {
    prev_ms: Option<u64>,
    bits: u32,
    elapsed_ms: u64,
    rate: f32,
}

impl BitrateMeter {
    /// Account for `bits` new bits at `now_ms`. Returns the fresh estimate
    /// when a window closes.
    fn record(&mut self, now_ms: u64, bits: u32) -> Option<f32> {
        let prev = *self.prev_ms.get_or_insert(now_ms);
        self.bits += bits;
        self.elapsed_ms += now_ms.saturating_sub(prev);
        self.prev_ms = Some(now_ms);

        if self.elapsed_ms < BITRATE_WINDOW_MS {
            return None;
        }
        self.rate = self.bits as f32 / self.elapsed_ms as f32 * 1000.0;
        self.bits = 0;
        self.elapsed_ms = 0;
        Some(self.rate)
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Framing {
    byte: u8,
    bit_pos: u8,
    last: (WireValue, WireValue),
}

/// Extracting side of the channel.
pub struct Extractor<C: Clock = SystemClock> {
    config: ChannelConfig,
    queue: Arc<ByteQueue>,
    clock: C,
    sink: Box<dyn TelemetrySink + Send>,
    gate: InitGate,
    framing: Framing,
    meter: BitrateMeter,
}

impl Extractor<SystemClock> {
    pub fn new(config: ChannelConfig, queue: Arc<ByteQueue>) -> Result<Self, StegoError> {
        Self::with_clock(config, queue, SystemClock::new())
    }
}

impl<C: Clock> Extractor<C> {
    /// # Errors
    /// [`StegoError::InvalidConfig`] if `config` fails validation or is not
    /// an extractor config.
    pub fn with_clock(config: ChannelConfig, queue: Arc<ByteQueue>, clock: C) -> Result<Self, StegoError> {
        config.validate_for(Role::Extractor)?;
        Ok(Self {
            gate: InitGate::new(config.init_delay_ms),
            config,
            queue,
            clock,
            sink: Box::new(NullSink),
            framing: Framing::default(),
            meter: BitrateMeter::default(),
        })
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

    pub fn bit_position(&self) -> u8 {
        self.framing.bit_pos
    }

    /// Partially assembled byte.
    pub fn current_byte(&self) -> u8 {
        self.framing.byte
    }

    /// Last completed bitrate estimate in bits per second (0 until the first
    /// window closes).
    pub fn bitrate(&self) -> f32 {
        self.meter.rate
    }

    pub fn is_initialized(&self) -> bool {
        self.gate.is_ready()
    }

    /// Drop all per-session state. Idempotent.
    pub fn reset(&mut self) {
        self.framing = Framing::default();
        self.meter = BitrateMeter::default();
        self.gate.reset();
    }

    /// Decode one incoming packet.
    pub fn process<P: IncomingPacket + ?Sized>(&mut self, packet: &P, peers: &dyn PeerView) -> Disposition {
        if !self.config.enabled {
            return Disposition::Disabled;
        }

        if !peers.is_visible(&self.config.peer) {
            if self.gate.is_ready() {
                debug!("peer {} left, resetting extractor", self.config.peer);
            }
            self.reset();
            return Disposition::PeerNotVisible;
        }

        let now = self.clock.now_ms();
        let was_ready = self.gate.is_ready();
        if !self.gate.poll(now) {
            return Disposition::Warmup;
        }
        if !was_ready {
            info!("extractor ready, listening to {}", self.config.peer);
        }

        if !packet.kind().is_extractable() || packet.source() != Some(self.config.peer.as_str()) {
            return Disposition::Ineligible;
        }
        let Some((pitch, yaw)) = packet.wire_angles() else {
            return Disposition::Ineligible;
        };

        let keys = &self.config.reserved_keys;
        let (mut bit_pitch, mut bit_yaw) = (0, 0);
        let class = if keys.contains(pitch) || keys.contains(yaw) {
            if self.framing.bit_pos != 0 {
                warn!(
                    "sync at bit {} interrupted byte {}, signalling error",
                    self.framing.bit_pos,
                    byte_to_bits(self.framing.byte)
                );
                self.queue.push(TRANSMISSION_ERROR_BYTE);
            }
            self.framing.byte = 0;
            self.framing.bit_pos = 0;
            self.framing.last = (pitch, yaw);
            trace!("sync marker ({pitch}, {yaw})");
            if self.queue.is_empty() {
                PacketClass::SyncInitial
            } else {
                PacketClass::Sync
            }
        } else if (pitch, yaw) != self.framing.last {
            bit_pitch = codec::parity(i32::from(pitch));
            bit_yaw = codec::parity(i32::from(yaw));
            let pos = self.framing.bit_pos;
            self.framing.byte = with_bit(self.framing.byte, pos, bit_pitch);
            self.framing.byte = with_bit(self.framing.byte, pos + 1, bit_yaw);
            self.framing.bit_pos += BITS_PER_PACKET;
            self.framing.last = (pitch, yaw);
            if let Some(rate) = self.meter.record(now, u32::from(BITS_PER_PACKET)) {
                info!("bitrate from {}: {rate:.2} bit/s", self.config.peer);
            }
            PacketClass::DataBit
        } else {
            PacketClass::Data
        };

        self.sink.on_extract(&ExtractRecord {
            at_ms: now,
            class,
            wire: (pitch, yaw),
            bit_pitch,
            bit_yaw,
            bit_position: self.framing.bit_pos,
            byte: self.framing.byte,
            bitrate: self.meter.rate,
        });

        if self.framing.bit_pos > 7 {
            let b = self.framing.byte;
            debug!("received byte {b:#04x} ({})", byte_to_bits(b));
            self.queue.push(b);
            self.framing.byte = 0;
            self.framing.bit_pos = 0;
        }

        Disposition::Processed(class)
    }
}
