// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only

//! Rotation-field covert channel.
//!
//! Two cooperating roles observe one direction of an existing session:
//!
//! - **Embedder** ([`embed::Embedder`]): rewrites the pitch/yaw fields of
//!   outgoing rotation updates so that the parity of each quantized wire
//!   value carries one payload bit (two bits per packet).
//! - **Extractor** ([`extract::Extractor`]): reads the wire values of the
//!   peer's incoming entity updates and reassembles the byte stream.
//!
//! Byte boundaries are re-established by *sync packets*, whose pitch or yaw
//! wire value is drawn from the shared [`keys::ReservedKeySet`]. Those values
//! never carry data, so the extractor can recognise them unconditionally.
//!
//! Both roles exchange payload through a [`queue::ByteQueue`] that outlives
//! individual sessions and is shared with an external control plane.

pub mod clock;
pub mod codec;
pub mod config;
pub mod embed;
pub mod error;
pub mod extract;
pub mod keys;
pub mod packet;
pub mod queue;
pub mod telemetry;
pub mod trend;

pub use error::{ConfigError, StegoError};

/// Default number of extra sends for each data value (each value goes out
/// `MIN_REPEAT_COUNT + 1` times).
pub const MIN_REPEAT_COUNT: u32 = 1;

/// Default number of data packets between two sync bursts. One byte takes
/// `(MIN_REPEAT_COUNT + 1) * 4` data packets; the remaining two countdown
/// steps plus the reset step form the three-packet sync burst.
pub const SYNC_INTERVAL: u32 = (MIN_REPEAT_COUNT + 1) * 4 + 2;

/// Countdown value at which a sync burst starts. The burst covers the
/// countdown values `SYNC_BURST..=0`.
pub const SYNC_BURST: u32 = 2;

/// Default trend history length per channel.
pub const HISTORY_LENGTH: usize = 5;

/// Default embedder warm-up before the first angle is rewritten.
pub const INIT_DELAY_EMBEDDER_MS: u64 = 2000;

/// Default extractor warm-up before the first packet is decoded.
pub const INIT_DELAY_EXTRACTOR_MS: u64 = 3000;

/// Rolling window for the extractor's bitrate estimate.
pub const BITRATE_WINDOW_MS: u64 = 5000;

/// Byte pushed by the extractor when a sync marker interrupts a byte.
pub const TRANSMISSION_ERROR_BYTE: u8 = 0xFF;

/// Bits carried by one data value pair (pitch + yaw).
pub const BITS_PER_PACKET: u8 = 2;

/// Number of distinct data values needed for one byte.
pub const VALUES_PER_BYTE: u32 = 8 / BITS_PER_PACKET as u32;

/// Read bit `pos` (0 = LSB) of `byte`.
pub fn bit_at(byte: u8, pos: u8) -> u8 {
    (byte >> pos) & 1
}

/// Return `byte` with bit `pos` (0 = LSB) set to `bit`.
pub fn with_bit(byte: u8, pos: u8, bit: u8) -> u8 {
    if bit == 0 {
        byte & !(1 << pos)
    } else {
        byte | (1 << pos)
    }
}

/// Render `byte` as eight binary digits, MSB first.
pub fn byte_to_bits(byte: u8) -> String {
    format!("{byte:08b}")
}
