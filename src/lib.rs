// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only

//! # rotsteg-core
//!
//! Covert byte channel hidden in the rotation fields of a lossy real-time
//! movement protocol. Two cooperating roles share one direction of a session
//! they do not control:
//!
//! - **Embedder**: rewrites pitch/yaw of outgoing rotation updates so the
//!   parity of each 8-bit wire value carries a payload bit. Values stay
//!   within one quantization step of the natural motion.
//! - **Extractor**: reads the peer's relayed wire values and reassembles
//!   the byte stream, signalling interrupted bytes with `0xFF`.
//!
//! The host supplies packets through small traits ([`OutgoingPacket`],
//! [`IncomingPacket`], [`PeerView`]), a [`ChannelConfig`], and optionally a
//! [`TelemetrySink`]. Payload flows through a shared [`ByteQueue`].
//!
//! # Quick start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use rotsteg_core::{ByteQueue, ChannelConfig, Embedder, PlayerRotation, ReservedKeySet};
//!
//! let keys: ReservedKeySet = "-126,-100,5,16,99".parse().unwrap();
//! let outbox = Arc::new(ByteQueue::from_text("HI"));
//! let mut embedder = Embedder::new(ChannelConfig::embedder("bob", keys), outbox).unwrap();
//!
//! let mut packet = PlayerRotation::look(12.5, 187.0);
//! embedder.process(&mut packet, &|name: &str| name == "bob").unwrap();
//! ```

pub mod stego;

pub use stego::clock::{Clock, ManualClock, SystemClock};
pub use stego::codec::{
    convert_wire_angle, nearest_turn, parity, randomize_angle, to_angle, to_wire, wire_index,
    Channel, WireValue,
};
pub use stego::config::{ChannelConfig, Role};
pub use stego::embed::Embedder;
pub use stego::extract::Extractor;
pub use stego::keys::ReservedKeySet;
pub use stego::packet::{
    Angles, Disposition, EntityRotation, IncomingPacket, OutgoingPacket, PacketKind, PeerView,
    PlayerRotation,
};
pub use stego::queue::{ByteQueue, QueueService};
pub use stego::telemetry::{
    EmbedRecord, ExtractRecord, MemorySink, NullSink, PacketClass, TelemetrySink,
};
pub use stego::trend::TrendEstimator;
pub use stego::{ConfigError, StegoError, TRANSMISSION_ERROR_BYTE};
