// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only

//! Per-packet records for offline analysis.
//!
//! The host injects a [`TelemetrySink`]; the channel never opens files or
//! owns I/O handles. [`MemorySink`] keeps everything in memory.

use std::sync::{Arc, Mutex, PoisonError};

use crate::stego::codec::{Channel, WireValue};
use crate::stego::packet::Angles;

/// What a processed packet was used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketClass {
    /// Sync marker sent or seen before any payload.
    SyncInitial,
    /// Periodic sync marker.
    Sync,
    /// Data-bearing packet (extractor: an unchanged repeat).
    Data,
    /// Extractor only: a data packet that produced two new bits.
    DataBit,
}

/// Embedder view of one rewritten packet.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbedRecord {
    pub at_ms: u64,
    pub class: PacketClass,
    /// Channel that carried the reserved value, for sync packets.
    pub sync_channel: Option<Channel>,
    pub original: Angles,
    pub modified: Angles,
    pub original_wire: (WireValue, WireValue),
    pub modified_wire: (WireValue, WireValue),
    pub bit_pitch: u8,
    pub bit_yaw: u8,
    pub send_counter: u32,
    pub bit_position: u8,
    pub byte: Option<u8>,
}

/// Extractor view of one decoded packet.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractRecord {
    pub at_ms: u64,
    pub class: PacketClass,
    pub wire: (WireValue, WireValue),
    pub bit_pitch: u8,
    pub bit_yaw: u8,
    pub bit_position: u8,
    pub byte: u8,
    /// Most recent bitrate estimate in bits per second.
    pub bitrate: f32,
}

/// Receives per-packet records. Both methods default to no-ops.
pub trait TelemetrySink {
    fn on_embed(&mut self, _record: &EmbedRecord) {}
    fn on_extract(&mut self, _record: &ExtractRecord) {}
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl TelemetrySink for NullSink {}

/// Collects records behind shared handles; clone it before handing it to
/// the channel to keep read access.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    embeds: Arc<Mutex<Vec<EmbedRecord>>>,
    extracts: Arc<Mutex<Vec<ExtractRecord>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn embed_records(&self) -> Vec<EmbedRecord> {
        self.embeds.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn extract_records(&self) -> Vec<ExtractRecord> {
        self.extracts.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl TelemetrySink for MemorySink {
    fn on_embed(&mut self, record: &EmbedRecord) {
        self.embeds.lock().unwrap_or_else(PoisonError::into_inner).push(record.clone());
    }

    fn on_extract(&mut self, record: &ExtractRecord) {
        self.extracts.lock().unwrap_or_else(PoisonError::into_inner).push(record.clone());
    }
}
