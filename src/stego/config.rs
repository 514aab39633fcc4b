// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only

//! Channel configuration.
//!
//! One [`ChannelConfig`] value is handed to each embedder or extractor at
//! construction. Loading it (properties file, TOML, CLI) is left to the host;
//! the serde derives let any serde format feed it directly.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::stego::error::ConfigError;
use crate::stego::keys::ReservedKeySet;
use crate::stego::{
    HISTORY_LENGTH, INIT_DELAY_EMBEDDER_MS, INIT_DELAY_EXTRACTOR_MS, MIN_REPEAT_COUNT,
    SYNC_BURST, VALUES_PER_BYTE,
};

/// Which side of the channel this process plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Embedder,
    Extractor,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Embedder => f.write_str("embedder"),
            Self::Extractor => f.write_str("extractor"),
        }
    }
}

/// Settings shared by both roles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub role: Role,
    /// Display name of the cooperating peer (the receiver for an embedder,
    /// the sender for an extractor).
    pub peer: String,
    pub reserved_keys: ReservedKeySet,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Warm-up before the first packet is touched.
    pub init_delay_ms: u64,
    /// Extra sends per data value; 0 sends each value once.
    #[serde(default = "default_repeat_count")]
    pub repeat_count: u32,
    /// Data packets between sync bursts, burst included.
    #[serde(default = "default_sync_interval")]
    pub sync_interval: u32,
    #[serde(default = "default_history_len")]
    pub history_len: usize,
}

fn default_enabled() -> bool {
    true
}

fn default_repeat_count() -> u32 {
    MIN_REPEAT_COUNT
}

fn default_sync_interval() -> u32 {
    sync_interval_for(MIN_REPEAT_COUNT)
}

fn default_history_len() -> usize {
    HISTORY_LENGTH
}

/// Sync interval that places one burst after every byte.
pub fn sync_interval_for(repeat_count: u32) -> u32 {
    (repeat_count + 1) * VALUES_PER_BYTE + SYNC_BURST
}

impl ChannelConfig {
    fn with_role(role: Role, peer: &str, reserved_keys: ReservedKeySet, init_delay_ms: u64) -> Self {
        Self {
            role,
            peer: peer.to_string(),
            reserved_keys,
            enabled: true,
            init_delay_ms,
            repeat_count: MIN_REPEAT_COUNT,
            sync_interval: sync_interval_for(MIN_REPEAT_COUNT),
            history_len: HISTORY_LENGTH,
        }
    }

    /// Embedder defaults; `receiver` is the extracting peer.
    pub fn embedder(receiver: &str, reserved_keys: ReservedKeySet) -> Self {
        Self::with_role(Role::Embedder, receiver, reserved_keys, INIT_DELAY_EMBEDDER_MS)
    }

    /// Extractor defaults; `sender` is the embedding peer.
    pub fn extractor(sender: &str, reserved_keys: ReservedKeySet) -> Self {
        Self::with_role(Role::Extractor, sender, reserved_keys, INIT_DELAY_EXTRACTOR_MS)
    }

    pub fn with_init_delay_ms(mut self, ms: u64) -> Self {
        self.init_delay_ms = ms;
        self
    }

    /// Set the repeat count and realign the sync interval to one byte.
    pub fn with_repeat_count(mut self, repeat_count: u32) -> Self {
        self.repeat_count = repeat_count;
        self.sync_interval = sync_interval_for(repeat_count);
        self
    }

    /// Data packets needed for one byte.
    pub fn packets_per_byte(&self) -> u32 {
        (self.repeat_count + 1) * VALUES_PER_BYTE
    }

    /// Check every invariant the state machines rely on.
    ///
    /// The sync interval must be `2 + k * packets_per_byte` so that sync
    /// bursts always fall on byte boundaries.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.peer.trim().is_empty() {
            return Err(ConfigError::EmptyPeerName);
        }
        if self.reserved_keys.is_empty() {
            return Err(ConfigError::EmptyKeySet);
        }
        let packets_per_byte = self.packets_per_byte();
        let data_span = self.sync_interval.saturating_sub(SYNC_BURST);
        if data_span == 0 || data_span % packets_per_byte != 0 {
            return Err(ConfigError::SyncIntervalMisaligned {
                interval: self.sync_interval,
                packets_per_byte,
            });
        }
        if self.history_len == 0 {
            return Err(ConfigError::ZeroHistory);
        }
        Ok(())
    }

    /// Validate and confirm the config is meant for `role`.
    pub fn validate_for(&self, role: Role) -> Result<(), ConfigError> {
        if self.role != role {
            return Err(ConfigError::RoleMismatch { expected: role, found: self.role });
        }
        self.validate()
    }
}
