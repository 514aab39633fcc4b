// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only

//! Error types for the rotation channel.
//!
//! [`ConfigError`] covers setup-time validation. [`StegoError`] covers the
//! only per-packet failure: an eligible packet whose angle fields the host
//! cannot expose or accept. Framing faults are repaired in place and never
//! reach the caller.

use core::fmt;

use crate::stego::config::Role;

/// Invalid channel configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The reserved key set has no entries.
    EmptyKeySet,
    /// A reserved key appears more than once.
    DuplicateKey(i32),
    /// A reserved key lies outside the wire range `-128..=127`.
    KeyOutOfRange(i32),
    /// A textual key entry is not an integer.
    MalformedKey(String),
    /// The sync interval does not line up with whole bytes.
    SyncIntervalMisaligned { interval: u32, packets_per_byte: u32 },
    /// The trend history needs at least one sample.
    ZeroHistory,
    /// No peer name configured.
    EmptyPeerName,
    /// A config for one role was handed to the other role.
    RoleMismatch { expected: Role, found: Role },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyKeySet => write!(f, "reserved key set is empty"),
            Self::DuplicateKey(k) => write!(f, "reserved key {k} listed twice"),
            Self::KeyOutOfRange(k) => write!(f, "reserved key {k} outside -128..=127"),
            Self::MalformedKey(s) => write!(f, "reserved key {s:?} is not an integer"),
            Self::SyncIntervalMisaligned { interval, packets_per_byte } => write!(
                f,
                "sync interval {interval} must be 2 plus a multiple of {packets_per_byte}"
            ),
            Self::ZeroHistory => write!(f, "history length must be at least 1"),
            Self::EmptyPeerName => write!(f, "peer name is empty"),
            Self::RoleMismatch { expected, found } => {
                write!(f, "config is for the {found} role, expected {expected}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Errors surfaced by the embedder and by channel construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StegoError {
    /// The channel configuration failed validation.
    InvalidConfig(ConfigError),
    /// An eligible packet does not expose its angle fields.
    AnglesUnavailable,
    /// The host rejected the rewritten angle fields.
    AnglesUnwritable,
}

impl fmt::Display for StegoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig(e) => write!(f, "invalid channel config: {e}"),
            Self::AnglesUnavailable => write!(f, "angle fields not found on eligible packet"),
            Self::AnglesUnwritable => write!(f, "angle fields could not be written"),
        }
    }
}

impl std::error::Error for StegoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidConfig(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for StegoError {
    fn from(e: ConfigError) -> Self {
        Self::InvalidConfig(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn config_error_is_source() {
        let e = StegoError::from(ConfigError::DuplicateKey(5));
        assert!(e.source().is_some());
        assert_eq!(e.to_string(), "invalid channel config: reserved key 5 listed twice");
        assert!(StegoError::AnglesUnavailable.source().is_none());
    }

    #[test]
    fn role_mismatch_message() {
        let e = ConfigError::RoleMismatch { expected: Role::Embedder, found: Role::Extractor };
        assert_eq!(e.to_string(), "config is for the extractor role, expected embedder");
    }
}
