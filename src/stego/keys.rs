// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only

//! Reserved wire values used as synchronization markers.
//!
//! Both roles share the same [`ReservedKeySet`] (the "stego key"). A packet
//! whose pitch or yaw wire value is in the set is a sync packet; data values
//! are always steered away from it.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::stego::codec::WireValue;
use crate::stego::error::ConfigError;

/// Ordered set of distinct wire values reserved for sync markers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<i32>", into = "Vec<i32>")]
pub struct ReservedKeySet {
    keys: Vec<WireValue>,
}

impl ReservedKeySet {
    /// Build a key set, rejecting empty input, duplicates and values outside
    /// the 8-bit wire range. Insertion order is kept.
    pub fn new(values: &[i32]) -> Result<Self, ConfigError> {
        if values.is_empty() {
            return Err(ConfigError::EmptyKeySet);
        }
        let mut keys: Vec<WireValue> = Vec::with_capacity(values.len());
        for &v in values {
            let k = WireValue::try_from(v).map_err(|_| ConfigError::KeyOutOfRange(v))?;
            if keys.contains(&k) {
                return Err(ConfigError::DuplicateKey(v));
            }
            keys.push(k);
        }
        Ok(Self { keys })
    }

    /// Number of reserved values.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Always false for a validated set.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = WireValue> + '_ {
        self.keys.iter().copied()
    }

    /// Is `wire` reserved?
    pub fn contains(&self, wire: WireValue) -> bool {
        self.keys.contains(&wire)
    }

    /// Is the unwrapped bucket index `wire` reserved once truncated to 8 bits?
    pub fn contains_index(&self, wire: i32) -> bool {
        self.contains(wire as WireValue)
    }

    /// Reserved value nearest to `target` on the requested side.
    ///
    /// With `above` the search prefers values `>= target`, otherwise values
    /// `<= target`. If no reserved value lies on that side the overall
    /// nearest one is returned.
    pub fn nearest(&self, target: i32, above: bool) -> WireValue {
        self.nearest_within(target, above, i32::MIN, i32::MAX)
            .unwrap_or(self.keys[0])
    }

    /// Like [`nearest`](Self::nearest), restricted to keys in `lo..=hi`.
    /// Returns `None` when no key lies in that range.
    pub fn nearest_within(&self, target: i32, above: bool, lo: i32, hi: i32) -> Option<WireValue> {
        let candidates: Vec<i32> = self
            .keys
            .iter()
            .map(|&k| i32::from(k))
            .filter(|k| (lo..=hi).contains(k))
            .collect();
        let distance = |k: &i32| (k - target).abs();

        let sided = candidates
            .iter()
            .copied()
            .filter(|&k| if above { k >= target } else { k <= target })
            .min_by_key(distance);

        sided
            .or_else(|| candidates.iter().copied().min_by_key(distance))
            .map(|k| k as WireValue)
    }
}

impl TryFrom<Vec<i32>> for ReservedKeySet {
    type Error = ConfigError;

    fn try_from(values: Vec<i32>) -> Result<Self, Self::Error> {
        Self::new(&values)
    }
}

impl From<ReservedKeySet> for Vec<i32> {
    fn from(set: ReservedKeySet) -> Self {
        set.keys.into_iter().map(i32::from).collect()
    }
}

/// Parses the comma-separated form, e.g. `"-126,-100,5,16"`.
impl FromStr for ReservedKeySet {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let values = s
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| part.parse::<i32>().map_err(|_| ConfigError::MalformedKey(part.to_string())))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(&values)
    }
}

impl fmt::Display for ReservedKeySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, k) in self.keys.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{k}")?;
        }
        Ok(())
    }
}
