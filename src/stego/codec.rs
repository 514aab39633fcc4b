// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only

//! Angle quantization and round-trip-safe jitter.
//!
//! The host protocol sends rotations as one signed byte per axis:
//! `wire = floor(angle * 256 / 360)` truncated to 8 bits. Every wire value
//! therefore stands for a half-open *bucket* of 1.40625 degrees. The functions
//! here pick angles inside a chosen bucket so that the quantizer on the far
//! side reproduces exactly the wire value we intended.
//!
//! Yaw is unbounded (players turn several times), so the unwrapped bucket
//! index ([`wire_index`]) is kept separately from the 8-bit [`WireValue`].

use rand::Rng;
use serde::{Deserialize, Serialize};

/// 8-bit quantized angle as seen on the wire.
pub type WireValue = i8;

/// Degrees covered by one wire bucket.
pub const DEGREES_PER_WIRE: f32 = 360.0 / 256.0;

/// Pitch is limited to straight up / straight down.
pub const PITCH_LIMIT_DEG: f32 = 90.0;

/// Wire value of [`PITCH_LIMIT_DEG`].
pub const PITCH_WIRE_LIMIT: i32 = 64;

/// Number of wire values in one full turn.
pub const WIRE_TURN: i32 = 256;

/// Which rotation field a value belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    Pitch,
    Yaw,
}

impl Channel {
    /// Gap kept below the upper bucket edge when jittering.
    fn epsilon(self) -> f32 {
        match self {
            Self::Pitch => 0.000_001,
            Self::Yaw => 0.000_1,
        }
    }

    /// Inclusive wire range this channel may legally carry, if bounded.
    pub fn wire_bounds(self) -> Option<(i32, i32)> {
        match self {
            Self::Pitch => Some((-PITCH_WIRE_LIMIT, PITCH_WIRE_LIMIT)),
            Self::Yaw => None,
        }
    }
}

/// Unwrapped bucket index of `angle` (no 8-bit truncation).
pub fn wire_index(angle: f32) -> i32 {
    (angle * 256.0 / 360.0).floor() as i32
}

/// Quantize `angle` to its 8-bit wire value (wraps modulo 256).
pub fn to_wire(angle: f32) -> WireValue {
    wire_index(angle) as WireValue
}

/// Lower edge of the bucket with (unwrapped) index `wire`.
pub fn to_angle(wire: i32) -> f32 {
    wire as f32 * 360.0 / 256.0
}

/// Least significant bit of a wire value, independent of sign.
pub fn parity(wire: i32) -> u8 {
    (wire & 1) as u8
}

/// Draw a fresh angle from the bucket that `angle` falls into.
///
/// Pitch results are clamped to `[-90, 90]`. For every angle inside the
/// channel's legal range, `to_wire(randomize_angle(a)) == to_wire(a)`; if
/// float rounding ever pushes the draw across the upper edge, the bucket's
/// exact lower edge is returned instead.
pub fn randomize_angle<R: Rng>(angle: f32, channel: Channel, rng: &mut R) -> f32 {
    let wire = wire_index(angle);

    let mut min = to_angle(wire);
    let mut max = to_angle(wire + 1) - channel.epsilon();
    if channel == Channel::Pitch {
        max = max.min(PITCH_LIMIT_DEG);
        min = min.max(-PITCH_LIMIT_DEG);
    }

    let value = min + rng.gen::<f32>() * (max - min);
    if wire_index(value) == wire {
        value
    } else {
        min
    }
}

/// Pick the copy of `wire` closest to `reference` across full turns.
///
/// Candidates are `wire + 256 * k` for `k` in `{m - 1, m, m + 1}` where `m`
/// is the turn `reference` lies in. Returns the unwrapped bucket index of
/// the candidate nearest to the reference's own bucket.
pub fn nearest_turn(wire: WireValue, reference: f32) -> i32 {
    let reference_wire = wire_index(reference);
    let turn = reference_wire.div_euclid(WIRE_TURN);
    let base = i32::from(wire);

    let mut best = base + WIRE_TURN * turn;
    for k in [turn - 1, turn + 1] {
        let candidate = base + WIRE_TURN * k;
        if (reference_wire - candidate).abs() < (reference_wire - best).abs() {
            best = candidate;
        }
    }
    best
}

/// Convert `wire` to a jittered angle in the turn closest to `reference`.
///
/// The result quantizes back to `wire` and stays within half a turn (plus
/// one bucket) of `reference`, so a rewritten yaw never spins the avatar.
pub fn convert_wire_angle<R: Rng>(
    wire: WireValue,
    reference: f32,
    channel: Channel,
    rng: &mut R,
) -> f32 {
    randomize_angle(to_angle(nearest_turn(wire, reference)), channel, rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn rng() -> ChaCha20Rng {
        ChaCha20Rng::seed_from_u64(7)
    }

    #[test]
    fn quantization_edges() {
        assert_eq!(to_wire(0.0), 0);
        assert_eq!(to_wire(90.0), 64);
        assert_eq!(to_wire(-90.0), -64);
        assert_eq!(to_wire(180.0), -128);
        assert_eq!(to_wire(270.0), -64);
        assert_eq!(to_wire(360.0), 0);
        assert_eq!(to_wire(362.0), 1);
        assert_eq!(to_wire(-0.1), -1);
    }

    #[test]
    fn to_angle_is_exact_lower_edge() {
        for w in -128..=127 {
            assert_eq!(wire_index(to_angle(w)), w);
        }
        assert_eq!(to_angle(64), 90.0);
    }

    #[test]
    fn parity_ignores_sign() {
        assert_eq!(parity(-3), 1);
        assert_eq!(parity(-4), 0);
        assert_eq!(parity(i32::from(-127i8)), 1);
        assert_eq!(parity(255), 1);
    }

    #[test]
    fn randomize_yaw_stays_in_bucket() {
        let mut r = rng();
        for &yaw in &[
            -197.17036f32, -229.93044, -360.4553, 721.4553,
            360.4553, -719.5553, 359.5553, -720.4553,
        ] {
            let out = randomize_angle(yaw, Channel::Yaw, &mut r);
            assert!((yaw - out).abs() < 2.0, "{yaw} -> {out}");
            assert_eq!(to_wire(yaw), to_wire(out), "{yaw} -> {out}");
        }
    }

    #[test]
    fn randomize_pitch_stays_in_bucket_and_range() {
        let mut r = rng();
        for &pitch in &[-0.4553f32, -56.4553, 25.4553, 89.4553, -89.5553, 0.5553, 90.0, -90.0] {
            let out = randomize_angle(pitch, Channel::Pitch, &mut r);
            assert!((-90.0..=90.0).contains(&out), "{pitch} -> {out}");
            assert_eq!(to_wire(pitch), to_wire(out), "{pitch} -> {out}");
        }
    }

    #[test]
    fn convert_near_reference() {
        let mut r = rng();
        let cases: &[(f32, &[i8])] = &[
            (266.436, &[62, -63, 126, 0]),
            (-719.436, &[62, -63, 126, 0]),
            (-91.2085, &[-65, -72]),
            (409.66763, &[35, 48]),
        ];
        for &(reference, wires) in cases {
            for &w in wires {
                let y = convert_wire_angle(w, reference, Channel::Yaw, &mut r);
                assert!((reference - y).abs() < 180.0, "ref {reference} wire {w} -> {y}");
                assert_eq!(to_wire(y), w, "ref {reference} wire {w} -> {y}");
            }
        }
    }

    #[test]
    fn nearest_turn_picks_closest_copy() {
        // 266.436 deg is bucket 189; wire 0 is closest as 256 (one turn up).
        assert_eq!(nearest_turn(0, 266.436), 256);
        assert_eq!(nearest_turn(62, 266.436), 62);
        assert_eq!(nearest_turn(-63, 266.436), 193);
        assert_eq!(nearest_turn(126, -719.436), -386);
    }

    #[test]
    fn pitch_conversion_bounded() {
        let mut r = rng();
        let p = convert_wire_angle(62, 10.0, Channel::Pitch, &mut r);
        assert!((-90.0..=90.0).contains(&p));
        assert_eq!(to_wire(p), 62);
    }
}
