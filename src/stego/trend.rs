// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only

//! Recent-motion trend per rotation channel.
//!
//! Synthetic values are nudged in the direction the avatar is already
//! turning, which keeps rewritten angles close to natural motion.

use crate::stego::codec::Channel;
use crate::stego::packet::Angles;

/// Fixed-capacity ring of the most recent samples; a push overwrites the
/// oldest entry. Starts filled with zeros.
#[derive(Debug, Clone)]
pub struct SampleHistory {
    samples: Box<[f32]>,
    /// Slot of the oldest sample (and of the next write).
    head: usize,
}

impl SampleHistory {
    /// History of `len` zero samples. `len` is clamped to at least 1.
    pub fn new(len: usize) -> Self {
        Self {
            samples: vec![0.0; len.max(1)].into_boxed_slice(),
            head: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.samples.len()
    }

    pub fn push(&mut self, sample: f32) {
        self.samples[self.head] = sample;
        self.head = (self.head + 1) % self.samples.len();
    }

    /// Sample `i`, where 0 is the oldest and `capacity() - 1` the newest.
    pub fn get(&self, i: usize) -> f32 {
        self.samples[(self.head + i) % self.samples.len()]
    }

    pub fn latest(&self) -> f32 {
        self.get(self.samples.len() - 1)
    }

    pub fn reset(&mut self) {
        self.samples.fill(0.0);
        self.head = 0;
    }

    /// Weighted recent direction: `sum over i = H-1..1 of (h[i] - h[i-1]) / i`.
    ///
    /// The newest step is weighted least; older steps dominate so a single
    /// twitch does not flip the direction.
    pub fn trend(&self) -> f32 {
        (1..self.samples.len())
            .rev()
            .map(|i| (self.get(i) - self.get(i - 1)) / i as f32)
            .sum()
    }
}

/// One [`SampleHistory`] per channel.
#[derive(Debug, Clone)]
pub struct TrendEstimator {
    pitch: SampleHistory,
    yaw: SampleHistory,
}

impl TrendEstimator {
    pub fn new(history_len: usize) -> Self {
        Self {
            pitch: SampleHistory::new(history_len),
            yaw: SampleHistory::new(history_len),
        }
    }

    /// Record the natural angles of one packet.
    pub fn observe(&mut self, angles: Angles) {
        self.pitch.push(angles.pitch);
        self.yaw.push(angles.yaw);
    }

    pub fn history(&self, channel: Channel) -> &SampleHistory {
        match channel {
            Channel::Pitch => &self.pitch,
            Channel::Yaw => &self.yaw,
        }
    }

    pub fn trend(&self, channel: Channel) -> f32 {
        self.history(channel).trend()
    }

    /// `+1` when the channel is rising or flat, `-1` when falling.
    pub fn step(&self, channel: Channel) -> i32 {
        if self.trend(channel) >= 0.0 { 1 } else { -1 }
    }

    pub fn current(&self, channel: Channel) -> f32 {
        self.history(channel).latest()
    }

    pub fn reset(&mut self) {
        self.pitch.reset();
        self.yaw.reset();
    }
}
