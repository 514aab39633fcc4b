// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only

//! Millisecond time source and the warm-up gate built on it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Monotonic millisecond clock.
pub trait Clock {
    fn now_ms(&self) -> u64;
}

/// Wall time since construction.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self { origin: Instant::now() }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

/// Hand-driven clock. Clones share the same time, so a simulation can keep
/// one handle and give another to the channel.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    ms: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self { ms: Arc::new(AtomicU64::new(start_ms)) }
    }

    pub fn set(&self, ms: u64) {
        self.ms.store(ms, Ordering::Relaxed);
    }

    pub fn advance(&self, ms: u64) {
        self.ms.fetch_add(ms, Ordering::Relaxed);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.ms.load(Ordering::Relaxed)
    }
}

/// Holds processing back until `delay_ms` has passed since the first poll.
#[derive(Debug, Clone)]
pub(crate) struct InitGate {
    delay_ms: u64,
    started_ms: Option<u64>,
    ready: bool,
}

impl InitGate {
    pub(crate) fn new(delay_ms: u64) -> Self {
        Self { delay_ms, started_ms: None, ready: false }
    }

    /// Start the timer on first call; true once the delay has elapsed.
    pub(crate) fn poll(&mut self, now_ms: u64) -> bool {
        if !self.ready {
            let started = *self.started_ms.get_or_insert(now_ms);
            self.ready = now_ms.saturating_sub(started) >= self.delay_ms;
        }
        self.ready
    }

    pub(crate) fn is_ready(&self) -> bool {
        self.ready
    }

    pub(crate) fn reset(&mut self) {
        self.started_ms = None;
        self.ready = false;
    }
}
