// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only

//! Thread-safe FIFO byte buffer shared with the control plane.
//!
//! The embedder drains its queue one byte at a time, the extractor fills its
//! own. An external control surface reads and writes the same queue from
//! another thread through [`QueueService`]. Every operation is one short
//! critical section under a single mutex; nothing blocks waiting for data.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::stego::byte_to_bits;

/// Byte returned by [`ByteQueue::get`] and [`ByteQueue::read`] when empty.
pub const EMPTY_BYTE: u8 = 0;

/// FIFO of payload bytes. Insertion order is transmission order.
#[derive(Debug, Default)]
pub struct ByteQueue {
    bytes: Mutex<VecDeque<u8>>,
}

impl ByteQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue pre-filled with the bytes of `text` (one byte per char).
    pub fn from_text(text: &str) -> Self {
        let queue = Self::new();
        queue.push_text(text);
        queue
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<u8>> {
        // A panic elsewhere cannot leave a VecDeque half-updated.
        self.bytes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Remove and return the head byte, or [`EMPTY_BYTE`] if empty.
    pub fn get(&self) -> u8 {
        self.lock().pop_front().unwrap_or(EMPTY_BYTE)
    }

    /// Return the head byte without removing it, or [`EMPTY_BYTE`] if empty.
    pub fn read(&self) -> u8 {
        self.lock().front().copied().unwrap_or(EMPTY_BYTE)
    }

    /// Append one byte at the tail.
    pub fn push(&self, byte: u8) {
        self.lock().push_back(byte);
    }

    /// Append `bytes` in order.
    pub fn push_bytes(&self, bytes: &[u8]) {
        self.lock().extend(bytes.iter().copied());
    }

    /// Append each char of `text` as its low byte, so `"AB"` pushes
    /// `0x41, 0x42`.
    pub fn push_text(&self, text: &str) {
        self.lock().extend(text.chars().map(|c| c as u32 as u8));
    }

    /// Snapshot of the queued bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.lock().iter().copied().collect()
    }

    /// Snapshot rendered one char per byte (Latin-1).
    pub fn to_text(&self) -> String {
        self.lock().iter().map(|&b| char::from(b)).collect()
    }

    /// Snapshot rendered as binary digits, 8 per byte, MSB first.
    pub fn to_bit_string(&self) -> String {
        self.lock().iter().map(|&b| byte_to_bits(b)).collect()
    }

    pub fn size(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

/// Remote control surface over a queue.
///
/// This is the whole contract the control plane gets; transport (RPC,
/// socket, FFI) is the host's business.
pub trait QueueService {
    /// Number of queued bytes.
    fn count(&self) -> usize;
    /// All queued bytes as text, without consuming them.
    fn read_all_as_text(&self) -> String;
    /// All queued bytes, without consuming them.
    fn read_all_as_bytes(&self) -> Vec<u8>;
    /// Drop every queued byte.
    fn clear(&self);
    /// Append text, one byte per char.
    fn append_text(&self, text: &str);
    /// Append raw bytes.
    fn append_bytes(&self, bytes: &[u8]);
}

impl QueueService for ByteQueue {
    fn count(&self) -> usize {
        self.size()
    }

    fn read_all_as_text(&self) -> String {
        self.to_text()
    }

    fn read_all_as_bytes(&self) -> Vec<u8> {
        self.to_bytes()
    }

    fn clear(&self) {
        ByteQueue::clear(self);
    }

    fn append_text(&self, text: &str) {
        self.push_text(text);
    }

    fn append_bytes(&self, bytes: &[u8]) {
        self.push_bytes(bytes);
    }
}

impl<T: QueueService + ?Sized> QueueService for Arc<T> {
    fn count(&self) -> usize {
        (**self).count()
    }

    fn read_all_as_text(&self) -> String {
        (**self).read_all_as_text()
    }

    fn read_all_as_bytes(&self) -> Vec<u8> {
        (**self).read_all_as_bytes()
    }

    fn clear(&self) {
        (**self).clear();
    }

    fn append_text(&self, text: &str) {
        (**self).append_text(text);
    }

    fn append_bytes(&self, bytes: &[u8]) {
        (**self).append_bytes(bytes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifo_order() {
        let q = ByteQueue::new();
        q.push_bytes(&[1, 2, 3]);
        assert_eq!(q.get(), 1);
        assert_eq!(q.get(), 2);
        assert_eq!(q.get(), 3);
        assert_eq!(q.get(), EMPTY_BYTE);
        assert!(q.is_empty());
    }

    #[test]
    fn read_does_not_consume() {
        let q = ByteQueue::from_text("A");
        assert_eq!(q.read(), 0x41);
        assert_eq!(q.read(), 0x41);
        assert_eq!(q.size(), 1);
        assert_eq!(q.get(), 0x41);
        assert_eq!(q.read(), EMPTY_BYTE);
    }

    #[test]
    fn text_equals_bytes() {
        let a = ByteQueue::new();
        a.push_text("AB");
        let b = ByteQueue::new();
        b.push(0x41);
        b.push(0x42);
        assert_eq!(a.to_bytes(), b.to_bytes());
        assert_eq!(a.to_text(), "AB");
    }

    #[test]
    fn bit_string() {
        let q = ByteQueue::from_text("HI");
        assert_eq!(q.to_bit_string(), "0100100001001001");
    }

    #[test]
    fn high_bytes_render_latin1() {
        let q = ByteQueue::new();
        q.push(0xFF);
        assert_eq!(q.to_text(), "\u{ff}");
        q.clear();
        q.push_text("\u{ff}");
        assert_eq!(q.to_bytes(), vec![0xFF]);
    }

    #[test]
    fn service_surface() {
        let q = Arc::new(ByteQueue::new());
        q.append_text("hi");
        q.append_bytes(&[0x21]);
        assert_eq!(q.count(), 3);
        assert_eq!(q.read_all_as_text(), "hi!");
        assert_eq!(q.read_all_as_bytes(), b"hi!".to_vec());
        QueueService::clear(&q);
        assert_eq!(q.count(), 0);
    }
}
