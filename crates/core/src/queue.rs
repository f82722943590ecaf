// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Mutex-guarded FIFO queues for inter-task hand-off.
//!
//! Every queue operation is non-blocking: producers push, consumers
//! poll with [`Queue::get`] on their own cadence. Queues are shared by
//! cloning an `Arc<Queue<T>>` or by embedding them in a shared struct.

use parking_lot::Mutex;
use std::collections::VecDeque;

/// Unbounded FIFO with interior locking.
#[derive(Debug)]
pub struct Queue<T> {
    inner: Mutex<VecDeque<T>>,
}

impl<T> Default for Queue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Queue<T> {
    pub fn new() -> Self {
        Self { inner: Mutex::new(VecDeque::new()) }
    }

    /// Append an item at the tail.
    pub fn push(&self, item: T) {
        self.inner.lock().push_back(item);
    }

    /// Pop the head, or `None` when empty.
    pub fn get(&self) -> Option<T> {
        self.inner.lock().pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Drain-move every item of `other` onto the tail of `self`,
    /// preserving order. Callers must not append two queues into each
    /// other concurrently.
    pub fn append(&self, other: &Queue<T>) {
        let mut src = other.inner.lock();
        let mut dst = self.inner.lock();
        dst.extend(src.drain(..));
    }

    /// Drain the queue into a vector (oldest first).
    pub fn drain(&self) -> Vec<T> {
        self.inner.lock().drain(..).collect()
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
