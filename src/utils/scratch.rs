//! Scratch Buffer Pool
//!
//! Provides reusable `Vec` allocations for short-lived, per-frame work such as
//! skinning key lists and bounding-volume accumulation. Callers acquire a
//! buffer at the start of a phase and release it when done; the allocation is
//! returned to a free list for the next request.
//!
//! # Design
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                ScratchPool<T>                 │
//! │                                              │
//! │  free: Mutex<Vec<Vec<T>>>                    │
//! │  largest_request: AtomicUsize                │
//! │                                              │
//! │  acquire(len)      → ScratchBuffer (len)     │
//! │  acquire_empty(n)  → ScratchBuffer (cap ≥ n) │
//! │  release(buffer)   → back to free list       │
//! │  shrink()          → trim to largest request │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! # Memory Strategy
//!
//! - Buffers are **never** shrunk during normal use; a request that is larger
//!   than every free buffer grows one of them in place.
//! - [`ScratchPool::shrink`] trims every free buffer down to the largest
//!   request seen since the previous shrink and resets that high-water mark.
//!   Call it periodically (e.g. every few hundred frames).

use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

/// A buffer checked out of a [`ScratchPool`].
///
/// Dereferences to the underlying `Vec`. Hand it back with
/// [`ScratchPool::release`]; dropping it instead simply frees the memory.
#[derive(Debug)]
pub struct ScratchBuffer<T> {
    data: Vec<T>,
}

impl<T> ScratchBuffer<T> {
    /// Consumes the buffer and returns the underlying vector.
    #[must_use]
    pub fn into_inner(self) -> Vec<T> {
        self.data
    }
}

impl<T> Deref for ScratchBuffer<T> {
    type Target = Vec<T>;

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}

impl<T> DerefMut for ScratchBuffer<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.data
    }
}

/// Thread-safe pool of reusable vectors.
#[derive(Debug)]
pub struct ScratchPool<T> {
    free: Mutex<Vec<Vec<T>>>,
    largest_request: AtomicUsize,
}

impl<T> Default for ScratchPool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ScratchPool<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            free: Mutex::new(Vec::new()),
            largest_request: AtomicUsize::new(0),
        }
    }

    /// Acquires an empty buffer whose capacity is at least `capacity`.
    pub fn acquire_empty(&self, capacity: usize) -> ScratchBuffer<T> {
        self.largest_request.fetch_max(capacity, Ordering::Relaxed);

        let mut data = self.take_free(capacity);
        data.clear();
        if data.capacity() < capacity {
            data.reserve_exact(capacity);
        }
        ScratchBuffer { data }
    }

    /// Returns a buffer to the free list.
    pub fn release(&self, buffer: ScratchBuffer<T>) {
        let mut data = buffer.data;
        data.clear();
        if data.capacity() > 0 {
            self.free.lock().push(data);
        }
    }

    /// Trims free buffers to the largest request seen since the last shrink.
    pub fn shrink(&self) {
        let bound = self.largest_request.swap(0, Ordering::Relaxed);
        let mut free = self.free.lock();
        for data in free.iter_mut() {
            data.shrink_to(bound);
        }
        free.retain(|data| data.capacity() > 0);
    }

    /// Number of buffers currently waiting in the free list.
    #[must_use]
    pub fn free_count(&self) -> usize {
        self.free.lock().len()
    }

    /// Picks the smallest free buffer that fits, otherwise the largest one
    /// (which the caller grows), otherwise a fresh vector.
    fn take_free(&self, capacity: usize) -> Vec<T> {
        let mut free = self.free.lock();
        if free.is_empty() {
            return Vec::new();
        }

        let fitting = free
            .iter()
            .enumerate()
            .filter(|(_, data)| data.capacity() >= capacity)
            .min_by_key(|(_, data)| data.capacity())
            .map(|(index, _)| index);

        let index = fitting.unwrap_or_else(|| {
            free.iter()
                .enumerate()
                .max_by_key(|(_, data)| data.capacity())
                .map_or(0, |(index, _)| index)
        });

        free.swap_remove(index)
    }
}

impl<T: Default + Clone> ScratchPool<T> {
    /// Acquires a buffer of exactly `len` default-initialised elements.
    pub fn acquire(&self, len: usize) -> ScratchBuffer<T> {
        let mut buffer = self.acquire_empty(len);
        buffer.data.resize(len, T::default());
        buffer
    }
}
