//! Serial Ring - Bounded byte FIFO shared between a foreground context and an
//! interrupt handler
//!
//! # Purpose
//! Provides the fixed-capacity byte queue that sits between a serial driver's
//! interrupt handlers and the foreground program. The ring never blocks and
//! never allocates; all waiting policy belongs to the caller.
//!
//! # Integration Points
//! - Depends on: `portable-atomic` (counters)
//! - Provides to: `serial-engine` (one ring per direction per port)
//!
//! # Architecture
//! Single-producer/single-consumer ring over storage owned by the caller.
//! The producer only moves `head`, the consumer only moves `tail`, and the
//! occupancy counter `count` is the only word both sides write. Occupancy is
//! tracked explicitly, so every slot holds data and `head == tail` is never
//! ambiguous.
//!
//! # Ordering
//! - Producer: write slot, then `count += 1` with `Release`
//! - Consumer: `count` loaded with `Acquire` before reading the slot
//! - Consumer: read slot, then `count -= 1` with `Release`
//! - Producer: `count` loaded with `Acquire` before reusing the slot
//!
//! On a single core without nested interrupts either context observes `count`
//! before or after an update, never in between.
//!
//! # Targets without atomic CAS
//! The counters are `portable-atomic` types. Where the target has no native
//! read-modify-write (msp430), `fetch_add`/`fetch_sub` run inside a
//! `critical-section` critical section, so the application must link a
//! critical-section implementation (for msp430, the `msp430` crate's
//! `critical-section-single-core` feature). Hosts use native atomics.

#![no_std]

#[cfg(test)]
#[macro_use]
extern crate std;

use core::marker::PhantomData;
use core::ptr::NonNull;

use portable_atomic::{AtomicUsize, Ordering};
use static_assertions::assert_not_impl_any;

/// Value returned by `pop`/`peek` when the ring holds no data
pub const EMPTY_BYTE: u8 = 0;

/// Bounded byte FIFO over caller-owned storage
///
/// Capacity is the length of the storage slice. Any length works, including
/// zero: a zero-capacity ring is permanently empty and permanently full.
///
/// # Roles
/// At most one context may act as producer (`push`) and at most one as
/// consumer (`pop`, `peek`) at any time. [`RingBuffer::split`] hands out one
/// [`Producer`] and one [`Consumer`] and is the safe way to honour that rule.
/// The raw `push`/`pop` methods are `unsafe` for callers that enforce it some
/// other way (the serial engine does, via its transmit token).
pub struct RingBuffer<'a> {
    storage: NonNull<u8>,
    capacity: usize,
    head: AtomicUsize,  // next write slot, producer-owned
    tail: AtomicUsize,  // next read slot, consumer-owned
    count: AtomicUsize, // occupied slots, written by both sides
    _storage: PhantomData<&'a mut [u8]>,
}

// The ring only hands out bytes by value and both roles are serialized through
// `count`, so sharing it between the two contexts is sound.
unsafe impl Send for RingBuffer<'_> {}
unsafe impl Sync for RingBuffer<'_> {}

impl<'a> RingBuffer<'a> {
    /// Bind a new, empty ring to `storage`
    pub fn new(storage: &'a mut [u8]) -> Self {
        let capacity = storage.len();
        Self {
            storage: NonNull::from(storage).cast::<u8>(),
            capacity,
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
            count: AtomicUsize::new(0),
            _storage: PhantomData,
        }
    }

    /// Number of slots in the backing storage
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of bytes currently queued
    pub fn len(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }

    /// Check if the ring holds no data
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check if a push would be rejected
    pub fn is_full(&self) -> bool {
        self.len() >= self.capacity
    }

    /// Push a byte (producer side)
    ///
    /// Returns `false` and leaves the ring untouched when it is full.
    ///
    /// # Safety
    /// No other context may call `push` on this ring concurrently.
    pub unsafe fn push(&self, byte: u8) -> bool {
        if self.is_full() {
            return false;
        }

        let head = self.head.load(Ordering::Relaxed);
        // SAFETY: count < capacity, so `head` is in bounds and the slot is free.
        // Only the producer touches free slots.
        unsafe { self.storage.as_ptr().add(head).write_volatile(byte) };
        self.head.store(self.advance(head), Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Release);
        true
    }

    /// Pop the oldest byte (consumer side)
    ///
    /// Returns `None` and leaves the ring untouched when it is empty.
    ///
    /// # Safety
    /// No other context may call `try_pop`, `pop`, `peek` or `try_peek` on this
    /// ring concurrently.
    pub unsafe fn try_pop(&self) -> Option<u8> {
        if self.is_empty() {
            return None;
        }

        let tail = self.tail.load(Ordering::Relaxed);
        // SAFETY: count > 0, so `tail` is in bounds and the slot was published
        // by the producer's Release increment we just Acquired.
        let byte = unsafe { self.storage.as_ptr().add(tail).read_volatile() };
        self.tail.store(self.advance(tail), Ordering::Relaxed);
        self.count.fetch_sub(1, Ordering::Release);
        Some(byte)
    }

    /// Pop the oldest byte, or [`EMPTY_BYTE`] when the ring is empty
    ///
    /// Use [`RingBuffer::is_empty`] first if a genuine zero byte must be told
    /// apart from "no data".
    ///
    /// # Safety
    /// Same contract as [`RingBuffer::try_pop`].
    pub unsafe fn pop(&self) -> u8 {
        unsafe { self.try_pop() }.unwrap_or(EMPTY_BYTE)
    }

    /// Look at the oldest byte without removing it
    ///
    /// # Safety
    /// Same contract as [`RingBuffer::try_pop`].
    pub unsafe fn try_peek(&self) -> Option<u8> {
        if self.is_empty() {
            return None;
        }

        let tail = self.tail.load(Ordering::Relaxed);
        // SAFETY: see `try_pop`
        Some(unsafe { self.storage.as_ptr().add(tail).read_volatile() })
    }

    /// Look at the oldest byte, or [`EMPTY_BYTE`] when the ring is empty
    ///
    /// # Safety
    /// Same contract as [`RingBuffer::try_pop`].
    pub unsafe fn peek(&self) -> u8 {
        unsafe { self.try_peek() }.unwrap_or(EMPTY_BYTE)
    }

    /// Discard all queued bytes
    pub fn reset(&mut self) {
        *self.head.get_mut() = 0;
        *self.tail.get_mut() = 0;
        *self.count.get_mut() = 0;
    }

    /// Split the ring into its producer and consumer halves
    pub fn split(&mut self) -> (Producer<'_, 'a>, Consumer<'_, 'a>) {
        let ring: &RingBuffer<'a> = self;
        (Producer { ring }, Consumer { ring })
    }

    /// Next slot index, wrapping at `capacity`
    #[inline]
    fn advance(&self, index: usize) -> usize {
        let next = index + 1;
        if next >= self.capacity {
            0
        } else {
            next
        }
    }
}

impl core::fmt::Debug for RingBuffer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RingBuffer")
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .field("head", &self.head.load(Ordering::Relaxed))
            .field("tail", &self.tail.load(Ordering::Relaxed))
            .finish()
    }
}

/// Producer half of a split [`RingBuffer`]
///
/// Only allows push operations.
pub struct Producer<'r, 'a> {
    ring: &'r RingBuffer<'a>,
}

impl Producer<'_, '_> {
    /// Push a byte; `false` when the ring is full
    pub fn push(&mut self, byte: u8) -> bool {
        // SAFETY: `split` creates exactly one producer per exclusive borrow
        unsafe { self.ring.push(byte) }
    }

    /// Check if the ring is full
    pub fn is_full(&self) -> bool {
        self.ring.is_full()
    }

    /// Get current ring length
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    /// Get ring capacity
    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }
}

/// Consumer half of a split [`RingBuffer`]
///
/// Only allows pop and peek operations.
pub struct Consumer<'r, 'a> {
    ring: &'r RingBuffer<'a>,
}

impl Consumer<'_, '_> {
    /// Pop the oldest byte, `None` when empty
    pub fn try_pop(&mut self) -> Option<u8> {
        // SAFETY: `split` creates exactly one consumer per exclusive borrow
        unsafe { self.ring.try_pop() }
    }

    /// Pop the oldest byte, [`EMPTY_BYTE`] when empty
    pub fn pop(&mut self) -> u8 {
        self.try_pop().unwrap_or(EMPTY_BYTE)
    }

    /// Look at the oldest byte, [`EMPTY_BYTE`] when empty
    pub fn peek(&self) -> u8 {
        // SAFETY: see `try_pop`; `&self` cannot overlap a `&mut self` pop
        unsafe { self.ring.peek() }
    }

    /// Check if the ring is empty
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Get current ring length
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    /// Get ring capacity
    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }
}

// One handle per role: cloning either half would allow two producers or two
// consumers.
assert_not_impl_any!(Producer<'static, 'static>: Clone, Copy);
assert_not_impl_any!(Consumer<'static, 'static>: Clone, Copy);
