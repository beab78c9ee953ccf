//! Per-port transfer counters
//!
//! Updated from both contexts with relaxed atomics; readers get a snapshot.

use portable_atomic::{AtomicUsize, Ordering};

#[derive(Debug, Default)]
pub struct SerialStats {
    bytes_sent: AtomicUsize,
    bytes_received: AtomicUsize,
    rx_dropped: AtomicUsize,
}

/// Point-in-time copy of [`SerialStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SerialStatsSnapshot {
    /// Bytes written to the output register
    pub bytes_sent: usize,
    /// Bytes queued for `receive`
    pub bytes_received: usize,
    /// Bytes lost because the receive buffer was full
    pub rx_dropped: usize,
}

impl SerialStats {
    pub const fn new() -> Self {
        Self {
            bytes_sent: AtomicUsize::new(0),
            bytes_received: AtomicUsize::new(0),
            rx_dropped: AtomicUsize::new(0),
        }
    }

    #[inline]
    pub(crate) fn record_sent(&self) {
        self.bytes_sent.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_received(&self) {
        self.bytes_received.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_dropped(&self) {
        self.rx_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn rx_dropped(&self) -> usize {
        self.rx_dropped.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> SerialStatsSnapshot {
        SerialStatsSnapshot {
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            rx_dropped: self.rx_dropped.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn reset(&mut self) {
        *self.bytes_sent.get_mut() = 0;
        *self.bytes_received.get_mut() = 0;
        *self.rx_dropped.get_mut() = 0;
    }
}
