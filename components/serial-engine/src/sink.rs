//! Byte-output hook for text formatters
//!
//! Terminal helpers (VT100 escape sequences, console printers) write through a
//! [`ByteSink`] instead of a concrete port, so the same formatter can target
//! the UART, the RS-485 line or a capture buffer in tests.

use core::fmt;

/// Destination for a stream of bytes
pub trait ByteSink {
    fn emit(&mut self, byte: u8);

    fn emit_all(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.emit(byte);
        }
    }
}

/// Adapts a closure or `fn(u8)` output routine into a [`ByteSink`]
pub struct FnSink<F>(pub F);

impl<F: FnMut(u8)> ByteSink for FnSink<F> {
    fn emit(&mut self, byte: u8) {
        (self.0)(byte)
    }
}

/// `core::fmt::Write` over any [`ByteSink`]
///
/// ```ignore
/// use core::fmt::Write;
/// let mut out = SinkWriter::new(&mut port);
/// write!(out, "\x1b[{};{}H", row, col)?;
/// ```
pub struct SinkWriter<S> {
    sink: S,
}

impl<S: ByteSink> SinkWriter<S> {
    pub fn new(sink: S) -> Self {
        Self { sink }
    }

    pub fn into_inner(self) -> S {
        self.sink
    }
}

impl<S: ByteSink> fmt::Write for SinkWriter<S> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.sink.emit_all(s.as_bytes());
        Ok(())
    }
}

impl<S: ByteSink + ?Sized> ByteSink for &mut S {
    fn emit(&mut self, byte: u8) {
        (**self).emit(byte)
    }

    fn emit_all(&mut self, bytes: &[u8]) {
        (**self).emit_all(bytes)
    }
}
