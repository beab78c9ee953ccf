//! Foreground half of a serial engine

use core::hint::spin_loop;

use log::warn;

use crate::engine::{SerialEngine, TxState};
use crate::hardware::SerialHardware;
use crate::sink::ByteSink;
use crate::stats::SerialStatsSnapshot;

/// Foreground handle: send, receive, and interrupt arming
///
/// Exactly one exists per engine, so it is the single producer of the
/// outbound FIFO and the single consumer of the inbound one.
pub struct SerialPort<'e, 'a, H: SerialHardware> {
    engine: &'e SerialEngine<'a, H>,
    /// Drop count already reported
    seen_dropped: usize,
}

impl<'e, 'a, H: SerialHardware> SerialPort<'e, 'a, H> {
    pub(crate) fn new(engine: &'e SerialEngine<'a, H>) -> Self {
        Self {
            engine,
            seen_dropped: engine.raw_stats().rx_dropped(),
        }
    }

    /// Queue one byte for transmission
    ///
    /// Writes straight to the output register when the transmitter is idle,
    /// otherwise appends to the outbound FIFO, spinning while it is full.
    /// Interrupts must be enabled for a full FIFO to drain.
    pub fn send(&mut self, byte: u8) {
        self.engine.send(byte);
    }

    pub fn send_all(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.engine.send(byte);
        }
    }

    /// Oldest received byte, or 0 when nothing is waiting
    ///
    /// A 0 byte on the wire is indistinguishable from "nothing"; check
    /// [`SerialPort::bytes_available`] first or use [`SerialPort::try_receive`].
    pub fn receive(&mut self) -> u8 {
        self.try_receive().unwrap_or(0)
    }

    pub fn try_receive(&mut self) -> Option<u8> {
        self.report_overrun();
        self.engine.try_receive()
    }

    /// Drain up to `buf.len()` received bytes; returns how many were copied
    pub fn read(&mut self, buf: &mut [u8]) -> usize {
        self.report_overrun();
        let mut copied = 0;
        for slot in buf.iter_mut() {
            match self.engine.try_receive() {
                Some(byte) => {
                    *slot = byte;
                    copied += 1;
                }
                None => break,
            }
        }
        copied
    }

    pub fn bytes_available(&self) -> usize {
        self.engine.rx_available()
    }

    /// Spin until the outbound FIFO is empty and the last byte is handed off
    pub fn flush(&mut self) {
        while self.engine.state() == TxState::Draining {
            spin_loop();
        }
    }

    pub fn state(&self) -> TxState {
        self.engine.state()
    }

    pub fn stats(&self) -> SerialStatsSnapshot {
        self.engine.stats()
    }

    /// Arm receive: from now on received bytes are queued
    pub fn enable_interrupts(&mut self) {
        self.engine.arm_receive();
    }

    /// Disarm receive; queued bytes stay readable
    pub fn disable_interrupts(&mut self) {
        self.engine.disarm_receive();
    }

    pub fn interrupts_enabled(&self) -> bool {
        self.engine.receive_armed()
    }

    /// Warn once per run of dropped bytes
    fn report_overrun(&mut self) {
        let dropped = self.engine.raw_stats().rx_dropped();
        if dropped != self.seen_dropped {
            warn!(
                "[{}] receive overrun: {} byte(s) dropped",
                self.engine.name(),
                dropped.wrapping_sub(self.seen_dropped)
            );
            self.seen_dropped = dropped;
        }
    }
}

impl<H: SerialHardware> ByteSink for SerialPort<'_, '_, H> {
    fn emit(&mut self, byte: u8) {
        self.send(byte);
    }
}

impl<H: SerialHardware> core::fmt::Write for SerialPort<'_, '_, H> {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        self.send_all(s.as_bytes());
        Ok(())
    }
}

impl<H: SerialHardware> core::fmt::Debug for SerialPort<'_, '_, H> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SerialPort")
            .field("engine", &self.engine.name())
            .field("state", &self.state())
            .field("available", &self.bytes_available())
            .finish()
    }
}
