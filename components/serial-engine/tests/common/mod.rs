//! Test double for a serial port
//!
//! Records every byte written to the output register and every register
//! image loaded, and models the two interrupt enables so tests can decide
//! whether a simulated interrupt would actually be delivered.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::sync::Mutex;

use serial_engine::{
    ClockSource, Oversampling, SerialConfig, SerialHardware, SerialIrq, UsciRegisters,
};

pub struct MockUart {
    written: Mutex<Vec<u8>>,
    configured: Mutex<Vec<UsciRegisters>>,
    tx_irq: AtomicBool,
    rx_irq: AtomicBool,
    rx_register: AtomicU8,
    reads: AtomicUsize,
    busy_polls: AtomicUsize,
    ready_polls: AtomicUsize,
    written_while_busy: AtomicBool,
}

impl MockUart {
    pub fn new() -> Self {
        Self {
            written: Mutex::new(Vec::new()),
            configured: Mutex::new(Vec::new()),
            tx_irq: AtomicBool::new(false),
            rx_irq: AtomicBool::new(false),
            rx_register: AtomicU8::new(0),
            reads: AtomicUsize::new(0),
            busy_polls: AtomicUsize::new(0),
            ready_polls: AtomicUsize::new(0),
            written_while_busy: AtomicBool::new(false),
        }
    }

    pub fn written(&self) -> Vec<u8> {
        self.written.lock().unwrap().clone()
    }

    pub fn configurations(&self) -> Vec<UsciRegisters> {
        self.configured.lock().unwrap().clone()
    }

    pub fn tx_interrupt_enabled(&self) -> bool {
        self.tx_irq.load(Ordering::SeqCst)
    }

    pub fn rx_interrupt_enabled(&self) -> bool {
        self.rx_irq.load(Ordering::SeqCst)
    }

    /// Times the input register was read
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Report the output register busy for the next `polls` readiness checks
    pub fn hold_busy(&self, polls: usize) {
        self.busy_polls.store(polls, Ordering::SeqCst);
    }

    /// Readiness checks made so far
    pub fn ready_polls(&self) -> usize {
        self.ready_polls.load(Ordering::SeqCst)
    }

    /// Whether a byte was written while the output register was busy
    pub fn written_while_busy(&self) -> bool {
        self.written_while_busy.load(Ordering::SeqCst)
    }

    /// Latch a byte into the input register
    pub fn load_rx(&self, byte: u8) {
        self.rx_register.store(byte, Ordering::SeqCst);
    }
}

impl SerialHardware for MockUart {
    fn configure(&self, registers: &UsciRegisters) {
        self.configured.lock().unwrap().push(*registers);
    }

    fn transmit_ready(&self) -> bool {
        self.ready_polls.fetch_add(1, Ordering::SeqCst);
        self.busy_polls
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_err()
    }

    fn write_byte(&self, byte: u8) {
        if self.busy_polls.load(Ordering::SeqCst) > 0 {
            self.written_while_busy.store(true, Ordering::SeqCst);
        }
        self.written.lock().unwrap().push(byte);
    }

    fn read_byte(&self) -> u8 {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.rx_register.load(Ordering::SeqCst)
    }

    fn enable_transmit_interrupt(&self) {
        self.tx_irq.store(true, Ordering::SeqCst);
    }

    fn disable_transmit_interrupt(&self) {
        self.tx_irq.store(false, Ordering::SeqCst);
    }

    fn enable_receive_interrupt(&self) {
        self.rx_irq.store(true, Ordering::SeqCst);
    }

    fn disable_receive_interrupt(&self) {
        self.rx_irq.store(false, Ordering::SeqCst);
    }
}

/// 9600 baud from a 1 MHz SMCLK
pub fn config_9600() -> SerialConfig {
    SerialConfig::for_baud(ClockSource::Smclk, 1_000_000, 9600, Oversampling::Off).unwrap()
}

/// Deliver a received byte the way the port would: only if the receive
/// interrupt is enabled. Returns whether the interrupt fired.
pub fn deliver_rx(uart: &MockUart, irq: &mut SerialIrq<'_, '_, &MockUart>, byte: u8) -> bool {
    uart.load_rx(byte);
    if uart.rx_interrupt_enabled() {
        irq.on_receive_full();
        true
    } else {
        false
    }
}

/// Run transmit-complete interrupts until the port disables them
pub fn pump_tx(uart: &MockUart, irq: &mut SerialIrq<'_, '_, &MockUart>) {
    while uart.tx_interrupt_enabled() {
        irq.on_transmit_complete();
    }
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
