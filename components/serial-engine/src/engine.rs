//! Serial transport engine
//!
//! One engine per physical port. It owns the outbound and inbound FIFOs and
//! the transmit state, and talks to the port only through [`SerialHardware`].
//!
//! # Transmit state machine
//! ```text
//!            send, FIFO empty: write output register, enable TX interrupt
//!   Idle ----------------------------------------------------------> Draining
//!    ^                                                                 |  ^
//!    |    TX complete, FIFO empty:                    send: enqueue    |  |
//!    +--- disable TX interrupt ----------------------------------------+--+
//!                                                TX complete: write next byte
//! ```
//!
//! The `transmitting` flag doubles as a token: whoever sets it (foreground
//! `send` on the Idle edge, or the drain step while Draining) is the only
//! context that pops the outbound FIFO. Releasing the token is always followed
//! by a re-check of the FIFO, so a byte queued while the drain step was
//! finishing is picked up by one side or the other and never stranded.
//!
//! # Contexts
//! [`SerialEngine::split`] yields a [`SerialPort`] for the foreground and a
//! [`SerialIrq`] for the interrupt vectors. Both borrow the engine, so it must
//! live as long as interrupts can fire (normally a `static`).

use core::hint::spin_loop;

use log::{debug, info, warn};
use portable_atomic::{fence, AtomicBool, Ordering};
use serial_ring::RingBuffer;

use crate::config::SerialConfig;
use crate::error::{ConfigError, Direction, Result, SerialError};
use crate::hardware::SerialHardware;
use crate::irq::SerialIrq;
use crate::port::SerialPort;
use crate::registers::UsciRegisters;
use crate::stats::{SerialStats, SerialStatsSnapshot};

/// Default FIFO size per direction
pub const DEFAULT_BUFFER_SIZE: usize = 32;

/// Transmit side state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxState {
    /// Nothing queued, nothing in flight, TX interrupt disabled
    Idle,
    /// Output register busy; the TX interrupt feeds it from the FIFO
    Draining,
}

/// Interrupt-driven serial engine for one port
pub struct SerialEngine<'a, H: SerialHardware> {
    name: &'static str,
    hardware: H,
    tx: RingBuffer<'a>,
    rx: RingBuffer<'a>,
    transmitting: AtomicBool,
    rx_armed: AtomicBool,
    config: Option<SerialConfig>,
    stats: SerialStats,
}

impl<'a, H: SerialHardware> SerialEngine<'a, H> {
    /// Create an engine over caller-owned FIFO storage
    ///
    /// The engine is unusable until [`SerialEngine::init`] succeeds.
    pub fn new(hardware: H, tx_storage: &'a mut [u8], rx_storage: &'a mut [u8]) -> Self {
        Self {
            name: "serial",
            hardware,
            tx: RingBuffer::new(tx_storage),
            rx: RingBuffer::new(rx_storage),
            transmitting: AtomicBool::new(false),
            rx_armed: AtomicBool::new(false),
            config: None,
            stats: SerialStats::new(),
        }
    }

    /// Name used to tag log records (e.g. "uart_a0", "rs485_a")
    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Configure the port and reset both FIFOs
    ///
    /// Must run before interrupts are enabled. Calling it again reconfigures
    /// the port and discards anything still queued in either direction. Both
    /// interrupt sources are left disabled; the receive side is armed with
    /// `SerialPort::enable_interrupts`.
    ///
    /// # Errors
    /// - `SerialError::Config` if the configuration fails validation or either
    ///   FIFO has zero capacity (a zero-capacity transmit FIFO would make
    ///   `send` spin forever)
    pub fn init(&mut self, config: SerialConfig) -> Result<()> {
        if let Err(err) = self.check(&config) {
            warn!("[{}] rejected configuration: {}", self.name, err);
            return Err(SerialError::Config(err));
        }

        self.hardware.disable_transmit_interrupt();
        self.hardware.disable_receive_interrupt();
        *self.rx_armed.get_mut() = false;

        let pending = self.tx.len() + self.rx.len();
        if pending > 0 || *self.transmitting.get_mut() {
            debug!("[{}] re-init discards {} pending byte(s)", self.name, pending);
        }
        self.tx.reset();
        self.rx.reset();
        *self.transmitting.get_mut() = false;
        self.stats.reset();

        self.hardware.configure(&UsciRegisters::from_config(&config));
        self.config = Some(config);

        info!(
            "[{}] {} baud ({:?}, {:?} parity, {:?}, {:?} stop bit), buffers tx={} rx={}",
            self.name,
            config.effective_baud(),
            config.clock_source,
            config.parity,
            config.bit_order,
            config.stop_bits,
            self.tx.capacity(),
            self.rx.capacity(),
        );
        Ok(())
    }

    fn check(&self, config: &SerialConfig) -> core::result::Result<(), ConfigError> {
        config.validate()?;
        if self.tx.capacity() == 0 {
            return Err(ConfigError::ZeroCapacity {
                direction: Direction::Transmit,
            });
        }
        if self.rx.capacity() == 0 {
            return Err(ConfigError::ZeroCapacity {
                direction: Direction::Receive,
            });
        }
        Ok(())
    }

    /// Hand out the foreground and interrupt halves
    ///
    /// # Errors
    /// - `SerialError::NotInitialized` if `init` has not succeeded
    pub fn split(&mut self) -> Result<(SerialPort<'_, 'a, H>, SerialIrq<'_, 'a, H>)> {
        if self.config.is_none() {
            return Err(SerialError::NotInitialized);
        }
        let engine: &Self = self;
        Ok((SerialPort::new(engine), SerialIrq::new(engine)))
    }

    /// Configuration applied by the last successful `init`
    pub fn config(&self) -> Option<&SerialConfig> {
        self.config.as_ref()
    }

    pub fn is_initialized(&self) -> bool {
        self.config.is_some()
    }

    pub fn state(&self) -> TxState {
        if self.transmitting.load(Ordering::SeqCst) {
            TxState::Draining
        } else {
            TxState::Idle
        }
    }

    pub fn stats(&self) -> SerialStatsSnapshot {
        self.stats.snapshot()
    }

    pub fn hardware(&self) -> &H {
        &self.hardware
    }

    /// Bytes waiting in the outbound FIFO (not counting the one in flight)
    pub fn tx_pending(&self) -> usize {
        self.tx.len()
    }

    /// Bytes waiting in the inbound FIFO
    pub fn rx_available(&self) -> usize {
        self.rx.len()
    }

    pub(crate) fn raw_stats(&self) -> &SerialStats {
        &self.stats
    }

    // ---------------------------------------------------------------------
    // Foreground side, reached through the single SerialPort
    // ---------------------------------------------------------------------

    /// Queue one byte, blocking while the outbound FIFO is full
    pub(crate) fn send(&self, byte: u8) {
        if self.claim_transmitter() {
            // SAFETY: holding the token makes this context the only consumer
            match unsafe { self.tx.try_pop() } {
                None => {
                    // Idle with an empty FIFO: straight to the output register
                    self.start_transmit(byte);
                    return;
                }
                // Older bytes left behind by a drain step that went idle
                // have to go out first
                Some(older) => self.start_transmit(older),
            }
        }

        while self.tx.is_full() {
            spin_loop();
        }
        // SAFETY: SerialPort is unique, so this is the only producer
        unsafe { self.tx.push(byte) };
        fence(Ordering::SeqCst);

        // The drain step may have found the FIFO empty and released the token
        // before the push landed
        if self.claim_transmitter() {
            // SAFETY: holding the token makes this context the only consumer
            match unsafe { self.tx.try_pop() } {
                Some(next) => self.start_transmit(next),
                None => self.release_transmitter(),
            }
        }
    }

    pub(crate) fn try_receive(&self) -> Option<u8> {
        // SAFETY: SerialPort is unique, so this is the only consumer
        unsafe { self.rx.try_pop() }
    }

    pub(crate) fn arm_receive(&self) {
        self.rx_armed.store(true, Ordering::Release);
        self.hardware.enable_receive_interrupt();
        debug!("[{}] receive interrupt enabled", self.name);
    }

    pub(crate) fn disarm_receive(&self) {
        self.hardware.disable_receive_interrupt();
        self.rx_armed.store(false, Ordering::Release);
        debug!("[{}] receive interrupt disabled", self.name);
    }

    pub(crate) fn receive_armed(&self) -> bool {
        self.rx_armed.load(Ordering::Acquire)
    }

    // ---------------------------------------------------------------------
    // Interrupt side, reached through the single SerialIrq. No logging here.
    // ---------------------------------------------------------------------

    /// Output register emptied: feed the next byte or go idle
    pub(crate) fn transmit_complete(&self) {
        if !self.transmitting.load(Ordering::SeqCst) {
            // Spurious, e.g. a TX enable written back stale by the foreground
            self.hardware.disable_transmit_interrupt();
            return;
        }

        // SAFETY: the token is held while Draining, so this is the only consumer
        match unsafe { self.tx.try_pop() } {
            Some(byte) => {
                self.hardware.write_byte(byte);
                self.stats.record_sent();
            }
            None => {
                self.hardware.disable_transmit_interrupt();
                self.release_transmitter();
            }
        }
    }

    /// Input register filled: queue the byte or count it as dropped
    pub(crate) fn receive_full(&self) {
        // Reading clears the hardware condition even when the byte is discarded
        let byte = self.hardware.read_byte();
        if !self.rx_armed.load(Ordering::Acquire) {
            return;
        }

        // SAFETY: SerialIrq is unique, so this is the only producer
        if unsafe { self.rx.push(byte) } {
            self.stats.record_received();
        } else {
            self.stats.record_dropped();
        }
    }

    // ---------------------------------------------------------------------
    // Transmit token
    // ---------------------------------------------------------------------

    fn claim_transmitter(&self) -> bool {
        self.transmitting
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Token holder: give the token up, taking it back if a byte slipped in
    fn release_transmitter(&self) {
        loop {
            self.transmitting.store(false, Ordering::SeqCst);
            fence(Ordering::SeqCst);

            if self.tx.is_empty() || !self.claim_transmitter() {
                return;
            }
            // SAFETY: token re-acquired, so this is the only consumer
            if let Some(byte) = unsafe { self.tx.try_pop() } {
                self.start_transmit(byte);
                return;
            }
        }
    }

    /// Token holder: put `byte` in the output register and arm the drain step
    fn start_transmit(&self, byte: u8) {
        while !self.hardware.transmit_ready() {
            spin_loop();
        }
        self.hardware.write_byte(byte);
        self.stats.record_sent();
        self.hardware.enable_transmit_interrupt();
    }
}

impl<H: SerialHardware> core::fmt::Debug for SerialEngine<'_, H> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SerialEngine")
            .field("name", &self.name)
            .field("state", &self.state())
            .field("tx", &self.tx)
            .field("rx", &self.rx)
            .field("config", &self.config)
            .finish()
    }
}
