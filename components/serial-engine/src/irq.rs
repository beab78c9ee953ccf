//! Interrupt half of a serial engine
//!
//! The handle lives in a `static` the vectors can reach, guarded by a
//! `critical_section::Mutex`:
//!
//! ```ignore
//! use core::cell::RefCell;
//! use critical_section::Mutex;
//!
//! type UartIrq = SerialIrq<'static, 'static, Msp430Usci>;
//!
//! static SERIAL_IRQ: Mutex<RefCell<Option<UartIrq>>> = Mutex::new(RefCell::new(None));
//!
//! fn start(engine: &'static mut SerialEngine<'static, Msp430Usci>) -> Result<()> {
//!     engine.init(config)?;
//!     let (mut port, irq) = engine.split()?;
//!     critical_section::with(|cs| *SERIAL_IRQ.borrow_ref_mut(cs) = Some(irq));
//!     port.enable_interrupts();
//!     // ... hand `port` to the foreground
//!     Ok(())
//! }
//!
//! #[interrupt]
//! fn USCIAB0TX() {
//!     critical_section::with(|cs| {
//!         if let Some(irq) = SERIAL_IRQ.borrow_ref_mut(cs).as_mut() {
//!             irq.on_transmit_complete();
//!         }
//!     });
//! }
//!
//! #[interrupt]
//! fn USCIAB0RX() {
//!     critical_section::with(|cs| {
//!         if let Some(irq) = SERIAL_IRQ.borrow_ref_mut(cs).as_mut() {
//!             irq.on_receive_full();
//!         }
//!     });
//! }
//! ```
//!
//! Both entry points run in bounded time, never block on the foreground and
//! never log.

use crate::engine::SerialEngine;
use crate::hardware::SerialHardware;

/// Interrupt-context handle
///
/// Exactly one exists per engine: the only consumer of the outbound FIFO
/// while draining and the only producer of the inbound one.
pub struct SerialIrq<'e, 'a, H: SerialHardware> {
    engine: &'e SerialEngine<'a, H>,
}

impl<'e, 'a, H: SerialHardware> SerialIrq<'e, 'a, H> {
    pub(crate) fn new(engine: &'e SerialEngine<'a, H>) -> Self {
        Self { engine }
    }

    /// Transmit-complete interrupt
    ///
    /// Feeds the next queued byte to the output register, or disables the
    /// transmit interrupt and returns to Idle when the FIFO is empty.
    pub fn on_transmit_complete(&mut self) {
        self.engine.transmit_complete();
    }

    /// Receive-full interrupt
    ///
    /// Always reads the input register. The byte is queued when receive is
    /// armed and there is room, and counted as dropped when the FIFO is full.
    pub fn on_receive_full(&mut self) {
        self.engine.receive_full();
    }
}

impl<H: SerialHardware> core::fmt::Debug for SerialIrq<'_, '_, H> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SerialIrq")
            .field("engine", &self.engine.name())
            .finish()
    }
}
