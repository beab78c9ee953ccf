//! Hardware access seam
//!
//! The engine drives a port exclusively through [`SerialHardware`], so one
//! engine implementation serves every physical port: the USCI_A0 UART, the
//! RS-485 transceiver wired to the same block, or a test double.
//!
//! All methods take `&self`. Registers are shared between the foreground and
//! the interrupt handlers by nature, and implementations are `Sync` so the
//! engine can be reached from both.

use crate::registers::UsciRegisters;

/// Register-level access to one serial port
pub trait SerialHardware: Sync {
    /// Load a register image
    ///
    /// Must hold the block in software reset while writing and release it
    /// afterwards. Called with both interrupts disabled.
    fn configure(&self, registers: &UsciRegisters);

    /// Output register can accept a byte
    fn transmit_ready(&self) -> bool;

    /// Write the output register, starting transmission of `byte`
    fn write_byte(&self, byte: u8);

    /// Read the input register (clears the receive-full condition)
    fn read_byte(&self) -> u8;

    fn enable_transmit_interrupt(&self);
    fn disable_transmit_interrupt(&self);

    fn enable_receive_interrupt(&self);
    fn disable_receive_interrupt(&self);
}

impl<T: SerialHardware + ?Sized> SerialHardware for &T {
    fn configure(&self, registers: &UsciRegisters) {
        (**self).configure(registers)
    }

    fn transmit_ready(&self) -> bool {
        (**self).transmit_ready()
    }

    fn write_byte(&self, byte: u8) {
        (**self).write_byte(byte)
    }

    fn read_byte(&self) -> u8 {
        (**self).read_byte()
    }

    fn enable_transmit_interrupt(&self) {
        (**self).enable_transmit_interrupt()
    }

    fn disable_transmit_interrupt(&self) {
        (**self).disable_transmit_interrupt()
    }

    fn enable_receive_interrupt(&self) {
        (**self).enable_receive_interrupt()
    }

    fn disable_receive_interrupt(&self) {
        (**self).disable_receive_interrupt()
    }
}
