//! MSP430 USCI_A0 UART hardware interface
//!
//! Memory-mapped access to the USCI_A0 block in UART mode. The same block
//! drives the plain UART and the RS-485 transceiver.
//! Reference: MSP430x2xx Family User's Guide, USCI UART mode chapter

use core::ptr::{read_volatile, write_volatile};

use static_assertions::const_assert_eq;

use crate::hardware::SerialHardware;
use crate::registers::{Ctl1, Ie2, Ifg2, UsciRegisters};

/// Register offsets from the peripheral base (0 on the device itself)
pub const IE2: usize = 0x001; // Interrupt enable 2
pub const IFG2: usize = 0x003; // Interrupt flag 2
pub const UCA0CTL0: usize = 0x060; // Control 0
pub const UCA0CTL1: usize = 0x061; // Control 1
pub const UCA0BR0: usize = 0x062; // Baud rate divisor low
pub const UCA0BR1: usize = 0x063; // Baud rate divisor high
pub const UCA0MCTL: usize = 0x064; // Modulation control
pub const UCA0STAT: usize = 0x065; // Status
pub const UCA0RXBUF: usize = 0x066; // Receive buffer
pub const UCA0TXBUF: usize = 0x067; // Transmit buffer

/// Bytes of address space the register map covers from the base
pub const REGISTER_SPAN: usize = UCA0TXBUF + 1;

const_assert_eq!(UCA0TXBUF - UCA0CTL0, 7);

/// USCI_A0 UART driver
pub struct Msp430Usci {
    base: usize,
}

impl Msp430Usci {
    /// Create a new USCI_A0 driver
    ///
    /// # Safety
    /// `base + offset` must address the USCI_A0 and SFR registers for every
    /// offset in this module, for as long as the driver exists.
    pub const unsafe fn new(base: usize) -> Self {
        Self { base }
    }

    /// Driver for the registers at their device addresses
    ///
    /// # Safety
    /// Must only be used on an MSP430 with a USCI_A0 block, and only one
    /// instance may exist.
    pub const unsafe fn device() -> Self {
        Self { base: 0 }
    }

    /// Read a register
    #[inline]
    pub(crate) fn read_reg(&self, offset: usize) -> u8 {
        // SAFETY: `new` guarantees the address is a valid register
        unsafe { read_volatile((self.base + offset) as *const u8) }
    }

    /// Write a register
    #[inline]
    pub(crate) fn write_reg(&self, offset: usize, value: u8) {
        // SAFETY: `new` guarantees the address is a valid register
        unsafe { write_volatile((self.base + offset) as *mut u8, value) }
    }

    // IE2 is updated with read-modify-write from both contexts. If the
    // interrupt lands between the read and the write, the foreground may write
    // back a stale TXIE; the engine treats the resulting transmit interrupt as
    // spurious and disables it again.
    fn set_ie2(&self, bits: Ie2) {
        let current = Ie2::from_bits_retain(self.read_reg(IE2));
        self.write_reg(IE2, current.union(bits).bits());
    }

    fn clear_ie2(&self, bits: Ie2) {
        let current = Ie2::from_bits_retain(self.read_reg(IE2));
        self.write_reg(IE2, current.difference(bits).bits());
    }
}

impl SerialHardware for Msp430Usci {
    fn configure(&self, registers: &UsciRegisters) {
        // Hold in reset while the block is reprogrammed
        self.write_reg(UCA0CTL1, registers.ctl1.union(Ctl1::UCSWRST).bits());

        self.write_reg(UCA0CTL0, registers.ctl0.bits());
        self.write_reg(UCA0BR0, registers.br0);
        self.write_reg(UCA0BR1, registers.br1);
        self.write_reg(UCA0MCTL, registers.mctl.bits());

        // Release reset
        self.write_reg(UCA0CTL1, registers.ctl1.difference(Ctl1::UCSWRST).bits());
    }

    fn transmit_ready(&self) -> bool {
        Ifg2::from_bits_retain(self.read_reg(IFG2)).contains(Ifg2::UCA0TXIFG)
    }

    fn write_byte(&self, byte: u8) {
        self.write_reg(UCA0TXBUF, byte);
    }

    fn read_byte(&self) -> u8 {
        self.read_reg(UCA0RXBUF)
    }

    fn enable_transmit_interrupt(&self) {
        self.set_ie2(Ie2::UCA0TXIE);
    }

    fn disable_transmit_interrupt(&self) {
        self.clear_ie2(Ie2::UCA0TXIE);
    }

    fn enable_receive_interrupt(&self) {
        self.set_ie2(Ie2::UCA0RXIE);
    }

    fn disable_receive_interrupt(&self) {
        self.clear_ie2(Ie2::UCA0RXIE);
    }
}

// Registers are plain MMIO with no driver-side state
unsafe impl Send for Msp430Usci {}
unsafe impl Sync for Msp430Usci {}
