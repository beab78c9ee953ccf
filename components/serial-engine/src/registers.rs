//! USCI_A register encoding
//!
//! Bit layouts for the UART-mode control, modulation and interrupt registers,
//! and the translation from a [`SerialConfig`] into register values.

use bitflags::bitflags;

use crate::config::{BitOrder, ClockSource, Oversampling, Parity, SerialConfig, StopBits};

bitflags! {
    /// UCAxCTL0 - framing control
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Ctl0: u8 {
        /// Parity enable
        const UCPEN  = 1 << 7;
        /// Even parity (odd when clear)
        const UCPAR  = 1 << 6;
        /// MSB first
        const UCMSB  = 1 << 5;
        /// 7-bit characters
        const UC7BIT = 1 << 4;
        /// Two stop bits
        const UCSPB  = 1 << 3;
        /// Synchronous mode (never set in UART mode)
        const UCSYNC = 1 << 0;
    }
}

bitflags! {
    /// UCAxCTL1 - clock select and software reset
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Ctl1: u8 {
        const UCSSEL1 = 1 << 7;
        const UCSSEL0 = 1 << 6;
        /// Hold the USCI in reset while it is configured
        const UCSWRST = 1 << 0;

        const UCSSEL_UCLK  = 0;
        const UCSSEL_ACLK  = Self::UCSSEL0.bits();
        const UCSSEL_SMCLK = Self::UCSSEL1.bits();
    }
}

bitflags! {
    /// UCAxMCTL - modulation control
    ///
    /// UCBRFx occupies bits 7..4 and UCBRSx bits 3..1; see
    /// [`UsciRegisters::mctl`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Mctl: u8 {
        /// 16x oversampling
        const UCOS16 = 1 << 0;

        const _ = !0;
    }
}

bitflags! {
    /// IE2 - USCI_A0 interrupt enables (shared with USCI_B0)
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Ie2: u8 {
        const UCA0RXIE = 1 << 0;
        const UCA0TXIE = 1 << 1;
        const UCB0RXIE = 1 << 2;
        const UCB0TXIE = 1 << 3;
    }
}

bitflags! {
    /// IFG2 - USCI_A0 interrupt flags (shared with USCI_B0)
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Ifg2: u8 {
        /// Receive buffer full
        const UCA0RXIFG = 1 << 0;
        /// Transmit buffer empty
        const UCA0TXIFG = 1 << 1;
        const UCB0RXIFG = 1 << 2;
        const UCB0TXIFG = 1 << 3;
    }
}

const UCBRF_SHIFT: u8 = 4;
const UCBRS_SHIFT: u8 = 1;

impl ClockSource {
    /// UCSSELx field value
    pub const fn bits(self) -> Ctl1 {
        match self {
            ClockSource::Uclk => Ctl1::UCSSEL_UCLK,
            ClockSource::Aclk => Ctl1::UCSSEL_ACLK,
            ClockSource::Smclk => Ctl1::UCSSEL_SMCLK,
        }
    }
}

impl Parity {
    pub const fn bits(self) -> Ctl0 {
        match self {
            Parity::None => Ctl0::empty(),
            Parity::Odd => Ctl0::UCPEN,
            Parity::Even => Ctl0::UCPEN.union(Ctl0::UCPAR),
        }
    }
}

impl BitOrder {
    pub const fn bits(self) -> Ctl0 {
        match self {
            BitOrder::LsbFirst => Ctl0::empty(),
            BitOrder::MsbFirst => Ctl0::UCMSB,
        }
    }
}

impl StopBits {
    pub const fn bits(self) -> Ctl0 {
        match self {
            StopBits::One => Ctl0::empty(),
            StopBits::Two => Ctl0::UCSPB,
        }
    }
}

impl Oversampling {
    pub const fn bits(self) -> Mctl {
        match self {
            Oversampling::Off => Mctl::empty(),
            Oversampling::On => Mctl::UCOS16,
        }
    }
}

/// Register image for one USCI_A block in UART mode
///
/// `ctl1` carries the clock select with UCSWRST clear; backends set UCSWRST
/// themselves while writing the other registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsciRegisters {
    pub ctl0: Ctl0,
    pub ctl1: Ctl1,
    pub br0: u8,
    pub br1: u8,
    pub mctl: Mctl,
}

impl UsciRegisters {
    /// Encode a configuration
    ///
    /// The configuration is expected to be validated already; out-of-range
    /// modulation values are masked to their field width.
    pub fn from_config(config: &SerialConfig) -> Self {
        let ctl0 = config
            .parity
            .bits()
            .union(config.bit_order.bits())
            .union(config.stop_bits.bits());

        let mctl = Mctl::from_bits_retain(
            ((config.second_modulation & 0x0F) << UCBRF_SHIFT)
                | ((config.first_modulation & 0x07) << UCBRS_SHIFT),
        )
        .union(config.oversampling.bits());

        Self {
            ctl0,
            ctl1: config.clock_source.bits(),
            br0: config.divisor_low,
            br1: config.divisor_high,
            mctl,
        }
    }

    /// UCBRSx field
    pub fn first_modulation(&self) -> u8 {
        (self.mctl.bits() >> UCBRS_SHIFT) & 0x07
    }

    /// UCBRFx field
    pub fn second_modulation(&self) -> u8 {
        self.mctl.bits() >> UCBRF_SHIFT
    }
}
