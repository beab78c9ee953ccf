//! Serial line configuration
//!
//! A [`SerialConfig`] describes everything the USCI needs before it leaves
//! reset: clock source, baud-rate divisor, modulation, framing and sampling
//! mode. The fields map one to one onto register fields (see
//! [`crate::registers`]), but unlike the raw registers a config is checked
//! against the clock it runs from, so a wrong divisor is reported instead of
//! producing silently wrong bit timing.
//!
//! Baud-rate generation follows the USCI scheme:
//! - Low-frequency mode: `baud = f / (UCBR + UCBRS/8)`
//! - Oversampling mode:  `baud = f / (16 * UCBR + UCBRF)`

use crate::error::{ConfigError, ModulationStage};

/// Largest UCBRSx value (three bits)
pub const MAX_FIRST_MODULATION: u8 = 7;

/// Largest UCBRFx value (four bits)
pub const MAX_SECOND_MODULATION: u8 = 15;

/// The USCI needs at least three clocks per bit in low-frequency mode
/// (expressed in eighths of a clock, the resolution of UCBRSx)
pub const MIN_DIVISOR_EIGHTHS: u32 = 3 * 8;

/// Allowed deviation between programmed and expected baud rate, in percent
pub const BAUD_TOLERANCE_PERCENT: u64 = 5;

/// Rates a configuration without an expected baud must land near
pub const STANDARD_BAUD_RATES: [u32; 18] = [
    300, 600, 1200, 2400, 4800, 9600, 14_400, 19_200, 28_800, 38_400, 56_000, 57_600, 115_200,
    128_000, 230_400, 256_000, 460_800, 921_600,
];

/// Clock feeding the baud-rate generator (UCSSELx)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockSource {
    /// External UCLK pin
    Uclk,
    /// Auxiliary clock
    Aclk,
    /// Sub-main clock
    Smclk,
}

/// Parity mode (UCPEN/UCPAR)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Parity {
    #[default]
    None,
    Odd,
    Even,
}

/// Bit order on the wire (UCMSB)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BitOrder {
    #[default]
    LsbFirst,
    MsbFirst,
}

/// Number of stop bits (UCSPB)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopBits {
    #[default]
    One,
    Two,
}

/// Baud-rate generation mode (UCOS16)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Oversampling {
    /// Low-frequency mode, divisor refined by UCBRSx
    #[default]
    Off,
    /// 16x oversampling, divisor refined by UCBRFx
    On,
}

/// Serial port configuration, applied once by `SerialEngine::init`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerialConfig {
    /// Baud-rate generator clock
    pub clock_source: ClockSource,

    /// Frequency of `clock_source` in Hz
    pub clock_hz: u32,

    /// Divisor low byte (UCBR0)
    pub divisor_low: u8,

    /// Divisor high byte (UCBR1)
    pub divisor_high: u8,

    /// First modulation stage (UCBRSx, 0..=7)
    pub first_modulation: u8,

    /// Second modulation stage (UCBRFx, 0..=15, oversampling only)
    pub second_modulation: u8,

    pub parity: Parity,
    pub bit_order: BitOrder,
    pub stop_bits: StopBits,
    pub oversampling: Oversampling,

    /// Rate the divisor is meant to produce; checked by `validate` when set
    pub expected_baud: Option<u32>,
}

impl SerialConfig {
    /// Build a configuration from raw register values
    ///
    /// Stop bits default to one and no expected baud rate is recorded; use the
    /// `with_*` methods or `expecting_baud` to change either. Without an
    /// expected rate, `validate` requires the divisor to produce one of
    /// [`STANDARD_BAUD_RATES`] on `clock_hz`.
    #[allow(clippy::too_many_arguments)]
    pub const fn new(
        clock_source: ClockSource,
        clock_hz: u32,
        divisor_low: u8,
        divisor_high: u8,
        first_modulation: u8,
        second_modulation: u8,
        parity: Parity,
        bit_order: BitOrder,
        oversampling: Oversampling,
    ) -> Self {
        Self {
            clock_source,
            clock_hz,
            divisor_low,
            divisor_high,
            first_modulation,
            second_modulation,
            parity,
            bit_order,
            stop_bits: StopBits::One,
            oversampling,
            expected_baud: None,
        }
    }

    /// Compute divisor and modulation for `baud` from a `clock_hz` source
    ///
    /// Produces 8N1, LSB first. The result is validated, including the
    /// tolerance check against `baud`.
    ///
    /// # Errors
    /// - `ZeroClock` if `clock_hz` is zero
    /// - `BaudUnreachable` if `baud` is zero, faster than the clock allows,
    ///   or so slow the divisor overflows 16 bits
    /// - any error from [`SerialConfig::validate`]
    pub fn for_baud(
        clock_source: ClockSource,
        clock_hz: u32,
        baud: u32,
        oversampling: Oversampling,
    ) -> Result<Self, ConfigError> {
        if clock_hz == 0 {
            return Err(ConfigError::ZeroClock);
        }
        let unreachable = ConfigError::BaudUnreachable { clock_hz, baud };
        if baud == 0 {
            return Err(unreachable);
        }

        let clock = u64::from(clock_hz);
        let rate = u64::from(baud);

        let (whole, first, second) = match oversampling {
            Oversampling::Off => {
                // N = f / baud; UCBRS = round(frac(N) * 8)
                let mut whole = clock / rate;
                let mut frac = ((clock % rate) * 8 + rate / 2) / rate;
                if frac == 8 {
                    whole += 1;
                    frac = 0;
                }
                (whole, frac as u8, 0)
            }
            Oversampling::On => {
                // N/16 = f / (16 * baud); UCBRF = round(frac(N/16) * 16)
                let per_bit = 16 * rate;
                let mut whole = clock / per_bit;
                let mut frac = (clock % per_bit + rate / 2) / rate;
                if frac == 16 {
                    whole += 1;
                    frac = 0;
                }
                (whole, 0, frac as u8)
            }
        };

        if whole == 0 || whole > u64::from(u16::MAX) {
            return Err(unreachable);
        }

        let [divisor_low, divisor_high] = (whole as u16).to_le_bytes();
        let config = Self::new(
            clock_source,
            clock_hz,
            divisor_low,
            divisor_high,
            first,
            second,
            Parity::None,
            BitOrder::LsbFirst,
            oversampling,
        )
        .expecting_baud(baud);

        config.validate()?;
        Ok(config)
    }

    pub const fn with_parity(mut self, parity: Parity) -> Self {
        self.parity = parity;
        self
    }

    pub const fn with_bit_order(mut self, bit_order: BitOrder) -> Self {
        self.bit_order = bit_order;
        self
    }

    pub const fn with_stop_bits(mut self, stop_bits: StopBits) -> Self {
        self.stop_bits = stop_bits;
        self
    }

    /// Record the baud rate this configuration should produce
    pub const fn expecting_baud(mut self, baud: u32) -> Self {
        self.expected_baud = Some(baud);
        self
    }

    /// Full 16-bit divisor (UCBR1:UCBR0)
    pub const fn divisor(&self) -> u16 {
        u16::from_le_bytes([self.divisor_low, self.divisor_high])
    }

    /// Clocks per bit, in eighths of a clock
    pub fn divisor_eighths(&self) -> u32 {
        let divisor = u32::from(self.divisor());
        match self.oversampling {
            Oversampling::Off => divisor * 8 + u32::from(self.first_modulation),
            Oversampling::On => (divisor * 16 + u32::from(self.second_modulation)) * 8,
        }
    }

    /// Baud rate the programmed divisor actually produces
    ///
    /// Returns 0 for a zero divisor and saturates at `u32::MAX`.
    pub fn effective_baud(&self) -> u32 {
        let eighths = u64::from(self.divisor_eighths());
        if eighths == 0 {
            return 0;
        }
        u32::try_from(u64::from(self.clock_hz) * 8 / eighths).unwrap_or(u32::MAX)
    }

    /// Standard rate within tolerance of the effective baud, if any
    pub fn standard_baud(&self) -> Option<u32> {
        let actual = self.effective_baud();
        STANDARD_BAUD_RATES
            .iter()
            .copied()
            .find(|&rate| within_tolerance(actual, rate))
    }

    /// Check the configuration against the clock it runs from
    ///
    /// # Errors
    /// See [`ConfigError`]; the first failing check is reported.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.clock_hz == 0 {
            return Err(ConfigError::ZeroClock);
        }

        if self.first_modulation > MAX_FIRST_MODULATION {
            return Err(ConfigError::ModulationOutOfRange {
                stage: ModulationStage::First,
                value: self.first_modulation,
                max: MAX_FIRST_MODULATION,
            });
        }

        if self.second_modulation > MAX_SECOND_MODULATION {
            return Err(ConfigError::ModulationOutOfRange {
                stage: ModulationStage::Second,
                value: self.second_modulation,
                max: MAX_SECOND_MODULATION,
            });
        }

        if self.oversampling == Oversampling::Off && self.second_modulation != 0 {
            return Err(ConfigError::SecondStageWithoutOversampling);
        }

        if self.divisor() == 0 {
            return Err(ConfigError::ZeroDivisor);
        }

        let eighths = self.divisor_eighths();
        if eighths < MIN_DIVISOR_EIGHTHS {
            return Err(ConfigError::DivisorTooSmall {
                divisor_eighths: eighths,
            });
        }

        let actual = self.effective_baud();
        match self.expected_baud {
            Some(expected) if !within_tolerance(actual, expected) => {
                Err(ConfigError::BaudMismatch { expected, actual })
            }
            Some(_) => Ok(()),
            None if self.standard_baud().is_none() => Err(ConfigError::NonStandardBaud { actual }),
            None => Ok(()),
        }
    }
}

fn within_tolerance(actual: u32, target: u32) -> bool {
    let deviation = u64::from(actual.abs_diff(target));
    target != 0 && deviation * 100 <= u64::from(target) * BAUD_TOLERANCE_PERCENT
}
