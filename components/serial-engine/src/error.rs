//! Error types for the serial engine
//!
//! Only foreground operations report errors. The interrupt entry points have no
//! caller to report to, so they degrade to a counted drop or a no-op instead.

use thiserror::Error;

/// Transfer direction, used to say which buffer a configuration error is about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Transmit,
    Receive,
}

impl core::fmt::Display for Direction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Direction::Transmit => f.write_str("transmit"),
            Direction::Receive => f.write_str("receive"),
        }
    }
}

/// Modulation stage named in [`ConfigError::ModulationOutOfRange`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModulationStage {
    /// UCBRSx, three bits
    First,
    /// UCBRFx, four bits
    Second,
}

/// Rejected serial configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Clock frequency must be non-zero")]
    ZeroClock,

    #[error("Baud rate divisor must be non-zero")]
    ZeroDivisor,

    #[error("Modulation stage {stage:?} value {value} exceeds {max}")]
    ModulationOutOfRange {
        stage: ModulationStage,
        value: u8,
        max: u8,
    },

    #[error("Second modulation stage is only used with oversampling enabled")]
    SecondStageWithoutOversampling,

    #[error("Divisor {divisor_eighths}/8 is below the 3 clocks per bit the USCI needs")]
    DivisorTooSmall { divisor_eighths: u32 },

    #[error("Programmed divisor gives {actual} baud, expected {expected}")]
    BaudMismatch { expected: u32, actual: u32 },

    #[error("Programmed divisor gives {actual} baud, which is not a standard rate")]
    NonStandardBaud { actual: u32 },

    #[error("{baud} baud cannot be generated from a {clock_hz} Hz clock")]
    BaudUnreachable { clock_hz: u32, baud: u32 },

    #[error("The {direction} buffer has zero capacity")]
    ZeroCapacity { direction: Direction },
}

/// Error types for serial engine operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SerialError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Serial engine used before init")]
    NotInitialized,
}

pub type Result<T> = core::result::Result<T, SerialError>;
