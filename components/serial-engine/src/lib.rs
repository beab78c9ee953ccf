//! Serial Engine - Interrupt-driven UART transmit/receive for USCI-style ports
//!
//! # Purpose
//! Buffers bytes between a foreground program and a serial port: outbound
//! bytes queue while the transmitter is busy and inbound bytes queue until the
//! program asks for them. The foreground never polls the port.
//!
//! # Integration Points
//! - Depends on: `serial-ring` (one FIFO per direction), `portable-atomic`
//!   (transmit token, receive flag, counters)
//! - Requires from the application: a `critical-section` implementation on
//!   targets without atomic CAS (msp430), e.g. the `msp430` crate's
//!   `critical-section-single-core` feature
//! - Provides to: console and terminal code (via [`SerialPort`] and
//!   [`ByteSink`]), and the port's interrupt vectors (via [`SerialIrq`])
//! - Hardware: anything implementing [`SerialHardware`]; [`Msp430Usci`]
//!   drives the MSP430 USCI_A0 block, which also feeds the RS-485 transceiver
//!
//! # Architecture
//! ```text
//!   SerialPort::send ──> tx FIFO ──> transmit-complete IRQ ──> output register
//!   SerialPort::receive <── rx FIFO <── receive-full IRQ <── input register
//! ```
//! [`SerialEngine::init`] validates a [`SerialConfig`], encodes it into a
//! [`UsciRegisters`] image and loads it. [`SerialEngine::split`] then hands out
//! exactly one foreground and one interrupt handle, which is what makes each
//! FIFO single-producer/single-consumer.
//!
//! # Testing Strategy
//! - Unit tests: baud arithmetic, register encoding, state transitions
//! - Integration tests: mock port with an interrupt thread (crossbeam), and
//!   the `static` + `critical_section::Mutex` ownership pattern
//! - Hardware sim tests: `Msp430Usci` against host memory

#![no_std]

#[cfg(test)]
#[macro_use]
extern crate std;

mod engine;
mod irq;
mod port;
mod sink;
mod stats;

pub mod config;
pub mod error;
pub mod hardware;
pub mod registers;
pub mod usci;

pub use config::{
    BitOrder, ClockSource, Oversampling, Parity, SerialConfig, StopBits, BAUD_TOLERANCE_PERCENT,
    MAX_FIRST_MODULATION, MAX_SECOND_MODULATION, MIN_DIVISOR_EIGHTHS, STANDARD_BAUD_RATES,
};
pub use engine::{SerialEngine, TxState, DEFAULT_BUFFER_SIZE};
pub use error::{ConfigError, Direction, ModulationStage, Result, SerialError};
pub use hardware::SerialHardware;
pub use irq::SerialIrq;
pub use port::SerialPort;
pub use registers::UsciRegisters;
pub use sink::{ByteSink, FnSink, SinkWriter};
pub use stats::{SerialStats, SerialStatsSnapshot};
pub use usci::Msp430Usci;

use static_assertions::assert_impl_all;

assert_impl_all!(SerialEngine<'static, Msp430Usci>: Sync, Send);
assert_impl_all!(SerialIrq<'static, 'static, Msp430Usci>: Send);
