//! Serial engine against a mock port
//!
//! Single-threaded tests drive the interrupt handle by hand. The threaded
//! tests put the foreground and the interrupt handle on separate threads,
//! which overlaps the two contexts more aggressively than a single core can.

mod common;

use std::cell::RefCell;
use std::fmt::Write as _;
use std::sync::atomic::{AtomicBool, Ordering};

use common::{config_9600, deliver_rx, init_logging, pump_tx, MockUart};
use critical_section::Mutex;
use serial_engine::{
    BitOrder, ByteSink, ClockSource, ConfigError, Direction, Oversampling, Parity, SerialConfig,
    SerialEngine, SerialError, SerialIrq, SerialStatsSnapshot, SinkWriter, TxState,
    DEFAULT_BUFFER_SIZE,
};

#[test]
fn test_send_idle_draining_idle() {
    init_logging();
    let uart = MockUart::new();
    let mut tx = [0u8; 4];
    let mut rx = [0u8; 4];
    let mut engine = SerialEngine::new(&uart, &mut tx, &mut rx);
    engine.init(config_9600()).unwrap();
    let (mut serial, mut irq) = engine.split().unwrap();

    assert_eq!(serial.state(), TxState::Idle);
    assert!(!uart.tx_interrupt_enabled());

    serial.send(0x41);
    assert_eq!(uart.written(), [0x41]);
    assert_eq!(serial.state(), TxState::Draining);
    assert!(uart.tx_interrupt_enabled());

    irq.on_transmit_complete();
    assert_eq!(serial.state(), TxState::Idle);
    assert!(!uart.tx_interrupt_enabled());
    assert_eq!(uart.written(), [0x41]);
    assert_eq!(serial.stats().bytes_sent, 1);
}

#[test]
fn test_queued_bytes_keep_order() {
    let uart = MockUart::new();
    let mut tx = [0u8; 4];
    let mut rx = [0u8; 4];
    let mut engine = SerialEngine::new(&uart, &mut tx, &mut rx);
    engine.init(config_9600()).unwrap();

    {
        let (mut serial, mut irq) = engine.split().unwrap();

        // First byte goes straight out, the next four fill the FIFO
        serial.send_all(&[1, 2, 3, 4, 5]);
        assert_eq!(uart.written(), [1]);

        pump_tx(&uart, &mut irq);
        assert_eq!(uart.written(), [1, 2, 3, 4, 5]);
        assert_eq!(serial.state(), TxState::Idle);
    }
    assert_eq!(engine.tx_pending(), 0);
}

#[test]
fn test_send_after_drain_restarts_directly() {
    let uart = MockUart::new();
    let mut tx = [0u8; 4];
    let mut rx = [0u8; 4];
    let mut engine = SerialEngine::new(&uart, &mut tx, &mut rx);
    engine.init(config_9600()).unwrap();
    let (mut serial, mut irq) = engine.split().unwrap();

    serial.send(b'a');
    serial.send(b'b');
    pump_tx(&uart, &mut irq);
    assert_eq!(serial.state(), TxState::Idle);

    serial.send(b'c');
    assert_eq!(uart.written(), b"abc");
    assert!(uart.tx_interrupt_enabled());
    pump_tx(&uart, &mut irq);
    assert_eq!(serial.stats().bytes_sent, 3);
}

/// A full FIFO blocks `send` until the interrupt side makes room
#[test]
fn test_blocking_send_with_interrupt_thread() {
    init_logging();
    const TOTAL: usize = 20_000;

    let uart = MockUart::new();
    let mut tx = [0u8; DEFAULT_BUFFER_SIZE];
    let mut rx = [0u8; DEFAULT_BUFFER_SIZE];
    let mut engine = SerialEngine::new(&uart, &mut tx, &mut rx).with_name("uart_a0");
    engine.init(config_9600()).unwrap();

    let payload: Vec<u8> = (0..TOTAL).map(|i| (i * 7) as u8).collect();
    let done = AtomicBool::new(false);

    {
        let (mut serial, mut irq) = engine.split().unwrap();
        let uart = &uart;
        let done = &done;
        let payload = &payload;

        crossbeam::thread::scope(|s| {
            s.spawn(move |_| {
                loop {
                    if uart.tx_interrupt_enabled() {
                        irq.on_transmit_complete();
                    } else if done.load(Ordering::SeqCst) {
                        break;
                    } else {
                        std::hint::spin_loop();
                    }
                }
            });

            s.spawn(move |_| {
                serial.send_all(payload);
                serial.flush();
                assert_eq!(serial.state(), TxState::Idle);
                done.store(true, Ordering::SeqCst);
            });
        })
        .unwrap();
    }

    assert_eq!(uart.written(), payload);
    assert_eq!(engine.state(), TxState::Idle);
    assert_eq!(engine.tx_pending(), 0);
    assert!(!uart.tx_interrupt_enabled());
    assert_eq!(engine.stats().bytes_sent, TOTAL);
}

/// Whenever the transmitter reports Idle, nothing is left queued
#[test]
fn test_idle_implies_empty_fifo() {
    let uart = MockUart::new();
    let mut tx = [0u8; 3];
    let mut rx = [0u8; 3];
    let mut engine = SerialEngine::new(&uart, &mut tx, &mut rx);
    engine.init(config_9600()).unwrap();

    let mut sent = Vec::new();
    for round in 0..50u8 {
        let burst = (round % 4) as usize;
        {
            let (mut serial, mut irq) = engine.split().unwrap();
            for i in 0..burst {
                let byte = round.wrapping_mul(16).wrapping_add(i as u8);
                serial.send(byte);
                sent.push(byte);
            }
            // Drain partially, then completely
            if uart.tx_interrupt_enabled() {
                irq.on_transmit_complete();
            }
        }
        if engine.state() == TxState::Idle {
            assert_eq!(engine.tx_pending(), 0);
        }
        {
            let (_serial, mut irq) = engine.split().unwrap();
            pump_tx(&uart, &mut irq);
        }
        assert_eq!(engine.state(), TxState::Idle);
        assert_eq!(engine.tx_pending(), 0);
    }
    assert_eq!(uart.written(), sent);
}

#[test]
fn test_receive_queues_in_order() {
    let uart = MockUart::new();
    let mut tx = [0u8; 4];
    let mut rx = [0u8; 4];
    let mut engine = SerialEngine::new(&uart, &mut tx, &mut rx);
    engine.init(config_9600()).unwrap();
    let (mut serial, mut irq) = engine.split().unwrap();

    serial.enable_interrupts();
    assert!(uart.rx_interrupt_enabled());
    assert!(serial.interrupts_enabled());

    assert!(deliver_rx(&uart, &mut irq, b'h'));
    assert!(deliver_rx(&uart, &mut irq, b'i'));
    assert_eq!(serial.bytes_available(), 2);

    assert_eq!(serial.receive(), b'h');
    assert_eq!(serial.try_receive(), Some(b'i'));
    assert_eq!(serial.try_receive(), None);
    // Empty FIFO reads as 0
    assert_eq!(serial.receive(), 0);
}

#[test]
fn test_receive_overrun_drops_newest() {
    init_logging();
    let uart = MockUart::new();
    let mut tx = [0u8; 4];
    let mut rx = [0u8; 4];
    let mut engine = SerialEngine::new(&uart, &mut tx, &mut rx);
    engine.init(config_9600()).unwrap();
    let (mut serial, mut irq) = engine.split().unwrap();
    serial.enable_interrupts();

    for byte in 10..16u8 {
        deliver_rx(&uart, &mut irq, byte);
    }
    // Every interrupt reads the register, even for dropped bytes
    assert_eq!(uart.reads(), 6);
    assert_eq!(
        serial.stats(),
        SerialStatsSnapshot {
            bytes_sent: 0,
            bytes_received: 4,
            rx_dropped: 2,
        }
    );

    let mut buf = [0u8; 8];
    assert_eq!(serial.read(&mut buf), 4);
    assert_eq!(&buf[..4], &[10, 11, 12, 13]);
    assert_eq!(serial.bytes_available(), 0);

    // Room again: new bytes are accepted
    deliver_rx(&uart, &mut irq, 99);
    assert_eq!(serial.receive(), 99);
    assert_eq!(serial.stats().rx_dropped, 2);
}

/// Disabling interrupts must turn the receive interrupt off, not on
#[test]
fn test_disable_interrupts_clears_receive_enable() {
    let uart = MockUart::new();
    let mut tx = [0u8; 4];
    let mut rx = [0u8; 4];
    let mut engine = SerialEngine::new(&uart, &mut tx, &mut rx);
    engine.init(config_9600()).unwrap();
    let (mut serial, mut irq) = engine.split().unwrap();

    serial.enable_interrupts();
    deliver_rx(&uart, &mut irq, 1);

    serial.disable_interrupts();
    assert!(!uart.rx_interrupt_enabled());
    assert!(!serial.interrupts_enabled());

    // Not delivered while disabled
    assert!(!deliver_rx(&uart, &mut irq, 2));

    // A stray receive interrupt still clears the register but queues nothing
    let reads = uart.reads();
    uart.load_rx(3);
    irq.on_receive_full();
    assert_eq!(uart.reads(), reads + 1);

    // Bytes queued before disabling stay readable
    assert_eq!(serial.bytes_available(), 1);
    assert_eq!(serial.receive(), 1);
    assert_eq!(serial.try_receive(), None);

    serial.enable_interrupts();
    assert!(uart.rx_interrupt_enabled());
}

#[test]
fn test_receive_ignored_before_enable() {
    let uart = MockUart::new();
    let mut tx = [0u8; 4];
    let mut rx = [0u8; 4];
    let mut engine = SerialEngine::new(&uart, &mut tx, &mut rx);
    engine.init(config_9600()).unwrap();
    let (mut serial, mut irq) = engine.split().unwrap();

    assert!(!uart.rx_interrupt_enabled());
    uart.load_rx(0x55);
    irq.on_receive_full();
    assert_eq!(serial.bytes_available(), 0);
    assert_eq!(serial.try_receive(), None);
}

/// Bytes arriving faster than they are read are either queued in order or
/// counted as dropped
#[test]
fn test_concurrent_receive_accounts_for_every_byte() {
    const TOTAL: usize = 10_000;

    let uart = MockUart::new();
    let mut tx = [0u8; 8];
    let mut rx = [0u8; 8];
    let mut engine = SerialEngine::new(&uart, &mut tx, &mut rx);
    engine.init(config_9600()).unwrap();

    let finished = AtomicBool::new(false);
    let received = {
        let (mut serial, mut irq) = engine.split().unwrap();
        serial.enable_interrupts();
        let uart = &uart;
        let finished = &finished;

        crossbeam::thread::scope(|s| {
            s.spawn(move |_| {
                for i in 0..TOTAL {
                    deliver_rx(uart, &mut irq, i as u8);
                }
                finished.store(true, Ordering::SeqCst);
            });

            let reader = s.spawn(move |_| {
                let mut out = Vec::new();
                loop {
                    match serial.try_receive() {
                        Some(byte) => out.push(byte),
                        None if finished.load(Ordering::SeqCst) && serial.bytes_available() == 0 => {
                            break
                        }
                        None => std::hint::spin_loop(),
                    }
                }
                out
            });

            reader.join().unwrap()
        })
        .unwrap()
    };

    let stats = engine.stats();
    assert_eq!(received.len() + stats.rx_dropped, TOTAL);
    assert_eq!(stats.bytes_received, received.len());

    // Received bytes form an in-order subsequence of what was sent
    let mut next = 0usize;
    for byte in received {
        while (next as u8) != byte {
            next += 1;
            assert!(next < TOTAL, "byte {} out of order", byte);
        }
        next += 1;
    }
}

#[test]
fn test_zero_capacity_rejected() {
    let uart = MockUart::new();
    let mut tx = [0u8; 4];
    let mut rx: [u8; 0] = [];
    let mut engine = SerialEngine::new(&uart, &mut tx, &mut rx);

    let err = engine.init(config_9600()).unwrap_err();
    assert_eq!(
        err,
        SerialError::Config(ConfigError::ZeroCapacity {
            direction: Direction::Receive
        })
    );
    assert!(uart.configurations().is_empty());
    assert!(matches!(engine.split(), Err(SerialError::NotInitialized)));
}

#[test]
fn test_invalid_config_rejected() {
    let uart = MockUart::new();
    let mut tx = [0u8; 4];
    let mut rx = [0u8; 4];
    let mut engine = SerialEngine::new(&uart, &mut tx, &mut rx);

    let config = config_9600().expecting_baud(115_200);
    assert!(matches!(
        engine.init(config),
        Err(SerialError::Config(ConfigError::BaudMismatch {
            expected: 115_200,
            ..
        }))
    ));
    assert!(!engine.is_initialized());
}

#[test]
fn test_init_loads_register_image() {
    let uart = MockUart::new();
    let mut tx = [0u8; 4];
    let mut rx = [0u8; 4];
    let mut engine = SerialEngine::new(&uart, &mut tx, &mut rx);
    engine.init(config_9600()).unwrap();

    let loaded = uart.configurations();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].br0, 104);
    assert_eq!(loaded[0].br1, 0);
    assert_eq!(loaded[0].first_modulation(), 1);
    assert_eq!(engine.config().map(SerialConfig::effective_baud), Some(9603));
}

#[test]
fn test_reinit_discards_pending_bytes() {
    init_logging();
    let uart = MockUart::new();
    let mut tx = [0u8; 4];
    let mut rx = [0u8; 4];
    let mut engine = SerialEngine::new(&uart, &mut tx, &mut rx);
    engine.init(config_9600()).unwrap();

    {
        let (mut serial, mut irq) = engine.split().unwrap();
        serial.enable_interrupts();
        serial.send_all(b"xyz");
        deliver_rx(&uart, &mut irq, b'q');
    }
    assert_eq!(engine.tx_pending(), 2);
    assert_eq!(engine.rx_available(), 1);

    engine.init(config_9600()).unwrap();
    assert_eq!(engine.state(), TxState::Idle);
    assert_eq!(engine.tx_pending(), 0);
    assert_eq!(engine.rx_available(), 0);
    assert!(!uart.tx_interrupt_enabled());
    assert!(!uart.rx_interrupt_enabled());
    assert_eq!(uart.configurations().len(), 2);

    // Receive has to be re-armed after init
    let (serial, _irq) = engine.split().unwrap();
    assert!(!serial.interrupts_enabled());
}

#[test]
fn test_formatted_output() {
    let uart = MockUart::new();
    let mut tx = [0u8; DEFAULT_BUFFER_SIZE];
    let mut rx = [0u8; 4];
    let mut engine = SerialEngine::new(&uart, &mut tx, &mut rx);
    engine.init(config_9600()).unwrap();
    let (mut serial, mut irq) = engine.split().unwrap();

    write!(serial, "T={}C", 21).unwrap();
    pump_tx(&uart, &mut irq);
    assert_eq!(uart.written(), b"T=21C");

    {
        let mut out = SinkWriter::new(&mut serial);
        write!(out, "\x1b[2J").unwrap();
    }
    serial.emit_all(b"\r\n");
    pump_tx(&uart, &mut irq);
    assert_eq!(uart.written(), b"T=21C\x1b[2J\r\n");
}

type MockIrq = SerialIrq<'static, 'static, &'static MockUart>;

static SERIAL_IRQ: Mutex<RefCell<Option<MockIrq>>> = Mutex::new(RefCell::new(None));

fn transmit_vector() {
    critical_section::with(|cs| {
        if let Some(irq) = SERIAL_IRQ.borrow_ref_mut(cs).as_mut() {
            irq.on_transmit_complete();
        }
    });
}

fn receive_vector() {
    critical_section::with(|cs| {
        if let Some(irq) = SERIAL_IRQ.borrow_ref_mut(cs).as_mut() {
            irq.on_receive_full();
        }
    });
}

/// The interrupt handle can be parked in a `static` and driven from vectors
#[test]
fn test_interrupt_handle_in_static() {
    let uart: &'static MockUart = Box::leak(Box::new(MockUart::new()));
    let tx: &'static mut [u8] = Box::leak(Box::new([0u8; DEFAULT_BUFFER_SIZE]));
    let rx: &'static mut [u8] = Box::leak(Box::new([0u8; DEFAULT_BUFFER_SIZE]));
    let engine: &'static mut SerialEngine<'static, &'static MockUart> =
        Box::leak(Box::new(SerialEngine::new(uart, tx, rx)));

    engine.init(config_9600()).unwrap();
    let (mut serial, irq) = engine.split().unwrap();
    critical_section::with(|cs| *SERIAL_IRQ.borrow_ref_mut(cs) = Some(irq));
    serial.enable_interrupts();

    serial.send_all(b"ok");
    while uart.tx_interrupt_enabled() {
        transmit_vector();
    }
    assert_eq!(uart.written(), b"ok");
    assert_eq!(serial.state(), TxState::Idle);

    uart.load_rx(b'!');
    receive_vector();
    assert_eq!(serial.receive(), b'!');
}

/// `send` holds the byte until the output register reports ready
#[test]
fn test_send_waits_for_transmit_ready() {
    let uart = MockUart::new();
    let mut tx = [0u8; 4];
    let mut rx = [0u8; 4];
    let mut engine = SerialEngine::new(&uart, &mut tx, &mut rx);
    engine.init(config_9600()).unwrap();
    let (mut serial, _irq) = engine.split().unwrap();

    uart.hold_busy(3);
    serial.send(0x41);

    // Three busy polls, then the ready one
    assert_eq!(uart.ready_polls(), 4);
    assert_eq!(uart.written(), [0x41]);
    assert!(!uart.written_while_busy());
    assert!(uart.tx_interrupt_enabled());
}

/// A raw divisor that matches no standard rate on its clock is refused
#[test]
fn test_init_rejects_divisor_for_wrong_clock() {
    let uart = MockUart::new();
    let mut tx = [0u8; 4];
    let mut rx = [0u8; 4];
    let mut engine = SerialEngine::new(&uart, &mut tx, &mut rx);

    // 104/1 is 9600 baud at 1 MHz, but the clock here is 8 MHz
    let config = SerialConfig::new(
        ClockSource::Smclk,
        8_000_000,
        104,
        0,
        1,
        0,
        Parity::None,
        BitOrder::LsbFirst,
        Oversampling::Off,
    );
    assert_eq!(
        engine.init(config),
        Err(SerialError::Config(ConfigError::NonStandardBaud { actual: 76_830 }))
    );
    assert!(!engine.is_initialized());
    assert!(uart.configurations().is_empty());

    // The same divisor on the clock it was computed for is accepted
    let config = SerialConfig { clock_hz: 1_000_000, ..config };
    engine.init(config).unwrap();
    assert_eq!(engine.config().map(SerialConfig::effective_baud), Some(9603));
}
