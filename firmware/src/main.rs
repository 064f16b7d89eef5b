//! MIDI footswitch firmware for ATmega32U4 (Teensy 2.0).
//!
//! - Ten pedals on a two-line matrix, one line scanned per tick
//! - Press/release state machine per pedal
//! - Note messages out of USART1 at MIDI baud rate
//! - Sleeps at a divided clock between scans, woken by Timer1

#![no_std]
#![no_main]
#![feature(abi_avr_interrupt)]
#![feature(asm_experimental_arch)]

mod clock;
mod matrix;
mod uart;

use avr_device::atmega32u4::Peripherals;
use footswitch_core::scan::announce;
use footswitch_core::{Footswitch, FootswitchConfig, HardwareVersion, Policy, PowerGate};

use clock::Clock;
use matrix::Matrix;
use uart::MidiUart;

#[cfg(all(feature = "mark-i", feature = "mark-ii"))]
compile_error!("features `mark-i` and `mark-ii` are mutually exclusive");

#[cfg(feature = "mark-i")]
const HARDWARE: HardwareVersion = HardwareVersion::MarkI;
#[cfg(not(feature = "mark-i"))]
const HARDWARE: HardwareVersion = HardwareVersion::MarkII;

/// Scans per second.
const TICK_HZ: u16 = 1;

/// Consecutive pressed scans before a press-edge pedal accepts a press.
const DEBOUNCE_DEPTH: u8 = 1;

const _: () = assert!(TICK_HZ > 0 && DEBOUNCE_DEPTH > 0);

/// Panic handler: halt in place.
#[panic_handler]
fn panic(_info: &core::panic::PanicInfo) -> ! {
    loop {}
}

fn config() -> FootswitchConfig {
    let mut config =
        FootswitchConfig::for_hardware(HARDWARE).with_startup_probe(cfg!(feature = "probe"));
    config.tick_hz = TICK_HZ;
    if let Policy::PressEdge { .. } = config.policy {
        config.policy = Policy::PressEdge {
            debounce: DEBOUNCE_DEPTH,
        };
    }
    config
}

#[avr_device::entry]
fn main() -> ! {
    let dp = unsafe { Peripherals::steal() };

    // Full speed to start with; the power gate divides it between scans
    dp.CPU.clkpr.write(|w| w.clkpce().set_bit());
    dp.CPU.clkpr.write(|w| unsafe { w.bits(0) });

    let config = config();

    let mut matrix = Matrix::new(dp.PORTB, dp.PORTF, &dp.EXINT);
    let mut uart = MidiUart::new(dp.USART1);
    let mut power = PowerGate::new(Clock::new(dp.CPU, dp.PLL, dp.TC1, config.tick_hz));

    announce(&config, &mut uart);

    unsafe { avr_device::interrupt::enable() };

    Footswitch::new(&config).run(&mut matrix, &mut uart, &mut power)
}
