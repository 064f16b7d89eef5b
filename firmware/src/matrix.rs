//! Drive/poll lines of the pedal matrix.
//!
//! Pin mapping on Teensy 2.0 (ATmega32U4):
//!   Drive lines (outputs, active low): PB4 = line 0, PB5 = line 1
//!   Poll lines (inputs w/ pull-up):    PF0, PF1, PF4, PF5, PF6
//!
//! A closed switch pulls its poll line low while its drive line is active.
//! Each poll pin is reported as a pair of equal bits so the status word has
//! the two-bits-per-line layout the decoder expects.

use avr_device::atmega32u4::{EXINT, PORTB, PORTF};
use footswitch_core::{DriveLine, LineDriver, POLL_LINES};

const DRIVE_MASK: u8 = 0x30;
const DRIVE_PINS: [u8; 2] = [0x10, 0x20];

/// PINF bit for each poll line, in poll order.
const POLL_BITS: [u8; POLL_LINES] = [0, 1, 4, 5, 6];
const POLL_MASK: u8 = 0x73;

pub struct Matrix {
    portb: PORTB,
    portf: PORTF,
}

impl Matrix {
    pub fn new(portb: PORTB, portf: PORTF, exint: &EXINT) -> Self {
        // Drive pins as outputs, both inactive (high)
        portb.ddrb.modify(|r, w| unsafe { w.bits(r.bits() | DRIVE_MASK) });
        portb.portb.modify(|r, w| unsafe { w.bits(r.bits() | DRIVE_MASK) });

        // Poll pins as inputs with pull-ups
        portf.ddrf.modify(|r, w| unsafe { w.bits(r.bits() & !POLL_MASK) });
        portf.portf.modify(|r, w| unsafe { w.bits(r.bits() | POLL_MASK) });

        // The matrix is polled; no pin-change interrupts
        exint.pcmsk0.write(|w| unsafe { w.bits(0) });
        exint.pcicr.write(|w| unsafe { w.bits(0) });

        Self { portb, portf }
    }
}

impl LineDriver for Matrix {
    fn assert_line(&mut self, line: DriveLine) {
        let active = DRIVE_PINS[line.index()];
        self.portb
            .portb
            .modify(|r, w| unsafe { w.bits((r.bits() | DRIVE_MASK) & !active) });
        settle();
    }

    fn read_poll_status(&mut self) -> u16 {
        let pinf = self.portf.pinf.read().bits();
        POLL_BITS
            .iter()
            .enumerate()
            .fold(0u16, |status, (poll, &bit)| {
                let level = u16::from((pinf >> bit) & 1);
                status | (level * 0b11) << (poll * 2)
            })
    }
}

/// Short delay for pin settling (~5us at 16MHz).
#[inline(always)]
fn settle() {
    for _ in 0..20u8 {
        unsafe { core::arch::asm!("nop") };
    }
}
