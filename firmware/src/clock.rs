//! System clock, PLL and sleep control, plus the wake tick.
//!
//! Timer1 runs in CTC mode and fires `TIMER1_COMPA` once per tick. The
//! compare value is computed for the low-power clock, where the CPU spends
//! nearly all of its time; the short awake window runs the timer faster and
//! only shortens that one period slightly.

use avr_device::atmega32u4::{CPU, PLL, TC1};
use footswitch_core::power::tick_compare;
use footswitch_core::{PowerControl, WakeSignal};

static TICK: WakeSignal = WakeSignal::new();

const F_CPU: u32 = 16_000_000;

// CLKPR
const CLKPCE: u8 = 1 << 7;
const CLKPS_DIV1: u8 = 0x00;
const CLKPS_DIV256: u8 = 0x08;
const LOW_POWER_DIVIDER: u32 = 256;

// PLLCSR: PINDIV for the 16MHz crystal, PLLE enable, PLOCK locked
const PINDIV: u8 = 1 << 4;
const PLLE: u8 = 1 << 1;
const PLOCK: u8 = 1 << 0;

// SMCR: idle sleep mode (SM = 000) keeps Timer1 clocked
const SMCR_IDLE_ENABLED: u8 = 0x01;

// Timer1
const WGM12: u8 = 1 << 3;
const CS_DIV64: u8 = 0x03;
const TIMER_DIVIDER: u32 = 64;
const OCIE1A: u8 = 1 << 1;

pub struct Clock {
    cpu: CPU,
    pll: PLL,
    _timer: TC1,
}

impl Clock {
    /// Start the wake tick at `tick_hz` and arm sleep.
    pub fn new(cpu: CPU, pll: PLL, timer: TC1, tick_hz: u16) -> Self {
        let compare = tick_compare(F_CPU / LOW_POWER_DIVIDER / TIMER_DIVIDER, tick_hz);

        timer.tccr1a.write(|w| unsafe { w.bits(0) });
        timer.tcnt1.write(|w| unsafe { w.bits(0) });
        timer.ocr1a.write(|w| unsafe { w.bits(compare) });
        timer.tccr1b.write(|w| unsafe { w.bits(WGM12 | CS_DIV64) });
        timer.timsk1.write(|w| unsafe { w.bits(OCIE1A) });

        cpu.smcr.write(|w| unsafe { w.bits(SMCR_IDLE_ENABLED) });

        Self {
            cpu,
            pll,
            _timer: timer,
        }
    }

    fn set_prescaler(&self, clkps: u8) {
        // Timed sequence: the new value must follow CLKPCE within four cycles
        avr_device::interrupt::free(|_| {
            self.cpu.clkpr.write(|w| unsafe { w.bits(CLKPCE) });
            self.cpu.clkpr.write(|w| unsafe { w.bits(clkps) });
        });
    }
}

impl PowerControl for Clock {
    fn enter_low_power(&mut self) {
        self.pll.pllcsr.write(|w| unsafe { w.bits(PINDIV) });
        self.set_prescaler(CLKPS_DIV256);
    }

    fn wait_for_tick(&mut self) {
        loop {
            avr_device::interrupt::disable();
            if TICK.take() {
                unsafe { avr_device::interrupt::enable() };
                return;
            }
            // The instruction after `sei` always executes before a pending
            // interrupt, so a tick cannot slip in between the check and sleep.
            unsafe { avr_device::interrupt::enable() };
            avr_device::asm::sleep();
        }
    }

    fn restore_clock(&mut self) {
        self.set_prescaler(CLKPS_DIV1);
        self.pll.pllcsr.write(|w| unsafe { w.bits(PINDIV | PLLE) });
        while self.pll.pllcsr.read().bits() & PLOCK == 0 {}
        self.cpu.smcr.write(|w| unsafe { w.bits(SMCR_IDLE_ENABLED) });
    }
}

#[avr_device::interrupt(atmega32u4)]
fn TIMER1_COMPA() {
    // The compare flag is cleared by hardware on vector entry
    TICK.signal();
}
