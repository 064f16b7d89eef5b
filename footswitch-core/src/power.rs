//! Power gating of the scan loop.
//!
//! The device does not free-run: between two scans it drops to the slow
//! clock, sleeps until the periodic tick and only then comes back to full
//! speed. Scan latency is bounded by the tick period.

use core::cell::Cell;

use critical_section::Mutex;

use crate::hal::{PowerControl, SerialOut};

/// Wake notification posted by the tick interrupt.
///
/// The interrupt is the only producer and the scan loop the only consumer.
/// Pending wakes do not accumulate: several ticks before a `take` count once.
pub struct WakeSignal {
    pending: Mutex<Cell<bool>>,
}

impl WakeSignal {
    pub const fn new() -> Self {
        Self {
            pending: Mutex::new(Cell::new(false)),
        }
    }

    /// Called from the tick handler.
    pub fn signal(&self) {
        critical_section::with(|cs| self.pending.borrow(cs).set(true));
    }

    /// Consume a pending wake, if any.
    pub fn take(&self) -> bool {
        critical_section::with(|cs| self.pending.borrow(cs).replace(false))
    }
}

impl Default for WakeSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Compare value for a timer in CTC mode counting at `timer_hz`, so that
/// it fires `tick_hz` times per second. Saturates at the 16-bit range; a
/// zero rate is treated as 1 Hz.
pub const fn tick_compare(timer_hz: u32, tick_hz: u16) -> u16 {
    let tick_hz = if tick_hz == 0 { 1 } else { tick_hz as u32 };
    let counts = timer_hz / tick_hz;
    if counts == 0 {
        0
    } else if counts > u16::MAX as u32 + 1 {
        u16::MAX
    } else {
        (counts - 1) as u16
    }
}

/// Brackets each scan with `power_down` and `power_up`.
pub struct PowerGate<P> {
    power: P,
    cycles: u32,
}

impl<P: PowerControl> PowerGate<P> {
    pub const fn new(power: P) -> Self {
        Self { power, cycles: 0 }
    }

    /// Finish any transmission in flight, then drop to low power.
    pub fn power_down<S: SerialOut>(&mut self, serial: &mut S) {
        serial.flush();
        self.power.enter_low_power();
    }

    pub fn power_up(&mut self) {
        self.power.restore_clock();
        self.cycles = self.cycles.wrapping_add(1);
    }

    /// Sleep through one tick period. Returns with the full clock running.
    pub fn sleep_until_tick<S: SerialOut>(&mut self, serial: &mut S) {
        self.power_down(serial);
        self.power.wait_for_tick();
        self.power_up();
    }

    /// Number of completed sleep/wake brackets.
    pub fn cycles(&self) -> u32 {
        self.cycles
    }

    pub fn inner(&self) -> &P {
        &self.power
    }
}
