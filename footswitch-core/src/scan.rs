//! The top-level scan loop.

use crate::config::FootswitchConfig;
use crate::dispatch::{Dispatch, Dispatcher};
use crate::hal::{LineDriver, PowerControl, SerialOut};
use crate::matrix::{decode, ButtonId, DriveLine};
use crate::power::PowerGate;
use crate::state::{ButtonBank, Triggers};

/// What happened during one scan.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CycleReport {
    /// Line that was active for this scan.
    pub line: DriveLine,
    pub status: u16,
    pub pressed: Option<ButtonId>,
    pub triggers: Triggers,
}

pub struct Footswitch {
    line: DriveLine,
    bank: ButtonBank,
    dispatcher: Dispatcher,
}

impl Footswitch {
    pub const fn new(config: &FootswitchConfig) -> Self {
        Self {
            line: DriveLine::Zero,
            bank: ButtonBank::new(config.policy),
            dispatcher: Dispatcher::new(config),
        }
    }

    pub fn line(&self) -> DriveLine {
        self.line
    }

    pub fn bank(&self) -> &ButtonBank {
        &self.bank
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// One scan: sample the active line, advance its buttons, send whatever
    /// triggered, then switch to the other line.
    ///
    /// `on_dispatch` sees every dispatch in button order.
    pub fn scan_with<L, S, F>(
        &mut self,
        lines: &mut L,
        serial: &mut S,
        mut on_dispatch: F,
    ) -> CycleReport
    where
        L: LineDriver,
        S: SerialOut,
        F: FnMut(ButtonId, Dispatch),
    {
        let line = self.line;
        lines.assert_line(line);
        let status = lines.read_poll_status();
        let pressed = decode(status, line);
        debug_assert!(pressed.map_or(true, |id| line.buttons().contains(&id.index())));

        let triggers = self.bank.update(line, pressed);
        for button in triggers.iter() {
            let dispatch = self.dispatcher.on_trigger(button, serial);
            on_dispatch(button, dispatch);
        }

        self.line = !line;

        let report = CycleReport {
            line,
            status,
            pressed,
            triggers,
        };
        log::trace!("{:?}", report);
        report
    }

    pub fn scan<L, S>(&mut self, lines: &mut L, serial: &mut S) -> CycleReport
    where
        L: LineDriver,
        S: SerialOut,
    {
        self.scan_with(lines, serial, |_, _| {})
    }

    /// Sleep until the next tick, then scan once.
    pub fn step<L, S, P>(
        &mut self,
        lines: &mut L,
        serial: &mut S,
        power: &mut PowerGate<P>,
    ) -> CycleReport
    where
        L: LineDriver,
        S: SerialOut,
        P: PowerControl,
    {
        power.sleep_until_tick(serial);
        self.scan(lines, serial)
    }

    /// Run forever.
    pub fn run<L, S, P>(mut self, lines: &mut L, serial: &mut S, power: &mut PowerGate<P>) -> !
    where
        L: LineDriver,
        S: SerialOut,
        P: PowerControl,
    {
        loop {
            self.step(lines, serial, power);
        }
    }
}

/// Send the startup probe, if configured, before the first scan.
pub fn announce<S: SerialOut>(config: &FootswitchConfig, serial: &mut S) {
    if let Some(probe) = config.startup_probe {
        log::info!("startup probe {:02X?}", probe.to_bytes());
        probe.send(serial);
    }
}
