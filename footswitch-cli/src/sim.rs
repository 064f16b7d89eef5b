//! Host-side stand-ins for the board, driving the real scan loop.

use anyhow::{bail, Context, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, Thread};
use std::time::Duration;

use footswitch_core::matrix::{closed, ALL_OPEN};
use footswitch_core::scan::announce;
use footswitch_core::{
    ButtonId, CycleReport, Dispatch, DriveLine, Footswitch, FootswitchConfig, LineDriver,
    PowerControl, PowerGate, SerialOut, WakeSignal,
};

/// Parse a per-scan script: `-` for nothing held, a button index, or
/// `entry*n` to repeat an entry for `n` scans. Example: `2*2,-,5`.
pub fn parse_script(script: &str) -> Result<Vec<Option<ButtonId>>> {
    let mut cycles = Vec::new();
    for entry in script.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (what, times) = match entry.split_once('*') {
            Some((what, times)) => (
                what.trim(),
                times
                    .trim()
                    .parse::<usize>()
                    .with_context(|| format!("bad repeat count in '{}'", entry))?,
            ),
            None => (entry, 1),
        };
        let held = match what {
            "-" => None,
            index => {
                let index: u8 = index.parse().with_context(|| format!("bad button '{}'", index))?;
                match ButtonId::new(index) {
                    Some(id) => Some(id),
                    None => bail!("button {} does not exist (0-9)", index),
                }
            }
        };
        cycles.extend(std::iter::repeat(held).take(times));
    }
    Ok(cycles)
}

/// Pedal board with at most one pedal physically held.
#[derive(Default)]
pub struct ScriptedPedals {
    pub held: Option<ButtonId>,
    active: DriveLine,
}

impl LineDriver for ScriptedPedals {
    fn assert_line(&mut self, line: DriveLine) {
        self.active = line;
    }

    fn read_poll_status(&mut self) -> u16 {
        match self.held {
            Some(id) if id.line() == self.active => closed(id.poll()),
            _ => ALL_OPEN,
        }
    }
}

/// Serial port that keeps everything written to it.
#[derive(Default)]
pub struct CapturedSerial {
    pub bytes: Vec<u8>,
}

impl SerialOut for CapturedSerial {
    fn write_blocking(&mut self, byte: u8) {
        self.bytes.push(byte);
    }

    fn flush(&mut self) {}
}

/// Power control backed by a ticker thread posting to its own [`WakeSignal`].
///
/// The ticker wakes the thread that created the clock and stops once the
/// clock is dropped. Without a tick period the clock wakes itself straight
/// away.
pub struct HostClock {
    period: Option<Duration>,
    wake: Arc<WakeSignal>,
    stop: Arc<AtomicBool>,
    low_power: bool,
}

impl HostClock {
    pub fn new(period: Option<Duration>) -> Self {
        let wake = Arc::new(WakeSignal::new());
        let stop = Arc::new(AtomicBool::new(false));
        if let Some(period) = period {
            let sleeper: Thread = thread::current();
            let wake = Arc::clone(&wake);
            let stop = Arc::clone(&stop);
            thread::spawn(move || {
                while !stop.load(Ordering::Relaxed) {
                    thread::sleep(period);
                    wake.signal();
                    sleeper.unpark();
                }
            });
        }
        Self {
            period,
            wake,
            stop,
            low_power: false,
        }
    }
}

impl Drop for HostClock {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}

impl PowerControl for HostClock {
    fn enter_low_power(&mut self) {
        self.low_power = true;
    }

    fn wait_for_tick(&mut self) {
        if self.period.is_none() {
            self.wake.signal();
        }
        while !self.wake.take() {
            thread::park();
        }
    }

    fn restore_clock(&mut self) {
        debug_assert!(self.low_power);
        self.low_power = false;
    }
}

/// One simulated scan and the bytes it put on the wire.
pub struct Scan {
    pub report: CycleReport,
    pub held: Option<ButtonId>,
    pub dispatches: Vec<(ButtonId, Dispatch)>,
}

pub struct Outcome {
    pub probe: Vec<u8>,
    pub scans: Vec<Scan>,
    pub wire: Vec<u8>,
    pub channel: u8,
}

pub fn run(config: &FootswitchConfig, script: &[Option<ButtonId>], clock: HostClock) -> Outcome {
    let mut footswitch = Footswitch::new(config);
    let mut pedals = ScriptedPedals::default();
    let mut serial = CapturedSerial::default();
    let mut power = PowerGate::new(clock);

    announce(config, &mut serial);
    let probe = serial.bytes.clone();

    let mut scans = Vec::with_capacity(script.len());
    for &held in script {
        pedals.held = held;
        power.sleep_until_tick(&mut serial);
        let mut dispatches = Vec::new();
        let report =
            footswitch.scan_with(&mut pedals, &mut serial, |id, d| dispatches.push((id, d)));
        scans.push(Scan {
            report,
            held,
            dispatches,
        });
    }

    Outcome {
        probe,
        scans,
        wire: serial.bytes,
        channel: footswitch.dispatcher().channel(),
    }
}

pub fn print(outcome: &Outcome) {
    if !outcome.probe.is_empty() {
        println!("startup  {}", hex_bytes(&outcome.probe));
    }
    for (number, scan) in outcome.scans.iter().enumerate() {
        let held = scan.held.map_or("-".to_string(), |id| id.index().to_string());
        let sensed = scan.report.pressed.map_or("-".to_string(), |id| id.index().to_string());
        let mut line = format!(
            "scan {:>3}  line {}  held {:>2}  sensed {:>2}",
            number,
            scan.report.line.index(),
            held,
            sensed
        );
        for (id, dispatch) in &scan.dispatches {
            match dispatch {
                Dispatch::ModeToggled { channel, velocity_set } => line.push_str(&format!(
                    "  [{}] mode -> channel 0x{:02X}, set {}",
                    id.index(),
                    channel,
                    velocity_set
                )),
                Dispatch::Sent(message) => {
                    line.push_str(&format!("  [{}] {}", id.index(), hex_bytes(&message.to_bytes())))
                }
            }
        }
        println!("{}", line);
    }
    println!(
        "{} bytes sent, channel 0x{:02X}",
        outcome.wire.len() - outcome.probe.len(),
        outcome.channel
    );
}

fn hex_bytes(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}
