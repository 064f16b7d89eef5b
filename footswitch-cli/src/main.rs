mod halfkay;
mod hex;
mod layout;
mod sim;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::LevelFilter;
use std::fs;
use std::time::Duration;

use footswitch_core::{ButtonId, FootswitchConfig, HardwareVersion, Policy};

#[derive(Parser)]
#[command(name = "footswitch-cli")]
#[command(about = "MIDI footswitch flasher and scan-loop simulator")]
struct Cli {
    /// Log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Flash a .hex firmware file to the Teensy via HalfKay bootloader
    Flash {
        /// Path to the Intel HEX firmware file
        firmware: String,
    },
    /// Detect if a Teensy is connected in bootloader mode
    Detect,
    /// Print the pedal layout with codes and mode button
    Layout {
        #[command(flatten)]
        board: BoardArgs,
    },
    /// Run the scan loop against a scripted sequence of held pedals
    Simulate {
        /// Held pedal per scan: index, '-' for none, 'entry*n' to repeat (e.g. "2*2,-*2,5*2")
        #[arg(short, long)]
        script: String,

        /// Wait for real ticks at the configured rate instead of running flat out
        #[arg(long)]
        realtime: bool,

        #[command(flatten)]
        board: BoardArgs,
    },
}

#[derive(Copy, Clone, ValueEnum)]
enum Hardware {
    #[value(name = "mark-i")]
    MarkI,
    #[value(name = "mark-ii")]
    MarkII,
}

#[derive(Copy, Clone, ValueEnum)]
enum Edge {
    Press,
    Release,
}

#[derive(clap::Args)]
struct BoardArgs {
    /// Pedal board revision
    #[arg(long, value_enum, default_value = "mark-ii")]
    hardware: Hardware,

    /// Override the revision's trigger edge
    #[arg(long, value_enum)]
    policy: Option<Edge>,

    /// Consecutive pressed scans required on the press edge
    #[arg(long, default_value_t = 1)]
    debounce: u8,

    /// Override a pedal's code, as index=value (repeatable)
    #[arg(long = "code", value_parser = parse_code)]
    codes: Vec<(u8, u8)>,

    /// Scan ticks per second
    #[arg(long)]
    tick_hz: Option<u16>,

    /// Send the wiring-check message before the first scan
    #[arg(long)]
    probe: bool,
}

impl BoardArgs {
    fn config(&self) -> Result<FootswitchConfig> {
        let hardware = match self.hardware {
            Hardware::MarkI => HardwareVersion::MarkI,
            Hardware::MarkII => HardwareVersion::MarkII,
        };
        let mut config = FootswitchConfig::for_hardware(hardware).with_startup_probe(self.probe);

        let policy = match (self.policy, config.policy) {
            (Some(Edge::Release), _) => Policy::ReleaseEdge,
            (Some(Edge::Press), _) | (None, Policy::PressEdge { .. }) => Policy::PressEdge {
                debounce: self.debounce,
            },
            (None, policy) => policy,
        };
        config = config.with_policy(policy)?;

        if let Some(tick_hz) = self.tick_hz {
            config = config.with_tick_hz(tick_hz)?;
        }
        for &(index, code) in &self.codes {
            let button = ButtonId::new(index).with_context(|| format!("no pedal {}", index))?;
            config = config.with_code(button, code);
        }
        Ok(config)
    }
}

fn parse_code(arg: &str) -> Result<(u8, u8), String> {
    let (index, value) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected index=value, got '{}'", arg))?;
    let parse = |s: &str| -> Result<u8, String> {
        let s = s.trim();
        let parsed = match s.strip_prefix("0x") {
            Some(hex) => u8::from_str_radix(hex, 16),
            None => s.parse(),
        };
        parsed.map_err(|e| format!("'{}': {}", s, e))
    };
    Ok((parse(index)?, parse(value)?))
}

/// `-v` count to log level: none shows warnings, then info, debug, trace.
fn log_level(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::new()
        .filter_level(log_level(cli.verbose))
        .parse_default_env()
        .init();

    match cli.command {
        Command::Flash { firmware } => {
            let contents =
                fs::read_to_string(&firmware).with_context(|| format!("reading {}", firmware))?;
            let chunks = hex::parse(&contents).context("parsing Intel HEX file")?;
            let image = hex::flatten(&chunks).context("flattening HEX records")?;

            println!(
                "Firmware: {} bytes at base address 0x{:04X}",
                image.bytes.len(),
                image.base
            );

            if !halfkay::wait_for(1)? {
                println!("Waiting for the bootloader; press the reset button on the Teensy...");
                if !halfkay::wait_for(100)? {
                    eprintln!("Teensy bootloader not detected.");
                    std::process::exit(1);
                }
            }

            halfkay::flash(&image)?;
            println!("Teensy rebooted. Footswitch firmware should be running.");
        }
        Command::Detect => {
            if halfkay::detect()? {
                println!("Teensy bootloader detected (HalfKay mode).");
            } else {
                println!("Teensy bootloader not detected.");
                println!("Press the reset button on the Teensy to enter bootloader mode.");
            }
        }
        Command::Layout { board } => {
            print!("{}", layout::render(&board.config()?));
        }
        Command::Simulate {
            script,
            realtime,
            board,
        } => {
            let config = board.config()?;
            let script = sim::parse_script(&script).context("parsing script")?;
            let period = realtime.then(|| Duration::from_secs(1) / u32::from(config.tick_hz));
            let outcome = sim::run(&config, &script, sim::HostClock::new(period));
            sim::print(&outcome);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board(args: &[&str]) -> BoardArgs {
        let mut argv = vec!["footswitch-cli", "layout"];
        argv.extend_from_slice(args);
        match Cli::try_parse_from(argv).unwrap().command {
            Command::Layout { board } => board,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_verbosity_levels() {
        let cli = Cli::try_parse_from(["footswitch-cli", "-vv", "detect"]).unwrap();
        assert_eq!(log_level(cli.verbose), LevelFilter::Debug);
        assert_eq!(log_level(0), LevelFilter::Warn);
        assert_eq!(log_level(1), LevelFilter::Info);
        assert_eq!(log_level(7), LevelFilter::Trace);
    }

    #[test]
    fn test_parse_code() {
        assert_eq!(parse_code("2=101"), Ok((2, 101)));
        assert_eq!(parse_code("9=0x7F"), Ok((9, 0x7F)));
        assert!(parse_code("2").is_err());
        assert!(parse_code("2=300").is_err());
    }

    #[test]
    fn test_board_defaults_to_mark_ii() {
        let config = board(&[]).config().unwrap();
        assert_eq!(config.mode_button, ButtonId::TOP_RIGHT);
        assert_eq!(config.policy, Policy::PressEdge { debounce: 1 });
    }

    #[test]
    fn test_board_overrides() {
        let config = board(&[
            "--hardware",
            "mark-i",
            "--policy",
            "press",
            "--debounce",
            "3",
            "--code",
            "2=101",
        ])
        .config()
        .unwrap();
        assert_eq!(config.mode_button.index(), 0);
        assert_eq!(config.policy, Policy::PressEdge { debounce: 3 });
        assert_eq!(config.codes[2], 101);
    }

    #[test]
    fn test_board_rejects_zero_debounce() {
        assert!(board(&["--debounce", "0"]).config().is_err());
        // Release edge has no debounce gate to reject.
        assert!(board(&["--hardware", "mark-i", "--debounce", "0"]).config().is_ok());
    }
}
