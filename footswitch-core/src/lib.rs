//! Hardware-independent control logic for the ten-button MIDI footswitch.
//!
//! This crate is `no_std`-compatible so it can be used by both the AVR
//! firmware and the native CLI tool. The board-specific pieces (GPIO, UART,
//! clock and sleep control) plug in through the traits in [`hal`].
//!
//! One scan cycle:
//! 1. sleep until the next tick ([`power::PowerGate`])
//! 2. assert the active drive line and sample the poll lines
//! 3. decode the poll status into at most one pressed button ([`matrix::decode`])
//! 4. advance the five state machines of the active line ([`state::ButtonBank`])
//! 5. dispatch every trigger ([`dispatch::Dispatcher`])
//! 6. flip the drive line

#![cfg_attr(not(test), no_std)]

pub mod config;
pub mod dispatch;
pub mod hal;
pub mod matrix;
pub mod power;
pub mod scan;
pub mod state;

pub use config::{ConfigError, FootswitchConfig, HardwareVersion};
pub use dispatch::{Dispatch, Dispatcher, NoteMessage};
pub use hal::{LineDriver, PowerControl, SerialOut};
pub use matrix::{decode, ButtonId, DriveLine};
pub use power::{PowerGate, WakeSignal};
pub use scan::{CycleReport, Footswitch};
pub use state::{ButtonBank, ButtonState, Policy, Triggers};

/// Number of physical buttons.
pub const BUTTONS: usize = 10;
/// Number of drive lines.
pub const DRIVE_LINES: usize = 2;
/// Number of poll lines, i.e. buttons per drive line.
pub const POLL_LINES: usize = BUTTONS / DRIVE_LINES;
