//! What the scan loop needs from the board.
//!
//! None of these can fail: register writes are fire-and-forget and a stuck
//! transmitter simply hangs the device.

use crate::matrix::DriveLine;

/// Drive-line outputs and the poll-line sense register.
pub trait LineDriver {
    /// Make `line` the active drive line and the other one inactive.
    fn assert_line(&mut self, line: DriveLine);

    /// Sample the poll lines. Two bits per poll line, `0b00` = closed.
    fn read_poll_status(&mut self) -> u16;
}

/// Byte-wide serial transmitter.
pub trait SerialOut {
    /// Busy-wait until the transmitter can take a byte, then queue it.
    fn write_blocking(&mut self, byte: u8);

    /// Busy-wait until every queued byte has left the wire.
    fn flush(&mut self);
}

/// Clock and sleep control.
pub trait PowerControl {
    /// Drop to the low-power clock and stop the PLL.
    fn enter_low_power(&mut self);

    /// Suspend until the periodic tick posts a wake notification.
    fn wait_for_tick(&mut self);

    /// Restart the PLL, restore the full clock and arm the next sleep.
    fn restore_clock(&mut self);
}
