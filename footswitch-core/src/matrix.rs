//! Button matrix addressing and poll-status decoding.
//!
//! The ten buttons sit on a 2×5 matrix. Seen from the player, with the cable
//! leaving at the top:
//!
//! ```text
//!        /|\ (wire)
//!   4  3  2  1  0      drive line 0
//!   *  *  *  *  *
//!   *  *  *  *  *
//!   9  8  7  6  5      drive line 1
//! ```
//!
//! Each poll line occupies a 2-bit pair in the status register. A pair
//! reading `0b00` means the switch on that poll line is closed.

use core::ops::{Not, Range};

use crate::{BUTTONS, POLL_LINES};

/// Width of one poll line in the status register.
const PAIR_BITS: u32 = 2;
const PAIR_MASK: u16 = 0b11;

/// Index of a physical button, always in `0..10`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ButtonId(u8);

impl ButtonId {
    /// Top-right pedal, the mode button on Mark II hardware.
    pub const TOP_RIGHT: ButtonId = ButtonId(5);

    pub const fn new(index: u8) -> Option<Self> {
        if (index as usize) < BUTTONS {
            Some(Self(index))
        } else {
            None
        }
    }

    /// Button wired to `poll` on `line`.
    pub const fn at(line: DriveLine, poll: u8) -> Self {
        debug_assert!((poll as usize) < POLL_LINES);
        Self(line.index() as u8 * POLL_LINES as u8 + poll)
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }

    pub const fn line(self) -> DriveLine {
        if (self.0 as usize) < POLL_LINES {
            DriveLine::Zero
        } else {
            DriveLine::One
        }
    }

    /// Poll line within its drive line.
    pub const fn poll(self) -> u8 {
        self.0 % POLL_LINES as u8
    }

    /// All buttons in index order.
    pub fn all() -> impl Iterator<Item = ButtonId> {
        (0..BUTTONS as u8).map(ButtonId)
    }
}

/// The drive line currently held active.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum DriveLine {
    #[default]
    Zero,
    One,
}

impl DriveLine {
    pub const fn index(self) -> usize {
        match self {
            DriveLine::Zero => 0,
            DriveLine::One => 1,
        }
    }

    /// Indices of the buttons sensed while this line is active.
    pub const fn buttons(self) -> Range<usize> {
        let first = self.index() * POLL_LINES;
        first..first + POLL_LINES
    }
}

impl Not for DriveLine {
    type Output = DriveLine;

    fn not(self) -> DriveLine {
        match self {
            DriveLine::Zero => DriveLine::One,
            DriveLine::One => DriveLine::Zero,
        }
    }
}

/// Resolve a poll-status sample into the pressed button, if any.
///
/// Only the lowest closed poll line is reported, so two buttons held on the
/// same drive line read as the one nearer the wire. Chords are not detected.
pub fn decode(status: u16, line: DriveLine) -> Option<ButtonId> {
    (0..POLL_LINES as u8)
        .find(|&poll| (status >> (u32::from(poll) * PAIR_BITS)) & PAIR_MASK == 0)
        .map(|poll| ButtonId::at(line, poll))
}

/// Status word with every poll line open.
pub const ALL_OPEN: u16 = (1 << (POLL_LINES as u32 * PAIR_BITS)) - 1;

/// Status word with the switch on `poll` closed and every other line open.
pub const fn closed(poll: u8) -> u16 {
    ALL_OPEN & !(PAIR_MASK << (poll as u32 * PAIR_BITS))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nothing_pressed() {
        assert_eq!(decode(ALL_OPEN, DriveLine::Zero), None);
        assert_eq!(decode(0xFFFF, DriveLine::One), None);
    }

    #[test]
    fn test_single_press_per_line() {
        assert_eq!(decode(closed(0), DriveLine::Zero), ButtonId::new(0));
        assert_eq!(decode(closed(3), DriveLine::Zero), ButtonId::new(3));
        assert_eq!(decode(closed(0), DriveLine::One), ButtonId::new(5));
        assert_eq!(decode(closed(4), DriveLine::One), ButtonId::new(9));
    }

    #[test]
    fn test_lowest_pair_wins() {
        // Pairs at offsets 0 and 4 both closed.
        let status = ALL_OPEN & !0b11_0011;
        assert_eq!(decode(status, DriveLine::Zero), ButtonId::new(0));
        assert_eq!(decode(closed(1) & closed(4), DriveLine::One), ButtonId::new(6));
    }

    #[test]
    fn test_half_closed_pair_is_open() {
        // Only one bit of the pair low: not a closed switch.
        assert_eq!(decode(ALL_OPEN & !0b01, DriveLine::Zero), None);
        assert_eq!(decode(ALL_OPEN & !0b10_0000, DriveLine::Zero), None);
    }

    #[test]
    fn test_bits_above_poll_lines_ignored() {
        assert_eq!(decode(closed(2) & 0x03FF, DriveLine::Zero), ButtonId::new(2));
        assert_eq!(decode(0xFC00 | ALL_OPEN, DriveLine::Zero), None);
    }

    #[test]
    fn test_button_addressing() {
        for id in ButtonId::all() {
            assert!(id.line().buttons().contains(&id.index()));
            assert_eq!(ButtonId::at(id.line(), id.poll()), id);
        }
        assert_eq!(ButtonId::new(10), None);
        assert_eq!(ButtonId::TOP_RIGHT.line(), DriveLine::One);
        assert_eq!(ButtonId::TOP_RIGHT.poll(), 0);
    }

    #[test]
    fn test_line_toggle() {
        assert_eq!(!DriveLine::Zero, DriveLine::One);
        assert_eq!(!!DriveLine::One, DriveLine::One);
        assert_eq!(DriveLine::One.buttons(), 5..10);
    }
}
