//! Turning button triggers into serial messages.
//!
//! A trigger on the mode button switches between the two channels and the
//! two velocity sets. Any other trigger sends `{channel, code, velocity}` and
//! then flips that button's velocity between soft and loud, so successive
//! presses of one pedal alternate.

use crate::config::FootswitchConfig;
use crate::hal::SerialOut;
use crate::matrix::ButtonId;
use crate::BUTTONS;

/// Note-on, channel 7.
pub const CHANNEL_PRIMARY: u8 = 0x96;
/// Note-on, channel 8.
pub const CHANNEL_SECONDARY: u8 = 0x97;

pub const VELOCITY_SOFT: u8 = 0x01;
pub const VELOCITY_LOUD: u8 = 0x7F;

/// One three-byte message as it goes out on the wire.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct NoteMessage {
    pub status: u8,
    pub code: u8,
    pub velocity: u8,
}

impl NoteMessage {
    pub const fn to_bytes(self) -> [u8; 3] {
        [self.status, self.code, self.velocity]
    }

    /// Blocking write of all three bytes, in wire order.
    pub fn send<S: SerialOut>(self, serial: &mut S) {
        for byte in self.to_bytes() {
            serial.write_blocking(byte);
        }
    }
}

/// Outcome of dispatching one trigger.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Dispatch {
    ModeToggled { channel: u8, velocity_set: usize },
    Sent(NoteMessage),
}

pub struct Dispatcher {
    mode_button: ButtonId,
    codes: [u8; BUTTONS],
    channel: u8,
    /// Active row of `velocity`, flipped together with `channel`.
    velocity_set: usize,
    velocity: [[u8; BUTTONS]; 2],
}

impl Dispatcher {
    pub const fn new(config: &FootswitchConfig) -> Self {
        Self {
            mode_button: config.mode_button,
            codes: config.codes,
            channel: CHANNEL_PRIMARY,
            velocity_set: 0,
            velocity: [[VELOCITY_SOFT; BUTTONS]; 2],
        }
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }

    pub fn velocity_set(&self) -> usize {
        self.velocity_set
    }

    /// Velocity the next message from `button` would carry.
    pub fn velocity(&self, button: ButtonId) -> u8 {
        self.velocity[self.velocity_set][button.index()]
    }

    pub fn on_trigger<S: SerialOut>(&mut self, button: ButtonId, serial: &mut S) -> Dispatch {
        if button == self.mode_button {
            self.toggle_mode();
            log::info!(
                "mode toggled: channel 0x{:02X}, velocity set {}",
                self.channel,
                self.velocity_set
            );
            return Dispatch::ModeToggled {
                channel: self.channel,
                velocity_set: self.velocity_set,
            };
        }

        let cell = &mut self.velocity[self.velocity_set][button.index()];
        let message = NoteMessage {
            status: self.channel,
            code: self.codes[button.index()],
            velocity: *cell,
        };
        message.send(serial);

        *cell = if *cell == VELOCITY_SOFT {
            VELOCITY_LOUD
        } else {
            VELOCITY_SOFT
        };
        log::debug!("button {} sent {:02X?}", button.index(), message.to_bytes());

        Dispatch::Sent(message)
    }

    fn toggle_mode(&mut self) {
        self.channel = if self.channel == CHANNEL_PRIMARY {
            CHANNEL_SECONDARY
        } else {
            CHANNEL_PRIMARY
        };
        self.velocity_set ^= 1;
    }
}
