//! Startup configuration for the footswitch.
//!
//! Everything here is fixed once the scan loop starts. The two hardware
//! revisions differ in which pedal is the mode button and in which edge of
//! a press sends the message.

use core::fmt;

use crate::dispatch::NoteMessage;
use crate::matrix::ButtonId;
use crate::state::Policy;
use crate::BUTTONS;

/// Mode button on Mark I hardware: the pedal nearest the wire on line 0.
pub const MARK_I_MODE_BUTTON: ButtonId = match ButtonId::new(0) {
    Some(id) => id,
    None => unreachable!(),
};

/// Mode button on Mark II hardware.
pub const MARK_II_MODE_BUTTON: ButtonId = ButtonId::TOP_RIGHT;

/// Output code per button, `0x45` ("A4") upwards.
pub const DEFAULT_CODES: [u8; BUTTONS] = [
    0x45, 0x46, 0x47, 0x48, 0x49, 0x4A, 0x4B, 0x4C, 0x4D, 0x4E,
];

/// Wake ticks per second.
pub const DEFAULT_TICK_HZ: u16 = 1;

/// Wiring check sent once at startup when enabled.
pub const STARTUP_PROBE: NoteMessage = NoteMessage {
    status: 0x99,
    code: 0x45,
    velocity: 0x45,
};

/// Physical revision of the pedal board.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum HardwareVersion {
    MarkI,
    #[default]
    MarkII,
}

impl HardwareVersion {
    pub const fn mode_button(self) -> ButtonId {
        match self {
            HardwareVersion::MarkI => MARK_I_MODE_BUTTON,
            HardwareVersion::MarkII => MARK_II_MODE_BUTTON,
        }
    }

    /// Mark I sends on release, Mark II on press.
    pub const fn default_policy(self) -> Policy {
        match self {
            HardwareVersion::MarkI => Policy::ReleaseEdge,
            HardwareVersion::MarkII => Policy::PressEdge { debounce: 1 },
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// Mode button index outside `0..10`.
    InvalidModeButton(u8),
    /// A press-edge debounce depth of zero would never accept a press.
    ZeroDebounceDepth,
    ZeroTickRate,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidModeButton(index) => {
                write!(f, "mode button {} is not one of the {} buttons", index, BUTTONS)
            }
            ConfigError::ZeroDebounceDepth => f.write_str("debounce depth must be at least 1"),
            ConfigError::ZeroTickRate => f.write_str("tick rate must be at least 1 Hz"),
        }
    }
}

impl core::error::Error for ConfigError {}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FootswitchConfig {
    pub hardware: HardwareVersion,
    pub mode_button: ButtonId,
    pub policy: Policy,
    pub codes: [u8; BUTTONS],
    pub tick_hz: u16,
    pub startup_probe: Option<NoteMessage>,
}

impl FootswitchConfig {
    pub const fn for_hardware(hardware: HardwareVersion) -> Self {
        Self {
            hardware,
            mode_button: hardware.mode_button(),
            policy: hardware.default_policy(),
            codes: DEFAULT_CODES,
            tick_hz: DEFAULT_TICK_HZ,
            startup_probe: None,
        }
    }

    pub fn with_mode_button(mut self, index: u8) -> Result<Self, ConfigError> {
        self.mode_button = ButtonId::new(index).ok_or(ConfigError::InvalidModeButton(index))?;
        Ok(self)
    }

    pub fn with_policy(mut self, policy: Policy) -> Result<Self, ConfigError> {
        if let Policy::PressEdge { debounce: 0 } = policy {
            return Err(ConfigError::ZeroDebounceDepth);
        }
        self.policy = policy;
        Ok(self)
    }

    pub fn with_code(mut self, button: ButtonId, code: u8) -> Self {
        self.codes[button.index()] = code;
        self
    }

    pub fn with_tick_hz(mut self, tick_hz: u16) -> Result<Self, ConfigError> {
        if tick_hz == 0 {
            return Err(ConfigError::ZeroTickRate);
        }
        self.tick_hz = tick_hz;
        Ok(self)
    }

    pub fn with_startup_probe(mut self, enabled: bool) -> Self {
        self.startup_probe = enabled.then_some(STARTUP_PROBE);
        self
    }

    pub fn code(&self, button: ButtonId) -> u8 {
        self.codes[button.index()]
    }
}

impl Default for FootswitchConfig {
    fn default() -> Self {
        Self::for_hardware(HardwareVersion::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hardware_defaults() {
        let mark_i = FootswitchConfig::for_hardware(HardwareVersion::MarkI);
        assert_eq!(mark_i.mode_button.index(), 0);
        assert_eq!(mark_i.policy, Policy::ReleaseEdge);

        let mark_ii = FootswitchConfig::default();
        assert_eq!(mark_ii.mode_button, ButtonId::TOP_RIGHT);
        assert_eq!(mark_ii.policy, Policy::PressEdge { debounce: 1 });
        assert_eq!(mark_ii.codes[9], 0x4E);
        assert_eq!(mark_ii.tick_hz, 1);
        assert_eq!(mark_ii.startup_probe, None);
    }

    #[test]
    fn test_rejects_bad_values() {
        let config = FootswitchConfig::default();
        assert_eq!(config.with_mode_button(10), Err(ConfigError::InvalidModeButton(10)));
        assert_eq!(
            config.with_policy(Policy::PressEdge { debounce: 0 }),
            Err(ConfigError::ZeroDebounceDepth)
        );
        assert_eq!(config.with_tick_hz(0), Err(ConfigError::ZeroTickRate));
    }

    #[test]
    fn test_overrides() {
        let button = ButtonId::new(2).unwrap();
        let config = FootswitchConfig::default()
            .with_code(button, 101)
            .with_startup_probe(true)
            .with_mode_button(0)
            .unwrap();
        assert_eq!(config.code(button), 101);
        assert_eq!(config.mode_button.index(), 0);
        assert_eq!(config.startup_probe, Some(STARTUP_PROBE));
    }
}
