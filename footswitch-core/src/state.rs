//! Per-button state machines.
//!
//! Every button walks the same cycle, one step per sensed scan:
//!
//! | current | pressed | not pressed |
//! |---------|---------|-------------|
//! | Open    | Down    | Open        |
//! | Down    | Held    | Open        |
//! | Held    | Held    | Up          |
//! | Up      | Held    | Open        |
//!
//! The [`Policy`] decides which transition sends a message.

use crate::matrix::{ButtonId, DriveLine};
use crate::BUTTONS;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum ButtonState {
    #[default]
    Open,
    Down,
    Held,
    Up,
}

impl ButtonState {
    /// One step of the transition table.
    pub const fn next(self, pressed: bool) -> ButtonState {
        match (self, pressed) {
            (ButtonState::Open, true) => ButtonState::Down,
            (_, true) => ButtonState::Held,
            (ButtonState::Held, false) => ButtonState::Up,
            (_, false) => ButtonState::Open,
        }
    }
}

/// Which edge of a press triggers the button.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Policy {
    /// Trigger on entering `Up`, after the button was held. Mark I firmware.
    ReleaseEdge,
    /// Trigger on entering `Down`. A button must be sensed pressed for
    /// `debounce` consecutive scans before it leaves `Open`; `1` accepts the
    /// first pressed scan.
    PressEdge { debounce: u8 },
}

impl Policy {
    pub const fn triggers_on(self) -> ButtonState {
        match self {
            Policy::ReleaseEdge => ButtonState::Up,
            Policy::PressEdge { .. } => ButtonState::Down,
        }
    }

    const fn debounce_depth(self) -> u8 {
        match self {
            Policy::ReleaseEdge => 1,
            Policy::PressEdge { debounce } => debounce,
        }
    }
}

/// Set of buttons that triggered in one scan.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Triggers(u16);

impl Triggers {
    pub const fn none() -> Self {
        Self(0)
    }

    pub fn insert(&mut self, button: ButtonId) {
        self.0 |= 1 << button.index();
    }

    pub const fn contains(&self, button: ButtonId) -> bool {
        self.0 & (1 << button.index()) != 0
    }

    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub const fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Triggered buttons in ascending index order.
    pub fn iter(self) -> impl Iterator<Item = ButtonId> {
        ButtonId::all().filter(move |&id| self.contains(id))
    }
}

/// State of all ten buttons plus the press counters used for debouncing.
pub struct ButtonBank {
    policy: Policy,
    states: [ButtonState; BUTTONS],
    /// Consecutive pressed scans seen while still `Open`.
    counters: [u8; BUTTONS],
}

impl ButtonBank {
    pub const fn new(policy: Policy) -> Self {
        Self {
            policy,
            states: [ButtonState::Open; BUTTONS],
            counters: [0; BUTTONS],
        }
    }

    pub fn state(&self, button: ButtonId) -> ButtonState {
        self.states[button.index()]
    }

    pub fn states(&self) -> &[ButtonState; BUTTONS] {
        &self.states
    }

    /// Advance the five buttons sensed on `line`.
    ///
    /// `pressed` is the decoder output for this scan. Buttons on the other
    /// line are not sensed and keep their state.
    pub fn update(&mut self, line: DriveLine, pressed: Option<ButtonId>) -> Triggers {
        debug_assert!(pressed.map_or(true, |id| id.line() == line));

        let trigger = self.policy.triggers_on();
        let depth = self.policy.debounce_depth();
        let mut triggers = Triggers::none();

        for index in line.buttons() {
            let is_pressed = pressed.is_some_and(|id| id.index() == index);
            let current = self.states[index];

            let next = if current == ButtonState::Open && is_pressed {
                self.counters[index] = self.counters[index].saturating_add(1);
                if self.counters[index] >= depth {
                    ButtonState::Down
                } else {
                    ButtonState::Open
                }
            } else {
                current.next(is_pressed)
            };

            if !is_pressed || next != ButtonState::Open {
                self.counters[index] = 0;
            }

            if next != current && next == trigger {
                if let Some(id) = ButtonId::new(index as u8) {
                    triggers.insert(id);
                }
            }
            self.states[index] = next;
        }

        triggers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn button(index: u8) -> ButtonId {
        ButtonId::new(index).unwrap()
    }

    #[test]
    fn test_transition_table() {
        use ButtonState::*;
        let pressed = [(Open, Down), (Down, Held), (Held, Held), (Up, Held)];
        let released = [(Open, Open), (Down, Open), (Held, Up), (Up, Open)];
        for (from, to) in pressed {
            assert_eq!(from.next(true), to);
        }
        for (from, to) in released {
            assert_eq!(from.next(false), to);
        }
    }

    #[test]
    fn test_release_edge_fires_once_per_press() {
        for id in ButtonId::all() {
            let line = id.line();
            let mut bank = ButtonBank::new(Policy::ReleaseEdge);
            let script = [Some(id), Some(id), None, None, None];
            let fired: Vec<bool> = script
                .iter()
                .map(|&pressed| bank.update(line, pressed).contains(id))
                .collect();
            assert_eq!(fired, [false, false, true, false, false], "button {}", id.index());
            assert_eq!(bank.state(id), ButtonState::Open);
        }
    }

    #[test]
    fn test_release_edge_ignores_tap() {
        // Down then immediately released never reaches Held, so never Up.
        let mut bank = ButtonBank::new(Policy::ReleaseEdge);
        assert!(bank.update(DriveLine::Zero, Some(button(3))).is_empty());
        assert!(bank.update(DriveLine::Zero, None).is_empty());
        assert_eq!(bank.state(button(3)), ButtonState::Open);
    }

    #[test]
    fn test_press_edge_fires_on_first_scan() {
        let mut bank = ButtonBank::new(Policy::PressEdge { debounce: 1 });
        let id = button(2);
        assert!(bank.update(DriveLine::Zero, Some(id)).contains(id));
        assert!(bank.update(DriveLine::Zero, Some(id)).is_empty());
        assert!(bank.update(DriveLine::Zero, None).is_empty());
        assert_eq!(bank.state(id), ButtonState::Up);
        assert!(bank.update(DriveLine::Zero, None).is_empty());
        assert_eq!(bank.state(id), ButtonState::Open);
    }

    #[test]
    fn test_press_edge_changed_mind_on_the_way_up() {
        let mut bank = ButtonBank::new(Policy::PressEdge { debounce: 1 });
        let id = button(7);
        bank.update(DriveLine::One, Some(id));
        bank.update(DriveLine::One, Some(id));
        bank.update(DriveLine::One, None);
        assert_eq!(bank.state(id), ButtonState::Up);
        // Back to Held, not a fresh press.
        assert!(bank.update(DriveLine::One, Some(id)).is_empty());
        assert_eq!(bank.state(id), ButtonState::Held);
    }

    #[test]
    fn test_debounce_depth() {
        let mut bank = ButtonBank::new(Policy::PressEdge { debounce: 3 });
        let id = button(1);
        assert!(bank.update(DriveLine::Zero, Some(id)).is_empty());
        assert!(bank.update(DriveLine::Zero, Some(id)).is_empty());
        assert_eq!(bank.state(id), ButtonState::Open);
        assert!(bank.update(DriveLine::Zero, Some(id)).contains(id));
        assert_eq!(bank.state(id), ButtonState::Down);
    }

    #[test]
    fn test_debounce_counter_resets_on_bounce() {
        let mut bank = ButtonBank::new(Policy::PressEdge { debounce: 2 });
        let id = button(4);
        bank.update(DriveLine::Zero, Some(id));
        bank.update(DriveLine::Zero, None);
        assert!(bank.update(DriveLine::Zero, Some(id)).is_empty());
        assert!(bank.update(DriveLine::Zero, Some(id)).contains(id));
    }

    #[test]
    fn test_other_line_untouched() {
        let mut bank = ButtonBank::new(Policy::ReleaseEdge);
        let held = button(6);
        bank.update(DriveLine::One, Some(held));
        bank.update(DriveLine::One, Some(held));
        let before = *bank.states();

        for _ in 0..4 {
            bank.update(DriveLine::Zero, Some(button(0)));
            bank.update(DriveLine::Zero, None);
        }
        assert_eq!(bank.states()[5..], before[5..]);
        assert_eq!(bank.state(held), ButtonState::Held);
    }

    #[test]
    fn test_switching_buttons_releases_previous() {
        let mut bank = ButtonBank::new(Policy::ReleaseEdge);
        let (a, b) = (button(0), button(1));
        bank.update(DriveLine::Zero, Some(a));
        bank.update(DriveLine::Zero, Some(a));
        let triggers = bank.update(DriveLine::Zero, Some(b));
        assert!(triggers.contains(a));
        assert!(!triggers.contains(b));
        assert_eq!(bank.state(b), ButtonState::Down);
    }

    #[test]
    fn test_triggers_iterate_in_order() {
        let mut triggers = Triggers::none();
        triggers.insert(button(8));
        triggers.insert(button(1));
        let order: Vec<usize> = triggers.iter().map(ButtonId::index).collect();
        assert_eq!(order, [1, 8]);
        assert_eq!(triggers.len(), 2);
    }
}
