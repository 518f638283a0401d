//! Operating mode state machine.
//!
//! Three reachable combined states: `ObjectDetection`, and `FollowPerson`
//! with either the `Servo` or the `Motor` sub-mode. The sub-mode is
//! independent state: it survives mode toggles and only `toggle_submode`
//! changes it.

use std::fmt;

use crate::input::InputEvent;
use crate::instruction::Instruction;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Mode {
    /// Draw every detection, never actuate.
    #[default]
    ObjectDetection,
    /// Track the person class and steer toward it.
    FollowPerson,
}

/// Actuation addressing scheme used while following.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FollowSubMode {
    /// Pan the camera servo toward the target.
    #[default]
    Servo,
    /// Drive the chassis motors toward the target.
    Motor,
}

/// What applying one input event did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    /// The event has no transition in the current state.
    Ignored,
    ModeChanged(Mode),
    SubModeChanged {
        sub_mode: FollowSubMode,
        /// One-off instruction to dispatch immediately.
        side_effect: Option<Instruction>,
    },
    Quit,
}

impl Transition {
    pub fn side_effect(&self) -> Option<Instruction> {
        match self {
            Transition::SubModeChanged { side_effect, .. } => *side_effect,
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ModeMachine {
    mode: Mode,
    sub_mode: FollowSubMode,
}

impl ModeMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn sub_mode(&self) -> FollowSubMode {
        self.sub_mode
    }

    pub fn is_following(&self) -> bool {
        self.mode == Mode::FollowPerson
    }

    pub fn toggle_mode(&mut self) -> Mode {
        self.mode = match self.mode {
            Mode::ObjectDetection => Mode::FollowPerson,
            Mode::FollowPerson => Mode::ObjectDetection,
        };
        self.mode
    }

    /// Flip the sub-mode. Returns `None` when not following (event ignored).
    ///
    /// Entering `Motor` yields `ResetServoActuator` so the vehicle can re-centre
    /// its servo before motor-relative commands start.
    pub fn toggle_submode(&mut self) -> Option<Transition> {
        if !self.is_following() {
            return None;
        }
        let (sub_mode, side_effect) = match self.sub_mode {
            FollowSubMode::Servo => (FollowSubMode::Motor, Some(Instruction::ResetServoActuator)),
            FollowSubMode::Motor => (FollowSubMode::Servo, None),
        };
        self.sub_mode = sub_mode;
        Some(Transition::SubModeChanged {
            sub_mode,
            side_effect,
        })
    }

    pub fn apply(&mut self, event: InputEvent) -> Transition {
        match event {
            InputEvent::Quit => Transition::Quit,
            InputEvent::ToggleMode => Transition::ModeChanged(self.toggle_mode()),
            InputEvent::ToggleSubmode => self.toggle_submode().unwrap_or(Transition::Ignored),
        }
    }
}

impl fmt::Display for ModeMachine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.mode, self.sub_mode) {
            (Mode::ObjectDetection, _) => f.write_str("Object detection mode"),
            (Mode::FollowPerson, FollowSubMode::Servo) => f.write_str("Follow person mode (Servo)"),
            (Mode::FollowPerson, FollowSubMode::Motor) => {
                f.write_str("Follow person mode (Car follow)")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_in_detection_with_servo() {
        let machine = ModeMachine::new();
        assert_eq!(machine.mode(), Mode::ObjectDetection);
        assert_eq!(machine.sub_mode(), FollowSubMode::Servo);
    }

    #[test]
    fn toggle_mode_twice_restores_and_keeps_sub_mode() {
        let mut machine = ModeMachine::new();
        machine.toggle_mode();
        machine.toggle_submode();
        let before = machine.clone();

        machine.toggle_mode();
        assert_eq!(machine.mode(), Mode::ObjectDetection);
        assert_eq!(machine.sub_mode(), FollowSubMode::Motor);
        machine.toggle_mode();
        assert_eq!(machine, before);
    }

    #[test]
    fn submode_toggle_ignored_outside_follow() {
        let mut machine = ModeMachine::new();
        assert_eq!(machine.apply(InputEvent::ToggleSubmode), Transition::Ignored);
        assert_eq!(machine.sub_mode(), FollowSubMode::Servo);
    }

    #[test]
    fn only_servo_to_motor_resets_actuator() {
        let mut machine = ModeMachine::new();
        machine.apply(InputEvent::ToggleMode);

        let to_motor = machine.apply(InputEvent::ToggleSubmode);
        assert_eq!(to_motor.side_effect(), Some(Instruction::ResetServoActuator));
        assert_eq!(machine.sub_mode(), FollowSubMode::Motor);

        let to_servo = machine.apply(InputEvent::ToggleSubmode);
        assert_eq!(to_servo.side_effect(), None);
        assert_eq!(machine.sub_mode(), FollowSubMode::Servo);
    }

    #[test]
    fn sub_mode_survives_leaving_follow() {
        let mut machine = ModeMachine::new();
        machine.apply(InputEvent::ToggleMode);
        machine.apply(InputEvent::ToggleSubmode);
        machine.apply(InputEvent::ToggleMode);
        machine.apply(InputEvent::ToggleMode);
        assert!(machine.is_following());
        assert_eq!(machine.sub_mode(), FollowSubMode::Motor);
        assert_eq!(machine.to_string(), "Follow person mode (Car follow)");
    }

    #[test]
    fn quit_does_not_touch_state() {
        let mut machine = ModeMachine::new();
        assert_eq!(machine.apply(InputEvent::Quit), Transition::Quit);
        assert_eq!(machine, ModeMachine::new());
    }
}
