//! Anchor-to-instruction policy.
//!
//! Bang-bang control with a dead zone, no hysteresis. Thresholds are defined
//! against a reference frame width and scale proportionally to the width of
//! the frame actually being processed.

use std::cmp::Ordering;

use anyhow::{anyhow, Result};

use crate::control::locator::AnchorPoint;
use crate::control::mode::{FollowSubMode, ModeMachine};
use crate::instruction::Instruction;

pub const REFERENCE_FRAME_WIDTH: u32 = 640;

/// Horizontal thresholds in reference-frame pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PolicyThresholds {
    pub reference_width: u32,
    /// Servo: steer left when `x < servo_left`.
    pub servo_left: u32,
    /// Servo: steer right when `x > servo_right`.
    pub servo_right: u32,
    /// Motor: turn left when `x <= motor_left`.
    pub motor_left: u32,
    /// Motor: turn right when `x >= motor_right`.
    pub motor_right: u32,
}

impl Default for PolicyThresholds {
    fn default() -> Self {
        Self {
            reference_width: REFERENCE_FRAME_WIDTH,
            servo_left: 220,
            servo_right: 420,
            motor_left: 150,
            motor_right: 490,
        }
    }
}

impl PolicyThresholds {
    pub fn validate(&self) -> Result<()> {
        if self.reference_width == 0 {
            return Err(anyhow!("policy reference width must be greater than zero"));
        }
        if self.servo_left > self.servo_right {
            return Err(anyhow!(
                "servo_left ({}) must not exceed servo_right ({})",
                self.servo_left,
                self.servo_right
            ));
        }
        if self.motor_left >= self.motor_right {
            return Err(anyhow!(
                "motor_left ({}) must be below motor_right ({})",
                self.motor_left,
                self.motor_right
            ));
        }
        let widest = self.servo_right.max(self.motor_right);
        if widest > self.reference_width {
            return Err(anyhow!(
                "threshold {} lies outside the {}px reference width",
                widest,
                self.reference_width
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default)]
pub struct CommandPolicy {
    thresholds: PolicyThresholds,
}

impl CommandPolicy {
    pub fn new(thresholds: PolicyThresholds) -> Self {
        Self { thresholds }
    }

    /// Decide this frame's instruction.
    ///
    /// - not following: never an instruction
    /// - following without a target: `Stop`
    /// - following with a target: the sub-mode's threshold table on `x`
    pub fn decide(
        &self,
        machine: &ModeMachine,
        anchor: Option<AnchorPoint>,
        frame_width: u32,
    ) -> Option<Instruction> {
        if !machine.is_following() {
            return None;
        }
        let Some(anchor) = anchor else {
            return Some(Instruction::Stop);
        };
        let t = &self.thresholds;
        let x = anchor.x;
        match machine.sub_mode() {
            FollowSubMode::Servo => {
                if self.compare(x, t.servo_left, frame_width) == Ordering::Less {
                    Some(Instruction::SteerLeftServo)
                } else if self.compare(x, t.servo_right, frame_width) == Ordering::Greater {
                    Some(Instruction::SteerRightServo)
                } else {
                    None
                }
            }
            FollowSubMode::Motor => {
                if self.compare(x, t.motor_left, frame_width) != Ordering::Greater {
                    Some(Instruction::TurnLeft)
                } else if self.compare(x, t.motor_right, frame_width) != Ordering::Less {
                    Some(Instruction::TurnRight)
                } else {
                    Some(Instruction::MoveForward)
                }
            }
        }
    }

    /// Compare `x` against `threshold` scaled to `frame_width`, exactly.
    fn compare(&self, x: i32, threshold: u32, frame_width: u32) -> Ordering {
        let reference = self.thresholds.reference_width.max(1) as i64;
        let width = if frame_width == 0 {
            reference
        } else {
            frame_width as i64
        };
        (x as i64 * reference).cmp(&(threshold as i64 * width))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::InputEvent;

    fn following(sub_mode: FollowSubMode) -> ModeMachine {
        let mut machine = ModeMachine::new();
        machine.apply(InputEvent::ToggleMode);
        if sub_mode == FollowSubMode::Motor {
            machine.apply(InputEvent::ToggleSubmode);
        }
        machine
    }

    fn at(x: i32) -> Option<AnchorPoint> {
        Some(AnchorPoint { x, y: 240 })
    }

    #[test]
    fn detection_mode_never_actuates() {
        let policy = CommandPolicy::default();
        let machine = ModeMachine::new();
        for x in [-50, 0, 150, 320, 490, 640, 900] {
            assert_eq!(policy.decide(&machine, at(x), 640), None);
        }
        assert_eq!(policy.decide(&machine, None, 640), None);
    }

    #[test]
    fn lost_target_stops_in_both_sub_modes() {
        let policy = CommandPolicy::default();
        for sub_mode in [FollowSubMode::Servo, FollowSubMode::Motor] {
            assert_eq!(
                policy.decide(&following(sub_mode), None, 640),
                Some(Instruction::Stop)
            );
        }
    }

    #[test]
    fn servo_table_and_dead_zone_boundaries() {
        let policy = CommandPolicy::default();
        let machine = following(FollowSubMode::Servo);
        let decide = |x| policy.decide(&machine, at(x), 640);
        assert_eq!(decide(0), Some(Instruction::SteerLeftServo));
        assert_eq!(decide(219), Some(Instruction::SteerLeftServo));
        assert_eq!(decide(220), None);
        assert_eq!(decide(320), None);
        assert_eq!(decide(420), None);
        assert_eq!(decide(421), Some(Instruction::SteerRightServo));
        assert_eq!(decide(639), Some(Instruction::SteerRightServo));
    }

    #[test]
    fn motor_table_boundaries() {
        let policy = CommandPolicy::default();
        let machine = following(FollowSubMode::Motor);
        let decide = |x| policy.decide(&machine, at(x), 640);
        assert_eq!(decide(10), Some(Instruction::TurnLeft));
        assert_eq!(decide(150), Some(Instruction::TurnLeft));
        assert_eq!(decide(151), Some(Instruction::MoveForward));
        assert_eq!(decide(489), Some(Instruction::MoveForward));
        assert_eq!(decide(490), Some(Instruction::TurnRight));
        assert_eq!(decide(600), Some(Instruction::TurnRight));
    }

    #[test]
    fn thresholds_scale_with_frame_width() {
        let policy = CommandPolicy::default();
        let servo = following(FollowSubMode::Servo);
        let motor = following(FollowSubMode::Motor);
        // 320px wide: servo dead zone 110..=210, motor edges 75 / 245.
        assert_eq!(policy.decide(&servo, at(109), 320), Some(Instruction::SteerLeftServo));
        assert_eq!(policy.decide(&servo, at(110), 320), None);
        assert_eq!(policy.decide(&servo, at(210), 320), None);
        assert_eq!(policy.decide(&servo, at(211), 320), Some(Instruction::SteerRightServo));
        assert_eq!(policy.decide(&motor, at(75), 320), Some(Instruction::TurnLeft));
        assert_eq!(policy.decide(&motor, at(76), 320), Some(Instruction::MoveForward));
        assert_eq!(policy.decide(&motor, at(245), 320), Some(Instruction::TurnRight));
    }

    #[test]
    fn y_is_ignored() {
        let policy = CommandPolicy::default();
        let machine = following(FollowSubMode::Servo);
        let high = Some(AnchorPoint { x: 100, y: 0 });
        let low = Some(AnchorPoint { x: 100, y: 479 });
        assert_eq!(policy.decide(&machine, high, 640), policy.decide(&machine, low, 640));
    }

    #[test]
    fn validate_rejects_inverted_thresholds() {
        assert!(PolicyThresholds::default().validate().is_ok());
        let inverted = PolicyThresholds {
            motor_left: 500,
            ..PolicyThresholds::default()
        };
        assert!(inverted.validate().is_err());
        let zero = PolicyThresholds {
            reference_width: 0,
            ..PolicyThresholds::default()
        };
        assert!(zero.validate().is_err());
        let outside = PolicyThresholds {
            servo_right: 700,
            ..PolicyThresholds::default()
        };
        assert!(outside.validate().is_err());
    }
}
