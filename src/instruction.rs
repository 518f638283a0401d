//! Actuation vocabulary.
//!
//! Every command the pilot can send to the vehicle is one `Instruction`. The
//! wire representation is a bare string used verbatim as the request body.

use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use serde::Deserialize;

/// One discrete actuation command.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Instruction {
    SteerLeftServo,
    SteerRightServo,
    TurnLeft,
    TurnRight,
    MoveForward,
    Stop,
    /// Re-zero the steering servo before motor-relative commands begin.
    ResetServoActuator,
}

impl Instruction {
    pub const ALL: [Instruction; 7] = [
        Instruction::SteerLeftServo,
        Instruction::SteerRightServo,
        Instruction::TurnLeft,
        Instruction::TurnRight,
        Instruction::MoveForward,
        Instruction::Stop,
        Instruction::ResetServoActuator,
    ];

    /// Standard wire string.
    pub fn as_str(self) -> &'static str {
        self.wire(WireFormat::Standard)
    }

    /// Wire string for the given vocabulary.
    pub fn wire(self, format: WireFormat) -> &'static str {
        match format {
            WireFormat::Standard => match self {
                Instruction::SteerLeftServo => "steer-left-servo",
                Instruction::SteerRightServo => "steer-right-servo",
                Instruction::TurnLeft => "turn-left",
                Instruction::TurnRight => "turn-right",
                Instruction::MoveForward => "move-forward",
                Instruction::Stop => "stop",
                Instruction::ResetServoActuator => "reset-servo-actuator",
            },
            WireFormat::Legacy => match self {
                Instruction::SteerLeftServo => "servol",
                Instruction::SteerRightServo => "servor",
                Instruction::TurnLeft => "left",
                Instruction::TurnRight => "right",
                Instruction::MoveForward => "fw",
                Instruction::Stop => "stop",
                Instruction::ResetServoActuator => "rstservo",
            },
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Vocabulary spoken by the vehicle firmware.
///
/// `Legacy` is the short-form vocabulary of older ESP32 firmware builds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireFormat {
    #[default]
    Standard,
    Legacy,
}

impl FromStr for WireFormat {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "standard" => Ok(WireFormat::Standard),
            "legacy" => Ok(WireFormat::Legacy),
            other => Err(anyhow!(
                "unknown wire format '{}'; expected 'standard' or 'legacy'",
                other
            )),
        }
    }
}
