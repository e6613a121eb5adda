// Define message types for the runtime

use serde::{Deserialize, Serialize};

use crate::motion::{Heading, Maneuver};
use crate::motor::{MotorState, WheelSide};

/// Command from the navigation layer / teleop -> runtime
///
/// Wire format is JSON tagged by `cmd`, e.g. `{"cmd":"turn_right90"}` or
/// `{"cmd":"set_correction","side":"left","bias":5}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum MotionCommand {
    Init,
    Advance,
    Stop,
    Halt,
    TurnRight90,
    TurnLeft90,
    Turn180,
    SetSprint { enabled: bool },
    SetCorrection { side: WheelSide, bias: i16 },
    ClearFault,
}

/// Per-wheel part of the motion report
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WheelReport {
    pub state: MotorState,
    pub speed: u16,
    pub effective_speed: u16,
    pub turn_speed: u16,
    pub correction: i16,
}

/// Motion state published by runtime
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotionReport {
    pub heading: Heading,
    pub left: WheelReport,
    pub right: WheelReport,
    pub sprint: bool,
    pub maneuver: Option<Maneuver>,
    pub busy_ms: Option<u64>,
    pub fault: Option<String>,
}

/// Health status published by runtime
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeHealth {
    Ok,
    CmdStale,
    Fault,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_wire_format() {
        let cmd: MotionCommand = serde_json::from_str(r#"{"cmd":"turn_right90"}"#).unwrap();
        assert_eq!(cmd, MotionCommand::TurnRight90);

        let cmd: MotionCommand =
            serde_json::from_str(r#"{"cmd":"set_correction","side":"left","bias":5}"#).unwrap();
        assert_eq!(
            cmd,
            MotionCommand::SetCorrection {
                side: WheelSide::Left,
                bias: 5
            }
        );

        let json = serde_json::to_string(&MotionCommand::SetSprint { enabled: true }).unwrap();
        assert_eq!(json, r#"{"cmd":"set_sprint","enabled":true}"#);
    }

    #[test]
    fn test_unknown_command_rejected() {
        assert!(serde_json::from_str::<MotionCommand>(r#"{"cmd":"moonwalk"}"#).is_err());
    }

    #[test]
    fn test_health_wire_format() {
        assert_eq!(
            serde_json::to_string(&RuntimeHealth::CmdStale).unwrap(),
            r#""cmd_stale""#
        );
    }
}
