// Timed open-loop turns
//
// A turn is a pivot held for a calibrated duration and then braked. Nothing
// here sleeps: starting a turn yields a token with its deadline and the
// caller polls for completion.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use super::heading::{Heading, TurnStep};
use crate::config::MotionConfig;
use crate::motor::MotorState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Maneuver {
    TurnRight90,
    TurnLeft90,
    Turn180,
}

impl Maneuver {
    pub fn step(self) -> TurnStep {
        match self {
            Maneuver::TurnRight90 => TurnStep::Right,
            Maneuver::TurnLeft90 => TurnStep::Left,
            Maneuver::Turn180 => TurnStep::About,
        }
    }

    /// (left, right) wheel states while pivoting.
    ///
    /// The 180 spins clockwise, the same way as the right turn.
    pub fn pivot(self) -> (MotorState, MotorState) {
        match self {
            Maneuver::TurnRight90 | Maneuver::Turn180 => {
                (MotorState::Advancing, MotorState::Reversing)
            }
            Maneuver::TurnLeft90 => (MotorState::Reversing, MotorState::Advancing),
        }
    }

    pub fn duration(self, config: &MotionConfig) -> Duration {
        match self {
            Maneuver::TurnRight90 => config.turn_duration_right90(),
            Maneuver::TurnLeft90 => config.turn_duration_left90(),
            Maneuver::Turn180 => config.turn_duration_180(),
        }
    }
}

/// Handle for a started turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManeuverToken {
    pub maneuver: Maneuver,
    pub started_at: Instant,
    pub busy_until: Instant,
}

impl ManeuverToken {
    pub(crate) fn start(maneuver: Maneuver, now: Instant, config: &MotionConfig) -> Self {
        Self {
            maneuver,
            started_at: now,
            busy_until: now + maneuver.duration(config),
        }
    }

    pub fn is_due(&self, now: Instant) -> bool {
        now >= self.busy_until
    }

    pub fn remaining(&self, now: Instant) -> Duration {
        self.busy_until.saturating_duration_since(now)
    }
}

/// A turn that ran to its deadline and was braked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManeuverOutcome {
    pub maneuver: Maneuver,
    pub heading: Heading,
}
