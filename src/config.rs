// Timeouts, topics, speed and turn calibration
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::motion::heading::Heading;
use crate::motion::WheelPair;
use crate::motor::WheelSide;

// Runtime loop frequency
pub const LOOP_HZ: u64 = 100;

// Command timeout for watchdog (only enforced while advancing)
pub const CMD_TIMEOUT: Duration = Duration::from_millis(500);

// Zenoh topics
pub const TOPIC_CMD_MOTION: &str = "micromouse/cmd/motion"; // commands
pub const TOPIC_STATE_MOTION: &str = "micromouse/state/motion"; // motion report
pub const TOPIC_HEALTH: &str = "micromouse/state/health"; // health status

// Serial port of the H-bridge controller board
pub const MOTOR_PORT: &str = "/dev/ttyACM0";

// PWM timer period: full duty
pub const MAX_SPEED: u16 = 1000;

// Default speed levels (PWM compare units)
pub const ADVANCE_SPEED_LEFT: u16 = 700;
pub const ADVANCE_SPEED_RIGHT: u16 = 720;
pub const TURN_SPEED_LEFT: u16 = 800;
pub const TURN_SPEED_RIGHT: u16 = 800;
pub const SPRINT_SPEED_LEFT: u16 = 950;
pub const SPRINT_SPEED_RIGHT: u16 = 970;

// Turn durations in milliseconds (calibrate on the floor surface in use)
pub const TURN_DURATION_RIGHT90_MS: u64 = 500;
pub const TURN_DURATION_LEFT90_MS: u64 = 500;
pub const TURN_DURATION_180_MS: u64 = 1000;

/// Error types for loading and validating the motion configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error reading config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("max_speed must be non-zero")]
    ZeroMaxSpeed,

    #[error("{field} = {value} exceeds max_speed {max}")]
    SpeedOutOfRange {
        field: &'static str,
        value: u16,
        max: u16,
    },

    #[error("{side:?} sprint speed {sprint} must exceed advance {advance} and turn {turn}")]
    SprintTooSlow {
        side: WheelSide,
        sprint: u16,
        advance: u16,
        turn: u16,
    },

    #[error("{field} must be non-zero")]
    ZeroDuration { field: &'static str },
}

/// Calibration for the motion core.
///
/// Every field has a default from the constants above, so a config file only
/// needs the values it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    pub max_speed: u16,
    pub advance_speed_left: u16,
    pub advance_speed_right: u16,
    pub turn_speed_left: u16,
    pub turn_speed_right: u16,
    pub sprint_speed_left: u16,
    pub sprint_speed_right: u16,
    pub turn_duration_right90_ms: u64,
    pub turn_duration_left90_ms: u64,
    pub turn_duration_180_ms: u64,
    pub correction_left: i16,
    pub correction_right: i16,
    pub initial_heading: Heading,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            max_speed: MAX_SPEED,
            advance_speed_left: ADVANCE_SPEED_LEFT,
            advance_speed_right: ADVANCE_SPEED_RIGHT,
            turn_speed_left: TURN_SPEED_LEFT,
            turn_speed_right: TURN_SPEED_RIGHT,
            sprint_speed_left: SPRINT_SPEED_LEFT,
            sprint_speed_right: SPRINT_SPEED_RIGHT,
            turn_duration_right90_ms: TURN_DURATION_RIGHT90_MS,
            turn_duration_left90_ms: TURN_DURATION_LEFT90_MS,
            turn_duration_180_ms: TURN_DURATION_180_MS,
            correction_left: 0,
            correction_right: 0,
            initial_heading: Heading::North,
        }
    }
}

impl MotionConfig {
    /// Load a config from a JSON file and validate it
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    /// Parse a config from JSON and validate it
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the configuration invariants.
    ///
    /// Sprint speed must be strictly above both the advance and the turn
    /// speed of the same wheel, and no level may exceed `max_speed`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_speed == 0 {
            return Err(ConfigError::ZeroMaxSpeed);
        }

        let levels = [
            ("advance_speed_left", self.advance_speed_left),
            ("advance_speed_right", self.advance_speed_right),
            ("turn_speed_left", self.turn_speed_left),
            ("turn_speed_right", self.turn_speed_right),
            ("sprint_speed_left", self.sprint_speed_left),
            ("sprint_speed_right", self.sprint_speed_right),
        ];
        for (field, value) in levels {
            if value > self.max_speed {
                return Err(ConfigError::SpeedOutOfRange {
                    field,
                    value,
                    max: self.max_speed,
                });
            }
        }

        for side in [WheelSide::Left, WheelSide::Right] {
            let sprint = *self.sprint_speeds().get(side);
            let advance = *self.advance_speeds().get(side);
            let turn = *self.turn_speeds().get(side);
            if sprint <= advance || sprint <= turn {
                return Err(ConfigError::SprintTooSlow {
                    side,
                    sprint,
                    advance,
                    turn,
                });
            }
        }

        let durations = [
            ("turn_duration_right90_ms", self.turn_duration_right90_ms),
            ("turn_duration_left90_ms", self.turn_duration_left90_ms),
            ("turn_duration_180_ms", self.turn_duration_180_ms),
        ];
        for (field, ms) in durations {
            if ms == 0 {
                return Err(ConfigError::ZeroDuration { field });
            }
        }

        Ok(())
    }

    pub fn advance_speeds(&self) -> WheelPair<u16> {
        WheelPair::new(self.advance_speed_left, self.advance_speed_right)
    }

    pub fn turn_speeds(&self) -> WheelPair<u16> {
        WheelPair::new(self.turn_speed_left, self.turn_speed_right)
    }

    pub fn sprint_speeds(&self) -> WheelPair<u16> {
        WheelPair::new(self.sprint_speed_left, self.sprint_speed_right)
    }

    pub fn corrections(&self) -> WheelPair<i16> {
        WheelPair::new(self.correction_left, self.correction_right)
    }

    pub fn turn_duration_right90(&self) -> Duration {
        Duration::from_millis(self.turn_duration_right90_ms)
    }

    pub fn turn_duration_left90(&self) -> Duration {
        Duration::from_millis(self.turn_duration_left90_ms)
    }

    pub fn turn_duration_180(&self) -> Duration {
        Duration::from_millis(self.turn_duration_180_ms)
    }
}
