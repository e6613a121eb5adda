// Speed profile: advance, turn and sprint levels per wheel

use serde::Serialize;

use super::WheelPair;
use crate::config::MotionConfig;

/// What the speeds are going to be used for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeedIntent {
    Advance,
    Turn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SpeedProfile {
    pub advance: WheelPair<u16>,
    pub turn: WheelPair<u16>,
    pub sprint: WheelPair<u16>,
    pub sprint_enabled: bool,
}

impl SpeedProfile {
    /// Profile loaded from config, sprint off
    pub fn from_config(config: &MotionConfig) -> Self {
        Self {
            advance: config.advance_speeds(),
            turn: config.turn_speeds(),
            sprint: config.sprint_speeds(),
            sprint_enabled: false,
        }
    }

    /// Only read at the start of the next advance or turn
    pub fn set_sprint_mode(&mut self, enabled: bool) {
        self.sprint_enabled = enabled;
    }

    /// Per-wheel speeds for `intent` in the current mode, before drift correction
    pub fn active_speeds(&self, intent: SpeedIntent) -> WheelPair<u16> {
        if self.sprint_enabled {
            return self.sprint;
        }
        match intent {
            SpeedIntent::Advance => self.advance,
            SpeedIntent::Turn => self.turn,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        ADVANCE_SPEED_LEFT, ADVANCE_SPEED_RIGHT, SPRINT_SPEED_LEFT, SPRINT_SPEED_RIGHT,
        TURN_SPEED_LEFT, TURN_SPEED_RIGHT,
    };

    #[test]
    fn test_normal_mode_speeds() {
        let profile = SpeedProfile::from_config(&MotionConfig::default());
        assert!(!profile.sprint_enabled);
        assert_eq!(
            profile.active_speeds(SpeedIntent::Advance),
            WheelPair::new(ADVANCE_SPEED_LEFT, ADVANCE_SPEED_RIGHT)
        );
        assert_eq!(
            profile.active_speeds(SpeedIntent::Turn),
            WheelPair::new(TURN_SPEED_LEFT, TURN_SPEED_RIGHT)
        );
    }

    #[test]
    fn test_sprint_mode_overrides_both_intents() {
        let mut profile = SpeedProfile::from_config(&MotionConfig::default());
        profile.set_sprint_mode(true);
        let sprint = WheelPair::new(SPRINT_SPEED_LEFT, SPRINT_SPEED_RIGHT);
        assert_eq!(profile.active_speeds(SpeedIntent::Advance), sprint);
        assert_eq!(profile.active_speeds(SpeedIntent::Turn), sprint);

        profile.set_sprint_mode(false);
        assert_eq!(profile.active_speeds(SpeedIntent::Advance).left, ADVANCE_SPEED_LEFT);
    }
}
