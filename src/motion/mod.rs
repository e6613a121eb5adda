// Motion control core for the micromouse base
//
// `MotionController` is the single context object holding both wheels, the
// speed profile, drift correction and heading. The caller owns it and every
// operation takes `&mut self`.

pub mod correction;
pub mod heading;
pub mod maneuver;
pub mod profile;

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::config::{ConfigError, MotionConfig};
use crate::messages::{MotionReport, WheelReport};
use crate::motor::{DriverError, Motor, MotorBank, MotorDriver, WheelSide};

pub use correction::DriftCorrection;
pub use heading::{Heading, HeadingTracker, TurnStep};
pub use maneuver::{Maneuver, ManeuverOutcome, ManeuverToken};
pub use profile::{SpeedIntent, SpeedProfile};

/// A value per wheel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WheelPair<T> {
    pub left: T,
    pub right: T,
}

impl<T> WheelPair<T> {
    pub fn new(left: T, right: T) -> Self {
        Self { left, right }
    }

    pub fn get(&self, side: WheelSide) -> &T {
        match side {
            WheelSide::Left => &self.left,
            WheelSide::Right => &self.right,
        }
    }

    pub fn get_mut(&mut self, side: WheelSide) -> &mut T {
        match side {
            WheelSide::Left => &mut self.left,
            WheelSide::Right => &mut self.right,
        }
    }
}

/// Latched motor driver failure, held until `clear_fault` or `init`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fault {
    pub message: String,
}

/// Error types for motion commands
#[derive(Debug, thiserror::Error)]
pub enum MotionError {
    #[error("{maneuver:?} in progress, {remaining:?} remaining")]
    Busy {
        maneuver: Maneuver,
        remaining: Duration,
    },

    #[error("Motor driver faulted: {0}")]
    Faulted(String),

    #[error("Motor driver error: {0}")]
    Driver(#[from] DriverError),

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

pub struct MotionController<D: MotorDriver> {
    config: MotionConfig,
    motors: MotorBank<D>,
    profile: SpeedProfile,
    correction: DriftCorrection,
    heading: HeadingTracker,
    active: Option<ManeuverToken>,
    effective: WheelPair<u16>,
    turn: WheelPair<u16>,
    fault: Option<Fault>,
}

impl<D: MotorDriver> MotionController<D> {
    /// Validate `config`, take ownership of the driver and run `init`
    pub fn new(config: MotionConfig, driver: D) -> Result<Self, MotionError> {
        config.validate()?;
        let mut controller = Self {
            motors: MotorBank::new(driver, config.max_speed),
            profile: SpeedProfile::from_config(&config),
            correction: DriftCorrection::new(config.corrections()),
            heading: HeadingTracker::new(config.initial_heading),
            active: None,
            effective: WheelPair::default(),
            turn: WheelPair::default(),
            fault: None,
            config,
        };
        controller.init()?;
        Ok(controller)
    }

    /// Reset everything to the configured defaults and brake both wheels.
    ///
    /// Cancels any active maneuver and clears a latched fault. Safe to call
    /// repeatedly.
    pub fn init(&mut self) -> Result<(), MotionError> {
        self.active = None;
        self.profile = SpeedProfile::from_config(&self.config);
        self.correction = DriftCorrection::new(self.config.corrections());
        self.heading.reset(self.config.initial_heading);
        self.effective = WheelPair::default();
        self.turn = WheelPair::default();
        self.fault = None;

        if let Err(e) = self.motors.init() {
            return Err(self.on_driver_error(e));
        }
        info!(
            "Motion core initialized: heading {:?}, max speed {}",
            self.heading.current(),
            self.motors.max_speed()
        );
        Ok(())
    }

    /// Drive straight at the active advance speeds plus drift correction
    pub fn advance(&mut self, now: Instant) -> Result<WheelPair<u16>, MotionError> {
        self.ensure_ready(now)?;

        let base = self.profile.active_speeds(SpeedIntent::Advance);
        let left = self.correction.apply(WheelSide::Left, base.left);
        let right = self.correction.apply(WheelSide::Right, base.right);

        match self.motors.advance(left, right) {
            Ok((left, right)) => {
                self.effective = WheelPair::new(left, right);
                debug!("Advancing: left={}, right={}", left, right);
                Ok(self.effective)
            }
            Err(e) => Err(self.on_driver_error(e)),
        }
    }

    /// Brake both wheels. Refused while a turn is in progress; use `halt`
    /// to abort one.
    pub fn stop(&mut self, now: Instant) -> Result<(), MotionError> {
        self.ensure_idle(now)?;
        if let Err(e) = self.motors.stop() {
            return Err(self.on_driver_error(e));
        }
        debug!("Stopped");
        Ok(())
    }

    /// Emergency stop: always accepted.
    ///
    /// Cancels an active maneuver without changing the heading and brakes
    /// both wheels before returning. Returns the cancelled maneuver, if any.
    pub fn halt(&mut self) -> Result<Option<Maneuver>, MotionError> {
        let cancelled = self.active.take().map(|token| token.maneuver);
        if let Some(maneuver) = cancelled {
            warn!("Halting: {:?} cancelled, heading stays {:?}", maneuver, self.heading.current());
        }
        if let Err(e) = self.motors.stop() {
            return Err(self.on_driver_error(e));
        }
        Ok(cancelled)
    }

    /// Directly set one wheel's speed, clamped into `[0, max_speed]`
    pub fn set_wheel_speed(
        &mut self,
        side: WheelSide,
        requested: i32,
        now: Instant,
    ) -> Result<u16, MotionError> {
        self.ensure_ready(now)?;
        self.motors
            .set_wheel_speed(side, requested)
            .map_err(|e| self.on_driver_error(e))
    }

    pub fn turn_right90(&mut self, now: Instant) -> Result<ManeuverToken, MotionError> {
        self.begin(Maneuver::TurnRight90, now)
    }

    pub fn turn_left90(&mut self, now: Instant) -> Result<ManeuverToken, MotionError> {
        self.begin(Maneuver::TurnLeft90, now)
    }

    pub fn turn180(&mut self, now: Instant) -> Result<ManeuverToken, MotionError> {
        self.begin(Maneuver::Turn180, now)
    }

    /// Start a pivot at the active turn speeds.
    ///
    /// The robot keeps pivoting until `poll` sees the deadline pass (or
    /// `halt` aborts it). Drift correction is not applied to turns.
    pub fn begin(&mut self, maneuver: Maneuver, now: Instant) -> Result<ManeuverToken, MotionError> {
        self.ensure_ready(now)?;

        let speeds = self.profile.active_speeds(SpeedIntent::Turn);
        let (left_state, right_state) = maneuver.pivot();
        let pivot = self
            .motors
            .drive(WheelSide::Left, left_state, i32::from(speeds.left))
            .and_then(|left| {
                self.motors
                    .drive(WheelSide::Right, right_state, i32::from(speeds.right))
                    .map(|right| (left, right))
            });
        let (left, right) = match pivot {
            Ok(written) => written,
            Err(e) => return Err(self.on_driver_error(e)),
        };

        self.turn = WheelPair::new(left, right);
        let token = ManeuverToken::start(maneuver, now, &self.config);
        self.active = Some(token);
        info!(
            "{:?} started from {:?}: left={}, right={}, {}ms",
            maneuver,
            self.heading.current(),
            left,
            right,
            (token.busy_until - token.started_at).as_millis()
        );
        Ok(token)
    }

    /// Finish the active maneuver if its deadline has passed
    pub fn poll(&mut self, now: Instant) -> Result<Option<ManeuverOutcome>, MotionError> {
        match self.active {
            Some(token) if token.is_due(now) => self.finish(token).map(Some),
            _ => Ok(None),
        }
    }

    /// Run a maneuver to completion, sleeping out its duration.
    ///
    /// If the returned future is dropped before the turn completes, both
    /// wheels are braked and the heading is left unchanged.
    pub async fn execute(&mut self, maneuver: Maneuver) -> Result<ManeuverOutcome, MotionError> {
        let token = self.begin(maneuver, Instant::now())?;
        let mut guard = HaltOnDrop {
            controller: self,
            armed: true,
        };
        tokio::time::sleep_until(tokio::time::Instant::from_std(token.busy_until)).await;
        guard.armed = false;
        guard.controller.finish(token)
    }

    pub fn set_sprint_mode(&mut self, enabled: bool) {
        if self.profile.sprint_enabled != enabled {
            info!("Sprint mode {}", if enabled { "on" } else { "off" });
        }
        self.profile.set_sprint_mode(enabled);
    }

    /// Takes effect on the next `advance`
    pub fn set_correction(&mut self, side: WheelSide, bias: i16) {
        info!("{:?} wheel drift correction set to {:+}", side, bias);
        self.correction.set(side, bias);
    }

    /// Forget a latched fault so motion commands are accepted again
    pub fn clear_fault(&mut self) {
        if let Some(fault) = self.fault.take() {
            info!("Clearing motor fault: {}", fault.message);
        }
    }

    pub fn heading(&self) -> Heading {
        self.heading.current()
    }

    /// Last straight-line speed sent for `side`, correction included
    pub fn effective_speed(&self, side: WheelSide) -> u16 {
        *self.effective.get(side)
    }

    /// Last pivot speed sent for `side`
    pub fn turn_speed(&self, side: WheelSide) -> u16 {
        *self.turn.get(side)
    }

    pub fn motor(&self, side: WheelSide) -> &Motor {
        self.motors.motor(side)
    }

    pub fn profile(&self) -> &SpeedProfile {
        &self.profile
    }

    pub fn correction(&self) -> &DriftCorrection {
        &self.correction
    }

    pub fn config(&self) -> &MotionConfig {
        &self.config
    }

    pub fn fault(&self) -> Option<&Fault> {
        self.fault.as_ref()
    }

    pub fn active_maneuver(&self) -> Option<ManeuverToken> {
        self.active
    }

    pub fn is_busy(&self, now: Instant) -> bool {
        self.active.is_some_and(|token| !token.is_due(now))
    }

    pub fn driver(&self) -> &D {
        self.motors.driver()
    }

    pub fn driver_mut(&mut self) -> &mut D {
        self.motors.driver_mut()
    }

    /// Snapshot for telemetry
    pub fn report(&self, now: Instant) -> MotionReport {
        let wheel = |side| {
            let motor = self.motors.motor(side);
            WheelReport {
                state: motor.state(),
                speed: motor.speed(),
                effective_speed: self.effective_speed(side),
                turn_speed: self.turn_speed(side),
                correction: self.correction.bias(side),
            }
        };
        MotionReport {
            heading: self.heading.current(),
            left: wheel(WheelSide::Left),
            right: wheel(WheelSide::Right),
            sprint: self.profile.sprint_enabled,
            maneuver: self.active.map(|token| token.maneuver),
            busy_ms: self
                .active
                .map(|token| token.remaining(now).as_millis() as u64),
            fault: self.fault.as_ref().map(|fault| fault.message.clone()),
        }
    }

    fn finish(&mut self, token: ManeuverToken) -> Result<ManeuverOutcome, MotionError> {
        self.active = None;
        if let Err(e) = self.motors.stop() {
            return Err(self.on_driver_error(e));
        }
        let heading = self.heading.rotate(token.maneuver.step());
        info!("{:?} complete, heading {:?}", token.maneuver, heading);
        Ok(ManeuverOutcome {
            maneuver: token.maneuver,
            heading,
        })
    }

    /// Complete a due maneuver, then refuse if one is still running
    fn ensure_idle(&mut self, now: Instant) -> Result<(), MotionError> {
        self.poll(now)?;
        match self.active {
            Some(token) => Err(MotionError::Busy {
                maneuver: token.maneuver,
                remaining: token.remaining(now),
            }),
            None => Ok(()),
        }
    }

    fn ensure_ready(&mut self, now: Instant) -> Result<(), MotionError> {
        self.ensure_idle(now)?;
        match &self.fault {
            Some(fault) => Err(MotionError::Faulted(fault.message.clone())),
            None => Ok(()),
        }
    }

    /// Latch the fault, drop any maneuver and try to leave both wheels braked
    fn on_driver_error(&mut self, err: DriverError) -> MotionError {
        error!("Motor driver failure: {}", err);
        self.fault = Some(Fault {
            message: err.to_string(),
        });
        self.active = None;
        if let Err(e) = self.motors.stop() {
            warn!("Brake after driver failure also failed: {}", e);
        }
        MotionError::Driver(err)
    }
}

impl<D: MotorDriver> Drop for MotionController<D> {
    fn drop(&mut self) {
        // Leave the robot braked when the controller goes away
        if let Err(e) = self.motors.stop() {
            warn!("Failed to stop motors on drop: {}", e);
        }
    }
}

/// Brakes the controller if a maneuver future is dropped mid-turn
struct HaltOnDrop<'a, D: MotorDriver> {
    controller: &'a mut MotionController<D>,
    armed: bool,
}

impl<D: MotorDriver> Drop for HaltOnDrop<'_, D> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        warn!("Maneuver interrupted before completion");
        if let Err(e) = self.controller.halt() {
            error!("Failed to halt interrupted maneuver: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motor::{MotorState, SimMotorDriver};

    fn controller() -> MotionController<SimMotorDriver> {
        MotionController::new(MotionConfig::default(), SimMotorDriver::new()).unwrap()
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = MotionConfig {
            sprint_speed_left: 10,
            ..MotionConfig::default()
        };
        let result = MotionController::new(config, SimMotorDriver::new());
        assert!(matches!(result, Err(MotionError::Config(_))));
    }

    #[test]
    fn test_init_state() {
        let ctrl = controller();
        assert_eq!(ctrl.heading(), Heading::North);
        assert!(!ctrl.profile().sprint_enabled);
        assert!(ctrl.fault().is_none());
        for side in WheelSide::BOTH {
            assert_eq!(ctrl.motor(side).state(), MotorState::Braking);
            assert_eq!(ctrl.motor(side).speed(), 0);
        }
    }

    #[test]
    fn test_init_is_idempotent() {
        let mut ctrl = controller();
        let now = Instant::now();
        ctrl.set_sprint_mode(true);
        ctrl.set_correction(WheelSide::Left, 9);
        ctrl.turn_left90(now).unwrap();

        ctrl.init().unwrap();
        ctrl.init().unwrap();
        assert_eq!(ctrl.heading(), Heading::North);
        assert!(ctrl.active_maneuver().is_none());
        assert!(!ctrl.profile().sprint_enabled);
        assert_eq!(ctrl.correction().bias(WheelSide::Left), 0);
        assert_eq!(ctrl.motor(WheelSide::Left).state(), MotorState::Braking);
    }

    #[test]
    fn test_pivot_uses_turn_speeds_without_correction() {
        let mut ctrl = controller();
        ctrl.set_correction(WheelSide::Left, 40);
        ctrl.turn_right90(Instant::now()).unwrap();

        let config = MotionConfig::default();
        assert_eq!(ctrl.turn_speed(WheelSide::Left), config.turn_speed_left);
        assert_eq!(ctrl.turn_speed(WheelSide::Right), config.turn_speed_right);
        assert_eq!(ctrl.motor(WheelSide::Left).state(), MotorState::Advancing);
        assert_eq!(ctrl.motor(WheelSide::Right).state(), MotorState::Reversing);
    }

    #[test]
    fn test_poll_before_deadline_does_nothing() {
        let mut ctrl = controller();
        let now = Instant::now();
        let token = ctrl.turn180(now).unwrap();

        assert_eq!(ctrl.poll(now).unwrap(), None);
        assert_eq!(ctrl.poll(token.busy_until - Duration::from_millis(1)).unwrap(), None);
        assert!(ctrl.is_busy(now));
        assert_eq!(ctrl.heading(), Heading::North);

        let outcome = ctrl.poll(token.busy_until).unwrap().unwrap();
        assert_eq!(outcome.heading, Heading::South);
        assert!(!ctrl.is_busy(token.busy_until));
    }

    #[test]
    fn test_driver_failure_latches_fault() {
        let mut ctrl = controller();
        ctrl.driver_mut().fail_side(WheelSide::Right);

        assert!(matches!(ctrl.advance(Instant::now()), Err(MotionError::Driver(_))));
        assert!(ctrl.fault().is_some());
        assert_eq!(ctrl.motor(WheelSide::Left).state(), MotorState::Braking);

        // Fault blocks motion even once the hardware recovers
        ctrl.driver_mut().repair();
        assert!(matches!(ctrl.advance(Instant::now()), Err(MotionError::Faulted(_))));
        assert!(matches!(
            ctrl.turn_left90(Instant::now()),
            Err(MotionError::Faulted(_))
        ));

        ctrl.clear_fault();
        assert!(ctrl.advance(Instant::now()).is_ok());
    }

    #[test]
    fn test_failure_mid_turn_cancels_maneuver() {
        let mut ctrl = controller();
        let now = Instant::now();
        let token = ctrl.turn_left90(now).unwrap();
        ctrl.driver_mut().fail_side(WheelSide::Left);

        assert!(ctrl.poll(token.busy_until).is_err());
        assert!(ctrl.active_maneuver().is_none());
        assert_eq!(ctrl.heading(), Heading::North);
        assert!(ctrl.report(now).fault.is_some());
    }
}
