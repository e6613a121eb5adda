// Motor state machine
//
// Owns the driver and one `Motor` per wheel. Every hardware write goes
// through here so the recorded state always matches what was sent.

use tracing::{debug, warn};

use super::driver::{DriverError, MotorDriver, MotorState, WheelSide};

impl MotorState {
    /// Transition table for a single wheel.
    ///
    /// Braking is always reachable. A reversing wheel must brake before it
    /// can advance again.
    pub fn can_transition(self, to: MotorState) -> bool {
        match (self, to) {
            (_, MotorState::Braking) => true,
            (MotorState::Braking | MotorState::Advancing, MotorState::Advancing) => true,
            (_, MotorState::Reversing) => true,
            (MotorState::Reversing, MotorState::Advancing) => false,
        }
    }
}

/// Logical state of one wheel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Motor {
    side: WheelSide,
    state: MotorState,
    speed: u16,
}

impl Motor {
    fn braking(side: WheelSide) -> Self {
        Self {
            side,
            state: MotorState::Braking,
            speed: 0,
        }
    }

    pub fn side(&self) -> WheelSide {
        self.side
    }

    pub fn state(&self) -> MotorState {
        self.state
    }

    /// Speed last written to the driver
    pub fn speed(&self) -> u16 {
        self.speed
    }
}

/// Both wheels plus the driver that actuates them
pub struct MotorBank<D: MotorDriver> {
    driver: D,
    left: Motor,
    right: Motor,
    max_speed: u16,
}

impl<D: MotorDriver> MotorBank<D> {
    /// Wrap a driver. Nothing is written until `init`.
    pub fn new(driver: D, max_speed: u16) -> Self {
        Self {
            driver,
            left: Motor::braking(WheelSide::Left),
            right: Motor::braking(WheelSide::Right),
            max_speed,
        }
    }

    /// Brake both wheels and zero their speed
    pub fn init(&mut self) -> Result<(), DriverError> {
        self.left = Motor::braking(WheelSide::Left);
        self.right = Motor::braking(WheelSide::Right);
        self.stop()
    }

    pub fn motor(&self, side: WheelSide) -> &Motor {
        match side {
            WheelSide::Left => &self.left,
            WheelSide::Right => &self.right,
        }
    }

    pub fn max_speed(&self) -> u16 {
        self.max_speed
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    /// Clamp a requested speed into `[0, max_speed]`
    pub fn clamp_speed(&self, requested: i32) -> u16 {
        requested.clamp(0, i32::from(self.max_speed)) as u16
    }

    /// Set a wheel's speed without changing its state.
    ///
    /// Out-of-range requests are clamped. A braking wheel stays at 0.
    /// Returns the speed actually written.
    pub fn set_wheel_speed(&mut self, side: WheelSide, requested: i32) -> Result<u16, DriverError> {
        let state = self.motor(side).state;
        self.write(side, state, requested)
    }

    /// Move a wheel to `state` at `requested` speed.
    ///
    /// Transitions outside the table are a programming error: they trip a
    /// debug assertion, and release builds log and ignore them.
    pub fn drive(
        &mut self,
        side: WheelSide,
        state: MotorState,
        requested: i32,
    ) -> Result<u16, DriverError> {
        let current = self.motor(side).state;
        if !current.can_transition(state) {
            debug_assert!(
                false,
                "invalid {:?} wheel transition {:?} -> {:?}",
                side, current, state
            );
            warn!(
                "Ignoring invalid {:?} wheel transition {:?} -> {:?}",
                side, current, state
            );
            return Ok(self.motor(side).speed);
        }
        self.write(side, state, requested)
    }

    /// Both wheels forward, each at its own speed
    pub fn advance(&mut self, left: i32, right: i32) -> Result<(u16, u16), DriverError> {
        let left = self.drive(WheelSide::Left, MotorState::Advancing, left)?;
        let right = self.drive(WheelSide::Right, MotorState::Advancing, right)?;
        Ok((left, right))
    }

    /// Brake both wheels.
    ///
    /// Both writes are attempted even if the first fails; the first error
    /// is returned.
    pub fn stop(&mut self) -> Result<(), DriverError> {
        let left = self.write(WheelSide::Left, MotorState::Braking, 0);
        let right = self.write(WheelSide::Right, MotorState::Braking, 0);
        left?;
        right?;
        Ok(())
    }

    fn write(&mut self, side: WheelSide, state: MotorState, requested: i32) -> Result<u16, DriverError> {
        let speed = match state {
            MotorState::Braking => 0,
            _ => self.clamp_speed(requested),
        };
        if speed as i32 != requested && state != MotorState::Braking {
            debug!("{:?} wheel speed {} clamped to {}", side, requested, speed);
        }

        // Record the brake even when the write fails: the last thing asked
        // of a faulted wheel is to stop.
        let result = self.driver.write(side, state, speed);
        if result.is_ok() || state == MotorState::Braking {
            let motor = match side {
                WheelSide::Left => &mut self.left,
                WheelSide::Right => &mut self.right,
            };
            motor.state = state;
            motor.speed = speed;
        }
        result.map(|()| speed)
    }
}
