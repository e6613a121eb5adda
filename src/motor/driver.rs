// Motor driver interface
//
// The hardware side of the motion core: one write per wheel carrying the
// H-bridge state and the PWM magnitude.

use serde::{Deserialize, Serialize};

/// One of the two independently driven wheels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WheelSide {
    Left,
    Right,
}

impl WheelSide {
    pub const BOTH: [WheelSide; 2] = [WheelSide::Left, WheelSide::Right];
}

/// H-bridge state of one wheel
///
/// | State     | IN1 | IN2 |
/// |-----------|-----|-----|
/// | Advancing | 1   | 0   |
/// | Reversing | 0   | 1   |
/// | Braking   | 0   | 0   |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotorState {
    Advancing,
    Reversing,
    Braking,
}

/// Error types for motor driver writes
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{side:?} wheel write rejected: {reason}")]
    Rejected { side: WheelSide, reason: String },

    #[error("Motor controller unavailable")]
    Unavailable,
}

/// Hardware abstraction for the two wheel drivers.
///
/// `speed` is a PWM magnitude in `[0, max_speed]`; direction comes from
/// `state`. Implementations may assume the speed is already clamped and is
/// zero whenever `state` is `Braking`.
pub trait MotorDriver {
    fn write(&mut self, side: WheelSide, state: MotorState, speed: u16)
    -> Result<(), DriverError>;
}

impl<D: MotorDriver + ?Sized> MotorDriver for Box<D> {
    fn write(
        &mut self,
        side: WheelSide,
        state: MotorState,
        speed: u16,
    ) -> Result<(), DriverError> {
        (**self).write(side, state, speed)
    }
}
