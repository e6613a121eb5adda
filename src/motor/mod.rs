// Motor control module for the two-wheel micromouse base
//
// Provides:
// - Motor driver interface (per-wheel state + speed writes)
// - Serial H-bridge controller backend and a simulated backend
// - Motor state machine, the only writer to the driver

mod driver;
pub mod serial;
pub mod sim;
pub mod state;

pub use driver::{DriverError, MotorDriver, MotorState, WheelSide};
pub use serial::SerialMotorDriver;
pub use sim::SimMotorDriver;
pub use state::{Motor, MotorBank};
