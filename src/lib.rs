//! Motion-control core for a two-wheel differential-drive maze robot.
//!
//! - `motor`: driver interface, serial/simulated backends, wheel state machine
//! - `motion`: speed profile, drift correction, heading and timed turns
//! - `config`: calibration constants and the validated `MotionConfig`
//! - `messages` / `runtime`: JSON commands and state over Zenoh

pub mod config;
pub mod messages;
pub mod motion;
pub mod motor;
pub mod runtime;
