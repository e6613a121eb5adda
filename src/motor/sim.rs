// Simulated motor driver
//
// Used when no controller board is attached (--simulate) and by the tests.
// Records the most recent accepted writes and can be told to reject writes
// per wheel.

use std::collections::VecDeque;

use tracing::debug;

use super::driver::{DriverError, MotorDriver, MotorState, WheelSide};

/// A single accepted driver write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WheelWrite {
    pub side: WheelSide,
    pub state: MotorState,
    pub speed: u16,
}

/// Number of writes kept by `SimMotorDriver::new`
pub const DEFAULT_HISTORY: usize = 256;

#[derive(Debug)]
pub struct SimMotorDriver {
    writes: VecDeque<WheelWrite>,
    history: usize,
    failing: Vec<WheelSide>,
}

impl Default for SimMotorDriver {
    fn default() -> Self {
        Self::with_history(DEFAULT_HISTORY)
    }
}

impl SimMotorDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep at most `history` writes; older ones are dropped first
    pub fn with_history(history: usize) -> Self {
        Self {
            writes: VecDeque::with_capacity(history),
            history,
            failing: Vec::new(),
        }
    }

    /// Reject every later write to `side`
    pub fn fail_side(&mut self, side: WheelSide) {
        if !self.failing.contains(&side) {
            self.failing.push(side);
        }
    }

    /// Accept writes to every wheel again
    pub fn repair(&mut self) {
        self.failing.clear();
    }

    /// Retained accepted writes, oldest first
    pub fn writes(&self) -> &VecDeque<WheelWrite> {
        &self.writes
    }

    /// Last accepted command for a wheel
    pub fn last(&self, side: WheelSide) -> Option<(MotorState, u16)> {
        self.writes
            .iter()
            .rev()
            .find(|w| w.side == side)
            .map(|w| (w.state, w.speed))
    }

    pub fn clear(&mut self) {
        self.writes.clear();
    }
}

impl MotorDriver for SimMotorDriver {
    fn write(
        &mut self,
        side: WheelSide,
        state: MotorState,
        speed: u16,
    ) -> Result<(), DriverError> {
        if self.failing.contains(&side) {
            return Err(DriverError::Rejected {
                side,
                reason: "simulated fault".to_string(),
            });
        }
        debug!("sim {:?} wheel: {:?} @ {}", side, state, speed);
        if self.history == 0 {
            return Ok(());
        }
        if self.writes.len() == self.history {
            self.writes.pop_front();
        }
        self.writes.push_back(WheelWrite { side, state, speed });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_is_bounded() {
        let mut sim = SimMotorDriver::with_history(4);
        for speed in 0..10 {
            sim.write(WheelSide::Left, MotorState::Advancing, speed).unwrap();
        }
        assert_eq!(sim.writes().len(), 4);
        assert_eq!(sim.writes().front().map(|w| w.speed), Some(6));
        assert_eq!(sim.last(WheelSide::Left), Some((MotorState::Advancing, 9)));
    }

    #[test]
    fn test_default_history_survives_long_runs() {
        let mut sim = SimMotorDriver::new();
        for _ in 0..(DEFAULT_HISTORY * 8) {
            sim.write(WheelSide::Right, MotorState::Braking, 0).unwrap();
        }
        assert_eq!(sim.writes().len(), DEFAULT_HISTORY);
    }

    #[test]
    fn test_failing_side_is_not_recorded() {
        let mut sim = SimMotorDriver::new();
        sim.fail_side(WheelSide::Right);
        assert!(sim.write(WheelSide::Right, MotorState::Advancing, 10).is_err());
        sim.write(WheelSide::Left, MotorState::Advancing, 10).unwrap();
        assert_eq!(sim.writes().len(), 1);
        assert_eq!(sim.last(WheelSide::Right), None);
    }
}
