// Fixed per-wheel drift bias, applied on straight-line runs only

use super::WheelPair;
use crate::motor::WheelSide;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DriftCorrection {
    bias: WheelPair<i16>,
}

impl DriftCorrection {
    pub fn new(bias: WheelPair<i16>) -> Self {
        Self { bias }
    }

    pub fn set(&mut self, side: WheelSide, bias: i16) {
        *self.bias.get_mut(side) = bias;
    }

    pub fn bias(&self, side: WheelSide) -> i16 {
        *self.bias.get(side)
    }

    /// Base speed plus bias. The result is unclamped; the motor bank clamps.
    pub fn apply(&self, side: WheelSide, base: u16) -> i32 {
        i32::from(base) + i32::from(self.bias(side))
    }
}
