// Logical compass heading: a 4-cycle advanced only by completed turns

use serde::{Deserialize, Serialize};

/// Robot orientation, in clockwise order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Heading {
    #[default]
    North,
    East,
    South,
    West,
}

impl Heading {
    const CYCLE: [Heading; 4] = [Heading::North, Heading::East, Heading::South, Heading::West];

    fn index(self) -> i8 {
        match self {
            Heading::North => 0,
            Heading::East => 1,
            Heading::South => 2,
            Heading::West => 3,
        }
    }

    /// Heading after `steps` clockwise quarter turns (negative = counter-clockwise)
    pub fn rotated(self, steps: i8) -> Heading {
        let i = (self.index() as i16 + steps as i16).rem_euclid(4);
        Self::CYCLE[i as usize]
    }
}

/// Heading change applied by a completed turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnStep {
    Right,
    Left,
    About,
}

impl TurnStep {
    pub fn steps(self) -> i8 {
        match self {
            TurnStep::Right => 1,
            TurnStep::Left => -1,
            TurnStep::About => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeadingTracker {
    current: Heading,
}

impl HeadingTracker {
    pub fn new(initial: Heading) -> Self {
        Self { current: initial }
    }

    pub fn current(&self) -> Heading {
        self.current
    }

    pub fn rotate(&mut self, step: TurnStep) -> Heading {
        self.current = self.current.rotated(step.steps());
        self.current
    }

    pub(crate) fn reset(&mut self, heading: Heading) {
        self.current = heading;
    }
}
