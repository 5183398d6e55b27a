use serde::{Deserialize, Serialize};

/// What a driver on a given lane sees.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrafficBehavior {
    RED,
    ORANGE,
    GREEN,
}

impl TrafficBehavior {
    pub fn is_red(self) -> bool {
        matches!(self, TrafficBehavior::RED)
    }

    pub fn is_green(self) -> bool {
        matches!(self, TrafficBehavior::GREEN)
    }

    /// Behavior of a lane green during `green_phases` while phase `current` of an `n_phases`
    /// plan is shown. A transitional phase right after one of the lane's greens shows orange.
    pub fn for_lane(green_phases: &[usize], current: usize, n_phases: usize) -> Self {
        if green_phases.contains(&current) {
            return TrafficBehavior::GREEN;
        }
        if n_phases > 0 && current % 2 == 1 {
            let previous = (current + n_phases - 1) % n_phases;
            if green_phases.contains(&previous) {
                return TrafficBehavior::ORANGE;
            }
        }
        TrafficBehavior::RED
    }
}
