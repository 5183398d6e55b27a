use crate::map::{IntersectionID, RoadNetwork};
use crate::traffic::{ProbeError, TrafficProbe};
use common::error::MultiError;

/// Vehicles at or below this speed are treated as stopped.
pub const DEFAULT_NEAR_STATIONARY_SPEED: f64 = 0.01;

/// Low-density policy: looks for a moving vehicle that would reach the stop line before the
/// extension window runs out.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ImminentArrivalDetector {
    pub extension_window: f64,
    pub near_stationary_speed: f64,
}

impl ImminentArrivalDetector {
    pub fn new(extension_window: f64, near_stationary_speed: f64) -> Self {
        Self {
            extension_window,
            near_stationary_speed,
        }
    }

    /// Seconds a vehicle at `position` needs to reach the stop line at the edge's speed limit.
    pub fn time_to_stop_line(length: f64, position: f64, speed_limit: f64) -> f64 {
        (length - position) / speed_limit
    }

    /// Whether any moving vehicle on a lane green during `phase` will reach the stop line within
    /// the extension window. Returns at the first qualifying vehicle.
    ///
    /// Lanes or vehicles whose queries fail are skipped, their errors pushed into `errors`.
    pub fn should_extend(
        &self,
        network: &dyn RoadNetwork,
        probe: &dyn TrafficProbe,
        inter: IntersectionID,
        phase: usize,
        errors: &mut MultiError<ProbeError>,
    ) -> bool {
        let edges = match network.incoming_edges(inter) {
            Ok(edges) => edges,
            Err(e) => {
                warn!("arrival: cannot list incoming edges: {}", e);
                errors.push(e);
                return false;
            }
        };

        for &edge in edges {
            let lanes = unwrap_contwarn!(
                network.lanes_of(edge),
                errors,
                "arrival: lanes of {:?}",
                edge
            );
            let length = unwrap_contwarn!(
                network.length(edge),
                errors,
                "arrival: length of {:?}",
                edge
            );
            let speed_limit = unwrap_contwarn!(
                network.speed_limit(edge),
                errors,
                "arrival: speed limit of {:?}",
                edge
            );
            if speed_limit <= 0.0 {
                warn!("arrival: edge {:?} has speed limit {}", edge, speed_limit);
                continue;
            }

            for &lane in lanes {
                let greens = unwrap_contwarn!(
                    network.green_phases_of(lane),
                    errors,
                    "arrival: green phases of {:?}",
                    lane
                );
                if !greens.contains(&phase) {
                    continue;
                }

                let vehicles = unwrap_contwarn!(
                    probe.vehicles_on_lane(lane),
                    errors,
                    "arrival: vehicles on {:?}",
                    lane
                );
                for vehicle in vehicles {
                    let speed = unwrap_contwarn!(
                        probe.vehicle_speed(vehicle),
                        errors,
                        "arrival: speed of {:?}",
                        vehicle
                    );
                    if speed <= self.near_stationary_speed {
                        continue;
                    }
                    let pos = unwrap_contwarn!(
                        probe.vehicle_position(vehicle),
                        errors,
                        "arrival: position of {:?}",
                        vehicle
                    );

                    let time_left = Self::time_to_stop_line(length, pos, speed_limit);
                    if time_left < self.extension_window {
                        debug!(
                            "arrival: {:?} is {:.2}s from the stop line of {:?}",
                            vehicle, time_left, inter
                        );
                        return true;
                    }
                }
            }
        }

        false
    }
}
