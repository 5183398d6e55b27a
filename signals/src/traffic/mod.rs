//! Live traffic measurements and the two estimators built on them.

use crate::map::{EdgeID, IntersectionID, LaneID};
use slotmapd::new_key_type;
use std::error::Error;
use std::fmt::{Display, Formatter};

mod arrival;
mod density;
mod vehicles;

pub use arrival::*;
pub use density::*;
pub use vehicles::*;

new_key_type! {
    pub struct VehicleID;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    UnknownIntersection(IntersectionID),
    UnknownEdge(EdgeID),
    UnknownLane(LaneID),
    UnknownVehicle(VehicleID),
    /// The data source could not be queried at all.
    Unreachable(String),
}

impl Display for ProbeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ProbeError::UnknownIntersection(id) => write!(f, "unknown intersection {:?}", id),
            ProbeError::UnknownEdge(id) => write!(f, "unknown edge {:?}", id),
            ProbeError::UnknownLane(id) => write!(f, "unknown lane {:?}", id),
            ProbeError::UnknownVehicle(id) => write!(f, "unknown vehicle {:?}", id),
            ProbeError::Unreachable(why) => write!(f, "traffic source unreachable: {}", why),
        }
    }
}

impl Error for ProbeError {}

/// Point-in-time reads against the live traffic state. Never cached across callbacks.
pub trait TrafficProbe {
    fn vehicles_on_lane(&self, lane: LaneID) -> Result<Vec<VehicleID>, ProbeError>;

    fn vehicle_speed(&self, vehicle: VehicleID) -> Result<f64, ProbeError>;

    /// Distance travelled along the vehicle's current lane.
    fn vehicle_position(&self, vehicle: VehicleID) -> Result<f64, ProbeError>;

    fn lane_occupancy(&self, lane: LaneID) -> Result<usize, ProbeError> {
        self.vehicles_on_lane(lane).map(|v| v.len())
    }
}
