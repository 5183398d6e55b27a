//! Static road topology around signalized intersections.

use crate::traffic::ProbeError;
use slotmapd::new_key_type;

mod network;
mod traffic_control;

pub use network::*;
pub use traffic_control::*;

new_key_type! {
    pub struct IntersectionID;
    pub struct EdgeID;
    pub struct LaneID;
}

/// Read-only view of the road network. The controller references it, never owns or mutates it.
pub trait RoadNetwork {
    /// Edges whose downstream end is the given intersection.
    fn incoming_edges(&self, inter: IntersectionID) -> Result<&[EdgeID], ProbeError>;

    fn lanes_of(&self, edge: EdgeID) -> Result<&[LaneID], ProbeError>;

    /// Phase indices during which this lane has right of way.
    fn green_phases_of(&self, lane: LaneID) -> Result<&[usize], ProbeError>;

    fn length(&self, edge: EdgeID) -> Result<f64, ProbeError>;

    fn speed_limit(&self, edge: EdgeID) -> Result<f64, ProbeError>;
}

