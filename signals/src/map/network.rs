use crate::map::{EdgeID, IntersectionID, LaneID, RoadNetwork};
use crate::traffic::ProbeError;
use serde::{Deserialize, Serialize};
use slotmapd::HopSlotMap;

pub type Intersections = HopSlotMap<IntersectionID, Intersection>;
pub type Edges = HopSlotMap<EdgeID, Edge>;
pub type Lanes = HopSlotMap<LaneID, Lane>;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Intersection {
    pub id: IntersectionID,
    /// Edges ending at this intersection, in insertion order
    pub incoming: Vec<EdgeID>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeID,
    /// Distance from the start of the edge to the stop line
    pub length: f64,
    pub speed_limit: f64,
    pub lanes: Vec<LaneID>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Lane {
    pub id: LaneID,
    pub green_phases: Vec<usize>,
}

/// In-memory road network, used by the headless driver and tests.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Network {
    pub(crate) intersections: Intersections,
    pub(crate) edges: Edges,
    pub(crate) lanes: Lanes,
}

impl Network {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn add_intersection(&mut self) -> IntersectionID {
        let id = self.intersections.insert_with_key(|id| Intersection {
            id,
            incoming: Vec::new(),
        });
        debug!("add_intersection {:?}", id);
        id
    }

    /// Adds an edge leading into `dst`. Returns `None` if `dst` does not exist.
    pub fn add_edge(&mut self, dst: IntersectionID, length: f64, speed_limit: f64) -> Option<EdgeID> {
        let inter = self.intersections.get_mut(dst)?;
        let id = self.edges.insert_with_key(|id| Edge {
            id,
            length,
            speed_limit,
            lanes: Vec::new(),
        });
        inter.incoming.push(id);
        Some(id)
    }

    /// Adds a lane to `edge`, green during the given phases. Returns `None` if `edge` does not exist.
    pub fn add_lane(&mut self, edge: EdgeID, green_phases: &[usize]) -> Option<LaneID> {
        let e = self.edges.get_mut(edge)?;
        let id = self.lanes.insert_with_key(|id| Lane {
            id,
            green_phases: green_phases.to_vec(),
        });
        e.lanes.push(id);
        Some(id)
    }

    /// Every lane feeding `inter`, paired with its parent edge.
    pub fn incoming_lanes(&self, inter: IntersectionID) -> impl Iterator<Item = (&Edge, &Lane)> + '_ {
        self.intersections
            .get(inter)
            .into_iter()
            .flat_map(|i| i.incoming.iter())
            .filter_map(move |&e| self.edges.get(e))
            .flat_map(move |e| {
                e.lanes
                    .iter()
                    .filter_map(move |&l| self.lanes.get(l))
                    .map(move |l| (e, l))
            })
    }
}

impl RoadNetwork for Network {
    fn incoming_edges(&self, inter: IntersectionID) -> Result<&[EdgeID], ProbeError> {
        self.intersections
            .get(inter)
            .map(|i| &*i.incoming)
            .ok_or(ProbeError::UnknownIntersection(inter))
    }

    fn lanes_of(&self, edge: EdgeID) -> Result<&[LaneID], ProbeError> {
        self.edges
            .get(edge)
            .map(|e| &*e.lanes)
            .ok_or(ProbeError::UnknownEdge(edge))
    }

    fn green_phases_of(&self, lane: LaneID) -> Result<&[usize], ProbeError> {
        self.lanes
            .get(lane)
            .map(|l| &*l.green_phases)
            .ok_or(ProbeError::UnknownLane(lane))
    }

    fn length(&self, edge: EdgeID) -> Result<f64, ProbeError> {
        self.edges
            .get(edge)
            .map(|e| e.length)
            .ok_or(ProbeError::UnknownEdge(edge))
    }

    fn speed_limit(&self, edge: EdgeID) -> Result<f64, ProbeError> {
        self.edges
            .get(edge)
            .map(|e| e.speed_limit)
            .ok_or(ProbeError::UnknownEdge(edge))
    }
}
