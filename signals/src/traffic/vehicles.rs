use crate::map::LaneID;
use crate::traffic::{ProbeError, TrafficProbe, VehicleID};
use common::FastMap;
use serde::{Deserialize, Serialize};
use slotmapd::HopSlotMap;

pub type Vehicles = HopSlotMap<VehicleID, Vehicle>;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: VehicleID,
    pub lane: LaneID,
    /// Distance from the start of the lane
    pub position: f64,
    pub speed: f64,
}

/// In-memory live traffic, used by the headless driver and tests.
#[derive(Clone, Debug, Default)]
pub struct TrafficState {
    vehicles: Vehicles,
    // Kept in spawn order so queries are deterministic
    by_lane: FastMap<LaneID, Vec<VehicleID>>,
}

impl TrafficState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&mut self, lane: LaneID, position: f64, speed: f64) -> VehicleID {
        let id = self.vehicles.insert_with_key(|id| Vehicle {
            id,
            lane,
            position,
            speed,
        });
        self.by_lane.entry(lane).or_default().push(id);
        id
    }

    pub fn despawn(&mut self, id: VehicleID) -> Option<Vehicle> {
        let v = self.vehicles.remove(id)?;
        if let Some(on_lane) = self.by_lane.get_mut(&v.lane) {
            on_lane.retain(|&x| x != id);
        }
        Some(v)
    }

    pub fn get(&self, id: VehicleID) -> Option<&Vehicle> {
        self.vehicles.get(id)
    }

    pub fn get_mut(&mut self, id: VehicleID) -> Option<&mut Vehicle> {
        self.vehicles.get_mut(id)
    }

    pub fn on_lane(&self, lane: LaneID) -> &[VehicleID] {
        self.by_lane.get(&lane).map(|v| &**v).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Vehicle> + '_ {
        self.vehicles.values()
    }
}

impl TrafficProbe for TrafficState {
    fn vehicles_on_lane(&self, lane: LaneID) -> Result<Vec<VehicleID>, ProbeError> {
        Ok(self.on_lane(lane).to_vec())
    }

    fn vehicle_speed(&self, vehicle: VehicleID) -> Result<f64, ProbeError> {
        self.vehicles
            .get(vehicle)
            .map(|v| v.speed)
            .ok_or(ProbeError::UnknownVehicle(vehicle))
    }

    fn vehicle_position(&self, vehicle: VehicleID) -> Result<f64, ProbeError> {
        self.vehicles
            .get(vehicle)
            .map(|v| v.position)
            .ok_or(ProbeError::UnknownVehicle(vehicle))
    }

    fn lane_occupancy(&self, lane: LaneID) -> Result<usize, ProbeError> {
        Ok(self.on_lane(lane).len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::Network;

    #[test]
    fn spawn_and_despawn_track_lanes() {
        let mut n = Network::empty();
        let i = n.add_intersection();
        let e = n.add_edge(i, 50.0, 10.0).unwrap();
        let l = n.add_lane(e, &[0]).unwrap();

        let mut t = TrafficState::new();
        let a = t.spawn(l, 0.0, 5.0);
        let b = t.spawn(l, 10.0, 0.0);
        assert_eq!(t.vehicles_on_lane(l).unwrap(), vec![a, b]);
        assert_eq!(t.lane_occupancy(l).unwrap(), 2);
        assert_eq!(t.vehicle_speed(a).unwrap(), 5.0);
        assert_eq!(t.vehicle_position(b).unwrap(), 10.0);

        t.despawn(a);
        assert_eq!(t.on_lane(l), &[b]);
        assert_eq!(t.vehicle_speed(a), Err(ProbeError::UnknownVehicle(a)));
        assert_eq!(t.len(), 1);
    }
}
