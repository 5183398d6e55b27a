//! Adaptive signal control for a single intersection.
//!
//! A [`SignalController`] walks a cyclic [`PhasePlan`], driven by timer callbacks from an
//! external event substrate. Depending on its [`ControlMode`] it either redistributes phase
//! durations according to measured demand ([`DensityEstimator`]) or extends the running phase
//! when a vehicle is about to reach the stop line ([`ImminentArrivalDetector`]).
//!
//! Everything outside the controller (topology, live traffic, timers, the signal backend) is
//! reached through the traits in [`map`], [`traffic`] and [`control`], handed in through
//! [`Ports`] at every entry point.

#[macro_use]
extern crate common;

#[macro_use]
extern crate log as extern_log;

pub mod control;
mod error;
pub mod map;
#[cfg(test)]
mod tests;
pub mod traffic;

pub use control::*;
pub use error::*;
pub use map::{EdgeID, IntersectionID, LaneID, RoadNetwork, TrafficBehavior};
pub use traffic::{DensityEstimator, ImminentArrivalDetector, TrafficProbe, VehicleID};
