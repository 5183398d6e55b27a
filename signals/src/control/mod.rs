//! The phase state machine and the ports it talks through.

use crate::map::RoadNetwork;
use crate::traffic::TrafficProbe;

mod backend;
mod config;
mod controller;
mod plan;
mod timer;

pub use backend::*;
pub use config::*;
pub use controller::*;
pub use plan::*;
pub use timer::*;

/// The external collaborators a controller needs while handling an event.
///
/// Handed in explicitly at every entry point: the controller never looks them up itself and
/// keeps no reference to them between callbacks.
pub struct Ports<'a> {
    pub network: &'a dyn RoadNetwork,
    pub probe: &'a dyn TrafficProbe,
    pub scheduler: &'a mut dyn EventScheduler,
    pub backend: &'a mut dyn SignalBackend,
}
