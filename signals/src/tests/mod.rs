#![allow(dead_code)]
#![cfg(test)]

use crate::control::{
    Handled, Phase, Ports, RecordingBackend, SignalConfig, SignalController, TimerQueue,
};
use crate::map::{IntersectionID, LaneID, Network};
use crate::traffic::TrafficState;
use crate::ControllerError;
use common::logger::MyLog;


/// One intersection with a north/south approach green in phase 0 and an east/west approach green
/// in phase 2, each a 100m edge at 10 m/s with one lane.
pub(crate) struct TestCtx {
    pub net: Network,
    pub traffic: TrafficState,
    pub queue: TimerQueue,
    pub backend: RecordingBackend,
    pub controller: SignalController,
    pub inter: IntersectionID,
    pub ns_lane: LaneID,
    pub ew_lane: LaneID,
    pub history: Vec<(f64, Handled)>,
}

impl TestCtx {
    pub(crate) fn new(phases: Vec<Phase>, config: SignalConfig) -> Self {
        MyLog::init();

        let mut net = Network::empty();
        let inter = net.add_intersection();
        let ns = net.add_edge(inter, 100.0, 10.0).unwrap();
        let ew = net.add_edge(inter, 100.0, 10.0).unwrap();
        let ns_lane = net.add_lane(ns, &[0]).unwrap();
        let ew_lane = net.add_lane(ew, &[2]).unwrap();

        let controller = SignalController::new(inter, phases, config).unwrap();

        Self {
            net,
            traffic: TrafficState::new(),
            queue: TimerQueue::new(),
            backend: RecordingBackend::new(),
            controller,
            inter,
            ns_lane,
            ew_lane,
            history: Vec::new(),
        }
    }

    pub(crate) fn four_phase(config: SignalConfig) -> Self {
        Self::new(
            vec![
                Phase::new(10.0, "GGrr"),
                Phase::new(3.0, "yyrr"),
                Phase::new(10.0, "rrGG"),
                Phase::new(3.0, "rryy"),
            ],
            config,
        )
    }

    pub(crate) fn start(&mut self) {
        let now = self.queue.now();
        self.controller.start(now, &mut self.queue).unwrap();
    }

    /// Delivers a firing directly, as a late or stray callback would arrive.
    pub(crate) fn deliver(
        &mut self,
        kind: crate::TimerKind,
        now: f64,
    ) -> Result<Handled, ControllerError> {
        let mut ports = Ports {
            network: &self.net,
            probe: &self.traffic,
            scheduler: &mut self.queue,
            backend: &mut self.backend,
        };
        self.controller.on_timer(kind, now, &mut ports)
    }

    /// Fires the next pending timer at or before `until`.
    pub(crate) fn step(&mut self, until: f64) -> Option<Result<Handled, ControllerError>> {
        let fired = self.queue.pop_until(until)?;
        let r = self.deliver(fired.kind, fired.time);
        if let Ok(h) = &r {
            self.history.push((fired.time, *h));
        }
        Some(r)
    }

    pub(crate) fn run_until(&mut self, until: f64) {
        while let Some(r) = self.step(until) {
            r.unwrap();
        }
        self.queue.advance_to(until);
    }

    pub(crate) fn switches(&self) -> Vec<(f64, usize)> {
        self.history
            .iter()
            .filter_map(|&(t, h)| match h {
                Handled::Switched { to, .. } => Some((t, to)),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn extensions(&self) -> Vec<f64> {
        self.history
            .iter()
            .filter_map(|&(t, h)| matches!(h, Handled::Extended { .. }).then_some(t))
            .collect()
    }
}
