use common::rand::HashRng;
use common::{unwrap_cont, unwrap_or};
use signals::map::Network;
use signals::traffic::TrafficState;
use signals::{
    BackendError, ControllerError, Handled, IntersectionID, LaneID, Phase, Ports, SignalBackend,
    SignalConfig, SignalController, SignalProgram, TimerQueue,
};

/// Minimum gap between the fronts of two queued vehicles, in meters.
const VEHICLE_SPACING: f64 = 7.0;

const APPROACH_LENGTH: f64 = 200.0;
const APPROACH_SPEED: f64 = 13.9;

/// Backend standing in for real signal heads: it only logs what it is told.
#[derive(Debug, Default)]
pub struct LogBackend {
    pub shown: Option<usize>,
}

impl SignalBackend for LogBackend {
    fn set_signal_state(&mut self, intersection: IntersectionID, phase: usize) -> Result<(), BackendError> {
        log::debug!("{:?} now shows phase {}", intersection, phase);
        self.shown = Some(phase);
        Ok(())
    }

    fn suppress_auto_expiry(&mut self, intersection: IntersectionID, duration: f64) -> Result<(), BackendError> {
        log::trace!("{:?} auto expiry pushed {}s away", intersection, duration);
        Ok(())
    }
}

#[derive(Debug, Default, Copy, Clone)]
pub struct SimStats {
    pub spawned: u32,
    pub departed: u32,
    pub switches: u32,
    pub extensions: u32,
    pub recalculations: u32,
    pub errors: u32,
}

/// A four-way intersection, each approach one lane wide, with vehicles moving at the speed
/// limit and stopping at red lights.
pub struct Sim {
    pub net: Network,
    pub traffic: TrafficState,
    pub queue: TimerQueue,
    pub backend: LogBackend,
    pub controller: SignalController,
    pub stats: SimStats,
    inter: IntersectionID,
    lanes: Vec<LaneID>,
    rng: HashRng,
    step: u32,
}

impl Sim {
    pub fn new(config: SignalConfig, seed: u32) -> Result<Self, ControllerError> {
        let mut net = Network::empty();
        let inter = net.add_intersection();

        // North, east, south, west; north/south move in phase 0 and east/west in phase 2
        let mut lanes = Vec::with_capacity(4);
        for green in [0, 2, 0, 2] {
            let lane = net
                .add_edge(inter, APPROACH_LENGTH, APPROACH_SPEED)
                .and_then(|edge| net.add_lane(edge, &[green]));
            lanes.push(unwrap_or!(lane, continue));
        }

        let phases = vec![
            Phase::new(30.0, "GrGr"),
            Phase::new(4.0, "yryr"),
            Phase::new(30.0, "rGrG"),
            Phase::new(4.0, "ryry"),
        ];
        let controller =
            SignalController::new(inter, phases, config)?.with_program(SignalProgram {
                id: "crossing".to_string(),
                kind: "actuated".to_string(),
                program_id: "0".to_string(),
                offset: 0.0,
            });

        Ok(Self {
            net,
            traffic: TrafficState::new(),
            queue: TimerQueue::new(),
            backend: LogBackend::default(),
            controller,
            stats: SimStats::default(),
            inter,
            lanes,
            rng: HashRng::new(seed),
            step: 0,
        })
    }

    pub fn start(&mut self) -> Result<(), ControllerError> {
        let now = self.queue.now();
        self.controller.start(now, &mut self.queue)
    }

    /// Fires every timer due by `now + dt`, then moves traffic forward by `dt`.
    pub fn tick(&mut self, dt: f64, arrival_rate: f64) {
        let until = self.queue.now() + dt;
        while let Some(fired) = self.queue.pop_until(until) {
            let mut ports = Ports {
                network: &self.net,
                probe: &self.traffic,
                scheduler: &mut self.queue,
                backend: &mut self.backend,
            };
            let r = self.controller.on_timer(fired.kind, fired.time, &mut ports);
            self.record(fired.time, r);
        }
        self.queue.advance_to(until);

        self.move_vehicles(dt);
        self.spawn_vehicles(dt, arrival_rate);
        self.step += 1;
    }

    pub fn shutdown(&mut self) {
        self.controller.shutdown(&mut self.queue);
    }

    fn record(&mut self, time: f64, r: Result<Handled, ControllerError>) {
        match r {
            Ok(Handled::Switched { from, to }) => {
                self.stats.switches += 1;
                log::info!("t={:.1} phase {} -> {}", time, from, to);
            }
            Ok(Handled::Extended { phase }) => {
                self.stats.extensions += 1;
                log::info!("t={:.1} phase {} extended", time, phase);
            }
            Ok(Handled::Recalculated { changed }) => {
                self.stats.recalculations += 1;
                if changed {
                    log::info!(
                        "t={:.1} plan redistributed:\n{}",
                        time,
                        self.controller.plan()
                    );
                }
            }
            Ok(Handled::Ignored | Handled::Discarded) => {}
            Err(e) => {
                self.stats.errors += 1;
                log::error!("t={:.1} controller error: {}", time, e);
            }
        }
    }

    fn move_vehicles(&mut self, dt: f64) {
        let mut moves = vec![];
        let mut leaving = vec![];

        for (edge, lane) in self.net.incoming_lanes(self.inter) {
            let green = self.controller.behavior_for(&lane.green_phases).is_green();
            let mut stop_at = if green { f64::INFINITY } else { edge.length };

            // Spawn order is also front-to-back order, nobody overtakes
            for &id in self.traffic.on_lane(lane.id) {
                let v = unwrap_cont!(self.traffic.get(id));
                let next = (v.position + edge.speed_limit * dt)
                    .min(stop_at)
                    .max(v.position);
                if green && next >= edge.length {
                    leaving.push(id);
                    continue;
                }
                moves.push((id, next));
                stop_at = next - VEHICLE_SPACING;
            }
        }

        for (id, next) in moves {
            let v = unwrap_cont!(self.traffic.get_mut(id));
            v.speed = (next - v.position) / dt;
            v.position = next;
        }

        for id in leaving {
            if self.traffic.despawn(id).is_some() {
                self.stats.departed += 1;
            }
        }
    }

    fn spawn_vehicles(&mut self, dt: f64, arrival_rate: f64) {
        let p = (arrival_rate * dt) as f32;
        for (i, &lane) in self.lanes.iter().enumerate() {
            if !self.rng.chance(p, self.step, i as u32) {
                continue;
            }
            let entry_blocked = self
                .traffic
                .on_lane(lane)
                .last()
                .and_then(|&id| self.traffic.get(id))
                .map_or(false, |v| v.position < VEHICLE_SPACING);
            if entry_blocked {
                continue;
            }
            self.traffic.spawn(lane, 0.0, APPROACH_SPEED);
            self.stats.spawned += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use signals::ControlMode;

    fn run(mode: ControlMode, seconds: u32) -> Sim {
        let mut sim = Sim::new(SignalConfig::with_mode(mode), 1).unwrap();
        sim.start().unwrap();
        for _ in 0..seconds * 2 {
            sim.tick(0.5, 0.2);
        }
        sim
    }

    #[test]
    fn fixed_time_cycles() {
        let sim = run(ControlMode::FixedTime, 136);
        // 68s cycle, two full cycles
        assert_eq!(sim.stats.switches, 8);
        assert_eq!(sim.stats.errors, 0);
        assert_eq!(sim.backend.shown, Some(0));
    }

    #[test]
    fn traffic_flows() {
        let sim = run(ControlMode::FixedTime, 600);
        assert!(sim.stats.spawned > 0);
        assert!(sim.stats.departed > 0);
        assert!(sim.traffic.len() as u32 <= sim.stats.spawned);
    }

    #[test]
    fn red_holds_vehicles_at_the_line() {
        let mut sim = run(ControlMode::Off, 120);
        assert_eq!(sim.stats.switches, 0);
        // Phase 0 forever: east and west queue up at their stop line
        let east = sim.lanes[1];
        let front = sim.traffic.on_lane(east)[0];
        let v = sim.traffic.get(front).unwrap();
        assert_eq!(v.position, APPROACH_LENGTH);
        assert_eq!(v.speed, 0.0);
        assert!(sim.traffic.iter().all(|v| v.position <= APPROACH_LENGTH));
        sim.shutdown();
        assert!(sim.controller.is_done());
    }

    #[test]
    fn high_density_recalculates() {
        let sim = run(ControlMode::HighDensity, 61);
        assert_eq!(sim.stats.recalculations, 2);
    }
}
