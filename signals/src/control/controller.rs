use crate::control::{
    ControlMode, EventScheduler, Phase, PhasePlan, Ports, SignalConfig, TimerHandle, TimerKind,
};
use crate::map::{IntersectionID, TrafficBehavior};
use crate::traffic::{DensityEstimator, ImminentArrivalDetector, ProbeError};
use crate::{ConfigError, ControllerError, PlanError};
use common::error::MultiError;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Descriptive metadata of the signal program, as known to the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalProgram {
    pub id: String,
    pub kind: String,
    pub program_id: String,
    pub offset: f64,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControllerStatus {
    Uninitialized,
    Running,
    /// Terminal: every later callback is discarded.
    Done,
}

/// What a timer callback did.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Handled {
    Switched { from: usize, to: usize },
    /// The running phase was kept for another extension window.
    Extended { phase: usize },
    Recalculated { changed: bool },
    /// The current mode does not use this kind of timer.
    Ignored,
    /// The controller was not running.
    Discarded,
}

/// Adaptive controller of one intersection.
///
/// Owns the phase plan and the control state exclusively. All mutation happens inside
/// [`SignalController::on_timer`], which the event loop calls one firing at a time.
#[derive(Debug)]
pub struct SignalController {
    intersection: IntersectionID,
    program: SignalProgram,
    plan: PhasePlan,
    config: SignalConfig,
    density: DensityEstimator,
    arrival: ImminentArrivalDetector,

    status: ControllerStatus,
    current_phase: usize,
    last_switch: f64,

    switch_timer: Option<TimerHandle>,
    /// When the armed switch timer fires
    switch_due: Option<f64>,
    recalc_timer: Option<TimerHandle>,
}

impl SignalController {
    /// Validates the plan and the configuration together, reporting every problem.
    pub fn new(
        intersection: IntersectionID,
        phases: Vec<Phase>,
        config: SignalConfig,
    ) -> Result<Self, ControllerError> {
        let mut errors: MultiError<ConfigError> = MultiError::default();

        let plan = PhasePlan::build(phases).map_err(|e| errors.push(e)).ok();
        if let Err(MultiError(config_errors)) = config.validate() {
            errors.0.extend(config_errors);
        }

        let plan = match plan {
            Some(plan) if errors.is_empty() => plan,
            _ => return Err(ControllerError::Config(errors)),
        };

        Ok(Self {
            intersection,
            program: SignalProgram::default(),
            plan,
            density: DensityEstimator::new(config.min_phase_duration),
            arrival: ImminentArrivalDetector::new(
                config.extension_window,
                config.near_stationary_speed,
            ),
            config,
            status: ControllerStatus::Uninitialized,
            current_phase: 0,
            last_switch: 0.0,
            switch_timer: None,
            switch_due: None,
            recalc_timer: None,
        })
    }

    pub fn with_program(mut self, program: SignalProgram) -> Self {
        self.program = program;
        self
    }

    pub fn intersection(&self) -> IntersectionID {
        self.intersection
    }

    pub fn program(&self) -> &SignalProgram {
        &self.program
    }

    pub fn plan(&self) -> &PhasePlan {
        &self.plan
    }

    pub fn config(&self) -> &SignalConfig {
        &self.config
    }

    pub fn mode(&self) -> ControlMode {
        self.config.mode
    }

    pub fn status(&self) -> ControllerStatus {
        self.status
    }

    pub fn is_done(&self) -> bool {
        self.status == ControllerStatus::Done
    }

    pub fn current_phase(&self) -> usize {
        self.current_phase
    }

    pub fn last_switch(&self) -> f64 {
        self.last_switch
    }

    pub fn switch_timer(&self) -> Option<TimerHandle> {
        self.switch_timer
    }

    pub fn recalc_timer(&self) -> Option<TimerHandle> {
        self.recalc_timer
    }

    /// Phase shown at `time` and its remaining seconds.
    ///
    /// The running phase ends when its armed switch timer fires, extensions and earlier
    /// redistributions included. Later phases are projected with the plan's current durations
    /// and no extension. Without an armed timer, the projection starts from the last switch.
    pub fn phase_at(&self, time: f64) -> Result<(usize, f64), PlanError> {
        match self.switch_due {
            Some(due) => self.plan.phase_after(time, self.current_phase, due),
            None => self.plan.phase_at(time, self.current_phase, self.last_switch),
        }
    }

    /// What a lane green during `green_phases` currently shows.
    pub fn behavior_for(&self, green_phases: &[usize]) -> TrafficBehavior {
        TrafficBehavior::for_lane(green_phases, self.current_phase, self.plan.len())
    }

    /// Enters the running state at `now` with phase 0 shown, arming the timers the mode uses.
    /// The scheduler's clock is expected to read `now`.
    pub fn start(&mut self, now: f64, scheduler: &mut dyn EventScheduler) -> Result<(), ControllerError> {
        if self.status != ControllerStatus::Uninitialized {
            warn!(
                "start called on {:?} controller of {:?}",
                self.status, self.intersection
            );
            return Ok(());
        }

        self.status = ControllerStatus::Running;
        self.current_phase = 0;
        self.last_switch = now;

        if self.config.mode.arms_switch_timer() {
            let first = self.plan.duration(0)?;
            self.arm_switch(now, first, scheduler);
        }
        if self.config.mode.arms_recalculation_timer() {
            self.arm_recalc(scheduler);
        }

        info!(
            "started controller for {:?} in {:?} mode, cycle {}s",
            self.intersection,
            self.config.mode,
            self.plan.cycle_duration()
        );
        Ok(())
    }

    /// Handles one timer firing at `now`.
    ///
    /// Callbacks arriving before start or after shutdown are discarded without touching any
    /// state. Backend failures are returned after the controller has already moved on, so the
    /// control loop stays armed.
    pub fn on_timer(&mut self, kind: TimerKind, now: f64, ports: &mut Ports<'_>) -> Result<Handled, ControllerError> {
        match self.status {
            ControllerStatus::Running => {}
            ControllerStatus::Uninitialized => {
                warn!("{:?} fired before {:?} started", kind, self.intersection);
                return Ok(Handled::Discarded);
            }
            ControllerStatus::Done => {
                debug!("discarding stale {:?} for {:?}", kind, self.intersection);
                return Ok(Handled::Discarded);
            }
        }

        match kind {
            TimerKind::RecalcFired => self.on_recalculate(ports),
            TimerKind::SwitchFired => self.on_switch(now, ports),
        }
    }

    /// Stops the controller for good and cancels its timers. Idempotent.
    pub fn shutdown(&mut self, scheduler: &mut dyn EventScheduler) {
        if self.status == ControllerStatus::Done {
            return;
        }
        self.status = ControllerStatus::Done;
        if let Some(h) = self.switch_timer.take() {
            scheduler.cancel(h);
        }
        self.switch_due = None;
        if let Some(h) = self.recalc_timer.take() {
            scheduler.cancel(h);
        }
        info!("controller for {:?} shut down", self.intersection);
    }

    fn on_recalculate(&mut self, ports: &mut Ports<'_>) -> Result<Handled, ControllerError> {
        if !self.config.mode.arms_recalculation_timer() {
            return Ok(Handled::Ignored);
        }
        self.recalc_timer = None;
        self.arm_recalc(ports.scheduler);

        let mut query_errors = MultiError::<ProbeError>::default();
        let changed = self.density.recalculate(
            ports.network,
            ports.probe,
            self.intersection,
            &mut self.plan,
            &mut query_errors,
        )?;
        if changed {
            debug!(
                "{:?} redistributed, cycle now {}s",
                self.intersection,
                self.plan.cycle_duration()
            );
        }
        query_errors.into_result()?;
        Ok(Handled::Recalculated { changed })
    }

    fn on_switch(&mut self, now: f64, ports: &mut Ports<'_>) -> Result<Handled, ControllerError> {
        if !self.config.mode.arms_switch_timer() {
            return Ok(Handled::Ignored);
        }
        self.switch_timer = None;
        self.switch_due = None;

        let mut query_errors = MultiError::<ProbeError>::default();
        let outcome = if self.may_extend(now)
            && self.arrival.should_extend(
                ports.network,
                ports.probe,
                self.intersection,
                self.current_phase,
                &mut query_errors,
            ) {
            self.arm_switch(now, self.config.extension_window, ports.scheduler);
            Handled::Extended {
                phase: self.current_phase,
            }
        } else {
            let from = self.current_phase;
            let to = self.plan.next_index(from);
            let duration = self.plan.duration(to)?;

            self.last_switch = now;
            self.current_phase = to;
            self.arm_switch(now, duration, ports.scheduler);
            Handled::Switched { from, to }
        };

        let shown = match outcome {
            Handled::Switched { to, .. } => ports.backend.set_signal_state(self.intersection, to),
            _ => Ok(()),
        };
        let suppressed = ports
            .backend
            .suppress_auto_expiry(self.intersection, self.config.suppress_duration);
        shown?;
        suppressed?;
        query_errors.into_result()?;

        Ok(outcome)
    }

    /// Extension is only considered for a traffic-carrying phase that has not yet run for
    /// `max_phase_duration` since it was entered.
    fn may_extend(&self, now: f64) -> bool {
        self.config.mode == ControlMode::LowDensityExtend
            && !PhasePlan::is_transitional(self.current_phase)
            && now - self.last_switch < self.config.max_phase_duration
    }

    fn arm_switch(&mut self, now: f64, delay: f64, scheduler: &mut dyn EventScheduler) {
        if let Some(old) = self.switch_timer.take() {
            scheduler.cancel(old);
        }
        self.switch_timer = Some(scheduler.schedule(delay, TimerKind::SwitchFired));
        self.switch_due = Some(now + delay.max(0.0));
    }

    fn arm_recalc(&mut self, scheduler: &mut dyn EventScheduler) {
        if let Some(old) = self.recalc_timer.take() {
            scheduler.cancel(old);
        }
        self.recalc_timer = Some(
            scheduler.schedule(self.config.recalculation_interval, TimerKind::RecalcFired),
        );
    }
}

impl Display for SignalController {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "id: {:<6} type: {} programID: {:<4} offset: {:<4} mode: {:?}",
            self.program.id, self.program.kind, self.program.program_id, self.program.offset, self.config.mode
        )?;
        write!(f, "{}", self.plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::{RecordingBackend, TimerQueue};
    use crate::map::Network;
    use crate::traffic::TrafficState;

    fn two_phase() -> Vec<Phase> {
        vec![Phase::new(10.0, "G"), Phase::new(3.0, "y")]
    }

    #[test]
    fn new_collects_every_error() {
        let mut inter = Network::empty();
        let id = inter.add_intersection();
        let config = SignalConfig {
            mode: ControlMode::HighDensity,
            recalculation_interval: -1.0,
            ..Default::default()
        };
        match SignalController::new(id, vec![], config) {
            Err(ControllerError::Config(errs)) => {
                assert_eq!(errs.0.len(), 2);
                assert!(errs.0.contains(&ConfigError::EmptyPlan));
            }
            other => panic!("expected config errors, got {:?}", other),
        }
    }

    #[test]
    fn off_mode_is_inert() {
        let mut net = Network::empty();
        let id = net.add_intersection();
        let mut q = TimerQueue::new();
        let mut c =
            SignalController::new(id, two_phase(), SignalConfig::with_mode(ControlMode::Off))
                .unwrap();
        c.start(0.0, &mut q).unwrap();
        assert_eq!(c.status(), ControllerStatus::Running);
        assert!(q.is_empty());
        assert!(c.switch_timer().is_none());
        assert!(c.recalc_timer().is_none());

        // A stray firing changes nothing
        let traffic = TrafficState::new();
        let mut backend = RecordingBackend::new();
        let mut ports = Ports {
            network: &net,
            probe: &traffic,
            scheduler: &mut q,
            backend: &mut backend,
        };
        assert_eq!(
            c.on_timer(TimerKind::SwitchFired, 10.0, &mut ports).unwrap(),
            Handled::Ignored
        );
        assert_eq!(c.current_phase(), 0);
        assert!(backend.commands.is_empty());
    }

    #[test]
    fn high_density_arms_both_timers() {
        let mut net = Network::empty();
        let id = net.add_intersection();
        let mut q = TimerQueue::new();
        let config = SignalConfig {
            mode: ControlMode::HighDensity,
            recalculation_interval: 7.0,
            ..Default::default()
        };
        let mut c = SignalController::new(id, two_phase(), config).unwrap();
        c.start(0.0, &mut q).unwrap();
        assert_eq!(q.len(), 2);
        let first = q.pop().unwrap();
        assert_eq!((first.time, first.kind), (7.0, TimerKind::RecalcFired));
        let second = q.pop().unwrap();
        assert_eq!((second.time, second.kind), (10.0, TimerKind::SwitchFired));
    }

    #[test]
    fn start_twice_keeps_timers() {
        let mut net = Network::empty();
        let id = net.add_intersection();
        let mut q = TimerQueue::new();
        let mut c = SignalController::new(
            id,
            two_phase(),
            SignalConfig::with_mode(ControlMode::FixedTime),
        )
        .unwrap();
        c.start(0.0, &mut q).unwrap();
        let h = c.switch_timer();
        c.start(5.0, &mut q).unwrap();
        assert_eq!(c.switch_timer(), h);
        assert_eq!(q.len(), 1);
        assert_eq!(c.last_switch(), 0.0);
    }

    #[test]
    fn display_shows_program() {
        let mut net = Network::empty();
        let id = net.add_intersection();
        let c = SignalController::new(id, two_phase(), SignalConfig::default())
            .unwrap()
            .with_program(SignalProgram {
                id: "C1".into(),
                kind: "static".into(),
                program_id: "0".into(),
                offset: 0.0,
            });
        let s = c.to_string();
        assert!(s.contains("C1"));
        assert!(s.contains("static"));
        assert!(s.contains("[1]"));
    }

    #[test]
    fn behavior_follows_current_phase() {
        let mut net = Network::empty();
        let id = net.add_intersection();
        let c = SignalController::new(id, two_phase(), SignalConfig::default()).unwrap();
        assert!(c.behavior_for(&[0]).is_green());
        assert!(c.behavior_for(&[2]).is_red());
    }
}
