use crate::{ConfigError, OutOfRange, PlanError};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// One signal configuration held for `duration` seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phase {
    duration: f64,
    /// Opaque token understood by the signal backend, e.g. `"GGrr"`.
    pub state: String,
}

impl Phase {
    pub fn new(duration: f64, state: impl Into<String>) -> Self {
        Self {
            duration,
            state: state.into(),
        }
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }
}

impl Display for Phase {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "duration: {:<6} state: {}", self.duration, self.state)
    }
}

/// The cyclic sequence of phases of one intersection.
///
/// Even positions are traffic-carrying phases that adaptive control may resize. Odd positions
/// are transitional (yellow, all-red) and keep their duration. Both cycle totals are recomputed
/// on every change, so they always match the phases.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhasePlan {
    phases: Vec<Phase>,
    #[serde(skip)]
    cycle_duration: f64,
    #[serde(skip)]
    non_transitional_cycle_duration: f64,
}

impl PhasePlan {
    /// Fails on an empty plan or on any non-positive or non-finite duration.
    pub fn build(phases: Vec<Phase>) -> Result<Self, ConfigError> {
        if phases.is_empty() {
            return Err(ConfigError::EmptyPlan);
        }
        if let Some((index, p)) = phases.iter().find_position(|p| !is_valid_duration(p.duration)) {
            return Err(ConfigError::InvalidPhaseDuration {
                index,
                duration: p.duration,
            });
        }

        let mut plan = Self {
            phases,
            cycle_duration: 0.0,
            non_transitional_cycle_duration: 0.0,
        };
        plan.update_totals();
        Ok(plan)
    }

    #[inline]
    pub fn is_transitional(index: usize) -> bool {
        index % 2 == 1
    }

    pub fn len(&self) -> usize {
        self.phases.len()
    }

    /// Always false: a plan has at least one phase.
    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }

    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }

    pub fn get(&self, index: usize) -> Result<&Phase, OutOfRange> {
        self.phases.get(index).ok_or(OutOfRange {
            index,
            len: self.phases.len(),
        })
    }

    pub fn duration(&self, index: usize) -> Result<f64, OutOfRange> {
        self.get(index).map(Phase::duration)
    }

    pub fn cycle_duration(&self) -> f64 {
        self.cycle_duration
    }

    pub fn non_transitional_cycle_duration(&self) -> f64 {
        self.non_transitional_cycle_duration
    }

    /// Index of the phase following `index`, wrapping around.
    pub fn next_index(&self, index: usize) -> usize {
        (index + 1) % self.phases.len()
    }

    /// Callers clamp to their minimum phase duration before calling.
    pub fn set_duration(&mut self, index: usize, duration: f64) -> Result<(), PlanError> {
        let len = self.phases.len();
        let phase = self
            .phases
            .get_mut(index)
            .ok_or(OutOfRange { index, len })?;
        if !is_valid_duration(duration) {
            return Err(ConfigError::InvalidPhaseDuration { index, duration }.into());
        }
        phase.duration = duration;
        self.update_totals();
        Ok(())
    }

    /// Which phase is shown at `time` and how long it has left, assuming phase `from_index`
    /// started at `from_switch_time` and every later phase runs its current duration.
    ///
    /// Walks the cycle phase by phase, so durations changed after `from_switch_time` are
    /// honored. Times before the end of `from_index` report `from_index`.
    pub fn phase_at(&self, time: f64, from_index: usize, from_switch_time: f64) -> Result<(usize, f64), PlanError> {
        let end = from_switch_time + self.duration(from_index)?;
        self.phase_after(time, from_index, end)
    }

    /// Like [`PhasePlan::phase_at`], for a phase `index` already known to end at `end`.
    ///
    /// Fails with [`PlanError::Unresolvable`] when `time` or `end` is not finite, or when `time`
    /// is so far from `end` that adding a phase duration no longer moves the clock.
    pub fn phase_after(&self, time: f64, index: usize, mut end: f64) -> Result<(usize, f64), PlanError> {
        self.get(index)?;
        if !time.is_finite() || !end.is_finite() {
            return Err(PlanError::Unresolvable { time });
        }
        let scale = time.abs().max(end.abs());
        if scale + self.cycle_duration <= scale {
            return Err(PlanError::Unresolvable { time });
        }

        // Skip whole cycles first so far-away queries stay cheap
        if time >= end + self.cycle_duration {
            let cycles = ((time - end) / self.cycle_duration).floor();
            end += cycles * self.cycle_duration;
        }

        let mut phase = index;
        while time >= end {
            phase = self.next_index(phase);
            let next = end + self.phases[phase].duration;
            if next <= end {
                return Err(PlanError::Unresolvable { time });
            }
            end = next;
        }

        Ok((phase, end - time))
    }

    fn update_totals(&mut self) {
        self.cycle_duration = self.phases.iter().map(Phase::duration).sum();
        self.non_transitional_cycle_duration = self
            .phases
            .iter()
            .step_by(2)
            .map(Phase::duration)
            .sum();
    }
}

impl<'de> Deserialize<'de> for PhasePlan {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Raw {
            phases: Vec<Phase>,
        }

        let raw = Raw::deserialize(deserializer)?;
        PhasePlan::build(raw.phases).map_err(serde::de::Error::custom)
    }
}

impl Display for PhasePlan {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "cycle: {} ({} non-transitional)",
            self.cycle_duration, self.non_transitional_cycle_duration
        )?;
        write!(
            f,
            "{}",
            self.phases
                .iter()
                .enumerate()
                .format_with("\n", |(i, p), f| f(&format_args!("  [{}] {}", i, p)))
        )
    }
}

fn is_valid_duration(d: f64) -> bool {
    d > 0.0 && d.is_finite()
}
