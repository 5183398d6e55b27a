use crate::control::PhasePlan;
use crate::map::{IntersectionID, RoadNetwork};
use crate::traffic::{ProbeError, TrafficProbe};
use crate::PlanError;
use common::error::MultiError;

/// Vehicles that could move during each phase of the plan.
///
/// A lane green during several phases adds its full count to each of them, and to `total` once
/// per phase: the histogram measures capacity demand, not distinct vehicles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseHistogram {
    pub counts: Vec<u32>,
    pub total: u32,
}

impl PhaseHistogram {
    pub fn empty(n_phases: usize) -> Self {
        Self {
            counts: vec![0; n_phases],
            total: 0,
        }
    }

    pub fn from_counts(counts: Vec<u32>) -> Self {
        let total = counts.iter().fold(0u32, |acc, &c| acc.saturating_add(c));
        Self { counts, total }
    }

    pub fn is_idle(&self) -> bool {
        self.total == 0
    }

    // Saturates: past u32::MAX vehicles the shares are meaningless anyway
    fn add(&mut self, phase: usize, count: u32) {
        self.counts[phase] = self.counts[phase].saturating_add(count);
        self.total = self.total.saturating_add(count);
    }

    /// Duration each non-transitional phase would get before the floor is applied, given the
    /// current sum of non-transitional durations. Transitional phases and an idle histogram
    /// yield `None`.
    ///
    /// Only half the phases carry traffic, so the share is doubled. Nothing clamps the result to
    /// the current cycle: a dominant phase can grow past `non_transitional_cycle_duration`.
    pub fn target_durations(&self, non_transitional_cycle_duration: f64) -> Vec<Option<f64>> {
        self.counts
            .iter()
            .enumerate()
            .map(|(i, &count)| {
                if self.is_idle() || PhasePlan::is_transitional(i) {
                    return None;
                }
                let portion = (count as f64 / self.total as f64) * 2.0;
                Some(portion * non_transitional_cycle_duration)
            })
            .collect()
    }
}

/// High-density policy: reallocates non-transitional time proportionally to demand.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DensityEstimator {
    pub min_phase_duration: f64,
}

impl DensityEstimator {
    pub fn new(min_phase_duration: f64) -> Self {
        Self { min_phase_duration }
    }

    /// Counts vehicles on every incoming lane of `inter` and attributes them to the lane's green
    /// phases. Failed queries contribute nothing, so a broken probe degrades toward "no change".
    /// Their errors are pushed into `errors`.
    pub fn histogram(
        &self,
        network: &dyn RoadNetwork,
        probe: &dyn TrafficProbe,
        inter: IntersectionID,
        n_phases: usize,
        errors: &mut MultiError<ProbeError>,
    ) -> PhaseHistogram {
        let mut hist = PhaseHistogram::empty(n_phases);

        let edges = match network.incoming_edges(inter) {
            Ok(edges) => edges,
            Err(e) => {
                warn!("density: cannot list incoming edges: {}", e);
                errors.push(e);
                return hist;
            }
        };

        for &edge in edges {
            let lanes = unwrap_contwarn!(
                network.lanes_of(edge),
                errors,
                "density: lanes of {:?}",
                edge
            );
            for &lane in lanes {
                let greens = unwrap_contwarn!(
                    network.green_phases_of(lane),
                    errors,
                    "density: green phases of {:?}",
                    lane
                );
                if greens.is_empty() {
                    continue;
                }
                let occupancy = unwrap_contwarn!(
                    probe.lane_occupancy(lane),
                    errors,
                    "density: occupancy of {:?} counted as zero",
                    lane
                );
                let count = u32::try_from(occupancy).unwrap_or(u32::MAX);

                for &phase in greens {
                    if phase >= n_phases {
                        warn!(
                            "density: lane {:?} lists phase {} but the plan has {}",
                            lane, phase, n_phases
                        );
                        continue;
                    }
                    hist.add(phase, count);
                }
            }
        }

        hist
    }

    /// Applies `hist` to the plan. Returns whether any duration changed.
    ///
    /// Only durations change; the phase currently shown keeps the end time it was armed with and
    /// picks up its new duration the next time it is entered.
    pub fn redistribute(&self, plan: &mut PhasePlan, hist: &PhaseHistogram) -> Result<bool, PlanError> {
        if hist.is_idle() {
            return Ok(false);
        }

        let targets = hist.target_durations(plan.non_transitional_cycle_duration());
        let mut changed = false;
        for (i, target) in targets.into_iter().enumerate().take(plan.len()) {
            let target = unwrap_cont!(target);
            let duration = target.max(self.min_phase_duration);
            if plan.duration(i)? != duration {
                plan.set_duration(i, duration)?;
                changed = true;
            }
        }
        Ok(changed)
    }

    /// Measures and redistributes in one go.
    pub fn recalculate(
        &self,
        network: &dyn RoadNetwork,
        probe: &dyn TrafficProbe,
        inter: IntersectionID,
        plan: &mut PhasePlan,
        errors: &mut MultiError<ProbeError>,
    ) -> Result<bool, PlanError> {
        let hist = self.histogram(network, probe, inter, plan.len(), errors);
        debug!(
            "density: {:?} counts {:?} total {}",
            inter, hist.counts, hist.total
        );
        self.redistribute(plan, &hist)
    }
}
