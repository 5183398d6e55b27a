use crate::control::BackendError;
use crate::traffic::ProbeError;
use common::error::MultiError;
use common::saveload::LoadError;
use derive_more::From;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Invalid construction input. Fatal: a controller built from it never starts.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    EmptyPlan,
    InvalidPhaseDuration { index: usize, duration: f64 },
    NonPositive { field: &'static str, value: f64 },
    Negative { field: &'static str, value: f64 },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::EmptyPlan => f.pad("phase plan has no phases"),
            ConfigError::InvalidPhaseDuration { index, duration } => {
                write!(f, "phase {} has invalid duration {}", index, duration)
            }
            ConfigError::NonPositive { field, value } => {
                write!(f, "{} must be positive and finite, got {}", field, value)
            }
            ConfigError::Negative { field, value } => {
                write!(f, "{} must not be negative, got {}", field, value)
            }
        }
    }
}

impl Error for ConfigError {}

/// A phase index outside the plan. Never expected with correct modulo arithmetic.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct OutOfRange {
    pub index: usize,
    pub len: usize,
}

impl Display for OutOfRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "phase index {} out of range for a plan of {} phases",
            self.index, self.len
        )
    }
}

impl Error for OutOfRange {}

#[derive(Debug, Clone, PartialEq, From)]
pub enum PlanError {
    OutOfRange(OutOfRange),
    Config(ConfigError),
    /// `time` cannot be mapped to a phase: not finite, or too large for phase durations to
    /// still advance the clock.
    #[from(ignore)]
    Unresolvable { time: f64 },
}

impl Display for PlanError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            PlanError::OutOfRange(e) => e.fmt(f),
            PlanError::Config(e) => e.fmt(f),
            PlanError::Unresolvable { time } => {
                write!(f, "cannot resolve the phase shown at time {}", time)
            }
        }
    }
}

impl Error for PlanError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PlanError::OutOfRange(e) => Some(e),
            PlanError::Config(e) => Some(e),
            PlanError::Unresolvable { .. } => None,
        }
    }
}

#[derive(Debug, From)]
pub enum ControllerError {
    /// Every problem found while validating the plan and configuration.
    Config(MultiError<ConfigError>),
    Plan(PlanError),
    Backend(BackendError),
    /// Failed topology or traffic queries. The controller already degraded around them and
    /// finished handling the event.
    Probe(MultiError<ProbeError>),
    Load(LoadError),
}

impl From<ConfigError> for ControllerError {
    fn from(e: ConfigError) -> Self {
        ControllerError::Config(MultiError(vec![e]))
    }
}

impl From<OutOfRange> for ControllerError {
    fn from(e: OutOfRange) -> Self {
        ControllerError::Plan(PlanError::OutOfRange(e))
    }
}

impl Display for ControllerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        use ControllerError::*;
        match self {
            Config(e) => write!(f, "invalid configuration:\n{}", e),
            Plan(e) => write!(f, "phase plan error: {}", e),
            Backend(e) => write!(f, "signal backend error: {}", e),
            Probe(e) => write!(f, "traffic probe errors:\n{}", e),
            Load(e) => write!(f, "could not load configuration: {}", e),
        }
    }
}

impl Error for ControllerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        use ControllerError::*;
        match self {
            Config(e) => Some(e),
            Plan(e) => Some(e),
            Backend(e) => Some(e),
            Probe(e) => Some(e),
            Load(e) => Some(e),
        }
    }
}
