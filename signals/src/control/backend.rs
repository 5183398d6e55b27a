use crate::map::IntersectionID;
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    Unreachable(String),
    Rejected { intersection: IntersectionID, reason: String },
}

impl Display for BackendError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendError::Unreachable(why) => write!(f, "backend unreachable: {}", why),
            BackendError::Rejected {
                intersection,
                reason,
            } => write!(f, "command for {:?} rejected: {}", intersection, reason),
        }
    }
}

impl Error for BackendError {}

/// The system actually showing the lights.
pub trait SignalBackend {
    /// Shows phase `phase` of the intersection's plan.
    fn set_signal_state(&mut self, intersection: IntersectionID, phase: usize) -> Result<(), BackendError>;

    /// Pushes the backend's own expiry of the current phase `duration` seconds away, so that only
    /// the controller decides when phases end.
    fn suppress_auto_expiry(&mut self, intersection: IntersectionID, duration: f64) -> Result<(), BackendError>;
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum BackendCommand {
    SetSignalState { intersection: IntersectionID, phase: usize },
    SuppressAutoExpiry { intersection: IntersectionID, duration: f64 },
}

/// Backend that remembers every command, optionally refusing them.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    pub commands: Vec<BackendCommand>,
    pub refuse: bool,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Phases passed to `set_signal_state`, in order.
    pub fn shown_phases(&self) -> Vec<usize> {
        self.commands
            .iter()
            .filter_map(|c| match *c {
                BackendCommand::SetSignalState { phase, .. } => Some(phase),
                BackendCommand::SuppressAutoExpiry { .. } => None,
            })
            .collect()
    }

    pub fn suppress_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, BackendCommand::SuppressAutoExpiry { .. }))
            .count()
    }

    fn check(&self, intersection: IntersectionID) -> Result<(), BackendError> {
        if self.refuse {
            return Err(BackendError::Rejected {
                intersection,
                reason: "refusing commands".to_string(),
            });
        }
        Ok(())
    }
}

impl SignalBackend for RecordingBackend {
    fn set_signal_state(&mut self, intersection: IntersectionID, phase: usize) -> Result<(), BackendError> {
        self.check(intersection)?;
        self.commands.push(BackendCommand::SetSignalState {
            intersection,
            phase,
        });
        Ok(())
    }

    fn suppress_auto_expiry(&mut self, intersection: IntersectionID, duration: f64) -> Result<(), BackendError> {
        self.check(intersection)?;
        self.commands.push(BackendCommand::SuppressAutoExpiry {
            intersection,
            duration,
        });
        Ok(())
    }
}
