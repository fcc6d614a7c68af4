use serde::{Deserialize, Serialize};

pub mod agent;
pub mod stop;

pub use agent::AgentLoop;
pub use stop::StopCriteria;

/// Represents the status of the fitting loop
///
/// The loop starts in [Status::Starting], moves to [Status::InProgress] on
/// initialization, and terminates in exactly one of the stop states. There
/// is no resumption once a stop state is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    /// Loop has not started yet
    Starting,
    /// Loop is currently running
    InProgress,
    /// Loop stopped after reaching the maximum number of iterations
    MaxIterations,
    /// Loop stopped after the configured streak of non-improving iterations
    NoImprovement,
    /// Loop aborted because the pooled RMSE failed the quality gate
    QualityGate,
}

impl Status {
    pub fn is_done(&self) -> bool {
        matches!(
            self,
            Status::MaxIterations | Status::NoImprovement | Status::QualityGate
        )
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Starting => write!(f, "Starting"),
            Status::InProgress => write!(f, "In progress"),
            Status::MaxIterations => write!(f, "Maximum iterations reached"),
            Status::NoImprovement => write!(f, "No further improvement"),
            Status::QualityGate => write!(f, "Quality gate failed"),
        }
    }
}
