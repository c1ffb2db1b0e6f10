use thiserror::Error;

/// Caller contract violations. These signal an upstream bug and are never
/// produced by telemetry problems.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AdvisorError {
    #[error("task count must be at least 1, got {0}")]
    InvalidTaskCount(usize),

    #[error("memory per task must be a positive number of MB, got {0}")]
    InvalidMemoryPerTask(f64),

    #[error("unknown task class label '{0}'")]
    UnknownTaskClass(String),
}
