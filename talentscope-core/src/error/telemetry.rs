use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TelemetryError {
    #[error("telemetry source unavailable: {0}")]
    Unavailable(String),

    #[error("telemetry reported an implausible value for {metric}: {value}")]
    Implausible { metric: &'static str, value: f64 },
}
