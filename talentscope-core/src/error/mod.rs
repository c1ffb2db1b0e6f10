pub mod advisor;
pub mod telemetry;

pub use advisor::AdvisorError;
pub use telemetry::TelemetryError;
