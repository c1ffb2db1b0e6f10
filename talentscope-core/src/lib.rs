//! Adaptive concurrency sizing for the talentscope crawl and extraction
//! pipelines.
//!
//! A [`ConcurrencyAdvisor`] is built once at startup around a [`Telemetry`]
//! source and shared with every pipeline stage. Each stage asks it how many
//! workers to run for its next batch and sizes its own pool with the answer.

pub mod advisor;
pub mod error;
pub mod task;
pub mod telemetry;

pub use advisor::{ActiveWorkersGuard, ConcurrencyAdvisor, SystemStatus};
pub use error::{AdvisorError, TelemetryError};
pub use task::{ConcurrencyRequest, TaskClass};
pub use telemetry::{FixedTelemetry, MemoryStats, SystemTelemetry, Telemetry};
