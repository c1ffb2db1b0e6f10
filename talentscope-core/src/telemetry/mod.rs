//! Sources of CPU and memory readings for the advisor.

pub mod fixed;
pub mod system;

pub use fixed::FixedTelemetry;
pub use system::SystemTelemetry;

use crate::error::TelemetryError;

pub(crate) const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Host memory in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryStats {
    pub total_bytes: u64,
    pub available_bytes: u64,
}

impl MemoryStats {
    pub fn from_gb(total_gb: f64, available_gb: f64) -> Self {
        Self {
            total_bytes: (total_gb * BYTES_PER_GB) as u64,
            available_bytes: (available_gb * BYTES_PER_GB) as u64,
        }
    }

    pub fn total_gb(&self) -> f64 {
        self.total_bytes as f64 / BYTES_PER_GB
    }

    pub fn available_gb(&self) -> f64 {
        self.available_bytes as f64 / BYTES_PER_GB
    }

    /// Share of memory in use, 0-100. Zero when the total is unknown.
    pub fn utilization_percent(&self) -> f64 {
        if self.total_bytes == 0 {
            return 0.0;
        }
        let used = self.total_bytes.saturating_sub(self.available_bytes);
        used as f64 / self.total_bytes as f64 * 100.0
    }
}

/// OS telemetry consumed by the advisor.
///
/// `cpu_count` is read once when the advisor is built. The other two are read
/// on every sizing call and may block for a short sampling window.
pub trait Telemetry: Send + Sync {
    fn cpu_count(&self) -> usize;

    /// System-wide CPU utilization in percent.
    fn cpu_percent(&self) -> Result<f64, TelemetryError>;

    fn memory_stats(&self) -> Result<MemoryStats, TelemetryError>;
}
