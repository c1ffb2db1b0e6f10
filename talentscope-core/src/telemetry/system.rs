use std::thread;
use std::time::Duration;

use sysinfo::{CpuRefreshKind, MemoryRefreshKind, RefreshKind, System};

use super::{MemoryStats, Telemetry};
use crate::error::TelemetryError;

/// Window over which CPU utilization is averaged.
pub const DEFAULT_SAMPLE_WINDOW: Duration = Duration::from_millis(100);

/// Live readings from the host via `sysinfo`.
///
/// Every call builds its own `System`, so concurrent callers never wait on
/// each other's sampling window.
#[derive(Debug, Clone)]
pub struct SystemTelemetry {
    cpu_count: usize,
    sample_window: Duration,
}

impl SystemTelemetry {
    pub fn new() -> Self {
        Self::with_sample_window(DEFAULT_SAMPLE_WINDOW)
    }

    /// The window is raised to sysinfo's minimum refresh interval if shorter.
    pub fn with_sample_window(sample_window: Duration) -> Self {
        Self {
            cpu_count: num_cpus::get().max(1),
            sample_window: sample_window.max(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL),
        }
    }

    pub fn sample_window(&self) -> Duration {
        self.sample_window
    }
}

impl Default for SystemTelemetry {
    fn default() -> Self {
        Self::new()
    }
}

impl Telemetry for SystemTelemetry {
    fn cpu_count(&self) -> usize {
        self.cpu_count
    }

    fn cpu_percent(&self) -> Result<f64, TelemetryError> {
        if !sysinfo::IS_SUPPORTED_SYSTEM {
            return Err(TelemetryError::Unavailable("platform not supported by sysinfo".into()));
        }

        let kind = CpuRefreshKind::new().with_cpu_usage();
        let mut sys = System::new_with_specifics(RefreshKind::new().with_cpu(kind));

        // Usage is the delta between two refreshes.
        thread::sleep(self.sample_window);
        sys.refresh_cpu_specifics(kind);

        if sys.cpus().is_empty() {
            return Err(TelemetryError::Unavailable("no CPUs reported".into()));
        }

        Ok(sys.global_cpu_info().cpu_usage() as f64)
    }

    fn memory_stats(&self) -> Result<MemoryStats, TelemetryError> {
        if !sysinfo::IS_SUPPORTED_SYSTEM {
            return Err(TelemetryError::Unavailable("platform not supported by sysinfo".into()));
        }

        let mut sys = System::new_with_specifics(
            RefreshKind::new().with_memory(MemoryRefreshKind::new().with_ram()),
        );
        sys.refresh_memory();

        let total_bytes = sys.total_memory();
        if total_bytes == 0 {
            return Err(TelemetryError::Unavailable("total memory reported as zero".into()));
        }

        Ok(MemoryStats {
            total_bytes,
            available_bytes: sys.available_memory(),
        })
    }
}
