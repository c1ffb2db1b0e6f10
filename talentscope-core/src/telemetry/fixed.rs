use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{MemoryStats, Telemetry};
use crate::error::TelemetryError;

#[derive(Debug, Clone, Copy)]
struct Readings {
    cpu_percent: Option<f64>,
    memory: Option<MemoryStats>,
}

/// Deterministic telemetry with readings the owner can change at any time.
///
/// A reading set to `None` reports [`TelemetryError::Unavailable`], which is
/// how tests drive the advisor's fallbacks. Also handy for dry runs.
#[derive(Debug)]
pub struct FixedTelemetry {
    cpu_count: usize,
    readings: Mutex<Readings>,
}

impl FixedTelemetry {
    pub fn new(cpu_count: usize, cpu_percent: f64, total_gb: f64, available_gb: f64) -> Self {
        Self {
            cpu_count,
            readings: Mutex::new(Readings {
                cpu_percent: Some(cpu_percent),
                memory: Some(MemoryStats::from_gb(total_gb, available_gb)),
            }),
        }
    }

    pub fn set_cpu_percent(&self, cpu_percent: Option<f64>) {
        self.lock().cpu_percent = cpu_percent;
    }

    pub fn set_memory(&self, memory: Option<MemoryStats>) {
        self.lock().memory = memory;
    }

    pub fn set_available_gb(&self, available_gb: f64) {
        let mut readings = self.lock();
        let total_gb = readings.memory.map(|m| m.total_gb()).unwrap_or(available_gb);
        readings.memory = Some(MemoryStats::from_gb(total_gb, available_gb));
    }

    // Readings are plain values, so a poisoned lock still holds usable data.
    fn lock(&self) -> MutexGuard<'_, Readings> {
        self.readings.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Telemetry for FixedTelemetry {
    fn cpu_count(&self) -> usize {
        self.cpu_count
    }

    fn cpu_percent(&self) -> Result<f64, TelemetryError> {
        self.lock()
            .cpu_percent
            .ok_or_else(|| TelemetryError::Unavailable("cpu reading disabled".into()))
    }

    fn memory_stats(&self) -> Result<MemoryStats, TelemetryError> {
        self.lock()
            .memory
            .ok_or_else(|| TelemetryError::Unavailable("memory reading disabled".into()))
    }
}
