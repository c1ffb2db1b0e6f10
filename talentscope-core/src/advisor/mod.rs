pub mod profile;
pub mod registry;
pub mod status;

#[cfg(test)]
mod advisor_tests;

pub use registry::{ActiveWorkers, ActiveWorkersGuard};
pub use status::SystemStatus;

use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info, warn};

use crate::error::{AdvisorError, TelemetryError};
use crate::task::{ConcurrencyRequest, TaskClass};
use crate::telemetry::{MemoryStats, SystemTelemetry, Telemetry};

/// Utilization assumed when no CPU reading has ever succeeded. Lands in the
/// neutral bucket, so the baseline is used unchanged.
pub const FALLBACK_CPU_PERCENT: f64 = 50.0;

/// Recommends worker pool sizes from live host telemetry.
///
/// Build one at startup and share it (`Arc<ConcurrencyAdvisor>`) with every
/// pipeline stage. Sizing calls are independent of each other; the only
/// shared mutable state is the diagnostic registry and the last good CPU
/// reading.
pub struct ConcurrencyAdvisor {
    telemetry: Arc<dyn Telemetry>,
    cpu_count: usize,
    total_memory_gb: f64,
    last_cpu_percent: Mutex<Option<f64>>,
    active: Arc<ActiveWorkers>,
}

impl ConcurrencyAdvisor {
    pub fn new(telemetry: Arc<dyn Telemetry>) -> Self {
        let cpu_count = telemetry.cpu_count().max(1);
        let total_memory_gb = match telemetry.memory_stats() {
            Ok(memory) => memory.total_gb(),
            Err(e) => {
                warn!("Could not read total memory, memory budget falls back to live readings only: {}", e);
                0.0
            }
        };

        info!("Concurrency advisor initialized: {} CPUs, {:.1}GB RAM", cpu_count, total_memory_gb);

        Self {
            telemetry,
            cpu_count,
            total_memory_gb,
            last_cpu_percent: Mutex::new(None),
            active: Arc::new(ActiveWorkers::new()),
        }
    }

    /// Advisor backed by the host's own telemetry.
    pub fn system() -> Self {
        Self::new(Arc::new(SystemTelemetry::new()))
    }

    pub fn cpu_count(&self) -> usize {
        self.cpu_count
    }

    pub fn total_memory_gb(&self) -> f64 {
        self.total_memory_gb
    }

    /// Worker count for one batch.
    ///
    /// The result never exceeds `task_count` or the class ceiling, and is at
    /// least 2 whenever the batch holds two or more tasks. Telemetry failures
    /// degrade the estimate but never fail the call.
    pub fn get_optimal_workers(&self, request: &ConcurrencyRequest) -> Result<usize, AdvisorError> {
        request.validate()?;

        let cpu_percent = self.sample_cpu_percent();
        let memory = self.sample_memory();
        let sizing = profile::size(request, self.cpu_count, cpu_percent, memory.map(|m| m.available_gb()));

        debug!(
            task_count = request.task_count,
            task_class = %request.task_class,
            prefer_speed = request.prefer_speed,
            memory_per_task_mb = request.memory_per_task_mb,
            cpu_percent,
            memory_percent = memory.map(|m| m.utilization_percent()),
            baseline = sizing.baseline,
            factor = sizing.factor(),
            adjusted = sizing.adjusted,
            memory_ceiling = sizing.memory_ceiling,
            class_ceiling = sizing.class_ceiling,
            workers = sizing.workers,
            "sized worker pool"
        );

        Ok(sizing.workers)
    }

    /// Sizing for candidate evaluation. Over-fetches by a bounded margin so
    /// enough candidates survive downstream filtering.
    pub fn get_candidate_processing_workers(
        &self,
        candidate_count: usize,
        required_count: usize,
        has_homepage: bool,
    ) -> Result<usize, AdvisorError> {
        let (task_class, memory_per_task_mb) = if has_homepage {
            (TaskClass::IoBound, 1000.0)
        } else {
            (TaskClass::Mixed, 500.0)
        };

        let margin = required_count
            .saturating_mul(2)
            .max(required_count.saturating_add(3));
        let task_count = candidate_count.min(margin);

        let request = ConcurrencyRequest::new(task_count, task_class)
            .with_prefer_speed(true)
            .with_memory_per_task_mb(memory_per_task_mb);
        self.get_optimal_workers(&request)
    }

    /// Sizing for fetching page content.
    pub fn get_extraction_workers(&self, url_count: usize) -> Result<usize, AdvisorError> {
        let request = ConcurrencyRequest::new(url_count, TaskClass::IoBound)
            .with_prefer_speed(true)
            .with_memory_per_task_mb(50.0);
        self.get_optimal_workers(&request)
    }

    /// Sizing for batches of LLM calls.
    pub fn get_llm_processing_workers(&self, task_count: usize) -> Result<usize, AdvisorError> {
        let request = ConcurrencyRequest::new(task_count, TaskClass::CpuBound)
            .with_prefer_speed(true)
            .with_memory_per_task_mb(200.0);
        self.get_optimal_workers(&request)
    }

    /// Sizing by class label (`"io_bound"`, `"cpu"`, `"mixed"`, ...) with
    /// default request settings.
    pub fn get_workers_for_label(&self, task_count: usize, label: &str) -> Result<usize, AdvisorError> {
        let task_class: TaskClass = label.parse()?;
        self.get_optimal_workers(&ConcurrencyRequest::new(task_count, task_class))
    }

    pub fn get_system_status(&self) -> SystemStatus {
        let cpu_utilization_percent = self.sample_cpu_percent();
        let memory = self.sample_memory();

        SystemStatus {
            logical_cpu_count: self.cpu_count,
            cpu_utilization_percent,
            memory_utilization_percent: memory.map(|m| m.utilization_percent()).unwrap_or(0.0),
            available_memory_gb: memory.map(|m| m.available_gb()).unwrap_or(0.0),
            total_memory_gb: self.total_memory_gb,
            active_workers_by_class: self.active.snapshot(),
        }
    }

    pub fn register_active(&self, class: TaskClass, count: usize) {
        self.active.register(class, count);
    }

    pub fn unregister_active(&self, class: TaskClass) {
        self.active.unregister(class);
    }

    /// Adds `count` workers to `class` until the guard is dropped. Unlike
    /// `register_active`, overlapping guards of one class add up.
    pub fn track_active(&self, class: TaskClass, count: usize) -> ActiveWorkersGuard {
        ActiveWorkersGuard::new(self.active.clone(), class, count)
    }

    fn sample_cpu_percent(&self) -> f64 {
        let reading = self.telemetry.cpu_percent().and_then(|cpu| {
            if cpu.is_finite() && (0.0..=100.0).contains(&cpu) {
                Ok(cpu)
            } else {
                Err(TelemetryError::Implausible { metric: "cpu_percent", value: cpu })
            }
        });

        let mut last = self.last_cpu_percent.lock().unwrap_or_else(PoisonError::into_inner);
        match reading {
            Ok(cpu) => {
                *last = Some(cpu);
                cpu
            }
            Err(e) => {
                let fallback = last.unwrap_or(FALLBACK_CPU_PERCENT);
                warn!("CPU reading failed, assuming {:.1}%: {}", fallback, e);
                fallback
            }
        }
    }

    /// Live memory, or half of the startup total when the reading fails.
    fn sample_memory(&self) -> Option<MemoryStats> {
        let reading = self.telemetry.memory_stats().and_then(|memory| {
            if memory.available_bytes > memory.total_bytes {
                Err(TelemetryError::Implausible {
                    metric: "available_memory_gb",
                    value: memory.available_gb(),
                })
            } else {
                Ok(memory)
            }
        });

        match reading {
            Ok(memory) => Some(memory),
            Err(e) if self.total_memory_gb > 0.0 => {
                warn!("Memory reading failed, assuming half of {:.1}GB is free: {}", self.total_memory_gb, e);
                Some(MemoryStats::from_gb(self.total_memory_gb, self.total_memory_gb / 2.0))
            }
            Err(e) => {
                warn!("Memory reading failed and total is unknown, skipping memory budget: {}", e);
                None
            }
        }
    }
}

impl std::fmt::Debug for ConcurrencyAdvisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConcurrencyAdvisor")
            .field("cpu_count", &self.cpu_count)
            .field("total_memory_gb", &self.total_memory_gb)
            .finish_non_exhaustive()
    }
}
