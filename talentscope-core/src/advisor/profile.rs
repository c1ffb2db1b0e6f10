//! Sizing arithmetic. Everything here is pure: readings in, numbers out.

use crate::task::{ConcurrencyRequest, TaskClass};

/// Lowest worker count handed out whenever the batch has room for it.
pub const MIN_WORKERS: usize = 2;

/// Absolute cap for I/O-heavy and lightweight pools.
pub const MAX_IO_WORKERS: usize = 100;

/// Share of available memory the advisor lets a batch consume.
pub const MEMORY_BUDGET_FRACTION: f64 = 0.8;

/// Utilization (percent) above which the host counts as saturated.
pub const HIGH_LOAD_PERCENT: f64 = 80.0;
pub const MODERATE_LOAD_PERCENT: f64 = 60.0;
pub const LOW_LOAD_PERCENT: f64 = 30.0;

/// Starting worker count for a batch before any load adjustment.
pub fn baseline(class: TaskClass, task_count: usize, cores: usize) -> usize {
    let per_class = match class {
        TaskClass::IoBound => cores.saturating_mul(5),
        TaskClass::CpuBound => cores,
        TaskClass::Lightweight => cores.saturating_mul(8),
        TaskClass::Mixed => cores.saturating_mul(2),
    };
    task_count.min(per_class)
}

/// Hard upper bound for a class, independent of load and batch size.
pub fn class_ceiling(class: TaskClass, cores: usize) -> usize {
    match class {
        TaskClass::IoBound | TaskClass::Lightweight => MAX_IO_WORKERS.min(cores.saturating_mul(10)),
        TaskClass::CpuBound => cores.saturating_add(2),
        TaskClass::Mixed => cores.saturating_mul(3),
    }
}

/// Load adjustment as an integer percentage, so `baseline * pct / 100`
/// floors exactly.
pub fn load_factor_percent(class: TaskClass, cpu_percent: f64, prefer_speed: bool) -> usize {
    let cpu_bound = class == TaskClass::CpuBound;
    if cpu_percent > HIGH_LOAD_PERCENT {
        if cpu_bound { 60 } else { 80 }
    } else if cpu_percent > MODERATE_LOAD_PERCENT {
        if cpu_bound { 80 } else { 90 }
    } else if cpu_percent < LOW_LOAD_PERCENT {
        if prefer_speed { 150 } else { 120 }
    } else {
        100
    }
}

/// Workers that fit in the memory budget. Zero when nothing fits.
pub fn memory_ceiling(available_gb: f64, memory_per_task_mb: f64) -> usize {
    let budget_mb = available_gb * 1024.0 * MEMORY_BUDGET_FRACTION;
    // Float to int casts saturate; negative and NaN land on zero.
    (budget_mb / memory_per_task_mb).floor() as usize
}

/// Every intermediate value of one sizing decision.
#[derive(Debug, Clone, PartialEq)]
pub struct Sizing {
    pub baseline: usize,
    pub factor_percent: usize,
    pub adjusted: usize,
    /// `None` when memory could not be read at all.
    pub memory_ceiling: Option<usize>,
    pub class_ceiling: usize,
    pub workers: usize,
}

impl Sizing {
    pub fn factor(&self) -> f64 {
        self.factor_percent as f64 / 100.0
    }
}

/// Full sizing pipeline for an already validated request.
pub fn size(
    request: &ConcurrencyRequest,
    cores: usize,
    cpu_percent: f64,
    available_gb: Option<f64>,
) -> Sizing {
    let task_count = request.task_count;
    let class = request.task_class;

    let baseline = baseline(class, task_count, cores);
    let class_ceiling = class_ceiling(class, cores);
    let factor_percent = load_factor_percent(class, cpu_percent, request.prefer_speed);
    let adjusted = baseline.saturating_mul(factor_percent) / 100;
    let memory_ceiling = available_gb.map(|gb| memory_ceiling(gb, request.memory_per_task_mb));

    let capped = adjusted
        .min(memory_ceiling.unwrap_or(usize::MAX))
        .min(class_ceiling)
        .min(task_count);

    // The floor never pushes a single task onto two workers.
    let workers = capped.max(MIN_WORKERS).min(task_count);

    Sizing {
        baseline,
        factor_percent,
        adjusted,
        memory_ceiling,
        class_ceiling,
        workers,
    }
}
