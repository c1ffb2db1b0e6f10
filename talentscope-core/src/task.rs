use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AdvisorError;

/// Memory estimate used when the caller has no better number.
pub const DEFAULT_MEMORY_PER_TASK_MB: f64 = 500.0;

/// Dominant resource profile of a homogeneous batch of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskClass {
    /// Network requests and file I/O.
    IoBound,
    /// LLM inference, parsing.
    CpuBound,
    /// Fetch followed by LLM work.
    Mixed,
    /// Quick operations with almost no per-task cost.
    Lightweight,
}

impl TaskClass {
    pub const ALL: [TaskClass; 4] = [
        TaskClass::IoBound,
        TaskClass::CpuBound,
        TaskClass::Mixed,
        TaskClass::Lightweight,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            TaskClass::IoBound => "io_bound",
            TaskClass::CpuBound => "cpu_bound",
            TaskClass::Mixed => "mixed",
            TaskClass::Lightweight => "lightweight",
        }
    }
}

impl fmt::Display for TaskClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for TaskClass {
    type Err = AdvisorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "io_bound" | "io" => Ok(TaskClass::IoBound),
            "cpu_bound" | "cpu" => Ok(TaskClass::CpuBound),
            "mixed" => Ok(TaskClass::Mixed),
            "lightweight" | "light" => Ok(TaskClass::Lightweight),
            _ => Err(AdvisorError::UnknownTaskClass(s.to_string())),
        }
    }
}

/// One sizing question: how many workers for this batch?
#[derive(Debug, Clone, PartialEq)]
pub struct ConcurrencyRequest {
    pub task_count: usize,
    pub task_class: TaskClass,
    /// Allows scaling further up when the machine is idle.
    pub prefer_speed: bool,
    /// Peak resident memory of one in-flight task.
    pub memory_per_task_mb: f64,
}

impl ConcurrencyRequest {
    pub fn new(task_count: usize, task_class: TaskClass) -> Self {
        Self {
            task_count,
            task_class,
            prefer_speed: true,
            memory_per_task_mb: DEFAULT_MEMORY_PER_TASK_MB,
        }
    }

    pub fn with_prefer_speed(mut self, prefer_speed: bool) -> Self {
        self.prefer_speed = prefer_speed;
        self
    }

    pub fn with_memory_per_task_mb(mut self, memory_per_task_mb: f64) -> Self {
        self.memory_per_task_mb = memory_per_task_mb;
        self
    }

    pub fn validate(&self) -> Result<(), AdvisorError> {
        if self.task_count < 1 {
            return Err(AdvisorError::InvalidTaskCount(self.task_count));
        }
        if !self.memory_per_task_mb.is_finite() || self.memory_per_task_mb <= 0.0 {
            return Err(AdvisorError::InvalidMemoryPerTask(self.memory_per_task_mb));
        }
        Ok(())
    }
}
