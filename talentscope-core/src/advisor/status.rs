use std::collections::BTreeMap;

use serde::Serialize;

use crate::task::TaskClass;

/// Point-in-time view of the host and the registered pools, for operators.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemStatus {
    pub logical_cpu_count: usize,
    pub cpu_utilization_percent: f64,
    pub memory_utilization_percent: f64,
    pub available_memory_gb: f64,
    pub total_memory_gb: f64,
    pub active_workers_by_class: BTreeMap<TaskClass, usize>,
}
