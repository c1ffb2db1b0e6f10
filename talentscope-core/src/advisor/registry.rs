use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::task::TaskClass;

/// Worker counts that callers report as currently running, per class.
///
/// Observability only: nothing in the sizing path reads it.
#[derive(Debug, Default)]
pub struct ActiveWorkers {
    counts: Mutex<BTreeMap<TaskClass, usize>>,
}

impl ActiveWorkers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `count` workers for `class`, replacing any earlier report.
    pub fn register(&self, class: TaskClass, count: usize) {
        self.lock().insert(class, count);
        debug!(task_class = %class, count, "registered active workers");
    }

    pub fn unregister(&self, class: TaskClass) {
        if self.lock().remove(&class).is_some() {
            debug!(task_class = %class, "unregistered active workers");
        }
    }

    /// Adds `count` workers on top of whatever is already recorded for `class`.
    pub fn add(&self, class: TaskClass, count: usize) {
        let mut counts = self.lock();
        let total = counts.entry(class).or_insert(0);
        *total = total.saturating_add(count);
        debug!(task_class = %class, count, total = *total, "added active workers");
    }

    /// Takes back `count` workers; the class disappears once nothing is left.
    pub fn release(&self, class: TaskClass, count: usize) {
        let mut counts = self.lock();
        if let Some(total) = counts.get_mut(&class) {
            *total = total.saturating_sub(count);
            debug!(task_class = %class, count, total = *total, "released active workers");
            if *total == 0 {
                counts.remove(&class);
            }
        }
    }

    pub fn snapshot(&self) -> BTreeMap<TaskClass, usize> {
        self.lock().clone()
    }

    // Map contents stay consistent even if a holder panicked.
    fn lock(&self) -> MutexGuard<'_, BTreeMap<TaskClass, usize>> {
        self.counts.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Counts its workers towards a class for as long as it lives. Guards of the
/// same class add up, so overlapping pools each keep their share.
#[must_use = "the registration is dropped immediately otherwise"]
#[derive(Debug)]
pub struct ActiveWorkersGuard {
    registry: Arc<ActiveWorkers>,
    class: TaskClass,
    count: usize,
}

impl ActiveWorkersGuard {
    pub(crate) fn new(registry: Arc<ActiveWorkers>, class: TaskClass, count: usize) -> Self {
        registry.add(class, count);
        Self { registry, class, count }
    }

    pub fn class(&self) -> TaskClass {
        self.class
    }

    pub fn count(&self) -> usize {
        self.count
    }
}

impl Drop for ActiveWorkersGuard {
    fn drop(&mut self) {
        self.registry.release(self.class, self.count);
    }
}
