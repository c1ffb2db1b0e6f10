use super::worker::{BatchWorker, WorkItem};
use crate::utils::stats::BatchStats;
use anyhow::{anyhow, Result};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use talentscope_core::{ConcurrencyAdvisor, TaskClass};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info};

const DEFAULT_STATS_INTERVAL: Duration = Duration::from_secs(10);

pub struct BatchOutcome<R> {
    /// One entry per input item, in input order.
    pub outputs: Vec<Result<R>>,
    pub stats: BatchStats,
}

/// Fixed-size pool of workers draining one batch, registered with the
/// advisor's status report while it runs.
pub struct BatchPool {
    advisor: Arc<ConcurrencyAdvisor>,
    task_class: TaskClass,
    workers: Vec<BatchWorker>,
    stats_interval: Duration,
}

impl BatchPool {
    pub fn new(advisor: Arc<ConcurrencyAdvisor>, task_class: TaskClass, worker_count: usize) -> Self {
        let workers = (0..worker_count.max(1)).map(BatchWorker::new).collect();

        Self {
            advisor,
            task_class,
            workers,
            stats_interval: DEFAULT_STATS_INTERVAL,
        }
    }

    pub fn with_stats_interval(mut self, interval: Duration) -> Self {
        self.stats_interval = interval.max(Duration::from_secs(1));
        self
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    pub async fn run<T, R, F, Fut>(&self, items: Vec<T>, task: F) -> Result<BatchOutcome<R>>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R>> + Send + 'static,
    {
        let total = items.len();
        let stats = BatchStats::new(total as u64);
        if total == 0 {
            return Ok(BatchOutcome { outputs: Vec::new(), stats });
        }

        let _active = self.advisor.track_active(self.task_class, self.workers.len());
        info!("Running {} {} tasks on {} workers", total, self.task_class, self.workers.len());

        // Queue everything up front; workers pull until it is empty.
        let (work_tx, work_rx) = mpsc::channel::<WorkItem<T>>(total);
        for (index, payload) in items.into_iter().enumerate() {
            work_tx
                .send(WorkItem { index, payload })
                .await
                .map_err(|_| anyhow!("work queue closed before dispatch"))?;
        }
        drop(work_tx);

        let queue = Arc::new(Mutex::new(work_rx));
        let task = Arc::new(task);
        let (result_tx, mut result_rx) = mpsc::channel(self.workers.len());

        let mut worker_handles = Vec::with_capacity(self.workers.len());
        for worker in &self.workers {
            let worker = worker.clone();
            let queue = queue.clone();
            let result_tx = result_tx.clone();
            let task = task.clone();

            worker_handles.push(tokio::spawn(async move {
                worker.start(queue, result_tx, task).await;
            }));
        }

        drop(result_tx);

        let stats_handle = {
            let stats = stats.clone();
            let interval = self.stats_interval;

            tokio::spawn(async move {
                let mut stats_timer = tokio::time::interval(interval);
                stats_timer.tick().await; // fires immediately
                loop {
                    stats_timer.tick().await;
                    Self::report_stats(&stats);
                }
            })
        };

        let mut slots: Vec<Option<Result<R>>> = (0..total).map(|_| None).collect();
        while let Some(result) = result_rx.recv().await {
            stats.record(result.output.is_ok());
            debug!("Task {} finished on worker {}", result.index, result.worker_id);
            slots[result.index] = Some(result.output);
        }

        stats_handle.abort();
        for handle in worker_handles {
            handle.await.map_err(|e| anyhow!("worker task failed: {}", e))?;
        }

        let outputs = slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| slot.ok_or_else(|| anyhow!("task {} produced no result", index)))
            .collect::<Result<Vec<_>>>()?;

        info!(
            "Batch finished: {}/{} ok in {:.2?} ({:.1} tasks/s)",
            stats.completed() - stats.failed(),
            total,
            stats.elapsed(),
            stats.overall_throughput()
        );

        Ok(BatchOutcome { outputs, stats })
    }

    fn report_stats(stats: &BatchStats) {
        info!(
            "Batch progress - {}/{} done, {} failed, {:.2} tasks/s",
            stats.completed(),
            stats.total,
            stats.failed(),
            stats.calculate_throughput()
        );
    }
}
