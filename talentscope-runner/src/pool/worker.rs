use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::trace;

pub struct WorkItem<T> {
    pub index: usize,
    pub payload: T,
}

pub struct WorkResult<R> {
    pub index: usize,
    pub output: R,
    pub worker_id: usize,
}

/// Receiving end shared by every worker of a pool.
pub type SharedQueue<T> = Arc<Mutex<mpsc::Receiver<WorkItem<T>>>>;

#[derive(Clone)]
pub struct BatchWorker {
    pub id: usize,
    pub tasks_completed: Arc<AtomicU64>,
}

impl BatchWorker {
    pub fn new(id: usize) -> Self {
        Self {
            id,
            tasks_completed: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Pulls items until the queue is drained or the result side hangs up.
    pub async fn start<T, R, F, Fut>(
        &self,
        queue: SharedQueue<T>,
        result_tx: mpsc::Sender<WorkResult<R>>,
        task: Arc<F>,
    ) where
        F: Fn(T) -> Fut,
        Fut: Future<Output = R>,
    {
        trace!("Worker {} started", self.id);

        loop {
            // Lock only for the hand-off so other workers are not held up by our task.
            let next = queue.lock().await.recv().await;
            let Some(item) = next else {
                break; // Queue drained
            };

            let output = (*task)(item.payload).await;
            self.tasks_completed.fetch_add(1, Ordering::SeqCst);

            let result = WorkResult {
                index: item.index,
                output,
                worker_id: self.id,
            };
            if result_tx.send(result).await.is_err() {
                trace!("Worker {} result channel closed", self.id);
                break;
            }
        }

        trace!("Worker {} stopped after {} tasks", self.id, self.completed());
    }

    pub fn completed(&self) -> u64 {
        self.tasks_completed.load(Ordering::SeqCst)
    }
}
