use std::collections::VecDeque;
use std::future::Future;

use futures::future::join_all;
use tokio::sync::Mutex;
use tracing::debug;

/// Fixed set of workers draining one shared queue.
///
/// Each worker runs its tasks strictly one after another; at most
/// `workers` tasks are in flight. Items are taken by whichever worker is
/// free first.
pub struct WorkerPool {
    workers: usize,
}

impl WorkerPool {
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run `task(worker, item)` for every item; results keep input order.
    pub async fn run<I, T, F, Fut>(&self, items: Vec<I>, task: F) -> Vec<T>
    where
        F: Fn(usize, I) -> Fut,
        Fut: Future<Output = T>,
    {
        let active = self.workers.min(items.len());
        let queue = Mutex::new(items.into_iter().enumerate().collect::<VecDeque<_>>());
        let queue = &queue;
        let task = &task;

        let workers = (0..active).map(|worker| async move {
            let mut done = Vec::new();
            loop {
                let next = queue.lock().await.pop_front();
                let Some((index, item)) = next else {
                    break;
                };
                debug!("Worker {} took item {}", worker, index);
                done.push((index, task(worker, item).await));
            }
            done
        });

        let mut results: Vec<(usize, T)> = join_all(workers).await.into_iter().flatten().collect();
        results.sort_by_key(|(index, _)| *index);
        results.into_iter().map(|(_, value)| value).collect()
    }
}
