use std::future::Future;
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

use tokio::task::JoinSet;

use crate::error::BotError;

/// Work that runs after the response is sent. Failures go to the log and
/// nowhere else: no retries, no delivery guarantee.
#[derive(Default)]
pub struct Background {
    tasks: Mutex<JoinSet<()>>,
    in_flight: Arc<AtomicUsize>,
}

struct TaskSlot {
    in_flight: Arc<AtomicUsize>,
}

impl Drop for TaskSlot {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Background {
    pub fn spawn<F>(&self, label: &'static str, task: F)
    where
        F: Future<Output = Result<(), BotError>> + Send + 'static,
    {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let slot = TaskSlot {
            in_flight: self.in_flight.clone(),
        };

        let wrapped = async move {
            let _slot = slot;
            if let Err(e) = task.await {
                Self::on_error(label, &e);
            }
        };

        let mut tasks = match self.tasks.lock() {
            Ok(tasks) => tasks,
            Err(poisoned) => poisoned.into_inner(),
        };
        // Finished tasks stay in the set until joined.
        while let Some(joined) = tasks.try_join_next() {
            Self::on_join(joined);
        }
        tasks.spawn(wrapped);
    }

    fn on_join(joined: Result<(), tokio::task::JoinError>) {
        if let Err(e) = joined {
            tracing::error!(error = %e, "background task panicked");
        }
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.tasks.lock().map(|tasks| tasks.len()).unwrap_or_default()
    }

    fn on_error(label: &'static str, e: &BotError) {
        tracing::error!(task = label, "background task failed");
        e.print_tree();
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Waits for everything spawned so far.
    pub async fn drain(&self) {
        let mut tasks = match self.tasks.lock() {
            Ok(mut guard) => std::mem::take(&mut *guard),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        };
        while let Some(joined) = tasks.join_next().await {
            Self::on_join(joined);
        }
    }
}
