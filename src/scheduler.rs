//! Keyed, cancellable delayed tasks.
//!
//! Scheduling under a key replaces whatever was pending under that key, which
//! is all a debounce needs. Once a task's delay has elapsed it is detached
//! from its key: a later schedule or cancel no longer affects it.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::AbortHandle;

#[derive(Default)]
struct Pending {
    next_id: u64,
    tasks: HashMap<String, (u64, AbortHandle)>,
}

/// Delayed task runner. Cloning shares the pending set.
#[derive(Clone, Default)]
pub struct Scheduler {
    pending: Arc<Mutex<Pending>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `task` after `delay` unless rescheduled or cancelled first.
    pub fn schedule<F>(&self, key: &str, delay: Duration, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut pending = self.pending.lock();
        pending.next_id += 1;
        let id = pending.next_id;

        let shared = Arc::clone(&self.pending);
        let owned_key = key.to_string();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            {
                let mut pending = shared.lock();
                if pending.tasks.get(&owned_key).is_some_and(|(tid, _)| *tid == id) {
                    pending.tasks.remove(&owned_key);
                }
            }
            task.await;
        });

        if let Some((_, previous)) = pending
            .tasks
            .insert(key.to_string(), (id, handle.abort_handle()))
        {
            previous.abort();
        }
    }

    /// Cancel the task pending under `key`. Returns whether one was pending.
    pub fn cancel(&self, key: &str) -> bool {
        match self.pending.lock().tasks.remove(key) {
            Some((_, handle)) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    /// Cancel every pending task.
    pub fn cancel_all(&self) {
        for (_, (_, handle)) in self.pending.lock().tasks.drain() {
            handle.abort();
        }
    }

    pub fn is_pending(&self, key: &str) -> bool {
        self.pending.lock().tasks.contains_key(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter_task(counter: &Arc<AtomicUsize>) -> impl Future<Output = ()> + Send + 'static {
        let counter = Arc::clone(counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_reschedule_replaces_pending_task() {
        let scheduler = Scheduler::new();
        let runs = Arc::new(AtomicUsize::new(0));

        for _ in 0..5 {
            scheduler.schedule("m", Duration::from_millis(600), counter_task(&runs));
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        tokio::time::sleep(Duration::from_millis(700)).await;

        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(!scheduler.is_pending("m"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_run() {
        let scheduler = Scheduler::new();
        let runs = Arc::new(AtomicUsize::new(0));

        scheduler.schedule("m", Duration::from_millis(600), counter_task(&runs));
        assert!(scheduler.cancel("m"));
        tokio::time::sleep(Duration::from_millis(700)).await;

        assert_eq!(runs.load(Ordering::SeqCst), 0);
        assert!(!scheduler.cancel("m"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_keys_are_independent() {
        let scheduler = Scheduler::new();
        let runs = Arc::new(AtomicUsize::new(0));

        scheduler.schedule("a", Duration::from_millis(600), counter_task(&runs));
        scheduler.schedule("b", Duration::from_millis(600), counter_task(&runs));
        tokio::time::sleep(Duration::from_millis(700)).await;

        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }
}
