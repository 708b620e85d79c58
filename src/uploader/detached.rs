// SPDX-License-Identifier: GPL-3.0-only

//! Fire-and-forget task spawning with in-flight accounting
//!
//! Upload tasks are never awaited by whoever spawns them. The only thing kept
//! is a counter, so `snap` and the tests can wait until everything that was
//! dispatched has finished.

use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use tokio::sync::Notify;
use tracing::warn;

#[derive(Debug, Default)]
struct Shared {
    in_flight: AtomicUsize,
    spawned: AtomicU64,
    idle: Notify,
}

/// Spawner for detached tasks
#[derive(Debug, Clone, Default)]
pub struct DetachedTasks {
    shared: Arc<Shared>,
}

/// Decrements the in-flight counter however the task ends
struct InFlightGuard {
    shared: Arc<Shared>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if self.shared.in_flight.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.shared.idle.notify_waiters();
        }
    }
}

impl DetachedTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `fut` on the current runtime without keeping its handle
    ///
    /// A panic inside the task is logged and otherwise ignored.
    pub fn spawn<F>(&self, name: &'static str, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.shared.in_flight.fetch_add(1, Ordering::AcqRel);
        self.shared.spawned.fetch_add(1, Ordering::Relaxed);
        let guard = InFlightGuard {
            shared: Arc::clone(&self.shared),
        };

        tokio::spawn(async move {
            let _guard = guard;
            if AssertUnwindSafe(fut).catch_unwind().await.is_err() {
                warn!(task = name, "Detached task panicked");
            }
        });
    }

    /// Tasks spawned but not yet finished
    pub fn in_flight(&self) -> usize {
        self.shared.in_flight.load(Ordering::Acquire)
    }

    /// Total number of tasks ever spawned
    pub fn spawned(&self) -> u64 {
        self.shared.spawned.load(Ordering::Relaxed)
    }

    /// Wait until no task is in flight
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.shared.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.in_flight() == 0 {
                return;
            }
            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_wait_idle_without_tasks() {
        let tasks = DetachedTasks::new();
        tasks.wait_idle().await;
        assert_eq!(tasks.spawned(), 0);
    }

    #[tokio::test]
    async fn test_wait_idle_waits_for_all_tasks() {
        let tasks = DetachedTasks::new();
        let done = Arc::new(AtomicUsize::new(0));

        for delay in [30u64, 10, 20] {
            let done = Arc::clone(&done);
            tasks.spawn("sleep", async move {
                tokio::time::sleep(Duration::from_millis(delay)).await;
                done.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert_eq!(tasks.spawned(), 3);

        tasks.wait_idle().await;
        assert_eq!(done.load(Ordering::SeqCst), 3);
        assert_eq!(tasks.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_panicking_task_is_accounted() {
        let tasks = DetachedTasks::new();
        tasks.spawn("boom", async { panic!("boom") });
        tasks.wait_idle().await;
        assert_eq!(tasks.in_flight(), 0);
    }
}
