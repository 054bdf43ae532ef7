//! Keyed debouncing of configuration-change handlers.
//!
//! Editors and file watchers report configuration changes while the user is
//! still typing. Each key gets an independent timer that resets on every new
//! event; only the last event in a burst runs its task.
//!
//! ```text
//! change event
//!       │
//!       ▼
//! schedule(key, task)
//!       │
//!       ├─► Abort pending timer for key (if any)
//!       │
//!       └─► Spawn new timer task
//!               │
//!               ├─► Wait quiet window (5s default)
//!               │
//!               └─► Run task
//! ```

use std::future::Future;
use std::hash::Hash;
use std::time::Duration;

use dashmap::DashMap;
use tokio::task::AbortHandle;

/// Default quiet window before a configuration change is acted on.
pub const DEFAULT_DEBOUNCE_WINDOW: Duration = Duration::from_secs(5);

const LOG_TARGET: &str = "pkl_lsp_launcher::debounce";

/// Per-key cancellable delayed tasks.
pub struct Debouncer<K: Eq + Hash> {
    /// The AbortHandle allows cancelling the timer when a new event arrives.
    active_timers: DashMap<K, AbortHandle>,

    /// Time to wait after the last event before running the task.
    window: Duration,
}

impl<K> Default for Debouncer<K>
where
    K: Eq + Hash + Clone + std::fmt::Debug + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K> Debouncer<K>
where
    K: Eq + Hash + Clone + std::fmt::Debug + Send + Sync + 'static,
{
    /// Create a debouncer with the default quiet window.
    pub fn new() -> Self {
        Self::with_window(DEFAULT_DEBOUNCE_WINDOW)
    }

    /// Create a debouncer with a custom quiet window.
    pub fn with_window(window: Duration) -> Self {
        Self {
            active_timers: DashMap::new(),
            window,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Run `task` once `key` has been quiet for the window.
    ///
    /// A pending task for the same key is cancelled; its captured state is
    /// discarded in favour of this one.
    pub fn schedule<F>(&self, key: K, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        const CLEANUP_THRESHOLD: usize = 32;
        if self.active_timers.len() > CLEANUP_THRESHOLD {
            self.active_timers.retain(|_, handle| !handle.is_finished());
        }

        if let Some((_, prev_handle)) = self.active_timers.remove(&key) {
            prev_handle.abort();
            log::trace!(
                target: LOG_TARGET,
                "Cancelled pending handler for {:?}",
                key
            );
        }

        let window = self.window;
        let key_for_log = key.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(window).await;
            log::debug!(
                target: LOG_TARGET,
                "Quiet window elapsed for {:?}, running handler",
                key_for_log
            );
            task.await;
        });

        self.active_timers.insert(key, handle.abort_handle());
    }

    /// Cancel the pending task for `key`, if any.
    pub fn cancel(&self, key: &K) {
        if let Some((_, handle)) = self.active_timers.remove(key) {
            handle.abort();
        }
    }

    /// Cancel every pending task.
    pub fn cancel_all(&self) {
        for entry in self.active_timers.iter() {
            entry.value().abort();
        }
        self.active_timers.clear();
    }

    /// Whether a task for `key` is waiting for its window to elapse.
    pub fn is_pending(&self, key: &K) -> bool {
        self.active_timers
            .get(key)
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl<K: Eq + Hash> Drop for Debouncer<K> {
    fn drop(&mut self) {
        for entry in self.active_timers.iter() {
            entry.value().abort();
        }
    }
}
