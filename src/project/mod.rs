//! Project Persistence
//!
//! Background timeline persistence: a debounced save scheduler that
//! coalesces rapid mutations into a single write, cancels and reschedules
//! in-flight saves, and guards against stale writes after a project switch.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::CoreResult;
use crate::timeline::Timeline;
use crate::types::ProjectId;

/// Default debounce window for coalescing saves
pub const DEFAULT_SAVE_DEBOUNCE: Duration = Duration::from_millis(100);

/// Storage collaborator that flushes a timeline snapshot to disk or a
/// database. Implementations own their own retry and path policy and report
/// failures as [`CoreError::Persistence`](crate::CoreError::Persistence).
#[async_trait]
pub trait PersistenceSink: Send + Sync {
    async fn save(&self, project_id: &str, timeline: &Timeline) -> CoreResult<()>;
}

/// Debounced, cancellable save scheduler.
///
/// Each call to [`schedule`](Self::schedule) cancels any pending save and
/// arms a new one. The scheduled task captures the project identity at
/// schedule time; if the active project changed before the debounce window
/// elapsed, the save silently no-ops instead of clobbering the new
/// project's data. A failed save raises a sticky indicator that clears on
/// the next successful save; editing is never blocked.
pub struct SaveScheduler {
    sink: Arc<dyn PersistenceSink>,
    debounce: Duration,
    runtime: tokio::runtime::Handle,
    current_project: Arc<RwLock<ProjectId>>,
    pending: Mutex<Option<JoinHandle<()>>>,
    save_failed: Arc<AtomicBool>,
}

impl SaveScheduler {
    /// Creates a scheduler bound to the current tokio runtime, with the
    /// default debounce window.
    ///
    /// Must be called from within a runtime context.
    pub fn new(sink: Arc<dyn PersistenceSink>, project_id: &str) -> Self {
        Self {
            sink,
            debounce: DEFAULT_SAVE_DEBOUNCE,
            runtime: tokio::runtime::Handle::current(),
            current_project: Arc::new(RwLock::new(project_id.to_string())),
            pending: Mutex::new(None),
            save_failed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Overrides the debounce window
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Switches the owning project. Any save scheduled before the switch
    /// becomes stale and will no-op.
    pub fn set_project(&self, project_id: &str) {
        if let Ok(mut current) = self.current_project.write() {
            *current = project_id.to_string();
        }
    }

    /// Schedules a debounced background save of the given snapshot,
    /// cancelling any save already pending
    pub fn schedule(&self, timeline: Timeline) {
        let scheduled_project = match self.current_project.read() {
            Ok(current) => current.clone(),
            Err(_) => return,
        };

        let sink = self.sink.clone();
        let debounce = self.debounce;
        let current_project = self.current_project.clone();
        let save_failed = self.save_failed.clone();

        let handle = self.runtime.spawn(async move {
            tokio::time::sleep(debounce).await;

            // Stale-write guard: project identity is compared against the
            // value captured at schedule time, not at execution time.
            let still_current = current_project
                .read()
                .map(|current| *current == scheduled_project)
                .unwrap_or(false);
            if !still_current {
                debug!(project_id = %scheduled_project, "skipping stale scheduled save");
                return;
            }

            match sink.save(&scheduled_project, &timeline).await {
                Ok(()) => {
                    save_failed.store(false, Ordering::SeqCst);
                }
                Err(err) => {
                    warn!(project_id = %scheduled_project, %err, "background save failed");
                    save_failed.store(true, Ordering::SeqCst);
                }
            }
        });

        if let Ok(mut pending) = self.pending.lock() {
            if let Some(previous) = pending.replace(handle) {
                previous.abort();
            }
        }
    }

    /// True when the most recent save attempt failed. Clears automatically
    /// once a later save succeeds.
    pub fn last_save_failed(&self) -> bool {
        self.save_failed.load(Ordering::SeqCst)
    }

    /// Awaits the pending save, if any. Used by tests and at shutdown.
    pub async fn flush(&self) {
        let handle = match self.pending.lock() {
            Ok(mut pending) => pending.take(),
            Err(_) => None,
        };
        if let Some(handle) = handle {
            // A cancelled task is a legitimate outcome here.
            let _ = handle.await;
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::timeline::Canvas;
    use std::sync::atomic::AtomicUsize;

    struct CountingSink {
        saves: AtomicUsize,
        fail: AtomicBool,
        last_project: Mutex<Option<String>>,
    }

    impl CountingSink {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                saves: AtomicUsize::new(0),
                fail: AtomicBool::new(false),
                last_project: Mutex::new(None),
            })
        }
    }

    #[async_trait]
    impl PersistenceSink for CountingSink {
        async fn save(&self, project_id: &str, _timeline: &Timeline) -> CoreResult<()> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(CoreError::Persistence("disk full".to_string()));
            }
            self.saves.fetch_add(1, Ordering::SeqCst);
            *self.last_project.lock().unwrap() = Some(project_id.to_string());
            Ok(())
        }
    }

    fn timeline() -> Timeline {
        Timeline::new("Test", Canvas::default())
    }

    #[tokio::test]
    async fn test_rapid_schedules_coalesce_into_one_save() {
        let sink = CountingSink::new();
        let scheduler =
            SaveScheduler::new(sink.clone(), "p1").with_debounce(Duration::from_millis(20));

        for _ in 0..5 {
            scheduler.schedule(timeline());
        }
        tokio::time::sleep(Duration::from_millis(80)).await;
        scheduler.flush().await;

        assert_eq!(sink.saves.load(Ordering::SeqCst), 1);
        assert_eq!(
            sink.last_project.lock().unwrap().as_deref(),
            Some("p1")
        );
    }

    #[tokio::test]
    async fn test_stale_write_guard_on_project_switch() {
        let sink = CountingSink::new();
        let scheduler =
            SaveScheduler::new(sink.clone(), "p1").with_debounce(Duration::from_millis(30));

        scheduler.schedule(timeline());
        scheduler.set_project("p2");

        tokio::time::sleep(Duration::from_millis(80)).await;
        scheduler.flush().await;

        assert_eq!(sink.saves.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_default_debounce_saves_after_window() {
        let sink = CountingSink::new();
        let scheduler = SaveScheduler::new(sink.clone(), "p1");

        scheduler.schedule(timeline());
        tokio::time::sleep(DEFAULT_SAVE_DEBOUNCE + Duration::from_millis(100)).await;
        scheduler.flush().await;

        assert_eq!(sink.saves.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_save_sets_and_clears_indicator() {
        let sink = CountingSink::new();
        let scheduler =
            SaveScheduler::new(sink.clone(), "p1").with_debounce(Duration::from_millis(10));

        sink.fail.store(true, Ordering::SeqCst);
        scheduler.schedule(timeline());
        tokio::time::sleep(Duration::from_millis(50)).await;
        scheduler.flush().await;
        assert!(scheduler.last_save_failed());

        // Next mutation retries and clears the indicator.
        sink.fail.store(false, Ordering::SeqCst);
        scheduler.schedule(timeline());
        tokio::time::sleep(Duration::from_millis(50)).await;
        scheduler.flush().await;
        assert!(!scheduler.last_save_failed());
    }
}
