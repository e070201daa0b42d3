// src/reminders.rs - One-shot reminder scheduling
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::{NotasError, ReminderRequest, Result};

/// Receives reminders as they come due
pub type ReminderSink = Arc<dyn Fn(&ReminderRequest) + Send + Sync>;

/// Schedules and cancels one-shot alerts keyed by note id.
///
/// Both calls are best effort: callers log failures and carry on.
pub trait ReminderScheduler: Send + Sync {
    /// Arms an alert at `request.fire_at`, replacing any alert pending for the
    /// same note. Does nothing when the time is not strictly in the future.
    fn schedule(&self, request: &ReminderRequest) -> Result<()>;

    /// Drops the pending alert for `note_id`, if there is one
    fn cancel(&self, note_id: &str) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct ReminderSchedulerStatus {
    /// Whether the scheduler still accepts reminders
    pub is_running: bool,
    /// Number of alerts waiting to fire
    pub pending: usize,
    /// When the last reminder was delivered
    pub last_delivery_time: Option<DateTime<Utc>>,
}

struct PendingAlert {
    generation: u64,
    task: JoinHandle<()>,
}

type PendingTable = Arc<Mutex<HashMap<String, PendingAlert>>>;

/// Arms one timer task per note on a tokio runtime
pub struct LocalReminderScheduler {
    /// Runtime the timer tasks are spawned on
    runtime: Handle,

    /// Alerts waiting to fire, by note id
    pending: PendingTable,

    /// Distinguishes a replaced alert from its replacement
    next_generation: AtomicU64,

    last_delivery_time: Arc<Mutex<Option<DateTime<Utc>>>>,

    stopped: AtomicBool,

    sink: ReminderSink,
}

impl LocalReminderScheduler {
    /// Creates a scheduler bound to the current tokio runtime
    pub fn new(sink: ReminderSink) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|e| {
            error!("Reminder scheduler needs a tokio runtime: {}", e);
            NotasError::SchedulerError {
                message: format!("No tokio runtime available: {}", e),
            }
        })?;
        Ok(Self::with_handle(runtime, sink))
    }

    pub fn with_handle(runtime: Handle, sink: ReminderSink) -> Self {
        info!("Initializing local reminder scheduler");
        Self {
            runtime,
            pending: Arc::new(Mutex::new(HashMap::new())),
            next_generation: AtomicU64::new(0),
            last_delivery_time: Arc::new(Mutex::new(None)),
            stopped: AtomicBool::new(false),
            sink,
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().map(|pending| pending.len()).unwrap_or(0)
    }

    pub fn is_pending(&self, note_id: &str) -> bool {
        self.pending
            .lock()
            .map(|pending| pending.contains_key(note_id))
            .unwrap_or(false)
    }

    /// Get the current status of the scheduler
    pub fn get_status(&self) -> ReminderSchedulerStatus {
        ReminderSchedulerStatus {
            is_running: !self.stopped.load(Ordering::SeqCst),
            pending: self.pending_count(),
            last_delivery_time: self.last_delivery_time.lock().ok().and_then(|last| *last),
        }
    }

    /// Aborts every pending alert and refuses new ones
    pub fn stop(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            debug!("Reminder scheduler is not running");
            return;
        }

        match self.pending.lock() {
            Ok(mut pending) => {
                let count = pending.len();
                for (_, alert) in pending.drain() {
                    alert.task.abort();
                }
                info!("Reminder scheduler stopped, {} pending alert(s) dropped", count);
            }
            Err(e) => error!("Failed to acquire lock on pending reminders: {}", e),
        }
    }

    fn lock_pending(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, PendingAlert>>> {
        self.pending.lock().map_err(|_| NotasError::SchedulerError {
            message: "Failed to acquire lock on pending reminders".to_string(),
        })
    }
}

impl ReminderScheduler for LocalReminderScheduler {
    fn schedule(&self, request: &ReminderRequest) -> Result<()> {
        if self.stopped.load(Ordering::SeqCst) {
            return Err(NotasError::SchedulerError {
                message: "Reminder scheduler is stopped".to_string(),
            });
        }

        let now = Utc::now();
        if request.fire_at <= now {
            debug!(
                "Not scheduling reminder for note {}: {} is not in the future",
                request.note_id, request.fire_at
            );
            return Ok(());
        }

        let delay = (request.fire_at - now)
            .to_std()
            .map_err(|e| NotasError::SchedulerError {
                message: format!("Invalid reminder delay: {}", e),
            })?;

        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst);
        let pending = Arc::clone(&self.pending);
        let last_delivery_time = Arc::clone(&self.last_delivery_time);
        let sink = Arc::clone(&self.sink);
        let alert = request.clone();

        let mut table = self.lock_pending()?;

        let task = self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;

            match pending.lock() {
                Ok(mut table) => {
                    if table
                        .get(&alert.note_id)
                        .is_some_and(|entry| entry.generation == generation)
                    {
                        table.remove(&alert.note_id);
                    }
                }
                Err(e) => warn!("Failed to clear delivered reminder {}: {}", alert.note_id, e),
            }

            info!("Reminder due for note {}: {}", alert.note_id, alert.title);
            if let Ok(mut last) = last_delivery_time.lock() {
                *last = Some(Utc::now());
            }
            (*sink)(&alert);
        });

        if let Some(previous) = table.insert(request.note_id.clone(), PendingAlert { generation, task }) {
            debug!("Replacing pending reminder for note {}", request.note_id);
            previous.task.abort();
        }

        info!(
            "Scheduled reminder for note {} at {}",
            request.note_id, request.fire_at
        );
        Ok(())
    }

    fn cancel(&self, note_id: &str) -> Result<()> {
        match self.lock_pending()?.remove(note_id) {
            Some(alert) => {
                alert.task.abort();
                info!("Cancelled reminder for note {}", note_id);
            }
            None => debug!("No pending reminder to cancel for note {}", note_id),
        }
        Ok(())
    }
}

impl Drop for LocalReminderScheduler {
    fn drop(&mut self) {
        if let Ok(mut pending) = self.pending.lock() {
            for (_, alert) in pending.drain() {
                alert.task.abort();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration as StdDuration;

    use chrono::Duration;

    use super::*;

    fn request(note_id: &str, in_future: Duration) -> ReminderRequest {
        ReminderRequest {
            note_id: note_id.to_string(),
            fire_at: Utc::now() + in_future,
            title: format!("title {}", note_id),
            body: "body".to_string(),
        }
    }

    fn recording_scheduler() -> (LocalReminderScheduler, Arc<Mutex<Vec<String>>>) {
        let delivered = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&delivered);
        let scheduler = LocalReminderScheduler::new(Arc::new(move |r: &ReminderRequest| {
            log.lock().unwrap().push(r.note_id.clone());
        }))
        .unwrap();
        (scheduler, delivered)
    }

    #[tokio::test(start_paused = true)]
    async fn due_reminder_reaches_the_sink() {
        let (scheduler, delivered) = recording_scheduler();

        scheduler.schedule(&request("a", Duration::minutes(5))).unwrap();
        assert!(scheduler.is_pending("a"));

        tokio::time::sleep(StdDuration::from_secs(301)).await;
        tokio::task::yield_now().await;

        assert_eq!(*delivered.lock().unwrap(), vec!["a".to_string()]);
        assert_eq!(scheduler.pending_count(), 0);
        assert!(scheduler.get_status().last_delivery_time.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_reminder_never_fires() {
        let (scheduler, delivered) = recording_scheduler();

        scheduler.schedule(&request("a", Duration::minutes(5))).unwrap();
        scheduler.cancel("a").unwrap();
        scheduler.cancel("a").unwrap();

        tokio::time::sleep(StdDuration::from_secs(600)).await;

        assert!(delivered.lock().unwrap().is_empty());
        assert_eq!(scheduler.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn rescheduling_replaces_the_pending_alert() {
        let (scheduler, delivered) = recording_scheduler();

        scheduler.schedule(&request("a", Duration::minutes(5))).unwrap();
        scheduler.schedule(&request("a", Duration::minutes(20))).unwrap();
        assert_eq!(scheduler.pending_count(), 1);

        tokio::time::sleep(StdDuration::from_secs(600)).await;
        assert!(delivered.lock().unwrap().is_empty());

        tokio::time::sleep(StdDuration::from_secs(700)).await;
        tokio::task::yield_now().await;
        assert_eq!(delivered.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn past_reminders_are_ignored() {
        let (scheduler, _) = recording_scheduler();

        scheduler.schedule(&request("a", Duration::minutes(-5))).unwrap();
        assert_eq!(scheduler.pending_count(), 0);
    }

    #[tokio::test]
    async fn stopped_scheduler_rejects_new_reminders() {
        let (scheduler, _) = recording_scheduler();
        scheduler.schedule(&request("a", Duration::hours(1))).unwrap();

        scheduler.stop();

        assert_eq!(scheduler.pending_count(), 0);
        assert!(!scheduler.get_status().is_running);
        assert!(matches!(
            scheduler.schedule(&request("b", Duration::hours(1))),
            Err(NotasError::SchedulerError { .. })
        ));
    }

    #[test]
    fn construction_outside_a_runtime_fails() {
        let result = LocalReminderScheduler::new(Arc::new(|_: &ReminderRequest| {}));
        assert!(matches!(result, Err(NotasError::SchedulerError { .. })));
    }
}
