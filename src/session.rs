//! ==============================================================================
//! session.rs - sensor polling session
//! ==============================================================================
//!
//! purpose:
//!     keeps one always-current `SensorSnapshot` for the dashboard. fetches
//!     immediately on start, then every `interval` (60s by default), and
//!     tracks loading / error state alongside the snapshot.
//!
//! rules:
//!     - at most one fetch in flight. a fetch requested while one is
//!       outstanding is skipped, not queued.
//!     - a failed fetch keeps the previous snapshot and sets `last_error`.
//!       the error is cleared when the next attempt starts.
//!     - the polling path never returns an error to the caller. history
//!       requests do, because each one has its own error display.
//!     - `stop()` cancels the timer only. a fetch already in flight still
//!       lands.
//!
//! relationships:
//!     - uses: store.rs (any `SensorStore`), scheduler.rs (repeating timer)
//!     - used by: server.rs (json api), main.rs (lifecycle)
//!
//! ==============================================================================

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::domain::{SensorHistoryEntry, SensorSnapshot};
use crate::error::{Result, StoreError};
use crate::scheduler::{Scheduler, TimerHandle, TokioScheduler};
use crate::store::SensorStore;

/// refresh cadence of the dashboard
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(60);

const FETCH_FAILED_MESSAGE: &str = "Unable to load sensor data";

// ==============================================================================
// public state
// ==============================================================================

/// why the most recent fetch failed
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorInfo {
    /// what the dashboard banner shows
    pub message: String,
    /// the underlying store error
    pub detail: String,
    pub occurred_at: DateTime<Utc>,
}

impl ErrorInfo {
    fn from_store_error(err: &StoreError) -> Self {
        Self {
            message: FETCH_FAILED_MESSAGE.to_string(),
            detail: err.to_string(),
            occurred_at: Utc::now(),
        }
    }
}

/// everything the dashboard renders from the session
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub snapshot: SensorSnapshot,
    pub loading: bool,
    pub last_error: Option<ErrorInfo>,
}

/// what happened to a requested fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchOutcome {
    /// a new snapshot was published
    Applied,
    /// the store failed; the previous snapshot is kept
    Failed,
    /// another fetch was already in flight
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    pub interval: Duration,
    /// upper bound for one bulk fetch; expiry counts as a failed fetch
    pub timeout: Option<Duration>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            interval: DEFAULT_REFRESH_INTERVAL,
            timeout: None,
        }
    }
}

// ==============================================================================
// fetch machinery (shared with the timer task)
// ==============================================================================

struct Shared {
    store: Arc<dyn SensorStore>,
    view: watch::Sender<SessionView>,
    in_flight: AtomicBool,
    timeout: Option<Duration>,
}

/// the claimed in-flight slot
///
/// `in_flight` is always cleared inside the same view update that publishes
/// `loading = false`, so a subscriber that sees the load end can start the
/// next one. dropping an unfinished guard (the fetch future was dropped
/// midway) releases the slot the same way.
struct InFlight<'a> {
    shared: &'a Shared,
    released: bool,
}

impl InFlight<'_> {
    /// publish the fetch result and free the slot in one view update
    fn finish(mut self, update: impl FnOnce(&mut SessionView)) {
        let shared = self.shared;
        self.released = true;
        shared.view.send_modify(|view| {
            update(view);
            view.loading = false;
            shared.in_flight.store(false, Ordering::SeqCst);
        });
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        let shared = self.shared;
        shared.view.send_if_modified(|view| {
            shared.in_flight.store(false, Ordering::SeqCst);
            std::mem::replace(&mut view.loading, false)
        });
    }
}

impl Shared {
    fn try_begin(&self) -> Option<InFlight<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()?;
        self.view.send_modify(|view| {
            view.loading = true;
            view.last_error = None;
        });
        Some(InFlight {
            shared: self,
            released: false,
        })
    }

    async fn fetch(&self) -> FetchOutcome {
        let Some(in_flight) = self.try_begin() else {
            debug!("sensor refresh skipped, previous fetch still in flight");
            return FetchOutcome::Skipped;
        };

        let result = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.store.all_readings())
                .await
                .unwrap_or(Err(StoreError::Timeout(limit))),
            None => self.store.all_readings().await,
        };

        match result {
            Ok(readings) => {
                let snapshot = SensorSnapshot::from_readings(readings);
                debug!(
                    complete = snapshot.is_complete(),
                    "sensor snapshot refreshed"
                );
                in_flight.finish(|view| view.snapshot = snapshot);
                FetchOutcome::Applied
            }
            Err(err) => {
                warn!(error = %err, "sensor refresh failed, keeping previous snapshot");
                let error = ErrorInfo::from_store_error(&err);
                in_flight.finish(|view| view.last_error = Some(error));
                FetchOutcome::Failed
            }
        }
    }

    fn spawn_fetch(self: &Arc<Self>) {
        let shared = self.clone();
        tokio::spawn(async move {
            shared.fetch().await;
        });
    }
}

// ==============================================================================
// session
// ==============================================================================

pub struct PollingSession {
    shared: Arc<Shared>,
    scheduler: Arc<dyn Scheduler>,
    interval: Duration,
    timer: Mutex<Option<TimerHandle>>,
}

impl PollingSession {
    pub fn new(
        store: Arc<dyn SensorStore>,
        scheduler: Arc<dyn Scheduler>,
        options: SessionOptions,
    ) -> Self {
        let (view, _) = watch::channel(SessionView::default());
        Self {
            shared: Arc::new(Shared {
                store,
                view,
                in_flight: AtomicBool::new(false),
                timeout: options.timeout,
            }),
            scheduler,
            interval: options.interval,
            timer: Mutex::new(None),
        }
    }

    /// a session driven by the tokio timer
    pub fn with_tokio(store: Arc<dyn SensorStore>, options: SessionOptions) -> Self {
        Self::new(store, Arc::new(TokioScheduler), options)
    }

    /// fetch now, then every interval. a second call is a no-op.
    ///
    /// must be called from within a tokio runtime.
    pub fn start(&self) {
        let mut timer = self.timer.lock().unwrap_or_else(PoisonError::into_inner);
        if timer.is_some() {
            debug!("polling session already started");
            return;
        }

        self.shared.spawn_fetch();
        let shared = self.shared.clone();
        *timer = Some(
            self.scheduler
                .every(self.interval, Arc::new(move || shared.spawn_fetch())),
        );
        info!(interval_secs = self.interval.as_secs(), "polling session started");
    }

    /// cancel the timer; safe to call when not started
    pub fn stop(&self) {
        let handle = self
            .timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.cancel();
            info!("polling session stopped");
        }
    }

    pub fn is_started(&self) -> bool {
        self.timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// out-of-band fetch, subject to the same in-flight guard as the timer
    pub async fn refresh_now(&self) -> FetchOutcome {
        self.shared.fetch().await
    }

    /// latest completed snapshot; all `None` before the first success
    pub fn snapshot(&self) -> SensorSnapshot {
        self.shared.view.borrow().snapshot.clone()
    }

    /// true exactly while a fetch is outstanding
    pub fn is_loading(&self) -> bool {
        self.shared.view.borrow().loading
    }

    pub fn last_error(&self) -> Option<ErrorInfo> {
        self.shared.view.borrow().last_error.clone()
    }

    pub fn view(&self) -> SessionView {
        self.shared.view.borrow().clone()
    }

    /// change notifications for snapshot, loading and error state
    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.shared.view.subscribe()
    }

    /// most-recent-first history for one sensor, straight from the store
    ///
    /// failures are returned to the caller and never touch `last_error`.
    pub async fn history(&self, sensor_id: &str, limit: usize) -> Result<Vec<SensorHistoryEntry>> {
        self.shared.store.history(sensor_id, limit).await
    }

    pub fn store(&self) -> Arc<dyn SensorStore> {
        self.shared.store.clone()
    }
}
