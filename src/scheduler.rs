//! ==============================================================================
//! scheduler.rs - repeating timers behind an injectable interface
//! ==============================================================================
//!
//! purpose:
//!     the polling session never calls the platform timer directly. it asks
//!     a `Scheduler` to run a task every `period` and keeps the returned
//!     `TimerHandle`. dropping or cancelling the handle stops the timer.
//!
//! implementations:
//!     - TokioScheduler: a spawned task driven by `tokio::time::interval`
//!       (works with `tokio::time::pause` in tests)
//!     - ManualScheduler: fires only when told to; lets tests count timers
//!       and trigger ticks without any clock at all
//!
//! ==============================================================================

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};

/// work run on every tick; must not block
pub type Task = Arc<dyn Fn() + Send + Sync>;

pub trait Scheduler: Send + Sync {
    /// run `task` every `period`, first tick one `period` from now
    fn every(&self, period: Duration, task: Task) -> TimerHandle;
}

/// cancellation handle for a repeating timer
///
/// the timer is cancelled on `cancel()` or when the handle is dropped.
pub struct TimerHandle {
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl TimerHandle {
    pub fn new<F>(cancel: F) -> Self
    where
        F: FnOnce() + Send + Sync + 'static,
    {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn cancel(mut self) {
        self.cancel_now();
    }

    fn cancel_now(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.cancel_now();
    }
}

// ==============================================================================
// tokio
// ==============================================================================

/// repeating timers on the ambient tokio runtime
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioScheduler;

impl Scheduler for TokioScheduler {
    fn every(&self, period: Duration, task: Task) -> TimerHandle {
        let join = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            // a slow tick pushes the next one back instead of bursting
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                task();
            }
        });
        TimerHandle::new(move || join.abort())
    }
}

// ==============================================================================
// manual
// ==============================================================================

struct ManualTimer {
    period: Duration,
    task: Task,
    cancelled: Arc<AtomicBool>,
}

/// a scheduler that only ticks when `fire()` is called
#[derive(Clone, Default)]
pub struct ManualScheduler {
    timers: Arc<Mutex<Vec<ManualTimer>>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// number of timers armed and not yet cancelled
    pub fn active_timers(&self) -> usize {
        self.timers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|timer| !timer.cancelled.load(Ordering::SeqCst))
            .count()
    }

    /// periods of the active timers, in arming order
    pub fn periods(&self) -> Vec<Duration> {
        self.timers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|timer| !timer.cancelled.load(Ordering::SeqCst))
            .map(|timer| timer.period)
            .collect()
    }

    /// tick every active timer once
    pub fn fire(&self) {
        let tasks: Vec<Task> = {
            let mut timers = self.timers.lock().unwrap_or_else(PoisonError::into_inner);
            timers.retain(|timer| !timer.cancelled.load(Ordering::SeqCst));
            timers.iter().map(|timer| timer.task.clone()).collect()
        };
        for task in tasks {
            task();
        }
    }
}

impl Scheduler for ManualScheduler {
    fn every(&self, period: Duration, task: Task) -> TimerHandle {
        let cancelled = Arc::new(AtomicBool::new(false));
        self.timers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(ManualTimer {
                period,
                task,
                cancelled: cancelled.clone(),
            });
        TimerHandle::new(move || cancelled.store(true, Ordering::SeqCst))
    }
}
