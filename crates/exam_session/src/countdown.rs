//! Recurring scheduled callbacks for the grace-period countdown.
//!
//! A scheduler hands out a [`CountdownHandle`] and later delivers
//! [`CountdownTick`]s carrying that handle. Ticks for a cancelled handle may
//! still be queued; consumers compare handles and drop stale ones.

use std::{collections::HashMap, time::Duration};

use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{interval_at, Instant, MissedTickBehavior},
};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CountdownHandle(u64);

impl CountdownHandle {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountdownTick {
    pub handle: CountdownHandle,
}

pub trait CountdownScheduler: Send + Sync {
    /// First tick fires one `period` after scheduling.
    fn schedule_repeating(&mut self, period: Duration) -> CountdownHandle;
    /// No-op for unknown or already cancelled handles.
    fn cancel(&mut self, handle: CountdownHandle);
}

/// Scheduler backed by tokio tasks; ticks arrive on the receiver returned by
/// [`TokioCountdownScheduler::new`]. Must be used inside a tokio runtime.
pub struct TokioCountdownScheduler {
    ticks: mpsc::UnboundedSender<CountdownTick>,
    tasks: HashMap<CountdownHandle, JoinHandle<()>>,
    next_id: u64,
}

impl TokioCountdownScheduler {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<CountdownTick>) {
        let (ticks, rx) = mpsc::unbounded_channel();
        (
            Self {
                ticks,
                tasks: HashMap::new(),
                next_id: 0,
            },
            rx,
        )
    }

    pub fn active(&self) -> usize {
        self.tasks.values().filter(|task| !task.is_finished()).count()
    }
}

impl CountdownScheduler for TokioCountdownScheduler {
    fn schedule_repeating(&mut self, period: Duration) -> CountdownHandle {
        self.next_id += 1;
        let handle = CountdownHandle(self.next_id);
        let ticks = self.ticks.clone();
        let task = tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if ticks.send(CountdownTick { handle }).is_err() {
                    break;
                }
            }
        });
        self.tasks.insert(handle, task);
        debug!(handle = handle.0, period_ms = period.as_millis() as u64, "countdown scheduled");
        handle
    }

    fn cancel(&mut self, handle: CountdownHandle) {
        if let Some(task) = self.tasks.remove(&handle) {
            task.abort();
            debug!(handle = handle.0, "countdown cancelled");
        }
    }
}

impl Drop for TokioCountdownScheduler {
    fn drop(&mut self) {
        for (_, task) in self.tasks.drain() {
            task.abort();
        }
    }
}
