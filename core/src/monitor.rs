//! Background status feed and the start/stop discipline around it.
//!
//! The feed prints to the same display as the REPL, so anything that writes
//! foreground output (editor mode, evaluations) suspends it first and resumes
//! it afterwards. [`MonitorLifecycle`] keeps the single live handle for a
//! session and remembers whether monitoring is wanted at all, so a handle
//! stopped by `.editor` is brought back by the next `.done` or `.cancel`.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::warn;

use crate::capability::StatusSource;
use crate::display::Display;
use crate::session::ProcessId;

/// Starts background feeds for a process.
pub trait StatusFeed: Send + Sync {
    fn start(&self, process_id: &ProcessId) -> Box<dyn MonitorHandle>;
}

/// A running feed. Stopping consumes the handle.
pub trait MonitorHandle: Send {
    fn stop(self: Box<Self>);
}

pub struct MonitorLifecycle {
    process_id: ProcessId,
    feed: Option<Arc<dyn StatusFeed>>,
    enabled: bool,
    handle: Option<Box<dyn MonitorHandle>>,
}

impl MonitorLifecycle {
    pub fn new(feed: Arc<dyn StatusFeed>, process_id: ProcessId) -> Self {
        Self {
            process_id,
            feed: Some(feed),
            enabled: false,
            handle: None,
        }
    }

    /// A lifecycle with no feed behind it; every operation is a no-op.
    pub fn disabled(process_id: ProcessId) -> Self {
        Self {
            process_id,
            feed: None,
            enabled: false,
            handle: None,
        }
    }

    /// Turns monitoring on for the session and starts the first handle.
    pub fn launch(&mut self) {
        if self.feed.is_none() {
            return;
        }
        self.enabled = true;
        self.resume();
    }

    /// Stops the live handle, if any, without turning monitoring off.
    pub fn suspend(&mut self) {
        if let Some(handle) = self.handle.take() {
            debug!(process = %self.process_id, "suspending live feed");
            handle.stop();
        }
    }

    /// Starts a fresh handle when monitoring is on and nothing is running.
    pub fn resume(&mut self) {
        if !self.enabled || self.handle.is_some() {
            return;
        }
        if let Some(feed) = &self.feed {
            debug!(process = %self.process_id, "starting live feed");
            self.handle = Some(feed.start(&self.process_id));
        }
    }

    /// Stops the live handle for good.
    pub fn shutdown(&mut self) {
        self.suspend();
        self.enabled = false;
    }

    pub fn is_live(&self) -> bool {
        self.handle.is_some()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl Drop for MonitorLifecycle {
    fn drop(&mut self) {
        self.suspend();
    }
}

/// Polls a [`StatusSource`] on a fixed cadence and prints every new entry.
pub struct LiveFeed {
    source: Arc<dyn StatusSource>,
    display: Arc<dyn Display>,
    interval: Duration,
    cursor: Arc<Mutex<Option<String>>>,
}

impl LiveFeed {
    pub fn new(
        source: Arc<dyn StatusSource>,
        display: Arc<dyn Display>,
        interval: Duration,
    ) -> Self {
        Self {
            source,
            display,
            interval,
            cursor: Arc::new(Mutex::new(None)),
        }
    }
}

impl StatusFeed for LiveFeed {
    fn start(&self, process_id: &ProcessId) -> Box<dyn MonitorHandle> {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("no async runtime available; live feed disabled");
            return Box::new(FeedTask::inert());
        };

        let token = CancellationToken::new();
        let writing = Arc::new(Mutex::new(()));
        let poller = FeedPoller {
            process_id: process_id.clone(),
            source: Arc::clone(&self.source),
            display: Arc::clone(&self.display),
            interval: self.interval.max(Duration::from_millis(1)),
            cursor: Arc::clone(&self.cursor),
            token: token.clone(),
            writing: Arc::clone(&writing),
        };
        let join = runtime.spawn(poller.run());
        Box::new(FeedTask {
            token,
            writing,
            join: Some(join),
        })
    }
}

struct FeedPoller {
    process_id: ProcessId,
    source: Arc<dyn StatusSource>,
    display: Arc<dyn Display>,
    interval: Duration,
    cursor: Arc<Mutex<Option<String>>>,
    token: CancellationToken,
    /// Held for each write to the display; `stop` takes it after cancelling
    /// so no entry is printed once it returns.
    writing: Arc<Mutex<()>>,
}

impl FeedPoller {
    async fn run(self) {
        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = self.token.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let cursor = self
                .cursor
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone();
            let polled = tokio::select! {
                _ = self.token.cancelled() => break,
                polled = self.source.poll(&self.process_id, cursor.as_deref()) => polled,
            };

            match polled {
                Ok(batch) => {
                    if !self.show(&batch.entries) {
                        break;
                    }
                    if let Some(next) = batch.cursor {
                        *self.cursor.lock().unwrap_or_else(PoisonError::into_inner) = Some(next);
                    }
                }
                Err(err) => {
                    warn!(process = %self.process_id, "live feed poll failed: {err}");
                }
            }
        }
    }

    /// Prints `entries` until the feed is cancelled. Returns false if it was
    /// cancelled part way, in which case the cursor must not advance.
    fn show(&self, entries: &[String]) -> bool {
        for entry in entries.iter().filter(|e| !e.trim().is_empty()) {
            let _writing = self.writing.lock().unwrap_or_else(PoisonError::into_inner);
            if self.token.is_cancelled() {
                debug!(process = %self.process_id, "live feed stopped mid-batch");
                return false;
            }
            self.display.status(entry);
        }
        !self.token.is_cancelled()
    }
}

struct FeedTask {
    token: CancellationToken,
    writing: Arc<Mutex<()>>,
    join: Option<JoinHandle<()>>,
}

impl FeedTask {
    fn inert() -> Self {
        Self {
            token: CancellationToken::new(),
            writing: Arc::new(Mutex::new(())),
            join: None,
        }
    }
}

impl MonitorHandle for FeedTask {
    /// Returns only once the poller can no longer write to the display.
    fn stop(self: Box<Self>) {
        self.token.cancel();
        drop(self.writing.lock().unwrap_or_else(PoisonError::into_inner));
        if let Some(join) = self.join {
            join.abort();
        }
    }
}
