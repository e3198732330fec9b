//! Silent refresh heartbeats: one per auto-refreshing funnel view, plus the
//! site-wide one the admin can switch on.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

pub const REFRESH_INTERVAL_SECS: u64 = 15;
pub const SITE_REFRESH_INTERVAL_SECS: u64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshEvent {
    pub sequence: u64,
}

/// Periodic refresh signal owned by exactly one view. Dropping the beacon
/// stops the timer and closes every subscription.
#[derive(Debug)]
pub struct RefreshBeacon {
    sender: broadcast::Sender<RefreshEvent>,
    task: JoinHandle<()>,
}

impl RefreshBeacon {
    /// Must be called from within a tokio runtime.
    pub fn spawn(period: Duration) -> Self {
        let (sender, _) = broadcast::channel(4);
        let tx = sender.clone();
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut sequence = 0;
            loop {
                interval.tick().await;
                sequence += 1;
                // nobody listening is fine, the next subscriber picks up later events
                let _ = tx.send(RefreshEvent { sequence });
            }
        });
        Self { sender, task }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RefreshEvent> {
        self.sender.subscribe()
    }
}

impl Drop for RefreshBeacon {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Site-wide silent refresh. The beacon runs only while enabled and while
/// somebody asked to listen; disabling drops it and ends every feed.
#[derive(Debug)]
pub struct SiteRefresh {
    period: Duration,
    beacon: Mutex<Option<RefreshBeacon>>,
}

impl SiteRefresh {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            beacon: Mutex::new(None),
        }
    }

    /// Feed of the site beacon, started on first use. Must be called from
    /// within a tokio runtime.
    pub fn subscribe(&self, enabled: bool) -> Option<broadcast::Receiver<RefreshEvent>> {
        let mut beacon = self.beacon.lock().unwrap_or_else(PoisonError::into_inner);
        if !enabled {
            *beacon = None;
            return None;
        }
        let beacon = beacon.get_or_insert_with(|| {
            tracing::info!(period = ?self.period, "site refresh started");
            RefreshBeacon::spawn(self.period)
        });
        Some(beacon.subscribe())
    }

    pub fn stop(&self) {
        let stopped = self
            .beacon
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if stopped.is_some() {
            tracing::info!("site refresh stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.beacon
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}
