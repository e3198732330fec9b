//! Social-proof notifications shown on an article page.
//!
//! A random active notice pops up 5 s after the view opens, then on every
//! 15 s mark of the view's life, and is dismissed after 4 s on screen.

use std::time::Duration;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

pub const FIRST_NOTICE_DELAY: Duration = Duration::from_secs(5);
pub const NOTICE_INTERVAL: Duration = Duration::from_secs(15);
pub const NOTICE_VISIBLE_FOR: Duration = Duration::from_secs(4);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoticeEvent {
    Show { text: String },
    Dismiss,
}

/// Notification timers of one view. Dropping the ticker cancels them and
/// closes every subscription.
#[derive(Debug)]
pub struct SocialProofTicker {
    sender: broadcast::Sender<NoticeEvent>,
    task: JoinHandle<()>,
}

impl SocialProofTicker {
    /// `None` when there is nothing to show. Must be called from within a
    /// tokio runtime.
    pub fn spawn(notices: Vec<String>, mut rng: StdRng) -> Option<Self> {
        if notices.is_empty() {
            return None;
        }
        let (sender, _) = broadcast::channel(8);
        let tx = sender.clone();
        let task = tokio::spawn(async move {
            let opened = Instant::now();
            let mut interval = tokio::time::interval_at(opened + NOTICE_INTERVAL, NOTICE_INTERVAL);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            tokio::time::sleep_until(opened + FIRST_NOTICE_DELAY).await;
            loop {
                if let Some(text) = notices.choose(&mut rng) {
                    let _ = tx.send(NoticeEvent::Show { text: text.clone() });
                }
                tokio::time::sleep(NOTICE_VISIBLE_FOR).await;
                let _ = tx.send(NoticeEvent::Dismiss);
                interval.tick().await;
            }
        });
        Some(Self { sender, task })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<NoticeEvent> {
        self.sender.subscribe()
    }
}

impl Drop for SocialProofTicker {
    fn drop(&mut self) {
        self.task.abort();
    }
}
