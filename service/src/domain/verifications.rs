//! Intermediate verification countdowns of two-stage routing, keyed by an
//! opaque verification id.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, TimeDelta, Utc};
use marquee_common::article::Article;
use marquee_common::countdown::Paced;
use marquee_common::verification::Verification;
use marquee_common::{ArticleId, ArticleTitle, TargetUrl};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VerificationId(Uuid);

impl fmt::Display for VerificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for VerificationId {
    type Err = uuid::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(value).map(Self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationSnapshot {
    pub id: VerificationId,
    pub article_id: ArticleId,
    pub title: ArticleTitle,
    pub remaining: u32,
    pub total: u32,
    pub progress: u8,
    pub next_tick_at: Option<DateTime<Utc>>,
    /// Present only once the countdown has fully elapsed.
    pub target_url: Option<TargetUrl>,
}

struct Entry {
    verification: Paced<Verification>,
    last_seen: DateTime<Utc>,
}

#[derive(Clone)]
pub struct Verifications {
    entries: Arc<Mutex<HashMap<VerificationId, Entry>>>,
    ttl: TimeDelta,
}

impl Verifications {
    pub fn new(ttl: TimeDelta) -> Self {
        Self {
            entries: Arc::default(),
            ttl,
        }
    }

    /// Start a countdown for the article; `None` when it did not resolve.
    pub fn open(&self, article: Option<&Article>, now: DateTime<Utc>) -> Option<VerificationSnapshot> {
        let verification = Verification::open(article);
        verification.pending()?;

        let id = VerificationId(Uuid::new_v4());
        let entry = Entry {
            verification: Paced::start(verification, now),
            last_seen: now,
        };
        let snapshot = snapshot(id, &entry);

        let mut entries = self.lock();
        let ttl = self.ttl;
        entries.retain(|_, entry| entry.last_seen + ttl > now);
        entries.insert(id, entry);
        snapshot
    }

    pub fn get(&self, id: VerificationId, now: DateTime<Utc>) -> Option<VerificationSnapshot> {
        let mut entries = self.lock();
        let entry = entries.get_mut(&id)?;
        entry.verification.advance_to(now);
        entry.last_seen = now;
        snapshot(id, entry)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<VerificationId, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn snapshot(id: VerificationId, entry: &Entry) -> Option<VerificationSnapshot> {
    let verification = entry.verification.get();
    let pending = verification.pending()?;
    let countdown = pending.countdown();
    Some(VerificationSnapshot {
        id,
        article_id: pending.article_id().clone(),
        title: pending.title().clone(),
        remaining: countdown.remaining(),
        total: countdown.total(),
        progress: countdown.progress(),
        next_tick_at: entry.verification.next_tick_at(),
        target_url: verification.final_action().cloned(),
    })
}
