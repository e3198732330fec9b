//! Live funnel views, one per article render.
//!
//! A view owns its funnel, its refresh beacon when the article auto-refreshes
//! and its social-proof ticker when notices are configured. Removing a view
//! from the registry tears all of them down. Visitors that
//! cleared the email gate for an article are remembered per (visitor, article)
//! so re-viewing skips the gate, until they stay away past the expiry window.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use marquee_common::ArticleId;
use marquee_common::article::Article;
use marquee_common::clock::Clock;
use marquee_common::countdown::Paced;
use marquee_common::funnel::{Funnel, FunnelConfig, FunnelError, Stage};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::domain::refresh::{REFRESH_INTERVAL_SECS, RefreshBeacon, RefreshEvent};
use crate::domain::social_proof::{NoticeEvent, SocialProofTicker};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ViewId(Uuid);

/// Opaque id of one visitor session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VisitorId(Uuid);

impl ViewId {
    fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl VisitorId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for ViewId {
    type Err = uuid::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(value).map(Self)
    }
}

impl fmt::Display for VisitorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewSnapshot {
    pub view_id: ViewId,
    pub visitor: VisitorId,
    pub article_id: ArticleId,
    pub stage: Stage,
    pub next_tick_at: Option<DateTime<Utc>>,
    pub auto_refresh: bool,
    pub social_proof: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewError {
    /// Unknown or expired view.
    NotFound,
    Funnel(FunnelError),
}

impl fmt::Display for ViewError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewError::NotFound => f.write_str("view not found"),
            ViewError::Funnel(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for ViewError {}

#[derive(Debug)]
struct FunnelView {
    visitor: VisitorId,
    article_id: ArticleId,
    funnel: Paced<Funnel>,
    last_seen: DateTime<Utc>,
    beacon: Option<RefreshBeacon>,
    notices: Option<SocialProofTicker>,
}

#[derive(Debug, Default)]
struct Registry {
    views: HashMap<ViewId, FunnelView>,
    /// Gates passed by email submission, with the last time the visitor
    /// came back to the article.
    cleared: HashMap<(VisitorId, ArticleId), DateTime<Utc>>,
}

#[derive(Clone)]
pub struct FunnelViews {
    registry: Arc<Mutex<Registry>>,
    rng: Arc<Mutex<StdRng>>,
    ttl: TimeDelta,
    refresh_period: Duration,
}

impl FunnelViews {
    pub fn new(ttl: TimeDelta) -> Self {
        Self::with_rng(ttl, StdRng::from_entropy())
    }

    pub fn with_rng(ttl: TimeDelta, rng: StdRng) -> Self {
        Self {
            registry: Arc::default(),
            rng: Arc::new(Mutex::new(rng)),
            ttl,
            refresh_period: Duration::from_secs(REFRESH_INTERVAL_SECS),
        }
    }

    /// Open a view of `article` without social-proof notices.
    pub fn open(
        &self,
        article: &Article,
        visitor: Option<VisitorId>,
        now: DateTime<Utc>,
    ) -> ViewSnapshot {
        self.open_with_notices(article, Vec::new(), visitor, now)
    }

    /// Open a view of `article` that pops up `notices`. A view with notices or
    /// of an auto-refreshing article starts timers, so this must run inside a
    /// tokio runtime.
    pub fn open_with_notices(
        &self,
        article: &Article,
        notices: Vec<String>,
        visitor: Option<VisitorId>,
        now: DateTime<Utc>,
    ) -> ViewSnapshot {
        let visitor = visitor.unwrap_or_else(VisitorId::generate);
        let view_id = ViewId::generate();

        let mut registry = self.lock();
        prune_expired(&mut registry, now, self.ttl);

        let gate_cleared = match registry.cleared.get_mut(&(visitor, article.id.clone())) {
            Some(last_seen) => {
                *last_seen = now;
                true
            }
            None => false,
        };
        let (funnel, notices_rng) = {
            let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
            let funnel = Funnel::enter(FunnelConfig::from(article), gate_cleared, &mut *rng);
            (funnel, StdRng::seed_from_u64(rng.r#gen()))
        };

        let beacon = article
            .details
            .auto_refresh
            .then(|| RefreshBeacon::spawn(self.refresh_period));
        let view = FunnelView {
            visitor,
            article_id: article.id.clone(),
            funnel: Paced::start(funnel, now),
            last_seen: now,
            beacon,
            notices: SocialProofTicker::spawn(notices, notices_rng),
        };
        let snapshot = snapshot(view_id, &view);
        registry.views.insert(view_id, view);

        tracing::debug!(view = %view_id, article = %article.id, "funnel view opened");
        snapshot
    }

    /// Current state of the view, synced to `now`.
    pub fn get(&self, view_id: ViewId, now: DateTime<Utc>) -> Result<ViewSnapshot, ViewError> {
        let mut registry = self.lock();
        let view = registry.views.get_mut(&view_id).ok_or(ViewError::NotFound)?;
        view.funnel.advance_to(now);
        view.last_seen = now;
        Ok(snapshot(view_id, view))
    }

    /// Feed the captured email into the view's funnel. The address is
    /// checked and dropped.
    pub fn submit_email(
        &self,
        view_id: ViewId,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<ViewSnapshot, ViewError> {
        let mut registry = self.lock();
        let view = registry.views.get_mut(&view_id).ok_or(ViewError::NotFound)?;

        {
            let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
            view.funnel
                .update(now, |funnel| funnel.submit_email(email, &mut *rng))
                .map_err(ViewError::Funnel)?;
        }
        view.last_seen = now;

        let snapshot = snapshot(view_id, view);
        registry
            .cleared
            .insert((snapshot.visitor, snapshot.article_id.clone()), now);
        Ok(snapshot)
    }

    /// Tear the view down. Returns false for unknown views.
    pub fn close(&self, view_id: ViewId) -> bool {
        let removed = self.lock().views.remove(&view_id);
        if removed.is_some() {
            tracing::debug!(view = %view_id, "funnel view closed");
        }
        removed.is_some()
    }

    /// Refresh feed of the view; `None` for unknown views or articles
    /// without auto-refresh.
    pub fn subscribe(&self, view_id: ViewId) -> Option<broadcast::Receiver<RefreshEvent>> {
        let registry = self.lock();
        registry
            .views
            .get(&view_id)
            .and_then(|view| view.beacon.as_ref())
            .map(RefreshBeacon::subscribe)
    }

    /// Social-proof feed of the view; `None` for unknown views or views
    /// without notices.
    pub fn subscribe_notices(&self, view_id: ViewId) -> Option<broadcast::Receiver<NoticeEvent>> {
        let registry = self.lock();
        registry
            .views
            .get(&view_id)
            .and_then(|view| view.notices.as_ref())
            .map(SocialProofTicker::subscribe)
    }

    /// Drop views and cleared gates not seen within the expiry window.
    pub fn prune(&self, now: DateTime<Utc>) -> usize {
        prune_expired(&mut self.lock(), now, self.ttl)
    }

    pub fn len(&self) -> usize {
        self.lock().views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of remembered (visitor, article) gate clearances.
    pub fn cleared_gates(&self) -> usize {
        self.lock().cleared.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn prune_expired(registry: &mut Registry, now: DateTime<Utc>, ttl: TimeDelta) -> usize {
    let before = registry.views.len();
    registry.views.retain(|_, view| view.last_seen + ttl > now);
    let expired = before - registry.views.len();
    registry.cleared.retain(|_, last_seen| *last_seen + ttl > now);
    if expired > 0 {
        tracing::debug!(expired, "expired funnel views dropped");
    }
    expired
}

fn snapshot(view_id: ViewId, view: &FunnelView) -> ViewSnapshot {
    ViewSnapshot {
        view_id,
        visitor: view.visitor,
        article_id: view.article_id.clone(),
        stage: view.funnel.get().stage().clone(),
        next_tick_at: view.funnel.next_tick_at(),
        auto_refresh: view.beacon.is_some(),
        social_proof: view.notices.is_some(),
    }
}

/// Periodically drop expired views until the task is aborted.
pub async fn sweep_expired(views: FunnelViews, clock: impl Clock, period: Duration) {
    let mut interval = tokio::time::interval(period);
    loop {
        interval.tick().await;
        views.prune(clock.now());
    }
}
