//! The application's article catalog: a read-mostly cache in front of the
//! record store plus the site layout.
//!
//! Every admin write goes through one mutation path that changes the cache
//! first and then syncs the store. A failed sync keeps the local change and
//! reports [`SyncStatus::LocalOnly`]; the edit is never dropped. Concurrent
//! writers are not coordinated, the last one wins.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use marquee_common::ArticleId;
use marquee_common::article::{Article, ArticleDetails, ArticleDraft, ArticleError, Placement};
use marquee_common::layout::SiteLayout;
use marquee_common::store::{ArticleStore, StoreError};
use serde::Serialize;
use tokio::sync::broadcast;

use crate::domain::refresh::{RefreshEvent, SITE_REFRESH_INTERVAL_SECS, SiteRefresh};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncStatus {
    Synced,
    /// Kept locally; the store rejected the write.
    LocalOnly { notice: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Mutation {
    pub article: Article,
    pub sync: SyncStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    NotFound,
    Invalid(ArticleError),
    InvalidLayout(String),
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogError::NotFound => f.write_str("article not found"),
            CatalogError::Invalid(err) => err.fmt(f),
            CatalogError::InvalidLayout(cause) => write!(f, "invalid layout: {cause}"),
        }
    }
}

impl std::error::Error for CatalogError {}

impl From<ArticleError> for CatalogError {
    fn from(value: ArticleError) -> Self {
        Self::Invalid(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum StoreHealth {
    Connected,
    Error,
}

/// Whether open home pages receive the site-wide silent refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TrafficMode {
    Standard,
    SilentRefresh,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub total: usize,
    pub featured: usize,
    pub premium: usize,
    pub grid: usize,
    pub store: StoreHealth,
    pub traffic_mode: TrafficMode,
}

#[derive(Clone)]
pub struct ArticleCatalog<S: ArticleStore> {
    store: S,
    articles: Arc<RwLock<Vec<Article>>>,
    layout: Arc<RwLock<SiteLayout>>,
    site_refresh: Arc<SiteRefresh>,
}

impl<S: ArticleStore> ArticleCatalog<S> {
    pub fn new(store: S, layout: SiteLayout) -> Self {
        Self {
            store,
            articles: Arc::default(),
            layout: Arc::new(RwLock::new(layout)),
            site_refresh: Arc::new(SiteRefresh::new(Duration::from_secs(
                SITE_REFRESH_INTERVAL_SECS,
            ))),
        }
    }

    /// Replace the cache with the store's contents.
    pub async fn load(&self) -> Result<usize, StoreError> {
        let articles = self.store.list_all().await?;
        let count = articles.len();
        *self.articles.write().unwrap_or_else(PoisonError::into_inner) = articles;
        tracing::info!(count, "article catalog loaded");
        Ok(count)
    }

    /// Merge the store's contents into the cache. Records the store knows
    /// replace cached ones; local-only records stay.
    pub async fn refill(&self) -> Result<usize, StoreError> {
        let articles = self.store.list_all().await?;
        let count = articles.len();
        for article in articles {
            self.put(article);
        }
        tracing::info!(count, "article catalog refilled from the record store");
        Ok(count)
    }

    /// Every article, newest first.
    pub fn articles(&self) -> Vec<Article> {
        self.articles
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Cached article, falling back to the store on a miss. A store failure
    /// reads as absent.
    pub async fn get(&self, id: &ArticleId) -> Option<Article> {
        if let Some(article) = self.cached(id) {
            return Some(article);
        }
        match self.store.get_by_id(id).await {
            Ok(Some(article)) => {
                self.put(article.clone());
                Some(article)
            }
            Ok(None) => None,
            Err(err) => {
                tracing::warn!(article = %id, %err, "article lookup failed");
                None
            }
        }
    }

    pub async fn create(&self, draft: ArticleDraft, now: DateTime<Utc>) -> Result<Mutation, CatalogError> {
        let details = ArticleDetails::try_from(draft)?;
        let article = Article::new(ArticleId::generate(), now, details);
        self.put(article.clone());
        let sync = sync_status(self.store.upsert(&article).await, "save");
        tracing::info!(article = %article.id, ?sync, "article created");
        Ok(Mutation { article, sync })
    }

    pub async fn update(&self, id: &ArticleId, draft: ArticleDraft) -> Result<Mutation, CatalogError> {
        let details = ArticleDetails::try_from(draft)?;
        let mut article = self.get(id).await.ok_or(CatalogError::NotFound)?;
        article.revise(details);
        self.put(article.clone());
        let sync = sync_status(self.store.upsert(&article).await, "save");
        tracing::info!(article = %article.id, ?sync, "article updated");
        Ok(Mutation { article, sync })
    }

    /// Remove from the cache and the store. An id missing from the cache is
    /// still deleted when the store holds it.
    pub async fn delete(&self, id: &ArticleId) -> Result<SyncStatus, CatalogError> {
        let removed = {
            let mut articles = self.articles.write().unwrap_or_else(PoisonError::into_inner);
            let before = articles.len();
            articles.retain(|article| &article.id != id);
            before != articles.len()
        };
        if !removed {
            match self.store.get_by_id(id).await {
                Ok(Some(_)) => {}
                Ok(None) => return Err(CatalogError::NotFound),
                Err(err) => {
                    tracing::warn!(article = %id, %err, "article lookup failed");
                    return Err(CatalogError::NotFound);
                }
            }
        }
        let sync = sync_status(self.store.delete(id).await, "delete");
        tracing::info!(article = %id, ?sync, "article deleted");
        Ok(sync)
    }

    pub fn layout(&self) -> SiteLayout {
        self.layout
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn replace_layout(&self, layout: SiteLayout) -> Result<(), CatalogError> {
        layout.validate().map_err(CatalogError::InvalidLayout)?;
        let silent_refresh = layout.silent_refresh;
        *self.layout.write().unwrap_or_else(PoisonError::into_inner) = layout;
        if !silent_refresh {
            self.site_refresh.stop();
        }
        tracing::info!(silent_refresh, "site layout replaced");
        Ok(())
    }

    /// Switch the site-wide silent refresh. Turning it off ends every open feed.
    pub fn set_silent_refresh(&self, enabled: bool) {
        self.layout
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .silent_refresh = enabled;
        if !enabled {
            self.site_refresh.stop();
        }
        tracing::info!(enabled, "silent refresh switched");
    }

    /// Site refresh feed; `None` while the silent refresh is off.
    pub fn site_refresh_feed(&self) -> Option<broadcast::Receiver<RefreshEvent>> {
        let enabled = self
            .layout
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .silent_refresh;
        self.site_refresh.subscribe(enabled)
    }

    /// Placement counts from the cache plus a live health check of the store.
    pub async fn summary(&self) -> DashboardSummary {
        let articles = self.articles();
        let traffic_mode = if self.layout().silent_refresh {
            TrafficMode::SilentRefresh
        } else {
            TrafficMode::Standard
        };
        let count = |placement| {
            articles
                .iter()
                .filter(|article| article.placement() == placement)
                .count()
        };
        let store = match self.store.list_all().await {
            Ok(_) => StoreHealth::Connected,
            Err(err) => {
                tracing::warn!(%err, "record store health check failed");
                StoreHealth::Error
            }
        };
        DashboardSummary {
            total: articles.len(),
            featured: count(Placement::Featured),
            premium: count(Placement::Premium),
            grid: count(Placement::Grid),
            store,
            traffic_mode,
        }
    }

    fn cached(&self, id: &ArticleId) -> Option<Article> {
        self.articles
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|article| &article.id == id)
            .cloned()
    }

    /// Insert or replace in the cache, keeping newest-first order.
    fn put(&self, article: Article) {
        let mut articles = self.articles.write().unwrap_or_else(PoisonError::into_inner);
        match articles.iter_mut().find(|existing| existing.id == article.id) {
            Some(existing) => *existing = article,
            None => {
                articles.push(article);
                articles.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            }
        }
    }
}

/// Retry filling the catalog until the store answers once.
pub async fn refill_until_loaded<S: ArticleStore>(catalog: ArticleCatalog<S>, period: Duration) {
    let mut interval = tokio::time::interval(period);
    interval.tick().await;
    loop {
        interval.tick().await;
        match catalog.refill().await {
            Ok(_) => return,
            Err(err) => tracing::warn!(%err, "article catalog still unavailable"),
        }
    }
}

fn sync_status(result: Result<(), StoreError>, operation: &str) -> SyncStatus {
    match result {
        Ok(()) => SyncStatus::Synced,
        Err(err) => {
            tracing::warn!(%err, operation, "record store sync failed, change kept locally");
            SyncStatus::LocalOnly {
                notice: format!("Saved locally, {operation} could not be synced to the record store"),
            }
        }
    }
}
