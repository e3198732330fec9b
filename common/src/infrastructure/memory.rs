use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use crate::domain::ArticleId;
use crate::domain::article::Article;
use crate::domain::store::{ArticleStore, StoreError};

/// Process-local record store. Backs tests and database-less development runs;
/// can be switched offline to exercise the failure paths of its callers.
#[derive(Clone, Debug, Default)]
pub struct InMemoryArticleStore {
    records: Arc<RwLock<HashMap<ArticleId, Article>>>,
    offline: Arc<AtomicBool>,
}

impl InMemoryArticleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_articles(articles: impl IntoIterator<Item = Article>) -> Self {
        let store = Self::new();
        {
            let mut records = store.records.write().unwrap_or_else(PoisonError::into_inner);
            for article in articles {
                records.insert(article.id.clone(), article);
            }
        }
        store
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn ensure_online(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("in-memory store is offline".to_string()))
        } else {
            Ok(())
        }
    }
}

impl ArticleStore for InMemoryArticleStore {
    async fn upsert(&self, article: &Article) -> Result<(), StoreError> {
        self.ensure_online()?;
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        match records.get_mut(&article.id) {
            // creation time is owned by the first write
            Some(existing) => existing.revise(article.details.clone()),
            None => {
                records.insert(article.id.clone(), article.clone());
            }
        }
        Ok(())
    }

    async fn delete(&self, id: &ArticleId) -> Result<(), StoreError> {
        self.ensure_online()?;
        self.records
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id);
        Ok(())
    }

    async fn get_by_id(&self, id: &ArticleId) -> Result<Option<Article>, StoreError> {
        self.ensure_online()?;
        Ok(self
            .records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned())
    }

    async fn list_all(&self) -> Result<Vec<Article>, StoreError> {
        self.ensure_online()?;
        let mut articles: Vec<Article> = self
            .records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        articles.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(articles)
    }
}
