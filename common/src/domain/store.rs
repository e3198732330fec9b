use std::fmt;
use std::future::Future;

use crate::domain::ArticleId;
use crate::domain::article::Article;

/// Authoritative home of article records.
pub trait ArticleStore: Clone + Send + Sync + 'static {
    /// Create or replace the record keyed by `article.id`.
    fn upsert(&self, article: &Article) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Remove the record. Removing a missing id is not an error.
    fn delete(&self, id: &ArticleId) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn get_by_id(
        &self,
        id: &ArticleId,
    ) -> impl Future<Output = Result<Option<Article>, StoreError>> + Send;

    /// Every record, newest first.
    fn list_all(&self) -> impl Future<Output = Result<Vec<Article>, StoreError>> + Send;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The backend could not be reached or refused the operation.
    Unavailable(String),
    /// A stored row no longer forms a valid article.
    Corrupted(String),
    /// The article cannot be represented by the backend.
    Rejected(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Unavailable(cause) => write!(f, "record store unavailable: {cause}"),
            StoreError::Corrupted(cause) => write!(f, "corrupted article record: {cause}"),
            StoreError::Rejected(cause) => write!(f, "article rejected by record store: {cause}"),
        }
    }
}

impl std::error::Error for StoreError {}
