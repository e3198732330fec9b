use axum::http::StatusCode;
use marquee_common::ArticleId;

use crate::infrastructure::http::api::ApiError;

pub mod admin;
pub mod articles;
pub mod dto;
pub mod home;
pub mod verifications;
pub mod views;

// health check handler
pub async fn health_check() -> StatusCode {
    StatusCode::OK
}

/// An id that cannot be valid cannot resolve either.
fn parse_article_id(raw: &str) -> Result<ArticleId, ApiError> {
    ArticleId::try_new(raw).map_err(|_| ApiError::NotFound("article not found".to_string()))
}
