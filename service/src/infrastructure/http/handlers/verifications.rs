use axum::extract::{Path, State};
use axum::http::StatusCode;
use marquee_common::clock::Clock;

use crate::domain::AppState;
use crate::domain::verifications::VerificationId;
use crate::infrastructure::http::api::{ApiError, ApiSuccess};
use crate::infrastructure::http::handlers::dto::VerificationResponse;
use crate::infrastructure::http::handlers::parse_article_id;

pub async fn open_verification<S: AppState>(
    Path(article_id): Path<String>,
    State(state): State<S>,
) -> Result<ApiSuccess<VerificationResponse>, ApiError> {
    let article_id = parse_article_id(&article_id)?;
    let article = state.catalog().get(&article_id).await;

    state
        .verifications()
        .open(article.as_ref(), state.clock().now())
        .map(|snapshot| ApiSuccess::new(StatusCode::CREATED, snapshot.into()))
        .ok_or_else(|| ApiError::NotFound("article not found".to_string()))
}

pub async fn get_verification<S: AppState>(
    Path(id): Path<String>,
    State(state): State<S>,
) -> Result<ApiSuccess<VerificationResponse>, ApiError> {
    let not_found = || ApiError::NotFound("verification not found".to_string());
    let id: VerificationId = id.parse().map_err(|_| not_found())?;

    state
        .verifications()
        .get(id, state.clock().now())
        .map(|snapshot| ApiSuccess::new(StatusCode::OK, snapshot.into()))
        .ok_or_else(not_found)
}
