use axum::extract::{Path, State};
use axum::http::StatusCode;

use crate::domain::AppState;
use crate::infrastructure::http::api::{ApiError, ApiSuccess};
use crate::infrastructure::http::handlers::dto::ArticlePageResponse;
use crate::infrastructure::http::handlers::parse_article_id;

pub async fn article_page<S: AppState>(
    Path(id): Path<String>,
    State(state): State<S>,
) -> Result<ApiSuccess<ArticlePageResponse>, ApiError> {
    let id = parse_article_id(&id)?;
    let article = state
        .catalog()
        .get(&id)
        .await
        .ok_or_else(|| ApiError::NotFound("article not found".to_string()))?;
    let ads = state.catalog().layout().article_ads(&article).into();

    Ok(ApiSuccess::new(StatusCode::OK, ArticlePageResponse { article, ads }))
}
