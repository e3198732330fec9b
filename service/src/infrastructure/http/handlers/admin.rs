//! Admin surface. Everything except `login` sits behind the session guard,
//! which places the caller's [`Session`] in the request extensions.

use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use marquee_common::article::{Article, ArticleDraft};
use marquee_common::clock::Clock;
use marquee_common::layout::SiteLayout;
use marquee_common::session::{GateRejection, LoginForm, Role, Secret, Session, SessionGate};
use serde::Deserialize;

use crate::domain::catalog::DashboardSummary;
use crate::domain::{AdminOperation, AppState, is_permitted};
use crate::infrastructure::http::SESSION_COOKIE;
use crate::infrastructure::http::api::{ApiError, ApiSuccess};
use crate::infrastructure::http::handlers::dto::{
    LoginResponse, MutationResponse, SessionResponse, StepUpResponse, SyncResponse,
    TrafficRequest,
};
use crate::infrastructure::http::handlers::parse_article_id;

pub async fn login<S: AppState>(
    State(state): State<S>,
    Json(form): Json<LoginForm>,
) -> Result<Response, ApiError> {
    let mut gate = SessionGate::new();
    match gate.submit(&form, state.verifier(), state.clock()).await {
        Ok(role) => {
            let session = gate
                .session()
                .ok_or_else(|| ApiError::InternalServerError("login left no session".to_string()))?;
            let cookie = format!(
                "{SESSION_COOKIE}={}; Path=/; HttpOnly; SameSite=Strict",
                session.token
            );
            let body = LoginResponse {
                token: session.token.to_string(),
                role,
            };
            Ok((
                [(header::SET_COOKIE, cookie)],
                ApiSuccess::new(StatusCode::OK, body),
            )
                .into_response())
        }
        Err(GateRejection::AccessDenied) => Err(ApiError::AccessDenied),
        Err(GateRejection::IntrusionDetected) => Err(ApiError::IntrusionDetected),
    }
}

pub async fn logout<S: AppState>(
    State(state): State<S>,
    Extension(session): Extension<Session>,
) -> Response {
    let mut gate = SessionGate::restore(&session.token, state.verifier()).await;
    gate.logout(state.verifier()).await;
    tracing::info!(role = ?session.role, "admin logged out");

    let cookie = format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Strict; Max-Age=0");
    ([(header::SET_COOKIE, cookie)], StatusCode::NO_CONTENT).into_response()
}

pub async fn current_session(Extension(session): Extension<Session>) -> ApiSuccess<SessionResponse> {
    ApiSuccess::new(
        StatusCode::OK,
        SessionResponse {
            role: session.role,
            established_at: session.established_at,
        },
    )
}

#[derive(Debug, Deserialize)]
pub struct StepUpRequest {
    #[serde(default)]
    pub secret: Secret,
}

/// Re-check the elevated credential before a sensitive action. The current
/// session is left as it is whatever the outcome.
pub async fn verify_security<S: AppState>(
    State(state): State<S>,
    Extension(session): Extension<Session>,
    Json(request): Json<StepUpRequest>,
) -> Result<ApiSuccess<StepUpResponse>, ApiError> {
    let gate = SessionGate::restore(&session.token, state.verifier()).await;
    match gate.verify_current(&request.secret, state.verifier()).await {
        Ok(Role::Elevated) => Ok(ApiSuccess::new(StatusCode::OK, StepUpResponse { verified: true })),
        Ok(Role::Restricted) | Err(_) => Err(ApiError::AccessDenied),
    }
}

pub async fn dashboard<S: AppState>(State(state): State<S>) -> ApiSuccess<DashboardSummary> {
    ApiSuccess::new(StatusCode::OK, state.catalog().summary().await)
}

pub async fn list_articles<S: AppState>(State(state): State<S>) -> ApiSuccess<Vec<Article>> {
    ApiSuccess::new(StatusCode::OK, state.catalog().articles())
}

pub async fn get_article<S: AppState>(
    Path(id): Path<String>,
    State(state): State<S>,
) -> Result<ApiSuccess<Article>, ApiError> {
    let id = parse_article_id(&id)?;
    state
        .catalog()
        .get(&id)
        .await
        .map(|article| ApiSuccess::new(StatusCode::OK, article))
        .ok_or_else(|| ApiError::NotFound("article not found".to_string()))
}

pub async fn create_article<S: AppState>(
    State(state): State<S>,
    Extension(session): Extension<Session>,
    Json(draft): Json<ArticleDraft>,
) -> Result<ApiSuccess<MutationResponse>, ApiError> {
    require(&session, AdminOperation::EditArticles)?;
    let mutation = state.catalog().create(draft, state.clock().now()).await?;
    Ok(ApiSuccess::new(StatusCode::CREATED, mutation.into()))
}

pub async fn update_article<S: AppState>(
    Path(id): Path<String>,
    State(state): State<S>,
    Extension(session): Extension<Session>,
    Json(draft): Json<ArticleDraft>,
) -> Result<ApiSuccess<MutationResponse>, ApiError> {
    require(&session, AdminOperation::EditArticles)?;
    let id = parse_article_id(&id)?;
    let mutation = state.catalog().update(&id, draft).await?;
    Ok(ApiSuccess::new(StatusCode::OK, mutation.into()))
}

pub async fn delete_article<S: AppState>(
    Path(id): Path<String>,
    State(state): State<S>,
    Extension(session): Extension<Session>,
) -> Result<ApiSuccess<SyncResponse>, ApiError> {
    require(&session, AdminOperation::DeleteArticles)?;
    let id = parse_article_id(&id)?;
    let sync = state.catalog().delete(&id).await?;
    Ok(ApiSuccess::new(StatusCode::OK, sync.into()))
}

pub async fn get_layout<S: AppState>(State(state): State<S>) -> ApiSuccess<SiteLayout> {
    ApiSuccess::new(StatusCode::OK, state.catalog().layout())
}

pub async fn replace_layout<S: AppState>(
    State(state): State<S>,
    Extension(session): Extension<Session>,
    Json(layout): Json<SiteLayout>,
) -> Result<ApiSuccess<SiteLayout>, ApiError> {
    require(&session, AdminOperation::EditLayout)?;
    state.catalog().replace_layout(layout)?;
    Ok(ApiSuccess::new(StatusCode::OK, state.catalog().layout()))
}

pub async fn get_traffic<S: AppState>(State(state): State<S>) -> ApiSuccess<TrafficRequest> {
    let silent_refresh = state.catalog().layout().silent_refresh;
    ApiSuccess::new(StatusCode::OK, TrafficRequest { silent_refresh })
}

pub async fn set_traffic<S: AppState>(
    State(state): State<S>,
    Extension(session): Extension<Session>,
    Json(request): Json<TrafficRequest>,
) -> Result<ApiSuccess<TrafficRequest>, ApiError> {
    require(&session, AdminOperation::EditLayout)?;
    state.catalog().set_silent_refresh(request.silent_refresh);
    Ok(ApiSuccess::new(StatusCode::OK, request))
}

fn require(session: &Session, operation: AdminOperation) -> Result<(), ApiError> {
    if is_permitted(session.role, operation) {
        Ok(())
    } else {
        tracing::warn!(role = ?session.role, ?operation, "admin operation refused");
        Err(ApiError::Forbidden(format!("{operation:?} requires the elevated role")))
    }
}
