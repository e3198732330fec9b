use std::convert::Infallible;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::{Stream, StreamExt};
use marquee_common::ArticleId;
use marquee_common::clock::Clock;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

use crate::domain::AppState;
use crate::domain::refresh::RefreshEvent;
use crate::domain::social_proof::NoticeEvent;
use crate::domain::views::ViewId;
use crate::infrastructure::http::api::{ApiError, ApiSuccess};
use crate::infrastructure::http::handlers::dto::{EmailRequest, OpenViewRequest, ViewResponse};

/// Render an article: enter its funnel.
pub async fn open_view<S: AppState>(
    State(state): State<S>,
    Json(request): Json<OpenViewRequest>,
) -> ApiSuccess<ViewResponse> {
    let article = match ArticleId::try_new(request.article_id.as_str()) {
        Ok(id) => state.catalog().get(&id).await,
        Err(_) => None,
    };
    let Some(article) = article else {
        tracing::debug!(article = %request.article_id, "view of unknown article");
        return ApiSuccess::new(StatusCode::NOT_FOUND, ViewResponse::not_found(request.article_id));
    };

    let notices = state.catalog().layout().active_social_proofs();
    let snapshot = state.views().open_with_notices(
        &article,
        notices,
        request.visitor,
        state.clock().now(),
    );
    ApiSuccess::new(StatusCode::CREATED, snapshot.into())
}

pub async fn get_view<S: AppState>(
    Path(view_id): Path<String>,
    State(state): State<S>,
) -> Result<ApiSuccess<ViewResponse>, ApiError> {
    let view_id = parse_view_id(&view_id)?;
    let snapshot = state.views().get(view_id, state.clock().now())?;
    Ok(ApiSuccess::new(StatusCode::OK, snapshot.into()))
}

pub async fn submit_email<S: AppState>(
    Path(view_id): Path<String>,
    State(state): State<S>,
    Json(request): Json<EmailRequest>,
) -> Result<ApiSuccess<ViewResponse>, ApiError> {
    let view_id = parse_view_id(&view_id)?;
    let snapshot = state
        .views()
        .submit_email(view_id, &request.email, state.clock().now())?;
    Ok(ApiSuccess::new(StatusCode::OK, snapshot.into()))
}

/// Navigating away: drop the view and everything it scheduled.
pub async fn close_view<S: AppState>(
    Path(view_id): Path<String>,
    State(state): State<S>,
) -> Result<StatusCode, ApiError> {
    let view_id = parse_view_id(&view_id)?;
    if state.views().close(view_id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("view not found".to_string()))
    }
}

/// Server-sent `refresh` events for an auto-refreshing view. The stream ends
/// when the view is closed or expires.
pub async fn refresh_feed<S: AppState>(
    Path(view_id): Path<String>,
    State(state): State<S>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let view_id = parse_view_id(&view_id)?;
    let receiver = state
        .views()
        .subscribe(view_id)
        .ok_or_else(|| ApiError::NotFound("no refresh feed for this view".to_string()))?;

    Ok(event_stream(receiver, refresh_event))
}

/// Server-sent social-proof notices of a view. The stream ends when the view
/// is closed or expires.
pub async fn notice_feed<S: AppState>(
    Path(view_id): Path<String>,
    State(state): State<S>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let view_id = parse_view_id(&view_id)?;
    let receiver = state
        .views()
        .subscribe_notices(view_id)
        .ok_or_else(|| ApiError::NotFound("no notices for this view".to_string()))?;

    Ok(event_stream(receiver, |notice| match notice {
        NoticeEvent::Show { text } => Event::default().event("social-proof").data(text),
        NoticeEvent::Dismiss => Event::default().event("social-proof-dismiss").data(""),
    }))
}

/// Site-wide silent refresh for open home pages; 404 while switched off.
pub async fn site_refresh_feed<S: AppState>(
    State(state): State<S>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let receiver = state
        .catalog()
        .site_refresh_feed()
        .ok_or_else(|| ApiError::NotFound("silent refresh is off".to_string()))?;
    Ok(event_stream(receiver, refresh_event))
}

fn refresh_event(event: RefreshEvent) -> Event {
    Event::default()
        .event("refresh")
        .data(event.sequence.to_string())
}

fn event_stream<T>(
    receiver: broadcast::Receiver<T>,
    render: fn(T) -> Event,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>>
where
    T: Clone + Send + 'static,
{
    let stream = BroadcastStream::new(receiver).filter_map(move |result| async move {
        match result {
            Ok(event) => Some(Ok::<_, Infallible>(render(event))),
            Err(err) => {
                tracing::warn!(?err, "event subscriber lagged");
                None
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

fn parse_view_id(raw: &str) -> Result<ViewId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::NotFound("view not found".to_string()))
}
