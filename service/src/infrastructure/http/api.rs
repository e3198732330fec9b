use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use marquee_common::session::DENIAL_DISPLAY_SECS;
use serde::Serialize;

use crate::domain::catalog::CatalogError;
use crate::domain::views::ViewError;
use marquee_common::funnel::FunnelError;

// ApiSuccess is a wrapper around a response that includes a status code.

#[derive(Debug, Clone)]
pub struct ApiSuccess<T: Serialize>(StatusCode, Json<T>);

impl<T: Serialize> ApiSuccess<T> {
    pub(crate) fn new(status: StatusCode, data: T) -> Self {
        ApiSuccess(status, Json(data))
    }
}

impl<T: Serialize> IntoResponse for ApiSuccess<T> {
    fn into_response(self) -> Response {
        (self.0, self.1).into_response()
    }
}

// ApiError is a wrapper around a response that includes a status code.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    InternalServerError(String),
    UnprocessableEntity(String),
    ConflictWithServerState(String),
    NotFound(String),
    /// Generic login denial. Never says which part was wrong.
    AccessDenied,
    IntrusionDetected,
    Forbidden(String),
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        Self::InternalServerError(e.to_string())
    }
}

impl From<CatalogError> for ApiError {
    fn from(value: CatalogError) -> Self {
        match value {
            CatalogError::NotFound => Self::NotFound("article not found".to_string()),
            CatalogError::Invalid(cause) => Self::UnprocessableEntity(cause.to_string()),
            CatalogError::InvalidLayout(cause) => Self::UnprocessableEntity(cause),
        }
    }
}

impl From<ViewError> for ApiError {
    fn from(value: ViewError) -> Self {
        match value {
            ViewError::NotFound => Self::NotFound("view not found".to_string()),
            ViewError::Funnel(FunnelError::InvalidEmail) => {
                Self::UnprocessableEntity(FunnelError::InvalidEmail.to_string())
            }
            ViewError::Funnel(err @ FunnelError::OutOfOrder { .. }) => {
                Self::ConflictWithServerState(err.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        use ApiError::*;

        match self {
            InternalServerError(e) => {
                tracing::error!("{}", e);
                error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
            UnprocessableEntity(message) => error_response(StatusCode::UNPROCESSABLE_ENTITY, message),
            ConflictWithServerState(message) => error_response(StatusCode::CONFLICT, message),
            NotFound(message) => error_response(StatusCode::NOT_FOUND, message),
            AccessDenied => (
                StatusCode::UNAUTHORIZED,
                Json(ApiResponseBody {
                    status_code: StatusCode::UNAUTHORIZED.as_u16(),
                    data: ApiErrorData {
                        message: "Access denied".to_string(),
                        clear_after_ms: Some(DENIAL_DISPLAY_SECS as u64 * 1000),
                    },
                }),
            )
                .into_response(),
            IntrusionDetected => error_response(StatusCode::FORBIDDEN, "intrusionDetected".to_string()),
            Forbidden(message) => error_response(StatusCode::FORBIDDEN, message),
        }
    }
}

fn error_response(status: StatusCode, message: String) -> Response {
    (status, Json(ApiResponseBody::new_error(status, message))).into_response()
}

// Generic response structure shared by all API responses.

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponseBody<T: Serialize + PartialEq> {
    pub status_code: u16,
    pub data: T,
}

impl ApiResponseBody<ApiErrorData> {
    pub fn new_error(status_code: StatusCode, message: String) -> Self {
        Self {
            status_code: status_code.as_u16(),
            data: ApiErrorData {
                message,
                clear_after_ms: None,
            },
        }
    }
}

/// The response data format for all error responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorData {
    pub message: String,
    /// How long a client shows the denial before resetting the form.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clear_after_ms: Option<u64>,
}

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;
    use serde_json::{Value, json};

    use super::*;

    async fn body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn internal_errors_hide_their_cause() {
        let response = ApiError::InternalServerError("pool timed out".to_string()).into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body(response).await,
            json!({"statusCode": 500, "data": {"message": "Internal server error"}})
        );
    }

    #[tokio::test]
    async fn access_denied_tells_the_client_when_to_reset() {
        let response = ApiError::AccessDenied.into_response();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            body(response).await,
            json!({"statusCode": 401, "data": {"message": "Access denied", "clearAfterMs": 3000}})
        );
    }

    #[test]
    fn funnel_errors_map_to_client_errors() {
        assert!(matches!(
            ApiError::from(ViewError::Funnel(FunnelError::InvalidEmail)),
            ApiError::UnprocessableEntity(_)
        ));
        assert!(matches!(
            ApiError::from(ViewError::Funnel(FunnelError::OutOfOrder { stage: "ready" })),
            ApiError::ConflictWithServerState(_)
        ));
    }
}
