use axum::extract::{Request, State};
use axum::http::{HeaderMap, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use marquee_common::clock::Clock;
use marquee_common::session::{GateState, SessionGate, SessionToken};

use crate::domain::AppState;
use crate::infrastructure::http::{ADMIN_GATEWAY_PATH, SESSION_COOKIE};

/// Admit requests carrying a live admin session; send everyone else to the
/// gateway with `303 See Other`.
pub async fn require_session<S: AppState>(
    State(state): State<S>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(token) = session_token(request.headers()) else {
        return Redirect::to(ADMIN_GATEWAY_PATH).into_response();
    };

    let gate = SessionGate::restore(&token, state.verifier()).await;
    match (gate.state(state.clock().now()), gate.session()) {
        (GateState::LoggedIn(_), Some(session)) => {
            request.extensions_mut().insert(session.clone());
            next.run(request).await
        }
        _ => {
            tracing::debug!(uri = %request.uri(), "admin request without a live session");
            Redirect::to(ADMIN_GATEWAY_PATH).into_response()
        }
    }
}

/// Bearer token first, then the session cookie.
fn session_token(headers: &HeaderMap) -> Option<SessionToken> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    let cookie = || {
        headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == SESSION_COOKIE)
            .map(|(_, value)| value)
    };

    bearer.or_else(cookie)?.parse().ok()
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn token_is_read_from_bearer_or_cookie() {
        let token = SessionToken::generate();

        let mut bearer = HeaderMap::new();
        bearer.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        assert_eq!(session_token(&bearer), Some(token));

        let mut cookie = HeaderMap::new();
        cookie.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!("theme=dark; {SESSION_COOKIE}={token}")).unwrap(),
        );
        assert_eq!(session_token(&cookie), Some(token));

        let mut garbage = HeaderMap::new();
        garbage.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer nope"));
        assert_eq!(session_token(&garbage), None);
        assert_eq!(session_token(&HeaderMap::new()), None);
    }
}
