use anyhow::Context;
use axum::Router;
use axum::middleware;
use axum::routing::{get, post};
use axum_prometheus::PrometheusMetricLayer;
use tokio::net;

use crate::domain::AppState;
use handlers::{admin, articles, health_check, home, verifications, views};

mod api;
mod guard;
mod handlers;

/// Name of the cookie carrying the admin session token.
pub const SESSION_COOKIE: &str = "marquee_session";
/// Where unauthenticated admin requests are sent.
pub const ADMIN_GATEWAY_PATH: &str = "/admin-gateway";

/// Configuration for the HTTP server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpServerConfig<'a> {
    pub port: &'a str,
}

/// The application's HTTP server. The underlying HTTP package is opaque to module consumers.
pub struct HttpServer {
    router: axum::Router,
    listener: net::TcpListener,
}

impl HttpServer {
    /// Returns a new HTTP server bound to the port specified in `config`.
    pub async fn new(state: impl AppState, config: HttpServerConfig<'_>) -> anyhow::Result<Self> {
        let trace_layer = tower_http::trace::TraceLayer::new_for_http().make_span_with(
            |request: &axum::extract::Request<_>| {
                let uri = request.uri().to_string();
                tracing::info_span!("http_request", method = ?request.method(), uri)
            },
        );
        // see: https://github.com/Ptrskay3/axum-prometheus
        let (prometheus_layer, metric_handle) = PrometheusMetricLayer::pair();

        let router = router(state)
            .route("/metrics", get(|| async move { metric_handle.render() }))
            .layer(trace_layer)
            .layer(prometheus_layer);

        let listener = net::TcpListener::bind(format!("0.0.0.0:{}", config.port))
            .await
            .with_context(|| format!("failed to listen on {}", config.port))?;

        Ok(Self { router, listener })
    }

    /// Runs the HTTP server.
    pub async fn run(self) -> anyhow::Result<()> {
        if let Ok(address) = self.listener.local_addr() {
            tracing::info!("listening on {}", address);
        }
        axum::serve(self.listener, self.router)
            .await
            .context("received error from running server")?;
        Ok(())
    }
}

/// Every application route, without the metrics and tracing layers.
pub fn router<S: AppState>(state: S) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_routes())
        .nest("/admin", admin_routes(state.clone()))
        .with_state(state)
}

fn api_routes<S: AppState>() -> Router<S> {
    Router::new()
        .route("/home", get(home::home_page::<S>))
        .route("/home/refresh", get(views::site_refresh_feed::<S>))
        .route("/articles/{id}", get(articles::article_page::<S>))
        .route("/views", post(views::open_view::<S>))
        .route(
            "/views/{view_id}",
            get(views::get_view::<S>).delete(views::close_view::<S>),
        )
        .route("/views/{view_id}/email", post(views::submit_email::<S>))
        .route("/views/{view_id}/refresh", get(views::refresh_feed::<S>))
        .route("/views/{view_id}/notices", get(views::notice_feed::<S>))
        .route(
            "/verifications/{id}",
            post(verifications::open_verification::<S>).get(verifications::get_verification::<S>),
        )
}

fn admin_routes<S: AppState>(state: S) -> Router<S> {
    let guarded = Router::new()
        .route("/logout", post(admin::logout::<S>))
        .route("/session", get(admin::current_session))
        .route("/security/verify", post(admin::verify_security::<S>))
        .route("/dashboard", get(admin::dashboard::<S>))
        .route(
            "/articles",
            get(admin::list_articles::<S>).post(admin::create_article::<S>),
        )
        .route(
            "/articles/{id}",
            get(admin::get_article::<S>)
                .put(admin::update_article::<S>)
                .delete(admin::delete_article::<S>),
        )
        .route(
            "/layout",
            get(admin::get_layout::<S>).put(admin::replace_layout::<S>),
        )
        .route(
            "/traffic",
            get(admin::get_traffic::<S>).put(admin::set_traffic::<S>),
        )
        .route_layer(middleware::from_fn_with_state(state, guard::require_session::<S>));

    Router::new()
        .route("/login", post(admin::login::<S>))
        .nest("/api", guarded)
}

#[cfg(test)]
mod tests;
