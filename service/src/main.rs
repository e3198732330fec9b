use std::time::Duration;

use chrono::TimeDelta;
use marquee_common::clock::SystemClock;
use marquee_common::database;
use marquee_common::layout::SiteLayout;

use crate::domain::catalog::{ArticleCatalog, refill_until_loaded};
use crate::domain::verifications::Verifications;
use crate::domain::views::{FunnelViews, sweep_expired};
use crate::infrastructure::AppStateImpl;
use crate::infrastructure::auth::Argon2Verifier;
use crate::infrastructure::http::{HttpServer, HttpServerConfig};
use crate::infrastructure::persistence::repository::PostgresArticleStore;
use crate::infrastructure::settings::Settings;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod domain;
mod infrastructure;

const VIEW_SWEEP_PERIOD: Duration = Duration::from_secs(60);
const CATALOG_RETRY_PERIOD: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::from_env()?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let database = database::connect(&settings.database).await?;
    let store = PostgresArticleStore::new(database);

    let catalog = ArticleCatalog::new(store, SiteLayout::default());
    if let Err(err) = catalog.load().await {
        // keep serving; the cache fills on demand and from the retry task
        tracing::error!(%err, "failed to load articles");
        tokio::spawn(refill_until_loaded(catalog.clone(), CATALOG_RETRY_PERIOD));
    }

    let ttl = TimeDelta::seconds(settings.site.view_ttl_seconds);
    let views = FunnelViews::new(ttl);
    tokio::spawn(sweep_expired(views.clone(), SystemClock, VIEW_SWEEP_PERIOD));

    let state = AppStateImpl::new(
        catalog,
        views,
        Verifications::new(ttl),
        Argon2Verifier::new(&settings.auth),
        SystemClock,
        settings.site.page_size,
    );

    let server_config = HttpServerConfig {
        port: &settings.server_port,
    };
    let http_server = HttpServer::new(state, server_config).await?;
    http_server.run().await
}
