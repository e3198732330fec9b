use crate::{
    domain::migration::Migration,
    infrastructure::{persistence::PersistenceAdapter, settings::Settings},
};
use marquee_common::database;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub mod domain;
pub mod infrastructure;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::from_env()?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let database = database::connect(&settings.database).await?;
    let persistence = PersistenceAdapter::new(database);

    // bring the database schema up to the article record layout
    let migration = Migration::new(persistence);
    let applied = migration.migrate().await?;
    tracing::info!(applied, "schema migrated");

    Ok(())
}
