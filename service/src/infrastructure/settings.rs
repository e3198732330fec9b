use std::env;

use anyhow::Context;
use config::{Config, Environment, File};
use dotenvy::dotenv;
use marquee_common::database::DatabaseSettings;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server_port: String,
    pub database: DatabaseSettings,
    pub auth: AuthSettings,
    #[serde(default)]
    pub site: SiteSettings,
}

/// Argon2 PHC strings of the admin credentials.
#[derive(Clone, Deserialize)]
pub struct AuthSettings {
    pub elevated_hash: String,
    #[serde(default)]
    pub restricted_hash: Option<String>,
}

impl std::fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSettings")
            .field("elevated_hash", &"***")
            .field("restricted_hash", &self.restricted_hash.as_ref().map(|_| "***"))
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SiteSettings {
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_view_ttl_seconds")]
    pub view_ttl_seconds: i64,
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            view_ttl_seconds: default_view_ttl_seconds(),
        }
    }
}

fn default_page_size() -> usize {
    5
}

fn default_view_ttl_seconds() -> i64 {
    1800
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok();
        let run_mode = load_env("RUN_MODE", "development");

        let s = Config::builder()
            .add_source(File::with_name("./config/default"))
            .add_source(File::with_name(&format!("./config/{run_mode}")).required(false))
            .add_source(
                Environment::with_prefix("app")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        s.try_deserialize().with_context(|| "failed to read config")
    }
}

fn load_env(key: &str, default_value: &'static str) -> String {
    env::var(key).unwrap_or_else(|_| default_value.into())
}
