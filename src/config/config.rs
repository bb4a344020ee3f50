use std::time::Duration;

use color_eyre::Result;
use dotenv::dotenv;
use eyre::WrapErr;
use serde::Deserialize;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub database_url: String,
    #[serde(default)]
    pub store: StoreBackend,
    pub jwt_secret: String,
    #[serde(default = "default_jwt_ttl_minutes")]
    pub jwt_ttl_minutes: i64,
    pub super_admin_username: Option<String>,
    pub super_admin_email: Option<String>,
    pub super_admin_password: Option<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_jwt_ttl_minutes() -> i64 {
    60
}

/// Credentials the single super admin is synced to on start-up.
#[derive(Debug, Clone)]
pub struct SuperAdminCredentials {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        info!("Initializing configuration");
        let settings = config::Config::builder()
            .add_source(config::Environment::default())
            .build()
            .wrap_err("Building configuration")?;

        let config: Self = settings
            .try_deserialize()
            .wrap_err("loading configuration from environment")?;

        if config.store == StoreBackend::Postgres && config.database_url.is_empty() {
            eyre::bail!("DATABASE_URL is required when STORE=postgres");
        }

        Ok(config)
    }

    pub fn super_admin(&self) -> Option<SuperAdminCredentials> {
        match (
            &self.super_admin_username,
            &self.super_admin_email,
            &self.super_admin_password,
        ) {
            (Some(username), Some(email), Some(password)) => Some(SuperAdminCredentials {
                username: username.clone(),
                email: email.clone(),
                password: password.clone(),
            }),
            _ => None,
        }
    }

    pub async fn db_pool(&self) -> Result<PgPool> {
        info!("Initializing database pool");
        PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(30))
            .connect(&self.database_url)
            .await
            .wrap_err("Creating database pool")
    }
}
