use std::sync::Arc;

use actix_web::{middleware::Logger, web, App, HttpServer};
use color_eyre::Result;
use eyre::WrapErr;
use tracing::info;
use tracing_subscriber::EnvFilter;

use fraudwatch::{
    clock::{Clock, SystemClock},
    config::{
        auth::JwtService,
        config::{Config, StoreBackend},
        routes::routes,
    },
    state::AppState,
    store::{MemoryStore, PgStore},
};

#[actix_web::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env().wrap_err("Failed to load config")?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let jwt = JwtService::new(&config.jwt_secret, config.jwt_ttl_minutes);

    let state = match config.store {
        StoreBackend::Postgres => {
            let pool = config
                .db_pool()
                .await
                .wrap_err("Failed to connect to database")?;
            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .wrap_err("Running migrations")?;
            AppState::new(Arc::new(PgStore::new(pool)), clock, jwt)
        }
        StoreBackend::Memory => {
            info!("Using in-memory store, data will not survive a restart");
            AppState::new(Arc::new(MemoryStore::new()), clock, jwt)
        }
    };

    if let Some(creds) = config.super_admin() {
        state
            .admin_service
            .sync_super_admin(&creds)
            .await
            .map_err(|e| eyre::eyre!("Syncing super admin: {e}"))?;
    }

    let state = web::Data::new(state);
    let addr = format!("{}:{}", config.host, config.port);
    info!(%addr, "Starting server");

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(state.clone())
            .configure(routes)
    })
    .bind(addr)?
    .run()
    .await?;

    Ok(())
}
