use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer};
use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;

mod api;
mod auth;
mod config;
mod db;
mod docs;
mod error;
mod model;
mod models;
mod routes;
mod service;
mod state;
mod store;
mod utils;

use auth::password::PasswordHasher;
use config::{Config, StorageBackend};
use db::{init_db, run_migrations};
use state::AppState;
use store::{MemoryStore, MySqlStore};

use crate::docs::ApiDoc;
use tracing::{error, info, warn};
use tracing_appender::rolling;
use utoipa::OpenApi; // ← needed for ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

const EMAIL_WARMUP_BATCH: usize = 500;

async fn build_state(config: &Config) -> anyhow::Result<AppState> {
    let hasher = PasswordHasher::new(
        config.password_hash_memory_kib,
        config.password_hash_iterations,
    )?;
    let access_ttl = Duration::from_secs(config.access_token_ttl as u64);

    let state = match config.storage_backend {
        StorageBackend::MySql => {
            let url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL must be set when STORAGE_BACKEND=mysql")?;
            let pool = init_db(url, config.db_max_connections).await?;
            if config.run_migrations {
                run_migrations(&pool).await?;
            }
            AppState::new(Arc::new(MySqlStore::new(pool)), hasher, access_ttl)
        }
        StorageBackend::Memory => {
            warn!("Using in-memory storage; data is lost on restart");
            AppState::new(Arc::new(MemoryStore::new()), hasher, access_ttl)
        }
    };
    Ok(state)
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "timeclock.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(config.log_level)
        .with_ansi(false)
        .with_target(false) // removes module path
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .init();

    info!(backend = ?config.storage_backend, "Server starting...");

    let state = build_state(&config).await?;

    if let Some(owner) = &config.bootstrap_owner {
        service::users::ensure_owner(&state, owner)
            .await
            .context("Failed to create bootstrap owner")?;
    }

    let warmup_state = state.clone();
    actix_web::rt::spawn(async move {
        if let Err(e) = warmup_state
            .email_filter
            .warmup(warmup_state.users.as_ref(), EMAIL_WARMUP_BATCH)
            .await
        {
            error!(error = ?e, "Failed to warmup email filter");
        }
    });

    let server_addr = config.server_addr.clone();
    let state = Data::new(state);
    let config = Data::new(config);

    info!(addr = %server_addr, "Listening");

    HttpServer::new(move || {
        let routes_config = config.clone();
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // ← important: wildcard {_:.*} to match JS/CSS files
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(state.clone())
            .app_data(config.clone())
            // Configure auth + protected routes with rate limiting
            .configure(move |cfg| routes::configure(cfg, &routes_config))
    })
    .bind(&server_addr)
    .with_context(|| format!("Failed to bind {}", server_addr))?
    .run()
    .await?;

    Ok(())
}
