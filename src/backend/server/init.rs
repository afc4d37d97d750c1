/**
 * Server Initialization
 *
 * This module opens the database, runs the embedded migrations, builds the
 * shared state and assembles the router.
 *
 * # Initialization Process
 *
 * 1. Open the SQLite pool (a `:memory:` database is pinned to one connection)
 * 2. Run migrations from `./migrations`
 * 3. Create the cache, session manager and connection hub
 * 4. Start the periodic cache purge task
 * 5. Create the router
 */

use std::str::FromStr;
use std::sync::Arc;

use axum::Router;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

use crate::backend::auth::sessions::SessionManager;
use crate::backend::cache::{spawn_purge_task, CacheStore, PURGE_INTERVAL};
use crate::backend::error::{BackendError, BackendResult};
use crate::backend::realtime::RealtimeHub;
use crate::backend::routes::router::create_router;
use crate::backend::server::config::ServerConfig;
use crate::backend::server::state::AppState;

/// Open the connection pool and bring the schema up to date
pub async fn connect_database(config: &ServerConfig) -> BackendResult<SqlitePool> {
    tracing::info!("[Init] Connecting to database...");

    let mut options = SqliteConnectOptions::from_str(&config.database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool_options = if config.is_in_memory_db() {
        // Every connection to :memory: is a separate database
        SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        options = options.journal_mode(SqliteJournalMode::Wal);
        SqlitePoolOptions::new().max_connections(8)
    };

    let pool = pool_options.connect_with(options).await.map_err(|e| {
        tracing::error!("[Init] Failed to create database connection pool: {:?}", e);
        BackendError::from(e)
    })?;

    tracing::info!("[Init] Running database migrations...");
    sqlx::migrate!("./migrations").run(&pool).await.map_err(|e| {
        tracing::error!("[Init] Failed to run database migrations: {}", e);
        BackendError::state(format!("Migration failed: {}", e))
    })?;
    tracing::info!("[Init] Database ready");

    Ok(pool)
}

/// Build the shared state and start background tasks
pub async fn build_state(config: ServerConfig) -> BackendResult<AppState> {
    let db_pool = connect_database(&config).await?;
    let cache = Arc::new(CacheStore::new());
    let sessions = SessionManager::new(&config, cache.clone());

    spawn_purge_task(cache.clone(), PURGE_INTERVAL);

    Ok(AppState {
        db_pool,
        config: Arc::new(config),
        sessions,
        cache,
        hub: RealtimeHub::new(),
    })
}

/// Create and configure the Axum application
pub async fn create_app(config: ServerConfig) -> BackendResult<Router> {
    tracing::info!("[Init] Initializing Roomline backend server");
    let state = build_state(config).await?;
    let app = create_router(state);
    tracing::info!("[Init] Router configured");
    Ok(app)
}
