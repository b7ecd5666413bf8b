use std::net::SocketAddr;
use std::sync::Arc;

use sqlx::{migrate::MigrateDatabase, sqlite::SqlitePoolOptions, Sqlite};
use tokio::time::{self, Duration as TokioDuration};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use spotbook::{config, db, routes, state::AppState, store::SqliteStore};

const RATE_LIMIT_CLEANUP_SECS: u64 = 300;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logging: stdout plus a daily rotated file under ./logs
    std::fs::create_dir_all("logs").ok();
    let (stdout_nb, stdout_guard) = tracing_appender::non_blocking(std::io::stdout());
    let file_appender = tracing_appender::rolling::daily("logs", "spotbook.log");
    let (file_nb, file_guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=info".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(stdout_nb))
        .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(file_nb))
        .init();
    // Dropping the guards would stop the writers from flushing
    let _log_guards = (stdout_guard, file_guard);

    // embedded defaults -> spotbook.toml -> SPOTBOOK_CONFIG -> env/.env
    let app_cfg = config::load()?;

    let db_url = &app_cfg.database.url;
    config::ensure_sqlite_parent_dir(db_url)?;
    if !Sqlite::database_exists(db_url).await.unwrap_or(false) {
        info!("Creating SQLite database at {}", db_url);
        Sqlite::create_database(db_url).await?;
    }
    let pool = SqlitePoolOptions::new()
        .max_connections(app_cfg.database.max_connections)
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                // Per-connection; cascades and the overlap trigger rely on foreign keys.
                sqlx::query("PRAGMA foreign_keys=ON;").execute(&mut *conn).await?;
                let _ = sqlx::query("PRAGMA busy_timeout=10000;").execute(&mut *conn).await;
                let _ = sqlx::query("PRAGMA temp_store=MEMORY;").execute(&mut *conn).await;
                Ok(())
            })
        })
        .connect(db_url)
        .await?;

    db::init_db(&pool).await?;

    let store = Arc::new(SqliteStore::new(pool));
    let state = AppState::new(store, app_cfg.clone());

    // Keep the per-IP maps from growing without bound
    {
        let endpoint = state.rate_limiter.clone();
        let global = state.global_limiter.clone();
        tokio::spawn(async move {
            let mut ticker = time::interval(TokioDuration::from_secs(RATE_LIMIT_CLEANUP_SECS));
            loop {
                ticker.tick().await;
                endpoint.cleanup_all().await;
                global.cleanup_old_entries().await;
            }
        });
    }

    let app = routes::router(state);

    let host = &app_cfg.server.host;
    let port = app_cfg.server.port;
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid listen addr {}:{} - {}", host, port, e))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!(
        environment = ?app_cfg.server.environment,
        "spotbook listening on http://{}",
        listener.local_addr()?
    );
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
    info!("Shutdown signal received. Stopping server...");
}
