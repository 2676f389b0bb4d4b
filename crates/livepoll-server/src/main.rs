use anyhow::Result;
use clap::Parser;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

mod cli;
mod config;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("livepoll=info,tower_http=debug")),
        )
        .init();

    let args = cli::Args::parse();
    let config = config::Config::load(&args.config)?;

    ensure_db_dir(&config.database.url);

    let db = livepoll_db::create_pool(&config.database.url, config.database.max_connections).await?;
    livepoll_db::run_migrations(&db).await?;

    let state = livepoll_core::AppState::new(
        db,
        livepoll_core::AppConfig {
            default_top_level_limit: config.pagination.default_top_level_limit,
            default_reply_limit: config.pagination.default_reply_limit,
            max_page_limit: config.pagination.max_page_limit,
            session_buffer: config.events.session_buffer,
        },
    );

    let app = livepoll_api::build_router()
        .merge(livepoll_ws::gateway_router())
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&config.server.bind_address).await?;
    tracing::info!(
        bind = %config.server.bind_address,
        database = %config.database.url,
        "livepoll listening"
    );

    let shutdown_signal = async {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("shutting down...");
    };

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    Ok(())
}

/// Create the database's parent directory before sqlx opens the file.
fn ensure_db_dir(database_url: &str) {
    if let Some(db_path) = database_url
        .strip_prefix("sqlite://")
        .and_then(|s| s.split('?').next())
    {
        if let Some(parent) = std::path::Path::new(db_path).parent() {
            if !parent.as_os_str().is_empty() {
                let _ = std::fs::create_dir_all(parent);
            }
        }
    }
}
