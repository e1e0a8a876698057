use anyhow::Context;
use db::DBService;
use server::{AppState, app, config::Config};
use services::services::database_validator::DatabaseValidator;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    utils::logging::init_tracing("info");

    let db = DBService::new(&config.database_url)
        .await
        .with_context(|| format!("failed to open {}", config.database_url))?;

    let validation = DatabaseValidator::new(db.pool.clone()).validate().await?;
    if !validation.is_ok() {
        error!("{}", validation.summary());
        anyhow::bail!(validation.summary());
    }
    info!("{}", validation.summary());

    let shutdown = CancellationToken::new();
    let app = app(AppState::new(db, shutdown.clone()));

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Failed to listen for shutdown signal");
            }
            info!("Shutting down");
            shutdown.cancel();
        })
        .await?;

    Ok(())
}
