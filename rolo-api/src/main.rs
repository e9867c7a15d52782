//! # Rolo API Server
//!
//! HTTP entry point for the Rolo access-control core: community creation,
//! collaborator management, invites, and subscription seat limits.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p rolo-api
//! ```

use rolo_api::{
    app::{build_router, AppState},
    config::Config,
};
use rolo_core::{
    db::{migrations::run_migrations, pool},
    notify::{NoopNotifier, Notifier, WebhookNotifier},
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rolo_api=debug,rolo_core=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Rolo API Server v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;

    let db = pool::create_pool(pool::DatabaseConfig {
        url: config.database.url.clone(),
        max_connections: config.database.max_connections,
    })
    .await?;

    run_migrations(&db).await?;

    let notifier: Arc<dyn Notifier> = match &config.notify.webhook_url {
        Some(url) => {
            tracing::info!(endpoint = %url, "invite delivery via webhook");
            Arc::new(
                WebhookNotifier::new(url, config.notify.timeout_seconds)
                    .map_err(|e| anyhow::anyhow!("failed to build notifier: {e}"))?,
            )
        }
        None => {
            tracing::info!("NOTIFY_WEBHOOK_URL not set; invite delivery disabled");
            Arc::new(NoopNotifier)
        }
    };

    let bind_address = config.bind_address();
    let state = AppState::new(db.clone(), config, notifier);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool::close_pool(db).await;
    tracing::info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to install shutdown handler: {}", e);
        return;
    }
    tracing::info!("Shutdown signal received, draining...");
}
