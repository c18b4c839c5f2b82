use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use shopfront_api::{
    app,
    state::{AppState, AuthConfig, Backends, Timeouts},
};
use shopfront_core::Notifier;
use shopfront_order::ReceiptVault;
use shopfront_store::{
    DbClient, DbSettings, LogNotifier, PanelClient, StoreOrderRepository, StorePackageRepository,
    StoreShopInboundRepository, TelegramNotifier,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shopfront_api=debug,shopfront_order=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = shopfront_store::app_config::Config::load().context("Failed to load config")?;
    tracing::info!("Starting Shopfront API on port {}", config.server.port);

    // Database
    let db = DbClient::new(&config.database.url)
        .await
        .context("Failed to connect to database")?;
    db.migrate().await.context("Failed to run migrations")?;

    // Proxy panel: lists inbounds and creates accounts
    let panel = Arc::new(PanelClient::new(&config.panel).context("Failed to build panel client")?);

    let notifier: Arc<dyn Notifier> = match TelegramNotifier::from_config(&config.telegram) {
        Some(bot) => Arc::new(bot),
        None => {
            tracing::warn!("No telegram bot token configured; customer notifications are only logged");
            Arc::new(LogNotifier)
        }
    };

    let backends = Backends {
        packages: Arc::new(StorePackageRepository::new(db.pool.clone())),
        orders: Arc::new(StoreOrderRepository::new(db.pool.clone())),
        inbound_overrides: Arc::new(StoreShopInboundRepository::new(db.pool.clone())),
        inbound_source: panel.clone(),
        settings: Arc::new(DbSettings::new(db.clone(), config.shop)),
        provisioner: panel,
        notifier,
    };

    let timeouts = Timeouts {
        provisioning: Duration::from_secs(config.provisioning.timeout_seconds),
        notifications: Duration::from_secs(config.notifications.timeout_seconds),
    };

    let app_state = AppState::build(
        backends,
        timeouts,
        ReceiptVault::new(&config.receipts.root, config.receipts.max_bytes),
        AuthConfig { secret: config.auth.jwt_secret.clone() },
    );

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
