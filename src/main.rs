use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing_subscriber::prelude::*;

use easycredit_connector::adapters::{CommerceToolsClient, EasyCreditClient};
use easycredit_connector::config::Config;
use easycredit_connector::ports::CommerceStore;
use easycredit_connector::services::payments::{CONFIG_CONTAINER, CONFIG_KEY};
use easycredit_connector::services::{NotificationService, PaymentService};
use easycredit_connector::{AppState, create_app};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // Setup logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let store: Arc<dyn CommerceStore> = Arc::new(CommerceToolsClient::new(
        config.ct_api_url.clone(),
        &config.ct_project_key,
        &config.ct_auth_token,
    ));
    let gateway = Arc::new(EasyCreditClient::new(
        config.ec_api_base_url.clone(),
        &config.ec_webshop_id,
        &config.ec_api_password,
    ));
    tracing::info!(base_url = %config.ec_api_base_url, "easyCredit client initialized");

    // Register this connector's public URL so checkout payloads can point
    // their callbacks at it.
    if let Some(base_url) = &config.connector_base_url {
        store
            .upsert_custom_object(CONFIG_CONTAINER, CONFIG_KEY, serde_json::json!(base_url))
            .await?;
        tracing::info!(base_url, "connector URL registered");
    }

    let state = AppState {
        payments: Arc::new(PaymentService::new(store.clone(), gateway.clone())),
        notifications: Arc::new(NotificationService::new(store, gateway.clone())),
        gateway,
        web_shop_id: config.ec_webshop_id.clone(),
        widget_enabled: config.widget_enabled,
    };

    let app = create_app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    tracing::info!("listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
