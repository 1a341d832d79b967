//! cloud-relay: customer-facing relay for the canteen local hub

use cloud_relay::{AppState, Config};
use tokio_util::sync::CancellationToken;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // Load .env file
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cloud_relay=info,tower_http=info".into()),
        )
        .init();

    let config = Config::from_env();

    tracing::info!(
        env = %config.environment,
        offline_mode = %config.offline_mode,
        "Starting cloud-relay"
    );

    let http_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&http_addr).await?;

    let state = AppState::new(config, CancellationToken::new());
    cloud_relay::serve(listener, state).await?;

    Ok(())
}
