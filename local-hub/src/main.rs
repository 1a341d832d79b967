use local_hub::{Config, Server, print_banner, setup_environment};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. .env, then configuration
    let _ = dotenvy::dotenv();
    let config = Config::from_env();

    // 2. Logging
    setup_environment(&config);
    print_banner();

    tracing::info!(
        port = config.http_port,
        cloud = config.cloud_ws_url.as_deref().unwrap_or("disabled"),
        environment = %config.environment,
        "Local hub starting..."
    );

    // 3. Serve until Ctrl-C
    if let Err(e) = Server::new(config).run().await {
        tracing::error!("Server error: {}", e);
        return Err(e.into());
    }

    Ok(())
}
