use std::net::SocketAddr;

use vapeshop_backend::{api, config, telemetry};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    telemetry::init();

    let config = config::Config::from_env()?;

    tracing::info!("Starting storefront backend");
    tracing::info!("Environment: {}", config.server.environment);
    tracing::info!("Slip provider: {}", config.slip_provider.base_url);
    tracing::info!("Slip settings source: {:?}", config.slip_settings);
    tracing::info!("LINE login enabled: {}", config.line.is_some());

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let state = api::AppState::from_config(config)?;
    let app = api::router(state);

    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
