use clap::Parser;
use forecast_server::{router, AppState, ServerConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file (optional - won't fail if missing)
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "forecast_server=info,forecast_core=info,tower_http=info".into()),
        )
        .init();

    let config = ServerConfig::parse();
    let addr = config.socket_addr()?;
    let state = AppState::from_config(&config)?;
    let app = router(state, config.cors_layer());

    tracing::info!(
        budget_secs = config.budget_secs,
        fast_mode_window = config.fast_mode_window,
        "forecast_server v{} listening on {}",
        env!("CARGO_PKG_VERSION"),
        addr
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
