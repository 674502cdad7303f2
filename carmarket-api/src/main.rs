use carmarket_api::config::AppConfig;
use carmarket_api::{build_router, AppState, SERVICE_NAME};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    carmarket_shared::middleware::init_tracing(SERVICE_NAME);

    // Load configuration
    let config = AppConfig::load()?;
    let port = config.port;

    // Initialize Prometheus metrics
    let metrics_handle = carmarket_shared::middleware::init_metrics()?;

    // Build shared state
    let state = AppState::build(config).await?.with_metrics(metrics_handle);

    let app = build_router(state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = %addr, "{SERVICE_NAME} starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
