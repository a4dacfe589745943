use alm_settings_api::{app, config, is_production, AppState};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = config::config();
    tracing::info!("Starting ALM Settings API in {:?} mode ({:?} store)", config.environment, config.store.backend);

    if config.security.jwt_secret.is_empty() {
        if is_production!() {
            anyhow::bail!("JWT_SECRET must be set in production");
        }
        tracing::warn!("JWT_SECRET is empty; every authenticated request will be rejected");
    }

    let state = AppState::from_config(config).await?;

    let bind_addr = format!("0.0.0.0:{}", config.api.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| anyhow::anyhow!("failed to bind {}: {}", bind_addr, e))?;

    tracing::info!("ALM Settings API listening on http://{}", bind_addr);

    axum::serve(listener, app(state, config)).await?;
    Ok(())
}
