use anyhow::Result;
use voices_api::{build_app, AppConfig};
use voices_observability::init_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing("voices_api");

    let config = AppConfig::from_env()?;
    let bind = config.bind.clone();

    let app = build_app(config).await?;

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    tracing::info!(bind = %bind, "voices api started");

    axum::serve(listener, app).await?;
    Ok(())
}
