use caasper::api::{self, ServerConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), api::ServerError> {
    // .env is optional; the environment itself always wins.
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = ServerConfig::from_env();
    match &config.sentry_key {
        Some(_) => info!("telemetry key present, error reports will be forwarded"),
        None => info!("no telemetry key configured"),
    }

    api::serve(config).await
}
