//! Binary entrypoint for the Umbrella API server.
use anyhow::Context;
use tracing_subscriber::EnvFilter;
use umbrella_api::{run, ServerConfig, DEFAULT_LOG_FILTER};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let config = ServerConfig::from_env().context("loading configuration")?;
    tracing::info!(
        version = umbrella_core::UMBRELLA_VERSION,
        addr = %config.addr,
        text_model = %config.models.text,
        review_model = %config.models.review,
        "Umbrella starting"
    );

    run(config).await.context("server exited")
}
