use clap::Parser;
use sweeter_backend::{Config, start_server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    tracing::info!(
        "starting sweeter-backend v{} (db: {})",
        env!("CARGO_PKG_VERSION"),
        config.database_url
    );

    start_server(config).await
}
