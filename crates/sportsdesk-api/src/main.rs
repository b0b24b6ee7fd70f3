use anyhow::Context;
use sportsdesk_api::Server;
use sportsdesk_core::Settings;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let settings = Settings::load(None).context("loading settings")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| settings.log_filter().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        env = %settings.env,
        config_dir = ?settings.config_dir,
        "Settings loaded"
    );

    let server = Server::new(&settings)?;
    server.run().await?;
    Ok(())
}
