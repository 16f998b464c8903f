use std::time::Duration;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use report_common::Config;
use report_janitor::Janitor;
use rtdb_client::RtdbClient;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("report_janitor=info".parse()?)
                .add_directive("report_common=info".parse()?),
        )
        .init();

    info!("Report janitor starting...");

    let config = Config::from_env()?;
    config.log_redacted();

    let client = RtdbClient::new(
        &config.rtdb_url,
        config.rtdb_auth.as_deref(),
        Duration::from_secs(config.http_timeout_secs),
    )?;

    let janitor = Janitor::from_config(Box::new(client), &config);
    let stats = janitor.run().await?;

    info!("Janitor complete. {stats}");
    Ok(())
}
