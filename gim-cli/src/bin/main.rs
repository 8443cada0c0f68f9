use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::json;
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gim_cli::{execute, version, Cli};
use gim_storage::connect;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.config.resolve()?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.rust_log))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    debug!("{:#?}", &config);
    info!("{}", version());

    let store = connect(
        &config.database_url,
        config.max_size,
        config.min_idle,
        config.run_migrations,
    )
    .await
    .context("could not open the group store")?;

    match execute(store.as_ref(), cli.command).await {
        Ok(value) => {
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(())
        }
        Err(err) => {
            error!("{:?}", err);
            eprintln!(
                "{}",
                json!({
                    "id": err.id(),
                    "status": err.status().as_u16(),
                    "message": err.to_string(),
                })
            );
            process::exit(1);
        }
    }
}
