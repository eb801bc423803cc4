use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;

use gatehouse::config::Config;
use gatehouse::{server, Gatehouse};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let data_dir = dirs::data_dir()
        .context("cannot determine platform data directory")?
        .join("gatehouse");

    let config = Config::load(&data_dir)?;
    let state = Arc::new(Gatehouse::new(config));

    // Downstream automation routes are mounted by the deployment; the bare
    // binary still gates every non-auth path.
    server::start(state, Router::new()).await?;

    Ok(())
}
