use anyhow::Result;
use clap::Parser;

use bizdash::api;
use bizdash::config::Args;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Args::parse().into_config()?;
    api::run_server(config).await
}
