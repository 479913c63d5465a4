//! Command-line and environment configuration for the API server.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use anyhow::{Result, ensure};
use clap::Parser;

use crate::state::SourceId;

/// Default backing file for every variant.
pub const DEFAULT_DATA_FILE: &str = "data/enhanced_business_data.csv";

#[derive(Parser, Debug, Clone)]
#[command(name = "bizdash")]
#[command(about = "Business metrics API serving filtered and aggregated datasets")]
#[command(version)]
pub struct Args {
    /// Address to bind
    #[arg(long, env = "BIZDASH_HOST", default_value = "0.0.0.0")]
    pub host: IpAddr,

    /// Port for the HTTP server
    #[arg(short, long, env = "BIZDASH_PORT", default_value_t = 5000)]
    pub port: u16,

    /// Dataset behind the /api sales routes (.csv, .json or .parquet)
    #[arg(long, env = "BIZDASH_SALES_DATA", default_value = DEFAULT_DATA_FILE)]
    pub sales_data: PathBuf,

    /// Dataset behind the /api/google and /api/sap routes
    #[arg(long, env = "BIZDASH_BUSINESS_DATA", default_value = DEFAULT_DATA_FILE)]
    pub business_data: PathBuf,

    /// Reload the dataset on every request instead of caching it
    #[arg(long, env = "BIZDASH_NO_CACHE")]
    pub no_cache: bool,

    /// Simulated KPI jitter as a fraction (0.02 = ±2%); 0 disables it
    #[arg(long, env = "BIZDASH_KPI_JITTER", default_value_t = 0.0)]
    pub kpi_jitter: f64,

    /// Seed for KPI jitter and synthetic placeholder scores
    #[arg(long, env = "BIZDASH_SEED")]
    pub seed: Option<u64>,
}

impl Args {
    /// Validate the arguments and turn them into a [`ServerConfig`].
    pub fn into_config(self) -> Result<ServerConfig> {
        ensure!(
            (0.0..1.0).contains(&self.kpi_jitter),
            "--kpi-jitter must be in [0, 1), got {}",
            self.kpi_jitter
        );
        Ok(ServerConfig {
            addr: SocketAddr::new(self.host, self.port),
            sources: vec![
                (SourceId::Sales, self.sales_data),
                (SourceId::Business, self.business_data),
            ],
            cache: !self.no_cache,
            kpi_jitter: self.kpi_jitter,
            seed: self.seed,
        })
    }
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    /// Backing file per data source.
    pub sources: Vec<(SourceId, PathBuf)>,
    /// Keep loaded tables in memory until the file changes.
    pub cache: bool,
    /// KPI jitter spread; 0 disables the decorator.
    pub kpi_jitter: f64,
    pub seed: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 5000),
            sources: vec![
                (SourceId::Sales, PathBuf::from(DEFAULT_DATA_FILE)),
                (SourceId::Business, PathBuf::from(DEFAULT_DATA_FILE)),
            ],
            cache: true,
            kpi_jitter: 0.0,
            seed: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_listen_on_port_5000() {
        let config = Args::try_parse_from(["bizdash"]).unwrap().into_config().unwrap();
        assert_eq!(config.addr.port(), 5000);
        assert!(config.cache);
        assert_eq!(config.kpi_jitter, 0.0);
    }

    #[test]
    fn flags_override_defaults() {
        let config = Args::try_parse_from([
            "bizdash",
            "--port",
            "8080",
            "--business-data",
            "/tmp/biz.parquet",
            "--no-cache",
            "--kpi-jitter",
            "0.02",
            "--seed",
            "7",
        ])
        .unwrap()
        .into_config()
        .unwrap();
        assert_eq!(config.addr.port(), 8080);
        assert!(!config.cache);
        assert_eq!(config.seed, Some(7));
        assert!(config
            .sources
            .contains(&(SourceId::Business, PathBuf::from("/tmp/biz.parquet"))));
    }

    #[test]
    fn rejects_out_of_range_jitter() {
        let args = Args::try_parse_from(["bizdash", "--kpi-jitter", "1.5"]).unwrap();
        assert!(args.into_config().is_err());
    }
}
