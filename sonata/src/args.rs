use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

/// Sonata music generation server
#[derive(Debug, Parser)]
#[command(name = "sonata", about = "Text-to-music generation over HTTP")]
pub struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "sonata.toml", env = "SONATA_CONFIG")]
    pub config: PathBuf,

    /// Override the listen address
    #[arg(long, env = "SONATA_LISTEN")]
    pub listen: Option<SocketAddr>,
}
