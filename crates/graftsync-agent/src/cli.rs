use clap::Parser;
use std::path::PathBuf;

/// Command line for the `graftsync` binary.
#[derive(Parser, Debug)]
#[command(name = "graftsync")]
#[command(about = "Watch storage roots and route file changes", long_about = None)]
pub struct Cli {
    /// Configuration file, `.toml` or `.json`.
    #[arg(short, long, env = "GRAFTSYNC_CONFIG", default_value = "/etc/graftsync/graftsync.toml")]
    pub config: PathBuf,

    /// Emit logs as JSON lines.
    #[arg(long)]
    pub log_json: bool,

    /// Validate the configuration and exit.
    #[arg(long)]
    pub check: bool,
}
