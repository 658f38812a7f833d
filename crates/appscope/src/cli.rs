//! CLI definition

use std::path::PathBuf;

use clap::Parser;

/// Appscope - mobile installer package inspection service
#[derive(Debug, Parser)]
#[command(name = "appscope")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (TOML or YAML); searched upward from the working
    /// directory when omitted
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Listen address, overriding `server.bind`
    #[arg(short, long, env = "APPSCOPE_BIND")]
    pub bind: Option<String>,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    pub print_config: bool,
}
