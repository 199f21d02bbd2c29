//! Command-line definition

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tailscan_common::ScanRequest;

#[derive(Parser, Debug)]
#[command(name = "tailscanctl")]
#[command(about = "Scan a PHP debug log for recent, classified errors", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Config file (default: ~/.config/tailscan/config.toml, then /etc/tailscan/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Debug-level diagnostics on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scan the debug log
    Scan(ScanArgs),

    /// Print the effective configuration as TOML
    Config,
}

#[derive(Args, Debug, Default, Clone)]
pub struct ScanArgs {
    /// Log file to scan instead of the configured one
    #[arg(long)]
    pub log_path: Option<PathBuf>,

    /// Lookback window in hours
    #[arg(long)]
    pub window_hours: Option<u32>,

    /// Stop after this many log entries
    #[arg(long)]
    pub max_lines: Option<usize>,

    /// Refuse files larger than this many bytes
    #[arg(long)]
    pub max_file_size: Option<u64>,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,

    /// Bypass the result cache
    #[arg(long)]
    pub no_cache: bool,

    /// Rescan every N seconds until interrupted
    #[arg(long, value_name = "SECS")]
    pub watch: Option<u64>,
}

impl ScanArgs {
    /// Override request bounds with whatever was given on the command line
    pub fn apply(&self, request: &mut ScanRequest) {
        if let Some(path) = &self.log_path {
            request.log_path = Some(path.clone());
        }
        if let Some(hours) = self.window_hours {
            request.window_hours = hours;
        }
        if let Some(lines) = self.max_lines {
            request.max_lines = lines;
        }
        if let Some(bytes) = self.max_file_size {
            request.max_file_size_bytes = bytes;
        }
    }
}
