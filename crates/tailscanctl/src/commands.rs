//! Command implementations

use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use serde_json::json;
use tracing::debug;

use tailscan_common::report::{render_error, render_text};
use tailscan_common::{
    CachedScanner, LogTailScanner, ScanError, ScanRequest, ScanResult, TailscanConfig,
    TtlScanCache,
};

use crate::cli::{Cli, Commands, ScanArgs};
use crate::errors::{EXIT_SCAN_WARNING, EXIT_SUCCESS};

/// Dispatch a parsed command line. `Err` means a configuration problem.
pub fn run(cli: &Cli) -> Result<i32> {
    let config = TailscanConfig::load(cli.config.as_deref())?;
    debug!(?config, "configuration loaded");

    match &cli.command {
        Commands::Scan(args) => scan(&config, args),
        Commands::Config => {
            print!("{}", config.to_toml()?);
            Ok(EXIT_SUCCESS)
        }
    }
}

/// Run one scan, or keep rescanning with `--watch`
pub fn scan(config: &TailscanConfig, args: &ScanArgs) -> Result<i32> {
    let scanner = LogTailScanner::from_config(config);
    let mut request = scanner.default_request();
    args.apply(&mut request);

    let use_cache = config.cache.enabled && !args.no_cache;
    let runner = ScanRunner::new(scanner, use_cache.then(|| TtlScanCache::from_config(&config.cache)));

    let Some(interval) = args.watch else {
        return render(runner.scan(&request), args.json);
    };

    let interval = Duration::from_secs(interval.max(1));
    loop {
        render(runner.scan(&request), args.json)?;
        thread::sleep(interval);
    }
}

enum ScanRunner {
    Direct(LogTailScanner),
    Cached(CachedScanner<TtlScanCache>),
}

impl ScanRunner {
    fn new(scanner: LogTailScanner, cache: Option<TtlScanCache>) -> Self {
        match cache {
            Some(cache) => ScanRunner::Cached(CachedScanner::new(scanner, cache)),
            None => ScanRunner::Direct(scanner),
        }
    }

    fn scan(&self, request: &ScanRequest) -> Result<ScanResult, ScanError> {
        match self {
            ScanRunner::Direct(scanner) => scanner.scan(request),
            ScanRunner::Cached(cached) => cached.scan(request),
        }
    }
}

/// Print the outcome and return its exit code
pub fn render(outcome: Result<ScanResult, ScanError>, as_json: bool) -> Result<i32> {
    match outcome {
        Ok(result) => {
            if as_json {
                let text = serde_json::to_string_pretty(&result)
                    .context("Failed to serialize scan result")?;
                println!("{}", text);
            } else {
                print!("{}", render_text(&result));
            }
            Ok(EXIT_SUCCESS)
        }
        Err(error) => {
            if as_json {
                let body = json!({
                    "error": error.kind(),
                    "message": error.to_string(),
                    "informational": error.is_informational(),
                });
                println!("{}", serde_json::to_string_pretty(&body)?);
            } else if error.is_informational() {
                println!("{}", render_error(&error));
            } else {
                eprintln!("{}", render_error(&error));
            }
            Ok(exit_code(&error))
        }
    }
}

pub fn exit_code(error: &ScanError) -> i32 {
    if error.is_informational() {
        EXIT_SUCCESS
    } else {
        EXIT_SCAN_WARNING
    }
}
