//! Shared library for tailscan: backward scanning of PHP debug logs for
//! recent, classified errors.

pub mod cache;
pub mod classify;
pub mod config;
pub mod entry;
pub mod error;
pub mod probes;
pub mod reader;
pub mod report;
pub mod scanner;
pub mod stats;

pub use cache::{scan_cache_key, CachedScanner, ScanCache, TtlScanCache};
pub use classify::{Category, Classification, RuleSet};
pub use config::TailscanConfig;
pub use entry::LogEntry;
pub use error::ScanError;
pub use probes::{
    Clock, FixedClock, FixedMemoryProbe, LogOpener, MemoryProbe, SystemClock, SystemLogOpener,
    SystemMemoryProbe,
};
pub use scanner::{LogTailScanner, PartialFailure, ScanRequest, ScanResult};
pub use stats::ScanStatistics;
