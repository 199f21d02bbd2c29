//! Log Tail Scanner
//!
//! Walks a debug log backward from its end and returns recent, classified
//! error entries.
//!
//! Guards run before any read, in order: path resolution, memory headroom,
//! file size, readability. The scan then stops at the first of:
//! - an entry older than the cutoff (the log is append-only, so nothing
//!   further back can qualify)
//! - `max_lines` pattern-matching lines inspected (`truncated = true`)
//! - start of file
//! - an I/O error, which yields a partial result instead of an error

use std::io::{Read, Seek};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::classify::RuleSet;
use crate::config::{ScannerConfig, TailscanConfig};
use crate::entry::{parse_line, LogEntry};
use crate::error::ScanError;
use crate::probes::{
    Clock, LogOpener, MemoryProbe, SystemClock, SystemLogOpener, SystemMemoryProbe,
};
use crate::reader::ReverseLineReader;
use crate::stats::ScanStatistics;

/// Per-invocation scan bounds
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScanRequest {
    /// Explicit log path; overrides the configured one
    pub log_path: Option<PathBuf>,
    pub window_hours: u32,
    pub max_lines: usize,
    pub max_file_size_bytes: u64,
}

impl ScanRequest {
    pub fn from_config(config: &ScannerConfig) -> Self {
        Self {
            log_path: None,
            window_hours: config.window_hours,
            max_lines: config.max_lines,
            max_file_size_bytes: config.max_file_size_bytes,
        }
    }

    pub fn validate(&self) -> Result<(), ScanError> {
        if self.max_lines == 0 {
            return Err(ScanError::InvalidRequest(
                "max_lines must be at least 1".to_string(),
            ));
        }
        if self.max_file_size_bytes == 0 {
            return Err(ScanError::InvalidRequest(
                "max_file_size_bytes must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// I/O failure after the scan started
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialFailure {
    pub message: String,
    /// Bytes of the file never reached
    pub bytes_unread: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResult {
    pub log_path: PathBuf,
    pub scanned_at: DateTime<Utc>,
    pub cutoff: DateTime<Utc>,
    pub window_hours: u32,
    /// Newest first
    pub entries: Vec<LogEntry>,
    pub statistics: ScanStatistics,
    /// `max_lines` was reached before the window was exhausted
    pub truncated: bool,
    /// Pattern-matching lines inspected
    pub lines_read: usize,
    pub bytes_read: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partial_failure: Option<PartialFailure>,
}

impl ScanResult {
    pub fn is_partial(&self) -> bool {
        self.partial_failure.is_some()
    }
}

/// Stateless between calls; construct once and share.
pub struct LogTailScanner {
    config: ScannerConfig,
    rules: RuleSet,
    clock: Arc<dyn Clock>,
    memory: Arc<dyn MemoryProbe>,
    opener: Arc<dyn LogOpener>,
}

impl LogTailScanner {
    pub fn new(config: ScannerConfig, rules: RuleSet) -> Self {
        let memory = SystemMemoryProbe::new(config.memory_limit_bytes);
        Self {
            config,
            rules,
            clock: Arc::new(SystemClock),
            memory: Arc::new(memory),
            opener: Arc::new(SystemLogOpener),
        }
    }

    pub fn from_config(config: &TailscanConfig) -> Self {
        Self::new(config.scanner.clone(), RuleSet::from_config(&config.rules))
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn with_memory_probe(mut self, probe: impl MemoryProbe + 'static) -> Self {
        self.memory = Arc::new(probe);
        self
    }

    pub fn with_opener(mut self, opener: impl LogOpener + 'static) -> Self {
        self.opener = Arc::new(opener);
        self
    }

    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    /// Request defaults taken from this scanner's config
    pub fn default_request(&self) -> ScanRequest {
        ScanRequest::from_config(&self.config)
    }

    /// Explicit path (request, then config) first, then the default path
    pub fn candidate_paths(&self, request: &ScanRequest) -> Vec<PathBuf> {
        let mut candidates = Vec::new();
        if let Some(explicit) = request.log_path.as_ref().or(self.config.log_path.as_ref()) {
            candidates.push(explicit.clone());
        }
        if !candidates.contains(&self.config.default_log_path) {
            candidates.push(self.config.default_log_path.clone());
        }
        candidates
    }

    pub fn resolve_path(&self, request: &ScanRequest) -> Result<PathBuf, ScanError> {
        let candidates = self.candidate_paths(request);
        match candidates.iter().find(|p| p.is_file()) {
            Some(path) => {
                debug!(path = %path.display(), "resolved log path");
                Ok(path.clone())
            }
            None => Err(ScanError::NotFound {
                searched: candidates,
            }),
        }
    }

    pub fn scan(&self, request: &ScanRequest) -> Result<ScanResult, ScanError> {
        request.validate()?;

        let path = self.resolve_path(request)?;
        self.check_memory()?;
        let size = self.check_size(&path, request.max_file_size_bytes)?;
        let file = self.opener.open(&path).map_err(|source| {
            warn!(path = %path.display(), error = %source, "log file not readable");
            ScanError::NotReadable {
                path: path.clone(),
                source,
            }
        })?;

        Ok(self.scan_source(file, path, size, request))
    }

    fn check_memory(&self) -> Result<(), ScanError> {
        let required = self.config.memory_safety_margin_bytes;
        match self.memory.headroom_bytes() {
            Some(headroom) if headroom < required => {
                warn!(headroom, required, "insufficient memory to scan log");
                Err(ScanError::InsufficientResources {
                    headroom_bytes: headroom,
                    required_bytes: required,
                })
            }
            _ => Ok(()),
        }
    }

    fn check_size(&self, path: &Path, max_bytes: u64) -> Result<u64, ScanError> {
        let size = self.opener.file_len(path).map_err(|source| {
            warn!(path = %path.display(), error = %source, "cannot stat log file");
            ScanError::NotReadable {
                path: path.to_path_buf(),
                source,
            }
        })?;

        if size == 0 {
            debug!(path = %path.display(), "log file is empty");
            return Err(ScanError::NotFound {
                searched: vec![path.to_path_buf()],
            });
        }
        if size > max_bytes {
            warn!(size, max_bytes, "log file exceeds size limit");
            return Err(ScanError::FileTooLarge {
                size_bytes: size,
                max_bytes,
            });
        }
        Ok(size)
    }

    /// Scan the first `size` bytes of an already-opened source, skipping the
    /// guards.
    ///
    /// Bytes appended after the size was taken are ignored. A source shorter
    /// than `size` and any other I/O error end the scan early and are
    /// reported in `partial_failure`.
    pub fn scan_source<R: Read + Seek>(
        &self,
        source: R,
        path: PathBuf,
        size: u64,
        request: &ScanRequest,
    ) -> ScanResult {
        let scanned_at = self.clock.now();
        let cutoff = scanned_at
            .checked_sub_signed(Duration::hours(i64::from(request.window_hours)))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);

        let mut entries = Vec::new();
        let mut lines_read = 0usize;
        let mut truncated = false;
        let mut failure: Option<String> = None;

        let mut reader =
            ReverseLineReader::with_range(source, 0, size, self.config.read_block_size);

        for line in reader.by_ref() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    failure = Some(e.to_string());
                    break;
                }
            };

            let Some(mut entry) = parse_line(&line) else {
                continue;
            };
            lines_read += 1;

            if entry.timestamp < cutoff {
                debug!(lines_read, "reached window boundary");
                break;
            }

            if entry.has_relevant_level() {
                if let Some(class) = self.rules.classify(&entry) {
                    entry.classification = Some(class);
                    entries.push(entry);
                }
            }

            if lines_read >= request.max_lines {
                truncated = true;
                break;
            }
        }

        let bytes_read = reader.bytes_read();
        let bytes_unread = reader.bytes_unread();

        let partial_failure = failure.map(|message| {
            warn!(path = %path.display(), %message, collected = entries.len(), "log scan interrupted");
            PartialFailure {
                message,
                bytes_unread,
            }
        });

        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        let statistics = ScanStatistics::from_entries(&entries);

        info!(
            path = %path.display(),
            entries = entries.len(),
            lines_read,
            bytes_read,
            truncated,
            "log scan complete"
        );

        ScanResult {
            log_path: path,
            scanned_at,
            cutoff,
            window_hours: request.window_hours,
            entries,
            statistics,
            truncated,
            lines_read,
            bytes_read,
            partial_failure,
        }
    }
}
