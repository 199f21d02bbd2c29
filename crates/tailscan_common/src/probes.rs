//! Injected collaborators: wall clock, memory headroom and file access
//!
//! The scanner never reads the clock, system memory or the filesystem
//! metadata directly, so tests can pin "now", the available headroom and
//! access failures.

use std::fs::{self, File};
use std::io;
use std::path::Path;

use chrono::{DateTime, Utc};
use sysinfo::System;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock frozen at a given instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

pub trait MemoryProbe: Send + Sync {
    /// Bytes still available to this process, `None` if unknown/unlimited
    fn headroom_bytes(&self) -> Option<u64>;
}

/// Headroom from the live system via `sysinfo`
///
/// limit = configured limit, else cgroup limit, else total RAM.
/// usage = resident memory of the current process.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemMemoryProbe {
    pub limit_bytes: Option<u64>,
}

impl SystemMemoryProbe {
    pub fn new(limit_bytes: Option<u64>) -> Self {
        Self { limit_bytes }
    }
}

impl MemoryProbe for SystemMemoryProbe {
    fn headroom_bytes(&self) -> Option<u64> {
        let mut sys = System::new();
        sys.refresh_memory();

        let limit = self
            .limit_bytes
            .or_else(|| sys.cgroup_limits().map(|c| c.total_memory))
            .or_else(|| Some(sys.total_memory()).filter(|total| *total > 0))?;

        let pid = sysinfo::get_current_pid().ok()?;
        let usage = if sys.refresh_process(pid) {
            sys.process(pid).map(|p| p.memory()).unwrap_or(0)
        } else {
            0
        };

        Some(limit.saturating_sub(usage))
    }
}

/// Fixed headroom for tests
#[derive(Debug, Clone, Copy)]
pub struct FixedMemoryProbe(pub Option<u64>);

impl MemoryProbe for FixedMemoryProbe {
    fn headroom_bytes(&self) -> Option<u64> {
        self.0
    }
}

/// Size lookup and open for log files
pub trait LogOpener: Send + Sync {
    fn file_len(&self, path: &Path) -> io::Result<u64>;
    fn open(&self, path: &Path) -> io::Result<File>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemLogOpener;

impl LogOpener for SystemLogOpener {
    fn file_len(&self, path: &Path) -> io::Result<u64> {
        fs::metadata(path).map(|m| m.len())
    }

    fn open(&self, path: &Path) -> io::Result<File> {
        File::open(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_fixed_clock() {
        let at = Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap();
        assert_eq!(FixedClock(at).now(), at);
    }

    #[test]
    fn test_configured_limit_bounds_headroom() {
        let probe = SystemMemoryProbe::new(Some(1024));
        if let Some(headroom) = probe.headroom_bytes() {
            assert!(headroom <= 1024);
        }
    }
}
