//! Exit codes for tailscanctl

/// Scan succeeded, or there was nothing to show (no log yet)
pub const EXIT_SUCCESS: i32 = 0;

/// Scan refused: resources, size, permissions or bad bounds
pub const EXIT_SCAN_WARNING: i32 = 1;

/// Configuration could not be loaded or written
pub const EXIT_CONFIG_ERROR: i32 = 2;
