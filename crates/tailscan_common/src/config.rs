//! Tailscan Configuration
//!
//! Scanner bounds, classification keywords and cache settings.
//! Config file: ~/.config/tailscan/config.toml or /etc/tailscan/config.toml

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable that overrides `scanner.log_path`
pub const LOG_PATH_ENV: &str = "TAILSCAN_LOG_PATH";

/// Scanner bounds and log location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Explicitly configured log path, preferred over the default
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_path: Option<PathBuf>,

    /// Conventional location used when no explicit path exists
    pub default_log_path: PathBuf,

    /// Lookback window in hours
    pub window_hours: u32,

    /// Maximum number of pattern-matching lines inspected per scan
    pub max_lines: usize,

    /// Files larger than this are refused without reading
    pub max_file_size_bytes: u64,

    /// Required memory headroom before a scan starts
    pub memory_safety_margin_bytes: u64,

    /// Memory limit used for the headroom check. Detected when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_limit_bytes: Option<u64>,

    /// Block size for the backward reader
    pub read_block_size: usize,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            log_path: None,
            default_log_path: PathBuf::from("wp-content/debug.log"),
            window_hours: 24,
            max_lines: 1000,
            max_file_size_bytes: 50 * 1024 * 1024,
            memory_safety_margin_bytes: 10 * 1024 * 1024,
            memory_limit_bytes: None,
            read_block_size: 8192,
        }
    }
}

/// Keywords feeding the ordered classification rules
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// Product name matched by the plugin rule
    pub product_name: String,

    /// Business nouns matched by the plugin rule
    pub business_keywords: Vec<String>,

    /// Install path fragment matched against message and source file
    pub install_path_fragment: String,

    /// Payment processor names
    pub gateways: Vec<String>,

    /// Checkout / payment form / AJAX endpoint keywords
    pub flow_keywords: Vec<String>,

    /// Memory and execution time keywords
    pub resource_keywords: Vec<String>,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            product_name: "charitable".to_string(),
            business_keywords: vec!["donation".to_string(), "campaign".to_string()],
            install_path_fragment: "plugins/charitable".to_string(),
            gateways: [
                "stripe",
                "paypal",
                "square",
                "braintree",
                "authorize.net",
                "mollie",
                "razorpay",
                "gocardless",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            flow_keywords: [
                "checkout",
                "payment form",
                "payment_form",
                "make_donation",
                "charitable_ajax",
                "wp_ajax_charitable",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            resource_keywords: ["allowed memory size", "memory", "execution time"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Scan result cache settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub ttl_secs: u64,
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: 300,
            capacity: 32,
        }
    }
}

/// Main tailscan configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TailscanConfig {
    #[serde(default)]
    pub scanner: ScannerConfig,

    #[serde(default)]
    pub rules: RulesConfig,

    #[serde(default)]
    pub cache: CacheConfig,
}

impl TailscanConfig {
    /// Get default user config path: ~/.config/tailscan/config.toml
    pub fn user_config_path() -> Result<PathBuf> {
        if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
            return Ok(PathBuf::from(xdg).join("tailscan").join("config.toml"));
        }

        let home = std::env::var("HOME").context("Cannot determine home directory")?;
        Ok(Path::new(&home)
            .join(".config")
            .join("tailscan")
            .join("config.toml"))
    }

    /// Get system config path: /etc/tailscan/config.toml
    pub fn system_config_path() -> PathBuf {
        PathBuf::from("/etc/tailscan/config.toml")
    }

    /// Load configuration
    ///
    /// Priority:
    /// 1. Explicit path (must exist)
    /// 2. User config (~/.config/tailscan/config.toml)
    /// 3. System config (/etc/tailscan/config.toml)
    /// 4. Defaults
    ///
    /// `TAILSCAN_LOG_PATH` is applied on top of whichever source won.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::load_from(path)?,
            None => Self::load_discovered()?,
        };

        if let Ok(path) = std::env::var(LOG_PATH_ENV) {
            if !path.trim().is_empty() {
                config.scanner.log_path = Some(PathBuf::from(path));
            }
        }

        Ok(config)
    }

    fn load_discovered() -> Result<Self> {
        if let Ok(user_path) = Self::user_config_path() {
            if user_path.exists() {
                return Self::load_from(&user_path);
            }
        }

        let system_path = Self::system_config_path();
        if system_path.exists() {
            return Self::load_from(&system_path);
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::parse(&contents).with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Parse configuration from TOML text
    pub fn parse(contents: &str) -> Result<Self> {
        let config: TailscanConfig = toml::from_str(contents)?;
        Ok(config)
    }

    /// Serialize to TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }
}
