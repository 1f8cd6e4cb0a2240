//! Production configuration system
//!
//! Provides centralized configuration management with:
//! - Environment variable support
//! - Config file loading (optional)
//! - Runtime defaults
//! - Validation and type safety

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Logging configuration
    pub logging: LoggingConfig,

    /// Vendor utility invocation configuration
    pub query: QueryConfig,

    /// Fleet check configuration
    pub monitor: MonitorConfig,

    /// Paths configuration
    pub paths: PathsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
    pub output: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Seconds to wait for one vendor utility run before giving up.
    pub timeout_secs: u64,
    pub lmutil_path: String,
    pub rlmutil_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Servers queried at the same time during a fleet check.
    pub max_concurrent_queries: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    pub log_directory: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            logging: LoggingConfig {
                level: "ERROR".to_string(),
                format: "pretty".to_string(),
                output: "console".to_string(),
            },
            query: QueryConfig {
                timeout_secs: 30,
                lmutil_path: "lmutil".to_string(),
                rlmutil_path: "rlmutil".to_string(),
            },
            monitor: MonitorConfig {
                max_concurrent_queries: 8,
            },
            paths: PathsConfig {
                log_directory: PathBuf::from("logs"),
            },
        }
    }
}

impl Config {
    /// Load configuration from environment, file, and defaults
    pub fn load() -> Result<Self> {
        let mut config = Config::default();

        // Try to load from config file if it exists
        let config_paths = [
            PathBuf::from("licmon.toml"),
            PathBuf::from(".licmon.toml"),
            dirs::config_dir()
                .map(|d| d.join("licmon").join("config.toml"))
                .unwrap_or_default(),
        ];

        for path in &config_paths {
            if path.exists() {
                info!(config_file = %path.display(), "Loading configuration from file");
                config = Self::load_from_file(path)?;
                break;
            }
        }

        // Override with environment variables
        config.apply_env_overrides()?;

        // Validate configuration
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from TOML file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        // Logging overrides
        if let Ok(val) = env::var("LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Ok(val) = env::var("LOG_FORMAT") {
            self.logging.format = val;
        }
        if let Ok(val) = env::var("LOG_OUTPUT") {
            self.logging.output = val;
        }

        // Query overrides
        if let Ok(val) = env::var("LICMON_TIMEOUT_SECS") {
            self.query.timeout_secs = val.parse().context("Invalid LICMON_TIMEOUT_SECS")?;
        }
        if let Ok(val) = env::var("LICMON_LMUTIL") {
            self.query.lmutil_path = val;
        }
        if let Ok(val) = env::var("LICMON_RLMUTIL") {
            self.query.rlmutil_path = val;
        }

        // Monitor overrides
        if let Ok(val) = env::var("LICMON_MAX_CONCURRENT") {
            self.monitor.max_concurrent_queries =
                val.parse().context("Invalid LICMON_MAX_CONCURRENT")?;
        }

        // Path overrides
        if let Ok(val) = env::var("LICMON_LOG_DIR") {
            self.paths.log_directory = PathBuf::from(val);
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.query.timeout_secs == 0 {
            return Err(anyhow::anyhow!("Query timeout must be greater than 0"));
        }

        if self.query.timeout_secs > 300 {
            warn!(
                timeout_secs = self.query.timeout_secs,
                "Query timeout is very long, dead servers will be slow to detect"
            );
        }

        if self.query.lmutil_path.is_empty() || self.query.rlmutil_path.is_empty() {
            return Err(anyhow::anyhow!("Vendor utility paths cannot be empty"));
        }

        if self.monitor.max_concurrent_queries == 0 {
            return Err(anyhow::anyhow!(
                "Max concurrent queries must be greater than 0"
            ));
        }

        // File logging needs its directory in place before the first write
        if self.logging.output != "console" && !self.paths.log_directory.exists() {
            fs::create_dir_all(&self.paths.log_directory)
                .context("Failed to create log directory")?;
        }

        Ok(())
    }
}

/// Global configuration instance
static CONFIG: OnceLock<Config> = OnceLock::new();

/// Get the global configuration instance
pub fn get_config() -> &'static Config {
    CONFIG.get_or_init(|| Config::load().expect("Failed to load configuration"))
}
