//! Environment-variable configuration.
//!
//! All settings come from the process environment with defaults that match
//! a production deployment; `Config::from_env()` is the single entry point
//! and validates bounds before the runtime starts.

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to parse environment variable.
    Parse {
        key: String,
        value: String,
        error: String,
    },
    /// Invalid value for environment variable.
    Invalid { key: String, message: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Parse { key, value, error } => {
                write!(f, "failed to parse {}='{}': {}", key, value, error)
            }
            ConfigError::Invalid { key, message } => {
                write!(f, "invalid value for {}: {}", key, message)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Get environment variable with default value.
fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse environment variable as boolean.
/// Treats "1", "true" (case-insensitive) as true.
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| v == "1" || v.to_lowercase() == "true")
        .unwrap_or(default)
}

/// Parse a duration string (e.g., "150ms", "30s", "2m", "1h").
/// A bare number is taken as seconds.
fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim().to_lowercase();

    if s.is_empty() {
        return Err("empty duration".to_string());
    }

    // "ms" must be checked before the single-letter units
    let (num_str, unit) = if s.ends_with("ms") {
        (&s[..s.len() - 2], "ms")
    } else if s.ends_with('s') {
        (&s[..s.len() - 1], "s")
    } else if s.ends_with('m') {
        (&s[..s.len() - 1], "m")
    } else if s.ends_with('h') {
        (&s[..s.len() - 1], "h")
    } else {
        // Bare number: seconds
        return s
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|_| format!("invalid duration: {}", s));
    };

    let num: u64 = num_str
        .parse()
        .map_err(|_| format!("invalid number: {}", num_str))?;

    let duration = match unit {
        "ms" => Duration::from_millis(num),
        "s" => Duration::from_secs(num),
        "m" => Duration::from_secs(num * 60),
        "h" => Duration::from_secs(num * 3600),
        _ => return Err(format!("invalid unit: {}", unit)),
    };

    Ok(duration)
}

/// Parse environment variable as duration.
fn env_duration(key: &str, default: &str) -> Result<Duration, ConfigError> {
    let value = env_or(key, default);
    parse_duration(&value).map_err(|e| ConfigError::Parse {
        key: key.into(),
        value,
        error: e,
    })
}

/// Application configuration loaded from environment.
#[derive(Clone, Debug)]
pub struct Config {
    /// Listen address (default: 0.0.0.0:8000).
    pub listen_addr: SocketAddr,
    /// Development mode: serve assets from live directories and reload
    /// templates when they change on disk (default: false).
    pub dev_mode: bool,
    /// Probe every redirect target once at startup (default: dev_mode).
    pub verify_targets: bool,
    /// Timeout for each startup probe (default: 5s, minimum 2s).
    pub check_timeout: Duration,
    /// Concurrent workers for the startup sweep (default: 8, minimum 2).
    pub check_workers: usize,
    /// Template directory for development mode (default: templates).
    pub template_dir: PathBuf,
    /// Static file directory for development mode (default: static).
    pub static_dir: PathBuf,
    /// Record file directory for development mode (default: data).
    pub data_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
            dev_mode: false,
            verify_targets: false,
            check_timeout: Duration::from_secs(5),
            check_workers: 8,
            template_dir: PathBuf::from("templates"),
            static_dir: PathBuf::from("static"),
            data_dir: PathBuf::from("data"),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let listen_addr: SocketAddr = env_or("LISTEN_ADDR", "0.0.0.0:8000")
            .parse()
            .map_err(|e| ConfigError::Parse {
                key: "LISTEN_ADDR".into(),
                value: env_or("LISTEN_ADDR", "0.0.0.0:8000"),
                error: format!("{}", e),
            })?;

        let check_workers: usize =
            env_or("CHECK_WORKERS", "8")
                .parse()
                .map_err(|e| ConfigError::Parse {
                    key: "CHECK_WORKERS".into(),
                    value: env_or("CHECK_WORKERS", "8"),
                    error: format!("{}", e),
                })?;

        let dev_mode = env_bool("DEV_MODE", false);

        let config = Self {
            listen_addr,
            dev_mode,
            verify_targets: env_bool("VERIFY_TARGETS", dev_mode),
            check_timeout: env_duration("CHECK_TIMEOUT", "5s")?,
            check_workers,
            template_dir: PathBuf::from(env_or("TEMPLATE_DIR", "templates")),
            static_dir: PathBuf::from(env_or("STATIC_DIR", "static")),
            data_dir: PathBuf::from(env_or("DATA_DIR", "data")),
        };
        config.validate()?;
        Ok(config)
    }

    /// Check value bounds before the configuration is used.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.check_timeout < Duration::from_secs(2) {
            return Err(ConfigError::Invalid {
                key: "CHECK_TIMEOUT".into(),
                message: "timeout shorter than 2 seconds".into(),
            });
        }
        if self.check_workers < 2 {
            return Err(ConfigError::Invalid {
                key: "CHECK_WORKERS".into(),
                message: "at least 2 workers are needed".into(),
            });
        }
        Ok(())
    }

    /// Print configuration summary to log.
    pub fn log_summary(&self) {
        use tracing::info;

        info!("Configuration loaded:");
        info!("  Listen: {}", self.listen_addr);
        info!("  Development mode: {}", self.dev_mode);
        info!("  Verify targets: {}", self.verify_targets);
        if self.verify_targets {
            info!("  Check timeout: {:?}", self.check_timeout);
            info!("  Check workers: {}", self.check_workers);
        }
        if self.dev_mode {
            info!("  Template dir: {:?}", self.template_dir);
            info!("  Static dir: {:?}", self.static_dir);
            info!("  Data dir: {:?}", self.data_dir);
        }
    }
}
