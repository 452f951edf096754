//! Configuration module for environment variable parsing.
//!
//! All settings are read once at startup and injected into the components
//! that need them.

use std::env;
use std::path::PathBuf;

use tracing::warn;

/// Default audit log path, relative to the working directory.
pub const DEFAULT_LOG_FILE: &str = "sns-log.txt";

/// Default rotation threshold for the audit log (10 MiB).
pub const DEFAULT_MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the Mautic instance, without a trailing slash
    pub mautic_url: String,

    /// Mautic API user for HTTP Basic authentication
    pub mautic_username: String,

    /// Mautic API password for HTTP Basic authentication
    pub mautic_password: String,

    /// Path of the audit log file
    pub log_file: PathBuf,

    /// Size in bytes above which the audit log is rotated to `.old`
    pub max_log_size: u64,

    /// HTTP request timeout in milliseconds for all outbound calls
    pub request_timeout_ms: u64,

    /// Port for the web server to listen on
    pub port: u16,

    /// Variables that were set but could not be parsed
    pub invalid_settings: Vec<InvalidSetting>,
}

/// An environment variable whose value was replaced by its default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidSetting {
    pub env_var: &'static str,
    pub value: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Config is read before the subscriber exists (it names the log file),
    /// so malformed values are collected and reported by
    /// [`Config::log_invalid_settings`] once logging is up.
    pub fn from_env() -> Self {
        let mut invalid_settings = Vec::new();

        let max_log_size =
            parse_number("MAX_LOG_SIZE", DEFAULT_MAX_LOG_SIZE, &mut invalid_settings);
        let request_timeout_ms =
            parse_number("REQUEST_TIMEOUT_MS", 30_000, &mut invalid_settings);
        let port = parse_number("PORT", 8080, &mut invalid_settings);

        Config {
            mautic_url: env::var("MAUTIC_URL")
                .map(|v| v.trim().trim_end_matches('/').to_string())
                .unwrap_or_default(),

            mautic_username: env::var("MAUTIC_USERNAME").unwrap_or_default(),

            mautic_password: env::var("MAUTIC_PASSWORD").unwrap_or_default(),

            log_file: env::var("LOG_FILE")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE)),

            max_log_size,

            request_timeout_ms,

            port,

            invalid_settings,
        }
    }

    /// Warn about every variable that fell back to its default.
    pub fn log_invalid_settings(&self) {
        for setting in &self.invalid_settings {
            warn!(
                env_var = setting.env_var,
                value = %setting.value,
                "Invalid number, using default"
            );
        }
    }
}

/// Parse a numeric environment variable, falling back to `default` when it
/// is unset or malformed. Malformed values are recorded in `invalid`.
fn parse_number<T: std::str::FromStr>(
    name: &'static str,
    default: T,
    invalid: &mut Vec<InvalidSetting>,
) -> T {
    let raw = match env::var(name) {
        Ok(v) => v,
        Err(_) => return default,
    };

    match raw.trim().parse() {
        Ok(value) => value,
        Err(_) => {
            invalid.push(InvalidSetting {
                env_var: name,
                value: raw,
            });
            default
        }
    }
}
