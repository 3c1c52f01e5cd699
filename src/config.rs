//! Service configuration from environment variables.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `HOST` | `0.0.0.0` |
//! | `PORT` | `5000` |
//! | `GEOGATE_POLICY_PATH` | `user_access.xml` |
//! | `GEOGATE_POLICY_MAX_BYTES` | `65536` |
//! | `GEOGATE_DATASET_PATH` | `static/map_page/rock_info1.csv` |
//! | `GEOGATE_DATASET_DELIMITER` | `,` |
//! | `GEOGATE_LOGIN_PATH` | `/login` |
//! | `GEOGATE_PUBLIC_RECORDS` | `true` |
//! | `LOG_FORMAT` | `json` |

use std::path::PathBuf;

use crate::policy::DEFAULT_POLICY_MAX_BYTES;

/// Invalid configuration value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid value for {key}: {reason}")]
pub struct ConfigError {
    /// Offending variable.
    pub key: &'static str,
    /// What is wrong with it.
    pub reason: String,
}

impl ConfigError {
    fn new(key: &'static str, reason: impl Into<String>) -> Self {
        Self {
            key,
            reason: reason.into(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per event.
    Json,
    /// Human-readable output for local development.
    Pretty,
}

/// Runtime configuration for the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Bind host.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Policy document location.
    pub policy_path: PathBuf,
    /// Policy documents larger than this are rejected.
    pub policy_max_bytes: u64,
    /// Geo dataset location.
    pub dataset_path: PathBuf,
    /// Dataset field delimiter.
    pub dataset_delimiter: u8,
    /// Where unauthenticated callers are redirected.
    pub login_path: String,
    /// Whether the record query routes bypass the access gate.
    pub public_records: bool,
    /// Log output format.
    pub log_format: LogFormat,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            policy_path: PathBuf::from("user_access.xml"),
            policy_max_bytes: DEFAULT_POLICY_MAX_BYTES,
            dataset_path: PathBuf::from("static/map_page/rock_info1.csv"),
            dataset_delimiter: b',',
            login_path: "/login".to_string(),
            public_records: true,
            log_format: LogFormat::Json,
        }
    }
}

impl ServiceConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup`; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(host) = lookup("HOST") {
            cfg.host = host;
        }
        if let Some(port) = lookup("PORT") {
            cfg.port = port
                .trim()
                .parse()
                .map_err(|_| ConfigError::new("PORT", format!("{port:?} is not a port number")))?;
        }
        if let Some(path) = lookup("GEOGATE_POLICY_PATH") {
            cfg.policy_path = PathBuf::from(path);
        }
        if let Some(max) = lookup("GEOGATE_POLICY_MAX_BYTES") {
            cfg.policy_max_bytes = max.trim().parse().map_err(|_| {
                ConfigError::new("GEOGATE_POLICY_MAX_BYTES", format!("{max:?} is not a byte count"))
            })?;
        }
        if let Some(path) = lookup("GEOGATE_DATASET_PATH") {
            cfg.dataset_path = PathBuf::from(path);
        }
        if let Some(delimiter) = lookup("GEOGATE_DATASET_DELIMITER") {
            cfg.dataset_delimiter = match delimiter.as_bytes() {
                [b] => *b,
                _ if delimiter == "\\t" => b'\t',
                _ => {
                    return Err(ConfigError::new(
                        "GEOGATE_DATASET_DELIMITER",
                        "must be a single byte",
                    ))
                }
            };
        }
        if let Some(login) = lookup("GEOGATE_LOGIN_PATH") {
            cfg.login_path = login.trim().to_string();
        }
        if let Some(public) = lookup("GEOGATE_PUBLIC_RECORDS") {
            cfg.public_records = parse_bool(&public)
                .ok_or_else(|| ConfigError::new("GEOGATE_PUBLIC_RECORDS", "expected true or false"))?;
        }
        if let Some(format) = lookup("LOG_FORMAT") {
            cfg.log_format = match format.trim() {
                "pretty" => LogFormat::Pretty,
                _ => LogFormat::Json,
            };
        }

        cfg.validate()?;
        Ok(cfg)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.policy_max_bytes == 0 {
            return Err(ConfigError::new("GEOGATE_POLICY_MAX_BYTES", "must be greater than zero"));
        }
        if !self.login_path.starts_with('/') {
            return Err(ConfigError::new("GEOGATE_LOGIN_PATH", "must be an absolute path"));
        }
        Ok(())
    }

    /// `host:port` bind address.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
