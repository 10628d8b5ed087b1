//! Configuration management

use std::{env, fmt, path::Path, path::PathBuf, time::Duration};

use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use prompt_gateway_core::ExposureEntry;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Main configuration for the standalone binary
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,
    /// YAML or JSON file holding the prompt catalog
    pub prompts_file: Option<PathBuf>,
    /// Exposure entries pushed into the gateway at startup
    pub exposed: Vec<ExposureEntry>,
}

/// Gateway server configuration.
///
/// Read on every request; replaced through [`ServerConfigPatch`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to bind to (0 = pick a free port)
    pub port: u16,
    /// Require `Authorization: Bearer <api_key>`
    pub enable_auth: bool,
    /// Bearer token (supports `env:VAR_NAME`)
    pub api_key: String,
    /// Concurrently processed requests, applied when the listener starts
    pub max_connections: usize,
    /// Requests per 60 second window per client IP
    pub rate_limit: u32,
    /// Attach CORS headers to every response
    pub enable_cors: bool,
    /// Mirror the log buffer to the console
    pub enable_logging: bool,
    /// Console mirror threshold
    pub log_level: LogLevel,
    /// Time allowed for a request body to arrive in full
    #[serde(with = "humantime_serde")]
    pub body_timeout: Duration,
    /// Largest accepted request body in bytes
    pub max_body_size: usize,
    /// How often expired rate-limit records are evicted
    #[serde(with = "humantime_serde")]
    pub rate_limit_sweep_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            enable_auth: false,
            api_key: String::new(),
            max_connections: 100,
            rate_limit: 100,
            enable_cors: true,
            enable_logging: true,
            log_level: LogLevel::Info,
            body_timeout: Duration::from_secs(30),
            max_body_size: 1024 * 1024, // 1MB
            rate_limit_sweep_interval: Duration::from_secs(300),
        }
    }
}

impl ServerConfig {
    /// Resolve the API key (expand `env:VAR_NAME`)
    #[must_use]
    pub fn resolve_api_key(&self) -> String {
        if let Some(var_name) = self.api_key.strip_prefix("env:") {
            env::var(var_name).unwrap_or_else(|_| self.api_key.clone())
        } else {
            self.api_key.clone()
        }
    }

    /// Shallow-merge every field set in `patch`
    pub fn apply(&mut self, patch: ServerConfigPatch) {
        let ServerConfigPatch {
            host,
            port,
            enable_auth,
            api_key,
            max_connections,
            rate_limit,
            enable_cors,
            enable_logging,
            log_level,
            body_timeout,
            max_body_size,
            rate_limit_sweep_interval,
        } = patch;

        if let Some(v) = host {
            self.host = v;
        }
        if let Some(v) = port {
            self.port = v;
        }
        if let Some(v) = enable_auth {
            self.enable_auth = v;
        }
        if let Some(v) = api_key {
            self.api_key = v;
        }
        if let Some(v) = max_connections {
            self.max_connections = v;
        }
        if let Some(v) = rate_limit {
            self.rate_limit = v;
        }
        if let Some(v) = enable_cors {
            self.enable_cors = v;
        }
        if let Some(v) = enable_logging {
            self.enable_logging = v;
        }
        if let Some(v) = log_level {
            self.log_level = v;
        }
        if let Some(v) = body_timeout {
            self.body_timeout = v;
        }
        if let Some(v) = max_body_size {
            self.max_body_size = v;
        }
        if let Some(v) = rate_limit_sweep_interval {
            self.rate_limit_sweep_interval = v;
        }
    }
}

/// Partial [`ServerConfig`]; `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfigPatch {
    /// Host to bind to
    pub host: Option<String>,
    /// Port to bind to
    pub port: Option<u16>,
    /// Require bearer auth
    pub enable_auth: Option<bool>,
    /// Bearer token
    pub api_key: Option<String>,
    /// Concurrency bound
    pub max_connections: Option<usize>,
    /// Requests per window per IP
    pub rate_limit: Option<u32>,
    /// CORS headers
    pub enable_cors: Option<bool>,
    /// Console mirroring
    pub enable_logging: Option<bool>,
    /// Console threshold
    pub log_level: Option<LogLevel>,
    /// Body read timeout
    #[serde(with = "humantime_serde")]
    pub body_timeout: Option<Duration>,
    /// Body size cap
    pub max_body_size: Option<usize>,
    /// Sweep interval
    #[serde(with = "humantime_serde")]
    pub rate_limit_sweep_interval: Option<Duration>,
}

/// Gateway log severity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Debug
    Debug,
    /// Info
    #[default]
    Info,
    /// Warn
    Warn,
    /// Error
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        })
    }
}

impl Config {
    /// Load configuration from file and environment
    ///
    /// # Errors
    ///
    /// Returns an error if the config file does not exist or cannot be parsed.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new();

        if let Some(p) = path {
            if !p.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            figment = figment.merge(Yaml::file(p));
        }

        // Merge environment variables (PROMPT_GATEWAY_ prefix)
        figment = figment.merge(Env::prefixed("PROMPT_GATEWAY_").split("__"));

        let mut config: Self = figment
            .extract()
            .map_err(|e| Error::Config(e.to_string()))?;

        config.server.api_key = config.server.resolve_api_key();

        if config.server.enable_auth && config.server.api_key.is_empty() {
            tracing::warn!(
                "Authentication enabled with an empty API key; every request will be rejected"
            );
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 3000);
        assert!(!config.enable_auth);
        assert_eq!(config.log_level, LogLevel::Info);
    }

    #[test]
    fn patch_is_shallow_merge() {
        let mut config = ServerConfig::default();
        config.apply(ServerConfigPatch {
            enable_auth: Some(true),
            api_key: Some("secret".to_string()),
            rate_limit: Some(5),
            ..ServerConfigPatch::default()
        });

        assert!(config.enable_auth);
        assert_eq!(config.api_key, "secret");
        assert_eq!(config.rate_limit, 5);
        // untouched
        assert_eq!(config.port, 3000);
        assert!(config.enable_cors);
    }

    #[test]
    fn patch_deserializes_partial_json() {
        let patch: ServerConfigPatch =
            serde_json::from_str(r#"{"port": 4000, "log_level": "warn", "body_timeout": "5s"}"#)
                .unwrap();
        assert_eq!(patch.port, Some(4000));
        assert_eq!(patch.log_level, Some(LogLevel::Warn));
        assert_eq!(patch.body_timeout, Some(Duration::from_secs(5)));
        assert!(patch.host.is_none());
    }

    #[test]
    fn log_levels_are_ordered() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Warn);
        assert!(LogLevel::Warn < LogLevel::Error);
        assert_eq!(LogLevel::Warn.to_string(), "warn");
    }

    #[test]
    fn load_missing_file_fails() {
        let err = Config::load(Some(Path::new("/nonexistent/gateway.yaml"))).unwrap_err();
        assert!(err.to_string().contains("Config file not found"));
    }

    #[test]
    fn load_yaml_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        file.write_all(
            concat!(
                "server:\n",
                "  port: 4123\n",
                "  enable_auth: true\n",
                "  api_key: abc\n",
                "  rate_limit: 7\n",
                "  body_timeout: 2s\n",
                "prompts_file: prompts.yaml\n",
                "exposed:\n",
                "  - prompt_id: 5\n",
                "    secure_hash: abc123\n",
            )
            .as_bytes(),
        )
        .unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.server.port, 4123);
        assert!(config.server.enable_auth);
        assert_eq!(config.server.api_key, "abc");
        assert_eq!(config.server.rate_limit, 7);
        assert_eq!(config.server.body_timeout, Duration::from_secs(2));
        assert_eq!(config.prompts_file, Some(PathBuf::from("prompts.yaml")));
        assert_eq!(config.exposed, vec![ExposureEntry::new(5, "abc123", true)]);
    }
}
