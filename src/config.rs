use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;

use crate::error::RelayError;

/// Relay configuration: optional `config.yaml` with environment-variable
/// overrides on top.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub upstream: UpstreamConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address, `host:port`.
    pub bind: String,
    /// Directory served as static assets at the root path.
    pub static_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Base URL of the OpenAI-compatible completion API.
    pub api_base: String,
    /// Default credential; may be empty, in which case every call must
    /// carry its own key override or it fails with a user-visible message.
    pub api_key: String,
    pub model: String,
    pub connect_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                bind: "0.0.0.0:3000".to_string(),
                static_dir: "public".to_string(),
            },
            upstream: UpstreamConfig {
                api_base: "https://dashscope.aliyuncs.com/compatible-mode/v1".to_string(),
                api_key: String::new(),
                model: "qwen-plus".to_string(),
                connect_timeout_secs: 10,
            },
        }
    }
}

impl Config {
    /// Load configuration from file with environment variable overrides.
    /// ALWAYS returns a valid config - never fails.
    pub fn load() -> Self {
        if dotenvy::dotenv().is_ok() {
            tracing::info!("Loaded .env from current directory");
        }

        let config_path =
            env::var("RELAY_CONFIG_PATH").unwrap_or_else(|_| "config.yaml".to_string());

        let mut config = if Path::new(&config_path).exists() {
            match fs::read_to_string(&config_path) {
                Ok(contents) => match serde_yaml::from_str::<Config>(&contents) {
                    Ok(config) => {
                        tracing::info!("Loaded configuration from {}", config_path);
                        config
                    }
                    Err(e) => {
                        tracing::error!(
                            "Failed to parse config file {}: {} - using defaults",
                            config_path,
                            e
                        );
                        Self::default()
                    }
                },
                Err(e) => {
                    tracing::error!(
                        "Failed to read config file {}: {} - using defaults",
                        config_path,
                        e
                    );
                    Self::default()
                }
            }
        } else {
            Self::default()
        };

        config.apply_env_overrides();

        // Validate configuration - log warnings but don't fail
        if let Err(e) = config.validate() {
            tracing::warn!("Config validation warnings: {} - continuing anyway", e);
        }

        config
    }

    fn apply_env_overrides(&mut self) {
        // Server overrides. PORT keeps the original deployment contract;
        // RELAY_BIND wins when both are set.
        if let Ok(port) = env::var("PORT") {
            if port.parse::<u16>().is_ok() {
                self.server.bind = format!("0.0.0.0:{port}");
            }
        }
        if let Ok(bind) = env::var("RELAY_BIND") {
            self.server.bind = bind;
        }
        if let Ok(dir) = env::var("RELAY_STATIC_DIR") {
            self.server.static_dir = dir;
        }

        // Upstream overrides
        if let Ok(key) = env::var("DASHSCOPE_API_KEY") {
            self.upstream.api_key = key;
        }
        if let Ok(base) = env::var("TONGYI_API_BASE") {
            self.upstream.api_base = base;
        }
        if let Ok(model) = env::var("TONGYI_MODEL") {
            self.upstream.model = model;
        }
        if let Ok(timeout) = env::var("RELAY_CONNECT_TIMEOUT_SECS") {
            if let Ok(secs) = timeout.parse() {
                self.upstream.connect_timeout_secs = secs;
            }
        }
    }

    fn validate(&self) -> Result<(), RelayError> {
        if self.server.bind.parse::<std::net::SocketAddr>().is_err() {
            return Err(RelayError::Config(format!(
                "invalid bind address: {}",
                self.server.bind
            )));
        }
        if self.upstream.api_base.is_empty() {
            return Err(RelayError::Config(
                "upstream api_base cannot be empty".to_string(),
            ));
        }
        if self.upstream.model.is_empty() {
            return Err(RelayError::Config(
                "upstream model cannot be empty".to_string(),
            ));
        }
        // A missing key is allowed at boot: it is surfaced per-call as a
        // user-visible message, and callers may supply their own key.
        if self.upstream.api_key.is_empty() {
            return Err(RelayError::Config(
                "DASHSCOPE_API_KEY is not set; calls without a key override will fail".to_string(),
            ));
        }
        Ok(())
    }
}
