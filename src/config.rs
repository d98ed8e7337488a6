//! Runtime configuration.
//!
//! Layered with the `config` crate, later sources winning:
//! 1. compiled-in defaults
//! 2. `~/.prisoners/config.toml` (or the file passed with `--config`)
//! 3. `PRISONERS_<SECTION>__<KEY>` environment variables
//!
//! CLI flags are applied on top by `main`.

use crate::dilemma::round::DEFAULT_CHOICE_RETRIES;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_PREFIX: &str = "PRISONERS";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub guard: GuardConfig,
    pub gateway: GatewayConfig,
    pub logging: LoggingConfig,
}

/// Where the A2A gateway listens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// External URL advertised in the agent card.
    pub card_url: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9019,
            card_url: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    /// Re-prompts after an unrecognised choice.
    pub choice_retries: u32,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            choice_retries: DEFAULT_CHOICE_RETRIES,
        }
    }
}

/// Outbound A2A client settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub request_timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 300,
        }
    }
}

impl GatewayConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset.
    pub level: String,
    pub json: bool,
    /// Directory for daily rolling log files; stdout only when unset.
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            dir: None,
        }
    }
}

/// `~/.prisoners/config.toml`
pub fn default_config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".prisoners")
        .join("config.toml")
}

impl Config {
    /// Load defaults, then `path` (or the default file) if it exists, then
    /// the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
        Self::load_with_env(&path, ::config::Environment::with_prefix(ENV_PREFIX))
    }

    fn load_with_env(path: &Path, env: ::config::Environment) -> Result<Self> {
        let settings = ::config::Config::builder()
            .add_source(::config::File::from(path).required(false))
            .add_source(env.prefix_separator("_").separator("__").try_parsing(true))
            .build()?;
        let loaded: Config = settings.try_deserialize()?;
        tracing::debug!(path = %path.display(), "Configuration loaded");
        Ok(loaded)
    }
}
