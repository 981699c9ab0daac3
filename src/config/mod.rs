//! Per-user configuration, loaded from `config.toml` in the state directory.
//!
//! Resolution order for the state directory: `GPTCLI_STATE_DIR` env override,
//! else the per-user cache directory (`~/.cache/gptcli` on Linux). A missing
//! config file yields defaults; a file that exists but does not parse is a
//! hard error rather than a silent fallback.

use crate::error::{Error, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::fs;

/// Built-in default model when neither flag, session, nor config names one.
pub const BUILTIN_MODEL: &str = "gpt-4o-mini";

/// Built-in default sampling temperature.
pub const BUILTIN_TEMPERATURE: f64 = 0.2;

/// Top-level configuration, loaded from `config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// State directory holding session records, the pointer, and config.toml.
    /// Computed at load time, not serialized.
    #[serde(skip)]
    pub state_dir: PathBuf,
    /// Path to config.toml - computed, not serialized.
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Base URL override for the provider API (e.g. a gateway or proxy).
    pub api_url: Option<String>,
    /// Default model for sessions that have not stored one.
    #[serde(default = "default_model")]
    pub default_model: String,
    /// Default sampling temperature (0.0-2.0).
    #[serde(default = "default_temperature")]
    pub default_temperature: f64,
    /// Default system prompt for sessions that have not stored one.
    pub default_system_prompt: Option<String>,
}

fn default_model() -> String {
    BUILTIN_MODEL.into()
}

fn default_temperature() -> f64 {
    BUILTIN_TEMPERATURE
}

impl Default for Config {
    fn default() -> Self {
        Self {
            state_dir: PathBuf::new(),
            config_path: PathBuf::new(),
            api_url: None,
            default_model: default_model(),
            default_temperature: default_temperature(),
            default_system_prompt: None,
        }
    }
}

impl Config {
    /// Resolve the state directory, create it if needed, and load
    /// `config.toml` from it (defaults when absent).
    pub async fn load_or_init() -> Result<Self> {
        let state_dir = resolve_state_dir()?;
        fs::create_dir_all(&state_dir).await?;

        let config_path = state_dir.join("config.toml");
        let mut config = match fs::read_to_string(&config_path).await {
            Ok(raw) => toml::from_str::<Config>(&raw).map_err(|e| Error::InvalidConfig {
                path: config_path.clone(),
                reason: e.to_string(),
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Config::default(),
            Err(e) => {
                return Err(Error::InvalidConfig {
                    path: config_path,
                    reason: e.to_string(),
                })
            }
        };

        config.state_dir = state_dir;
        config.config_path = config_path;
        Ok(config)
    }

    /// Apply `GPTCLI_*` environment overrides on top of file values.
    pub fn apply_env_overrides(&mut self) {
        let model = nonempty_env("GPTCLI_MODEL");
        let api_url = nonempty_env("GPTCLI_API_URL");
        self.apply_overrides(model, api_url);
    }

    fn apply_overrides(&mut self, model: Option<String>, api_url: Option<String>) {
        if let Some(model) = model {
            self.default_model = model;
        }
        if let Some(api_url) = api_url {
            self.api_url = Some(api_url);
        }
    }
}

fn nonempty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn resolve_state_dir() -> Result<PathBuf> {
    if let Some(dir) = nonempty_env("GPTCLI_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }

    let dirs = ProjectDirs::from("", "", "gptcli").ok_or_else(|| {
        std::io::Error::other("cannot determine a per-user cache directory on this system")
    })?;
    Ok(dirs.cache_dir().to_path_buf())
}
