use anyhow::{Context as AnyhowContext, Result};
use nbpublish_tools::{PublishOptions, PythonConfig, DEFAULT_TOKEN_VAR};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Settings read from `~/.nbpublish/config.yaml` (or `--config`).
///
/// Every key is optional:
///
/// ```yaml
/// token_env: MEDIUM_TOKEN
/// python: /opt/venv/bin/python
/// timeout_seconds: 300
/// options:
///   tags: [python, streamlit]
///   license: cc-40-by
/// ```
#[derive(Debug, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub token_env: Option<String>,
    pub python: Option<String>,
    pub module: Option<String>,
    pub timeout_seconds: Option<u64>,
    pub options: PublishOptions,
}

impl Config {
    /// Load `explicit` if given (it must exist), else the default file if present.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::load_from(path),
            None => {
                let config_path = Self::get_config_path()?;
                if !config_path.exists() {
                    return Ok(Config::default());
                }
                Self::load_from(&config_path)
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    fn get_config_path() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not find home directory")?;
        Ok(home.join(".nbpublish").join("config.yaml"))
    }

    pub fn token_env(&self) -> &str {
        self.token_env.as_deref().unwrap_or(DEFAULT_TOKEN_VAR)
    }

    pub fn python_config(&self) -> PythonConfig {
        let mut python = PythonConfig::default();
        if let Some(bin) = &self.python {
            python.python = bin.clone();
        }
        if let Some(module) = &self.module {
            python.module = module.clone();
        }
        python.timeout_seconds = self.timeout_seconds;
        python
    }
}
