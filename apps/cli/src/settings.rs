//! Layered CLI settings: defaults, then a TOML file, then `FORMWORK_*`
//! environment variables.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use formwork_engine::EngineConfig;
use serde::{Deserialize, Serialize};

/// Config file picked up from the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "formwork.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Filter used when `RUST_LOG` is unset and no `-v` is given.
    pub log_level: String,
    pub engine: EngineConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: "warn".to_owned(),
            engine: EngineConfig::default(),
        }
    }
}

impl Settings {
    /// Load settings. An explicit file must exist; the default file is
    /// optional. Nested keys in the environment use `__`, e.g.
    /// `FORMWORK_ENGINE__CACHE_CAPACITY=16`.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let file = match explicit {
            Some(path) => {
                anyhow::ensure!(path.is_file(), "config file {} not found", path.display());
                path.to_path_buf()
            }
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(&file))
            .merge(Env::prefixed("FORMWORK_").ignore(&["config"]).split("__"))
            .extract()
            .with_context(|| format!("loading settings from {}", file.display()))
    }
}
