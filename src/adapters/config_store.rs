//! JSON file config store.
//!
//! Implements [`ConfigPort`] over a single pretty-printed JSON document.
//! Missing files load as defaults; missing fields take their defaults.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::info;

use crate::app::ports::ConfigPort;
use crate::config::ControllerConfig;
use crate::error::ConfigError;

pub struct JsonConfigStore {
    path: PathBuf,
}

impl JsonConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigPort for JsonConfigStore {
    fn load(&self) -> Result<ControllerConfig, ConfigError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!("ConfigStore: {} not found, using defaults", self.path.display());
                return Ok(ControllerConfig::default());
            }
            Err(e) => return Err(e.into()),
        };
        let config: ControllerConfig = serde_json::from_str(&text)?;
        config.validate()?;
        info!("ConfigStore: loaded {}", self.path.display());
        Ok(config)
    }

    fn save(&self, config: &ControllerConfig) -> Result<(), ConfigError> {
        config.validate()?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let text = serde_json::to_string_pretty(config)?;
        fs::write(&self.path, text)?;
        info!("ConfigStore: saved {}", self.path.display());
        Ok(())
    }
}
