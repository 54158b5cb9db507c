use std::path::{Path, PathBuf};

use anyhow::Context;
use asset_importer::primitive::PrimitiveAttributes;
use serde::{Deserialize, Serialize};

use crate::{
    resource_manager::ResourceManagerConfig,
    stage::{ObjectAttributes, StageAttributes},
};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub resource_manager: ResourceManagerConfig,
    pub stage: StageAttributes,
    pub create_semantic_mesh: bool,
    pub force_separate_semantic_scene_graph: bool,
    /// Extra primitive templates, registered before any object is instanced.
    pub primitives: Vec<PrimitiveAttributes>,
    pub objects: Vec<ObjectAttributes>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            resource_manager: ResourceManagerConfig::default(),
            stage: StageAttributes::default(),
            create_semantic_mesh: true,
            force_separate_semantic_scene_graph: false,
            primitives: Vec::new(),
            objects: Vec::new(),
        }
    }
}

impl Config {
    pub fn from_str(value: &str) -> anyhow::Result<Self> {
        serde_json::from_str(value).context("Config is not valid JSON")
    }
}

pub struct ConfigFileLoader {
    pub path: PathBuf,
    config: Option<Config>,
}

impl ConfigFileLoader {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().into(),
            config: None,
        }
    }

    /// Reads the config file. A missing file is created with the default config.
    pub fn load_config(&mut self) -> anyhow::Result<&mut Config> {
        let config = match std::fs::read_to_string(&self.path) {
            Ok(content) => Config::from_str(&content)
                .with_context(|| format!("Could not parse {}", self.path.display()))?,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                log::info!("No config at {}, writing defaults", self.path.display());
                self.config = Some(Config::default());
                self.save_config()?;
                Config::default()
            }
            Err(error) => {
                return Err(error)
                    .with_context(|| format!("Could not read {}", self.path.display()))
            }
        };
        Ok(self.config.insert(config))
    }

    pub fn get_or_load_config(&mut self) -> anyhow::Result<&mut Config> {
        if self.config.is_none() {
            self.load_config()?;
        }
        self.config.as_mut().context("Config was not loaded")
    }

    pub fn save_config(&self) -> anyhow::Result<()> {
        if let Some(config) = &self.config {
            let content = serde_json::to_string_pretty(config)?;
            std::fs::write(&self.path, content)
                .with_context(|| format!("Could not write {}", self.path.display()))?;
        }
        Ok(())
    }
}
