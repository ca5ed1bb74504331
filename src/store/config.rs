use log::debug;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs::read_to_string;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::store::error::MapFileError;
use crate::store::map_file::MapFile;

const DEFAULT_MEMORY_CAPACITY: usize = 256;

#[derive(Error, Debug)]
pub enum ConfigError {
  #[error("unable to read config: {0}")]
  Io(#[from] std::io::Error),

  #[error("invalid config: {0}")]
  Yaml(#[from] serde_yaml::Error),

  #[error("map {0} is configured twice")]
  DuplicateMap(String),
}

#[derive(Debug, Deserialize)]
pub struct Root {
  /// Parent of the per-profile tile directories.
  pub cache_dir: PathBuf,
  /// Tiles held by each map's memory tier.
  #[serde(default = "default_memory_capacity")]
  pub memory_capacity: usize,
  pub maps: Vec<SerializedMap>,
}

#[derive(Debug, Deserialize)]
pub struct SerializedMap {
  pub name: String,
  pub path: PathBuf,
  /// Render profile key; names the cache directory of this map's tiles.
  pub profile: String,
}

fn default_memory_capacity() -> usize {
  DEFAULT_MEMORY_CAPACITY
}

impl Root {
  pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
    let config_str = read_to_string(path)?;
    Self::parse(&config_str)
  }

  pub fn parse(config_str: &str) -> Result<Self, ConfigError> {
    let root: Root = serde_yaml::from_str(config_str)?;
    let mut names = HashSet::new();
    for map in root.maps.iter() {
      if !names.insert(map.name.as_str()) {
        return Err(ConfigError::DuplicateMap(map.name.clone()));
      }
    }
    Ok(root)
  }

  pub fn map(&self, name: &str) -> Option<&SerializedMap> {
    self.maps.iter().find(|m| m.name == name)
  }
}

impl SerializedMap {
  pub fn load(&self) -> Result<MapFile, MapFileError> {
    debug!("Loading map {} from {:?}", self.name, self.path);
    MapFile::open(&self.path)
  }
}
