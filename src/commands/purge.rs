use clap::Parser;
use log::info;
use std::error::Error;
use std::sync::Arc;
use tokio::runtime::Runtime;

use crate::cache::{BoundedMemoryCache, PersistentTileCache, TileCache};
use crate::store::config;

#[derive(Parser)]
pub struct PurgeCommand {
  // Cache configuration
  #[clap(required=true)]
  config_file: String,

  // Map whose rendered tiles are deleted
  #[clap(required=true)]
  name: String,
}

impl PurgeCommand {
  pub fn execute(&self) -> Result<(), Box<dyn Error>> {
    let config = config::Root::from_file(&self.config_file)?;
    let map = config
      .map(&self.name)
      .ok_or_else(|| format!("map {} is not configured", self.name))?;

    let rt = Runtime::new()?;
    let deleted = rt.block_on(async {
      let memory = Arc::new(BoundedMemoryCache::new(1));
      let cache = PersistentTileCache::open(memory, &config.cache_dir, &map.profile).await?;
      let deleted = cache.purge().await;
      info!("Purged {:?}", cache.directory());
      Ok::<usize, Box<dyn Error>>(deleted)
    })?;

    println!("deleted {} tiles of {}", deleted, self.name);
    Ok(())
  }
}
