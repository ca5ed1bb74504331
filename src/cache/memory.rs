use log::trace;
use moka::sync::Cache;
use std::sync::Arc;

use crate::models::tile::{TileBitmap, TileKey};

/// In-memory tier of the tile cache.
pub trait MemoryTier: Send + Sync {
  fn get(&self, key: &TileKey) -> Option<Arc<TileBitmap>>;

  /// Inserts `bitmap` if `key` is absent. Returns `false` and keeps the
  /// existing bitmap otherwise.
  fn put(&self, key: TileKey, bitmap: Arc<TileBitmap>) -> bool;

  /// Drops every held bitmap.
  fn dispose(&self);
}

/// Holds at most `capacity` bitmaps; moka picks the eviction victims.
pub struct BoundedMemoryCache {
  tiles: Cache<TileKey, Arc<TileBitmap>>,
}

impl BoundedMemoryCache {
  pub fn new(capacity: usize) -> Self {
    let tiles = Cache::builder()
      .max_capacity(capacity.max(1) as u64)
      .eviction_listener(|key: Arc<TileKey>, _, cause| {
        trace!("Evicting tile {} ({:?})", key, cause);
      })
      .build();
    BoundedMemoryCache { tiles }
  }
}

impl MemoryTier for BoundedMemoryCache {
  fn get(&self, key: &TileKey) -> Option<Arc<TileBitmap>> {
    self.tiles.get(key)
  }

  fn put(&self, key: TileKey, bitmap: Arc<TileBitmap>) -> bool {
    self.tiles.entry(key).or_insert(bitmap).is_fresh()
  }

  fn dispose(&self) {
    self.tiles.invalidate_all();
  }
}
