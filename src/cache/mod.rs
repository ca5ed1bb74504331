//! Two-tier tile bitmap cache.
//!
//! [`MemoryTier`] holds decoded bitmaps; [`PersistentTileCache`] wraps it and
//! mirrors every new tile to a PNG file in a per-profile directory, so a
//! restarted process can serve tiles rendered by an earlier one.

pub mod codec;
pub mod memory;
pub mod persistent;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::models::tile::{InvalidBitmap, TileBitmap, TileKey};

pub use memory::{BoundedMemoryCache, MemoryTier};
pub use persistent::PersistentTileCache;

/// Cache failures. Each is scoped to the tile or operation that raised it.
#[derive(Error, Debug)]
pub enum CacheError {
  #[error("invalid render profile {0:?}")]
  InvalidProfile(String),

  #[error(transparent)]
  InvalidBitmap(#[from] InvalidBitmap),

  #[error("unable to decode tile: {0}")]
  Decode(#[from] png::DecodingError),

  #[error("unable to encode tile: {0}")]
  Encode(#[from] png::EncodingError),

  #[error("unsupported tile image: {0}")]
  UnsupportedImage(String),

  #[error("invalid cache directory pattern: {0}")]
  Pattern(#[from] glob::PatternError),

  #[error("invalid tile name pattern: {0}")]
  Regex(#[from] regex::Error),

  #[error("cache must be created inside a tokio runtime")]
  NoRuntime,

  #[error("cache task failed: {0}")]
  Task(#[from] tokio::task::JoinError),

  #[error("IO error: {0}")]
  Io(#[from] std::io::Error),
}

/// Operations a tile consumer needs from a cache.
#[async_trait]
pub trait TileCache: Send + Sync {
  /// Stores `bitmap` unless `key` is already cached. Never blocks on I/O.
  fn add_tile_bitmap(&self, key: TileKey, bitmap: Arc<TileBitmap>);

  /// Fast path; only consults memory.
  fn get_tile_bitmap(&self, key: &TileKey) -> Option<Arc<TileBitmap>>;

  /// Falls back to slower storage on a memory miss.
  async fn get_tile_bitmap_async(&self, key: &TileKey) -> Result<Option<Arc<TileBitmap>>, CacheError>;

  /// Removes persisted tiles and returns how many were deleted.
  async fn purge(&self) -> usize;

  fn dispose(&self);
}
