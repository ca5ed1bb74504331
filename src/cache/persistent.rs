use async_trait::async_trait;
use glob::{glob, Pattern};
use log::{debug, info, trace, warn};
use regex::Regex;
use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf, MAIN_SEPARATOR};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::runtime::Handle;
use tokio::task::{self, JoinHandle};

use crate::cache::{codec, CacheError, MemoryTier, TileCache};
use crate::models::tile::{TileBitmap, TileKey};

const TILE_FILE_EXTENSION: &str = "png";
const PARTIAL_FILE_EXTENSION: &str = "png.part";
const REGEX_TILE_FILE: &str = r"^[0-9]+_[0-9]+_[0-9]+\.png$";

/// File name of a tile inside its profile directory. The profile is not part
/// of the name, so two configurations sharing a profile key share files.
pub fn tile_file_name(key: &TileKey) -> String {
  format!("{}_{}_{}.{}", key.zoom, key.x, key.y, TILE_FILE_EXTENSION)
}

fn validate_profile(profile: &str) -> Result<(), CacheError> {
  let has_separator = profile.contains('/') || profile.contains('\\') || profile.contains(MAIN_SEPARATOR);
  if profile.is_empty() || profile == "." || profile == ".." || has_separator {
    return Err(CacheError::InvalidProfile(profile.to_string()));
  }
  Ok(())
}

/// File names materialized on disk. Empty until the directory scan finishes.
#[derive(Debug, Default)]
struct TrackedFiles {
  initialized: bool,
  names: HashSet<String>,
}

type Tracked = Arc<Mutex<TrackedFiles>>;

fn lock(tracked: &Mutex<TrackedFiles>) -> MutexGuard<'_, TrackedFiles> {
  tracked.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Tile cache that keeps decoded bitmaps in a [`MemoryTier`] and mirrors them
/// as PNG files to `<cache_dir>/<profile>/`.
///
/// Disk work runs as tasks on the tokio runtime that was current when the
/// cache was created; [`add_tile_bitmap`](TileCache::add_tile_bitmap) and
/// [`get_tile_bitmap`](TileCache::get_tile_bitmap) never wait for it.
pub struct PersistentTileCache {
  memory: Arc<dyn MemoryTier>,
  directory: PathBuf,
  tracked: Tracked,
  pending: Mutex<Vec<JoinHandle<()>>>,
  runtime: Handle,
}

impl PersistentTileCache {
  /// Creates the cache and starts scanning its directory in the background.
  /// Must be called from within a tokio runtime.
  pub fn new<P: AsRef<Path>>(
    memory: Arc<dyn MemoryTier>,
    cache_dir: P,
    profile: &str,
  ) -> Result<Self, CacheError> {
    validate_profile(profile)?;
    let runtime = Handle::try_current().map_err(|_| CacheError::NoRuntime)?;
    let tile_name = Regex::new(REGEX_TILE_FILE)?;
    let directory = cache_dir.as_ref().join(profile);
    let tracked: Tracked = Arc::default();

    let init = runtime.spawn(initialize(directory.clone(), tile_name, tracked.clone()));
    Ok(PersistentTileCache {
      memory,
      directory,
      tracked,
      pending: Mutex::new(vec![init]),
      runtime,
    })
  }

  /// Like [`new`](Self::new), but returns once the directory scan is done.
  pub async fn open<P: AsRef<Path>>(
    memory: Arc<dyn MemoryTier>,
    cache_dir: P,
    profile: &str,
  ) -> Result<Self, CacheError> {
    let cache = Self::new(memory, cache_dir, profile)?;
    cache.flush().await;
    Ok(cache)
  }

  pub fn directory(&self) -> &Path {
    &self.directory
  }

  pub fn is_initialized(&self) -> bool {
    lock(&self.tracked).initialized
  }

  pub fn tracked_count(&self) -> usize {
    lock(&self.tracked).names.len()
  }

  fn is_tracked(&self, name: &str) -> bool {
    lock(&self.tracked).names.contains(name)
  }

  /// Waits for the directory scan and every write started so far.
  pub async fn flush(&self) {
    loop {
      let handles = std::mem::take(&mut *self.pending.lock().unwrap_or_else(PoisonError::into_inner));
      if handles.is_empty() {
        return;
      }
      for handle in handles {
        if let Err(e) = handle.await {
          warn!("Cache task failed: {}", e);
        }
      }
    }
  }

  fn spawn(&self, future: impl std::future::Future<Output = ()> + Send + 'static) {
    let handle = self.runtime.spawn(future);
    let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
    pending.retain(|h| !h.is_finished());
    pending.push(handle);
  }
}

async fn initialize(directory: PathBuf, tile_name: Regex, tracked: Tracked) {
  let scan_dir = directory.clone();
  match task::spawn_blocking(move || scan_directory(&scan_dir, &tile_name)).await {
    Ok(Ok(names)) => {
      info!("Found {} cached tiles in {:?}", names.len(), directory);
      let mut tracked = lock(&tracked);
      tracked.names.extend(names);
      tracked.initialized = true;
    }
    Ok(Err(e)) => warn!("Unable to initialize tile cache in {:?}: {}", directory, e),
    Err(e) => warn!("Tile cache scan of {:?} failed: {}", directory, e),
  }
}

fn scan_directory(directory: &Path, tile_name: &Regex) -> Result<HashSet<String>, CacheError> {
  std::fs::create_dir_all(directory)?;
  let pattern = format!(
    "{}/*.{}",
    Pattern::escape(&directory.to_string_lossy()),
    TILE_FILE_EXTENSION
  );

  let mut names = HashSet::new();
  for entry in glob(&pattern)? {
    let path = match entry {
      Ok(path) => path,
      Err(e) => {
        warn!("Skipping unreadable cache entry: {}", e);
        continue;
      }
    };
    match path.file_name().and_then(|name| name.to_str()) {
      Some(name) if tile_name.is_match(name) => {
        names.insert(name.to_string());
      }
      _ => trace!("Ignoring {:?}", path),
    }
  }
  Ok(names)
}

async fn persist(directory: &Path, name: &str, bitmap: Arc<TileBitmap>) -> Result<(), CacheError> {
  let data = task::spawn_blocking(move || codec::encode(&bitmap)).await??;
  tokio::fs::create_dir_all(directory).await?;
  let path = directory.join(name);
  let partial = path.with_extension(PARTIAL_FILE_EXTENSION);
  tokio::fs::write(&partial, &data).await?;
  tokio::fs::rename(&partial, &path).await?;
  debug!("Persisted {:?} ({} bytes)", path, data.len());
  Ok(())
}

#[async_trait]
impl TileCache for PersistentTileCache {
  fn add_tile_bitmap(&self, key: TileKey, bitmap: Arc<TileBitmap>) {
    let bitmap = if self.memory.put(key, bitmap.clone()) {
      bitmap
    } else {
      trace!("Tile {} already in memory", key);
      self.memory.get(&key).unwrap_or(bitmap)
    };

    let name = tile_file_name(&key);
    if !lock(&self.tracked).names.insert(name.clone()) {
      trace!("Tile {} already persisted", key);
      return;
    }

    let directory = self.directory.clone();
    let tracked = self.tracked.clone();
    self.spawn(async move {
      if let Err(e) = persist(&directory, &name, bitmap).await {
        warn!("Unable to persist tile {} in {:?}: {}", key, directory, e);
        lock(&tracked).names.remove(&name);
      }
    });
  }

  fn get_tile_bitmap(&self, key: &TileKey) -> Option<Arc<TileBitmap>> {
    self.memory.get(key)
  }

  async fn get_tile_bitmap_async(&self, key: &TileKey) -> Result<Option<Arc<TileBitmap>>, CacheError> {
    if let Some(bitmap) = self.memory.get(key) {
      return Ok(Some(bitmap));
    }
    let name = tile_file_name(key);
    if !self.is_tracked(&name) {
      return Ok(None);
    }

    let path = self.directory.join(&name);
    let data = match tokio::fs::read(&path).await {
      Ok(data) => data,
      Err(e) if e.kind() == ErrorKind::NotFound => {
        debug!("Tile {} vanished from {:?}", key, path);
        return Ok(None);
      }
      Err(e) => return Err(e.into()),
    };
    let bitmap = Arc::new(task::spawn_blocking(move || codec::decode(&data)).await??);
    trace!("Loaded tile {} from {:?}", key, path);

    if self.memory.put(*key, bitmap.clone()) {
      return Ok(Some(bitmap));
    }
    Ok(Some(self.memory.get(key).unwrap_or(bitmap)))
  }

  async fn purge(&self) -> usize {
    self.flush().await;
    let names: Vec<String> = lock(&self.tracked).names.iter().cloned().collect();
    // writes reserved before the snapshot must land before their files go
    self.flush().await;
    let total = names.len();

    let mut deleted = 0;
    for name in names {
      let path = self.directory.join(&name);
      match tokio::fs::remove_file(&path).await {
        Ok(()) => deleted += 1,
        Err(e) if e.kind() == ErrorKind::NotFound => trace!("{:?} already gone", path),
        Err(e) => {
          warn!("Unable to delete {:?}: {}", path, e);
          continue;
        }
      }
      lock(&self.tracked).names.remove(&name);
    }
    info!("Purged {} of {} tiles from {:?}", deleted, total, self.directory);
    deleted
  }

  fn dispose(&self) {
    debug!("Disposing memory tier of {:?}", self.directory);
    self.memory.dispose();
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::BoundedMemoryCache;
  use std::fs;
  use tempfile::{tempdir, TempDir};

  const PROFILE: &str = "default-day";

  fn bitmap(value: u8) -> Arc<TileBitmap> {
    Arc::new(TileBitmap::new(2, 2, vec![value; 16]).unwrap())
  }

  async fn setup(capacity: usize) -> (PersistentTileCache, TempDir) {
    let temp_dir = tempdir().unwrap();
    let memory = Arc::new(BoundedMemoryCache::new(capacity));
    let cache = PersistentTileCache::open(memory, temp_dir.path(), PROFILE).await.unwrap();
    (cache, temp_dir)
  }

  fn files_in(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
      .unwrap()
      .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
      .collect();
    names.sort();
    names
  }

  #[tokio::test]
  async fn first_writer_wins() {
    let (cache, temp_dir) = setup(16).await;
    let key = TileKey::new(10, 5, 5);
    let first = bitmap(1);

    cache.add_tile_bitmap(key, first.clone());
    cache.add_tile_bitmap(key, bitmap(2));
    assert!(Arc::ptr_eq(&cache.get_tile_bitmap(&key).unwrap(), &first));

    cache.flush().await;
    let dir = temp_dir.path().join(PROFILE);
    assert_eq!(files_in(&dir), vec!["10_5_5.png".to_string()]);
    let stored = codec::decode(&fs::read(dir.join("10_5_5.png")).unwrap()).unwrap();
    assert_eq!(&stored, first.as_ref());
    assert_eq!(cache.tracked_count(), 1);
  }

  #[tokio::test]
  async fn cold_start_loads_from_disk() {
    let temp_dir = tempdir().unwrap();
    let dir = temp_dir.path().join(PROFILE);
    fs::create_dir_all(&dir).unwrap();
    let stored = bitmap(7);
    fs::write(dir.join("10_5_5.png"), codec::encode(&stored).unwrap()).unwrap();

    let memory = Arc::new(BoundedMemoryCache::new(16));
    let cache = PersistentTileCache::open(memory, temp_dir.path(), PROFILE).await.unwrap();
    assert!(cache.is_initialized());
    assert_eq!(cache.tracked_count(), 1);

    let key = TileKey::new(10, 5, 5);
    assert!(cache.get_tile_bitmap(&key).is_none());
    let loaded = cache.get_tile_bitmap_async(&key).await.unwrap().unwrap();
    assert_eq!(loaded.as_ref(), stored.as_ref());
    assert!(Arc::ptr_eq(&cache.get_tile_bitmap(&key).unwrap(), &loaded));
  }

  #[tokio::test]
  async fn untracked_tile_is_not_found() {
    let (cache, _temp_dir) = setup(16).await;
    assert!(cache.get_tile_bitmap_async(&TileKey::new(3, 1, 1)).await.unwrap().is_none());
  }

  #[tokio::test]
  async fn corrupt_file_is_an_error() {
    let temp_dir = tempdir().unwrap();
    let dir = temp_dir.path().join(PROFILE);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("3_1_1.png"), b"garbage").unwrap();

    let memory = Arc::new(BoundedMemoryCache::new(16));
    let cache = PersistentTileCache::open(memory, temp_dir.path(), PROFILE).await.unwrap();
    let key = TileKey::new(3, 1, 1);
    assert!(matches!(cache.get_tile_bitmap_async(&key).await, Err(CacheError::Decode(_))));
    assert!(cache.get_tile_bitmap(&key).is_none());
  }

  #[tokio::test]
  async fn scan_ignores_foreign_files() {
    let temp_dir = tempdir().unwrap();
    let dir = temp_dir.path().join(PROFILE);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("notes.txt"), b"x").unwrap();
    fs::write(dir.join("tile.png"), b"x").unwrap();
    fs::write(dir.join("1_2_3.png.part"), b"x").unwrap();

    let memory = Arc::new(BoundedMemoryCache::new(16));
    let cache = PersistentTileCache::open(memory, temp_dir.path(), PROFILE).await.unwrap();
    assert_eq!(cache.tracked_count(), 0);
  }

  #[tokio::test]
  async fn purge_deletes_files_but_keeps_memory() {
    let (cache, temp_dir) = setup(16).await;
    let keys: Vec<TileKey> = (0..3).map(|x| TileKey::new(12, x, 9)).collect();
    for (i, key) in keys.iter().enumerate() {
      cache.add_tile_bitmap(*key, bitmap(i as u8));
    }
    cache.flush().await;
    assert_eq!(cache.tracked_count(), 3);

    assert_eq!(cache.purge().await, 3);
    assert_eq!(cache.tracked_count(), 0);
    assert!(files_in(&temp_dir.path().join(PROFILE)).is_empty());
    for key in keys.iter() {
      assert!(cache.get_tile_bitmap(key).is_some());
    }
  }

  #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
  async fn purge_concurrent_with_adds_keeps_disk_and_index_in_step() {
    let (cache, temp_dir) = setup(512).await;
    let cache = Arc::new(cache);
    let keys: Vec<TileKey> = (0..200).map(|x| TileKey::new(14, x, 7)).collect();
    for key in keys.iter() {
      cache.add_tile_bitmap(*key, bitmap(1));
    }
    cache.flush().await;

    let purge = tokio::spawn({
      let cache = cache.clone();
      async move { cache.purge().await }
    });
    for key in keys.iter() {
      cache.add_tile_bitmap(*key, bitmap(2));
      task::yield_now().await;
    }
    purge.await.unwrap();
    cache.flush().await;

    let mut tracked: Vec<String> = lock(&cache.tracked).names.iter().cloned().collect();
    tracked.sort();
    assert_eq!(tracked, files_in(&temp_dir.path().join(PROFILE)));
  }

  #[tokio::test]
  async fn lookup_before_scan_finishes_is_a_miss() {
    let temp_dir = tempdir().unwrap();
    let dir = temp_dir.path().join(PROFILE);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("10_5_5.png"), codec::encode(&bitmap(7)).unwrap()).unwrap();

    let memory = Arc::new(BoundedMemoryCache::new(16));
    let cache = PersistentTileCache::new(memory, temp_dir.path(), PROFILE).unwrap();
    // the scan task has not been polled yet on this single-threaded runtime
    assert!(!cache.is_initialized());
    let stored = TileKey::new(10, 5, 5);
    assert!(cache.get_tile_bitmap_async(&stored).await.unwrap().is_none());

    cache.add_tile_bitmap(TileKey::new(10, 6, 5), bitmap(8));
    cache.flush().await;
    assert!(cache.is_initialized());
    assert_eq!(cache.tracked_count(), 2);
    assert!(cache.get_tile_bitmap_async(&stored).await.unwrap().is_some());
  }

  #[tokio::test]
  async fn vanished_file_is_a_miss() {
    let (cache, temp_dir) = setup(16).await;
    let key = TileKey::new(9, 4, 4);
    cache.add_tile_bitmap(key, bitmap(6));
    cache.flush().await;
    cache.dispose();

    fs::remove_file(temp_dir.path().join(PROFILE).join("9_4_4.png")).unwrap();
    assert!(cache.is_tracked("9_4_4.png"));
    assert!(cache.get_tile_bitmap_async(&key).await.unwrap().is_none());
  }

  #[tokio::test]
  async fn write_failure_stays_in_memory() {
    let temp_dir = tempdir().unwrap();
    // a regular file where the profile directory should be
    fs::write(temp_dir.path().join(PROFILE), b"").unwrap();

    let memory = Arc::new(BoundedMemoryCache::new(16));
    let cache = PersistentTileCache::open(memory, temp_dir.path(), PROFILE).await.unwrap();
    assert!(!cache.is_initialized());

    let key = TileKey::new(4, 2, 2);
    cache.add_tile_bitmap(key, bitmap(3));
    assert!(cache.get_tile_bitmap(&key).is_some());
    cache.flush().await;
    assert_eq!(cache.tracked_count(), 0);
    assert!(cache.get_tile_bitmap_async(&key).await.unwrap().is_some());
  }

  #[tokio::test]
  async fn dispose_releases_memory_only() {
    let (cache, _temp_dir) = setup(16).await;
    let key = TileKey::new(6, 3, 3);
    cache.add_tile_bitmap(key, bitmap(5));
    cache.flush().await;

    cache.dispose();
    assert!(cache.get_tile_bitmap(&key).is_none());
    assert!(cache.get_tile_bitmap_async(&key).await.unwrap().is_some());
  }

  #[tokio::test]
  async fn usable_as_trait_object() {
    let (cache, _temp_dir) = setup(16).await;
    let cache: Arc<dyn TileCache> = Arc::new(cache);
    let key = TileKey::new(1, 0, 0);
    cache.add_tile_bitmap(key, bitmap(9));
    assert!(cache.get_tile_bitmap_async(&key).await.unwrap().is_some());
  }

  #[tokio::test]
  async fn rejects_profiles_with_separators() {
    let temp_dir = tempdir().unwrap();
    for profile in ["", "..", "a/b", "a\\b"] {
      let memory = Arc::new(BoundedMemoryCache::new(1));
      assert!(matches!(
        PersistentTileCache::new(memory, temp_dir.path(), profile),
        Err(CacheError::InvalidProfile(_))
      ));
    }
  }

  #[test]
  fn requires_runtime() {
    let temp_dir = tempdir().unwrap();
    let memory = Arc::new(BoundedMemoryCache::new(1));
    assert!(matches!(
      PersistentTileCache::new(memory, temp_dir.path(), PROFILE),
      Err(CacheError::NoRuntime)
    ));
  }

  #[test]
  fn file_name_is_derived_from_key() {
    assert_eq!(tile_file_name(&TileKey::new(10, 5, 6)), "10_5_6.png");
  }
}
