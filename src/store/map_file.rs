use log::{debug, info};
use memmap::{Mmap, MmapOptions};
use std::fs::File;
use std::path::{Path, PathBuf};

use crate::models::sub_file::SubFileParameter;
use crate::store::error::MapFileError;
use crate::store::header::sub_files::BYTES_PER_INDEX_ENTRY;
use crate::store::header::MapFileHeader;
use crate::store::read_buffer::ReadBuffer;

const BITMASK_INDEX_OFFSET: u64 = 0x7f_ffff_ffff;
const BITMASK_INDEX_WATER: u64 = 0x80_0000_0000;

/// Entry of a sub-file's block index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
  /// Absolute address of the block in the map file.
  pub block_address: u64,
  /// Set when the block is entirely covered by water.
  pub is_water: bool,
}

/// An opened, memory-mapped map file with its parsed header.
#[derive(Debug)]
pub struct MapFile {
  path: PathBuf,
  header: MapFileHeader,
  mmap: Mmap,
}

impl MapFile {
  pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, MapFileError> {
    let path = path.as_ref().to_path_buf();
    let file = File::open(&path)?;
    let file_size = file.metadata()?.len();
    // The file must not be modified while it is mapped.
    let mmap = unsafe { MmapOptions::new().map(&file)? };
    debug!("Mapped {:?} ({} bytes)", path, file_size);

    let header = MapFileHeader::read_header(&mmap, file_size)?;
    info!(
      "Opened {:?}: {} sub-files, zoom {}..={}",
      path,
      header.map_file_info().number_of_sub_files,
      header.map_file_info().zoom_level_min,
      header.map_file_info().zoom_level_max
    );
    Ok(MapFile { path, header, mmap })
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  pub fn header(&self) -> &MapFileHeader {
    &self.header
  }

  pub fn index_entry(&self, sub_file: &SubFileParameter, block: u64) -> Result<IndexEntry, MapFileError> {
    read_index_entry(&self.mmap, sub_file, block)
  }
}

/// Reads entry `block` of the index of `sub_file` from the file bytes.
pub fn read_index_entry(
  data: &[u8],
  sub_file: &SubFileParameter,
  block: u64,
) -> Result<IndexEntry, MapFileError> {
  if block >= sub_file.number_of_blocks {
    return Err(MapFileError::BlockOutOfRange { block, blocks: sub_file.number_of_blocks });
  }
  let offset = sub_file.index_start_address + block * BYTES_PER_INDEX_ENTRY;
  let mut buffer = ReadBuffer::new(data);
  buffer.set_offset(offset as usize)?;
  let raw = buffer.read_five_bytes_long()?;

  Ok(IndexEntry {
    block_address: sub_file.start_address + (raw & BITMASK_INDEX_OFFSET),
    is_water: raw & BITMASK_INDEX_WATER != 0,
  })
}
