use thiserror::Error;

/// Errors raised while opening or decoding a map file. All of them are
/// fatal to the current parse.
#[derive(Error, Debug)]
pub enum MapFileError {
  #[error("buffer underflow: need {needed} bytes at offset {offset}, {remaining} remaining")]
  BufferUnderflow { offset: usize, needed: usize, remaining: usize },

  #[error("invalid UTF-8 string at offset {0}")]
  InvalidUtf8(usize),

  #[error("variable length integer at offset {0} is too long")]
  VariableIntOverflow(usize),

  #[error("invalid magic byte: {0:?}")]
  InvalidMagic(String),

  #[error("invalid remaining header size: {0}")]
  InvalidHeaderSize(i32),

  #[error("unsupported file version: {0}")]
  UnsupportedVersion(i32),

  #[error("invalid file size: header declares {declared}, actual size is {actual}")]
  FileSizeMismatch { declared: i64, actual: u64 },

  #[error("invalid map date: {0}")]
  InvalidMapDate(i64),

  #[error("invalid bounding box: {0}")]
  InvalidBoundingBox(String),

  #[error("invalid tile pixel size: {0}")]
  InvalidTilePixelSize(i16),

  #[error("empty projection name")]
  EmptyProjection,

  #[error("invalid map start position: {latitude}, {longitude}")]
  InvalidStartPosition { latitude: f64, longitude: f64 },

  #[error("invalid map start zoom level: {0}")]
  InvalidStartZoomLevel(u8),

  #[error("invalid number of {kind} tags: {count}")]
  InvalidTagCount { kind: &'static str, count: i16 },

  #[error("invalid number of sub-files: {0}")]
  InvalidNumberOfSubFiles(u8),

  #[error("invalid base zoom level: {0}")]
  InvalidBaseZoomLevel(u8),

  #[error("invalid minimum zoom level: {0}")]
  InvalidZoomLevelMin(u8),

  #[error("invalid maximum zoom level: {0}")]
  InvalidZoomLevelMax(u8),

  #[error("invalid zoom level range: {min} {max}")]
  InvalidZoomLevelRange { min: u8, max: u8 },

  #[error("invalid start address: {0}")]
  InvalidStartAddress(i64),

  #[error("invalid sub-file size: {0}")]
  InvalidSubFileSize(i64),

  #[error("block {block} out of range, sub-file has {blocks} blocks")]
  BlockOutOfRange { block: u64, blocks: u64 },

  #[error("IO error: {0}")]
  Io(#[from] std::io::Error),
}
