use std::fmt;
use thiserror::Error;

/// Pixel buffer that does not match the bitmap's dimensions.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("invalid bitmap: {width}x{height} with {len} bytes")]
pub struct InvalidBitmap {
  pub width: u32,
  pub height: u32,
  pub len: usize,
}

/// Identifies one rendered tile within a render profile.
#[derive(Debug, Clone, Copy, Eq, Hash, PartialEq)]
pub struct TileKey {
  pub zoom: u8,
  pub x: u32,
  pub y: u32,
}

impl TileKey {
  pub fn new(zoom: u8, x: u32, y: u32) -> Self {
    TileKey { zoom, x, y }
  }
}

impl fmt::Display for TileKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}/{}/{}", self.zoom, self.x, self.y)
  }
}

/// Decoded tile image, 8-bit RGBA, rows top to bottom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileBitmap {
  width: u32,
  height: u32,
  pixels: Vec<u8>,
}

impl TileBitmap {
  pub const BYTES_PER_PIXEL: usize = 4;

  pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, InvalidBitmap> {
    let expected = width as usize * height as usize * Self::BYTES_PER_PIXEL;
    if width == 0 || height == 0 || pixels.len() != expected {
      return Err(InvalidBitmap { width, height, len: pixels.len() });
    }
    Ok(TileBitmap { width, height, pixels })
  }

  pub fn width(&self) -> u32 {
    self.width
  }

  pub fn height(&self) -> u32 {
    self.height
  }

  pub fn pixels(&self) -> &[u8] {
    &self.pixels
  }
}
