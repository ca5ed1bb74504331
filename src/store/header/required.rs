use crate::models::geo::{self, BoundingBox};
use crate::store::error::MapFileError;
use crate::store::read_buffer::ReadBuffer;

pub const BINARY_OSM_MAGIC_BYTE: &[u8] = b"mapsforge binary OSM";

/// Bounds of the header size field, which counts the bytes after itself.
pub const HEADER_SIZE_MIN: i32 = 70;
pub const HEADER_SIZE_MAX: i32 = 1_000_000;

/// Only versions 3 to 5 are read. Versions 1 and 2 and anything above 5 are
/// rejected even though they are positive.
pub const SUPPORTED_FILE_VERSION_MIN: i32 = 3;
pub const SUPPORTED_FILE_VERSION_MAX: i32 = 5;

/// 2008-01-10, older dates predate the format.
pub const MAP_DATE_MIN: i64 = 1_200_000_000_000;

/// First stage of the header: the fields every map file carries in a fixed
/// order before the optional fields flag byte.
#[derive(Debug, Clone, PartialEq)]
pub struct RequiredFields {
  pub header_size: usize,
  pub file_version: u32,
  pub file_size: u64,
  pub map_date: i64,
  pub bounding_box: BoundingBox,
  pub tile_pixel_size: u16,
  pub projection_name: String,
}

impl RequiredFields {
  pub fn read(buffer: &mut ReadBuffer, file_size: u64) -> Result<Self, MapFileError> {
    read_magic_byte(buffer)?;
    let header_size = read_remaining_header_size(buffer)?;
    Ok(RequiredFields {
      header_size,
      file_version: read_file_version(buffer)?,
      file_size: read_file_size(buffer, file_size)?,
      map_date: read_map_date(buffer)?,
      bounding_box: read_bounding_box(buffer)?,
      tile_pixel_size: read_tile_pixel_size(buffer)?,
      projection_name: read_projection_name(buffer)?,
    })
  }
}

fn read_magic_byte(buffer: &mut ReadBuffer) -> Result<(), MapFileError> {
  let magic = buffer.read_bytes(BINARY_OSM_MAGIC_BYTE.len())?;
  if magic != BINARY_OSM_MAGIC_BYTE {
    return Err(MapFileError::InvalidMagic(String::from_utf8_lossy(magic).into_owned()));
  }
  Ok(())
}

fn read_remaining_header_size(buffer: &mut ReadBuffer) -> Result<usize, MapFileError> {
  let size = buffer.read_int()?;
  if !(HEADER_SIZE_MIN..=HEADER_SIZE_MAX).contains(&size) {
    return Err(MapFileError::InvalidHeaderSize(size));
  }
  let size = size as usize;
  if buffer.remaining() < size {
    return Err(MapFileError::BufferUnderflow {
      offset: buffer.offset(),
      needed: size,
      remaining: buffer.remaining(),
    });
  }
  Ok(size)
}

fn read_file_version(buffer: &mut ReadBuffer) -> Result<u32, MapFileError> {
  let version = buffer.read_int()?;
  if !(SUPPORTED_FILE_VERSION_MIN..=SUPPORTED_FILE_VERSION_MAX).contains(&version) {
    return Err(MapFileError::UnsupportedVersion(version));
  }
  Ok(version as u32)
}

fn read_file_size(buffer: &mut ReadBuffer, actual: u64) -> Result<u64, MapFileError> {
  let declared = buffer.read_long()?;
  if declared < 0 || declared as u64 != actual {
    return Err(MapFileError::FileSizeMismatch { declared, actual });
  }
  Ok(actual)
}

fn read_map_date(buffer: &mut ReadBuffer) -> Result<i64, MapFileError> {
  let date = buffer.read_long()?;
  if date < MAP_DATE_MIN {
    return Err(MapFileError::InvalidMapDate(date));
  }
  Ok(date)
}

fn read_bounding_box(buffer: &mut ReadBuffer) -> Result<BoundingBox, MapFileError> {
  let min_latitude = geo::microdegrees_to_degrees(buffer.read_int()?);
  let min_longitude = geo::microdegrees_to_degrees(buffer.read_int()?);
  let max_latitude = geo::microdegrees_to_degrees(buffer.read_int()?);
  let max_longitude = geo::microdegrees_to_degrees(buffer.read_int()?);

  for latitude in [min_latitude, max_latitude] {
    if !geo::is_valid_latitude(latitude) {
      return Err(MapFileError::InvalidBoundingBox(format!("latitude {} out of range", latitude)));
    }
  }
  for longitude in [min_longitude, max_longitude] {
    if !geo::is_valid_longitude(longitude) {
      return Err(MapFileError::InvalidBoundingBox(format!("longitude {} out of range", longitude)));
    }
  }
  if min_latitude > max_latitude {
    return Err(MapFileError::InvalidBoundingBox(format!(
      "min latitude {} > max latitude {}",
      min_latitude, max_latitude
    )));
  }
  if min_longitude > max_longitude {
    return Err(MapFileError::InvalidBoundingBox(format!(
      "min longitude {} > max longitude {}",
      min_longitude, max_longitude
    )));
  }

  Ok(BoundingBox { min_latitude, min_longitude, max_latitude, max_longitude })
}

fn read_tile_pixel_size(buffer: &mut ReadBuffer) -> Result<u16, MapFileError> {
  let size = buffer.read_short()?;
  if size <= 0 {
    return Err(MapFileError::InvalidTilePixelSize(size));
  }
  Ok(size as u16)
}

fn read_projection_name(buffer: &mut ReadBuffer) -> Result<String, MapFileError> {
  let name = buffer.read_utf8_string()?;
  if name.is_empty() {
    return Err(MapFileError::EmptyProjection);
  }
  Ok(name)
}
