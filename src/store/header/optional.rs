use crate::models::geo::{self, LatLong};
use crate::store::error::MapFileError;
use crate::store::read_buffer::ReadBuffer;

const HEADER_BITMASK_DEBUG: u8 = 0x80;
const HEADER_BITMASK_START_POSITION: u8 = 0x40;
const HEADER_BITMASK_START_ZOOM_LEVEL: u8 = 0x20;
const HEADER_BITMASK_LANGUAGE_PREFERENCE: u8 = 0x10;
const HEADER_BITMASK_COMMENT: u8 = 0x08;
const HEADER_BITMASK_CREATED_BY: u8 = 0x04;

pub const START_ZOOM_LEVEL_MAX: u8 = 22;

/// Fields gated by the flags byte that follows the projection name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OptionalFields {
  /// Debug files prefix index and block data with signatures.
  pub debug_file: bool,
  pub start_position: Option<LatLong>,
  pub start_zoom_level: Option<u8>,
  pub language_preference: Option<String>,
  pub comment: Option<String>,
  pub created_by: Option<String>,
}

impl OptionalFields {
  pub fn read(buffer: &mut ReadBuffer) -> Result<Self, MapFileError> {
    let flags = buffer.read_byte()?;
    let is_set = |mask: u8| flags & mask != 0;

    let start_position = if is_set(HEADER_BITMASK_START_POSITION) {
      Some(read_start_position(buffer)?)
    } else {
      None
    };
    let start_zoom_level = if is_set(HEADER_BITMASK_START_ZOOM_LEVEL) {
      Some(read_start_zoom_level(buffer)?)
    } else {
      None
    };
    let language_preference = read_optional_string(buffer, is_set(HEADER_BITMASK_LANGUAGE_PREFERENCE))?;
    let comment = read_optional_string(buffer, is_set(HEADER_BITMASK_COMMENT))?;
    let created_by = read_optional_string(buffer, is_set(HEADER_BITMASK_CREATED_BY))?;

    Ok(OptionalFields {
      debug_file: is_set(HEADER_BITMASK_DEBUG),
      start_position,
      start_zoom_level,
      language_preference,
      comment,
      created_by,
    })
  }
}

fn read_start_position(buffer: &mut ReadBuffer) -> Result<LatLong, MapFileError> {
  let latitude = geo::microdegrees_to_degrees(buffer.read_int()?);
  let longitude = geo::microdegrees_to_degrees(buffer.read_int()?);
  if !geo::is_valid_latitude(latitude) || !geo::is_valid_longitude(longitude) {
    return Err(MapFileError::InvalidStartPosition { latitude, longitude });
  }
  Ok(LatLong { latitude, longitude })
}

fn read_start_zoom_level(buffer: &mut ReadBuffer) -> Result<u8, MapFileError> {
  let zoom = buffer.read_byte()?;
  if zoom > START_ZOOM_LEVEL_MAX {
    return Err(MapFileError::InvalidStartZoomLevel(zoom));
  }
  Ok(zoom)
}

fn read_optional_string(buffer: &mut ReadBuffer, present: bool) -> Result<Option<String>, MapFileError> {
  if !present {
    return Ok(None);
  }
  buffer.read_utf8_string().map(Some)
}
