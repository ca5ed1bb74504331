use crate::models::geo::{self, BoundingBox};
use crate::models::sub_file::SubFileParameter;
use crate::store::error::MapFileError;
use crate::store::header::optional::OptionalFields;
use crate::store::header::required::{RequiredFields, HEADER_SIZE_MIN};
use crate::store::read_buffer::ReadBuffer;

pub const BASE_ZOOM_LEVEL_MAX: u8 = 20;
pub const ZOOM_LEVEL_MAX: u8 = 22;

/// Length of the `+++IndexStart+++` signature in debug files.
pub const SIGNATURE_LENGTH_INDEX: u64 = 16;
pub const BYTES_PER_INDEX_ENTRY: u64 = 5;

/// Sub-file descriptors in file order plus a dense zoom level index into them.
#[derive(Debug, Clone, PartialEq)]
pub struct SubFileTable {
  parameters: Vec<SubFileParameter>,
  zoom_table: Vec<Option<usize>>,
  zoom_level_min: u8,
  zoom_level_max: u8,
}

impl SubFileTable {
  pub fn read(
    buffer: &mut ReadBuffer,
    required: &RequiredFields,
    optional: &OptionalFields,
  ) -> Result<Self, MapFileError> {
    let count = buffer.read_byte()?;
    if count < 1 {
      return Err(MapFileError::InvalidNumberOfSubFiles(count));
    }

    let parameters = (0..count)
      .map(|_| {
        read_parameter(buffer, required.file_size, required.bounding_box, optional.debug_file)
      })
      .collect::<Result<Vec<_>, _>>()?;

    Ok(Self::build(parameters))
  }

  /// Every zoom level of a descriptor's range points at it; on overlap the
  /// later descriptor wins.
  fn build(parameters: Vec<SubFileParameter>) -> Self {
    let zoom_level_min = parameters.iter().map(|p| p.zoom_level_min).min().unwrap_or(0);
    let zoom_level_max = parameters.iter().map(|p| p.zoom_level_max).max().unwrap_or(0);

    let mut zoom_table = vec![None; zoom_level_max as usize + 1];
    for (index, parameter) in parameters.iter().enumerate() {
      for zoom in parameter.zoom_level_min..=parameter.zoom_level_max {
        zoom_table[zoom as usize] = Some(index);
      }
    }

    SubFileTable { parameters, zoom_table, zoom_level_min, zoom_level_max }
  }

  pub fn parameters(&self) -> &[SubFileParameter] {
    &self.parameters
  }

  pub fn zoom_level_min(&self) -> u8 {
    self.zoom_level_min
  }

  pub fn zoom_level_max(&self) -> u8 {
    self.zoom_level_max
  }

  pub fn query_zoom_level(&self, zoom: u8) -> u8 {
    zoom.clamp(self.zoom_level_min, self.zoom_level_max)
  }

  pub fn get(&self, query_zoom: u8) -> Option<&SubFileParameter> {
    debug_assert!(
      (self.zoom_level_min..=self.zoom_level_max).contains(&query_zoom),
      "zoom level {} not clamped",
      query_zoom
    );
    self
      .zoom_table
      .get(query_zoom as usize)
      .copied()
      .flatten()
      .map(|index| &self.parameters[index])
  }
}

fn read_parameter(
  buffer: &mut ReadBuffer,
  file_size: u64,
  bounding_box: BoundingBox,
  debug_file: bool,
) -> Result<SubFileParameter, MapFileError> {
  let base_zoom_level = buffer.read_byte()?;
  if base_zoom_level > BASE_ZOOM_LEVEL_MAX {
    return Err(MapFileError::InvalidBaseZoomLevel(base_zoom_level));
  }

  let zoom_level_min = buffer.read_byte()?;
  if zoom_level_min > ZOOM_LEVEL_MAX {
    return Err(MapFileError::InvalidZoomLevelMin(zoom_level_min));
  }

  let zoom_level_max = buffer.read_byte()?;
  if zoom_level_max > ZOOM_LEVEL_MAX {
    return Err(MapFileError::InvalidZoomLevelMax(zoom_level_max));
  }
  if zoom_level_min > zoom_level_max {
    return Err(MapFileError::InvalidZoomLevelRange { min: zoom_level_min, max: zoom_level_max });
  }

  let start_address = buffer.read_long()?;
  if start_address < HEADER_SIZE_MIN as i64 || start_address as u64 >= file_size {
    return Err(MapFileError::InvalidStartAddress(start_address));
  }
  let start_address = start_address as u64;

  let sub_file_size = buffer.read_long()?;
  if sub_file_size < 1 {
    return Err(MapFileError::InvalidSubFileSize(sub_file_size));
  }

  let index_start_address = if debug_file {
    start_address + SIGNATURE_LENGTH_INDEX
  } else {
    start_address
  };

  let boundary_tile_left = geo::longitude_to_tile_x(bounding_box.min_longitude, base_zoom_level);
  let boundary_tile_right = geo::longitude_to_tile_x(bounding_box.max_longitude, base_zoom_level);
  let boundary_tile_top = geo::latitude_to_tile_y(bounding_box.max_latitude, base_zoom_level);
  let boundary_tile_bottom = geo::latitude_to_tile_y(bounding_box.min_latitude, base_zoom_level);
  let blocks_width = boundary_tile_right - boundary_tile_left + 1;
  let blocks_height = boundary_tile_bottom - boundary_tile_top + 1;
  let number_of_blocks = blocks_width as u64 * blocks_height as u64;

  Ok(SubFileParameter {
    base_zoom_level,
    zoom_level_min,
    zoom_level_max,
    start_address,
    index_start_address,
    index_end_address: index_start_address + number_of_blocks * BYTES_PER_INDEX_ENTRY,
    sub_file_size: sub_file_size as u64,
    bounding_box,
    boundary_tile_left,
    boundary_tile_right,
    boundary_tile_top,
    boundary_tile_bottom,
    blocks_width,
    blocks_height,
    number_of_blocks,
  })
}
