//! Map file header parser.
//!
//! The header is read in stages, each a function of the read buffer and the
//! stages before it:
//!
//! 1. [`RequiredFields`]: magic byte, sizes, version, date, bounding box,
//!    tile size and projection.
//! 2. [`OptionalFields`]: flags byte and the fields it gates.
//! 3. [`TagTables`]: POI and way tag names.
//! 4. [`SubFileTable`]: sub-file descriptors and the zoom level index.
//!
//! [`MapFileHeader::read_header`] runs the stages and finalizes a
//! [`MapFileInfo`]. A failing stage aborts the parse and nothing is returned.

pub mod optional;
pub mod required;
pub mod sub_files;
pub mod tags;

#[cfg(test)]
pub mod fixture;

use log::debug;

use crate::models::map_info::MapFileInfo;
use crate::models::sub_file::SubFileParameter;
use crate::store::error::MapFileError;
use crate::store::read_buffer::ReadBuffer;

pub use optional::OptionalFields;
pub use required::RequiredFields;
pub use sub_files::SubFileTable;
pub use tags::TagTables;

#[derive(Debug, Clone, PartialEq)]
pub struct MapFileHeader {
  map_file_info: MapFileInfo,
  sub_files: SubFileTable,
}

impl MapFileHeader {
  /// Parses the header at the start of `buffer`. `file_size` is the size of
  /// the whole map file, which may be larger than `buffer`.
  pub fn read_header(buffer: &[u8], file_size: u64) -> Result<Self, MapFileError> {
    let mut buffer = ReadBuffer::new(buffer);
    let required = RequiredFields::read(&mut buffer, file_size)?;
    let optional = OptionalFields::read(&mut buffer)?;
    let tags = TagTables::read(&mut buffer)?;
    let sub_files = SubFileTable::read(&mut buffer, &required, &optional)?;

    let header_end = required::BINARY_OSM_MAGIC_BYTE.len() + 4 + required.header_size;
    if buffer.offset() > header_end {
      return Err(MapFileError::InvalidHeaderSize(required.header_size as i32));
    }

    let map_file_info = finalize(required, optional, tags, &sub_files)?;
    debug!(
      "Read header: version {}, {} sub-files, zoom {}..={}",
      map_file_info.file_version,
      map_file_info.number_of_sub_files,
      map_file_info.zoom_level_min,
      map_file_info.zoom_level_max
    );
    Ok(MapFileHeader { map_file_info, sub_files })
  }

  pub fn map_file_info(&self) -> &MapFileInfo {
    &self.map_file_info
  }

  /// Descriptors in file order.
  pub fn sub_file_parameters(&self) -> &[SubFileParameter] {
    self.sub_files.parameters()
  }

  /// Clamps `zoom` into the zoom range covered by the file.
  pub fn query_zoom_level(&self, zoom: u8) -> u8 {
    self.sub_files.query_zoom_level(zoom)
  }

  /// Sub-file serving `query_zoom`, which must come from
  /// [`query_zoom_level`](Self::query_zoom_level). `None` only for zoom levels
  /// that fall into a gap between sub-file ranges.
  pub fn sub_file_parameter(&self, query_zoom: u8) -> Option<&SubFileParameter> {
    self.sub_files.get(query_zoom)
  }
}

fn finalize(
  required: RequiredFields,
  optional: OptionalFields,
  tags: TagTables,
  sub_files: &SubFileTable,
) -> Result<MapFileInfo, MapFileError> {
  let (min, max) = (sub_files.zoom_level_min(), sub_files.zoom_level_max());
  if min > max {
    return Err(MapFileError::InvalidZoomLevelRange { min, max });
  }

  Ok(MapFileInfo {
    file_version: required.file_version,
    file_size: required.file_size,
    map_date: required.map_date,
    bounding_box: required.bounding_box,
    tile_pixel_size: required.tile_pixel_size,
    projection_name: required.projection_name,
    debug_file: optional.debug_file,
    start_position: optional.start_position,
    start_zoom_level: optional.start_zoom_level,
    language_preference: optional.language_preference,
    comment: optional.comment,
    created_by: optional.created_by,
    poi_tags: tags.poi_tags,
    way_tags: tags.way_tags,
    number_of_sub_files: sub_files.parameters().len() as u8,
    zoom_level_min: min,
    zoom_level_max: max,
  })
}
