use serde::Serialize;

use crate::models::geo::{BoundingBox, LatLong};

/// Global metadata of an opened map file. Built once by the header parser.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapFileInfo {
  pub file_version: u32,
  pub file_size: u64,
  /// Milliseconds since the epoch, UTC.
  pub map_date: i64,
  pub bounding_box: BoundingBox,
  pub tile_pixel_size: u16,
  pub projection_name: String,
  pub debug_file: bool,
  pub start_position: Option<LatLong>,
  pub start_zoom_level: Option<u8>,
  pub language_preference: Option<String>,
  pub comment: Option<String>,
  pub created_by: Option<String>,
  /// Index into the table is the tag id used by way and POI records.
  pub poi_tags: Vec<String>,
  pub way_tags: Vec<String>,
  pub number_of_sub_files: u8,
  pub zoom_level_min: u8,
  pub zoom_level_max: u8,
}
