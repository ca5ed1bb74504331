use serde::Serialize;

use crate::models::geo::BoundingBox;

/// Descriptor of one sub-file, covering the zoom levels
/// `zoom_level_min..=zoom_level_max`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubFileParameter {
  pub base_zoom_level: u8,
  pub zoom_level_min: u8,
  pub zoom_level_max: u8,
  pub start_address: u64,
  /// Equal to `start_address` unless the file carries debug signatures.
  pub index_start_address: u64,
  pub index_end_address: u64,
  pub sub_file_size: u64,
  pub bounding_box: BoundingBox,
  pub boundary_tile_left: u32,
  pub boundary_tile_right: u32,
  pub boundary_tile_top: u32,
  pub boundary_tile_bottom: u32,
  pub blocks_width: u32,
  pub blocks_height: u32,
  pub number_of_blocks: u64,
}
