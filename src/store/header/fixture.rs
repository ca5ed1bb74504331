//! Encoder for synthetic map file headers used by the parser tests.

use crate::store::header::required::BINARY_OSM_MAGIC_BYTE;

#[derive(Debug, Clone)]
pub struct SyntheticSubFile {
  pub base_zoom_level: u8,
  pub zoom_level_min: u8,
  pub zoom_level_max: u8,
  pub start_address: i64,
  pub size: i64,
}

impl SyntheticSubFile {
  pub fn new(base_zoom_level: u8, zoom_level_min: u8, zoom_level_max: u8, start_address: i64, size: i64) -> Self {
    SyntheticSubFile { base_zoom_level, zoom_level_min, zoom_level_max, start_address, size }
  }
}

#[derive(Debug, Clone)]
pub struct SyntheticHeader {
  pub magic: Vec<u8>,
  /// Overrides the computed remaining header size.
  pub header_size: Option<i32>,
  pub file_version: i32,
  pub file_size: i64,
  pub map_date: i64,
  /// Microdegrees: min lat, min lon, max lat, max lon.
  pub bounding_box: [i32; 4],
  pub tile_pixel_size: i16,
  pub projection_name: String,
  pub debug_file: bool,
  pub start_position: Option<(i32, i32)>,
  pub start_zoom_level: Option<u8>,
  pub language_preference: Option<String>,
  pub comment: Option<String>,
  pub created_by: Option<String>,
  pub poi_tags: Vec<String>,
  pub way_tags: Vec<String>,
  pub sub_files: Vec<SyntheticSubFile>,
}

impl Default for SyntheticHeader {
  fn default() -> Self {
    SyntheticHeader {
      magic: BINARY_OSM_MAGIC_BYTE.to_vec(),
      header_size: None,
      file_version: 5,
      file_size: 4096,
      map_date: 1_600_000_000_000,
      bounding_box: [52_300_000, 13_000_000, 52_700_000, 13_800_000],
      tile_pixel_size: 256,
      projection_name: "Mercator".to_string(),
      debug_file: false,
      start_position: None,
      start_zoom_level: None,
      language_preference: None,
      comment: None,
      created_by: None,
      poi_tags: vec!["amenity=cafe".to_string(), "shop=bakery".to_string()],
      way_tags: vec!["highway=primary".to_string(), "building=yes".to_string()],
      sub_files: vec![SyntheticSubFile::new(7, 0, 10, 100, 1000)],
    }
  }
}

fn write_unsigned_int(out: &mut Vec<u8>, mut value: u32) {
  while value > 0x7f {
    out.push((value & 0x7f) as u8 | 0x80);
    value >>= 7;
  }
  out.push(value as u8);
}

fn write_string(out: &mut Vec<u8>, value: &str) {
  write_unsigned_int(out, value.len() as u32);
  out.extend_from_slice(value.as_bytes());
}

impl SyntheticHeader {
  pub fn encode(&self) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&self.file_version.to_be_bytes());
    body.extend_from_slice(&self.file_size.to_be_bytes());
    body.extend_from_slice(&self.map_date.to_be_bytes());
    for coordinate in self.bounding_box {
      body.extend_from_slice(&coordinate.to_be_bytes());
    }
    body.extend_from_slice(&self.tile_pixel_size.to_be_bytes());
    write_string(&mut body, &self.projection_name);

    let mut flags = 0u8;
    if self.debug_file {
      flags |= 0x80;
    }
    if self.start_position.is_some() {
      flags |= 0x40;
    }
    if self.start_zoom_level.is_some() {
      flags |= 0x20;
    }
    if self.language_preference.is_some() {
      flags |= 0x10;
    }
    if self.comment.is_some() {
      flags |= 0x08;
    }
    if self.created_by.is_some() {
      flags |= 0x04;
    }
    body.push(flags);
    if let Some((latitude, longitude)) = self.start_position {
      body.extend_from_slice(&latitude.to_be_bytes());
      body.extend_from_slice(&longitude.to_be_bytes());
    }
    if let Some(zoom) = self.start_zoom_level {
      body.push(zoom);
    }
    for value in [&self.language_preference, &self.comment, &self.created_by].into_iter().flatten() {
      write_string(&mut body, value);
    }

    for tags in [&self.poi_tags, &self.way_tags] {
      body.extend_from_slice(&(tags.len() as i16).to_be_bytes());
      for tag in tags {
        write_string(&mut body, tag);
      }
    }

    body.push(self.sub_files.len() as u8);
    for sub_file in &self.sub_files {
      body.push(sub_file.base_zoom_level);
      body.push(sub_file.zoom_level_min);
      body.push(sub_file.zoom_level_max);
      body.extend_from_slice(&sub_file.start_address.to_be_bytes());
      body.extend_from_slice(&sub_file.size.to_be_bytes());
    }

    let header_size = self.header_size.unwrap_or(body.len() as i32);
    let mut out = self.magic.clone();
    out.extend_from_slice(&header_size.to_be_bytes());
    out.extend_from_slice(&body);
    out
  }

  /// The encoded header padded with zeros up to the declared file size.
  pub fn encode_file(&self) -> Vec<u8> {
    let mut out = self.encode();
    out.resize(self.file_size as usize, 0);
    out
  }
}
