use clap::Parser;
use log::{info, warn};
use serde::Serialize;
use std::error::Error;

use crate::models::map_info::MapFileInfo;
use crate::models::sub_file::SubFileParameter;
use crate::store::header::MapFileHeader;
use crate::store::map_file::MapFile;

#[derive(Parser)]
pub struct InfoCommand {
  // Map file to inspect
  #[clap(required=true)]
  map_file: String,
}

#[derive(Debug, Serialize)]
struct ZoomEntry {
  zoom: u8,
  sub_file: Option<usize>,
}

#[derive(Debug, Serialize)]
struct InfoReport<'a> {
  map: &'a MapFileInfo,
  sub_files: &'a [SubFileParameter],
  zoom_table: Vec<ZoomEntry>,
}

fn report(header: &MapFileHeader) -> InfoReport<'_> {
  let info = header.map_file_info();
  let sub_files = header.sub_file_parameters();
  let zoom_table = (info.zoom_level_min..=info.zoom_level_max)
    .map(|zoom| ZoomEntry {
      zoom,
      sub_file: header
        .sub_file_parameter(zoom)
        .and_then(|p| sub_files.iter().position(|s| std::ptr::eq(s, p))),
    })
    .collect();
  InfoReport { map: info, sub_files, zoom_table }
}

impl InfoCommand {
  pub fn execute(&self) -> Result<(), Box<dyn Error>> {
    let map = MapFile::open(&self.map_file)?;
    let header = map.header();
    let info = header.map_file_info();

    if let Some(position) = info.start_position {
      if !info.bounding_box.contains(position) {
        warn!("Start position {:?} lies outside the bounding box", position);
      }
    }
    for (i, sub_file) in header.sub_file_parameters().iter().enumerate() {
      match map.index_entry(sub_file, 0) {
        Ok(entry) => info!(
          "Sub-file {} of {:?}: first block at {}, water: {}",
          i,
          map.path(),
          entry.block_address,
          entry.is_water
        ),
        Err(e) => warn!("Sub-file {} has an unreadable index: {}", i, e),
      }
    }

    print!("{}", serde_yaml::to_string(&report(header))?);
    Ok(())
  }
}
