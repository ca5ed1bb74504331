use crate::store::error::MapFileError;
use crate::store::read_buffer::ReadBuffer;

/// POI and way tag tables. A tag's position in its table is the id the
/// sub-file records refer to.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TagTables {
  pub poi_tags: Vec<String>,
  pub way_tags: Vec<String>,
}

impl TagTables {
  pub fn read(buffer: &mut ReadBuffer) -> Result<Self, MapFileError> {
    let poi_tags = read_tags(buffer, "POI")?;
    let way_tags = read_tags(buffer, "way")?;
    Ok(TagTables { poi_tags, way_tags })
  }
}

fn read_tags(buffer: &mut ReadBuffer, kind: &'static str) -> Result<Vec<String>, MapFileError> {
  let count = buffer.read_short()?;
  if count < 0 {
    return Err(MapFileError::InvalidTagCount { kind, count });
  }
  (0..count).map(|_| buffer.read_utf8_string()).collect()
}
