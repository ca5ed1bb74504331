use serde::Serialize;

pub const LATITUDE_MAX: f64 = 90.0;
pub const LATITUDE_MIN: f64 = -90.0;
pub const LONGITUDE_MAX: f64 = 180.0;
pub const LONGITUDE_MIN: f64 = -180.0;

/// Highest latitude representable in the Web-Mercator tile grid.
pub const MERCATOR_LATITUDE_MAX: f64 = 85.051_128_779_806_59;

const CONVERSION_FACTOR: f64 = 1_000_000.0;

pub fn microdegrees_to_degrees(microdegrees: i32) -> f64 {
  microdegrees as f64 / CONVERSION_FACTOR
}

pub fn is_valid_latitude(latitude: f64) -> bool {
  (LATITUDE_MIN..=LATITUDE_MAX).contains(&latitude)
}

pub fn is_valid_longitude(longitude: f64) -> bool {
  (LONGITUDE_MIN..=LONGITUDE_MAX).contains(&longitude)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LatLong {
  pub latitude: f64,
  pub longitude: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundingBox {
  pub min_latitude: f64,
  pub min_longitude: f64,
  pub max_latitude: f64,
  pub max_longitude: f64,
}

impl BoundingBox {
  pub fn contains(&self, point: LatLong) -> bool {
    point.latitude >= self.min_latitude
      && point.latitude <= self.max_latitude
      && point.longitude >= self.min_longitude
      && point.longitude <= self.max_longitude
  }
}

fn max_tile_number(zoom: u8) -> u32 {
  ((1u64 << zoom) - 1) as u32
}

/// Tile column containing `longitude` at `zoom`.
pub fn longitude_to_tile_x(longitude: f64, zoom: u8) -> u32 {
  let scale = (1u64 << zoom) as f64;
  let x = ((longitude + 180.0) / 360.0 * scale).floor();
  x.clamp(0.0, max_tile_number(zoom) as f64) as u32
}

/// Tile row containing `latitude` at `zoom`. Rows grow southwards.
pub fn latitude_to_tile_y(latitude: f64, zoom: u8) -> u32 {
  let latitude = latitude.clamp(-MERCATOR_LATITUDE_MAX, MERCATOR_LATITUDE_MAX);
  let sin_latitude = latitude.to_radians().sin();
  let y = 0.5 - ((1.0 + sin_latitude) / (1.0 - sin_latitude)).ln() / (4.0 * std::f64::consts::PI);
  let scale = (1u64 << zoom) as f64;
  (y * scale).floor().clamp(0.0, max_tile_number(zoom) as f64) as u32
}
