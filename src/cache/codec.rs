use std::io::Cursor;

use crate::cache::CacheError;
use crate::models::tile::TileBitmap;

const INITIAL_IMAGE_SIZE: usize = 8192;

pub fn encode(bitmap: &TileBitmap) -> Result<Vec<u8>, CacheError> {
  let mut imgdata: Vec<u8> = Vec::with_capacity(INITIAL_IMAGE_SIZE);
  write_image(bitmap, &mut imgdata)?;
  Ok(imgdata)
}

fn write_image<W: std::io::Write>(bitmap: &TileBitmap, w: W) -> Result<(), CacheError> {
  let mut encoder = png::Encoder::new(w, bitmap.width(), bitmap.height());
  encoder.set_color(png::ColorType::Rgba);
  encoder.set_depth(png::BitDepth::Eight);
  let mut writer = encoder.write_header()?;
  writer.write_image_data(bitmap.pixels())?;
  writer.finish()?;
  Ok(())
}

/// Decodes the first frame of a PNG into an RGBA bitmap.
pub fn decode(data: &[u8]) -> Result<TileBitmap, CacheError> {
  let mut decoder = png::Decoder::new(Cursor::new(data));
  decoder.set_transformations(png::Transformations::EXPAND | png::Transformations::STRIP_16);
  let mut reader = decoder.read_info()?;
  let mut buf = vec![0; reader.output_buffer_size()];
  let frame = reader.next_frame(&mut buf)?;
  buf.truncate(frame.buffer_size());

  if frame.bit_depth != png::BitDepth::Eight {
    return Err(CacheError::UnsupportedImage(format!("bit depth {:?}", frame.bit_depth)));
  }
  let pixels = match frame.color_type {
    png::ColorType::Rgba => buf,
    png::ColorType::Rgb => buf.chunks_exact(3).flat_map(|p| [p[0], p[1], p[2], 0xff]).collect(),
    png::ColorType::GrayscaleAlpha => buf.chunks_exact(2).flat_map(|p| [p[0], p[0], p[0], p[1]]).collect(),
    png::ColorType::Grayscale => buf.iter().flat_map(|&v| [v, v, v, 0xff]).collect(),
    other => return Err(CacheError::UnsupportedImage(format!("color type {:?}", other))),
  };
  Ok(TileBitmap::new(frame.width, frame.height, pixels)?)
}
