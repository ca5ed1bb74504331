use crate::store::error::MapFileError;

/// Longest variable length integer we accept: 5 bytes carry 32 bits.
const VARIABLE_INT_MAX_BYTES: usize = 5;

/// Sequential big-endian reader over a borrowed byte buffer.
pub struct ReadBuffer<'a> {
  data: &'a [u8],
  offset: usize,
}

impl<'a> ReadBuffer<'a> {
  pub fn new(data: &'a [u8]) -> Self {
    ReadBuffer { data, offset: 0 }
  }

  pub fn offset(&self) -> usize {
    self.offset
  }

  pub fn remaining(&self) -> usize {
    self.data.len() - self.offset
  }

  /// Random access is reserved for the map file when it jumps into a
  /// sub-file index.
  pub(crate) fn set_offset(&mut self, offset: usize) -> Result<(), MapFileError> {
    if offset > self.data.len() {
      return Err(MapFileError::BufferUnderflow {
        offset,
        needed: 0,
        remaining: 0,
      });
    }
    self.offset = offset;
    Ok(())
  }

  pub fn read_bytes(&mut self, length: usize) -> Result<&'a [u8], MapFileError> {
    if self.remaining() < length {
      return Err(MapFileError::BufferUnderflow {
        offset: self.offset,
        needed: length,
        remaining: self.remaining(),
      });
    }
    let bytes = &self.data[self.offset..self.offset + length];
    self.offset += length;
    Ok(bytes)
  }

  fn read_array<const N: usize>(&mut self) -> Result<[u8; N], MapFileError> {
    let mut array = [0u8; N];
    array.copy_from_slice(self.read_bytes(N)?);
    Ok(array)
  }

  pub fn read_byte(&mut self) -> Result<u8, MapFileError> {
    Ok(self.read_bytes(1)?[0])
  }

  pub fn read_short(&mut self) -> Result<i16, MapFileError> {
    Ok(i16::from_be_bytes(self.read_array()?))
  }

  pub fn read_int(&mut self) -> Result<i32, MapFileError> {
    Ok(i32::from_be_bytes(self.read_array()?))
  }

  pub fn read_long(&mut self) -> Result<i64, MapFileError> {
    Ok(i64::from_be_bytes(self.read_array()?))
  }

  /// Five byte unsigned value, the width of a sub-file index entry.
  pub fn read_five_bytes_long(&mut self) -> Result<u64, MapFileError> {
    let bytes = self.read_bytes(5)?;
    Ok(bytes.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64))
  }

  /// Little-endian groups of 7 bits; the high bit of each byte flags a
  /// continuation.
  pub fn read_unsigned_int(&mut self) -> Result<u32, MapFileError> {
    let start = self.offset;
    let mut value: u64 = 0;
    for i in 0..VARIABLE_INT_MAX_BYTES {
      let byte = self.read_byte()?;
      value |= ((byte & 0x7f) as u64) << (7 * i);
      if byte & 0x80 == 0 {
        return u32::try_from(value).map_err(|_| MapFileError::VariableIntOverflow(start));
      }
    }
    Err(MapFileError::VariableIntOverflow(start))
  }

  /// Like `read_unsigned_int`, but the last byte keeps 6 data bits and uses
  /// 0x40 as the sign.
  pub fn read_signed_int(&mut self) -> Result<i32, MapFileError> {
    let start = self.offset;
    let mut value: i64 = 0;
    for i in 0..VARIABLE_INT_MAX_BYTES {
      let byte = self.read_byte()?;
      let shift = 7 * i;
      if byte & 0x80 != 0 {
        value |= ((byte & 0x7f) as i64) << shift;
        continue;
      }
      value |= ((byte & 0x3f) as i64) << shift;
      if byte & 0x40 != 0 {
        value = -value;
      }
      return i32::try_from(value).map_err(|_| MapFileError::VariableIntOverflow(start));
    }
    Err(MapFileError::VariableIntOverflow(start))
  }

  pub fn read_utf8_string(&mut self) -> Result<String, MapFileError> {
    let length = self.read_unsigned_int()? as usize;
    self.read_utf8_string_of(length)
  }

  pub fn read_utf8_string_of(&mut self, length: usize) -> Result<String, MapFileError> {
    let start = self.offset;
    let bytes = self.read_bytes(length)?;
    String::from_utf8(bytes.to_vec()).map_err(|_| MapFileError::InvalidUtf8(start))
  }
}
