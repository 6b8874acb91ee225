use bytes::Buf;
use encoding_rs::WINDOWS_1252;
use std::{borrow::Cow, io::Cursor};
use thiserror::Error;

use crate::types::{Quat4, Vec2, Vec3};

const MAX_TOKENIZED_STRING_LENGTH: usize = 10_000;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReadError {
    #[error("Unexpected end of file at offset {offset}")]
    Truncated { offset: u64 },
    #[error("Invalid magic header, expected {expected} but found {found:?}")]
    BadMagic {
        expected: &'static str,
        found: String,
    },
    #[error("Unsupported {what}: {value}")]
    UnsupportedVariant { what: &'static str, value: i64 },
    #[error("{what} index {index} out of range, length is {len}")]
    OutOfRange {
        what: &'static str,
        index: i64,
        len: usize,
    },
}

pub struct RoseFileReader<'a> {
    pub cursor: Cursor<&'a [u8]>,
}

impl<'a> From<&'a Vec<u8>> for RoseFileReader<'a> {
    fn from(vec: &'a Vec<u8>) -> Self {
        Self {
            cursor: Cursor::new(vec.as_slice()),
        }
    }
}

impl<'a> From<&'a [u8]> for RoseFileReader<'a> {
    fn from(slice: &'a [u8]) -> Self {
        Self {
            cursor: Cursor::new(slice),
        }
    }
}

// Bytes above 0x7f are mapped through windows-1252, which covers every byte
// value, so the original bytes can always be recovered by re-encoding.
fn decode_string(bytes: &[u8]) -> Cow<'_, str> {
    if bytes.is_empty() {
        return Cow::default();
    }

    let (decoded, _) = WINDOWS_1252.decode_without_bom_handling(bytes);
    decoded
}

fn is_token_whitespace(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | b'\r' | b'\n')
}

impl<'a> RoseFileReader<'a> {
    pub fn len(&self) -> usize {
        self.cursor.get_ref().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cursor.get_ref().is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.cursor.remaining()
    }

    pub fn position(&self) -> u64 {
        self.cursor.position()
    }

    pub fn set_position(&mut self, pos: u64) {
        self.cursor.set_position(pos);
    }

    fn truncated(&self) -> ReadError {
        ReadError::Truncated {
            offset: self.cursor.position(),
        }
    }

    fn ensure(&self, length: usize) -> Result<(), ReadError> {
        if self.cursor.remaining() < length {
            Err(self.truncated())
        } else {
            Ok(())
        }
    }

    pub fn skip(&mut self, distance: u64) -> Result<(), ReadError> {
        self.ensure(distance as usize)?;
        self.cursor.set_position(self.cursor.position() + distance);
        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8, ReadError> {
        self.ensure(1)?;
        Ok(self.cursor.get_u8())
    }

    pub fn read_u16(&mut self) -> Result<u16, ReadError> {
        self.ensure(2)?;
        Ok(self.cursor.get_u16_le())
    }

    pub fn read_u32(&mut self) -> Result<u32, ReadError> {
        self.ensure(4)?;
        Ok(self.cursor.get_u32_le())
    }

    pub fn read_i16(&mut self) -> Result<i16, ReadError> {
        self.ensure(2)?;
        Ok(self.cursor.get_i16_le())
    }

    pub fn read_i32(&mut self) -> Result<i32, ReadError> {
        self.ensure(4)?;
        Ok(self.cursor.get_i32_le())
    }

    pub fn read_f32(&mut self) -> Result<f32, ReadError> {
        self.ensure(4)?;
        Ok(self.cursor.get_f32_le())
    }

    pub fn read_vector2_f32(&mut self) -> Result<Vec2<f32>, ReadError> {
        let x = self.read_f32()?;
        let y = self.read_f32()?;
        Ok(Vec2 { x, y })
    }

    pub fn read_vector3_f32(&mut self) -> Result<Vec3<f32>, ReadError> {
        let x = self.read_f32()?;
        let y = self.read_f32()?;
        let z = self.read_f32()?;
        Ok(Vec3 { x, y, z })
    }

    pub fn read_quat4_xyzw_f32(&mut self) -> Result<Quat4<f32>, ReadError> {
        let x = self.read_f32()?;
        let y = self.read_f32()?;
        let z = self.read_f32()?;
        let w = self.read_f32()?;
        Ok(Quat4 { x, y, z, w })
    }

    /// Reads a quaternion stored as W, X, Y, Z and returns it in X, Y, Z, W order.
    pub fn read_quat4_wxyz_f32(&mut self) -> Result<Quat4<f32>, ReadError> {
        let w = self.read_f32()?;
        let x = self.read_f32()?;
        let y = self.read_f32()?;
        let z = self.read_f32()?;
        Ok(Quat4 { x, y, z, w })
    }

    pub fn read_f32_array<const N: usize>(
        &mut self,
        count: usize,
    ) -> Result<Vec<[f32; N]>, ReadError> {
        self.ensure(count * N * 4)?;
        let mut values = Vec::with_capacity(count);
        for _ in 0..count {
            let mut value = [0.0; N];
            for component in value.iter_mut() {
                *component = self.cursor.get_f32_le();
            }
            values.push(value);
        }
        Ok(values)
    }

    pub fn read_u16_array(&mut self, count: usize) -> Result<Vec<u16>, ReadError> {
        self.ensure(count * 2)?;
        let mut values = Vec::with_capacity(count);
        for _ in 0..count {
            values.push(self.cursor.get_u16_le());
        }
        Ok(values)
    }

    pub fn read_fixed_length_bytes(&mut self, length: usize) -> Result<&'a [u8], ReadError> {
        self.ensure(length)?;
        let start = self.cursor.position() as usize;
        let end = start + length;
        self.cursor.set_position(end as u64);
        let data: &'a [u8] = *self.cursor.get_ref();
        Ok(&data[start..end])
    }

    pub fn read_u8_length_bytes(&mut self) -> Result<&'a [u8], ReadError> {
        let length = self.read_u8()?;
        self.read_fixed_length_bytes(length as usize)
    }

    pub fn read_u16_length_bytes(&mut self) -> Result<&'a [u8], ReadError> {
        let length = self.read_u16()?;
        self.read_fixed_length_bytes(length as usize)
    }

    pub fn read_null_terminated_bytes(&mut self) -> Result<&'a [u8], ReadError> {
        let data: &'a [u8] = *self.cursor.get_ref();
        let start = self.cursor.position() as usize;
        if start >= data.len() {
            return Err(self.truncated());
        }

        match data[start..].iter().position(|&byte| byte == 0) {
            Some(length) => {
                self.cursor.set_position((start + length + 1) as u64);
                Ok(&data[start..start + length])
            }
            None => {
                self.cursor.set_position(data.len() as u64);
                Err(self.truncated())
            }
        }
    }

    pub fn read_fixed_length_string(&mut self, length: usize) -> Result<Cow<'a, str>, ReadError> {
        let bytes = self.read_fixed_length_bytes(length)?;
        let bytes = match bytes.iter().position(|&byte| byte == 0) {
            Some(end) => &bytes[..end],
            None => bytes,
        };
        Ok(decode_string(bytes))
    }

    pub fn read_u8_length_string(&mut self) -> Result<Cow<'a, str>, ReadError> {
        Ok(decode_string(self.read_u8_length_bytes()?))
    }

    pub fn read_u16_length_string(&mut self) -> Result<Cow<'a, str>, ReadError> {
        Ok(decode_string(self.read_u16_length_bytes()?))
    }

    pub fn read_null_terminated_string(&mut self) -> Result<Cow<'a, str>, ReadError> {
        Ok(decode_string(self.read_null_terminated_bytes()?))
    }

    /// Reads a NUL terminated token.
    ///
    /// Double quotes toggle quoted mode and are dropped. Outside of quotes,
    /// leading whitespace is skipped and the token ends at the first
    /// whitespace after any other byte; the rest of the field up to the NUL is
    /// consumed and discarded.
    pub fn read_tokenized_string(&mut self) -> Result<String, ReadError> {
        let mut token = Vec::new();
        let mut in_quotes = false;
        let mut finished = false;
        let mut consumed = 0;

        loop {
            let byte = self.read_u8()?;
            if byte == 0 {
                break;
            }

            consumed += 1;
            if consumed > MAX_TOKENIZED_STRING_LENGTH {
                break;
            }

            if finished {
                continue;
            }

            if byte == b'"' {
                in_quotes = !in_quotes;
                continue;
            }

            if !in_quotes && is_token_whitespace(byte) {
                if !token.is_empty() {
                    finished = true;
                }
                continue;
            }

            token.push(byte);
        }

        Ok(decode_string(&token).into_owned())
    }
}
