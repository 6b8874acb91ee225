use bytes::{BufMut, BytesMut};
use encoding_rs::WINDOWS_1252;

/// Little endian byte builder, the mirror of [`crate::RoseFileReader`].
///
/// Used to assemble fixtures; no format in this crate is written back out.
pub struct RoseFileWriter {
    pub buffer: BytesMut,
}

impl Default for RoseFileWriter {
    fn default() -> Self {
        Self {
            buffer: BytesMut::with_capacity(4096),
        }
    }
}

impl RoseFileWriter {
    pub fn position(&self) -> usize {
        self.buffer.len()
    }

    pub fn write_padding(&mut self, size: usize) {
        self.buffer.put_bytes(0, size);
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buffer.put_u8(value);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.buffer.put_u16_le(value);
    }

    pub fn write_u32(&mut self, value: u32) {
        self.buffer.put_u32_le(value);
    }

    pub fn write_i16(&mut self, value: i16) {
        self.buffer.put_i16_le(value);
    }

    pub fn write_i32(&mut self, value: i32) {
        self.buffer.put_i32_le(value);
    }

    pub fn write_f32(&mut self, value: f32) {
        self.buffer.put_f32_le(value);
    }

    pub fn write_f32s(&mut self, values: &[f32]) {
        for &value in values {
            self.write_f32(value);
        }
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buffer.put(bytes);
    }

    pub fn write_u8_length_string(&mut self, string: &str) {
        let (encoded, _, _) = WINDOWS_1252.encode(string);
        self.write_u8(encoded.len() as u8);
        self.write_bytes(&encoded);
    }

    pub fn write_u16_length_string(&mut self, string: &str) {
        let (encoded, _, _) = WINDOWS_1252.encode(string);
        self.write_u16(encoded.len() as u16);
        self.write_bytes(&encoded);
    }

    pub fn write_null_terminated_string(&mut self, string: &str) {
        let (encoded, _, _) = WINDOWS_1252.encode(string);
        self.write_bytes(&encoded);
        self.write_u8(0);
    }

    /// Overwrites a previously written `u32`, used to back-patch offsets.
    pub fn patch_u32(&mut self, position: usize, value: u32) {
        self.buffer[position..position + 4].copy_from_slice(&value.to_le_bytes());
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.buffer.to_vec()
    }
}

/// Builds a block indexed file: a `u32` block count, a table of
/// `(type, offset)` pairs, then each block's payload.
#[derive(Default)]
pub struct BlockFileWriter {
    blocks: Vec<(u32, Vec<u8>)>,
}

impl BlockFileWriter {
    pub fn add_block(&mut self, block_type: u32, payload: Vec<u8>) -> &mut Self {
        self.blocks.push((block_type, payload));
        self
    }

    pub fn finish(&self) -> Vec<u8> {
        let mut writer = RoseFileWriter::default();
        writer.write_u32(self.blocks.len() as u32);

        let mut offset = 4 + self.blocks.len() * 8;
        for (block_type, payload) in self.blocks.iter() {
            writer.write_u32(*block_type);
            writer.write_u32(offset as u32);
            offset += payload.len();
        }

        for (_, payload) in self.blocks.iter() {
            writer.write_bytes(payload);
        }

        writer.into_vec()
    }
}
