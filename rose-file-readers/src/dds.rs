use crate::{reader::RoseFileReader, ReadError, RoseFile};

const DDS_HEADER_SIZE: u64 = 128;

/// Four-character code from the pixel format header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FourCC(pub [u8; 4]);

impl FourCC {
    pub const NONE: Self = Self([0; 4]);
    pub const DXT1: Self = Self(*b"DXT1");
    pub const DXT3: Self = Self(*b"DXT3");
    pub const DXT5: Self = Self(*b"DXT5");

    fn to_u32(self) -> u32 {
        u32::from_le_bytes(self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DdsFormat {
    Dxt1,
    Dxt3,
    Dxt5,
    Bgra8,
    Bgr8,
}

impl DdsFormat {
    fn block_size(self) -> usize {
        match self {
            DdsFormat::Dxt1 => 8,
            DdsFormat::Dxt3 | DdsFormat::Dxt5 => 16,
            DdsFormat::Bgra8 => 4,
            DdsFormat::Bgr8 => 3,
        }
    }
}

/// The top mip level of a DDS texture, decoded to 32-bit BGRA.
pub struct DdsFile {
    pub width: u32,
    pub height: u32,
    pub format: DdsFormat,
    pub pixels: Vec<u8>,
}

impl DdsFile {
    /// Returns the pixels reordered to RGBA.
    pub fn to_rgba(&self) -> Vec<u8> {
        let mut rgba = self.pixels.clone();
        for pixel in rgba.chunks_exact_mut(4) {
            pixel.swap(0, 2);
        }
        rgba
    }
}

impl RoseFile for DdsFile {
    type ReadOptions = ();

    fn read(mut reader: RoseFileReader, _: &Self::ReadOptions) -> Result<Self, anyhow::Error> {
        let magic = reader.read_fixed_length_bytes(4)?;
        if magic != b"DDS " {
            return Err(ReadError::BadMagic {
                expected: "DDS ",
                found: String::from_utf8_lossy(magic).into_owned(),
            }
            .into());
        }

        reader.set_position(12);
        let height = reader.read_u32()?;
        let width = reader.read_u32()?;

        reader.set_position(84);
        let four_cc = FourCC(reader.read_u32()?.to_le_bytes());
        let bit_count = reader.read_u32()?;

        let format = match four_cc {
            FourCC::DXT1 => DdsFormat::Dxt1,
            FourCC::DXT3 => DdsFormat::Dxt3,
            FourCC::DXT5 => DdsFormat::Dxt5,
            FourCC::NONE if bit_count == 32 => DdsFormat::Bgra8,
            FourCC::NONE if bit_count == 24 => DdsFormat::Bgr8,
            FourCC::NONE => {
                return Err(ReadError::UnsupportedVariant {
                    what: "DDS bit count",
                    value: bit_count as i64,
                }
                .into())
            }
            _ => {
                return Err(ReadError::UnsupportedVariant {
                    what: "DDS four character code",
                    value: four_cc.to_u32() as i64,
                }
                .into())
            }
        };

        reader.set_position(DDS_HEADER_SIZE);
        let width_usize = width as usize;
        let height_usize = height as usize;
        let blocks_wide = (width_usize + 3) / 4;
        let blocks_high = (height_usize + 3) / 4;

        // Both sizes are checked against the file before anything is allocated
        let data_size = match format {
            DdsFormat::Bgra8 | DdsFormat::Bgr8 => width_usize
                .checked_mul(height_usize)
                .and_then(|count| count.checked_mul(format.block_size())),
            _ => blocks_wide
                .checked_mul(blocks_high)
                .and_then(|count| count.checked_mul(format.block_size())),
        };
        let pixel_size = width_usize
            .checked_mul(height_usize)
            .and_then(|count| count.checked_mul(4));
        let (data_size, pixel_size) = match (data_size, pixel_size) {
            (Some(data_size), Some(pixel_size)) if data_size <= reader.remaining() => {
                (data_size, pixel_size)
            }
            _ => {
                return Err(ReadError::Truncated {
                    offset: reader.position(),
                }
                .into())
            }
        };

        let data = reader.read_fixed_length_bytes(data_size)?;
        let mut pixels = vec![0u8; pixel_size];

        match format {
            DdsFormat::Bgra8 | DdsFormat::Bgr8 => {
                let stride = format.block_size();
                for (source, target) in data.chunks_exact(stride).zip(pixels.chunks_exact_mut(4)) {
                    target[..3].copy_from_slice(&source[..3]);
                    target[3] = if stride == 4 { source[3] } else { 255 };
                }
            }
            DdsFormat::Dxt1 | DdsFormat::Dxt3 | DdsFormat::Dxt5 => {
                let block_size = format.block_size();
                for (index, block) in data.chunks_exact(block_size).enumerate() {
                    let texels = match format {
                        DdsFormat::Dxt1 => decode_dxt1_block(block, false),
                        DdsFormat::Dxt3 => decode_dxt3_block(block),
                        _ => decode_dxt5_block(block),
                    };
                    let block_x = (index % blocks_wide) * 4;
                    let block_y = (index / blocks_wide) * 4;
                    write_block(&mut pixels, width_usize, height_usize, block_x, block_y, &texels);
                }
            }
        }

        Ok(Self {
            width,
            height,
            format,
            pixels,
        })
    }
}

fn write_block(
    pixels: &mut [u8],
    width: usize,
    height: usize,
    block_x: usize,
    block_y: usize,
    texels: &[[u8; 4]; 16],
) {
    for (i, texel) in texels.iter().enumerate() {
        let x = block_x + i % 4;
        let y = block_y + i / 4;
        if x < width && y < height {
            let offset = (y * width + x) * 4;
            pixels[offset..offset + 4].copy_from_slice(texel);
        }
    }
}

/// Expands an RGB565 colour to BGRA with full alpha.
fn expand_565(value: u16) -> [u8; 4] {
    let r = ((value & 0xF800) >> 8) | ((value & 0xF800) >> 13);
    let g = ((value & 0x07E0) >> 3) | ((value & 0x07E0) >> 9);
    let b = ((value & 0x001F) << 3) | ((value & 0x001F) >> 2);
    [b as u8, g as u8, r as u8, 255]
}

fn mix(a: [u8; 4], b: [u8; 4], weight_a: u16, weight_b: u16) -> [u8; 4] {
    let total = weight_a + weight_b;
    let channel = |i: usize| ((a[i] as u16 * weight_a + b[i] as u16 * weight_b) / total) as u8;
    [channel(0), channel(1), channel(2), 255]
}

/// Decodes an 8 byte colour block to 16 BGRA texels in row-major order.
///
/// `force_four_color` disables the transparent three colour mode, as used by
/// the colour half of DXT3 and DXT5 blocks.
pub fn decode_dxt1_block(block: &[u8], force_four_color: bool) -> [[u8; 4]; 16] {
    let c0 = u16::from_le_bytes([block[0], block[1]]);
    let c1 = u16::from_le_bytes([block[2], block[3]]);
    let color0 = expand_565(c0);
    let color1 = expand_565(c1);

    let palette = if c0 > c1 || force_four_color {
        [color0, color1, mix(color0, color1, 2, 1), mix(color0, color1, 1, 2)]
    } else {
        [color0, color1, mix(color0, color1, 1, 1), [0, 0, 0, 0]]
    };

    let indices = u32::from_le_bytes([block[4], block[5], block[6], block[7]]);
    let mut texels = [[0u8; 4]; 16];
    for (i, texel) in texels.iter_mut().enumerate() {
        *texel = palette[((indices >> (2 * i)) & 0x3) as usize];
    }
    texels
}

pub fn decode_dxt3_block(block: &[u8]) -> [[u8; 4]; 16] {
    let mut texels = decode_dxt1_block(&block[8..16], true);
    for (i, texel) in texels.iter_mut().enumerate() {
        let byte = block[i / 2];
        let nibble = if i % 2 == 0 { byte & 0x0F } else { byte >> 4 };
        texel[3] = nibble * 17;
    }
    texels
}

pub fn decode_dxt5_block(block: &[u8]) -> [[u8; 4]; 16] {
    let a0 = block[0] as u32;
    let a1 = block[1] as u32;

    let mut alphas = [0u8; 8];
    alphas[0] = a0 as u8;
    alphas[1] = a1 as u8;
    if a0 > a1 {
        for i in 0..6 {
            alphas[2 + i] = (((6 - i as u32) * a0 + (1 + i as u32) * a1) / 7) as u8;
        }
    } else {
        for i in 0..4 {
            alphas[2 + i] = (((4 - i as u32) * a0 + (1 + i as u32) * a1) / 5) as u8;
        }
        alphas[6] = 0;
        alphas[7] = 255;
    }

    let mut table = [0u8; 8];
    table[..6].copy_from_slice(&block[2..8]);
    let bits = u64::from_le_bytes(table);

    let mut texels = decode_dxt1_block(&block[8..16], true);
    for (i, texel) in texels.iter_mut().enumerate() {
        texel[3] = alphas[((bits >> (3 * i)) & 0x7) as usize];
    }
    texels
}
