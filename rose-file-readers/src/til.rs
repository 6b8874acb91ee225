use crate::{reader::RoseFileReader, ReadError, RoseFile};

const MAX_TILEMAP_SIZE: i32 = 128;

#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct TilPatch {
    pub brush: u8,
    pub tile_index: u8,
    pub tile_set: u8,
    pub tile: i32,
}

pub struct TilFile {
    pub width: u32,
    pub height: u32,
    pub patches: Vec<TilPatch>,
}

impl TilFile {
    pub fn get_clamped(&self, x: usize, y: usize) -> &TilPatch {
        let x = usize::clamp(x, 0, self.width as usize - 1);
        let y = usize::clamp(y, 0, self.height as usize - 1);
        &self.patches[y * self.width as usize + x]
    }

    pub fn get(&self, x: usize, y: usize) -> Option<&TilPatch> {
        if x >= self.width as usize {
            return None;
        }
        self.patches.get(y * self.width as usize + x)
    }
}

impl RoseFile for TilFile {
    type ReadOptions = ();

    fn read(mut reader: RoseFileReader, _: &Self::ReadOptions) -> Result<Self, anyhow::Error> {
        let width = reader.read_i32()?;
        let height = reader.read_i32()?;

        for dimension in [width, height] {
            if dimension <= 0 || dimension > MAX_TILEMAP_SIZE {
                return Err(ReadError::UnsupportedVariant {
                    what: "tile map dimension",
                    value: dimension as i64,
                }
                .into());
            }
        }

        let mut patches = Vec::with_capacity((width * height) as usize);
        for _ in 0..height {
            for _ in 0..width {
                let brush = reader.read_u8()?;
                let tile_index = reader.read_u8()?;
                let tile_set = reader.read_u8()?;
                let tile = reader.read_i32()?;
                patches.push(TilPatch {
                    brush,
                    tile_index,
                    tile_set,
                    tile,
                });
            }
        }

        Ok(Self {
            width: width as u32,
            height: height as u32,
            patches,
        })
    }
}
