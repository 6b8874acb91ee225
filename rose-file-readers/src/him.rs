use crate::{reader::RoseFileReader, ReadError, RoseFile};

const MAX_HEIGHTMAP_SIZE: i32 = 256;

pub struct HimFile {
    pub width: u32,
    pub height: u32,
    pub grid_count: i32,
    pub grid_size: f32,
    pub heights: Vec<f32>,
}

impl HimFile {
    pub fn get_clamped(&self, x: usize, y: usize) -> f32 {
        let x = usize::clamp(x, 0, self.width as usize - 1);
        let y = usize::clamp(y, 0, self.height as usize - 1);
        self.heights[y * self.width as usize + x]
    }
}

impl RoseFile for HimFile {
    type ReadOptions = ();

    fn read(mut reader: RoseFileReader, _: &Self::ReadOptions) -> Result<Self, anyhow::Error> {
        let width = reader.read_i32()?;
        let height = reader.read_i32()?;
        let grid_count = reader.read_i32()?;
        let grid_size = reader.read_f32()?;

        for dimension in [width, height] {
            if dimension <= 0 || dimension > MAX_HEIGHTMAP_SIZE {
                return Err(ReadError::UnsupportedVariant {
                    what: "heightmap dimension",
                    value: dimension as i64,
                }
                .into());
            }
        }

        let heights = reader
            .read_f32_array::<1>((width * height) as usize)?
            .into_iter()
            .map(|[height]| height)
            .collect();

        Ok(Self {
            width: width as u32,
            height: height as u32,
            grid_count,
            grid_size,
            heights,
        })
    }
}
