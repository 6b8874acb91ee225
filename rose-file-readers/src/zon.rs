use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

use crate::{
    reader::RoseFileReader,
    types::{Vec2, Vec3},
    RoseFile,
};

#[derive(Default)]
pub struct ZonFile {
    pub zone_type: i32,
    pub width: i32,
    pub height: i32,
    pub grid_per_patch: i32,
    pub grid_size: f32,
    pub start_position: Vec2<i32>,
    pub event_positions: Vec<(String, Vec3<f32>)>,
    pub tile_textures: Vec<String>,
    pub tiles: Vec<ZonTile>,
    pub unknown_blocks: Vec<u32>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ZonTile {
    pub layer1: i32,
    pub layer2: i32,
    pub offset1: i32,
    pub offset2: i32,
    pub blend: bool,
    pub rotation: ZonTileRotation,
    pub tile_type: i32,
}

impl ZonTile {
    pub fn texture_id1(&self) -> i32 {
        self.layer1 + self.offset1
    }

    pub fn texture_id2(&self) -> i32 {
        self.layer2 + self.offset2
    }
}

#[derive(Copy, Clone, Debug, FromPrimitive, PartialEq)]
pub enum ZonTileRotation {
    Unknown = 0,
    None = 1,
    FlipHorizontal = 2,
    FlipVertical = 3,
    Flip = 4,
    Clockwise90 = 5,
    CounterClockwise90 = 6,
}

#[derive(FromPrimitive)]
enum BlockType {
    ZoneInfo = 0,
    EventPositions = 1,
    Textures = 2,
    Tiles = 3,
    Economy = 4,
}

#[derive(Default, Clone, Copy)]
pub struct ZonReadOptions {
    pub skip_event_positions: bool,
    pub skip_textures: bool,
    pub skip_tiles: bool,
}

impl RoseFile for ZonFile {
    type ReadOptions = ZonReadOptions;

    fn read(mut reader: RoseFileReader, read_options: &ZonReadOptions) -> Result<Self, anyhow::Error> {
        let mut zon = ZonFile::default();

        let block_count = reader.read_u32()?;
        for _ in 0..block_count {
            let block_type = reader.read_u32()?;
            let block_offset = reader.read_u32()?;
            let next_block_header_offset = reader.position();
            reader.set_position(block_offset as u64);

            match FromPrimitive::from_u32(block_type) {
                Some(BlockType::ZoneInfo) => {
                    zon.zone_type = reader.read_i32()?;
                    zon.width = reader.read_i32()?;
                    zon.height = reader.read_i32()?;
                    zon.grid_per_patch = reader.read_i32()?;
                    zon.grid_size = reader.read_f32()?;
                    let x = reader.read_i32()?;
                    let y = reader.read_i32()?;
                    zon.start_position = Vec2 { x, y };
                }
                Some(BlockType::EventPositions) => {
                    if !read_options.skip_event_positions {
                        let object_count = reader.read_u32()? as usize;
                        zon.event_positions
                            .reserve_exact(object_count.min(reader.remaining()));
                        for _ in 0..object_count {
                            let position = reader.read_vector3_f32()?;
                            let name = reader.read_u8_length_string()?;
                            zon.event_positions.push((name.into(), position));
                        }
                    }
                }
                Some(BlockType::Textures) => {
                    if !read_options.skip_textures {
                        let texture_count = reader.read_u32()? as usize;
                        zon.tile_textures
                            .reserve_exact(texture_count.min(reader.remaining()));
                        for _ in 0..texture_count {
                            zon.tile_textures
                                .push(reader.read_u8_length_string()?.into());
                        }
                    }
                }
                Some(BlockType::Tiles) => {
                    if !read_options.skip_tiles {
                        let tile_count = reader.read_u32()? as usize;
                        zon.tiles
                            .reserve_exact(tile_count.min(reader.remaining()));
                        for _ in 0..tile_count {
                            let layer1 = reader.read_i32()?;
                            let layer2 = reader.read_i32()?;
                            let offset1 = reader.read_i32()?;
                            let offset2 = reader.read_i32()?;
                            let blend = reader.read_i32()? > 0;
                            let rotation = FromPrimitive::from_i32(reader.read_i32()?)
                                .unwrap_or(ZonTileRotation::Unknown);
                            let tile_type = reader.read_i32()?;
                            zon.tiles.push(ZonTile {
                                layer1,
                                layer2,
                                offset1,
                                offset2,
                                blend,
                                rotation,
                                tile_type,
                            })
                        }
                    }
                }
                Some(BlockType::Economy) => {}
                None => zon.unknown_blocks.push(block_type),
            }

            reader.set_position(next_block_header_offset);
        }

        Ok(zon)
    }
}
