use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

use crate::{
    reader::RoseFileReader,
    types::{Quat4, Vec2, Vec3},
    RoseFile,
};

#[derive(Clone, Debug, PartialEq)]
pub struct IfoObject {
    pub object_name: String,
    pub minimap_position: Vec2<u32>,
    pub object_type: u32,
    pub object_id: u32,
    pub warp_id: u16,
    pub event_id: u16,
    pub position: Vec3<f32>,
    pub rotation: Quat4<f32>,
    pub scale: Vec3<f32>,
}

fn read_object(reader: &mut RoseFileReader) -> anyhow::Result<IfoObject> {
    let object_name = reader.read_u8_length_string()?;
    let warp_id = reader.read_u16()?;
    let event_id = reader.read_u16()?;
    let object_type = reader.read_u32()?;
    let object_id = reader.read_u32()?;
    let minimap_pos_x = reader.read_u32()?;
    let minimap_pos_y = reader.read_u32()?;
    let rotation = reader.read_quat4_xyzw_f32()?;
    let position = reader.read_vector3_f32()?;
    let scale = reader.read_vector3_f32()?;

    Ok(IfoObject {
        object_name: String::from(object_name),
        warp_id,
        event_id,
        object_type,
        object_id,
        minimap_position: Vec2 {
            x: minimap_pos_x,
            y: minimap_pos_y,
        },
        rotation,
        position,
        scale,
    })
}

fn read_object_list(reader: &mut RoseFileReader) -> anyhow::Result<Vec<IfoObject>> {
    let object_count = reader.read_u32()? as usize;
    let mut objects = Vec::with_capacity(object_count.min(reader.remaining()));
    for _ in 0..object_count {
        objects.push(read_object(reader)?);
    }
    Ok(objects)
}

#[derive(Clone, Debug, PartialEq)]
pub struct IfoEventObject {
    pub object: IfoObject,
    pub quest_trigger_name: String,
    pub script_function_name: String,
}

#[derive(Default)]
pub struct IfoFile {
    pub map_position: Vec2<i32>,
    pub zone_position: Vec2<i32>,
    pub deco_objects: Vec<IfoObject>,
    pub cnst_objects: Vec<IfoObject>,
    pub animated_objects: Vec<IfoObject>,
    pub collision_objects: Vec<IfoObject>,
    pub event_objects: Vec<IfoEventObject>,
    pub warps: Vec<IfoObject>,
    pub unknown_blocks: Vec<u32>,
}

#[derive(FromPrimitive)]
enum BlockType {
    MapInfo = 0,
    DecoObject = 1,
    Npc = 2,
    CnstObject = 3,
    Sound = 4,
    Effect = 5,
    AnimatedObject = 6,
    LegacyWater = 7,
    MonsterSpawn = 8,
    WaterPlanes = 9,
    Warp = 10,
    CollisionObject = 11,
    EventObject = 12,
}

#[derive(Default, Clone, Copy)]
pub struct IfoReadOptions {
    pub skip_animated_objects: bool,
    pub skip_collision_objects: bool,
    pub skip_event_objects: bool,
    pub skip_cnst_objects: bool,
    pub skip_deco_objects: bool,
    pub skip_warp_objects: bool,
}

impl RoseFile for IfoFile {
    type ReadOptions = IfoReadOptions;

    fn read(
        mut reader: RoseFileReader,
        read_options: &IfoReadOptions,
    ) -> Result<Self, anyhow::Error> {
        let mut ifo = IfoFile::default();

        let block_count = reader.read_u32()?;
        for _ in 0..block_count {
            let block_type = reader.read_u32()?;
            let block_offset = reader.read_u32()?;
            let next_block_header_offset = reader.position();
            reader.set_position(block_offset as u64);

            match FromPrimitive::from_u32(block_type) {
                Some(BlockType::MapInfo) => {
                    let x = reader.read_i32()?;
                    let y = reader.read_i32()?;
                    ifo.map_position = Vec2 { x, y };
                    let x = reader.read_i32()?;
                    let y = reader.read_i32()?;
                    ifo.zone_position = Vec2 { x, y };
                }
                Some(BlockType::DecoObject) => {
                    if !read_options.skip_deco_objects {
                        ifo.deco_objects = read_object_list(&mut reader)?;
                    }
                }
                Some(BlockType::CnstObject) => {
                    if !read_options.skip_cnst_objects {
                        ifo.cnst_objects = read_object_list(&mut reader)?;
                    }
                }
                Some(BlockType::AnimatedObject) => {
                    if !read_options.skip_animated_objects {
                        ifo.animated_objects = read_object_list(&mut reader)?;
                    }
                }
                Some(BlockType::CollisionObject) => {
                    if !read_options.skip_collision_objects {
                        ifo.collision_objects = read_object_list(&mut reader)?;
                    }
                }
                Some(BlockType::Warp) => {
                    if !read_options.skip_warp_objects {
                        ifo.warps = read_object_list(&mut reader)?;
                    }
                }
                Some(BlockType::EventObject) => {
                    if !read_options.skip_event_objects {
                        let object_count = reader.read_u32()? as usize;
                        for _ in 0..object_count {
                            let object = read_object(&mut reader)?;
                            let quest_trigger_name = reader.read_u8_length_string()?;
                            let script_function_name = reader.read_u8_length_string()?;
                            ifo.event_objects.push(IfoEventObject {
                                object,
                                quest_trigger_name: String::from(quest_trigger_name),
                                script_function_name: String::from(script_function_name),
                            })
                        }
                    }
                }
                // Gameplay and audio blocks carry nothing a scene needs
                Some(BlockType::Npc)
                | Some(BlockType::Sound)
                | Some(BlockType::Effect)
                | Some(BlockType::LegacyWater)
                | Some(BlockType::MonsterSpawn)
                | Some(BlockType::WaterPlanes) => {}
                None => ifo.unknown_blocks.push(block_type),
            }

            reader.set_position(next_block_header_offset);
        }

        Ok(ifo)
    }
}
