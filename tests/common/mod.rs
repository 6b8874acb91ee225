#![allow(dead_code)]

use std::path::{Path, PathBuf};

use rose_file_readers::{BlockFileWriter, RoseFileWriter};

pub const ZONE_DIRECTORY: &str = "3DData/MAPS/JUNON/JDT01";
pub const DECO_CATALOG: &str = "3DDATA\\JUNON\\LIST_DECO_JDT.ZSC";
pub const ANIMATION_CATALOG: &str = "3DDATA\\JUNON\\EVENT_OBJECT_JDT.ZSC";

pub fn write_file(root: &Path, relative: &str, data: Vec<u8>) -> PathBuf {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, data).unwrap();
    path
}

/// Writes an STB1 table where `rows[i][0]` is the row name.
pub fn write_stb(column_names: &[&str], rows: &[Vec<&str>]) -> Vec<u8> {
    let columns = column_names.len();
    let mut writer = RoseFileWriter::default();
    writer.write_bytes(b"STB1");
    let data_position = writer.position();
    writer.write_u32(0);
    writer.write_u32(rows.len() as u32 + 1);
    writer.write_u32(columns as u32);
    writer.write_u32(0);
    for _ in 0..(columns + 1) {
        writer.write_i16(64);
    }
    for name in column_names {
        writer.write_u16_length_string(name);
    }
    writer.write_u16_length_string("");
    for row in rows {
        writer.write_u16_length_string(row.first().copied().unwrap_or(""));
    }
    let position = writer.position() as u32;
    writer.patch_u32(data_position, position);
    for row in rows {
        for column in 1..columns {
            writer.write_u16_length_string(row.get(column).copied().unwrap_or(""));
        }
    }
    writer.into_vec()
}

pub fn write_list_zone(deco: &str, animation: &str) -> Vec<u8> {
    let mut columns = vec![""; 16];
    columns[3] = "ZON";
    columns[14] = "EVENT_OBJECT";

    let mut jdt01 = vec![""; 16];
    jdt01[0] = "JDT01";
    jdt01[1] = "Canyon City of Zant";
    jdt01[3] = "3DDATA\\MAPS\\JUNON\\JDT01\\JDT01.ZON";
    jdt01[12] = deco;
    jdt01[14] = animation;

    let mut jpt01 = vec![""; 16];
    jpt01[0] = "JPT01";
    jpt01[3] = "3DDATA\\MAPS\\JUNON\\JPT01\\JPT01.ZON";

    write_stb(&columns, &[jpt01, jdt01])
}

pub fn write_him(height: f32) -> Vec<u8> {
    let mut writer = RoseFileWriter::default();
    writer.write_i32(65);
    writer.write_i32(65);
    writer.write_i32(4);
    writer.write_f32(250.0);
    for _ in 0..(65 * 65) {
        writer.write_f32(height);
    }
    writer.into_vec()
}

pub fn write_til(tile: i32) -> Vec<u8> {
    let mut writer = RoseFileWriter::default();
    writer.write_i32(16);
    writer.write_i32(16);
    for _ in 0..(16 * 16) {
        writer.write_u8(0);
        writer.write_u8(0);
        writer.write_u8(0);
        writer.write_i32(tile);
    }
    writer.into_vec()
}

/// A zone with one texture per entry of `textures` and one zone tile per
/// texture, each painting only its own texture.
pub fn write_zon(textures: &[&str]) -> Vec<u8> {
    let mut info = RoseFileWriter::default();
    info.write_i32(0);
    info.write_i32(64);
    info.write_i32(64);
    info.write_i32(4);
    info.write_f32(250.0);
    info.write_i32(32);
    info.write_i32(32);

    let mut texture_block = RoseFileWriter::default();
    texture_block.write_u32(textures.len() as u32);
    for texture in textures {
        texture_block.write_u8_length_string(texture);
    }

    let mut tile_block = RoseFileWriter::default();
    tile_block.write_u32(textures.len() as u32);
    for index in 0..textures.len() as i32 {
        for value in [index, 0, 0, -1, 0, 1, 0] {
            tile_block.write_i32(value);
        }
    }

    BlockFileWriter::default()
        .add_block(0, info.into_vec())
        .add_block(2, texture_block.into_vec())
        .add_block(3, tile_block.into_vec())
        .finish()
}

pub struct MapObject {
    pub object_id: u32,
    pub position: [f32; 3],
}

fn write_objects(objects: &[MapObject]) -> Vec<u8> {
    let mut writer = RoseFileWriter::default();
    writer.write_u32(objects.len() as u32);
    for object in objects {
        writer.write_u8_length_string("object");
        writer.write_u16(0);
        writer.write_u16(0);
        writer.write_u32(1);
        writer.write_u32(object.object_id);
        writer.write_u32(0);
        writer.write_u32(0);
        writer.write_f32s(&[0.0, 0.0, 0.0, 1.0]);
        writer.write_f32s(&object.position);
        writer.write_f32s(&[1.0, 1.0, 1.0]);
    }
    writer.into_vec()
}

pub fn write_ifo(deco: &[MapObject], animated: &[MapObject]) -> Vec<u8> {
    BlockFileWriter::default()
        .add_block(1, write_objects(deco))
        .add_block(6, write_objects(animated))
        .finish()
}

fn write_part_property(writer: &mut RoseFileWriter, tag: u8, payload: &[u8]) {
    writer.write_u8(tag);
    writer.write_u8(payload.len() as u8);
    writer.write_bytes(payload);
}

/// A catalog with one mesh and material and a single one-part object. The
/// part is offset by `offset` and plays `animation` when given.
pub fn write_zsc(mesh: &str, material: &str, offset: [f32; 3], animation: Option<&str>) -> Vec<u8> {
    let mut writer = RoseFileWriter::default();
    writer.write_u16(1);
    writer.write_null_terminated_string(mesh);
    writer.write_u16(1);
    writer.write_null_terminated_string(material);
    for value in [0i16, 0, 0, 0, 128, 1, 1, 0, 0] {
        writer.write_i16(value);
    }
    writer.write_f32(1.0);
    writer.write_i16(0);
    writer.write_f32s(&[0.0, 0.0, 0.0]);
    writer.write_u16(0);

    writer.write_u16(1);
    writer.write_i32(100);
    writer.write_i32(0);
    writer.write_i32(0);
    writer.write_u16(1);
    writer.write_u16(0);
    writer.write_u16(0);
    let position: Vec<u8> = offset.iter().flat_map(|v| v.to_le_bytes()).collect();
    write_part_property(&mut writer, 1, &position);
    if let Some(animation) = animation {
        write_part_property(&mut writer, 30, animation.as_bytes());
    }
    writer.write_u8(0);
    writer.write_u16(0);
    writer.write_f32s(&[-1.0, -1.0, -1.0, 1.0, 1.0, 1.0]);
    writer.into_vec()
}

/// A version 8 mesh with unit normals, zeroed uvs and optional skinning.
pub fn write_zms(
    positions: &[[f32; 3]],
    bones: &[u16],
    skin: &[([f32; 4], [u16; 4])],
    indices: &[u16],
) -> Vec<u8> {
    let mut format = (1 << 1) | (1 << 2) | (1 << 7);
    if !skin.is_empty() {
        format |= (1 << 4) | (1 << 5);
    }

    let mut writer = RoseFileWriter::default();
    writer.write_null_terminated_string("ZMS0008");
    writer.write_u32(format);
    writer.write_f32s(&[0.0; 6]);
    writer.write_u16(bones.len() as u16);
    for &bone in bones {
        writer.write_u16(bone);
    }
    writer.write_u16(positions.len() as u16);
    for position in positions {
        writer.write_f32s(position);
    }
    for _ in positions {
        writer.write_f32s(&[0.0, 0.0, 1.0]);
    }
    for (weights, bone_indices) in skin {
        writer.write_f32s(weights);
        for &index in bone_indices {
            writer.write_u16(index);
        }
    }
    for _ in positions {
        writer.write_f32s(&[0.0, 0.0]);
    }
    writer.write_u16((indices.len() / 3) as u16);
    for &index in indices {
        writer.write_u16(index);
    }
    writer.write_u16(1);
    writer.write_u16((indices.len() / 3) as u16);
    writer.into_vec()
}

pub fn triangle_zms() -> Vec<u8> {
    write_zms(&[[0.0; 3], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]], &[], &[], &[0, 1, 2])
}

/// `(name, parent, position)` bones with identity rotations and no dummies.
pub fn write_zmd(bones: &[(&str, i32, [f32; 3])]) -> Vec<u8> {
    let mut writer = RoseFileWriter::default();
    writer.write_bytes(b"ZMD0003");
    writer.write_u32(bones.len() as u32);
    for (name, parent, position) in bones {
        writer.write_i32(*parent);
        writer.write_null_terminated_string(name);
        writer.write_f32s(position);
        writer.write_f32s(&[1.0, 0.0, 0.0, 0.0]);
    }
    writer.write_u32(0);
    writer.into_vec()
}

/// `channels` are `(type, bone)` pairs; each frame lists every channel's
/// values in order.
pub fn write_zmo(fps: u32, channels: &[(u32, u32)], frames: &[Vec<f32>]) -> Vec<u8> {
    let mut writer = RoseFileWriter::default();
    writer.write_null_terminated_string("ZMO0002");
    writer.write_u32(fps);
    writer.write_u32(frames.len() as u32);
    writer.write_u32(channels.len() as u32);
    for (channel_type, bone) in channels {
        writer.write_u32(*channel_type);
        writer.write_u32(*bone);
    }
    for frame in frames {
        writer.write_f32s(frame);
    }
    writer.into_vec()
}

/// A data root holding the JDT01 zone with the given tiles. Every tile has a
/// flat heightmap, a tile map painting zone tile 0 and, for tile (31, 31),
/// one decoration and one animated object.
pub struct ZoneFixture {
    pub root: tempfile::TempDir,
}

impl ZoneFixture {
    pub fn new(tiles: &[(i32, i32)]) -> Self {
        let root = tempfile::tempdir().unwrap();
        let fixture = Self { root };
        let zone = fixture.zone_directory();
        std::fs::create_dir_all(&zone).unwrap();

        write_file(
            &zone,
            "JDT01.ZON",
            write_zon(&["3DDATA\\TERRAIN\\TILES\\JUNON\\JD\\T021_00.DDS"]),
        );
        for &(x, y) in tiles {
            write_file(&zone, &format!("{}_{}.HIM", x, y), write_him(0.0));
            write_file(&zone, &format!("{}_{}.TIL", x, y), write_til(0));
            let ifo = if (x, y) == (31, 31) {
                write_ifo(
                    &[MapObject {
                        object_id: 0,
                        position: [5200.0, 5200.0, 0.0],
                    }],
                    &[MapObject {
                        object_id: 0,
                        position: [5300.0, 5200.0, 0.0],
                    }],
                )
            } else {
                write_ifo(&[], &[])
            };
            write_file(&zone, &format!("{}_{}.IFO", x, y), ifo);
        }

        let root = fixture.root.path();
        write_file(
            root,
            "3DData/STB/LIST_ZONE.STB",
            write_list_zone(DECO_CATALOG, ANIMATION_CATALOG),
        );
        write_file(
            root,
            "3DData/JUNON/LIST_DECO_JDT.ZSC",
            write_zsc(
                "3DDATA\\JUNON\\TREE01.ZMS",
                "3DDATA\\JUNON\\TREE01.DDS",
                [0.0, 0.0, 100.0],
                None,
            ),
        );
        write_file(
            root,
            "3DData/JUNON/EVENT_OBJECT_JDT.ZSC",
            write_zsc(
                "3DDATA\\JUNON\\WINDMILL.ZMS",
                "3DDATA\\JUNON\\WINDMILL.DDS",
                [0.0; 3],
                Some("3DDATA\\JUNON\\WINDMILL.ZMO"),
            ),
        );
        write_file(root, "3DData/JUNON/TREE01.ZMS", triangle_zms());
        write_file(root, "3DData/JUNON/WINDMILL.ZMS", triangle_zms());
        write_file(
            root,
            "3DData/JUNON/WINDMILL.ZMO",
            write_zmo(
                10,
                &[(4, 0)],
                &[vec![1.0, 0.0, 0.0, 0.0], vec![0.0, 0.0, 0.0, 1.0]],
            ),
        );

        fixture
    }

    pub fn zone_directory(&self) -> PathBuf {
        self.root.path().join(ZONE_DIRECTORY)
    }

    pub fn zone_path(&self) -> PathBuf {
        self.zone_directory().join("JDT01.ZON")
    }

    pub fn remove(&self, relative: &str) {
        std::fs::remove_file(self.root.path().join(relative)).unwrap();
    }
}
