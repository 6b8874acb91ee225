//! Byte builders for unit tests.

use rose_file_readers::RoseFileWriter;

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

/// `(name, parent, position)` bones and dummies with identity rotations.
pub fn write_zmd(bones: &[(&str, i32, [f32; 3])], dummies: &[(&str, i32, [f32; 3])]) -> Vec<u8> {
    let mut writer = RoseFileWriter::default();
    writer.write_bytes(b"ZMD0003");
    writer.write_u32(bones.len() as u32);
    for (name, parent, position) in bones {
        writer.write_i32(*parent);
        writer.write_null_terminated_string(name);
        writer.write_f32s(position);
        writer.write_f32s(&[1.0, 0.0, 0.0, 0.0]);
    }
    writer.write_u32(dummies.len() as u32);
    for (name, parent, position) in dummies {
        writer.write_null_terminated_string(name);
        writer.write_i32(*parent);
        writer.write_f32s(position);
        writer.write_f32s(&[1.0, 0.0, 0.0, 0.0]);
    }
    writer.into_vec()
}

/// A version 8 mesh with unit normals, zeroed uvs and optional skinning.
pub fn write_zms(
    positions: &[[f32; 3]],
    bones: &[u16],
    skin: &[([f32; 4], [u16; 4])],
    indices: &[u16],
    material_faces: &[u16],
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
    writer.write_u16(material_faces.len() as u16);
    for &faces in material_faces {
        writer.write_u16(faces);
    }
    writer.into_vec()
}
