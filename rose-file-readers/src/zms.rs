use crate::{reader::RoseFileReader, types::Vec3, ReadError, RoseFile};

bitflags::bitflags! {
    #[repr(transparent)]
    pub struct ZmsFormatFlags: u32 {
        const POSITION = (1 << 1);
        const NORMAL = (1 << 2);
        const COLOR = (1 << 3);
        const BONE_WEIGHT = (1 << 4);
        const BONE_INDEX = (1 << 5);
        const TANGENT = (1 << 6);
        const UV1 = (1 << 7);
        const UV2 = (1 << 8);
        const UV3 = (1 << 9);
        const UV4 = (1 << 10);
    }
}

/// A static or skinned mesh.
///
/// Positions are in meters for every version. `bone_indices` index into
/// `bones`, the mesh's own table of skeleton bone ids.
pub struct ZmsFile {
    pub version: u32,
    pub format: ZmsFormatFlags,
    pub bounding_box: (Vec3<f32>, Vec3<f32>),
    pub bones: Vec<u16>,
    pub position: Vec<[f32; 3]>,
    pub normal: Vec<[f32; 3]>,
    pub color: Vec<[f32; 4]>,
    pub bone_weights: Vec<[f32; 4]>,
    pub bone_indices: Vec<[u16; 4]>,
    pub tangent: Vec<[f32; 3]>,
    pub uv1: Vec<[f32; 2]>,
    pub uv2: Vec<[f32; 2]>,
    pub uv3: Vec<[f32; 2]>,
    pub uv4: Vec<[f32; 2]>,
    pub indices: Vec<u16>,
    pub strip_indices: Vec<u16>,
    pub material_num_faces: Vec<u16>,
    pub pool_type: u16,
}

impl ZmsFile {
    pub fn vertex_count(&self) -> usize {
        self.position.len()
    }

    pub fn is_skinned(&self) -> bool {
        !self.bones.is_empty() && !self.bone_weights.is_empty()
    }
}

impl RoseFile for ZmsFile {
    type ReadOptions = ();

    fn read(mut reader: RoseFileReader, _: &Self::ReadOptions) -> Result<Self, anyhow::Error> {
        let magic = reader.read_null_terminated_string()?;
        let version = match magic.as_ref() {
            "ZMS0005" => 5,
            "ZMS0006" => 6,
            "ZMS0007" => 7,
            "ZMS0008" => 8,
            _ => {
                return Err(ReadError::BadMagic {
                    expected: "ZMS0008",
                    found: magic.into_owned(),
                }
                .into())
            }
        };

        let format_bits = reader.read_u32()?;
        let format =
            ZmsFormatFlags::from_bits(format_bits).ok_or(ReadError::UnsupportedVariant {
                what: "ZMS format flags",
                value: format_bits as i64,
            })?;
        let bb_min = reader.read_vector3_f32()?;
        let bb_max = reader.read_vector3_f32()?;

        let mesh = if version <= 6 {
            Self::read_version6(&mut reader, version, format)?
        } else {
            Self::read_version8(&mut reader, version, format)?
        };

        Ok(Self {
            bounding_box: (bb_min, bb_max),
            ..mesh
        })
    }
}

fn read_stream<const N: usize>(
    reader: &mut RoseFileReader,
    present: bool,
    vertex_count: usize,
) -> Result<Vec<[f32; N]>, ReadError> {
    if present {
        reader.read_f32_array::<N>(vertex_count)
    } else {
        Ok(Vec::new())
    }
}

// Legacy streams prefix every element with its vertex id
fn read_legacy_stream<const N: usize>(
    reader: &mut RoseFileReader,
    present: bool,
    vertex_count: usize,
) -> Result<Vec<[f32; N]>, ReadError> {
    let mut values = Vec::new();
    if present {
        values.reserve_exact(vertex_count.min(reader.remaining()));
        for _ in 0..vertex_count {
            let _vertex_id = reader.read_u32()?;
            values.push(reader.read_f32_array::<N>(1)?[0]);
        }
    }
    Ok(values)
}

impl ZmsFile {
    fn read_version6(
        reader: &mut RoseFileReader,
        version: u32,
        format: ZmsFormatFlags,
    ) -> Result<Self, ReadError> {
        let bone_count = reader.read_u32()?;
        let mut bones = Vec::new();
        for _ in 0..bone_count {
            let _ = reader.read_u32()?;
            bones.push(reader.read_u32()? as u16);
        }

        let vertex_count = reader.read_u32()? as usize;

        let mut position =
            read_legacy_stream::<3>(reader, format.contains(ZmsFormatFlags::POSITION), vertex_count)?;

        // Mesh version 5/6 is scaled by 100.0
        for [x, y, z] in position.iter_mut() {
            *x /= 100.0;
            *y /= 100.0;
            *z /= 100.0;
        }

        let normal =
            read_legacy_stream::<3>(reader, format.contains(ZmsFormatFlags::NORMAL), vertex_count)?;
        let color =
            read_legacy_stream::<4>(reader, format.contains(ZmsFormatFlags::COLOR), vertex_count)?;

        let mut bone_weights = Vec::new();
        let mut bone_indices = Vec::new();
        if format.contains(ZmsFormatFlags::BONE_WEIGHT | ZmsFormatFlags::BONE_INDEX) {
            for _ in 0..vertex_count {
                let _vertex_id = reader.read_u32()?;
                bone_weights.push(reader.read_f32_array::<4>(1)?[0]);
                let mut index = [0u16; 4];
                for value in index.iter_mut() {
                    *value = reader.read_u32()? as u16;
                }
                bone_indices.push(index);
            }
        }

        let tangent =
            read_legacy_stream::<3>(reader, format.contains(ZmsFormatFlags::TANGENT), vertex_count)?;
        let uv1 = read_legacy_stream::<2>(reader, format.contains(ZmsFormatFlags::UV1), vertex_count)?;
        let uv2 = read_legacy_stream::<2>(reader, format.contains(ZmsFormatFlags::UV2), vertex_count)?;
        let uv3 = read_legacy_stream::<2>(reader, format.contains(ZmsFormatFlags::UV3), vertex_count)?;
        let uv4 = read_legacy_stream::<2>(reader, format.contains(ZmsFormatFlags::UV4), vertex_count)?;

        let triangle_count = reader.read_u32()? as usize;
        let mut indices = Vec::with_capacity(triangle_count.min(reader.remaining()) * 3);
        for _ in 0..triangle_count {
            let _face_id = reader.read_u32()?;
            indices.push(reader.read_u32()? as u16);
            indices.push(reader.read_u32()? as u16);
            indices.push(reader.read_u32()? as u16);
        }

        let mut material_num_faces = Vec::new();
        if version >= 6 && reader.remaining() > 0 {
            let num_matids = reader.read_u32()? as usize;
            for _ in 0..num_matids {
                let _index = reader.read_u32()?;
                material_num_faces.push(reader.read_u32()? as u16);
            }
        }

        Ok(Self {
            version,
            format,
            bounding_box: Default::default(),
            bones,
            position,
            normal,
            color,
            bone_weights,
            bone_indices,
            tangent,
            uv1,
            uv2,
            uv3,
            uv4,
            indices,
            strip_indices: Vec::new(),
            material_num_faces,
            pool_type: 0,
        })
    }

    fn read_version8(
        reader: &mut RoseFileReader,
        version: u32,
        format: ZmsFormatFlags,
    ) -> Result<Self, ReadError> {
        let bone_count = reader.read_u16()? as usize;
        let bones = reader.read_u16_array(bone_count)?;

        let vertex_count = reader.read_u16()? as usize;

        let position = read_stream::<3>(reader, format.contains(ZmsFormatFlags::POSITION), vertex_count)?;
        let normal = read_stream::<3>(reader, format.contains(ZmsFormatFlags::NORMAL), vertex_count)?;
        let color = read_stream::<4>(reader, format.contains(ZmsFormatFlags::COLOR), vertex_count)?;

        let mut bone_weights = Vec::new();
        let mut bone_indices = Vec::new();
        if format.contains(ZmsFormatFlags::BONE_WEIGHT | ZmsFormatFlags::BONE_INDEX) {
            bone_weights.reserve_exact(vertex_count);
            bone_indices.reserve_exact(vertex_count);
            for _ in 0..vertex_count {
                bone_weights.push(reader.read_f32_array::<4>(1)?[0]);
                let index = reader.read_u16_array(4)?;
                bone_indices.push([index[0], index[1], index[2], index[3]]);
            }
        }

        let tangent = read_stream::<3>(reader, format.contains(ZmsFormatFlags::TANGENT), vertex_count)?;
        let uv1 = read_stream::<2>(reader, format.contains(ZmsFormatFlags::UV1), vertex_count)?;
        let uv2 = read_stream::<2>(reader, format.contains(ZmsFormatFlags::UV2), vertex_count)?;
        let uv3 = read_stream::<2>(reader, format.contains(ZmsFormatFlags::UV3), vertex_count)?;
        let uv4 = read_stream::<2>(reader, format.contains(ZmsFormatFlags::UV4), vertex_count)?;

        let triangle_count = reader.read_u16()? as usize;
        let indices = reader.read_u16_array(triangle_count * 3)?;

        // Trailing sections are absent from some exported meshes
        let mut material_num_faces = Vec::new();
        let mut strip_indices = Vec::new();
        let mut pool_type = 0;
        if reader.remaining() > 0 {
            let num_matids = reader.read_u16()? as usize;
            material_num_faces = reader.read_u16_array(num_matids)?;
        }
        if reader.remaining() > 0 {
            let num_strip_indices = reader.read_u16()? as usize;
            strip_indices = reader.read_u16_array(num_strip_indices)?;
        }
        if version >= 8 && reader.remaining() >= 2 {
            pool_type = reader.read_u16()?;
        }

        Ok(Self {
            version,
            format,
            bounding_box: Default::default(),
            bones,
            position,
            normal,
            color,
            bone_weights,
            bone_indices,
            tangent,
            uv1,
            uv2,
            uv3,
            uv4,
            indices,
            strip_indices,
            material_num_faces,
            pool_type,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::RoseFileWriter;

    /// A version 8 triangle with positions, normals, one uv set and optional skinning.
    pub fn write_triangle(bones: &[u16], weights: Option<[u16; 4]>) -> Vec<u8> {
        let mut format = ZmsFormatFlags::POSITION | ZmsFormatFlags::NORMAL | ZmsFormatFlags::UV1;
        if weights.is_some() {
            format |= ZmsFormatFlags::BONE_WEIGHT | ZmsFormatFlags::BONE_INDEX;
        }

        let mut writer = RoseFileWriter::default();
        writer.write_null_terminated_string("ZMS0008");
        writer.write_u32(format.bits());
        writer.write_f32s(&[0.0, 0.0, 0.0, 1.0, 1.0, 0.0]);
        writer.write_u16(bones.len() as u16);
        for &bone in bones {
            writer.write_u16(bone);
        }
        writer.write_u16(3);
        writer.write_f32s(&[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
        writer.write_f32s(&[0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0]);
        if let Some(indices) = weights {
            for _ in 0..3 {
                writer.write_f32s(&[0.75, 0.25, 0.0, 0.0]);
                for index in indices {
                    writer.write_u16(index);
                }
            }
        }
        writer.write_f32s(&[0.0, 0.0, 1.0, 0.0, 0.0, 1.0]);
        writer.write_u16(1);
        for index in [0, 1, 2] {
            writer.write_u16(index);
        }
        writer.write_u16(1);
        writer.write_u16(1);
        writer.write_u16(0);
        writer.write_u16(2);
        writer.into_vec()
    }

    #[test]
    fn version8_streams() {
        let data = write_triangle(&[4, 9], Some([1, 0, 0, 0]));
        let zms = ZmsFile::read(RoseFileReader::from(&data), &()).unwrap();

        assert_eq!(zms.version, 8);
        assert_eq!(zms.vertex_count(), 3);
        assert_eq!(zms.position[1], [1.0, 0.0, 0.0]);
        assert_eq!(zms.normal[2], [0.0, 0.0, 1.0]);
        assert_eq!(zms.uv1[1], [1.0, 0.0]);
        assert_eq!(zms.bones, vec![4, 9]);
        assert_eq!(zms.bone_indices[0], [1, 0, 0, 0]);
        assert_eq!(zms.bone_weights[0], [0.75, 0.25, 0.0, 0.0]);
        assert_eq!(zms.indices, vec![0, 1, 2]);
        assert_eq!(zms.material_num_faces, vec![1]);
        assert_eq!(zms.pool_type, 2);
        assert_eq!(zms.bounding_box.1, Vec3 { x: 1.0, y: 1.0, z: 0.0 });
        assert!(zms.is_skinned());
    }

    #[test]
    fn version6_positions_are_rescaled() {
        let mut writer = RoseFileWriter::default();
        writer.write_null_terminated_string("ZMS0006");
        writer.write_u32(ZmsFormatFlags::POSITION.bits());
        writer.write_f32s(&[0.0; 6]);
        writer.write_u32(0);
        writer.write_u32(1);
        writer.write_u32(0);
        writer.write_f32s(&[100.0, 200.0, -50.0]);
        writer.write_u32(0);
        let data = writer.into_vec();

        let zms = ZmsFile::read(RoseFileReader::from(&data), &()).unwrap();
        assert_eq!(zms.position, vec![[1.0, 2.0, -0.5]]);
        assert!(zms.indices.is_empty());
        assert!(!zms.is_skinned());
    }

    #[test]
    fn rejects_unknown_version() {
        let mut writer = RoseFileWriter::default();
        writer.write_null_terminated_string("ZMS0009");
        let data = writer.into_vec();
        let error = ZmsFile::read(RoseFileReader::from(&data), &()).err().unwrap();
        assert!(matches!(
            error.downcast_ref::<ReadError>(),
            Some(ReadError::BadMagic { .. })
        ));
    }
}
