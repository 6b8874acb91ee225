use crate::{
    types::{Quat4, Vec3},
    ReadError, RoseFile, RoseFileReader,
};

/// A skeleton. Bone transforms are local to the parent bone, dummy
/// transforms are as stored.
pub struct ZmdFile {
    pub version: u32,
    pub bones: Vec<ZmdBone>,
    pub dummy_bones: Vec<ZmdBone>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ZmdBone {
    pub name: String,
    pub parent: i32,
    pub position: Vec3<f32>,
    pub rotation: Quat4<f32>,
}

impl ZmdFile {
    pub fn find_bone(&self, name: &str) -> Option<usize> {
        self.bones
            .iter()
            .position(|bone| bone.name.eq_ignore_ascii_case(name))
    }
}

impl RoseFile for ZmdFile {
    type ReadOptions = ();

    fn read(mut reader: RoseFileReader, _: &Self::ReadOptions) -> Result<Self, anyhow::Error> {
        let magic = reader.read_fixed_length_string(7)?;
        let version = match magic.as_ref() {
            "ZMD0002" => 2,
            "ZMD0003" => 3,
            _ => {
                return Err(ReadError::BadMagic {
                    expected: "ZMD0003",
                    found: magic.into_owned(),
                }
                .into())
            }
        };

        let bone_count = reader.read_u32()? as usize;
        let mut bones = Vec::with_capacity(bone_count.min(reader.remaining()));
        for _ in 0..bone_count {
            let parent = reader.read_i32()?;
            let name = reader.read_null_terminated_string()?.into_owned();
            let position = reader.read_vector3_f32()?;
            let rotation = reader.read_quat4_wxyz_f32()?;
            bones.push(ZmdBone {
                name,
                parent,
                position,
                rotation,
            });
        }

        let dummy_bone_count = reader.read_u32()? as usize;
        let mut dummy_bones = Vec::with_capacity(dummy_bone_count.min(reader.remaining()));
        for _ in 0..dummy_bone_count {
            let name = reader.read_null_terminated_string()?.into_owned();
            let parent = reader.read_i32()?;
            let position = reader.read_vector3_f32()?;
            let rotation = if version == 2 {
                Quat4::IDENTITY
            } else {
                reader.read_quat4_wxyz_f32()?
            };

            dummy_bones.push(ZmdBone {
                name,
                parent,
                position,
                rotation,
            });
        }

        Ok(Self {
            version,
            bones,
            dummy_bones,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::RoseFileWriter;

    /// Writes a version 3 skeleton from `(name, parent, position)` triples with identity rotations.
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

    #[test]
    fn bones_and_dummies() {
        let data = write_zmd(
            &[("b1_pelvis", -1, [0.0, 0.0, 90.0]), ("b1_head", 0, [0.0, 0.0, 60.0])],
            &[("p_00", 1, [0.0, 0.1, 0.0])],
        );
        let zmd = ZmdFile::read(RoseFileReader::from(&data), &()).unwrap();

        assert_eq!(zmd.version, 3);
        assert_eq!(zmd.bones.len(), 2);
        assert_eq!(zmd.bones[0].parent, -1);
        assert_eq!(zmd.bones[1].rotation, Quat4::IDENTITY);
        assert_eq!(zmd.find_bone("B1_HEAD"), Some(1));
        assert_eq!(zmd.dummy_bones[0].name, "p_00");
        assert_eq!(zmd.dummy_bones[0].parent, 1);
    }

    #[test]
    fn version2_dummies_have_no_rotation() {
        let mut writer = RoseFileWriter::default();
        writer.write_bytes(b"ZMD0002");
        writer.write_u32(0);
        writer.write_u32(1);
        writer.write_null_terminated_string("p_00");
        writer.write_i32(0);
        writer.write_f32s(&[1.0, 2.0, 3.0]);
        let data = writer.into_vec();

        let zmd = ZmdFile::read(RoseFileReader::from(&data), &()).unwrap();
        assert_eq!(zmd.dummy_bones[0].rotation, Quat4::IDENTITY);
        assert_eq!(zmd.dummy_bones[0].position, Vec3 { x: 1.0, y: 2.0, z: 3.0 });
    }
}
