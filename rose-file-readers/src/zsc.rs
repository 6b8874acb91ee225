use log::warn;

use crate::{
    reader::RoseFileReader,
    types::{Quat4, Vec2, Vec3},
    ReadError, RoseFile,
};

const MAX_PART_PROPERTIES: usize = 2000;
const MAX_EFFECT_PROPERTIES: usize = 100;

#[derive(Clone, Debug, PartialEq)]
pub struct ZscMaterial {
    pub path: String,
    pub is_skin: bool,
    pub alpha_enabled: bool,
    pub two_sided: bool,
    pub alpha_test_enabled: bool,
    pub alpha_ref: i16,
    pub z_test_enabled: bool,
    pub z_write_enabled: bool,
    pub blend_type: i16,
    pub specular_enabled: bool,
    pub alpha: f32,
    pub glow_type: i16,
    pub glow_color: Vec3<f32>,
}

/// One entry of a part's tagged property bag.
#[derive(Clone, Debug, PartialEq)]
pub enum ZscProperty {
    Position(Vec3<f32>),
    Rotation(Quat4<f32>),
    Scale(Vec3<f32>),
    AxisRotation(Quat4<f32>),
    BoneIndex(i16),
    DummyIndex(i16),
    Parent(i16),
    Collision(i16),
    AnimationPath(String),
    /// A recognised tag whose payload is not needed (animation, visible range, lightmap).
    Ignored { tag: u8, len: u8 },
    Unknown { tag: u8, len: u8 },
}

impl ZscProperty {
    fn decode(tag: u8, payload: &[u8]) -> Result<Self, ReadError> {
        let len = payload.len() as u8;
        let mut reader = RoseFileReader::from(payload);
        Ok(match tag {
            1 => ZscProperty::Position(reader.read_vector3_f32()?),
            2 => ZscProperty::Rotation(reader.read_quat4_wxyz_f32()?),
            3 => ZscProperty::Scale(reader.read_vector3_f32()?),
            4 => ZscProperty::AxisRotation(reader.read_quat4_wxyz_f32()?),
            5 => ZscProperty::BoneIndex(reader.read_i16()?),
            6 => ZscProperty::DummyIndex(reader.read_i16()?),
            7 => ZscProperty::Parent(reader.read_i16()?),
            29 => ZscProperty::Collision(reader.read_i16()?),
            30 => ZscProperty::AnimationPath(
                reader.read_fixed_length_string(payload.len())?.into_owned(),
            ),
            8 | 31 | 32 => ZscProperty::Ignored { tag, len },
            _ => ZscProperty::Unknown { tag, len },
        })
    }
}

/// Reads `(tag, len, payload)` triples until a zero tag.
fn read_properties(
    reader: &mut RoseFileReader,
    limit: usize,
) -> Result<Vec<ZscProperty>, ReadError> {
    let mut properties = Vec::new();

    loop {
        let tag = reader.read_u8()?;
        if tag == 0 {
            break;
        }

        if properties.len() >= limit {
            warn!(
                "ZSC property bag exceeded {} entries at offset {}",
                limit,
                reader.position()
            );
            break;
        }

        let len = reader.read_u8()?;
        let payload = reader.read_fixed_length_bytes(len as usize)?;
        let property = match ZscProperty::decode(tag, payload) {
            Ok(property) => property,
            Err(_) => ZscProperty::Unknown { tag, len },
        };
        properties.push(property);
    }

    Ok(properties)
}

#[derive(Clone, Debug, PartialEq)]
pub struct ZscObjectPart {
    pub mesh_id: u16,
    pub material_id: u16,
    pub position: Vec3<f32>,
    pub rotation: Quat4<f32>,
    pub scale: Vec3<f32>,
    pub axis_rotation: Quat4<f32>,
    pub bone_index: Option<i16>,
    pub dummy_index: Option<i16>,
    pub parent: Option<i16>,
    pub collision: i16,
    pub animation_path: Option<String>,
    pub properties: Vec<ZscProperty>,
}

impl ZscObjectPart {
    fn new(mesh_id: u16, material_id: u16, properties: Vec<ZscProperty>) -> Self {
        let mut part = Self {
            mesh_id,
            material_id,
            position: Vec3::ZERO,
            rotation: Quat4::IDENTITY,
            scale: Vec3::ONE,
            axis_rotation: Quat4::IDENTITY,
            bone_index: None,
            dummy_index: None,
            parent: None,
            collision: 0,
            animation_path: None,
            properties: Vec::new(),
        };

        for property in properties.iter() {
            match property {
                ZscProperty::Position(position) => part.position = *position,
                ZscProperty::Rotation(rotation) => part.rotation = *rotation,
                ZscProperty::Scale(scale) => part.scale = *scale,
                ZscProperty::AxisRotation(rotation) => part.axis_rotation = *rotation,
                ZscProperty::BoneIndex(index) => part.bone_index = Some(*index),
                ZscProperty::DummyIndex(index) => part.dummy_index = Some(*index),
                ZscProperty::Parent(parent) => part.parent = Some(*parent),
                ZscProperty::Collision(collision) => part.collision = *collision,
                ZscProperty::AnimationPath(path) => {
                    if !path.is_empty() {
                        part.animation_path = Some(path.clone());
                    }
                }
                ZscProperty::Ignored { .. } | ZscProperty::Unknown { .. } => {}
            }
        }

        part.properties = properties;
        part
    }

    pub fn unknown_tags(&self) -> impl Iterator<Item = u8> + '_ {
        self.properties.iter().filter_map(|property| match property {
            ZscProperty::Unknown { tag, .. } => Some(*tag),
            _ => None,
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ZscObjectEffect {
    pub effect_id: u16,
    pub effect_type: u16,
    pub position: Vec3<f32>,
    pub rotation: Quat4<f32>,
    pub scale: Vec3<f32>,
    pub parent: Option<i16>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ZscObject {
    pub radius: i32,
    pub center: Vec2<i32>,
    pub parts: Vec<ZscObjectPart>,
    pub effects: Vec<ZscObjectEffect>,
    pub bounding_box: Option<(Vec3<f32>, Vec3<f32>)>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ZscFile {
    pub meshes: Vec<String>,
    pub materials: Vec<ZscMaterial>,
    pub effects: Vec<String>,
    pub objects: Vec<ZscObject>,
}

#[derive(Default, Clone, Copy)]
pub struct ZscReadOptions {
    /// Fail on parts referencing meshes or materials that do not exist.
    pub strict: bool,
}

impl RoseFile for ZscFile {
    type ReadOptions = ZscReadOptions;

    fn read(mut reader: RoseFileReader, options: &ZscReadOptions) -> Result<Self, anyhow::Error> {
        let start = reader.position();
        if reader.remaining() < 4 || reader.read_fixed_length_bytes(4)? != b"ZSC1" {
            reader.set_position(start);
        }

        let mesh_count = reader.read_u16()? as usize;
        let mut meshes = Vec::with_capacity(mesh_count);
        for _ in 0..mesh_count {
            meshes.push(reader.read_tokenized_string()?);
        }

        let material_count = reader.read_u16()? as usize;
        let mut materials = Vec::with_capacity(material_count);
        for _ in 0..material_count {
            let path = reader.read_tokenized_string()?;
            let is_skin = reader.read_i16()? != 0;
            let alpha_enabled = reader.read_i16()? != 0;
            let two_sided = reader.read_i16()? != 0;
            let alpha_test_enabled = reader.read_i16()? != 0;
            let alpha_ref = reader.read_i16()?;
            let z_test_enabled = reader.read_i16()? != 0;
            let z_write_enabled = reader.read_i16()? != 0;
            let blend_type = reader.read_i16()?;
            let specular_enabled = reader.read_i16()? != 0;
            let alpha = reader.read_f32()?;
            let glow_type = reader.read_i16()?;
            let glow_color = reader.read_vector3_f32()?;

            materials.push(ZscMaterial {
                path,
                is_skin,
                alpha_enabled,
                two_sided,
                alpha_test_enabled,
                alpha_ref,
                z_test_enabled,
                z_write_enabled,
                blend_type,
                specular_enabled,
                alpha,
                glow_type,
                glow_color,
            });
        }

        let effect_count = reader.read_u16()? as usize;
        let mut effects = Vec::with_capacity(effect_count);
        for _ in 0..effect_count {
            effects.push(reader.read_tokenized_string()?);
        }

        let object_count = reader.read_u16()? as usize;
        let mut objects = Vec::with_capacity(object_count);
        for _ in 0..object_count {
            let radius = reader.read_i32()?;
            let x = reader.read_i32()?;
            let y = reader.read_i32()?;
            let center = Vec2 { x, y };

            // An object without parts ends here, it has no effect list or bounds
            let object_part_count = reader.read_u16()? as usize;
            if object_part_count == 0 {
                objects.push(ZscObject {
                    radius,
                    center,
                    parts: Vec::new(),
                    effects: Vec::new(),
                    bounding_box: None,
                });
                continue;
            }

            let mut parts = Vec::with_capacity(object_part_count);
            for _ in 0..object_part_count {
                let mesh_id = reader.read_u16()?;
                let material_id = reader.read_u16()?;
                let properties = read_properties(&mut reader, MAX_PART_PROPERTIES)?;

                if options.strict {
                    if mesh_id as usize >= meshes.len() {
                        return Err(ReadError::OutOfRange {
                            what: "ZSC mesh",
                            index: mesh_id as i64,
                            len: meshes.len(),
                        }
                        .into());
                    }
                    if material_id as usize >= materials.len() {
                        return Err(ReadError::OutOfRange {
                            what: "ZSC material",
                            index: material_id as i64,
                            len: materials.len(),
                        }
                        .into());
                    }
                }

                parts.push(ZscObjectPart::new(mesh_id, material_id, properties));
            }

            let effect_count = reader.read_u16()? as usize;
            let mut object_effects = Vec::with_capacity(effect_count);
            for _ in 0..effect_count {
                let effect_id = reader.read_u16()?;
                let effect_type = reader.read_u16()?;
                let mut effect = ZscObjectEffect {
                    effect_id,
                    effect_type,
                    position: Vec3::ZERO,
                    rotation: Quat4::IDENTITY,
                    scale: Vec3::ONE,
                    parent: None,
                };

                for property in read_properties(&mut reader, MAX_EFFECT_PROPERTIES)? {
                    match property {
                        ZscProperty::Position(position) => effect.position = position,
                        ZscProperty::Rotation(rotation) => effect.rotation = rotation,
                        ZscProperty::Scale(scale) => effect.scale = scale,
                        ZscProperty::Parent(parent) => effect.parent = Some(parent),
                        _ => {}
                    }
                }
                object_effects.push(effect);
            }

            let bb_min = reader.read_vector3_f32()?;
            let bb_max = reader.read_vector3_f32()?;

            objects.push(ZscObject {
                radius,
                center,
                parts,
                effects: object_effects,
                bounding_box: Some((bb_min, bb_max)),
            });
        }

        Ok(Self {
            meshes,
            materials,
            effects,
            objects,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::RoseFileWriter;

    pub fn write_material(writer: &mut RoseFileWriter, path: &str) {
        writer.write_null_terminated_string(path);
        for value in [0i16, 1, 1, 0, 128, 1, 1, 1, 0] {
            writer.write_i16(value);
        }
        writer.write_f32(1.0);
        writer.write_i16(0);
        writer.write_f32s(&[0.0, 0.0, 0.0]);
    }

    fn write_property(writer: &mut RoseFileWriter, tag: u8, payload: &[u8]) {
        writer.write_u8(tag);
        writer.write_u8(payload.len() as u8);
        writer.write_bytes(payload);
    }

    fn write_i32s(writer: &mut RoseFileWriter, values: &[i32]) {
        for &value in values {
            writer.write_i32(value);
        }
    }

    fn floats(values: &[f32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    fn write_catalog(writer: &mut RoseFileWriter) {
        writer.write_u16(1);
        writer.write_null_terminated_string("3DDATA\\JUNON\\TREE.ZMS");
        writer.write_u16(1);
        write_material(writer, "3DDATA\\JUNON\\TREE.DDS");
        writer.write_u16(0);

        writer.write_u16(2);

        // Empty object, followed directly by the next object
        write_i32s(writer, &[10, 0, 0]);
        writer.write_u16(0);

        write_i32s(writer, &[20, 1, 2]);
        writer.write_u16(1);
        writer.write_u16(0);
        writer.write_u16(0);
        write_property(writer, 1, &floats(&[1.0, 2.0, 3.0]));
        write_property(writer, 2, &floats(&[1.0, 0.0, 0.0, 0.0]));
        write_property(writer, 99, &[1, 2, 3]);
        write_property(writer, 7, &2i16.to_le_bytes());
        write_property(writer, 30, b"3DDATA\\ANI.ZMO");
        writer.write_u8(0);
        writer.write_u16(1);
        writer.write_u16(4);
        writer.write_u16(1);
        write_property(writer, 3, &floats(&[2.0, 2.0, 2.0]));
        writer.write_u8(0);
        writer.write_f32s(&[-1.0, -1.0, -1.0, 1.0, 1.0, 1.0]);
    }

    fn read(data: &Vec<u8>) -> ZscFile {
        ZscFile::read(RoseFileReader::from(data), &Default::default()).unwrap()
    }

    #[test]
    fn empty_object_stops_early() {
        let mut writer = RoseFileWriter::default();
        write_catalog(&mut writer);
        let zsc = read(&writer.into_vec());

        assert_eq!(zsc.objects.len(), 2);
        assert!(zsc.objects[0].parts.is_empty());
        assert_eq!(zsc.objects[0].bounding_box, None);

        let object = &zsc.objects[1];
        assert_eq!(object.radius, 20);
        assert_eq!(object.center, Vec2 { x: 1, y: 2 });
        assert_eq!(object.parts.len(), 1);
        assert_eq!(object.effects.len(), 1);
        assert_eq!(object.effects[0].effect_type, 4);
        assert_eq!(object.effects[0].scale, Vec3 { x: 2.0, y: 2.0, z: 2.0 });
        assert!(object.bounding_box.is_some());
    }

    #[test]
    fn part_properties() {
        let mut writer = RoseFileWriter::default();
        write_catalog(&mut writer);
        let zsc = read(&writer.into_vec());

        let part = &zsc.objects[1].parts[0];
        assert_eq!(part.position, Vec3 { x: 1.0, y: 2.0, z: 3.0 });
        assert_eq!(part.rotation, Quat4::IDENTITY);
        assert_eq!(part.scale, Vec3::ONE);
        assert_eq!(part.parent, Some(2));
        assert_eq!(part.animation_path.as_deref(), Some("3DDATA\\ANI.ZMO"));
        assert_eq!(part.unknown_tags().collect::<Vec<_>>(), vec![99]);
        assert_eq!(zsc.meshes[0], "3DDATA\\JUNON\\TREE.ZMS");
        assert!(zsc.materials[0].alpha_enabled);
        assert_eq!(zsc.materials[0].alpha_ref, 128);
    }

    #[test]
    fn header_is_optional() {
        let mut plain = RoseFileWriter::default();
        write_catalog(&mut plain);

        let mut headed = RoseFileWriter::default();
        headed.write_bytes(b"ZSC1");
        write_catalog(&mut headed);

        assert_eq!(read(&plain.into_vec()), read(&headed.into_vec()));
    }

    #[test]
    fn strict_mode_rejects_missing_mesh() {
        let mut writer = RoseFileWriter::default();
        writer.write_u16(0);
        writer.write_u16(0);
        writer.write_u16(0);
        writer.write_u16(1);
        write_i32s(&mut writer, &[0, 0, 0]);
        writer.write_u16(1);
        writer.write_u16(3);
        writer.write_u16(0);
        writer.write_u8(0);
        writer.write_u16(0);
        writer.write_f32s(&[0.0; 6]);
        let data = writer.into_vec();

        assert_eq!(read(&data).objects[0].parts[0].mesh_id, 3);

        let error = ZscFile::read(
            RoseFileReader::from(&data),
            &ZscReadOptions { strict: true },
        )
        .err()
        .unwrap();
        assert!(matches!(
            error.downcast_ref::<ReadError>(),
            Some(ReadError::OutOfRange { index: 3, .. })
        ));
    }
}
