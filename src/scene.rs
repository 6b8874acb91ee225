use arrayvec::ArrayVec;
use glam::{Quat, Vec2, Vec3};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::{coords::Transform, tileset::TileSet};

/// Everything decoded from one zone.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub terrain: Terrain,
    pub instances: Vec<Instance>,
    pub buckets: Vec<InstanceBucket>,
    pub animated: Vec<Animated>,
    pub meshes: Vec<MeshAsset>,
    pub materials: Vec<MaterialDesc>,
    pub skeletons: Vec<SkeletonAsset>,
    pub animations: Vec<AnimationAsset>,
    pub textures: Vec<TextureAsset>,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Terrain {
    /// Vertices per row of `heights` and of every layer's weights.
    pub width: u32,
    pub height: u32,
    pub tile_min: (i32, i32),
    pub tile_max: (i32, i32),
    pub anchor_xy: Vec2,
    pub axis_scale: Vec3,
    pub heights: Vec<u16>,
    pub layers: Vec<TerrainLayer>,
    pub tile_set: Option<TileSet>,
    /// One entry per 4x4 vertex patch, row-major over the merged grid.
    pub patches: Vec<TerrainPatch>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TerrainLayer {
    pub texture_id: i32,
    /// Data-root relative path of the layer texture, if it was found.
    pub texture_path: Option<String>,
    /// Index into `Scene::textures` when textures are loaded.
    pub texture: Option<usize>,
    pub weights: Vec<u8>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerrainPatch {
    pub tile_id: i32,
    pub brush: Option<u16>,
    pub atlas_cell: Option<(u8, u8)>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceFlags {
    pub cast_shadow_two_sided: bool,
    pub no_shadow: bool,
    pub no_collision: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    pub mesh_id: usize,
    pub material_id: Option<usize>,
    pub transform: Transform,
    pub flags: InstanceFlags,
}

/// A run of `Scene::instances` sharing one mesh and material.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceBucket {
    pub mesh_id: usize,
    pub material_id: Option<usize>,
    pub first_instance: usize,
    pub instance_count: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Animated {
    pub mesh_id: usize,
    pub material_id: Option<usize>,
    pub transform: Transform,
    pub animation_path: String,
    pub anim_id: Option<usize>,
    pub flags: InstanceFlags,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BoneWeight {
    pub bone: u16,
    pub weight: f32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeshSection {
    pub material_slot: String,
    pub first_index: u32,
    pub index_count: u32,
}

/// Converted mesh geometry: target space, centimeters.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MeshAsset {
    pub path: String,
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub tangents: Vec<Vec3>,
    pub colors: Vec<[f32; 4]>,
    pub uv1: Vec<Vec2>,
    pub uv2: Vec<Vec2>,
    /// Per vertex influences, empty for static meshes.
    pub skin: Vec<ArrayVec<BoneWeight, 4>>,
    pub indices: Vec<u32>,
    pub sections: Vec<MeshSection>,
    pub bounds: (Vec3, Vec3),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MaterialDesc {
    pub path: String,
    pub texture: Option<usize>,
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
    pub glow_color: Vec3,
}

impl MaterialDesc {
    /// Translucent materials without alpha testing do not cast shadows.
    pub fn casts_shadow(&self) -> bool {
        !(self.alpha_enabled && self.blend_type != 0 && !self.alpha_test_enabled)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bone {
    pub name: String,
    pub parent: Option<usize>,
    pub local: Transform,
    /// Rest pose in model space.
    pub world: Transform,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SkeletonAsset {
    pub path: String,
    /// Real bones first, then dummies. A parent always precedes its children.
    pub bones: Vec<Bone>,
    pub bone_count: usize,
    /// Source bone index to emitted bone index.
    pub remap: Vec<Option<usize>>,
}

impl SkeletonAsset {
    pub fn find_bone(&self, name: &str) -> Option<usize> {
        self.bones
            .iter()
            .position(|bone| bone.name.eq_ignore_ascii_case(name))
    }

    pub fn dummy_count(&self) -> usize {
        self.bones.len() - self.bone_count
    }

    pub fn remap_bone(&self, source_index: usize) -> Option<usize> {
        self.remap.get(source_index).copied().flatten()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnimationStream {
    Position,
    Rotation,
    Scale,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoneTrack {
    pub bone: usize,
    /// Streams that were sampled from the file; the rest hold the rest pose.
    pub streams: Vec<AnimationStream>,
    pub positions: Vec<Vec3>,
    pub rotations: Vec<Quat>,
    pub scales: Vec<Vec3>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AnimationAsset {
    pub path: String,
    pub fps: u32,
    pub frame_count: usize,
    pub tracks: Vec<BoneTrack>,
    pub frame_events: Vec<u16>,
}

impl AnimationAsset {
    pub fn track(&self, bone: usize) -> Option<&BoneTrack> {
        self.tracks.iter().find(|track| track.bone == bone)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextureAsset {
    pub path: String,
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticKind {
    MissingFile,
    UnknownBlock,
    UnknownProperty,
    EmptyObject,
    OutOfRangeReference,
    MissingIndexEntry,
    DecodeFailed,
}

/// A problem that was skipped over during import.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub path: Option<String>,
    pub message: String,
}

#[derive(Default)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    pub fn push(&mut self, kind: DiagnosticKind, path: Option<&str>, message: impl Into<String>) {
        let message = message.into();
        match path {
            Some(path) => warn!("{:?} in {}: {}", kind, path, message),
            None => warn!("{:?}: {}", kind, message),
        }
        self.0.push(Diagnostic {
            kind,
            path: path.map(str::to_string),
            message,
        });
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> + '_ {
        self.0.iter()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.0
    }
}
