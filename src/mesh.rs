use std::path::Path;

use arrayvec::ArrayVec;
use glam::{Vec2, Vec3};
use rose_file_readers::ZmsFile;

use crate::{
    coords::{flip_array, UNIT_SCALE},
    scene::{BoneWeight, MeshAsset, MeshSection},
};

/// Name of the `index`th material slot of a mesh.
pub fn material_slot_name(path: &str, index: usize) -> String {
    let normalised = path.replace('\\', "/");
    let stem = Path::new(&normalised)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("{}_{}", stem, index)
}

fn extend_stream<T: Clone>(
    target: &mut Vec<T>,
    target_len: usize,
    source: Vec<T>,
    source_len: usize,
    default: T,
) {
    if target.is_empty() && source.is_empty() {
        return;
    }

    target.resize(target_len, default.clone());
    if source.len() == source_len {
        target.extend(source);
    } else {
        target.resize(target_len + source_len, default);
    }
}

impl MeshAsset {
    /// Converts a decoded mesh into target space, in centimeters.
    pub fn from_zms(path: &str, zms: &ZmsFile) -> Self {
        let positions: Vec<Vec3> = zms
            .position
            .iter()
            .map(|&position| flip_array(position) * UNIT_SCALE)
            .collect();
        let normals = zms.normal.iter().map(|&normal| flip_array(normal)).collect();
        let tangents = zms
            .tangent
            .iter()
            .map(|&tangent| flip_array(tangent))
            .collect();

        let indices: Vec<u32> = zms.indices.iter().map(|&index| index as u32).collect();

        let mut sections = Vec::new();
        let mut first_index = 0u32;
        for (slot, &num_faces) in zms.material_num_faces.iter().enumerate() {
            let index_count = (num_faces as u32 * 3).min(indices.len() as u32 - first_index);
            if index_count == 0 {
                continue;
            }
            sections.push(MeshSection {
                material_slot: material_slot_name(path, slot),
                first_index,
                index_count,
            });
            first_index += index_count;
        }
        if (first_index as usize) < indices.len() {
            sections.push(MeshSection {
                material_slot: material_slot_name(path, zms.material_num_faces.len()),
                first_index,
                index_count: indices.len() as u32 - first_index,
            });
        }

        let mut mesh = Self {
            path: path.to_string(),
            positions,
            normals,
            tangents,
            colors: zms.color.clone(),
            uv1: zms.uv1.iter().map(|&uv| Vec2::from_array(uv)).collect(),
            uv2: zms.uv2.iter().map(|&uv| Vec2::from_array(uv)).collect(),
            skin: Vec::new(),
            indices,
            sections,
            bounds: (Vec3::ZERO, Vec3::ZERO),
        };
        mesh.update_bounds();
        mesh
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn update_bounds(&mut self) {
        let mut iter = self.positions.iter();
        self.bounds = match iter.next() {
            Some(&first) => iter.fold((first, first), |(min, max), &position| {
                (min.min(position), max.max(position))
            }),
            None => (Vec3::ZERO, Vec3::ZERO),
        };
    }

    /// Appends `other`, offsetting its indices and sections. Streams present
    /// on only one side are padded with defaults so they stay parallel.
    pub fn append(&mut self, other: MeshAsset) {
        let base_vertex = self.positions.len();
        let other_vertices = other.positions.len();
        let base_index = self.indices.len() as u32;

        extend_stream(&mut self.normals, base_vertex, other.normals, other_vertices, Vec3::Z);
        extend_stream(&mut self.tangents, base_vertex, other.tangents, other_vertices, Vec3::X);
        extend_stream(&mut self.colors, base_vertex, other.colors, other_vertices, [1.0; 4]);
        extend_stream(&mut self.uv1, base_vertex, other.uv1, other_vertices, Vec2::ZERO);
        extend_stream(&mut self.uv2, base_vertex, other.uv2, other_vertices, Vec2::ZERO);
        extend_stream(
            &mut self.skin,
            base_vertex,
            other.skin,
            other_vertices,
            ArrayVec::<BoneWeight, 4>::new(),
        );
        self.positions.extend(other.positions);

        self.indices.extend(
            other
                .indices
                .iter()
                .map(|&index| index + base_vertex as u32),
        );
        self.sections
            .extend(other.sections.into_iter().map(|section| MeshSection {
                first_index: section.first_index + base_index,
                ..section
            }));

        self.update_bounds();
    }
}
