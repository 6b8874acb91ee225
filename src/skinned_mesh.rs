use arrayvec::ArrayVec;
use log::debug;
use rose_file_readers::ZmsFile;

use crate::{
    coords::Transform,
    scene::{BoneWeight, MeshAsset, SkeletonAsset},
};

const RIGID_PATH_MARKERS: [&str; 2] = ["FACE", "HAIR"];
const RIGID_ANCHOR_BONES: [&str; 2] = ["b1_head", "b1_neck"];

/// Face and hair meshes, and meshes without a bone table, are attached to a
/// single bone instead of being skinned.
pub fn is_rigid_part(path: &str, zms: &ZmsFile) -> bool {
    let upper = path.to_ascii_uppercase();
    zms.bones.is_empty()
        || !zms.is_skinned()
        || RIGID_PATH_MARKERS
            .iter()
            .any(|marker| upper.contains(marker))
}

pub fn rigid_anchor_bone(skeleton: &SkeletonAsset) -> usize {
    RIGID_ANCHOR_BONES
        .iter()
        .find_map(|name| skeleton.find_bone(name))
        .unwrap_or(0)
}

fn bind_rigid(mesh: &mut MeshAsset, skeleton: &SkeletonAsset) {
    let anchor = rigid_anchor_bone(skeleton);
    let anchor_world = skeleton
        .bones
        .get(anchor)
        .map_or(Transform::IDENTITY, |bone| bone.world);

    for position in mesh.positions.iter_mut() {
        *position = anchor_world.transform_point(*position);
    }
    for normal in mesh.normals.iter_mut() {
        *normal = anchor_world.transform_vector(*normal);
    }
    for tangent in mesh.tangents.iter_mut() {
        *tangent = anchor_world.transform_vector(*tangent);
    }

    let mut weight = ArrayVec::new();
    weight.push(BoneWeight {
        bone: anchor as u16,
        weight: 1.0,
    });
    mesh.skin = vec![weight; mesh.positions.len()];
    mesh.update_bounds();
}

fn bind_skinned(mesh: &mut MeshAsset, zms: &ZmsFile, skeleton: &SkeletonAsset) {
    mesh.skin = zms
        .bone_weights
        .iter()
        .zip(&zms.bone_indices)
        .map(|(weights, indices)| {
            let mut influences: ArrayVec<BoneWeight, 4> = ArrayVec::new();
            for (&weight, &local_index) in weights.iter().zip(indices) {
                if weight <= 0.0 || !weight.is_finite() {
                    continue;
                }

                let bone = zms
                    .bones
                    .get(local_index as usize)
                    .and_then(|&source| skeleton.remap_bone(source as usize));
                match bone {
                    Some(bone) => influences.push(BoneWeight {
                        bone: bone as u16,
                        weight,
                    }),
                    None => debug!(
                        "Dropping influence on missing bone {} in {}",
                        local_index, mesh.path
                    ),
                }
            }

            let total: f32 = influences.iter().map(|influence| influence.weight).sum();
            if total > 1.0 {
                for influence in influences.iter_mut() {
                    influence.weight /= total;
                }
            }
            influences
        })
        .collect();
    mesh.skin.resize(mesh.positions.len(), ArrayVec::new());
}

/// Merges mesh parts into one skinned mesh bound to `skeleton`. Each part
/// keeps its own material slots.
pub fn assemble_skinned_mesh(
    path: &str,
    skeleton: &SkeletonAsset,
    parts: &[(String, ZmsFile)],
) -> MeshAsset {
    let mut merged = MeshAsset {
        path: path.to_string(),
        ..Default::default()
    };

    for (part_path, zms) in parts {
        let mut mesh = MeshAsset::from_zms(part_path, zms);
        if is_rigid_part(part_path, zms) {
            debug!("Binding {} rigidly", part_path);
            bind_rigid(&mut mesh, skeleton);
        } else {
            bind_skinned(&mut mesh, zms, skeleton);
        }
        merged.append(mesh);
    }

    merged
}
