use std::collections::HashSet;

use log::debug;
use rose_file_readers::{ZmdBone, ZmdFile};

use crate::{
    coords::{flip_position, flip_rotation, Transform, UNIT_SCALE},
    error::{ErrorKind, ImportError},
    scene::{Bone, SkeletonAsset},
};

fn source_transform(bone: &ZmdBone) -> Transform {
    Transform::from_translation_rotation(flip_position(bone.position), flip_rotation(bone.rotation))
}

struct UniqueNames(HashSet<String>);

impl UniqueNames {
    fn claim(&mut self, name: &str, fallback_index: usize) -> String {
        let base = if name.is_empty() {
            format!("bone_{}", fallback_index)
        } else {
            name.to_string()
        };

        let mut candidate = base.clone();
        let mut suffix = 1;
        while !self.0.insert(candidate.to_ascii_lowercase()) {
            candidate = format!("{}_{}", base, suffix);
            suffix += 1;
        }
        candidate
    }
}

/// Orders bones so every parent precedes its children, then appends the
/// dummies. Bones whose parent is negative, themselves or out of range are
/// roots; every root after the first is reparented onto the first.
pub fn build_skeleton(path: &str, zmd: &ZmdFile) -> Result<SkeletonAsset, ImportError> {
    let bone_count = zmd.bones.len();
    let mut remap: Vec<Option<usize>> = vec![None; bone_count];
    let mut bones: Vec<Bone> = Vec::with_capacity(bone_count + zmd.dummy_bones.len());
    let mut names = UniqueNames(HashSet::new());
    let mut primary_root: Option<usize> = None;
    let mut passes = 0;

    while bones.len() < bone_count {
        passes += 1;
        if passes > bone_count + 2 {
            return Err(ImportError::new(ErrorKind::CyclicDependency).with_path(path));
        }

        let emitted_before = bones.len();
        for (index, source) in zmd.bones.iter().enumerate() {
            if remap[index].is_some() {
                continue;
            }

            let is_root = usize::try_from(source.parent)
                .map_or(true, |parent| parent == index || parent >= bone_count);
            let parent = if is_root {
                primary_root
            } else {
                match remap[source.parent as usize] {
                    Some(parent) => Some(parent),
                    None => continue,
                }
            };

            let local = source_transform(source);
            let world = match parent {
                Some(parent) => local.compose(&bones[parent].world),
                None => local,
            };

            let new_index = bones.len();
            if is_root && primary_root.is_none() {
                primary_root = Some(new_index);
            } else if is_root {
                debug!(
                    "Reparenting extra root bone {} onto {}",
                    source.name, bones[0].name
                );
            }

            remap[index] = Some(new_index);
            bones.push(Bone {
                name: names.claim(&source.name, index),
                parent,
                local,
                world,
            });
        }

        if bones.len() == emitted_before {
            return Err(ImportError::new(ErrorKind::CyclicDependency).with_path(path));
        }
    }

    for (index, dummy) in zmd.dummy_bones.iter().enumerate() {
        let parent = usize::try_from(dummy.parent)
            .ok()
            .and_then(|parent| remap.get(parent).copied().flatten())
            .or(primary_root);
        let parent_world = parent.map_or(Transform::IDENTITY, |parent| bones[parent].world);

        let mut local = source_transform(dummy).relative_to(&parent_world);
        local.translation *= UNIT_SCALE;
        let world = local.compose(&parent_world);

        bones.push(Bone {
            name: names.claim(&dummy.name, bone_count + index),
            parent,
            local,
            world,
        });
    }

    debug!(
        "Built skeleton {} with {} bones and {} dummies",
        path,
        bone_count,
        zmd.dummy_bones.len()
    );

    Ok(SkeletonAsset {
        path: path.to_string(),
        bones,
        bone_count,
        remap,
    })
}
