use std::path::Path;

use log::info;
use rose_file_readers::{
    HostFilesystemDevice, VfsPathBuf, VirtualFilesystem, ZmdFile, ZmoFile, ZmsFile,
};
use serde::{Deserialize, Serialize};

use crate::{
    animation::rebase_animation,
    assets::diagnose_read_error,
    error::ImportError,
    resolver::find_asset,
    scene::{AnimationAsset, Diagnostic, Diagnostics, MeshAsset, SkeletonAsset},
    skeleton::build_skeleton,
    skinned_mesh::assemble_skinned_mesh,
    ImportOptions,
};

/// A skeleton with its merged mesh and motions.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CharacterAsset {
    pub skeleton: SkeletonAsset,
    pub mesh: MeshAsset,
    pub animations: Vec<AnimationAsset>,
    pub diagnostics: Vec<Diagnostic>,
}

fn read_part<T: rose_file_readers::RoseFile>(
    vfs: &VirtualFilesystem,
    path: &str,
    options: &ImportOptions,
    diagnostics: &mut Diagnostics,
) -> Result<Option<T>, ImportError> {
    let resolved = find_asset(vfs, path, None).unwrap_or_else(|| VfsPathBuf::new(path));
    match vfs.read_file::<T, _>(&resolved) {
        Ok(file) => Ok(Some(file)),
        Err(error) => {
            let import_error = ImportError::from_anyhow(error, path);
            if options.strict || !import_error.is_not_found() {
                return Err(import_error);
            }
            if let Some(source) = &import_error.source {
                diagnose_read_error(diagnostics, path, source);
            }
            Ok(None)
        }
    }
}

/// Imports a skeleton, merges `part_paths` onto it and rebases each motion.
/// Paths are relative to `data_root`.
pub fn import_character(
    data_root: &Path,
    skeleton_path: &str,
    part_paths: &[&str],
    motion_paths: &[&str],
    options: &ImportOptions,
) -> Result<CharacterAsset, ImportError> {
    let vfs = VirtualFilesystem::new(vec![Box::new(HostFilesystemDevice::new(
        data_root.to_path_buf(),
    ))]);
    let mut diagnostics = Diagnostics::default();

    let zmd = vfs
        .read_file::<ZmdFile, _>(skeleton_path)
        .map_err(|error| ImportError::from_anyhow(error, skeleton_path))?;
    let skeleton = build_skeleton(skeleton_path, &zmd)?;

    let mut parts = Vec::with_capacity(part_paths.len());
    for &part_path in part_paths {
        if let Some(zms) = read_part::<ZmsFile>(&vfs, part_path, options, &mut diagnostics)? {
            parts.push((part_path.to_string(), zms));
        }
    }
    let mesh = assemble_skinned_mesh(skeleton_path, &skeleton, &parts);

    let mut animations = Vec::new();
    if options.load_animations {
        for &motion_path in motion_paths {
            if let Some(zmo) = read_part::<ZmoFile>(&vfs, motion_path, options, &mut diagnostics)? {
                animations.push(rebase_animation(motion_path, &zmo, &skeleton));
            }
        }
    }

    info!(
        "Imported character {} with {} bones, {} parts and {} motions",
        skeleton_path,
        skeleton.bones.len(),
        parts.len(),
        animations.len()
    );

    Ok(CharacterAsset {
        skeleton,
        mesh,
        animations,
        diagnostics: diagnostics.into_vec(),
    })
}
