use std::{collections::HashMap, path::Path};

use log::debug;
use rose_file_readers::{
    DdsFile, RoseFile, VfsError, VfsPathBuf, VirtualFilesystem, ZmoFile, ZmsFile, ZscMaterial,
};

use crate::{
    animation::root_motion,
    coords::to_vec3,
    error::ImportError,
    resolver::{find_asset, find_texture},
    scene::{
        AnimationAsset, DiagnosticKind, Diagnostics, MaterialDesc, MeshAsset, TextureAsset,
    },
};

/// Records a failed read as a diagnostic: missing files and undecodable
/// files are told apart by the error chain.
pub fn diagnose_read_error(diagnostics: &mut Diagnostics, path: &str, error: &anyhow::Error) {
    let kind = if error
        .chain()
        .any(|cause| cause.downcast_ref::<VfsError>().is_some())
    {
        DiagnosticKind::MissingFile
    } else {
        DiagnosticKind::DecodeFailed
    };
    diagnostics.push(kind, Some(path), format!("{:#}", error));
}

/// Reads a file whose absence is only worth a diagnostic. Files that exist
/// but fail to decode are errors.
pub fn read_optional<T: RoseFile>(
    vfs: &VirtualFilesystem,
    path: &Path,
    diagnostics: &mut Diagnostics,
) -> Result<Option<T>, ImportError> {
    match vfs.read_file::<T, _>(path) {
        Ok(file) => Ok(Some(file)),
        Err(error) => {
            let import_error = ImportError::from_anyhow(error, path);
            if !import_error.is_not_found() {
                return Err(import_error);
            }
            if let Some(source) = &import_error.source {
                diagnose_read_error(diagnostics, &path.to_string_lossy(), source);
            }
            Ok(None)
        }
    }
}

fn cache_key(path: &str) -> String {
    VfsPathBuf::new(path).path().to_string_lossy().into_owned()
}

/// Searches the asset roots for `path`, keeping the reference as given
/// when nothing matches so the miss is reported under its own name.
fn resolve(vfs: &VirtualFilesystem, path: &str) -> VfsPathBuf {
    find_asset(vfs, path, None).unwrap_or_else(|| VfsPathBuf::new(path))
}

/// Decoded assets of one import, deduplicated by normalised path.
#[derive(Default)]
pub struct AssetStore {
    pub meshes: Vec<MeshAsset>,
    pub materials: Vec<MaterialDesc>,
    pub textures: Vec<TextureAsset>,
    pub animations: Vec<AnimationAsset>,
    mesh_cache: HashMap<String, Option<usize>>,
    material_cache: HashMap<String, usize>,
    texture_cache: HashMap<String, Option<usize>>,
    animation_cache: HashMap<String, Option<usize>>,
}

impl AssetStore {
    pub fn load_mesh(
        &mut self,
        vfs: &VirtualFilesystem,
        path: &str,
        diagnostics: &mut Diagnostics,
    ) -> Result<Option<usize>, ImportError> {
        let requested = cache_key(path);
        if let Some(cached) = self.mesh_cache.get(&requested) {
            return Ok(*cached);
        }

        let resolved = resolve(vfs, path);
        let key = resolved.path().to_string_lossy().into_owned();
        let index = match self.mesh_cache.get(&key).copied() {
            Some(cached) => cached,
            None => read_optional::<ZmsFile>(vfs, resolved.path(), diagnostics)?.map(|zms| {
                self.meshes.push(MeshAsset::from_zms(&key, &zms));
                self.meshes.len() - 1
            }),
        };
        self.mesh_cache.insert(key, index);
        self.mesh_cache.insert(requested, index);
        Ok(index)
    }

    /// Decodes the texture at a data-root relative path.
    pub fn load_texture(
        &mut self,
        vfs: &VirtualFilesystem,
        path: &VfsPathBuf,
        diagnostics: &mut Diagnostics,
    ) -> Result<Option<usize>, ImportError> {
        let key = path.path().to_string_lossy().into_owned();
        if let Some(cached) = self.texture_cache.get(&key) {
            return Ok(*cached);
        }

        let index = read_optional::<DdsFile>(vfs, path.path(), diagnostics)?.map(|dds| {
            debug!("Decoded texture {} ({}x{})", key, dds.width, dds.height);
            self.textures.push(TextureAsset {
                path: key.clone(),
                width: dds.width,
                height: dds.height,
                rgba: dds.to_rgba(),
            });
            self.textures.len() - 1
        });
        self.texture_cache.insert(key, index);
        Ok(index)
    }

    pub fn load_material(
        &mut self,
        vfs: &VirtualFilesystem,
        material: &ZscMaterial,
        load_textures: bool,
        diagnostics: &mut Diagnostics,
    ) -> Result<usize, ImportError> {
        let key = format!(
            "{}|{}|{}|{}|{}",
            cache_key(&material.path),
            material.alpha_enabled,
            material.two_sided,
            material.alpha_test_enabled,
            material.blend_type
        );
        if let Some(&cached) = self.material_cache.get(&key) {
            return Ok(cached);
        }

        let texture = if load_textures {
            match find_texture(vfs, &material.path) {
                Some(texture_path) => self.load_texture(vfs, &texture_path, diagnostics)?,
                None => {
                    diagnostics.push(
                        DiagnosticKind::MissingFile,
                        Some(material.path.as_str()),
                        "Material texture not found",
                    );
                    None
                }
            }
        } else {
            None
        };

        self.materials.push(MaterialDesc {
            path: material.path.clone(),
            texture,
            is_skin: material.is_skin,
            alpha_enabled: material.alpha_enabled,
            two_sided: material.two_sided,
            alpha_test_enabled: material.alpha_test_enabled,
            alpha_ref: material.alpha_ref,
            z_test_enabled: material.z_test_enabled,
            z_write_enabled: material.z_write_enabled,
            blend_type: material.blend_type,
            specular_enabled: material.specular_enabled,
            alpha: material.alpha,
            glow_type: material.glow_type,
            glow_color: to_vec3(material.glow_color),
        });
        let index = self.materials.len() - 1;
        self.material_cache.insert(key, index);
        Ok(index)
    }

    /// Loads an object animation. Files without frames or a frame rate are
    /// reported and yield `None`, as do missing files.
    pub fn load_object_animation(
        &mut self,
        vfs: &VirtualFilesystem,
        path: &str,
        diagnostics: &mut Diagnostics,
    ) -> Result<Option<usize>, ImportError> {
        let requested = cache_key(path);
        if let Some(cached) = self.animation_cache.get(&requested) {
            return Ok(*cached);
        }

        let resolved = resolve(vfs, path);
        let key = resolved.path().to_string_lossy().into_owned();
        let index = match self.animation_cache.get(&key).copied() {
            Some(cached) => cached,
            None => match read_optional::<ZmoFile>(vfs, resolved.path(), diagnostics)? {
                Some(zmo) if zmo.num_frames == 0 || zmo.fps == 0 => {
                    diagnostics.push(
                        DiagnosticKind::DecodeFailed,
                        Some(key.as_str()),
                        "Animation has no frames or frame rate",
                    );
                    None
                }
                Some(zmo) => {
                    self.animations.push(root_motion(&key, &zmo));
                    Some(self.animations.len() - 1)
                }
                None => None,
            },
        };
        self.animation_cache.insert(key, index);
        self.animation_cache.insert(requested, index);
        Ok(index)
    }
}
