use std::collections::HashMap;

use log::debug;
use rose_file_readers::{IfoObject, VirtualFilesystem, ZscFile, ZscReadOptions};
use serde::{Deserialize, Serialize};

use crate::{
    assets::{diagnose_read_error, AssetStore},
    coords::{flip_position, flip_rotation, to_vec3, Transform},
    error::{ErrorKind, ImportError},
    scene::{
        Animated, DiagnosticKind, Diagnostics, Instance, InstanceBucket, InstanceFlags,
    },
    ImportOptions,
};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CatalogKind {
    Deco,
    Cnst,
    Animated,
}

pub struct LoadedCatalog {
    pub kind: CatalogKind,
    pub path: String,
    pub zsc: ZscFile,
}

/// Reads a scene catalog, reporting unknown part properties. A missing
/// catalog is a diagnostic, a corrupt one is an error.
pub fn load_catalog(
    vfs: &VirtualFilesystem,
    kind: CatalogKind,
    path: &str,
    options: &ImportOptions,
    diagnostics: &mut Diagnostics,
) -> Result<Option<LoadedCatalog>, ImportError> {
    let zsc = match vfs.read_file_with::<ZscFile, _>(
        path,
        &ZscReadOptions {
            strict: options.strict,
        },
    ) {
        Ok(zsc) => zsc,
        Err(error) => {
            let import_error = ImportError::from_anyhow(error, path);
            if !import_error.is_not_found() {
                return Err(import_error);
            }
            if let Some(source) = &import_error.source {
                diagnose_read_error(diagnostics, path, source);
            }
            return Ok(None);
        }
    };

    for (object_index, object) in zsc.objects.iter().enumerate() {
        for part in &object.parts {
            for tag in part.unknown_tags() {
                diagnostics.push(
                    DiagnosticKind::UnknownProperty,
                    Some(path),
                    format!("Object {} has unknown property tag {}", object_index, tag),
                );
            }
        }
    }

    debug!(
        "Loaded {:?} catalog {} with {} meshes and {} objects",
        kind,
        path,
        zsc.meshes.len(),
        zsc.objects.len()
    );
    Ok(Some(LoadedCatalog {
        kind,
        path: path.to_string(),
        zsc,
    }))
}

pub fn object_transform(object: &IfoObject) -> Transform {
    Transform::new(
        flip_position(object.position),
        flip_rotation(object.rotation),
        to_vec3(object.scale),
    )
}

struct Bucket {
    mesh_id: usize,
    material_id: Option<usize>,
    instances: Vec<Instance>,
}

/// Turns map objects into mesh instances grouped by catalog, mesh and
/// material, and animated placements.
pub struct ObjectPlacer<'a> {
    vfs: &'a VirtualFilesystem,
    options: &'a ImportOptions,
    buckets: Vec<Bucket>,
    bucket_index: HashMap<(CatalogKind, u16, Option<u16>), usize>,
    animated: Vec<Animated>,
    dropped: usize,
}

impl<'a> ObjectPlacer<'a> {
    pub fn new(vfs: &'a VirtualFilesystem, options: &'a ImportOptions) -> Self {
        Self {
            vfs,
            options,
            buckets: Vec::new(),
            bucket_index: HashMap::new(),
            animated: Vec::new(),
            dropped: 0,
        }
    }

    fn out_of_range(
        &self,
        catalog: &LoadedCatalog,
        message: String,
        diagnostics: &mut Diagnostics,
    ) -> Result<(), ImportError> {
        if self.options.strict {
            Err(ImportError::new(ErrorKind::OutOfRange)
                .with_path(&catalog.path)
                .with_source(anyhow::anyhow!(message)))
        } else {
            diagnostics.push(
                DiagnosticKind::OutOfRangeReference,
                Some(catalog.path.as_str()),
                message,
            );
            Ok(())
        }
    }

    pub fn place_objects(
        &mut self,
        catalog: &LoadedCatalog,
        objects: &[IfoObject],
        assets: &mut AssetStore,
        diagnostics: &mut Diagnostics,
    ) -> Result<(), ImportError> {
        for object in objects {
            let zsc_object = match catalog.zsc.objects.get(object.object_id as usize) {
                Some(zsc_object) => zsc_object,
                None => {
                    self.out_of_range(
                        catalog,
                        format!(
                            "Map object {} references object {} of {}",
                            object.object_name,
                            object.object_id,
                            catalog.zsc.objects.len()
                        ),
                        diagnostics,
                    )?;
                    continue;
                }
            };

            if zsc_object.parts.is_empty() {
                diagnostics.push(
                    DiagnosticKind::EmptyObject,
                    Some(catalog.path.as_str()),
                    format!("Object {} has no parts", object.object_id),
                );
                continue;
            }

            let object_world = object_transform(object);
            for part in &zsc_object.parts {
                let mesh_path = match catalog.zsc.meshes.get(part.mesh_id as usize) {
                    Some(mesh_path) => mesh_path,
                    None => {
                        self.out_of_range(
                            catalog,
                            format!(
                                "Object {} references mesh {} of {}",
                                object.object_id,
                                part.mesh_id,
                                catalog.zsc.meshes.len()
                            ),
                            diagnostics,
                        )?;
                        continue;
                    }
                };

                let zsc_material = catalog.zsc.materials.get(part.material_id as usize);
                if zsc_material.is_none() {
                    self.out_of_range(
                        catalog,
                        format!(
                            "Object {} references material {} of {}",
                            object.object_id,
                            part.material_id,
                            catalog.zsc.materials.len()
                        ),
                        diagnostics,
                    )?;
                }

                let part_local = Transform::new(
                    flip_position(part.position),
                    flip_rotation(part.rotation),
                    to_vec3(part.scale),
                );
                let transform = part_local.compose(&object_world);
                if !transform.is_valid() {
                    self.dropped += 1;
                    continue;
                }

                let mesh_id = match assets.load_mesh(self.vfs, mesh_path, diagnostics)? {
                    Some(mesh_id) => mesh_id,
                    None => continue,
                };
                let material_id = zsc_material
                    .map(|material| {
                        assets.load_material(
                            self.vfs,
                            material,
                            self.options.load_textures,
                            diagnostics,
                        )
                    })
                    .transpose()?;

                let flags = InstanceFlags {
                    cast_shadow_two_sided: true,
                    no_shadow: material_id
                        .map_or(false, |material| !assets.materials[material].casts_shadow()),
                    no_collision: mesh_path.to_ascii_lowercase().contains("grass"),
                };

                if let Some(animation_path) = &part.animation_path {
                    let anim_id = if self.options.load_animations {
                        match assets.load_object_animation(self.vfs, animation_path, diagnostics)?
                        {
                            Some(anim_id) => Some(anim_id),
                            None => {
                                debug!("Placing {} without its animation", mesh_path);
                                self.push_instance(
                                    catalog.kind,
                                    part.mesh_id,
                                    zsc_material.map(|_| part.material_id),
                                    Instance {
                                        mesh_id,
                                        material_id,
                                        transform,
                                        flags,
                                    },
                                );
                                continue;
                            }
                        }
                    } else {
                        None
                    };

                    self.animated.push(Animated {
                        mesh_id,
                        material_id,
                        transform,
                        animation_path: animation_path.clone(),
                        anim_id,
                        flags,
                    });
                    continue;
                }

                self.push_instance(
                    catalog.kind,
                    part.mesh_id,
                    zsc_material.map(|_| part.material_id),
                    Instance {
                        mesh_id,
                        material_id,
                        transform,
                        flags,
                    },
                );
            }
        }

        Ok(())
    }

    fn push_instance(
        &mut self,
        kind: CatalogKind,
        catalog_mesh: u16,
        catalog_material: Option<u16>,
        instance: Instance,
    ) {
        let buckets = &mut self.buckets;
        let index = *self
            .bucket_index
            .entry((kind, catalog_mesh, catalog_material))
            .or_insert_with(|| {
                buckets.push(Bucket {
                    mesh_id: instance.mesh_id,
                    material_id: instance.material_id,
                    instances: Vec::new(),
                });
                buckets.len() - 1
            });
        self.buckets[index].instances.push(instance);
    }

    /// Flattens the buckets, in creation order, into one instance list.
    pub fn finish(self) -> (Vec<Instance>, Vec<InstanceBucket>, Vec<Animated>) {
        if self.dropped > 0 {
            debug!("Dropped {} placements with invalid transforms", self.dropped);
        }

        let mut instances = Vec::new();
        let mut buckets = Vec::with_capacity(self.buckets.len());
        for bucket in self.buckets {
            buckets.push(InstanceBucket {
                mesh_id: bucket.mesh_id,
                material_id: bucket.material_id,
                first_instance: instances.len(),
                instance_count: bucket.instances.len(),
            });
            instances.extend(bucket.instances);
        }
        (instances, buckets, self.animated)
    }
}
