use std::path::{Path, PathBuf};

use log::{debug, info};
use rose_file_readers::{
    HimFile, HostFilesystemDevice, IfoFile, RoseFile, StbFile, TilFile, VfsPathBuf,
    VirtualFilesystem, ZonFile,
};

use crate::{
    assets::{diagnose_read_error, read_optional, AssetStore},
    error::{ErrorKind, ImportError},
    placer::{load_catalog, CatalogKind, LoadedCatalog, ObjectPlacer},
    progress::{CancelFlag, ImportPhase, ImportProgress, NoProgress},
    resolver::{
        discover_tiles, find_data_root, find_texture, zone_name_candidates, StbZoneList,
        ZoneCatalogs, LIST_ZONE_PATH,
    },
    scene::{DiagnosticKind, Diagnostics, Scene},
    terrain::{assemble_terrain, tile_bounds, LoadedTile},
    tileset::load_tile_set,
    ImportOptions,
};

struct ZoneTile {
    tile: LoadedTile,
    ifo: Option<IfoFile>,
}

#[derive(Default)]
struct ZoneCatalogSet {
    deco: Option<LoadedCatalog>,
    cnst: Option<LoadedCatalog>,
    animated: Option<LoadedCatalog>,
}

fn read_required<T: RoseFile>(vfs: &VirtualFilesystem, path: &Path) -> Result<T, ImportError> {
    vfs.read_file::<T, _>(path)
        .map_err(|error| ImportError::from_anyhow(error, path))
}

fn report_unknown_blocks(diagnostics: &mut Diagnostics, path: &Path, blocks: &[u32]) {
    for block in blocks {
        diagnostics.push(
            DiagnosticKind::UnknownBlock,
            Some(path.to_string_lossy().as_ref()),
            format!("Skipped unknown block type {}", block),
        );
    }
}

/// Imports one zone: terrain, object placements and every asset they use.
pub struct ZoneImporter {
    options: ImportOptions,
    cancel: Option<CancelFlag>,
}

impl ZoneImporter {
    pub fn new(options: ImportOptions) -> Self {
        Self {
            options,
            cancel: None,
        }
    }

    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = Some(cancel);
        self
    }

    fn checkpoint(
        &self,
        progress: &mut impl ImportProgress,
        phase: ImportPhase,
        fraction: f32,
    ) -> Result<(), ImportError> {
        if let Some(cancel) = &self.cancel {
            cancel.check()?;
        }
        progress.report(phase, fraction.clamp(0.0, 1.0))?;
        Ok(())
    }

    fn resolve_catalogs(
        &self,
        vfs: &VirtualFilesystem,
        zone_path: &Path,
        diagnostics: &mut Diagnostics,
    ) -> Result<ZoneCatalogSet, ImportError> {
        let zone_list = match vfs.read_file::<StbFile, _>(LIST_ZONE_PATH) {
            Ok(stb) => StbZoneList(stb),
            Err(error) => {
                diagnose_read_error(diagnostics, LIST_ZONE_PATH, &error);
                return Ok(ZoneCatalogSet::default());
            }
        };

        let names = zone_name_candidates(zone_path);
        let catalogs = match names.iter().find_map(|name| zone_list.find_zone(name)) {
            Some(row) => zone_list.get_catalogs(row),
            None => {
                diagnostics.push(
                    DiagnosticKind::MissingIndexEntry,
                    Some(LIST_ZONE_PATH),
                    format!("No zone named {}", names.join(" or ")),
                );
                return Ok(ZoneCatalogSet::default());
            }
        };
        debug!("Zone {:?} is row {} of the zone list", names, catalogs.row);

        let ZoneCatalogs {
            deco,
            cnst,
            animation,
            ..
        } = catalogs;
        let mut load = |kind, path: Option<VfsPathBuf>| match path {
            Some(path) => load_catalog(
                vfs,
                kind,
                &path.path().to_string_lossy(),
                &self.options,
                diagnostics,
            ),
            None => Ok(None),
        };

        Ok(ZoneCatalogSet {
            deco: load(CatalogKind::Deco, deco)?,
            cnst: load(CatalogKind::Cnst, cnst)?,
            animated: load(CatalogKind::Animated, animation)?,
        })
    }

    fn load_tiles(
        &self,
        vfs: &VirtualFilesystem,
        zone_directory: &Path,
        coordinates: &[(i32, i32)],
        progress: &mut impl ImportProgress,
        diagnostics: &mut Diagnostics,
    ) -> Result<Vec<ZoneTile>, ImportError> {
        let mut tiles = Vec::with_capacity(coordinates.len());
        for (index, &(x, y)) in coordinates.iter().enumerate() {
            self.checkpoint(
                progress,
                ImportPhase::Loading,
                index as f32 / coordinates.len() as f32,
            )?;

            let name = format!("{}_{}", x, y);
            let heightmap: HimFile =
                read_required(vfs, &zone_directory.join(format!("{}.HIM", name)))?;
            let tilemap: Option<TilFile> =
                read_optional(vfs, &zone_directory.join(format!("{}.TIL", name)), diagnostics)?;

            let ifo_path = zone_directory.join(format!("{}.IFO", name));
            let ifo: Option<IfoFile> = read_optional(vfs, &ifo_path, diagnostics)?;
            if let Some(ifo) = &ifo {
                report_unknown_blocks(diagnostics, &ifo_path, &ifo.unknown_blocks);
            }

            tiles.push(ZoneTile {
                tile: LoadedTile {
                    x,
                    y,
                    heightmap,
                    tilemap,
                },
                ifo,
            });
        }
        Ok(tiles)
    }

    pub fn import(
        &self,
        zone_path: &Path,
        progress: &mut impl ImportProgress,
    ) -> Result<Scene, ImportError> {
        self.checkpoint(progress, ImportPhase::Loading, 0.0)?;
        let mut diagnostics = Diagnostics::default();

        let data_root = find_data_root(zone_path);
        let zone_relative = zone_path
            .strip_prefix(&data_root)
            .map(Path::to_path_buf)
            .or_else(|_| zone_path.file_name().map(PathBuf::from).ok_or(()))
            .map_err(|_| ImportError::new(ErrorKind::PathNotFound).with_path(zone_path))?;
        let zone_directory = zone_relative.parent().unwrap_or(Path::new("")).to_path_buf();
        info!(
            "Importing zone {} from data root {}",
            zone_relative.to_string_lossy(),
            data_root.to_string_lossy()
        );

        let vfs = VirtualFilesystem::new(vec![Box::new(HostFilesystemDevice::new(
            data_root.clone(),
        ))]);

        let zon: ZonFile = read_required(&vfs, &zone_relative)?;
        report_unknown_blocks(&mut diagnostics, &zone_relative, &zon.unknown_blocks);

        let host_directory = match zone_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let coordinates = discover_tiles(host_directory).map_err(|error| {
            ImportError::new(ErrorKind::PathNotFound)
                .with_path(host_directory)
                .with_source(error)
        })?;
        tile_bounds(coordinates.iter().copied())
            .map_err(|error| error.with_path(zone_path))?;

        let tiles = self.load_tiles(
            &vfs,
            &zone_directory,
            &coordinates,
            progress,
            &mut diagnostics,
        )?;
        let catalogs = self.resolve_catalogs(&vfs, zone_path, &mut diagnostics)?;

        self.checkpoint(progress, ImportPhase::Terrain, 0.0)?;
        let mut assets = AssetStore::default();
        let tile_set = load_tile_set(&vfs, zon.zone_type, &mut diagnostics);
        let (loaded_tiles, ifos): (Vec<LoadedTile>, Vec<Option<IfoFile>>) = tiles
            .into_iter()
            .map(|zone_tile| (zone_tile.tile, zone_tile.ifo))
            .unzip();
        let mut terrain = assemble_terrain(&zon, &loaded_tiles, tile_set, self.options.max_layers)
            .map_err(|error| error.with_path(zone_path))?;
        for layer in terrain.layers.iter_mut() {
            let requested = match layer.texture_path.take() {
                Some(requested) => requested,
                None => continue,
            };
            match find_texture(&vfs, &requested) {
                Some(found) => {
                    if self.options.load_textures {
                        layer.texture = assets.load_texture(&vfs, &found, &mut diagnostics)?;
                    }
                    layer.texture_path = Some(found.path().to_string_lossy().into_owned());
                }
                None => diagnostics.push(
                    DiagnosticKind::MissingFile,
                    Some(requested.as_str()),
                    format!("Texture for terrain layer {} not found", layer.texture_id),
                ),
            }
        }
        self.checkpoint(progress, ImportPhase::Terrain, 1.0)?;

        let mut placer = ObjectPlacer::new(&vfs, &self.options);
        let mut missing_animation_catalog = false;
        for (index, ifo) in ifos.iter().enumerate() {
            self.checkpoint(
                progress,
                ImportPhase::Placing,
                index as f32 / ifos.len() as f32,
            )?;
            let ifo = match ifo {
                Some(ifo) => ifo,
                None => continue,
            };

            if let Some(catalog) = &catalogs.deco {
                placer.place_objects(catalog, &ifo.deco_objects, &mut assets, &mut diagnostics)?;
            }
            if let Some(catalog) = &catalogs.cnst {
                placer.place_objects(catalog, &ifo.cnst_objects, &mut assets, &mut diagnostics)?;
            }
            match &catalogs.animated {
                Some(catalog) => placer.place_objects(
                    catalog,
                    &ifo.animated_objects,
                    &mut assets,
                    &mut diagnostics,
                )?,
                None => missing_animation_catalog |= !ifo.animated_objects.is_empty(),
            }
        }
        if missing_animation_catalog {
            diagnostics.push(
                DiagnosticKind::MissingIndexEntry,
                Some(LIST_ZONE_PATH),
                "Zone has animated objects but no animation catalog",
            );
        }

        self.checkpoint(progress, ImportPhase::Finalizing, 0.0)?;
        let (instances, buckets, animated) = placer.finish();
        info!(
            "Imported zone with {} instances in {} buckets, {} animated, {} meshes, {} diagnostics",
            instances.len(),
            buckets.len(),
            animated.len(),
            assets.meshes.len(),
            diagnostics.len()
        );

        let scene = Scene {
            terrain,
            instances,
            buckets,
            animated,
            meshes: assets.meshes,
            materials: assets.materials,
            skeletons: Vec::new(),
            animations: assets.animations,
            textures: assets.textures,
            diagnostics: diagnostics.into_vec(),
        };
        self.checkpoint(progress, ImportPhase::Finalizing, 1.0)?;
        Ok(scene)
    }
}

/// Imports a zone without progress reporting.
pub fn import_zone(zone_path: &Path, options: &ImportOptions) -> Result<Scene, ImportError> {
    ZoneImporter::new(options.clone()).import(zone_path, &mut NoProgress)
}

