use std::collections::HashMap;

use glam::{Vec2, Vec3};
use log::{debug, info};
use rose_file_readers::{HimFile, TilFile, ZonFile, ZonTile};

use crate::{
    error::{ErrorKind, ImportError},
    scene::{Terrain, TerrainLayer, TerrainPatch},
    tileset::TileSet,
};

/// Grid cells per tile edge. A tile's heightmap has one more vertex per edge.
pub const TILE_GRID_SIZE: usize = 64;
pub const PATCHES_PER_TILE: usize = 16;
pub const PATCH_GRID_SIZE: usize = TILE_GRID_SIZE / PATCHES_PER_TILE;

/// World size of one tile in centimeters.
pub const TILE_WORLD_SIZE: f32 = 16000.0;
/// Tile 32 sits at the world origin.
pub const WORLD_CENTER_TILE: i32 = 32;
pub const AXIS_SCALE: Vec3 = Vec3::new(250.0, 250.0, 100.0);

/// Widest merged area, in tiles along either axis.
pub const MAX_TILE_SPAN: i64 = 32;

const HEIGHT_RANGE: f32 = 25600.0;

pub struct LoadedTile {
    pub x: i32,
    pub y: i32,
    pub heightmap: HimFile,
    pub tilemap: Option<TilFile>,
}

/// Clamps to `±25600` and maps linearly onto the full `u16` range.
pub fn quantize_height(height: f32) -> u16 {
    let height = if height.is_nan() {
        0.0
    } else {
        height.clamp(-HEIGHT_RANGE, HEIGHT_RANGE)
    };
    (((height + HEIGHT_RANGE) / (2.0 * HEIGHT_RANGE)) * 65535.0) as u16
}

pub fn terrain_anchor(tile_min: (i32, i32)) -> Vec2 {
    let half_tile = TILE_WORLD_SIZE / 2.0;
    Vec2::new(
        (tile_min.0 - WORLD_CENTER_TILE) as f32 * TILE_WORLD_SIZE - half_tile,
        (tile_min.1 - WORLD_CENTER_TILE) as f32 * TILE_WORLD_SIZE - half_tile,
    )
}

/// Visits every patch of every tile with the merged-grid vertex at its
/// top-left corner and the zone tile it references.
fn for_each_patch<'a>(
    zon: &'a ZonFile,
    tiles: &'a [LoadedTile],
    tile_min: (i32, i32),
    mut visit: impl FnMut(usize, usize, i32, Option<&'a ZonTile>),
) {
    for tile in tiles {
        let tilemap = match &tile.tilemap {
            Some(tilemap) => tilemap,
            None => continue,
        };
        let offset_x = (tile.x - tile_min.0) as usize * TILE_GRID_SIZE;
        let offset_y = (tile.y - tile_min.1) as usize * TILE_GRID_SIZE;

        for py in 0..PATCHES_PER_TILE {
            for px in 0..PATCHES_PER_TILE {
                let patch = match tilemap.get(px, py) {
                    Some(patch) => patch,
                    None => continue,
                };
                let zone_tile = usize::try_from(patch.tile)
                    .ok()
                    .and_then(|index| zon.tiles.get(index));
                visit(
                    offset_x + px * PATCH_GRID_SIZE,
                    offset_y + py * PATCH_GRID_SIZE,
                    patch.tile,
                    zone_tile,
                );
            }
        }
    }
}

fn select_layers(
    zon: &ZonFile,
    tiles: &[LoadedTile],
    tile_min: (i32, i32),
    max_layers: usize,
) -> Vec<i32> {
    let mut frequency: HashMap<i32, usize> = HashMap::new();
    for_each_patch(zon, tiles, tile_min, |_, _, _, zone_tile| {
        if let Some(zone_tile) = zone_tile {
            for texture_id in [zone_tile.texture_id1(), zone_tile.texture_id2()] {
                if texture_id >= 0 {
                    *frequency.entry(texture_id).or_default() += 1;
                }
            }
        }
    });

    let mut sorted: Vec<(i32, usize)> = frequency.into_iter().collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    sorted.truncate(max_layers);

    debug!("Selected {} terrain layers", sorted.len());
    sorted.into_iter().map(|(texture_id, _)| texture_id).collect()
}

fn paint_patch(weights: &mut [u8], width: usize, x0: usize, y0: usize) {
    for y in y0..y0 + PATCH_GRID_SIZE {
        for x in x0..x0 + PATCH_GRID_SIZE {
            if let Some(weight) = weights.get_mut(y * width + x) {
                *weight = 255;
            }
        }
    }
}

/// Smallest and largest tile coordinates. Fails with `OutOfRange` when
/// there are no tiles or they span more than `MAX_TILE_SPAN` on an axis.
pub fn tile_bounds(
    coordinates: impl IntoIterator<Item = (i32, i32)>,
) -> Result<((i32, i32), (i32, i32)), ImportError> {
    let mut coordinates = coordinates.into_iter();
    let first = coordinates.next().ok_or_else(|| {
        ImportError::new(ErrorKind::OutOfRange)
            .with_source(anyhow::anyhow!("Zone has no heightmap tiles"))
    })?;
    let (min, max) = coordinates.fold((first, first), |(min, max), (x, y)| {
        ((min.0.min(x), min.1.min(y)), (max.0.max(x), max.1.max(y)))
    });

    let span_x = i64::from(max.0) - i64::from(min.0) + 1;
    let span_y = i64::from(max.1) - i64::from(min.1) + 1;
    if span_x > MAX_TILE_SPAN || span_y > MAX_TILE_SPAN {
        return Err(ImportError::new(ErrorKind::OutOfRange).with_source(anyhow::anyhow!(
            "Tiles {:?} to {:?} span {}x{}, at most {} per axis are merged",
            min,
            max,
            span_x,
            span_y,
            MAX_TILE_SPAN
        )));
    }
    Ok((min, max))
}

/// Merges tile heightmaps into one grid and paints one weight layer per
/// frequently used texture.
pub fn assemble_terrain(
    zon: &ZonFile,
    tiles: &[LoadedTile],
    tile_set: Option<TileSet>,
    max_layers: usize,
) -> Result<Terrain, ImportError> {
    let (tile_min, tile_max) = tile_bounds(tiles.iter().map(|tile| (tile.x, tile.y)))?;

    let width = (tile_max.0 - tile_min.0 + 1) as usize * TILE_GRID_SIZE + 1;
    let height = (tile_max.1 - tile_min.1 + 1) as usize * TILE_GRID_SIZE + 1;

    let mut heights = vec![quantize_height(0.0); width * height];
    for tile in tiles {
        let offset_x = (tile.x - tile_min.0) as usize * TILE_GRID_SIZE;
        let offset_y = (tile.y - tile_min.1) as usize * TILE_GRID_SIZE;
        for y in 0..=TILE_GRID_SIZE {
            let row = (offset_y + y) * width + offset_x;
            for x in 0..=TILE_GRID_SIZE {
                heights[row + x] = quantize_height(tile.heightmap.get_clamped(x, y));
            }
        }
    }

    let selected = select_layers(zon, tiles, tile_min, max_layers);
    let layer_index: HashMap<i32, usize> = selected
        .iter()
        .enumerate()
        .map(|(index, &texture_id)| (texture_id, index))
        .collect();
    let mut layers: Vec<TerrainLayer> = selected
        .iter()
        .map(|&texture_id| TerrainLayer {
            texture_id,
            texture_path: usize::try_from(texture_id)
                .ok()
                .and_then(|index| zon.tile_textures.get(index))
                .map(|path| path.trim().to_string())
                .filter(|path| !path.is_empty()),
            texture: None,
            weights: vec![0; width * height],
        })
        .collect();

    let patches_x = (width - 1) / PATCH_GRID_SIZE;
    let patches_y = (height - 1) / PATCH_GRID_SIZE;
    let mut patches = vec![TerrainPatch::default(); patches_x * patches_y];
    let mut unpainted = 0;

    for_each_patch(zon, tiles, tile_min, |x0, y0, tile_id, zone_tile| {
        let patch = &mut patches[(y0 / PATCH_GRID_SIZE) * patches_x + x0 / PATCH_GRID_SIZE];
        patch.tile_id = tile_id;
        if let Some(lookup) = tile_set.as_ref().and_then(|tile_set| tile_set.lookup(tile_id)) {
            patch.brush = Some(lookup.brush as u16);
            patch.atlas_cell = Some(lookup.atlas_cell);
        }

        let zone_tile = match zone_tile {
            Some(zone_tile) => zone_tile,
            None => {
                unpainted += 1;
                return;
            }
        };

        match layer_index.get(&zone_tile.texture_id1()) {
            Some(&layer) => paint_patch(&mut layers[layer].weights, width, x0, y0),
            None => {
                if let Some(base) = layers.first_mut() {
                    paint_patch(&mut base.weights, width, x0, y0);
                }
            }
        }

        if zone_tile.texture_id2() >= 0 {
            if let Some(&layer) = layer_index.get(&zone_tile.texture_id2()) {
                paint_patch(&mut layers[layer].weights, width, x0, y0);
            }
        }
    });

    if unpainted > 0 {
        debug!("{} patches reference tiles outside the zone catalog", unpainted);
    }

    info!(
        "Assembled terrain {}x{} from {} tiles with {} layers",
        width,
        height,
        tiles.len(),
        layers.len()
    );

    Ok(Terrain {
        width: width as u32,
        height: height as u32,
        tile_min,
        tile_max,
        anchor_xy: terrain_anchor(tile_min),
        axis_scale: AXIS_SCALE,
        heights,
        layers,
        tile_set,
        patches,
    })
}
