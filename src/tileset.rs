use log::debug;
use rose_file_readers::{stb_column, StbFile, VirtualFilesystem};
use serde::{Deserialize, Serialize};

use crate::scene::{DiagnosticKind, Diagnostics};

pub const ZONE_TYPE_INFO_PATH: &str = "3DDATA/TERRAIN/TILES/ZONETYPEINFO.STB";
const PALETTE_ROOT: &str = "3DDATA/ESTB";
const MAX_BRUSHES: i32 = 255;

pub struct StbZoneTypeInfo(pub StbFile);

impl StbZoneTypeInfo {
    stb_column! { 6, get_palette_file, &str }
}

pub struct StbTilePalette(pub StbFile);

impl StbTilePalette {
    stb_column! { 2, get_count, i32 }
    stb_column! { (2..=10), get_brush, [i32; 9] }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Brush {
    pub min: i32,
    pub max: i32,
    pub base0: i32,
    pub count0: i32,
    pub base_f: i32,
    pub count_f: i32,
    pub base: i32,
    pub count: i32,
    pub direction: i32,
}

impl Brush {
    fn ranges(&self) -> [(i32, i32); 3] {
        [
            (self.base, self.count),
            (self.base0, self.count0),
            (self.base_f, self.count_f),
        ]
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TileLookup {
    pub brush: usize,
    pub offset: i32,
    /// Column and row of the tile inside its brush's 4x4 atlas.
    pub atlas_cell: (u8, u8),
}

/// A brush palette: groups of tile ids that paint the same ground type.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileSet {
    pub brushes: Vec<Brush>,
    pub chains: Vec<Vec<i32>>,
}

impl TileSet {
    pub fn from_stb(stb: &StbTilePalette) -> Option<Self> {
        if stb.0.rows() < 2 {
            return None;
        }

        let brush_count = stb.get_count(0).unwrap_or(0);
        if brush_count <= 0 {
            return None;
        }
        let brush_count = brush_count.min(MAX_BRUSHES) as usize;

        let mut brushes = Vec::with_capacity(brush_count);
        for row in 1..=brush_count {
            let [min, max, base0, count0, base_f, count_f, base, count, direction] =
                stb.get_brush(row);
            brushes.push(Brush {
                min,
                max,
                base0,
                count0,
                base_f,
                count_f,
                base,
                count,
                direction,
            });
        }

        let chain_row = brush_count + 1;
        // The chain table is square, so both axes are bounded by the palette
        let chain_size = (stb.get_count(chain_row).unwrap_or(0).max(0) as usize)
            .min(stb.0.rows().saturating_sub(chain_row + 1))
            .min(stb.0.columns().saturating_sub(2));
        let chains = ((chain_row + 1)..(chain_row + 1 + chain_size))
            .map(|row| {
                (0..chain_size)
                    .map(|column| stb.0.get_int(row, column + 2))
                    .collect()
            })
            .collect();

        Some(Self { brushes, chains })
    }

    /// Finds the first brush containing `tile_id`.
    pub fn lookup(&self, tile_id: i32) -> Option<TileLookup> {
        for (index, brush) in self.brushes.iter().enumerate() {
            for (base, count) in brush.ranges() {
                let end = match base.checked_add(count) {
                    Some(end) if count > 0 => end,
                    _ => continue,
                };
                if tile_id >= base && tile_id < end {
                    let offset = tile_id - base;
                    return Some(TileLookup {
                        brush: index,
                        offset,
                        atlas_cell: ((offset % 4) as u8, (offset / 4) as u8),
                    });
                }
            }
        }
        None
    }
}

/// Loads the brush palette for `zone_type`. Every missing piece is a
/// diagnostic rather than an error.
pub fn load_tile_set(
    vfs: &VirtualFilesystem,
    zone_type: i32,
    diagnostics: &mut Diagnostics,
) -> Option<TileSet> {
    let zone_types = match vfs.read_file::<StbFile, _>(ZONE_TYPE_INFO_PATH) {
        Ok(stb) => StbZoneTypeInfo(stb),
        Err(error) => {
            diagnostics.push(
                DiagnosticKind::MissingFile,
                Some(ZONE_TYPE_INFO_PATH),
                format!("{:#}", error),
            );
            return None;
        }
    };

    let palette_file = match usize::try_from(zone_type)
        .ok()
        .and_then(|row| zone_types.get_palette_file(row))
    {
        Some(file) => file.trim(),
        None => {
            diagnostics.push(
                DiagnosticKind::MissingIndexEntry,
                Some(ZONE_TYPE_INFO_PATH),
                format!("No tile palette for zone type {}", zone_type),
            );
            return None;
        }
    };

    let palette_path = format!("{}/{}", PALETTE_ROOT, palette_file);
    let palette = match vfs.read_file::<StbFile, _>(&palette_path) {
        Ok(stb) => StbTilePalette(stb),
        Err(error) => {
            diagnostics.push(
                DiagnosticKind::MissingFile,
                Some(palette_path.as_str()),
                format!("{:#}", error),
            );
            return None;
        }
    };

    let tile_set = TileSet::from_stb(&palette);
    match &tile_set {
        Some(tile_set) => debug!(
            "Loaded tile palette {} with {} brushes",
            palette_path,
            tile_set.brushes.len()
        ),
        None => diagnostics.push(
            DiagnosticKind::DecodeFailed,
            Some(palette_path.as_str()),
            "Tile palette has no brushes",
        ),
    }
    tile_set
}
