use std::{
    ffi::OsStr,
    path::{Path, PathBuf},
};

use rose_file_readers::{stb_column, StbFile, VfsPathBuf, VirtualFilesystem};

pub const LIST_ZONE_PATH: &str = "3DDATA/STB/LIST_ZONE.STB";

const DEFAULT_ZON_COLUMN: usize = 3;
const DECO_COLUMN: usize = 12;
const CNST_COLUMN: usize = 13;
const ANIMATION_CATALOG_MARKERS: [&str; 2] = ["EVENT_OBJECT", "DECO_SPECIAL"];

const ASSET_SEARCH_PREFIXES: [&str; 9] = [
    "",
    "3DDATA/TERRAIN/TEXTURES/",
    "3DDATA/AVATAR/",
    "3DDATA/AVATAR/TEXTURES/",
    "3DDATA/JUNON/TEXTURES/",
    "3DDATA/LUNAR/TEXTURES/",
    "3DDATA/ELDEON/TEXTURES/",
    "3DDATA/ORO/TEXTURES/",
    "3DDATA/MAPS/PCT/",
];

/// The data root is the parent of the nearest `3DData` ancestor, or the
/// zone's own directory when there is none.
pub fn find_data_root(zone_path: &Path) -> PathBuf {
    let mut path = zone_path;
    while let Some(parent_path) = path.parent() {
        if parent_path
            .file_name()
            .is_some_and(|name| OsStr::new("3ddata").eq_ignore_ascii_case(name))
        {
            if let Some(root) = parent_path.parent() {
                return root.to_path_buf();
            }
        }

        path = parent_path;
    }

    zone_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default()
}

/// Joins a path from the master index below `3DDATA/`, dropping any
/// `3DData/` prefix the index already carries.
pub fn catalog_path(cell: &str) -> VfsPathBuf {
    let cleaned = cell.trim().replace('\\', "/");
    let cleaned = cleaned.trim_start_matches('/');
    let relative = match cleaned.get(..7) {
        Some(prefix) if prefix.eq_ignore_ascii_case("3ddata/") => &cleaned[7..],
        _ => cleaned,
    };
    VfsPathBuf::new(&format!("3DDATA/{}", relative))
}

/// Names to look a zone up by: its directory name, then its file stem.
pub fn zone_name_candidates(zone_path: &Path) -> Vec<String> {
    let mut names = Vec::new();
    if let Some(directory) = zone_path
        .parent()
        .and_then(Path::file_name)
        .map(|name| name.to_string_lossy().into_owned())
    {
        names.push(directory);
    }
    if let Some(stem) = zone_path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
    {
        if !names.iter().any(|name| name.eq_ignore_ascii_case(&stem)) {
            names.push(stem);
        }
    }
    names
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ZoneCatalogs {
    pub row: usize,
    pub deco: Option<VfsPathBuf>,
    pub cnst: Option<VfsPathBuf>,
    pub animation: Option<VfsPathBuf>,
}

pub struct StbZoneList(pub StbFile);

impl StbZoneList {
    stb_column! { 12, get_zone_deco_table, &str }
    stb_column! { 13, get_zone_cnst_table, &str }

    /// Column holding the `.ZON` path, found by header name.
    pub fn zon_column(&self) -> usize {
        if let Some(column) = self.0.find_column("ZON") {
            return column;
        }

        (0..self.0.columns())
            .find(|&column| self.0.get(0, column).trim().eq_ignore_ascii_case("ZON"))
            .unwrap_or(DEFAULT_ZON_COLUMN)
    }

    pub fn find_zone(&self, name: &str) -> Option<usize> {
        let zon_column = self.zon_column();
        (0..self.0.rows()).find(|&row| {
            let zon_stem = Path::new(&self.0.get(row, zon_column).replace('\\', "/"))
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_default();

            self.0.get(row, 1).trim().eq_ignore_ascii_case(name)
                || self.0.get(row, 2).trim().eq_ignore_ascii_case(name)
                || zon_stem.eq_ignore_ascii_case(name)
        })
    }

    fn get_zone_animation_table(&self, row: usize) -> Option<&str> {
        let candidates = || {
            (0..self.0.columns())
                .filter(|&column| column != DECO_COLUMN && column != CNST_COLUMN)
                .filter_map(move |column| {
                    self.0
                        .try_get(row, column)
                        .map(|value| (column, value.trim()))
                })
        };

        let marked = candidates().find(|(column, value)| {
            let column_name = self.0.column_name(*column).unwrap_or("").trim();
            let upper = value.to_ascii_uppercase();
            ANIMATION_CATALOG_MARKERS.iter().any(|marker| {
                column_name.eq_ignore_ascii_case(marker) || upper.contains(marker)
            })
        });

        marked
            .or_else(|| {
                candidates().find(|(_, value)| value.to_ascii_uppercase().ends_with(".ZSC"))
            })
            .map(|(_, value)| value)
    }

    pub fn get_catalogs(&self, row: usize) -> ZoneCatalogs {
        let non_empty = |value: Option<&str>| {
            value
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(catalog_path)
        };

        ZoneCatalogs {
            row,
            deco: non_empty(self.get_zone_deco_table(row)),
            cnst: non_empty(self.get_zone_cnst_table(row)),
            animation: non_empty(self.get_zone_animation_table(row)),
        }
    }
}

/// Finds a data-root relative asset by trying each search prefix with the
/// full path, the bare file name and, when given, the file name with
/// `fallback_extension`.
pub fn find_asset(
    vfs: &VirtualFilesystem,
    path: &str,
    fallback_extension: Option<&str>,
) -> Option<VfsPathBuf> {
    let relative = path.trim().replace('\\', "/");
    let relative = relative.trim_start_matches('/');
    if relative.is_empty() {
        return None;
    }

    let file_name = Path::new(relative)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| relative.to_string());
    let mut candidates = vec![relative.to_string(), file_name];
    if let Some(extension) = fallback_extension {
        let renamed = Path::new(&candidates[1])
            .with_extension(extension)
            .to_string_lossy()
            .into_owned();
        candidates.push(renamed);
    }

    ASSET_SEARCH_PREFIXES.iter().find_map(|prefix| {
        candidates
            .iter()
            .map(|candidate| VfsPathBuf::new(&format!("{}{}", prefix, candidate)))
            .find(|candidate| vfs.exists(candidate))
    })
}

pub fn find_texture(vfs: &VirtualFilesystem, path: &str) -> Option<VfsPathBuf> {
    find_asset(vfs, path, Some("dds"))
}

/// Lists the `(x, y)` coordinates of every `X_Y.HIM` in a zone directory.
pub fn discover_tiles(zone_directory: &Path) -> std::io::Result<Vec<(i32, i32)>> {
    let mut tiles = Vec::new();
    for entry in std::fs::read_dir(zone_directory)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if let Some(tile) = parse_tile_name(&name) {
            tiles.push(tile);
        }
    }
    tiles.sort_by_key(|&(x, y)| (y, x));
    tiles.dedup();
    Ok(tiles)
}

fn parse_tile_name(name: &str) -> Option<(i32, i32)> {
    let path = Path::new(name);
    if !path
        .extension()
        .is_some_and(|extension| extension.eq_ignore_ascii_case("HIM"))
    {
        return None;
    }

    let stem = path.file_stem()?.to_str()?;
    let (x, y) = stem.split_once('_')?;
    if x.is_empty()
        || y.is_empty()
        || !x.bytes().all(|b| b.is_ascii_digit())
        || !y.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }
    Some((x.parse().ok()?, y.parse().ok()?))
}
