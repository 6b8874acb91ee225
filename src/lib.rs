#![allow(clippy::too_many_arguments)]
#![allow(clippy::type_complexity)]

//! Decodes ROSE Online zones and characters into engine-neutral scenes.

use serde::{Deserialize, Serialize};

pub mod animation;
pub mod assets;
pub mod character;
pub mod coords;
pub mod error;
pub mod mesh;
pub mod placer;
pub mod progress;
pub mod resolver;
pub mod scene;
pub mod skeleton;
pub mod skinned_mesh;
pub mod terrain;
pub mod tileset;
pub mod zone;

#[cfg(test)]
mod test_data;

pub use character::{import_character, CharacterAsset};
pub use coords::Transform;
pub use error::{ErrorKind, ImportError};
pub use progress::{CancelFlag, Cancelled, ImportPhase, ImportProgress, NoProgress};
pub use scene::{
    Animated, AnimationAsset, Diagnostic, DiagnosticKind, Instance, InstanceBucket, MaterialDesc,
    MeshAsset, Scene, SkeletonAsset, Terrain, TextureAsset,
};
pub use zone::{import_zone, ZoneImporter};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportOptions {
    /// Bad references abort the import instead of becoming diagnostics.
    pub strict: bool,
    /// Upper bound on terrain texture layers, most used first.
    pub max_layers: usize,
    pub load_textures: bool,
    pub load_animations: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            strict: false,
            max_layers: 64,
            load_textures: true,
            load_animations: true,
        }
    }
}
