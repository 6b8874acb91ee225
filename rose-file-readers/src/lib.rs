mod reader;
mod virtual_filesystem;
mod writer;
pub use reader::{ReadError, RoseFileReader};
pub use writer::{BlockFileWriter, RoseFileWriter};

pub trait RoseFile {
    type ReadOptions: Default;

    fn read(reader: RoseFileReader, options: &Self::ReadOptions) -> Result<Self, anyhow::Error>
    where
        Self: Sized;
}

pub mod types;

mod dds;
mod him;
mod ifo;
mod til;
mod zmd;
mod zmo;
mod zms;
mod zon;
mod zsc;

#[macro_use]
mod stb;

pub use dds::{
    decode_dxt1_block, decode_dxt3_block, decode_dxt5_block, DdsFile, DdsFormat, FourCC,
};
pub use him::HimFile;
pub use ifo::{IfoEventObject, IfoFile, IfoObject, IfoReadOptions};
pub use stb::{StbFile, StbReadOptions};
pub use til::{TilFile, TilPatch};
pub use virtual_filesystem::{
    HostFilesystemDevice, MemoryFilesystemDevice, VfsError, VfsFile, VfsPath, VfsPathBuf,
    VirtualFilesystem, VirtualFilesystemDevice,
};
pub use zmd::{ZmdBone, ZmdFile};
pub use zmo::{ZmoChannel, ZmoFile, ZmoReadOptions};
pub use zms::{ZmsFile, ZmsFormatFlags};
pub use zon::{ZonFile, ZonReadOptions, ZonTile, ZonTileRotation};
pub use zsc::{
    ZscFile, ZscMaterial, ZscObject, ZscObjectEffect, ZscObjectPart, ZscProperty, ZscReadOptions,
};
