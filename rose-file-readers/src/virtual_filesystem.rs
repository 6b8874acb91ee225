use anyhow::Context;
use std::{
    borrow::Cow,
    collections::HashMap,
    path::{Component, Path, PathBuf},
};
use thiserror::Error;

use crate::{reader::RoseFileReader, RoseFile};

pub enum VfsFile<'a> {
    Buffer(Vec<u8>),
    View(&'a [u8]),
}

#[derive(Error, Debug)]
pub enum VfsError {
    #[error("File {0} not found")]
    FileNotFound(PathBuf),
}

impl<'a> From<&'a VfsFile<'a>> for RoseFileReader<'a> {
    fn from(file: &'a VfsFile<'a>) -> Self {
        match file {
            VfsFile::Buffer(vec) => RoseFileReader::from(vec),
            VfsFile::View(buf) => RoseFileReader::from(*buf),
        }
    }
}

#[derive(Default, Debug, Hash, Clone, PartialEq, Eq)]
pub struct VfsPathBuf {
    path: PathBuf,
}

impl VfsPathBuf {
    pub fn new(path: &str) -> Self {
        VfsPathBuf {
            path: VfsPath::normalise_path(path),
        }
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// A data-root relative path, compared without regard to case or slash direction.
#[derive(Debug, Hash, Clone)]
pub struct VfsPath<'a> {
    path: Cow<'a, Path>,
}

impl<'a> VfsPath<'a> {
    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn normalise_path(path: &str) -> PathBuf {
        path.replace('\\', "/")
            .to_uppercase()
            .trim_start()
            .trim_end()
            .trim_start_matches('/')
            .into()
    }
}

impl<'a> From<&'a str> for VfsPath<'_> {
    fn from(path: &'a str) -> Self {
        VfsPath {
            path: Cow::Owned(VfsPath::normalise_path(path)),
        }
    }
}

impl<'a> From<&'a String> for VfsPath<'_> {
    fn from(path: &'a String) -> Self {
        VfsPath {
            path: Cow::Owned(VfsPath::normalise_path(path.as_str())),
        }
    }
}

impl<'a> From<&'a Path> for VfsPath<'_> {
    fn from(path: &'a Path) -> Self {
        VfsPath {
            path: Cow::Owned(VfsPath::normalise_path(path.to_string_lossy().as_ref())),
        }
    }
}

impl From<PathBuf> for VfsPath<'_> {
    fn from(path: PathBuf) -> Self {
        VfsPath {
            path: Cow::Owned(VfsPath::normalise_path(path.to_string_lossy().as_ref())),
        }
    }
}

impl<'a> From<&'a VfsPath<'a>> for VfsPath<'a> {
    fn from(path: &'a VfsPath<'a>) -> Self {
        VfsPath {
            path: Cow::Borrowed(&path.path),
        }
    }
}

impl<'a> From<&'a VfsPathBuf> for VfsPath<'a> {
    fn from(path: &'a VfsPathBuf) -> Self {
        VfsPath {
            path: Cow::Borrowed(&path.path),
        }
    }
}

pub trait VirtualFilesystemDevice {
    fn open_file<'a>(&self, path: &'a VfsPath) -> Result<VfsFile, anyhow::Error>;
    fn exists(&self, path: &VfsPath) -> bool;
}

/// Reads files below a directory on disk. Game data is authored on a case
/// insensitive filesystem, so each path component is matched ignoring case.
pub struct HostFilesystemDevice {
    pub root_path: PathBuf,
}

impl HostFilesystemDevice {
    pub fn new(root_path: PathBuf) -> Self {
        Self { root_path }
    }

    /// Finds the on-disk path for `vfs_path`, if one exists.
    pub fn resolve(&self, vfs_path: &VfsPath) -> Option<PathBuf> {
        let direct = self.root_path.join(vfs_path.path());
        if direct.is_file() {
            return Some(direct);
        }

        let mut current = self.root_path.clone();
        for component in vfs_path.path().components() {
            let name = match component {
                Component::Normal(name) => name.to_string_lossy(),
                Component::CurDir => continue,
                _ => return None,
            };

            let exact = current.join(name.as_ref());
            if exact.exists() {
                current = exact;
                continue;
            }

            let entry = std::fs::read_dir(&current)
                .ok()?
                .filter_map(Result::ok)
                .find(|entry| entry.file_name().to_string_lossy().eq_ignore_ascii_case(&name))?;
            current = entry.path();
        }

        if current.is_file() {
            Some(current)
        } else {
            None
        }
    }
}

impl VirtualFilesystemDevice for HostFilesystemDevice {
    fn open_file<'a>(&self, vfs_path: &'a VfsPath) -> Result<VfsFile, anyhow::Error> {
        let host_path = self
            .resolve(vfs_path)
            .ok_or_else(|| VfsError::FileNotFound(vfs_path.path().into()))?;
        let buffer = std::fs::read(&host_path)
            .with_context(|| format!("Failed to open {}", host_path.to_string_lossy()))?;
        Ok(VfsFile::Buffer(buffer))
    }

    fn exists(&self, vfs_path: &VfsPath) -> bool {
        self.resolve(vfs_path).is_some()
    }
}

/// Serves files from memory, keyed by normalised path.
#[derive(Default)]
pub struct MemoryFilesystemDevice {
    files: HashMap<PathBuf, Vec<u8>>,
}

impl MemoryFilesystemDevice {
    pub fn add_file(&mut self, path: &str, data: Vec<u8>) -> &mut Self {
        self.files.insert(VfsPath::normalise_path(path), data);
        self
    }
}

impl VirtualFilesystemDevice for MemoryFilesystemDevice {
    fn open_file<'a>(&self, vfs_path: &'a VfsPath) -> Result<VfsFile, anyhow::Error> {
        match self.files.get(vfs_path.path()) {
            Some(data) => Ok(VfsFile::View(data)),
            None => Err(VfsError::FileNotFound(vfs_path.path().into()).into()),
        }
    }

    fn exists(&self, vfs_path: &VfsPath) -> bool {
        self.files.contains_key(vfs_path.path())
    }
}

pub struct VirtualFilesystem {
    pub devices: Vec<Box<dyn VirtualFilesystemDevice + Send + Sync>>,
}

impl VirtualFilesystem {
    pub fn new(devices: Vec<Box<dyn VirtualFilesystemDevice + Send + Sync>>) -> Self {
        Self { devices }
    }

    pub fn exists<'a, P: Into<VfsPath<'a>>>(&self, path: P) -> bool {
        let vfs_path: VfsPath = path.into();

        for device in &self.devices {
            if device.exists(&vfs_path) {
                return true;
            }
        }

        false
    }

    pub fn open_file<'a>(&self, path: impl Into<VfsPath<'a>>) -> Result<VfsFile, anyhow::Error> {
        let vfs_path: VfsPath = path.into();

        for device in &self.devices {
            match device.open_file(&vfs_path) {
                Ok(file) => return Ok(file),
                Err(error) => {
                    match error.downcast_ref::<VfsError>() {
                        Some(VfsError::FileNotFound(_)) => continue,
                        None => return Err(error),
                    };
                }
            }
        }

        Err(VfsError::FileNotFound(vfs_path.path().into()).into())
    }

    pub fn read_file<'a, T: RoseFile + Sized, P: Into<VfsPath<'a>>>(
        &self,
        path: P,
    ) -> Result<T, anyhow::Error> {
        self.read_file_with(path, &Default::default())
    }

    pub fn read_file_with<'a, T: RoseFile + Sized, P: Into<VfsPath<'a>>>(
        &self,
        path: P,
        options: &T::ReadOptions,
    ) -> Result<T, anyhow::Error> {
        let vfs_path: VfsPath = path.into();

        let file = self.open_file(&vfs_path)?;
        RoseFile::read(RoseFileReader::from(&file), options)
            .with_context(|| format!("Failed to read {}", vfs_path.path().to_string_lossy()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HimFile;

    #[test]
    fn normalises_paths() {
        assert_eq!(
            VfsPath::normalise_path(" 3Ddata\\Maps\\junon\\jdt01\\31_31.him "),
            PathBuf::from("3DDATA/MAPS/JUNON/JDT01/31_31.HIM")
        );
        assert_eq!(
            VfsPathBuf::new("/3ddata/stb/list_zone.stb").path(),
            Path::new("3DDATA/STB/LIST_ZONE.STB")
        );
    }

    #[test]
    fn host_device_ignores_case() {
        let root = tempfile::tempdir().unwrap();
        let directory = root.path().join("3Ddata").join("Stb");
        std::fs::create_dir_all(&directory).unwrap();
        std::fs::write(directory.join("List_Zone.stb"), b"STB1").unwrap();

        let device = HostFilesystemDevice::new(root.path().to_path_buf());
        let path = VfsPath::from("3DDATA\\STB\\LIST_ZONE.STB");
        assert_eq!(
            device.resolve(&path),
            Some(directory.join("List_Zone.stb"))
        );
        assert!(device.exists(&path));
        assert!(!device.exists(&VfsPath::from("3DDATA/STB/MISSING.STB")));
        assert!(!device.exists(&VfsPath::from("3DDATA/STB")));
    }

    #[test]
    fn device_chain_skips_missing_files() {
        let mut first = MemoryFilesystemDevice::default();
        first.add_file("a.txt", vec![1]);
        let mut second = MemoryFilesystemDevice::default();
        second.add_file("B.TXT", vec![2]);
        let vfs = VirtualFilesystem::new(vec![Box::new(first), Box::new(second)]);

        assert!(vfs.exists("b.txt"));
        match vfs.open_file("b.txt").unwrap() {
            VfsFile::View(data) => assert_eq!(data, &[2]),
            VfsFile::Buffer(_) => panic!("expected a view"),
        }

        let error = vfs.read_file::<HimFile, _>("c.him").err().unwrap();
        assert!(matches!(
            error.downcast_ref::<VfsError>(),
            Some(VfsError::FileNotFound(_))
        ));
    }
}
