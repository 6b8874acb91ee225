use std::{fmt, path::PathBuf};

use rose_file_readers::{ReadError, VfsError};
use serde::{Deserialize, Serialize};

use crate::progress::Cancelled;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    Truncated,
    BadMagic,
    UnsupportedVariant,
    OutOfRange,
    PathNotFound,
    CyclicDependency,
    Cancelled,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Truncated => "truncated file",
            ErrorKind::BadMagic => "bad magic header",
            ErrorKind::UnsupportedVariant => "unsupported variant",
            ErrorKind::OutOfRange => "index out of range",
            ErrorKind::PathNotFound => "path not found",
            ErrorKind::CyclicDependency => "cyclic dependency",
            ErrorKind::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// The error an import aborts with: what went wrong, in which file and where.
#[derive(Debug)]
pub struct ImportError {
    pub kind: ErrorKind,
    pub path: Option<PathBuf>,
    pub offset: Option<u64>,
    pub source: Option<anyhow::Error>,
}

impl ImportError {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            path: None,
            offset: None,
            source: None,
        }
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<anyhow::Error>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Classifies a decoder or filesystem error by the first recognised
    /// error in its chain.
    pub fn from_anyhow(error: anyhow::Error, path: impl Into<PathBuf>) -> Self {
        let mut kind = ErrorKind::UnsupportedVariant;
        let mut offset = None;

        for cause in error.chain() {
            if let Some(read_error) = cause.downcast_ref::<ReadError>() {
                kind = match read_error {
                    ReadError::Truncated { offset: at } => {
                        offset = Some(*at);
                        ErrorKind::Truncated
                    }
                    ReadError::BadMagic { .. } => ErrorKind::BadMagic,
                    ReadError::UnsupportedVariant { .. } => ErrorKind::UnsupportedVariant,
                    ReadError::OutOfRange { .. } => ErrorKind::OutOfRange,
                };
                break;
            }

            if cause.downcast_ref::<VfsError>().is_some()
                || cause.downcast_ref::<std::io::Error>().is_some()
            {
                kind = ErrorKind::PathNotFound;
                break;
            }

            if cause.downcast_ref::<Cancelled>().is_some() {
                kind = ErrorKind::Cancelled;
                break;
            }
        }

        Self {
            kind,
            path: Some(path.into()),
            offset,
            source: Some(error),
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::PathNotFound
    }
}

impl From<Cancelled> for ImportError {
    fn from(_: Cancelled) -> Self {
        ImportError::new(ErrorKind::Cancelled)
    }
}

impl fmt::Display for ImportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(path) = &self.path {
            write!(f, " in {}", path.to_string_lossy())?;
        }
        if let Some(offset) = self.offset {
            write!(f, " at offset {}", offset)?;
        }
        if let Some(source) = &self.source {
            write!(f, ": {:#}", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for ImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|error| &**error as &(dyn std::error::Error + 'static))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn classifies_wrapped_read_errors() {
        let error = Err::<(), _>(ReadError::Truncated { offset: 42 })
            .context("Failed to read 31_31.HIM")
            .unwrap_err();
        let import_error = ImportError::from_anyhow(error, "3DDATA/MAPS/31_31.HIM");
        assert_eq!(import_error.kind, ErrorKind::Truncated);
        assert_eq!(import_error.offset, Some(42));
        assert!(import_error.to_string().contains("at offset 42"));
    }

    #[test]
    fn classifies_missing_files() {
        let error = anyhow::Error::from(VfsError::FileNotFound("A.ZON".into()));
        let import_error = ImportError::from_anyhow(error, "A.ZON");
        assert!(import_error.is_not_found());
        assert_eq!(import_error.path, Some(PathBuf::from("A.ZON")));
    }
}
