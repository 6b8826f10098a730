//! Source loading
//!
//! Reads one source file into an `XmlDocument` and sorts failures into the
//! two classes the batch driver cares about: soft (skip the source) and
//! fatal (abort the run).

use crate::dom::{DocumentError, XmlDocument};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("{path}: source file not found")]
    Unavailable { path: PathBuf },
    #[error("{path}: unparsable document: {source}")]
    Unparsable {
        path: PathBuf,
        #[source]
        source: DocumentError,
    },
    #[error("{path}: permission denied")]
    PermissionDenied { path: PathBuf },
    #[error("{path}: corrupt source: {reason}")]
    Corrupt { path: PathBuf, reason: String },
}

impl LoadError {
    /// Soft failures mean "this source contributes nothing"; the rest abort
    pub fn is_fatal(&self) -> bool {
        matches!(self, LoadError::PermissionDenied { .. } | LoadError::Corrupt { .. })
    }

    pub fn path(&self) -> &Path {
        match self {
            LoadError::Unavailable { path }
            | LoadError::Unparsable { path, .. }
            | LoadError::PermissionDenied { path }
            | LoadError::Corrupt { path, .. } => path,
        }
    }
}

pub fn load_source(path: &Path) -> Result<XmlDocument, LoadError> {
    let bytes = std::fs::read(path).map_err(|err| match err.kind() {
        ErrorKind::NotFound => LoadError::Unavailable { path: path.to_path_buf() },
        ErrorKind::PermissionDenied => LoadError::PermissionDenied { path: path.to_path_buf() },
        _ => LoadError::Corrupt { path: path.to_path_buf(), reason: err.to_string() },
    })?;
    parse_source(path, bytes)
}

/// Parse bytes already in memory, classifying failures as `load_source` does
pub fn parse_source(path: &Path, bytes: Vec<u8>) -> Result<XmlDocument, LoadError> {
    XmlDocument::parse_bytes(bytes).map_err(|source| {
        if source.is_corruption() {
            LoadError::Corrupt { path: path.to_path_buf(), reason: source.to_string() }
        } else {
            LoadError::Unparsable { path: path.to_path_buf(), source }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::DocumentAccess;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_ok() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("index.xml");
        fs::write(&path, "\u{feff}<index><mainTerm><title>A</title></mainTerm></index>").unwrap();
        let doc = load_source(&path).unwrap();
        assert_eq!(doc.root_name(), Some("index"));
        assert_eq!(doc.descendants_by_tag(doc.root_element_id().unwrap(), "mainTerm").len(), 1);
    }

    #[test]
    fn test_missing_file_is_soft() {
        let dir = TempDir::new().unwrap();
        let err = load_source(&dir.path().join("absent.xml")).unwrap_err();
        assert!(matches!(err, LoadError::Unavailable { .. }));
        assert!(!err.is_fatal());
        assert!(err.path().ends_with("absent.xml"));
    }

    #[test]
    fn test_unparsable_is_soft() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.xml");
        fs::write(&path, "<index><mainTerm></index>").unwrap();
        let err = load_source(&path).unwrap_err();
        assert!(matches!(err, LoadError::Unparsable { .. }));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_invalid_utf8_is_fatal() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("corrupt.xml");
        fs::write(&path, [b'<', b'a', b'>', 0xC3, 0x28, b'<', b'/', b'a', b'>']).unwrap();
        let err = load_source(&path).unwrap_err();
        assert!(matches!(err, LoadError::Corrupt { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_directory_is_not_soft() {
        let dir = TempDir::new().unwrap();
        let err = load_source(dir.path()).unwrap_err();
        assert!(err.is_fatal());
    }
}
