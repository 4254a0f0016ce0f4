//! Content digests for single files.

use std::fmt;
use std::fs::File;
use std::io;
use std::path::Path;

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::FileError;

/// Lowercase hex SHA-256 digest of one file's bytes.
///
/// Depends only on content: modification time and permissions never
/// influence the value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct FileHash(String);

impl FileHash {
    /// Digest an in-memory buffer.
    pub fn of_bytes(bytes: &[u8]) -> Self {
        Self(hex::encode(Sha256::digest(bytes)))
    }

    pub(crate) fn from_digest(digest: &[u8]) -> Self {
        Self(hex::encode(digest))
    }

    /// The hex string form, as stored in state.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The raw 32 digest bytes.
    pub fn to_bytes(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        // Always built from a 32-byte digest.
        if hex::decode_to_slice(&self.0, &mut out).is_err() {
            out = [0u8; 32];
        }
        out
    }
}

impl fmt::Display for FileHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<FileHash> for String {
    fn from(hash: FileHash) -> Self {
        hash.0
    }
}

/// Hash a regular file by streaming its content.
///
/// Fails with [`FileError::NotFound`], [`FileError::PermissionDenied`] or
/// [`FileError::NotAFile`] so callers can surface a precise diagnostic.
pub fn hash_file(path: &Path) -> Result<FileHash, FileError> {
    let metadata = std::fs::metadata(path).map_err(|e| FileError::from_io(path, e))?;
    if !metadata.is_file() {
        return Err(FileError::NotAFile {
            path: path.to_path_buf(),
        });
    }

    let mut file = File::open(path).map_err(|e| FileError::from_io(path, e))?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher).map_err(|e| FileError::from_io(path, e))?;
    Ok(FileHash::from_digest(&hasher.finalize()))
}

/// Read a regular file fully, for upload.
pub fn read_file(path: &Path) -> Result<Vec<u8>, FileError> {
    let metadata = std::fs::metadata(path).map_err(|e| FileError::from_io(path, e))?;
    if !metadata.is_file() {
        return Err(FileError::NotAFile {
            path: path.to_path_buf(),
        });
    }
    std::fs::read(path).map_err(|e| FileError::from_io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_hash_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.py");
        fs::write(&path, b"print('hello')").unwrap();

        let first = hash_file(&path).unwrap();
        let second = hash_file(&path).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, FileHash::of_bytes(b"print('hello')"));
        assert_eq!(first.as_str().len(), 64);
    }

    #[test]
    fn test_known_digest() {
        assert_eq!(
            FileHash::of_bytes(b"hello").as_str(),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn test_single_byte_change_changes_hash() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, b"hello").unwrap();
        let before = hash_file(&path).unwrap();

        fs::write(&path, b"hellp").unwrap();
        let after = hash_file(&path).unwrap();
        assert_ne!(before, after);
    }

    #[test]
    fn test_empty_file_hashes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty");
        fs::write(&path, b"").unwrap();

        assert_eq!(
            hash_file(&path).unwrap().as_str(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = hash_file(&dir.path().join("nope.txt")).unwrap_err();
        assert!(matches!(err, FileError::NotFound { .. }));
    }

    #[test]
    fn test_directory_is_not_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = hash_file(dir.path()).unwrap_err();
        assert!(matches!(err, FileError::NotAFile { .. }));
        assert!(read_file(dir.path()).is_err());
    }

    #[test]
    fn test_raw_bytes_roundtrip_hex() {
        let hash = FileHash::of_bytes(b"abc");
        assert_eq!(hex::encode(hash.to_bytes()), hash.as_str());
    }
}
