//! Merging an explicit file list with a scanned folder into one upload list.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::hash::{hash_file, FileHash};
use super::walk::{walk_folder, WalkOptions};
use crate::error::FileError;

/// One file to upload: where it lives locally and where it lands in the artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileTuple {
    /// Path on the local filesystem.
    pub source: PathBuf,
    /// Path inside the remote artifact. Uniqueness key for uploads.
    pub destination: String,
}

impl FileTuple {
    /// Create a tuple; the destination defaults to the source's base name.
    pub fn new(source: impl Into<PathBuf>, destination: Option<String>) -> Self {
        let source = source.into();
        let destination = destination.unwrap_or_else(|| base_name(&source));
        Self {
            source,
            destination,
        }
    }
}

fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// Parse the dynamic `files` attribute.
///
/// Each element is either a source path string or a list of one or two
/// strings (`[source]` or `[source, destination]`). `null` means no files.
pub fn parse_files(value: &Value) -> Result<Vec<FileTuple>, FileError> {
    let items = match value {
        Value::Null => return Ok(Vec::new()),
        Value::Array(items) => items,
        _ => {
            return Err(FileError::InvalidFiles(
                "files must be a list".to_string(),
            ))
        },
    };

    items
        .iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::String(source) => Ok(FileTuple::new(source, None)),
            Value::Array(parts) => parse_tuple(i, parts),
            _ => Err(FileError::InvalidFiles(format!(
                "files[{}] must be a string or a list of strings",
                i
            ))),
        })
        .collect()
}

fn parse_tuple(index: usize, parts: &[Value]) -> Result<FileTuple, FileError> {
    if parts.is_empty() || parts.len() > 2 {
        return Err(FileError::InvalidFiles(format!(
            "files[{}] must have 1 or 2 elements",
            index
        )));
    }

    let mut strings = parts.iter().map(|part| {
        part.as_str().ok_or_else(|| {
            FileError::InvalidFiles(format!(
                "files[{}] has element that is not a string",
                index
            ))
        })
    });

    // Length checked above, so the first element is always present.
    let source = strings.next().transpose()?.unwrap_or_default();
    let destination = strings.next().transpose()?.map(str::to_string);
    Ok(FileTuple::new(source, destination))
}

/// A file ready for upload, with its content digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocalFile {
    /// Path on the local filesystem.
    pub source: PathBuf,
    /// Path inside the remote artifact.
    pub destination: String,
    /// Digest of the source content.
    pub hash: FileHash,
}

/// Hash each explicitly declared file, in declaration order.
pub fn files_hashes(files: &[FileTuple]) -> Result<Vec<FileHash>, FileError> {
    files.iter().map(|file| hash_file(&file.source)).collect()
}

/// Build the canonical upload list from an optional folder and explicit files.
///
/// Folder files come first in sorted relative-path order. Each explicit file
/// then either replaces the entry with the same destination in place, or is
/// appended. The result never holds two entries with one destination.
pub fn prepare_local_files(
    folder: Option<&Path>,
    files: &[FileTuple],
    options: &WalkOptions,
) -> Result<Vec<LocalFile>, FileError> {
    let mut prepared: IndexMap<String, LocalFile> = IndexMap::new();

    if let Some(folder) = folder {
        for entry in walk_folder(folder, options)? {
            let hash = hash_file(&entry.path)?;
            prepared.insert(
                entry.relative.clone(),
                LocalFile {
                    source: entry.path,
                    destination: entry.relative,
                    hash,
                },
            );
        }
    }

    for file in files {
        let hash = hash_file(&file.source)?;
        let local = LocalFile {
            source: file.source.clone(),
            destination: file.destination.clone(),
            hash,
        };
        if let Some(replaced) = prepared.insert(file.destination.clone(), local) {
            debug!(
                destination = %file.destination,
                replaced = %replaced.source.display(),
                source = %file.source.display(),
                "explicit file overrides earlier entry"
            );
        }
    }

    Ok(prepared.into_values().collect())
}
