//! Deterministic enumeration of the regular files under a folder.

use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::FileError;

/// Options controlling folder traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WalkOptions {
    /// Follow symbolic links and treat their targets as part of the folder.
    ///
    /// When `false` (the default) symlinks are skipped entirely. When `true`,
    /// link targets are visited under the link's own relative path and
    /// symlink cycles are skipped.
    #[serde(default)]
    pub follow_symlinks: bool,
}

impl WalkOptions {
    /// Options that follow symlinks.
    pub fn following_symlinks() -> Self {
        Self {
            follow_symlinks: true,
        }
    }
}

/// A regular file found under a folder root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderEntry {
    /// `/`-separated path relative to the root.
    pub relative: String,
    /// Absolute path on the local filesystem.
    pub path: PathBuf,
}

/// List every regular file under `root`, sorted by relative path.
///
/// Directories are not entries. Hidden files and zero-byte files are
/// included. A root that does not exist yields no entries.
pub fn walk_folder(root: &Path, options: &WalkOptions) -> Result<Vec<FolderEntry>, FileError> {
    let root = std::path::absolute(root).map_err(|e| FileError::from_io(root, e))?;

    match std::fs::metadata(&root) {
        Ok(metadata) if metadata.is_dir() => {},
        Ok(_) => return Err(FileError::NotADirectory { path: root }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(root = %root.display(), "folder does not exist, treating as empty");
            return Ok(Vec::new());
        },
        Err(e) => return Err(FileError::from_io(root, e)),
    }

    let mut entries = Vec::new();
    for entry in WalkDir::new(&root).follow_links(options.follow_symlinks) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) if err.loop_ancestor().is_some() => {
                warn!(
                    path = ?err.path(),
                    "skipping symlink that points back into an ancestor directory"
                );
                continue;
            },
            Err(err) => {
                let path = err.path().unwrap_or(&root).to_path_buf();
                return Err(FileError::Walk { path, source: err });
            },
        };

        // Unfollowed symlinks report their own type and are dropped here.
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.into_path();
        let relative = relative_posix(&root, &path)?;
        entries.push(FolderEntry { relative, path });
    }

    entries.sort_by(|a, b| a.relative.cmp(&b.relative));
    debug!(root = %root.display(), files = entries.len(), "walked folder");
    Ok(entries)
}

fn relative_posix(root: &Path, path: &Path) -> Result<String, FileError> {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let mut parts = Vec::new();
    for component in relative.components() {
        if let Component::Normal(part) = component {
            let part = part.to_str().ok_or_else(|| FileError::NonUtf8Path {
                path: path.to_path_buf(),
            })?;
            parts.push(part);
        }
    }
    Ok(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn relatives(entries: &[FolderEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.relative.as_str()).collect()
    }

    #[test]
    fn test_walk_sorted_recursive() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src/nested")).unwrap();
        fs::write(dir.path().join("z.txt"), b"z").unwrap();
        fs::write(dir.path().join("src/nested/b.py"), b"b").unwrap();
        fs::write(dir.path().join("src/a.py"), b"a").unwrap();
        fs::write(dir.path().join(".env"), b"").unwrap();

        let entries = walk_folder(dir.path(), &WalkOptions::default()).unwrap();
        assert_eq!(
            relatives(&entries),
            vec![".env", "src/a.py", "src/nested/b.py", "z.txt"]
        );
        assert!(entries.iter().all(|e| e.path.is_absolute()));
    }

    #[test]
    fn test_empty_directories_are_not_entries() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("empty/deeper")).unwrap();

        let entries = walk_folder(dir.path(), &WalkOptions::default()).unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn test_missing_root_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let entries = walk_folder(&dir.path().join("absent"), &WalkOptions::default()).unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn test_file_root_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("model.py");
        fs::write(&file, b"x").unwrap();

        let err = walk_folder(&file, &WalkOptions::default()).unwrap_err();
        assert!(matches!(err, FileError::NotADirectory { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_skipped_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let outside = tempfile::tempdir().unwrap();
        fs::write(outside.path().join("shared.py"), b"shared").unwrap();
        fs::write(dir.path().join("main.py"), b"main").unwrap();
        std::os::unix::fs::symlink(outside.path().join("shared.py"), dir.path().join("link.py"))
            .unwrap();
        std::os::unix::fs::symlink(outside.path(), dir.path().join("linked_dir")).unwrap();

        let entries = walk_folder(dir.path(), &WalkOptions::default()).unwrap();
        assert_eq!(relatives(&entries), vec!["main.py"]);

        let entries = walk_folder(dir.path(), &WalkOptions::following_symlinks()).unwrap();
        assert_eq!(
            relatives(&entries),
            vec!["link.py", "linked_dir/shared.py", "main.py"]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_cycle_is_skipped_when_following() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub/file.txt"), b"x").unwrap();
        std::os::unix::fs::symlink(dir.path(), dir.path().join("sub/loop")).unwrap();

        let entries = walk_folder(dir.path(), &WalkOptions::following_symlinks()).unwrap();
        assert_eq!(relatives(&entries), vec!["sub/file.txt"]);
    }
}
