//! Local artifact hashing and upload preparation.
//!
//! Custom models, jobs and application sources are built from local files:
//! an optional `folder_path` scanned recursively, plus an explicit `files`
//! list. This module turns those inputs into
//!
//! - a [`FileHash`] per explicit file (the `files_hashes` attribute),
//! - a [`FolderHash`] for the folder (the `folder_path_hash` attribute),
//! - a deduplicated, ordered list of [`LocalFile`]s for upload.
//!
//! Everything here is synchronous, read-only and independent of any API
//! client, so it is usable from plan hooks and apply alike.

mod folder;
mod hash;
mod prepare;
mod walk;

pub use folder::{hash_folder, FolderHash};
pub use hash::{hash_file, read_file, FileHash};
pub use prepare::{files_hashes, parse_files, prepare_local_files, FileTuple, LocalFile};
pub use walk::{walk_folder, FolderEntry, WalkOptions};
