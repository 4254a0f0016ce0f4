//! Error types for the DataRobot provider.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::client::ClientError;
use crate::schema::Diagnostic;

/// Errors raised while reading local files and folders named in configuration.
///
/// Local I/O failures are never transient, so none of these are retried.
#[derive(Debug, Error)]
pub enum FileError {
    /// The path does not exist.
    #[error("file not found: {}: {source}", path.display())]
    NotFound {
        /// The missing path.
        path: PathBuf,
        /// The underlying OS error.
        #[source]
        source: io::Error,
    },

    /// The path exists but cannot be read.
    #[error("permission denied: {}: {source}", path.display())]
    PermissionDenied {
        /// The unreadable path.
        path: PathBuf,
        /// The underlying OS error.
        #[source]
        source: io::Error,
    },

    /// The path exists but is not a regular file.
    #[error("not a regular file: {}", path.display())]
    NotAFile {
        /// The offending path.
        path: PathBuf,
    },

    /// A folder root exists but is not a directory.
    #[error("not a directory: {}", path.display())]
    NotADirectory {
        /// The offending path.
        path: PathBuf,
    },

    /// A path inside a folder cannot be expressed as a UTF-8 destination.
    #[error("path is not valid UTF-8: {}", path.display())]
    NonUtf8Path {
        /// The offending path.
        path: PathBuf,
    },

    /// The `files` attribute does not have a supported shape.
    #[error("invalid files value: {0}")]
    InvalidFiles(String),

    /// Any other I/O failure.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// The path being read.
        path: PathBuf,
        /// The underlying OS error.
        #[source]
        source: io::Error,
    },

    /// The directory walk failed part way through.
    #[error("failed to walk {}: {source}", path.display())]
    Walk {
        /// The entry being visited when the walk failed.
        path: PathBuf,
        /// The walker error.
        #[source]
        source: walkdir::Error,
    },
}

impl FileError {
    /// Classify an I/O error for `path` into the matching variant.
    pub fn from_io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            io::ErrorKind::NotFound => Self::NotFound { path, source },
            io::ErrorKind::PermissionDenied => Self::PermissionDenied { path, source },
            _ => Self::Io { path, source },
        }
    }

    /// The filesystem path the error refers to, if any.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::NotFound { path, .. }
            | Self::PermissionDenied { path, .. }
            | Self::NotAFile { path }
            | Self::NotADirectory { path }
            | Self::NonUtf8Path { path }
            | Self::Io { path, .. }
            | Self::Walk { path, .. } => Some(path),
            Self::InvalidFiles(_) => None,
        }
    }
}

/// Errors returned by provider and resource operations.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The requested resource was not found.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// A validation error occurred.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A configuration error occurred.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The requested resource type is unknown.
    #[error("Unknown resource type: {0}")]
    UnknownResource(String),

    /// A state value could not be converted.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The DataRobot API call failed.
    #[error("DataRobot API error: {0}")]
    Client(#[from] ClientError),

    /// A local file referenced by an attribute could not be hashed or read.
    #[error("Error calculating {attribute} hash: {source}")]
    LocalFile {
        /// The attribute whose files failed (`files`, `folder_path`, `file_path`).
        attribute: String,
        /// The underlying file error.
        #[source]
        source: FileError,
    },

    /// Operation not implemented.
    #[error("Unimplemented: {0}")]
    Unimplemented(String),

    /// Invalid request from the engine.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ProviderError {
    /// Wrap a file error raised while processing `attribute`.
    pub fn local_file(attribute: impl Into<String>, source: FileError) -> Self {
        Self::LocalFile {
            attribute: attribute.into(),
            source,
        }
    }

    /// Get the error message without the variant prefix.
    pub fn message(&self) -> String {
        match self {
            Self::NotFound(msg)
            | Self::Validation(msg)
            | Self::Configuration(msg)
            | Self::UnknownResource(msg)
            | Self::Unimplemented(msg)
            | Self::InvalidRequest(msg) => msg.clone(),
            Self::Serialization(err) => err.to_string(),
            Self::Client(err) => err.to_string(),
            Self::LocalFile { source, .. } => source.to_string(),
        }
    }

    /// Whether the error means the remote entity no longer exists.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_) | Self::Client(ClientError::NotFound { .. })
        )
    }

    /// Convert into a user-facing error diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            Self::LocalFile { attribute, source } => {
                Diagnostic::error(format!("Error calculating {} hash", attribute))
                    .with_detail(source.to_string())
                    .with_attribute(attribute.clone())
            },
            other => Diagnostic::error(other.to_string()),
        }
    }
}

impl From<ProviderError> for Diagnostic {
    fn from(err: ProviderError) -> Self {
        err.to_diagnostic()
    }
}
