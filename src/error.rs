//! Error types shared by the scanner, store, reconciler and renamer.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GalleryError {
    /// A single file vanished, is not readable, or failed mid-read.
    #[error("cannot access file {}: {source}", path.display())]
    FileAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The library root could not be listed. Fatal to the calling operation.
    #[error("cannot list directory {}: {source}", path.display())]
    DirectoryAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no record for {0}")]
    NotFound(String),

    #[error("{tool} failed: {message}")]
    ExternalTool { tool: String, message: String },

    /// The stored tag column could not be decoded.
    #[error("tags for {fingerprint} are unreadable: {reason}")]
    TagEncoding { fingerprint: String, reason: String },

    #[error("tag is empty")]
    EmptyTag,

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

impl GalleryError {
    pub(crate) fn file_access(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        GalleryError::FileAccess {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn directory_access(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        GalleryError::DirectoryAccess {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, GalleryError>;
