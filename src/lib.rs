//! Local image gallery manager.
//!
//! Images in a library directory are identified by the SHA-256 of their
//! content. Tags live in a SQLite store keyed by that fingerprint, so they
//! follow an image across renames. The bulk renamer moves each image, its
//! thumbnail and its store record to a fabricated timestamp name.

pub mod config;
pub mod db;
pub mod error;
pub mod gallery;
pub mod logging;
pub mod reconcile;
pub mod rename;
pub mod scanner;

pub use config::Config;
pub use db::{Database, ImageRecord};
pub use error::{GalleryError, Result};
pub use gallery::{Gallery, Listing};
pub use reconcile::{reconcile, ReconciledImage, Reconciliation, SyncReport};
pub use rename::{BulkRenamer, RenameReport, RepairReport};
pub use scanner::{fingerprint, ScannedFile, Scanner};
