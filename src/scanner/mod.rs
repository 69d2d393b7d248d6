pub mod discovery;
pub mod hashing;
pub mod thumbnails;

use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::Result;

pub use discovery::discover_images;
pub use hashing::fingerprint;
pub use thumbnails::{thumbnail_name, FfmpegThumbnailer, ThumbnailDir, Thumbnailer};

/// One image as seen on disk during the latest scan. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedFile {
    pub file_name: String,
    pub fingerprint: String,
    pub thumbnail_name: String,
    pub thumbnail_present: bool,
}

impl ScannedFile {
    pub fn thumbnail_url(&self) -> String {
        format!("/thumbnails/{}", self.thumbnail_name)
    }
}

pub struct Scanner {
    root: PathBuf,
    extensions: Vec<String>,
    thumbnails: ThumbnailDir,
}

impl Scanner {
    pub fn new(root: impl Into<PathBuf>, extensions: Vec<String>, thumbnails: ThumbnailDir) -> Self {
        Self {
            root: root.into(),
            extensions,
            thumbnails,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.library.root.clone(),
            config.library.extensions.clone(),
            ThumbnailDir::new(config.thumbnail_dir()),
        )
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn thumbnails(&self) -> &ThumbnailDir {
        &self.thumbnails
    }

    /// Hashes every image in the root, in file-name order.
    ///
    /// A file that cannot be hashed is logged and left out. Only a root
    /// that cannot be listed fails the scan.
    pub fn scan(&self) -> Result<Vec<ScannedFile>> {
        let paths = discover_images(&self.root, &self.extensions)?;
        let mut scanned = Vec::with_capacity(paths.len());

        for path in &paths {
            let Some(file_name) = path.file_name().map(|n| n.to_string_lossy().to_string()) else {
                continue;
            };

            let fingerprint = match hashing::fingerprint(path) {
                Ok(fp) => fp,
                Err(e) => {
                    warn!("Skipping {}: {}", file_name, e);
                    continue;
                }
            };

            let thumbnail_name = thumbnail_name(&file_name);
            let thumbnail_present = self.thumbnails.has(&file_name);
            if !thumbnail_present {
                warn!("Thumbnail {} not found for {}", thumbnail_name, file_name);
            }

            scanned.push(ScannedFile {
                file_name,
                fingerprint,
                thumbnail_name,
                thumbnail_present,
            });
        }

        debug!(
            "Scanned {} of {} image files in {}",
            scanned.len(),
            paths.len(),
            self.root.display()
        );
        Ok(scanned)
    }
}
