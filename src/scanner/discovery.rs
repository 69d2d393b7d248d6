use std::io;
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

use crate::error::{GalleryError, Result};

/// Lists the image files directly inside `directory`, ordered by file name.
///
/// Subdirectories are not descended into. Fails only when `directory`
/// itself cannot be listed.
pub fn discover_images(directory: &Path, extensions: &[String]) -> Result<Vec<PathBuf>> {
    let metadata =
        std::fs::metadata(directory).map_err(|e| GalleryError::directory_access(directory, e))?;
    if !metadata.is_dir() {
        return Err(GalleryError::directory_access(
            directory,
            io::Error::other("not a directory"),
        ));
    }

    let mut images = Vec::new();

    for entry in WalkDir::new(directory)
        .min_depth(1)
        .max_depth(1)
        .follow_links(false)
        .sort_by_file_name()
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => {
                return Err(GalleryError::directory_access(directory, e.into()));
            }
            Err(e) => {
                warn!("Skipping unreadable entry in {}: {}", directory.display(), e);
                continue;
            }
        };

        let path = entry.path();
        if path.is_file() && has_extension(path, extensions) {
            images.push(path.to_path_buf());
        }
    }

    Ok(images)
}

/// Case-insensitive extension check against a whitelist given without dots.
pub fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| extensions.iter().any(|e| e.to_lowercase() == ext))
}
