use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::error::{GalleryError, Result};

/// SHA-256 of the full file content as lowercase hex.
///
/// The digest depends only on the bytes; name, location and timestamps
/// play no part.
pub fn fingerprint(path: &Path) -> Result<String> {
    let file = File::open(path).map_err(|e| GalleryError::file_access(path, e))?;
    let mut reader = BufReader::new(file);

    let mut hasher = Sha256::new();

    let mut buffer = [0u8; 8192];
    loop {
        let bytes_read = reader
            .read(&mut buffer)
            .map_err(|e| GalleryError::file_access(path, e))?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}
