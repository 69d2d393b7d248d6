//! Merging the on-disk scan with the tag store.
//!
//! The disk owns names and thumbnails, the store owns tags. `sync_store`
//! brings the store up to date with a scan; `reconcile` then joins the two
//! on fingerprint to produce what a viewer should show.

use serde::Serialize;
use std::collections::HashMap;
use tracing::{info, warn};

use crate::db::{Database, ImageRecord, UpsertOutcome};
use crate::scanner::ScannedFile;

/// A scanned file joined with its stored tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconciledImage {
    pub name: String,
    #[serde(rename = "sha256")]
    pub fingerprint: String,
    pub tags: Vec<String>,
    pub thumbnail_url: String,
}

impl ReconciledImage {
    /// Case-insensitive substring match against any tag.
    pub fn has_tag_matching(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        self.tags.iter().any(|t| t.to_lowercase().contains(&query))
    }
}

#[derive(Debug, Clone, Default)]
pub struct Reconciliation {
    /// In store row order.
    pub images: Vec<ReconciledImage>,
    /// Records with no file on disk.
    pub orphans: Vec<ImageRecord>,
}

/// Joins scan results with store records on fingerprint.
///
/// Records without a scanned file are reported as orphans and left out of
/// `images`. When several files share content, the last one scanned wins.
pub fn reconcile(scanned: &[ScannedFile], records: &[ImageRecord]) -> Reconciliation {
    let on_disk: HashMap<&str, &ScannedFile> = scanned
        .iter()
        .map(|file| (file.fingerprint.as_str(), file))
        .collect();

    let mut result = Reconciliation::default();

    for record in records {
        match on_disk.get(record.fingerprint.as_str()) {
            Some(file) => result.images.push(ReconciledImage {
                name: file.file_name.clone(),
                fingerprint: record.fingerprint.clone(),
                tags: record.tags.clone(),
                thumbnail_url: file.thumbnail_url(),
            }),
            None => {
                warn!(
                    "Image with SHA256 {} ({}) found in store but not on disk. Skipping.",
                    record.fingerprint, record.name
                );
                result.orphans.push(record.clone());
            }
        }
    }

    result
}

/// Narrows a listing to images with a tag containing `query`.
pub fn filter_by_tag(images: Vec<ReconciledImage>, query: &str) -> Vec<ReconciledImage> {
    if query.trim().is_empty() {
        return images;
    }
    images
        .into_iter()
        .filter(|image| image.has_tag_matching(query.trim()))
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub inserted: usize,
    pub renamed: usize,
    pub unchanged: usize,
    pub failed: usize,
}

/// Upserts every scanned file into the store.
///
/// A store error on one file is logged and counted; the pass carries on.
pub fn sync_store(db: &Database, scanned: &[ScannedFile]) -> SyncReport {
    let mut report = SyncReport::default();

    for file in scanned {
        match db.upsert_by_fingerprint(&file.fingerprint, &file.file_name) {
            Ok(UpsertOutcome::Inserted) => report.inserted += 1,
            Ok(UpsertOutcome::Renamed { .. }) => report.renamed += 1,
            Ok(UpsertOutcome::Unchanged) => report.unchanged += 1,
            Err(e) => {
                warn!("Failed to store {}: {}", file.file_name, e);
                report.failed += 1;
            }
        }
    }

    info!(
        "Store sync: {} inserted, {} renamed, {} unchanged, {} failed",
        report.inserted, report.renamed, report.unchanged, report.failed
    );
    report
}
