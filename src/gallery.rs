//! Operations exposed to an outer layer (CLI or web handlers).
//!
//! Each call runs to completion on its own; nothing is scheduled in the
//! background and no call can be cancelled once started.

use std::path::Path;
use tracing::{info, warn};

use crate::config::Config;
use crate::db::{Database, ImageRecord};
use crate::error::Result;
use crate::reconcile::{self, ReconciledImage, SyncReport};
use crate::rename::{BulkRenamer, RenameReport, RepairReport};
use crate::scanner::{self, FfmpegThumbnailer, Scanner, Thumbnailer};

/// What the listing endpoint returns. Never fails: problems degrade to a
/// partial result with `diagnostics` filled in.
#[derive(Debug, Clone, Default)]
pub struct Listing {
    pub images: Vec<ReconciledImage>,
    pub orphans: Vec<ImageRecord>,
    pub diagnostics: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThumbnailReport {
    pub generated: usize,
    pub failed: usize,
}

pub struct Gallery {
    config: Config,
    db: Database,
    scanner: Scanner,
    thumbnailer: Box<dyn Thumbnailer>,
}

impl Gallery {
    /// Opens the store named in `config` and prepares its tables.
    pub fn open(config: Config) -> Result<Self> {
        let db = Database::open(config.db_path())?;
        db.initialize()?;
        let thumbnailer = Box::new(FfmpegThumbnailer::new(&config.thumbnails));
        Ok(Self::with_parts(config, db, thumbnailer))
    }

    pub fn with_parts(config: Config, db: Database, thumbnailer: Box<dyn Thumbnailer>) -> Self {
        let scanner = Scanner::from_config(&config);
        Self {
            config,
            db,
            scanner,
            thumbnailer,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    fn renamer(&self) -> BulkRenamer<'_> {
        BulkRenamer::new(&self.db, self.thumbnailer.as_ref(), self.config.rename)
    }

    /// Finishes leftover renames, then syncs the store with the disk.
    pub fn startup(&self) -> Result<(RepairReport, SyncReport)> {
        let repair = self.repair()?;
        let sync = self.sync()?;
        Ok((repair, sync))
    }

    pub fn sync(&self) -> Result<SyncReport> {
        let scanned = self.scanner.scan()?;
        Ok(reconcile::sync_store(&self.db, &scanned))
    }

    /// Images on disk with their tags, optionally narrowed to tags
    /// containing `tag_filter`.
    pub fn list(&self, tag_filter: Option<&str>) -> Listing {
        let mut listing = Listing::default();

        let scanned = match self.scanner.scan() {
            Ok(scanned) => scanned,
            Err(e) => {
                warn!("Listing without disk state: {}", e);
                listing.diagnostics.push(e.to_string());
                return listing;
            }
        };

        let records = match self.db.all_records() {
            Ok(records) => records,
            Err(e) => {
                warn!("Listing without store state: {}", e);
                listing.diagnostics.push(e.to_string());
                return listing;
            }
        };

        let merged = reconcile::reconcile(&scanned, &records);
        listing.images = match tag_filter {
            Some(query) => reconcile::filter_by_tag(merged.images, query),
            None => merged.images,
        };
        listing.orphans = merged.orphans;
        listing
    }

    pub fn get_tags(&self, fingerprint: &str) -> Result<Vec<String>> {
        self.db.get_tags(fingerprint)
    }

    pub fn add_tag(&self, fingerprint: &str, tag: &str) -> Result<bool> {
        self.db.add_tag(fingerprint, tag)
    }

    pub fn remove_tag(&self, fingerprint: &str, tag: &str) -> Result<bool> {
        self.db.remove_tag(fingerprint, tag)
    }

    /// Tags of whatever record matches the content of `path`.
    pub fn tags_for_file(&self, path: &Path) -> Result<Vec<String>> {
        let fingerprint = scanner::fingerprint(path)?;
        self.db.get_tags(&fingerprint)
    }

    pub fn rename_all(&self) -> Result<RenameReport> {
        self.renamer().rename_all(&self.scanner)
    }

    pub fn repair(&self) -> Result<RepairReport> {
        self.renamer().repair_pending(&self.scanner)
    }

    /// Deletes records whose file is no longer on disk. Returns what was removed.
    pub fn prune_orphans(&self) -> Result<Vec<ImageRecord>> {
        let scanned = self.scanner.scan()?;
        let records = self.db.all_records()?;
        let orphans = reconcile::reconcile(&scanned, &records).orphans;

        let mut removed = Vec::with_capacity(orphans.len());
        for orphan in orphans {
            match self.db.delete_by_fingerprint(&orphan.fingerprint) {
                Ok(_) => removed.push(orphan),
                Err(e) => warn!("Could not delete orphan {}: {}", orphan.fingerprint, e),
            }
        }

        info!("Pruned {} orphan records", removed.len());
        Ok(removed)
    }

    /// Renders thumbnails for scanned images that have none.
    pub fn generate_missing_thumbnails(&self) -> Result<ThumbnailReport> {
        let scanned = self.scanner.scan()?;
        let thumbnails = self.scanner.thumbnails();
        thumbnails.ensure()?;
        let mut report = ThumbnailReport::default();

        for file in scanned.iter().filter(|f| !f.thumbnail_present) {
            let source = self.scanner.root().join(&file.file_name);
            match self
                .thumbnailer
                .generate(&source, &thumbnails.path_for(&file.file_name))
            {
                Ok(()) => report.generated += 1,
                Err(e) => {
                    warn!("Thumbnail generation failed for {}: {}", file.file_name, e);
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_db;
    use crate::error::GalleryError;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::{tempdir, TempDir};

    struct StubThumbnailer;

    impl Thumbnailer for StubThumbnailer {
        fn generate(&self, source: &Path, target: &Path) -> Result<()> {
            if source.extension().is_some_and(|e| e == "webm") {
                return Err(GalleryError::ExternalTool {
                    tool: "stub".to_string(),
                    message: "no video support".to_string(),
                });
            }
            fs::write(target, b"thumb").map_err(|e| GalleryError::file_access(target, e))
        }
    }

    fn gallery(files: &[(&str, &str)]) -> (TempDir, Gallery) {
        let dir = tempdir().unwrap();
        for (name, contents) in files {
            fs::write(dir.path().join(name), contents).unwrap();
        }
        let mut config = Config::default();
        config.library.root = dir.path().to_path_buf();
        config.db_path = PathBuf::from(":memory:");
        let gallery = Gallery::with_parts(config, test_db(), Box::new(StubThumbnailer));
        (dir, gallery)
    }

    #[test]
    fn test_initial_sync_then_disk_rename() {
        let (dir, gallery) = gallery(&[("a.png", "X"), ("b.png", "Y")]);

        let (_, sync) = gallery.startup().unwrap();
        assert_eq!(sync.inserted, 2);

        fs::rename(dir.path().join("a.png"), dir.path().join("c.png")).unwrap();
        let sync = gallery.sync().unwrap();
        assert_eq!(sync.renamed, 1);
        assert_eq!(sync.inserted, 0);

        let records = gallery.db().all_records().unwrap();
        let mut names: Vec<_> = records.iter().map(|r| r.name.as_str()).collect();
        names.sort();
        assert_eq!(names, vec!["b.png", "c.png"]);
        assert!(records.iter().all(|r| r.tags.is_empty()));
    }

    #[test]
    fn test_add_tag_twice_returns_single_tag() {
        let (dir, gallery) = gallery(&[("a.png", "X")]);
        gallery.sync().unwrap();
        let fp = scanner::fingerprint(&dir.path().join("a.png")).unwrap();

        gallery.add_tag(&fp, "cat").unwrap();
        gallery.add_tag(&fp, "cat").unwrap();
        assert_eq!(gallery.get_tags(&fp).unwrap(), vec!["cat"]);
        assert_eq!(gallery.tags_for_file(&dir.path().join("a.png")).unwrap(), vec!["cat"]);
    }

    #[test]
    fn test_list_filters_and_reports_orphans() {
        let (dir, gallery) = gallery(&[("a.png", "X"), ("b.png", "Y")]);
        gallery.sync().unwrap();
        let fp_a = scanner::fingerprint(&dir.path().join("a.png")).unwrap();
        gallery.add_tag(&fp_a, "Sunset").unwrap();

        fs::remove_file(dir.path().join("b.png")).unwrap();

        let listing = gallery.list(None);
        assert_eq!(listing.images.len(), 1);
        assert_eq!(listing.images[0].name, "a.png");
        assert_eq!(listing.orphans.len(), 1);
        assert_eq!(listing.orphans[0].name, "b.png");
        assert!(listing.diagnostics.is_empty());

        assert_eq!(gallery.list(Some("sun")).images.len(), 1);
        assert!(gallery.list(Some("beach")).images.is_empty());

        let pruned = gallery.prune_orphans().unwrap();
        assert_eq!(pruned.len(), 1);
        assert_eq!(gallery.db().all_records().unwrap().len(), 1);
        assert!(gallery.list(None).orphans.is_empty());
    }

    #[test]
    fn test_list_degrades_when_root_is_gone() {
        let (dir, gallery) = gallery(&[("a.png", "X")]);
        gallery.sync().unwrap();
        drop(dir);

        let listing = gallery.list(None);
        assert!(listing.images.is_empty());
        assert_eq!(listing.diagnostics.len(), 1);
        assert!(matches!(gallery.sync(), Err(GalleryError::DirectoryAccess { .. })));
    }

    #[test]
    fn test_generate_missing_thumbnails() {
        let (dir, gallery) = gallery(&[("a.png", "X"), ("b.webm", "V"), ("c.gif", "G")]);
        fs::create_dir(dir.path().join("thumbnails")).unwrap();
        fs::write(dir.path().join("thumbnails/c.jpg"), b"existing").unwrap();

        let report = gallery.generate_missing_thumbnails().unwrap();
        assert_eq!(report, ThumbnailReport { generated: 1, failed: 1 });
        assert!(dir.path().join("thumbnails/a.jpg").exists());
        assert!(!dir.path().join("thumbnails/b.jpg").exists());
    }

    #[test]
    fn test_rename_all_keeps_tags_with_content() {
        let (dir, gallery) = gallery(&[("a.png", "X"), ("b.png", "Y")]);
        gallery.sync().unwrap();
        let fp_a = scanner::fingerprint(&dir.path().join("a.png")).unwrap();
        gallery.add_tag(&fp_a, "cat").unwrap();

        let report = gallery.rename_all().unwrap();
        assert!(report.is_clean());

        let listing = gallery.list(None);
        assert_eq!(listing.images.len(), 2);
        assert!(listing.orphans.is_empty());
        let tagged = listing.images.iter().find(|i| i.fingerprint == fp_a).unwrap();
        assert_eq!(tagged.name, report.renamed[0].new_name);
        assert_eq!(tagged.tags, vec!["cat"]);

        // Store names follow the disk, so a resync changes nothing
        let sync = gallery.sync().unwrap();
        assert_eq!(sync.unchanged, 2);
    }
}
