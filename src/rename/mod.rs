//! Bulk renaming of images to fabricated, chronologically ordered names.
//!
//! Each image has three artifacts: the file, its thumbnail and its store
//! record. They are renamed one after another with no transaction around
//! them. A marker in `pending_renames` tracks each image until all three
//! agree, and `repair_pending` finishes whatever an earlier run left behind.

pub mod naming;

use chrono::{DateTime, Utc};
use rand::Rng;
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::config::RenameConfig;
use crate::db::{Database, PendingRename};
use crate::error::{GalleryError, Result};
use crate::scanner::{Scanner, ThumbnailDir, Thumbnailer};

pub use naming::{plan_renames, PlannedRename, TimeWindow};

/// Which artifact a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenameStep {
    File,
    Thumbnail,
    Store,
}

impl fmt::Display for RenameStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RenameStep::File => "file",
            RenameStep::Thumbnail => "thumbnail",
            RenameStep::Store => "store",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct RenameFailure {
    pub file: String,
    pub step: RenameStep,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenamedFile {
    pub old_name: String,
    pub new_name: String,
}

/// Outcome of a bulk rename. Failures are soft; each one concerns a
/// single step of a single file.
#[derive(Debug, Clone, Default)]
pub struct RenameReport {
    /// Files whose image was moved, in scan order.
    pub renamed: Vec<RenamedFile>,
    pub unchanged: usize,
    pub failures: Vec<RenameFailure>,
}

impl RenameReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn fail(&mut self, file: &str, step: RenameStep, error: impl fmt::Display) {
        warn!("Rename of {} failed at {} step: {}", file, step, error);
        self.failures.push(RenameFailure {
            file: file.to_string(),
            step,
            message: error.to_string(),
        });
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepairReport {
    /// Markers whose remaining steps were finished.
    pub completed: usize,
    /// Markers dropped because the image never moved or no longer exists.
    pub discarded: usize,
    pub still_pending: usize,
}

pub struct BulkRenamer<'a> {
    db: &'a Database,
    thumbnailer: &'a dyn Thumbnailer,
    config: RenameConfig,
}

impl<'a> BulkRenamer<'a> {
    pub fn new(db: &'a Database, thumbnailer: &'a dyn Thumbnailer, config: RenameConfig) -> Self {
        Self {
            db,
            thumbnailer,
            config,
        }
    }

    pub fn rename_all(&self, scanner: &Scanner) -> Result<RenameReport> {
        self.rename_all_with(scanner, &mut rand::rng(), Utc::now())
    }

    /// Renames every scanned image. Only a root that cannot be scanned is
    /// an error; everything else ends up in the report.
    pub fn rename_all_with<R: Rng + ?Sized>(
        &self,
        scanner: &Scanner,
        rng: &mut R,
        now: DateTime<Utc>,
    ) -> Result<RenameReport> {
        let scanned = scanner.scan()?;
        let window = TimeWindow::from_config(&self.config, now);
        let plans = plan_renames(&scanned, &window, rng);

        let report = self.apply(scanner, &plans);
        info!(
            "Bulk rename: {} renamed, {} unchanged, {} step failures",
            report.renamed.len(),
            report.unchanged,
            report.failures.len()
        );
        Ok(report)
    }

    pub(crate) fn apply(&self, scanner: &Scanner, plans: &[PlannedRename]) -> RenameReport {
        let mut report = RenameReport::default();

        if let Err(e) = scanner.thumbnails().ensure() {
            warn!("Thumbnail directory unavailable: {}", e);
        }

        for plan in plans {
            if plan.is_noop() {
                report.unchanged += 1;
                continue;
            }
            self.rename_one(scanner.root(), scanner.thumbnails(), plan, &mut report);
        }

        report
    }

    fn rename_one(
        &self,
        root: &Path,
        thumbnails: &ThumbnailDir,
        plan: &PlannedRename,
        report: &mut RenameReport,
    ) {
        let old_path = root.join(&plan.old_name);
        let new_path = root.join(&plan.new_name);

        if new_path.exists() {
            report.fail(
                &plan.old_name,
                RenameStep::File,
                format!("{} already exists", plan.new_name),
            );
            return;
        }

        let marker = match self.db.record_pending_rename(&plan.old_name, &plan.new_name) {
            Ok(id) => Some(id),
            Err(e) => {
                warn!("Could not record pending rename for {}: {}", plan.old_name, e);
                None
            }
        };

        if let Err(e) = fs::rename(&old_path, &new_path) {
            report.fail(&plan.old_name, RenameStep::File, e);
            // Nothing moved, so there is nothing to repair
            if let Some(id) = marker {
                self.note(self.db.clear_pending_rename(id));
            }
            return;
        }
        debug!("Renamed {} -> {}", plan.old_name, plan.new_name);

        let mut complete = true;

        match move_thumbnail(self.thumbnailer, thumbnails, &plan.old_name, &plan.new_name, &new_path) {
            Ok(()) => {
                if let Some(id) = marker {
                    self.note(self.db.mark_thumbnail_done(id));
                }
            }
            Err(e) => {
                complete = false;
                if let Some(id) = marker {
                    self.note(self.db.set_pending_error(id, &e.to_string()));
                }
                report.fail(&plan.old_name, RenameStep::Thumbnail, e);
            }
        }

        match self.db.rename_record(&plan.old_name, &plan.new_name) {
            Ok(updated) => {
                if updated == 0 {
                    debug!("No store record named {}", plan.old_name);
                }
                if let Some(id) = marker {
                    self.note(self.db.mark_store_done(id));
                }
            }
            Err(e) => {
                complete = false;
                if let Some(id) = marker {
                    self.note(self.db.set_pending_error(id, &e.to_string()));
                }
                report.fail(&plan.old_name, RenameStep::Store, e);
            }
        }

        if complete {
            if let Some(id) = marker {
                self.note(self.db.clear_pending_rename(id));
            }
        }

        report.renamed.push(RenamedFile {
            old_name: plan.old_name.clone(),
            new_name: plan.new_name.clone(),
        });
    }

    /// Finishes renames recorded by an earlier, interrupted or partly
    /// failed run.
    pub fn repair_pending(&self, scanner: &Scanner) -> Result<RepairReport> {
        let mut report = RepairReport::default();

        for pending in self.db.pending_renames()? {
            self.repair_one(scanner.root(), scanner.thumbnails(), &pending, &mut report);
        }

        if report != RepairReport::default() {
            info!(
                "Rename repair: {} completed, {} discarded, {} still pending",
                report.completed, report.discarded, report.still_pending
            );
        }
        Ok(report)
    }

    fn repair_one(
        &self,
        root: &Path,
        thumbnails: &ThumbnailDir,
        pending: &PendingRename,
        report: &mut RepairReport,
    ) {
        let old_path = root.join(&pending.old_name);
        let new_path = root.join(&pending.new_name);

        if !new_path.exists() {
            if old_path.exists() {
                debug!("{} was never moved; dropping its marker", pending.old_name);
            } else {
                warn!(
                    "{} is gone under both {} and {}; dropping its marker",
                    pending.old_name, pending.old_name, pending.new_name
                );
            }
            self.note(self.db.clear_pending_rename(pending.id));
            report.discarded += 1;
            return;
        }

        let mut complete = true;

        if !pending.thumbnail_done {
            match move_thumbnail(
                self.thumbnailer,
                thumbnails,
                &pending.old_name,
                &pending.new_name,
                &new_path,
            ) {
                Ok(()) => self.note(self.db.mark_thumbnail_done(pending.id)),
                Err(e) => {
                    complete = false;
                    warn!("Thumbnail repair for {} failed: {}", pending.new_name, e);
                    self.note(self.db.set_pending_error(pending.id, &e.to_string()));
                }
            }
        }

        if !pending.store_done {
            match self.db.rename_record(&pending.old_name, &pending.new_name) {
                Ok(_) => self.note(self.db.mark_store_done(pending.id)),
                Err(e) => {
                    complete = false;
                    warn!("Store repair for {} failed: {}", pending.new_name, e);
                    self.note(self.db.set_pending_error(pending.id, &e.to_string()));
                }
            }
        }

        if complete {
            self.note(self.db.clear_pending_rename(pending.id));
            report.completed += 1;
        } else {
            report.still_pending += 1;
        }
    }

    /// Marker bookkeeping never fails a rename.
    fn note(&self, result: Result<()>) {
        if let Err(e) = result {
            warn!("Could not update pending rename marker: {}", e);
        }
    }
}

/// Carries the thumbnail over to the new name, rendering a fresh one when
/// the old thumbnail does not exist.
fn move_thumbnail(
    thumbnailer: &dyn Thumbnailer,
    thumbnails: &ThumbnailDir,
    old_name: &str,
    new_name: &str,
    new_path: &Path,
) -> Result<()> {
    let old_thumb = thumbnails.path_for(old_name);
    let new_thumb = thumbnails.path_for(new_name);

    if old_thumb.exists() {
        return fs::rename(&old_thumb, &new_thumb).map_err(|e| GalleryError::file_access(&old_thumb, e));
    }
    if new_thumb.exists() {
        return Ok(());
    }
    thumbnailer.generate(new_path, &new_thumb)
}
