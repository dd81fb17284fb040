//! Moves tagged files between collection folders and their tag folders.
//!
//! The tree under the root has two meaningful levels:
//!
//! ```text
//! root/
//!   Album/                  collection folder
//!     a.jpg                 untagged file
//!     c__t=beach.jpg        tagged file at collection level
//!     beach/                tag folder
//!       b__t=beach.jpg
//! ```
//!
//! Every operation re-reads the tree, walks the collection folders
//! concurrently, moves files through the collision-safe [`Mutator`] and
//! returns a report. Runs that moved anything are journaled under the root.

use indicatif::ProgressBar;
use log::info;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::context::Context;
use crate::entry::Entry;
use crate::error::{Error, Result};
use crate::history::{Operation, OperationLog};
use crate::mutator::Mutator;
use crate::tag::{Tag, TagFilter, add_tag, extract_tag, remove_tag};
use crate::walker::{WalkSummary, Walker};

/// Literal that must be passed to [`Reorganizer::reset_tags`].
pub const CONFIRM_TOKEN: &str = "--yes";

/// What one reorganizer operation did.
#[derive(Debug, Default)]
pub struct ReorganizeReport {
    /// Files moved or renamed.
    pub moved: usize,
    /// Files looked at and left alone (untagged, filtered out, already correct).
    pub skipped: usize,
    pub failures: Vec<Error>,
    /// Every move performed, in completion order.
    pub journal: Vec<Operation>,
}

impl ReorganizeReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Result of [`Reorganizer::count_visible_pictures`].
#[derive(Debug, Default)]
pub struct PictureCount {
    pub total: usize,
    pub failures: Vec<Error>,
}

/// Shared accumulator for the concurrent visitors of one operation.
#[derive(Default)]
struct Tally {
    moved: AtomicUsize,
    skipped: AtomicUsize,
    journal: Mutex<Vec<Operation>>,
    nested: Mutex<WalkSummary>,
}

impl Tally {
    fn skip(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    fn record(&self, operation: Operation) {
        self.moved.fetch_add(1, Ordering::Relaxed);
        self.journal
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(operation);
    }

    fn absorb(&self, summary: WalkSummary) {
        self.nested
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .merge(summary);
    }

    fn into_report(self, mut summary: WalkSummary) -> ReorganizeReport {
        summary.merge(self.nested.into_inner().unwrap_or_else(|e| e.into_inner()));
        ReorganizeReport {
            moved: self.moved.into_inner(),
            skipped: self.skipped.into_inner(),
            failures: summary.failures,
            journal: self.journal.into_inner().unwrap_or_else(|e| e.into_inner()),
        }
    }
}

/// Runs the collection operations against one root.
pub struct Reorganizer<'a> {
    ctx: &'a Context,
    walker: Walker<'a>,
    plain: Walker<'a>,
    mutator: Mutator,
    progress: Option<ProgressBar>,
}

impl<'a> Reorganizer<'a> {
    pub fn new(ctx: &'a Context) -> Self {
        Self {
            ctx,
            walker: Walker::new(ctx),
            plain: Walker::plain(ctx),
            mutator: Mutator::new(),
            progress: None,
        }
    }

    /// Ticks `progress` once per collection folder processed.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Moves tagged files at collection level into the tag folder named by
    /// their tag. Names are left unchanged.
    ///
    /// Untagged files, and files whose tag `tags` does not admit, are skipped.
    /// Tag folders are not created: a file whose folder is missing is reported
    /// as [`Error::TagFolderMissing`] and stays where it is. A tag that is not
    /// a valid folder name (`.`, `..`) is reported as [`Error::InvalidTag`].
    pub fn move_pictures_to(&self, tags: &TagFilter) -> Result<ReorganizeReport> {
        self.ctx.ensure_root()?;
        let tally = Tally::default();

        let summary = self.for_each_collection(|collection| {
            let summary = self.walker.walk(collection, &|entry, dir| {
                if !entry.is_file() {
                    return Ok(());
                }
                let Some(tag) = extract_tag(&entry.name).filter(|t| tags.admits(t)) else {
                    tally.skip();
                    return Ok(());
                };
                // `.` and `..` would resolve outside the tag folder level.
                let tag = Tag::new(tag)?;

                let folder = dir.join(tag.as_str());
                if !folder.is_dir() {
                    return Err(Error::TagFolderMissing(folder));
                }
                self.relocate(&tally, entry, dir, &folder.join(&entry.name))
            });
            tally.absorb(summary);
        });

        self.finish("move-to", tally.into_report(summary))
    }

    /// Moves files out of tag folders back into their collection folder,
    /// marking each with the tag named by the folder it came from.
    ///
    /// Only tag folders admitted by `tags` are emptied.
    pub fn move_pictures_fro(&self, tags: &TagFilter) -> Result<ReorganizeReport> {
        self.ctx.ensure_root()?;
        let tally = Tally::default();

        let summary = self.for_each_collection(|collection| {
            let summary = self.walker.walk(collection, &|entry, dir| {
                if !entry.is_dir() || !tags.admits(&entry.name) {
                    return Ok(());
                }
                let tag = Tag::new(entry.name.as_str())?;
                let folder = entry.path_in(dir);

                let inner = self.walker.walk(&folder, &|file, folder_dir| {
                    if !file.is_file() {
                        return Ok(());
                    }
                    self.relocate(&tally, file, folder_dir, &dir.join(add_tag(&file.name, &tag)))
                });
                tally.absorb(inner);
                Ok(())
            });
            tally.absorb(summary);
        });

        self.finish("move-fro", tally.into_report(summary))
    }

    /// Makes every marker agree with where its file lives.
    ///
    /// Files at collection level lose their marker; files inside a tag folder
    /// get the folder's tag. Files whose name is already right are not
    /// touched. Nothing happens unless `confirm` is [`CONFIRM_TOKEN`].
    pub fn reset_tags(&self, confirm: &str) -> Result<ReorganizeReport> {
        if confirm != CONFIRM_TOKEN {
            return Err(Error::ConfirmationRequired {
                operation: "reset-tags",
                token: CONFIRM_TOKEN,
            });
        }
        self.ctx.ensure_root()?;
        let tally = Tally::default();

        let summary = self.for_each_collection(|collection| {
            let summary = self.walker.walk(collection, &|entry, dir| {
                if entry.is_file() {
                    return self.rename_if_changed(&tally, entry, dir, remove_tag(&entry.name));
                }

                let tag = Tag::new(entry.name.as_str())?;
                let inner = self.walker.walk(&entry.path_in(dir), &|file, folder_dir| {
                    if !file.is_file() {
                        return Ok(());
                    }
                    self.rename_if_changed(&tally, file, folder_dir, add_tag(&file.name, &tag))
                });
                tally.absorb(inner);
                Ok(())
            });
            tally.absorb(summary);
        });

        self.finish("reset-tags", tally.into_report(summary))
    }

    /// Counts the files in collection folders and in their tag folders.
    ///
    /// Nothing deeper than a tag folder is counted, and no file is read.
    pub fn count_visible_pictures(&self) -> Result<PictureCount> {
        self.ctx.ensure_root()?;
        let total = AtomicUsize::new(0);
        let nested = Mutex::new(WalkSummary::default());

        let mut summary = self.for_each_collection(|collection| {
            let summary = self.plain.walk_deep(collection, 1, &|entry, _| {
                if entry.is_file() {
                    total.fetch_add(1, Ordering::Relaxed);
                }
                Ok(())
            });
            nested
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .merge(summary);
        });
        summary.merge(nested.into_inner().unwrap_or_else(|e| e.into_inner()));

        let total = total.into_inner();
        info!("{} visible pictures under {}", total, self.ctx.root.display());
        Ok(PictureCount {
            total,
            failures: summary.failures,
        })
    }

    /// Calls `per_collection` for every collection folder under the root,
    /// concurrently. Files at root level are ignored.
    fn for_each_collection<F>(&self, per_collection: F) -> WalkSummary
    where
        F: Fn(&Path) + Sync,
    {
        self.plain.walk(&self.ctx.root, &|entry, dir| {
            if entry.is_dir() {
                if let Some(pb) = &self.progress {
                    pb.inc_length(1);
                }
                per_collection(&entry.path_in(dir));
                if let Some(pb) = &self.progress {
                    pb.inc(1);
                }
            }
            Ok(())
        })
    }

    fn relocate(&self, tally: &Tally, entry: &Entry, dir: &Path, target: &Path) -> Result<()> {
        let from = entry.path_in(dir);
        let name = self.mutator.safe_rename(&from, target, false)?;
        let to = target.with_file_name(name);
        if to == from {
            tally.skip();
        } else {
            tally.record(Operation::new(from, to));
        }
        Ok(())
    }

    fn rename_if_changed(&self, tally: &Tally, entry: &Entry, dir: &Path, renamed: String) -> Result<()> {
        if renamed == entry.name {
            tally.skip();
            return Ok(());
        }
        self.relocate(tally, entry, dir, &dir.join(renamed))
    }

    /// Journals the run and logs its outcome.
    fn finish(&self, operation: &str, mut report: ReorganizeReport) -> Result<ReorganizeReport> {
        if !report.journal.is_empty() {
            let mut log = OperationLog::new(&self.ctx.root, operation);
            for op in &report.journal {
                log.add_operation(op.clone());
            }
            if let Err(e) = log.save(&self.ctx.root) {
                log::warn!("Could not save history: {}", e);
                report.failures.push(e);
            }
        }

        info!(
            "{}: {} moved, {} skipped, {} failed",
            operation,
            report.moved,
            report.skipped,
            report.failures.len()
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn album_with(files: &[&str], folders: &[&str]) -> TempDir {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let album = temp_dir.path().join("Album");
        fs::create_dir(&album).unwrap();
        for folder in folders {
            fs::create_dir_all(album.join(folder)).unwrap();
        }
        for file in files {
            fs::write(album.join(file), *file).unwrap();
        }
        temp_dir
    }

    #[test]
    fn test_move_to_skips_untagged_and_filtered() {
        let temp_dir = album_with(&["a.jpg", "b__t=city.jpg", "c__t=beach.jpg"], &["beach", "city"]);
        let ctx = Context::new(temp_dir.path());
        let album = temp_dir.path().join("Album");

        let report = Reorganizer::new(&ctx)
            .move_pictures_to(&TagFilter::only(["beach"]).unwrap())
            .unwrap();

        assert_eq!(report.moved, 1);
        assert_eq!(report.skipped, 2);
        assert!(album.join("beach").join("c__t=beach.jpg").exists());
        assert!(album.join("b__t=city.jpg").exists());
        assert!(album.join("a.jpg").exists());
    }

    #[test]
    fn test_move_to_reports_missing_tag_folder() {
        let temp_dir = album_with(&["c__t=forest.jpg"], &[]);
        let ctx = Context::new(temp_dir.path());

        let report = Reorganizer::new(&ctx)
            .move_pictures_to(&TagFilter::any())
            .unwrap();

        assert_eq!(report.moved, 0);
        assert_eq!(report.failures.len(), 1);
        assert!(matches!(
            report.failures[0].root_cause(),
            Error::TagFolderMissing(_)
        ));
        assert!(temp_dir.path().join("Album").join("c__t=forest.jpg").exists());
        assert!(!temp_dir.path().join("Album").join("forest").exists());
    }

    #[test]
    fn test_move_to_rejects_relative_directory_tags() {
        let temp_dir = album_with(&["x__t=...jpg", "y__t=..jpg"], &[]);
        let ctx = Context::new(temp_dir.path());
        let album = temp_dir.path().join("Album");

        let report = Reorganizer::new(&ctx)
            .move_pictures_to(&TagFilter::any())
            .unwrap();

        assert_eq!(report.moved, 0);
        assert_eq!(report.failures.len(), 2);
        for failure in &report.failures {
            assert!(matches!(failure.root_cause(), Error::InvalidTag { .. }));
        }
        assert!(album.join("x__t=...jpg").exists());
        assert!(album.join("y__t=..jpg").exists());
        assert!(!temp_dir.path().join("x__t=...jpg").exists());
        assert!(report.journal.is_empty());
    }

    #[test]
    fn test_move_fro_retags_from_folder_name() {
        // A file whose marker drifted from its folder gets the folder's tag.
        let temp_dir = album_with(&["beach/b__t=city.jpg", "beach/plain.jpg"], &["beach"]);
        let ctx = Context::new(temp_dir.path());
        let album = temp_dir.path().join("Album");

        let report = Reorganizer::new(&ctx)
            .move_pictures_fro(&TagFilter::any())
            .unwrap();

        assert_eq!(report.moved, 2);
        assert!(album.join("b__t=beach.jpg").exists());
        assert!(album.join("plain__t=beach.jpg").exists());
        assert_eq!(fs::read_dir(album.join("beach")).unwrap().count(), 0);
        assert_eq!(report.journal.len(), 2);
    }

    #[test]
    fn test_reset_tags_requires_confirmation() {
        let temp_dir = album_with(&["a__t=beach.jpg"], &[]);
        let ctx = Context::new(temp_dir.path());

        let result = Reorganizer::new(&ctx).reset_tags("yes");

        assert!(matches!(result, Err(Error::ConfirmationRequired { .. })));
        assert!(temp_dir.path().join("Album").join("a__t=beach.jpg").exists());
    }

    #[test]
    fn test_reset_tags_strips_and_repairs() {
        let temp_dir = album_with(
            &["a__t=beach.jpg", "plain.jpg", "city/b__t=beach.jpg", "city/c__t=city.jpg"],
            &["city"],
        );
        let ctx = Context::new(temp_dir.path());
        let album = temp_dir.path().join("Album");

        let report = Reorganizer::new(&ctx).reset_tags(CONFIRM_TOKEN).unwrap();

        assert_eq!(report.moved, 2);
        assert_eq!(report.skipped, 2);
        assert!(album.join("a.jpg").exists());
        assert!(album.join("plain.jpg").exists());
        assert!(album.join("city").join("b__t=city.jpg").exists());
        assert!(album.join("city").join("c__t=city.jpg").exists());
    }

    #[test]
    fn test_reset_tags_is_stable_after_repair() {
        let temp_dir = album_with(&["beach/b__t=beach.jpg", "beach/b__t=city.jpg"], &["beach"]);
        let ctx = Context::new(temp_dir.path());
        let beach = temp_dir.path().join("Album").join("beach");

        let first = Reorganizer::new(&ctx).reset_tags(CONFIRM_TOKEN).unwrap();
        assert_eq!(first.moved, 1);
        assert!(beach.join("b__t=beach (1).jpg").exists());

        let second = Reorganizer::new(&ctx).reset_tags(CONFIRM_TOKEN).unwrap();
        assert_eq!(second.moved, 0);
        assert_eq!(second.skipped, 2);
        assert!(second.journal.is_empty());
        assert!(beach.join("b__t=beach.jpg").exists());
        assert!(beach.join("b__t=beach (1).jpg").exists());
        assert!(!beach.join("b__t=beach (2).jpg").exists());
    }

    #[test]
    fn test_count_visible_pictures_two_levels() {
        let temp_dir = album_with(
            &["a.jpg", "b.jpg", "beach/c.jpg", "beach/deep/d.jpg", ".hidden.jpg"],
            &["beach/deep"],
        );
        fs::write(temp_dir.path().join("root_level.jpg"), "x").unwrap();
        let ctx = Context::new(temp_dir.path());

        let count = Reorganizer::new(&ctx).count_visible_pictures().unwrap();

        assert_eq!(count.total, 3);
        assert!(count.failures.is_empty());
    }

    #[test]
    fn test_missing_root_is_fatal() {
        let ctx = Context::new("/non/existent/root");
        let result = Reorganizer::new(&ctx).move_pictures_to(&TagFilter::any());
        assert!(matches!(result, Err(Error::MissingRoot(_))));
    }
}
