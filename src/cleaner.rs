//! Structural cleanup of the directories under the root.
//!
//! `flatten` collapses directories whose only entry is another directory;
//! `clean` removes empty directories. Neither touches files, and neither is
//! journaled.

use log::{debug, info, warn};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::context::Context;
use crate::entry::Entry;
use crate::error::{Error, Result};
use crate::mutator::Mutator;
use crate::walker::{WalkSummary, Walker};

#[derive(Debug, Default)]
pub struct FlattenReport {
    /// Directories of the root that absorbed their only subdirectory, once per collapse.
    pub collapsed: Vec<PathBuf>,
    pub passes: usize,
    pub failures: Vec<Error>,
    /// Set when the staging directory could not be removed because content
    /// was left behind in it.
    pub staging_left: Option<PathBuf>,
}

impl FlattenReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.staging_left.is_none()
    }
}

#[derive(Debug, Default)]
pub struct CleanReport {
    pub removed: Vec<PathBuf>,
    pub failures: Vec<Error>,
}

impl CleanReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct Cleaner<'a> {
    ctx: &'a Context,
    walker: Walker<'a>,
    mutator: Mutator,
}

impl<'a> Cleaner<'a> {
    pub fn new(ctx: &'a Context) -> Self {
        Self {
            ctx,
            walker: Walker::plain(ctx),
            mutator: Mutator::new(),
        }
    }

    /// Collapses single-child directory chains directly under the root.
    ///
    /// A directory `D` whose only entry is a directory `N` ends up holding
    /// `N`'s content under `D`'s name: `X/Y/file.txt` becomes `X/file.txt`.
    /// `N` is parked in the staging directory while `D` is removed. Passes
    /// repeat until one collapses nothing, so `X/Y/Z/file.txt` also ends up as
    /// `X/file.txt`.
    ///
    /// A `D` that cannot be removed is reported as
    /// [`Error::StructuralCleanupPartialFailure`]; its content stays in the
    /// staging directory, which is then kept and named in the report.
    ///
    /// # Errors
    ///
    /// Fails up front if the root is missing or the staging directory cannot
    /// be created.
    pub fn flatten(&self) -> Result<FlattenReport> {
        self.ctx.ensure_root()?;
        let staging = self.ctx.staging_dir();
        fs::create_dir_all(&staging).map_err(|e| Error::io(&staging, e))?;

        let mut report = FlattenReport::default();
        let mut given_up = HashSet::new();

        loop {
            report.passes += 1;
            let (collapsed, summary) = self.flatten_pass(&staging, &given_up);
            given_up.extend(
                summary
                    .failures
                    .iter()
                    .filter_map(|f| f.path().map(Path::to_path_buf)),
            );
            report.failures.extend(summary.failures);

            if collapsed.is_empty() {
                break;
            }
            report.collapsed.extend(collapsed);
        }

        if let Err(e) = fs::remove_dir(&staging) {
            warn!("Staging directory {} was kept: {}", staging.display(), e);
            report.staging_left = Some(staging);
        }

        info!(
            "flatten: {} collapsed in {} passes, {} failed",
            report.collapsed.len(),
            report.passes,
            report.failures.len()
        );
        Ok(report)
    }

    fn flatten_pass(&self, staging: &Path, given_up: &HashSet<PathBuf>) -> (Vec<PathBuf>, WalkSummary) {
        let collapsed = Mutex::new(Vec::new());

        let summary = self.walker.walk(&self.ctx.root, &|entry, root| {
            if !entry.is_dir() {
                return Ok(());
            }
            let outer = entry.path_in(root);
            if outer == staging || given_up.contains(&outer) {
                return Ok(());
            }
            let Some(nested) = only_child_dir(&outer)? else {
                return Ok(());
            };

            let parked_name = self
                .mutator
                .safe_rename(&nested, &staging.join(&entry.name), true)?;
            let parked = staging.join(parked_name);

            fs::remove_dir(&outer).map_err(|source| Error::StructuralCleanupPartialFailure {
                path: outer.clone(),
                source,
            })?;
            self.mutator.safe_rename(&parked, &outer, true)?;

            debug!("Collapsed {} into {}", nested.display(), outer.display());
            collapsed
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(outer);
            Ok(())
        });

        (
            collapsed.into_inner().unwrap_or_else(|e| e.into_inner()),
            summary,
        )
    }

    /// Removes empty directories.
    ///
    /// Only the children of the root are considered unless `deep` is set, in
    /// which case every directory within the configured depth is. Emptiness is
    /// judged before anything is removed, so a parent left empty by this run
    /// stays until the next one.
    pub fn clean(&self, deep: bool) -> Result<CleanReport> {
        self.ctx.ensure_root()?;
        let empties = Mutex::new(Vec::new());

        let visitor = |entry: &Entry, dir: &Path| -> Result<()> {
            if entry.is_dir() {
                let path = entry.path_in(dir);
                if is_empty_dir(&path)? {
                    empties
                        .lock()
                        .unwrap_or_else(|e| e.into_inner())
                        .push(path);
                }
            }
            Ok(())
        };

        let summary = if deep {
            self.walker.walk_deep(&self.ctx.root, self.ctx.depth, &visitor)
        } else {
            self.walker.walk(&self.ctx.root, &visitor)
        };

        let mut report = CleanReport {
            removed: Vec::new(),
            failures: summary.failures,
        };
        for path in empties.into_inner().unwrap_or_else(|e| e.into_inner()) {
            match fs::remove_dir(&path) {
                Ok(()) => {
                    debug!("Removed empty directory {}", path.display());
                    report.removed.push(path);
                }
                Err(e) => {
                    let e = Error::io(&path, e);
                    warn!("{}", e);
                    report.failures.push(e);
                }
            }
        }

        info!(
            "clean: {} removed, {} failed",
            report.removed.len(),
            report.failures.len()
        );
        Ok(report)
    }
}

/// The only entry of `dir` when that entry is a directory.
///
/// Hidden entries count: a directory holding `.DS_Store` next to a
/// subdirectory is not a single-child chain.
fn only_child_dir(dir: &Path) -> Result<Option<PathBuf>> {
    let mut children = fs::read_dir(dir).map_err(|e| Error::io(dir, e))?;
    let Some(first) = children.next() else {
        return Ok(None);
    };
    if children.next().is_some() {
        return Ok(None);
    }

    let first = first.map_err(|e| Error::io(dir, e))?;
    let is_dir = first.file_type().map_err(|e| Error::io(first.path(), e))?.is_dir();
    Ok(is_dir.then(|| first.path()))
}

fn is_empty_dir(dir: &Path) -> Result<bool> {
    let mut children = fs::read_dir(dir).map_err(|e| Error::io(dir, e))?;
    Ok(children.next().is_none())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    /// Keeps the staging area inside the temp dir: root is `<tmp>/root`.
    fn rooted() -> (TempDir, Context) {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path().join("root");
        fs::create_dir(&root).unwrap();
        let ctx = Context::new(root);
        (temp_dir, ctx)
    }

    #[test]
    fn test_flatten_collapses_single_child() {
        let (_tmp, ctx) = rooted();
        fs::create_dir_all(ctx.root.join("X").join("Y")).unwrap();
        fs::write(ctx.root.join("X").join("Y").join("file.txt"), "data").unwrap();

        let report = Cleaner::new(&ctx).flatten().unwrap();

        assert!(report.is_clean());
        assert_eq!(report.collapsed, vec![ctx.root.join("X")]);
        assert_eq!(
            fs::read_to_string(ctx.root.join("X").join("file.txt")).unwrap(),
            "data"
        );
        assert!(!ctx.root.join("X").join("Y").exists());
        assert!(!ctx.staging_dir().exists());
    }

    #[test]
    fn test_flatten_reaches_fixpoint_on_deep_chains() {
        let (_tmp, ctx) = rooted();
        let deep = ctx.root.join("X").join("Y").join("Z");
        fs::create_dir_all(&deep).unwrap();
        fs::write(deep.join("file.txt"), "data").unwrap();

        let report = Cleaner::new(&ctx).flatten().unwrap();

        assert_eq!(report.collapsed.len(), 2);
        assert_eq!(report.passes, 3);
        assert!(ctx.root.join("X").join("file.txt").exists());
        assert_eq!(fs::read_dir(ctx.root.join("X")).unwrap().count(), 1);
    }

    #[test]
    fn test_flatten_leaves_mixed_directories_alone() {
        let (_tmp, ctx) = rooted();
        fs::create_dir_all(ctx.root.join("Mixed").join("Sub")).unwrap();
        fs::write(ctx.root.join("Mixed").join("loose.jpg"), "x").unwrap();
        fs::create_dir_all(ctx.root.join("Two").join("A")).unwrap();
        fs::create_dir_all(ctx.root.join("Two").join("B")).unwrap();

        let report = Cleaner::new(&ctx).flatten().unwrap();

        assert!(report.collapsed.is_empty());
        assert!(ctx.root.join("Mixed").join("Sub").is_dir());
        assert!(ctx.root.join("Two").join("A").is_dir());
    }

    #[test]
    fn test_flatten_reports_leftover_staging() {
        let (_tmp, ctx) = rooted();
        fs::create_dir_all(ctx.staging_dir()).unwrap();
        fs::write(ctx.staging_dir().join("leftover.txt"), "x").unwrap();

        let report = Cleaner::new(&ctx).flatten().unwrap();

        assert_eq!(report.staging_left, Some(ctx.staging_dir()));
        assert!(!report.is_clean());
    }

    #[cfg(unix)]
    #[test]
    fn test_flatten_keeps_staged_content_when_outer_cannot_be_removed() {
        use std::os::unix::fs::PermissionsExt;

        let (_tmp, ctx) = rooted();
        fs::create_dir_all(ctx.root.join("X").join("Y")).unwrap();
        fs::write(ctx.root.join("X").join("Y").join("file.txt"), "data").unwrap();

        // A read-only root lets Y leave X but keeps X from being removed.
        fs::set_permissions(&ctx.root, fs::Permissions::from_mode(0o555)).unwrap();
        if fs::write(ctx.root.join("writable"), "x").is_ok() {
            // Permission bits do not bind this user (root).
            fs::set_permissions(&ctx.root, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let report = Cleaner::new(&ctx).flatten().unwrap();
        fs::set_permissions(&ctx.root, fs::Permissions::from_mode(0o755)).unwrap();

        assert!(report.collapsed.is_empty());
        assert_eq!(report.failures.len(), 1);
        assert!(matches!(
            report.failures[0].root_cause(),
            Error::StructuralCleanupPartialFailure { .. }
        ));
        assert_eq!(report.staging_left, Some(ctx.staging_dir()));
        let parked = ctx.staging_dir().join("X");
        assert!(parked.is_dir());
        assert_eq!(fs::read_to_string(parked.join("file.txt")).unwrap(), "data");
        assert!(ctx.root.join("X").is_dir());
    }

    #[test]
    fn test_clean_removes_empty_children_only() {
        let (_tmp, ctx) = rooted();
        fs::create_dir(ctx.root.join("Z")).unwrap();
        fs::create_dir_all(ctx.root.join("Full")).unwrap();
        fs::write(ctx.root.join("Full").join("a.jpg"), "x").unwrap();

        let report = Cleaner::new(&ctx).clean(false).unwrap();

        assert_eq!(report.removed, vec![ctx.root.join("Z")]);
        assert!(!ctx.root.join("Z").exists());
        assert!(ctx.root.join("Full").exists());
    }

    #[test]
    fn test_clean_is_single_pass() {
        let (_tmp, ctx) = rooted();
        fs::create_dir_all(ctx.root.join("Outer").join("Inner")).unwrap();

        let cleaner = Cleaner::new(&ctx);
        let first = cleaner.clean(true).unwrap();
        assert_eq!(first.removed, vec![ctx.root.join("Outer").join("Inner")]);
        assert!(ctx.root.join("Outer").exists());

        let second = cleaner.clean(true).unwrap();
        assert_eq!(second.removed, vec![ctx.root.join("Outer")]);
    }

    #[test]
    fn test_shallow_clean_ignores_nested_empties() {
        let (_tmp, ctx) = rooted();
        fs::create_dir_all(ctx.root.join("Outer").join("Inner")).unwrap();

        let report = Cleaner::new(&ctx).clean(false).unwrap();

        assert!(report.removed.is_empty());
        assert!(ctx.root.join("Outer").join("Inner").exists());
    }
}
