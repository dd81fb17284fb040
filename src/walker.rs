//! Depth-limited directory traversal.
//!
//! A [`Walker`] lists a directory, turns every visible child into an
//! [`Entry`] (attaching metadata when a collaborator is enabled) and hands it
//! to a visitor together with the directory it was found in. Siblings are
//! enriched and visited concurrently, in no particular order.
//!
//! Failures never stop a walk. A directory that cannot be listed counts as
//! having no children; a visitor that fails on one entry does not affect its
//! siblings. Both are logged and returned in the [`WalkSummary`].

use log::{debug, warn};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::config::VisibilityFilter;
use crate::context::Context;
use crate::entry::{Entry, EntryKind};
use crate::error::{Error, Result};
use crate::metadata::MetadataProviders;

/// Outcome of a walk: how many entries were visited and what went wrong.
#[derive(Debug, Default)]
pub struct WalkSummary {
    pub visited: usize,
    pub failures: Vec<Error>,
}

impl WalkSummary {
    pub fn merge(&mut self, other: WalkSummary) {
        self.visited += other.visited;
        self.failures.extend(other.failures);
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn failed(error: Error) -> Self {
        Self {
            visited: 0,
            failures: vec![error],
        }
    }
}

/// Traverses directories on behalf of the reorganizer and the cleaner.
pub struct Walker<'a> {
    filter: &'a VisibilityFilter,
    providers: MetadataProviders,
}

impl<'a> Walker<'a> {
    /// A walker that enriches entries with the collaborators enabled in `ctx`.
    pub fn new(ctx: &'a Context) -> Self {
        Self::with_providers(ctx, MetadataProviders::from_settings(&ctx.metadata))
    }

    /// A walker that never reads file contents, for counting and structure checks.
    pub fn plain(ctx: &'a Context) -> Self {
        Self::with_providers(ctx, MetadataProviders::none())
    }

    pub fn with_providers(ctx: &'a Context, providers: MetadataProviders) -> Self {
        Self {
            filter: &ctx.filter,
            providers,
        }
    }

    /// Visits every visible child of `dir`.
    ///
    /// The visitor receives the entry and `dir`. An error returned by the
    /// visitor is recorded as [`Error::Visitor`] against the entry's path.
    pub fn walk<F>(&self, dir: &Path, visitor: &F) -> WalkSummary
    where
        F: Fn(&Entry, &Path) -> Result<()> + Sync,
    {
        self.visit_level(dir, visitor).0
    }

    /// Visits `dir` like [`walk`](Self::walk), then descends `depth` more levels.
    ///
    /// With `depth == 0` only the children of `dir` are visited; with
    /// `depth == 1` their children are visited as well, and so on. A
    /// subdirectory is always visited before its own children are listed.
    /// Levels are processed one at a time from an explicit work list, and the
    /// directories of one level are walked concurrently.
    ///
    /// ```no_run
    /// use std::sync::atomic::{AtomicUsize, Ordering};
    /// use tagfold::context::Context;
    /// use tagfold::walker::Walker;
    ///
    /// let ctx = Context::new("/photos");
    /// let files = AtomicUsize::new(0);
    /// let summary = Walker::plain(&ctx).walk_deep(&ctx.root, 1, &|entry, _dir| {
    ///     if entry.is_file() {
    ///         files.fetch_add(1, Ordering::Relaxed);
    ///     }
    ///     Ok(())
    /// });
    /// println!("{} files, {} failures", files.into_inner(), summary.failures.len());
    /// ```
    pub fn walk_deep<F>(&self, dir: &Path, depth: u32, visitor: &F) -> WalkSummary
    where
        F: Fn(&Entry, &Path) -> Result<()> + Sync,
    {
        let mut summary = WalkSummary::default();
        let mut frontier = vec![dir.to_path_buf()];
        let mut remaining = depth;

        loop {
            let levels: Vec<(WalkSummary, Vec<PathBuf>)> = frontier
                .par_iter()
                .map(|d| self.visit_level(d, visitor))
                .collect();

            let mut next = Vec::new();
            for (level, children) in levels {
                summary.merge(level);
                next.extend(children);
            }

            if remaining == 0 || next.is_empty() {
                break;
            }
            remaining -= 1;
            frontier = next;
        }

        summary
    }

    /// Visits the children of `dir` and returns the child directories found.
    fn visit_level<F>(&self, dir: &Path, visitor: &F) -> (WalkSummary, Vec<PathBuf>)
    where
        F: Fn(&Entry, &Path) -> Result<()> + Sync,
    {
        let (children, mut summary) = match self.list(dir) {
            Ok(listing) => listing,
            Err(e) => {
                warn!("{}", e);
                return (WalkSummary::failed(e), Vec::new());
            }
        };

        let visited = AtomicUsize::new(0);
        let failures: Vec<Error> = children
            .par_iter()
            .filter_map(|(name, kind)| {
                let path = dir.join(name);
                let metadata = match kind {
                    EntryKind::File => self.providers.extract(&path),
                    EntryKind::Directory => None,
                };
                let entry = Entry::new(name.as_str(), *kind, metadata);

                visited.fetch_add(1, Ordering::Relaxed);
                match visitor(&entry, dir) {
                    Ok(()) => None,
                    Err(e) => {
                        let e = Error::visiting(&path, e);
                        warn!("{}", e);
                        Some(e)
                    }
                }
            })
            .collect();

        summary.visited += visited.into_inner();
        summary.failures.extend(failures);

        let subdirs = children
            .into_iter()
            .filter(|(_, kind)| *kind == EntryKind::Directory)
            .map(|(name, _)| dir.join(name))
            .collect();

        (summary, subdirs)
    }

    /// Lists the visible children of `dir` with their kinds.
    ///
    /// Entries that fail individually (unreadable, non-UTF-8 names) are
    /// skipped and reported in the returned summary.
    fn list(&self, dir: &Path) -> Result<(Vec<(String, EntryKind)>, WalkSummary)> {
        let read_dir = fs::read_dir(dir).map_err(|source| Error::Listing {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut summary = WalkSummary::default();
        let mut children = Vec::new();

        for dir_entry in read_dir {
            let dir_entry = match dir_entry {
                Ok(e) => e,
                Err(source) => {
                    let e = Error::Listing {
                        path: dir.to_path_buf(),
                        source,
                    };
                    warn!("{}", e);
                    summary.failures.push(e);
                    continue;
                }
            };

            let name = match dir_entry.file_name().into_string() {
                Ok(name) => name,
                Err(raw) => {
                    let e = Error::io(
                        dir.join(&raw),
                        std::io::Error::new(
                            std::io::ErrorKind::InvalidData,
                            "name is not valid UTF-8",
                        ),
                    );
                    warn!("{}", e);
                    summary.failures.push(e);
                    continue;
                }
            };

            if !self.filter.is_visible(&name) {
                debug!("Hidden by filters: {}", dir.join(&name).display());
                continue;
            }

            children.push((name, entry_kind(&dir_entry)));
        }

        Ok((children, summary))
    }
}

/// Classifies a listed child, following symlinks. Anything that is not a
/// directory, including a dangling link, is treated as a file.
fn entry_kind(dir_entry: &fs::DirEntry) -> EntryKind {
    let is_dir = match dir_entry.file_type() {
        Ok(ft) if ft.is_symlink() => fs::metadata(dir_entry.path())
            .map(|m| m.is_dir())
            .unwrap_or(false),
        Ok(ft) => ft.is_dir(),
        Err(_) => false,
    };
    if is_dir {
        EntryKind::Directory
    } else {
        EntryKind::File
    }
}
