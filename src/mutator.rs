//! Collision-safe rename and move.
//!
//! Every mutation tagfold performs on the tree goes through [`Mutator::safe_rename`].
//! An occupied destination is never overwritten: the requested name gets a
//! numeric suffix (`photo (1).jpg`, `photo (2).jpg`, ...) instead, up to
//! [`MAX_COLLISION_SUFFIX`].
use dashmap::DashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use crate::entry::split_name;
use crate::error::{Error, Result};

/// Highest numeric suffix tried before giving up on a destination.
pub const MAX_COLLISION_SUFFIX: u32 = 99;

/// Performs renames and moves without overwriting.
///
/// Checking for a free name and renaming into it is not atomic, so the mutator
/// keeps one lock per destination directory: two threads moving files into
/// the same directory never pick the same free suffix. The mutator is shared
/// by reference across the walker's worker threads.
#[derive(Debug, Default)]
pub struct Mutator {
    locks: DashMap<PathBuf, Arc<Mutex<()>>>,
}

impl Mutator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Renames or moves `old_path` to `new_path`, returning the name actually used.
    ///
    /// When `new_path` is free the returned name is the requested one. When it
    /// is occupied, the requested name is split into base and extension
    /// (directories have no extension) and the first free `"<base> (<n>)<ext>"`
    /// for `n` in `1..=99` is used. A numbered variant that is `old_path`
    /// itself counts as free, and the file keeps it. Exactly one filesystem
    /// rename happens on success unless the chosen path is `old_path`; none
    /// on failure. Renaming a path onto itself is a no-op.
    ///
    /// # Errors
    ///
    /// * [`Error::CollisionExhausted`] when all 99 numbered variants exist;
    ///   `old_path` is left untouched.
    /// * [`Error::Io`] when the rename itself fails (missing source, missing
    ///   destination directory, permissions).
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use tagfold::mutator::Mutator;
    /// use std::path::Path;
    ///
    /// let mutator = Mutator::new();
    /// let used = mutator.safe_rename(
    ///     Path::new("/photos/Album/c__t=beach.jpg"),
    ///     Path::new("/photos/Album/beach/c__t=beach.jpg"),
    ///     false,
    /// );
    /// match used {
    ///     Ok(name) => println!("Moved as {}", name),
    ///     Err(e) => eprintln!("Move failed: {}", e),
    /// }
    /// ```
    pub fn safe_rename(&self, old_path: &Path, new_path: &Path, is_directory: bool) -> Result<String> {
        let requested = new_path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                Error::io(
                    new_path,
                    std::io::Error::new(
                        std::io::ErrorKind::InvalidInput,
                        "target has no usable file name",
                    ),
                )
            })?
            .to_string();

        if old_path == new_path {
            return Ok(requested);
        }

        let dest_dir = new_path.parent().unwrap_or_else(|| Path::new(""));
        let lock = self.lock_for(dest_dir);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let (target, final_name) = free_target(old_path, new_path, &requested, is_directory)?;
        if target == old_path {
            log::debug!("{} already holds a free variant of {}", old_path.display(), requested);
            return Ok(final_name);
        }

        fs::rename(old_path, &target).map_err(|e| Error::io(old_path, e))?;

        if final_name == requested {
            log::debug!("Renamed {} -> {}", old_path.display(), target.display());
        } else {
            log::info!(
                "{} was taken, renamed {} -> {}",
                new_path.display(),
                old_path.display(),
                target.display()
            );
        }

        Ok(final_name)
    }

    fn lock_for(&self, dir: &Path) -> Arc<Mutex<()>> {
        self.locks.entry(dir.to_path_buf()).or_default().clone()
    }
}

/// Whether anything, including a dangling symlink, occupies `path`.
fn occupied(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

/// Finds the first free destination for `requested` next to `target`.
///
/// `original` occupies its own slot: if a numbered variant is `original`,
/// that variant is returned.
fn free_target(
    original: &Path,
    target: &Path,
    requested: &str,
    is_directory: bool,
) -> Result<(PathBuf, String)> {
    if !occupied(target) {
        return Ok((target.to_path_buf(), requested.to_string()));
    }

    let dir = target.parent().unwrap_or_else(|| Path::new(""));
    let (base, ext) = split_name(requested, is_directory);

    (1..=MAX_COLLISION_SUFFIX)
        .map(|n| format!("{} ({}){}", base, n, ext))
        .map(|candidate| (dir.join(&candidate), candidate))
        .find(|(path, _)| path == original || !occupied(path))
        .ok_or_else(|| Error::CollisionExhausted {
            original: original.to_path_buf(),
            target: target.to_path_buf(),
        })
}
