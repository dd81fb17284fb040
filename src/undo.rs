/// Reversal of the last journaled reorganizer run.
///
/// Files are moved back through the collision-safe mutator, so a file that
/// has since reappeared at the original location is never overwritten: the
/// restored file gets a numbered name next to it instead.
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::history::{Operation, OperationLog};
use crate::mutator::Mutator;

/// Represents the result of an undo operation.
#[derive(Debug, Default)]
pub struct UndoReport {
    /// Number of files moved back.
    pub restored_files: usize,
    /// Entries already back at their original path, from an earlier partial undo.
    pub already_restored: usize,
    /// Files restored next to their original name because it was occupied.
    pub renamed_files: Vec<(PathBuf, String)>,
    /// Files that failed to restore.
    pub failed_restores: Vec<(PathBuf, Error)>,
    /// Files that were no longer where the journal left them.
    pub skipped_files: Vec<PathBuf>,
}

impl UndoReport {
    pub fn total_processed(&self) -> usize {
        self.restored_files
            + self.already_restored
            + self.failed_restores.len()
            + self.skipped_files.len()
    }

    /// Returns true if the undo was completely successful.
    pub fn is_complete_success(&self) -> bool {
        self.failed_restores.is_empty() && self.skipped_files.is_empty()
    }
}

/// Manages undo operations for reorganizer runs.
pub struct UndoManager;

impl UndoManager {
    /// Undoes the most recent journaled run under `root`.
    ///
    /// Moves are replayed newest first. The journal is deleted only when every
    /// file was restored, so a partial undo can be retried.
    ///
    /// # Errors
    ///
    /// [`Error::MissingRoot`] if `root` is not a directory, [`Error::History`]
    /// if there is no journal or it cannot be parsed.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use tagfold::undo::UndoManager;
    /// use std::path::Path;
    ///
    /// match UndoManager::undo(Path::new("/photos")) {
    ///     Ok(report) => println!("Restored {} files", report.restored_files),
    ///     Err(e) => eprintln!("Undo failed: {}", e),
    /// }
    /// ```
    pub fn undo(root: &Path) -> Result<UndoReport> {
        if !root.is_dir() {
            return Err(Error::MissingRoot(root.to_path_buf()));
        }

        let log = OperationLog::load(root)?.ok_or_else(|| Error::History {
            reason: "no previous run found to undo".to_string(),
        })?;
        log::info!(
            "Undoing {} ({} moves, {})",
            log.operation,
            log.operations.len(),
            log.timestamp
        );

        let mutator = Mutator::new();
        let mut report = UndoReport::default();
        for operation in log.operations.iter().rev() {
            Self::restore_file(&mutator, operation, &mut report);
        }

        if report.is_complete_success()
            && let Err(e) = OperationLog::delete(root)
        {
            log::warn!("Could not delete history file: {}", e);
        }

        Ok(report)
    }

    fn restore_file(mutator: &Mutator, operation: &Operation, report: &mut UndoReport) {
        if !operation.new_path.exists() && operation.original_path.exists() {
            log::debug!("{} is already restored", operation.original_path.display());
            report.already_restored += 1;
            return;
        }
        if !operation.new_path.exists() {
            log::warn!(
                "Skipping {}: file not found at expected location",
                operation.new_path.display()
            );
            report.skipped_files.push(operation.new_path.clone());
            return;
        }

        match mutator.safe_rename(&operation.new_path, &operation.original_path, false) {
            Ok(name) => {
                report.restored_files += 1;
                let requested = operation.original_path.file_name().and_then(|n| n.to_str());
                if requested != Some(name.as_str()) {
                    report
                        .renamed_files
                        .push((operation.original_path.clone(), name));
                }
            }
            Err(e) => {
                log::warn!("{}", e);
                report.failed_restores.push((operation.new_path.clone(), e));
            }
        }
    }
}
