/// Journal of the moves performed by the last reorganizer run.
///
/// The journal is persisted under the root as `.tagfold_history.json` so the
/// run can be reversed later with [`UndoManager`](crate::undo::UndoManager).
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::context::HISTORY_FILE;
use crate::error::{Error, Result};

/// A single rename or move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    /// Where the file was before the move.
    pub original_path: PathBuf,
    /// Where the file ended up, including any collision suffix.
    pub new_path: PathBuf,
}

impl Operation {
    pub fn new(original_path: impl Into<PathBuf>, new_path: impl Into<PathBuf>) -> Self {
        Self {
            original_path: original_path.into(),
            new_path: new_path.into(),
        }
    }
}

/// All moves of one reorganizer run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationLog {
    /// RFC 3339 timestamp of the run.
    pub timestamp: String,
    /// Name of the operation that produced the moves (e.g. `move-to`).
    pub operation: String,
    pub root: PathBuf,
    /// Moves in the order they completed.
    pub operations: Vec<Operation>,
}

impl OperationLog {
    pub fn new(root: impl Into<PathBuf>, operation: &str) -> Self {
        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            operation: operation.to_string(),
            root: root.into(),
            operations: Vec::new(),
        }
    }

    pub fn add_operation(&mut self, operation: Operation) {
        self.operations.push(operation);
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    fn history_file_path(root: &Path) -> PathBuf {
        root.join(HISTORY_FILE)
    }

    /// Writes this log under `root`, replacing any previous journal.
    pub fn save(&self, root: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(|e| Error::History {
            reason: format!("JSON serialization failed: {}", e),
        })?;

        let history_path = Self::history_file_path(root);
        fs::write(&history_path, json).map_err(|e| Error::io(&history_path, e))?;
        log::debug!(
            "Journaled {} moves to {}",
            self.operations.len(),
            history_path.display()
        );
        Ok(())
    }

    /// Loads the journal under `root`, if there is one.
    pub fn load(root: &Path) -> Result<Option<Self>> {
        let history_path = Self::history_file_path(root);
        if !history_path.exists() {
            return Ok(None);
        }

        let json = fs::read_to_string(&history_path).map_err(|e| Error::io(&history_path, e))?;
        let log = serde_json::from_str(&json).map_err(|e| Error::History {
            reason: format!("JSON parse error: {}", e),
        })?;
        Ok(Some(log))
    }

    pub fn delete(root: &Path) -> Result<()> {
        let history_path = Self::history_file_path(root);
        if history_path.exists() {
            fs::remove_file(&history_path).map_err(|e| Error::io(&history_path, e))?;
        }
        Ok(())
    }
}
