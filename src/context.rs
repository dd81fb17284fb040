use std::path::{Path, PathBuf};

use crate::config::{DEFAULT_DEPTH, MetadataSettings, Settings, VisibilityFilter};
use crate::error::{Error, Result};

/// File name of the journal written under the root after a reorganizer run.
pub const HISTORY_FILE: &str = ".tagfold_history.json";

/// Everything a traversal or reorganizer call needs to know about its run.
///
/// Built once per invocation and passed by reference; nothing in the crate
/// reads the process working directory implicitly.
#[derive(Debug, Clone)]
pub struct Context {
    /// Directory holding the collection folders.
    pub root: PathBuf,
    /// Default depth for deep traversals.
    pub depth: u32,
    pub metadata: MetadataSettings,
    pub filter: VisibilityFilter,
}

impl Context {
    /// A context with default depth, no metadata enrichment and default
    /// visibility rules (hidden entries are invisible).
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            depth: DEFAULT_DEPTH,
            metadata: MetadataSettings::default(),
            filter: VisibilityFilter::default(),
        }
    }

    /// Builds a context from loaded settings, compiling the visibility filters.
    pub fn from_settings(root: impl Into<PathBuf>, settings: &Settings) -> Result<Self> {
        Ok(Self {
            root: root.into(),
            depth: settings.traversal.depth,
            metadata: settings.metadata,
            filter: VisibilityFilter::compile(&settings.filters)?,
        })
    }

    pub fn with_depth(mut self, depth: u32) -> Self {
        self.depth = depth;
        self
    }

    pub fn with_metadata(mut self, metadata: MetadataSettings) -> Self {
        self.metadata = metadata;
        self
    }

    /// Fails with [`Error::MissingRoot`] unless the root is an existing directory.
    pub fn ensure_root(&self) -> Result<()> {
        if self.root.is_dir() {
            Ok(())
        } else {
            Err(Error::MissingRoot(self.root.clone()))
        }
    }

    pub fn history_path(&self) -> PathBuf {
        self.root.join(HISTORY_FILE)
    }

    /// Directory used by `flatten` to park nested directories.
    ///
    /// It sits next to the root (`<parent>/.<root name>.staging`) so that it
    /// is never itself a flatten candidate. A root without a parent keeps its
    /// staging area inside, hidden.
    ///
    /// Parking is a plain rename, so the staging area must be on the same
    /// filesystem as the root. When the root is a mount point its parent is
    /// on another device: every move into staging then fails with a
    /// cross-device error and each flatten candidate is reported as an
    /// [`Error::Io`](crate::error::Error::Io) failure, leaving it untouched.
    pub fn staging_dir(&self) -> PathBuf {
        let name = self
            .root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "tagfold".to_string());
        match self.root.parent() {
            Some(parent) if parent != Path::new("") => parent.join(format!(".{}.staging", name)),
            _ => self.root.join(format!(".{}.staging", name)),
        }
    }
}
