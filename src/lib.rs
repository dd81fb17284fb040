//! tagfold - reorganize photo and music collections without overwriting anything
//!
//! This library walks a root directory of collection folders, moves files
//! into and out of per-tag subfolders according to a tag embedded in their
//! names, flattens single-child directory chains and prunes empty
//! directories. Every rename goes through a collision-safe primitive that
//! picks a numbered name instead of overwriting.

pub mod cleaner;
pub mod cli;
pub mod config;
pub mod context;
pub mod entry;
pub mod error;
pub mod file_category;
pub mod history;
pub mod metadata;
pub mod mutator;
pub mod output;
pub mod reorganizer;
pub mod tag;
pub mod undo;
pub mod walker;

pub use cleaner::{CleanReport, Cleaner, FlattenReport};
pub use config::{ConfigError, Settings, VisibilityFilter};
pub use context::Context;
pub use entry::{Entry, EntryKind, split_name};
pub use error::{Error, Result};
pub use file_category::{Category, FileMapper};
pub use history::{Operation, OperationLog};
pub use metadata::{Metadata, MetadataProvider, MetadataProviders};
pub use mutator::Mutator;
pub use reorganizer::{CONFIRM_TOKEN, PictureCount, ReorganizeReport, Reorganizer};
pub use tag::{Tag, TagFilter, add_tag, extract_tag, remove_tag};
pub use undo::{UndoManager, UndoReport};
pub use walker::{WalkSummary, Walker};
