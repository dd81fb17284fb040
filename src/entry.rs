use std::path::{Path, PathBuf};

use crate::metadata::Metadata;

/// One child of a listed directory, as handed to a walker visitor.
///
/// The containing directory is deliberately not stored here: visitors receive
/// it alongside the entry, because the same logical file can be reached at
/// different container paths across recursive calls.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    /// The current on-disk name, including extension.
    pub name: String,

    pub kind: EntryKind,

    /// `name` without its extension. Equal to `name` for directories.
    pub base_name: String,

    /// The extension including its leading dot, or empty.
    pub extension: String,

    /// Structured metadata attached by a collaborator while walking.
    pub metadata: Option<Metadata>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

impl Entry {
    /// Builds an entry for `name`, splitting it according to `kind`.
    pub fn new(name: impl Into<String>, kind: EntryKind, metadata: Option<Metadata>) -> Self {
        let name = name.into();
        let (base_name, extension) = split_name(&name, kind == EntryKind::Directory);
        let (base_name, extension) = (base_name.to_string(), extension.to_string());
        Self {
            name,
            kind,
            base_name,
            extension,
            metadata,
        }
    }

    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    /// Full path of this entry inside its containing directory.
    pub fn path_in(&self, dir: &Path) -> PathBuf {
        dir.join(&self.name)
    }
}

/// Splits a name into base name and extension.
///
/// Directories never have an extension. Files split at the last `.`; a dot
/// that starts the name (as in `.profile`) does not begin an extension.
///
/// ```
/// use tagfold::entry::split_name;
///
/// assert_eq!(split_name("photo.jpg", false), ("photo", ".jpg"));
/// assert_eq!(split_name("archive.tar.gz", false), ("archive.tar", ".gz"));
/// assert_eq!(split_name("README", false), ("README", ""));
/// assert_eq!(split_name("2024.summer", true), ("2024.summer", ""));
/// ```
pub fn split_name(name: &str, is_directory: bool) -> (&str, &str) {
    if is_directory {
        return (name, "");
    }
    match name.rfind('.') {
        Some(idx) if idx > 0 => name.split_at(idx),
        _ => (name, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_name_file_variants() {
        assert_eq!(split_name("a.jpg", false), ("a", ".jpg"));
        assert_eq!(split_name("b__t=beach.jpg", false), ("b__t=beach", ".jpg"));
        assert_eq!(split_name(".profile", false), (".profile", ""));
        assert_eq!(split_name("trailing.", false), ("trailing", "."));
        assert_eq!(split_name("", false), ("", ""));
    }

    #[test]
    fn test_split_name_directory_keeps_dots() {
        assert_eq!(split_name("v1.2", true), ("v1.2", ""));
    }

    #[test]
    fn test_entry_new_derives_parts() {
        let entry = Entry::new("photo (1).jpg", EntryKind::File, None);
        assert_eq!(entry.base_name, "photo (1)");
        assert_eq!(entry.extension, ".jpg");
        assert!(entry.is_file());
        assert!(!entry.is_dir());

        let dir = Entry::new("beach.2023", EntryKind::Directory, None);
        assert_eq!(dir.base_name, "beach.2023");
        assert_eq!(dir.extension, "");
        assert_eq!(
            dir.path_in(Path::new("/root/Album")),
            PathBuf::from("/root/Album/beach.2023")
        );
    }
}
