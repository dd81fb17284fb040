//! File categorization used to pick a metadata collaborator for each file.
//!
//! Only the distinction between pictures, music and everything else matters
//! to the walker: pictures go to the image provider, music to the audio
//! provider, and other files are never read.
//!
//! # Examples
//!
//! ```
//! use tagfold::file_category::{Category, FileMapper};
//!
//! let mapper = FileMapper::default();
//! assert_eq!(mapper.mime_to_category("image/png"), Some(Category::Image));
//! assert_eq!(mapper.mime_to_category("audio/mpeg"), Some(Category::Audio));
//! assert_eq!(mapper.categorize(Some("text/plain"), Some("txt")), Category::Other);
//! ```

use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Pictures (JPG, PNG, HEIC, RAW formats, ...)
    Image,
    /// Music (MP3, FLAC, OGG, ...)
    Audio,
    /// Anything that has no metadata collaborator
    Other,
}

/// Maps MIME types and file extensions to categories.
#[derive(Debug, Clone)]
pub struct FileMapper {
    mime_map: HashMap<String, Category>,
    extension_map: HashMap<String, Category>,
}

const IMAGE_MIMES: &[&str] = &[
    "image/png",
    "image/jpeg",
    "image/gif",
    "image/webp",
    "image/bmp",
    "image/tiff",
    "image/heif",
    "image/avif",
    "image/x-canon-cr2",
    "image/x-nikon-nef",
];

const AUDIO_MIMES: &[&str] = &[
    "audio/mpeg",
    "audio/x-wav",
    "audio/ogg",
    "audio/x-flac",
    "audio/aac",
    "audio/m4a",
    "audio/x-aiff",
    "audio/opus",
];

const IMAGE_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "webp", "bmp", "tif", "tiff", "heic", "heif", "avif", "cr2",
    "nef", "arw", "dng",
];

const AUDIO_EXTENSIONS: &[&str] = &[
    "mp3", "flac", "ogg", "oga", "opus", "wav", "aac", "m4a", "aiff", "aif", "wv", "ape",
];

impl FileMapper {
    /// Creates a new `FileMapper` with the standard picture and music mappings.
    pub fn new() -> Self {
        let mut mapper = Self {
            mime_map: HashMap::new(),
            extension_map: HashMap::new(),
        };
        for mime in IMAGE_MIMES {
            mapper.add_mime_mapping(mime, Category::Image);
        }
        for mime in AUDIO_MIMES {
            mapper.add_mime_mapping(mime, Category::Audio);
        }
        for ext in IMAGE_EXTENSIONS {
            mapper.add_extension_mapping(ext, Category::Image);
        }
        for ext in AUDIO_EXTENSIONS {
            mapper.add_extension_mapping(ext, Category::Audio);
        }
        mapper
    }

    pub fn add_mime_mapping(&mut self, mime: &str, category: Category) {
        self.mime_map.insert(mime.to_lowercase(), category);
    }

    pub fn add_extension_mapping(&mut self, ext: &str, category: Category) {
        self.extension_map
            .insert(ext.trim_start_matches('.').to_lowercase(), category);
    }

    pub fn mime_to_category(&self, mime_type: &str) -> Option<Category> {
        self.mime_map.get(&mime_type.to_lowercase()).copied()
    }

    /// Maps a file extension, with or without its leading dot, to a category.
    ///
    /// ```
    /// use tagfold::file_category::{Category, FileMapper};
    ///
    /// let mapper = FileMapper::default();
    /// assert_eq!(mapper.extension_to_category(".JPG"), Some(Category::Image));
    /// assert_eq!(mapper.extension_to_category("flac"), Some(Category::Audio));
    /// ```
    pub fn extension_to_category(&self, ext: &str) -> Option<Category> {
        self.extension_map
            .get(&ext.trim_start_matches('.').to_lowercase())
            .copied()
    }

    /// Determines the category from a MIME type and/or an extension.
    ///
    /// MIME type wins when recognized, then the extension, then `Other`.
    pub fn categorize(&self, mime_type: Option<&str>, ext: Option<&str>) -> Category {
        if let Some(mime) = mime_type
            && let Some(category) = self.mime_to_category(mime)
        {
            return category;
        }

        if let Some(extension) = ext
            && let Some(category) = self.extension_to_category(extension)
        {
            return category;
        }

        Category::Other
    }

    /// Categorizes a file on disk.
    ///
    /// The extension is trusted when it is known; otherwise the first bytes of
    /// the file are sniffed with `infer`. Unreadable files are `Other`.
    pub fn categorize_path(&self, path: &Path) -> Category {
        let extension = path.extension().and_then(|e| e.to_str());
        if let Some(category) = extension.and_then(|e| self.extension_to_category(e)) {
            return category;
        }

        match infer::get_from_path(path) {
            Ok(Some(kind)) => self.categorize(Some(kind.mime_type()), Some(kind.extension())),
            _ => Category::Other,
        }
    }
}

impl Default for FileMapper {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const PNG_HEADER: &[u8] = &[
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
        0x52,
    ];

    #[test]
    fn test_mime_to_category_case_insensitive() {
        let mapper = FileMapper::default();
        assert_eq!(mapper.mime_to_category("IMAGE/JPEG"), Some(Category::Image));
        assert_eq!(mapper.mime_to_category("audio/x-flac"), Some(Category::Audio));
        assert_eq!(mapper.mime_to_category("application/pdf"), None);
    }

    #[test]
    fn test_extension_to_category() {
        let mapper = FileMapper::default();
        assert_eq!(mapper.extension_to_category("NEF"), Some(Category::Image));
        assert_eq!(mapper.extension_to_category(".mp3"), Some(Category::Audio));
        assert_eq!(mapper.extension_to_category("txt"), None);
    }

    #[test]
    fn test_categorize_prefers_mime() {
        let mapper = FileMapper::default();
        assert_eq!(
            mapper.categorize(Some("audio/mpeg"), Some("jpg")),
            Category::Audio
        );
        assert_eq!(mapper.categorize(None, Some("jpg")), Category::Image);
        assert_eq!(mapper.categorize(None, None), Category::Other);
    }

    #[test]
    fn test_categorize_path_sniffs_unknown_extension() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("scan.dat");
        fs::write(&path, PNG_HEADER).expect("Failed to write file");

        let mapper = FileMapper::default();
        assert_eq!(mapper.categorize_path(&path), Category::Image);
    }

    #[test]
    fn test_categorize_path_missing_file_is_other() {
        let mapper = FileMapper::default();
        assert_eq!(
            mapper.categorize_path(Path::new("/non/existent/file.bin")),
            Category::Other
        );
    }

    #[test]
    fn test_custom_mapping() {
        let mut mapper = FileMapper::default();
        mapper.add_extension_mapping("raf", Category::Image);
        assert_eq!(mapper.extension_to_category("RAF"), Some(Category::Image));
    }
}
