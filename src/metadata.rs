//! Metadata collaborators consulted by the walker.
//!
//! A provider turns a file path into an optional structured record. Any
//! failure (unreadable file, unsupported format, corrupt tags) yields `None`;
//! extraction problems never surface as traversal errors.

use chrono::{DateTime, Local};
use lofty::prelude::*;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::config::MetadataSettings;
use crate::file_category::{Category, FileMapper};

/// Structured record attached to an [`Entry`](crate::entry::Entry).
#[derive(Debug, Clone, PartialEq)]
pub enum Metadata {
    Audio(AudioMetadata),
    Image(ImageMetadata),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AudioMetadata {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub duration: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageMetadata {
    /// MIME type detected from the file content.
    pub mime_type: String,
    /// Extension matching the detected content, without a dot.
    pub extension: String,
    pub byte_len: u64,
    pub modified: Option<DateTime<Local>>,
}

/// Extracts metadata for a single file.
///
/// `Send + Sync` are required: providers are shared by the walker's worker
/// threads and called concurrently on sibling entries.
pub trait MetadataProvider: Send + Sync {
    fn extract(&self, path: &Path) -> Option<Metadata>;
}

/// Reads audio tags and stream properties with `lofty`.
#[derive(Debug, Default, Clone, Copy)]
pub struct AudioProvider;

impl MetadataProvider for AudioProvider {
    fn extract(&self, path: &Path) -> Option<Metadata> {
        let tagged = match lofty::read_from_path(path) {
            Ok(tagged) => tagged,
            Err(e) => {
                log::debug!("No audio metadata for {}: {}", path.display(), e);
                return None;
            }
        };

        let mut audio = AudioMetadata {
            duration: Some(tagged.properties().duration()),
            ..AudioMetadata::default()
        };

        if let Some(tag) = tagged.primary_tag().or_else(|| tagged.first_tag()) {
            audio.title = non_blank(tag.title().as_deref());
            audio.artist = non_blank(tag.artist().as_deref());
            audio.album = non_blank(tag.album().as_deref());
        }

        Some(Metadata::Audio(audio))
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Detects the picture format from content with `infer` and records file facts.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageProvider;

impl MetadataProvider for ImageProvider {
    fn extract(&self, path: &Path) -> Option<Metadata> {
        let kind = infer::get_from_path(path).ok().flatten()?;
        if !kind.mime_type().starts_with("image/") {
            return None;
        }

        let stat = fs::metadata(path).ok()?;
        Some(Metadata::Image(ImageMetadata {
            mime_type: kind.mime_type().to_string(),
            extension: kind.extension().to_string(),
            byte_len: stat.len(),
            modified: stat.modified().ok().map(DateTime::<Local>::from),
        }))
    }
}

/// The set of collaborators enabled for one traversal.
///
/// Files are categorized first so that only pictures reach the image provider
/// and only music reaches the audio provider.
pub struct MetadataProviders {
    mapper: FileMapper,
    audio: Option<Box<dyn MetadataProvider>>,
    image: Option<Box<dyn MetadataProvider>>,
}

impl MetadataProviders {
    /// No enrichment at all; entries never carry metadata.
    pub fn none() -> Self {
        Self {
            mapper: FileMapper::default(),
            audio: None,
            image: None,
        }
    }

    /// Enables the built-in providers selected by the feature toggles.
    pub fn from_settings(settings: &MetadataSettings) -> Self {
        let mut providers = Self::none();
        if settings.music {
            providers.audio = Some(Box::new(AudioProvider));
        }
        if settings.image {
            providers.image = Some(Box::new(ImageProvider));
        }
        providers
    }

    /// Replaces the audio collaborator.
    pub fn with_audio(mut self, provider: impl MetadataProvider + 'static) -> Self {
        self.audio = Some(Box::new(provider));
        self
    }

    /// Replaces the image collaborator.
    pub fn with_image(mut self, provider: impl MetadataProvider + 'static) -> Self {
        self.image = Some(Box::new(provider));
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.audio.is_some() || self.image.is_some()
    }

    pub fn extract(&self, path: &Path) -> Option<Metadata> {
        if !self.is_enabled() {
            return None;
        }
        match self.mapper.categorize_path(path) {
            Category::Image => self.image.as_ref()?.extract(path),
            Category::Audio => self.audio.as_ref()?.extract(path),
            Category::Other => None,
        }
    }
}

impl Default for MetadataProviders {
    fn default() -> Self {
        Self::none()
    }
}
