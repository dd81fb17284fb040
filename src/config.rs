//! Settings and visibility filtering loaded from TOML configuration files.
//!
//! Supplies the default traversal depth, the metadata feature toggles and the
//! rules deciding which directory entries are visible to the walker:
//! - Hidden entries (names starting with ".")
//! - Exact name matching
//! - Glob pattern matching
//! - Extension matching
//! - Regex pattern matching
//! - Include (whitelist) rules that override exclude rules
//!
//! # Configuration File Format
//!
//! ```toml
//! [traversal]
//! depth = 2
//!
//! [metadata]
//! music = false
//! image = false
//!
//! [filters]
//! enable_hidden_files = false
//!
//! [filters.exclude]
//! filenames = ["Thumbs.db"]
//! patterns = ["*.tmp"]
//! extensions = ["bak"]
//! regex = []
//!
//! [filters.include]
//! patterns = []
//! ```

use glob::Pattern;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the per-directory configuration file.
pub const LOCAL_CONFIG_FILE: &str = ".tagfoldrc.toml";

/// Depth used by deep traversals when nothing else is configured.
pub const DEFAULT_DEPTH: u32 = 2;

/// Errors that can occur during configuration loading and compiling.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),

    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),

    #[error("Invalid glob pattern '{0}'")]
    InvalidGlobPattern(String),

    #[error("Invalid regex pattern '{pattern}': {reason}")]
    InvalidRegexPattern { pattern: String, reason: String },

    #[error("IO error reading configuration: {0}")]
    IoError(String),
}

/// Top-level settings deserialized from a configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub traversal: TraversalSettings,
    pub metadata: MetadataSettings,
    pub filters: FilterRules,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TraversalSettings {
    /// Remaining levels a deep walk may descend below its starting directory.
    pub depth: u32,
}

impl Default for TraversalSettings {
    fn default() -> Self {
        Self {
            depth: DEFAULT_DEPTH,
        }
    }
}

/// Feature toggles for the metadata collaborators consulted while walking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataSettings {
    /// Attach audio tags (title, artist, album, duration) to music files.
    pub music: bool,
    /// Attach detected image type and file facts to pictures.
    pub image: bool,
}

/// Visibility rules for directory entries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterRules {
    /// Whether entries starting with "." are visible. Defaults to false.
    #[serde(default)]
    pub enable_hidden_files: bool,

    #[serde(default)]
    pub exclude: ExcludeRules,

    /// Whitelist, overrides exclude rules.
    #[serde(default)]
    pub include: IncludeRules,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExcludeRules {
    /// Exact names to hide (e.g., "Thumbs.db").
    #[serde(default)]
    pub filenames: Vec<String>,

    /// Glob patterns matched against entry names (e.g., "*.tmp").
    #[serde(default)]
    pub patterns: Vec<String>,

    /// Extensions without the dot, compared case-insensitively.
    #[serde(default)]
    pub extensions: Vec<String>,

    #[serde(default)]
    pub regex: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IncludeRules {
    #[serde(default)]
    pub patterns: Vec<String>,
}

impl Settings {
    /// Load settings from a file, with fallback to defaults.
    ///
    /// Attempts to load configuration in the following order:
    /// 1. If `config_path` is provided, load from that file
    /// 2. Look for `.tagfoldrc.toml` in the current directory
    /// 3. Look for `~/.config/tagfold/config.toml` in home directory
    /// 4. Fall back to default configuration
    ///
    /// # Errors
    ///
    /// Returns an error if a configuration file is explicitly provided but cannot be read,
    /// or if any discovered file is not valid TOML.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        let local_config = PathBuf::from(LOCAL_CONFIG_FILE);
        if local_config.exists() {
            return Self::load_from_file(&local_config);
        }

        if let Ok(home) = std::env::var("HOME") {
            let home_config = PathBuf::from(home)
                .join(".config")
                .join("tagfold")
                .join("config.toml");
            if home_config.exists() {
                return Self::load_from_file(&home_config);
            }
        }

        Ok(Self::default())
    }

    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::ConfigNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Self::from_toml(&content)
    }

    /// Parses settings from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ConfigInvalid(e.to_string()))
    }
}

/// Compiled visibility rules used by the walker for every listed entry.
///
/// Patterns are compiled once so that checking an entry costs one pass over
/// the rules rather than reparsing them per entry.
#[derive(Debug, Clone, Default)]
pub struct VisibilityFilter {
    enable_hidden_files: bool,
    exclude_filenames: HashSet<String>,
    exclude_extensions: HashSet<String>,
    exclude_patterns: Vec<Pattern>,
    exclude_regexes: Vec<Regex>,
    include_patterns: Vec<Pattern>,
}

impl VisibilityFilter {
    /// Compiles filter rules.
    ///
    /// # Errors
    ///
    /// Returns an error if any glob or regex patterns are invalid.
    pub fn compile(rules: &FilterRules) -> Result<Self, ConfigError> {
        let compile_globs = |patterns: &[String]| {
            patterns
                .iter()
                .map(|pattern| {
                    Pattern::new(pattern)
                        .map_err(|_| ConfigError::InvalidGlobPattern(pattern.clone()))
                })
                .collect::<Result<Vec<_>, _>>()
        };

        let exclude_regexes = rules
            .exclude
            .regex
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| ConfigError::InvalidRegexPattern {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            enable_hidden_files: rules.enable_hidden_files,
            exclude_filenames: rules.exclude.filenames.iter().cloned().collect(),
            exclude_extensions: rules
                .exclude
                .extensions
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_lowercase())
                .collect(),
            exclude_patterns: compile_globs(&rules.exclude.patterns)?,
            exclude_regexes,
            include_patterns: compile_globs(&rules.include.patterns)?,
        })
    }

    /// Check if an entry with the given name is visible.
    ///
    /// Checks are performed in this order, with early termination:
    /// 1. Include patterns (whitelist) - if matched, visible
    /// 2. Hidden entry filter
    /// 3. Exact name match
    /// 4. Extension match
    /// 5. Glob pattern match
    /// 6. Regex pattern match
    /// 7. Default: visible
    pub fn is_visible(&self, name: &str) -> bool {
        if self.include_patterns.iter().any(|p| p.matches(name)) {
            return true;
        }

        if !self.enable_hidden_files && name.starts_with('.') {
            return false;
        }

        if self.exclude_filenames.contains(name) {
            return false;
        }

        if let Some(ext) = Path::new(name).extension() {
            let ext_lower = ext.to_string_lossy().to_lowercase();
            if self.exclude_extensions.contains(&ext_lower) {
                return false;
            }
        }

        if self.exclude_patterns.iter().any(|p| p.matches(name)) {
            return false;
        }

        !self.exclude_regexes.iter().any(|re| re.is_match(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules_with(exclude: ExcludeRules) -> FilterRules {
        FilterRules {
            enable_hidden_files: true,
            exclude,
            include: IncludeRules::default(),
        }
    }

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.traversal.depth, DEFAULT_DEPTH);
        assert!(!settings.metadata.music);
        assert!(!settings.metadata.image);
        assert!(!settings.filters.enable_hidden_files);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings = Settings::from_toml(
            r#"
            [metadata]
            music = true
            "#,
        )
        .unwrap();

        assert!(settings.metadata.music);
        assert!(!settings.metadata.image);
        assert_eq!(settings.traversal.depth, DEFAULT_DEPTH);
    }

    #[test]
    fn test_full_toml() {
        let settings = Settings::from_toml(
            r#"
            [traversal]
            depth = 5

            [metadata]
            image = true

            [filters]
            enable_hidden_files = true

            [filters.exclude]
            filenames = ["Thumbs.db"]
            "#,
        )
        .unwrap();

        assert_eq!(settings.traversal.depth, 5);
        assert!(settings.metadata.image);
        assert!(settings.filters.enable_hidden_files);
        assert_eq!(settings.filters.exclude.filenames, vec!["Thumbs.db"]);
    }

    #[test]
    fn test_invalid_toml_is_rejected() {
        let result = Settings::from_toml("[traversal]\ndepth = \"deep\"");
        assert!(matches!(result, Err(ConfigError::ConfigInvalid(_))));
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let result = Settings::load(Some(Path::new("/non/existent/tagfold.toml")));
        assert!(matches!(result, Err(ConfigError::ConfigNotFound(_))));
    }

    #[test]
    fn test_hidden_entries_invisible_by_default() {
        let filter = VisibilityFilter::compile(&FilterRules::default()).unwrap();

        assert!(!filter.is_visible(".DS_Store"));
        assert!(!filter.is_visible(".tagfold_history.json"));
        assert!(filter.is_visible("photo.jpg"));
    }

    #[test]
    fn test_exclude_exact_filename() {
        let filter = VisibilityFilter::compile(&rules_with(ExcludeRules {
            filenames: vec!["Thumbs.db".to_string()],
            ..Default::default()
        }))
        .unwrap();

        assert!(!filter.is_visible("Thumbs.db"));
        assert!(filter.is_visible("image.jpg"));
    }

    #[test]
    fn test_exclude_extensions_case_insensitive() {
        let filter = VisibilityFilter::compile(&rules_with(ExcludeRules {
            extensions: vec!["bak".to_string(), ".tmp".to_string()],
            ..Default::default()
        }))
        .unwrap();

        assert!(!filter.is_visible("file.bak"));
        assert!(!filter.is_visible("file.BAK"));
        assert!(!filter.is_visible("file.tmp"));
        assert!(filter.is_visible("file.jpg"));
    }

    #[test]
    fn test_exclude_glob_and_regex() {
        let filter = VisibilityFilter::compile(&rules_with(ExcludeRules {
            patterns: vec!["*.xmp".to_string()],
            regex: vec![r"^IMG_\d+_edit".to_string()],
            ..Default::default()
        }))
        .unwrap();

        assert!(!filter.is_visible("IMG_0001.xmp"));
        assert!(!filter.is_visible("IMG_0001_edit.jpg"));
        assert!(filter.is_visible("IMG_0001.jpg"));
    }

    #[test]
    fn test_include_overrides_hidden() {
        let filter = VisibilityFilter::compile(&FilterRules {
            enable_hidden_files: false,
            exclude: ExcludeRules::default(),
            include: IncludeRules {
                patterns: vec![".keep*".to_string()],
            },
        })
        .unwrap();

        assert!(filter.is_visible(".keep"));
        assert!(!filter.is_visible(".other"));
    }

    #[test]
    fn test_invalid_patterns_return_errors() {
        let bad_regex = rules_with(ExcludeRules {
            regex: vec!["[invalid(".to_string()],
            ..Default::default()
        });
        assert!(matches!(
            VisibilityFilter::compile(&bad_regex),
            Err(ConfigError::InvalidRegexPattern { .. })
        ));

        let bad_glob = rules_with(ExcludeRules {
            patterns: vec!["[invalid".to_string()],
            ..Default::default()
        });
        assert!(matches!(
            VisibilityFilter::compile(&bad_glob),
            Err(ConfigError::InvalidGlobPattern(_))
        ));
    }
}
