//! Tags embedded in file names.
//!
//! A tagged file name has the shape `<core>__t=<tag><ext>`. At most one marker
//! is present and it always ends the base name, right before the extension.
//! Writing a tag first strips any existing marker, so tags are replaced and
//! never stacked.

use regex::Regex;
use std::collections::HashSet;
use std::fmt;
use std::sync::LazyLock;

use crate::entry::split_name;
use crate::error::{Error, Result};

/// Literal that introduces a tag inside a base name.
pub const TAG_MARKER: &str = "__t=";

static MARKER_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"__t=.*$").expect("marker suffix pattern is valid"));

static MARKER_CAPTURE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"__t=(.+)$").expect("marker capture pattern is valid"));

/// A validated tag value.
///
/// Tags double as directory names, so they must be non-empty, free of path
/// separators, and must not contain the marker itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag(String);

impl Tag {
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        let reason = if value.is_empty() {
            Some("tag is empty")
        } else if value.contains(['/', '\\']) {
            Some("tag contains a path separator")
        } else if value.contains(TAG_MARKER) {
            Some("tag contains the tag marker")
        } else if value == "." || value == ".." {
            Some("tag is a relative directory name")
        } else {
            None
        };

        match reason {
            Some(reason) => Err(Error::InvalidTag { tag: value, reason }),
            None => Ok(Self(value)),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Tag {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Optional restriction of an operation to a set of tags.
///
/// An empty filter admits every tag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagFilter(Option<HashSet<Tag>>);

impl TagFilter {
    /// Admits every tag.
    pub fn any() -> Self {
        Self(None)
    }

    /// Admits only the given tags. An empty list admits every tag.
    pub fn only<I, S>(tags: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tags = tags
            .into_iter()
            .map(Tag::new)
            .collect::<Result<HashSet<_>>>()?;
        if tags.is_empty() {
            Ok(Self::any())
        } else {
            Ok(Self(Some(tags)))
        }
    }

    pub fn admits(&self, tag: &str) -> bool {
        match &self.0 {
            None => true,
            Some(tags) => tags.iter().any(|t| t.as_str() == tag),
        }
    }
}

/// Replaces any marker in `name` with a marker for `tag`.
///
/// ```
/// use tagfold::tag::{add_tag, Tag};
///
/// let beach = Tag::new("beach").unwrap();
/// assert_eq!(add_tag("a.jpg", &beach), "a__t=beach.jpg");
/// assert_eq!(add_tag("a__t=city.jpg", &beach), "a__t=beach.jpg");
/// ```
pub fn add_tag(name: &str, tag: &Tag) -> String {
    let (base, ext) = split_name(name, false);
    format!("{}{}{}{}", strip_marker(base), TAG_MARKER, tag, ext)
}

/// Removes the marker from `name`, if any.
pub fn remove_tag(name: &str) -> String {
    let (base, ext) = split_name(name, false);
    format!("{}{}", strip_marker(base), ext)
}

/// Returns the tag embedded in `name`, if any.
///
/// ```
/// use tagfold::tag::extract_tag;
///
/// assert_eq!(extract_tag("b__t=beach.jpg").as_deref(), Some("beach"));
/// assert_eq!(extract_tag("b.jpg"), None);
/// ```
pub fn extract_tag(name: &str) -> Option<String> {
    let (base, _) = split_name(name, false);
    MARKER_CAPTURE
        .captures(base)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

fn strip_marker(base: &str) -> std::borrow::Cow<'_, str> {
    MARKER_SUFFIX.replace(base, "")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(value: &str) -> Tag {
        Tag::new(value).unwrap()
    }

    #[test]
    fn test_round_trip() {
        for name in ["a.jpg", "IMG_0001.JPG", "no extension", "x.tar.gz", ".hidden"] {
            for t in ["beach", "2023 summer", "a=b", "ünïcode"] {
                assert_eq!(
                    extract_tag(&add_tag(name, &tag(t))).as_deref(),
                    Some(t),
                    "{} / {}",
                    name,
                    t
                );
            }
        }
    }

    #[test]
    fn test_add_tag_is_idempotent() {
        let once = add_tag("photo.jpg", &tag("beach"));
        let twice = add_tag(&once, &tag("beach"));
        assert_eq!(once, "photo__t=beach.jpg");
        assert_eq!(once, twice);
    }

    #[test]
    fn test_last_tag_wins() {
        let renamed = add_tag(&add_tag("photo.jpg", &tag("beach")), &tag("city"));
        assert_eq!(renamed, "photo__t=city.jpg");
        assert_eq!(extract_tag(&renamed).as_deref(), Some("city"));
        assert_eq!(renamed.matches(TAG_MARKER).count(), 1);
    }

    #[test]
    fn test_remove_tag_is_idempotent() {
        for name in ["a__t=beach.jpg", "a.jpg", "a__t=.jpg", "__t=x", "plain"] {
            let once = remove_tag(name);
            assert_eq!(remove_tag(&once), once, "{}", name);
        }
        assert_eq!(remove_tag("a__t=beach.jpg"), "a.jpg");
        assert_eq!(remove_tag("a.jpg"), "a.jpg");
    }

    #[test]
    fn test_marker_in_extension_is_ignored() {
        // The marker is only recognized inside the base name.
        assert_eq!(extract_tag("photo.__t=beach"), None);
    }

    #[test]
    fn test_empty_marker_is_untagged() {
        assert_eq!(extract_tag("a__t=.jpg"), None);
    }

    #[test]
    fn test_invalid_tags_are_rejected() {
        for bad in ["", "a/b", "a\\b", "x__t=y", "..", "."] {
            assert!(
                matches!(Tag::new(bad), Err(Error::InvalidTag { .. })),
                "{:?}",
                bad
            );
        }
    }

    #[test]
    fn test_tag_filter() {
        let any = TagFilter::any();
        assert!(any.admits("beach"));

        let only = TagFilter::only(["beach", "city"]).unwrap();
        assert!(only.admits("beach"));
        assert!(!only.admits("forest"));

        let empty = TagFilter::only(Vec::<String>::new()).unwrap();
        assert_eq!(empty, TagFilter::any());

        assert!(TagFilter::only(["ok", "bad/tag"]).is_err());
    }
}
