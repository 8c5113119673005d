//! Release version tags.

use std::fmt;

/// An opaque release identifier such as `v0.2.12`.
///
/// Tags are ordered by plain string comparison; no semantic version ordering
/// is attempted.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VersionTag(String);

/// Errors arising from invalid version tags.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VersionError {
    /// The tag is empty after trimming.
    #[error("version tag is empty")]
    Empty,

    /// The tag contains a character that cannot appear in a file name.
    #[error("invalid version tag \"{value}\": contains '{character}'")]
    InvalidCharacter {
        /// The rejected tag.
        value: String,
        /// The offending character.
        character: char,
    },
}

impl VersionTag {
    /// Validates and wraps a tag.
    ///
    /// # Errors
    ///
    /// Rejects empty tags and tags containing path separators or whitespace,
    /// since the tag becomes part of cache file and directory names.
    ///
    /// # Examples
    ///
    /// ```
    /// use genvm_artefacts::VersionTag;
    ///
    /// let tag = VersionTag::new("v0.2.12").expect("valid tag");
    /// assert_eq!(tag.as_str(), "v0.2.12");
    /// assert!(VersionTag::new("../v1").is_err());
    /// ```
    pub fn new(value: impl Into<String>) -> Result<Self, VersionError> {
        let value = value.into().trim().to_owned();
        if value.is_empty() {
            return Err(VersionError::Empty);
        }
        if let Some(character) = value
            .chars()
            .find(|&ch| matches!(ch, '/' | '\\') || ch.is_whitespace())
        {
            return Err(VersionError::InvalidCharacter { value, character });
        }
        if value == "." || value == ".." {
            return Err(VersionError::InvalidCharacter {
                value,
                character: '.',
            });
        }
        Ok(Self(value))
    }

    /// Returns the tag text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VersionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
