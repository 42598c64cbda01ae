//! Version Validator - Validates release tags against semantic versioning
//!
//! A release tag may be given as `1.2.3` or `v1.2.3`; it is always created
//! in git as `v<version>`.
//!
//! # Example
//!
//! ```
//! use repo_publisher::validation::VersionValidator;
//!
//! let tag = VersionValidator::parse_release_tag("v1.2.3").unwrap();
//!
//! assert_eq!(tag.name(), "v1.2.3");
//! assert_eq!(tag.version.major, 1);
//! ```

use crate::core::error::PublishError;
use semver::Version;

/// Validated release tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseTag {
    pub version: Version,
}

impl ReleaseTag {
    /// Git tag name (`v` + version)
    pub fn name(&self) -> String {
        format!("v{}", self.version)
    }

    /// Annotation stored on the tag
    pub fn message(&self, project: &str) -> String {
        format!("Release {} of {}", self.name(), project)
    }

    pub fn is_prerelease(&self) -> bool {
        !self.version.pre.is_empty()
    }
}

/// Validator for semantic versioning
pub struct VersionValidator;

impl VersionValidator {
    /// Parse a release tag, accepting an optional leading `v`
    ///
    /// # Errors
    ///
    /// Returns `PublishError::InvalidReleaseTag` when the remainder is not
    /// a semantic version.
    ///
    /// # Examples
    ///
    /// ```
    /// use repo_publisher::validation::VersionValidator;
    ///
    /// assert!(VersionValidator::parse_release_tag("1.0.0").is_ok());
    /// assert!(VersionValidator::parse_release_tag("1.0").is_err());
    /// ```
    pub fn parse_release_tag(input: &str) -> Result<ReleaseTag, PublishError> {
        let trimmed = input.trim();
        let raw = trimmed
            .strip_prefix('v')
            .or_else(|| trimmed.strip_prefix('V'))
            .unwrap_or(trimmed);

        Version::parse(raw)
            .map(|version| ReleaseTag { version })
            .map_err(|e| PublishError::InvalidReleaseTag {
                tag: input.to_string(),
                reason: e.to_string(),
            })
    }
}
