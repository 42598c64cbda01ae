//! Push failure classification
//!
//! A failed `git push` is never retried automatically. Instead the stderr
//! output is matched against known patterns so the troubleshooting output
//! can lead with the most likely cause.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

/// Likely cause of a failed push
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PushFailureCause {
    Authentication,
    RepositoryNotFound,
    Network,
    Rejected,
    Unknown,
}

impl fmt::Display for PushFailureCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authentication => write!(f, "authentication"),
            Self::RepositoryNotFound => write!(f, "repository not found"),
            Self::Network => write!(f, "network"),
            Self::Rejected => write!(f, "rejected"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

const AUTHENTICATION_PATTERNS: &[&str] = &[
    "authentication failed",
    "permission denied",
    "could not read username",
    "invalid username or password",
    "support for password authentication was removed",
    "returned error: 401",
    "returned error: 403",
];

// Checked before authentication: GitHub answers an unknown repository with
// "Repository not found" followed by a generic access error.
const NOT_FOUND_PATTERNS: &[&str] = &[
    "repository not found",
    "does not appear to be a git repository",
    "returned error: 404",
];

const NETWORK_PATTERNS: &[&str] = &[
    "could not resolve host",
    "failed to connect",
    "connection refused",
    "connection reset",
    "connection timed out",
    "operation timed out",
    "network is unreachable",
    "ssl certificate",
    "ssl_",
    "tls connection",
];

const REJECTED_PATTERNS: &[&str] = &[
    "[rejected]",
    "non-fast-forward",
    "fetch first",
    "protected branch",
];

/// Remote URLs and scp-style addresses echoed by git; removed before
/// matching so account or project names cannot look like a status code
static REMOTE_ADDRESS: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?:[a-z][a-z0-9+.-]*://|[a-z0-9._-]+@[a-z0-9.-]+:)[^\s'\x22]*").ok()
});

impl PushFailureCause {
    /// Classify git's stderr output
    ///
    /// Matching is case-insensitive.
    ///
    /// # Examples
    ///
    /// ```
    /// use repo_publisher::core::PushFailureCause;
    ///
    /// let cause = PushFailureCause::classify("fatal: Authentication failed for 'https://github.com/a/b.git/'");
    /// assert_eq!(cause, PushFailureCause::Authentication);
    /// ```
    pub fn classify(stderr: &str) -> Self {
        let lowered = stderr.to_lowercase();
        let lowered = match REMOTE_ADDRESS.as_ref() {
            Some(address) => address.replace_all(&lowered, "<remote>").into_owned(),
            None => lowered,
        };
        let matches = |patterns: &[&str]| patterns.iter().any(|p| lowered.contains(p));

        if matches(NOT_FOUND_PATTERNS) {
            Self::RepositoryNotFound
        } else if matches(AUTHENTICATION_PATTERNS) {
            Self::Authentication
        } else if matches(NETWORK_PATTERNS) {
            Self::Network
        } else if matches(REJECTED_PATTERNS) {
            Self::Rejected
        } else {
            Self::Unknown
        }
    }

    /// One-line hint printed above the troubleshooting checklist
    pub fn hint(&self) -> &'static str {
        match self {
            Self::Authentication => {
                "Git rejected your credentials. Use a Personal Access Token instead of your password, or switch the remote to SSH."
            }
            Self::RepositoryNotFound => {
                "The remote repository does not exist yet. Create it on the hosting site first (without README/.gitignore)."
            }
            Self::Network => "The remote host could not be reached. Check your internet connection and proxy settings.",
            Self::Rejected => {
                "The remote has commits you do not have locally. Pull first or push to a fresh repository."
            }
            Self::Unknown => "Git did not report a recognizable cause. See its output above.",
        }
    }
}
