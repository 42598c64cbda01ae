//! Core traits and types for repository publishing
//!
//! This module defines the seams of the publish workflow: the version-control
//! tool it drives and the operator it asks questions.

use crate::core::error::PublishError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

// ============================================================================
// Identity
// ============================================================================

/// Author identity recorded on commits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub name: String,
    pub email: String,
}

impl Identity {
    /// Check that both fields are usable
    ///
    /// # Errors
    ///
    /// Returns `PublishError::InvalidIdentity` naming the offending field.
    pub fn validate(&self) -> Result<(), PublishError> {
        if self.name.trim().is_empty() {
            return Err(PublishError::InvalidIdentity {
                field: "user.name".to_string(),
            });
        }

        let email = self.email.trim();
        let well_formed = match email.split_once('@') {
            Some((local, domain)) => {
                !local.is_empty() && !domain.is_empty() && !domain.contains('@')
            }
            None => false,
        };
        if !well_formed || email.chars().any(char::is_whitespace) {
            return Err(PublishError::InvalidIdentity {
                field: "user.email".to_string(),
            });
        }

        Ok(())
    }
}

// ============================================================================
// Push
// ============================================================================

/// Result of a push attempt that reached the remote
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushOutput {
    pub success: bool,
    pub stderr: String,
}

// ============================================================================
// Version Control Trait
// ============================================================================

/// Operations the publish workflow needs from the version-control tool
///
/// Every method runs in the workflow's working directory. The production
/// implementation shells out to `git`; tests substitute an in-memory fake.
#[async_trait]
pub trait VersionControl: Send + Sync {
    /// Tool name shown in messages (e.g., "git")
    fn name(&self) -> &str;

    /// Check whether the executable is resolvable on the search path
    fn is_available(&self) -> bool;

    /// Configured identity, if both name and email are set
    async fn identity(&self) -> Result<Option<Identity>, PublishError>;

    /// Persist the identity in the user's global configuration
    async fn set_global_identity(&self, identity: &Identity) -> Result<(), PublishError>;

    /// Initialize a repository (no-op when one exists)
    async fn init(&self) -> Result<(), PublishError>;

    /// Stage every file in the working tree
    async fn stage_all(&self) -> Result<(), PublishError>;

    /// Paths currently staged, relative to the repository root
    async fn staged_files(&self) -> Result<Vec<String>, PublishError>;

    /// Check whether HEAD points at a commit
    async fn has_commits(&self) -> Result<bool, PublishError>;

    /// Commit id HEAD points at, if any
    async fn head_commit(&self) -> Result<Option<String>, PublishError>;

    /// Commit the staged changes, returning the new commit id
    async fn commit(&self, message: &str) -> Result<String, PublishError>;

    /// Create or rename the current branch
    async fn rename_branch(&self, branch: &str) -> Result<(), PublishError>;

    /// URL of the named remote, if registered
    async fn remote_url(&self, remote: &str) -> Result<Option<String>, PublishError>;

    /// Register a new remote
    async fn add_remote(&self, remote: &str, url: &str) -> Result<(), PublishError>;

    /// Point an existing remote at a new URL
    async fn set_remote_url(&self, remote: &str, url: &str) -> Result<(), PublishError>;

    /// Commit id a local tag points at; `None` when the tag does not exist
    async fn tag_commit(&self, tag: &str) -> Result<Option<String>, PublishError>;

    /// Create an annotated tag on HEAD
    ///
    /// Fails when the tag already exists.
    async fn create_tag(&self, tag: &str, message: &str) -> Result<(), PublishError>;

    /// Push a ref; `set_upstream` adds tracking
    ///
    /// A rejected push is reported through `PushOutput`, not as an error.
    async fn push(
        &self,
        remote: &str,
        refspec: &str,
        set_upstream: bool,
        timeout: Option<Duration>,
    ) -> Result<PushOutput, PublishError>;
}

// ============================================================================
// Prompter Trait
// ============================================================================

/// Interactive questions asked of the operator
#[async_trait]
pub trait Prompter: Send + Sync {
    /// Ask for a line of free text (trimmed)
    async fn ask(&self, question: &str) -> Result<String, PublishError>;

    /// Ask a yes/no question; anything but yes is a no
    async fn confirm(&self, question: &str) -> Result<bool, PublishError>;
}

/// Interpret an answer to a yes/no question
///
/// # Examples
///
/// ```
/// use repo_publisher::core::is_affirmative;
///
/// assert!(is_affirmative(" Y\n"));
/// assert!(!is_affirmative(""));
/// ```
pub fn is_affirmative(answer: &str) -> bool {
    let answer = answer.trim().to_lowercase();
    answer == "yes" || answer == "y"
}
