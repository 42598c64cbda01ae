//! Account Validator - Checks the hosting account used in the remote URL
//!
//! The placeholder check is an exact string comparison and runs first, so
//! an unedited configuration always reports the placeholder, never a format
//! problem.

use crate::core::config::PLACEHOLDER_ACCOUNT;
use crate::core::error::PublishError;

/// Longest account name accepted by GitHub
const MAX_ACCOUNT_LENGTH: usize = 39;

pub struct AccountValidator;

impl AccountValidator {
    /// Validate an account name
    ///
    /// # Errors
    ///
    /// - `PublishError::PlaceholderAccount` - account equals the placeholder
    /// - `PublishError::InvalidAccount` - account is not a valid name
    ///
    /// # Examples
    ///
    /// ```
    /// use repo_publisher::validation::AccountValidator;
    ///
    /// assert!(AccountValidator::validate("octo-cat").is_ok());
    /// assert!(AccountValidator::validate("YOUR_USERNAME").is_err());
    /// ```
    pub fn validate(account: &str) -> Result<(), PublishError> {
        if account == PLACEHOLDER_ACCOUNT {
            return Err(PublishError::PlaceholderAccount {
                placeholder: PLACEHOLDER_ACCOUNT.to_string(),
            });
        }

        let invalid = |reason: &str| PublishError::InvalidAccount {
            account: account.to_string(),
            reason: reason.to_string(),
        };

        if account.is_empty() {
            return Err(invalid("empty"));
        }
        if account.len() > MAX_ACCOUNT_LENGTH {
            return Err(invalid("longer than 39 characters"));
        }
        if !account
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-')
        {
            return Err(invalid("only ASCII letters, digits and hyphens are allowed"));
        }
        if account.starts_with('-') || account.ends_with('-') {
            return Err(invalid("cannot start or end with a hyphen"));
        }
        if account.contains("--") {
            return Err(invalid("cannot contain consecutive hyphens"));
        }

        Ok(())
    }
}
