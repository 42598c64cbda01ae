//! Configuration structures and types for repo-publisher
//!
//! This module provides type-safe configuration management with serde support.
//! `PublishConfig` is the resolved configuration the workflow runs with;
//! `ConfigLayer` is one partial source (file, environment, CLI) merged on top.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Account value that must be replaced before publishing
pub const PLACEHOLDER_ACCOUNT: &str = "YOUR_USERNAME";

/// Supported configuration schema version
pub const CONFIG_SCHEMA_VERSION: &str = "1.0";

pub const DEFAULT_HOST: &str = "github.com";
pub const DEFAULT_PROJECT: &str = "student-helper-bot";
pub const DEFAULT_BRANCH: &str = "main";
pub const DEFAULT_REMOTE: &str = "origin";
pub const DEFAULT_SECRETS_FILE: &str = ".env";
pub const DEFAULT_PUSH_TIMEOUT_SECS: u64 = 300;

pub const DEFAULT_COMMIT_MESSAGE: &str = "Initial release: Student Helper Bot

Telegram bot that helps students keep track of deadlines,
grades and schedules.

- Deadline tracking with reminders
- Grade calculation
- Schedule management
- Notifications";

/// Resolved configuration for one run
#[derive(Debug, Clone, PartialEq)]
pub struct PublishConfig {
    /// Schema version
    pub version: String,

    /// Hosting account the repository is published under
    pub account: String,

    /// Hosting domain (e.g. "github.com")
    pub host: String,

    /// Repository name on the host
    pub project: String,

    /// Primary branch name
    pub branch: String,

    /// Remote name
    pub remote: String,

    /// Commit message used for the release commit
    pub commit_message: String,

    /// Staged-secrets guard settings
    pub secrets: SecretsConfig,

    /// Timeout for the push step; `None` waits indefinitely
    pub push_timeout_secs: Option<u64>,

    /// Never prompt; treat every question as declined
    pub non_interactive: bool,

    /// Bot launcher settings
    pub launcher: LauncherConfig,
}

/// Settings for detecting a staged secrets file
#[derive(Debug, Clone, PartialEq)]
pub struct SecretsConfig {
    /// Secrets file name (default: ".env")
    pub file: String,

    /// Additional glob-style patterns treated as secrets
    pub extra_patterns: Vec<String>,
}

/// Settings for launching the bot entry point
#[derive(Debug, Clone, PartialEq)]
pub struct LauncherConfig {
    /// Interpreter candidates, tried in order
    pub interpreters: Vec<String>,

    /// Script passed to the interpreter
    pub entry_point: String,

    /// Requirements file installed before launch
    pub requirements: String,

    /// Directory created before launch
    pub data_dir: String,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_SCHEMA_VERSION.to_string(),
            account: PLACEHOLDER_ACCOUNT.to_string(),
            host: DEFAULT_HOST.to_string(),
            project: DEFAULT_PROJECT.to_string(),
            branch: DEFAULT_BRANCH.to_string(),
            remote: DEFAULT_REMOTE.to_string(),
            commit_message: DEFAULT_COMMIT_MESSAGE.to_string(),
            secrets: SecretsConfig::default(),
            push_timeout_secs: Some(DEFAULT_PUSH_TIMEOUT_SECS),
            non_interactive: false,
            launcher: LauncherConfig::default(),
        }
    }
}

impl Default for SecretsConfig {
    fn default() -> Self {
        Self {
            file: DEFAULT_SECRETS_FILE.to_string(),
            extra_patterns: Vec::new(),
        }
    }
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            interpreters: vec!["python3".to_string(), "python".to_string()],
            entry_point: "Open_Source.py".to_string(),
            requirements: "requirements.txt".to_string(),
            data_dir: "data".to_string(),
        }
    }
}

impl PublishConfig {
    /// Browser URL of the published repository
    ///
    /// # Examples
    ///
    /// ```
    /// use repo_publisher::core::PublishConfig;
    ///
    /// let config = PublishConfig {
    ///     account: "alice".to_string(),
    ///     ..Default::default()
    /// };
    /// assert_eq!(config.repository_url(), "https://github.com/alice/student-helper-bot");
    /// ```
    pub fn repository_url(&self) -> String {
        format!("https://{}/{}/{}", self.host, self.account, self.project)
    }

    /// URL registered as the git remote
    pub fn remote_url(&self) -> String {
        format!("{}.git", self.repository_url())
    }

    pub fn push_timeout(&self) -> Option<Duration> {
        self.push_timeout_secs.map(Duration::from_secs)
    }

    /// Check whether the account is still the placeholder
    pub fn has_placeholder_account(&self) -> bool {
        self.account == PLACEHOLDER_ACCOUNT
    }
}

/// One partial configuration source
///
/// Every field is optional; set fields override the layers below.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ConfigLayer {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit_message: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub secrets: Option<SecretsLayer>,

    /// 0 disables the timeout
    #[serde(skip_serializing_if = "Option::is_none")]
    pub push_timeout_secs: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub non_interactive: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub launcher: Option<LauncherLayer>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SecretsLayer {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra_patterns: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LauncherLayer {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interpreters: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_point: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub requirements: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<String>,
}

impl From<&PublishConfig> for ConfigLayer {
    /// Fully populated layer, used to write a starter configuration file
    fn from(config: &PublishConfig) -> Self {
        Self {
            version: Some(config.version.clone()),
            account: Some(config.account.clone()),
            host: Some(config.host.clone()),
            project: Some(config.project.clone()),
            branch: Some(config.branch.clone()),
            remote: Some(config.remote.clone()),
            commit_message: Some(config.commit_message.clone()),
            secrets: Some(SecretsLayer {
                file: Some(config.secrets.file.clone()),
                extra_patterns: Some(config.secrets.extra_patterns.clone()),
            }),
            push_timeout_secs: Some(config.push_timeout_secs.unwrap_or(0)),
            non_interactive: Some(config.non_interactive),
            launcher: Some(LauncherLayer {
                interpreters: Some(config.launcher.interpreters.clone()),
                entry_point: Some(config.launcher.entry_point.clone()),
                requirements: Some(config.launcher.requirements.clone()),
                data_dir: Some(config.launcher.data_dir.clone()),
            }),
        }
    }
}
