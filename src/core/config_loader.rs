//! Configuration file loader for repo-publisher
//!
//! This module provides configuration loading, validation, and merging capabilities.

use super::config::*;
use crate::core::error::PublishError;
use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

/// Configuration file name
pub const CONFIG_FILENAME: &str = ".repo-publisher.yaml";

/// Environment variable pattern (${VAR_NAME})
const ENV_VAR_PATTERN: &str = r"\$\{([A-Z_][A-Z0-9_]*)\}";

/// Configuration load options
#[derive(Debug, Clone, Default)]
pub struct ConfigLoadOptions {
    /// Project path to load config from
    pub project_path: PathBuf,

    /// Directory holding the global config; `None` skips it
    pub global_dir: Option<PathBuf>,

    /// CLI arguments (highest priority)
    pub cli_args: Option<ConfigLayer>,

    /// Environment variables
    pub env: HashMap<String, String>,
}

impl ConfigLoadOptions {
    /// Options for a project using the real home directory and process environment
    pub fn for_project<P: AsRef<Path>>(project_path: P) -> Self {
        Self {
            project_path: project_path.as_ref().to_path_buf(),
            global_dir: dirs::home_dir(),
            cli_args: None,
            env: std::env::vars().collect(),
        }
    }
}

/// Configuration validation result
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigValidationResult {
    /// Is configuration valid?
    pub valid: bool,

    /// Validation errors
    pub errors: Vec<ConfigValidationError>,

    /// Validation warnings
    pub warnings: Vec<ConfigValidationWarning>,
}

/// Configuration validation error
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigValidationError {
    /// Field path (e.g., "secrets.file")
    pub field: String,

    /// Error message
    pub message: String,
}

/// Configuration validation warning
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigValidationWarning {
    /// Field path
    pub field: String,

    /// Warning message
    pub message: String,

    /// Suggestion
    pub suggestion: Option<String>,
}

/// Configuration file loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from multiple sources with priority
    ///
    /// Priority (high to low):
    /// 1. CLI arguments
    /// 2. Environment variables
    /// 3. Project config (./.repo-publisher.yaml)
    /// 4. Global config (~/.repo-publisher.yaml)
    /// 5. Default values
    pub async fn load(options: ConfigLoadOptions) -> Result<PublishConfig, PublishError> {
        let mut layers: Vec<ConfigLayer> = Vec::new();

        if let Some(global_dir) = &options.global_dir
            && let Some(global) = Self::load_config_file(&global_dir.join(CONFIG_FILENAME)).await?
        {
            layers.push(global);
        }

        if let Some(project) =
            Self::load_config_file(&options.project_path.join(CONFIG_FILENAME)).await?
        {
            layers.push(project);
        }

        if let Some(env_layer) = Self::load_env_config(&options.env) {
            layers.push(env_layer);
        }

        if let Some(cli_layer) = options.cli_args {
            layers.push(cli_layer);
        }

        let mut config = PublishConfig::default();
        for layer in layers {
            Self::merge_into(&mut config, layer);
        }

        config.account = Self::expand_string(&config.account, &options.env);

        Ok(config)
    }

    /// Load one YAML layer; a missing file is not an error
    pub async fn load_config_file(file_path: &Path) -> Result<Option<ConfigLayer>, PublishError> {
        if !file_path.exists() {
            return Ok(None);
        }

        debug!(path = %file_path.display(), "loading configuration file");

        let content = fs::read_to_string(file_path).await.map_err(|e| {
            PublishError::ConfigError(format!(
                "Failed to read config file {}: {}",
                file_path.display(),
                e
            ))
        })?;

        // An empty file deserializes to unit, not a mapping
        if content.trim().is_empty() {
            return Ok(Some(ConfigLayer::default()));
        }

        let layer: ConfigLayer = serde_yaml::from_str(&content).map_err(|e| {
            PublishError::ConfigError(format!(
                "Failed to parse YAML config {}: {}",
                file_path.display(),
                e
            ))
        })?;

        Ok(Some(layer))
    }

    /// Load configuration from environment variables
    fn load_env_config(env: &HashMap<String, String>) -> Option<ConfigLayer> {
        let mut layer = ConfigLayer::default();
        let mut has_changes = false;

        let mut take = |key: &str| -> Option<String> {
            let value = env.get(key).filter(|v| !v.is_empty()).cloned();
            has_changes |= value.is_some();
            value
        };

        layer.account = take("PUBLISH_ACCOUNT");
        layer.host = take("PUBLISH_HOST");
        layer.project = take("PUBLISH_PROJECT");
        layer.branch = take("PUBLISH_BRANCH");

        if env.get("PUBLISH_NON_INTERACTIVE").map(|s| s.as_str()) == Some("true") {
            layer.non_interactive = Some(true);
            has_changes = true;
        }

        if has_changes { Some(layer) } else { None }
    }

    /// Merge source layer into target
    pub fn merge_into(target: &mut PublishConfig, source: ConfigLayer) {
        if let Some(version) = source.version {
            target.version = version;
        }
        if let Some(account) = source.account {
            target.account = account;
        }
        if let Some(host) = source.host {
            target.host = host;
        }
        if let Some(project) = source.project {
            target.project = project;
        }
        if let Some(branch) = source.branch {
            target.branch = branch;
        }
        if let Some(remote) = source.remote {
            target.remote = remote;
        }
        if let Some(message) = source.commit_message {
            target.commit_message = message;
        }

        if let Some(secrets) = source.secrets {
            if let Some(file) = secrets.file {
                target.secrets.file = file;
            }
            if let Some(patterns) = secrets.extra_patterns {
                target.secrets.extra_patterns = patterns;
            }
        }

        if let Some(secs) = source.push_timeout_secs {
            target.push_timeout_secs = (secs > 0).then_some(secs);
        }

        if let Some(non_interactive) = source.non_interactive {
            target.non_interactive = non_interactive;
        }

        if let Some(launcher) = source.launcher {
            if let Some(interpreters) = launcher.interpreters {
                target.launcher.interpreters = interpreters;
            }
            if let Some(entry_point) = launcher.entry_point {
                target.launcher.entry_point = entry_point;
            }
            if let Some(requirements) = launcher.requirements {
                target.launcher.requirements = requirements;
            }
            if let Some(data_dir) = launcher.data_dir {
                target.launcher.data_dir = data_dir;
            }
        }
    }

    /// Expand environment variables in a single string
    ///
    /// Unknown variables are left in place.
    fn expand_string(input: &str, env: &HashMap<String, String>) -> String {
        let Ok(env_var_regex) = Regex::new(ENV_VAR_PATTERN) else {
            return input.to_string();
        };

        let mut result = input.to_string();
        for cap in env_var_regex.captures_iter(input) {
            let var_name = &cap[1];

            if let Some(value) = env.get(var_name) {
                result = result.replace(&format!("${{{}}}", var_name), value);
            } else {
                warn!(variable = var_name, "environment variable not found");
            }
        }

        result
    }

    /// Validate configuration
    pub fn validate(config: &PublishConfig) -> ConfigValidationResult {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        if config.version != CONFIG_SCHEMA_VERSION {
            warnings.push(ConfigValidationWarning {
                field: "version".to_string(),
                message: format!("Unknown version: {}", config.version),
                suggestion: Some(format!(
                    "Currently supported version is \"{}\" only",
                    CONFIG_SCHEMA_VERSION
                )),
            });
        }

        let required = [
            ("host", &config.host),
            ("project", &config.project),
            ("branch", &config.branch),
            ("remote", &config.remote),
            ("commitMessage", &config.commit_message),
            ("secrets.file", &config.secrets.file),
            ("launcher.entryPoint", &config.launcher.entry_point),
        ];

        for (field, value) in required {
            if value.trim().is_empty() {
                errors.push(ConfigValidationError {
                    field: field.to_string(),
                    message: format!("{} must not be empty", field),
                });
            }
        }

        if config.launcher.interpreters.is_empty() {
            errors.push(ConfigValidationError {
                field: "launcher.interpreters".to_string(),
                message: "at least one interpreter is required".to_string(),
            });
        }

        if config.has_placeholder_account() {
            warnings.push(ConfigValidationWarning {
                field: "account".to_string(),
                message: format!("account is still the placeholder {}", PLACEHOLDER_ACCOUNT),
                suggestion: Some("Set account before running publish".to_string()),
            });
        }

        if config.push_timeout_secs.is_none() {
            warnings.push(ConfigValidationWarning {
                field: "pushTimeoutSecs".to_string(),
                message: "push has no timeout".to_string(),
                suggestion: None,
            });
        }

        ConfigValidationResult {
            valid: errors.is_empty(),
            errors,
            warnings,
        }
    }

    /// Format validation result as human-readable string
    pub fn format_validation_result(result: &ConfigValidationResult) -> String {
        let mut lines = Vec::new();

        if result.valid {
            lines.push("✅ Configuration validation succeeded".to_string());
        } else {
            lines.push("❌ Configuration has errors".to_string());
        }

        if !result.errors.is_empty() {
            lines.push("\n🔴 Errors:".to_string());
            for error in &result.errors {
                lines.push(format!("  - [{}] {}", error.field, error.message));
            }
        }

        if !result.warnings.is_empty() {
            lines.push("\n🟡 Warnings:".to_string());
            for warning in &result.warnings {
                lines.push(format!("  - [{}] {}", warning.field, warning.message));
                if let Some(suggestion) = &warning.suggestion {
                    lines.push(format!("    Suggestion: {}", suggestion));
                }
            }
        }

        lines.join("\n")
    }
}
