//! Secrets scanner for detecting a staged secrets file
//!
//! The workflow stages the whole working tree. Before committing, the staged
//! paths are checked for the local secrets file (`.env` and its variants) so
//! credentials are not pushed by accident.

use regex::Regex;
use std::fmt;
use std::path::Path;
use tracing::warn;

/// Suffixes of committed templates of the secrets file (`.env.example`)
const TEMPLATE_SUFFIXES: &[&str] = &["example", "sample", "template", "dist"];

/// Why a staged path was flagged
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretRule {
    /// Exact secrets file name
    SecretsFile,
    /// Secrets file with an environment suffix (`.env.local`)
    SecretsFileVariant,
    /// User-configured glob pattern
    CustomPattern(String),
}

impl fmt::Display for SecretRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecretRule::SecretsFile => write!(f, "secrets file"),
            SecretRule::SecretsFileVariant => write!(f, "secrets file variant"),
            SecretRule::CustomPattern(p) => write!(f, "pattern {}", p),
        }
    }
}

/// A single flagged path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretFinding {
    pub path: String,
    pub rule: SecretRule,
}

/// Report from scanning staged paths
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    pub has_secrets: bool,
    pub findings: Vec<SecretFinding>,
    pub scanned_paths: usize,
}

impl ScanReport {
    /// Flagged paths, in staging order
    pub fn paths(&self) -> Vec<String> {
        self.findings.iter().map(|f| f.path.clone()).collect()
    }
}

/// Scanner for staged secrets files
///
/// # Examples
///
/// ```
/// use repo_publisher::security::SecretsScanner;
///
/// let scanner = SecretsScanner::new(".env");
/// let report = scanner.scan_paths(&["src/main.py".to_string(), ".env".to_string()]);
///
/// assert!(report.has_secrets);
/// assert_eq!(report.paths(), vec![".env".to_string()]);
/// ```
#[derive(Debug, Clone)]
pub struct SecretsScanner {
    secrets_file: String,
    custom_patterns: Vec<(String, Regex)>,
}

impl Default for SecretsScanner {
    fn default() -> Self {
        Self::new(crate::core::config::DEFAULT_SECRETS_FILE)
    }
}

impl SecretsScanner {
    /// Creates a scanner for the given secrets file name
    pub fn new(secrets_file: &str) -> Self {
        Self {
            secrets_file: secrets_file.to_string(),
            custom_patterns: Vec::new(),
        }
    }

    /// Configures additional glob-style patterns
    ///
    /// Invalid patterns are skipped with a warning.
    ///
    /// # Examples
    ///
    /// ```
    /// use repo_publisher::security::SecretsScanner;
    ///
    /// let mut scanner = SecretsScanner::new(".env");
    /// scanner.configure(&["*.pem"]);
    /// assert!(scanner.is_sensitive("certs/server.pem"));
    /// ```
    pub fn configure<S: AsRef<str>>(&mut self, patterns: &[S]) {
        self.custom_patterns = patterns
            .iter()
            .filter_map(|p| {
                let p = p.as_ref();
                match Self::glob_to_regex(p) {
                    Some(regex) => Some((p.to_string(), regex)),
                    None => {
                        warn!(pattern = p, "ignoring invalid secrets pattern");
                        None
                    }
                }
            })
            .collect();
    }

    /// Scans staged paths for secrets files
    pub fn scan_paths(&self, paths: &[String]) -> ScanReport {
        let findings: Vec<SecretFinding> = paths
            .iter()
            .filter_map(|path| {
                self.classify(path).map(|rule| SecretFinding {
                    path: path.clone(),
                    rule,
                })
            })
            .collect();

        ScanReport {
            has_secrets: !findings.is_empty(),
            findings,
            scanned_paths: paths.len(),
        }
    }

    pub fn is_sensitive(&self, path: &str) -> bool {
        self.classify(path).is_some()
    }

    /// Rule flagging the path, if any
    fn classify(&self, path: &str) -> Option<SecretRule> {
        let base = Path::new(path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string());

        if base == self.secrets_file {
            return Some(SecretRule::SecretsFile);
        }

        if let Some(suffix) = base
            .strip_prefix(self.secrets_file.as_str())
            .and_then(|rest| rest.strip_prefix('.'))
            && !suffix.is_empty()
            && !TEMPLATE_SUFFIXES.contains(&suffix.to_lowercase().as_str())
        {
            return Some(SecretRule::SecretsFileVariant);
        }

        self.custom_patterns
            .iter()
            .find(|(_, regex)| regex.is_match(path) || regex.is_match(&base))
            .map(|(pattern, _)| SecretRule::CustomPattern(pattern.clone()))
    }

    /// Check whether a `.gitignore` body excludes the secrets file
    ///
    /// Only patterns that can match a top-level file are considered;
    /// negations (`!.env`) re-include it.
    pub fn gitignore_excludes(&self, gitignore: &str) -> bool {
        let mut excluded = false;

        for line in gitignore.lines().map(str::trim) {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (negated, pattern) = match line.strip_prefix('!') {
                Some(rest) => (true, rest),
                None => (false, line),
            };
            let pattern = pattern.trim_start_matches('/');
            if pattern.ends_with('/') {
                continue;
            }

            if let Some(regex) = Self::glob_to_regex(pattern)
                && regex.is_match(&self.secrets_file)
            {
                excluded = !negated;
            }
        }

        excluded
    }

    /// Converts glob pattern to an anchored regex
    ///
    /// `*` matches any run of characters, `?` a single character.
    fn glob_to_regex(glob: &str) -> Option<Regex> {
        let mut pattern = String::from("^");
        for c in glob.chars() {
            match c {
                '*' => pattern.push_str(".*"),
                '?' => pattern.push('.'),
                other => pattern.push_str(&regex::escape(&other.to_string())),
            }
        }
        pattern.push('$');

        Regex::new(&pattern).ok()
    }
}
