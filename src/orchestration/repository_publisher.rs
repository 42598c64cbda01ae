//! Repository Publisher - Main orchestrator for the publish workflow
//!
//! Runs the workflow end to end:
//! - Account, release tag and configuration validation
//! - Tool and identity checks (prompting for a missing identity)
//! - Repository initialization, staging and the staged-secrets guard
//! - Commit, branch, remote registration and push
//! - Success summary or troubleshooting checklist
//!
//! Every failure is terminal and nothing is rolled back. The outcome is a
//! `Result` whose error carries a [`FailureKind`](crate::core::error::FailureKind).

use crate::core::config::PublishConfig;
use crate::core::config_loader::ConfigLoader;
use crate::core::error::{FailureKind, PublishError};
use crate::core::push_failure::PushFailureCause;
use crate::core::state_machine::{StepTransition, WorkflowStep, WorkflowTracker};
use crate::core::traits::{Identity, Prompter, VersionControl};
use crate::orchestration::summary;
use crate::security::secrets_scanner::SecretsScanner;
use crate::validation::{AccountValidator, ReleaseTag, VersionValidator};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, warn};

/// Prompt attempts for a valid identity before giving up
const IDENTITY_ATTEMPTS: usize = 3;

/// Publishing options passed from the CLI
#[derive(Debug, Clone, Default)]
pub struct PublishOptions {
    /// Stop after the identity check and report the planned commands
    pub dry_run: bool,

    /// Release tag to create and push (`1.2.3` or `v1.2.3`)
    pub release_tag: Option<String>,

    /// Suppress progress output (machine-readable mode)
    pub quiet: bool,
}

/// Report returned after a successful run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishReport {
    pub success: bool,
    pub dry_run: bool,
    pub repository_url: String,
    pub remote_url: String,
    pub branch: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub planned: Vec<String>,

    pub warnings: Vec<String>,
    pub transitions: Vec<StepTransition>,
    pub duration_ms: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
}

/// Report describing a failed run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureReport {
    pub success: bool,
    pub kind: FailureKind,
    pub code: String,
    pub message: String,

    /// Re-running can succeed without editing the configuration
    pub recoverable: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_step: Option<WorkflowStep>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<PushFailureCause>,

    pub suggested_actions: Vec<String>,
    pub transitions: Vec<StepTransition>,
}

impl FailureReport {
    pub fn new(error: &PublishError, transitions: &[StepTransition]) -> Self {
        let cause = match error {
            PublishError::PushFailed { cause, .. } => Some(*cause),
            _ => None,
        };
        let failed_step = transitions
            .iter()
            .rev()
            .find(|t| t.to == WorkflowStep::Failed)
            .map(|t| t.from);

        Self {
            success: false,
            kind: error.kind(),
            code: error.code().to_string(),
            message: error.to_string(),
            recoverable: error.is_recoverable(),
            failed_step,
            cause,
            suggested_actions: error
                .suggested_actions()
                .into_iter()
                .map(str::to_string)
                .collect(),
            transitions: transitions.to_vec(),
        }
    }
}

/// One line of the preflight checklist
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreflightCheck {
    pub name: String,
    pub passed: bool,
    pub detail: String,

    /// Failure kind when this check blocks publishing; `None` for advisories
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocking: Option<FailureKind>,
}

/// Result of `check`
#[derive(Debug, Clone, Default, Serialize)]
pub struct PreflightReport {
    pub checks: Vec<PreflightCheck>,
}

impl PreflightReport {
    /// Check whether every blocking check passed
    pub fn ready(&self) -> bool {
        self.first_blocking_failure().is_none()
    }

    /// Kind of the first failed blocking check
    pub fn first_blocking_failure(&self) -> Option<FailureKind> {
        self.checks
            .iter()
            .filter(|c| !c.passed)
            .find_map(|c| c.blocking)
    }

    fn push(&mut self, name: &str, passed: bool, detail: String, blocking: Option<FailureKind>) {
        self.checks.push(PreflightCheck {
            name: name.to_string(),
            passed,
            detail,
            blocking: if passed { None } else { blocking },
        });
    }

    /// Checklist as printed to the operator
    pub fn render(&self) -> String {
        let mut lines: Vec<String> = self
            .checks
            .iter()
            .map(|c| {
                let glyph = match (c.passed, c.blocking) {
                    (true, _) => "✅",
                    (false, Some(_)) => "❌",
                    (false, None) => "⚠️ ",
                };
                format!("{} {}: {}", glyph, c.name, c.detail)
            })
            .collect();

        lines.push(String::new());
        lines.push(if self.ready() {
            "Ready to publish.".to_string()
        } else {
            "Not ready to publish. Fix the items marked ❌ first.".to_string()
        });
        lines.join("\n")
    }
}

/// Main repository publisher orchestrator
pub struct RepositoryPublisher {
    project_path: PathBuf,
    config: PublishConfig,
    vcs: Box<dyn VersionControl>,
    prompter: Box<dyn Prompter>,
    secrets_scanner: SecretsScanner,
    tracker: WorkflowTracker,
    quiet: bool,
}

impl RepositoryPublisher {
    /// Create a new RepositoryPublisher
    ///
    /// # Arguments
    ///
    /// * `project_path` - Working directory being published
    /// * `config` - Resolved configuration
    /// * `vcs` - Version-control tool driven by the workflow
    /// * `prompter` - Operator prompt
    pub fn new<P: AsRef<Path>>(
        project_path: P,
        config: PublishConfig,
        vcs: Box<dyn VersionControl>,
        prompter: Box<dyn Prompter>,
    ) -> Self {
        let mut secrets_scanner = SecretsScanner::new(&config.secrets.file);
        secrets_scanner.configure(config.secrets.extra_patterns.as_slice());

        Self {
            project_path: project_path.as_ref().to_path_buf(),
            config,
            vcs,
            prompter,
            secrets_scanner,
            tracker: WorkflowTracker::new(),
            quiet: false,
        }
    }

    pub fn config(&self) -> &PublishConfig {
        &self.config
    }

    /// Step history of the last run
    pub fn tracker(&self) -> &WorkflowTracker {
        &self.tracker
    }

    /// Publish the working directory
    ///
    /// # Returns
    ///
    /// Publishing report on success. On failure the error's `kind()` tells
    /// the caller which class of problem stopped the run; the step history
    /// stays available through [`tracker`](Self::tracker).
    pub async fn publish(&mut self, options: PublishOptions) -> Result<PublishReport, PublishError> {
        self.tracker = WorkflowTracker::new();
        self.quiet = options.quiet;

        match self.run(&options).await {
            Ok(report) => Ok(report),
            Err(error) => {
                self.tracker.fail(error.code());
                debug!(history = %self.tracker.history(), "publish failed");
                if let PublishError::PushFailed { cause, message } = &error {
                    if !message.is_empty() {
                        self.say(&format!("\n{}", message));
                    }
                    self.say(&format!("\n{}", summary::troubleshooting(&self.config, *cause)));
                }
                Err(error)
            }
        }
    }

    async fn run(&mut self, options: &PublishOptions) -> Result<PublishReport, PublishError> {
        let start_time = Instant::now();
        let mut warnings = Vec::new();

        // 1. Configuration
        self.tracker.transition(WorkflowStep::CheckingConfig, None);
        let release_tag = self.validate_config(options)?;
        if let Some(tag) = release_tag.as_ref().filter(|t| t.is_prerelease()) {
            let warning = format!("{} is a pre-release tag", tag.name());
            self.say(&format!("⚠️  {}", warning));
            warnings.push(warning);
        }
        self.say(&format!(
            "✅ Publishing to {}",
            self.config.repository_url()
        ));

        // 2. Version-control tool
        self.tracker.transition(WorkflowStep::CheckingTool, None);
        if !self.vcs.is_available() {
            return Err(PublishError::ToolMissing {
                tool: self.vcs.name().to_string(),
            });
        }
        self.say(&format!("✅ {} found", self.vcs.name()));

        // 3. Identity
        self.tracker.transition(WorkflowStep::CheckingIdentity, None);
        self.ensure_identity(options.dry_run, &mut warnings).await?;

        if options.dry_run {
            let planned = self.planned_commands(release_tag.as_ref());
            self.say("\n🔍 Dry run: nothing was changed. These commands would run:");
            for command in &planned {
                self.say(&format!("  {}", command));
            }

            return Ok(self.report(true, None, None, planned, warnings, start_time));
        }

        // 4. Repository
        self.tracker.transition(WorkflowStep::Initializing, None);
        self.vcs.init().await?;
        self.say("✅ Repository initialized");

        // 5. Stage everything
        self.tracker.transition(WorkflowStep::Staging, None);
        self.vcs.stage_all().await?;
        let staged = self.vcs.staged_files().await?;
        self.say(&format!("✅ {} file(s) staged", staged.len()));

        // 6. Staged secrets
        self.tracker.transition(WorkflowStep::GuardingSecrets, None);
        self.guard_secrets(&staged).await?;

        // 7. Commit (and tag)
        self.tracker.transition(WorkflowStep::Committing, None);
        let commit = if staged.is_empty() && self.vcs.has_commits().await? {
            let warning = "Nothing new to commit; pushing the existing history".to_string();
            self.say(&format!("⚠️  {}", warning));
            warnings.push(warning);
            None
        } else {
            let id = self.vcs.commit(&self.config.commit_message).await?;
            self.say(&format!("✅ Committed {}", short_id(&id)));
            Some(id)
        };

        if let Some(tag) = &release_tag {
            if let Some(warning) = self.tag_release(tag).await? {
                warnings.push(warning);
            }
        }

        // 8. Branch
        self.tracker.transition(WorkflowStep::Branching, None);
        self.vcs.rename_branch(&self.config.branch).await?;
        self.say(&format!("✅ Branch set to {}", self.config.branch));

        // 9. Remote
        self.tracker.transition(WorkflowStep::RegisteringRemote, None);
        if let Some(warning) = self.register_remote().await? {
            warnings.push(warning);
        }

        // 10. Push
        self.tracker.transition(WorkflowStep::Pushing, None);
        self.say(&format!(
            "\n📤 Pushing {} to {}...",
            self.config.branch, self.config.remote
        ));
        self.push(&self.config.branch, true).await?;

        if let Some(tag) = &release_tag {
            self.push(&tag.name(), false).await?;
        }

        // 11. Summary
        self.tracker.transition(WorkflowStep::Published, None);
        let tag_name = release_tag.as_ref().map(ReleaseTag::name);
        self.say(&format!(
            "\n{}",
            summary::success_summary(&self.config, tag_name.as_deref())
        ));

        Ok(self.report(false, commit, tag_name, Vec::new(), warnings, start_time))
    }

    /// Run the non-mutating checks without prompting
    pub async fn check(&self) -> PreflightReport {
        let mut report = PreflightReport::default();

        match AccountValidator::validate(&self.config.account) {
            Ok(()) => report.push("account", true, self.config.account.clone(), None),
            Err(e) => report.push("account", false, e.to_string(), Some(e.kind())),
        }

        let validation = ConfigLoader::validate(&self.config);
        if validation.valid {
            report.push("configuration", true, "valid".to_string(), None);
        } else {
            let detail = validation
                .errors
                .iter()
                .map(|e| format!("{}: {}", e.field, e.message))
                .collect::<Vec<_>>()
                .join("; ");
            report.push(
                "configuration",
                false,
                detail,
                Some(FailureKind::Configuration),
            );
        }

        let tool = self.vcs.name().to_string();
        let available = self.vcs.is_available();
        report.push(
            &tool,
            available,
            if available {
                "found on PATH".to_string()
            } else {
                "not found on PATH".to_string()
            },
            Some(FailureKind::Environment),
        );

        if available {
            match self.vcs.identity().await {
                Ok(Some(identity)) => report.push(
                    "identity",
                    true,
                    format!("{} <{}>", identity.name, identity.email),
                    None,
                ),
                Ok(None) => report.push(
                    "identity",
                    false,
                    "not configured; publish will ask for it".to_string(),
                    None,
                ),
                Err(e) => report.push("identity", false, e.to_string(), None),
            }
        }

        let gitignore = self.project_path.join(".gitignore");
        let excluded = tokio::fs::read_to_string(&gitignore)
            .await
            .map(|body| self.secrets_scanner.gitignore_excludes(&body))
            .unwrap_or(false);
        report.push(
            ".gitignore",
            excluded,
            if excluded {
                format!("excludes {}", self.config.secrets.file)
            } else {
                format!(
                    "does not exclude {}; it would be staged and need confirmation",
                    self.config.secrets.file
                )
            },
            None,
        );

        report
    }

    fn validate_config(&self, options: &PublishOptions) -> Result<Option<ReleaseTag>, PublishError> {
        AccountValidator::validate(&self.config.account)?;

        let release_tag = options
            .release_tag
            .as_deref()
            .map(VersionValidator::parse_release_tag)
            .transpose()?;

        let validation = ConfigLoader::validate(&self.config);
        for warning in &validation.warnings {
            warn!(field = %warning.field, "{}", warning.message);
        }
        if !validation.valid {
            return Err(PublishError::ConfigError(
                ConfigLoader::format_validation_result(&validation),
            ));
        }

        Ok(release_tag)
    }

    async fn ensure_identity(
        &self,
        dry_run: bool,
        warnings: &mut Vec<String>,
    ) -> Result<(), PublishError> {
        if let Some(identity) = self.vcs.identity().await? {
            self.say(&format!(
                "✅ Git identity: {} <{}>",
                identity.name, identity.email
            ));
            return Ok(());
        }

        if self.config.non_interactive {
            return Err(PublishError::IdentityMissing);
        }

        if dry_run {
            let warning = "Git identity is not configured; publish will ask for it".to_string();
            self.say(&format!("⚠️  {}", warning));
            warnings.push(warning);
            return Ok(());
        }

        self.say("\n⚠️  Git identity (user.name / user.email) is not configured");

        let mut last_error = None;
        for attempt in 1..=IDENTITY_ATTEMPTS {
            let name = self.prompter.ask("Enter your name for commits").await?;
            let email = self.prompter.ask("Enter your email for commits").await?;
            let identity = Identity { name, email };

            match identity.validate() {
                Ok(()) => {
                    self.vcs.set_global_identity(&identity).await?;
                    self.say("✅ Git identity saved globally");
                    return Ok(());
                }
                Err(e) => {
                    debug!(attempt, "rejected identity");
                    self.say(&format!("❌ {}", e));
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or(PublishError::IdentityMissing))
    }

    async fn guard_secrets(&self, staged: &[String]) -> Result<(), PublishError> {
        let scan = self.secrets_scanner.scan_paths(staged);
        if !scan.has_secrets {
            return Ok(());
        }

        self.say("\n⚠️  WARNING: secrets files are staged and would be pushed:");
        for finding in &scan.findings {
            self.say(&format!("  - {} ({})", finding.path, finding.rule));
        }
        self.say(&format!(
            "   Add {} to .gitignore unless you really mean to publish it.",
            self.config.secrets.file
        ));

        let proceed = if self.config.non_interactive {
            false
        } else {
            self.prompter.confirm("Continue anyway?").await?
        };

        if proceed {
            warn!(files = ?scan.paths(), "operator accepted staged secrets");
            Ok(())
        } else {
            Err(PublishError::Declined { files: scan.paths() })
        }
    }

    /// Create the release tag on HEAD, or reuse it when a previous run
    /// already created it there
    async fn tag_release(&self, tag: &ReleaseTag) -> Result<Option<String>, PublishError> {
        let name = tag.name();
        let Some(tagged) = self.vcs.tag_commit(&name).await? else {
            self.vcs
                .create_tag(&name, &tag.message(&self.config.project))
                .await?;
            self.say(&format!("✅ Tagged {}", name));
            return Ok(None);
        };

        let head = self.vcs.head_commit().await?;
        if head.as_deref() != Some(tagged.as_str()) {
            return Err(PublishError::TagConflict {
                tag: name,
                commit: short_id(&tagged).to_string(),
            });
        }

        let warning = format!("Tag {} already exists at HEAD; reusing it", name);
        self.say(&format!("⚠️  {}", warning));
        Ok(Some(warning))
    }

    /// Add the remote, or repoint it when it already exists
    async fn register_remote(&self) -> Result<Option<String>, PublishError> {
        let remote = &self.config.remote;
        let url = self.config.remote_url();

        match self.vcs.remote_url(remote).await? {
            None => {
                self.vcs.add_remote(remote, &url).await?;
                self.say(&format!("✅ Remote {} added: {}", remote, url));
                Ok(None)
            }
            Some(existing) if existing == url => {
                self.say(&format!("✅ Remote {} already points to {}", remote, url));
                Ok(None)
            }
            Some(existing) => {
                self.vcs.set_remote_url(remote, &url).await?;
                let warning = format!("Remote {} changed from {} to {}", remote, existing, url);
                self.say(&format!("⚠️  {}", warning));
                Ok(Some(warning))
            }
        }
    }

    async fn push(&self, refspec: &str, set_upstream: bool) -> Result<(), PublishError> {
        let output = self
            .vcs
            .push(
                &self.config.remote,
                refspec,
                set_upstream,
                self.config.push_timeout(),
            )
            .await?;

        if output.success {
            self.say(&format!("✅ Pushed {}", refspec));
            return Ok(());
        }

        Err(PublishError::PushFailed {
            cause: PushFailureCause::classify(&output.stderr),
            message: output.stderr,
        })
    }

    fn planned_commands(&self, release_tag: Option<&ReleaseTag>) -> Vec<String> {
        let headline = self
            .config
            .commit_message
            .lines()
            .next()
            .unwrap_or_default();
        let remote = &self.config.remote;
        let branch = &self.config.branch;

        let mut planned = vec![
            "git init".to_string(),
            "git add .".to_string(),
            format!("git commit -m \"{}\"", headline),
        ];
        if let Some(tag) = release_tag {
            planned.push(format!("git tag -a {}", tag.name()));
        }
        planned.push(format!("git branch -M {}", branch));
        planned.push(format!(
            "git remote add {} {}",
            remote,
            self.config.remote_url()
        ));
        planned.push(format!("git push -u {} {}", remote, branch));
        if let Some(tag) = release_tag {
            planned.push(format!("git push {} {}", remote, tag.name()));
        }
        planned
    }

    fn report(
        &self,
        dry_run: bool,
        commit: Option<String>,
        tag: Option<String>,
        planned: Vec<String>,
        warnings: Vec<String>,
        start_time: Instant,
    ) -> PublishReport {
        PublishReport {
            success: true,
            dry_run,
            repository_url: self.config.repository_url(),
            remote_url: self.config.remote_url(),
            branch: self.config.branch.clone(),
            commit,
            tag,
            planned,
            warnings,
            transitions: self.tracker.transitions().to_vec(),
            duration_ms: start_time.elapsed().as_millis() as u64,
            published_at: (!dry_run).then(Utc::now),
        }
    }

    fn say(&self, message: &str) {
        if !self.quiet {
            println!("{}", message);
        }
    }
}

fn short_id(id: &str) -> &str {
    id.get(..7).unwrap_or(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::traits::PushOutput;
    use async_trait::async_trait;
    use std::collections::{HashMap, VecDeque};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    // ------------------------------------------------------------------
    // In-memory fakes
    // ------------------------------------------------------------------

    #[derive(Debug)]
    struct RepoState {
        available: bool,
        identity: Option<Identity>,
        global_identity: Option<Identity>,
        initialized: bool,
        working_files: Vec<String>,
        staged: Vec<String>,
        commits: Vec<String>,
        branch: Option<String>,
        remotes: HashMap<String, String>,
        /// Tag name to tagged commit id
        tags: HashMap<String, String>,
        pushed: Vec<String>,
        push_result: PushOutput,
        calls: Vec<String>,
    }

    impl Default for RepoState {
        fn default() -> Self {
            Self {
                available: true,
                identity: Some(Identity {
                    name: "Alice".to_string(),
                    email: "alice@example.com".to_string(),
                }),
                global_identity: None,
                initialized: false,
                working_files: vec!["Open_Source.py".to_string(), "README.md".to_string()],
                staged: Vec::new(),
                commits: Vec::new(),
                branch: None,
                remotes: HashMap::new(),
                tags: HashMap::new(),
                pushed: Vec::new(),
                push_result: PushOutput {
                    success: true,
                    stderr: String::new(),
                },
                calls: Vec::new(),
            }
        }
    }

    #[derive(Clone, Default)]
    struct FakeVcs {
        state: Arc<Mutex<RepoState>>,
    }

    impl FakeVcs {
        fn with(configure: impl FnOnce(&mut RepoState)) -> Self {
            let fake = Self::default();
            configure(&mut fake.state.lock().unwrap());
            fake
        }

        fn state(&self) -> std::sync::MutexGuard<'_, RepoState> {
            self.state.lock().unwrap()
        }

        fn record(&self, call: &str) -> std::sync::MutexGuard<'_, RepoState> {
            let mut state = self.state();
            state.calls.push(call.to_string());
            state
        }
    }

    #[async_trait]
    impl VersionControl for FakeVcs {
        fn name(&self) -> &str {
            "git"
        }

        fn is_available(&self) -> bool {
            self.state().available
        }

        async fn identity(&self) -> Result<Option<Identity>, PublishError> {
            Ok(self.state().identity.clone())
        }

        async fn set_global_identity(&self, identity: &Identity) -> Result<(), PublishError> {
            let mut state = self.record("config --global");
            state.identity = Some(identity.clone());
            state.global_identity = Some(identity.clone());
            Ok(())
        }

        async fn init(&self) -> Result<(), PublishError> {
            self.record("init").initialized = true;
            Ok(())
        }

        async fn stage_all(&self) -> Result<(), PublishError> {
            let mut state = self.record("add");
            let files = std::mem::take(&mut state.working_files);
            state.staged.extend(files);
            Ok(())
        }

        async fn staged_files(&self) -> Result<Vec<String>, PublishError> {
            Ok(self.state().staged.clone())
        }

        async fn has_commits(&self) -> Result<bool, PublishError> {
            Ok(!self.state().commits.is_empty())
        }

        async fn head_commit(&self) -> Result<Option<String>, PublishError> {
            Ok(self.state().commits.last().cloned())
        }

        async fn commit(&self, _message: &str) -> Result<String, PublishError> {
            let mut state = self.record("commit");
            if state.staged.is_empty() {
                return Err(PublishError::CommandError {
                    command: "git commit".to_string(),
                    message: "nothing to commit".to_string(),
                });
            }
            state.staged.clear();
            let id = format!("{:040}", state.commits.len() + 1);
            state.commits.push(id.clone());
            Ok(id)
        }

        async fn rename_branch(&self, branch: &str) -> Result<(), PublishError> {
            self.record("branch").branch = Some(branch.to_string());
            Ok(())
        }

        async fn remote_url(&self, remote: &str) -> Result<Option<String>, PublishError> {
            Ok(self.state().remotes.get(remote).cloned())
        }

        async fn add_remote(&self, remote: &str, url: &str) -> Result<(), PublishError> {
            let mut state = self.record("remote add");
            if state.remotes.contains_key(remote) {
                return Err(PublishError::CommandError {
                    command: "git remote add".to_string(),
                    message: format!("remote {} already exists", remote),
                });
            }
            state.remotes.insert(remote.to_string(), url.to_string());
            Ok(())
        }

        async fn set_remote_url(&self, remote: &str, url: &str) -> Result<(), PublishError> {
            self.record("remote set-url")
                .remotes
                .insert(remote.to_string(), url.to_string());
            Ok(())
        }

        async fn tag_commit(&self, tag: &str) -> Result<Option<String>, PublishError> {
            Ok(self.state().tags.get(tag).cloned())
        }

        async fn create_tag(&self, tag: &str, _message: &str) -> Result<(), PublishError> {
            let mut state = self.record("tag");
            if state.tags.contains_key(tag) {
                return Err(PublishError::CommandError {
                    command: format!("git tag -a {}", tag),
                    message: format!("fatal: tag '{}' already exists", tag),
                });
            }
            let Some(head) = state.commits.last().cloned() else {
                return Err(PublishError::CommandError {
                    command: format!("git tag -a {}", tag),
                    message: "fatal: Failed to resolve 'HEAD' as a valid ref.".to_string(),
                });
            };
            state.tags.insert(tag.to_string(), head);
            Ok(())
        }

        async fn push(
            &self,
            _remote: &str,
            refspec: &str,
            _set_upstream: bool,
            _timeout: Option<Duration>,
        ) -> Result<PushOutput, PublishError> {
            let mut state = self.record("push");
            let result = state.push_result.clone();
            if result.success {
                state.pushed.push(refspec.to_string());
            }
            Ok(result)
        }
    }

    #[derive(Clone, Default)]
    struct ScriptedPrompter {
        answers: Arc<Mutex<VecDeque<String>>>,
        confirmations: Arc<Mutex<VecDeque<bool>>>,
        asked: Arc<Mutex<Vec<String>>>,
    }

    impl ScriptedPrompter {
        fn answering(answers: &[&str]) -> Self {
            let prompter = Self::default();
            prompter
                .answers
                .lock()
                .unwrap()
                .extend(answers.iter().map(|a| a.to_string()));
            prompter
        }

        fn confirming(confirmation: bool) -> Self {
            let prompter = Self::default();
            prompter.confirmations.lock().unwrap().push_back(confirmation);
            prompter
        }

        fn asked(&self) -> Vec<String> {
            self.asked.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Prompter for ScriptedPrompter {
        async fn ask(&self, question: &str) -> Result<String, PublishError> {
            self.asked.lock().unwrap().push(question.to_string());
            Ok(self.answers.lock().unwrap().pop_front().unwrap_or_default())
        }

        async fn confirm(&self, question: &str) -> Result<bool, PublishError> {
            self.asked.lock().unwrap().push(question.to_string());
            Ok(self
                .confirmations
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(false))
        }
    }

    fn config() -> PublishConfig {
        PublishConfig {
            account: "alice".to_string(),
            ..Default::default()
        }
    }

    fn publisher(
        config: PublishConfig,
        vcs: &FakeVcs,
        prompter: &ScriptedPrompter,
    ) -> RepositoryPublisher {
        RepositoryPublisher::new(
            std::env::temp_dir(),
            config,
            Box::new(vcs.clone()),
            Box::new(prompter.clone()),
        )
    }

    fn quiet() -> PublishOptions {
        PublishOptions {
            quiet: true,
            ..Default::default()
        }
    }

    // ------------------------------------------------------------------
    // Workflow
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_publish_success() {
        let vcs = FakeVcs::default();
        let prompter = ScriptedPrompter::default();
        let mut publisher = publisher(config(), &vcs, &prompter);

        let report = publisher.publish(quiet()).await.unwrap();

        assert!(report.success);
        assert!(!report.dry_run);
        assert_eq!(
            report.repository_url,
            "https://github.com/alice/student-helper-bot"
        );
        assert_eq!(report.branch, "main");
        assert!(report.commit.is_some());
        assert!(report.published_at.is_some());

        let state = vcs.state();
        assert_eq!(
            state.calls,
            vec!["init", "add", "commit", "branch", "remote add", "push"]
        );
        assert_eq!(
            state.remotes.get("origin").map(String::as_str),
            Some("https://github.com/alice/student-helper-bot.git")
        );
        assert_eq!(state.pushed, vec!["main"]);
        assert!(prompter.asked().is_empty());
        assert_eq!(publisher.tracker().current(), WorkflowStep::Published);
    }

    #[tokio::test]
    async fn test_placeholder_account_fails_before_any_vcs_action() {
        let vcs = FakeVcs::default();
        let prompter = ScriptedPrompter::default();
        let mut publisher = publisher(PublishConfig::default(), &vcs, &prompter);

        let error = publisher.publish(quiet()).await.unwrap_err();

        assert!(matches!(error, PublishError::PlaceholderAccount { .. }));
        assert_eq!(error.kind(), FailureKind::Configuration);
        assert!(vcs.state().calls.is_empty());
        assert!(!publisher.tracker().mutated());
        assert_eq!(
            publisher.tracker().failed_step(),
            Some(WorkflowStep::CheckingConfig)
        );
    }

    #[tokio::test]
    async fn test_invalid_release_tag_is_configuration_error() {
        let vcs = FakeVcs::default();
        let mut publisher = publisher(config(), &vcs, &ScriptedPrompter::default());

        let error = publisher
            .publish(PublishOptions {
                release_tag: Some("latest".to_string()),
                quiet: true,
                ..Default::default()
            })
            .await
            .unwrap_err();

        assert!(matches!(error, PublishError::InvalidReleaseTag { .. }));
        assert_eq!(error.kind(), FailureKind::Configuration);
        assert!(vcs.state().calls.is_empty());
    }

    #[tokio::test]
    async fn test_missing_tool_fails_before_staging() {
        let vcs = FakeVcs::with(|s| s.available = false);
        let mut publisher = publisher(config(), &vcs, &ScriptedPrompter::default());

        let error = publisher.publish(quiet()).await.unwrap_err();

        assert!(matches!(error, PublishError::ToolMissing { ref tool } if tool == "git"));
        assert_eq!(error.kind(), FailureKind::Environment);
        let state = vcs.state();
        assert!(state.calls.is_empty());
        assert!(state.staged.is_empty());
    }

    #[tokio::test]
    async fn test_existing_identity_is_not_prompted_or_written() {
        let vcs = FakeVcs::default();
        let prompter = ScriptedPrompter::default();
        let mut publisher = publisher(config(), &vcs, &prompter);

        publisher.publish(quiet()).await.unwrap();

        assert!(prompter.asked().is_empty());
        let state = vcs.state();
        assert!(state.global_identity.is_none());
        assert!(!state.calls.contains(&"config --global".to_string()));
    }

    #[tokio::test]
    async fn test_missing_identity_is_prompted_and_saved() {
        let vcs = FakeVcs::with(|s| s.identity = None);
        let prompter = ScriptedPrompter::answering(&["Bob", "bob@example.com"]);
        let mut publisher = publisher(config(), &vcs, &prompter);

        publisher.publish(quiet()).await.unwrap();

        assert_eq!(prompter.asked().len(), 2);
        assert_eq!(
            vcs.state().global_identity,
            Some(Identity {
                name: "Bob".to_string(),
                email: "bob@example.com".to_string(),
            })
        );
    }

    #[tokio::test]
    async fn test_invalid_identity_is_reprompted() {
        let vcs = FakeVcs::with(|s| s.identity = None);
        let prompter =
            ScriptedPrompter::answering(&["Bob", "not-an-email", "Bob", "bob@example.com"]);
        let mut publisher = publisher(config(), &vcs, &prompter);

        publisher.publish(quiet()).await.unwrap();

        assert_eq!(prompter.asked().len(), 4);
        assert!(vcs.state().global_identity.is_some());
    }

    #[tokio::test]
    async fn test_identity_gives_up_after_three_attempts() {
        let vcs = FakeVcs::with(|s| s.identity = None);
        let prompter = ScriptedPrompter::default();
        let mut publisher = publisher(config(), &vcs, &prompter);

        let error = publisher.publish(quiet()).await.unwrap_err();

        assert!(matches!(error, PublishError::InvalidIdentity { .. }));
        assert_eq!(error.kind(), FailureKind::Configuration);
        assert_eq!(prompter.asked().len(), 6);
        let state = vcs.state();
        assert!(state.global_identity.is_none());
        assert!(state.calls.is_empty());
    }

    #[tokio::test]
    async fn test_missing_identity_non_interactive_is_environment_error() {
        let vcs = FakeVcs::with(|s| s.identity = None);
        let prompter = ScriptedPrompter::default();
        let config = PublishConfig {
            non_interactive: true,
            ..config()
        };
        let mut publisher = publisher(config, &vcs, &prompter);

        let error = publisher.publish(quiet()).await.unwrap_err();

        assert!(matches!(error, PublishError::IdentityMissing));
        assert_eq!(error.kind(), FailureKind::Environment);
        assert!(prompter.asked().is_empty());
    }

    // ------------------------------------------------------------------
    // Secrets guard
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_staged_secrets_declined_creates_no_commit() {
        let vcs = FakeVcs::with(|s| s.working_files.push(".env".to_string()));
        let prompter = ScriptedPrompter::confirming(false);
        let mut publisher = publisher(config(), &vcs, &prompter);

        let error = publisher.publish(quiet()).await.unwrap_err();

        assert!(matches!(error, PublishError::Declined { ref files } if files == &[".env"]));
        assert_eq!(error.kind(), FailureKind::Declined);
        assert_eq!(prompter.asked(), vec!["Continue anyway?"]);

        let state = vcs.state();
        assert!(state.commits.is_empty());
        assert!(!state.calls.contains(&"commit".to_string()));
        assert!(state.pushed.is_empty());
    }

    #[tokio::test]
    async fn test_staged_secrets_accepted_continues() {
        let vcs = FakeVcs::with(|s| s.working_files.push("config/.env.local".to_string()));
        let prompter = ScriptedPrompter::confirming(true);
        let mut publisher = publisher(config(), &vcs, &prompter);

        publisher.publish(quiet()).await.unwrap();

        assert_eq!(prompter.asked().len(), 1);
        assert_eq!(vcs.state().commits.len(), 1);
    }

    #[tokio::test]
    async fn test_staged_secrets_non_interactive_declines_without_prompt() {
        let vcs = FakeVcs::with(|s| s.working_files.push(".env".to_string()));
        let prompter = ScriptedPrompter::confirming(true);
        let config = PublishConfig {
            non_interactive: true,
            ..config()
        };
        let mut publisher = publisher(config, &vcs, &prompter);

        let error = publisher.publish(quiet()).await.unwrap_err();

        assert_eq!(error.kind(), FailureKind::Declined);
        assert!(prompter.asked().is_empty());
        assert!(vcs.state().commits.is_empty());
    }

    #[tokio::test]
    async fn test_no_secrets_means_no_prompt() {
        let vcs = FakeVcs::with(|s| {
            s.working_files.push(".env.example".to_string());
            s.working_files.push("docs/environment.md".to_string());
        });
        let prompter = ScriptedPrompter::default();
        let mut publisher = publisher(config(), &vcs, &prompter);

        publisher.publish(quiet()).await.unwrap();

        assert!(prompter.asked().is_empty());
        assert_eq!(vcs.state().commits.len(), 1);
    }

    #[tokio::test]
    async fn test_extra_secret_pattern_from_config() {
        let vcs = FakeVcs::with(|s| s.working_files.push("keys/bot.pem".to_string()));
        let prompter = ScriptedPrompter::confirming(false);
        let mut config = config();
        config.secrets.extra_patterns = vec!["*.pem".to_string()];
        let mut publisher = publisher(config, &vcs, &prompter);

        let error = publisher.publish(quiet()).await.unwrap_err();

        assert_eq!(error.kind(), FailureKind::Declined);
    }

    // ------------------------------------------------------------------
    // Push and re-runs
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_push_failure_keeps_commit_and_branch() {
        let vcs = FakeVcs::with(|s| {
            s.push_result = PushOutput {
                success: false,
                stderr: "remote: Repository not found.\nfatal: repository 'https://github.com/alice/student-helper-bot.git/' not found".to_string(),
            }
        });
        let mut publisher = publisher(config(), &vcs, &ScriptedPrompter::default());

        let error = publisher.publish(quiet()).await.unwrap_err();

        assert!(matches!(
            error,
            PublishError::PushFailed {
                cause: PushFailureCause::RepositoryNotFound,
                ..
            }
        ));
        assert_eq!(error.kind(), FailureKind::Remote);
        assert_eq!(
            publisher.tracker().failed_step(),
            Some(WorkflowStep::Pushing)
        );

        let state = vcs.state();
        assert_eq!(state.commits.len(), 1);
        assert_eq!(state.branch.as_deref(), Some("main"));
        assert!(state.remotes.contains_key("origin"));
        // No automatic retry
        assert_eq!(state.calls.iter().filter(|c| *c == "push").count(), 1);
    }

    #[tokio::test]
    async fn test_rerun_updates_existing_remote() {
        let vcs = FakeVcs::with(|s| {
            s.remotes.insert(
                "origin".to_string(),
                "https://github.com/YOUR_USERNAME/student-helper-bot.git".to_string(),
            );
        });
        let mut publisher = publisher(config(), &vcs, &ScriptedPrompter::default());

        let report = publisher.publish(quiet()).await.unwrap();

        let state = vcs.state();
        assert_eq!(state.remotes.len(), 1);
        assert_eq!(
            state.remotes.get("origin").map(String::as_str),
            Some("https://github.com/alice/student-helper-bot.git")
        );
        assert!(state.calls.contains(&"remote set-url".to_string()));
        assert!(!state.calls.contains(&"remote add".to_string()));
        assert_eq!(report.warnings.len(), 1);
    }

    #[tokio::test]
    async fn test_rerun_after_failed_push_skips_empty_commit() {
        let vcs = FakeVcs::default();
        let mut first = publisher(config(), &vcs, &ScriptedPrompter::default());
        vcs.state().push_result.success = false;
        assert!(first.publish(quiet()).await.is_err());

        vcs.state().push_result.success = true;
        let mut second = publisher(config(), &vcs, &ScriptedPrompter::default());
        let report = second.publish(quiet()).await.unwrap();

        assert!(report.commit.is_none());
        assert_eq!(report.warnings.len(), 1);
        let state = vcs.state();
        assert_eq!(state.commits.len(), 1);
        assert_eq!(state.pushed, vec!["main"]);
        assert_eq!(
            state.calls.iter().filter(|c| *c == "remote add").count(),
            1
        );
    }

    #[tokio::test]
    async fn test_release_tag_is_created_and_pushed() {
        let vcs = FakeVcs::default();
        let mut publisher = publisher(config(), &vcs, &ScriptedPrompter::default());

        let report = publisher
            .publish(PublishOptions {
                release_tag: Some("1.0.0".to_string()),
                quiet: true,
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(report.tag.as_deref(), Some("v1.0.0"));
        let state = vcs.state();
        assert_eq!(state.tags.get("v1.0.0"), state.commits.last());
        assert_eq!(state.pushed, vec!["main", "v1.0.0"]);
    }

    #[tokio::test]
    async fn test_prerelease_tag_is_reported_as_warning() {
        let vcs = FakeVcs::default();
        let mut publisher = publisher(config(), &vcs, &ScriptedPrompter::default());

        let report = publisher
            .publish(PublishOptions {
                release_tag: Some("2.0.0-rc.1".to_string()),
                quiet: true,
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(report.tag.as_deref(), Some("v2.0.0-rc.1"));
        assert_eq!(report.warnings, vec!["v2.0.0-rc.1 is a pre-release tag"]);
    }

    #[tokio::test]
    async fn test_tagged_rerun_after_failed_push_reuses_tag() {
        let tagged = || PublishOptions {
            release_tag: Some("1.0.0".to_string()),
            quiet: true,
            ..Default::default()
        };
        let vcs = FakeVcs::with(|s| s.push_result.success = false);
        let mut first = publisher(config(), &vcs, &ScriptedPrompter::default());
        let error = first.publish(tagged()).await.unwrap_err();
        assert_eq!(error.kind(), FailureKind::Remote);
        assert!(vcs.state().tags.contains_key("v1.0.0"));

        vcs.state().push_result.success = true;
        let mut second = publisher(config(), &vcs, &ScriptedPrompter::default());
        let report = second.publish(tagged()).await.unwrap();

        assert_eq!(report.tag.as_deref(), Some("v1.0.0"));
        assert!(report.commit.is_none());
        assert!(
            report
                .warnings
                .iter()
                .any(|w| w.contains("v1.0.0 already exists at HEAD"))
        );
        let state = vcs.state();
        assert_eq!(state.calls.iter().filter(|c| *c == "tag").count(), 1);
        assert_eq!(state.pushed, vec!["main", "v1.0.0"]);
    }

    #[tokio::test]
    async fn test_tag_on_another_commit_is_configuration_error() {
        let old = format!("{:040}", 99);
        let vcs = FakeVcs::with(|s| {
            s.commits.push(old.clone());
            s.tags.insert("v1.0.0".to_string(), old.clone());
        });
        let mut publisher = publisher(config(), &vcs, &ScriptedPrompter::default());

        let error = publisher
            .publish(PublishOptions {
                release_tag: Some("v1.0.0".to_string()),
                quiet: true,
                ..Default::default()
            })
            .await
            .unwrap_err();

        assert!(matches!(error, PublishError::TagConflict { ref tag, .. } if tag == "v1.0.0"));
        assert_eq!(error.kind(), FailureKind::Configuration);
        assert_eq!(error.code(), "TAG_CONFLICT");
        assert_eq!(
            publisher.tracker().failed_step(),
            Some(WorkflowStep::Committing)
        );
        let state = vcs.state();
        assert_eq!(state.tags.get("v1.0.0"), Some(&old));
        assert!(state.pushed.is_empty());
    }

    #[tokio::test]
    async fn test_dry_run_runs_no_mutating_command() {
        let vcs = FakeVcs::with(|s| s.identity = None);
        let prompter = ScriptedPrompter::default();
        let mut publisher = publisher(config(), &vcs, &prompter);

        let report = publisher
            .publish(PublishOptions {
                dry_run: true,
                quiet: true,
                ..Default::default()
            })
            .await
            .unwrap();

        assert!(report.dry_run);
        assert!(report.published_at.is_none());
        assert!(report.planned.contains(&"git push -u origin main".to_string()));
        assert!(report.planned.contains(
            &"git remote add origin https://github.com/alice/student-helper-bot.git".to_string()
        ));
        assert_eq!(report.warnings.len(), 1);
        assert!(vcs.state().calls.is_empty());
        assert!(prompter.asked().is_empty());
        assert!(!publisher.tracker().mutated());
    }

    #[tokio::test]
    async fn test_custom_host_and_project_in_url() {
        let vcs = FakeVcs::default();
        let config = PublishConfig {
            host: "gitlab.example.org".to_string(),
            project: "homework-bot".to_string(),
            ..config()
        };
        let mut publisher = publisher(config, &vcs, &ScriptedPrompter::default());

        let report = publisher.publish(quiet()).await.unwrap();

        assert_eq!(
            report.repository_url,
            "https://gitlab.example.org/alice/homework-bot"
        );
        assert_eq!(
            report.remote_url,
            "https://gitlab.example.org/alice/homework-bot.git"
        );
    }

    // ------------------------------------------------------------------
    // Reports
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_failure_report() {
        let vcs = FakeVcs::with(|s| {
            s.push_result = PushOutput {
                success: false,
                stderr: "fatal: Authentication failed for 'https://github.com/alice/x.git/'"
                    .to_string(),
            }
        });
        let mut publisher = publisher(config(), &vcs, &ScriptedPrompter::default());
        let error = publisher.publish(quiet()).await.unwrap_err();

        let report = FailureReport::new(&error, publisher.tracker().transitions());

        assert!(!report.success);
        assert_eq!(report.kind, FailureKind::Remote);
        assert_eq!(report.cause, Some(PushFailureCause::Authentication));
        assert_eq!(report.failed_step, Some(WorkflowStep::Pushing));
        assert!(report.recoverable);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["kind"], "remote");
        assert_eq!(json["recoverable"], true);
        assert_eq!(json["failedStep"], "PUSHING");
    }

    #[tokio::test]
    async fn test_publish_report_serializes_camel_case() {
        let vcs = FakeVcs::default();
        let mut publisher = publisher(config(), &vcs, &ScriptedPrompter::default());
        let report = publisher.publish(quiet()).await.unwrap();

        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(
            json["repositoryUrl"],
            "https://github.com/alice/student-helper-bot"
        );
        assert!(json.get("planned").is_none());
        assert!(json["transitions"].as_array().unwrap().len() >= 10);
    }

    // ------------------------------------------------------------------
    // Preflight
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_check_reports_placeholder_and_gitignore() {
        let dir = tempfile::TempDir::new().unwrap();
        let vcs = FakeVcs::with(|s| s.identity = None);
        let publisher = RepositoryPublisher::new(
            dir.path(),
            PublishConfig::default(),
            Box::new(vcs.clone()),
            Box::new(ScriptedPrompter::default()),
        );

        let report = publisher.check().await;

        assert!(!report.ready());
        assert_eq!(
            report.first_blocking_failure(),
            Some(FailureKind::Configuration)
        );
        let gitignore = report.checks.iter().find(|c| c.name == ".gitignore").unwrap();
        assert!(!gitignore.passed);
        assert!(gitignore.blocking.is_none());
        assert!(report.render().contains("❌ account"));
        assert!(vcs.state().calls.is_empty());
    }

    #[tokio::test]
    async fn test_check_ready() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join(".gitignore"), "__pycache__/\n.env\n").unwrap();
        let vcs = FakeVcs::default();
        let publisher = RepositoryPublisher::new(
            dir.path(),
            config(),
            Box::new(vcs),
            Box::new(ScriptedPrompter::default()),
        );

        let report = publisher.check().await;

        assert!(report.ready());
        assert!(report.checks.iter().all(|c| c.passed));
        assert!(report.render().ends_with("Ready to publish."));
    }

    #[tokio::test]
    async fn test_check_gitignore_without_secrets_file_is_advisory() {
        let dir = tempfile::TempDir::new().unwrap();
        tokio::fs::write(dir.path().join(".gitignore"), "__pycache__/\n.env.example\n")
            .await
            .unwrap();
        let publisher = RepositoryPublisher::new(
            dir.path(),
            config(),
            Box::new(FakeVcs::default()),
            Box::new(ScriptedPrompter::default()),
        );

        let report = publisher.check().await;

        let gitignore = report.checks.iter().find(|c| c.name == ".gitignore").unwrap();
        assert!(!gitignore.passed);
        assert!(gitignore.detail.contains("does not exclude .env"));
        assert!(report.ready());
    }

    #[tokio::test]
    async fn test_check_missing_tool_is_environment() {
        let dir = tempfile::TempDir::new().unwrap();
        let vcs = FakeVcs::with(|s| s.available = false);
        let publisher = RepositoryPublisher::new(
            dir.path(),
            config(),
            Box::new(vcs),
            Box::new(ScriptedPrompter::default()),
        );

        let report = publisher.check().await;

        assert_eq!(
            report.first_blocking_failure(),
            Some(FailureKind::Environment)
        );
        assert!(report.checks.iter().all(|c| c.name != "identity"));
    }
}
