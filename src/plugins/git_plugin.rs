//! Git Plugin - drives the `git` command line for the publish workflow
//!
//! Every operation shells out through [`SafeCommandExecutor`], so arguments
//! (commit messages, URLs, identities) are never interpreted by a shell.

use crate::core::error::PublishError;
use crate::core::traits::{Identity, PushOutput, VersionControl};
use crate::security::command_executor::SafeCommandExecutor;
use async_trait::async_trait;
use std::path::Path;
use std::process::Output;
use std::time::Duration;

const GIT: &str = "git";

/// `VersionControl` implementation backed by the git CLI
#[derive(Debug, Clone)]
pub struct GitPlugin {
    executor: SafeCommandExecutor,
}

impl GitPlugin {
    /// Create a plugin operating in `project_path`
    ///
    /// # Errors
    ///
    /// Returns `PublishError::ConfigError` if the directory does not exist.
    pub fn new<P: AsRef<Path>>(project_path: P) -> Result<Self, PublishError> {
        Ok(Self {
            executor: SafeCommandExecutor::new(project_path)?,
        })
    }

    /// Wrap a preconfigured executor (custom environment, e.g. in tests)
    pub fn with_executor(executor: SafeCommandExecutor) -> Self {
        Self { executor }
    }

    /// Make git fail instead of asking for credentials on the terminal
    pub fn disable_terminal_prompts(&mut self) {
        self.executor.set_env("GIT_TERMINAL_PROMPT", "0");
    }

    async fn run(&self, args: &[&str], timeout: Option<Duration>) -> Result<Output, PublishError> {
        Ok(self.executor.execute(GIT, args, timeout).await?)
    }

    /// Run git and require success, returning trimmed stdout
    async fn run_ok(&self, args: &[&str]) -> Result<String, PublishError> {
        let output = self.run(args, None).await?;

        if !output.status.success() {
            return Err(PublishError::CommandError {
                command: format!("git {}", args.join(" ")),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Commit id a revision resolves to; `None` when it does not resolve
    async fn resolve_commit(&self, revision: &str) -> Result<Option<String>, PublishError> {
        let output = self
            .run(&["rev-parse", "--verify", "--quiet", revision], None)
            .await?;
        let id = String::from_utf8_lossy(&output.stdout).trim().to_string();

        Ok((output.status.success() && !id.is_empty()).then_some(id))
    }

    /// Value of a config key; `None` when unset or empty
    async fn config_value(&self, key: &str) -> Result<Option<String>, PublishError> {
        let output = self.run(&["config", "--get", key], None).await?;
        let value = String::from_utf8_lossy(&output.stdout).trim().to_string();

        Ok((output.status.success() && !value.is_empty()).then_some(value))
    }
}

#[async_trait]
impl VersionControl for GitPlugin {
    fn name(&self) -> &str {
        GIT
    }

    fn is_available(&self) -> bool {
        self.executor.resolve(GIT).is_some()
    }

    async fn identity(&self) -> Result<Option<Identity>, PublishError> {
        let name = self.config_value("user.name").await?;
        let email = self.config_value("user.email").await?;

        Ok(match (name, email) {
            (Some(name), Some(email)) => Some(Identity { name, email }),
            _ => None,
        })
    }

    async fn set_global_identity(&self, identity: &Identity) -> Result<(), PublishError> {
        self.run_ok(&["config", "--global", "user.name", identity.name.trim()])
            .await?;
        self.run_ok(&["config", "--global", "user.email", identity.email.trim()])
            .await?;
        Ok(())
    }

    async fn init(&self) -> Result<(), PublishError> {
        self.run_ok(&["init"]).await.map(|_| ())
    }

    async fn stage_all(&self) -> Result<(), PublishError> {
        self.run_ok(&["add", "."]).await.map(|_| ())
    }

    async fn staged_files(&self) -> Result<Vec<String>, PublishError> {
        // -z keeps unusual file names unquoted
        let output = self.run_ok(&["diff", "--cached", "--name-only", "-z"]).await?;

        Ok(output
            .split('\0')
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect())
    }

    async fn has_commits(&self) -> Result<bool, PublishError> {
        Ok(self.head_commit().await?.is_some())
    }

    async fn head_commit(&self) -> Result<Option<String>, PublishError> {
        self.resolve_commit("HEAD^{commit}").await
    }

    async fn commit(&self, message: &str) -> Result<String, PublishError> {
        self.run_ok(&["commit", "-m", message]).await?;
        self.run_ok(&["rev-parse", "HEAD"]).await
    }

    async fn rename_branch(&self, branch: &str) -> Result<(), PublishError> {
        self.run_ok(&["branch", "-M", branch]).await.map(|_| ())
    }

    async fn remote_url(&self, remote: &str) -> Result<Option<String>, PublishError> {
        // Raw configured value; `remote get-url` would apply insteadOf rewrites
        self.config_value(&format!("remote.{}.url", remote)).await
    }

    async fn add_remote(&self, remote: &str, url: &str) -> Result<(), PublishError> {
        self.run_ok(&["remote", "add", remote, url]).await.map(|_| ())
    }

    async fn set_remote_url(&self, remote: &str, url: &str) -> Result<(), PublishError> {
        self.run_ok(&["remote", "set-url", remote, url])
            .await
            .map(|_| ())
    }

    async fn tag_commit(&self, tag: &str) -> Result<Option<String>, PublishError> {
        // Peel annotated tags down to the tagged commit
        self.resolve_commit(&format!("refs/tags/{}^{{commit}}", tag))
            .await
    }

    async fn create_tag(&self, tag: &str, message: &str) -> Result<(), PublishError> {
        self.run_ok(&["tag", "-a", tag, "-m", message])
            .await
            .map(|_| ())
    }

    async fn push(
        &self,
        remote: &str,
        refspec: &str,
        set_upstream: bool,
        timeout: Option<Duration>,
    ) -> Result<PushOutput, PublishError> {
        let mut args = vec!["push"];
        if set_upstream {
            args.push("-u");
        }
        args.extend([remote, refspec]);

        let output = self.run(&args, timeout).await?;

        Ok(PushOutput {
            success: output.status.success(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}
