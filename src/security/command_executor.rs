//! SafeCommandExecutor: Type-safe command execution with injection prevention
//!
//! # Security Features
//!
//! - **Whitelist-based validation**: Only pre-approved commands can execute
//! - **Injection prevention**: Uses `tokio::process::Command`, never a shell
//! - **Argument sanitization**: Arguments passed as a slice, never interpolated into shell strings
//! - **Working directory validation**: Validates existence before execution
//! - **Timeout control**: Long-running or hanging processes are killed
//!
//! # Example
//!
//! ```rust,no_run
//! use repo_publisher::SafeCommandExecutor;
//! use std::time::Duration;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let executor = SafeCommandExecutor::new(std::env::temp_dir()).unwrap();
//!
//! let output = executor
//!     .execute("git", &["--version"], Some(Duration::from_secs(30)))
//!     .await
//!     .unwrap();
//! println!("{}", String::from_utf8_lossy(&output.stdout));
//! # }
//! ```

use crate::core::error::PublishError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Output, Stdio};
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

/// Commands allowed by default.
///
/// The launcher adds versioned Python interpreters (e.g. `python3.12`) with
/// [`SafeCommandExecutor::allow`] after checking the name.
const ALLOWED_COMMANDS: &[&str] = &["git", "python", "python3", "py"];

/// Errors that can occur during command execution
#[derive(Error, Debug)]
pub enum CommandError {
    /// Command is not in the allowed whitelist
    #[error("Command '{0}' is not in the allowed whitelist")]
    CommandNotAllowed(String),

    /// Executable could not be resolved on PATH
    #[error("Command '{0}' was not found on PATH")]
    CommandNotFound(String),

    /// Working directory does not exist or is not accessible
    #[error("Working directory does not exist: {0}")]
    InvalidWorkingDirectory(PathBuf),

    /// Command execution failed (e.g., permission denied)
    #[error("Command '{command}' failed to run: {message}")]
    ExecutionFailed { command: String, message: String },

    /// Command exceeded the timeout duration
    #[error("Command '{command}' timed out after {timeout:?}")]
    Timeout { command: String, timeout: Duration },
}

impl From<CommandError> for PublishError {
    fn from(error: CommandError) -> Self {
        match error {
            CommandError::CommandNotFound(tool) => PublishError::ToolMissing { tool },
            CommandError::Timeout { command, timeout } => PublishError::Timeout {
                command,
                seconds: timeout.as_secs(),
            },
            CommandError::CommandNotAllowed(command) => PublishError::CommandError {
                message: "not in the allowed whitelist".to_string(),
                command,
            },
            CommandError::InvalidWorkingDirectory(path) => PublishError::ConfigError(format!(
                "Working directory does not exist: {}",
                path.display()
            )),
            CommandError::ExecutionFailed { command, message } => {
                PublishError::CommandError { command, message }
            }
        }
    }
}

/// Safe command executor with security controls
///
/// This struct provides a secure way to execute external commands with:
/// - Whitelist validation
/// - Working directory control
/// - Per-call timeout management
/// - Injection prevention through `tokio::process::Command`
#[derive(Debug, Clone)]
pub struct SafeCommandExecutor {
    /// Working directory where commands will be executed
    working_dir: PathBuf,
    /// Commands permitted in addition to `ALLOWED_COMMANDS`
    extra_allowed: Vec<String>,
    /// Environment variables set on every child
    env: HashMap<String, String>,
}

impl SafeCommandExecutor {
    /// Create a new SafeCommandExecutor with working directory validation.
    ///
    /// # Errors
    ///
    /// Returns `CommandError::InvalidWorkingDirectory` if the directory does not exist.
    pub fn new<P: AsRef<Path>>(working_dir: P) -> Result<Self, CommandError> {
        let working_dir = working_dir.as_ref().to_path_buf();

        if !working_dir.is_dir() {
            return Err(CommandError::InvalidWorkingDirectory(working_dir));
        }

        Ok(Self {
            working_dir,
            extra_allowed: Vec::new(),
            env: HashMap::new(),
        })
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Permit an additional command
    pub fn allow(&mut self, command: &str) {
        if !self.is_allowed(command) {
            self.extra_allowed.push(command.to_string());
        }
    }

    /// Set an environment variable for every command run by this executor
    pub fn set_env(&mut self, key: &str, value: &str) {
        self.env.insert(key.to_string(), value.to_string());
    }

    pub fn is_allowed(&self, command: &str) -> bool {
        ALLOWED_COMMANDS.contains(&command) || self.extra_allowed.iter().any(|c| c == command)
    }

    /// Resolve a command on PATH, preferring a `PATH` set on this executor
    ///
    /// Returns `None` when the command is not allowed or not installed.
    pub fn resolve(&self, command: &str) -> Option<PathBuf> {
        if !self.is_allowed(command) {
            return None;
        }
        match self.env.get("PATH") {
            Some(path) => which::which_in(command, Some(path), &self.working_dir).ok(),
            None => which::which(command).ok(),
        }
    }

    /// Execute a command and capture its output.
    ///
    /// A non-zero exit status is not an error; inspect `Output::status`.
    ///
    /// # Errors
    ///
    /// - `CommandError::CommandNotAllowed` - Command not in whitelist
    /// - `CommandError::CommandNotFound` - Binary not found
    /// - `CommandError::ExecutionFailed` - Spawn or wait failed
    /// - `CommandError::Timeout` - Child killed after `timeout`
    pub async fn execute(
        &self,
        command: &str,
        args: &[&str],
        timeout: Option<Duration>,
    ) -> Result<Output, CommandError> {
        let mut cmd = self.command(command, args)?;
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let child = cmd.spawn().map_err(|e| Self::spawn_error(command, e))?;
        let wait = child.wait_with_output();

        let result = match timeout {
            Some(limit) => tokio::time::timeout(limit, wait).await.map_err(|_| {
                CommandError::Timeout {
                    command: command.to_string(),
                    timeout: limit,
                }
            })?,
            None => wait.await,
        };

        result.map_err(|e| CommandError::ExecutionFailed {
            command: command.to_string(),
            message: e.to_string(),
        })
    }

    /// Execute a command with the terminal attached (inherited stdio).
    pub async fn run_attached(
        &self,
        command: &str,
        args: &[&str],
    ) -> Result<ExitStatus, CommandError> {
        let mut cmd = self.command(command, args)?;
        cmd.stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        let mut child = cmd.spawn().map_err(|e| Self::spawn_error(command, e))?;
        child.wait().await.map_err(|e| CommandError::ExecutionFailed {
            command: command.to_string(),
            message: e.to_string(),
        })
    }

    fn command(&self, command: &str, args: &[&str]) -> Result<Command, CommandError> {
        if !self.is_allowed(command) {
            return Err(CommandError::CommandNotAllowed(command.to_string()));
        }

        debug!(command, ?args, dir = %self.working_dir.display(), "executing command");

        let mut cmd = Command::new(command);
        cmd.args(args)
            .current_dir(&self.working_dir)
            .envs(&self.env)
            .kill_on_drop(true);
        Ok(cmd)
    }

    fn spawn_error(command: &str, error: std::io::Error) -> CommandError {
        if error.kind() == std::io::ErrorKind::NotFound {
            CommandError::CommandNotFound(command.to_string())
        } else {
            CommandError::ExecutionFailed {
                command: command.to_string(),
                message: error.to_string(),
            }
        }
    }
}
