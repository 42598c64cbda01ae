//! Bot Launcher - prepares the working directory and runs the bot
//!
//! The bot itself is an external Python program; this module only checks
//! its prerequisites, installs requirements and hands the terminal over to
//! the interpreter. The child's exit code is passed back unchanged.

use crate::core::config::LauncherConfig;
use crate::core::error::PublishError;
use crate::security::command_executor::SafeCommandExecutor;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, info};

/// Interpreter names the launcher may run: `python`, `python3`,
/// `python3.<minor>`, `py` and `pypy`/`pypy3`
static PYTHON_INTERPRETER: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^(?:python(?:3(?:\.[0-9]+)?)?|py|pypy3?)$").ok());

fn is_python_interpreter(name: &str) -> bool {
    PYTHON_INTERPRETER
        .as_ref()
        .is_some_and(|pattern| pattern.is_match(name))
}

/// Launch options passed from the CLI
#[derive(Debug, Clone, Default)]
pub struct LaunchOptions {
    /// Skip `pip install -r <requirements>`
    pub skip_install: bool,
}

/// What a launch did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchOutcome {
    /// Interpreter command that ran the bot
    pub interpreter: String,

    /// Whether requirements were installed
    pub installed: bool,

    /// Exit code of the bot process
    pub exit_code: i32,
}

pub struct BotLauncher {
    project_path: PathBuf,
    secrets_file: String,
    config: LauncherConfig,
    executor: SafeCommandExecutor,
}

impl BotLauncher {
    /// Create a launcher for `project_path`
    ///
    /// Configured interpreters join the executor's allow-list only when they
    /// name a Python interpreter.
    ///
    /// # Errors
    ///
    /// Returns `PublishError::ConfigError` if the directory does not exist or
    /// an interpreter is not a Python interpreter name.
    pub fn new<P: AsRef<Path>>(
        project_path: P,
        config: LauncherConfig,
        secrets_file: &str,
    ) -> Result<Self, PublishError> {
        let mut executor = SafeCommandExecutor::new(&project_path)?;
        for interpreter in &config.interpreters {
            if !is_python_interpreter(interpreter) {
                return Err(PublishError::ConfigError(format!(
                    "launcher.interpreters: {} is not a Python interpreter",
                    interpreter
                )));
            }
            executor.allow(interpreter);
        }

        Ok(Self {
            project_path: project_path.as_ref().to_path_buf(),
            secrets_file: secrets_file.to_string(),
            config,
            executor,
        })
    }

    /// First configured interpreter found on PATH
    pub fn find_interpreter(&self) -> Option<String> {
        self.config
            .interpreters
            .iter()
            .find(|candidate| self.executor.resolve(candidate).is_some())
            .cloned()
    }

    /// Check prerequisites, install requirements and run the bot
    ///
    /// # Errors
    ///
    /// - `PublishError::ToolMissing` - no interpreter candidate is installed
    /// - `PublishError::SecretsFileMissing` - the secrets file is absent
    /// - `PublishError::EntryPointMissing` - the bot script is absent
    /// - `PublishError::DependencyInstallFailed` - pip exited unsuccessfully
    pub async fn launch(&self, options: &LaunchOptions) -> Result<LaunchOutcome, PublishError> {
        let interpreter = self
            .find_interpreter()
            .ok_or_else(|| PublishError::ToolMissing {
                tool: self.config.interpreters.join(" / "),
            })?;
        println!("✅ Interpreter: {}", interpreter);

        if !self.project_path.join(&self.secrets_file).is_file() {
            return Err(PublishError::SecretsFileMissing {
                path: self.secrets_file.clone(),
            });
        }
        println!("✅ {} found", self.secrets_file);

        if !self.project_path.join(&self.config.entry_point).is_file() {
            return Err(PublishError::EntryPointMissing {
                path: self.config.entry_point.clone(),
            });
        }

        let data_dir = self.project_path.join(&self.config.data_dir);
        tokio::fs::create_dir_all(&data_dir).await?;
        debug!(dir = %data_dir.display(), "data directory ready");

        let installed = self.install_requirements(&interpreter, options).await?;

        println!("\n🤖 Starting {}...\n", self.config.entry_point);
        info!(interpreter = %interpreter, entry_point = %self.config.entry_point, "launching bot");

        let status = self
            .executor
            .run_attached(&interpreter, &["-u", &self.config.entry_point])
            .await?;

        // Killed by a signal: no code, report generic failure
        let exit_code = status.code().unwrap_or(1);
        info!(exit_code, "bot exited");

        Ok(LaunchOutcome {
            interpreter,
            installed,
            exit_code,
        })
    }

    async fn install_requirements(
        &self,
        interpreter: &str,
        options: &LaunchOptions,
    ) -> Result<bool, PublishError> {
        let requirements = &self.config.requirements;
        if options.skip_install || !self.project_path.join(requirements).is_file() {
            return Ok(false);
        }

        println!("📦 Installing dependencies from {}...", requirements);
        let status = self
            .executor
            .run_attached(interpreter, &["-m", "pip", "install", "-r", requirements])
            .await?;

        if !status.success() {
            return Err(PublishError::DependencyInstallFailed {
                message: match status.code() {
                    Some(code) => format!("pip exited with status {}", code),
                    None => "pip was terminated by a signal".to_string(),
                },
            });
        }

        println!("✅ Dependencies installed");
        Ok(true)
    }
}
