//! Repository Publisher CLI
//!
//! Publishes a bot's working directory to a new hosted git repository

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use repo_publisher::{
    BotLauncher, CONFIG_FILENAME, ConfigLayer, ConfigLoadOptions, ConfigLoader, FailureKind,
    FailureReport, GitPlugin, LaunchOptions, NonInteractivePrompter, Prompter, PublishConfig,
    PublishError, PublishOptions, RepositoryPublisher, StdinPrompter,
};
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::EnvFilter;

/// Git publishing assistant for the student helper bot
#[derive(Parser)]
#[command(name = "repo-publisher")]
#[command(version)]
#[command(about = "Publish a bot's working directory to a hosted git repository", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Commit the working directory and push it to the hosted repository
    Publish {
        /// Project path (defaults to current directory)
        #[arg(value_name = "PROJECT_PATH")]
        project_path: Option<PathBuf>,

        /// Hosting account to publish under
        #[arg(short, long)]
        account: Option<String>,

        /// Create and push a release tag (e.g. 1.0.0)
        #[arg(long)]
        tag: Option<String>,

        /// Never prompt; a staged secrets file aborts the run
        #[arg(long)]
        non_interactive: bool,

        /// Only validate and show the commands that would run
        #[arg(long)]
        dry_run: bool,

        /// Print the report as JSON instead of progress output
        #[arg(long)]
        json: bool,
    },

    /// Check if the project is ready to publish
    Check {
        /// Project path (defaults to current directory)
        #[arg(value_name = "PROJECT_PATH")]
        project_path: Option<PathBuf>,
    },

    /// Install requirements and start the bot
    Launch {
        /// Project path (defaults to current directory)
        #[arg(value_name = "PROJECT_PATH")]
        project_path: Option<PathBuf>,

        /// Do not run pip install
        #[arg(long)]
        skip_install: bool,
    },

    /// Write a default .repo-publisher.yaml
    Init {
        /// Project path (defaults to current directory)
        #[arg(value_name = "PROJECT_PATH")]
        project_path: Option<PathBuf>,

        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run().await {
        Ok(exit_code) => process::exit(exit_code),
        Err(e) => {
            eprintln!("\n❌ Error");
            eprintln!("{:#}", e);
            process::exit(1);
        }
    }
}

async fn run() -> Result<i32> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Publish {
            project_path,
            account,
            tag,
            non_interactive,
            dry_run,
            json,
        } => {
            let path = project_path.unwrap_or_else(|| PathBuf::from("."));
            let cli_layer = ConfigLayer {
                account,
                non_interactive: non_interactive.then_some(true),
                ..Default::default()
            };
            let options = PublishOptions {
                dry_run,
                release_tag: tag,
                quiet: json,
            };
            publish_command(path, cli_layer, options, json).await
        }
        Commands::Check { project_path } => {
            let path = project_path.unwrap_or_else(|| PathBuf::from("."));
            check_command(path).await
        }
        Commands::Launch {
            project_path,
            skip_install,
        } => {
            let path = project_path.unwrap_or_else(|| PathBuf::from("."));
            launch_command(path, LaunchOptions { skip_install }).await
        }
        Commands::Init {
            project_path,
            force,
        } => {
            let path = project_path.unwrap_or_else(|| PathBuf::from("."));
            init_command(path, force).await
        }
    }
}

async fn load_config(
    project_path: &Path,
    cli_layer: Option<ConfigLayer>,
) -> Result<PublishConfig, PublishError> {
    let mut options = ConfigLoadOptions::for_project(project_path);
    options.cli_args = cli_layer;
    ConfigLoader::load(options).await
}

/// Print an error with its remediation hints and return the exit code
fn report_error(error: &PublishError) -> i32 {
    eprintln!("\n❌ {}", error);
    let actions = error.suggested_actions();
    if !actions.is_empty() {
        eprintln!("\n💡 Suggested actions:");
        for action in actions {
            eprintln!("  - {}", action);
        }
    }
    if error.is_recoverable() {
        eprintln!("\n🔁 Completed steps are safe to repeat; run the same command again once fixed.");
    }
    error.kind().exit_code()
}

fn git_for(project_path: &Path, config: &PublishConfig) -> Result<GitPlugin, PublishError> {
    let mut git = GitPlugin::new(project_path)?;
    if config.non_interactive {
        git.disable_terminal_prompts();
    }
    Ok(git)
}

async fn publish_command(
    project_path: PathBuf,
    cli_layer: ConfigLayer,
    options: PublishOptions,
    json: bool,
) -> Result<i32> {
    if !json {
        println!("\n📦 repo-publisher\n");
    }

    let prepared = match load_config(&project_path, Some(cli_layer)).await {
        Ok(config) => git_for(&project_path, &config).map(|git| (config, git)),
        Err(e) => Err(e),
    };
    let (config, git) = match prepared {
        Ok(prepared) => prepared,
        Err(e) if json => {
            println!("{}", serde_json::to_string_pretty(&FailureReport::new(&e, &[]))?);
            return Ok(e.kind().exit_code());
        }
        Err(e) => return Ok(report_error(&e)),
    };

    let prompter: Box<dyn Prompter> = if config.non_interactive {
        Box::new(NonInteractivePrompter)
    } else {
        Box::new(StdinPrompter::new())
    };

    let mut publisher = RepositoryPublisher::new(&project_path, config, Box::new(git), prompter);

    match publisher.publish(options).await {
        Ok(report) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
            Ok(0)
        }
        Err(e) => {
            if json {
                let failure = FailureReport::new(&e, publisher.tracker().transitions());
                println!("{}", serde_json::to_string_pretty(&failure)?);
                Ok(e.kind().exit_code())
            } else {
                Ok(report_error(&e))
            }
        }
    }
}

async fn check_command(project_path: PathBuf) -> Result<i32> {
    println!("\n🔍 Publish Check\n");

    let config = match load_config(&project_path, None).await {
        Ok(config) => config,
        Err(e) => return Ok(report_error(&e)),
    };
    let git = match git_for(&project_path, &config) {
        Ok(git) => git,
        Err(e) => return Ok(report_error(&e)),
    };

    println!("Repository: {}\n", config.repository_url());

    let publisher = RepositoryPublisher::new(
        &project_path,
        config,
        Box::new(git),
        Box::new(NonInteractivePrompter),
    );
    let report = publisher.check().await;

    println!("{}\n", report.render());

    Ok(report
        .first_blocking_failure()
        .map(|kind| kind.exit_code())
        .unwrap_or(0))
}

async fn launch_command(project_path: PathBuf, options: LaunchOptions) -> Result<i32> {
    println!("\n🤖 Bot Launcher\n");

    let config = match load_config(&project_path, None).await {
        Ok(config) => config,
        Err(e) => return Ok(report_error(&e)),
    };

    let launcher = match BotLauncher::new(&project_path, config.launcher, &config.secrets.file) {
        Ok(launcher) => launcher,
        Err(e) => return Ok(report_error(&e)),
    };

    match launcher.launch(&options).await {
        Ok(outcome) => {
            if outcome.exit_code != 0 {
                eprintln!("\n⚠️  Bot exited with status {}", outcome.exit_code);
            }
            Ok(outcome.exit_code)
        }
        Err(e) => Ok(report_error(&e)),
    }
}

async fn init_command(project_path: PathBuf, force: bool) -> Result<i32> {
    println!("\n🎯 Initialize repo-publisher\n");

    let config_path = project_path.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        eprintln!("⚠️  {} already exists", config_path.display());
        eprintln!("Use --force to overwrite it.\n");
        return Ok(FailureKind::Configuration.exit_code());
    }

    let layer = ConfigLayer::from(&PublishConfig::default());
    let yaml = serde_yaml::to_string(&layer).context("Failed to serialize default configuration")?;

    tokio::fs::write(&config_path, yaml)
        .await
        .with_context(|| format!("Failed to write {}", config_path.display()))?;

    println!("✅ Created {}", config_path.display());
    println!("Set `account` to your hosting account name before publishing.\n");
    Ok(0)
}
