//! Orchestration layer for repository publishing
//!
//! This module provides the high-level workflow components: the publish
//! runner, its operator prompts and output, and the bot launcher.

pub mod launcher;
pub mod prompt;
pub mod repository_publisher;
pub mod summary;

// Re-export main types for convenience
pub use launcher::{BotLauncher, LaunchOptions, LaunchOutcome};
pub use prompt::{NonInteractivePrompter, StdinPrompter};
pub use repository_publisher::{
    FailureReport, PreflightCheck, PreflightReport, PublishOptions, PublishReport,
    RepositoryPublisher,
};
