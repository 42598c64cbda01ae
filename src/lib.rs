pub mod core;
pub mod orchestration;
pub mod plugins;
pub mod security;
pub mod validation;

pub use core::*;
pub use orchestration::{
    BotLauncher, FailureReport, LaunchOptions, LaunchOutcome, NonInteractivePrompter,
    PreflightCheck, PreflightReport, PublishOptions, PublishReport, RepositoryPublisher,
    StdinPrompter,
};
pub use plugins::GitPlugin;
pub use security::{
    CommandError, SafeCommandExecutor, ScanReport, SecretFinding, SecretRule, SecretsScanner,
};
pub use validation::{AccountValidator, ReleaseTag, VersionValidator};
