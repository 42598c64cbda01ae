pub mod command_executor;
pub mod secrets_scanner;

pub use command_executor::{CommandError, SafeCommandExecutor};
pub use secrets_scanner::{ScanReport, SecretFinding, SecretRule, SecretsScanner};
