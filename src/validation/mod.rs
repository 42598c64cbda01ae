pub mod account_validator;
pub mod version_validator;

pub use account_validator::AccountValidator;
pub use version_validator::{ReleaseTag, VersionValidator};
