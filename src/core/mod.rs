pub mod config;
pub mod config_loader;
pub mod error;
pub mod push_failure;
pub mod state_machine;
pub mod traits;

pub use config::*;
pub use config_loader::*;
pub use error::*;
pub use push_failure::*;
pub use state_machine::*;
pub use traits::*;
