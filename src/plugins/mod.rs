pub mod git_plugin;

pub use git_plugin::GitPlugin;
