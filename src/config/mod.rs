//! Configuration management.
//!
//! - [`global`] - the TOML configuration file ([`UpdaterConfig`]) and its defaults
//! - [`tools`] - one-time resolution of external tool locations ([`ToolPaths`])
//!
//! Configuration is loaded once per invocation by the CLI layer and turned
//! into explicit values (install settings, run paths, tool paths) that are
//! passed down. Components never read the configuration file themselves.

pub mod global;
pub mod tools;

pub use global::{
    AppConfig, DownloadConfig, FeedConfig, NotifyConfig, PathsConfig, UpdaterConfig,
};
pub use tools::{ToolPaths, ToolsConfig};
