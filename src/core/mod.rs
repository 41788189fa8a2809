//! Core types shared by every component of the updater.
//!
//! - [`error`] - [`UpdaterError`], [`ErrorKind`] and terminal error formatting
//! - [`version`] - [`VersionIdentifier`] and [`InstalledState`]

pub mod error;
pub mod version;

pub use error::{
    ErrorContext, ErrorKind, UpdaterError, create_error_context, user_friendly_error,
};
pub use version::{InstalledState, VersionIdentifier};
