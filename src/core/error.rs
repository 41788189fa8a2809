//! Error handling for the updater
//!
//! The error system follows two principles:
//! 1. **Strongly-typed errors** so the workflow can map every failure to a
//!    notification, a [`TransactionOutcome`](crate::install::TransactionOutcome)
//!    and an exit code
//! 2. **User-friendly messages** with actionable suggestions for whoever reads
//!    the notification or the terminal
//!
//! # Architecture
//!
//! - [`UpdaterError`] - Enumerated failure cases of one update run
//! - [`ErrorKind`] - Payload-free tag of an [`UpdaterError`], used for outcomes and exit codes
//! - [`ErrorContext`] - Wrapper that adds details and suggestions for terminal output
//!
//! Every run-level failure is fatal for the current invocation. Nothing in the
//! core retries; the next scheduled run is the retry.
//!
//! # Examples
//!
//! ```rust,no_run
//! use bundle_updater::core::{ErrorKind, UpdaterError};
//!
//! let error = UpdaterError::MountError {
//!     image: "/tmp/librewolf.dmg".to_string(),
//!     reason: "hdiutil: attach failed - image not recognized".to_string(),
//! };
//! assert_eq!(error.kind(), ErrorKind::Mount);
//! assert_eq!(error.kind().exit_code(), 5);
//! ```

use colored::Colorize;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// The main error type for update runs.
///
/// Each variant carries the URL or path involved and the underlying reason so
/// the run log shows exactly what went wrong, while
/// [`user_message`](UpdaterError::user_message) produces the shorter text
/// shown in notifications.
#[derive(Error, Debug)]
pub enum UpdaterError {
    /// The release feed could not be fetched (connection failure, timeout or non-2xx status).
    #[error("Failed to fetch release feed from {url}: {reason}")]
    NetworkError {
        url: String,
        reason: String,
    },

    /// The release feed was fetched but contains no usable newest entry title.
    #[error("Release feed at {url} has no readable version: {reason}")]
    ParseError {
        url: String,
        reason: String,
    },

    /// The artifact download failed, or produced a missing or empty file.
    #[error("Failed to download {url}: {reason}")]
    DownloadError {
        url: String,
        reason: String,
    },

    /// The downloaded disk image could not be mounted.
    #[error("Failed to mount disk image {image}: {reason}")]
    MountError {
        image: String,
        reason: String,
    },

    /// Copying the bundle from the mounted volume into the install directory failed.
    #[error("Failed to copy {bundle} into {destination}: {reason}")]
    CopyError {
        bundle: String,
        destination: String,
        reason: String,
    },

    /// The copy finished but the installed bundle does not match the volume contents.
    #[error("Installed bundle at {path} does not match the disk image: {reason}")]
    CopyVerificationError {
        path: String,
        reason: String,
    },

    #[error("Configuration error: {message}")]
    ConfigError {
        message: String,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),
}

/// Payload-free classification of an [`UpdaterError`].
///
/// Used as the failure tag of a transaction outcome and to derive the process
/// exit code in the binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Network,
    Parse,
    Download,
    Mount,
    Copy,
    CopyVerification,
    Config,
    Io,
}

impl ErrorKind {
    /// Process exit code for a run that failed with this kind.
    ///
    /// `0` is reserved for runs that reached a decision, including "up to date"
    /// and "not installed".
    #[must_use]
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::Config | Self::Io => 1,
            Self::Network => 2,
            Self::Parse => 3,
            Self::Download => 4,
            Self::Mount => 5,
            Self::Copy => 6,
            Self::CopyVerification => 7,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Network => "network",
            Self::Parse => "parse",
            Self::Download => "download",
            Self::Mount => "mount",
            Self::Copy => "copy",
            Self::CopyVerification => "copy verification",
            Self::Config => "configuration",
            Self::Io => "io",
        };
        f.write_str(name)
    }
}

impl UpdaterError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NetworkError {
                ..
            } => ErrorKind::Network,
            Self::ParseError {
                ..
            } => ErrorKind::Parse,
            Self::DownloadError {
                ..
            } => ErrorKind::Download,
            Self::MountError {
                ..
            } => ErrorKind::Mount,
            Self::CopyError {
                ..
            } => ErrorKind::Copy,
            Self::CopyVerificationError {
                ..
            } => ErrorKind::CopyVerification,
            Self::ConfigError {
                ..
            }
            | Self::TomlError(_) => ErrorKind::Config,
            Self::IoError(_) => ErrorKind::Io,
        }
    }

    /// Human-readable, actionable text for the failure notification.
    ///
    /// Kept short enough for a desktop notification; the full error with
    /// paths and reasons goes to the run log.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::NetworkError {
                ..
            } => "Could not reach the release feed. Check your internet connection; the next scheduled run will try again.".to_string(),
            Self::ParseError {
                ..
            } => "The release feed did not contain a readable version. The next scheduled run will try again.".to_string(),
            Self::DownloadError {
                ..
            } => "Downloading the update failed. The next scheduled run will try again.".to_string(),
            Self::MountError {
                ..
            } => "The downloaded disk image could not be opened; the download is probably corrupted. The next scheduled run will download it again.".to_string(),
            Self::CopyError {
                destination,
                ..
            } => format!(
                "Installing the update into {destination} failed. Check free disk space and permissions."
            ),
            Self::CopyVerificationError {
                path,
                ..
            } => format!(
                "The update was copied but {path} looks incomplete. Reinstall the application manually if it does not start."
            ),
            Self::ConfigError {
                message,
            } => format!("The updater is misconfigured: {message}"),
            Self::IoError(e) => format!("The updater hit a file system error: {e}"),
            Self::TomlError(_) => "The updater configuration file could not be parsed.".to_string(),
        }
    }
}

/// Error context wrapper that provides user-friendly terminal output.
///
/// Combines an [`UpdaterError`] with optional details and a suggestion. The
/// binary prints it to stderr when a run cannot even start (for example when
/// the configuration file is malformed).
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: UpdaterError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    #[must_use]
    pub const fn new(error: UpdaterError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Display the error context to stderr with terminal colors.
    ///
    /// - Error message: red and bold
    /// - Details: yellow
    /// - Suggestion: green
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error into an [`ErrorContext`] with suggestions.
///
/// Recognizes [`UpdaterError`] anywhere in the anyhow chain, TOML parse
/// errors and common IO failures; everything else becomes a
/// [`UpdaterError::ConfigError`] carrying the full error chain.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    let error = match error.downcast::<UpdaterError>() {
        Ok(updater_error) => return create_error_context(updater_error),
        Err(error) => error,
    };

    for cause in error.chain() {
        if let Some(toml_error) = cause.downcast_ref::<toml::de::Error>() {
            return ErrorContext::new(UpdaterError::ConfigError {
                message: toml_error.to_string(),
            })
            .with_suggestion("Check the TOML syntax of the configuration file. Run 'bundle-updater config path' to see which file is used")
            .with_details(format!("{error:#}"));
        }

        if let Some(io_error) = cause.downcast_ref::<std::io::Error>() {
            match io_error.kind() {
                std::io::ErrorKind::PermissionDenied => {
                    return ErrorContext::new(UpdaterError::ConfigError {
                        message: format!("{error:#}"),
                    })
                    .with_suggestion("Check ownership of the configuration, work and log directories")
                    .with_details("The updater could not read or write one of its own files");
                }
                std::io::ErrorKind::NotFound => {
                    return ErrorContext::new(UpdaterError::ConfigError {
                        message: format!("{error:#}"),
                    })
                    .with_suggestion("Check that the configured paths exist");
                }
                _ => {}
            }
        }
    }

    ErrorContext::new(UpdaterError::ConfigError {
        message: format!("{error:#}"),
    })
}

/// Wrap an [`UpdaterError`] with a suggestion matching its kind.
#[must_use]
pub fn create_error_context(error: UpdaterError) -> ErrorContext {
    let suggestion = match error.kind() {
        ErrorKind::Network => "Check your internet connection and the [feed] url setting",
        ErrorKind::Parse => "Check that [feed] url points at an Atom or RSS release feed",
        ErrorKind::Download => "Check the [download] base_url and artifact template",
        ErrorKind::Mount => "Delete the work directory and run the updater again",
        ErrorKind::Copy | ErrorKind::CopyVerification => {
            "Check free disk space and write permission on the install directory"
        }
        ErrorKind::Config | ErrorKind::Io => {
            "Run 'bundle-updater config show' to inspect the effective configuration"
        }
    };
    ErrorContext::new(error).with_suggestion(suggestion)
}
