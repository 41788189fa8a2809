//! bundle-updater - unattended updater for disk-image distributed applications
//!
//! Keeps an application bundle (by default LibreWolf on macOS) up to date. A
//! scheduler runs the binary once a day; each run compares the installed
//! version against the newest entry of a release feed and, when they differ,
//! downloads the disk image, mounts it, copies the bundle into place and
//! cleans up. The user is told what happened through desktop notifications.
//!
//! # Architecture Overview
//!
//! ```text
//! UpdateWorkflow
//!   ├── InstallProbe      installed version from Contents/Info.plist
//!   ├── ReleaseFeed       newest version from the release feed
//!   ├── decide            not installed / up to date / update available
//!   ├── InstallTransaction
//!   │     preflight -> download -> verify -> mount -> copy -> cleanup
//!   └── Notifier          one message per milestone
//! ```
//!
//! Versions are compared by exact string equality. There is no version
//! ordering anywhere: a different string on the feed is an update.
//!
//! Each run uses its own artifact file and mount point, derived from a run id,
//! and holds an advisory lock for the length of the install, so overlapping
//! scheduler invocations wait for each other instead of racing.
//!
//! # Modules
//!
//! - [`core`] - error types and version values
//! - [`config`] - TOML configuration and tool locations
//! - [`feed`] - release feed client
//! - [`probe`] - installed version probe
//! - [`decision`] - the update decision table
//! - [`install`] - the install transaction and its collaborators
//! - [`notify`] - user notifications
//! - [`workflow`] - the top-level run
//! - [`logging`] - stderr and run log setup
//! - [`cli`] - command-line front end
//!
//! # Command-Line Usage
//!
//! ```bash
//! # What the scheduler runs
//! bundle-updater
//!
//! # Look without touching anything
//! bundle-updater check
//! bundle-updater check --json
//!
//! # Configuration
//! bundle-updater config path
//! bundle-updater config show
//! ```

pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod decision;
pub mod feed;
pub mod install;
pub mod logging;
pub mod notify;
pub mod probe;
pub mod workflow;

// test_utils module is available for both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
