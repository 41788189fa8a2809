//! Integration tests for bundle-updater
//!
//! Workflow and transaction tests wire the real orchestration to the fakes in
//! `bundle_updater::test_utils`; HTTP tests run against a local `wiremock`
//! server; CLI tests run the built binary with `assert_cmd`.
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **harness**: shared fixture wiring a workflow to fakes in a temp directory
//! - **workflow**: decision paths, notifications and exit codes
//! - **transaction**: failure cleanup, residue recovery, run serialization
//! - **feed**: feed client and artifact download over HTTP
//! - **cli**: the binary, its configuration handling and run log

mod cli;
mod feed;
mod harness;
mod transaction;
mod workflow;
