//! Comment-driven label reconciliation for GitHub pull requests and issues.
//!
//! This crate provides:
//! - Label command parsing (`/kind bug`, `/remove-sig storage`)
//! - Case-insensitive reconciliation of requested, applied and available labels
//! - Branch-change label clearing, the needs-squash label and label expiry
//! - Per-repository YAML configuration
//! - GitHub REST client and webhook signature verification
//! - HTTP server for webhook handling (standalone service)

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)] // Most operations reach the GitHub API

pub mod config;
pub mod error;
pub mod github_client;
pub mod handlers;
pub mod labels;
pub mod platform;
pub mod server;
pub mod subject;
pub mod webhooks;

#[cfg(test)]
mod testing;

pub use config::{BotConfig, Config, Configuration};
pub use error::{ConfigError, LabelError, MultiError, PlatformError};
pub use github_client::GitHubClient;
pub use handlers::{LabelBot, NoteOutcome, PrOutcome};
pub use labels::{LabelRequest, LabelSet};
pub use platform::{LabelPlatform, OperationLog};
pub use subject::{IssueSubject, LabelSubject, PullRequestSubject};
pub use webhooks::verify_webhook_signature;
