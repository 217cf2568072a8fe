//! Remote label platform abstraction.
//!
//! Everything the reconciliation core needs from the code-hosting service
//! goes through [`LabelPlatform`]. [`crate::GitHubClient`] is the production
//! implementation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{MultiError, PlatformError};

/// One entry of a subject's operation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationLog {
    /// Human-readable description, e.g. `labeled ci/passed`
    pub content: String,
    /// RFC 3339 timestamp as reported by the platform
    pub created_at: String,
}

/// Result of creating several repository labels one by one.
#[derive(Debug, Default)]
pub struct LabelCreation {
    /// Labels that now exist in the repository
    pub created: Vec<String>,
    /// Names that could not be created, with their errors
    pub failed: Vec<String>,
    pub errors: MultiError,
}

/// Label, comment and permission operations on a code-hosting platform.
#[async_trait]
pub trait LabelPlatform: Send + Sync {
    /// Labels currently applied to a pull request.
    async fn pull_request_labels(
        &self,
        org: &str,
        repo: &str,
        number: u64,
    ) -> Result<Vec<String>, PlatformError>;

    /// Labels currently applied to an issue.
    async fn issue_labels(
        &self,
        org: &str,
        repo: &str,
        number: u64,
    ) -> Result<Vec<String>, PlatformError>;

    /// Every label defined in the repository.
    async fn repo_labels(&self, org: &str, repo: &str) -> Result<Vec<String>, PlatformError>;

    /// Define a new label in the repository.
    async fn create_repo_label(&self, org: &str, repo: &str, name: &str)
        -> Result<(), PlatformError>;

    /// Apply labels to an issue or pull request in one call.
    async fn add_labels(
        &self,
        org: &str,
        repo: &str,
        number: u64,
        labels: &[String],
    ) -> Result<(), PlatformError>;

    /// Remove labels from an issue or pull request.
    async fn remove_labels(
        &self,
        org: &str,
        repo: &str,
        number: u64,
        labels: &[String],
    ) -> Result<(), PlatformError>;

    async fn create_comment(
        &self,
        org: &str,
        repo: &str,
        number: u64,
        body: &str,
    ) -> Result<(), PlatformError>;

    /// Whether `login` has collaborator access to the repository.
    async fn is_collaborator(&self, org: &str, repo: &str, login: &str)
        -> Result<bool, PlatformError>;

    /// Label history of an issue or pull request.
    async fn list_operation_logs(
        &self,
        org: &str,
        repo: &str,
        number: u64,
    ) -> Result<Vec<OperationLog>, PlatformError>;
}
