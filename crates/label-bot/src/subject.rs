//! The pull request or issue being labeled.
//!
//! Both kinds of subject share [`LabelSubject`]; the handler picks the
//! implementation once per event and the reconciliation code never looks at
//! which one it got.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::PlatformError;
use crate::labels::LabelSet;
use crate::platform::{LabelCreation, LabelPlatform, OperationLog};

/// Kind of subject, used for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubjectKind {
    PullRequest,
    Issue,
}

impl fmt::Display for SubjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PullRequest => write!(f, "pull request"),
            Self::Issue => write!(f, "issue"),
        }
    }
}

/// Label operations on one pull request or issue and its repository.
#[async_trait]
pub trait LabelSubject: Send + Sync {
    fn org(&self) -> &str;
    fn repo(&self) -> &str;
    fn number(&self) -> u64;
    fn kind(&self) -> SubjectKind;
    fn platform(&self) -> &dyn LabelPlatform;

    /// Labels applied right now, read from the platform.
    async fn current_labels(&self) -> Result<LabelSet, PlatformError>;

    async fn add_labels(&self, labels: &[String]) -> Result<(), PlatformError> {
        self.platform()
            .add_labels(self.org(), self.repo(), self.number(), labels)
            .await
    }

    async fn remove_labels(&self, labels: &[String]) -> Result<(), PlatformError> {
        self.platform()
            .remove_labels(self.org(), self.repo(), self.number(), labels)
            .await
    }

    async fn add_comment(&self, body: &str) -> Result<(), PlatformError> {
        self.platform()
            .create_comment(self.org(), self.repo(), self.number(), body)
            .await
    }

    async fn operation_logs(&self) -> Result<Vec<OperationLog>, PlatformError> {
        self.platform()
            .list_operation_logs(self.org(), self.repo(), self.number())
            .await
    }

    /// Label inventory of the repository.
    async fn labels_of_repo(&self) -> Result<LabelSet, PlatformError> {
        let labels = self.platform().repo_labels(self.org(), self.repo()).await?;
        Ok(LabelSet::new(labels))
    }

    async fn is_collaborator(&self, login: &str) -> Result<bool, PlatformError> {
        self.platform()
            .is_collaborator(self.org(), self.repo(), login)
            .await
    }

    /// Create each label in the repository; a failure does not stop the rest.
    async fn create_labels_of_repo(&self, names: &[String]) -> LabelCreation {
        let mut creation = LabelCreation::default();
        for name in names {
            match self
                .platform()
                .create_repo_label(self.org(), self.repo(), name)
                .await
            {
                Ok(()) => {
                    debug!(
                        org = %self.org(),
                        repo = %self.repo(),
                        label = %name,
                        "Created repository label"
                    );
                    creation.created.push(name.clone());
                }
                Err(e) => {
                    warn!(
                        org = %self.org(),
                        repo = %self.repo(),
                        label = %name,
                        error = %e,
                        "Failed to create repository label"
                    );
                    creation.errors.add(format!("create label {name}: {e}"));
                    creation.failed.push(name.clone());
                }
            }
        }
        creation
    }
}

/// A pull request subject.
pub struct PullRequestSubject {
    platform: Arc<dyn LabelPlatform>,
    org: String,
    repo: String,
    number: u64,
}

impl PullRequestSubject {
    #[must_use]
    pub fn new(platform: Arc<dyn LabelPlatform>, org: &str, repo: &str, number: u64) -> Self {
        Self {
            platform,
            org: org.to_string(),
            repo: repo.to_string(),
            number,
        }
    }
}

#[async_trait]
impl LabelSubject for PullRequestSubject {
    fn org(&self) -> &str {
        &self.org
    }

    fn repo(&self) -> &str {
        &self.repo
    }

    fn number(&self) -> u64 {
        self.number
    }

    fn kind(&self) -> SubjectKind {
        SubjectKind::PullRequest
    }

    fn platform(&self) -> &dyn LabelPlatform {
        self.platform.as_ref()
    }

    async fn current_labels(&self) -> Result<LabelSet, PlatformError> {
        let labels = self
            .platform
            .pull_request_labels(&self.org, &self.repo, self.number)
            .await?;
        Ok(LabelSet::new(labels))
    }
}

/// An issue subject.
pub struct IssueSubject {
    platform: Arc<dyn LabelPlatform>,
    org: String,
    repo: String,
    number: u64,
}

impl IssueSubject {
    #[must_use]
    pub fn new(platform: Arc<dyn LabelPlatform>, org: &str, repo: &str, number: u64) -> Self {
        Self {
            platform,
            org: org.to_string(),
            repo: repo.to_string(),
            number,
        }
    }
}

#[async_trait]
impl LabelSubject for IssueSubject {
    fn org(&self) -> &str {
        &self.org
    }

    fn repo(&self) -> &str {
        &self.repo
    }

    fn number(&self) -> u64 {
        self.number
    }

    fn kind(&self) -> SubjectKind {
        SubjectKind::Issue
    }

    fn platform(&self) -> &dyn LabelPlatform {
        self.platform.as_ref()
    }

    async fn current_labels(&self) -> Result<LabelSet, PlatformError> {
        let labels = self
            .platform
            .issue_labels(&self.org, &self.repo, self.number)
            .await?;
        Ok(LabelSet::new(labels))
    }
}
