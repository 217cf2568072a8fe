//! In-memory [`LabelPlatform`] used by unit tests.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::PlatformError;
use crate::labels::canonical;
use crate::platform::{LabelPlatform, OperationLog};

/// A call made against the fake platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    PullRequestLabels,
    IssueLabels,
    RepoLabels,
    CreateRepoLabel(String),
    AddLabels(Vec<String>),
    RemoveLabels(Vec<String>),
    Comment(String),
    IsCollaborator(String),
    OperationLogs,
}

#[derive(Default)]
struct State {
    applied: Vec<String>,
    repo_labels: Vec<String>,
    collaborators: Vec<String>,
    logs: Vec<OperationLog>,
    calls: Vec<Call>,
    failing: HashSet<&'static str>,
    failing_creates: HashSet<String>,
}

/// Records every call and keeps applied labels and the repository
/// inventory in memory.
#[derive(Default)]
pub struct FakePlatform {
    state: Mutex<State>,
}

fn api_error(what: &str) -> PlatformError {
    PlatformError::Api {
        status: 500,
        message: format!("{what} failed"),
    }
}

impl FakePlatform {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut State) -> T) -> T {
        let mut state = self.state.lock().unwrap();
        f(&mut state)
    }

    pub fn set_labels<S: AsRef<str>>(&self, labels: impl IntoIterator<Item = S>) {
        self.with_state(|s| {
            s.applied = labels.into_iter().map(|l| l.as_ref().to_string()).collect();
        });
    }

    pub fn set_repo_labels<S: AsRef<str>>(&self, labels: impl IntoIterator<Item = S>) {
        self.with_state(|s| {
            s.repo_labels = labels.into_iter().map(|l| l.as_ref().to_string()).collect();
        });
    }

    pub fn add_collaborator(&self, login: &str) {
        self.with_state(|s| s.collaborators.push(login.to_string()));
    }

    pub fn push_log(&self, content: &str, created_at: &str) {
        self.with_state(|s| {
            s.logs.push(OperationLog {
                content: content.to_string(),
                created_at: created_at.to_string(),
            });
        });
    }

    /// Make one operation fail: `add`, `remove`, `comment`, `collaborator`,
    /// `repo_labels`, `labels` or `logs`.
    pub fn fail(&self, operation: &'static str) {
        self.with_state(|s| s.failing.insert(operation));
    }

    pub fn fail_create(&self, name: &str) {
        self.with_state(|s| s.failing_creates.insert(name.to_string()));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.with_state(|s| s.calls.clone())
    }

    pub fn labels(&self) -> Vec<String> {
        self.with_state(|s| s.applied.clone())
    }

    pub fn repo_label_names(&self) -> Vec<String> {
        self.with_state(|s| s.repo_labels.clone())
    }

    pub fn comments(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Comment(body) => Some(body),
                _ => None,
            })
            .collect()
    }

    pub fn added(&self) -> Vec<Vec<String>> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::AddLabels(labels) => Some(labels),
                _ => None,
            })
            .collect()
    }

    pub fn removed(&self) -> Vec<Vec<String>> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::RemoveLabels(labels) => Some(labels),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call, operation: &'static str) -> Result<(), PlatformError> {
        self.with_state(|s| {
            s.calls.push(call);
            if s.failing.contains(operation) {
                Err(api_error(operation))
            } else {
                Ok(())
            }
        })
    }
}

#[async_trait]
impl LabelPlatform for FakePlatform {
    async fn pull_request_labels(
        &self,
        _org: &str,
        _repo: &str,
        _number: u64,
    ) -> Result<Vec<String>, PlatformError> {
        self.record(Call::PullRequestLabels, "labels")?;
        Ok(self.labels())
    }

    async fn issue_labels(
        &self,
        _org: &str,
        _repo: &str,
        _number: u64,
    ) -> Result<Vec<String>, PlatformError> {
        self.record(Call::IssueLabels, "labels")?;
        Ok(self.labels())
    }

    async fn repo_labels(&self, _org: &str, _repo: &str) -> Result<Vec<String>, PlatformError> {
        self.record(Call::RepoLabels, "repo_labels")?;
        Ok(self.repo_label_names())
    }

    async fn create_repo_label(
        &self,
        _org: &str,
        _repo: &str,
        name: &str,
    ) -> Result<(), PlatformError> {
        self.with_state(|s| {
            s.calls.push(Call::CreateRepoLabel(name.to_string()));
            if s.failing_creates.contains(name) {
                return Err(api_error("create"));
            }
            s.repo_labels.push(name.to_string());
            Ok(())
        })
    }

    async fn add_labels(
        &self,
        _org: &str,
        _repo: &str,
        _number: u64,
        labels: &[String],
    ) -> Result<(), PlatformError> {
        self.record(Call::AddLabels(labels.to_vec()), "add")?;
        self.with_state(|s| {
            for label in labels {
                if !s.applied.iter().any(|l| canonical(l) == canonical(label)) {
                    s.applied.push(label.clone());
                }
            }
        });
        Ok(())
    }

    async fn remove_labels(
        &self,
        _org: &str,
        _repo: &str,
        _number: u64,
        labels: &[String],
    ) -> Result<(), PlatformError> {
        self.record(Call::RemoveLabels(labels.to_vec()), "remove")?;
        self.with_state(|s| {
            s.applied
                .retain(|l| !labels.iter().any(|r| canonical(r) == canonical(l)));
        });
        Ok(())
    }

    async fn create_comment(
        &self,
        _org: &str,
        _repo: &str,
        _number: u64,
        body: &str,
    ) -> Result<(), PlatformError> {
        self.record(Call::Comment(body.to_string()), "comment")
    }

    async fn is_collaborator(
        &self,
        _org: &str,
        _repo: &str,
        login: &str,
    ) -> Result<bool, PlatformError> {
        self.record(Call::IsCollaborator(login.to_string()), "collaborator")?;
        Ok(self.with_state(|s| s.collaborators.iter().any(|c| c == login)))
    }

    async fn list_operation_logs(
        &self,
        _org: &str,
        _repo: &str,
        _number: u64,
    ) -> Result<Vec<OperationLog>, PlatformError> {
        self.record(Call::OperationLogs, "logs")?;
        Ok(self.with_state(|s| s.logs.clone()))
    }
}
