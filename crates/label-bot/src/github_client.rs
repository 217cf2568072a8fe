//! GitHub REST client for label operations.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::config::DEFAULT_GITHUB_API_URL;
use crate::error::{MultiError, PlatformError};
use crate::platform::{LabelPlatform, OperationLog};

/// Page size for list endpoints.
const PER_PAGE: usize = 100;

/// Upper bound on pages fetched from one list endpoint.
const MAX_PAGES: usize = 50;

/// Color given to labels created on a collaborator's behalf.
const DEFAULT_LABEL_COLOR: &str = "ededed";

/// GitHub API client used as the [`LabelPlatform`] in production.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    client: reqwest::Client,
    token: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct GitHubError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct GitHubLabel {
    name: String,
}

#[derive(Debug, Deserialize)]
struct GitHubPullRequest {
    #[serde(default)]
    labels: Vec<GitHubLabel>,
}

#[derive(Debug, Deserialize)]
struct GitHubIssueEvent {
    event: String,
    #[serde(default)]
    label: Option<GitHubLabel>,
    created_at: String,
}

#[derive(Debug, Serialize)]
struct CreateLabelRequest<'a> {
    name: &'a str,
    color: &'a str,
}

#[derive(Debug, Serialize)]
struct AddLabelsRequest<'a> {
    labels: &'a [String],
}

#[derive(Debug, Serialize)]
struct CreateCommentRequest<'a> {
    body: &'a str,
}

impl GitHubClient {
    /// Create a client for `api.github.com`.
    pub fn new(token: &str) -> Result<Self, PlatformError> {
        Self::with_base_url(token, DEFAULT_GITHUB_API_URL)
    }

    /// Create a client for another API endpoint (GitHub Enterprise, tests).
    pub fn with_base_url(token: &str, base_url: &str) -> Result<Self, PlatformError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static("label-bot/1.0"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            token: token.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn repo_url(&self, org: &str, repo: &str, rest: &str) -> String {
        format!("{}/repos/{org}/{repo}{rest}", self.base_url)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, PlatformError> {
        let response = request
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .send()
            .await?;
        Ok(response)
    }

    /// Send and turn any non-success status into [`PlatformError::Api`].
    async fn send_ok(&self, request: RequestBuilder) -> Result<Response, PlatformError> {
        let response = self.send(request).await?;
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(api_error(response).await)
        }
    }

    /// Fetch every page of a list endpoint.
    async fn get_all<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
    ) -> Result<Vec<T>, PlatformError> {
        let mut items = Vec::new();
        for page in 1..=MAX_PAGES {
            let request = self
                .client
                .get(url)
                .query(&[("per_page", PER_PAGE), ("page", page)]);
            let batch: Vec<T> = self.send_ok(request).await?.json().await?;
            let done = batch.len() < PER_PAGE;
            items.extend(batch);
            if done {
                return Ok(items);
            }
        }
        warn!(
            url = %url,
            max_pages = MAX_PAGES,
            count = items.len(),
            "List endpoint has more pages than fetched, results truncated"
        );
        Ok(items)
    }

    async fn remove_label(
        &self,
        org: &str,
        repo: &str,
        number: u64,
        label: &str,
    ) -> Result<(), PlatformError> {
        let url = self.repo_url(
            org,
            repo,
            &format!("/issues/{number}/labels/{}", urlencoding::encode(label)),
        );
        let response = self.send(self.client.delete(&url)).await?;

        match response.status() {
            status if status.is_success() => {
                debug!(label = %label, number, "Removed label");
                Ok(())
            }
            StatusCode::NOT_FOUND => {
                debug!(label = %label, number, "Label not found (already removed)");
                Ok(())
            }
            _ => Err(api_error(response).await),
        }
    }
}

async fn api_error(response: Response) -> PlatformError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<GitHubError>(&body)
        .map(|e| e.message)
        .unwrap_or(body);
    PlatformError::Api { status, message }
}

fn label_names(labels: Vec<GitHubLabel>) -> Vec<String> {
    labels.into_iter().map(|l| l.name).collect()
}

#[async_trait]
impl LabelPlatform for GitHubClient {
    #[instrument(skip(self))]
    async fn pull_request_labels(
        &self,
        org: &str,
        repo: &str,
        number: u64,
    ) -> Result<Vec<String>, PlatformError> {
        let url = self.repo_url(org, repo, &format!("/pulls/{number}"));
        let pr: GitHubPullRequest = self.send_ok(self.client.get(&url)).await?.json().await?;
        Ok(label_names(pr.labels))
    }

    #[instrument(skip(self))]
    async fn issue_labels(
        &self,
        org: &str,
        repo: &str,
        number: u64,
    ) -> Result<Vec<String>, PlatformError> {
        let url = self.repo_url(org, repo, &format!("/issues/{number}/labels"));
        Ok(label_names(self.get_all(&url).await?))
    }

    #[instrument(skip(self))]
    async fn repo_labels(&self, org: &str, repo: &str) -> Result<Vec<String>, PlatformError> {
        let url = self.repo_url(org, repo, "/labels");
        let labels = label_names(self.get_all(&url).await?);
        debug!(count = labels.len(), "Fetched repository labels");
        Ok(labels)
    }

    #[instrument(skip(self))]
    async fn create_repo_label(
        &self,
        org: &str,
        repo: &str,
        name: &str,
    ) -> Result<(), PlatformError> {
        let url = self.repo_url(org, repo, "/labels");
        let body = CreateLabelRequest {
            name,
            color: DEFAULT_LABEL_COLOR,
        };
        self.send_ok(self.client.post(&url).json(&body)).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn add_labels(
        &self,
        org: &str,
        repo: &str,
        number: u64,
        labels: &[String],
    ) -> Result<(), PlatformError> {
        if labels.is_empty() {
            return Ok(());
        }
        let url = self.repo_url(org, repo, &format!("/issues/{number}/labels"));
        let body = AddLabelsRequest { labels };
        self.send_ok(self.client.post(&url).json(&body)).await?;
        Ok(())
    }

    /// GitHub removes labels one at a time; every label is attempted and
    /// the failures are reported together.
    #[instrument(skip(self))]
    async fn remove_labels(
        &self,
        org: &str,
        repo: &str,
        number: u64,
        labels: &[String],
    ) -> Result<(), PlatformError> {
        let mut merr = MultiError::new();
        for label in labels {
            if let Err(e) = self.remove_label(org, repo, number, label).await {
                merr.add(format!("{label}: {e}"));
            }
        }
        merr.into_result()
            .map_err(|e| PlatformError::Other(format!("failed to remove labels: {e}")))
    }

    #[instrument(skip(self, body))]
    async fn create_comment(
        &self,
        org: &str,
        repo: &str,
        number: u64,
        body: &str,
    ) -> Result<(), PlatformError> {
        let url = self.repo_url(org, repo, &format!("/issues/{number}/comments"));
        let request = CreateCommentRequest { body };
        self.send_ok(self.client.post(&url).json(&request)).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn is_collaborator(
        &self,
        org: &str,
        repo: &str,
        login: &str,
    ) -> Result<bool, PlatformError> {
        let url = self.repo_url(
            org,
            repo,
            &format!("/collaborators/{}", urlencoding::encode(login)),
        );
        let response = self.send(self.client.get(&url)).await?;
        match response.status() {
            StatusCode::NO_CONTENT => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => Err(api_error(response).await),
        }
    }

    #[instrument(skip(self))]
    async fn list_operation_logs(
        &self,
        org: &str,
        repo: &str,
        number: u64,
    ) -> Result<Vec<OperationLog>, PlatformError> {
        let url = self.repo_url(org, repo, &format!("/issues/{number}/events"));
        let events: Vec<GitHubIssueEvent> = self.get_all(&url).await?;
        Ok(events
            .into_iter()
            .filter(|e| e.event == "labeled" || e.event == "unlabeled")
            .filter_map(|e| {
                let label = e.label?;
                Some(OperationLog {
                    content: format!("{} {}", e.event, label.name),
                    created_at: e.created_at,
                })
            })
            .collect())
    }
}
