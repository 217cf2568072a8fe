//! Configuration for the label service.
//!
//! Two layers: [`Config`] holds process settings read from the environment,
//! [`Configuration`] holds the per-repository plugin items read from a YAML
//! file.

use std::env;
use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::error::ConfigError;

/// Default path of the repository plugin file.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/label-bot/config.yaml";

/// Default GitHub REST endpoint.
pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";

/// Label applied when a pull request has too many commits.
pub const DEFAULT_SQUASH_LABEL: &str = "stat/needs-squash";

/// Label service configuration.
#[derive(Clone)]
pub struct Config {
    /// HTTP server port.
    pub port: u16,
    /// Path of the YAML file with per-repository config items.
    pub plugin_config_path: String,
    /// GitHub token for API calls.
    pub github_token: Option<String>,
    /// GitHub REST API base URL.
    pub github_api_url: String,
    /// Webhook secret for `X-Hub-Signature-256` verification.
    pub webhook_secret: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: env::var("LABEL_BOT_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(8080),
            plugin_config_path: env::var("LABEL_BOT_CONFIG")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string()),
            github_token: env::var("GITHUB_TOKEN").ok().filter(|s| !s.is_empty()),
            github_api_url: env::var("GITHUB_API_URL")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_GITHUB_API_URL.to_string()),
            webhook_secret: env::var("GITHUB_WEBHOOK_SECRET")
                .ok()
                .filter(|s| !s.is_empty()),
        }
    }
}

/// Squash-label policy of a repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SquashConfig {
    /// Turns the commit check off even when a threshold is set.
    #[serde(default)]
    pub unable_checks_commits: bool,
    /// Pull requests with more commits than this get the squash label.
    #[serde(default)]
    pub commits_threshold: u32,
    #[serde(default = "default_squash_label")]
    pub squash_commit_label: String,
}

fn default_squash_label() -> String {
    DEFAULT_SQUASH_LABEL.to_string()
}

impl Default for SquashConfig {
    fn default() -> Self {
        Self {
            unable_checks_commits: false,
            commits_threshold: 0,
            squash_commit_label: default_squash_label(),
        }
    }
}

impl SquashConfig {
    /// Whether the commit count should be checked at all.
    #[must_use]
    pub const fn needs_check_commits(&self) -> bool {
        !self.unable_checks_commits && self.commits_threshold > 0
    }
}

/// A label that must be removed once it has been applied for too long.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidateLabelConfig {
    pub label: String,
    /// How long the label stays valid after it was added, in hours.
    pub active_time: u32,
}

impl ValidateLabelConfig {
    /// Whether a label added at `added_at` has expired at `now`.
    #[must_use]
    pub fn is_expired(&self, added_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        added_at + Duration::hours(i64::from(self.active_time)) < now
    }
}

/// Label settings for a set of repositories.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BotConfig {
    /// `org` or `org/repo` entries this item applies to.
    #[serde(default)]
    pub repos: Vec<String>,
    /// `org/repo` entries excluded from an org-wide item.
    #[serde(default)]
    pub excluded_repos: Vec<String>,

    /// Labels removed when the source branch of a pull request changes.
    #[serde(default)]
    pub clear_labels: Vec<String>,
    /// Pattern of further labels removed when the source branch changes.
    #[serde(default)]
    pub clear_labels_by_regexp: Option<String>,
    #[serde(skip)]
    clear_labels_regex: Option<Regex>,

    /// Lets collaborators create labels the repository does not have yet.
    #[serde(default)]
    pub allow_creating_labels_by_collaborator: bool,

    #[serde(default)]
    pub labels_to_validate: Vec<ValidateLabelConfig>,

    #[serde(default)]
    pub squash_config: SquashConfig,
}

/// How a config item matched a repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RepoMatch {
    Exact,
    Org,
}

impl BotConfig {
    /// Compiled `clear_labels_by_regexp`, available after validation.
    #[must_use]
    pub fn clear_labels_regex(&self) -> Option<&Regex> {
        self.clear_labels_regex.as_ref()
    }

    fn validate(&mut self) -> Result<(), ConfigError> {
        if self.repos.iter().all(|r| r.trim().is_empty()) {
            return Err(ConfigError::Invalid("repos must not be empty".to_string()));
        }

        if let Some(pattern) = self.clear_labels_by_regexp.as_deref().filter(|p| !p.is_empty()) {
            let regex = Regex::new(pattern).map_err(|source| ConfigError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            })?;
            self.clear_labels_regex = Some(regex);
        }

        for item in &self.labels_to_validate {
            if item.label.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "labels_to_validate entry has an empty label".to_string(),
                ));
            }
            if item.active_time == 0 {
                return Err(ConfigError::Invalid(format!(
                    "active_time of {} must be positive",
                    item.label
                )));
            }
        }

        if self.squash_config.needs_check_commits()
            && self.squash_config.squash_commit_label.trim().is_empty()
        {
            return Err(ConfigError::Invalid(
                "squash_commit_label must be set when commits_threshold is set".to_string(),
            ));
        }

        Ok(())
    }

    fn matches(&self, org: &str, repo: &str) -> Option<RepoMatch> {
        repo_match(&self.repos, &self.excluded_repos, org, repo)
    }
}

fn repo_match(
    repos: &[String],
    excluded_repos: &[String],
    org: &str,
    repo: &str,
) -> Option<RepoMatch> {
    let full_name = format!("{org}/{repo}");
    if repos.iter().any(|r| r == &full_name) {
        return Some(RepoMatch::Exact);
    }
    if repos.iter().any(|r| r == org) && !excluded_repos.contains(&full_name) {
        return Some(RepoMatch::Org);
    }
    None
}

/// A config item rejected at load time.
#[derive(Debug, Clone)]
struct RejectedItem {
    repos: Vec<String>,
    excluded_repos: Vec<String>,
    reason: String,
}

impl RejectedItem {
    fn matches(&self, org: &str, repo: &str) -> Option<RepoMatch> {
        repo_match(&self.repos, &self.excluded_repos, org, repo)
    }
}

#[derive(Deserialize)]
struct RawConfiguration {
    #[serde(default)]
    config_items: Vec<serde_yaml::Value>,
}

/// All repository config items.
///
/// Items are validated one by one when loaded. An invalid item is kept
/// aside so that lookups for its repositories fail while every other
/// repository keeps working.
#[derive(Debug, Clone, Default)]
pub struct Configuration {
    items: Vec<BotConfig>,
    rejected: Vec<RejectedItem>,
}

impl Configuration {
    /// Load and validate the YAML file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let configuration = Self::from_yaml(&contents)?;
        info!(
            path = %path.display(),
            items = configuration.items.len(),
            rejected = configuration.rejected.len(),
            "Loaded label configuration"
        );
        Ok(configuration)
    }

    /// Parse and validate YAML contents.
    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        let raw: RawConfiguration = serde_yaml::from_str(contents)?;
        let mut configuration = Self::default();

        for value in raw.config_items {
            let repos = string_list(&value, "repos");
            let excluded_repos = string_list(&value, "excluded_repos");

            let checked = serde_yaml::from_value::<BotConfig>(value)
                .map_err(ConfigError::from)
                .and_then(|mut item| item.validate().map(|()| item));

            match checked {
                Ok(item) => configuration.items.push(item),
                Err(e) => {
                    error!(repos = ?repos, error = %e, "Rejected label config item");
                    configuration.rejected.push(RejectedItem {
                        repos,
                        excluded_repos,
                        reason: e.to_string(),
                    });
                }
            }
        }

        Ok(configuration)
    }

    /// Valid config items, in file order.
    #[must_use]
    pub fn items(&self) -> &[BotConfig] {
        &self.items
    }

    /// The item for `org/repo`: an exact repository entry wins over an
    /// organization entry.
    #[must_use]
    pub fn config_for(&self, org: &str, repo: &str) -> Option<&BotConfig> {
        let mut org_match = None;
        for item in &self.items {
            match item.matches(org, repo) {
                Some(RepoMatch::Exact) => return Some(item),
                Some(RepoMatch::Org) if org_match.is_none() => org_match = Some(item),
                _ => {}
            }
        }
        org_match
    }

    /// Like [`Self::config_for`] but rejected items take part in the
    /// lookup: a valid exact entry wins, then any rejected entry for the
    /// repository fails the lookup, then a valid organization entry applies.
    pub fn require(&self, org: &str, repo: &str) -> Result<&BotConfig, ConfigError> {
        let exact = self
            .items
            .iter()
            .find(|item| item.matches(org, repo) == Some(RepoMatch::Exact));
        if let Some(item) = exact {
            return Ok(item);
        }

        for wanted in [RepoMatch::Exact, RepoMatch::Org] {
            if let Some(rejected) = self
                .rejected
                .iter()
                .find(|r| r.matches(org, repo) == Some(wanted))
            {
                return Err(ConfigError::Invalid(format!(
                    "{org}/{repo}: {}",
                    rejected.reason
                )));
            }
        }

        self.config_for(org, repo).ok_or_else(|| ConfigError::NoConfig {
            org: org.to_string(),
            repo: repo.to_string(),
        })
    }
}

fn string_list(value: &serde_yaml::Value, key: &str) -> Vec<String> {
    value
        .get(key)
        .and_then(serde_yaml::Value::as_sequence)
        .map(|seq| {
            seq.iter()
                .filter_map(serde_yaml::Value::as_str)
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}
