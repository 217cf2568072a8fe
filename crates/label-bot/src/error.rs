//! Error types for label reconciliation.

use std::fmt;

use thiserror::Error;

/// Errors raised while loading or looking up repository configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid YAML for the expected schema
    #[error("failed to parse config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// `clear_labels_by_regexp` does not compile
    #[error("invalid clear_labels_by_regexp {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// A semantic check on a config item failed
    #[error("invalid config: {0}")]
    Invalid(String),

    /// No config item applies to the repository
    #[error("no config for this repo: {org}/{repo}")]
    NoConfig { org: String, repo: String },
}

/// Errors returned by the remote label platform.
#[derive(Debug, Error)]
pub enum PlatformError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status
    #[error("GitHub API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Top-level error of a reconciliation.
#[derive(Debug, Error)]
pub enum LabelError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Platform(#[from] PlatformError),

    /// Several independent operations failed
    #[error(transparent)]
    Multi(#[from] MultiError),
}

/// Collects failures of independent operations so one failing branch does
/// not stop the others from running.
#[derive(Debug, Default)]
pub struct MultiError {
    errors: Vec<String>,
}

impl MultiError {
    /// Create an empty aggregator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one failure.
    pub fn add(&mut self, err: impl fmt::Display) {
        self.errors.push(err.to_string());
    }

    /// Take over every failure recorded by `other`.
    pub fn merge(&mut self, other: MultiError) {
        self.errors.extend(other.errors);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// `Ok(())` when nothing failed.
    pub fn into_result(self) -> Result<(), Self> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for MultiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.errors.join("; "))
    }
}

impl std::error::Error for MultiError {}
