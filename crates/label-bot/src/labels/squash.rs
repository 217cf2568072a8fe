//! The needs-squash label.
//!
//! The label is present exactly when the pull request has more commits than
//! the configured threshold. Re-evaluating on every `opened` and
//! `synchronize` event keeps it in step with the branch.

use serde::Serialize;
use tracing::info;

use super::set::LabelSet;
use super::PrAction;
use crate::config::SquashConfig;
use crate::error::PlatformError;
use crate::subject::LabelSubject;

/// Change to make to the squash label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SquashAction {
    Add,
    Remove,
}

/// Decide whether the squash label must change.
#[must_use]
pub fn squash_transition(
    action: &PrAction,
    commits: u64,
    has_label: bool,
    threshold: u32,
) -> Option<SquashAction> {
    if !matches!(action, PrAction::Opened | PrAction::SourceBranchChanged) {
        return None;
    }

    let exceeded = commits > u64::from(threshold);
    match (exceeded, has_label) {
        (true, false) => Some(SquashAction::Add),
        (false, true) => Some(SquashAction::Remove),
        _ => None,
    }
}

/// Add or remove the squash label according to the commit count.
pub async fn handle_squash_label(
    subject: &dyn LabelSubject,
    action: &PrAction,
    commits: u64,
    current: &LabelSet,
    cfg: &SquashConfig,
) -> Result<Option<SquashAction>, PlatformError> {
    if !cfg.needs_check_commits() {
        return Ok(None);
    }

    let label = &cfg.squash_commit_label;
    let has_label = current.contains(label);
    let transition = squash_transition(action, commits, has_label, cfg.commits_threshold);

    match transition {
        Some(SquashAction::Add) => subject.add_labels(&[label.clone()]).await?,
        Some(SquashAction::Remove) => {
            let applied = current.origin(&[super::canonical(label)]);
            subject.remove_labels(&applied).await?;
        }
        None => return Ok(None),
    }

    info!(
        number = subject.number(),
        commits,
        threshold = cfg.commits_threshold,
        action = ?transition,
        "Updated squash label"
    );
    Ok(transition)
}
