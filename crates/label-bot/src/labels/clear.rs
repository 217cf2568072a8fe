//! Clearing stale labels when a pull request's source branch changes.

use regex::Regex;
use tracing::{debug, info};

use super::set::LabelSet;
use super::PrAction;
use crate::error::PlatformError;
use crate::subject::LabelSubject;

#[must_use]
pub fn cleared_labels_comment(labels: &[String]) -> String {
    format!(
        "This pull request source branch has changed, so removes the following label(s): {}.",
        labels.join(", ")
    )
}

/// Current labels to drop: those named in `clear_labels`, then those matched
/// by `pattern` among the rest. Names come back in the current labels'
/// display form.
#[must_use]
pub fn labels_to_clear(
    current: &LabelSet,
    clear_labels: &[String],
    pattern: Option<&Regex>,
) -> Vec<String> {
    let exact = LabelSet::new(clear_labels).intersection(current);
    let mut to_clear = current.origin(&exact);

    if let Some(pattern) = pattern {
        let remaining = current.origin(&current.difference(&LabelSet::new(&to_clear)));
        to_clear.extend(remaining.into_iter().filter(|l| pattern.is_match(l)));
    }

    to_clear
}

/// Labels removed after a source branch change.
#[derive(Debug, Default)]
pub struct ClearedLabels {
    pub labels: Vec<String>,
    /// The labels were removed but the notice could not be posted.
    pub comment_error: Option<PlatformError>,
}

/// Remove the configured labels after new commits were pushed, then say so
/// in a comment.
///
/// Only a failed removal is an `Err`. When just the comment fails the
/// removed labels are returned with `comment_error` set.
pub async fn clear_labels_on_branch_change(
    subject: &dyn LabelSubject,
    action: &PrAction,
    current: &LabelSet,
    clear_labels: &[String],
    pattern: Option<&Regex>,
) -> Result<ClearedLabels, PlatformError> {
    if *action != PrAction::SourceBranchChanged {
        return Ok(ClearedLabels::default());
    }

    let to_remove = labels_to_clear(current, clear_labels, pattern);
    if to_remove.is_empty() {
        debug!(number = subject.number(), "No labels to clear");
        return Ok(ClearedLabels::default());
    }

    subject.remove_labels(&to_remove).await?;
    info!(
        org = %subject.org(),
        repo = %subject.repo(),
        number = subject.number(),
        labels = ?to_remove,
        "Cleared labels after source branch change"
    );

    let comment_error = subject
        .add_comment(&cleared_labels_comment(&to_remove))
        .await
        .err();
    Ok(ClearedLabels {
        labels: to_remove,
        comment_error,
    })
}
