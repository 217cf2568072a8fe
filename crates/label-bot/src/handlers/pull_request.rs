//! `pull_request` events: branch-change clearing, squash label, label expiry.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info};

use super::LabelBot;
use crate::error::{LabelError, MultiError};
use crate::labels::{
    clear_labels_on_branch_change, handle_squash_label, remove_expired_labels, PrAction,
    SquashAction,
};
use crate::subject::{LabelSubject, PullRequestSubject};
use crate::webhooks::PullRequestEvent;

/// What the pull request path changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PrOutcome {
    pub cleared: Vec<String>,
    pub squash: Option<SquashAction>,
    pub expired: Vec<String>,
}

impl LabelBot {
    /// Run the clearer, the squash controller and the expiry validator, in
    /// that order, for one pull request event.
    ///
    /// Each step gets its own chance to run; their failures are returned
    /// together once all three are done.
    pub async fn handle_pull_request(
        &self,
        event: &PullRequestEvent,
        now: DateTime<Utc>,
    ) -> Result<PrOutcome, LabelError> {
        let action = PrAction::from_github(&event.action);
        let mut outcome = PrOutcome::default();
        if action == PrAction::Closed {
            debug!(number = event.number, "Ignoring closed pull request");
            return Ok(outcome);
        }

        let (org, repo) = event.repository.org_repo();
        let config = self.configuration().require(org, repo)?;
        let subject = PullRequestSubject::new(self.platform(), org, repo, event.number);

        let mut current = subject.current_labels().await?;
        let mut merr = MultiError::new();

        match clear_labels_on_branch_change(
            &subject,
            &action,
            &current,
            &config.clear_labels,
            config.clear_labels_regex(),
        )
        .await
        {
            Ok(cleared) => {
                if let Some(e) = cleared.comment_error {
                    error!(
                        number = event.number,
                        error = %e,
                        "Failed to comment on cleared labels"
                    );
                    merr.add(format!("comment on cleared labels: {e}"));
                }
                current = current.excluding(&cleared.labels);
                outcome.cleared = cleared.labels;
            }
            Err(e) => {
                error!(number = event.number, error = %e, "Failed to clear labels");
                merr.add(format!("clear labels: {e}"));
            }
        }

        match handle_squash_label(
            &subject,
            &action,
            event.pull_request.commits,
            &current,
            &config.squash_config,
        )
        .await
        {
            Ok(squash) => outcome.squash = squash,
            Err(e) => {
                error!(number = event.number, error = %e, "Failed to update squash label");
                merr.add(format!("squash label: {e}"));
            }
        }

        match remove_expired_labels(&subject, &current, &config.labels_to_validate, now).await {
            Ok(expired) => outcome.expired = expired,
            Err(e) => {
                error!(number = event.number, error = %e, "Failed to remove expired labels");
                merr.add(format!("expired labels: {e}"));
            }
        }

        merr.into_result()?;
        info!(
            org = %org,
            repo = %repo,
            number = event.number,
            action = %event.action,
            cleared = outcome.cleared.len(),
            expired = outcome.expired.len(),
            "Handled pull request event"
        );
        Ok(outcome)
    }
}
