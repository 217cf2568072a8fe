//! `issue_comment` events: label commands written in a comment.

use serde::Serialize;
use tracing::{debug, info};

use super::LabelBot;
use crate::error::LabelError;
use crate::labels::{parse_label_commands, reconcile_labels, ReconcileOutcome};
use crate::subject::{IssueSubject, LabelSubject, PullRequestSubject};
use crate::webhooks::IssueCommentEvent;

/// Result of handling one comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum NoteOutcome {
    /// Nothing to do for this comment.
    Skipped { reason: &'static str },
    Reconciled(ReconcileOutcome),
}

impl LabelBot {
    /// Apply the label commands of a newly created comment.
    ///
    /// Comments without a command are skipped before the configuration is
    /// consulted, so ordinary discussion on unconfigured repositories never
    /// reports an error.
    pub async fn handle_issue_comment(
        &self,
        event: &IssueCommentEvent,
    ) -> Result<NoteOutcome, LabelError> {
        if event.action != "created" {
            debug!(action = %event.action, "Ignoring comment action");
            return Ok(NoteOutcome::Skipped {
                reason: "comment_not_created",
            });
        }

        let body = event.comment.body.as_deref().unwrap_or_default();
        let Some(request) = parse_label_commands(body) else {
            return Ok(NoteOutcome::Skipped {
                reason: "no_label_command",
            });
        };

        let (org, repo) = event.repository.org_repo();
        let config = self.configuration().require(org, repo)?;

        let number = event.issue.number;
        let subject: Box<dyn LabelSubject> = if event.issue.is_pull_request() {
            Box::new(PullRequestSubject::new(self.platform(), org, repo, number))
        } else {
            Box::new(IssueSubject::new(self.platform(), org, repo, number))
        };

        info!(
            org = %org,
            repo = %repo,
            number,
            kind = %subject.kind(),
            commenter = %event.comment.user.login,
            "Handling label command"
        );

        let outcome = reconcile_labels(
            subject.as_ref(),
            &request,
            &event.comment.user.login,
            config.allow_creating_labels_by_collaborator,
        )
        .await?;
        Ok(NoteOutcome::Reconciled(outcome))
    }
}
