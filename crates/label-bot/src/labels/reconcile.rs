//! Reconciling a comment's label request against the subject and repository.
//!
//! The order is fixed: conflicting requests are rejected with a comment and
//! nothing else happens; otherwise removals run first, then additions, then
//! the missing-label notice. Failures of those three steps are independent
//! and surface together as one [`MultiError`].

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use super::command::LabelRequest;
use super::set::LabelSet;
use crate::error::{LabelError, MultiError};
use crate::subject::LabelSubject;

/// What a reconciliation did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileOutcome {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    /// Requested labels the repository does not have and that were not created
    pub missing: Vec<String>,
    /// Labels created in the repository on a collaborator's behalf
    pub created: Vec<String>,
    /// Labels requested for both addition and removal
    pub conflicts: Vec<String>,
}

/// Requested additions split by whether they can be applied.
#[derive(Debug, Default)]
pub struct Resolution {
    /// Labels that exist in the repository (repository casing) or were just created
    pub eligible: Vec<String>,
    pub missing: Vec<String>,
    pub created: Vec<String>,
    /// Collaborator check and label creation failures
    pub errors: MultiError,
}

#[must_use]
pub fn conflict_comment(labels: &[String]) -> String {
    format!("conflict labels({}) exist", labels.join(", "))
}

#[must_use]
pub fn missing_labels_comment(labels: &[String]) -> String {
    format!(
        "The label(s) `{}` cannot be applied, because the repository doesn't have them.",
        labels.join(", ")
    )
}

/// Labels asked to be both added and removed, in the add request's display
/// form. `None` means the request is unambiguous.
#[must_use]
pub fn check_conflicts(request: &LabelRequest) -> Option<Vec<String>> {
    let keys = request.to_add.intersection(&request.to_remove);
    if keys.is_empty() {
        None
    } else {
        Some(request.to_add.origin(&keys))
    }
}

/// Decide which requested labels can be applied.
///
/// Labels missing from `inventory` are created when `allow_creating` is set
/// and `commenter` is a collaborator. A failed collaborator check counts as
/// "not a collaborator" and is recorded in [`Resolution::errors`].
pub async fn resolve_additions(
    subject: &dyn LabelSubject,
    desired: &LabelSet,
    inventory: &LabelSet,
    commenter: &str,
    allow_creating: bool,
) -> Resolution {
    let missing_keys = desired.difference(inventory);
    if missing_keys.is_empty() {
        return Resolution {
            eligible: inventory.origin(&desired.to_list()),
            ..Resolution::default()
        };
    }

    let mut resolution = Resolution {
        eligible: inventory.origin(&desired.intersection(inventory)),
        missing: desired.origin(&missing_keys),
        ..Resolution::default()
    };

    if !allow_creating {
        return resolution;
    }

    let privileged = match subject.is_collaborator(commenter).await {
        Ok(privileged) => privileged,
        Err(e) => {
            warn!(
                org = %subject.org(),
                repo = %subject.repo(),
                commenter = %commenter,
                error = %e,
                "Collaborator check failed, not creating labels"
            );
            resolution
                .errors
                .add(format!("check collaborator {commenter}: {e}"));
            false
        }
    };

    if !privileged {
        debug!(commenter = %commenter, "Commenter may not create labels");
        return resolution;
    }

    let creation = subject.create_labels_of_repo(&resolution.missing).await;
    resolution.eligible.extend(creation.created.iter().cloned());
    resolution.created = creation.created;
    resolution.missing = creation.failed;
    resolution.errors.merge(creation.errors);
    resolution
}

/// Apply a comment's label request to `subject`.
#[instrument(
    skip_all,
    fields(org = %subject.org(), repo = %subject.repo(), number = subject.number())
)]
pub async fn reconcile_labels(
    subject: &dyn LabelSubject,
    request: &LabelRequest,
    commenter: &str,
    allow_creating: bool,
) -> Result<ReconcileOutcome, LabelError> {
    let mut outcome = ReconcileOutcome::default();

    if let Some(conflicts) = check_conflicts(request) {
        info!(labels = ?conflicts, "Conflicting label request");
        subject.add_comment(&conflict_comment(&conflicts)).await?;
        outcome.conflicts = conflicts;
        return Ok(outcome);
    }

    if request.is_empty() {
        return Ok(outcome);
    }

    let current = subject.current_labels().await?;
    let inventory = subject.labels_of_repo().await?;
    let mut merr = MultiError::new();

    if !request.to_remove.is_empty() {
        match remove_requested(subject, &request.to_remove, &inventory, &current).await {
            Ok(removed) => outcome.removed = removed,
            Err(e) => merr.add(format!("remove labels: {e}")),
        }
    }

    if !request.to_add.is_empty() {
        let resolution =
            resolve_additions(subject, &request.to_add, &inventory, commenter, allow_creating)
                .await;
        merr.merge(resolution.errors);

        let eligible = LabelSet::new(&resolution.eligible);
        let to_add = eligible.origin(&eligible.difference(&current));
        if !to_add.is_empty() {
            match subject.add_labels(&to_add).await {
                Ok(()) => {
                    info!(labels = ?to_add, "Added labels");
                    outcome.added = to_add;
                }
                Err(e) => merr.add(format!("add labels: {e}")),
            }
        }

        if !resolution.missing.is_empty() {
            if let Err(e) = subject
                .add_comment(&missing_labels_comment(&resolution.missing))
                .await
            {
                merr.add(format!("comment on missing labels: {e}"));
            }
        }

        outcome.missing = resolution.missing;
        outcome.created = resolution.created;
    }

    merr.into_result()?;
    Ok(outcome)
}

/// Remove the requested labels that exist in the repository and are applied.
async fn remove_requested(
    subject: &dyn LabelSubject,
    to_remove: &LabelSet,
    inventory: &LabelSet,
    current: &LabelSet,
) -> Result<Vec<String>, crate::error::PlatformError> {
    let known = inventory.intersection(to_remove);
    let applied = current.origin(&known);
    if applied.is_empty() {
        debug!("No requested label is applied, nothing to remove");
        return Ok(applied);
    }

    subject.remove_labels(&applied).await?;
    info!(labels = ?applied, "Removed labels");
    Ok(applied)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::labels::parse_label_commands;
    use crate::subject::PullRequestSubject;
    use crate::testing::{Call, FakePlatform};

    fn setup(repo_labels: &[&str], applied: &[&str]) -> (Arc<FakePlatform>, PullRequestSubject) {
        let fake = Arc::new(FakePlatform::new());
        fake.set_repo_labels(repo_labels);
        fake.set_labels(applied);
        let subject = PullRequestSubject::new(fake.clone(), "acme", "widgets", 7);
        (fake, subject)
    }

    fn request(comment: &str) -> LabelRequest {
        parse_label_commands(comment).unwrap()
    }

    #[test]
    fn test_check_conflicts_uses_canonical_keys() {
        let req = LabelRequest {
            to_add: LabelSet::new(["Kind/Bug", "kind/feature"]),
            to_remove: LabelSet::new(["kind/bug"]),
        };
        assert_eq!(check_conflicts(&req), Some(vec!["Kind/Bug".to_string()]));
        assert_eq!(check_conflicts(&request("/kind bug\n/remove-kind feature")), None);
    }

    #[tokio::test]
    async fn test_conflict_aborts_without_mutation() {
        let (fake, subject) = setup(&["kind/bug"], &["kind/bug"]);

        let req = request("/kind bug\n/remove-kind bug");

        let outcome = reconcile_labels(&subject, &req, "alice", true).await.unwrap();

        assert_eq!(outcome.conflicts, vec!["kind/bug"]);
        assert_eq!(
            fake.calls(),
            vec![Call::Comment("conflict labels(kind/bug) exist".to_string())]
        );
    }

    #[tokio::test]
    async fn test_readding_present_labels_is_a_no_op() {
        let (fake, subject) = setup(&["kind/bug"], &[]);
        let req = request("/kind bug");

        let first = reconcile_labels(&subject, &req, "alice", false).await.unwrap();
        let second = reconcile_labels(&subject, &req, "alice", false).await.unwrap();

        assert_eq!(first.added, vec!["kind/bug"]);
        assert!(second.added.is_empty());
        assert_eq!(fake.added().len(), 1);
    }

    #[tokio::test]
    async fn test_added_labels_use_repository_casing() {
        let (fake, subject) = setup(&["Kind/Bug"], &[]);

        let outcome = reconcile_labels(&subject, &request("/kind BUG"), "alice", false)
            .await
            .unwrap();

        assert_eq!(outcome.added, vec!["Kind/Bug"]);
        assert_eq!(fake.added(), vec![vec!["Kind/Bug".to_string()]]);
    }

    #[tokio::test]
    async fn test_missing_labels_are_reported_once() {
        let (fake, subject) = setup(&["kind/bug"], &[]);

        let outcome = reconcile_labels(&subject, &request("/kind bug feature"), "alice", false)
            .await
            .unwrap();

        assert_eq!(outcome.added, vec!["kind/bug"]);
        assert_eq!(outcome.missing, vec!["kind/feature"]);
        assert_eq!(
            fake.comments(),
            vec![missing_labels_comment(&["kind/feature".to_string()])]
        );
        assert!(!fake
            .calls()
            .iter()
            .any(|c| matches!(c, Call::IsCollaborator(_) | Call::CreateRepoLabel(_))));
    }

    #[tokio::test]
    async fn test_collaborator_creates_missing_labels() {
        let (fake, subject) = setup(&["kind/bug"], &[]);
        fake.add_collaborator("alice");

        let outcome = reconcile_labels(&subject, &request("/kind bug feature"), "alice", true)
            .await
            .unwrap();

        assert_eq!(outcome.created, vec!["kind/feature"]);
        assert!(outcome.missing.is_empty());
        assert_eq!(
            fake.added(),
            vec![vec!["kind/bug".to_string(), "kind/feature".to_string()]]
        );
        assert!(fake
            .calls()
            .contains(&Call::CreateRepoLabel("kind/feature".to_string())));
        assert!(fake.comments().is_empty());
    }

    #[tokio::test]
    async fn test_non_collaborator_cannot_create_labels() {
        let (fake, subject) = setup(&["kind/bug"], &[]);

        let outcome = reconcile_labels(&subject, &request("/kind feature"), "mallory", true)
            .await
            .unwrap();

        assert_eq!(outcome.missing, vec!["kind/feature"]);
        assert!(fake.added().is_empty());
        assert_eq!(fake.comments().len(), 1);
        assert!(fake
            .calls()
            .contains(&Call::IsCollaborator("mallory".to_string())));
    }

    #[tokio::test]
    async fn test_failed_collaborator_check_still_applies_existing_labels() {
        let (fake, subject) = setup(&["kind/bug"], &[]);
        fake.fail("collaborator");

        let err = reconcile_labels(&subject, &request("/kind bug feature"), "alice", true)
            .await
            .unwrap_err();

        assert!(matches!(err, LabelError::Multi(_)));
        assert!(err.to_string().contains("check collaborator alice"));
        assert_eq!(fake.added(), vec![vec!["kind/bug".to_string()]]);
        assert_eq!(fake.comments().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_creation_leaves_label_missing() {
        let (fake, subject) = setup(&[], &[]);
        fake.add_collaborator("alice");
        fake.fail_create("kind/feature");

        let err = reconcile_labels(&subject, &request("/kind feature cleanup"), "alice", true)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("create label kind/feature"));
        assert_eq!(fake.added(), vec![vec!["kind/cleanup".to_string()]]);
        assert_eq!(
            fake.comments(),
            vec![missing_labels_comment(&["kind/feature".to_string()])]
        );
    }

    #[tokio::test]
    async fn test_remove_only_touches_applied_repository_labels() {
        let (fake, subject) =
            setup(&["kind/bug", "lgtm", "sig/node"], &["Kind/Bug", "lgtm"]);

        let outcome = reconcile_labels(
            &subject,
            &request("/remove-kind bug cleanup\n/remove-sig node"),
            "alice",
            false,
        )
        .await
        .unwrap();

        assert_eq!(outcome.removed, vec!["Kind/Bug"]);
        assert_eq!(fake.removed(), vec![vec!["Kind/Bug".to_string()]]);
        assert_eq!(fake.labels(), vec!["lgtm"]);
    }

    #[tokio::test]
    async fn test_removing_absent_labels_makes_no_call() {
        let (fake, subject) = setup(&["kind/bug"], &[]);

        let outcome = reconcile_labels(&subject, &request("/remove-kind bug"), "alice", false)
            .await
            .unwrap();

        assert!(outcome.removed.is_empty());
        assert!(fake.removed().is_empty());
        assert!(fake.comments().is_empty());
    }

    #[tokio::test]
    async fn test_failures_do_not_suppress_other_branches() {
        let (fake, subject) = setup(&["kind/bug", "sig/node"], &["sig/node"]);
        fake.fail("add");

        let err = reconcile_labels(
            &subject,
            &request("/kind bug feature\n/remove-sig node"),
            "alice",
            false,
        )
        .await
        .unwrap_err();

        assert!(err.to_string().contains("add labels"));
        assert_eq!(fake.removed(), vec![vec!["sig/node".to_string()]]);
        assert_eq!(fake.comments().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_request_touches_nothing() {
        let (fake, subject) = setup(&["kind/bug"], &[]);

        let outcome = reconcile_labels(&subject, &request("/kind"), "alice", false)
            .await
            .unwrap();

        assert_eq!(outcome, ReconcileOutcome::default());
        assert!(fake.calls().is_empty());
    }

    #[tokio::test]
    async fn test_failed_remove_still_adds_and_comments() {
        let (fake, subject) = setup(&["kind/bug", "sig/node"], &["sig/node"]);
        fake.fail("remove");

        let err = reconcile_labels(
            &subject,
            &request("/kind bug feature\n/remove-sig node"),
            "alice",
            false,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, LabelError::Multi(ref m) if m.len() == 1));
        assert!(err.to_string().contains("remove labels"));
        assert_eq!(fake.added(), vec![vec!["kind/bug".to_string()]]);
        assert_eq!(
            fake.comments(),
            vec![missing_labels_comment(&["kind/feature".to_string()])]
        );
        assert_eq!(fake.labels(), vec!["sig/node", "kind/bug"]);
    }

    #[tokio::test]
    async fn test_failed_missing_label_comment_still_adds() {
        let (fake, subject) = setup(&["kind/bug"], &[]);
        fake.fail("comment");

        let err = reconcile_labels(&subject, &request("/kind bug feature"), "alice", false)
            .await
            .unwrap_err();

        assert!(matches!(err, LabelError::Multi(ref m) if m.len() == 1));
        assert!(err.to_string().contains("comment on missing labels"));
        assert_eq!(fake.added(), vec![vec!["kind/bug".to_string()]]);
        assert_eq!(fake.labels(), vec!["kind/bug"]);
    }

    #[tokio::test]
    async fn test_inventory_failure_makes_no_mutation() {
        let (fake, subject) = setup(&["kind/bug", "sig/node"], &["sig/node"]);
        fake.fail("repo_labels");

        let err = reconcile_labels(
            &subject,
            &request("/kind bug\n/remove-sig node"),
            "alice",
            true,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, LabelError::Platform(_)));
        assert_eq!(fake.calls(), vec![Call::PullRequestLabels, Call::RepoLabels]);
        assert_eq!(fake.labels(), vec!["sig/node"]);
    }
}
