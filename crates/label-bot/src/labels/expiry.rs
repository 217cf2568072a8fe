//! Removing labels that have been applied for longer than allowed.

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::set::{canonical, LabelSet};
use crate::config::ValidateLabelConfig;
use crate::error::PlatformError;
use crate::platform::OperationLog;
use crate::subject::LabelSubject;

/// Time of the latest log entry mentioning `label`.
///
/// Entries are matched by case-insensitive text containment, so a removal
/// entry counts as well as an addition. Unparseable timestamps are skipped.
#[must_use]
pub fn latest_label_event(logs: &[OperationLog], label: &str) -> Option<DateTime<Utc>> {
    let key = canonical(label);
    let mut latest: Option<DateTime<Utc>> = None;

    for log in logs {
        if !log.content.to_lowercase().contains(&key) {
            continue;
        }

        let at = match DateTime::parse_from_rfc3339(&log.created_at) {
            Ok(at) => at.with_timezone(&Utc),
            Err(e) => {
                warn!(
                    created_at = %log.created_at,
                    error = %e,
                    "Failed to parse operation log time"
                );
                continue;
            }
        };

        if latest.map_or(true, |t| at > t) {
            latest = Some(at);
        }
    }

    latest
}

/// Configured labels present in `current` whose validity ran out by `now`,
/// in the current labels' display form.
#[must_use]
pub fn expired_labels(
    current: &LabelSet,
    validations: &[ValidateLabelConfig],
    logs: &[OperationLog],
    now: DateTime<Utc>,
) -> Vec<String> {
    let mut expired = Vec::new();
    for item in validations {
        if !current.contains(&item.label) {
            continue;
        }
        match latest_label_event(logs, &item.label) {
            Some(added_at) if item.is_expired(added_at, now) => {
                expired.extend(current.origin(&[canonical(&item.label)]));
            }
            Some(_) => {}
            None => {
                debug!(label = %item.label, "No operation log for label");
            }
        }
    }
    expired
}

/// Remove every expired label of the subject in one call.
pub async fn remove_expired_labels(
    subject: &dyn LabelSubject,
    current: &LabelSet,
    validations: &[ValidateLabelConfig],
    now: DateTime<Utc>,
) -> Result<Vec<String>, PlatformError> {
    if !validations.iter().any(|v| current.contains(&v.label)) {
        return Ok(Vec::new());
    }

    let logs = subject.operation_logs().await?;
    let expired = expired_labels(current, validations, &logs, now);
    if expired.is_empty() {
        return Ok(expired);
    }

    subject.remove_labels(&expired).await?;
    info!(
        org = %subject.org(),
        repo = %subject.repo(),
        number = subject.number(),
        labels = ?expired,
        "Removed expired labels"
    );
    Ok(expired)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, TimeZone};

    use super::*;
    use crate::subject::PullRequestSubject;
    use crate::testing::{Call, FakePlatform};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn log(content: &str, at: &str) -> OperationLog {
        OperationLog {
            content: content.to_string(),
            created_at: at.to_string(),
        }
    }

    fn ci_passed() -> Vec<ValidateLabelConfig> {
        vec![ValidateLabelConfig {
            label: "ci/passed".to_string(),
            active_time: 24,
        }]
    }

    #[test]
    fn test_latest_event_skips_bad_timestamps() {
        let logs = vec![
            log("labeled ci/passed", "2024-03-01T12:00:00Z"),
            log("labeled CI/Passed", "yesterday"),
            log("labeled ci/passed", "2024-03-01T10:00:00+00:00"),
            log("labeled kind/bug", "2024-03-05T00:00:00Z"),
        ];

        assert_eq!(latest_label_event(&logs, "ci/passed"), Some(t0()));
        assert_eq!(latest_label_event(&logs, "lgtm"), None);
    }

    #[test]
    fn test_expiry_boundary() {
        let current = LabelSet::new(["ci/passed"]);
        let logs = vec![log("labeled ci/passed", "2024-03-01T12:00:00Z")];

        let late = expired_labels(&current, &ci_passed(), &logs, t0() + Duration::hours(25));
        let early = expired_labels(&current, &ci_passed(), &logs, t0() + Duration::hours(23));

        assert_eq!(late, vec!["ci/passed"]);
        assert!(early.is_empty());
    }

    #[tokio::test]
    async fn test_expired_labels_removed_in_one_call() {
        let fake = Arc::new(FakePlatform::new());
        fake.set_labels(["ci/passed", "lgtm"]);
        fake.push_log("labeled ci/passed", "2024-03-01T12:00:00Z");
        fake.push_log("labeled lgtm", "2024-03-01T12:00:00Z");
        let subject = PullRequestSubject::new(fake.clone(), "acme", "widgets", 4);
        let validations = vec![
            ci_passed()[0].clone(),
            ValidateLabelConfig {
                label: "lgtm".to_string(),
                active_time: 1,
            },
        ];

        let removed = remove_expired_labels(
            &subject,
            &LabelSet::new(fake.labels()),
            &validations,
            t0() + Duration::hours(30),
        )
        .await
        .unwrap();

        assert_eq!(removed, vec!["ci/passed", "lgtm"]);
        assert_eq!(fake.removed(), vec![removed]);
    }

    #[tokio::test]
    async fn test_logs_not_fetched_without_configured_labels() {
        let fake = Arc::new(FakePlatform::new());
        let subject = PullRequestSubject::new(fake.clone(), "acme", "widgets", 4);

        let current = LabelSet::new(["kind/bug"]);
        let removed = remove_expired_labels(&subject, &current, &ci_passed(), t0())
            .await
            .unwrap();

        assert!(removed.is_empty());
        assert!(!fake.calls().contains(&Call::OperationLogs));
    }
}
