//! # Label Reconciliation
//!
//! Decision logic of the label service:
//!
//! - **`set`**: case-insensitive [`LabelSet`]
//! - **`command`**: `/kind bug`-style comment commands
//! - **`reconcile`**: conflict check, existence/permission resolution and the
//!   minimal add/remove/comment sequence for a comment request
//! - **`clear`**: labels dropped when a pull request's source branch changes
//! - **`squash`**: the needs-squash label toggle
//! - **`expiry`**: labels removed once they have been applied for too long

pub mod clear;
pub mod command;
pub mod expiry;
pub mod reconcile;
pub mod set;
pub mod squash;

pub use clear::{clear_labels_on_branch_change, labels_to_clear, ClearedLabels};
pub use command::{parse_label_commands, LabelRequest};
pub use expiry::{expired_labels, latest_label_event, remove_expired_labels};
pub use reconcile::{
    check_conflicts, reconcile_labels, resolve_additions, ReconcileOutcome, Resolution,
};
pub use set::{canonical, LabelSet};
pub use squash::{handle_squash_label, squash_transition, SquashAction};

/// Pull request event actions the label logic reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrAction {
    Opened,
    /// New commits were pushed to the source branch
    SourceBranchChanged,
    Closed,
    Other(String),
}

impl PrAction {
    /// Map a GitHub `pull_request` webhook action.
    #[must_use]
    pub fn from_github(action: &str) -> Self {
        match action {
            "opened" => Self::Opened,
            "synchronize" => Self::SourceBranchChanged,
            "closed" => Self::Closed,
            other => Self::Other(other.to_string()),
        }
    }
}
