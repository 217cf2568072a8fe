//! Label commands embedded in comments.
//!
//! A comment line `/kind bug feature` asks for `kind/bug` and `kind/feature`
//! to be added; `/remove-kind bug` asks for `kind/bug` to be removed. Only
//! the categories in [`CATEGORIES`] are recognised.

use std::sync::LazyLock;

use regex::Regex;

use super::set::LabelSet;

/// Label categories accepted by the command grammar.
pub const CATEGORIES: [&str; 3] = ["kind", "priority", "sig"];

static ADD_LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    let pattern = format!(r"(?i)^/({})(?:\s+(.*?))?\s*$", CATEGORIES.join("|"));
    Regex::new(&pattern).expect("valid add-label regex")
});

static REMOVE_LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    let pattern = format!(r"(?i)^/remove-({})(?:\s+(.*?))?\s*$", CATEGORIES.join("|"));
    Regex::new(&pattern).expect("valid remove-label regex")
});

/// Labels requested by one comment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelRequest {
    pub to_add: LabelSet,
    pub to_remove: LabelSet,
}

impl LabelRequest {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

/// Parse label commands out of a comment body.
///
/// Returns `None` when no line is a label command, which callers treat as
/// "not a label comment". A command line without names still yields
/// `Some` with empty sets.
#[must_use]
pub fn parse_label_commands(comment: &str) -> Option<LabelRequest> {
    let mut adds = Vec::new();
    let mut removes = Vec::new();
    let mut matched = false;

    for line in comment.lines() {
        let line = line.trim_end();
        if let Some(caps) = REMOVE_LABEL_RE.captures(line) {
            matched = true;
            collect_labels(&caps, &mut removes);
        } else if let Some(caps) = ADD_LABEL_RE.captures(line) {
            matched = true;
            collect_labels(&caps, &mut adds);
        }
    }

    matched.then(|| LabelRequest {
        to_add: LabelSet::new(adds),
        to_remove: LabelSet::new(removes),
    })
}

fn collect_labels(caps: &regex::Captures<'_>, out: &mut Vec<String>) {
    let category = caps[1].to_lowercase();
    let Some(names) = caps.get(2) else {
        return;
    };
    for name in names.as_str().split_whitespace() {
        out.push(format!("{category}/{}", name.to_lowercase()));
    }
}
