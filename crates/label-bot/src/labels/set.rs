//! Case-insensitive label set.

use std::collections::BTreeMap;

/// Fold a label name to the key used for set comparisons.
#[must_use]
pub fn canonical(name: &str) -> String {
    name.trim().to_lowercase()
}

/// A set of label names compared case-insensitively.
///
/// Every member is stored under its canonical key together with the display
/// string it was built from. When two inputs fold to the same key the last
/// one inserted wins, so `["Kind/Bug", "kind/bug"]` keeps `kind/bug` as the
/// display form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSet {
    labels: BTreeMap<String, String>,
}

impl LabelSet {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut labels = BTreeMap::new();
        for name in names {
            let name = name.as_ref().trim();
            if name.is_empty() {
                continue;
            }
            labels.insert(canonical(name), name.to_string());
        }
        Self { labels }
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.labels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Canonical keys, sorted.
    #[must_use]
    pub fn to_list(&self) -> Vec<String> {
        self.labels.keys().cloned().collect()
    }

    /// Display strings for `keys`. Keys that are not members are skipped.
    #[must_use]
    pub fn origin<S: AsRef<str>>(&self, keys: &[S]) -> Vec<String> {
        keys.iter()
            .filter_map(|k| self.labels.get(k.as_ref()).cloned())
            .collect()
    }

    /// All display strings, ordered by key.
    #[must_use]
    pub fn display_names(&self) -> Vec<String> {
        self.labels.values().cloned().collect()
    }

    /// Canonical keys present in both sets.
    #[must_use]
    pub fn intersection(&self, other: &LabelSet) -> Vec<String> {
        self.labels
            .keys()
            .filter(|k| other.labels.contains_key(*k))
            .cloned()
            .collect()
    }

    /// Canonical keys of `self` that are not in `other`.
    #[must_use]
    pub fn difference(&self, other: &LabelSet) -> Vec<String> {
        self.labels
            .keys()
            .filter(|k| !other.labels.contains_key(*k))
            .cloned()
            .collect()
    }

    /// Membership test for a display name in any casing.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.labels.contains_key(&canonical(name))
    }

    #[must_use]
    pub fn has_key(&self, key: &str) -> bool {
        self.labels.contains_key(key)
    }

    /// A copy without the given names (any casing).
    #[must_use]
    pub fn excluding<S: AsRef<str>>(&self, names: &[S]) -> LabelSet {
        let mut labels = self.labels.clone();
        for name in names {
            labels.remove(&canonical(name.as_ref()));
        }
        Self { labels }
    }
}

impl<S: AsRef<str>> FromIterator<S> for LabelSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter)
    }
}
