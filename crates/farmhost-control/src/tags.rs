//! Host tag computation.
//!
//! A host's effective tags are derived from four sources: its hostname, the tag
//! of its allocation, hardware capability tags, and tags added by operators.
//! The effective list is always recomputed from scratch so repeated
//! recomputation gives the same result.

use std::collections::BTreeSet;

/// Trim a tag and drop it if nothing is left.
#[must_use]
pub fn normalize(tag: &str) -> Option<String> {
    let trimmed = tag.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Normalize a batch of tags into a set, dropping blanks.
#[must_use]
pub fn normalize_all<I, T>(tags: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = T>,
    T: AsRef<str>,
{
    tags.into_iter()
        .filter_map(|t| normalize(t.as_ref()))
        .collect()
}

/// Compute the effective tag list of a host.
///
/// The allocation tag comes first, then the hostname, then every other tag in
/// sorted order. Each tag appears once.
#[must_use]
pub fn recompute(
    hostname: &str,
    allocation_tag: Option<&str>,
    manual: &BTreeSet<String>,
    hardware: &BTreeSet<String>,
) -> Vec<String> {
    let mut tags = Vec::new();

    if let Some(tag) = allocation_tag.and_then(normalize) {
        tags.push(tag);
    }
    if let Some(tag) = normalize(hostname) {
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }

    let rest: BTreeSet<String> = manual
        .iter()
        .chain(hardware)
        .filter_map(|t| normalize(t))
        .filter(|t| !tags.contains(t))
        .collect();
    tags.extend(rest);

    tags
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(tags: &[&str]) -> BTreeSet<String> {
        tags.iter().map(|t| (*t).to_string()).collect()
    }

    #[test]
    fn derived_tags_lead() {
        let tags = recompute(
            "render01",
            Some("general"),
            &set(&["zeta", "alpha"]),
            &set(&["gpu"]),
        );
        assert_eq!(tags, vec!["general", "render01", "alpha", "gpu", "zeta"]);
    }

    #[test]
    fn no_allocation_tag() {
        let tags = recompute("render01", None, &BTreeSet::new(), &BTreeSet::new());
        assert_eq!(tags, vec!["render01"]);
    }

    #[test]
    fn duplicates_collapse() {
        let tags = recompute(
            "render01",
            Some("general"),
            &set(&["render01", "general", "gpu"]),
            &set(&["gpu"]),
        );
        assert_eq!(tags, vec!["general", "render01", "gpu"]);
        assert_eq!(tags.iter().filter(|t| *t == "render01").count(), 1);
        assert_eq!(tags.iter().filter(|t| *t == "general").count(), 1);
    }

    #[test]
    fn blanks_dropped() {
        let tags = recompute("render01", Some("  "), &set(&["", " x "]), &BTreeSet::new());
        assert_eq!(tags, vec!["render01", "x"]);
        assert_eq!(normalize_all(["", "  ", "a", " b"]), set(&["a", "b"]));
    }

    #[test]
    fn recompute_is_idempotent() {
        let manual = set(&["desktop", "nuke"]);
        let first = recompute("ws12", Some("studio"), &manual, &BTreeSet::new());
        let again = recompute("ws12", Some("studio"), &manual, &BTreeSet::new());
        assert_eq!(first, again);
    }
}
