//! Mirror-mode differ.
//!
//! Given the handles that must survive and the items on the side being
//! pruned, returns the items with no counterpart. Used in both directions:
//! pull prunes local files against remote handles, push prunes remote
//! resources against local handles.

use std::collections::HashSet;

/// Items from `candidates` whose handle is not in `authoritative`.
///
/// Output order follows `candidates`, so identical inputs always yield an
/// identical deletion list.
pub fn prune_candidates<'a, T, I, F>(authoritative: I, candidates: &'a [T], handle_of: F) -> Vec<&'a T>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
    F: Fn(&T) -> String,
{
    let keep: HashSet<String> = authoritative
        .into_iter()
        .map(|h| h.as_ref().to_string())
        .collect();

    candidates
        .iter()
        .filter(|item| !keep.contains(&handle_of(item)))
        .collect()
}
