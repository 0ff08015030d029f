//! Databases skipped by the stats collector, fixed once at startup.

use once_cell::sync::OnceCell;
use std::collections::BTreeSet;

/// Lower-cased names; RavenDB database names are case-insensitive.
static EXCLUDED: OnceCell<BTreeSet<String>> = OnceCell::new();

/// Record the databases to skip. Blank entries are dropped.
///
/// Only the first call takes effect; later calls return `false`.
pub fn set_excluded_databases<I, S>(names: I) -> bool
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let set = names
        .into_iter()
        .map(|name| name.as_ref().trim().to_ascii_lowercase())
        .filter(|name| !name.is_empty())
        .collect();

    EXCLUDED.set(set).is_ok()
}

/// The excluded databases, lower-cased and sorted.
pub fn excluded_databases() -> Vec<&'static str> {
    EXCLUDED
        .get()
        .map(|set| set.iter().map(String::as_str).collect())
        .unwrap_or_default()
}

#[must_use]
pub fn is_database_excluded(name: &str) -> bool {
    EXCLUDED
        .get()
        .is_some_and(|set| set.contains(&name.to_ascii_lowercase()))
}
