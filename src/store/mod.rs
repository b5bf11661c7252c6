//! Database access for identities, the room catalog and room activity.
//!
//! Operations that mutate an owned resource take the [`Actor`](crate::authz::Actor)
//! explicitly and run their existence check, ownership check and write inside
//! one write-locked transaction (see [`begin_write`](crate::db::begin_write)).
//!
//! Searchable text is stored twice, as typed and [`fold`]ed, and `LIKE` only
//! ever runs against the folded copy. SQLite's own `LIKE` folds ASCII only.

pub mod activity;
pub mod catalog;
pub mod identity;

/// Lowercased copy used by the `*_folded` search columns.
pub(crate) fn fold(text: &str) -> String {
    text.to_lowercase()
}

/// `LIKE` pattern matching the folded `needle` anywhere, with wildcards in the
/// needle escaped by `\`.
pub(crate) fn contains_pattern(needle: &str) -> String {
    let needle = fold(needle.trim());
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}
