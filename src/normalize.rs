use regex::Regex;
use std::sync::LazyLock;

// Non-greedy: "A (x) B (y)" drops both annotations, not everything between them.
static PAREN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\(.*?\)").unwrap());

/// Canonical form of a title for equality comparison.
///
/// Strips every `(...)` annotation (remix, live, remaster tags), trims, and
/// lowercases. Only used as a matching key, never for display.
pub fn normalize_title(title: &str) -> String {
    PAREN_RE.replace_all(title, "").trim().to_lowercase()
}

/// Join artist credits the way both catalogs display them.
pub fn join_artists<'a, I>(names: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    names.into_iter().collect::<Vec<_>>().join(", ")
}
