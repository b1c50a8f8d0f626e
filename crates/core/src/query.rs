//! Search query classification.

use std::sync::LazyLock;

use regex::Regex;

static PID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:pid|patient)\s*(\d+)").unwrap());

/// How a free-text search query should be executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    /// The query names a patient id directly ("patient 42", "pid 7").
    PidLookup(i64),
    /// No id found; rank by embedding similarity instead.
    Semantic,
}

/// Decide between a direct id lookup and semantic search.
///
/// Only the first `pid`/`patient` + digits match is considered, so a
/// query mixing an id with descriptive text still resolves to a lookup.
pub fn classify_query(query: &str) -> SearchMode {
    PID_RE
        .captures(&query.to_lowercase())
        .and_then(|c| c[1].parse::<i64>().ok())
        .map_or(SearchMode::Semantic, SearchMode::PidLookup)
}
