//! Minimal URL splitting for embed and image references.
//!
//! References arrive as absolute URLs (`https://host/grapher/gdp?tab=map`),
//! protocol-relative URLs (`//host/...`) or bare paths (`/grapher/gdp`). Only
//! the path and the query matter to the baker, so this module splits those
//! out without pulling in a full URL parser.

/// Path and query of a reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UrlParts<'a> {
    /// Path component, always starting with `/` for absolute URLs.
    pub path: &'a str,
    /// Query string without the leading `?`; `None` when absent or empty.
    pub query: Option<&'a str>,
}

/// Split a reference into path and query. The fragment is dropped.
pub fn split_url(url: &str) -> UrlParts<'_> {
    let url = url.split('#').next().unwrap_or_default();
    let (before_query, query) = match url.split_once('?') {
        Some((b, q)) => (b, Some(q).filter(|q| !q.is_empty())),
        None => (url, None),
    };

    let after_authority = if let Some(idx) = before_query.find("://") {
        Some(&before_query[idx + 3..])
    } else {
        before_query.strip_prefix("//")
    };

    let path = match after_authority {
        Some(rest) => rest.find('/').map(|i| &rest[i..]).unwrap_or("/"),
        None => before_query,
    };

    UrlParts { path, query }
}

/// Last non-empty path segment (`/grapher/gdp/` → `gdp`).
pub fn last_segment(path: &str) -> Option<&str> {
    path.split('/').rev().find(|s| !s.is_empty())
}
