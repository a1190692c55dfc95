//! # Page Bake
//!
//! Bakes CMS posts and pages into static documents. Interactive data
//! visualizations embedded in a post are paired with pre-rendered exports so
//! the static page still shows a chart when the interactive one cannot load.
//!
//! # Architecture: One Page, One Pass
//!
//! Every article bake runs the same pipeline:
//!
//! ```text
//! 1. Load      CMS row  →  full post + category menu      (concurrently)
//! 2. Scan      body     →  visualization references       (html5ever)
//! 3. Export    refs     →  current export table           (render stale ones)
//! 4. Format    body     →  HTML with export fallbacks     (directives honored)
//! 5. Render    model    →  document                       (template collaborator)
//! ```
//!
//! Index pages (catalog, blog listing, front page) skip steps 2-4 and go
//! straight from CMS queries to a [`assemble::PageModel`].
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`bake`] | `Baker`: collaborators plus config, one `render_*` method per page kind |
//! | [`assemble`] | Single-page assembly, `PageModel`, `BakeError` |
//! | [`listing`] | Catalog, paginated blog listing, front page, menu JSON, subscribe page |
//! | [`exports`] | Export table lookup and de-duplicated, time-bounded rendering |
//! | [`naming`] | `<key>_v<version>_<w>x<h>.svg` export file names |
//! | [`embeds`] | Finds visualization iframes in post markup |
//! | [`directive`] | Parses `<!-- formatting-options ... -->` comments |
//! | [`variants`] | Picks a listing-sized variant of a featured image |
//! | [`format`] | Post formatter that swaps embeds for export-backed figures |
//! | [`collab`] | Collaborator traits and the command-line export renderer |
//! | [`dump`] | CMS snapshot store used by the `bake` binary |
//! | [`types`] | Typed rows crossing the CMS boundary |
//! | [`config`] | `bake.toml` loading, merging and validation |
//! | [`links`] | URL path and query splitting |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Degrade, Don't Fail
//!
//! A page is worth publishing even when one of its charts is not. A render
//! that fails or outlasts the timeout, an unreadable image directory, a
//! malformed directive: each leaves that one detail at its fallback and the
//! bake continues. Only a missing row or an unreachable store fails a bake,
//! and only the latter is worth retrying ([`assemble::BakeError::is_retryable`]).
//!
//! ## The Exports Directory Is the Table
//!
//! Export metadata lives in file names, not a side database. Listing the
//! directory is the lookup; writing a file is the insert. A stale export is
//! simply superseded by one with a higher version.
//!
//! ## Collaborators Behind Traits
//!
//! Storage, chart rendering, post formatting and templating are traits in
//! [`collab`] using native `async fn`. The baker is generic over them, so
//! tests run the real pipeline against in-memory mocks and the binary runs it
//! against a JSON snapshot.

pub mod assemble;
pub mod bake;
pub mod collab;
pub mod config;
pub mod directive;
pub mod dump;
pub mod embeds;
pub mod exports;
pub mod format;
pub mod links;
pub mod listing;
pub mod naming;
pub mod output;
pub mod types;
pub mod variants;

#[cfg(test)]
pub(crate) mod test_helpers;
