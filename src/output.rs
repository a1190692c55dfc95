//! CLI output formatting for bake results.
//!
//! The baked document goes to stdout (or `--out`); page summaries go to
//! stderr so the two never mix. The export table listing is the primary
//! output of its command and goes to stdout.
//!
//! # Output Format
//!
//! ## Article pages
//!
//! ```text
//! Blog post: Growth (growth)
//!     Options: toc=false
//!     001 https://example.org/grapher/gdp → /exports/gdp_v4_850x600.svg
//!     002 https://example.org/grapher/co2-emissions → missing
//! ```
//!
//! ## Listings
//!
//! ```text
//! Charts index: 3 charts, 2 tagged
//! Blog index: page 2 of 3 (21 posts)
//! Front page: 30 posts, 5 categories
//! Subscribe page
//! ```
//!
//! ## Export table
//!
//! ```text
//! Exports (2)
//! 001 co2-emissions v12 850x600
//! 002 gdp v4 850x600
//! ```
//!
//! # Architecture
//!
//! Each output has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes it out. Format
//! functions are pure.

use crate::assemble::{ArticlePage, PageModel};
use crate::directive::DirectiveValue;
use crate::exports::ExportTable;

/// Longest reference shown before truncation.
const MAX_REF_WIDTH: usize = 80;

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Truncate text to `max` characters, appending `...` if truncated.
fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

// ============================================================================
// Pages
// ============================================================================

fn format_article(label: &str, article: &ArticlePage) -> Vec<String> {
    let mut lines = vec![format!(
        "{}: {} ({})",
        label, article.post.title, article.post.slug
    )];

    if !article.formatting_options.is_empty() {
        let options: Vec<String> = article
            .formatting_options
            .iter()
            .map(|(name, value)| match value {
                DirectiveValue::Flag(b) => format!("{name}={b}"),
                DirectiveValue::Text(t) => format!("{name}={t}"),
            })
            .collect();
        lines.push(format!("{}Options: {}", indent(1), options.join(" ")));
    }

    for (i, reference) in article.embeds.iter().enumerate() {
        let target = article
            .exports
            .get(reference)
            .map(|r| r.url.as_str())
            .unwrap_or("missing");
        lines.push(format!(
            "{}{} {} \u{2192} {}",
            indent(1),
            format_index(i + 1),
            truncate(reference, MAX_REF_WIDTH),
            target
        ));
    }
    lines
}

/// Summary lines for a baked page model.
pub fn format_page_summary(page: &PageModel) -> Vec<String> {
    match page {
        PageModel::BlogPost(article) => format_article("Blog post", article),
        PageModel::LongForm { article, .. } => format_article("Page", article),
        PageModel::ChartsIndex { charts } => {
            let tagged = charts.iter().filter(|c| !c.tags.is_empty()).count();
            vec![format!(
                "Charts index: {}, {} tagged",
                plural(charts.len(), "chart"),
                tagged
            )]
        }
        PageModel::BlogIndex {
            posts,
            page_num,
            num_pages,
        } => vec![format!(
            "Blog index: page {} of {} ({})",
            page_num,
            num_pages,
            plural(posts.len(), "post")
        )],
        PageModel::FrontPage { entries, posts } => vec![format!(
            "Front page: {}, {}",
            plural(posts.len(), "post"),
            if entries.len() == 1 {
                "1 category".to_string()
            } else {
                format!("{} categories", entries.len())
            }
        )],
        PageModel::Subscribe => vec!["Subscribe page".to_string()],
    }
}

pub fn print_page_summary(page: &PageModel) {
    for line in format_page_summary(page) {
        eprintln!("{}", line);
    }
}

// ============================================================================
// Export table
// ============================================================================

pub fn format_export_table(table: &ExportTable) -> Vec<String> {
    let mut lines = vec![format!("Exports ({})", table.len())];
    for (i, record) in table.iter().enumerate() {
        lines.push(format!(
            "{} {} v{} {}x{}",
            format_index(i + 1),
            record.key,
            record.version,
            record.width,
            record.height
        ));
    }
    lines
}

pub fn print_export_table(table: &ExportTable) {
    for line in format_export_table(table) {
        println!("{}", line);
    }
}

/// Confirmation after writing a document to a file.
pub fn format_written(path: &std::path::Path, bytes: usize) -> String {
    format!("Wrote {} ({} bytes)", path.display(), bytes)
}
