//! Post body formatting with static visualization fallbacks.
//!
//! [`EmbedFallbackFormatter`] rewrites every visualization iframe into a
//! figure that carries the original reference for client-side hydration:
//!
//! ```html
//! <!-- export available -->
//! <figure data-grapher-src="https://example.org/grapher/gdp">
//!   <a href="https://example.org/grapher/gdp" target="_blank">
//!     <img src="/exports/gdp_v4_850x600.svg" width="850" height="600" loading="lazy">
//!   </a>
//! </figure>
//!
//! <!-- no export -->
//! <figure data-grapher-src="https://example.org/grapher/gdp">
//!   <a href="https://example.org/grapher/gdp" target="_blank">https://example.org/grapher/gdp</a>
//! </figure>
//! ```
//!
//! Each iframe's `src` is read through [`embeds::iframe_src`], so the
//! formatter decodes references exactly as the scanner does and looks up the
//! same export keys. Other iframes, comments and the rest of the markup pass
//! through untouched. A post carrying the `raw` formatting flag is not
//! rewritten at all.
//!
//! [`embeds::iframe_src`]: crate::embeds::iframe_src

use crate::collab::PostFormatter;
use crate::directive::FormattingOptions;
use crate::embeds::{DEFAULT_ROUTE, iframe_src, is_visualization_src};
use crate::exports::{ExportRecord, ExportTable};
use crate::types::{FormattedPost, FullPost};
use regex::{Captures, Regex};
use std::sync::LazyLock;

/// An HTML comment, or an iframe start tag (quoted attribute values may hold
/// `>`) with an optional empty close tag.
static EMBED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<!--.*?-->|<iframe\b(?:[^>"']|"[^"]*"|'[^']*')*>(?:\s*</iframe>)?"#)
        .expect("iframe pattern is valid")
});

/// Directive flag that disables rewriting.
pub const RAW_FLAG: &str = "raw";

/// Replaces visualization iframes with export-backed figures.
#[derive(Debug, Clone)]
pub struct EmbedFallbackFormatter {
    route: String,
}

impl EmbedFallbackFormatter {
    pub fn new(route: &str) -> Self {
        Self {
            route: route.to_string(),
        }
    }

    /// Rewrite `markup` against `exports`.
    pub fn rewrite(&self, markup: &str, exports: &ExportTable) -> String {
        EMBED_RE
            .replace_all(markup, |caps: &Captures| {
                let tag = &caps[0];
                if tag.starts_with("<!--") {
                    return tag.to_string();
                }
                match iframe_src(tag) {
                    Some(src) if is_visualization_src(&src, &self.route) => {
                        figure(&src, exports.get(&src))
                    }
                    _ => tag.to_string(),
                }
            })
            .into_owned()
    }
}

impl Default for EmbedFallbackFormatter {
    fn default() -> Self {
        Self::new(DEFAULT_ROUTE)
    }
}

impl PostFormatter for EmbedFallbackFormatter {
    async fn format(
        &self,
        post: &FullPost,
        options: &FormattingOptions,
        exports: &ExportTable,
    ) -> FormattedPost {
        let html = if options.flag(RAW_FLAG) == Some(true) {
            post.content.clone()
        } else {
            self.rewrite(&post.content, exports)
        };
        FormattedPost::from_post(post, html)
    }
}

fn figure(src: &str, export: Option<&ExportRecord>) -> String {
    let src = escape_attr(src);
    let inner = match export {
        Some(record) => format!(
            r#"<img src="{}" width="{}" height="{}" loading="lazy">"#,
            escape_attr(&record.url),
            record.width,
            record.height
        ),
        None => src.clone(),
    };
    format!(r#"<figure data-grapher-src="{src}"><a href="{src}" target="_blank">{inner}</a></figure>"#)
}

fn escape_attr(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}
