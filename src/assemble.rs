//! Single-page assembly.
//!
//! Turns one CMS row into a renderer-ready [`PageModel`]:
//!
//! ```text
//! row ─┬─ full_post ──────────┐
//!      └─ entries_by_category ┤   (concurrent)
//!                             ▼
//!              scan embeds → ensure exports → lookup table
//!                             ▼
//!              extract directives → format body → PageModel
//! ```
//!
//! Missing exports never fail a page. The only errors are a row that does
//! not exist ([`BakeError::NotFound`]) and an unreachable collaborator
//! ([`BakeError::Upstream`]).

use crate::collab::{ChartStore, CmsError, ContentStore, ExportRenderer, PostFormatter};
use crate::directive::{FormattingOptions, extract};
use crate::embeds::{DEFAULT_ROUTE, scan};
use crate::exports::{ExportRecord, ExportStore, ExportStoreError};
use crate::types::{
    CategoryEntry, ChartIndexItem, ContentRow, FormattedPost, PostSummary, PostType,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BakeError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("upstream unavailable: {0}")]
    Upstream(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl BakeError {
    /// Whether trying the same bake again later could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, BakeError::Upstream(_))
    }
}

impl From<CmsError> for BakeError {
    fn from(e: CmsError) -> Self {
        BakeError::Upstream(e.to_string())
    }
}

impl From<ExportStoreError> for BakeError {
    fn from(e: ExportStoreError) -> Self {
        BakeError::Upstream(e.to_string())
    }
}

/// A formatted article plus what the bake resolved for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticlePage {
    pub post: FormattedPost,
    pub formatting_options: FormattingOptions,
    /// Visualization references found in the body, in document order.
    pub embeds: Vec<String>,
    /// Current export per embed reference. Embeds without one are absent.
    pub exports: BTreeMap<String, ExportRecord>,
}

/// Everything a template renderer needs for one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PageModel {
    BlogPost(ArticlePage),
    LongForm {
        entries: Vec<CategoryEntry>,
        article: ArticlePage,
    },
    ChartsIndex {
        charts: Vec<ChartIndexItem>,
    },
    BlogIndex {
        posts: Vec<PostSummary>,
        page_num: usize,
        num_pages: usize,
    },
    FrontPage {
        entries: Vec<CategoryEntry>,
        posts: Vec<PostSummary>,
    },
    Subscribe,
}

impl PageModel {
    /// The article, for post and long-form pages.
    pub fn article(&self) -> Option<&ArticlePage> {
        match self {
            PageModel::BlogPost(article) | PageModel::LongForm { article, .. } => Some(article),
            _ => None,
        }
    }
}

/// Assembles article pages from borrowed collaborators.
pub struct PageAssembler<'a, S, C, R, F> {
    content: &'a S,
    charts: &'a C,
    exports: &'a ExportStore<R>,
    formatter: &'a F,
    route: &'a str,
}

impl<'a, S, C, R, F> PageAssembler<'a, S, C, R, F>
where
    S: ContentStore,
    C: ChartStore,
    R: ExportRenderer,
    F: PostFormatter,
{
    pub fn new(
        content: &'a S,
        charts: &'a C,
        exports: &'a ExportStore<R>,
        formatter: &'a F,
    ) -> Self {
        Self {
            content,
            charts,
            exports,
            formatter,
            route: DEFAULT_ROUTE,
        }
    }

    /// iframe `src` segment that marks a visualization embed.
    pub fn with_route(mut self, route: &'a str) -> Self {
        self.route = route;
        self
    }

    /// Build the page model for `row`.
    pub async fn assemble(&self, row: &ContentRow) -> Result<PageModel, BakeError> {
        let (post, entries) = tokio::try_join!(
            self.content.full_post(row),
            self.content.entries_by_category()
        )?;

        let embeds = scan(&post.content, self.route);
        let report = self.exports.ensure_rendered(self.charts, &embeds).await?;
        if report.missing() > 0 {
            tracing::warn!(slug = %post.slug, %report, "baking with missing exports");
        }
        let table = self.exports.lookup_all().await;

        let formatting_options = extract(&post.content);
        let formatted = self
            .formatter
            .format(&post, &formatting_options, &table)
            .await;

        let article = ArticlePage {
            post: formatted,
            formatting_options,
            exports: table.resolve(&embeds),
            embeds,
        };
        Ok(match post.post_type {
            PostType::Post => PageModel::BlogPost(article),
            _ => PageModel::LongForm { entries, article },
        })
    }

    pub async fn page_by_slug(&self, slug: &str) -> Result<PageModel, BakeError> {
        let row = self
            .content
            .post_by_slug(slug)
            .await?
            .ok_or_else(|| BakeError::NotFound(format!("no post with slug '{slug}'")))?;
        self.assemble(&row).await
    }

    pub async fn page_by_id(&self, id: u64) -> Result<PageModel, BakeError> {
        let row = self
            .content
            .post_by_id(id)
            .await?
            .ok_or_else(|| BakeError::NotFound(format!("no post with id {id}")))?;
        self.assemble(&row).await
    }

    /// Bake the latest unpublished revision of post `id`.
    pub async fn preview_by_id(&self, id: u64) -> Result<PageModel, BakeError> {
        let row = self
            .content
            .latest_revision(id)
            .await?
            .ok_or_else(|| BakeError::NotFound(format!("no revision of post {id}")))?;
        self.assemble(&row).await
    }
}
