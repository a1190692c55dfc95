//! CMS snapshot store.
//!
//! Bakes from a JSON export of the CMS instead of a live database. The
//! snapshot carries raw `wp_posts` rows plus the few resolved columns the
//! baker needs, the category menu and the visualization tables:
//!
//! ```json
//! {
//!   "posts": [
//!     { "ID": 12, "post_name": "energy", "post_type": "page",
//!       "post_title": "Energy", "post_content": "...",
//!       "post_date": "2018-01-01 00:00:00", "post_modified": "2018-02-01 00:00:00",
//!       "post_parent": 0,
//!       "authors": ["Max Roser"], "post_excerpt": "...",
//!       "image_url": "https://example.org/wp-content/uploads/2018/01/energy.png" }
//!   ],
//!   "categories": [ { "name": "Energy", "slug": "energy", "entries": [...] } ],
//!   "charts": [ { "id": 1, "slug": "gdp", "title": "GDP", "version": 4 } ],
//!   "chart_tags": [ { "chart_id": 1, "tag_id": 10, "tag_name": "Economy", "tag_parent_id": 1500 } ]
//! }
//! ```
//!
//! Rows are validated when the snapshot loads; a bad row fails the load with
//! its index rather than surfacing mid-bake. Revisions are rows of type
//! `revision` whose `post_parent` names the post they revise.

use crate::collab::{ChartStore, CmsError, ContentStore};
use crate::types::{
    CategoryEntry, ChartSummary, ChartTagRow, ContentRow, FullPost, PostSummary, PostType,
    RowError,
};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Post type of revision rows.
const REVISION_TYPE: &str = "revision";

#[derive(Error, Debug)]
pub enum DumpError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("post #{index}: {source}")]
    InvalidRow { index: usize, source: RowError },
}

#[derive(Debug, Deserialize)]
struct Snapshot {
    #[serde(default)]
    posts: Vec<Value>,
    #[serde(default)]
    categories: Vec<CategoryEntry>,
    #[serde(default)]
    charts: Vec<DumpChart>,
    #[serde(default)]
    chart_tags: Vec<ChartTagRow>,
}

/// Resolved columns stored next to a raw row.
#[derive(Debug, Clone, Default, Deserialize)]
struct PostExtras {
    #[serde(default)]
    authors: Vec<String>,
    #[serde(default, rename = "post_excerpt")]
    excerpt: Option<String>,
    #[serde(default)]
    image_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct DumpChart {
    id: u64,
    slug: String,
    title: String,
    #[serde(default)]
    variant_name: Option<String>,
    version: u64,
}

/// In-memory CMS and chart store over a snapshot.
#[derive(Debug, Default)]
pub struct DumpStore {
    rows: Vec<ContentRow>,
    extras: HashMap<u64, PostExtras>,
    categories: Vec<CategoryEntry>,
    charts: Vec<DumpChart>,
    chart_tags: Vec<ChartTagRow>,
}

impl DumpStore {
    pub async fn load(path: &Path) -> Result<Self, DumpError> {
        let content = tokio::fs::read_to_string(path).await?;
        let store = Self::from_json(&content)?;
        tracing::info!(
            path = %path.display(),
            posts = store.rows.len(),
            charts = store.charts.len(),
            "loaded CMS snapshot"
        );
        Ok(store)
    }

    pub fn from_json(json: &str) -> Result<Self, DumpError> {
        let snapshot: Snapshot = serde_json::from_str(json)?;

        let mut rows = Vec::with_capacity(snapshot.posts.len());
        let mut extras = HashMap::new();
        for (index, value) in snapshot.posts.into_iter().enumerate() {
            let row = ContentRow::from_value(&value)
                .map_err(|source| DumpError::InvalidRow { index, source })?;
            let extra: PostExtras = serde_json::from_value(value)?;
            extras.insert(row.id, extra);
            rows.push(row);
        }

        Ok(Self {
            rows,
            extras,
            categories: snapshot.categories,
            charts: snapshot.charts,
            chart_tags: snapshot.chart_tags,
        })
    }

    fn is_revision(row: &ContentRow) -> bool {
        row.post_type.as_str() == REVISION_TYPE
    }

    fn published(&self) -> impl Iterator<Item = &ContentRow> {
        self.rows.iter().filter(|r| !Self::is_revision(r))
    }
}

impl ContentStore for DumpStore {
    async fn post_by_slug(&self, slug: &str) -> Result<Option<ContentRow>, CmsError> {
        Ok(self.published().find(|r| r.slug == slug).cloned())
    }

    async fn post_by_id(&self, id: u64) -> Result<Option<ContentRow>, CmsError> {
        Ok(self.published().find(|r| r.id == id).cloned())
    }

    async fn latest_revision(&self, parent_id: u64) -> Result<Option<ContentRow>, CmsError> {
        let Some(parent) = self.published().find(|r| r.id == parent_id) else {
            return Ok(None);
        };
        Ok(self
            .rows
            .iter()
            .filter(|r| Self::is_revision(r) && r.parent_id == parent_id)
            .max_by(|a, b| a.modified.cmp(&b.modified).then(a.id.cmp(&b.id)))
            .map(|r| ContentRow {
                post_type: parent.post_type.clone(),
                ..r.clone()
            }))
    }

    async fn full_post(&self, row: &ContentRow) -> Result<FullPost, CmsError> {
        // Revisions carry no resolved columns of their own.
        let extra = self
            .extras
            .get(&row.id)
            .filter(|e| !e.authors.is_empty() || e.excerpt.is_some() || e.image_url.is_some())
            .or_else(|| self.extras.get(&row.parent_id))
            .cloned()
            .unwrap_or_default();

        Ok(FullPost {
            id: row.id,
            slug: row.slug.clone(),
            title: row.title.clone(),
            post_type: row.post_type.clone(),
            date: row.published.clone(),
            modified: row.modified.clone(),
            authors: extra.authors,
            excerpt: extra.excerpt.filter(|e| !e.is_empty()),
            content: row.content.clone(),
            image_url: extra.image_url,
        })
    }

    async fn entries_by_category(&self) -> Result<Vec<CategoryEntry>, CmsError> {
        Ok(self.categories.clone())
    }

    async fn blog_index(&self) -> Result<Vec<PostSummary>, CmsError> {
        let mut posts: Vec<&ContentRow> = self
            .published()
            .filter(|r| r.post_type == PostType::Post)
            .collect();
        posts.sort_by(|a, b| b.published.cmp(&a.published));

        Ok(posts
            .into_iter()
            .map(|r| {
                let extra = self.extras.get(&r.id).cloned().unwrap_or_default();
                PostSummary {
                    slug: r.slug.clone(),
                    title: r.title.clone(),
                    date: r.published.clone(),
                    authors: extra.authors,
                    excerpt: extra.excerpt.filter(|e| !e.is_empty()),
                    image_url: extra.image_url,
                }
            })
            .collect())
    }
}

impl ChartStore for DumpStore {
    async fn chart_summaries(&self) -> Result<Vec<ChartSummary>, CmsError> {
        Ok(self
            .charts
            .iter()
            .map(|c| ChartSummary {
                id: c.id,
                slug: c.slug.clone(),
                title: c.title.clone(),
                variant_name: c.variant_name.clone(),
            })
            .collect())
    }

    async fn chart_tags(&self) -> Result<Vec<ChartTagRow>, CmsError> {
        Ok(self.chart_tags.clone())
    }

    async fn chart_version(&self, slug: &str) -> Result<Option<u64>, CmsError> {
        Ok(self
            .charts
            .iter()
            .find(|c| c.slug == slug)
            .map(|c| c.version))
    }
}
