//! Shared test utilities: in-memory collaborators and row builders.
//!
//! Every mock records what it was asked behind a `Mutex`, so tests can
//! assert on calls after driving the code under test.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let cms = MockCms::new().with_row(row(1, "energy", "page", "<p>hi</p>"));
//! let charts = MockCharts::with_versions(&[("gdp", 3)]);
//! let renderer = RecordingRenderer::new().failing("co2-emissions");
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use crate::collab::{
    ChartStore, CmsError, ContentStore, ExportRenderer, PostFormatter, RenderError, RenderRequest,
};
use crate::directive::FormattingOptions;
use crate::exports::ExportTable;
use crate::naming::export_file_name;
use crate::types::{
    CategoryEntry, ChartSummary, ChartTagRow, ContentRow, EntryMeta, FormattedPost, FullPost,
    PostSummary, PostType,
};

/// Author every [`MockCms::full_post`] reports.
pub const MOCK_AUTHOR: &str = "Test Author";

// =========================================================================
// Row builders
// =========================================================================

/// A content row with the given id, slug, post type and body.
pub fn row(id: u64, slug: &str, post_type: &str, content: &str) -> ContentRow {
    ContentRow {
        id,
        slug: slug.to_string(),
        title: slug.replace('-', " "),
        post_type: PostType::from(post_type),
        content: content.to_string(),
        published: "2018-01-01 00:00:00".to_string(),
        modified: "2018-01-01 00:00:00".to_string(),
        parent_id: 0,
    }
}

/// A revision of `parent`, modified at `modified`.
pub fn revision(id: u64, parent: u64, modified: &str, content: &str) -> ContentRow {
    ContentRow {
        modified: modified.to_string(),
        parent_id: parent,
        ..row(id, &format!("{parent}-revision-v1"), "revision", content)
    }
}

/// A blog index entry.
pub fn summary(slug: &str, image_url: Option<&str>) -> PostSummary {
    PostSummary {
        slug: slug.to_string(),
        title: slug.replace('-', " "),
        date: "2018-01-01".to_string(),
        authors: vec![MOCK_AUTHOR.to_string()],
        excerpt: None,
        image_url: image_url.map(str::to_string),
    }
}

/// A category with one entry per slug.
pub fn category(name: &str, slugs: &[&str]) -> CategoryEntry {
    CategoryEntry {
        name: name.to_string(),
        slug: name.to_lowercase().replace(' ', "-"),
        entries: slugs
            .iter()
            .map(|s| EntryMeta {
                slug: s.to_string(),
                title: s.replace('-', " "),
                excerpt: None,
                starred: false,
            })
            .collect(),
    }
}

// =========================================================================
// MockCms
// =========================================================================

/// In-memory CMS.
#[derive(Default)]
pub struct MockCms {
    rows: Vec<ContentRow>,
    revisions: Vec<ContentRow>,
    categories: Vec<CategoryEntry>,
    posts: Vec<PostSummary>,
    unavailable: bool,
    /// Every query, as `method(arg)`.
    pub queries: Mutex<Vec<String>>,
}

impl MockCms {
    pub fn new() -> Self {
        Self::default()
    }

    /// A CMS whose every query fails.
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    pub fn with_row(mut self, row: ContentRow) -> Self {
        self.rows.push(row);
        self
    }

    pub fn with_revision(mut self, row: ContentRow) -> Self {
        self.revisions.push(row);
        self
    }

    pub fn with_categories(mut self, categories: Vec<CategoryEntry>) -> Self {
        self.categories = categories;
        self
    }

    pub fn with_posts(mut self, posts: Vec<PostSummary>) -> Self {
        self.posts = posts;
        self
    }

    pub fn get_queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }

    fn query(&self, call: String) -> Result<(), CmsError> {
        self.queries.lock().unwrap().push(call);
        if self.unavailable {
            Err(CmsError::Unavailable("mock CMS is down".to_string()))
        } else {
            Ok(())
        }
    }
}

impl ContentStore for MockCms {
    async fn post_by_slug(&self, slug: &str) -> Result<Option<ContentRow>, CmsError> {
        self.query(format!("post_by_slug({slug})"))?;
        Ok(self.rows.iter().find(|r| r.slug == slug).cloned())
    }

    async fn post_by_id(&self, id: u64) -> Result<Option<ContentRow>, CmsError> {
        self.query(format!("post_by_id({id})"))?;
        Ok(self.rows.iter().find(|r| r.id == id).cloned())
    }

    async fn latest_revision(&self, parent_id: u64) -> Result<Option<ContentRow>, CmsError> {
        self.query(format!("latest_revision({parent_id})"))?;
        let Some(parent) = self.rows.iter().find(|r| r.id == parent_id) else {
            return Ok(None);
        };
        Ok(self
            .revisions
            .iter()
            .filter(|r| r.parent_id == parent_id)
            .max_by(|a, b| a.modified.cmp(&b.modified))
            .map(|r| ContentRow {
                post_type: parent.post_type.clone(),
                ..r.clone()
            }))
    }

    async fn full_post(&self, row: &ContentRow) -> Result<FullPost, CmsError> {
        self.query(format!("full_post({})", row.id))?;
        Ok(FullPost {
            id: row.id,
            slug: row.slug.clone(),
            title: row.title.clone(),
            post_type: row.post_type.clone(),
            date: row.published.clone(),
            modified: row.modified.clone(),
            authors: vec![MOCK_AUTHOR.to_string()],
            excerpt: None,
            content: row.content.clone(),
            image_url: None,
        })
    }

    async fn entries_by_category(&self) -> Result<Vec<CategoryEntry>, CmsError> {
        self.query("entries_by_category()".to_string())?;
        Ok(self.categories.clone())
    }

    async fn blog_index(&self) -> Result<Vec<PostSummary>, CmsError> {
        self.query("blog_index()".to_string())?;
        Ok(self.posts.clone())
    }
}

// =========================================================================
// MockCharts
// =========================================================================

/// In-memory visualization store.
#[derive(Default)]
pub struct MockCharts {
    versions: HashMap<String, u64>,
    summaries: Vec<ChartSummary>,
    tags: Vec<ChartTagRow>,
    unavailable: bool,
    /// Slugs passed to `chart_version`, in call order.
    pub version_queries: Mutex<Vec<String>>,
}

impl MockCharts {
    pub fn with_versions(versions: &[(&str, u64)]) -> Self {
        Self {
            versions: versions
                .iter()
                .map(|(slug, v)| (slug.to_string(), *v))
                .collect(),
            ..Self::default()
        }
    }

    pub fn with_catalog(summaries: Vec<ChartSummary>, tags: Vec<ChartTagRow>) -> Self {
        Self {
            summaries,
            tags,
            ..Self::default()
        }
    }

    /// A store whose every query fails.
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    fn check(&self) -> Result<(), CmsError> {
        if self.unavailable {
            Err(CmsError::Unavailable("mock chart store is down".to_string()))
        } else {
            Ok(())
        }
    }
}

impl ChartStore for MockCharts {
    async fn chart_summaries(&self) -> Result<Vec<ChartSummary>, CmsError> {
        self.check()?;
        Ok(self.summaries.clone())
    }

    async fn chart_tags(&self) -> Result<Vec<ChartTagRow>, CmsError> {
        self.check()?;
        Ok(self.tags.clone())
    }

    async fn chart_version(&self, slug: &str) -> Result<Option<u64>, CmsError> {
        self.version_queries.lock().unwrap().push(slug.to_string());
        self.check()?;
        Ok(self.versions.get(slug).copied())
    }
}

// =========================================================================
// RecordingRenderer
// =========================================================================

/// Export renderer that records `key@version` for every call and writes an
/// 850x600 export file on success.
#[derive(Default)]
pub struct RecordingRenderer {
    calls: Mutex<Vec<String>>,
    delay: Option<Duration>,
    failing: HashSet<String>,
    hanging: HashSet<String>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep this long before finishing each render.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fail every render of `key`.
    pub fn failing(mut self, key: &str) -> Self {
        self.failing.insert(key.to_string());
        self
    }

    /// Never finish a render of `key`.
    pub fn hanging(mut self, key: &str) -> Self {
        self.hanging.insert(key.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl ExportRenderer for RecordingRenderer {
    async fn render(&self, request: &RenderRequest) -> Result<(), RenderError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("{}@{}", request.key, request.version));

        if self.hanging.contains(&request.key) {
            std::future::pending::<()>().await;
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.contains(&request.key) {
            return Err(RenderError::Failed(format!("mock failure for {}", request.key)));
        }

        let name = export_file_name(&request.key, request.version, 850, 600);
        tokio::fs::write(request.out_dir.join(name), "<svg/>").await?;
        Ok(())
    }
}

// =========================================================================
// PassthroughFormatter
// =========================================================================

/// Formatter that keeps the body unchanged and records the export table it
/// was given.
#[derive(Default)]
pub struct PassthroughFormatter {
    pub tables: Mutex<Vec<ExportTable>>,
}

impl PassthroughFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Export keys seen by the most recent `format` call.
    pub fn last_keys(&self) -> Vec<String> {
        self.tables
            .lock()
            .unwrap()
            .last()
            .map(|t| t.iter().map(|r| r.key.clone()).collect())
            .unwrap_or_default()
    }
}

impl PostFormatter for PassthroughFormatter {
    async fn format(
        &self,
        post: &FullPost,
        _options: &FormattingOptions,
        exports: &ExportTable,
    ) -> FormattedPost {
        self.tables.lock().unwrap().push(exports.clone());
        FormattedPost::from_post(post, post.content.clone())
    }
}
