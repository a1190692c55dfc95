//! Contracts for the systems the baker talks to.
//!
//! The baker never queries a database, renders a chart or emits markup
//! itself. Those jobs belong to collaborators behind these traits, so the
//! rest of the crate is storage- and template-agnostic:
//!
//! | Trait | Role |
//! |---|---|
//! | [`ContentStore`] | CMS posts, revisions, category menu, blog index |
//! | [`ChartStore`] | Visualization summaries, tags and current versions |
//! | [`ExportRenderer`] | Produces a static export for one visualization |
//! | [`PostFormatter`] | Turns a raw post body into renderer-ready HTML |
//! | [`PageRenderer`] | Turns a [`PageModel`] into the final document |
//!
//! [`CommandRenderer`] and [`JsonRenderer`] are the production
//! implementations used by the `bake` binary.

use crate::assemble::PageModel;
use crate::directive::FormattingOptions;
use crate::exports::ExportTable;
use crate::types::{
    CategoryEntry, ChartSummary, ChartTagRow, ContentRow, FormattedPost, FullPost, PostSummary,
    RowError,
};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CmsError {
    #[error("CMS unavailable: {0}")]
    Unavailable(String),
    #[error("invalid CMS row: {0}")]
    InvalidRow(#[from] RowError),
}

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("export render failed: {0}")]
    Failed(String),
}

/// CMS post storage. "Not found" is `Ok(None)`, never an error.
#[allow(async_fn_in_trait)]
pub trait ContentStore {
    async fn post_by_slug(&self, slug: &str) -> Result<Option<ContentRow>, CmsError>;

    async fn post_by_id(&self, id: u64) -> Result<Option<ContentRow>, CmsError>;

    /// Most recently modified revision of `parent_id`. The returned row
    /// carries the parent's post type.
    async fn latest_revision(&self, parent_id: u64) -> Result<Option<ContentRow>, CmsError>;

    /// Resolve authors, excerpt and featured image around a row.
    async fn full_post(&self, row: &ContentRow) -> Result<FullPost, CmsError>;

    /// Category menu, in display order.
    async fn entries_by_category(&self) -> Result<Vec<CategoryEntry>, CmsError>;

    /// Every published blog post, newest first.
    async fn blog_index(&self) -> Result<Vec<PostSummary>, CmsError>;
}

/// Visualization configuration storage.
#[allow(async_fn_in_trait)]
pub trait ChartStore {
    async fn chart_summaries(&self) -> Result<Vec<ChartSummary>, CmsError>;

    async fn chart_tags(&self) -> Result<Vec<ChartTagRow>, CmsError>;

    /// Current config version of the chart with `slug`; `None` if unknown.
    async fn chart_version(&self, slug: &str) -> Result<Option<u64>, CmsError>;
}

impl<T: ContentStore> ContentStore for &T {
    async fn post_by_slug(&self, slug: &str) -> Result<Option<ContentRow>, CmsError> {
        (**self).post_by_slug(slug).await
    }

    async fn post_by_id(&self, id: u64) -> Result<Option<ContentRow>, CmsError> {
        (**self).post_by_id(id).await
    }

    async fn latest_revision(&self, parent_id: u64) -> Result<Option<ContentRow>, CmsError> {
        (**self).latest_revision(parent_id).await
    }

    async fn full_post(&self, row: &ContentRow) -> Result<FullPost, CmsError> {
        (**self).full_post(row).await
    }

    async fn entries_by_category(&self) -> Result<Vec<CategoryEntry>, CmsError> {
        (**self).entries_by_category().await
    }

    async fn blog_index(&self) -> Result<Vec<PostSummary>, CmsError> {
        (**self).blog_index().await
    }
}

impl<T: ChartStore> ChartStore for &T {
    async fn chart_summaries(&self) -> Result<Vec<ChartSummary>, CmsError> {
        (**self).chart_summaries().await
    }

    async fn chart_tags(&self) -> Result<Vec<ChartTagRow>, CmsError> {
        (**self).chart_tags().await
    }

    async fn chart_version(&self, slug: &str) -> Result<Option<u64>, CmsError> {
        (**self).chart_version(slug).await
    }
}

/// One export to produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRequest {
    /// Embed reference as found in the markup.
    pub reference: String,
    /// Export key derived from the reference.
    pub key: String,
    pub version: u64,
    /// Directory the export file must be written to.
    pub out_dir: PathBuf,
}

/// Produces a static export. Must write
/// [`export_file_name`](crate::naming::export_file_name) into `out_dir`
/// before returning `Ok`.
#[allow(async_fn_in_trait)]
pub trait ExportRenderer {
    async fn render(&self, request: &RenderRequest) -> Result<(), RenderError>;
}

/// Transforms a post body, inlining resolved exports.
#[allow(async_fn_in_trait)]
pub trait PostFormatter {
    async fn format(
        &self,
        post: &FullPost,
        options: &FormattingOptions,
        exports: &ExportTable,
    ) -> FormattedPost;
}

/// Pure page-model → document function.
pub trait PageRenderer {
    fn render(&self, page: &PageModel) -> String;
}

/// Renders exports by running an external command.
///
/// The configured command is run with four extra arguments: the embed
/// reference, the export key, the version and the output directory. The
/// child is killed if the render future is dropped, as it is on timeout.
#[derive(Debug, Clone)]
pub struct CommandRenderer {
    program: String,
    args: Vec<String>,
}

impl CommandRenderer {
    /// `command` is the program followed by its fixed arguments.
    pub fn new(command: &[String]) -> Option<Self> {
        let (program, args) = command.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }
}

impl ExportRenderer for CommandRenderer {
    async fn render(&self, request: &RenderRequest) -> Result<(), RenderError> {
        tracing::debug!(program = %self.program, key = %request.key, "running export command");
        let output = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .arg(&request.reference)
            .arg(&request.key)
            .arg(request.version.to_string())
            .arg(&request.out_dir)
            .kill_on_drop(true)
            .output()
            .await?;

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(RenderError::Failed(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )))
        }
    }
}

/// Renderer used when no export command is configured: every render fails,
/// so pages fall back to their placeholders.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRenderer;

impl ExportRenderer for NoRenderer {
    async fn render(&self, request: &RenderRequest) -> Result<(), RenderError> {
        Err(RenderError::Failed(format!(
            "no export command configured for {}",
            request.key
        )))
    }
}

/// Either a command renderer or none, chosen from config at startup.
#[derive(Debug, Clone)]
pub enum ConfiguredRenderer {
    Command(CommandRenderer),
    Disabled(NoRenderer),
}

impl ConfiguredRenderer {
    pub fn from_command(command: Option<&[String]>) -> Self {
        match command.and_then(CommandRenderer::new) {
            Some(r) => ConfiguredRenderer::Command(r),
            None => ConfiguredRenderer::Disabled(NoRenderer),
        }
    }
}

impl ExportRenderer for ConfiguredRenderer {
    async fn render(&self, request: &RenderRequest) -> Result<(), RenderError> {
        match self {
            ConfiguredRenderer::Command(r) => r.render(request).await,
            ConfiguredRenderer::Disabled(r) => r.render(request).await,
        }
    }
}

/// Emits the page model as pretty JSON. Used when baking models for an
/// external template step.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRenderer;

impl PageRenderer for JsonRenderer {
    fn render(&self, page: &PageModel) -> String {
        // PageModel holds only strings, numbers and maps with string keys.
        serde_json::to_string_pretty(page).unwrap_or_default()
    }
}
