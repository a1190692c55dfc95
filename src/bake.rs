//! The baker: collaborators plus config, one method per page kind.
//!
//! Each `render_*` method assembles a [`PageModel`], hands it to the
//! [`PageRenderer`] and returns the finished document with a doctype.

use crate::assemble::{BakeError, PageAssembler, PageModel};
use crate::collab::{ChartStore, ContentStore, ExportRenderer, PageRenderer, PostFormatter};
use crate::config::BakeConfig;
use crate::exports::ExportStore;
use crate::listing;

const DOCTYPE: &str = "<!doctype html>";

/// Which page to bake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BakeTarget {
    Slug(String),
    Id(u64),
    /// Latest revision of a post.
    Preview(u64),
    Charts,
    /// 1-based blog listing page.
    Blog(usize),
    Front,
    Subscribe,
}

pub struct Baker<S, C, R, F, P> {
    content: S,
    charts: C,
    exports: ExportStore<R>,
    formatter: F,
    renderer: P,
    config: BakeConfig,
}

impl<S, C, R, F, P> Baker<S, C, R, F, P>
where
    S: ContentStore,
    C: ChartStore,
    R: ExportRenderer,
    F: PostFormatter,
    P: PageRenderer,
{
    pub fn new(
        content: S,
        charts: C,
        exports: ExportStore<R>,
        formatter: F,
        renderer: P,
        config: BakeConfig,
    ) -> Self {
        Self {
            content,
            charts,
            exports,
            formatter,
            renderer,
            config,
        }
    }

    pub fn config(&self) -> &BakeConfig {
        &self.config
    }

    pub fn exports(&self) -> &ExportStore<R> {
        &self.exports
    }

    fn assembler(&self) -> PageAssembler<'_, S, C, R, F> {
        PageAssembler::new(&self.content, &self.charts, &self.exports, &self.formatter)
            .with_route(&self.config.visualization_route)
    }

    /// Assemble the page model for `target`.
    pub async fn model(&self, target: &BakeTarget) -> Result<PageModel, BakeError> {
        match target {
            BakeTarget::Slug(slug) => self.assembler().page_by_slug(slug).await,
            BakeTarget::Id(id) => self.assembler().page_by_id(*id).await,
            BakeTarget::Preview(id) => self.assembler().preview_by_id(*id).await,
            BakeTarget::Charts => {
                listing::charts_index(&self.charts, &self.config.catalog.public_tag_parents).await
            }
            BakeTarget::Blog(page_num) => {
                listing::blog_index(
                    &self.content,
                    &self.config.media_root,
                    self.config.blog.posts_per_page,
                    *page_num,
                )
                .await
            }
            BakeTarget::Front => listing::front_page(&self.content).await,
            BakeTarget::Subscribe => Ok(listing::subscribe()),
        }
    }

    /// Render a model into a complete document.
    pub fn document(&self, page: &PageModel) -> String {
        format!("{DOCTYPE}{}", self.renderer.render(page))
    }

    async fn render(&self, target: BakeTarget) -> Result<String, BakeError> {
        let page = self.model(&target).await?;
        Ok(self.document(&page))
    }

    pub async fn render_page_by_slug(&self, slug: &str) -> Result<String, BakeError> {
        self.render(BakeTarget::Slug(slug.to_string())).await
    }

    pub async fn render_page_by_id(&self, id: u64) -> Result<String, BakeError> {
        self.render(BakeTarget::Id(id)).await
    }

    /// Render the latest revision of post `id` instead of the published row.
    pub async fn render_preview_by_id(&self, id: u64) -> Result<String, BakeError> {
        self.render(BakeTarget::Preview(id)).await
    }

    pub async fn render_charts_page(&self) -> Result<String, BakeError> {
        self.render(BakeTarget::Charts).await
    }

    pub async fn render_blog_page(&self, page_num: usize) -> Result<String, BakeError> {
        self.render(BakeTarget::Blog(page_num)).await
    }

    pub async fn render_front_page(&self) -> Result<String, BakeError> {
        self.render(BakeTarget::Front).await
    }

    pub fn render_subscribe_page(&self) -> String {
        self.document(&listing::subscribe())
    }

    /// The category menu as JSON, without a doctype.
    pub async fn render_menu_json(&self) -> Result<String, BakeError> {
        listing::menu_json(&self.content).await
    }
}
