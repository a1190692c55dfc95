//! Index pages: the visualization catalog, the paginated blog listing, the
//! front page, the category menu and the subscribe page.

use crate::assemble::{BakeError, PageModel};
use crate::collab::{ChartStore, ContentStore};
use crate::types::{
    CategoryEntry, ChartIndexItem, ChartSummary, ChartTagRow, PostSummary, TagEntry,
};
use crate::variants;
use futures::future::join_all;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::path::Path;

/// Blog posts per listing page.
pub const DEFAULT_POSTS_PER_PAGE: usize = 21;

/// Join chart summaries with their public tags.
///
/// Every chart appears, in summary order, even with no public tag. Tag rows
/// whose parent is not in `public_parents`, or that point at an unknown
/// chart, are dropped.
pub fn build_catalog(
    summaries: Vec<ChartSummary>,
    tags: Vec<ChartTagRow>,
    public_parents: &BTreeSet<u64>,
) -> Vec<ChartIndexItem> {
    let mut items: Vec<ChartIndexItem> = summaries
        .into_iter()
        .map(|s| ChartIndexItem {
            id: s.id,
            slug: s.slug,
            title: s.title,
            variant_name: s.variant_name,
            tags: Vec::new(),
        })
        .collect();
    let by_id: HashMap<u64, usize> = items.iter().enumerate().map(|(i, c)| (c.id, i)).collect();

    for tag in tags {
        let public = tag
            .tag_parent_id
            .is_some_and(|p| public_parents.contains(&p));
        if !public {
            continue;
        }
        if let Some(&i) = by_id.get(&tag.chart_id) {
            items[i].tags.push(TagEntry {
                id: tag.tag_id,
                name: tag.tag_name,
            });
        }
    }
    items
}

pub async fn charts_index<C: ChartStore>(
    store: &C,
    public_parents: &BTreeSet<u64>,
) -> Result<PageModel, BakeError> {
    let (summaries, tags) = tokio::try_join!(store.chart_summaries(), store.chart_tags())?;
    Ok(PageModel::ChartsIndex {
        charts: build_catalog(summaries, tags, public_parents),
    })
}

/// Number of pages needed for `total` items.
pub fn num_pages(total: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    total.div_ceil(page_size)
}

/// Items on 1-based page `page_num`. Page 0 and pages past the end are
/// empty.
pub fn paginate<T>(items: &[T], page_size: usize, page_num: usize) -> &[T] {
    if page_num == 0 || page_size == 0 {
        return &[];
    }
    let start = (page_num - 1).saturating_mul(page_size).min(items.len());
    let end = start.saturating_add(page_size).min(items.len());
    &items[start..end]
}

/// One page of the blog listing, with featured images swapped for smaller
/// variants found under `media_root`.
pub async fn blog_index<S: ContentStore>(
    store: &S,
    media_root: &Path,
    page_size: usize,
    page_num: usize,
) -> Result<PageModel, BakeError> {
    let all = store.blog_index().await?;
    let num_pages = num_pages(all.len(), page_size);
    let page = paginate(&all, page_size, page_num);

    let posts = join_all(page.iter().cloned().map(|post| with_variant(post, media_root))).await;
    tracing::debug!(page_num, num_pages, posts = posts.len(), "blog index page");

    Ok(PageModel::BlogIndex {
        posts,
        page_num,
        num_pages,
    })
}

async fn with_variant(mut post: PostSummary, media_root: &Path) -> PostSummary {
    if let Some(url) = post.image_url.take() {
        post.image_url = Some(variants::select(media_root, &url).await.or_original(&url));
    }
    post
}

/// Every blog post plus the category menu.
pub async fn front_page<S: ContentStore>(store: &S) -> Result<PageModel, BakeError> {
    let (posts, entries) = tokio::try_join!(store.blog_index(), store.entries_by_category())?;
    Ok(PageModel::FrontPage { entries, posts })
}

#[derive(Serialize)]
struct Menu<'a> {
    categories: &'a [CategoryEntry],
}

/// The category menu as `{"categories": [...]}`.
pub async fn menu_json<S: ContentStore>(store: &S) -> Result<String, BakeError> {
    let categories = store.entries_by_category().await?;
    serde_json::to_string(&Menu {
        categories: &categories,
    })
    .map_err(|e| BakeError::Internal(e.to_string()))
}

pub fn subscribe() -> PageModel {
    PageModel::Subscribe
}
