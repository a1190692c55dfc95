//! Thumbnail selection for listing pages.
//!
//! The CMS generates several size variants next to every uploaded image:
//!
//! ```text
//! uploads/2018/01/
//! ├── chart.png              # original, largest
//! ├── chart-768x512.png
//! ├── chart-300x200.png
//! └── chart-150x150.png
//! ```
//!
//! Listing pages show many posts at once, so each post's featured image is
//! swapped for a smaller sibling. Candidates are every file in the same
//! directory whose name starts with the image's stem and has the same
//! extension (the original included), sorted ascending by file size. The
//! pick is the third-from-largest entry, index `len - 3`:
//!
//! | Candidates | Pick |
//! |---|---|
//! | 1 or 2 | none, keep the original |
//! | 3 | index 0, the smallest |
//! | 4 | index 1 |
//!
//! Any failure (no extension, unreadable directory, a file vanishing between
//! listing and stat) gives [`Selection::Fallback`]; callers always end up
//! with either the chosen variant or the original URL.

use crate::links::split_url;
use std::io;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// How many entries from the top of the size-sorted list to pick.
const FROM_LARGEST: usize = 3;

#[derive(Error, Debug)]
pub enum VariantError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("image path has no file name or extension: {0}")]
    Unnamed(String),
    #[error("image path escapes the media root: {0}")]
    OutsideRoot(String),
    #[error("only {0} size variants")]
    TooFew(usize),
}

/// Result of a variant lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// URL path of the chosen variant.
    Resolved(String),
    Fallback,
}

impl Selection {
    /// The chosen variant, or `original` when selection failed.
    pub fn or_original(self, original: &str) -> String {
        match self {
            Selection::Resolved(path) => path,
            Selection::Fallback => original.to_string(),
        }
    }
}

/// Size variants of one image, ascending by file size.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariantSet {
    entries: Vec<(u64, PathBuf)>,
}

impl VariantSet {
    /// Build from `(size, path)` pairs in any order. Equal sizes are ordered
    /// by path so the pick is deterministic.
    pub fn from_sized(mut entries: Vec<(u64, PathBuf)>) -> Self {
        entries.sort();
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.entries.iter().map(|(_, p)| p.as_path())
    }

    /// The third-from-largest variant.
    pub fn pick(&self) -> Result<&Path, VariantError> {
        let n = self.entries.len();
        if n < FROM_LARGEST {
            return Err(VariantError::TooFew(n));
        }
        Ok(&self.entries[n - FROM_LARGEST].1)
    }
}

/// Pick a listing-sized variant of `image_url`, resolving URL paths against
/// `media_root`.
pub async fn select(media_root: &Path, image_url: &str) -> Selection {
    match try_select(media_root, image_url).await {
        Ok(path) => Selection::Resolved(path),
        Err(e) => {
            tracing::debug!(image = image_url, error = %e, "keeping original image");
            Selection::Fallback
        }
    }
}

async fn try_select(media_root: &Path, image_url: &str) -> Result<String, VariantError> {
    let set = find_variants(media_root, image_url).await?;
    let chosen = set.pick()?;
    to_url_path(media_root, chosen).ok_or_else(|| VariantError::OutsideRoot(image_url.into()))
}

/// All size variants of `image_url` found under `media_root`.
pub async fn find_variants(media_root: &Path, image_url: &str) -> Result<VariantSet, VariantError> {
    let url_path = split_url(image_url).path;
    let relative = Path::new(url_path.trim_start_matches('/'));
    if relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        return Err(VariantError::OutsideRoot(image_url.into()));
    }

    let file = media_root.join(relative);
    let (Some(dir), Some(stem), Some(ext)) = (
        file.parent(),
        file.file_stem().and_then(|s| s.to_str()),
        file.extension().and_then(|s| s.to_str()),
    ) else {
        return Err(VariantError::Unnamed(image_url.into()));
    };
    let suffix = format!(".{ext}");

    let mut entries = Vec::new();
    let mut listing = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = listing.next_entry().await? {
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if !(name.starts_with(stem) && name.ends_with(&suffix)) {
            continue;
        }
        // Follows symlinks, unlike `DirEntry::metadata`.
        let meta = tokio::fs::metadata(entry.path()).await?;
        if meta.is_file() {
            entries.push((meta.len(), entry.path()));
        }
    }

    Ok(VariantSet::from_sized(entries))
}

/// `/`-separated URL path of `path` relative to `root`.
fn to_url_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let mut url = String::new();
    for part in relative.components() {
        url.push('/');
        url.push_str(part.as_os_str().to_str()?);
    }
    Some(url)
}
