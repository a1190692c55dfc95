//! Typed rows crossing the CMS boundary.
//!
//! The CMS hands back loosely-typed records (`wp_posts` columns as JSON). They
//! are validated once, here, into [`ContentRow`]; everything downstream works
//! on the typed structures only.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RowError {
    #[error("content row is not an object")]
    NotAnObject,
    #[error("content row is missing field `{0}`")]
    MissingField(&'static str),
    #[error("content row field `{field}` should be {expected}")]
    WrongType {
        field: &'static str,
        expected: &'static str,
    },
}

/// The CMS post type column.
///
/// Only `post` is special-cased by the page assembler; every other type is
/// baked as a long-form entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PostType {
    Post,
    Page,
    Other(String),
}

impl PostType {
    pub fn as_str(&self) -> &str {
        match self {
            PostType::Post => "post",
            PostType::Page => "page",
            PostType::Other(s) => s,
        }
    }
}

impl From<&str> for PostType {
    fn from(s: &str) -> Self {
        match s {
            "post" => PostType::Post,
            "page" => PostType::Page,
            other => PostType::Other(other.to_string()),
        }
    }
}

impl From<String> for PostType {
    fn from(s: String) -> Self {
        PostType::from(s.as_str())
    }
}

impl From<PostType> for String {
    fn from(t: PostType) -> Self {
        t.as_str().to_string()
    }
}

impl fmt::Display for PostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A raw post or page record as stored by the CMS.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentRow {
    pub id: u64,
    pub slug: String,
    pub title: String,
    pub post_type: PostType,
    /// Raw markup body, before any formatting.
    pub content: String,
    pub published: String,
    pub modified: String,
    /// Parent post id; `0` when the row has no parent.
    pub parent_id: u64,
}

impl ContentRow {
    /// Validate a `wp_posts`-shaped record.
    ///
    /// Required: `ID` (number) and `post_type` (string). Text columns default
    /// to empty when absent; present columns must have the right JSON type.
    pub fn from_value(value: &Value) -> Result<Self, RowError> {
        let obj = value.as_object().ok_or(RowError::NotAnObject)?;

        let id = obj
            .get("ID")
            .ok_or(RowError::MissingField("ID"))?
            .as_u64()
            .ok_or(RowError::WrongType {
                field: "ID",
                expected: "an unsigned integer",
            })?;

        let post_type = obj
            .get("post_type")
            .ok_or(RowError::MissingField("post_type"))?
            .as_str()
            .ok_or(RowError::WrongType {
                field: "post_type",
                expected: "a string",
            })?;

        let text = |field: &'static str| -> Result<String, RowError> {
            match obj.get(field) {
                None | Some(Value::Null) => Ok(String::new()),
                Some(Value::String(s)) => Ok(s.clone()),
                Some(_) => Err(RowError::WrongType {
                    field,
                    expected: "a string",
                }),
            }
        };

        let parent_id = match obj.get("post_parent") {
            None | Some(Value::Null) => 0,
            Some(v) => v.as_u64().ok_or(RowError::WrongType {
                field: "post_parent",
                expected: "an unsigned integer",
            })?,
        };

        Ok(Self {
            id,
            slug: text("post_name")?,
            title: text("post_title")?,
            post_type: PostType::from(post_type),
            content: text("post_content")?,
            published: text("post_date")?,
            modified: text("post_modified")?,
            parent_id,
        })
    }
}

/// A post with everything the CMS resolves around it (authors, excerpt,
/// featured image).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FullPost {
    pub id: u64,
    pub slug: String,
    pub title: String,
    pub post_type: PostType,
    pub date: String,
    pub modified: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    /// Raw markup body.
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// Output of the post formatter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormattedPost {
    pub id: u64,
    pub slug: String,
    pub title: String,
    pub post_type: PostType,
    pub date: String,
    pub modified: String,
    pub authors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    /// Transformed body, ready for the template renderer.
    pub html: String,
}

impl FormattedPost {
    /// Carry a post's metadata over to a formatted body.
    pub fn from_post(post: &FullPost, html: String) -> Self {
        Self {
            id: post.id,
            slug: post.slug.clone(),
            title: post.title.clone(),
            post_type: post.post_type.clone(),
            date: post.date.clone(),
            modified: post.modified.clone(),
            authors: post.authors.clone(),
            excerpt: post.excerpt.clone(),
            html,
        }
    }
}

/// One entry linked from the category navigation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryMeta {
    pub slug: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub starred: bool,
}

/// A category grouping of long-form entries, in CMS menu order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryEntry {
    pub name: String,
    pub slug: String,
    pub entries: Vec<EntryMeta>,
}

/// A blog post as listed on index pages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostSummary {
    pub slug: String,
    pub title: String,
    pub date: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// Visualization summary row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSummary {
    pub id: u64,
    pub slug: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant_name: Option<String>,
}

/// Visualization ↔ tag association row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartTagRow {
    pub chart_id: u64,
    pub tag_id: u64,
    pub tag_name: String,
    #[serde(default)]
    pub tag_parent_id: Option<u64>,
}

/// A tag as shown in the visualization catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagEntry {
    pub id: u64,
    pub name: String,
}

/// A catalog entry: the summary plus its public tags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartIndexItem {
    pub id: u64,
    pub slug: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant_name: Option<String>,
    pub tags: Vec<TagEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn row_from_wp_columns() {
        let row = ContentRow::from_value(&json!({
            "ID": 42,
            "post_name": "energy",
            "post_title": "Energy",
            "post_type": "page",
            "post_content": "<p>hi</p>",
            "post_date": "2018-01-01 00:00:00",
            "post_modified": "2018-02-01 00:00:00",
            "post_parent": 0
        }))
        .unwrap();

        assert_eq!(row.id, 42);
        assert_eq!(row.slug, "energy");
        assert_eq!(row.post_type, PostType::Page);
        assert_eq!(row.content, "<p>hi</p>");
        assert_eq!(row.parent_id, 0);
    }

    #[test]
    fn row_missing_id_is_rejected() {
        let err = ContentRow::from_value(&json!({"post_type": "post"})).unwrap_err();
        assert_eq!(err, RowError::MissingField("ID"));
    }

    #[test]
    fn row_with_string_id_is_rejected() {
        let err = ContentRow::from_value(&json!({"ID": "42", "post_type": "post"})).unwrap_err();
        assert!(matches!(err, RowError::WrongType { field: "ID", .. }));
    }

    #[test]
    fn row_null_text_columns_default_to_empty() {
        let row = ContentRow::from_value(&json!({
            "ID": 1,
            "post_type": "post",
            "post_content": null
        }))
        .unwrap();
        assert_eq!(row.content, "");
        assert_eq!(row.slug, "");
    }

    #[test]
    fn row_non_object_is_rejected() {
        assert_eq!(
            ContentRow::from_value(&json!([1, 2])).unwrap_err(),
            RowError::NotAnObject
        );
    }

    #[test]
    fn post_type_roundtrips_through_string() {
        assert_eq!(PostType::from("post"), PostType::Post);
        assert_eq!(PostType::from("revision").as_str(), "revision");
        let json = serde_json::to_string(&PostType::Page).unwrap();
        assert_eq!(json, "\"page\"");
    }
}
