//! Formatting directives embedded in post markup.
//!
//! Authors tune how a post is laid out by leaving a comment in the body:
//!
//! ```text
//! <!-- formatting-options toc:false subnavId:coronavirus bodyClassName:wide -->
//! ```
//!
//! Each whitespace-separated token is `name` or `name:value`:
//!
//! | Token          | Parsed as            |
//! |----------------|----------------------|
//! | `raw`          | `Flag(true)`         |
//! | `toc:true`     | `Flag(true)`         |
//! | `toc:false`    | `Flag(false)`        |
//! | `subnavId:abc` | `Text("abc")`        |
//!
//! Only the first directive comment counts. Malformed or absent directives
//! give the default (empty) options; extraction never fails.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::LazyLock;

static DIRECTIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<!--\s*formatting-options\s+(.*?)\s*-->").expect("directive pattern is valid")
});

/// A single directive value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DirectiveValue {
    Flag(bool),
    Text(String),
}

/// Directive name → value, in name order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormattingOptions(BTreeMap<String, DirectiveValue>);

impl FormattingOptions {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, name: &str) -> Option<&DirectiveValue> {
        self.0.get(name)
    }

    /// Boolean value of a directive; `None` when absent or textual.
    pub fn flag(&self, name: &str) -> Option<bool> {
        match self.0.get(name)? {
            DirectiveValue::Flag(b) => Some(*b),
            DirectiveValue::Text(_) => None,
        }
    }

    /// Text value of a directive; `None` when absent or a flag.
    pub fn text(&self, name: &str) -> Option<&str> {
        match self.0.get(name)? {
            DirectiveValue::Text(s) => Some(s),
            DirectiveValue::Flag(_) => None,
        }
    }

    pub fn insert(&mut self, name: impl Into<String>, value: DirectiveValue) {
        self.0.insert(name.into(), value);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DirectiveValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Pull the formatting directive out of raw markup.
pub fn extract(markup: &str) -> FormattingOptions {
    DIRECTIVE_RE
        .captures(markup)
        .and_then(|caps| caps.get(1))
        .map(|m| parse_directives(m.as_str()))
        .unwrap_or_default()
}

/// Parse directive text such as `toc:false raw subnavId:energy`.
pub fn parse_directives(text: &str) -> FormattingOptions {
    let mut options = FormattingOptions::default();
    for token in text.split_whitespace() {
        let (name, value) = match token.split_once(':') {
            Some((name, value)) => (name, Some(value)),
            None => (token, None),
        };
        if name.is_empty() {
            continue;
        }
        let value = match value {
            None | Some("true") => DirectiveValue::Flag(true),
            Some("false") => DirectiveValue::Flag(false),
            Some(v) => DirectiveValue::Text(v.to_string()),
        };
        options.insert(name, value);
    }
    options
}
