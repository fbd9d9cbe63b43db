//! Listing page decoding
//!
//! Pulls the `__NEXT_DATA__` document out of a listing page and decodes the
//! posts it embeds. The document is matched against the known page shapes in
//! order; individual posts are decoded leniently so that one odd post never
//! fails a page.

use chrono::{DateTime, Utc};
use scraper::{Html, Selector};
use serde::Deserialize;
use serde_json::Value;

use crate::error::CrawlError;

/// Known `__NEXT_DATA__` layouts, tried in declaration order
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PageDocument {
    Direct { props: DirectProps },
    Nested { props: NestedProps },
}

#[derive(Debug, Deserialize)]
struct DirectProps {
    #[serde(rename = "pageProps")]
    page_props: PageProps,
}

#[derive(Debug, Deserialize)]
struct NestedProps {
    #[serde(rename = "initialProps")]
    initial_props: DirectProps,
}

#[derive(Debug, Deserialize)]
struct PageProps {
    #[serde(rename = "postList")]
    post_list: PostList,
}

#[derive(Debug, Deserialize)]
struct PostList {
    #[serde(default)]
    posts: Option<Vec<Value>>,
}

impl PageDocument {
    fn into_posts(self) -> Vec<Value> {
        let list = match self {
            PageDocument::Direct { props } => props.page_props.post_list,
            PageDocument::Nested { props } => props.initial_props.page_props.post_list,
        };
        list.posts.unwrap_or_default()
    }
}

/// Returns the posts embedded in a listing page, as raw JSON
pub(crate) fn extract_posts(url: &str, html: &str) -> Result<Vec<Value>, CrawlError> {
    let script = next_data_script(html).ok_or_else(|| CrawlError::MissingScript {
        url: url.to_string(),
    })?;

    let data: Value = serde_json::from_str(&script).map_err(|source| CrawlError::InvalidJson {
        url: url.to_string(),
        source,
    })?;

    let document: PageDocument =
        serde_json::from_value(data).map_err(|_| CrawlError::MissingPostList {
            url: url.to_string(),
        })?;

    Ok(document.into_posts())
}

fn next_data_script(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("script#__NEXT_DATA__").ok()?;
    document
        .select(&selector)
        .next()
        .map(|element| element.text().collect::<String>())
        .filter(|text| !text.trim().is_empty())
}

// =============================================================================
// Posts
// =============================================================================

/// The fields of a listing post the crawler looks at
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct ListingPost {
    pub id: Value,
    pub title: Option<String>,
    pub full_title: Option<String>,
    pub summary: Option<String>,
    pub excerpt: Option<String>,
    #[serde(rename = "publishedAt")]
    pub published_at: Option<String>,
    #[serde(rename = "published_at")]
    pub published_at_alt: Option<String>,
    pub tags: Option<Vec<ListingTag>>,
    pub url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct ListingTag {
    pub name: Option<String>,
}

impl ListingPost {
    /// Raw publication time text, `publishedAt` first
    pub fn published_text(&self) -> Option<&str> {
        first_non_empty([self.published_at.as_deref(), self.published_at_alt.as_deref()])
    }

    /// Publication time, `None` when absent or not RFC 3339
    pub fn published(&self) -> Option<DateTime<Utc>> {
        let text = self.published_text()?;
        DateTime::parse_from_rfc3339(text)
            .ok()
            .map(|time| time.with_timezone(&Utc))
    }

    pub fn external_id(&self) -> String {
        normalize_id(&self.id)
    }

    pub fn display_title(&self) -> String {
        first_non_empty([self.title.as_deref(), self.full_title.as_deref()])
            .unwrap_or_default()
            .to_string()
    }

    pub fn display_summary(&self) -> String {
        first_non_empty([
            self.summary.as_deref(),
            self.excerpt.as_deref(),
            self.full_title.as_deref(),
            self.title.as_deref(),
        ])
        .unwrap_or_default()
        .to_string()
    }

    pub fn tag_names(&self) -> impl Iterator<Item = &str> {
        self.tags
            .iter()
            .flatten()
            .filter_map(|tag| tag.name.as_deref())
    }

    /// Whether any tag name contains one of the lower-cased `markers`
    pub fn is_remote(&self, markers: &[String]) -> bool {
        self.tag_names().any(|name| {
            let name = name.to_lowercase();
            markers.iter().any(|marker| name.contains(marker.as_str()))
        })
    }
}

fn first_non_empty<'a, const N: usize>(candidates: [Option<&'a str>; N]) -> Option<&'a str> {
    candidates.into_iter().flatten().find(|value| !value.is_empty())
}

/// Renders a post id as text
///
/// Integers lose any decimal suffix, other numbers are rounded to a whole
/// number and `null` becomes the empty string.
pub(crate) fn normalize_id(id: &Value) -> String {
    match id {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Number(number) => {
            if let Some(int) = number.as_i64() {
                int.to_string()
            } else if let Some(uint) = number.as_u64() {
                uint.to_string()
            } else {
                format!("{:.0}", number.as_f64().unwrap_or_default())
            }
        }
        other => other.to_string(),
    }
}
