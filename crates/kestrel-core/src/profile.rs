//! Site extraction profiles.
//!
//! A [`SiteProfile`] is plain data: the container selectors, one fallback
//! chain per field, the rating rule, and the count phrasing patterns for one
//! storefront. The HTML engine compiles it once and evaluates it against
//! every container on the page. Profiles round-trip through JSON so a user
//! can adjust selectors or locale phrasing without rebuilding.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// How a value is read from a matched node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Accessor {
    /// Trimmed inner text.
    Text,
    /// Trimmed attribute value.
    Attr(String),
    /// Attribute value when present and non-empty, else trimmed inner text.
    AttrOrText(String),
}

/// One (selector, accessor) step of a fallback chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRule {
    /// CSS selector relative to the container. `None` reads the container itself.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
    pub accessor: Accessor,
}

impl FieldRule {
    pub fn new(selector: &str, accessor: Accessor) -> Self {
        Self {
            selector: Some(selector.to_string()),
            accessor,
        }
    }

    /// A rule reading the container node itself.
    pub fn on_container(accessor: Accessor) -> Self {
        Self {
            selector: None,
            accessor,
        }
    }
}

/// Ordered rules tried left to right; the first non-empty value wins.
pub type FieldChain = Vec<FieldRule>;

/// Fallback chains for every text-derived field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChains {
    pub title: FieldChain,
    pub price: FieldChain,
    pub sold_count: FieldChain,
    pub review_count: FieldChain,
    pub location: FieldChain,
    pub url: FieldChain,
    pub identifier: FieldChain,
}

/// How the star rating is derived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RatingRule {
    /// Count filled and half-filled star icons inside the first matching
    /// rating container.
    Stars {
        containers: Vec<String>,
        filled: String,
        half: String,
    },
    /// Read a number from text (e.g. "4.5 out of 5 stars"); the first
    /// capture group of `pattern` is the value.
    Text { chain: FieldChain, pattern: String },
}

fn default_min_title_len() -> usize {
    5
}

/// Everything the engine needs to know about one storefront.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteProfile {
    pub name: String,
    /// Absolute base used to resolve relative product links.
    pub base_url: String,
    /// Search page template; `{query}` is replaced by the encoded query.
    pub search_url: String,
    /// Container selectors, most specific first.
    pub containers: Vec<String>,
    pub fields: FieldChains,
    pub rating: RatingRule,
    /// First capture group is the sold count, e.g. `(\d+)\s*sold`.
    pub sold_pattern: String,
    /// First capture group is the review count, e.g. `\((\d+)\)`.
    pub review_pattern: String,
    /// Applied to the product link when the identifier chain finds nothing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier_link_pattern: Option<String>,
    #[serde(default = "default_min_title_len")]
    pub min_title_len: usize,
}

impl SiteProfile {
    /// Load a profile from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self, AppError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AppError::ProfileError(format!("Failed to read profile {}: {e}", path.display()))
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, AppError> {
        let profile: SiteProfile = serde_json::from_str(raw)?;
        if profile.containers.is_empty() {
            return Err(AppError::ProfileError(format!(
                "Profile '{}' has no container selectors",
                profile.name
            )));
        }
        Ok(profile)
    }
}

/// Substitute the form-encoded query into a `{query}` template.
pub fn render_search_url(template: &str, query: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(query.as_bytes()).collect();
    template.replace("{query}", &encoded)
}
