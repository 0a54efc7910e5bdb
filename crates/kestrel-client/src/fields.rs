//! Per-container field extraction.
//!
//! Every field resolves through its profile chain and then a small
//! field-specific post-processing step. Nothing here returns an error for
//! missing optional fields; they fall back to their sentinels. Only the
//! title can invalidate a container.

use kestrel_core::{NOT_AVAILABLE, Rating};
use regex::Regex;
use scraper::ElementRef;
use thiserror::Error;

use crate::profile::{CompiledProfile, CompiledRating};

/// Why a container produced no record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContainerError {
    #[error("no title found")]
    MissingTitle,

    #[error("title '{title}' shorter than {min} characters")]
    TitleTooShort { title: String, min: usize },
}

/// The fields of one product before rank, query, and timestamp are attached.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductFields {
    pub title: String,
    pub price: String,
    pub rating: Option<Rating>,
    pub review_count: u64,
    pub sold_count: u64,
    pub location: String,
    pub url: String,
}

/// Extract every field of one container.
pub fn extract_fields(
    container: ElementRef<'_>,
    profile: &CompiledProfile,
) -> Result<ProductFields, ContainerError> {
    let title = profile
        .title
        .resolve(container)
        .ok_or(ContainerError::MissingTitle)?;
    if title.chars().count() < profile.min_title_len {
        return Err(ContainerError::TitleTooShort {
            title,
            min: profile.min_title_len,
        });
    }

    let price = profile
        .price
        .resolve(container)
        .unwrap_or_else(|| NOT_AVAILABLE.to_string());

    let sold_count = profile
        .sold_count
        .resolve(container)
        .map(|text| parse_count(&text, &profile.sold_pattern))
        .unwrap_or(0);

    let review_count = profile
        .review_count
        .resolve(container)
        .map(|text| parse_count(&text, &profile.review_pattern))
        .unwrap_or(0);

    let location = profile
        .location
        .resolve(container)
        .unwrap_or_else(|| NOT_AVAILABLE.to_string());

    let url = profile
        .url
        .resolve(container)
        .map(|href| normalize_url(&href, &profile.base_url))
        .unwrap_or_default();

    Ok(ProductFields {
        title,
        price,
        rating: derive_rating(container, &profile.rating),
        review_count,
        sold_count,
        location,
        url,
    })
}

/// Site-native identifier of a container.
///
/// Reads the identifier chain first; failing that, searches the raw
/// product link with the profile's identifier link pattern.
pub fn extract_identifier(container: ElementRef<'_>, profile: &CompiledProfile) -> Option<String> {
    if let Some(id) = profile.identifier.resolve(container) {
        return Some(id);
    }
    let pattern = profile.identifier_link_pattern.as_ref()?;
    let href = profile.url.resolve(container)?;
    pattern
        .captures(&href)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|id| !id.is_empty())
}

/// First capture group of `pattern` as a count, `0` when the phrasing
/// does not match. Separators inside the group (`1,234`) are ignored.
///
/// An optional second group holds a magnitude suffix (`k`, `m`), so
/// "2K+ bought" counts as 2000 and "1.5k sold" as 1500.
pub fn parse_count(text: &str, pattern: &Regex) -> u64 {
    let Some(caps) = pattern.captures(text) else {
        return 0;
    };
    let Some(number) = caps.get(1).map(|m| m.as_str()) else {
        return 0;
    };

    match caps.get(2).and_then(|m| magnitude(m.as_str())) {
        Some(scale) => number
            .replace(',', "")
            .parse::<f64>()
            .map(|n| (n * scale as f64).round() as u64)
            .unwrap_or(0),
        None => number
            .chars()
            .filter(char::is_ascii_digit)
            .collect::<String>()
            .parse()
            .unwrap_or(0),
    }
}

fn magnitude(suffix: &str) -> Option<u64> {
    match suffix.to_ascii_lowercase().as_str() {
        "k" => Some(1_000),
        "m" => Some(1_000_000),
        _ => None,
    }
}

fn derive_rating(container: ElementRef<'_>, rule: &CompiledRating) -> Option<Rating> {
    match rule {
        CompiledRating::Stars {
            containers,
            filled,
            half,
        } => {
            let stars = containers
                .iter()
                .find_map(|selector| container.select(selector).next())?;
            Rating::from_markers(stars.select(filled).count(), stars.select(half).count())
        }
        CompiledRating::Text { chain, pattern } => {
            let text = chain.resolve(container)?;
            let value = pattern.captures(&text)?.get(1)?.as_str().parse::<f32>().ok()?;
            Rating::from_value(value)
        }
    }
}

/// Resolve a product link against the site base.
///
/// - `//host/path` gains an `https:` scheme
/// - `/path` is appended to `base`
/// - `http://` / `https://` links pass through
/// - anything else is treated as a path segment under `base`
pub fn normalize_url(href: &str, base: &str) -> String {
    let href = href.trim();
    let base = base.trim_end_matches('/');
    if href.is_empty() {
        String::new()
    } else if href.starts_with("//") {
        format!("https:{href}")
    } else if href.starts_with('/') {
        format!("{base}{href}")
    } else if href.starts_with("http://") || href.starts_with("https://") {
        href.to_string()
    } else {
        format!("{base}/{href}")
    }
}
