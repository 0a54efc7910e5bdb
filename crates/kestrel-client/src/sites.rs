//! Built-in storefront profiles.

use kestrel_core::AppError;
use kestrel_core::profile::{Accessor, FieldChains, FieldRule, RatingRule, SiteProfile};

/// Names accepted by [`builtin`].
pub const BUILTIN_SITES: &[&str] = &["daraz", "amazon"];

/// Look up a built-in profile by name (case-insensitive).
pub fn builtin(name: &str) -> Result<SiteProfile, AppError> {
    match name.to_ascii_lowercase().as_str() {
        "daraz" => Ok(daraz()),
        "amazon" => Ok(amazon()),
        other => Err(AppError::ProfileError(format!(
            "Unknown site '{other}' (expected one of: {})",
            BUILTIN_SITES.join(", ")
        ))),
    }
}

fn text(selector: &str) -> FieldRule {
    FieldRule::new(selector, Accessor::Text)
}

fn attr(selector: &str, name: &str) -> FieldRule {
    FieldRule::new(selector, Accessor::Attr(name.to_string()))
}

fn attr_or_text(selector: &str, name: &str) -> FieldRule {
    FieldRule::new(selector, Accessor::AttrOrText(name.to_string()))
}

/// Daraz Nepal search results.
///
/// Ratings are rendered as a row of star icons; a full star carries
/// `Dy1nx`, a half star `JhD+v`.
pub fn daraz() -> SiteProfile {
    SiteProfile {
        name: "daraz".to_string(),
        base_url: "https://www.daraz.com.np".to_string(),
        search_url: "https://www.daraz.com.np/catalog/?q={query}".to_string(),
        containers: vec![
            r#"div.Bm3ON[data-qa-locator="product-item"]"#.to_string(),
            r#"div[data-qa-locator="product-item"]"#.to_string(),
            "div.Bm3ON".to_string(),
        ],
        fields: FieldChains {
            title: vec![attr_or_text("div.RfADt a", "title"), attr("a[title]", "title")],
            price: vec![text("div.aBrP0 span.ooOxS"), text("span.ooOxS")],
            sold_count: vec![text("span._1cEkb span"), text("span._1cEkb")],
            review_count: vec![text("span.qzqFw")],
            location: vec![attr_or_text("span.oa6ri", "title")],
            url: vec![
                attr("div.RfADt a[href]", "href"),
                attr(r#"a[href*=".html"]"#, "href"),
            ],
            identifier: vec![FieldRule::on_container(Accessor::Attr(
                "data-item-id".to_string(),
            ))],
        },
        rating: RatingRule::Stars {
            containers: vec!["div.mdmmT._32vUv".to_string(), "div.mdmmT".to_string()],
            filled: "i._9-ogB.Dy1nx".to_string(),
            half: r"i._9-ogB.JhD\+v".to_string(),
        },
        sold_pattern: r"(?i)(\d[\d,.]*)\s*([km])?\+?\s*sold".to_string(),
        review_pattern: r"\((\d+)\)".to_string(),
        identifier_link_pattern: Some(r"-i(\d+)(?:-s\d+)?\.html".to_string()),
        min_title_len: 5,
    }
}

/// Amazon search results.
///
/// Amazon exposes the rating as icon alt text ("4.5 out of 5 stars") and
/// has no seller location on the results page.
pub fn amazon() -> SiteProfile {
    SiteProfile {
        name: "amazon".to_string(),
        base_url: "https://www.amazon.com".to_string(),
        search_url: "https://www.amazon.com/s?k={query}".to_string(),
        containers: vec![
            r#"div[data-component-type="s-search-result"][data-asin]"#.to_string(),
            "div.s-result-item[data-asin]".to_string(),
        ],
        fields: FieldChains {
            title: vec![
                attr_or_text("h2", "aria-label"),
                text("h2 a span"),
                text("span.a-text-normal"),
            ],
            price: vec![text("span.a-price span.a-offscreen"), text("span.a-price")],
            sold_count: vec![text("span.a-size-base.a-color-secondary")],
            review_count: vec![
                text("span.a-size-base.s-underline-text"),
                text(r#"a[href*="customerReviews"] span"#),
            ],
            location: vec![],
            url: vec![
                attr("h2 a[href]", "href"),
                attr("a.a-link-normal.s-no-outline[href]", "href"),
                attr(r#"a[href*="/dp/"]"#, "href"),
            ],
            identifier: vec![FieldRule::on_container(Accessor::Attr("data-asin".to_string()))],
        },
        rating: RatingRule::Text {
            chain: vec![text("span.a-icon-alt"), attr("i[aria-label]", "aria-label")],
            pattern: r"(\d+(?:\.\d+)?)\s+out of\s+5".to_string(),
        },
        sold_pattern: r"(?i)(\d[\d,.]*)\s*([km])?\+?\s*bought".to_string(),
        review_pattern: r"(\d[\d,]*)".to_string(),
        identifier_link_pattern: Some(r"/dp/([A-Z0-9]{10})".to_string()),
        min_title_len: 5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::CompiledProfile;

    #[test]
    fn every_builtin_compiles() {
        for name in BUILTIN_SITES {
            let profile = builtin(name).unwrap();
            assert_eq!(&profile.name, name);
            CompiledProfile::compile(&profile).unwrap();
        }
    }

    #[test]
    fn builtin_lookup_is_case_insensitive() {
        assert_eq!(builtin("Daraz").unwrap().name, "daraz");
    }

    #[test]
    fn unknown_site_is_profile_error() {
        let err = builtin("ebay").unwrap_err();
        assert!(matches!(err, AppError::ProfileError(_)));
        assert!(err.to_string().contains("daraz, amazon"));
    }

    #[test]
    fn builtins_survive_json_round_trip() {
        for name in BUILTIN_SITES {
            let profile = builtin(name).unwrap();
            let json = serde_json::to_string_pretty(&profile).unwrap();
            assert_eq!(SiteProfile::from_json(&json).unwrap(), profile);
        }
    }
}
