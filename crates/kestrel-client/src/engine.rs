use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use kestrel_core::{AppError, ExtractionReport, ListingExtractor, ProductRecord, SiteProfile};
use scraper::{ElementRef, Html};

use crate::fields::{extract_fields, extract_identifier};
use crate::profile::CompiledProfile;
use crate::sites;

/// Profile-driven listing extractor.
///
/// One engine serves any storefront; everything site-specific lives in the
/// [`SiteProfile`] it was built from. Cloning is cheap.
#[derive(Clone)]
pub struct ListingEngine {
    profile: Arc<CompiledProfile>,
}

impl ListingEngine {
    pub fn new(profile: &SiteProfile) -> Result<Self, AppError> {
        Ok(Self {
            profile: Arc::new(CompiledProfile::compile(profile)?),
        })
    }

    /// Engine for one of the [`sites::BUILTIN_SITES`].
    pub fn builtin(name: &str) -> Result<Self, AppError> {
        Self::new(&sites::builtin(name)?)
    }

    pub fn profile(&self) -> &CompiledProfile {
        &self.profile
    }

    /// Containers matched by the first container selector with any match.
    ///
    /// Later selectors are never consulted once one matches, so a broad
    /// fallback cannot double-count blocks a narrow selector already found.
    fn discover<'a>(&self, document: &'a Html) -> Option<(&str, Vec<ElementRef<'a>>)> {
        self.profile.containers.iter().find_map(|(source, selector)| {
            let found: Vec<_> = document.select(selector).collect();
            (!found.is_empty()).then_some((source.as_str(), found))
        })
    }
}

/// Keep the first item for each key, in order. Unkeyed items are always kept.
pub fn dedup_keyed<T>(items: Vec<(T, Option<String>)>) -> Vec<(T, Option<String>)> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|(_, key)| match key {
            Some(k) => seen.insert(k.clone()),
            None => true,
        })
        .collect()
}

impl ListingExtractor for ListingEngine {
    fn search_url(&self, query: &str) -> String {
        self.profile.search_url_for(query)
    }

    fn extract(&self, html: &str, query: &str, max_items: usize) -> ExtractionReport {
        let mut report = ExtractionReport {
            query: query.to_string(),
            ..Default::default()
        };

        let document = Html::parse_document(html);
        let Some((selector, containers)) = self.discover(&document) else {
            tracing::info!(%query, site = %self.profile.name, "No product containers found");
            return report;
        };
        report.containers_found = containers.len();
        report.matched_selector = Some(selector.to_string());
        tracing::debug!(%query, selector, count = containers.len(), "Matched containers");

        let keyed = containers
            .into_iter()
            .map(|c| {
                let id = extract_identifier(c, &self.profile);
                (c, id)
            })
            .collect();
        let unique = dedup_keyed(keyed);
        report.duplicates_removed = report.containers_found - unique.len();

        let captured_at = Utc::now();
        for (position, (container, identifier)) in unique.into_iter().enumerate() {
            if report.records.len() >= max_items {
                break;
            }
            match extract_fields(container, &self.profile) {
                Ok(fields) => {
                    let rank = report.records.len() + 1;
                    tracing::debug!(rank, title = %fields.title, "Extracted product");
                    report.records.push(ProductRecord {
                        rank,
                        query: query.to_string(),
                        identifier,
                        title: fields.title,
                        price: fields.price,
                        rating: fields.rating,
                        review_count: fields.review_count,
                        sold_count: fields.sold_count,
                        location: fields.location,
                        url: fields.url,
                        captured_at,
                    });
                }
                Err(e) => {
                    report.skipped += 1;
                    tracing::debug!(container = position + 1, reason = %e, "Skipped container");
                }
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedup_keeps_first_occurrence_in_order() {
        let items = vec![
            ("a", Some("1".to_string())),
            ("b", Some("2".to_string())),
            ("c", Some("1".to_string())),
            ("d", None),
            ("e", None),
            ("f", Some("2".to_string())),
        ];
        let kept: Vec<_> = dedup_keyed(items).into_iter().map(|(v, _)| v).collect();
        assert_eq!(kept, vec!["a", "b", "d", "e"]);
    }

    #[test]
    fn dedup_is_idempotent() {
        let items = vec![
            (1, Some("x".to_string())),
            (2, None),
            (3, Some("x".to_string())),
            (4, Some("y".to_string())),
            (5, None),
        ];
        let once = dedup_keyed(items);
        let twice = dedup_keyed(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn builtin_engine_builds_search_url() {
        let engine = ListingEngine::builtin("amazon").unwrap();
        assert_eq!(engine.search_url("samsung tv"), "https://www.amazon.com/s?k=samsung+tv");
    }

    #[test]
    fn unknown_builtin_fails_before_extraction() {
        assert!(matches!(
            ListingEngine::builtin("nope"),
            Err(AppError::ProfileError(_))
        ));
    }
}
