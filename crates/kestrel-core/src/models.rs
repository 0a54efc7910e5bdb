use std::fmt;

use chrono::{DateTime, Utc};

/// Placeholder written for text fields that could not be resolved.
pub const NOT_AVAILABLE: &str = "N/A";

/// Star rating in half-star steps, always within `0.5..=5.0`.
///
/// A rating of zero is never constructed: both the star-marker count and
/// the text reading treat "no stars" as unresolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Rating(u8);

impl Rating {
    const MAX_HALF_STEPS: u8 = 10;

    /// Build a rating from counted star markers.
    ///
    /// `filled` full stars, plus half a star if any half marker is present.
    pub fn from_markers(filled: usize, half: usize) -> Option<Self> {
        let steps = filled.saturating_mul(2) + usize::from(half > 0);
        if steps == 0 {
            return None;
        }
        let steps = steps.min(Self::MAX_HALF_STEPS as usize) as u8;
        Some(Self(steps))
    }

    /// Build a rating from a numeric reading, snapped to the nearest half star.
    pub fn from_value(value: f32) -> Option<Self> {
        if !value.is_finite() || value <= 0.0 {
            return None;
        }
        let steps = (value * 2.0).round().min(Self::MAX_HALF_STEPS as f32) as u8;
        if steps == 0 {
            return None;
        }
        Some(Self(steps))
    }

    pub fn value(&self) -> f32 {
        f32::from(self.0) / 2.0
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 % 2 == 0 {
            write!(f, "{}", self.0 / 2)
        } else {
            write!(f, "{}.5", self.0 / 2)
        }
    }
}

impl serde::Serialize for Rating {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f32(self.value())
    }
}

/// One product extracted from a search-results page.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ProductRecord {
    /// 1-based position among the records of one extraction call.
    pub rank: usize,
    pub query: String,
    /// Site-native product ID; also the deduplication key.
    pub identifier: Option<String>,
    pub title: String,
    pub price: String,
    pub rating: Option<Rating>,
    pub review_count: u64,
    pub sold_count: u64,
    pub location: String,
    pub url: String,
    pub captured_at: DateTime<Utc>,
}

impl ProductRecord {
    /// Rating formatted for output: `4`, `4.5`, or `N/A`.
    pub fn rating_label(&self) -> String {
        self.rating
            .map(|r| r.to_string())
            .unwrap_or_else(|| NOT_AVAILABLE.to_string())
    }
}

/// Outcome of extracting one search-results document.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct ExtractionReport {
    pub query: String,
    pub records: Vec<ProductRecord>,
    /// Containers matched by the winning container selector.
    pub containers_found: usize,
    /// The container selector that produced the matches, if any did.
    pub matched_selector: Option<String>,
    pub duplicates_removed: usize,
    /// Containers dropped during field extraction or validation.
    pub skipped: usize,
}

/// Aggregated result of a multi-query run.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub reports: Vec<ExtractionReport>,
    /// (query, error message) for each query whose page could not be fetched.
    pub failed_queries: Vec<(String, String)>,
}

impl RunSummary {
    /// All records across queries, grouped by query in run order.
    pub fn records(&self) -> Vec<ProductRecord> {
        self.reports
            .iter()
            .flat_map(|r| r.records.iter().cloned())
            .collect()
    }

    pub fn total_records(&self) -> usize {
        self.reports.iter().map(|r| r.records.len()).sum()
    }
}
