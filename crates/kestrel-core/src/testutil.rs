//! Test utilities: mock implementations of the core traits.
//!
//! Handwritten mocks for dependency injection in unit tests.
//! All mocks use `Arc<Mutex<_>>` for interior mutability, allowing
//! test assertions on recorded calls.

use std::sync::{Arc, Mutex};

use chrono::Utc;

use crate::error::AppError;
use crate::models::{ExtractionReport, NOT_AVAILABLE, ProductRecord, Rating};
use crate::traits::{Fetcher, ListingExtractor, SnapshotSink};

// ---------------------------------------------------------------------------
// MockFetcher
// ---------------------------------------------------------------------------

/// Mock fetcher that returns configurable responses and records requested URLs.
#[derive(Clone)]
pub struct MockFetcher {
    /// Queue of responses. Each call pops the first element.
    /// If empty, returns a default HTML string.
    responses: Arc<Mutex<Vec<Result<String, AppError>>>>,
    pub requested: Arc<Mutex<Vec<String>>>,
}

impl MockFetcher {
    pub fn new(html: &str) -> Self {
        Self::with_responses(vec![Ok(html.to_string())])
    }

    pub fn with_error(error: AppError) -> Self {
        Self::with_responses(vec![Err(error)])
    }

    pub fn with_responses(responses: Vec<Result<String, AppError>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            requested: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl Fetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<String, AppError> {
        self.requested.lock().unwrap().push(url.to_string());
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok("<html><body>default</body></html>".to_string())
        } else {
            responses.remove(0)
        }
    }
}

// ---------------------------------------------------------------------------
// MockExtractor
// ---------------------------------------------------------------------------

/// Mock extractor that returns a fixed record list for every document.
///
/// Records are truncated to the requested cap and stamped with the query.
#[derive(Clone)]
pub struct MockExtractor {
    records: Arc<Vec<ProductRecord>>,
    /// (html, max_items) per call.
    pub calls: Arc<Mutex<Vec<(String, usize)>>>,
}

impl MockExtractor {
    pub fn new(records: Vec<ProductRecord>) -> Self {
        Self {
            records: Arc::new(records),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl ListingExtractor for MockExtractor {
    fn search_url(&self, query: &str) -> String {
        format!("https://shop.example/search?q={query}")
    }

    fn extract(&self, html: &str, query: &str, max_items: usize) -> ExtractionReport {
        self.calls
            .lock()
            .unwrap()
            .push((html.to_string(), max_items));

        let records = self
            .records
            .iter()
            .take(max_items)
            .cloned()
            .map(|mut r| {
                r.query = query.to_string();
                r
            })
            .collect::<Vec<_>>();

        ExtractionReport {
            query: query.to_string(),
            containers_found: self.records.len(),
            matched_selector: Some("div.mock".to_string()),
            records,
            ..Default::default()
        }
    }
}

// ---------------------------------------------------------------------------
// MockSnapshotSink
// ---------------------------------------------------------------------------

/// Mock snapshot sink that records (query, html) pairs.
#[derive(Default)]
pub struct MockSnapshotSink {
    pub saved: Arc<Mutex<Vec<(String, String)>>>,
    fail: bool,
}

impl MockSnapshotSink {
    /// A sink whose every save fails.
    pub fn failing() -> Self {
        Self {
            saved: Arc::new(Mutex::new(Vec::new())),
            fail: true,
        }
    }
}

impl SnapshotSink for MockSnapshotSink {
    fn save(&self, query: &str, html: &str) -> Result<(), AppError> {
        if self.fail {
            return Err(AppError::SinkError("snapshot directory is read-only".into()));
        }
        self.saved
            .lock()
            .unwrap()
            .push((query.to_string(), html.to_string()));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

/// Create a plausible record with the given rank.
pub fn make_test_record(rank: usize) -> ProductRecord {
    ProductRecord {
        rank,
        query: "smart tv".to_string(),
        identifier: Some(format!("{}", 100 + rank)),
        title: format!("Test Product {rank}"),
        price: "Rs. 59,990".to_string(),
        rating: Rating::from_markers(4, 1),
        review_count: 18,
        sold_count: 55,
        location: NOT_AVAILABLE.to_string(),
        url: format!("https://shop.example/products/item-{rank}.html"),
        captured_at: Utc::now(),
    }
}
