use std::future::Future;

use crate::error::AppError;
use crate::models::{ExtractionReport, ProductRecord};

/// Fetches a fully-rendered search-results page.
pub trait Fetcher: Send + Sync + Clone {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<String, AppError>> + Send;
}

/// Turns one search-results document into ranked product records.
///
/// Implementations are synchronous and pure over their input: no I/O,
/// no state carried between calls.
pub trait ListingExtractor: Send + Sync + Clone {
    /// URL of the search-results page for a query.
    fn search_url(&self, query: &str) -> String;

    /// Extract at most `max_items` records from `html` in document order.
    fn extract(&self, html: &str, query: &str, max_items: usize) -> ExtractionReport;
}

/// Writes a batch of records to an output artifact.
pub trait RecordSink {
    fn write(&self, records: &[ProductRecord]) -> Result<(), AppError>;
}

/// Receives the raw markup of each fetched page (debug snapshots).
pub trait SnapshotSink: Send + Sync {
    fn save(&self, query: &str, html: &str) -> Result<(), AppError>;
}
