pub mod config;
pub mod error;
pub mod filter;
pub mod models;
pub mod profile;
pub mod scrape;
pub mod throttle;
pub mod traits;
pub mod util;

#[cfg(test)]
pub(crate) mod testutil;

pub use config::{ItemCap, RetryPolicy, RunConfig};
pub use error::AppError;
pub use filter::{FilterThresholds, filter_records};
pub use models::{ExtractionReport, NOT_AVAILABLE, ProductRecord, Rating, RunSummary};
pub use profile::SiteProfile;
pub use scrape::ScrapeService;
pub use traits::{Fetcher, ListingExtractor, RecordSink, SnapshotSink};
