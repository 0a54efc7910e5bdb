pub mod engine;
pub mod fetcher;
pub mod fields;
pub mod profile;
pub mod sink;
pub mod sites;
pub mod snapshot;

#[cfg(feature = "browser")]
pub mod browser_fetcher;

#[cfg(feature = "browser")]
pub use browser_fetcher::{BrowserFetcher, BrowserOptions};
pub use engine::ListingEngine;
pub use fetcher::ReqwestFetcher;
pub use profile::CompiledProfile;
pub use sink::CsvSink;
pub use snapshot::DirSnapshotSink;
