use std::sync::Arc;

use futures::stream::{self, StreamExt};

use crate::config::{ItemCap, RetryPolicy};
use crate::error::AppError;
use crate::models::{ExtractionReport, RunSummary};
use crate::traits::{Fetcher, ListingExtractor, SnapshotSink};

/// Orchestrates the per-query pipeline: search URL → fetch → snapshot → extract.
///
/// Generic over the fetcher and extractor so the pipeline can be tested
/// without a network or real markup.
pub struct ScrapeService<F, X>
where
    F: Fetcher,
    X: ListingExtractor,
{
    fetcher: F,
    extractor: X,
    max_items: ItemCap,
    concurrency: usize,
    retry: RetryPolicy,
    snapshots: Option<Arc<dyn SnapshotSink>>,
}

impl<F, X> ScrapeService<F, X>
where
    F: Fetcher,
    X: ListingExtractor,
{
    pub fn new(fetcher: F, extractor: X, max_items: ItemCap) -> Self {
        Self {
            fetcher,
            extractor,
            max_items,
            concurrency: 1,
            retry: RetryPolicy::NONE,
            snapshots: None,
        }
    }

    /// Run up to `concurrency` queries at once. Values below 1 are raised to 1.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Refetch a page after a retryable error, up to `policy.max_retries` times.
    pub fn with_retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    /// Hand every fetched page to `sink` before extraction.
    pub fn with_snapshots(mut self, sink: Arc<dyn SnapshotSink>) -> Self {
        self.snapshots = Some(sink);
        self
    }

    /// Fetch and extract the search results for one query.
    pub async fn scrape(&self, query: &str) -> Result<ExtractionReport, AppError> {
        let url = self.extractor.search_url(query);
        tracing::info!(%query, "Fetching {}", url);
        let html = self.fetch_with_retry(query, &url).await?;
        tracing::info!(%query, "Fetched {} bytes of HTML", html.len());

        if let Some(sink) = &self.snapshots {
            if let Err(e) = sink.save(query, &html) {
                tracing::warn!(%query, error = %e, "Failed to save page snapshot");
            }
        }

        let report = self.extractor.extract(&html, query, self.max_items.get());
        tracing::info!(
            %query,
            containers = report.containers_found,
            duplicates = report.duplicates_removed,
            skipped = report.skipped,
            records = report.records.len(),
            "Extraction complete"
        );
        Ok(report)
    }

    async fn fetch_with_retry(&self, query: &str, url: &str) -> Result<String, AppError> {
        let mut attempt = 0;
        loop {
            match self.fetcher.fetch(url).await {
                Ok(html) => return Ok(html),
                Err(e) if e.is_retryable() && attempt < self.retry.max_retries => {
                    attempt += 1;
                    let delay = self.retry.delay_for_attempt(attempt);
                    tracing::warn!(
                        %query,
                        attempt,
                        error = %e,
                        "Fetch failed, retrying in {}ms",
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Scrape every query, keeping the input order in the summary.
    ///
    /// A query whose page cannot be fetched is recorded in
    /// [`RunSummary::failed_queries`]; the remaining queries still run.
    pub async fn scrape_all(&self, queries: &[String]) -> RunSummary {
        let outcomes: Vec<_> = stream::iter(queries)
            .map(|query| async move { (query, self.scrape(query).await) })
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut summary = RunSummary::default();
        for (query, outcome) in outcomes {
            match outcome {
                Ok(report) => summary.reports.push(report),
                Err(e) => {
                    tracing::warn!(%query, error = %e, "Query failed");
                    summary.failed_queries.push((query.clone(), e.to_string()));
                }
            }
        }
        summary
    }
}
