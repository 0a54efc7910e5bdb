/// Smoke-test for `BrowserFetcher` + `ListingEngine`.
///
/// Renders one Daraz search page in headless Chromium and prints the
/// first few extracted products.
///
/// Run with:
///   cargo run --example browser_smoke --features browser -- "samsung smart tv"
use kestrel_client::{BrowserFetcher, ListingEngine};
use kestrel_core::traits::{Fetcher, ListingExtractor};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let query = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "samsung smart tv".to_string());

    let engine = ListingEngine::builtin("daraz")?;
    let url = engine.search_url(&query);

    println!("Launching headless browser…");
    let fetcher = BrowserFetcher::new().await?;

    println!("Fetching {url} …");
    let html = fetcher.fetch(&url).await?;
    let report = engine.extract(&html, &query, 10);

    println!(
        "Containers: {} (selector: {}), duplicates: {}, skipped: {}",
        report.containers_found,
        report.matched_selector.as_deref().unwrap_or("none"),
        report.duplicates_removed,
        report.skipped
    );
    for record in &report.records {
        println!(
            "#{} {} | {} | ⭐ {} | sold {}",
            record.rank,
            record.title,
            record.price,
            record.rating_label(),
            record.sold_count
        );
    }
    Ok(())
}
