use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use kestrel_client::fetcher::DEFAULT_USER_AGENT;
use kestrel_client::{CsvSink, DirSnapshotSink, ListingEngine, ReqwestFetcher, sites};
use kestrel_core::throttle::{ThrottleConfig, ThrottledFetcher};
use kestrel_core::util::{default_output_path, filtered_path};
use kestrel_core::{
    Fetcher, ItemCap, ListingExtractor, ProductRecord, RecordSink, RunConfig, ScrapeService,
    SiteProfile, filter_records,
};

#[derive(Parser)]
#[command(name = "kestrel", version, about = "E-commerce search listing scraper")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Which storefront profile to extract with.
#[derive(Args)]
struct SiteArgs {
    /// Built-in site profile (daraz, amazon)
    #[arg(long, env = "KESTREL_SITE", default_value = "daraz")]
    site: String,

    /// JSON profile file; overrides --site
    #[arg(long)]
    profile: Option<PathBuf>,
}

/// Item cap, filter thresholds, and output files.
#[derive(Args)]
struct OutputArgs {
    /// Maximum products per query [env: KESTREL_MAX_ITEMS, default 40]
    #[arg(short = 'n', long)]
    max_items: Option<usize>,

    /// Filtered file keeps products sold more than this [env: KESTREL_MIN_SOLD, default 1]
    #[arg(long)]
    min_sold: Option<u64>,

    /// Filtered file keeps products rated above this [env: KESTREL_MIN_RATING, default 1.0]
    #[arg(long)]
    min_rating: Option<f32>,

    /// Output CSV path (defaults to <site>_products_<timestamp>.csv)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Skip writing the _filtered companion file
    #[arg(long, default_value_t = false)]
    no_filtered: bool,

    /// Print records as JSON to stdout instead of a summary
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch search results for one or more queries and write them to CSV
    Scrape {
        /// Search query (repeat for several)
        #[arg(short, long = "query", required = true)]
        queries: Vec<String>,

        #[command(flatten)]
        site: SiteArgs,

        #[command(flatten)]
        output: OutputArgs,

        /// Queries fetched at once [env: KESTREL_CONCURRENCY, default 1]
        #[arg(long)]
        concurrency: Option<usize>,

        /// Minimum delay between searches on the same site, in milliseconds;
        /// up to the same amount again is added as jitter [env: KESTREL_THROTTLE_MS]
        #[arg(long)]
        throttle_ms: Option<u64>,

        /// Refetches after a timeout or 5xx/429 response [env: KESTREL_RETRIES, default 2]
        #[arg(long)]
        retries: Option<u32>,

        /// User-Agent sent with HTTP requests
        #[arg(long, env = "KESTREL_USER_AGENT", default_value = DEFAULT_USER_AGENT)]
        user_agent: String,

        /// Save every fetched page under this directory
        #[arg(long)]
        snapshot_dir: Option<PathBuf>,

        /// Render pages in headless Chromium (requires the `browser` feature)
        #[arg(long, default_value_t = false)]
        browser: bool,

        /// Scroll passes before reading a rendered page
        #[arg(long, default_value_t = 5)]
        scroll_passes: u32,
    },

    /// Extract products from a saved search-results page
    Extract {
        /// Saved HTML file
        #[arg(long)]
        html: PathBuf,

        /// Query the page was produced by
        #[arg(short, long)]
        query: String,

        #[command(flatten)]
        site: SiteArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// List built-in site profiles, or print one as editable JSON
    Profiles {
        /// Profile to print
        #[arg(long)]
        show: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("kestrel=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Scrape {
            queries,
            site,
            output,
            concurrency,
            throttle_ms,
            retries,
            user_agent,
            snapshot_dir,
            browser,
            scroll_passes,
        } => {
            let mut config = run_config(&output)?;
            if let Some(n) = concurrency {
                config.concurrency = n;
            }
            if let Some(ms) = throttle_ms {
                config.throttle = Duration::from_millis(ms);
            }
            if let Some(n) = retries {
                config.retry.max_retries = n;
            }
            config.validate()?;

            let (profile, engine) = load_engine(&site)?;
            let plan = ScrapePlan {
                queries: &queries,
                profile: &profile,
                engine,
                config: &config,
                snapshot_dir: snapshot_dir.as_deref(),
                output: &output,
            };

            if browser {
                cmd_scrape_browser(plan, scroll_passes).await?;
            } else {
                let fetcher = ReqwestFetcher::with_options(Duration::from_secs(30), &user_agent)
                    .context("Failed to create HTTP client")?;
                cmd_scrape(fetcher, plan).await?;
            }
        }
        Commands::Extract {
            html,
            query,
            site,
            output,
        } => {
            let config = run_config(&output)?;
            let (profile, engine) = load_engine(&site)?;
            cmd_extract(&html, &query, &profile, &engine, &config, &output)?;
        }
        Commands::Profiles { show } => cmd_profiles(show.as_deref())?,
    }

    Ok(())
}

/// Environment configuration with CLI overrides applied.
fn run_config(output: &OutputArgs) -> Result<RunConfig> {
    let mut config = RunConfig::from_env()?;
    if let Some(n) = output.max_items {
        config.max_items = ItemCap::new(n)?;
    }
    if let Some(min_sold) = output.min_sold {
        config.thresholds.min_sold = min_sold;
    }
    if let Some(min_rating) = output.min_rating {
        config.thresholds.min_rating = min_rating;
    }
    config.validate()?;
    Ok(config)
}

fn load_engine(args: &SiteArgs) -> Result<(SiteProfile, ListingEngine)> {
    let profile = match &args.profile {
        Some(path) => SiteProfile::from_json_file(path)?,
        None => sites::builtin(&args.site)?,
    };
    let engine = ListingEngine::new(&profile)?;
    Ok((profile, engine))
}

struct ScrapePlan<'a> {
    queries: &'a [String],
    profile: &'a SiteProfile,
    engine: ListingEngine,
    config: &'a RunConfig,
    snapshot_dir: Option<&'a Path>,
    output: &'a OutputArgs,
}

#[cfg(feature = "browser")]
async fn cmd_scrape_browser(plan: ScrapePlan<'_>, scroll_passes: u32) -> Result<()> {
    use kestrel_client::{BrowserFetcher, BrowserOptions};

    let options = BrowserOptions {
        scroll_passes,
        ..Default::default()
    };
    let fetcher = BrowserFetcher::with_options(options).await?;
    cmd_scrape(fetcher, plan).await
}

#[cfg(not(feature = "browser"))]
async fn cmd_scrape_browser(_plan: ScrapePlan<'_>, _scroll_passes: u32) -> Result<()> {
    anyhow::bail!("--browser requires kestrel to be built with `--features browser`")
}

async fn cmd_scrape<F: Fetcher>(fetcher: F, plan: ScrapePlan<'_>) -> Result<()> {
    let config = plan.config;
    let throttle = ThrottleConfig::new(config.throttle).with_jitter(config.throttle);
    let fetcher = ThrottledFetcher::new(fetcher, throttle);

    let mut service = ScrapeService::new(fetcher, plan.engine, config.max_items)
        .with_concurrency(config.concurrency)
        .with_retry(config.retry);
    if let Some(dir) = plan.snapshot_dir {
        let sink = DirSnapshotSink::new(dir, &plan.profile.name)?;
        service = service.with_snapshots(Arc::new(sink));
    }

    tracing::info!(
        site = %plan.profile.name,
        queries = plan.queries.len(),
        max_items = config.max_items.get(),
        "Starting scrape"
    );
    let summary = service.scrape_all(plan.queries).await;

    for (query, error) in &summary.failed_queries {
        tracing::warn!(%query, "Failed: {error}");
    }
    tracing::info!(
        "Total products scraped: {} ({} of {} queries succeeded)",
        summary.total_records(),
        summary.reports.len(),
        plan.queries.len()
    );

    write_outputs(&summary.records(), plan.profile, config, plan.output)
}

fn cmd_extract(
    html_path: &Path,
    query: &str,
    profile: &SiteProfile,
    engine: &ListingEngine,
    config: &RunConfig,
    output: &OutputArgs,
) -> Result<()> {
    let html = std::fs::read_to_string(html_path)
        .with_context(|| format!("Failed to read HTML file: {}", html_path.display()))?;

    let report = engine.extract(&html, query, config.max_items.get());
    tracing::info!(
        containers = report.containers_found,
        duplicates = report.duplicates_removed,
        skipped = report.skipped,
        "Extracted {} products from {}",
        report.records.len(),
        html_path.display()
    );

    write_outputs(&report.records, profile, config, output)
}

fn cmd_profiles(show: Option<&str>) -> Result<()> {
    match show {
        Some(name) => {
            let profile = sites::builtin(name)?;
            println!("{}", serde_json::to_string_pretty(&profile)?);
        }
        None => {
            for name in sites::BUILTIN_SITES {
                let profile = sites::builtin(name)?;
                println!("{:<8} {}", profile.name, profile.base_url);
            }
        }
    }
    Ok(())
}

/// Write the full record list and its filtered companion, then report.
fn write_outputs(
    records: &[ProductRecord],
    profile: &SiteProfile,
    config: &RunConfig,
    output: &OutputArgs,
) -> Result<()> {
    if records.is_empty() {
        tracing::warn!("No products to save");
        return Ok(());
    }

    let path = output
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&profile.name, chrono::Utc::now()));
    CsvSink::new(&path).write(records)?;

    let filtered = filter_records(records, &config.thresholds);
    if !output.no_filtered {
        if filtered.is_empty() {
            tracing::info!(
                "No products with sold > {} and rating > {}; filtered file not written",
                config.thresholds.min_sold,
                config.thresholds.min_rating
            );
        } else {
            CsvSink::new(filtered_path(&path)).write(&filtered)?;
        }
    }

    if output.json {
        println!("{}", serde_json::to_string_pretty(records)?);
        return Ok(());
    }

    print_summary("ALL PRODUCTS", records);
    if !output.no_filtered && !filtered.is_empty() {
        print_summary(
            &format!(
                "FILTERED PRODUCTS (sold > {} and rating > {})",
                config.thresholds.min_sold, config.thresholds.min_rating
            ),
            &filtered,
        );
    }
    Ok(())
}

fn print_summary(heading: &str, records: &[ProductRecord]) {
    const SHOWN: usize = 10;

    println!("\n{heading}: {} products", records.len());
    for record in records.iter().take(SHOWN) {
        let title: String = record.title.chars().take(70).collect();
        println!("\n  #{} {} [{}]", record.rank, title, record.query);
        println!(
            "     Price: {} | Rating: {}/5 ({} reviews)",
            record.price,
            record.rating_label(),
            record.review_count
        );
        println!(
            "     Sold: {} | Location: {}",
            record.sold_count, record.location
        );
    }
    if records.len() > SHOWN {
        println!("\n  ... and {} more", records.len() - SHOWN);
    }
}
