use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

/// Default output file for a run: `<site>_products_<YYYYmmdd_HHMMSS>.csv`.
pub fn default_output_path(site: &str, now: DateTime<Utc>) -> PathBuf {
    PathBuf::from(format!("{site}_products_{}.csv", now.format("%Y%m%d_%H%M%S")))
}

/// Companion path for the filtered records.
///
/// Inserts `_filtered` before the extension.
/// Example: `"out/tv.csv"` → `"out/tv_filtered.csv"`
pub fn filtered_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("products");
    let name = match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{stem}_filtered.{ext}"),
        None => format!("{stem}_filtered"),
    };
    path.with_file_name(name)
}

/// Make a query safe for use in a file name: `"lg smart/tv"` → `"lg_smart_tv"`.
pub fn query_slug(query: &str) -> String {
    let slug: String = query
        .trim()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect();
    if slug.is_empty() {
        "query".to_string()
    } else {
        slug
    }
}
