use std::path::{Path, PathBuf};

use kestrel_core::{AppError, ProductRecord, RecordSink};

/// Column order of every CSV file Kestrel writes.
pub const CSV_COLUMNS: [&str; 11] = [
    "rank",
    "query",
    "title",
    "price",
    "rating",
    "review_count",
    "sold_count",
    "location",
    "identifier",
    "url",
    "captured_at",
];

/// Writes records to a CSV file, replacing any previous content.
#[derive(Debug, Clone)]
pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn row(record: &ProductRecord) -> [String; 11] {
    [
        record.rank.to_string(),
        record.query.clone(),
        record.title.clone(),
        record.price.clone(),
        record.rating_label(),
        record.review_count.to_string(),
        record.sold_count.to_string(),
        record.location.clone(),
        record.identifier.clone().unwrap_or_default(),
        record.url.clone(),
        record.captured_at.format("%Y-%m-%d %H:%M:%S").to_string(),
    ]
}

impl RecordSink for CsvSink {
    fn write(&self, records: &[ProductRecord]) -> Result<(), AppError> {
        let sink_err = |e: csv::Error| {
            AppError::SinkError(format!("Failed to write {}: {e}", self.path.display()))
        };

        let mut writer = csv::Writer::from_path(&self.path).map_err(sink_err)?;
        writer.write_record(CSV_COLUMNS).map_err(sink_err)?;
        for record in records {
            writer.write_record(row(record)).map_err(sink_err)?;
        }
        writer.flush()?;

        tracing::info!(
            "Saved {} products to '{}'",
            records.len(),
            self.path.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use kestrel_core::{NOT_AVAILABLE, Rating};

    use super::*;

    fn record(
        rank: usize,
        title: &str,
        rating: Option<Rating>,
        identifier: Option<&str>,
    ) -> ProductRecord {
        ProductRecord {
            rank,
            query: "smart tv".into(),
            identifier: identifier.map(String::from),
            title: title.into(),
            price: "Rs. 59,990".into(),
            rating,
            review_count: 18,
            sold_count: 55,
            location: NOT_AVAILABLE.into(),
            url: "https://www.daraz.com.np/products/tv-i1.html".into(),
            captured_at: Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap(),
        }
    }

    #[test]
    fn writes_header_and_rows_in_column_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let sink = CsvSink::new(&path);

        sink.write(&[
            record(1, "Samsung, 43\" TV", Rating::from_markers(4, 1), Some("1001")),
            record(2, "LG Smart TV", None, None),
        ])
        .unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers: Vec<_> = reader.headers().unwrap().iter().map(String::from).collect();
        assert_eq!(headers, CSV_COLUMNS);

        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[0].iter().collect::<Vec<_>>(),
            vec![
                "1",
                "smart tv",
                "Samsung, 43\" TV",
                "Rs. 59,990",
                "4.5",
                "18",
                "55",
                "N/A",
                "1001",
                "https://www.daraz.com.np/products/tv-i1.html",
                "2026-01-02 03:04:05",
            ]
        );
        assert_eq!(&rows[1][4], "N/A");
        assert_eq!(&rows[1][8], "");
    }

    #[test]
    fn empty_batch_writes_header_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        CsvSink::new(&path).write(&[]).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.trim_end(), CSV_COLUMNS.join(","));
    }

    #[test]
    fn unwritable_path_is_sink_error() {
        let err = CsvSink::new("/nonexistent-dir/out.csv").write(&[]).unwrap_err();
        assert!(matches!(err, AppError::SinkError(_)));
    }
}
