use crate::models::ProductRecord;

/// Exclusive lower bounds a record must beat to survive filtering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterThresholds {
    /// Keep only records with `sold_count > min_sold`.
    pub min_sold: u64,
    /// Keep only records with a resolved rating `> min_rating`.
    pub min_rating: f32,
}

impl Default for FilterThresholds {
    /// Sold more than one, rated above one star.
    fn default() -> Self {
        Self {
            min_sold: 1,
            min_rating: 1.0,
        }
    }
}

impl FilterThresholds {
    /// Whether a single record clears both thresholds.
    ///
    /// An unresolved rating never passes.
    pub fn accepts(&self, record: &ProductRecord) -> bool {
        let Some(rating) = record.rating else {
            return false;
        };
        record.sold_count > self.min_sold && rating.value() > self.min_rating
    }
}

/// Order-preserving subsequence of `records` that clears `thresholds`.
///
/// Records are copied unchanged; ranks keep their original values.
pub fn filter_records(
    records: &[ProductRecord],
    thresholds: &FilterThresholds,
) -> Vec<ProductRecord> {
    records
        .iter()
        .filter(|r| thresholds.accepts(r))
        .cloned()
        .collect()
}
