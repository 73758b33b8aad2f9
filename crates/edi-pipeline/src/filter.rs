//! Watermark filtering of order batches

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::transport::OrderRecord;

/// How order identifiers are compared against the watermark
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdOrdering {
    /// Plain string comparison. Correct for zero-padded numeric identifiers,
    /// wrong for unpadded ones ("9" sorts after "10").
    #[default]
    Lexical,
    /// Identifiers made only of ASCII digits compare by numeric value;
    /// anything else falls back to string comparison.
    Numeric,
}

impl IdOrdering {
    pub fn compare(self, a: &str, b: &str) -> Ordering {
        match self {
            IdOrdering::Lexical => a.cmp(b),
            IdOrdering::Numeric => match (digits(a), digits(b)) {
                (Some(x), Some(y)) => x.len().cmp(&y.len()).then_with(|| x.cmp(y)),
                _ => a.cmp(b),
            },
        }
    }
}

/// Significant digits of an all-digit identifier, `None` otherwise
fn digits(id: &str) -> Option<&str> {
    if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let trimmed = id.trim_start_matches('0');
    Some(if trimmed.is_empty() { "0" } else { trimmed })
}

/// Outcome of filtering one batch
#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    /// Records strictly after the watermark, in input order
    pub new_records: Vec<OrderRecord>,
    /// Highest identifier seen, old watermark included
    pub new_watermark: String,
}

impl Partition {
    /// Whether the watermark moved past `previous`
    pub fn advanced(&self, previous: &str) -> bool {
        self.new_watermark != previous
    }
}

/// Splits order batches into already-seen and new records
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncFilter {
    ordering: IdOrdering,
}

impl SyncFilter {
    pub fn new(ordering: IdOrdering) -> Self {
        Self { ordering }
    }

    pub fn ordering(&self) -> IdOrdering {
        self.ordering
    }

    /// Partition `records` against `watermark`.
    ///
    /// Pure: the whole batch is scanned and the watermark never regresses,
    /// even for an empty or entirely stale batch.
    pub fn partition(&self, watermark: &str, records: &[OrderRecord]) -> Partition {
        let mut new_records = Vec::new();
        let mut highest = watermark;

        for record in records {
            if self.ordering.compare(&record.id, watermark) == Ordering::Greater {
                new_records.push(record.clone());
            }
            if self.ordering.compare(&record.id, highest) == Ordering::Greater {
                highest = &record.id;
            }
        }

        Partition {
            new_records,
            new_watermark: highest.to_string(),
        }
    }
}

/// Partition with the default lexical ordering.
pub fn partition(watermark: &str, records: &[OrderRecord]) -> Partition {
    SyncFilter::default().partition(watermark, records)
}
