//! Flat cost/inventory feed
//!
//! Pipe-delimited text with one header row:
//!
//! ```text
//! SenderID|SKU|Cost|Quantity
//! VENDOR123|ABC-1|12.34|40
//! ```

use std::fs::File;
use std::path::Path;

use chrono::NaiveDateTime;
use serde::Deserialize;
use tracing::debug;

use crate::{Error, Result};

const FEED_HEADER: &str = "SenderID|SKU|Cost|Quantity";

/// One row of the feed
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InventoryItem {
    pub sku: String,
    /// Unit cost
    pub cost: f64,
    /// Available quantity
    pub qty: i64,
}

/// A rendered feed ready for upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryFeed {
    /// `COSTINV_<YYYYMMDD_HHMMSS>.txt`
    pub file_name: String,
    pub content: Vec<u8>,
}

/// Render `items` as a feed sent by `sender_id`, stamped with `now`.
pub fn build_flat_cost_inventory(
    items: &[InventoryItem],
    sender_id: &str,
    now: NaiveDateTime,
) -> InventoryFeed {
    let file_name = format!("COSTINV_{}.txt", now.format("%Y%m%d_%H%M%S"));

    let mut body = String::with_capacity(FEED_HEADER.len() + 1 + items.len() * 32);
    body.push_str(FEED_HEADER);
    body.push('\n');
    for item in items {
        body.push_str(&format!(
            "{}|{}|{:.2}|{}\n",
            sender_id, item.sku, item.cost, item.qty
        ));
    }

    debug!(file_name = %file_name, items = items.len(), "Built cost/inventory feed");
    InventoryFeed {
        file_name,
        content: body.into_bytes(),
    }
}

/// Load feed rows from a CSV file with a `sku,cost,qty` header.
pub fn read_inventory_csv(path: &Path) -> Result<Vec<InventoryItem>> {
    let inventory_error = |message: String| Error::Inventory {
        path: path.display().to_string(),
        message,
    };

    let file = File::open(path).map_err(|e| inventory_error(e.to_string()))?;
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(file);

    let mut items = Vec::new();
    for (index, row) in reader.deserialize::<InventoryItem>().enumerate() {
        // Header is line 1
        let item = row.map_err(|e| inventory_error(format!("row {}: {e}", index + 2)))?;
        items.push(item);
    }
    Ok(items)
}
