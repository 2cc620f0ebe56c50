use serde::{Deserialize, Serialize};

use crate::models::line_item::LineItem;

/// Raw row from a spreadsheet paste or an external extraction service.
///
/// Numeric columns stay as free-form strings here; lenient coercion
/// happens during resolution against the price table.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ImportRow {
    pub product_code: String,
    #[serde(default)]
    pub quantity: String,
    #[serde(default)]
    pub unit_price: String,
    #[serde(default)]
    pub reference_code: Option<String>,
}

/// Result of one staging resolution pass. Misses are a warning for the
/// user, never an error.
#[derive(Clone, Debug, Default)]
pub struct ImportReport {
    pub staged: usize,
    pub missing_products: Vec<String>,
}

/// Result of merging the staged items into the order.
#[derive(Clone, Debug, Default)]
pub struct MergeReport {
    pub merged: usize,
    /// Product codes rejected by the duplicate policy.
    pub rejected: Vec<String>,
}

/// Two-phase buffer for imported items.
///
/// Resolved rows wait here, outside the order, until an explicit merge
/// assigns them sequences. Discarding the buffer never touches the
/// order.
#[derive(Debug, Default)]
pub struct StagingBuffer {
    items: Vec<LineItem>,
}

impl StagingBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(&mut self, item: LineItem) {
        self.items.push(item);
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Empties the buffer, handing its items to the caller.
    pub fn take(&mut self) -> Vec<LineItem> {
        std::mem::take(&mut self.items)
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}
