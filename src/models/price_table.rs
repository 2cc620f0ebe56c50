use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Identifies one supplier price table.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PriceTableRef {
    pub supplier_id: Uuid,
    pub table_code: String,
}

impl PriceTableRef {
    pub fn new(supplier_id: Uuid, table_code: impl Into<String>) -> Self {
        Self {
            supplier_id,
            table_code: table_code.into(),
        }
    }
}

/// One product row of a supplier price table. Read-only lookup data.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PriceTableEntry {
    pub product_code: String,
    #[serde(default)]
    pub description: String,
    /// Dedicated gross ("bruto") price. Zero when the catalog left the
    /// field blank.
    #[serde(default)]
    pub gross_price: Decimal,
    /// General list price; the fallback for a blank gross field.
    #[serde(default)]
    pub list_price: Decimal,
    #[serde(default)]
    pub ipi_percent: Decimal,
    #[serde(default)]
    pub st_percent: Decimal,
    /// Packaging multiple; quantities align up to it when above 1.
    #[serde(default)]
    pub package_multiple: Decimal,
    #[serde(default)]
    pub reference_code: Option<String>,
}

impl PriceTableEntry {
    /// Price the revert-to-base operation writes: the gross field unless
    /// blank, then the list price. The result overwrites the item price
    /// unconditionally, zero included.
    pub fn base_price(&self) -> Decimal {
        if self.gross_price.is_zero() {
            self.list_price
        } else {
            self.gross_price
        }
    }
}

/// By-code index over the fetched rows of one price table.
#[derive(Clone, Debug, Default)]
pub struct PriceTableIndex {
    by_code: HashMap<String, PriceTableEntry>,
}

impl PriceTableIndex {
    pub fn new(entries: Vec<PriceTableEntry>) -> Self {
        let by_code = entries
            .into_iter()
            .map(|entry| (entry.product_code.clone(), entry))
            .collect();
        Self { by_code }
    }

    pub fn get(&self, product_code: &str) -> Option<&PriceTableEntry> {
        self.by_code.get(product_code)
    }

    pub fn len(&self) -> usize {
        self.by_code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_code.is_empty()
    }
}
