use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::discounts::DiscountSchedule;

/// Serde helper for the promotional flag, stored as `"S"` / `"N"` on the
/// wire.
pub mod promo_flag {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &bool, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(if *value { "S" } else { "N" })
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<bool, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(raw.eq_ignore_ascii_case("s"))
    }
}

/// Addresses one item of the in-memory collection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ItemKey {
    /// The stable in-memory identity.
    Entry(Uuid),
    /// The per-order sequence number.
    Sequence(u32),
}

/// One line of an order.
///
/// `entry_id` identifies the row for its whole in-memory life, including
/// the staged phase before a sequence exists. `sequence` is the positive
/// per-order position, assigned on insert as the collection maximum plus
/// one; gaps left by removals are not refilled. Derived fields are owned
/// by the pricing engine and are refreshed on every recalculation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LineItem {
    pub entry_id: Uuid,
    pub sequence: Option<u32>,
    /// Number of the order this item belongs to, once persisted.
    pub order_number: Option<i64>,

    pub product_code: String,
    pub description: String,
    /// Display-only supplier/original code; part of the duplicate
    /// identity together with `product_code`.
    pub reference_code: Option<String>,

    pub quantity: Decimal,
    pub gross_unit_price: Decimal,
    #[serde(default)]
    pub discounts: DiscountSchedule,
    #[serde(default)]
    pub ipi_percent: Decimal,
    #[serde(default)]
    pub st_percent: Decimal,
    #[serde(with = "promo_flag", default)]
    pub promotional: bool,

    // Derived by the pricing engine.
    #[serde(default)]
    pub net_unit_price: Decimal,
    #[serde(default)]
    pub gross_total: Decimal,
    #[serde(default)]
    pub net_total: Decimal,
    #[serde(default)]
    pub total_with_ipi: Decimal,
    #[serde(default)]
    pub total_with_taxes: Decimal,
    #[serde(default)]
    pub discount_summary: String,
}

impl LineItem {
    /// Creates an unsequenced item with fresh identity and zeroed derived
    /// fields.
    pub fn new(
        product_code: impl Into<String>,
        description: impl Into<String>,
        quantity: Decimal,
        gross_unit_price: Decimal,
    ) -> Self {
        Self {
            entry_id: Uuid::new_v4(),
            sequence: None,
            order_number: None,
            product_code: product_code.into(),
            description: description.into(),
            reference_code: None,
            quantity,
            gross_unit_price,
            discounts: DiscountSchedule::default(),
            ipi_percent: Decimal::ZERO,
            st_percent: Decimal::ZERO,
            promotional: false,
            net_unit_price: Decimal::ZERO,
            gross_total: Decimal::ZERO,
            net_total: Decimal::ZERO,
            total_with_ipi: Decimal::ZERO,
            total_with_taxes: Decimal::ZERO,
            discount_summary: String::new(),
        }
    }

    /// The pair that defines a duplicate: product code plus the display
    /// reference code, with a missing reference treated as empty.
    pub fn identity_pair(&self) -> (&str, &str) {
        (
            self.product_code.as_str(),
            self.reference_code.as_deref().unwrap_or(""),
        )
    }

    pub fn matches(&self, key: ItemKey) -> bool {
        match key {
            ItemKey::Entry(entry_id) => self.entry_id == entry_id,
            ItemKey::Sequence(sequence) => self.sequence == Some(sequence),
        }
    }
}
