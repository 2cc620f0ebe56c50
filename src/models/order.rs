use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::discounts::TIER_COUNT;
use super::price_table::PriceTableRef;

/// Enum representing the possible statuses of an order.
///
/// Wire values are the Portuguese labels used across the product.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
pub enum OrderStatus {
    #[default]
    #[serde(rename = "Pedido")]
    #[strum(serialize = "Pedido")]
    Order,
    #[serde(rename = "Cotação Pendente")]
    #[strum(serialize = "Cotação Pendente")]
    PendingQuote,
    #[serde(rename = "Cotação Confirmada")]
    #[strum(serialize = "Cotação Confirmada")]
    ConfirmedQuote,
    #[serde(rename = "Faturado")]
    #[strum(serialize = "Faturado")]
    Invoiced,
    #[serde(rename = "Garantia")]
    #[strum(serialize = "Garantia")]
    Warranty,
    #[serde(rename = "Bonificação")]
    #[strum(serialize = "Bonificação")]
    Bonus,
    #[serde(rename = "Excluído")]
    #[strum(serialize = "Excluído")]
    Deleted,
}

/// Who pays the freight.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
pub enum FreightType {
    #[default]
    #[serde(rename = "CIF")]
    #[strum(serialize = "CIF")]
    Cif,
    #[serde(rename = "FOB")]
    #[strum(serialize = "FOB")]
    Fob,
}

/// Aggregated money totals of one order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderTotals {
    pub gross: Decimal,
    pub net: Decimal,
    pub ipi: Decimal,
    pub with_taxes: Decimal,
}

impl OrderTotals {
    /// True when any component differs from `other` by more than
    /// `tolerance`. The session only rewrites header totals when this
    /// holds.
    pub fn differs_from(&self, other: &OrderTotals, tolerance: Decimal) -> bool {
        (self.gross - other.gross).abs() > tolerance
            || (self.net - other.net).abs() > tolerance
            || (self.ipi - other.ipi).abs() > tolerance
            || (self.with_taxes - other.with_taxes).abs() > tolerance
    }
}

/// Totals returned by the sync gateway after items are pushed.
///
/// Gross, net and IPI become authoritative on the header after a
/// successful sync; the tax-inclusive total stays locally computed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncTotals {
    pub gross: Decimal,
    pub net: Decimal,
    pub ipi: Decimal,
}

/// Client-negotiated commercial conditions used to seed a new order
/// header. Every populated field wins over the generic defaults.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NegotiatedTerms {
    #[serde(default)]
    pub discount_tiers: [Decimal; TIER_COUNT],
    #[serde(default)]
    pub carrier_id: Option<Uuid>,
    #[serde(default)]
    pub payment_term: Option<String>,
    #[serde(default)]
    pub buyer: Option<String>,
    #[serde(default)]
    pub freight: Option<FreightType>,
    #[serde(default)]
    pub price_table: Option<PriceTableRef>,
}

/// The order header.
///
/// Reference fields stay `None` while the user is still filling the
/// order in; saving validates them all at once so every missing field is
/// reported together.
#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
pub struct OrderHeader {
    /// Assigned by the sync gateway on the first save.
    pub order_number: Option<i64>,

    #[validate(required)]
    pub client_id: Option<Uuid>,
    #[validate(required)]
    pub supplier_id: Option<Uuid>,
    #[validate(required)]
    pub carrier_id: Option<Uuid>,
    #[validate(required)]
    pub seller_id: Option<Uuid>,
    #[validate(required)]
    pub price_table: Option<PriceTableRef>,

    pub payment_term: Option<String>,
    pub buyer: Option<String>,
    #[serde(default)]
    pub freight: FreightType,
    #[serde(default)]
    pub status: OrderStatus,
    pub issue_date: DateTime<Utc>,
    #[serde(default)]
    pub notes: String,
    /// Per-order duplicate policy; seeded from configuration.
    #[serde(default)]
    pub allow_duplicate_items: bool,

    /// Header discount tiers copied into newly created items.
    #[serde(default)]
    pub default_discounts: [Decimal; TIER_COUNT],
    #[serde(default)]
    pub totals: OrderTotals,
}

impl OrderHeader {
    pub fn new() -> Self {
        Self {
            order_number: None,
            client_id: None,
            supplier_id: None,
            carrier_id: None,
            seller_id: None,
            price_table: None,
            payment_term: None,
            buyer: None,
            freight: FreightType::default(),
            status: OrderStatus::default(),
            issue_date: Utc::now(),
            notes: String::new(),
            allow_duplicate_items: false,
            default_discounts: [Decimal::ZERO; TIER_COUNT],
            totals: OrderTotals::default(),
        }
    }

    /// Order number for display; unsaved orders render as `(Novo)`.
    pub fn display_number(&self) -> String {
        match self.order_number {
            Some(number) => number.to_string(),
            None => "(Novo)".to_string(),
        }
    }

    pub fn is_saved(&self) -> bool {
        self.order_number.is_some()
    }

    /// Copies negotiated client conditions into the header. Only
    /// populated fields overwrite; the discount tiers always do.
    pub fn apply_terms(&mut self, terms: &NegotiatedTerms) {
        self.default_discounts = terms.discount_tiers;
        if terms.carrier_id.is_some() {
            self.carrier_id = terms.carrier_id;
        }
        if let Some(payment_term) = &terms.payment_term {
            self.payment_term = Some(payment_term.clone());
        }
        if let Some(buyer) = &terms.buyer {
            self.buyer = Some(buyer.clone());
        }
        if let Some(freight) = terms.freight {
            self.freight = freight;
        }
        if let Some(table) = &terms.price_table {
            self.price_table = Some(table.clone());
        }
    }
}

impl Default for OrderHeader {
    fn default() -> Self {
        Self::new()
    }
}
