//! Process-local collaborator implementations backed by `DashMap`.
//! Tests and the CLI run the whole engine against these.

use async_trait::async_trait;
use dashmap::DashMap;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use uuid::Uuid;

use super::{
    NegotiatedTermsSource, OrderSyncGateway, PriceHistorySource, PriceTableSource,
    PricingPolicySource, ReferenceCodeSource,
};
use crate::errors::ServiceError;
use crate::models::discounts::TIER_COUNT;
use crate::models::line_item::LineItem;
use crate::models::order::{NegotiatedTerms, OrderHeader, SyncTotals};
use crate::models::price_table::{PriceTableEntry, PriceTableRef};
use crate::pricing;

/// Price tables held in memory, keyed by table reference.
#[derive(Clone, Default)]
pub struct InMemoryPriceTable {
    tables: Arc<DashMap<PriceTableRef, Vec<PriceTableEntry>>>,
}

impl InMemoryPriceTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_table(&self, table: PriceTableRef, entries: Vec<PriceTableEntry>) {
        self.tables.insert(table, entries);
    }
}

#[async_trait]
impl PriceTableSource for InMemoryPriceTable {
    /// An unknown table yields no rows; per-product misses are the
    /// caller's report to make.
    async fn entries(&self, table: &PriceTableRef) -> Result<Vec<PriceTableEntry>, ServiceError> {
        Ok(self
            .tables
            .get(table)
            .map(|entries| entries.clone())
            .unwrap_or_default())
    }
}

#[derive(Clone, Debug)]
struct StoredOrder {
    header: OrderHeader,
    items: Vec<LineItem>,
}

/// Sync gateway backed by process memory.
///
/// Order numbers come from an atomic counter starting at 1; totals are
/// computed with the local aggregator, which keeps the returned values
/// consistent with what a store-side computation would produce.
#[derive(Clone, Default)]
pub struct InMemorySyncGateway {
    next_number: Arc<AtomicI64>,
    orders: Arc<DashMap<i64, StoredOrder>>,
}

impl InMemorySyncGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Items as last synced, for assertions and display.
    pub fn stored_items(&self, order_number: i64) -> Vec<LineItem> {
        self.orders
            .get(&order_number)
            .map(|order| order.items.clone())
            .unwrap_or_default()
    }

    pub fn saved_count(&self) -> usize {
        self.orders.len()
    }
}

#[async_trait]
impl OrderSyncGateway for InMemorySyncGateway {
    async fn save_header(&self, header: &OrderHeader) -> Result<i64, ServiceError> {
        let number = match header.order_number {
            Some(number) => number,
            None => self.next_number.fetch_add(1, Ordering::SeqCst) + 1,
        };

        let items = self
            .orders
            .get(&number)
            .map(|order| order.items.clone())
            .unwrap_or_default();
        self.orders.insert(
            number,
            StoredOrder {
                header: header.clone(),
                items,
            },
        );
        Ok(number)
    }

    async fn sync_items(
        &self,
        order_number: i64,
        items: &[LineItem],
    ) -> Result<SyncTotals, ServiceError> {
        let mut stored = self.orders.get_mut(&order_number).ok_or_else(|| {
            ServiceError::NotFound(format!("order {} has no saved header", order_number))
        })?;

        stored.items = items.to_vec();
        for item in stored.items.iter_mut() {
            item.order_number = Some(order_number);
        }

        let totals = pricing::aggregate(&stored.items);
        Ok(SyncTotals {
            gross: totals.gross,
            net: totals.net,
            ipi: totals.ipi,
        })
    }
}

/// Pricing-policy overrides keyed by client, supplier, table and
/// product.
#[derive(Clone, Default)]
pub struct InMemoryPricingPolicies {
    overrides: Arc<DashMap<(Uuid, Uuid, String, String), [Decimal; TIER_COUNT]>>,
}

impl InMemoryPricingPolicies {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_override(
        &self,
        client_id: Uuid,
        supplier_id: Uuid,
        table_code: &str,
        product_code: &str,
        tiers: [Decimal; TIER_COUNT],
    ) {
        self.overrides.insert(
            (
                client_id,
                supplier_id,
                table_code.to_string(),
                product_code.to_string(),
            ),
            tiers,
        );
    }
}

#[async_trait]
impl PricingPolicySource for InMemoryPricingPolicies {
    async fn tier_overrides(
        &self,
        client_id: Uuid,
        supplier_id: Uuid,
        table_code: &str,
        product_codes: &[String],
    ) -> Result<HashMap<String, [Decimal; TIER_COUNT]>, ServiceError> {
        let mut found = HashMap::new();
        for code in product_codes {
            let key = (
                client_id,
                supplier_id,
                table_code.to_string(),
                code.clone(),
            );
            if let Some(tiers) = self.overrides.get(&key) {
                found.insert(code.clone(), *tiers);
            }
        }
        Ok(found)
    }
}

/// Last negotiated prices keyed by client, supplier and product.
#[derive(Clone, Default)]
pub struct InMemoryPriceHistory {
    prices: Arc<DashMap<(Uuid, Uuid, String), Decimal>>,
}

impl InMemoryPriceHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_price(
        &self,
        client_id: Uuid,
        supplier_id: Uuid,
        product_code: &str,
        price: Decimal,
    ) {
        self.prices
            .insert((client_id, supplier_id, product_code.to_string()), price);
    }
}

#[async_trait]
impl PriceHistorySource for InMemoryPriceHistory {
    async fn last_prices(
        &self,
        client_id: Uuid,
        supplier_id: Uuid,
        product_codes: &[String],
    ) -> Result<HashMap<String, Decimal>, ServiceError> {
        let mut found = HashMap::new();
        for code in product_codes {
            let key = (client_id, supplier_id, code.clone());
            if let Some(price) = self.prices.get(&key) {
                found.insert(code.clone(), *price);
            }
        }
        Ok(found)
    }
}

/// Negotiated commercial conditions keyed by client and supplier.
#[derive(Clone, Default)]
pub struct InMemoryNegotiatedTerms {
    terms: Arc<DashMap<(Uuid, Uuid), NegotiatedTerms>>,
}

impl InMemoryNegotiatedTerms {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_terms(&self, client_id: Uuid, supplier_id: Uuid, terms: NegotiatedTerms) {
        self.terms.insert((client_id, supplier_id), terms);
    }
}

#[async_trait]
impl NegotiatedTermsSource for InMemoryNegotiatedTerms {
    async fn conditions(
        &self,
        client_id: Uuid,
        supplier_id: Uuid,
    ) -> Result<Option<NegotiatedTerms>, ServiceError> {
        Ok(self
            .terms
            .get(&(client_id, supplier_id))
            .map(|terms| terms.clone()))
    }
}

/// Supplier reference codes keyed by supplier and product.
#[derive(Clone, Default)]
pub struct InMemoryReferenceCodes {
    codes: Arc<DashMap<(Uuid, String), String>>,
}

impl InMemoryReferenceCodes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_code(&self, supplier_id: Uuid, product_code: &str, reference_code: &str) {
        self.codes.insert(
            (supplier_id, product_code.to_string()),
            reference_code.to_string(),
        );
    }
}

#[async_trait]
impl ReferenceCodeSource for InMemoryReferenceCodes {
    async fn reference_codes(
        &self,
        supplier_id: Uuid,
        product_codes: &[String],
    ) -> Result<HashMap<String, String>, ServiceError> {
        let mut found = HashMap::new();
        for code in product_codes {
            let key = (supplier_id, code.clone());
            if let Some(reference) = self.codes.get(&key) {
                found.insert(code.clone(), reference.clone());
            }
        }
        Ok(found)
    }
}
