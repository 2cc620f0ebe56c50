//! Contracts for the external collaborators the engine consumes.
//!
//! Catalog, policy and persistence systems live outside this crate; the
//! session and the batch commands only ever see these traits. The
//! [`memory`] module provides process-local implementations for tests
//! and the CLI.

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::models::discounts::TIER_COUNT;
use crate::models::line_item::LineItem;
use crate::models::order::{NegotiatedTerms, OrderHeader, SyncTotals};
use crate::models::price_table::{PriceTableEntry, PriceTableRef};

pub mod memory;

/// Read-only access to supplier price tables.
#[async_trait]
pub trait PriceTableSource: Send + Sync {
    /// All rows of one table. Row order is not significant.
    async fn entries(&self, table: &PriceTableRef) -> Result<Vec<PriceTableEntry>, ServiceError>;
}

/// Persistence boundary for orders.
///
/// A failed call must leave the caller free to retry: the session keeps
/// its local state untouched whenever a gateway method errors.
#[async_trait]
pub trait OrderSyncGateway: Send + Sync {
    /// Persists the header and returns the order number, assigning one
    /// on the first save.
    async fn save_header(&self, header: &OrderHeader) -> Result<i64, ServiceError>;

    /// Replaces the persisted items of `order_number` with `items`.
    /// The returned totals are authoritative after a successful sync.
    async fn sync_items(
        &self,
        order_number: i64,
        items: &[LineItem],
    ) -> Result<SyncTotals, ServiceError>;
}

/// Per-product discount-tier overrides from commercial pricing policies
/// (client group / product group agreements).
#[async_trait]
pub trait PricingPolicySource: Send + Sync {
    /// Tier overrides for the given products; products without a policy
    /// are simply absent from the result.
    async fn tier_overrides(
        &self,
        client_id: Uuid,
        supplier_id: Uuid,
        table_code: &str,
        product_codes: &[String],
    ) -> Result<HashMap<String, [Decimal; TIER_COUNT]>, ServiceError>;
}

/// Last negotiated unit prices, keyed by client and product.
#[async_trait]
pub trait PriceHistorySource: Send + Sync {
    async fn last_prices(
        &self,
        client_id: Uuid,
        supplier_id: Uuid,
        product_codes: &[String],
    ) -> Result<HashMap<String, Decimal>, ServiceError>;
}

/// Client-negotiated commercial conditions, used to seed new order
/// headers.
#[async_trait]
pub trait NegotiatedTermsSource: Send + Sync {
    async fn conditions(
        &self,
        client_id: Uuid,
        supplier_id: Uuid,
    ) -> Result<Option<NegotiatedTerms>, ServiceError>;
}

/// Supplier ("original") reference codes per product.
#[async_trait]
pub trait ReferenceCodeSource: Send + Sync {
    async fn reference_codes(
        &self,
        supplier_id: Uuid,
        product_codes: &[String],
    ) -> Result<HashMap<String, String>, ServiceError>;
}
