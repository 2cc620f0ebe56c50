use crate::{
    commands::{load_table_index, BatchCommand, BatchContext, BatchOutcome},
    errors::ServiceError,
    pricing,
    sources::PriceTableSource,
};
use async_trait::async_trait;
use lazy_static::lazy_static;
use prometheus::IntCounter;
use std::sync::Arc;
use tracing::{error, info, instrument};

lazy_static! {
    static ref BASE_PRICE_REVERTS: IntCounter = IntCounter::new(
        "base_price_reverts_total",
        "Total number of base price reverts"
    )
    .expect("metric can be created");
    static ref BASE_PRICE_REVERT_FAILURES: IntCounter = IntCounter::new(
        "base_price_revert_failures_total",
        "Total number of failed base price reverts"
    )
    .expect("metric can be created");
}

/// "Voltar Padrão": overwrites every matched item's gross unit price
/// with the table's base price (the dedicated gross field, falling back
/// to the list price when that is blank).
///
/// The overwrite is unconditional: a zero base price is written too.
/// Discounts are not touched; misses are reported.
pub struct RevertBasePricesCommand {
    source: Arc<dyn PriceTableSource>,
}

impl RevertBasePricesCommand {
    pub fn new(source: Arc<dyn PriceTableSource>) -> Self {
        Self { source }
    }

    async fn revert(&self, ctx: BatchContext<'_>) -> Result<BatchOutcome, ServiceError> {
        let index = load_table_index(self.source.as_ref(), ctx.header).await?;

        let mut items = ctx.items.to_vec();
        let mut missing = Vec::new();
        for item in items.iter_mut() {
            match index.get(&item.product_code) {
                Some(entry) => item.gross_unit_price = entry.base_price(),
                None => missing.push(item.product_code.clone()),
            }
        }
        pricing::recalculate_all(&mut items);

        Ok(BatchOutcome {
            items,
            missing_products: missing,
        })
    }
}

#[async_trait]
impl BatchCommand for RevertBasePricesCommand {
    fn name(&self) -> &'static str {
        "revert_base_prices"
    }

    #[instrument(skip(self, ctx))]
    async fn execute(&self, ctx: BatchContext<'_>) -> Result<BatchOutcome, ServiceError> {
        let outcome = self.revert(ctx).await.map_err(|e| {
            BASE_PRICE_REVERT_FAILURES.inc();
            error!("Failed to revert base prices: {}", e);
            e
        })?;

        BASE_PRICE_REVERTS.inc();
        info!(
            items = outcome.items.len(),
            missing = outcome.missing_products.len(),
            "Reverted items to table base prices"
        );
        Ok(outcome)
    }
}
