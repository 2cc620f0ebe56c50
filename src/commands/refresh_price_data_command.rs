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
    static ref PRICE_REFRESHES_APPLIED: IntCounter = IntCounter::new(
        "price_refreshes_applied_total",
        "Total number of price data refreshes from the table"
    )
    .expect("metric can be created");
    static ref PRICE_REFRESH_FAILURES: IntCounter = IntCounter::new(
        "price_refresh_failures_total",
        "Total number of failed price data refreshes"
    )
    .expect("metric can be created");
}

/// "Atualizar Valores": refreshes item data from the selected price
/// table.
///
/// For each item found in the table, a blank description is filled in
/// and IPI/ST rates are taken over only while still zero; entered rates
/// are never overwritten. Promotional items additionally get their nine
/// tiers and additional discount zeroed. Missing product codes are
/// collected into the outcome, not raised.
///
/// This is the one batch operation callers are expected to follow with
/// a persistence sync; see `OrderSession::refresh_and_sync`.
pub struct RefreshPriceDataCommand {
    source: Arc<dyn PriceTableSource>,
}

impl RefreshPriceDataCommand {
    pub fn new(source: Arc<dyn PriceTableSource>) -> Self {
        Self { source }
    }

    async fn refresh(&self, ctx: BatchContext<'_>) -> Result<BatchOutcome, ServiceError> {
        let index = load_table_index(self.source.as_ref(), ctx.header).await?;

        let mut items = ctx.items.to_vec();
        let mut missing = Vec::new();
        for item in items.iter_mut() {
            match index.get(&item.product_code) {
                Some(entry) => {
                    if item.description.trim().is_empty() {
                        item.description = entry.description.clone();
                    }
                    if item.ipi_percent.is_zero() {
                        item.ipi_percent = entry.ipi_percent;
                    }
                    if item.st_percent.is_zero() {
                        item.st_percent = entry.st_percent;
                    }
                }
                None => missing.push(item.product_code.clone()),
            }
            if item.promotional {
                item.discounts.clear_for_promotion();
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
impl BatchCommand for RefreshPriceDataCommand {
    fn name(&self) -> &'static str {
        "refresh_price_data"
    }

    #[instrument(skip(self, ctx))]
    async fn execute(&self, ctx: BatchContext<'_>) -> Result<BatchOutcome, ServiceError> {
        let outcome = self.refresh(ctx).await.map_err(|e| {
            PRICE_REFRESH_FAILURES.inc();
            error!("Failed to refresh price data: {}", e);
            e
        })?;

        PRICE_REFRESHES_APPLIED.inc();
        info!(
            items = outcome.items.len(),
            missing = outcome.missing_products.len(),
            "Refreshed item data from the price table"
        );
        Ok(outcome)
    }
}
