use crate::{
    commands::{load_table_index, BatchCommand, BatchContext, BatchOutcome},
    errors::ServiceError,
    pricing,
    sources::PriceTableSource,
};
use async_trait::async_trait;
use lazy_static::lazy_static;
use prometheus::IntCounter;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{error, info, instrument};

lazy_static! {
    static ref TABLE_PRICES_APPLIED: IntCounter = IntCounter::new(
        "table_prices_applied_total",
        "Total number of table price applications"
    )
    .expect("metric can be created");
    static ref TABLE_PRICE_FAILURES: IntCounter = IntCounter::new(
        "table_price_failures_total",
        "Total number of failed table price applications"
    )
    .expect("metric can be created");
}

/// "Atualizar Tabela": sets every matched item's gross unit price from
/// the table's list price and zeroes the special discount. Tier and
/// additional discounts stay as entered; misses are reported.
pub struct ApplyTablePricesCommand {
    source: Arc<dyn PriceTableSource>,
}

impl ApplyTablePricesCommand {
    pub fn new(source: Arc<dyn PriceTableSource>) -> Self {
        Self { source }
    }

    async fn apply(&self, ctx: BatchContext<'_>) -> Result<BatchOutcome, ServiceError> {
        let index = load_table_index(self.source.as_ref(), ctx.header).await?;

        let mut items = ctx.items.to_vec();
        let mut missing = Vec::new();
        for item in items.iter_mut() {
            match index.get(&item.product_code) {
                Some(entry) => {
                    item.gross_unit_price = entry.list_price;
                    item.discounts.special = Decimal::ZERO;
                }
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
impl BatchCommand for ApplyTablePricesCommand {
    fn name(&self) -> &'static str {
        "apply_table_prices"
    }

    #[instrument(skip(self, ctx))]
    async fn execute(&self, ctx: BatchContext<'_>) -> Result<BatchOutcome, ServiceError> {
        let outcome = self.apply(ctx).await.map_err(|e| {
            TABLE_PRICE_FAILURES.inc();
            error!("Failed to apply table prices: {}", e);
            e
        })?;

        TABLE_PRICES_APPLIED.inc();
        info!(
            items = outcome.items.len(),
            missing = outcome.missing_products.len(),
            "Applied table prices"
        );
        Ok(outcome)
    }
}
