use crate::{
    commands::{BatchCommand, BatchContext, BatchOutcome},
    errors::ServiceError,
    pricing,
    sources::PriceHistorySource,
};
use async_trait::async_trait;
use lazy_static::lazy_static;
use prometheus::IntCounter;
use std::sync::Arc;
use tracing::{error, info, instrument};

lazy_static! {
    static ref NEGOTIATED_PRICES_APPLIED: IntCounter = IntCounter::new(
        "negotiated_prices_applied_total",
        "Total number of negotiated price applications"
    )
    .expect("metric can be created");
    static ref NEGOTIATED_PRICE_FAILURES: IntCounter = IntCounter::new(
        "negotiated_price_failures_total",
        "Total number of failed negotiated price applications"
    )
    .expect("metric can be created");
}

/// Overwrites gross unit prices with the client's last negotiated
/// prices from the history collaborator. Products with no history stay
/// untouched.
pub struct ApplyNegotiatedPricesCommand {
    source: Arc<dyn PriceHistorySource>,
}

impl ApplyNegotiatedPricesCommand {
    pub fn new(source: Arc<dyn PriceHistorySource>) -> Self {
        Self { source }
    }

    async fn apply(&self, ctx: BatchContext<'_>) -> Result<BatchOutcome, ServiceError> {
        let client_id = ctx.header.client_id.ok_or_else(|| {
            ServiceError::InvalidOperation("order has no client selected".into())
        })?;
        let supplier_id = ctx.header.supplier_id.ok_or_else(|| {
            ServiceError::InvalidOperation("order has no supplier selected".into())
        })?;

        let codes: Vec<String> = ctx
            .items
            .iter()
            .map(|item| item.product_code.clone())
            .collect();
        let last_prices = self
            .source
            .last_prices(client_id, supplier_id, &codes)
            .await?;

        let mut items = ctx.items.to_vec();
        for item in items.iter_mut() {
            if let Some(price) = last_prices.get(&item.product_code) {
                item.gross_unit_price = *price;
            }
        }
        pricing::recalculate_all(&mut items);

        Ok(BatchOutcome::replaced(items))
    }
}

#[async_trait]
impl BatchCommand for ApplyNegotiatedPricesCommand {
    fn name(&self) -> &'static str {
        "apply_negotiated_prices"
    }

    #[instrument(skip(self, ctx))]
    async fn execute(&self, ctx: BatchContext<'_>) -> Result<BatchOutcome, ServiceError> {
        let outcome = self.apply(ctx).await.map_err(|e| {
            NEGOTIATED_PRICE_FAILURES.inc();
            error!("Failed to apply negotiated prices: {}", e);
            e
        })?;

        NEGOTIATED_PRICES_APPLIED.inc();
        info!(items = outcome.items.len(), "Applied negotiated prices");
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::line_item::LineItem;
    use crate::models::order::OrderHeader;
    use crate::sources::memory::InMemoryPriceHistory;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    #[tokio::test]
    async fn overwrites_price_only_for_matches() {
        let client = Uuid::new_v4();
        let supplier = Uuid::new_v4();
        let history = InMemoryPriceHistory::new();
        history.insert_price(client, supplier, "P-1", dec!(87.50));

        let mut header = OrderHeader::new();
        header.client_id = Some(client);
        header.supplier_id = Some(supplier);

        let items = vec![
            LineItem::new("P-1", "Peça", dec!(2), dec!(100)),
            LineItem::new("P-2", "Outra", dec!(1), dec!(40)),
        ];

        let command = ApplyNegotiatedPricesCommand::new(Arc::new(history));
        let outcome = command
            .execute(BatchContext {
                header: &header,
                items: &items,
            })
            .await
            .unwrap();

        assert_eq!(outcome.items[0].gross_unit_price, dec!(87.50));
        assert_eq!(outcome.items[0].gross_total, dec!(175.00));
        assert_eq!(outcome.items[1].gross_unit_price, dec!(40));
    }
}
