use crate::{
    commands::{BatchCommand, BatchContext, BatchOutcome},
    errors::ServiceError,
    sources::ReferenceCodeSource,
};
use async_trait::async_trait;
use lazy_static::lazy_static;
use prometheus::IntCounter;
use std::sync::Arc;
use tracing::{error, info, instrument};

lazy_static! {
    static ref REFERENCE_CODES_FILLED: IntCounter = IntCounter::new(
        "reference_codes_filled_total",
        "Total number of reference code fill operations"
    )
    .expect("metric can be created");
    static ref REFERENCE_CODE_FAILURES: IntCounter = IntCounter::new(
        "reference_code_failures_total",
        "Total number of failed reference code fill operations"
    )
    .expect("metric can be created");
}

/// Fills the display-only reference code from the supplier's original
/// code catalog. Pricing is not touched; products without a code stay
/// as they are.
pub struct FillReferenceCodesCommand {
    source: Arc<dyn ReferenceCodeSource>,
}

impl FillReferenceCodesCommand {
    pub fn new(source: Arc<dyn ReferenceCodeSource>) -> Self {
        Self { source }
    }

    async fn fill(&self, ctx: BatchContext<'_>) -> Result<BatchOutcome, ServiceError> {
        let supplier_id = ctx.header.supplier_id.ok_or_else(|| {
            ServiceError::InvalidOperation("order has no supplier selected".into())
        })?;

        let codes: Vec<String> = ctx
            .items
            .iter()
            .map(|item| item.product_code.clone())
            .collect();
        let references = self.source.reference_codes(supplier_id, &codes).await?;

        let mut items = ctx.items.to_vec();
        for item in items.iter_mut() {
            if let Some(reference) = references.get(&item.product_code) {
                item.reference_code = Some(reference.clone());
            }
        }

        Ok(BatchOutcome::replaced(items))
    }
}

#[async_trait]
impl BatchCommand for FillReferenceCodesCommand {
    fn name(&self) -> &'static str {
        "fill_reference_codes"
    }

    #[instrument(skip(self, ctx))]
    async fn execute(&self, ctx: BatchContext<'_>) -> Result<BatchOutcome, ServiceError> {
        let outcome = self.fill(ctx).await.map_err(|e| {
            REFERENCE_CODE_FAILURES.inc();
            error!("Failed to fill reference codes: {}", e);
            e
        })?;

        REFERENCE_CODES_FILLED.inc();
        info!(items = outcome.items.len(), "Filled reference codes");
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::line_item::LineItem;
    use crate::models::order::OrderHeader;
    use crate::sources::memory::InMemoryReferenceCodes;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    #[tokio::test]
    async fn fills_codes_without_touching_pricing() {
        let supplier = Uuid::new_v4();
        let source = InMemoryReferenceCodes::new();
        source.insert_code(supplier, "P-1", "REF-77");

        let mut header = OrderHeader::new();
        header.supplier_id = Some(supplier);

        let mut item = LineItem::new("P-1", "Peça", dec!(2), dec!(100));
        item.net_unit_price = dec!(90);
        let items = vec![item, LineItem::new("P-2", "Outra", dec!(1), dec!(10))];

        let command = FillReferenceCodesCommand::new(Arc::new(source));
        let outcome = command
            .execute(BatchContext {
                header: &header,
                items: &items,
            })
            .await
            .unwrap();

        assert_eq!(outcome.items[0].reference_code.as_deref(), Some("REF-77"));
        // derived fields are exactly as they came in
        assert_eq!(outcome.items[0].net_unit_price, dec!(90));
        assert_eq!(outcome.items[1].reference_code, None);
    }
}
