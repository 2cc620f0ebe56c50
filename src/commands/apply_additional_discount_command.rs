use crate::{
    commands::{BatchCommand, BatchContext, BatchOutcome},
    errors::ServiceError,
    pricing,
};
use async_trait::async_trait;
use lazy_static::lazy_static;
use prometheus::IntCounter;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

lazy_static! {
    static ref ADDITIONAL_DISCOUNT_UPDATES: IntCounter = IntCounter::new(
        "additional_discount_updates_total",
        "Total number of uniform additional discount updates"
    )
    .expect("metric can be created");
}

/// "Desc Add": sets the additional (tier 10) discount uniformly on
/// every item. `None` leaves items unchanged apart from the recompute.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct ApplyAdditionalDiscountCommand {
    pub additional_percent: Option<Decimal>,
}

#[async_trait]
impl BatchCommand for ApplyAdditionalDiscountCommand {
    fn name(&self) -> &'static str {
        "apply_additional_discount"
    }

    #[instrument(skip(ctx))]
    async fn execute(&self, ctx: BatchContext<'_>) -> Result<BatchOutcome, ServiceError> {
        let mut items = ctx.items.to_vec();
        for item in items.iter_mut() {
            if let Some(additional) = self.additional_percent {
                item.discounts.additional = additional;
            }
        }
        pricing::recalculate_all(&mut items);

        ADDITIONAL_DISCOUNT_UPDATES.inc();
        info!(
            items = items.len(),
            additional = ?self.additional_percent,
            "Applied uniform additional discount"
        );
        Ok(BatchOutcome::replaced(items))
    }
}
