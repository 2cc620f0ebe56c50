use crate::{
    commands::{BatchCommand, BatchContext, BatchOutcome},
    errors::ServiceError,
    pricing,
};
use async_trait::async_trait;
use lazy_static::lazy_static;
use prometheus::IntCounter;
use tracing::{info, instrument};

lazy_static! {
    static ref HEADER_DISCOUNTS_APPLIED: IntCounter = IntCounter::new(
        "header_discounts_applied_total",
        "Total number of header discount default applications"
    )
    .expect("metric can be created");
}

/// Copies the header's nine discount tiers into every item.
///
/// Promotional items are skipped by the copy and instead get their nine
/// tiers and additional discount zeroed. Special and additional
/// discounts of regular items are left as entered.
#[derive(Clone, Copy, Debug, Default)]
pub struct ApplyHeaderDiscountsCommand;

#[async_trait]
impl BatchCommand for ApplyHeaderDiscountsCommand {
    fn name(&self) -> &'static str {
        "apply_header_discounts"
    }

    #[instrument(skip(ctx))]
    async fn execute(&self, ctx: BatchContext<'_>) -> Result<BatchOutcome, ServiceError> {
        let mut items = ctx.items.to_vec();
        for item in items.iter_mut() {
            if item.promotional {
                item.discounts.clear_for_promotion();
            } else {
                item.discounts.tiers = ctx.header.default_discounts;
            }
        }
        pricing::recalculate_all(&mut items);

        HEADER_DISCOUNTS_APPLIED.inc();
        info!(items = items.len(), "Applied header discount defaults");
        Ok(BatchOutcome::replaced(items))
    }
}
