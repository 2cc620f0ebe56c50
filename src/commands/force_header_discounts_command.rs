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
    static ref HEADER_DISCOUNTS_FORCED: IntCounter = IntCounter::new(
        "header_discounts_forced_total",
        "Total number of forced header discount applications"
    )
    .expect("metric can be created");
}

/// Overwrites every item's nine tiers with the header defaults,
/// promotional flag ignored.
#[derive(Clone, Copy, Debug, Default)]
pub struct ForceHeaderDiscountsCommand;

#[async_trait]
impl BatchCommand for ForceHeaderDiscountsCommand {
    fn name(&self) -> &'static str {
        "force_header_discounts"
    }

    #[instrument(skip(ctx))]
    async fn execute(&self, ctx: BatchContext<'_>) -> Result<BatchOutcome, ServiceError> {
        let mut items = ctx.items.to_vec();
        for item in items.iter_mut() {
            item.discounts.tiers = ctx.header.default_discounts;
        }
        pricing::recalculate_all(&mut items);

        HEADER_DISCOUNTS_FORCED.inc();
        info!(items = items.len(), "Forced header discounts onto items");
        Ok(BatchOutcome::replaced(items))
    }
}
