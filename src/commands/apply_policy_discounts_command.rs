use crate::{
    commands::{BatchCommand, BatchContext, BatchOutcome},
    errors::ServiceError,
    pricing,
    sources::PricingPolicySource,
};
use async_trait::async_trait;
use lazy_static::lazy_static;
use prometheus::IntCounter;
use std::sync::Arc;
use tracing::{error, info, instrument};

lazy_static! {
    static ref POLICY_DISCOUNTS_APPLIED: IntCounter = IntCounter::new(
        "policy_discounts_applied_total",
        "Total number of pricing policy discount applications"
    )
    .expect("metric can be created");
    static ref POLICY_DISCOUNT_FAILURES: IntCounter = IntCounter::new(
        "policy_discount_failures_total",
        "Total number of failed pricing policy discount applications"
    )
    .expect("metric can be created");
}

/// Applies client/product-group tier overrides from the pricing-policy
/// collaborator.
///
/// Only the nine tiers of matched products are overwritten; unmatched
/// items stay exactly as they were. A collaborator failure aborts the
/// whole command, so the session applies nothing.
pub struct ApplyPolicyDiscountsCommand {
    source: Arc<dyn PricingPolicySource>,
}

impl ApplyPolicyDiscountsCommand {
    pub fn new(source: Arc<dyn PricingPolicySource>) -> Self {
        Self { source }
    }

    async fn apply(&self, ctx: BatchContext<'_>) -> Result<BatchOutcome, ServiceError> {
        let client_id = ctx.header.client_id.ok_or_else(|| {
            ServiceError::InvalidOperation("order has no client selected".into())
        })?;
        let supplier_id = ctx.header.supplier_id.ok_or_else(|| {
            ServiceError::InvalidOperation("order has no supplier selected".into())
        })?;
        let table = ctx.header.price_table.as_ref().ok_or_else(|| {
            ServiceError::InvalidOperation("order has no price table selected".into())
        })?;

        let codes: Vec<String> = ctx
            .items
            .iter()
            .map(|item| item.product_code.clone())
            .collect();
        let overrides = self
            .source
            .tier_overrides(client_id, supplier_id, &table.table_code, &codes)
            .await?;

        let mut items = ctx.items.to_vec();
        for item in items.iter_mut() {
            if let Some(tiers) = overrides.get(&item.product_code) {
                item.discounts.tiers = *tiers;
            }
        }
        pricing::recalculate_all(&mut items);

        Ok(BatchOutcome::replaced(items))
    }
}

#[async_trait]
impl BatchCommand for ApplyPolicyDiscountsCommand {
    fn name(&self) -> &'static str {
        "apply_policy_discounts"
    }

    #[instrument(skip(self, ctx))]
    async fn execute(&self, ctx: BatchContext<'_>) -> Result<BatchOutcome, ServiceError> {
        let outcome = self.apply(ctx).await.map_err(|e| {
            POLICY_DISCOUNT_FAILURES.inc();
            error!("Failed to apply policy discounts: {}", e);
            e
        })?;

        POLICY_DISCOUNTS_APPLIED.inc();
        info!(items = outcome.items.len(), "Applied policy discounts");
        Ok(outcome)
    }
}
