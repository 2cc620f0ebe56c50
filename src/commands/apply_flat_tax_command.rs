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
    static ref FLAT_TAX_UPDATES: IntCounter = IntCounter::new(
        "flat_tax_updates_total",
        "Total number of uniform IPI/ST rate updates"
    )
    .expect("metric can be created");
}

/// "Atualizar IPI/ST": sets the given rates uniformly on every item.
///
/// A `None` rate means "leave as is", so either tax can be updated
/// alone. Rates are opaque percentages; no ceiling is enforced.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct ApplyFlatTaxCommand {
    pub ipi_percent: Option<Decimal>,
    pub st_percent: Option<Decimal>,
}

#[async_trait]
impl BatchCommand for ApplyFlatTaxCommand {
    fn name(&self) -> &'static str {
        "apply_flat_tax"
    }

    #[instrument(skip(ctx))]
    async fn execute(&self, ctx: BatchContext<'_>) -> Result<BatchOutcome, ServiceError> {
        let mut items = ctx.items.to_vec();
        for item in items.iter_mut() {
            if let Some(ipi) = self.ipi_percent {
                item.ipi_percent = ipi;
            }
            if let Some(st) = self.st_percent {
                item.st_percent = st;
            }
        }
        pricing::recalculate_all(&mut items);

        FLAT_TAX_UPDATES.inc();
        info!(
            items = items.len(),
            ipi = ?self.ipi_percent,
            st = ?self.st_percent,
            "Applied uniform tax rates"
        );
        Ok(BatchOutcome::replaced(items))
    }
}
