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
    static ref PACKAGE_QUANTITIES_ALIGNED: IntCounter = IntCounter::new(
        "package_quantities_aligned_total",
        "Total number of packaging quantity alignments"
    )
    .expect("metric can be created");
    static ref PACKAGE_ALIGNMENT_FAILURES: IntCounter = IntCounter::new(
        "package_alignment_failures_total",
        "Total number of failed packaging quantity alignments"
    )
    .expect("metric can be created");
}

/// Rounds `quantity` up to the next multiple of `multiple`.
///
/// Multiples of one or less never constrain, and aligned quantities are
/// returned untouched, which makes the operation a fixed point on its
/// own output.
pub fn align_quantity(quantity: Decimal, multiple: Decimal) -> Decimal {
    if multiple <= Decimal::ONE || quantity <= Decimal::ZERO {
        return quantity;
    }
    if (quantity % multiple).is_zero() {
        return quantity;
    }
    (quantity / multiple).ceil() * multiple
}

/// Aligns item quantities to their product's packaging multiple from
/// the selected price table. Items already aligned, items with a
/// multiple of one or less, and unknown products stay untouched;
/// unknown products are reported.
pub struct AlignPackageQuantitiesCommand {
    source: Arc<dyn PriceTableSource>,
}

impl AlignPackageQuantitiesCommand {
    pub fn new(source: Arc<dyn PriceTableSource>) -> Self {
        Self { source }
    }

    async fn align(&self, ctx: BatchContext<'_>) -> Result<BatchOutcome, ServiceError> {
        let index = load_table_index(self.source.as_ref(), ctx.header).await?;

        let mut items = ctx.items.to_vec();
        let mut missing = Vec::new();
        for item in items.iter_mut() {
            match index.get(&item.product_code) {
                Some(entry) => {
                    item.quantity = align_quantity(item.quantity, entry.package_multiple);
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
impl BatchCommand for AlignPackageQuantitiesCommand {
    fn name(&self) -> &'static str {
        "align_package_quantities"
    }

    #[instrument(skip(self, ctx))]
    async fn execute(&self, ctx: BatchContext<'_>) -> Result<BatchOutcome, ServiceError> {
        let outcome = self.align(ctx).await.map_err(|e| {
            PACKAGE_ALIGNMENT_FAILURES.inc();
            error!("Failed to align package quantities: {}", e);
            e
        })?;

        PACKAGE_QUANTITIES_ALIGNED.inc();
        info!(
            items = outcome.items.len(),
            missing = outcome.missing_products.len(),
            "Aligned quantities to packaging multiples"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::line_item::LineItem;
    use crate::models::order::OrderHeader;
    use crate::models::price_table::{PriceTableEntry, PriceTableRef};
    use crate::sources::memory::InMemoryPriceTable;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    #[test]
    fn rounds_up_to_the_next_multiple() {
        assert_eq!(align_quantity(dec!(10), dec!(3)), dec!(12));
        assert_eq!(align_quantity(dec!(1), dec!(12)), dec!(12));
    }

    #[test]
    fn aligned_quantities_are_fixed_points() {
        assert_eq!(align_quantity(dec!(12), dec!(3)), dec!(12));
        let once = align_quantity(dec!(10), dec!(3));
        assert_eq!(align_quantity(once, dec!(3)), once);
    }

    #[test]
    fn multiples_of_one_or_less_never_constrain() {
        assert_eq!(align_quantity(dec!(7), dec!(1)), dec!(7));
        assert_eq!(align_quantity(dec!(7), Decimal::ZERO), dec!(7));
    }

    #[test]
    fn fractional_multiples_above_one_align() {
        assert_eq!(align_quantity(dec!(6), dec!(2.5)), dec!(7.5));
        // at or below one, a multiple never constrains
        assert_eq!(align_quantity(dec!(0.5), dec!(0.3)), dec!(0.5));
    }

    #[tokio::test]
    async fn aligns_only_misaligned_known_products() {
        let table_ref = PriceTableRef::new(Uuid::new_v4(), "T1");
        let source = InMemoryPriceTable::new();
        source.insert_table(
            table_ref.clone(),
            vec![
                PriceTableEntry {
                    product_code: "P-1".into(),
                    package_multiple: dec!(12),
                    ..PriceTableEntry::default()
                },
                PriceTableEntry {
                    product_code: "P-2".into(),
                    package_multiple: dec!(6),
                    ..PriceTableEntry::default()
                },
            ],
        );
        let mut header = OrderHeader::new();
        header.price_table = Some(table_ref);

        let items = vec![
            LineItem::new("P-1", "Caixa", dec!(10), dec!(5)),
            LineItem::new("P-2", "Caixa", dec!(12), dec!(5)),
            LineItem::new("P-404", "Solta", dec!(10), dec!(5)),
        ];

        let command = AlignPackageQuantitiesCommand::new(Arc::new(source));
        let outcome = command
            .execute(BatchContext {
                header: &header,
                items: &items,
            })
            .await
            .unwrap();

        assert_eq!(outcome.items[0].quantity, dec!(12));
        assert_eq!(outcome.items[1].quantity, dec!(12));
        assert_eq!(outcome.items[2].quantity, dec!(10));
        assert_eq!(outcome.missing_products, vec!["P-404".to_string()]);
    }
}
