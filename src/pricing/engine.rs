use super::cascade::cascade;
use crate::common::percent_factor;
use crate::models::line_item::LineItem;

/// Recomputes every derived field of `item` from its pricing inputs.
///
/// The unit price runs through the discount cascade in schedule order,
/// then:
///
/// * `gross_total = gross_unit_price * quantity`
/// * `net_total = net_unit_price * quantity`
/// * `total_with_ipi = net_total * (1 + ipi/100)`; the IPI base is the
///   **net** total, not the gross one
/// * `total_with_taxes = total_with_ipi * (1 + st/100)`; ST compounds
///   on the IPI-inclusive amount
///
/// The discount summary text is refreshed along the way. Pure and
/// infallible; garbage input coercion happens earlier, at the edit
/// boundary.
pub fn recalculate(item: &mut LineItem) {
    item.net_unit_price = cascade(item.gross_unit_price, item.discounts.cascade_steps());
    item.gross_total = item.gross_unit_price * item.quantity;
    item.net_total = item.net_unit_price * item.quantity;
    item.total_with_ipi = item.net_total * percent_factor(item.ipi_percent);
    item.total_with_taxes = item.total_with_ipi * percent_factor(item.st_percent);
    item.discount_summary = item.discounts.summary();
}

/// Reprices a whole collection in place.
pub fn recalculate_all(items: &mut [LineItem]) {
    for item in items.iter_mut() {
        recalculate(item);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    #[test]
    fn ipi_applies_to_net_and_st_compounds() {
        let mut item = LineItem::new("P-1", "Peça", dec!(1), dec!(100));
        item.ipi_percent = dec!(10);
        item.st_percent = dec!(5);

        recalculate(&mut item);

        assert_eq!(item.net_total, dec!(100));
        assert_eq!(item.total_with_ipi, dec!(110.0));
        assert_eq!(item.total_with_taxes, dec!(115.50));
    }

    #[test]
    fn header_tier_flows_through_totals() {
        // 200 with a 5% first tier, quantity 3, IPI 10%
        let mut item = LineItem::new("P-2", "Peça", dec!(3), dec!(200));
        item.discounts.tiers[0] = dec!(5);
        item.ipi_percent = dec!(10);

        recalculate(&mut item);

        assert_eq!(item.net_unit_price, dec!(190.00));
        assert_eq!(item.gross_total, dec!(600));
        assert_eq!(item.net_total, dec!(570.00));
        assert_eq!(item.total_with_ipi, dec!(627.000));
        assert_eq!(item.total_with_taxes, dec!(627.000));
    }

    #[test]
    fn summary_is_refreshed() {
        let mut item = LineItem::new("P-3", "Peça", dec!(1), dec!(50));
        item.discounts.tiers[0] = dec!(10);
        item.discounts.additional = dec!(2);
        item.discount_summary = "stale".into();

        recalculate(&mut item);

        assert_eq!(item.discount_summary, "10.00%+2.00%");
    }

    #[test]
    fn zero_quantity_zeroes_totals_but_not_unit_price() {
        let mut item = LineItem::new("P-4", "Peça", Decimal::ZERO, dec!(80));
        item.discounts.special = dec!(50);

        recalculate(&mut item);

        assert_eq!(item.net_unit_price, dec!(40.00));
        assert_eq!(item.net_total, Decimal::ZERO);
        assert_eq!(item.total_with_taxes, Decimal::ZERO);
    }
}
