use crate::common::percent_factor;
use crate::models::line_item::LineItem;
use crate::models::order::OrderTotals;

/// Sums the order totals over `items`.
///
/// Gross and net come from the stored per-item totals. The tax
/// components are recomputed here from each item's net total and rates:
/// cached `total_with_ipi` / `total_with_taxes` fields may lag behind a
/// rate edit, and the aggregate is the authority either way. An empty
/// collection yields all zeros.
pub fn aggregate(items: &[LineItem]) -> OrderTotals {
    let mut totals = OrderTotals::default();
    for item in items {
        let with_ipi = item.net_total * percent_factor(item.ipi_percent);
        totals.gross += item.gross_total;
        totals.net += item.net_total;
        totals.ipi += with_ipi - item.net_total;
        totals.with_taxes += with_ipi * percent_factor(item.st_percent);
    }
    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::engine::recalculate;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn item(quantity: Decimal, price: Decimal, ipi: Decimal, st: Decimal) -> LineItem {
        let mut item = LineItem::new("P", "Peça", quantity, price);
        item.ipi_percent = ipi;
        item.st_percent = st;
        recalculate(&mut item);
        item
    }

    #[test]
    fn empty_collection_is_all_zeros() {
        assert_eq!(aggregate(&[]), OrderTotals::default());
    }

    #[test]
    fn sums_over_items() {
        let items = vec![
            item(dec!(2), dec!(100), dec!(10), Decimal::ZERO),
            item(dec!(1), dec!(50), Decimal::ZERO, dec!(5)),
        ];

        let totals = aggregate(&items);

        assert_eq!(totals.gross, dec!(250));
        assert_eq!(totals.net, dec!(250));
        assert_eq!(totals.ipi, dec!(20.0));
        // 200*1.1 + 50*1.05
        assert_eq!(totals.with_taxes, dec!(272.50));
    }

    #[test]
    fn stale_cached_tax_fields_do_not_leak_into_the_aggregate() {
        let mut stale = item(dec!(1), dec!(100), dec!(10), Decimal::ZERO);
        stale.total_with_ipi = dec!(999);
        stale.total_with_taxes = dec!(999);

        let totals = aggregate(&[stale]);

        assert_eq!(totals.ipi, dec!(10.0));
        assert_eq!(totals.with_taxes, dec!(110.0));
    }
}
