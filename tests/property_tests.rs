//! Property-based tests for the pricing calculations.
//!
//! These verify the arithmetic invariants of the discount cascade, the
//! tax chain, quantity alignment and the lenient parsers across
//! generated inputs rather than hand-picked examples.

use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use salesmasters_pricing::commands::align_package_quantities_command::align_quantity;
use salesmasters_pricing::common::{parse_decimal_or, parse_quantity};
use salesmasters_pricing::models::LineItem;
use salesmasters_pricing::pricing::{aggregate, cascade, recalculate};

// Strategies for generating test data

fn price_strategy() -> impl Strategy<Value = Decimal> {
    // 0.01 .. 1_000_000.00, two decimal places
    (1i64..=100_000_000).prop_map(|cents| Decimal::new(cents, 2))
}

fn percent_strategy() -> impl Strategy<Value = Decimal> {
    // 0.00 .. 100.00
    (0i64..=10_000).prop_map(|basis_points| Decimal::new(basis_points, 2))
}

fn quantity_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..=10_000).prop_map(Decimal::from)
}

fn tier_list_strategy() -> impl Strategy<Value = Vec<Decimal>> {
    prop::collection::vec(percent_strategy(), 0..=11)
}

// Property: an all-zero cascade leaves the price untouched
proptest! {
    #[test]
    fn zero_discounts_are_the_identity(price in price_strategy()) {
        prop_assert_eq!(cascade(price, [Decimal::ZERO; 11]), price);
    }
}

// Property: discounts up to 100% keep the net between zero and the base
// price, and any positive discount strictly lowers it
proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    #[test]
    fn cascade_stays_bounded(price in price_strategy(), tiers in tier_list_strategy()) {
        let net = cascade(price, tiers.clone());

        prop_assert!(net >= Decimal::ZERO, "net {} fell below zero", net);
        prop_assert!(net <= price, "net {} exceeds base {}", net, price);
        if tiers.iter().any(|step| *step > Decimal::ZERO) {
            prop_assert!(net < price, "a positive discount must lower {}", price);
        }
    }

    #[test]
    fn extending_the_cascade_never_raises_it(
        price in price_strategy(),
        tiers in tier_list_strategy(),
        extra in percent_strategy(),
    ) {
        let shorter = cascade(price, tiers.clone());
        let mut longer = tiers;
        longer.push(extra);

        prop_assert!(cascade(price, longer) <= shorter);
    }
}

// Property: quantity alignment is a fixed point that never shrinks the
// quantity and always lands on the multiple
proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    #[test]
    fn alignment_is_idempotent(
        quantity in quantity_strategy(),
        multiple in (1i64..=500).prop_map(Decimal::from),
    ) {
        let aligned = align_quantity(quantity, multiple);

        prop_assert!(aligned >= quantity);
        prop_assert_eq!(align_quantity(aligned, multiple), aligned);
        if multiple > Decimal::ONE {
            prop_assert!(
                (aligned % multiple).is_zero(),
                "{} is not a multiple of {}",
                aligned,
                multiple
            );
        }
    }
}

// Property: recalculation keeps the totals chain ordered, with IPI on
// the net total and ST compounding on the IPI-inclusive amount
proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn tax_chain_is_ordered(
        price in price_strategy(),
        quantity in quantity_strategy(),
        tier in percent_strategy(),
        ipi in percent_strategy(),
        st in percent_strategy(),
    ) {
        let mut item = LineItem::new("P-1", "Produto", quantity, price);
        item.discounts.tiers[0] = tier;
        item.ipi_percent = ipi;
        item.st_percent = st;

        recalculate(&mut item);

        prop_assert_eq!(item.gross_total, price * quantity);
        prop_assert!(item.net_total <= item.gross_total);
        prop_assert!(item.total_with_ipi >= item.net_total);
        prop_assert!(item.total_with_taxes >= item.total_with_ipi);
    }
}

// Property: the order aggregate is the column-wise sum over the items,
// with the IPI column recomputed from the net totals
proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn aggregate_sums_every_column(
        rows in prop::collection::vec(
            (price_strategy(), quantity_strategy(), percent_strategy()),
            0..20,
        ),
    ) {
        let items: Vec<LineItem> = rows
            .into_iter()
            .enumerate()
            .map(|(index, (price, quantity, ipi))| {
                let mut item =
                    LineItem::new(format!("P-{}", index), "Produto", quantity, price);
                item.ipi_percent = ipi;
                recalculate(&mut item);
                item
            })
            .collect();

        let totals = aggregate(&items);
        let gross: Decimal = items.iter().map(|item| item.gross_total).sum();
        let net: Decimal = items.iter().map(|item| item.net_total).sum();
        let with_ipi: Decimal = items.iter().map(|item| item.total_with_ipi).sum();
        let with_taxes: Decimal = items.iter().map(|item| item.total_with_taxes).sum();

        prop_assert_eq!(totals.gross, gross);
        prop_assert_eq!(totals.net, net);
        prop_assert_eq!(totals.ipi, with_ipi - net);
        prop_assert_eq!(totals.with_taxes, with_taxes);
    }
}

// Property: the lenient parsers never panic and only digit-bearing
// input can escape the fallback
proptest! {
    #[test]
    fn lenient_parse_never_panics(input in ".{0,40}") {
        let fallback = dec!(7);
        let parsed = parse_decimal_or(&input, fallback);
        let _ = parse_quantity(&input);

        prop_assert!(
            parsed == fallback || input.chars().any(|c| c.is_ascii_digit()),
            "{:?} parsed to {} without any digits",
            input,
            parsed
        );
    }

    #[test]
    fn formatted_decimals_survive_parsing(units in 0i64..1_000_000, cents in 0i64..100) {
        let expected = Decimal::new(units * 100 + cents, 2);
        let comma = format!("{},{:02}", units, cents);
        let dot = format!("{}.{:02}", units, cents);

        prop_assert_eq!(parse_decimal_or(&comma, Decimal::ZERO), expected);
        prop_assert_eq!(parse_decimal_or(&dot, Decimal::ZERO), expected);
    }
}
