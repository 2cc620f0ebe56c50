use rust_decimal::Decimal;

/// Applies a sequence of percentage discounts to `base`, in order.
///
/// Each step above zero multiplies the running value by `1 - step/100`;
/// zero and negative steps are skipped, so an unused slot can never turn
/// into a markup. There is no upper bound: a step above 100 computes
/// literally and can push the result to zero or below.
///
/// `Decimal` keeps these products exact at catalog scales, so no
/// intermediate rounding is applied.
pub fn cascade(base: Decimal, steps: impl IntoIterator<Item = Decimal>) -> Decimal {
    steps.into_iter().fold(base, |net, step| {
        if step > Decimal::ZERO {
            net * (Decimal::ONE - step / Decimal::ONE_HUNDRED)
        } else {
            net
        }
    })
}
