use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Number of sequential discount tiers on an item or order header.
pub const TIER_COUNT: usize = 9;

/// The full discount schedule of a line item.
///
/// Discounts apply as a cascade in a fixed order: tiers 1 through 9, then
/// the special discount, then the additional discount. Values are
/// percentages; zero means the slot is unused. Values above 100 are kept
/// as entered and compute literally.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscountSchedule {
    /// Tiers 1..9, applied in index order.
    #[serde(default)]
    pub tiers: [Decimal; TIER_COUNT],
    /// Special discount (ESP), applied after the nine tiers.
    #[serde(default)]
    pub special: Decimal,
    /// Additional discount (ADD), applied last.
    #[serde(default)]
    pub additional: Decimal,
}

impl DiscountSchedule {
    pub fn from_tiers(tiers: [Decimal; TIER_COUNT]) -> Self {
        Self {
            tiers,
            ..Self::default()
        }
    }

    /// All percentages in cascade application order.
    pub fn cascade_steps(&self) -> impl Iterator<Item = Decimal> + '_ {
        self.tiers
            .iter()
            .copied()
            .chain([self.special, self.additional])
    }

    /// Zeroes the nine tiers and the additional discount.
    ///
    /// This is the promotional-item override; the special discount is
    /// deliberately left in place.
    pub fn clear_for_promotion(&mut self) {
        self.tiers = [Decimal::ZERO; TIER_COUNT];
        self.additional = Decimal::ZERO;
    }

    pub fn is_empty(&self) -> bool {
        self.cascade_steps().all(|d| d <= Decimal::ZERO)
    }

    /// Human-readable summary of the active discounts.
    ///
    /// Positive values are rendered in application order as `"{:.2}%"`
    /// joined with `+`; zero slots are omitted entirely.
    pub fn summary(&self) -> String {
        let parts: Vec<String> = self
            .cascade_steps()
            .filter(|d| *d > Decimal::ZERO)
            .map(|d| format!("{:.2}%", d))
            .collect();
        parts.join("+")
    }
}
