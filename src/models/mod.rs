// Core models
pub mod discounts;
pub mod line_item;
pub mod order;
pub mod price_table;

// Re-export commonly used types
pub use discounts::{DiscountSchedule, TIER_COUNT};
pub use line_item::{ItemKey, LineItem};
pub use order::{FreightType, NegotiatedTerms, OrderHeader, OrderStatus, OrderTotals, SyncTotals};
pub use price_table::{PriceTableEntry, PriceTableIndex, PriceTableRef};
