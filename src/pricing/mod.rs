//! Pure calculation layer: the discount cascade, per-item repricing and
//! order-total aggregation. Everything here is synchronous and
//! infallible; lookups and persistence stay in the session and command
//! layers.

pub mod cascade;
pub mod engine;
pub mod totals;

pub use cascade::cascade;
pub use engine::{recalculate, recalculate_all};
pub use totals::aggregate;
