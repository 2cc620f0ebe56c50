//! SalesMasters Pricing Library
//!
//! This crate provides the order pricing core used by the SalesMasters
//! sales-rep tooling: the cascading discount calculation, IPI and ST tax
//! compounding, order-total aggregation, the named batch update
//! operations and the in-memory order session with its staging buffer
//! and persistence-sync boundary.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod commands;
pub mod common;
pub mod config;
pub mod errors;
pub mod events;
pub mod models;
pub mod pricing;
pub mod session;
pub mod sources;

pub use errors::ServiceError;
pub use models::{
    DiscountSchedule, FreightType, ItemKey, LineItem, NegotiatedTerms, OrderHeader, OrderStatus,
    OrderTotals, PriceTableEntry, PriceTableIndex, PriceTableRef, SyncTotals, TIER_COUNT,
};
pub use session::{OrderSession, SessionState};

pub mod prelude {
    pub use crate::commands::*;
    pub use crate::errors::*;
    pub use crate::events::*;
    pub use crate::models::*;
    pub use crate::pricing::*;
    pub use crate::session::*;
    pub use crate::sources::*;
}
