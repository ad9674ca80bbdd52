//! Dengo Core - Domain types and business rules.
//!
//! This crate holds everything about the loyalty platform that can be
//! expressed without I/O:
//! - [`types`] - Typed IDs, email addresses, and status enums
//! - [`pricing`] - Line subtotals and sale totals with point discounts
//! - [`loyalty`] - Point accrual and tier promotion
//! - [`promotion`] - Promotion discount and validity window rules
//! - [`reporting`] - Sales summaries and best-seller rankings
//!
//! The API crate enables the `postgres` feature to get `sqlx` encodings for
//! the ID and status types.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod loyalty;
pub mod pricing;
pub mod promotion;
pub mod reporting;
pub mod types;

pub use types::*;
