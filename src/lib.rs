//! Pharmacy inventory consistency engine
//!
//! Keeps each product's on-hand quantity and expiry dates in step with the
//! stock-in and sale records that move them.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod config;
pub mod db;
pub mod engine;
pub mod entities;
pub mod errors;
pub mod migrator;
pub mod services;

pub use engine::InventoryEngine;
pub use entities::product::ExpiryDates;
pub use entities::sale_transaction::{SaleLineItem, SNAPSHOT_VERSION};
pub use errors::{ErrorKind, ServiceError};
pub use services::{SaleLineRequest, StockInRequest};
