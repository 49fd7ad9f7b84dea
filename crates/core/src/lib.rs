//! Core ledger logic for Rentbook.
//!
//! This crate contains the double-entry ledger and invoice payment engine with
//! ZERO storage backend dependencies. Persistence is reached through the
//! [`engine::LedgerStore`] trait.
//!
//! # Modules
//!
//! - `ledger` - Ledger entries, chart of accounts, posting builders and validation
//! - `invoice` - Invoices, line items and the payment-status projection
//! - `engine` - Async orchestration of postings against a store

pub mod engine;
pub mod invoice;
pub mod ledger;

pub use engine::{LedgerEngine, LedgerSettings, LedgerStore};
pub use ledger::LedgerError;
