//! Document store for the ledger engine.
//!
//! This crate provides:
//! - `MemoryStore`, an in-process `LedgerStore` with two collections
//!   (`ledger_entries`, append-only, and `invoices`)
//! - Atomic batch commits with per-invoice version checks

pub mod memory;

pub use memory::MemoryStore;
