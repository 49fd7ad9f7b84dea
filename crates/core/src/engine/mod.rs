//! Async ledger engine and its storage seam.
//!
//! - `store` - the `LedgerStore` trait, batches and entry filters
//! - `service` - issuance, payments, line-item edits, cache sync
//! - `credit` - tenant credit, deposit refunds, capex and depreciation
//! - `reconcile` - cache drift repair

pub mod credit;
pub mod reconcile;
pub mod service;
pub mod settings;
pub mod store;

pub use credit::{CreditApplication, JournalOutcome};
pub use reconcile::ReconcileReport;
pub use service::{LedgerEngine, PaymentOutcome, PostingOutcome, SyncOutcome};
pub use settings::LedgerSettings;
pub use store::{EntryFilter, InvoiceWrite, LedgerStore, PostingBatch, StoreError};
