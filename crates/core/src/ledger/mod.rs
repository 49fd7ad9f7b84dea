//! Double-entry bookkeeping logic.
//!
//! This module implements the core ledger functionality:
//! - Ledger entries and the chart of accounts
//! - Batch balance validation
//! - Posting builders for every ledger-affecting event
//! - Priority waterfall allocation of payments
//! - Reversing entries
//! - Error types for ledger operations

pub mod allocation;
pub mod chart;
pub mod entry;
pub mod error;
pub mod posting;
pub mod reversal;
pub mod validation;

#[cfg(test)]
mod allocation_props;
#[cfg(test)]
mod validation_props;

pub use allocation::{Allocation, AllocationTarget, PaymentWaterfall, WaterfallResult};
pub use chart::{Account, ChartOfAccounts, StandardChart, accounts};
pub use entry::{AccountType, EntryType, LedgerEntry, TransactionType};
pub use error::LedgerError;
pub use posting::{Journal, PostingContext, PostingService};
pub use reversal::ReversalService;
pub use validation::{EntryTotals, validate_balance};
