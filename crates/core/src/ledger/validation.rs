//! Balance validation for posting batches.
//!
//! Every batch of entries written together must balance. This runs before
//! every write, so a failing batch never reaches the store.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::entry::LedgerEntry;
use super::error::LedgerError;

/// Debit and credit sums over a set of entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryTotals {
    /// Sum of debits.
    pub debit: Decimal,
    /// Sum of credits.
    pub credit: Decimal,
}

impl EntryTotals {
    /// Sums debits and credits over entries.
    pub fn of<'a>(entries: impl IntoIterator<Item = &'a LedgerEntry>) -> Self {
        entries.into_iter().fold(Self::default(), |mut acc, e| {
            acc.add(e);
            acc
        })
    }

    /// Adds one entry.
    pub fn add(&mut self, entry: &LedgerEntry) {
        self.debit += entry.debit;
        self.credit += entry.credit;
    }

    /// `debit - credit`.
    #[must_use]
    pub fn net_debit(&self) -> Decimal {
        self.debit - self.credit
    }

    /// `credit - debit`.
    #[must_use]
    pub fn net_credit(&self) -> Decimal {
        self.credit - self.debit
    }

    /// Returns true if both sums agree exactly.
    #[must_use]
    pub fn is_balanced(&self) -> bool {
        self.debit == self.credit
    }
}

/// Validates that a batch of entries is balanced.
///
/// Each entry must be non-negative and one-sided; the batch debit total must
/// equal the credit total exactly. Amounts are rounded when legs are built,
/// so no tolerance is applied here. An empty batch is balanced.
///
/// # Errors
///
/// Returns `InvalidArgument` for a malformed entry and `Imbalance` if the sums differ.
pub fn validate_balance(entries: &[LedgerEntry]) -> Result<EntryTotals, LedgerError> {
    for entry in entries {
        if entry.debit < Decimal::ZERO || entry.credit < Decimal::ZERO {
            return Err(LedgerError::InvalidArgument(format!(
                "entry on {} has a negative amount",
                entry.account
            )));
        }
        if entry.entry_type().is_none() {
            return Err(LedgerError::InvalidArgument(format!(
                "entry on {} must have exactly one non-zero side",
                entry.account
            )));
        }
    }

    let totals = EntryTotals::of(entries);
    if !totals.is_balanced() {
        return Err(LedgerError::Imbalance {
            debit: totals.debit,
            credit: totals.credit,
        });
    }

    Ok(totals)
}
