//! Ledger error types.
//!
//! None of these are retried inside the engine. A failing operation has
//! written nothing: validation always runs before the store is touched.

use rentbook_shared::AppError;
use rentbook_shared::types::{InvoiceId, LineItemId};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::engine::StoreError;
use crate::invoice::InvoiceStatus;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    // ========== Validation Errors ==========
    /// Batch debits and credits differ.
    #[error("Ledger batch is not balanced. Debit: {debit}, Credit: {credit}")]
    Imbalance {
        /// Total debit amount.
        debit: Decimal,
        /// Total credit amount.
        credit: Decimal,
    },

    /// Caller passed an unusable value.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // ========== Lookup Errors ==========
    /// Invoice does not exist.
    #[error("Invoice not found: {0}")]
    InvoiceNotFound(InvoiceId),

    /// Line item does not exist on the invoice.
    #[error("Line item {line_item_id} not found on invoice {invoice_id}")]
    LineItemNotFound {
        /// The invoice searched.
        invoice_id: InvoiceId,
        /// The missing line item.
        line_item_id: LineItemId,
    },

    // ========== Invoice State Errors ==========
    /// Invoice can no longer be edited.
    #[error("Invoice {invoice_id} is {status} and cannot be modified")]
    ImmutableInvoice {
        /// The invoice.
        invoice_id: InvoiceId,
        /// Its current status.
        status: InvoiceStatus,
    },

    /// Balance-forward item removal without override.
    #[error("Line item {0} carries a brought-forward balance and needs an explicit override to remove")]
    ProtectedLineItem(LineItemId),

    // ========== Concurrency Errors ==========
    /// Invoice changed since it was read.
    #[error("Invoice {invoice_id} was modified concurrently: expected version {expected}, found {actual}")]
    ConcurrentModification {
        /// The invoice.
        invoice_id: InvoiceId,
        /// Version the writer read.
        expected: u64,
        /// Version found in the store.
        actual: u64,
    },

    // ========== Storage Errors ==========
    /// Store failure.
    #[error("Store error: {0}")]
    Store(StoreError),
}

impl LedgerError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Imbalance { .. } => "LEDGER_IMBALANCE",
            Self::InvalidArgument(_) => "INVALID_ARGUMENT",
            Self::InvoiceNotFound(_) => "INVOICE_NOT_FOUND",
            Self::LineItemNotFound { .. } => "LINE_ITEM_NOT_FOUND",
            Self::ImmutableInvoice { .. } => "IMMUTABLE_INVOICE",
            Self::ProtectedLineItem(_) => "PROTECTED_LINE_ITEM",
            Self::ConcurrentModification { .. } => "CONCURRENT_MODIFICATION",
            Self::Store(_) => "STORE_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::InvalidArgument(_) => 400,
            Self::InvoiceNotFound(_) | Self::LineItemNotFound { .. } => 404,
            Self::ConcurrentModification { .. } => 409,
            Self::Imbalance { .. } | Self::ImmutableInvoice { .. } | Self::ProtectedLineItem(_) => {
                422
            }
            Self::Store(_) => 500,
        }
    }

    /// Returns true if the caller may retry the operation unchanged.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrentModification { .. })
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        let message = err.to_string();
        match err {
            LedgerError::InvalidArgument(_) => Self::Validation(message),
            LedgerError::InvoiceNotFound(_) | LedgerError::LineItemNotFound { .. } => {
                Self::NotFound(message)
            }
            LedgerError::Imbalance { .. }
            | LedgerError::ImmutableInvoice { .. }
            | LedgerError::ProtectedLineItem(_) => Self::BusinessRule(message),
            LedgerError::ConcurrentModification { .. } => Self::Conflict(message),
            LedgerError::Store(_) => Self::Storage(message),
        }
    }
}
