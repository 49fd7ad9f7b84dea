//! Invoice document model.
//!
//! - `line_item` - Billable components and their categories
//! - `types` - The invoice document, statuses and audit trail
//! - `projection` - Payment cache derived from the ledger

pub mod line_item;
pub mod projection;
pub mod types;

#[cfg(test)]
mod projection_props;

pub use line_item::{InvoiceLineItem, LineItemCategory, LineItemMeta};
pub use projection::PaymentProjection;
pub use types::{AuditAction, AuditRecord, DepositAction, Invoice, InvoiceMeta, InvoiceStatus};
