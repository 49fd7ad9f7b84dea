//! Invoice line items.

use chrono::{DateTime, Utc};
use rentbook_shared::types::LineItemId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Billable category of a line item.
///
/// Drives account resolution, payment priority and removal protection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineItemCategory {
    /// Monthly rent.
    Rent,
    /// Security deposit.
    Deposit,
    /// Maintenance charge.
    Maintenance,
    /// Metered or flat utility.
    #[serde(alias = "utilities")]
    Utility,
    /// Pass-through taxes.
    Taxes,
    /// Investment contribution.
    Investment,
    /// Loan repayment.
    Loan,
    /// Anything else.
    Misc,
    /// Unpaid balance rolled forward from earlier invoices.
    BalanceBroughtForward,
}

impl LineItemCategory {
    /// Every category.
    pub const ALL: [Self; 9] = [
        Self::Rent,
        Self::Deposit,
        Self::Maintenance,
        Self::Utility,
        Self::Taxes,
        Self::Investment,
        Self::Loan,
        Self::Misc,
        Self::BalanceBroughtForward,
    ];

    /// Returns the canonical lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Rent => "rent",
            Self::Deposit => "deposit",
            Self::Maintenance => "maintenance",
            Self::Utility => "utility",
            Self::Taxes => "taxes",
            Self::Investment => "investment",
            Self::Loan => "loan",
            Self::Misc => "misc",
            Self::BalanceBroughtForward => "balance_brought_forward",
        }
    }
}

impl std::fmt::Display for LineItemCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bookkeeping attached to a line item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LineItemMeta {
    /// Added after issuance through the engine.
    #[serde(default)]
    pub added_manually: bool,
    /// Why it was added.
    pub reason: Option<String>,
    /// When it was added.
    pub added_at: Option<DateTime<Utc>>,
    /// Caller-defined extras.
    #[serde(default)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// One billable component of an invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceLineItem {
    /// Stable identifier within the invoice.
    pub id: LineItemId,
    /// Description shown on the invoice.
    pub description: String,
    /// Billable category.
    pub category: LineItemCategory,
    /// Utility name for utility items (e.g. `water`).
    pub utility_name: Option<String>,
    /// Line amount (never negative).
    pub amount: Decimal,
    /// Quantity billed.
    pub quantity: Decimal,
    /// Metered usage units, for utilities.
    pub usage_units: Option<Decimal>,
    /// Price per unit.
    pub unit_price: Option<Decimal>,
    /// Already posted on an earlier invoice and carried here for display.
    #[serde(default)]
    pub is_balance_forwarded: bool,
    /// Free-form bookkeeping.
    #[serde(default)]
    pub meta: LineItemMeta,
}

impl InvoiceLineItem {
    /// Creates a line item with quantity one.
    #[must_use]
    pub fn new(category: LineItemCategory, description: impl Into<String>, amount: Decimal) -> Self {
        Self {
            id: LineItemId::new(),
            description: description.into(),
            category,
            utility_name: None,
            amount,
            quantity: Decimal::ONE,
            usage_units: None,
            unit_price: None,
            is_balance_forwarded: category == LineItemCategory::BalanceBroughtForward,
            meta: LineItemMeta::default(),
        }
    }

    /// Creates a metered utility line priced at `usage_units * unit_price`.
    #[must_use]
    pub fn metered_utility(
        utility_name: impl Into<String>,
        usage_units: Decimal,
        unit_price: Decimal,
    ) -> Self {
        let utility_name = utility_name.into();
        let mut item = Self::new(
            LineItemCategory::Utility,
            format!("{utility_name} usage"),
            usage_units * unit_price,
        );
        item.utility_name = Some(utility_name);
        item.usage_units = Some(usage_units);
        item.unit_price = Some(unit_price);
        item
    }

    /// Sets the utility name.
    #[must_use]
    pub fn with_utility_name(mut self, name: impl Into<String>) -> Self {
        self.utility_name = Some(name.into());
        self
    }

    /// Marks the item as carried forward from an earlier invoice.
    #[must_use]
    pub fn balance_forwarded(mut self) -> Self {
        self.is_balance_forwarded = true;
        self
    }

    /// Returns true if removal requires an explicit override.
    #[must_use]
    pub fn is_protected(&self) -> bool {
        self.category == LineItemCategory::BalanceBroughtForward
    }

    /// Returns true if payments may be allocated to this item.
    #[must_use]
    pub fn is_allocatable(&self) -> bool {
        !self.is_balance_forwarded && self.category != LineItemCategory::BalanceBroughtForward
    }

    /// Category string written on ledger entries, e.g. `utility_water`.
    #[must_use]
    pub fn ledger_category(&self) -> String {
        match (self.category, self.utility_name.as_deref()) {
            (LineItemCategory::Utility, Some(name)) if !name.trim().is_empty() => {
                format!("utility_{}", name.trim().to_lowercase().replace(' ', "_"))
            }
            (category, _) => category.as_str().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_category_aliases() {
        let utility: LineItemCategory = serde_json::from_str("\"utilities\"").unwrap();
        assert_eq!(utility, LineItemCategory::Utility);
        let utility: LineItemCategory = serde_json::from_str("\"utility\"").unwrap();
        assert_eq!(utility, LineItemCategory::Utility);
        let bbf: LineItemCategory = serde_json::from_str("\"balance_brought_forward\"").unwrap();
        assert_eq!(bbf, LineItemCategory::BalanceBroughtForward);
        assert!(serde_json::from_str::<LineItemCategory>("\"parking\"").is_err());
    }

    #[test]
    fn test_ledger_category() {
        let water = InvoiceLineItem::new(LineItemCategory::Utility, "Water", dec!(20))
            .with_utility_name("Water");
        assert_eq!(water.ledger_category(), "utility_water");

        let flat = InvoiceLineItem::new(LineItemCategory::Utility, "Utilities", dec!(20));
        assert_eq!(flat.ledger_category(), "utility");

        let rent = InvoiceLineItem::new(LineItemCategory::Rent, "Rent", dec!(1000));
        assert_eq!(rent.ledger_category(), "rent");
    }

    #[test]
    fn test_metered_utility_amount() {
        let item = InvoiceLineItem::metered_utility("electricity", dec!(120), dec!(0.25));
        assert_eq!(item.amount, dec!(30.00));
        assert_eq!(item.ledger_category(), "utility_electricity");
    }

    #[test]
    fn test_balance_forward_flags() {
        let bbf = InvoiceLineItem::new(
            LineItemCategory::BalanceBroughtForward,
            "Balance brought forward",
            dec!(300),
        );
        assert!(bbf.is_balance_forwarded);
        assert!(bbf.is_protected());
        assert!(!bbf.is_allocatable());

        let carried_rent = InvoiceLineItem::new(LineItemCategory::Rent, "March rent", dec!(900))
            .balance_forwarded();
        assert!(!carried_rent.is_protected());
        assert!(!carried_rent.is_allocatable());
    }
}
