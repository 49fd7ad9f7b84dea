//! Chart of accounts.
//!
//! Maps line-item categories to income/liability accounts, to the matching
//! receivable sub-account, and to a payment priority. Static configuration,
//! never ledger state.

use serde::Serialize;

use super::entry::AccountType;
use crate::invoice::LineItemCategory;

/// An account in the chart of accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Account {
    /// Display name.
    pub name: &'static str,
    /// Account code.
    pub code: &'static str,
    /// Classification.
    pub account_type: AccountType,
}

impl Account {
    /// Creates an account.
    #[must_use]
    pub const fn new(name: &'static str, code: &'static str, account_type: AccountType) -> Self {
        Self {
            name,
            code,
            account_type,
        }
    }
}

/// Standard property-management accounts.
pub mod accounts {
    use super::{Account, AccountType};

    /// Cash on hand and in bank.
    pub const CASH: Account = Account::new("Cash", "1000", AccountType::Asset);
    /// Generic receivable, used when a category has no sub-account.
    pub const ACCOUNTS_RECEIVABLE: Account =
        Account::new("Accounts Receivable", "1100", AccountType::Asset);
    /// Rent receivable.
    pub const AR_RENT: Account = Account::new("AR - Rent", "1110", AccountType::Asset);
    /// Utility receivable.
    pub const AR_UTILITIES: Account = Account::new("AR - Utilities", "1120", AccountType::Asset);
    /// Maintenance receivable.
    pub const AR_MAINTENANCE: Account =
        Account::new("AR - Maintenance", "1130", AccountType::Asset);
    /// Deposit receivable.
    pub const AR_DEPOSITS: Account = Account::new("AR - Deposits", "1140", AccountType::Asset);
    /// Capitalised equipment and improvements.
    pub const EQUIPMENT: Account = Account::new("Equipment", "1500", AccountType::Asset);
    /// Depreciation accumulated against equipment.
    pub const ACCUMULATED_DEPRECIATION: Account =
        Account::new("Accumulated Depreciation", "1510", AccountType::ContraAsset);
    /// Security deposits owed back to tenants.
    pub const SECURITY_DEPOSITS: Account =
        Account::new("Security Deposits Held", "2100", AccountType::Liability);
    /// Taxes collected for remittance.
    pub const TAX_PAYABLE: Account =
        Account::new("Sales Tax Payable", "2200", AccountType::Liability);
    /// Loan repayments collected.
    pub const LOAN_PAYABLE: Account = Account::new("Loan Payable", "2300", AccountType::Liability);
    /// Money owed back to tenants from overpayment or waived charges.
    pub const TENANT_CREDIT: Account =
        Account::new("Tenant Credit / Prepaid Rent", "2400", AccountType::Liability);
    /// Owner contributions.
    pub const OWNER_EQUITY: Account = Account::new("Owner Equity", "3000", AccountType::Equity);
    /// Rent earned.
    pub const RENTAL_INCOME: Account = Account::new("Rental Income", "4000", AccountType::Income);
    /// Utilities re-billed.
    pub const UTILITY_INCOME: Account =
        Account::new("Utility Income", "4100", AccountType::Income);
    /// Maintenance charges and deposit deductions.
    pub const MAINTENANCE_INCOME: Account =
        Account::new("Maintenance Income", "4200", AccountType::Income);
    /// Miscellaneous charges.
    pub const OTHER_INCOME: Account = Account::new("Other Income", "4900", AccountType::Income);
    /// Periodic depreciation.
    pub const DEPRECIATION_EXPENSE: Account =
        Account::new("Depreciation Expense", "5100", AccountType::Expense);
    /// Charges waived in the tenant's favour.
    pub const TENANT_CONCESSIONS: Account =
        Account::new("Tenant Concessions", "5200", AccountType::Expense);

    /// Every standard account, in code order.
    pub const ALL: [Account; 19] = [
        CASH,
        ACCOUNTS_RECEIVABLE,
        AR_RENT,
        AR_UTILITIES,
        AR_MAINTENANCE,
        AR_DEPOSITS,
        EQUIPMENT,
        ACCUMULATED_DEPRECIATION,
        SECURITY_DEPOSITS,
        TAX_PAYABLE,
        LOAN_PAYABLE,
        TENANT_CREDIT,
        OWNER_EQUITY,
        RENTAL_INCOME,
        UTILITY_INCOME,
        MAINTENANCE_INCOME,
        OTHER_INCOME,
        DEPRECIATION_EXPENSE,
        TENANT_CONCESSIONS,
    ];
}

/// Category to account resolution.
///
/// The fixed accounts have defaults so an injected chart only has to map
/// categories.
pub trait ChartOfAccounts: Send + Sync {
    /// Income or liability account credited when a category is billed.
    fn resolve(&self, category: LineItemCategory) -> Account;

    /// Receivable sub-account debited when a category is billed.
    fn resolve_ar_for(&self, category: LineItemCategory) -> Account;

    /// Waterfall rank, lower is paid first. `None` is never allocated.
    fn priority_rank(&self, category: LineItemCategory) -> Option<u8>;

    /// Looks up a standard account by code.
    fn account_by_code(&self, code: &str) -> Option<Account> {
        accounts::ALL.iter().copied().find(|a| a.code == code)
    }

    /// Returns true for the generic receivable and every category sub-account.
    fn is_receivable(&self, code: &str) -> bool {
        self.receivable().code == code
            || LineItemCategory::ALL
                .iter()
                .any(|&category| self.resolve_ar_for(category).code == code)
    }

    /// Cash account.
    fn cash(&self) -> Account {
        accounts::CASH
    }

    /// Generic receivable.
    fn receivable(&self) -> Account {
        accounts::ACCOUNTS_RECEIVABLE
    }

    /// Tenant credit liability.
    fn tenant_credit(&self) -> Account {
        accounts::TENANT_CREDIT
    }

    /// Deposit liability.
    fn deposit_liability(&self) -> Account {
        accounts::SECURITY_DEPOSITS
    }

    /// Tax collected on invoices.
    fn tax_payable(&self) -> Account {
        accounts::TAX_PAYABLE
    }

    /// Income recognised from deposit deductions.
    fn deduction_income(&self) -> Account {
        accounts::MAINTENANCE_INCOME
    }

    /// Default asset account for capital expenditure.
    fn equipment(&self) -> Account {
        accounts::EQUIPMENT
    }

    /// Depreciation expense.
    fn depreciation_expense(&self) -> Account {
        accounts::DEPRECIATION_EXPENSE
    }

    /// Contra-asset offsetting equipment.
    fn accumulated_depreciation(&self) -> Account {
        accounts::ACCUMULATED_DEPRECIATION
    }

    /// Expense for waived charges.
    fn concessions(&self) -> Account {
        accounts::TENANT_CONCESSIONS
    }
}

/// The standard property-management chart.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardChart;

impl ChartOfAccounts for StandardChart {
    fn resolve(&self, category: LineItemCategory) -> Account {
        match category {
            LineItemCategory::Rent => accounts::RENTAL_INCOME,
            LineItemCategory::Utility => accounts::UTILITY_INCOME,
            LineItemCategory::Maintenance => accounts::MAINTENANCE_INCOME,
            LineItemCategory::Deposit => accounts::SECURITY_DEPOSITS,
            LineItemCategory::Taxes => accounts::TAX_PAYABLE,
            LineItemCategory::Loan => accounts::LOAN_PAYABLE,
            LineItemCategory::Investment => accounts::OWNER_EQUITY,
            LineItemCategory::Misc => accounts::OTHER_INCOME,
            // Already receivable on the original invoice; a reversal nets to zero.
            LineItemCategory::BalanceBroughtForward => accounts::ACCOUNTS_RECEIVABLE,
        }
    }

    fn resolve_ar_for(&self, category: LineItemCategory) -> Account {
        match category {
            LineItemCategory::Rent => accounts::AR_RENT,
            LineItemCategory::Utility => accounts::AR_UTILITIES,
            LineItemCategory::Maintenance => accounts::AR_MAINTENANCE,
            LineItemCategory::Deposit => accounts::AR_DEPOSITS,
            LineItemCategory::Taxes
            | LineItemCategory::Loan
            | LineItemCategory::Investment
            | LineItemCategory::Misc
            | LineItemCategory::BalanceBroughtForward => accounts::ACCOUNTS_RECEIVABLE,
        }
    }

    fn priority_rank(&self, category: LineItemCategory) -> Option<u8> {
        match category {
            LineItemCategory::Rent => Some(1),
            LineItemCategory::Utility => Some(2),
            LineItemCategory::Maintenance | LineItemCategory::Misc => Some(3),
            LineItemCategory::Taxes | LineItemCategory::Loan | LineItemCategory::Investment => {
                Some(4)
            }
            LineItemCategory::Deposit => Some(5),
            LineItemCategory::BalanceBroughtForward => None,
        }
    }
}
