// Entity Models - tax years and the line items recorded under them
//
// Each entity has:
// - A single opaque identity (UUID) assigned by the store on create
// - Immutable values (there is no update operation, only create/delete)
// - A `New*` payload type carrying the client's unvalidated fields

pub mod year;
pub mod income;
pub mod expense;

pub use year::{Year, NewYear, TaxYearLabel};
pub use income::{IncomeRecord, NewIncome};
pub use expense::{ExpenseRecord, NewExpense};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

/// Common read access to Income and Expense records.
///
/// Lets the Aggregation Engine and the list views treat both kinds alike.
pub trait LineItem {
    fn id(&self) -> Uuid;
    fn date(&self) -> NaiveDate;
    fn description(&self) -> &str;
    fn category(&self) -> &str;
    fn amount(&self) -> Decimal;
    /// `None` for kinds that carry no deductions
    fn tax_deductions(&self) -> Option<Decimal>;
}

/// The three record collections held by the Record Store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Year,
    Income,
    Expense,
}

impl EntityKind {
    /// SQLite table backing this kind
    pub fn table(&self) -> &'static str {
        match self {
            EntityKind::Year => "years",
            EntityKind::Income => "income",
            EntityKind::Expense => "expenses",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            EntityKind::Year => "Year",
            EntityKind::Income => "Income",
            EntityKind::Expense => "Expense",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
