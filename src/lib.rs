// Tax Records - Core Library
// Exposes all modules for use in the CLI, the TUI, the API server, and tests

pub mod error;
pub mod config;
pub mod logging;
pub mod entities;   // Year, Income, Expense
pub mod schema;     // Create-payload validation
pub mod db;         // Record Store
pub mod summary;    // Aggregation Engine
pub mod users;
pub mod view;       // View/Form Layer state
pub mod import;

#[cfg(feature = "server")]
pub mod api;        // CRUD Gateway

// Re-export commonly used types
pub use error::{Error, ErrorClass, Result};
pub use config::Config;
pub use db::{setup_database, verify_count, Store};
pub use entities::{
    EntityKind, ExpenseRecord, IncomeRecord, LineItem,
    NewExpense, NewIncome, NewYear, TaxYearLabel, Year,
};
pub use schema::{SchemaValidator, ValidationError, ValidationResult};
pub use summary::{compute_totals, Totals, YearSummary};
pub use view::TaxYearWindow;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
