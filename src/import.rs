// 📥 CSV Import - bulk-load income or expense rows into one tax year
//
// Columns: date,description,amount,category[,taxDeductions]
// Every row is validated before anything is written; one bad row aborts the file.

use crate::db::{self, Store};
use crate::entities::{EntityKind, ExpenseRecord, IncomeRecord, NewExpense, NewIncome};
use crate::error::{Error, Result};
use crate::schema::{SchemaValidator, ValidationError};
use crate::view::{TaxYearWindow, DEFAULT_INCOME_CATEGORY};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CsvRow {
    date: String,
    description: String,
    amount: String,
    #[serde(default)]
    category: String,
    #[serde(default)]
    tax_deductions: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ImportedRows {
    Income(Vec<IncomeRecord>),
    Expense(Vec<ExpenseRecord>),
}

impl ImportedRows {
    pub fn len(&self) -> usize {
        match self {
            ImportedRows::Income(rows) => rows.len(),
            ImportedRows::Expense(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportReport {
    pub kind: EntityKind,
    pub year: i32,
    pub inserted: usize,
    pub outside_window: usize,
}

/// Parse and validate a CSV file without touching the database.
pub fn load_csv(path: &Path, kind: EntityKind, year: i32) -> Result<ImportedRows> {
    let file = std::fs::File::open(path)?;
    read_rows(file, kind, year)
}

pub fn read_rows<R: Read>(reader: R, kind: EntityKind, year: i32) -> Result<ImportedRows> {
    if kind == EntityKind::Year {
        return Err(Error::InvalidParameter {
            name: "kind",
            value: kind.to_string(),
        });
    }

    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let validator = SchemaValidator::new();

    let mut errors = Vec::new();
    let mut income = Vec::new();
    let mut expenses = Vec::new();

    for (index, result) in rdr.deserialize::<CsvRow>().enumerate() {
        // Header is line 1
        let line = index + 2;
        let row = result?;
        let context = format!("line {line}");

        let date = parse_date(&row.date, &context, &mut errors);
        let amount = parse_amount("amount", &row.amount, &context, &mut errors);
        let text = |s: &str| Some(s.to_string()).filter(|s| !s.trim().is_empty());

        match kind {
            EntityKind::Income => {
                let tax_deductions = row
                    .tax_deductions
                    .as_deref()
                    .and_then(|raw| parse_amount("taxDeductions", raw, &context, &mut errors));
                let payload = NewIncome {
                    year: Some(year),
                    date,
                    description: text(&row.description),
                    amount,
                    category: text(&row.category).or_else(|| Some(DEFAULT_INCOME_CATEGORY.to_string())),
                    tax_deductions,
                };
                match validator.validate_income(payload) {
                    Ok(record) => income.push(record),
                    Err(row_errors) => errors.extend(relabel(row_errors, &context)),
                }
            }
            EntityKind::Expense => {
                let payload = NewExpense {
                    year: Some(year),
                    date,
                    description: text(&row.description),
                    amount,
                    category: text(&row.category),
                };
                match validator.validate_expense(payload) {
                    Ok(record) => expenses.push(record),
                    Err(row_errors) => errors.extend(relabel(row_errors, &context)),
                }
            }
            EntityKind::Year => {}
        }
    }

    if !errors.is_empty() {
        return Err(Error::Validation(errors));
    }

    Ok(match kind {
        EntityKind::Income => ImportedRows::Income(income),
        _ => ImportedRows::Expense(expenses),
    })
}

/// Load, validate and insert a CSV file inside a single transaction.
pub fn import_file(store: &Store, path: &Path, kind: EntityKind, year: i32) -> Result<ImportReport> {
    let rows = load_csv(path, kind, year)?;
    import_rows(store, rows, year)
}

pub fn import_rows(store: &Store, rows: ImportedRows, year: i32) -> Result<ImportReport> {
    let window = TaxYearWindow::for_year(year);
    let outside = |date: NaiveDate| window.is_some_and(|w| !w.contains(date));

    store.with_conn(|conn| {
        let tx = conn.unchecked_transaction()?;

        let (kind, inserted, outside_window) = match &rows {
            ImportedRows::Income(records) => {
                for record in records {
                    db::insert_income(&tx, record)?;
                }
                let stray = records.iter().filter(|r| outside(r.date)).count();
                (EntityKind::Income, records.len(), stray)
            }
            ImportedRows::Expense(records) => {
                for record in records {
                    db::insert_expense(&tx, record)?;
                }
                let stray = records.iter().filter(|r| outside(r.date)).count();
                (EntityKind::Expense, records.len(), stray)
            }
        };

        tx.commit()?;

        if outside_window > 0 {
            warn!(year, outside_window, "imported rows dated outside the tax year");
        }
        info!(%kind, year, inserted, "csv import complete");

        Ok(ImportReport {
            kind,
            year,
            inserted,
            outside_window,
        })
    })
}

fn parse_date(raw: &str, context: &str, errors: &mut Vec<ValidationError>) -> Option<NaiveDate> {
    if raw.is_empty() {
        return None;
    }
    match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        Ok(date) => Some(date),
        Err(_) => {
            errors.push(ValidationError::new("date", format!("Expected YYYY-MM-DD, got {raw}"), context));
            None
        }
    }
}

fn parse_amount(field: &str, raw: &str, context: &str, errors: &mut Vec<ValidationError>) -> Option<Decimal> {
    let cleaned: String = raw.chars().filter(|c| !matches!(c, ',' | '$' | '£')).collect();
    if cleaned.is_empty() {
        return None;
    }
    match cleaned.parse::<Decimal>() {
        Ok(value) => Some(value),
        Err(_) => {
            errors.push(ValidationError::new(field, format!("Not a number: {raw}"), context));
            None
        }
    }
}

fn relabel(errors: Vec<ValidationError>, context: &str) -> Vec<ValidationError> {
    errors
        .into_iter()
        .map(|e| ValidationError::new(&e.field, e.message, context))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const INCOME_CSV: &str = "\
date,description,amount,category,taxDeductions
2023-05-01,May pay,\"1,000.00\",Salary,100
2023-06-01,Freelance,250.5,,
";

    const EXPENSE_CSV: &str = "\
date,description,amount,category
2023-05-03,Rent,500,Housing
2024-05-03,Late bill,20,Utilities
";

    #[test]
    fn test_read_income_rows() {
        let rows = read_rows(INCOME_CSV.as_bytes(), EntityKind::Income, 2024).unwrap();
        let ImportedRows::Income(records) = rows else {
            panic!("expected income rows");
        };
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].amount, Decimal::new(100000, 2));
        assert_eq!(records[0].tax_deductions, Decimal::from(100));
        assert_eq!(records[1].tax_deductions, Decimal::ZERO);
        assert_eq!(records[1].category, "Salary");
    }

    #[test]
    fn test_bad_row_rejects_whole_file() {
        let csv = "date,description,amount,category\n2023-05-03,Rent,500,Housing\nyesterday,,abc,Misc\n";
        let err = read_rows(csv.as_bytes(), EntityKind::Expense, 2024).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("line 3"));
        assert!(message.contains("date"));
        assert!(message.contains("amount"));
    }

    #[test]
    fn test_year_kind_rejected() {
        let err = read_rows(EXPENSE_CSV.as_bytes(), EntityKind::Year, 2024).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { name: "kind", .. }));
    }

    #[test]
    fn test_import_rows_into_store() {
        let store = Store::open_in_memory().unwrap();
        let rows = read_rows(EXPENSE_CSV.as_bytes(), EntityKind::Expense, 2024).unwrap();

        let report = import_rows(&store, rows, 2024).unwrap();
        assert_eq!(report.inserted, 2);
        assert_eq!(report.outside_window, 1);
        assert_eq!(store.list_expenses(Some(2024)).unwrap().len(), 2);
    }

    #[test]
    fn test_import_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("income.csv");
        std::fs::write(&path, INCOME_CSV).unwrap();

        let store = Store::open_in_memory().unwrap();
        let report = import_file(&store, &path, EntityKind::Income, 2024).unwrap();
        assert_eq!(report.kind, EntityKind::Income);
        assert_eq!(report.inserted, 2);
        assert_eq!(store.list_income(Some(2024)).unwrap().len(), 2);
    }
}
