// 📐 Shape Layer - Schema Validation
// Turns unvalidated create payloads into records the store can persist

use crate::entities::{ExpenseRecord, IncomeRecord, NewExpense, NewIncome, NewYear, Year};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

/// Smallest and largest `year` values accepted for a tax year
pub const MIN_TAX_YEAR: i32 = 1900;
pub const MAX_TAX_YEAR: i32 = 9999;

/// Largest `amount` or `taxDeductions` accepted on a single record (one trillion).
///
/// Keeps every per-year sum far inside `Decimal`'s range.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(3_567_587_328, 232, 0, false, 0);

// ============================================================================
// VALIDATION RESULT
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
    pub context: String,
}

impl ValidationError {
    pub fn new(field: &str, message: impl Into<String>, context: &str) -> Self {
        ValidationError {
            field: field.to_string(),
            message: message.into(),
            context: context.to_string(),
        }
    }

    pub fn required(field: &str, context: &str) -> Self {
        Self::new(field, "Required field is missing", context)
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.context, self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

pub type ValidationResult<T> = Result<T, Vec<ValidationError>>;

// ============================================================================
// SCHEMA VALIDATOR
// ============================================================================

/// Checks create payloads and assigns the server-side identity.
#[derive(Debug, Default, Clone, Copy)]
pub struct SchemaValidator;

impl SchemaValidator {
    pub fn new() -> Self {
        SchemaValidator
    }

    /// Validate a Year payload. Uniqueness is enforced by the store.
    pub fn validate_year(&self, payload: &NewYear) -> ValidationResult<Year> {
        let mut errors = Vec::new();
        let year = check_year(payload.year, "Year", &mut errors);

        match year {
            Some(year) if errors.is_empty() => Ok(Year::new(year)),
            _ => Err(errors),
        }
    }

    pub fn validate_income(&self, payload: NewIncome) -> ValidationResult<IncomeRecord> {
        let context = "Income";
        let mut errors = Vec::new();

        let year = check_year(payload.year, context, &mut errors);
        let date = check_date(payload.date, context, &mut errors);
        let description = check_text("description", payload.description, context, &mut errors);
        let amount = check_amount("amount", payload.amount, context, &mut errors);
        let category = check_text("category", payload.category, context, &mut errors);
        let tax_deductions = check_amount(
            "taxDeductions",
            Some(payload.tax_deductions.unwrap_or(Decimal::ZERO)),
            context,
            &mut errors,
        );

        match (year, date, description, amount, category, tax_deductions) {
            (Some(year), Some(date), Some(description), Some(amount), Some(category), Some(tax_deductions))
                if errors.is_empty() =>
            {
                Ok(IncomeRecord {
                    id: Uuid::new_v4(),
                    year,
                    date,
                    description,
                    amount,
                    category,
                    tax_deductions,
                })
            }
            _ => Err(errors),
        }
    }

    pub fn validate_expense(&self, payload: NewExpense) -> ValidationResult<ExpenseRecord> {
        let context = "Expense";
        let mut errors = Vec::new();

        let year = check_year(payload.year, context, &mut errors);
        let date = check_date(payload.date, context, &mut errors);
        let description = check_text("description", payload.description, context, &mut errors);
        let amount = check_amount("amount", payload.amount, context, &mut errors);
        let category = check_text("category", payload.category, context, &mut errors);

        match (year, date, description, amount, category) {
            (Some(year), Some(date), Some(description), Some(amount), Some(category))
                if errors.is_empty() =>
            {
                Ok(ExpenseRecord {
                    id: Uuid::new_v4(),
                    year,
                    date,
                    description,
                    amount,
                    category,
                })
            }
            _ => Err(errors),
        }
    }
}

// ============================================================================
// FIELD CHECKS
// ============================================================================

fn check_year(value: Option<i32>, context: &str, errors: &mut Vec<ValidationError>) -> Option<i32> {
    match value {
        None => {
            errors.push(ValidationError::required("year", context));
            None
        }
        Some(year) if !(MIN_TAX_YEAR..=MAX_TAX_YEAR).contains(&year) => {
            errors.push(ValidationError::new(
                "year",
                format!("Must be between {} and {}, got {}", MIN_TAX_YEAR, MAX_TAX_YEAR, year),
                context,
            ));
            None
        }
        Some(year) => Some(year),
    }
}

fn check_date(
    value: Option<NaiveDate>,
    context: &str,
    errors: &mut Vec<ValidationError>,
) -> Option<NaiveDate> {
    if value.is_none() {
        errors.push(ValidationError::required("date", context));
    }
    value
}

fn check_text(
    field: &str,
    value: Option<String>,
    context: &str,
    errors: &mut Vec<ValidationError>,
) -> Option<String> {
    match value.map(|s| s.trim().to_string()) {
        Some(s) if !s.is_empty() => Some(s),
        Some(_) => {
            errors.push(ValidationError::new(field, "Required field is empty", context));
            None
        }
        None => {
            errors.push(ValidationError::required(field, context));
            None
        }
    }
}

fn check_amount(
    field: &str,
    value: Option<Decimal>,
    context: &str,
    errors: &mut Vec<ValidationError>,
) -> Option<Decimal> {
    match value {
        None => {
            errors.push(ValidationError::required(field, context));
            None
        }
        Some(amount) if amount.is_sign_negative() && !amount.is_zero() => {
            errors.push(ValidationError::new(
                field,
                format!("Must not be negative, got {}", amount),
                context,
            ));
            None
        }
        Some(amount) if amount > MAX_AMOUNT => {
            errors.push(ValidationError::new(
                field,
                format!("Must not exceed {}, got {}", MAX_AMOUNT, amount),
                context,
            ));
            None
        }
        Some(amount) => Some(amount.normalize()),
    }
}
