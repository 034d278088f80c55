// 🖥️ View/Form Layer - presentation state independent of any renderer
//
// List views go `loading -> ready` or `loading -> error`; an error banner
// clears itself after a fixed delay. After a successful create or delete the
// list is reloaded from the store, never patched locally.

use crate::db::Store;
use crate::entities::{ExpenseRecord, IncomeRecord, NewExpense, NewIncome, NewYear, Year};
use crate::error::{Error, Result};
use crate::schema::{SchemaValidator, ValidationError};
use crate::summary::YearSummary;
use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use std::time::{Duration, Instant};
use tracing::debug;
use uuid::Uuid;

/// How long an error banner stays visible unless configured otherwise
pub const DEFAULT_ERROR_DISPLAY: Duration = Duration::from_secs(5);

/// Category pre-filled on new income forms
pub const DEFAULT_INCOME_CATEGORY: &str = "Salary";

// ============================================================================
// LIST VIEW STATE MACHINE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Loading,
    Ready,
    Failed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Banner {
    pub message: String,
    pub raised_at: Instant,
}

#[derive(Debug, Clone)]
pub struct ListView<T> {
    phase: Phase,
    records: Vec<T>,
    banner: Option<Banner>,
    error_ttl: Duration,
}

impl<T> ListView<T> {
    pub fn new(error_ttl: Duration) -> Self {
        ListView {
            phase: Phase::Loading,
            records: Vec::new(),
            banner: None,
            error_ttl,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn records(&self) -> &[T] {
        &self.records
    }

    pub fn banner(&self) -> Option<&Banner> {
        self.banner.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.phase == Phase::Loading
    }

    pub fn begin_load(&mut self) {
        self.phase = Phase::Loading;
    }

    /// Apply the outcome of a fetch started with `begin_load`.
    pub fn finish_load(&mut self, result: Result<Vec<T>>, now: Instant) {
        match result {
            Ok(records) => {
                self.records = records;
                self.phase = Phase::Ready;
            }
            Err(e) => {
                self.phase = Phase::Failed;
                self.raise(e.public_message(), now);
            }
        }
    }

    /// Run `fetch` as a full load cycle.
    pub fn refresh(&mut self, fetch: impl FnOnce() -> Result<Vec<T>>, now: Instant) {
        self.begin_load();
        self.finish_load(fetch(), now);
    }

    /// Show an error without changing the loaded records.
    pub fn raise(&mut self, message: impl Into<String>, now: Instant) {
        self.banner = Some(Banner {
            message: message.into(),
            raised_at: now,
        });
    }

    /// Expire the banner once its display time has passed.
    pub fn tick(&mut self, now: Instant) {
        let expired = self
            .banner
            .as_ref()
            .is_some_and(|b| now.saturating_duration_since(b.raised_at) >= self.error_ttl);

        if expired {
            self.banner = None;
            if self.phase == Phase::Failed {
                self.phase = Phase::Ready;
            }
        }
    }
}

// ============================================================================
// TWO-STEP DELETE
// ============================================================================

/// Delete needs a request followed by an explicit confirm.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeleteConfirm {
    #[default]
    Idle,
    Pending(Uuid),
}

impl DeleteConfirm {
    pub fn request(&mut self, id: Uuid) {
        *self = DeleteConfirm::Pending(id);
    }

    /// Returns the id to delete, if a request was pending.
    pub fn confirm(&mut self) -> Option<Uuid> {
        match std::mem::take(self) {
            DeleteConfirm::Pending(id) => Some(id),
            DeleteConfirm::Idle => None,
        }
    }

    pub fn cancel(&mut self) {
        *self = DeleteConfirm::Idle;
    }

    pub fn pending(&self) -> Option<Uuid> {
        match self {
            DeleteConfirm::Pending(id) => Some(*id),
            DeleteConfirm::Idle => None,
        }
    }
}

// ============================================================================
// TAX YEAR WINDOW
// ============================================================================

/// Dates covered by tax year `Y`: 6 April `Y-1` through 5 April `Y`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaxYearWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl TaxYearWindow {
    pub fn for_year(year: i32) -> Option<Self> {
        Some(TaxYearWindow {
            start: NaiveDate::from_ymd_opt(year.checked_sub(1)?, 4, 6)?,
            end: NaiveDate::from_ymd_opt(year, 4, 5)?,
        })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Latest date a form may accept: the window end, or today if earlier.
    pub fn effective_max(&self, today: NaiveDate) -> NaiveDate {
        today.min(self.end)
    }

    /// Today when it falls inside the window, otherwise the effective maximum.
    pub fn default_date(&self, today: NaiveDate) -> NaiveDate {
        let max = self.effective_max(today);
        if today >= self.start && today <= max {
            today
        } else {
            max
        }
    }

    /// Tax year containing `date`
    pub fn year_of(date: NaiveDate) -> i32 {
        let cutoff = NaiveDate::from_ymd_opt(date.year(), 4, 5);
        match cutoff {
            Some(cutoff) if date > cutoff => date.year() + 1,
            _ => date.year(),
        }
    }
}

// ============================================================================
// RECORD FORM
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormKind {
    Income,
    Expense,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Date,
    Description,
    Category,
    Amount,
    TaxDeductions,
}

impl FormField {
    pub fn label(&self) -> &'static str {
        match self {
            FormField::Date => "Date",
            FormField::Description => "Description",
            FormField::Category => "Category",
            FormField::Amount => "Amount",
            FormField::TaxDeductions => "Tax Deductions",
        }
    }
}

/// Text-entry form for an income or expense record.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordForm {
    pub kind: FormKind,
    pub year: i32,
    pub date: String,
    pub description: String,
    pub category: String,
    pub amount: String,
    pub tax_deductions: String,
    focus: usize,
    default_date: NaiveDate,
}

impl RecordForm {
    pub fn new(kind: FormKind, year: i32, today: NaiveDate) -> Self {
        let default_date = TaxYearWindow::for_year(year)
            .map(|w| w.default_date(today))
            .unwrap_or(today);

        RecordForm {
            kind,
            year,
            date: default_date.to_string(),
            description: String::new(),
            category: match kind {
                FormKind::Income => DEFAULT_INCOME_CATEGORY.to_string(),
                FormKind::Expense => String::new(),
            },
            amount: String::new(),
            tax_deductions: String::new(),
            focus: 0,
            default_date,
        }
    }

    pub fn fields(&self) -> &'static [FormField] {
        match self.kind {
            FormKind::Income => &[
                FormField::Date,
                FormField::Description,
                FormField::Category,
                FormField::Amount,
                FormField::TaxDeductions,
            ],
            FormKind::Expense => &[
                FormField::Date,
                FormField::Description,
                FormField::Category,
                FormField::Amount,
            ],
        }
    }

    pub fn focused(&self) -> FormField {
        self.fields()[self.focus % self.fields().len()]
    }

    pub fn focus_next(&mut self) {
        self.focus = (self.focus + 1) % self.fields().len();
    }

    pub fn focus_previous(&mut self) {
        let len = self.fields().len();
        self.focus = (self.focus + len - 1) % len;
    }

    pub fn value(&self, field: FormField) -> &str {
        match field {
            FormField::Date => &self.date,
            FormField::Description => &self.description,
            FormField::Category => &self.category,
            FormField::Amount => &self.amount,
            FormField::TaxDeductions => &self.tax_deductions,
        }
    }

    fn value_mut(&mut self, field: FormField) -> &mut String {
        match field {
            FormField::Date => &mut self.date,
            FormField::Description => &mut self.description,
            FormField::Category => &mut self.category,
            FormField::Amount => &mut self.amount,
            FormField::TaxDeductions => &mut self.tax_deductions,
        }
    }

    pub fn push_char(&mut self, c: char) {
        let field = self.focused();
        self.value_mut(field).push(c);
    }

    pub fn pop_char(&mut self) {
        let field = self.focused();
        self.value_mut(field).pop();
    }

    /// Clear back to the defaults after a successful submit.
    pub fn reset(&mut self) {
        self.date = self.default_date.to_string();
        self.description.clear();
        self.amount.clear();
        self.tax_deductions.clear();
        if self.kind == FormKind::Expense {
            self.category.clear();
        }
        self.focus = 0;
    }

    fn parse_fields(
        &self,
        errors: &mut Vec<ValidationError>,
    ) -> (Option<NaiveDate>, Option<Decimal>, Option<Decimal>) {
        let context = match self.kind {
            FormKind::Income => "Income",
            FormKind::Expense => "Expense",
        };

        let date = match NaiveDate::parse_from_str(self.date.trim(), "%Y-%m-%d") {
            Ok(date) => {
                match TaxYearWindow::for_year(self.year) {
                    Some(window) if !window.contains(date) => errors.push(ValidationError::new(
                        "date",
                        format!("Must be between {} and {}", window.start, window.end),
                        context,
                    )),
                    _ => {}
                }
                Some(date)
            }
            Err(_) if self.date.trim().is_empty() => None,
            Err(_) => {
                errors.push(ValidationError::new("date", "Expected YYYY-MM-DD", context));
                None
            }
        };

        let amount = parse_decimal("amount", &self.amount, context, errors);
        let deductions = parse_decimal("taxDeductions", &self.tax_deductions, context, errors);
        (date, amount, deductions)
    }

    fn optional_text(value: &str) -> Option<String> {
        Some(value.to_string()).filter(|s| !s.trim().is_empty())
    }

    pub fn to_new_income(&self) -> std::result::Result<NewIncome, Vec<ValidationError>> {
        let mut errors = Vec::new();
        let (date, amount, tax_deductions) = self.parse_fields(&mut errors);
        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(NewIncome {
            year: Some(self.year),
            date,
            description: Self::optional_text(&self.description),
            amount,
            category: Self::optional_text(&self.category),
            tax_deductions,
        })
    }

    pub fn to_new_expense(&self) -> std::result::Result<NewExpense, Vec<ValidationError>> {
        let mut errors = Vec::new();
        let (date, amount, _) = self.parse_fields(&mut errors);
        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(NewExpense {
            year: Some(self.year),
            date,
            description: Self::optional_text(&self.description),
            amount,
            category: Self::optional_text(&self.category),
        })
    }
}

fn parse_decimal(
    field: &str,
    raw: &str,
    context: &str,
    errors: &mut Vec<ValidationError>,
) -> Option<Decimal> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    match raw.parse::<Decimal>() {
        Ok(value) => Some(value),
        Err(_) => {
            errors.push(ValidationError::new(field, format!("Not a number: {raw}"), context));
            None
        }
    }
}

// ============================================================================
// PAGES
// ============================================================================

/// The list of tax years plus the "add year" action.
#[derive(Debug)]
pub struct YearsPage {
    pub years: ListView<Year>,
    validator: SchemaValidator,
}

impl YearsPage {
    pub fn new(error_ttl: Duration) -> Self {
        YearsPage {
            years: ListView::new(error_ttl),
            validator: SchemaValidator::new(),
        }
    }

    pub fn load(&mut self, store: &Store, now: Instant) {
        self.years.refresh(|| store.list_years(), now);
    }

    /// Create a Year and reload. Returns whether it was created.
    pub fn add_year(&mut self, store: &Store, year: i32, now: Instant) -> bool {
        let outcome = self
            .validator
            .validate_year(&NewYear { year: Some(year) })
            .map_err(Error::from)
            .and_then(|year| store.create_year(&year));

        match outcome {
            Ok(_) => {
                self.load(store, now);
                true
            }
            Err(e) => {
                self.years.raise(e.public_message(), now);
                false
            }
        }
    }

    pub fn delete_year(&mut self, store: &Store, id: Uuid, now: Instant) {
        match store.delete_year(&id.to_string()) {
            Ok(_) => self.load(store, now),
            Err(e) => self.years.raise(e.public_message(), now),
        }
    }

    pub fn tick(&mut self, now: Instant) {
        self.years.tick(now);
    }
}

/// One tax year: summary plus income and expense lists.
#[derive(Debug)]
pub struct YearPage {
    pub year: i32,
    pub income: ListView<IncomeRecord>,
    pub expenses: ListView<ExpenseRecord>,
    pub summary: YearSummary,
    validator: SchemaValidator,
}

impl YearPage {
    pub fn new(year: i32, error_ttl: Duration) -> Self {
        YearPage {
            year,
            income: ListView::new(error_ttl),
            expenses: ListView::new(error_ttl),
            summary: YearSummary::presented::<IncomeRecord, ExpenseRecord>(year, &[], &[]),
            validator: SchemaValidator::new(),
        }
    }

    pub fn load(&mut self, store: &Store, now: Instant) {
        let year = self.year;
        self.income.refresh(|| store.list_income(Some(year)), now);
        self.expenses.refresh(|| store.list_expenses(Some(year)), now);
        self.recompute();
    }

    fn recompute(&mut self) {
        self.summary = YearSummary::presented(self.year, self.income.records(), self.expenses.records());
        debug!(year = self.year, net = %self.summary.net_amount, "summary recomputed");
    }

    /// Submit a form; on success the lists are reloaded and the form reset.
    pub fn submit(&mut self, store: &Store, form: &mut RecordForm, now: Instant) -> bool {
        let outcome = match form.kind {
            FormKind::Income => form
                .to_new_income()
                .and_then(|payload| self.validator.validate_income(payload))
                .map_err(Error::from)
                .and_then(|record| store.create_income(&record).map(|_| ())),
            FormKind::Expense => form
                .to_new_expense()
                .and_then(|payload| self.validator.validate_expense(payload))
                .map_err(Error::from)
                .and_then(|record| store.create_expense(&record).map(|_| ())),
        };

        match outcome {
            Ok(()) => {
                form.reset();
                self.load(store, now);
                true
            }
            Err(e) => {
                match form.kind {
                    FormKind::Income => self.income.raise(e.public_message(), now),
                    FormKind::Expense => self.expenses.raise(e.public_message(), now),
                }
                false
            }
        }
    }

    pub fn delete_income(&mut self, store: &Store, id: Uuid, now: Instant) {
        match store.delete_income(&id.to_string()) {
            Ok(_) => self.load(store, now),
            Err(e) => self.income.raise(e.public_message(), now),
        }
    }

    pub fn delete_expense(&mut self, store: &Store, id: Uuid, now: Instant) {
        match store.delete_expense(&id.to_string()) {
            Ok(_) => self.load(store, now),
            Err(e) => self.expenses.raise(e.public_message(), now),
        }
    }

    pub fn tick(&mut self, now: Instant) {
        self.income.tick(now);
        self.expenses.tick(now);
    }
}
