// 🗄️ Record Store - SQLite persistence for years, income and expenses
//
// Plain functions over `&Connection` do the work; `Store` owns the single
// process-wide connection and hands it out under a mutex.

use crate::entities::{EntityKind, ExpenseRecord, IncomeRecord, Year};
use crate::error::{Error, Result};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};
use uuid::Uuid;

// ============================================================================
// SCHEMA
// ============================================================================

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS years (
            id TEXT PRIMARY KEY,
            year INTEGER UNIQUE NOT NULL,
            created TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS income (
            id TEXT PRIMARY KEY,
            year INTEGER NOT NULL,
            date TEXT NOT NULL,
            description TEXT NOT NULL,
            amount TEXT NOT NULL,
            category TEXT NOT NULL,
            tax_deductions TEXT NOT NULL DEFAULT '0',
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS expenses (
            id TEXT PRIMARY KEY,
            year INTEGER NOT NULL,
            date TEXT NOT NULL,
            description TEXT NOT NULL,
            amount TEXT NOT NULL,
            category TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            username TEXT UNIQUE NOT NULL,
            password_hash TEXT NOT NULL,
            created TEXT NOT NULL
        )",
        [],
    )?;

    // ==========================================================================
    // Indexes
    // ==========================================================================
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_income_year_date ON income(year, date)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_expenses_year_date ON expenses(year, date)",
        [],
    )?;

    Ok(())
}

// ============================================================================
// ROW HELPERS
// ============================================================================

/// Read a TEXT column and parse it into `T`.
fn parse_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let text: String = row.get(idx)?;
    text.parse::<T>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

/// Ids are UUIDs; anything else can never match a stored record.
fn parse_id(id: &str) -> Option<Uuid> {
    Uuid::parse_str(id.trim()).ok()
}

fn year_from_row(row: &Row<'_>) -> rusqlite::Result<Year> {
    Ok(Year {
        id: parse_column(row, 0)?,
        year: row.get(1)?,
        created: parse_column(row, 2)?,
    })
}

fn income_from_row(row: &Row<'_>) -> rusqlite::Result<IncomeRecord> {
    Ok(IncomeRecord {
        id: parse_column(row, 0)?,
        year: row.get(1)?,
        date: parse_column(row, 2)?,
        description: row.get(3)?,
        amount: parse_column(row, 4)?,
        category: row.get(5)?,
        tax_deductions: parse_column(row, 6)?,
    })
}

fn expense_from_row(row: &Row<'_>) -> rusqlite::Result<ExpenseRecord> {
    Ok(ExpenseRecord {
        id: parse_column(row, 0)?,
        year: row.get(1)?,
        date: parse_column(row, 2)?,
        description: row.get(3)?,
        amount: parse_column(row, 4)?,
        category: row.get(5)?,
    })
}

// ============================================================================
// YEARS
// ============================================================================

/// Insert a Year; a second Year with the same value fails with `DuplicateYear`.
pub fn insert_year(conn: &Connection, year: &Year) -> Result<Year> {
    let result = conn.execute(
        "INSERT INTO years (id, year, created) VALUES (?1, ?2, ?3)",
        params![year.id.to_string(), year.year, year.created.to_rfc3339()],
    );

    match result {
        Ok(_) => {
            info!(year = year.year, id = %year.id, "created tax year");
            Ok(year.clone())
        }
        Err(e) if is_constraint_violation(&e) => Err(Error::DuplicateYear(year.year)),
        Err(e) => Err(e.into()),
    }
}

/// All years, most recent first
pub fn get_all_years(conn: &Connection) -> Result<Vec<Year>> {
    let mut stmt = conn.prepare("SELECT id, year, created FROM years ORDER BY year DESC")?;

    let years = stmt
        .query_map([], year_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    debug!(count = years.len(), "listed years");
    Ok(years)
}

pub fn get_year_by_id(conn: &Connection, id: &str) -> Result<Option<Year>> {
    let Some(id) = parse_id(id) else {
        return Ok(None);
    };

    let year = conn
        .query_row(
            "SELECT id, year, created FROM years WHERE id = ?1",
            [id.to_string()],
            year_from_row,
        )
        .optional()?;

    Ok(year)
}

/// Number of income and expense records filed under `year`
pub fn count_records_for_year(conn: &Connection, year: i32) -> Result<i64> {
    let count: i64 = conn.query_row(
        "SELECT (SELECT COUNT(*) FROM income WHERE year = ?1)
              + (SELECT COUNT(*) FROM expenses WHERE year = ?1)",
        [year],
        |row| row.get(0),
    )?;

    Ok(count)
}

/// Delete a Year by id.
///
/// Restrict policy: a Year that still has records is never removed.
pub fn delete_year(conn: &Connection, id: &str) -> Result<Option<Year>> {
    let Some(year) = get_year_by_id(conn, id)? else {
        debug!(id, "delete year: not found");
        return Ok(None);
    };

    let records = count_records_for_year(conn, year.year)?;
    if records > 0 {
        return Err(Error::YearInUse {
            year: year.year,
            records,
        });
    }

    conn.execute("DELETE FROM years WHERE id = ?1", [year.id.to_string()])?;
    info!(year = year.year, id = %year.id, "deleted tax year");
    Ok(Some(year))
}

// ============================================================================
// INCOME
// ============================================================================

pub fn insert_income(conn: &Connection, income: &IncomeRecord) -> Result<IncomeRecord> {
    conn.execute(
        "INSERT INTO income (id, year, date, description, amount, category, tax_deductions)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            income.id.to_string(),
            income.year,
            income.date.to_string(),
            income.description,
            income.amount.to_string(),
            income.category,
            income.tax_deductions.to_string(),
        ],
    )?;

    info!(year = income.year, id = %income.id, "created income record");
    Ok(income.clone())
}

/// Income for one tax year, most recent date first
pub fn get_income_for_year(conn: &Connection, year: i32) -> Result<Vec<IncomeRecord>> {
    let mut stmt = conn.prepare(
        "SELECT id, year, date, description, amount, category, tax_deductions
         FROM income
         WHERE year = ?1
         ORDER BY date DESC, rowid DESC",
    )?;

    let records = stmt
        .query_map([year], income_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    debug!(year, count = records.len(), "listed income");
    Ok(records)
}

pub fn delete_income(conn: &Connection, id: &str) -> Result<Option<IncomeRecord>> {
    let Some(id) = parse_id(id) else {
        return Ok(None);
    };

    let record = conn
        .query_row(
            "SELECT id, year, date, description, amount, category, tax_deductions
             FROM income WHERE id = ?1",
            [id.to_string()],
            income_from_row,
        )
        .optional()?;

    if record.is_some() {
        conn.execute("DELETE FROM income WHERE id = ?1", [id.to_string()])?;
        info!(id = %id, "deleted income record");
    }

    Ok(record)
}

// ============================================================================
// EXPENSES
// ============================================================================

pub fn insert_expense(conn: &Connection, expense: &ExpenseRecord) -> Result<ExpenseRecord> {
    conn.execute(
        "INSERT INTO expenses (id, year, date, description, amount, category)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            expense.id.to_string(),
            expense.year,
            expense.date.to_string(),
            expense.description,
            expense.amount.to_string(),
            expense.category,
        ],
    )?;

    info!(year = expense.year, id = %expense.id, "created expense record");
    Ok(expense.clone())
}

/// Expenses for one tax year, most recent date first
pub fn get_expenses_for_year(conn: &Connection, year: i32) -> Result<Vec<ExpenseRecord>> {
    let mut stmt = conn.prepare(
        "SELECT id, year, date, description, amount, category
         FROM expenses
         WHERE year = ?1
         ORDER BY date DESC, rowid DESC",
    )?;

    let records = stmt
        .query_map([year], expense_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    debug!(year, count = records.len(), "listed expenses");
    Ok(records)
}

pub fn delete_expense(conn: &Connection, id: &str) -> Result<Option<ExpenseRecord>> {
    let Some(id) = parse_id(id) else {
        return Ok(None);
    };

    let record = conn
        .query_row(
            "SELECT id, year, date, description, amount, category
             FROM expenses WHERE id = ?1",
            [id.to_string()],
            expense_from_row,
        )
        .optional()?;

    if record.is_some() {
        conn.execute("DELETE FROM expenses WHERE id = ?1", [id.to_string()])?;
        info!(id = %id, "deleted expense record");
    }

    Ok(record)
}

pub fn verify_count(conn: &Connection, kind: EntityKind) -> Result<i64> {
    let sql = format!("SELECT COUNT(*) FROM {}", kind.table());
    let count: i64 = conn.query_row(&sql, [], |row| row.get(0))?;

    Ok(count)
}

// ============================================================================
// STORE HANDLE
// ============================================================================

/// Process-wide handle on the database.
///
/// Opened once at startup and cloned into every consumer; all access goes
/// through one mutex-guarded connection.
#[derive(Clone, Debug)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    /// Open (or create) the database file and make sure the schema exists.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        setup_database(&conn)?;
        info!(path = %path.display(), "database opened");
        Ok(Self::from_connection(conn))
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        setup_database(&conn)?;
        Ok(Self::from_connection(conn))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Store {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::internal("database connection lock poisoned"))
    }

    /// Run `f` with exclusive access to the connection.
    pub fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self.lock()?;
        f(&conn)
    }

    pub fn list_years(&self) -> Result<Vec<Year>> {
        self.with_conn(get_all_years)
    }

    pub fn create_year(&self, year: &Year) -> Result<Year> {
        self.with_conn(|conn| insert_year(conn, year))
    }

    pub fn delete_year(&self, id: &str) -> Result<Option<Year>> {
        self.with_conn(|conn| delete_year(conn, id))
    }

    /// Income for `year`; the filter is mandatory.
    pub fn list_income(&self, year: Option<i32>) -> Result<Vec<IncomeRecord>> {
        let year = year.ok_or(Error::MissingParameter("year"))?;
        self.with_conn(|conn| get_income_for_year(conn, year))
    }

    pub fn create_income(&self, income: &IncomeRecord) -> Result<IncomeRecord> {
        self.with_conn(|conn| insert_income(conn, income))
    }

    pub fn delete_income(&self, id: &str) -> Result<Option<IncomeRecord>> {
        self.with_conn(|conn| delete_income(conn, id))
    }

    /// Expenses for `year`; the filter is mandatory.
    pub fn list_expenses(&self, year: Option<i32>) -> Result<Vec<ExpenseRecord>> {
        let year = year.ok_or(Error::MissingParameter("year"))?;
        self.with_conn(|conn| get_expenses_for_year(conn, year))
    }

    pub fn create_expense(&self, expense: &ExpenseRecord) -> Result<ExpenseRecord> {
        self.with_conn(|conn| insert_expense(conn, expense))
    }

    pub fn delete_expense(&self, id: &str) -> Result<Option<ExpenseRecord>> {
        self.with_conn(|conn| delete_expense(conn, id))
    }
}
