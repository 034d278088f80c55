// CRUD Gateway handlers - one resource family per entity kind

use super::auth::{body_error, SessionUser};
use super::envelope::{created, ok, ApiResult};
use super::AppState;
use crate::entities::{ExpenseRecord, IncomeRecord, NewExpense, NewIncome, NewYear, Year};
use crate::error::{Error, Result};
use crate::schema::{MAX_TAX_YEAR, MIN_TAX_YEAR};
use crate::summary::YearSummary;
use axum::{
    extract::{rejection::JsonRejection, Query, State},
    response::IntoResponse,
    Extension, Json,
};
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Default, Deserialize)]
pub struct YearQuery {
    pub year: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct IdQuery {
    pub id: Option<String>,
}

/// `year` query parameter: absent or blank is missing; non-integer or
/// outside `MIN_TAX_YEAR..=MAX_TAX_YEAR` is invalid.
pub fn parse_year_param(raw: Option<&str>) -> Result<i32> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(Error::MissingParameter("year"))?;

    raw.parse::<i32>()
        .ok()
        .filter(|year| (MIN_TAX_YEAR..=MAX_TAX_YEAR).contains(year))
        .ok_or_else(|| Error::InvalidParameter {
            name: "year",
            value: raw.to_string(),
        })
}

fn require_id(raw: Option<String>) -> Result<String> {
    raw.map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or(Error::MissingParameter("id"))
}

/// Name recorded against a mutation; sessions are absent when auth is off.
fn actor(session: &Option<Extension<SessionUser>>) -> &str {
    session
        .as_ref()
        .map(|Extension(user)| user.username.as_str())
        .unwrap_or("anonymous")
}

// ============================================================================
// Health
// ============================================================================

/// GET /api/health - Health check
pub async fn health_check() -> impl IntoResponse {
    ok("OK")
}

// ============================================================================
// Years
// ============================================================================

/// GET /api/years - all tax years, newest first
pub async fn list_years(State(state): State<AppState>) -> ApiResult<Vec<Year>> {
    let years = state.store.list_years()?;
    Ok(ok(years))
}

/// POST /api/years - create a tax year
pub async fn create_year(
    State(state): State<AppState>,
    session: Option<Extension<SessionUser>>,
    payload: std::result::Result<Json<NewYear>, JsonRejection>,
) -> ApiResult<Year> {
    let Json(payload) = payload.map_err(|rej| body_error(&rej, "Year"))?;
    let year = state.validator.validate_year(&payload).map_err(Error::from)?;

    let year = state.store.create_year(&year)?;
    debug!(id = %year.id, by = actor(&session), "year created through the gateway");
    Ok(created(year))
}

/// DELETE /api/years?id= - remove a tax year with no records
pub async fn delete_year(
    State(state): State<AppState>,
    Query(params): Query<IdQuery>,
) -> ApiResult<Option<Year>> {
    let id = require_id(params.id)?;
    let deleted = state.store.delete_year(&id)?;
    Ok(ok(deleted))
}

// ============================================================================
// Income
// ============================================================================

/// GET /api/income?year= - income for one tax year, newest first
pub async fn list_income(
    State(state): State<AppState>,
    Query(params): Query<YearQuery>,
) -> ApiResult<Vec<IncomeRecord>> {
    let year = parse_year_param(params.year.as_deref())?;
    let records = state.store.list_income(Some(year))?;
    Ok(ok(records))
}

/// POST /api/income - record income
pub async fn create_income(
    State(state): State<AppState>,
    session: Option<Extension<SessionUser>>,
    payload: std::result::Result<Json<NewIncome>, JsonRejection>,
) -> ApiResult<IncomeRecord> {
    let Json(payload) = payload.map_err(|rej| body_error(&rej, "Income"))?;
    let record = state.validator.validate_income(payload).map_err(Error::from)?;

    let record = state.store.create_income(&record)?;
    debug!(id = %record.id, by = actor(&session), "income created through the gateway");
    Ok(created(record))
}

/// DELETE /api/income?id= - returns the deleted record, or null if none matched
pub async fn delete_income(
    State(state): State<AppState>,
    Query(params): Query<IdQuery>,
) -> ApiResult<Option<IncomeRecord>> {
    let id = require_id(params.id)?;
    let deleted = state.store.delete_income(&id)?;
    if deleted.is_none() {
        debug!(id = %id, "delete income: nothing matched");
    }
    Ok(ok(deleted))
}

// ============================================================================
// Expenses
// ============================================================================

/// GET /api/expenses?year= - expenses for one tax year, newest first
pub async fn list_expenses(
    State(state): State<AppState>,
    Query(params): Query<YearQuery>,
) -> ApiResult<Vec<ExpenseRecord>> {
    let year = parse_year_param(params.year.as_deref())?;
    let records = state.store.list_expenses(Some(year))?;
    Ok(ok(records))
}

/// POST /api/expenses - record an expense
pub async fn create_expense(
    State(state): State<AppState>,
    session: Option<Extension<SessionUser>>,
    payload: std::result::Result<Json<NewExpense>, JsonRejection>,
) -> ApiResult<ExpenseRecord> {
    let Json(payload) = payload.map_err(|rej| body_error(&rej, "Expense"))?;
    let record = state.validator.validate_expense(payload).map_err(Error::from)?;

    let record = state.store.create_expense(&record)?;
    debug!(id = %record.id, by = actor(&session), "expense created through the gateway");
    Ok(created(record))
}

/// DELETE /api/expenses?id= - returns the deleted record, or null if none matched
pub async fn delete_expense(
    State(state): State<AppState>,
    Query(params): Query<IdQuery>,
) -> ApiResult<Option<ExpenseRecord>> {
    let id = require_id(params.id)?;
    let deleted = state.store.delete_expense(&id)?;
    if deleted.is_none() {
        debug!(id = %id, "delete expense: nothing matched");
    }
    Ok(ok(deleted))
}

// ============================================================================
// Summary
// ============================================================================

/// GET /api/summary?year= - aggregated totals for one tax year
pub async fn get_summary(
    State(state): State<AppState>,
    Query(params): Query<YearQuery>,
) -> ApiResult<YearSummary> {
    let year = parse_year_param(params.year.as_deref())?;

    let (income, expenses) = state.store.with_conn(|conn| {
        Ok((
            crate::db::get_income_for_year(conn, year)?,
            crate::db::get_expenses_for_year(conn, year)?,
        ))
    })?;

    Ok(ok(YearSummary::presented(year, &income, &expenses)))
}
