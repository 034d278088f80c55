// 📊 Aggregation Engine - per-year financial totals
//
// Pure functions over records. Sums are exact `Decimal` arithmetic; rounding
// to two places happens only in `YearSummary::presented`.

use crate::entities::{LineItem, TaxYearLabel};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

/// Decimal places used when presenting money
pub const PRESENTATION_SCALE: u32 = 2;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Totals {
    pub total_income: Decimal,
    pub total_expenses: Decimal,
    pub total_deductions: Decimal,
    pub net_amount: Decimal,
}

/// Compute totals from a year's income and expense records.
///
/// Missing deductions count as zero. Empty input gives all-zero totals.
pub fn compute_totals<I, E>(income: &[I], expenses: &[E]) -> Totals
where
    I: LineItem,
    E: LineItem,
{
    let total_income: Decimal = income.iter().map(|r| r.amount()).sum();
    let total_expenses: Decimal = expenses.iter().map(|r| r.amount()).sum();
    let total_deductions: Decimal = income
        .iter()
        .map(|r| r.tax_deductions().unwrap_or(Decimal::ZERO))
        .sum();

    Totals {
        total_income,
        total_expenses,
        total_deductions,
        net_amount: total_income - total_expenses,
    }
}

/// Round a money value for display: half away from zero, always two places.
pub fn present(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(PRESENTATION_SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(PRESENTATION_SCALE);
    rounded
}

/// Summary of one tax year as returned by the gateway and shown in the UI.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearSummary {
    pub year: i32,
    pub label: String,
    pub total_income: Decimal,
    pub total_expenses: Decimal,
    pub total_deductions: Decimal,
    pub net_amount: Decimal,
    pub income_count: usize,
    pub expense_count: usize,
}

impl YearSummary {
    /// Build the presented (two decimal places) summary for `year`.
    pub fn presented<I, E>(year: i32, income: &[I], expenses: &[E]) -> Self
    where
        I: LineItem,
        E: LineItem,
    {
        let totals = compute_totals(income, expenses);

        YearSummary {
            year,
            label: TaxYearLabel(year).to_string(),
            total_income: present(totals.total_income),
            total_expenses: present(totals.total_expenses),
            total_deductions: present(totals.total_deductions),
            net_amount: present(totals.net_amount),
            income_count: income.len(),
            expense_count: expenses.len(),
        }
    }

    pub fn is_net_positive(&self) -> bool {
        !self.net_amount.is_sign_negative() || self.net_amount.is_zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{ExpenseRecord, IncomeRecord};
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn income(amount: Decimal, deductions: Decimal) -> IncomeRecord {
        IncomeRecord {
            id: Uuid::new_v4(),
            year: 2024,
            date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            description: "Pay".to_string(),
            amount,
            category: "Salary".to_string(),
            tax_deductions: deductions,
        }
    }

    fn expense(amount: Decimal) -> ExpenseRecord {
        ExpenseRecord {
            id: Uuid::new_v4(),
            year: 2024,
            date: NaiveDate::from_ymd_opt(2024, 5, 2).unwrap(),
            description: "Rent".to_string(),
            amount,
            category: "Housing".to_string(),
        }
    }

    #[test]
    fn test_empty_input_is_all_zero() {
        let totals = compute_totals::<IncomeRecord, ExpenseRecord>(&[], &[]);
        assert_eq!(totals, Totals::default());

        let summary = YearSummary::presented::<IncomeRecord, ExpenseRecord>(2024, &[], &[]);
        assert_eq!(summary.total_income.to_string(), "0.00");
        assert_eq!(summary.net_amount.to_string(), "0.00");
        assert_eq!(summary.income_count, 0);
    }

    #[test]
    fn test_year_scenario_totals() {
        let incomes = vec![income(Decimal::from(1000), Decimal::from(100))];
        let expenses = vec![expense(Decimal::from(500))];

        let summary = YearSummary::presented(2024, &incomes, &expenses);
        assert_eq!(summary.total_income.to_string(), "1000.00");
        assert_eq!(summary.total_expenses.to_string(), "500.00");
        assert_eq!(summary.total_deductions.to_string(), "100.00");
        assert_eq!(summary.net_amount.to_string(), "500.00");
        assert_eq!(summary.label, "2023/2024");
        assert!(summary.is_net_positive());
    }

    #[test]
    fn test_no_float_drift() {
        // 0.1 + 0.2 in binary floating point is 0.30000000000000004
        let incomes = vec![
            income(Decimal::new(1, 1), Decimal::ZERO),
            income(Decimal::new(2, 1), Decimal::ZERO),
        ];
        let totals = compute_totals::<_, ExpenseRecord>(&incomes, &[]);
        assert_eq!(totals.total_income, Decimal::new(3, 1));
    }

    #[test]
    fn test_net_is_income_minus_expenses() {
        let incomes = vec![
            income(Decimal::new(123456, 2), Decimal::new(5, 1)),
            income(Decimal::new(1, 3), Decimal::ZERO),
        ];
        let expenses = vec![expense(Decimal::new(200001, 2)), expense(Decimal::new(7, 3))];

        let totals = compute_totals(&incomes, &expenses);
        assert_eq!(totals.net_amount, totals.total_income - totals.total_expenses);
        assert!(totals.net_amount.is_sign_negative());
    }

    #[test]
    fn test_rounding_only_at_presentation() {
        // Rounding each 3.335 first would give 10.02
        let expenses = vec![
            expense(Decimal::new(3335, 3)),
            expense(Decimal::new(3335, 3)),
            expense(Decimal::new(3335, 3)),
        ];
        let totals = compute_totals::<IncomeRecord, _>(&[], &expenses);
        assert_eq!(totals.total_expenses, Decimal::new(10005, 3));
        assert_eq!(present(totals.total_expenses).to_string(), "10.01");
    }

    #[test]
    fn test_negative_net_presentation() {
        let summary = YearSummary::presented(
            2024,
            &[income(Decimal::from(10), Decimal::ZERO)],
            &[expense(Decimal::new(2550, 2))],
        );
        assert_eq!(summary.net_amount.to_string(), "-15.50");
        assert!(!summary.is_net_positive());
    }
}
