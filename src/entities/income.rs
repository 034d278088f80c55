// 💰 Income Entity - money received during a tax year
//
// Carries an optional tax deduction (e.g. tax withheld at source) that the
// Aggregation Engine sums into `totalDeductions`.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::LineItem;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomeRecord {
    pub id: Uuid,
    pub year: i32,
    pub date: NaiveDate,
    pub description: String,
    pub amount: Decimal,
    pub category: String,
    #[serde(default)]
    pub tax_deductions: Decimal,
}

/// Unvalidated income payload as submitted by a client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewIncome {
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub category: Option<String>,
    /// Defaults to zero when absent
    #[serde(default)]
    pub tax_deductions: Option<Decimal>,
}

impl LineItem for IncomeRecord {
    fn id(&self) -> Uuid {
        self.id
    }

    fn date(&self) -> NaiveDate {
        self.date
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn category(&self) -> &str {
        &self.category
    }

    fn amount(&self) -> Decimal {
        self.amount
    }

    fn tax_deductions(&self) -> Option<Decimal> {
        Some(self.tax_deductions)
    }
}
