// 📅 Year Entity - a user-defined tax year under which records are grouped
//
// A tax year `Y` runs from 6 April of `Y-1` to 5 April of `Y`. The `year`
// value is unique across all Year entities; records reference it by value.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Year {
    pub id: Uuid,

    /// Calendar year the tax year ends in (e.g. 2024 for 2023/2024)
    pub year: i32,

    /// When the Year was created in the store
    pub created: DateTime<Utc>,
}

impl Year {
    pub fn new(year: i32) -> Self {
        Year {
            id: Uuid::new_v4(),
            year,
            created: Utc::now(),
        }
    }

    pub fn label(&self) -> TaxYearLabel {
        TaxYearLabel(self.year)
    }
}

/// Create payload for a Year.
///
/// Fields are optional so that a missing `year` surfaces as a
/// `ValidationError` instead of a deserialization failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewYear {
    #[serde(default)]
    pub year: Option<i32>,
}

/// Display form of a tax year: `2023/2024` for year 2024.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaxYearLabel(pub i32);

impl std::fmt::Display for TaxYearLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0.checked_sub(1) {
            Some(start) => write!(f, "{}/{}", start, self.0),
            None => write!(f, "{}", self.0),
        }
    }
}
