//! Budget records supplied by the budget lookup collaborator.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Budget metadata as stored by the budgeting backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetRecord {
    pub budget_id: i64,
    /// Owning user
    pub user_id: i64,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub budget_allocated: Option<i64>,
    pub budget_remaining: Option<i64>,
    pub is_active: bool,
}

impl BudgetRecord {
    /// Year shared by the start and end dates.
    ///
    /// `None` when either date is missing or the budget spans two calendar years.
    pub fn single_year(&self) -> Option<i32> {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) if start.year() == end.year() => Some(start.year()),
            _ => None,
        }
    }

    pub fn scope(&self) -> BudgetScope {
        BudgetScope {
            budget_id: self.budget_id,
            user_id: self.user_id,
        }
    }
}

/// Budget and owning user, resolved once per request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetScope {
    pub budget_id: i64,
    pub user_id: i64,
}
