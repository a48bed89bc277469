//! Demo data written by `spendsql init --sample`.

use chrono::NaiveDate;

use super::budget_store::NewTransaction;
use crate::types::BudgetRecord;

pub const SAMPLE_BUDGET_ID: i64 = 1;
pub const SAMPLE_USER_ID: i64 = 7;
const SAMPLE_YEAR: i32 = 2024;

/// (category, base amount, priority)
const MONTHLY_SPEND: &[(&str, i64, &str)] = &[
    ("Rent or Mortgage", 1200, "HIGH"),
    ("Groceries", 310, "HIGH"),
    ("Utilities", 140, "HIGH"),
    ("Fuel", 95, "MEDIUM"),
    ("Dining Out", 120, "LOW"),
    ("Entertainment", 60, "LOW"),
    ("Personal Care", 45, "MEDIUM"),
];

pub fn sample_budget() -> BudgetRecord {
    BudgetRecord {
        budget_id: SAMPLE_BUDGET_ID,
        user_id: SAMPLE_USER_ID,
        start_date: NaiveDate::from_ymd_opt(SAMPLE_YEAR, 1, 1),
        end_date: NaiveDate::from_ymd_opt(SAMPLE_YEAR, 6, 30),
        budget_allocated: Some(14_000),
        budget_remaining: Some(1_250),
        is_active: true,
    }
}

/// Six months of spending. Amounts drift by month so comparisons differ.
pub fn sample_transactions() -> Vec<NewTransaction> {
    let mut transactions = Vec::new();

    for month in 1..=6u32 {
        for (idx, (category, base, priority)) in MONTHLY_SPEND.iter().enumerate() {
            let drift = ((month as i64 * 7 + idx as i64 * 13) % 11 - 5) * base / 50;
            let day = 3 + (idx as u32 * 4) % 25;
            let Some(time_stamp) = NaiveDate::from_ymd_opt(SAMPLE_YEAR, month, day) else {
                continue;
            };

            transactions.push(NewTransaction {
                budget_id: SAMPLE_BUDGET_ID,
                amount_spend: base + drift,
                time_stamp,
                category: (*category).to_string(),
                priority: Some((*priority).to_string()),
            });
        }
    }

    transactions
}
