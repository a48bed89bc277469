//! Budget and transaction persistence.

use chrono::NaiveDate;
use rusqlite::{OptionalExtension, params};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::database::{SharedDatabase, parse_sql_date};
use crate::pipeline::BudgetLookup;
use crate::types::{BudgetRecord, Result, ResultExt};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Update in place: a REPLACE would cascade-delete the budget's transactions
const UPSERT_BUDGET: &str = "INSERT INTO budget
        (budget_id, user_id, start_date, end_date, budget_allocated, budget_remaining, is_active)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
     ON CONFLICT(budget_id) DO UPDATE SET
        user_id = excluded.user_id,
        start_date = excluded.start_date,
        end_date = excluded.end_date,
        budget_allocated = excluded.budget_allocated,
        budget_remaining = excluded.budget_remaining,
        is_active = excluded.is_active";

/// Spending row to insert
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTransaction {
    pub budget_id: i64,
    pub amount_spend: i64,
    pub time_stamp: NaiveDate,
    pub category: String,
    pub priority: Option<String>,
}

/// Row counts for `status`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub budgets: usize,
    pub active_budgets: usize,
    pub transactions: usize,
}

/// SQLite-backed budget lookup
pub struct SqliteBudgetStore {
    db: SharedDatabase,
}

impl SqliteBudgetStore {
    pub fn new(db: SharedDatabase) -> Self {
        Self { db }
    }

    pub fn get_budget(&self, budget_id: i64) -> Result<Option<BudgetRecord>> {
        let conn = self.db.connection()?;
        conn.query_row(
            "SELECT budget_id, user_id, start_date, end_date, budget_allocated,
                    budget_remaining, is_active
             FROM budget WHERE budget_id = ?1",
            params![budget_id],
            map_budget_row,
        )
        .optional()
        .with_context_fn(|| format!("Failed to load budget {}", budget_id))
    }

    pub fn list_budgets(&self) -> Result<Vec<BudgetRecord>> {
        let conn = self.db.connection()?;
        let mut stmt = conn.prepare(
            "SELECT budget_id, user_id, start_date, end_date, budget_allocated,
                    budget_remaining, is_active
             FROM budget ORDER BY budget_id",
        )?;
        let budgets = stmt
            .query_map([], map_budget_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(budgets)
    }

    /// Insert a budget, updating any row with the same id
    pub fn insert_budget(&self, budget: &BudgetRecord) -> Result<()> {
        self.db.execute(
            UPSERT_BUDGET,
            &[
                &budget.budget_id,
                &budget.user_id,
                &budget.start_date.map(|d| d.format(DATE_FORMAT).to_string()),
                &budget.end_date.map(|d| d.format(DATE_FORMAT).to_string()),
                &budget.budget_allocated,
                &budget.budget_remaining,
                &budget.is_active,
            ],
        )?;
        debug!(budget_id = budget.budget_id, "Budget stored");
        Ok(())
    }

    /// Insert one transaction and return its id
    pub fn insert_transaction(&self, tx: &NewTransaction) -> Result<i64> {
        let conn = self.db.connection()?;
        conn.execute(
            "INSERT INTO `transaction` (budget_id, amount_spend, time_stamp, category, priority)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                tx.budget_id,
                tx.amount_spend,
                tx.time_stamp.format(DATE_FORMAT).to_string(),
                tx.category,
                tx.priority,
            ],
        )
        .with_context("Failed to insert transaction")?;
        Ok(conn.last_insert_rowid())
    }

    /// Replace a budget and all of its transactions atomically
    pub fn import(&self, budget: &BudgetRecord, transactions: &[NewTransaction]) -> Result<usize> {
        let budget = budget.clone();
        let transactions = transactions.to_vec();

        let inserted = self.db.transaction(move |conn| {
            conn.execute(
                UPSERT_BUDGET,
                params![
                    budget.budget_id,
                    budget.user_id,
                    budget.start_date.map(|d| d.format(DATE_FORMAT).to_string()),
                    budget.end_date.map(|d| d.format(DATE_FORMAT).to_string()),
                    budget.budget_allocated,
                    budget.budget_remaining,
                    budget.is_active,
                ],
            )?;

            conn.execute(
                "DELETE FROM `transaction` WHERE budget_id = ?1",
                params![budget.budget_id],
            )?;

            let mut stmt = conn.prepare(
                "INSERT INTO `transaction` (budget_id, amount_spend, time_stamp, category, priority)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for tx in &transactions {
                stmt.execute(params![
                    budget.budget_id,
                    tx.amount_spend,
                    tx.time_stamp.format(DATE_FORMAT).to_string(),
                    tx.category,
                    tx.priority,
                ])?;
            }
            Ok(transactions.len())
        })?;

        info!(inserted, "Imported transactions");
        Ok(inserted)
    }

    pub fn stats(&self) -> Result<StoreStats> {
        let conn = self.db.connection()?;
        let (budgets, active_budgets): (i64, i64) = conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(is_active), 0) FROM budget",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        let transactions: i64 =
            conn.query_row("SELECT COUNT(*) FROM `transaction`", [], |row| row.get(0))?;

        Ok(StoreStats {
            budgets: budgets as usize,
            active_budgets: active_budgets as usize,
            transactions: transactions as usize,
        })
    }
}

impl BudgetLookup for SqliteBudgetStore {
    fn find_budget(&self, budget_id: i64) -> Result<Option<BudgetRecord>> {
        self.get_budget(budget_id)
    }
}

fn map_budget_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<BudgetRecord> {
    let start: Option<String> = row.get(2)?;
    let end: Option<String> = row.get(3)?;
    Ok(BudgetRecord {
        budget_id: row.get(0)?,
        user_id: row.get(1)?,
        start_date: start.as_deref().and_then(parse_sql_date),
        end_date: end.as_deref().and_then(parse_sql_date),
        budget_allocated: row.get(4)?,
        budget_remaining: row.get(5)?,
        is_active: row.get(6)?,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::storage::Database;

    fn store() -> SqliteBudgetStore {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        SqliteBudgetStore::new(Arc::new(db))
    }

    fn budget() -> BudgetRecord {
        BudgetRecord {
            budget_id: 5,
            user_id: 7,
            start_date: NaiveDate::from_ymd_opt(2024, 5, 1),
            end_date: NaiveDate::from_ymd_opt(2024, 6, 30),
            budget_allocated: Some(1500),
            budget_remaining: Some(300),
            is_active: true,
        }
    }

    fn spend(category: &str, amount: i64, day: (i32, u32, u32)) -> NewTransaction {
        NewTransaction {
            budget_id: 5,
            amount_spend: amount,
            time_stamp: NaiveDate::from_ymd_opt(day.0, day.1, day.2).unwrap(),
            category: category.to_string(),
            priority: Some("MEDIUM".to_string()),
        }
    }

    #[test]
    fn test_budget_roundtrip() {
        let store = store();
        store.insert_budget(&budget()).unwrap();

        let loaded = store.find_budget(5).unwrap().unwrap();
        assert_eq!(loaded, budget());
        assert_eq!(loaded.single_year(), Some(2024));
        assert!(store.find_budget(6).unwrap().is_none());
    }

    #[test]
    fn test_import_and_stats() {
        let store = store();
        let inserted = store
            .import(
                &budget(),
                &[
                    spend("Groceries", 120, (2024, 5, 3)),
                    spend("Fuel", 60, (2024, 6, 9)),
                ],
            )
            .unwrap();
        assert_eq!(inserted, 2);

        let id = store.insert_transaction(&spend("Travel", 400, (2024, 6, 20))).unwrap();
        assert!(id > 0);

        let stats = store.stats().unwrap();
        assert_eq!(
            stats,
            StoreStats {
                budgets: 1,
                active_budgets: 1,
                transactions: 3
            }
        );
        assert_eq!(store.list_budgets().unwrap().len(), 1);
    }

    #[test]
    fn test_import_replaces_previous_rows() {
        let store = store();
        let rows = [spend("Groceries", 120, (2024, 5, 3))];
        store.import(&budget(), &rows).unwrap();
        store.import(&budget(), &rows).unwrap();
        assert_eq!(store.stats().unwrap().transactions, 1);
    }

    #[test]
    fn test_budget_update_keeps_transactions() {
        let store = store();
        store.import(&budget(), &[spend("Fuel", 60, (2024, 6, 9))]).unwrap();

        let mut updated = budget();
        updated.budget_remaining = Some(240);
        store.insert_budget(&updated).unwrap();

        assert_eq!(store.find_budget(5).unwrap().unwrap().budget_remaining, Some(240));
        assert_eq!(store.stats().unwrap().transactions, 1);
    }

    #[test]
    fn test_transaction_requires_budget() {
        let store = store();
        assert!(store.insert_transaction(&spend("Fuel", 10, (2024, 5, 1))).is_err());
    }
}
