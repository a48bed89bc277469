//! Read-only execution of accepted SQL against the budget store.

use serde_json::{Number, Value};
use tracing::{debug, warn};

use super::database::SharedDatabase;
use crate::pipeline::QueryExecutor;
use crate::types::{Result, Row, SpendError};

/// Row cap for one result set
pub const MAX_RESULT_ROWS: usize = 500;

pub struct SqliteQueryExecutor {
    db: SharedDatabase,
    max_rows: usize,
}

impl SqliteQueryExecutor {
    pub fn new(db: SharedDatabase) -> Self {
        Self {
            db,
            max_rows: MAX_RESULT_ROWS,
        }
    }

    pub fn with_max_rows(mut self, max_rows: usize) -> Self {
        self.max_rows = max_rows.max(1);
        self
    }
}

impl QueryExecutor for SqliteQueryExecutor {
    fn execute(&self, sql: &str) -> Result<Vec<Row>> {
        let conn = self.db.connection()?;
        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| SpendError::execution(sql, e))?;

        if !stmt.readonly() {
            return Err(SpendError::execution(sql, "statement is not read-only"));
        }

        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let mut rows = stmt.query([]).map_err(|e| SpendError::execution(sql, e))?;

        let mut result = Vec::new();
        while let Some(row) = rows.next().map_err(|e| SpendError::execution(sql, e))? {
            if result.len() == self.max_rows {
                warn!(max_rows = self.max_rows, "Result set truncated");
                break;
            }

            let mut record = Row::new();
            for (idx, name) in columns.iter().enumerate() {
                let value = row
                    .get_ref(idx)
                    .map_err(|e| SpendError::execution(sql, e))?;
                record.insert(name.clone(), to_json(value));
            }
            result.push(record);
        }

        debug!(rows = result.len(), "Query returned rows");
        Ok(result)
    }
}

fn to_json(value: rusqlite::types::ValueRef<'_>) -> Value {
    use rusqlite::types::ValueRef;

    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::String(format!("<{} bytes>", bytes.len())),
    }
}
