//! Scripted collaborators for pipeline tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use super::{BudgetLookup, QueryExecutor};
use crate::ai::provider::{CompletionProvider, CompletionResponse};
use crate::types::{BudgetRecord, Result, Row, SpendError};

/// Provider returning canned completions in order
pub struct ScriptedProvider {
    outputs: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
    calls: AtomicUsize,
    fail_endpoint: Option<String>,
}

impl ScriptedProvider {
    pub fn new<I, S>(outputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            outputs: Mutex::new(outputs.into_iter().map(Into::into).collect()),
            prompts: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            fail_endpoint: None,
        }
    }

    /// Every call fails with a transport error naming `endpoint`
    pub fn failing(endpoint: &str) -> Self {
        Self {
            fail_endpoint: Some(endpoint.to_string()),
            ..Self::new(Vec::<String>::new())
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionProvider for ScriptedProvider {
    async fn complete(&self, prompt: &str) -> Result<CompletionResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());

        if let Some(endpoint) = &self.fail_endpoint {
            return Err(SpendError::transport(endpoint, "connection refused"));
        }

        let text = self.outputs.lock().unwrap().pop_front().unwrap_or_default();
        Ok(CompletionResponse::text_only(text))
    }

    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-model"
    }

    fn endpoint(&self) -> &str {
        "scripted://"
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }
}

/// In-memory budget lookup
#[derive(Default)]
pub struct MemoryBudgets {
    budgets: HashMap<i64, BudgetRecord>,
    pub lookups: AtomicUsize,
}

impl MemoryBudgets {
    pub fn with(records: impl IntoIterator<Item = BudgetRecord>) -> Self {
        Self {
            budgets: records.into_iter().map(|b| (b.budget_id, b)).collect(),
            lookups: AtomicUsize::new(0),
        }
    }
}

impl BudgetLookup for MemoryBudgets {
    fn find_budget(&self, budget_id: i64) -> Result<Option<BudgetRecord>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.budgets.get(&budget_id).cloned())
    }
}

/// Executor returning fixed rows, or failing for every query
pub struct FixedRows {
    pub rows: Vec<Row>,
    pub fail_with: Option<String>,
    pub executed: Mutex<Vec<String>>,
}

impl FixedRows {
    pub fn new(rows: Vec<Row>) -> Self {
        Self {
            rows,
            fail_with: None,
            executed: Mutex::new(Vec::new()),
        }
    }
}

impl QueryExecutor for FixedRows {
    fn execute(&self, sql: &str) -> Result<Vec<Row>> {
        self.executed.lock().unwrap().push(sql.to_string());
        match &self.fail_with {
            Some(cause) => Err(SpendError::execution(sql, cause)),
            None => Ok(self.rows.clone()),
        }
    }
}
