pub mod budget;
pub mod error;
pub mod query;

pub use budget::{BudgetRecord, BudgetScope};
pub use error::{ErrorCategory, Result, ResultExt, SpendError};
pub use query::{GeneratedSqlContext, PromptConstraints, Row};
