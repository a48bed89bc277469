//! Prompt Resources
//!
//! The generation rules, schema description, category catalog and insights
//! rules. Embedded copies ship with the binary; a configured directory may
//! override any of them file by file.
//!
//! Resources are loaded at most once per process. The first caller takes a
//! lock, re-checks, loads and publishes; everyone else reads the published
//! value.

mod catalog;

pub use catalog::CategoryCatalog;

use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex, OnceLock};

use tracing::{debug, info};

use crate::types::{Result, SpendError};

pub const SQL_RULES_FILE: &str = "sqlcoder-rules.txt";
pub const SQL_SCHEMA_FILE: &str = "sqlcoder-schema.txt";
pub const CATEGORIES_FILE: &str = "transaction-categories.txt";
pub const INSIGHTS_RULES_FILE: &str = "insightsGenerator-rules.txt";

const EMBEDDED_SQL_RULES: &str = include_str!("../../assets/ai/sqlcoder-rules.txt");
const EMBEDDED_SQL_SCHEMA: &str = include_str!("../../assets/ai/sqlcoder-schema.txt");
const EMBEDDED_CATEGORIES: &str = include_str!("../../assets/ai/transaction-categories.txt");
const EMBEDDED_INSIGHTS_RULES: &str = include_str!("../../assets/ai/insightsGenerator-rules.txt");

static GLOBAL: OnceLock<Arc<PromptResources>> = OnceLock::new();
static LOAD_LOCK: Mutex<()> = Mutex::new(());

/// Static text consumed by the prompt builders
#[derive(Debug, Clone)]
pub struct PromptResources {
    pub sql_rules: String,
    pub sql_schema: String,
    pub insights_rules: String,
    pub catalog: CategoryCatalog,
}

impl PromptResources {
    /// Resources compiled into the binary
    pub fn embedded() -> Self {
        Self {
            sql_rules: EMBEDDED_SQL_RULES.to_string(),
            sql_schema: EMBEDDED_SQL_SCHEMA.to_string(),
            insights_rules: EMBEDDED_INSIGHTS_RULES.to_string(),
            catalog: CategoryCatalog::from_text(EMBEDDED_CATEGORIES),
        }
    }

    /// Load resources, letting files in `dir` override the embedded copies
    pub fn load(dir: Option<&Path>) -> Result<Self> {
        let Some(dir) = dir else {
            return Ok(Self::embedded());
        };

        if !dir.is_dir() {
            return Err(SpendError::FatalConfig(format!(
                "Missing resource directory: {}",
                dir.display()
            )));
        }

        let resources = Self {
            sql_rules: read_or_embedded(dir, SQL_RULES_FILE, EMBEDDED_SQL_RULES)?,
            sql_schema: read_or_embedded(dir, SQL_SCHEMA_FILE, EMBEDDED_SQL_SCHEMA)?,
            insights_rules: read_or_embedded(dir, INSIGHTS_RULES_FILE, EMBEDDED_INSIGHTS_RULES)?,
            catalog: CategoryCatalog::from_text(&read_or_embedded(
                dir,
                CATEGORIES_FILE,
                EMBEDDED_CATEGORIES,
            )?),
        };

        if resources.catalog.is_empty() {
            return Err(SpendError::FatalConfig(format!(
                "Category catalog is empty: {}",
                dir.join(CATEGORIES_FILE).display()
            )));
        }

        Ok(resources)
    }

    /// Process-wide resources, loaded on first use.
    ///
    /// `dir` only matters for the call that performs the load.
    pub fn global(dir: Option<&Path>) -> Result<Arc<Self>> {
        if let Some(loaded) = GLOBAL.get() {
            return Ok(Arc::clone(loaded));
        }

        let _guard = LOAD_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(loaded) = GLOBAL.get() {
            return Ok(Arc::clone(loaded));
        }

        let loaded = Arc::new(Self::load(dir)?);
        info!(
            categories = loaded.catalog.len(),
            multi_word = loaded.catalog.multi_word().len(),
            "Loaded prompt resources"
        );
        let _ = GLOBAL.set(Arc::clone(&loaded));
        Ok(loaded)
    }
}

fn read_or_embedded(dir: &Path, file: &str, embedded: &str) -> Result<String> {
    let path = dir.join(file);
    if !path.exists() {
        debug!("Using embedded {}", file);
        return Ok(embedded.to_string());
    }
    fs::read_to_string(&path).map_err(|e| {
        SpendError::FatalConfig(format!("Unable to read resource {}: {}", path.display(), e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_embedded_resources_present() {
        let resources = PromptResources::embedded();
        assert!(resources.sql_rules.contains("SELECT"));
        assert!(resources.sql_schema.contains("`transaction`"));
        assert!(!resources.insights_rules.is_empty());
        assert!(resources.catalog.all().iter().any(|c| c == "Groceries"));
    }

    #[test]
    fn test_load_without_dir_is_embedded() {
        let resources = PromptResources::load(None).unwrap();
        assert_eq!(resources.sql_rules, EMBEDDED_SQL_RULES);
    }

    #[test]
    fn test_load_overrides_per_file() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join(CATEGORIES_FILE), "Coffee\nBook Club\n").unwrap();

        let resources = PromptResources::load(Some(temp_dir.path())).unwrap();
        assert_eq!(resources.catalog.all(), &["Coffee", "Book Club"]);
        assert_eq!(resources.sql_schema, EMBEDDED_SQL_SCHEMA);
    }

    #[test]
    fn test_load_missing_dir_is_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("nope");
        let err = PromptResources::load(Some(&missing)).unwrap_err();
        assert!(matches!(err, SpendError::FatalConfig(_)));
    }

    #[test]
    fn test_load_empty_catalog_is_fatal() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join(CATEGORIES_FILE), "\n\n").unwrap();
        assert!(PromptResources::load(Some(temp_dir.path())).is_err());
    }

    #[test]
    fn test_global_is_loaded_once() {
        let handles: Vec<_> = (0..8)
            .map(|_| std::thread::spawn(|| PromptResources::global(None).unwrap()))
            .collect();
        let loaded: Vec<Arc<PromptResources>> =
            handles.into_iter().map(|h| h.join().unwrap()).collect();

        for other in &loaded[1..] {
            assert!(Arc::ptr_eq(&loaded[0], other));
        }
    }
}
