//! Category catalog partitioned for prompt scanning.

use std::collections::HashSet;

/// Known transaction categories, read-only after load
///
/// Multi-word categories (any whitespace) are kept longest-first so a long
/// phrase is matched before a shorter category it contains. Single-word
/// categories keep file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryCatalog {
    all: Vec<String>,
    multi_word: Vec<String>,
    single_word: Vec<String>,
}

impl CategoryCatalog {
    /// Parse a newline-separated category list
    pub fn from_text(raw: &str) -> Self {
        let mut seen = HashSet::new();
        let all: Vec<String> = raw
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .filter(|line| seen.insert(line.to_lowercase()))
            .map(String::from)
            .collect();
        Self::from_categories(all)
    }

    pub fn from_categories(all: Vec<String>) -> Self {
        let mut multi_word: Vec<String> = all
            .iter()
            .filter(|c| is_multi_word(c))
            .cloned()
            .collect();
        // stable: equal lengths keep file order
        multi_word.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()));

        let single_word = all.iter().filter(|c| !is_multi_word(c)).cloned().collect();

        Self {
            all,
            multi_word,
            single_word,
        }
    }

    pub fn all(&self) -> &[String] {
        &self.all
    }

    pub fn multi_word(&self) -> &[String] {
        &self.multi_word
    }

    pub fn single_word(&self) -> &[String] {
        &self.single_word
    }

    pub fn len(&self) -> usize {
        self.all.len()
    }

    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }
}

fn is_multi_word(category: &str) -> bool {
    category.chars().any(char::is_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_and_order() {
        let catalog = CategoryCatalog::from_text(
            "Rent\nRent or Mortgage\n\n  Groceries  \nDining Out\nPhone & Internet\n",
        );
        assert_eq!(catalog.len(), 5);
        assert_eq!(
            catalog.multi_word(),
            &["Rent or Mortgage", "Phone & Internet", "Dining Out"]
        );
        assert_eq!(catalog.single_word(), &["Rent", "Groceries"]);
    }

    #[test]
    fn test_deduplicates_case_insensitively() {
        let catalog = CategoryCatalog::from_text("Travel\ntravel\nTRAVEL\nFuel");
        assert_eq!(catalog.all(), &["Travel", "Fuel"]);
    }

    #[test]
    fn test_empty_catalog() {
        let catalog = CategoryCatalog::from_text("\n \n");
        assert!(catalog.is_empty());
    }
}
