//! Constraint Extraction
//!
//! Pure functions over the prompt text, the budget record and the category
//! catalog. No I/O: the budget has already been resolved by the caller.

use std::sync::LazyLock;

use regex::Regex;

use crate::constants::months;
use crate::resources::CategoryCatalog;
use crate::types::{BudgetRecord, PromptConstraints};

static MONTH_NAME: LazyLock<Regex> = LazyLock::new(|| {
    let names: Vec<&str> = months::NAMES.iter().map(|(name, _)| *name).collect();
    Regex::new(&format!(r"(?i)\b({})\b", names.join("|"))).expect("month regex")
});

static PROMPT_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(20\d{2})\b").expect("year regex"));

/// Builds `PromptConstraints` for one request
#[derive(Debug, Clone, Copy)]
pub struct ConstraintExtractor<'a> {
    catalog: &'a CategoryCatalog,
}

impl<'a> ConstraintExtractor<'a> {
    pub fn new(catalog: &'a CategoryCatalog) -> Self {
        Self { catalog }
    }

    pub fn extract(&self, prompt: &str, budget: &BudgetRecord) -> PromptConstraints {
        let required_categories = detect_categories(prompt, self.catalog);
        let months_found = detect_months(prompt);

        let required_category = match required_categories.as_slice() {
            [single] => Some(single.clone()),
            _ => None,
        };
        let required_month = match months_found.as_slice() {
            [single] => Some(*single),
            _ => None,
        };
        let required_year =
            detect_year(prompt).or_else(|| infer_year_from_budget(budget, &months_found));

        PromptConstraints {
            budget_id: budget.budget_id,
            user_id: budget.user_id,
            prompt: prompt.to_string(),
            required_category,
            required_categories,
            required_month,
            months_found,
            required_year,
        }
    }
}

/// Catalog categories named in the prompt, in order of first appearance.
///
/// Multi-word categories are matched first, longest first, and their text is
/// masked so a shorter category inside a longer phrase is not reported too.
pub fn detect_categories(prompt: &str, catalog: &CategoryCatalog) -> Vec<String> {
    let mut haystack = prompt.to_lowercase();
    let mut hits: Vec<(usize, &String)> = Vec::new();

    for category in catalog.multi_word() {
        let needle = category.to_lowercase();
        if let Some(first) = haystack.find(&needle) {
            hits.push((first, category));
            mask_all(&mut haystack, &needle);
        }
    }

    for category in catalog.single_word() {
        let needle = category.to_lowercase();
        if let Some(first) = haystack.find(&needle) {
            hits.push((first, category));
        }
    }

    hits.sort_by_key(|(offset, _)| *offset);

    let mut ordered: Vec<String> = Vec::with_capacity(hits.len());
    for (_, category) in hits {
        if !ordered.contains(category) {
            ordered.push(category.clone());
        }
    }
    ordered
}

fn mask_all(haystack: &mut String, needle: &str) {
    if needle.is_empty() {
        return;
    }
    let blank = " ".repeat(needle.len());
    while let Some(pos) = haystack.find(needle) {
        haystack.replace_range(pos..pos + needle.len(), &blank);
    }
}

/// Month numbers named in the prompt, in order of first appearance
pub fn detect_months(prompt: &str) -> Vec<u32> {
    let mut ordered: Vec<u32> = Vec::new();

    for m in MONTH_NAME.find_iter(prompt) {
        let name = m.as_str().to_lowercase();
        let Some(&(_, number)) = months::NAMES.iter().find(|(n, _)| *n == name) else {
            continue;
        };
        if !ordered.contains(&number) {
            ordered.push(number);
        }
    }
    ordered
}

/// First standalone `20xx` token
pub fn detect_year(prompt: &str) -> Option<i32> {
    PROMPT_YEAR
        .captures(prompt)
        .and_then(|caps| caps[1].parse().ok())
}

/// Year implied by the budget when the prompt names month(s) but no year.
///
/// Only a budget whose start and end fall in one calendar year yields a
/// year; otherwise the year stays unknown.
pub fn infer_year_from_budget(budget: &BudgetRecord, months_found: &[u32]) -> Option<i32> {
    if months_found.is_empty() {
        return None;
    }
    budget.single_year()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use proptest::prelude::*;

    fn catalog() -> CategoryCatalog {
        CategoryCatalog::from_text(
            "Rent or Mortgage\nGroceries\nDining Out\nFuel\nPersonal Care\nCare\nGifts & Donations\nTravel\n",
        )
    }

    fn budget(start: &str, end: &str) -> BudgetRecord {
        BudgetRecord {
            budget_id: 11,
            user_id: 7,
            start_date: NaiveDate::parse_from_str(start, "%Y-%m-%d").ok(),
            end_date: NaiveDate::parse_from_str(end, "%Y-%m-%d").ok(),
            budget_allocated: None,
            budget_remaining: None,
            is_active: true,
        }
    }

    #[test]
    fn test_scenario_a_constraints() {
        let catalog = catalog();
        let c = ConstraintExtractor::new(&catalog).extract(
            "How much did I spend on Groceries in March 2024?",
            &budget("2023-01-01", "2024-12-31"),
        );
        assert_eq!(c.user_id, 7);
        assert_eq!(c.budget_id, 11);
        assert_eq!(c.required_category.as_deref(), Some("Groceries"));
        assert_eq!(c.required_month, Some(3));
        assert_eq!(c.required_year, Some(2024));
        assert!(!c.multi_month());
    }

    #[test]
    fn test_scenario_b_year_inferred_for_multi_month() {
        let catalog = catalog();
        let c = ConstraintExtractor::new(&catalog).extract(
            "Compare my spending in May and June",
            &budget("2024-05-01", "2024-06-30"),
        );
        assert_eq!(c.months_found, vec![5, 6]);
        assert!(c.multi_month());
        assert_eq!(c.required_month, None);
        assert_eq!(c.required_year, Some(2024));
    }

    #[test]
    fn test_year_not_inferred_across_years() {
        let catalog = catalog();
        let c = ConstraintExtractor::new(&catalog)
            .extract("Fuel in January", &budget("2024-12-01", "2025-01-31"));
        assert_eq!(c.required_month, Some(1));
        assert_eq!(c.required_year, None);
    }

    #[test]
    fn test_year_not_inferred_without_month() {
        let catalog = catalog();
        let c = ConstraintExtractor::new(&catalog)
            .extract("Where did I overspend?", &budget("2024-05-01", "2024-06-30"));
        assert_eq!(c.required_year, None);
        assert!(c.required_categories.is_empty());
    }

    #[test]
    fn test_explicit_year_wins() {
        let catalog = catalog();
        let c = ConstraintExtractor::new(&catalog)
            .extract("Travel in July 2023", &budget("2024-01-01", "2024-12-31"));
        assert_eq!(c.required_year, Some(2023));
    }

    #[test]
    fn test_categories_in_prompt_order() {
        let found = detect_categories(
            "Did Dining Out cost more than groceries or rent or mortgage?",
            &catalog(),
        );
        assert_eq!(found, vec!["Dining Out", "Groceries", "Rent or Mortgage"]);
    }

    #[test]
    fn test_longer_phrase_masks_inner_category() {
        let found = detect_categories("How much went to personal care?", &catalog());
        assert_eq!(found, vec!["Personal Care"]);
    }

    #[test]
    fn test_repeated_category_deduplicated() {
        let found = detect_categories("fuel, FUEL and more fuel", &catalog());
        assert_eq!(found, vec!["Fuel"]);
    }

    #[test]
    fn test_months_in_prompt_order_not_calendar_order() {
        assert_eq!(detect_months("June versus March"), vec![6, 3]);
        assert_eq!(detect_months("March, March and April"), vec![3, 4]);
        assert!(detect_months("Marching band expenses").is_empty());
    }

    #[test]
    fn test_detect_year() {
        assert_eq!(detect_year("spent in 2024 and 2025"), Some(2024));
        assert_eq!(detect_year("order 120245"), None);
        assert_eq!(detect_year("no year here"), None);
    }

    proptest! {
        #[test]
        fn prop_single_category_detected(
            idx in 0usize..6,
            prefix in "[a-z ]{0,20}",
            suffix in "[a-z ?]{0,20}",
        ) {
            // no category nested inside another here
            let catalog = CategoryCatalog::from_text(
                "Rent or Mortgage\nGroceries\nDining Out\nFuel\nGifts & Donations\nTravel\n",
            );
            let category = catalog.all()[idx].clone();
            prop_assume!(
                catalog
                    .all()
                    .iter()
                    .filter(|c| **c != category)
                    .all(|c| !format!("{prefix}{suffix}").contains(&c.to_lowercase()))
            );
            let prompt = format!("{prefix} {category} {suffix}");
            let found = detect_categories(&prompt, &catalog);
            prop_assert_eq!(found, vec![category]);
        }

        #[test]
        fn prop_two_months_keep_textual_order(a in 0usize..12, b in 0usize..12, filler in "[a-z ]{0,15}") {
            prop_assume!(a != b);
            let (name_a, num_a) = months::NAMES[a];
            let (name_b, num_b) = months::NAMES[b];
            let prompt = format!("spending in {name_a} {filler} versus {name_b}");
            prop_assume!(detect_months(&filler).is_empty());
            prop_assert_eq!(detect_months(&prompt), vec![num_a, num_b]);
        }
    }
}
