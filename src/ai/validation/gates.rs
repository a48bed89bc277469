//! SQL Gates
//!
//! Independent predicates over a candidate SQL string. Each gate is a fixed
//! pattern check, not a parse: oddly formatted but valid SQL can be rejected,
//! and the attempt loop's correction hint is what steers the model back.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use super::canonicalize::literal_spans;
use crate::constants::sql::BANNED_TOKENS;
use crate::types::PromptConstraints;

static FROM_FACT_ALIAS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bfrom\s+`transaction`\s+([A-Za-z_][A-Za-z0-9_]*)").expect("from-alias regex")
});

static BARE_FACT_DOT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:`transaction`|\btransaction)\s*\.").expect("bare-fact regex")
});

static FACT_USER_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:`t`|\bt|`transaction`|\btransaction)\s*\.\s*`?user_id\b")
        .expect("fact-user regex")
});

static JOIN_SCOPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bjoin\s+`?budget\b").expect("join regex"));

static SCOPE_USER_EQ: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:`b`|\bb|`budget`|\bbudget)\s*\.\s*`?user_id`?\s*=\s*'?(\d+)'?")
        .expect("scope-user regex")
});

static BARE_USER_EQ: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|[^.\w`])`?user_id`?\s*=\s*'?(\d+)'?").expect("bare-user regex")
});

/// `MONTH(<qualifier.>time_stamp) = N`
static MONTH_EQ: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)\bmonth\s*{}\s*=\s*'?(\d{{1,2}})'?", TIME_STAMP_ARG))
        .expect("month-eq regex")
});

/// `MONTH(<qualifier.>time_stamp) IN (...)`
static MONTH_IN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)\bmonth\s*{}\s*in\s*\(([^)]*)\)", TIME_STAMP_ARG))
        .expect("month-in regex")
});

/// `YEAR(<qualifier.>time_stamp) = YYYY`
static YEAR_EQ: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)\byear\s*{}\s*=\s*'?(\d{{4}})'?", TIME_STAMP_ARG))
        .expect("year-eq regex")
});

static CATEGORY_EQ: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|[^\w])category`?\s*=\s*'((?:[^']|'')*)'").expect("category-eq regex")
});

static CATEGORY_IN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|[^\w])category`?\s+in\s*\(").expect("category-in regex")
});

const TIME_STAMP_ARG: &str = r"\(\s*(?:`?[A-Za-z_]\w*`?\s*\.\s*)?`?time_stamp`?\s*\)";

// =============================================================================
// Gate Identity
// =============================================================================

/// Validation gates in evaluation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Gate {
    Safety,
    Shape,
    UserScope,
    Category,
    Month,
    Year,
}

impl fmt::Display for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Safety => write!(f, "safety"),
            Self::Shape => write!(f, "shape"),
            Self::UserScope => write!(f, "user-scope"),
            Self::Category => write!(f, "category"),
            Self::Month => write!(f, "month"),
            Self::Year => write!(f, "year"),
        }
    }
}

// =============================================================================
// Validation Outcome
// =============================================================================

/// Per-attempt record of which gates failed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationOutcome {
    /// Canonicalized candidate, absent when parsing failed
    pub sql: Option<String>,
    pub parse_failure: Option<String>,
    /// Denylist entries found, in denylist order
    pub banned_tokens: Vec<&'static str>,
    pub banned_token_found: bool,
    pub missing_table_alias: bool,
    pub missing_user_filter: bool,
    pub missing_category_filter: bool,
    pub missing_month_filter: bool,
    pub missing_year_filter: bool,
}

impl ValidationOutcome {
    pub fn failed_gates(&self) -> Vec<Gate> {
        [
            (self.banned_token_found, Gate::Safety),
            (self.missing_table_alias, Gate::Shape),
            (self.missing_user_filter, Gate::UserScope),
            (self.missing_category_filter, Gate::Category),
            (self.missing_month_filter, Gate::Month),
            (self.missing_year_filter, Gate::Year),
        ]
        .into_iter()
        .filter_map(|(failed, gate)| failed.then_some(gate))
        .collect()
    }

    pub fn is_accepted(&self) -> bool {
        self.sql.is_some() && self.parse_failure.is_none() && self.failed_gates().is_empty()
    }

    /// Parse failure first, then the failed gates
    pub fn failure_reason(&self) -> Option<String> {
        let gates = self.failed_gates();
        let gate_list = gates
            .iter()
            .map(Gate::to_string)
            .collect::<Vec<_>>()
            .join(", ");

        match (&self.parse_failure, gates.is_empty()) {
            (Some(reason), true) => Some(reason.clone()),
            (Some(reason), false) => Some(format!("{}; failed gates: {}", reason, gate_list)),
            (None, false) => Some(format!("failed gates: {}", gate_list)),
            (None, true) => None,
        }
    }
}

// =============================================================================
// Validator
// =============================================================================

/// Gate battery bound to one request's constraints
#[derive(Debug, Clone, Copy)]
pub struct SqlValidator<'a> {
    constraints: &'a PromptConstraints,
}

impl<'a> SqlValidator<'a> {
    pub fn new(constraints: &'a PromptConstraints) -> Self {
        Self { constraints }
    }

    /// Evaluate every gate against canonicalized SQL
    pub fn validate(&self, sql: &str) -> ValidationOutcome {
        let c = self.constraints;
        let banned_tokens = banned_tokens(sql);

        let missing_month_filter = if c.multi_month() {
            !contains_months(sql, &c.months_found)
        } else {
            c.required_month
                .is_some_and(|month| !contains_single_month(sql, month))
        };

        ValidationOutcome {
            sql: Some(sql.to_string()),
            parse_failure: None,
            banned_token_found: !banned_tokens.is_empty(),
            banned_tokens,
            missing_table_alias: !uses_fact_alias(sql),
            missing_user_filter: !contains_user_scope(sql, c.user_id),
            missing_category_filter: c.has_categories()
                && !contains_categories(sql, &c.required_categories),
            missing_month_filter,
            missing_year_filter: c
                .required_year
                .is_some_and(|year| !contains_year(sql, year)),
        }
    }

    /// Outcome for an attempt whose output held no SQL.
    ///
    /// The safety gate still runs over the raw text so destructive output is
    /// reported as such; every other applicable gate counts as missing.
    pub fn parse_failed(&self, raw_output: &str, reason: impl Into<String>) -> ValidationOutcome {
        let c = self.constraints;
        let banned_tokens = banned_tokens(raw_output);

        ValidationOutcome {
            sql: None,
            parse_failure: Some(reason.into()),
            banned_token_found: !banned_tokens.is_empty(),
            banned_tokens,
            missing_table_alias: true,
            missing_user_filter: true,
            missing_category_filter: c.has_categories(),
            missing_month_filter: c.multi_month() || c.required_month.is_some(),
            missing_year_filter: c.required_year.is_some(),
        }
    }
}

// =============================================================================
// Gates
// =============================================================================

/// Safety gate: denylist entries present in the case-folded,
/// whitespace-collapsed text. The inside of closed string literals is not
/// scanned; the quotes themselves are.
pub fn banned_tokens(sql: &str) -> Vec<&'static str> {
    let masked = mask_literals(sql);
    let collapsed = masked.split_whitespace().collect::<Vec<_>>().join(" ");
    let normalized = format!(" {} ", collapsed.to_lowercase());

    BANNED_TOKENS
        .iter()
        .copied()
        .filter(|token| normalized.contains(token))
        .collect()
}

/// Shape gate: first fact-table FROM is aliased `t`, no `transaction.col`
pub fn uses_fact_alias(sql: &str) -> bool {
    let Some(caps) = FROM_FACT_ALIAS.captures(sql) else {
        return false;
    };
    if !caps[1].eq_ignore_ascii_case("t") {
        return false;
    }
    !BARE_FACT_DOT.is_match(sql)
}

/// User-scope gate: no fact-table user column, a JOIN on the scope table,
/// a user equality naming `user_id`, and no top-level `OR` that could
/// widen the scope
pub fn contains_user_scope(sql: &str, user_id: i64) -> bool {
    if FACT_USER_ID.is_match(sql) || !JOIN_SCOPE.is_match(sql) || has_top_level_or(sql) {
        return false;
    }

    let names_user = |re: &Regex| {
        re.captures_iter(sql)
            .filter_map(|caps| caps[1].parse::<i64>().ok())
            .any(|found| found == user_id)
    };

    names_user(&SCOPE_USER_EQ) || names_user(&BARE_USER_EQ)
}

/// Category gate: every required category appears as a quoted equality or
/// inside an `IN (...)` list (case-insensitive)
pub fn contains_categories(sql: &str, required: &[String]) -> bool {
    let found = category_literals(sql);
    required
        .iter()
        .map(|c| c.trim().to_lowercase())
        .filter(|c| !c.is_empty())
        .all(|c| found.contains(&c))
}

/// Month gate, single-month mode
pub fn contains_single_month(sql: &str, month: u32) -> bool {
    month_equalities(sql).contains(&month)
}

/// Month gate, multi-month mode: one `IN` list or the set of equalities
/// covers every required month
pub fn contains_months(sql: &str, months: &[u32]) -> bool {
    if months.is_empty() {
        return true;
    }

    let in_list_covers = MONTH_IN.captures_iter(sql).any(|caps| {
        let listed: BTreeSet<u32> = caps[1]
            .split(',')
            .filter_map(|part| part.trim().trim_matches('\'').parse().ok())
            .collect();
        months.iter().all(|m| listed.contains(m))
    });
    if in_list_covers {
        return true;
    }

    let equalities = month_equalities(sql);
    months.iter().all(|m| equalities.contains(m))
}

/// Year gate
pub fn contains_year(sql: &str, year: i32) -> bool {
    YEAR_EQ
        .captures_iter(sql)
        .filter_map(|caps| caps[1].parse::<i32>().ok())
        .any(|found| found == year)
}

fn month_equalities(sql: &str) -> BTreeSet<u32> {
    MONTH_EQ
        .captures_iter(sql)
        .filter_map(|caps| caps[1].parse().ok())
        .collect()
}

/// Blank the inside of every closed string literal, keeping the quotes
fn mask_literals(sql: &str) -> String {
    let spans = literal_spans(sql);
    if spans.is_empty() {
        return sql.to_string();
    }
    sql.char_indices()
        .map(|(idx, c)| {
            let inside = spans.iter().any(|&(start, end)| idx > start && idx + 1 < end);
            if inside { ' ' } else { c }
        })
        .collect()
}

/// `OR` outside parentheses and string literals
fn has_top_level_or(sql: &str) -> bool {
    let masked = mask_literals(sql);
    let bytes = masked.as_bytes();
    let is_word = |b: u8| b.is_ascii_alphanumeric() || b == b'_';
    let mut depth: i32 = 0;

    for (idx, &b) in bytes.iter().enumerate() {
        match b {
            b'(' => depth += 1,
            b')' => depth -= 1,
            b'o' | b'O' if depth == 0 => {
                let next_is_r = matches!(bytes.get(idx + 1), Some(b'r' | b'R'));
                let starts_word = idx == 0 || !is_word(bytes[idx - 1]);
                let ends_word = bytes.get(idx + 2).is_none_or(|&n| !is_word(n));
                if next_is_r && starts_word && ends_word {
                    return true;
                }
            }
            _ => {}
        }
    }
    false
}

/// Lowercased category literals from equalities and IN lists
fn category_literals(sql: &str) -> BTreeSet<String> {
    let mut found: BTreeSet<String> = CATEGORY_EQ
        .captures_iter(sql)
        .map(|caps| normalize_literal(&caps[1]))
        .collect();

    for m in CATEGORY_IN.find_iter(sql) {
        found.extend(in_list_literals(&sql[m.end()..]));
    }
    found
}

/// Quoted literals of an IN list body, stopping at the closing parenthesis
fn in_list_literals(body: &str) -> Vec<String> {
    let mut values = Vec::new();
    let mut cursor = 0;

    for (start, end) in literal_spans(body) {
        if body[cursor..start].contains(')') {
            break;
        }
        values.push(normalize_literal(&body[start + 1..end.saturating_sub(1).max(start + 1)]));
        cursor = end;
    }
    values
}

fn normalize_literal(raw: &str) -> String {
    raw.replace("''", "'").trim().to_lowercase()
}
