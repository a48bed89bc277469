//! Conservative rewrite of near-miss SQL into the required alias shape.
//!
//! Only the fact table's FROM clause and fact-table column qualifiers are
//! touched. Scope-table aliases, string literals and WHERE clauses are left
//! exactly as the model wrote them. A FROM clause already in the required
//! shape is kept byte for byte, whatever its case or spacing, so the rewrite
//! is idempotent.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::constants::sql::{FACT_ALIAS, FACT_COLUMNS, SCOPE_ALIAS, SCOPE_TABLE};

const CANONICAL_FROM: &str = "FROM `transaction` t";

/// Words that can follow the table name where an alias would otherwise sit
const CLAUSE_KEYWORDS: &[&str] = &[
    "join",
    "inner",
    "left",
    "right",
    "cross",
    "full",
    "natural",
    "straight_join",
    "where",
    "group",
    "order",
    "limit",
    "having",
    "union",
    "on",
    "using",
    "window",
    "for",
    "lock",
    "use",
    "force",
    "ignore",
];

/// Groups: 1 table, 2 alias tail, 3 `AS`, 4 alias
static FROM_FACT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bfrom\s+(`?transaction\b`?)(\s+(?:(as)\s+)?([A-Za-z_][A-Za-z0-9_]*))?")
        .expect("from-fact regex")
});

static FACT_DOT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:`transaction`|\btransaction)\s*\.").expect("fact-dot regex")
});

static FACT_COLUMN: LazyLock<Regex> = LazyLock::new(|| {
    let alternation = FACT_COLUMNS.join("|");
    Regex::new(&format!(r"(?i)\b(?:{})\b", alternation)).expect("fact-column regex")
});

/// Rewrite `sql` into the canonical fact-table shape
pub fn canonicalize(sql: &str) -> String {
    if sql.trim().is_empty() {
        return sql.to_string();
    }

    let (out, wrong_aliases) = rewrite_from_clause(sql);

    let mut out = out;
    for alias in wrong_aliases {
        let pattern = format!(r"(?i)\b{}\s*\.", regex::escape(&alias));
        if let Ok(re) = Regex::new(&pattern) {
            out = re.replace_all(&out, "t.").into_owned();
        }
    }

    let out = FACT_DOT.replace_all(&out, "t.").into_owned();
    qualify_fact_columns(&out)
}

/// Returns the rewritten text and every non-`t` alias that was replaced
fn rewrite_from_clause(sql: &str) -> (String, Vec<String>) {
    let mut wrong_aliases: Vec<String> = Vec::new();

    let out = FROM_FACT
        .replace_all(sql, |caps: &Captures| {
            let Some(alias) = caps.get(4).map(|m| m.as_str()) else {
                return CANONICAL_FROM.to_string();
            };
            let lower = alias.to_lowercase();
            let table = &caps[1];
            let backticked = table.len() > 2 && table.starts_with('`') && table.ends_with('`');

            if backticked && caps.get(3).is_none() && alias == FACT_ALIAS {
                caps[0].to_string()
            } else if CLAUSE_KEYWORDS.contains(&lower.as_str()) {
                let tail = caps.get(2).map_or("", |m| m.as_str());
                format!("{}{}", CANONICAL_FROM, tail)
            } else if lower == FACT_ALIAS {
                CANONICAL_FROM.to_string()
            } else if lower == SCOPE_ALIAS || lower == SCOPE_TABLE {
                // would collide with the scope table; leave it for the shape gate
                caps[0].to_string()
            } else {
                if !wrong_aliases.iter().any(|a| a.eq_ignore_ascii_case(alias)) {
                    wrong_aliases.push(alias.to_string());
                }
                CANONICAL_FROM.to_string()
            }
        })
        .into_owned();

    (out, wrong_aliases)
}

/// Prefix bare fact-table columns with `t.`, skipping qualified names,
/// backticked names, `AS` aliases and anything inside string literals.
fn qualify_fact_columns(sql: &str) -> String {
    let literals = literal_spans(sql);
    let mut out = String::with_capacity(sql.len() + 16);
    let mut last = 0;

    for m in FACT_COLUMN.find_iter(sql) {
        let start = m.start();
        if literals.iter().any(|&(s, e)| start >= s && start < e) {
            continue;
        }

        let before = sql[..start].trim_end();
        if before.ends_with('.') || sql[..start].ends_with('`') || ends_with_as_keyword(before) {
            continue;
        }

        out.push_str(&sql[last..start]);
        out.push_str(FACT_ALIAS);
        out.push('.');
        out.push_str(m.as_str());
        last = m.end();
    }

    out.push_str(&sql[last..]);
    out
}

fn ends_with_as_keyword(before: &str) -> bool {
    let word_start = before
        .rfind(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .map_or(0, |i| i + 1);
    before[word_start..].eq_ignore_ascii_case("as")
}

/// Byte spans of closed quoted literals (`'...'` or `"..."`, doubled quotes
/// escape). An unterminated quote yields no span.
pub(crate) fn literal_spans(sql: &str) -> Vec<(usize, usize)> {
    let bytes = sql.as_bytes();
    let mut spans = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let quote = bytes[i];
        if quote != b'\'' && quote != b'"' {
            i += 1;
            continue;
        }

        let start = i;
        let mut closed = false;
        i += 1;
        while i < bytes.len() {
            if bytes[i] == quote {
                if bytes.get(i + 1) == Some(&quote) {
                    i += 2;
                    continue;
                }
                i += 1;
                closed = true;
                break;
            }
            i += 1;
        }
        if closed {
            spans.push((start, i));
        }
    }

    spans
}
