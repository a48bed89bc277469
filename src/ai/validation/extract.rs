//! Pull the SELECT statement out of raw model text.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::constants::sql::SELECT_BODY_PREFIXES;

static SELECT_TO_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)\bselect\b.*").expect("select regex"));

/// Why no SQL could be extracted from a completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractFailure {
    Empty,
    NotSelect(String),
}

impl fmt::Display for ExtractFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "Model returned empty output"),
            Self::NotSelect(got) => {
                write!(f, "Model did not return SQL starting with SELECT. Got: {}", got)
            }
        }
    }
}

/// Remove a surrounding Markdown code fence, if any
pub fn strip_code_fences(raw: &str) -> &str {
    let mut s = raw.trim();

    if s.starts_with("```") {
        s = match s.find('\n') {
            Some(first_newline) => &s[first_newline + 1..],
            None => s.trim_start_matches('`'),
        };
    }
    if let Some(stripped) = s.trim_end().strip_suffix("```") {
        s = stripped;
    }

    s.trim()
}

/// Extract the first SELECT statement through the end of the text.
///
/// A bare projection body (`SUM(...) FROM ...`) gets `SELECT ` prepended
/// once. One trailing `;` is dropped; anything after a closing code fence
/// is ignored.
pub fn extract_select(raw: &str) -> Result<String, ExtractFailure> {
    let text = strip_code_fences(raw);
    if text.is_empty() {
        return Err(ExtractFailure::Empty);
    }

    let candidate = if let Some(m) = SELECT_TO_END.find(text) {
        m.as_str().to_string()
    } else if looks_like_select_body(text) {
        let prefixed = format!("SELECT {}", text);
        match SELECT_TO_END.find(&prefixed) {
            Some(m) => m.as_str().to_string(),
            None => return Err(ExtractFailure::NotSelect(text.to_string())),
        }
    } else {
        return Err(ExtractFailure::NotSelect(text.to_string()));
    };

    let candidate = match candidate.find("```") {
        Some(fence) => &candidate[..fence],
        None => candidate.as_str(),
    };

    let mut sql = candidate.trim();
    if let Some(stripped) = sql.strip_suffix(';') {
        sql = stripped.trim_end();
    }
    Ok(sql.to_string())
}

/// Aggregate, DISTINCT or CASE body that also mentions FROM
pub fn looks_like_select_body(text: &str) -> bool {
    let lower = text.trim().to_lowercase();
    lower.contains(" from ")
        && SELECT_BODY_PREFIXES
            .iter()
            .any(|prefix| lower.starts_with(prefix))
}
