//! Global Constants
//!
//! Centralized constants for the generation pipelines.
//! All magic numbers and fixed tables live here.

/// Completion endpoint constants
pub mod llm {
    /// Default Ollama-compatible endpoint base
    pub const DEFAULT_API_BASE: &str = "http://localhost:11434";

    /// Model used for SQL generation
    pub const DEFAULT_SQL_MODEL: &str = "sqlcoder:latest";

    /// Model used for insight summaries
    pub const DEFAULT_INSIGHTS_MODEL: &str = "deepseek-r1:7b";

    /// Total attempts per pipeline invocation (first try included)
    pub const MAX_ATTEMPTS: u32 = 3;

    /// Output length cap sent as `num_predict`
    pub const NUM_PREDICT: u32 = 512;

    /// Sampling temperature (deterministic)
    pub const TEMPERATURE: f32 = 0.0;
}

/// HTTP/Network constants
pub mod network {
    /// Connection timeout (seconds)
    pub const CONNECT_TIMEOUT_SECS: u64 = 5;

    /// Read timeout (seconds); model latency dominates
    pub const READ_TIMEOUT_SECS: u64 = 60;
}

/// Schema vocabulary the generated SQL must use
pub mod sql {
    /// Fact table holding spending rows. It has no user column.
    pub const FACT_TABLE: &str = "transaction";

    /// Required alias of the fact table
    pub const FACT_ALIAS: &str = "t";

    /// Scope table carrying the owning user
    pub const SCOPE_TABLE: &str = "budget";

    /// Required alias of the scope table
    pub const SCOPE_ALIAS: &str = "b";

    /// Fact-table columns the canonicalizer qualifies with `t.`
    pub const FACT_COLUMNS: &[&str] = &["category", "amount_spend", "time_stamp"];

    /// Join shape every query must use
    pub const FROM_JOIN_TEMPLATE: &str =
        "FROM `transaction` t JOIN budget b ON b.budget_id = t.budget_id";

    /// Tokens rejected by the safety gate.
    ///
    /// Matched against `" " + lowercase(sql) + " "` with all whitespace runs
    /// collapsed to one space.
    pub const BANNED_TOKENS: &[&str] = &[
        // PostgreSQL-only syntax
        " ilike ",
        "interval '",
        "::",
        " extract(",
        "date_trunc",
        " date_part",
        " to_char",
        " to_date",
        " to_timestamp",
        " at time zone",
        "generate_series",
        "distinct on",
        " filter (where ",
        " returning ",
        " similar to ",
        " nulls last",
        " nulls first",
        " on conflict",
        " intersect ",
        " except ",
        " serial ",
        " bigserial ",
        " generated always as identity",
        " timestamptz",
        " time with time zone",
        " without time zone",
        " jsonb",
        " hstore",
        " uuid",
        " array[",
        " unnest(",
        " || ",
        " do $$",
        " language plpgsql",
        " create extension",
        " vacuum ",
        " analyze ",
        " regexp_replace(",
        " cascade ",
        " fetch first ",
        " offset ",
        // Un-scoped raw table names
        " from transactions ",
        " join transactions ",
        " transactions.",
        " from budgets ",
        " join budgets ",
        // Statements other than SELECT
        " insert ",
        " update ",
        " delete ",
        " drop ",
        " alter ",
        " truncate ",
        " create ",
        " replace into ",
        " rename ",
        " call ",
        " grant ",
        " revoke ",
        " into outfile",
        " into dumpfile",
        " load data",
        " sleep(",
        " benchmark(",
        ";",
    ];

    /// Key phrases marking a "which category is largest" question
    pub const TOP_CATEGORY_PHRASES: &[&str] = &[
        "overspend",
        "over spend",
        "spent the most",
        "spend the most",
        "most spent",
        "highest spend",
        "highest spending",
        "where did i spend the most",
    ];

    /// Leading tokens of a bare projection body missing its SELECT
    pub const SELECT_BODY_PREFIXES: &[&str] = &[
        "sum(",
        "count(",
        "avg(",
        "min(",
        "max(",
        "distinct ",
        "case ",
    ];
}

/// Calendar constants
pub mod months {
    /// English month names and their numbers
    pub const NAMES: [(&str, u32); 12] = [
        ("january", 1),
        ("february", 2),
        ("march", 3),
        ("april", 4),
        ("may", 5),
        ("june", 6),
        ("july", 7),
        ("august", 8),
        ("september", 9),
        ("october", 10),
        ("november", 11),
        ("december", 12),
    ];
}

/// Insights output constants
pub mod insights {
    /// Sentence-count target given to the model
    pub const SENTENCE_TARGET: &str = "3-4 sentences";
}
