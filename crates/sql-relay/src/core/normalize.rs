use std::sync::OnceLock;

use regex::Regex;

use crate::core::limits::Limit;

fn trailing_limit() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\s+LIMIT\s+\d+\s*$").expect("static regex"))
}

/// Strips surrounding whitespace, one trailing `;`, and a trailing `LIMIT n`.
///
/// Matching is purely textual and anchored to the end of the statement, so a
/// `LIMIT` inside a subquery or an earlier UNION branch is left alone.
pub fn normalize(sql: &str) -> String {
    let mut clean = sql.trim();
    if let Some(stripped) = clean.strip_suffix(';') {
        clean = stripped.trim_end();
    }
    trailing_limit().replace(clean, "").into_owned()
}

pub fn build_count_query(clean_sql: &str) -> String {
    format!("SELECT COUNT(*) FROM ({clean_sql}) AS t")
}

pub fn build_limited_query(clean_sql: &str, limit: Limit) -> String {
    match limit {
        Limit::Unbounded => clean_sql.to_string(),
        Limit::Rows(n) => format!("{clean_sql} LIMIT {n}"),
    }
}
