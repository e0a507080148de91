//! Time-Window Rewriter
//!
//! Injects a `WITHIN_WINDOW('<from>/<to>')` predicate into a query. The
//! insertion point is the first of these clauses found in the query:
//!
//! 1. `WHERE p`    -> `WHERE <window> AND p`
//! 2. `GROUP BY g` -> `WHERE <window> GROUP BY g`
//! 3. `ORDER BY o` -> `WHERE <window> ORDER BY o`
//! 4. otherwise the clause is appended to the end of the query.
//!
//! Only the first occurrence of the chosen keyword is rewritten. Keywords
//! inside subqueries or string literals are not distinguished from
//! top-level ones.

use regex::Regex;
use std::sync::OnceLock;

use crate::query::types::TimeRange;

struct ClausePatterns {
    where_clause: Regex,
    group_by: Regex,
    order_by: Regex,
}

fn clause_patterns() -> &'static ClausePatterns {
    static PATTERNS: OnceLock<ClausePatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| ClausePatterns {
        where_clause: Regex::new(r"(?i)\s+WHERE\s+").expect("where pattern"),
        group_by: Regex::new(r"(?i)\s+GROUP\s+BY\s+").expect("group by pattern"),
        order_by: Regex::new(r"(?i)\s+ORDER\s+BY\s+").expect("order by pattern"),
    })
}

/// Build the window predicate for a time range
pub fn window_clause(range: &TimeRange) -> String {
    format!("WITHIN_WINDOW('{}')", range.to_window_literal())
}

/// Return a copy of `query` restricted to `range`
pub fn override_time_window(query: &str, range: &TimeRange) -> String {
    let clause = window_clause(range);
    let p = clause_patterns();

    let (pattern, replacement) = if p.where_clause.is_match(query) {
        (&p.where_clause, format!(" WHERE {} AND ", clause))
    } else if p.group_by.is_match(query) {
        (&p.group_by, format!(" WHERE {} GROUP BY ", clause))
    } else if p.order_by.is_match(query) {
        (&p.order_by, format!(" WHERE {} ORDER BY ", clause))
    } else {
        return format!("{} WHERE {}", query, clause);
    };

    // NoExpand: the window literal is inserted verbatim, `$` included
    pattern
        .replacen(query, 1, regex::NoExpand(&replacement))
        .into_owned()
}
