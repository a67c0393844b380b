use rusqlite::Connection;

use crate::core::{
    limits::Limit,
    normalize::{build_count_query, build_limited_query, normalize},
    query,
    types::{PagedResult, ResultSet},
};
use crate::error::AppResult;

/// Forwards the caller's text to the database unchanged.
pub fn execute_sql(conn: &Connection, sql: &str) -> AppResult<ResultSet> {
    query::execute(conn, sql)
}

/// Counts the unlimited statement, then fetches at most `limit` rows of it.
///
/// The two round-trips are sequential and share no snapshot; the data query is
/// never issued if counting fails.
pub fn execute_paged_sql(conn: &Connection, sql: &str, limit: Limit) -> AppResult<PagedResult> {
    let clean = normalize(sql);

    let count_sql = build_count_query(&clean);
    tracing::debug!(sql = %count_sql, "counting");
    let total = query::execute_scalar_count(conn, &count_sql)?;

    let data_sql = build_limited_query(&clean, limit);
    tracing::debug!(sql = %data_sql, total, "fetching page");
    let data = query::execute(conn, &data_sql)?;

    Ok(PagedResult { data, total })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users(n: i64) -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE USERS (id INTEGER PRIMARY KEY, name TEXT NOT NULL)")
            .unwrap();
        for i in 1..=n {
            conn.execute(
                "INSERT INTO USERS (id, name) VALUES (?1, ?2)",
                rusqlite::params![i, format!("user{i}")],
            )
            .unwrap();
        }
        conn
    }

    #[test]
    fn execute_sql_is_pass_through() {
        let conn = users(5);
        let sql = "SELECT * FROM USERS LIMIT 3;";
        let rows = execute_sql(&conn, sql).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(sql, "SELECT * FROM USERS LIMIT 3;");
    }

    #[test]
    fn execute_sql_runs_statements_verbatim() {
        let conn = users(2);
        let rows = execute_sql(&conn, "INSERT INTO USERS (id, name) VALUES (10, 'x')").unwrap();
        assert!(rows.is_empty());
        let rows = execute_sql(&conn, "SELECT name FROM USERS WHERE id = 10").unwrap();
        assert_eq!(rows[0]["name"], "x");
    }

    #[test]
    fn paged_caps_rows_but_reports_full_total() {
        let conn = users(5);
        let page = execute_paged_sql(&conn, "SELECT * FROM USERS;", Limit::Rows(2)).unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.data.len(), 2);
        assert_eq!(page.data[0]["id"], 1);
    }

    #[test]
    fn paged_unbounded_replaces_existing_limit() {
        let conn = users(5);
        let page =
            execute_paged_sql(&conn, "SELECT * FROM USERS LIMIT 100", Limit::Unbounded).unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.data.len() as i64, page.total);

        let page = execute_paged_sql(&conn, "SELECT * FROM USERS LIMIT 1", Limit::Unbounded).unwrap();
        assert_eq!(page.data.len(), 5);
    }

    #[test]
    fn paged_zero_limit_still_counts() {
        let conn = users(4);
        let page = execute_paged_sql(&conn, "SELECT * FROM USERS", Limit::Rows(0)).unwrap();
        assert!(page.data.is_empty());
        assert_eq!(page.total, 4);
    }

    #[test]
    fn paged_returns_exactly_k_rows_below_total() {
        let conn = users(7);
        for k in 0..7 {
            let page = execute_paged_sql(&conn, "SELECT id FROM USERS ORDER BY id", Limit::Rows(k))
                .unwrap();
            assert_eq!(page.data.len() as i64, k);
            assert_eq!(page.total, 7);
        }
    }

    #[test]
    fn paged_limit_above_total_returns_everything() {
        let conn = users(3);
        let page = execute_paged_sql(&conn, "SELECT * FROM USERS", Limit::Rows(50)).unwrap();
        assert_eq!(page.data.len(), 3);
        assert_eq!(page.total, 3);
    }

    #[test]
    fn negative_limit_is_forwarded_to_database() {
        // SQLite treats any negative LIMIT as "no upper bound".
        let conn = users(3);
        let page = execute_paged_sql(&conn, "SELECT * FROM USERS", Limit::Rows(-5)).unwrap();
        assert_eq!(page.data.len(), 3);
    }

    #[test]
    fn count_failure_aborts_before_data_query() {
        let conn = users(1);
        conn.execute_batch("CREATE TABLE audit (sql TEXT)").unwrap();
        // A statement that cannot be a subquery fails at the count step.
        let err = execute_paged_sql(
            &conn,
            "INSERT INTO audit VALUES ('should not run')",
            Limit::Rows(5),
        )
        .unwrap_err();
        assert_eq!(err.code(), "SQL_ERROR");
        let rows = execute_sql(&conn, "SELECT * FROM audit").unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn missing_table_surfaces_database_message() {
        let conn = users(1);
        let err = execute_paged_sql(&conn, "SELECT * FROM ghosts", Limit::Rows(5)).unwrap_err();
        assert!(err.to_string().contains("no such table: ghosts"));
    }
}
