use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::DateTime;
use rusqlite::{types::ValueRef, Batch, Connection, Row, Statement};
use serde_json::Value;

use crate::core::types::{ColumnMeta, DbRow, ResultSet};
use crate::error::{AppError, AppResult};

/// Runs `sql` and materializes every row before returning.
pub fn execute(conn: &Connection, sql: &str) -> AppResult<ResultSet> {
    let mut stmt = prepare_single(conn, sql)?;
    let columns: Vec<ColumnMeta> = stmt
        .columns()
        .iter()
        .map(|c| ColumnMeta {
            name: c.name().to_string(),
            decl_type: c.decl_type().map(|s| s.to_string()),
        })
        .collect();

    let mut rows = Vec::new();
    let mut r = stmt.query([])?;
    while let Some(row) = r.next()? {
        rows.push(row_to_json_object(row, &columns)?);
    }
    tracing::debug!(rows = rows.len(), columns = columns.len(), "query materialized");
    Ok(rows)
}

/// Runs a statement that must yield exactly one row with one integer column.
pub fn execute_scalar_count(conn: &Connection, sql: &str) -> AppResult<i64> {
    let mut stmt = prepare_single(conn, sql)?;
    let column_count = stmt.column_count();
    if column_count != 1 {
        return Err(AppError::SqlError(format!(
            "count query returned {column_count} columns, expected 1"
        )));
    }

    let mut r = stmt.query([])?;
    let Some(row) = r.next()? else {
        return Err(AppError::SqlError("count query returned no rows".into()));
    };
    let count = scalar_as_i64(row.get_ref(0)?)?;
    if r.next()?.is_some() {
        return Err(AppError::SqlError(
            "count query returned more than one row".into(),
        ));
    }
    Ok(count)
}

/// Prepares exactly one statement; `prepare` alone would drop any trailing ones.
fn prepare_single<'conn>(conn: &'conn Connection, sql: &str) -> AppResult<Statement<'conn>> {
    let mut batch = Batch::new(conn, sql);
    let Some(stmt) = batch.next()? else {
        return Err(AppError::SqlError("empty statement: no SQL to execute".into()));
    };
    match batch.next() {
        Ok(None) => Ok(stmt),
        // An unparsable tail is still a second statement.
        Ok(Some(_)) | Err(_) => Err(rusqlite::Error::MultipleStatement.into()),
    }
}

fn scalar_as_i64(v: ValueRef<'_>) -> AppResult<i64> {
    match v {
        ValueRef::Integer(n) => Ok(n),
        ValueRef::Real(x)
            if x.fract() == 0.0 && x >= i64::MIN as f64 && x < i64::MAX as f64 =>
        {
            Ok(x as i64)
        }
        ValueRef::Text(t) => {
            let s = String::from_utf8_lossy(t);
            s.trim()
                .parse::<i64>()
                .map_err(|_| AppError::SqlError(format!("count value is not an integer: {s}")))
        }
        other => Err(AppError::SqlError(format!(
            "count value is not an integer: {:?}",
            other.data_type()
        ))),
    }
}

fn row_to_json_object(row: &Row<'_>, columns: &[ColumnMeta]) -> AppResult<DbRow> {
    let mut out = DbRow::with_capacity(columns.len());
    for (i, col) in columns.iter().enumerate() {
        let v = to_json(row.get_ref(i)?, col.decl_type.as_deref());
        out.insert(col.name.clone(), v);
    }
    Ok(out)
}

/// Maps SQLite storage classes to JSON, using the declared column type to
/// recover booleans and integer timestamps.
fn to_json(v: ValueRef<'_>, decl_type: Option<&str>) -> Value {
    let affinity = decl_type.map(|t| t.to_ascii_uppercase());
    let affinity = affinity.as_deref().unwrap_or("");

    match v {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(x) if affinity == "BOOL" || affinity == "BOOLEAN" => Value::Bool(x != 0),
        ValueRef::Integer(x) if affinity.contains("DATE") || affinity.contains("TIME") => {
            match DateTime::from_timestamp(x, 0) {
                Some(ts) => Value::from(ts.to_rfc3339()),
                None => Value::from(x),
            }
        }
        ValueRef::Integer(x) => Value::from(x),
        // serde_json has no representation for NaN/inf.
        ValueRef::Real(x) => serde_json::Number::from_f64(x)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(t) => Value::from(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => serde_json::json!({
            "$type": "blob",
            "base64": STANDARD.encode(b),
            "size": b.len()
        }),
    }
}
