use serde_json::Value;
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::{
    cli::Args,
    core::{
        connection::Database,
        tools::{ToolKind, ALL_TOOLS},
    },
    error::AppResult,
};

/// MCP server (JSON-RPC 2.0 over stdio).
///
/// Supports `initialize`, `tools/list` and `tools/call` for the same tools the
/// HTTP surface announces. Notifications (no id) are ignored.
pub async fn run(args: Args) -> AppResult<()> {
    let db = Database::open(&args.db, args.busy_timeout_ms)?
        .with_catalog_query(args.catalog_query.clone());
    tracing::info!(db = %args.db.display(), "mcp server ready on stdio");

    let stdin = io::BufReader::new(io::stdin());
    let stdout = io::BufWriter::new(io::stdout());
    serve(stdin, stdout, &db).await
}

pub async fn serve<R, W>(reader: R, mut writer: W, db: &Database) -> AppResult<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        let raw = line.trim();
        if raw.is_empty() {
            continue;
        }
        if let Some(resp) = handle_message(raw, db).await {
            write_line(&mut writer, &resp).await?;
        }
    }
    Ok(())
}

async fn handle_message(raw: &str, db: &Database) -> Option<Value> {
    let msg: Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(e) => {
            return Some(jsonrpc_error(Value::Null, -32700, format!("parse error: {e}")));
        }
    };

    let id = msg.get("id").cloned().unwrap_or(Value::Null);
    if id.is_null() {
        return None;
    }

    let Some(method) = msg.get("method").and_then(|m| m.as_str()) else {
        return Some(jsonrpc_error(id, -32600, "invalid request: missing method".into()));
    };
    tracing::debug!(method, "mcp request");

    let params = msg.get("params").cloned().unwrap_or(Value::Null);
    let resp = match method {
        "initialize" => handle_initialize(id),
        "tools/list" => handle_tools_list(id),
        "tools/call" => handle_tools_call(id, params, db).await,
        _ => jsonrpc_error(id, -32601, format!("method not found: {method}")),
    };
    Some(resp)
}

fn handle_initialize(id: Value) -> Value {
    serde_json::json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": {
            "serverInfo": {
                "name": "sql-relay",
                "version": env!("CARGO_PKG_VERSION")
            },
            "capabilities": {
                "tools": { "listChanged": false }
            }
        }
    })
}

fn handle_tools_list(id: Value) -> Value {
    let tools: Vec<Value> = ALL_TOOLS
        .iter()
        .map(|t| {
            let meta = t.metadata();
            serde_json::json!({
                "name": meta.name,
                "description": meta.description,
                "inputSchema": meta.parameters
            })
        })
        .collect();
    serde_json::json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": { "tools": tools }
    })
}

async fn handle_tools_call(id: Value, params: Value, db: &Database) -> Value {
    let Some(name) = params.get("name").and_then(|v| v.as_str()) else {
        return jsonrpc_error(id, -32602, "invalid params: missing name".into());
    };
    let Some(tool) = ToolKind::from_name(name) else {
        return jsonrpc_error(id, -32602, format!("unknown tool: {name}"));
    };
    let arguments = params.get("arguments").cloned().unwrap_or(Value::Null);

    match tool.execute(db, &arguments).await {
        Ok(structured) => {
            let text =
                serde_json::to_string_pretty(&structured).unwrap_or_else(|_| "<result>".into());
            serde_json::json!({
                "jsonrpc": "2.0",
                "id": id,
                "result": {
                    "content": [{ "type": "text", "text": text }],
                    "structuredContent": structured,
                    "isError": false
                }
            })
        }
        Err(e) => serde_json::json!({
            "jsonrpc": "2.0",
            "id": id,
            "result": {
                "content": [{ "type": "text", "text": format!("{}: {}", e.code(), e) }],
                "isError": true
            }
        }),
    }
}

async fn write_line<W: AsyncWrite + Unpin>(w: &mut W, v: &Value) -> AppResult<()> {
    let mut buf = serde_json::to_vec(v)?;
    buf.push(b'\n');
    w.write_all(&buf).await?;
    w.flush().await?;
    Ok(())
}

fn jsonrpc_error(id: Value, code: i64, message: String) -> Value {
    serde_json::json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": { "code": code, "message": message }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db_with_rows(n: i64) -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mcp.db");
        let conn = rusqlite::Connection::open(&path).unwrap();
        conn.execute_batch("CREATE TABLE t (v INTEGER)").unwrap();
        for i in 0..n {
            conn.execute("INSERT INTO t VALUES (?1)", [i]).unwrap();
        }
        drop(conn);
        let db = Database::open(&path, 1_000).unwrap();
        (dir, db)
    }

    async fn roundtrip(input: &str, db: &Database) -> Vec<Value> {
        let mut out = Vec::new();
        serve(input.as_bytes(), &mut out, db).await.unwrap();
        String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn initialize_and_list() {
        let (_dir, db) = db_with_rows(0);
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize"}"#,
            "\n\n",
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#,
            "\n"
        );
        let resps = roundtrip(input, &db).await;
        assert_eq!(resps.len(), 2);
        assert_eq!(resps[0]["result"]["serverInfo"]["name"], "sql-relay");
        let tools = resps[1]["result"]["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 3);
        assert_eq!(tools[2]["name"], "execute_sql_v2");
        assert_eq!(tools[2]["inputSchema"]["required"][0], "sql");
    }

    #[tokio::test]
    async fn call_paged_tool() {
        let (_dir, db) = db_with_rows(8);
        let input = r#"{"jsonrpc":"2.0","id":"a","method":"tools/call","params":{"name":"execute_sql_v2","arguments":{"sql":"SELECT v FROM t;","limit":3}}}"#;
        let resps = roundtrip(input, &db).await;
        let result = &resps[0]["result"];
        assert_eq!(result["isError"], false);
        assert_eq!(result["structuredContent"]["total"], 8);
        assert_eq!(result["structuredContent"]["data"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn tool_failures_are_reported_in_result() {
        let (_dir, db) = db_with_rows(0);
        let input = r#"{"jsonrpc":"2.0","id":5,"method":"tools/call","params":{"name":"execute_sql","arguments":{"sql":"SELECT * FROM missing"}}}"#;
        let resps = roundtrip(input, &db).await;
        let result = &resps[0]["result"];
        assert_eq!(result["isError"], true);
        let text = result["content"][0]["text"].as_str().unwrap();
        assert!(text.starts_with("SQL_ERROR"));
        assert!(text.contains("no such table: missing"));
    }

    #[tokio::test]
    async fn protocol_errors() {
        let (_dir, db) = db_with_rows(0);
        let input = concat!(
            "not json\n",
            r#"{"jsonrpc":"2.0","id":1}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"prompts/list"}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"nope"}}"#,
            "\n"
        );
        let resps = roundtrip(input, &db).await;
        let codes: Vec<i64> = resps
            .iter()
            .map(|r| r["error"]["code"].as_i64().unwrap())
            .collect();
        assert_eq!(codes, [-32700, -32600, -32601, -32602]);
    }
}
