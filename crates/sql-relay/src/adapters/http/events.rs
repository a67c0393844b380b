use axum::{
    extract::{Query, State},
    response::sse::{Event, Sse},
};
use futures_util::stream::{self, Stream};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::AppState;
use crate::core::tools::{ToolMetadata, ALL_TOOLS};

#[derive(Debug, Deserialize)]
pub struct ListToolsParams {
    #[serde(default)]
    pub client_id: Option<String>,
}

/// Payload of the single `list_tools` event.
#[derive(Debug, Serialize)]
pub struct ToolListMessage {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub event: &'static str,
    pub data: Vec<ToolMetadata>,
    pub id: String,
    pub timestamp: i64,
}

impl ToolListMessage {
    fn new() -> Self {
        Self {
            kind: "tool_list",
            event: "list_tools",
            data: ALL_TOOLS.iter().map(|t| t.metadata()).collect(),
            id: Uuid::new_v4().to_string(),
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }
}

/// Announces the available tools, then ends the stream.
///
/// The client stays in the registry until its event has been produced or the
/// connection goes away, whichever comes first.
pub async fn list_tools(
    State(state): State<AppState>,
    Query(params): Query<ListToolsParams>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let client_id = params
        .client_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let guard = state.clients.register(client_id);

    let events = stream::once(async move {
        let message = ToolListMessage::new();
        tracing::debug!(
            client_id = guard.client_id(),
            tools = message.data.len(),
            "sending tool list"
        );
        let event = Event::default()
            .event(message.event)
            .id(message.id.clone())
            .json_data(&message);
        drop(guard);
        event
    });

    Sse::new(events)
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use super::super::test_support::{app_with_users, get};

    fn data_line(body: &str) -> serde_json::Value {
        let line = body
            .lines()
            .find_map(|l| l.strip_prefix("data:"))
            .expect("data line");
        serde_json::from_str(line.trim()).unwrap()
    }

    #[tokio::test]
    async fn streams_tool_list_then_closes() {
        let app = app_with_users(0);
        let (status, body) = get(&app, "/api/mcp/tools?client_id=alice").await;
        assert_eq!(status, StatusCode::OK);
        let event = body.lines().find_map(|l| l.strip_prefix("event:"));
        assert_eq!(event.map(str::trim), Some("list_tools"));

        let msg = data_line(&body);
        assert_eq!(msg["type"], "tool_list");
        assert_eq!(msg["event"], "list_tools");
        assert!(msg["timestamp"].as_i64().unwrap() > 0);
        let names: Vec<&str> = msg["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, ["get_true_tables", "execute_sql", "execute_sql_v2"]);
        assert_eq!(msg["data"][0]["endpoint"], "/api/get_true_tables");

        assert!(!app.state.clients.contains("alice"));
        assert_eq!(app.state.clients.len(), 0);
    }

    #[tokio::test]
    async fn missing_client_id_still_works() {
        let app = app_with_users(0);
        let (status, body) = get(&app, "/api/mcp/tools").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(data_line(&body)["data"].as_array().unwrap().len(), 3);
        assert_eq!(app.state.clients.len(), 0);
    }
}
