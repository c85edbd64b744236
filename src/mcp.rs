//! MCP (Model Context Protocol) server over stdio and HTTP.
//!
//! Exposes the prompt library both as MCP prompts (`prompts/list`,
//! `prompts/get`) for editors to insert, and as tools for managing it.

use std::sync::Arc;

use anyhow::Result;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt};

use crate::tools::ToolRegistry;

const PROTOCOL_VERSION: &str = "2024-11-05";

#[derive(Deserialize)]
struct JsonRpcRequest {
    jsonrpc: String,
    id: Option<Value>,
    method: String,
    #[serde(default)]
    params: Value,
}

#[derive(Serialize)]
struct JsonRpcResponse {
    jsonrpc: String,
    id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
}

#[derive(Serialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

impl JsonRpcResponse {
    fn ok(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            id,
            result: Some(result),
            error: None,
        }
    }
    fn err(id: Value, code: i64, message: String) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            id,
            result: None,
            error: Some(JsonRpcError { code, message }),
        }
    }
}

/// Build a JSON-RPC error response.
pub fn rpc_err(id: Value, code: i64, message: &str) -> Value {
    serde_json::to_value(JsonRpcResponse::err(id, code, message.to_string())).unwrap_or(Value::Null)
}

#[derive(Clone)]
pub struct McpState {
    pub registry: Arc<ToolRegistry>,
    pub name: String,
}

type RpcResult = Result<Value, (i64, String)>;

/// Dispatch one JSON-RPC request and return the response object.
pub async fn handle_request(state: &McpState, req: &Value) -> Value {
    let id = req.get("id").cloned().unwrap_or(Value::Null);
    let req: JsonRpcRequest = match serde_json::from_value(req.clone()) {
        Ok(r) => r,
        Err(e) => return rpc_err(id, -32600, &format!("Invalid request: {e}")),
    };
    if req.jsonrpc != "2.0" {
        return rpc_err(id, -32600, "Invalid JSON-RPC version");
    }

    let result = match req.method.as_str() {
        "initialize" => Ok(json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": { "tools": {}, "prompts": {} },
            "serverInfo": { "name": state.name, "version": env!("CARGO_PKG_VERSION") }
        })),
        "ping" => Ok(json!({})),
        "tools/list" => Ok(json!({ "tools": state.registry.tool_defs() })),
        "tools/call" => tools_call(&state.registry, &req.params).await,
        "prompts/list" => prompts_list(&state.registry).await,
        "prompts/get" => prompts_get(&state.registry, &req.params).await,
        _ => Err((-32601, format!("Method not found: {}", req.method))),
    };
    let resp = match result {
        Ok(v) => JsonRpcResponse::ok(req.id.unwrap_or(Value::Null), v),
        Err((code, msg)) => JsonRpcResponse::err(req.id.unwrap_or(Value::Null), code, msg),
    };
    serde_json::to_value(resp).unwrap_or(Value::Null)
}

async fn tools_call(registry: &ToolRegistry, params: &Value) -> RpcResult {
    let name = params["name"]
        .as_str()
        .ok_or((-32602, "Missing tool name".to_string()))?;
    let args = match &params["arguments"] {
        Value::Null => json!({}),
        other => other.clone(),
    };
    let result = registry
        .execute(name, args)
        .await
        .map_err(|e| (-32000, e.to_string()))?;
    Ok(json!({ "content": [{ "type": "text", "text": result.text }] }))
}

async fn prompts_list(registry: &ToolRegistry) -> RpcResult {
    let prompts: Vec<Value> = registry
        .store()
        .lock()
        .await
        .list()
        .into_iter()
        .map(|p| {
            json!({
                "name": p.id,
                "title": p.title,
                "description": p.description,
            })
        })
        .collect();
    Ok(json!({ "prompts": prompts }))
}

async fn prompts_get(registry: &ToolRegistry, params: &Value) -> RpcResult {
    let name = params["name"]
        .as_str()
        .ok_or((-32602, "Missing prompt name".to_string()))?;
    let store = registry.store().lock().await;
    let prompt = store
        .get_by_id(name)
        .ok_or_else(|| (-32602, format!("Unknown prompt: {name}")))?;
    Ok(json!({
        "description": prompt.description,
        "messages": [{
            "role": "user",
            "content": { "type": "text", "text": prompt.prompt }
        }]
    }))
}

/// Serve newline-delimited JSON-RPC on stdin/stdout until EOF.
pub async fn serve_stdio(state: McpState) -> Result<()> {
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();
    let mut lines = stdin.lines();
    tracing::info!("MCP server ready on stdio");

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let Some(resp) = handle_message(&state, line.as_bytes()).await else {
            continue;
        };
        let mut buf = serde_json::to_vec(&resp)?;
        buf.push(b'\n');
        stdout.write_all(&buf).await?;
        stdout.flush().await?;
    }
    Ok(())
}

/// Handle one raw JSON-RPC message. Returns `None` for notifications,
/// which get no response; unparsable input yields a `-32700` error.
pub async fn handle_message(state: &McpState, raw: &[u8]) -> Option<Value> {
    match serde_json::from_slice::<Value>(raw) {
        Ok(req) if is_notification(&req) => None,
        Ok(req) => Some(handle_request(state, &req).await),
        Err(e) => Some(rpc_err(Value::Null, -32700, &format!("Parse error: {e}"))),
    }
}

/// Only an object without `id` is a notification; anything else is answered.
fn is_notification(req: &Value) -> bool {
    req.as_object().is_some_and(|obj| !obj.contains_key("id"))
}

/// HTTP transport: JSON-RPC over `POST /mcp`.
pub fn router(state: McpState) -> Router {
    Router::new()
        .route("/mcp", post(handle_http))
        .with_state(state)
}

async fn handle_http(State(state): State<McpState>, body: Bytes) -> Response {
    match handle_message(&state, &body).await {
        Some(resp) => Json(resp).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::PromptStore;
    use tempfile::TempDir;

    async fn state() -> (TempDir, McpState) {
        let tmp = TempDir::new().unwrap();
        let store = PromptStore::initialize(tmp.path().join("prompts.json"))
            .await
            .unwrap()
            .into_shared();
        let state = McpState {
            registry: Arc::new(ToolRegistry::with_prompt_tools(store)),
            name: "prompt-vault".into(),
        };
        (tmp, state)
    }

    fn request(id: i64, method: &str, params: Value) -> Value {
        json!({ "jsonrpc": "2.0", "id": id, "method": method, "params": params })
    }

    #[tokio::test]
    async fn test_initialize_advertises_prompts() {
        let (_tmp, state) = state().await;
        let resp = handle_request(&state, &request(1, "initialize", json!({}))).await;
        assert_eq!(resp["id"], 1);
        assert_eq!(resp["result"]["protocolVersion"], PROTOCOL_VERSION);
        assert!(resp["result"]["capabilities"]["prompts"].is_object());
        assert_eq!(resp["result"]["serverInfo"]["name"], "prompt-vault");
    }

    #[tokio::test]
    async fn test_tools_list_uses_input_schema() {
        let (_tmp, state) = state().await;
        let resp = handle_request(&state, &request(2, "tools/list", json!({}))).await;
        let tools = resp["result"]["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 5);
        assert_eq!(tools[0]["name"], "add_prompt");
        assert_eq!(tools[0]["inputSchema"]["type"], "object");
    }

    #[tokio::test]
    async fn test_prompts_list_and_get() {
        let (_tmp, state) = state().await;
        let resp = handle_request(&state, &request(3, "prompts/list", json!({}))).await;
        let prompts = resp["result"]["prompts"].as_array().unwrap();
        let names: Vec<_> = prompts.iter().map(|p| p["name"].as_str().unwrap()).collect();
        assert_eq!(names, ["default-1", "default-2", "default-3"]);

        let resp = handle_request(
            &state,
            &request(4, "prompts/get", json!({"name": "default-1"})),
        )
        .await;
        assert_eq!(
            resp["result"]["description"],
            "Ask Claude to review code for bugs and improvements"
        );
        let text = resp["result"]["messages"][0]["content"]["text"].as_str().unwrap();
        assert!(text.starts_with("Please review the following code"));
    }

    #[tokio::test]
    async fn test_prompts_get_unknown() {
        let (_tmp, state) = state().await;
        let resp = handle_request(&state, &request(5, "prompts/get", json!({"name": "nope"}))).await;
        assert_eq!(resp["error"]["code"], -32602);
        assert!(resp.get("result").is_none());
    }

    #[tokio::test]
    async fn test_tools_call_mutation_is_visible_in_prompts_list() {
        let (_tmp, state) = state().await;
        let call = request(
            6,
            "tools/call",
            json!({
                "name": "add_prompt",
                "arguments": {"id": "x", "title": "T", "description": "D", "prompt": "P"}
            }),
        );
        let resp = handle_request(&state, &call).await;
        assert_eq!(resp["result"]["content"][0]["text"], "Added prompt 'x'");

        let resp = handle_request(&state, &request(7, "prompts/list", json!({}))).await;
        let prompts = resp["result"]["prompts"].as_array().unwrap();
        assert_eq!(prompts.last().unwrap()["name"], "x");
    }

    #[tokio::test]
    async fn test_tools_call_error_is_rpc_error() {
        let (_tmp, state) = state().await;
        let call = request(
            8,
            "tools/call",
            json!({"name": "delete_prompt", "arguments": {"id": "ghost"}}),
        );
        let resp = handle_request(&state, &call).await;
        assert_eq!(resp["error"]["code"], -32000);
        assert_eq!(resp["error"]["message"], "No prompt with id 'ghost'");
    }

    #[tokio::test]
    async fn test_unknown_method_and_bad_version() {
        let (_tmp, state) = state().await;
        let resp = handle_request(&state, &request(9, "resources/list", json!({}))).await;
        assert_eq!(resp["error"]["code"], -32601);

        let bad = json!({ "jsonrpc": "1.0", "id": 10, "method": "ping" });
        let resp = handle_request(&state, &bad).await;
        assert_eq!(resp["error"]["code"], -32600);
        assert_eq!(resp["id"], 10);
    }

    #[test]
    fn test_notification_detection() {
        assert!(is_notification(&json!({"jsonrpc": "2.0", "method": "notifications/initialized"})));
        assert!(!is_notification(&json!({"jsonrpc": "2.0", "id": 0, "method": "ping"})));
        assert!(!is_notification(&json!(42)));
        assert!(!is_notification(&json!("x")));
        assert!(!is_notification(&json!([])));
        assert!(!is_notification(&json!([{"jsonrpc": "2.0", "id": 1, "method": "ping"}])));
    }

    #[tokio::test]
    async fn test_non_object_messages_get_invalid_request() {
        let (_tmp, state) = state().await;
        for raw in [
            "42",
            r#""x""#,
            "[]",
            r#"[{"jsonrpc":"2.0","id":1,"method":"ping"}]"#,
        ] {
            let resp = handle_message(&state, raw.as_bytes()).await.unwrap();
            assert_eq!(resp["error"]["code"], -32600, "{raw}");
            assert_eq!(resp["id"], Value::Null);
        }
    }

    #[tokio::test]
    async fn test_handle_message_parse_error_and_notification() {
        let (_tmp, state) = state().await;
        let resp = handle_message(&state, b"{not json").await.unwrap();
        assert_eq!(resp["error"]["code"], -32700);
        assert_eq!(resp["id"], Value::Null);
        assert!(resp["error"]["message"].as_str().unwrap().starts_with("Parse error"));

        let note = br#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#;
        assert!(handle_message(&state, note).await.is_none());

        let ping = br#"{"jsonrpc":"2.0","id":"a","method":"ping"}"#;
        let resp = handle_message(&state, ping).await.unwrap();
        assert_eq!(resp["id"], "a");
        assert_eq!(resp["result"], json!({}));
    }
}
