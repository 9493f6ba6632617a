use crate::actions::ActionRegistry;
use crate::error::ActionError;
use crate::ethereum::EthereumClient;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, error, info, warn};

pub const PROTOCOL_VERSION: &str = "2024-11-05";

const PARSE_ERROR: i32 = -32700;
const METHOD_NOT_FOUND: i32 = -32601;
const INVALID_PARAMS: i32 = -32602;
const INTERNAL_ERROR: i32 = -32603;

#[derive(Serialize, Deserialize, Debug)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    pub params: Option<Value>,
    pub id: Option<Value>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    pub id: Option<Value>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    pub data: Option<Value>,
}

impl JsonRpcResponse {
    fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            result: Some(result),
            error: None,
            id,
        }
    }

    fn failure(id: Option<Value>, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
                data: None,
            }),
            id,
        }
    }
}

/// Serves the registry over line-delimited JSON-RPC on stdin/stdout until EOF.
pub async fn run(client: EthereumClient, registry: ActionRegistry) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    info!(
        actions = registry.len(),
        signer = %client.signer_address,
        "MCP Server Ready. Waiting for JSON-RPC requests on stdin..."
    );

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        debug!("Received request: {}", line);

        let req: JsonRpcRequest = match serde_json::from_str(&line) {
            Ok(r) => r,
            Err(e) => {
                error!("Failed to parse JSON-RPC request: {}", e);
                let response =
                    JsonRpcResponse::failure(None, PARSE_ERROR, format!("Parse error: {e}"));
                println!("{}", serde_json::to_string(&response)?);
                continue;
            }
        };

        if let Some(response) = handle_request(&req, &client, &registry).await {
            println!("{}", serde_json::to_string(&response)?);
        }
    }

    info!("stdin closed, shutting down");
    Ok(())
}

/// Dispatches a single request. Notifications (no `id`) produce no response.
pub async fn handle_request(
    req: &JsonRpcRequest,
    client: &EthereumClient,
    registry: &ActionRegistry,
) -> Option<JsonRpcResponse> {
    if req.id.is_none() {
        debug!(method = %req.method, "ignoring notification");
        return None;
    }
    let id = req.id.clone();

    let response = match req.method.as_str() {
        "initialize" => JsonRpcResponse::success(
            id,
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": { "tools": {} },
                "serverInfo": {
                    "name": env!("CARGO_PKG_NAME"),
                    "version": env!("CARGO_PKG_VERSION")
                }
            }),
        ),
        "ping" => JsonRpcResponse::success(id, json!({})),
        "tools/list" => JsonRpcResponse::success(id, json!({ "tools": registry.definitions() })),
        "tools/call" => call_tool(id, req.params.as_ref(), client, registry).await,
        other => {
            warn!(method = other, "unknown method");
            JsonRpcResponse::failure(id, METHOD_NOT_FOUND, "Method not found")
        }
    };
    Some(response)
}

async fn call_tool(
    id: Option<Value>,
    params: Option<&Value>,
    client: &EthereumClient,
    registry: &ActionRegistry,
) -> JsonRpcResponse {
    let Some(params) = params else {
        return JsonRpcResponse::failure(id, INVALID_PARAMS, "Missing params");
    };
    let Some(tool_name) = params.get("name").and_then(|v| v.as_str()) else {
        return JsonRpcResponse::failure(id, INVALID_PARAMS, "Missing 'name' parameter");
    };
    let Some(action) = registry.get(tool_name) else {
        return JsonRpcResponse::failure(
            id,
            METHOD_NOT_FOUND,
            format!("Tool not found: {tool_name}"),
        );
    };
    let args = params.get("arguments").cloned().unwrap_or(json!({}));

    info!(tool = tool_name, "calling action");
    match action.call(client, args).await {
        Ok(text) => JsonRpcResponse::success(id, tool_result(text)),
        Err(e) => {
            error!(tool = tool_name, "action failed: {:#}", e);
            let code = match e.downcast_ref::<ActionError>() {
                Some(err) if err.is_invalid_input() => INVALID_PARAMS,
                _ => INTERNAL_ERROR,
            };
            JsonRpcResponse::failure(id, code, format!("Tool execution failed: {e:#}"))
        }
    }
}

/// MCP tool result carrying the action's text output.
fn tool_result(text: String) -> Value {
    json!({ "content": [{ "type": "text", "text": text }] })
}
