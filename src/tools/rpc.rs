//! Newline-delimited JSON-RPC 2.0 over stdio.
//!
//! Implements the subset an LLM tool host needs: `initialize`,
//! `tools/list` and `tools/call`. Requests without an `id` are
//! notifications and get no response.

use std::io::{self, BufRead, Write};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::storage::ProgressStore;
use crate::tools::runner::{ToolName, ToolRunner};

/// Protocol revision reported by `initialize`.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

pub const PARSE_ERROR: i32 = -32700;
pub const INVALID_REQUEST: i32 = -32600;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;

#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    #[allow(dead_code)]
    pub jsonrpc: String,
    pub id: Option<Value>,
    pub method: String,
    pub params: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: &'static str,
    pub id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
}

impl JsonRpcResponse {
    fn result(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }

    fn error(id: Option<Value>, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
            }),
        }
    }
}

#[derive(Debug, Serialize)]
struct ToolContent {
    r#type: &'static str,
    text: String,
}

#[derive(Debug, Serialize)]
struct ToolCallResult {
    content: Vec<ToolContent>,
    #[serde(rename = "isError")]
    is_error: bool,
}

// ---------------------------------------------------------------------------
// Server loop
// ---------------------------------------------------------------------------

/// Serve requests from `input` until EOF, writing one response per line to `output`.
///
/// A line that is not valid UTF-8 gets a parse error response and the
/// loop continues.
pub fn serve<S, R, W>(runner: &ToolRunner<S>, mut input: R, mut output: W) -> io::Result<()>
where
    S: ProgressStore,
    R: BufRead,
    W: Write,
{
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if input.read_until(b'\n', &mut buf)? == 0 {
            break;
        }

        let response = match std::str::from_utf8(&buf) {
            Ok(line) if line.trim().is_empty() => continue,
            Ok(line) => handle_line(runner, line),
            Err(e) => {
                warn!(error = %e, "request line is not valid UTF-8");
                Some(JsonRpcResponse::error(
                    None,
                    PARSE_ERROR,
                    format!("parse error: {e}"),
                ))
            }
        };

        if let Some(response) = response {
            serde_json::to_writer(&mut output, &response)?;
            writeln!(output)?;
            output.flush()?;
        }
    }
    debug!("input closed, stopping server");
    Ok(())
}

/// Handle one raw line. Returns `None` for notifications.
pub fn handle_line<S: ProgressStore>(runner: &ToolRunner<S>, line: &str) -> Option<JsonRpcResponse> {
    let raw: Value = match serde_json::from_str(line) {
        Ok(v) => v,
        Err(e) => {
            return Some(JsonRpcResponse::error(
                None,
                PARSE_ERROR,
                format!("parse error: {e}"),
            ))
        }
    };

    // Notifications have no "id" key
    if !raw
        .as_object()
        .map(|o| o.contains_key("id"))
        .unwrap_or(false)
    {
        debug!("ignoring notification");
        return None;
    }

    let id = raw.get("id").cloned();
    match serde_json::from_value::<JsonRpcRequest>(raw) {
        Ok(request) => Some(handle_request(&request, runner)),
        Err(e) => Some(JsonRpcResponse::error(
            id,
            INVALID_REQUEST,
            format!("invalid request: {e}"),
        )),
    }
}

// ---------------------------------------------------------------------------
// Request dispatch
// ---------------------------------------------------------------------------

pub fn handle_request<S: ProgressStore>(
    req: &JsonRpcRequest,
    runner: &ToolRunner<S>,
) -> JsonRpcResponse {
    debug!(method = %req.method, "rpc request");
    match req.method.as_str() {
        "initialize" => JsonRpcResponse::result(
            req.id.clone(),
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {
                    "tools": {}
                },
                "serverInfo": {
                    "name": "tutor",
                    "version": env!("CARGO_PKG_VERSION")
                }
            }),
        ),

        "ping" => JsonRpcResponse::result(req.id.clone(), json!({})),

        "tools/list" => {
            let tool_list: Vec<Value> = ToolName::ALL
                .iter()
                .map(|t| {
                    json!({
                        "name": t.as_str(),
                        "description": t.description(),
                        "inputSchema": t.schema()
                    })
                })
                .collect();
            JsonRpcResponse::result(req.id.clone(), json!({ "tools": tool_list }))
        }

        "tools/call" => {
            let Some(params) = &req.params else {
                return JsonRpcResponse::error(req.id.clone(), INVALID_PARAMS, "missing params");
            };

            let Some(tool_name) = params["name"].as_str() else {
                return JsonRpcResponse::error(
                    req.id.clone(),
                    INVALID_PARAMS,
                    "missing tool name in params",
                );
            };

            if ToolName::parse(tool_name).is_none() {
                return JsonRpcResponse::error(
                    req.id.clone(),
                    METHOD_NOT_FOUND,
                    format!("tool not found: {tool_name}"),
                );
            }

            let args = params.get("arguments").cloned().unwrap_or(Value::Null);
            let output = runner.call(tool_name, args);

            let call_result = ToolCallResult {
                content: vec![ToolContent {
                    r#type: "text",
                    text: output.text,
                }],
                is_error: output.is_error,
            };

            JsonRpcResponse::result(
                req.id.clone(),
                serde_json::to_value(&call_result)
                    .unwrap_or_else(|e| json!({"error": e.to_string()})),
            )
        }

        other => JsonRpcResponse::error(
            req.id.clone(),
            METHOD_NOT_FOUND,
            format!("method not found: {other}"),
        ),
    }
}
