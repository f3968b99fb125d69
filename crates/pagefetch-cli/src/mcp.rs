//! MCP (Model Context Protocol) server implementation

use pagefetch::{FetchRequest, Tool, TOOL_DESCRIPTION};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::io::{self, BufRead, Write};
use tracing::{debug, warn};

/// Name the fetch tool is advertised under
const TOOL_NAME: &str = "fetch";

/// JSON-RPC 2.0 request
#[derive(Debug, Deserialize)]
struct JsonRpcRequest {
    #[serde(default)]
    id: Option<Value>,
    method: String,
    #[serde(default)]
    params: Value,
}

/// JSON-RPC 2.0 response
#[derive(Debug, Serialize)]
struct JsonRpcResponse {
    jsonrpc: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
}

/// JSON-RPC 2.0 error
#[derive(Debug, Serialize)]
struct JsonRpcError {
    code: i32,
    message: String,
}

impl JsonRpcResponse {
    fn success(id: Option<Value>, result: Value) -> Self {
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

/// MCP Server implementation
struct McpServer {
    tool: Tool,
}

impl McpServer {
    fn new(tool: Tool) -> Self {
        Self { tool }
    }

    /// Handle one line of input; `None` when no reply is due
    async fn handle_line(&self, line: &str) -> Option<String> {
        let response = match serde_json::from_str::<JsonRpcRequest>(line) {
            Ok(request) => {
                // Notifications carry no id and get no reply
                if request.id.is_none() && request.method.starts_with("notifications/") {
                    debug!(method = %request.method, "Notification received");
                    return None;
                }
                self.handle_request(request).await
            }
            Err(e) => {
                warn!("Unparsable request: {}", e);
                JsonRpcResponse::error(None, -32700, format!("Parse error: {}", e))
            }
        };
        Some(serde_json::to_string(&response).unwrap_or_default())
    }

    async fn handle_request(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        debug!(method = %request.method, "Request received");
        match request.method.as_str() {
            "initialize" => self.handle_initialize(request.id),
            "tools/list" => self.handle_tools_list(request.id),
            "tools/call" => self.handle_tools_call(request.id, request.params).await,
            "ping" => JsonRpcResponse::success(request.id, json!({})),
            _ => JsonRpcResponse::error(
                request.id,
                -32601,
                format!("Method not found: {}", request.method),
            ),
        }
    }

    fn handle_initialize(&self, id: Option<Value>) -> JsonRpcResponse {
        JsonRpcResponse::success(
            id,
            json!({
                "protocolVersion": "2024-11-05",
                "capabilities": {
                    "tools": {}
                },
                "serverInfo": {
                    "name": "pagefetch",
                    "version": env!("CARGO_PKG_VERSION")
                }
            }),
        )
    }

    fn handle_tools_list(&self, id: Option<Value>) -> JsonRpcResponse {
        JsonRpcResponse::success(
            id,
            json!({
                "tools": [{
                    "name": TOOL_NAME,
                    "description": TOOL_DESCRIPTION,
                    "inputSchema": self.tool.input_schema()
                }]
            }),
        )
    }

    async fn handle_tools_call(&self, id: Option<Value>, params: Value) -> JsonRpcResponse {
        let tool_name = params
            .get("name")
            .and_then(|v| v.as_str())
            .unwrap_or_default();

        if tool_name != TOOL_NAME {
            return JsonRpcResponse::error(id, -32602, format!("Unknown tool: {}", tool_name));
        }

        let arguments = params.get("arguments").cloned().unwrap_or(json!({}));
        let request: FetchRequest = match serde_json::from_value(arguments) {
            Ok(req) => req,
            Err(e) => {
                return JsonRpcResponse::error(id, -32602, format!("Invalid arguments: {}", e));
            }
        };

        let output = self.tool.call(request).await;
        JsonRpcResponse::success(
            id,
            json!({
                "content": [{
                    "type": "text",
                    "text": output.text
                }],
                "isError": output.is_error
            }),
        )
    }
}

/// Run the MCP server over stdio
pub async fn run_server() {
    let server = McpServer::new(Tool::default());
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                warn!("Error reading stdin: {}", e);
                continue;
            }
        };

        if line.trim().is_empty() {
            continue;
        }

        if let Some(reply) = server.handle_line(&line).await {
            let _ = writeln!(stdout, "{}", reply);
            let _ = stdout.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn reply(server: &McpServer, line: &str) -> Value {
        let raw = server.handle_line(line).await.unwrap();
        serde_json::from_str(&raw).unwrap()
    }

    #[tokio::test]
    async fn test_initialize() {
        let server = McpServer::new(Tool::default());
        let resp = reply(&server, r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#).await;

        assert_eq!(resp["id"], 1);
        assert_eq!(resp["result"]["serverInfo"]["name"], "pagefetch");
        assert!(resp["result"]["capabilities"]["tools"].is_object());
    }

    #[tokio::test]
    async fn test_notifications_get_no_reply() {
        let server = McpServer::new(Tool::default());
        let raw = server
            .handle_line(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
            .await;
        assert!(raw.is_none());
    }

    #[tokio::test]
    async fn test_tools_list() {
        let server = McpServer::new(Tool::default());
        let resp = reply(&server, r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#).await;

        let tool = &resp["result"]["tools"][0];
        assert_eq!(tool["name"], "fetch");
        assert!(tool["inputSchema"]["properties"]["url"].is_object());
        assert!(tool["inputSchema"]["properties"]["start_index"].is_object());
    }

    #[tokio::test]
    async fn test_unknown_method_and_parse_error() {
        let server = McpServer::new(Tool::default());

        let resp = reply(&server, r#"{"jsonrpc":"2.0","id":3,"method":"resources/list"}"#).await;
        assert_eq!(resp["error"]["code"], -32601);

        let resp = reply(&server, "{not json").await;
        assert_eq!(resp["error"]["code"], -32700);
    }

    #[tokio::test]
    async fn test_tools_call_rejects_bad_input() {
        let server = McpServer::new(Tool::default());

        let resp = reply(
            &server,
            r#"{"jsonrpc":"2.0","id":4,"method":"tools/call","params":{"name":"other","arguments":{}}}"#,
        )
        .await;
        assert_eq!(resp["error"]["code"], -32602);

        let resp = reply(
            &server,
            r#"{"jsonrpc":"2.0","id":5,"method":"tools/call","params":{"name":"fetch","arguments":{"url":"https://example.com","max_length":"many"}}}"#,
        )
        .await;
        assert_eq!(resp["error"]["code"], -32602);
    }

    #[tokio::test]
    async fn test_tools_call_failure_sets_is_error() {
        let server = McpServer::new(Tool::default());
        let resp = reply(
            &server,
            r#"{"jsonrpc":"2.0","id":6,"method":"tools/call","params":{"name":"fetch","arguments":{"url":"ftp://example.com/file"}}}"#,
        )
        .await;

        assert_eq!(resp["result"]["isError"], true);
        let text = resp["result"]["content"][0]["text"].as_str().unwrap();
        assert!(text.contains("only http and https"));
    }

    #[tokio::test]
    async fn test_tools_call_success() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/notes.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("0123456789", "text/plain"))
            .mount(&mock_server)
            .await;

        let server = McpServer::new(Tool::default());
        let line = json!({
            "jsonrpc": "2.0",
            "id": 7,
            "method": "tools/call",
            "params": {
                "name": "fetch",
                "arguments": {
                    "url": format!("{}/notes.txt", mock_server.uri()),
                    "max_length": 4,
                    "start_index": 2
                }
            }
        })
        .to_string();
        let resp = reply(&server, &line).await;

        assert_eq!(resp["result"]["isError"], false);
        let text = resp["result"]["content"][0]["text"].as_str().unwrap();
        assert!(text.contains(":\n2345\n\n<error>Content truncated."));
        assert!(text.ends_with("start_index of 6 to get more content.</error>"));
    }
}
