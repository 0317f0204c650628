//! MCP server: tool registry and stdio serve loop.
//!
//! Requests arrive as newline-delimited JSON-RPC on stdin; responses are
//! written back to stdout, one per line. Everything else (logs, device
//! authorization prompts) belongs on stderr.

use crate::error::McpResult;
use crate::protocol::{
    CallToolParams, InitializeResult, JsonRpcRequest, JsonRpcResponse, ListToolsResult, McpTool,
    ServerCapabilities, ServerInfo, ToolCallResult, ToolsCapability, PROTOCOL_VERSION,
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

/// Trait for tool execution.
///
/// Implementations return either a success payload or a human-readable
/// error string; they never panic past this boundary.
#[async_trait::async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Execute the tool with given arguments.
    async fn execute(&self, args: Value) -> Result<String, String>;
}

/// A registered tool: metadata plus its executor.
#[derive(Clone)]
pub struct ServerTool {
    /// Tool name/ID.
    pub name: String,
    /// Tool description.
    pub description: String,
    /// JSON Schema for parameters.
    pub parameters: Value,
    /// Tool executor.
    pub executor: Arc<dyn ToolExecutor>,
}

impl std::fmt::Debug for ServerTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerTool")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish()
    }
}

/// MCP server serving a fixed tool menu over stdio.
pub struct McpServer {
    name: String,
    version: String,
    tools: HashMap<String, ServerTool>,
}

impl McpServer {
    /// Create a new server with the given identity.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            tools: HashMap::new(),
        }
    }

    /// Register a tool. A tool registered under an existing name replaces it.
    pub fn register(&mut self, tool: ServerTool) {
        self.tools.insert(tool.name.clone(), tool);
    }

    /// Number of registered tools.
    pub fn tool_count(&self) -> usize {
        self.tools.len()
    }

    /// Run the server on stdin/stdout until stdin closes.
    pub async fn serve_stdio(&self) -> McpResult<()> {
        let stdin = BufReader::new(tokio::io::stdin());
        let stdout = tokio::io::stdout();
        self.serve(stdin, stdout).await
    }

    /// Run the request loop over arbitrary transports (tests drive this
    /// with in-memory buffers).
    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> McpResult<()>
    where
        R: tokio::io::AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        info!(name = %self.name, tools = self.tools.len(), "MCP server listening on stdio");

        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }

            let request: JsonRpcRequest = match serde_json::from_str(&line) {
                Ok(req) => req,
                Err(e) => {
                    warn!(error = %e, "Skipping unparseable request line");
                    continue;
                }
            };

            if let Some(response) = self.handle_request(request).await {
                let mut payload = serde_json::to_vec(&response)?;
                payload.push(b'\n');
                writer.write_all(&payload).await?;
                writer.flush().await?;
            }
        }

        info!("stdin closed, MCP server exiting");
        Ok(())
    }

    /// Handle a JSON-RPC request. Returns None for notifications.
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        debug!(method = %request.method, id = ?request.id, "Handling MCP request");

        let id = match request.id {
            Some(id) => id,
            None => {
                match request.method.as_str() {
                    "notifications/initialized" => {
                        debug!("Received initialized notification");
                    }
                    _ => {
                        debug!(method = %request.method, "Received unknown notification");
                    }
                }
                return None;
            }
        };

        match request.method.as_str() {
            "initialize" => Some(self.handle_initialize(id)),
            "tools/list" => Some(self.handle_list_tools(id)),
            "tools/call" => Some(self.handle_call_tool(id, request.params).await),
            _ => Some(JsonRpcResponse::error(id, -32601, "Method not found")),
        }
    }

    /// Handle the initialize request.
    fn handle_initialize(&self, id: u64) -> JsonRpcResponse {
        info!(name = %self.name, version = %self.version, "Initializing MCP server");

        let result = InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {
                    list_changed: false,
                }),
            },
            server_info: ServerInfo {
                name: self.name.clone(),
                version: Some(self.version.clone()),
            },
        };

        JsonRpcResponse::success(id, serde_json::to_value(result).unwrap_or(Value::Null))
    }

    /// Handle the tools/list request.
    fn handle_list_tools(&self, id: u64) -> JsonRpcResponse {
        debug!(count = self.tools.len(), "Listing MCP tools");

        let mut tools: Vec<McpTool> = self
            .tools
            .values()
            .map(|tool| McpTool {
                name: tool.name.clone(),
                description: Some(tool.description.clone()),
                input_schema: Some(tool.parameters.clone()),
            })
            .collect();
        tools.sort_by(|a, b| a.name.cmp(&b.name));

        let result = ListToolsResult { tools };
        JsonRpcResponse::success(id, serde_json::to_value(result).unwrap_or(Value::Null))
    }

    /// Handle the tools/call request.
    async fn handle_call_tool(&self, id: u64, params: Option<Value>) -> JsonRpcResponse {
        let params: CallToolParams = match params {
            Some(p) => match serde_json::from_value(p) {
                Ok(params) => params,
                Err(e) => {
                    return JsonRpcResponse::error(id, -32602, format!("Invalid params: {e}"));
                }
            },
            None => {
                return JsonRpcResponse::error(id, -32602, "Missing params");
            }
        };

        let tool = match self.tools.get(&params.name) {
            Some(t) => t,
            None => {
                return JsonRpcResponse::error(
                    id,
                    -32602,
                    format!("Unknown tool: {}", params.name),
                );
            }
        };

        let args = params
            .arguments
            .unwrap_or(Value::Object(serde_json::Map::new()));
        let result = tool.executor.execute(args).await;

        let tool_result = match result {
            Ok(output) => {
                debug!(tool = %params.name, output_len = output.len(), "Tool completed");
                ToolCallResult::text(output)
            }
            Err(e) => {
                warn!(tool = %params.name, error = %e, "Tool failed");
                ToolCallResult::error(e)
            }
        };

        JsonRpcResponse::success(id, serde_json::to_value(tool_result).unwrap_or(Value::Null))
    }
}
