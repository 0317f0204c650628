//! MCP (Model Context Protocol) server plumbing for yoto-mcp.
//!
//! Implements the server side of the JSON-RPC based MCP protocol over
//! stdio: wire types, a tool registry, and the newline-delimited
//! request/response loop. Tool implementations live in the binary crate;
//! this crate only routes `tools/call` invocations to their executors and
//! renders the results.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐   stdin/stdout    ┌─────────────┐
//! │ MCP client  │ ◄───────────────► │  McpServer  │
//! │ (assistant) │    JSON-RPC 2.0   │ (yoto tools)│
//! └─────────────┘                   └─────────────┘
//! ```

mod error;
pub mod protocol;
mod serve;

pub use error::{McpError, McpResult};
pub use protocol::{
    CallToolParams, InitializeResult, JsonRpcError, JsonRpcRequest, JsonRpcResponse, ListToolsResult,
    McpTool, ServerCapabilities, ServerInfo, ToolCallResult, ToolContent, ToolsCapability,
    PROTOCOL_VERSION,
};
pub use serve::{McpServer, ServerTool, ToolExecutor};
