//! Line-delimited JSON-RPC 2.0 server exposing the engine as MCP tools
//!
//! One request per line on the reader, one response per line on the writer.
//! Notifications (requests without an `id`) are handled but never answered.

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer};
use serde_json::{json, Value};
use std::io::{BufRead, Write};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::diff_formatter::DiffFormatter;
use crate::engine::Engine;
use crate::operation::{Operation, OperationKind};

pub const PROTOCOL_VERSION: &str = "2024-11-05";
pub const SERVER_NAME: &str = "sedmcp";

pub const PARSE_ERROR: i64 = -32700;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;
pub const INTERNAL_ERROR: i64 = -32603;

#[derive(Debug, Error)]
#[error("{message}")]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

impl RpcError {
    fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(INVALID_PARAMS, message)
    }
}

#[derive(Debug, Deserialize)]
struct Request {
    /// `None` only when the member is absent; `"id": null` is `Some(Null)`.
    #[serde(default, deserialize_with = "present")]
    id: Option<Value>,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    params: Option<Value>,
}

fn present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

#[derive(Debug, Deserialize)]
struct ToolCall {
    name: String,
    #[serde(default)]
    arguments: Option<Value>,
}

/// Arguments shared by sed_execute, sed_preview and sed_validate.
#[derive(Debug, Deserialize)]
struct OperationArgs {
    operation: String,
    #[serde(default)]
    pattern: Option<String>,
    #[serde(default)]
    replacement: Option<String>,
    #[serde(default)]
    flags: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContentArgs {
    content: String,
    #[serde(flatten)]
    op: OperationArgs,
}

#[derive(Debug, Deserialize)]
struct BatchArgs {
    content: String,
    operations: Vec<OperationArgs>,
}

impl OperationArgs {
    fn build(&self) -> Result<Operation> {
        let kind: OperationKind = self.operation.parse()?;
        let mut builder = Operation::builder(kind);

        if let Some(pattern) = &self.pattern {
            builder = builder.pattern(pattern.as_str());
        }
        if let Some(replacement) = &self.replacement {
            builder = builder.replacement(replacement.as_str());
        }
        if let Some(flags) = &self.flags {
            builder = builder.flags(flags.as_str());
        }

        Ok(builder.build()?)
    }
}

pub struct Server {
    engine: Engine,
    limits: ServerConfig,
}

impl Server {
    pub fn new(engine: Engine, limits: ServerConfig) -> Self {
        Self { engine, limits }
    }

    /// Serve until the reader is exhausted.
    pub fn run<R: BufRead, W: Write>(&self, reader: R, mut writer: W) -> Result<()> {
        info!("sedmcp server listening on stdio");

        for line in reader.lines() {
            let line = line.context("Failed to read request")?;
            if let Some(response) = self.handle_line(&line) {
                let payload = serde_json::to_string(&response).unwrap_or_else(|e| {
                    let id = response.get("id").cloned().unwrap_or(Value::Null);
                    error_response(id, INTERNAL_ERROR, &format!("Internal error: {}", e)).to_string()
                });
                writeln!(writer, "{}", payload).context("Failed to write response")?;
                writer.flush().context("Failed to flush response")?;
            }
        }

        info!("Input closed, shutting down");
        Ok(())
    }

    /// Handle one input line; `None` when nothing should be written back.
    pub fn handle_line(&self, line: &str) -> Option<Value> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let request: Request = match serde_json::from_str(line) {
            Ok(request) => request,
            Err(e) => {
                warn!("Unparsable request: {}", e);
                return Some(error_response(Value::Null, PARSE_ERROR, "Parse error"));
            }
        };

        let Some(method) = request.method.as_deref() else {
            return Some(error_response(
                request.id.unwrap_or(Value::Null),
                PARSE_ERROR,
                "Parse error: missing method",
            ));
        };

        debug!("Handling method: {}", method);
        let outcome = self.dispatch(method, request.params.unwrap_or(Value::Null));

        let id = request.id?;
        Some(match outcome {
            Ok(result) => json!({ "jsonrpc": "2.0", "id": id, "result": result }),
            Err(e) => {
                warn!("{} failed: {}", method, e);
                error_response(id, e.code, &e.message)
            }
        })
    }

    fn dispatch(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        match method {
            "initialize" => Ok(initialize_result()),
            "tools/list" => Ok(json!({ "tools": tool_definitions() })),
            "tools/call" => self.call_tool(params),
            other => Err(RpcError::new(METHOD_NOT_FOUND, format!("Method not found: {}", other))),
        }
    }

    fn call_tool(&self, params: Value) -> Result<Value, RpcError> {
        let call: ToolCall = serde_json::from_value(params)
            .map_err(|e| RpcError::invalid_params(format!("Invalid tool call: {}", e)))?;
        let arguments = call.arguments.unwrap_or(Value::Null);

        info!("Tool call: {}", call.name);
        match call.name.as_str() {
            "sed_execute" => self.sed_execute(arguments, false),
            "sed_preview" => self.sed_execute(arguments, true),
            "sed_validate" => self.sed_validate(arguments),
            "sed_execute_batch" => self.sed_execute_batch(arguments),
            other => Err(RpcError::invalid_params(format!("Unknown tool: {}", other))),
        }
    }

    fn sed_execute(&self, arguments: Value, preview: bool) -> Result<Value, RpcError> {
        let args: ContentArgs = parse_arguments(arguments)?;
        self.check_content(&args.content)?;
        let op = args
            .op
            .build()
            .map_err(|e| RpcError::invalid_params(e.to_string()))?;

        let report = if preview {
            self.engine.preview(&args.content, &op)
        } else {
            self.engine.execute(&args.content, &op)
        };

        let mut text = DiffFormatter::format_outcome(&report);
        if preview {
            text.insert_str(0, "PREVIEW: ");
        }
        Ok(text_result(text, !report.success()))
    }

    fn sed_validate(&self, arguments: Value) -> Result<Value, RpcError> {
        let args: OperationArgs = parse_arguments(arguments)?;

        let checked = args.build().and_then(|op| {
            self.engine.validate(&op)?;
            Ok(op.kind())
        });

        Ok(match checked {
            Ok(kind) => text_result(format!("✅ Operation is valid: {}", kind), false),
            Err(e) => text_result(format!("❌ Validation failed: {}", e), false),
        })
    }

    fn sed_execute_batch(&self, arguments: Value) -> Result<Value, RpcError> {
        let args: BatchArgs = parse_arguments(arguments)?;
        self.check_content(&args.content)?;

        if args.operations.len() > self.limits.max_batch_operations {
            return Err(RpcError::invalid_params(format!(
                "Too many operations: {} (max {})",
                args.operations.len(),
                self.limits.max_batch_operations
            )));
        }

        let ops = args
            .operations
            .iter()
            .enumerate()
            .map(|(i, op)| {
                op.build()
                    .map_err(|e| RpcError::invalid_params(format!("Operation {}: {}", i + 1, e)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let report = self.engine.execute_batch(&args.content, &ops);
        Ok(text_result(DiffFormatter::format_outcome(&report), !report.success()))
    }

    fn check_content(&self, content: &str) -> Result<(), RpcError> {
        if content.len() > self.limits.max_content_bytes {
            return Err(RpcError::invalid_params(format!(
                "Content too large: {} bytes (max {})",
                content.len(),
                self.limits.max_content_bytes
            )));
        }
        Ok(())
    }
}

fn parse_arguments<T: serde::de::DeserializeOwned>(arguments: Value) -> Result<T, RpcError> {
    serde_json::from_value(arguments)
        .map_err(|e| RpcError::invalid_params(format!("Invalid arguments: {}", e)))
}

fn text_result(text: String, is_error: bool) -> Value {
    let mut result = json!({ "content": [{ "type": "text", "text": text }] });
    if is_error {
        result["isError"] = Value::Bool(true);
    }
    result
}

fn error_response(id: Value, code: i64, message: &str) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": { "code": code, "message": message }
    })
}

fn initialize_result() -> Value {
    json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": { "tools": {} },
        "serverInfo": {
            "name": SERVER_NAME,
            "version": env!("CARGO_PKG_VERSION")
        }
    })
}

fn operation_properties() -> Value {
    json!({
        "operation": { "type": "string", "description": "Sed operation (s, d, p)" },
        "pattern": { "type": "string", "description": "Regex pattern" },
        "replacement": { "type": "string", "description": "Replacement text, $1 or ${name} for groups" },
        "flags": { "type": "string", "description": "Operation flags (g, i, m, s)" }
    })
}

fn tool_definitions() -> Value {
    let mut with_content = operation_properties();
    with_content["content"] = json!({ "type": "string", "description": "Text content to process" });

    json!([
        {
            "name": "sed_execute",
            "description": "Execute a sed operation on text content",
            "inputSchema": {
                "type": "object",
                "properties": with_content,
                "required": ["content", "operation", "pattern"]
            }
        },
        {
            "name": "sed_preview",
            "description": "Preview a sed operation without modifying content",
            "inputSchema": {
                "type": "object",
                "properties": with_content,
                "required": ["content", "operation", "pattern"]
            }
        },
        {
            "name": "sed_validate",
            "description": "Validate sed operation syntax",
            "inputSchema": {
                "type": "object",
                "properties": operation_properties(),
                "required": ["operation", "pattern"]
            }
        },
        {
            "name": "sed_execute_batch",
            "description": "Execute several sed operations in order, stopping at the first failure",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "content": { "type": "string", "description": "Text content to process" },
                    "operations": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": operation_properties(),
                            "required": ["operation", "pattern"]
                        }
                    }
                },
                "required": ["content", "operations"]
            }
        }
    ])
}
