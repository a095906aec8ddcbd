//! Integration tests for MCP protocol handling.
//!
//! These drive a full server session over an in-memory transport: JSON-RPC
//! parsing, lifecycle, every capability method and the response envelopes.

use easy_mcp::capability::{
    HandlerError, Parameter, PromptDefinition, ResourceDefinition, ResourceTemplateDefinition,
    RootDefinition, ToolDefinition,
};
use easy_mcp::mcp::protocol::{parse_message, ErrorCode, IncomingMessage, RequestId};
use easy_mcp::mcp::server::{McpServer, ServerInfo};
use easy_mcp::mcp::transport::Transport;
use easy_mcp::registry::Registries;
use serde_json::{json, Value};

// =============================================================================
// Protocol Parsing Tests
// =============================================================================

#[test]
fn test_parse_initialize_request() {
    let json = r#"{
        "jsonrpc": "2.0",
        "id": 1,
        "method": "initialize",
        "params": {
            "protocolVersion": "2024-11-05",
            "capabilities": {},
            "clientInfo": {
                "name": "test-client",
                "version": "1.0.0"
            }
        }
    }"#;

    let IncomingMessage::Request(req) = parse_message(json).unwrap() else {
        panic!("Expected Request");
    };
    assert_eq!(req.method, "initialize");
    assert_eq!(req.id, RequestId::Number(1));
}

#[test]
fn test_parse_resources_read_request() {
    let json = r#"{
        "jsonrpc": "2.0",
        "id": "read-1",
        "method": "resources/read",
        "params": {"uri": "file://documents/report.pdf"}
    }"#;

    let IncomingMessage::Request(req) = parse_message(json).unwrap() else {
        panic!("Expected Request");
    };
    assert_eq!(req.id, RequestId::String("read-1".to_string()));
    assert_eq!(req.params.unwrap()["uri"], "file://documents/report.pdf");
}

#[test]
fn test_parse_notification() {
    let json = r#"{"jsonrpc": "2.0", "method": "notifications/initialized"}"#;

    let IncomingMessage::Notification(notif) = parse_message(json).unwrap() else {
        panic!("Expected Notification");
    };
    assert_eq!(notif.method, "notifications/initialized");
}

#[test]
fn test_parse_missing_jsonrpc_version() {
    let err = parse_message(r#"{"id": 1, "method": "tools/list"}"#).unwrap_err();
    assert_eq!(err.error.code, ErrorCode::InvalidRequest.code());
}

// =============================================================================
// Session Tests
// =============================================================================

fn registries() -> Registries {
    let mut registries = Registries::default();
    registries
        .register_all([
            ToolDefinition::builder("add")
                .description("Adds two numbers")
                .param(Parameter::number("a"))
                .param(Parameter::number("b"))
                .handler(|args| async move {
                    Ok(args.f64("a").unwrap_or(0.0) + args.f64("b").unwrap_or(0.0))
                })
                .build()
                .unwrap()
                .into(),
            ToolDefinition::builder("fail")
                .handler(|_| async { Err::<(), HandlerError>("boom".into()) })
                .build()
                .unwrap()
                .into(),
            ToolDefinition::builder("chatty")
                .handler_with_context(|_, ctx| async move {
                    if let Some(ctx) = ctx {
                        ctx.debug("step one", None);
                        ctx.warning("step two", Some("chatty"));
                        ctx.report_progress(1.0, None);
                    }
                    Ok("ok")
                })
                .build()
                .unwrap()
                .into(),
            ResourceDefinition::builder("file://test1.txt")
                .name("Test 1")
                .mime_type("text/plain")
                .handler(|| async { Ok("Content 1") })
                .build()
                .unwrap()
                .into(),
            ResourceDefinition::builder("bin://logo")
                .mime_type("image/png")
                .handler(|| async { Ok(vec![0x89_u8, b'P', b'N', b'G']) })
                .build()
                .unwrap()
                .into(),
            ResourceTemplateDefinition::builder("file://{folder}/{filename}")
                .handler(|args| async move {
                    Ok(format!(
                        "{}/{}",
                        args.str("folder").unwrap_or_default(),
                        args.str("filename").unwrap_or_default()
                    ))
                })
                .build()
                .unwrap()
                .into(),
            PromptDefinition::builder("hello_world")
                .description("Says hello")
                .argument(Parameter::string("name"))
                .handler(|args| async move {
                    Ok(format!("Hello, {}!", args.str("name").unwrap_or("world")))
                })
                .build()
                .unwrap()
                .into(),
            RootDefinition::builder("file:///projects/demo")
                .name("Demo project")
                .build()
                .unwrap()
                .into(),
        ])
        .unwrap();
    registries
}

const INITIALIZE: &str = r#"{"jsonrpc":"2.0","id":0,"method":"initialize","params":{"protocolVersion":"2024-11-05","capabilities":{}}}"#;
const INITIALIZED: &str = r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#;

/// Runs an initialised session and returns every message the server wrote
/// after the initialize response.
async fn run_session(requests: &[Value]) -> Vec<Value> {
    let mut lines = vec![INITIALIZE.to_string(), INITIALIZED.to_string()];
    lines.extend(requests.iter().map(Value::to_string));
    let input = lines.join("\n") + "\n";

    let transport = Transport::new(input.as_bytes(), Vec::new());
    let mut server = McpServer::with_transport(ServerInfo::default(), registries(), transport);
    server.serve().await.unwrap();

    let (_, output) = server.into_transport().into_parts();
    String::from_utf8(output)
        .unwrap()
        .lines()
        .skip(1)
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

fn request(id: i64, method: &str, params: Value) -> Value {
    json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params})
}

#[tokio::test]
async fn test_list_methods() {
    let out = run_session(&[
        request(1, "tools/list", json!({})),
        request(2, "resources/list", json!({})),
        request(3, "resources/templates/list", json!({})),
        request(4, "prompts/list", json!({})),
        request(5, "roots/list", json!({})),
    ])
    .await;

    let tools = out[0]["result"]["tools"].as_array().unwrap();
    assert_eq!(tools.len(), 3);
    assert_eq!(tools[0]["name"], "add");
    assert_eq!(tools[0]["inputSchema"]["required"], json!(["a", "b"]));
    assert_eq!(tools[0]["inputSchema"]["properties"]["a"]["type"], "number");

    let resources = out[1]["result"]["resources"].as_array().unwrap();
    assert_eq!(resources.len(), 2);
    assert_eq!(resources[0]["uri"], "file://test1.txt");
    assert_eq!(resources[0]["name"], "Test 1");

    let templates = out[2]["result"]["resourceTemplates"].as_array().unwrap();
    assert_eq!(templates[0]["uriTemplate"], "file://{folder}/{filename}");
    assert_eq!(templates[0]["mimeType"], "text/plain");

    assert_eq!(out[3]["result"]["prompts"][0]["name"], "hello_world");
    assert_eq!(
        out[4]["result"],
        json!({"roots": [{"uri": "file:///projects/demo", "name": "Demo project"}]})
    );
}

#[tokio::test]
async fn test_tool_call_envelope() {
    let out = run_session(&[
        request(1, "tools/call", json!({"name": "add", "arguments": {"a": 2, "b": 3}})),
        request(2, "tools/call", json!({"name": "missing", "arguments": {}})),
    ])
    .await;

    assert_eq!(out[0]["result"], json!({"content": [{"type": "text", "text": "5.0"}]}));
    assert_eq!(out[1]["error"]["code"], ErrorCode::InvalidParams.code());
}

#[tokio::test]
async fn test_failing_tool_logs_then_errors() {
    let out = run_session(&[request(1, "tools/call", json!({"name": "fail"}))]).await;

    assert_eq!(out.len(), 2);
    assert_eq!(out[0]["method"], "notifications/message");
    assert_eq!(out[0]["params"]["level"], "error");
    assert_eq!(out[1]["id"], 1);
    assert_eq!(out[1]["error"]["code"], ErrorCode::InternalError.code());
    assert!(out[1]["error"]["message"].as_str().unwrap().contains("boom"));
}

#[tokio::test]
async fn test_log_level_filters_notifications() {
    let out = run_session(&[
        request(1, "logging/setLevel", json!({"level": "warning"})),
        request(2, "tools/call", json!({"name": "chatty"})),
    ])
    .await;

    assert_eq!(out[0]["result"], json!({}));
    // debug message filtered, no progress without a token
    assert_eq!(out.len(), 3);
    assert_eq!(out[1]["params"], json!({"level": "warning", "data": "step two", "logger": "chatty"}));
    assert_eq!(out[2]["result"]["content"][0]["text"], "ok");
}

#[tokio::test]
async fn test_read_resource_envelopes() {
    let out = run_session(&[
        request(1, "resources/read", json!({"uri": "file://test1.txt"})),
        request(2, "resources/read", json!({"uri": "bin://logo"})),
        request(3, "resources/read", json!({"uri": "file://documents/report.pdf"})),
        request(4, "resources/read", json!({"uri": "nowhere://x"})),
        request(5, "resources/list", json!({})),
    ])
    .await;

    assert_eq!(
        out[0]["result"],
        json!({"contents": [{"uri": "file://test1.txt", "mimeType": "text/plain", "text": "Content 1"}]})
    );
    assert_eq!(out[1]["result"]["contents"][0]["blob"], "iVBORw==");
    assert_eq!(out[2]["result"]["contents"][0]["text"], "documents/report.pdf");
    assert_eq!(out[3]["result"], json!({"error": "Resource not found: nowhere://x"}));

    let listed: Vec<&str> = out[4]["result"]["resources"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|r| r["uri"].as_str())
        .collect();
    assert_eq!(listed, ["file://test1.txt", "bin://logo", "file://documents/report.pdf"]);
}

#[tokio::test]
async fn test_get_prompt_envelope() {
    let out = run_session(&[
        request(1, "prompts/get", json!({"name": "hello_world", "arguments": {"name": "Ada"}})),
        request(2, "prompts/get", json!({"name": "non-existent-prompt"})),
    ])
    .await;

    assert_eq!(
        out[0]["result"],
        json!({
            "description": "Says hello",
            "messages": [{"role": "user", "content": {"type": "text", "text": "Hello, Ada!"}}]
        })
    );
    assert_eq!(out[1]["error"]["code"], ErrorCode::InvalidParams.code());
}

#[tokio::test]
async fn test_malformed_params_are_invalid_params() {
    let out = run_session(&[
        request(1, "tools/call", json!({"arguments": {}})),
        request(2, "logging/setLevel", json!({"level": "loud"})),
    ])
    .await;

    assert_eq!(out[0]["error"]["code"], ErrorCode::InvalidParams.code());
    assert_eq!(out[1]["error"]["code"], ErrorCode::InvalidParams.code());
}

#[tokio::test]
async fn test_invalid_utf8_line_gets_parse_error_and_session_continues() {
    let mut input = format!("{INITIALIZE}\n{INITIALIZED}\n").into_bytes();
    input.extend_from_slice(b"\xff\xfe\n");
    input.extend_from_slice(br#"{"jsonrpc":"2.0","id":7,"method":"ping"}"#);
    input.push(b'\n');

    let transport = Transport::new(&input[..], Vec::new());
    let mut server = McpServer::with_transport(ServerInfo::default(), registries(), transport);
    server.serve().await.unwrap();

    let (_, output) = server.into_transport().into_parts();
    let out: Vec<Value> = String::from_utf8(output)
        .unwrap()
        .lines()
        .skip(1)
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();

    assert_eq!(out.len(), 2);
    assert_eq!(out[0]["error"]["code"], ErrorCode::ParseError.code());
    assert_eq!(out[1]["id"], 7);
    assert_eq!(out[1]["result"], json!({}));
}
