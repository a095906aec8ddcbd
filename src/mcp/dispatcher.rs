//! Routes capability requests to the registries and shapes their results.
//!
//! The dispatcher knows nothing about the transport or the lifecycle: it
//! takes a method and its params and returns either a JSON result or a
//! [`DispatchError`] that the server turns into a JSON-RPC error.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::capability::error::CapabilityError;
use crate::mcp::context::{Context, Notifier};
use crate::mcp::protocol::{JsonRpcError, LoggingLevel, ProgressToken, RequestId};
use crate::registry::Registries;

/// Capability methods the dispatcher handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    /// `tools/list`
    ListTools,
    /// `tools/call`
    CallTool,
    /// `resources/list`
    ListResources,
    /// `resources/templates/list`
    ListResourceTemplates,
    /// `resources/read`
    ReadResource,
    /// `prompts/list`
    ListPrompts,
    /// `prompts/get`
    GetPrompt,
    /// `roots/list`
    ListRoots,
    /// `logging/setLevel`
    SetLogLevel,
}

impl RequestKind {
    /// Maps a JSON-RPC method name to a request kind.
    #[must_use]
    pub fn from_method(method: &str) -> Option<Self> {
        Some(match method {
            "tools/list" => Self::ListTools,
            "tools/call" => Self::CallTool,
            "resources/list" => Self::ListResources,
            "resources/templates/list" => Self::ListResourceTemplates,
            "resources/read" => Self::ReadResource,
            "prompts/list" => Self::ListPrompts,
            "prompts/get" => Self::GetPrompt,
            "roots/list" => Self::ListRoots,
            "logging/setLevel" => Self::SetLogLevel,
            _ => return None,
        })
    }

    /// The JSON-RPC method name.
    #[must_use]
    pub const fn method(self) -> &'static str {
        match self {
            Self::ListTools => "tools/list",
            Self::CallTool => "tools/call",
            Self::ListResources => "resources/list",
            Self::ListResourceTemplates => "resources/templates/list",
            Self::ReadResource => "resources/read",
            Self::ListPrompts => "prompts/list",
            Self::GetPrompt => "prompts/get",
            Self::ListRoots => "roots/list",
            Self::SetLogLevel => "logging/setLevel",
        }
    }
}

/// Errors surfaced by [`Dispatcher::dispatch`].
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The params were missing or malformed.
    #[error("{0}")]
    InvalidParams(String),

    /// A registry lookup or handler failed.
    #[error(transparent)]
    Capability(#[from] CapabilityError),
}

impl DispatchError {
    /// Converts to a JSON-RPC error response for request `id`.
    ///
    /// Unknown tools and prompts are the caller's mistake (invalid params);
    /// anything else is an internal error.
    #[must_use]
    pub fn into_rpc_error(self, id: RequestId) -> JsonRpcError {
        match self {
            Self::InvalidParams(message) => JsonRpcError::invalid_params(id, message),
            Self::Capability(
                err @ (CapabilityError::ToolNotFound { .. } | CapabilityError::PromptNotFound { .. }),
            ) => JsonRpcError::invalid_params(id, err.to_string()),
            Self::Capability(err) => JsonRpcError::internal_error(id, err.to_string()),
        }
    }
}

/// Parameters for `tools/call`.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolCallParams {
    /// Name of the tool to call.
    pub name: String,
    /// Named arguments.
    #[serde(default)]
    pub arguments: Option<Map<String, Value>>,
    /// Request metadata (progress token and friends).
    #[serde(default, rename = "_meta")]
    pub meta: Option<Value>,
}

/// Parameters for `resources/read`.
#[derive(Debug, Clone, Deserialize)]
pub struct ReadResourceParams {
    /// URI to read.
    pub uri: String,
}

/// Parameters for `prompts/get`.
#[derive(Debug, Clone, Deserialize)]
pub struct GetPromptParams {
    /// Name of the prompt.
    pub name: String,
    /// Named arguments.
    #[serde(default)]
    pub arguments: Option<Map<String, Value>>,
}

/// Parameters for `logging/setLevel`.
#[derive(Debug, Clone, Deserialize)]
pub struct SetLevelParams {
    /// Minimum level the client wants to receive.
    pub level: LoggingLevel,
}

/// Content item in a tool call response.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolContent {
    /// Text content.
    Text {
        /// The text content.
        text: String,
    },
}

/// Result of a tool call.
#[derive(Debug, Clone, Serialize)]
pub struct ToolCallResult {
    /// Content returned by the tool.
    pub content: Vec<ToolContent>,
}

impl ToolCallResult {
    /// Wraps a handler's return value as a single text item. Strings are
    /// passed through verbatim, other values are serialised.
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        let text = match value {
            Value::String(text) => text,
            Value::Null => String::new(),
            other => other.to_string(),
        };
        Self {
            content: vec![ToolContent::Text { text }],
        }
    }
}

fn parse_params<T: DeserializeOwned>(params: Option<&Value>, method: &str) -> Result<T, DispatchError> {
    let params = params.ok_or_else(|| DispatchError::InvalidParams(format!("Missing {method} params")))?;
    serde_json::from_value(params.clone())
        .map_err(|e| DispatchError::InvalidParams(format!("Invalid {method} params: {e}")))
}

fn to_result<T: Serialize>(value: T) -> Result<Value, DispatchError> {
    serde_json::to_value(value).map_err(|e| {
        DispatchError::Capability(CapabilityError::Invocation { source: Box::new(e) })
    })
}

/// Routes capability requests to the registries.
#[derive(Debug)]
pub struct Dispatcher {
    registries: Registries,
    notifier: Notifier,
}

impl Dispatcher {
    /// Creates a dispatcher over populated registries.
    #[must_use]
    pub const fn new(registries: Registries, notifier: Notifier) -> Self {
        Self {
            registries,
            notifier,
        }
    }

    /// The registries being dispatched against.
    #[must_use]
    pub const fn registries(&self) -> &Registries {
        &self.registries
    }

    /// The notifier handed to execution contexts.
    #[must_use]
    pub const fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    /// Handles one capability request.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::InvalidParams`] for malformed params and
    /// [`DispatchError::Capability`] for lookup or handler failures. An
    /// unknown resource is not an error: it yields `{"error": message}`.
    pub async fn dispatch(&self, kind: RequestKind, params: Option<&Value>) -> Result<Value, DispatchError> {
        debug!(method = kind.method(), "Dispatching request");
        match kind {
            RequestKind::ListTools => Ok(json!({ "tools": self.registries.tools.list() })),
            RequestKind::CallTool => self.call_tool(params).await,
            RequestKind::ListResources => {
                Ok(json!({ "resources": self.registries.resources.list_resources() }))
            }
            RequestKind::ListResourceTemplates => Ok(json!({
                "resourceTemplates": self.registries.resources.list_templates()
            })),
            RequestKind::ReadResource => self.read_resource(params).await,
            RequestKind::ListPrompts => Ok(json!({ "prompts": self.registries.prompts.list() })),
            RequestKind::GetPrompt => self.get_prompt(params).await,
            RequestKind::ListRoots => Ok(json!({ "roots": self.registries.roots.list() })),
            RequestKind::SetLogLevel => self.set_level(params),
        }
    }

    async fn call_tool(&self, params: Option<&Value>) -> Result<Value, DispatchError> {
        let progress_token = ProgressToken::from_params(params);
        let params: ToolCallParams = parse_params(params, "tools/call")?;
        let context = Context::new(
            self.notifier.clone(),
            self.registries.resources.clone(),
            progress_token,
            params.meta.unwrap_or(Value::Null),
        );

        let value = self
            .registries
            .tools
            .call(&params.name, params.arguments.unwrap_or_default(), Some(context))
            .await?;

        to_result(ToolCallResult::from_value(value))
    }

    async fn read_resource(&self, params: Option<&Value>) -> Result<Value, DispatchError> {
        let params: ReadResourceParams = parse_params(params, "resources/read")?;
        match self.registries.resources.get(&params.uri).await {
            Ok(result) => to_result(result),
            Err(err @ CapabilityError::ResourceNotFound { .. }) => {
                warn!(uri = %params.uri, "Resource not found");
                Ok(json!({ "error": err.to_string() }))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn get_prompt(&self, params: Option<&Value>) -> Result<Value, DispatchError> {
        let params: GetPromptParams = parse_params(params, "prompts/get")?;
        let text = self
            .registries
            .prompts
            .call(&params.name, params.arguments.unwrap_or_default())
            .await?;
        let description = self
            .registries
            .prompts
            .get(&params.name)
            .map(|prompt| prompt.description().to_string())
            .unwrap_or_default();

        Ok(json!({
            "description": description,
            "messages": [{
                "role": "user",
                "content": { "type": "text", "text": text },
            }],
        }))
    }

    fn set_level(&self, params: Option<&Value>) -> Result<Value, DispatchError> {
        let params: SetLevelParams = parse_params(params, "logging/setLevel")?;
        self.notifier.set_min_level(params.level);
        debug!(level = %params.level, "Client logging level set");
        Ok(json!({}))
    }
}
