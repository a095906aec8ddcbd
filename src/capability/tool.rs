//! Tool definitions and their builder.

use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::capability::definition::{
    input_schema, validate_definition, Arguments, BoxFuture, Parameter, ToolFn,
};
use crate::capability::error::{CapabilityError, CapabilityResult, HandlerResult};
use crate::capability::signature::InferredSignature;
use crate::mcp::context::Context;

/// Public view of a tool, as returned by `tools/list`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    /// Unique tool name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// JSON Schema for the tool's input parameters.
    pub input_schema: Value,
}

/// An immutable tool definition plus its normalised handler.
#[derive(Clone)]
pub struct ToolDefinition {
    name: String,
    description: String,
    parameters: Vec<Parameter>,
    takes_context: bool,
    handler: ToolFn,
}

impl std::fmt::Debug for ToolDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDefinition")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("parameters", &self.parameters)
            .field("takes_context", &self.takes_context)
            .finish_non_exhaustive()
    }
}

impl ToolDefinition {
    /// Starts building a tool.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> ToolBuilder {
        ToolBuilder::new(name)
    }

    /// Tool name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Tool description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Declared parameters, in order.
    #[must_use]
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// Whether the handler receives the execution context.
    #[must_use]
    pub const fn takes_context(&self) -> bool {
        self.takes_context
    }

    /// JSON Schema describing the parameters.
    #[must_use]
    pub fn input_schema(&self) -> Value {
        input_schema(&self.parameters)
    }

    /// Returns the public descriptor (the handler is not part of it).
    #[must_use]
    pub fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: self.name.clone(),
            description: self.description.clone(),
            input_schema: self.input_schema(),
        }
    }

    /// Invokes the handler with a named-argument object.
    ///
    /// The context is only forwarded when the handler declared it.
    ///
    /// # Errors
    ///
    /// Returns whatever the handler returns.
    pub async fn invoke(&self, arguments: Map<String, Value>, context: Option<Context>) -> HandlerResult<Value> {
        let args = Arguments::expand(&self.parameters, arguments);
        let context = if self.takes_context { context } else { None };
        (self.handler)(args, context).await
    }
}

/// Builder for [`ToolDefinition`].
#[must_use]
pub struct ToolBuilder {
    name: String,
    description: Option<String>,
    parameters: Vec<Parameter>,
    takes_context: bool,
    handler: Option<ToolFn>,
}

impl ToolBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            parameters: Vec::new(),
            takes_context: false,
            handler: None,
        }
    }

    /// Starts from an inferred signature (name, description and parameters).
    pub fn from_signature(signature: &InferredSignature) -> Self {
        Self {
            name: signature.name.clone(),
            description: Some(signature.description.clone()).filter(|d| !d.is_empty()),
            parameters: signature.to_parameters(),
            takes_context: false,
            handler: None,
        }
    }

    /// Sets the description (defaults to the tool name).
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Appends a parameter.
    pub fn param(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Appends several parameters.
    pub fn params(mut self, parameters: impl IntoIterator<Item = Parameter>) -> Self {
        self.parameters.extend(parameters);
        self
    }

    /// Sets a handler that does not use the execution context.
    pub fn handler<F, Fut, R>(mut self, handler: F) -> Self
    where
        F: Fn(Arguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult<R>> + Send + 'static,
        R: Serialize + 'static,
    {
        self.takes_context = false;
        let handler: ToolFn = Arc::new(
            move |args: Arguments, _context: Option<Context>| -> BoxFuture<HandlerResult<Value>> {
                let fut = handler(args);
                Box::pin(async move { to_value(fut.await?) })
            },
        );
        self.handler = Some(handler);
        self
    }

    /// Sets a handler that receives the execution context as trailing argument.
    pub fn handler_with_context<F, Fut, R>(mut self, handler: F) -> Self
    where
        F: Fn(Arguments, Option<Context>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult<R>> + Send + 'static,
        R: Serialize + 'static,
    {
        self.takes_context = true;
        let handler: ToolFn = Arc::new(
            move |args: Arguments, context: Option<Context>| -> BoxFuture<HandlerResult<Value>> {
                let fut = handler(args, context);
                Box::pin(async move { to_value(fut.await?) })
            },
        );
        self.handler = Some(handler);
        self
    }

    /// Finishes the definition.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError::InvalidDefinition`] if the name is empty,
    /// parameter names collide or no handler was set.
    pub fn build(self) -> CapabilityResult<ToolDefinition> {
        validate_definition("tool", &self.name, &self.parameters)?;
        let handler = self.handler.ok_or_else(|| {
            CapabilityError::invalid_definition(format!("tool '{}' has no handler", self.name))
        })?;

        Ok(ToolDefinition {
            description: self.description.unwrap_or_else(|| self.name.clone()),
            name: self.name,
            parameters: self.parameters,
            takes_context: self.takes_context,
            handler,
        })
    }
}

fn to_value<R: Serialize>(result: R) -> HandlerResult<Value> {
    Ok(serde_json::to_value(result)?)
}
