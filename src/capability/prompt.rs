//! Prompt definitions and their builder.

use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::capability::definition::{validate_definition, Arguments, BoxFuture, Parameter, PromptFn};
use crate::capability::error::{CapabilityError, CapabilityResult, HandlerError, HandlerResult};

/// A declared prompt argument, as listed by `prompts/list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptArgument {
    /// Argument name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Whether the argument must be supplied.
    pub required: bool,
}

/// Public view of a prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptDescriptor {
    /// Unique prompt name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Declared arguments.
    pub arguments: Vec<PromptArgument>,
}

/// A prompt and its text generator.
#[derive(Clone)]
pub struct PromptDefinition {
    name: String,
    description: String,
    arguments: Vec<Parameter>,
    handler: PromptFn,
}

impl std::fmt::Debug for PromptDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptDefinition")
            .field("name", &self.name)
            .field("arguments", &self.arguments)
            .finish_non_exhaustive()
    }
}

impl PromptDefinition {
    /// Starts building a prompt.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> PromptBuilder {
        PromptBuilder {
            name: name.into(),
            description: None,
            arguments: Vec::new(),
            handler: None,
        }
    }

    /// Prompt name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Prompt description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the public descriptor.
    #[must_use]
    pub fn descriptor(&self) -> PromptDescriptor {
        PromptDescriptor {
            name: self.name.clone(),
            description: self.description.clone(),
            arguments: self
                .arguments
                .iter()
                .map(|a| PromptArgument {
                    name: a.name.clone(),
                    description: a.description.clone(),
                    required: a.required,
                })
                .collect(),
        }
    }

    /// Renders the prompt text.
    ///
    /// # Errors
    ///
    /// Returns whatever the handler returns.
    pub async fn render(&self, arguments: Map<String, Value>) -> HandlerResult<String> {
        (self.handler)(Arguments::expand(&self.arguments, arguments)).await
    }
}

/// Builder for [`PromptDefinition`].
#[must_use]
pub struct PromptBuilder {
    name: String,
    description: Option<String>,
    arguments: Vec<Parameter>,
    handler: Option<PromptFn>,
}

impl PromptBuilder {
    /// Sets the description (defaults to the prompt name).
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Appends an argument.
    pub fn argument(mut self, argument: Parameter) -> Self {
        self.arguments.push(argument);
        self
    }

    /// Sets the handler producing the prompt text.
    pub fn handler<F, Fut, T>(mut self, handler: F) -> Self
    where
        F: Fn(Arguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult<T>> + Send + 'static,
        T: Into<String> + 'static,
    {
        let handler: PromptFn = Arc::new(move |args: Arguments| -> BoxFuture<HandlerResult<String>> {
            let fut = handler(args);
            Box::pin(async move {
                let text: String = fut.await?.into();
                Ok::<_, HandlerError>(text)
            })
        });
        self.handler = Some(handler);
        self
    }

    /// Finishes the definition.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError::InvalidDefinition`] if the name is empty,
    /// argument names collide or no handler was set.
    pub fn build(self) -> CapabilityResult<PromptDefinition> {
        validate_definition("prompt", &self.name, &self.arguments)?;
        let handler = self.handler.ok_or_else(|| {
            CapabilityError::invalid_definition(format!("prompt '{}' has no handler", self.name))
        })?;

        Ok(PromptDefinition {
            description: self.description.unwrap_or_else(|| self.name.clone()),
            name: self.name,
            arguments: self.arguments,
            handler,
        })
    }
}
