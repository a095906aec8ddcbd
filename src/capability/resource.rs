//! Resource and resource template definitions.
//!
//! A resource is addressed by a concrete URI. A resource template is
//! addressed by a URI pattern with `{param}` placeholders; a concrete URI
//! that matches the pattern is turned into an ordinary resource bound to
//! the extracted values (see [`ResourceTemplateDefinition::materialize`]).

use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::capability::definition::{
    validate_definition, Arguments, BoxFuture, Parameter, ResourceBody, ResourceFn,
};
use crate::capability::error::{CapabilityError, CapabilityResult, HandlerError, HandlerResult};
use crate::capability::uri::{UriParams, UriTemplate};

/// Default MIME type of a template when none is given.
const DEFAULT_TEMPLATE_MIME_TYPE: &str = "text/plain";

/// Public view of a resource, as returned by `resources/list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDescriptor {
    /// Concrete URI.
    pub uri: String,
    /// Display name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// MIME type of the content (may be empty).
    pub mime_type: String,
}

/// Public view of a template, as returned by `resources/templates/list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceTemplateDescriptor {
    /// URI pattern with placeholders.
    pub uri_template: String,
    /// Display name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// MIME type of the content.
    pub mime_type: String,
}

/// One entry of a `resources/read` result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceContents {
    /// URI that was read.
    pub uri: String,
    /// MIME type of the content.
    pub mime_type: String,
    /// `text` or base64 `blob`.
    #[serde(flatten)]
    pub body: ResourceBody,
}

/// Result of a resource read: `{contents: [...]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReadResourceResult {
    /// Content entries (always exactly one for registry reads).
    pub contents: Vec<ResourceContents>,
}

/// A concrete resource and its handler.
#[derive(Clone)]
pub struct ResourceDefinition {
    uri: String,
    name: String,
    description: String,
    mime_type: String,
    handler: ResourceFn,
}

impl std::fmt::Debug for ResourceDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceDefinition")
            .field("uri", &self.uri)
            .field("name", &self.name)
            .field("mime_type", &self.mime_type)
            .finish_non_exhaustive()
    }
}

impl ResourceDefinition {
    /// Starts building a resource for a concrete URI.
    #[must_use]
    pub fn builder(uri: impl Into<String>) -> ResourceBuilder {
        ResourceBuilder {
            uri: uri.into(),
            name: None,
            description: None,
            mime_type: None,
            handler: None,
        }
    }

    /// Concrete URI.
    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// MIME type.
    #[must_use]
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Returns the public descriptor.
    #[must_use]
    pub fn descriptor(&self) -> ResourceDescriptor {
        ResourceDescriptor {
            uri: self.uri.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            mime_type: self.mime_type.clone(),
        }
    }

    /// Invokes the handler and wraps its body as a read result.
    ///
    /// # Errors
    ///
    /// Returns whatever the handler returns.
    pub async fn read(&self) -> HandlerResult<ReadResourceResult> {
        let body = (self.handler)(Arguments::default()).await?;
        Ok(ReadResourceResult {
            contents: vec![ResourceContents {
                uri: self.uri.clone(),
                mime_type: self.mime_type.clone(),
                body,
            }],
        })
    }
}

/// Builder for [`ResourceDefinition`].
#[must_use]
pub struct ResourceBuilder {
    uri: String,
    name: Option<String>,
    description: Option<String>,
    mime_type: Option<String>,
    handler: Option<ResourceFn>,
}

impl ResourceBuilder {
    /// Sets the display name (defaults to the URI).
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the description (defaults to the URI).
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the MIME type (defaults to empty).
    pub fn mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// Sets the handler producing the resource body.
    pub fn handler<F, Fut, B>(mut self, handler: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult<B>> + Send + 'static,
        B: Into<ResourceBody> + 'static,
    {
        let handler: ResourceFn = Arc::new(move |_args: Arguments| -> BoxFuture<HandlerResult<ResourceBody>> {
            let fut = handler();
            Box::pin(async move {
                let body: ResourceBody = fut.await?.into();
                Ok::<_, HandlerError>(body)
            })
        });
        self.handler = Some(handler);
        self
    }

    /// Finishes the definition.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError::InvalidDefinition`] if the URI is empty or
    /// no handler was set.
    pub fn build(self) -> CapabilityResult<ResourceDefinition> {
        validate_definition("resource", &self.uri, &[])?;
        let handler = self.handler.ok_or_else(|| {
            CapabilityError::invalid_definition(format!("resource '{}' has no handler", self.uri))
        })?;

        Ok(ResourceDefinition {
            name: self.name.unwrap_or_else(|| self.uri.clone()),
            description: self.description.unwrap_or_else(|| self.uri.clone()),
            mime_type: self.mime_type.unwrap_or_default(),
            uri: self.uri,
            handler,
        })
    }
}

/// A URI template, its compiled matcher and its handler.
#[derive(Clone)]
pub struct ResourceTemplateDefinition {
    template: UriTemplate,
    name: String,
    description: String,
    mime_type: String,
    parameters: Vec<Parameter>,
    handler: ResourceFn,
}

impl std::fmt::Debug for ResourceTemplateDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceTemplateDefinition")
            .field("uri_template", &self.template.as_str())
            .field("name", &self.name)
            .field("mime_type", &self.mime_type)
            .finish_non_exhaustive()
    }
}

impl ResourceTemplateDefinition {
    /// Starts building a template.
    #[must_use]
    pub fn builder(uri_template: impl Into<String>) -> ResourceTemplateBuilder {
        ResourceTemplateBuilder {
            uri_template: uri_template.into(),
            name: None,
            description: None,
            mime_type: None,
            handler: None,
        }
    }

    /// The template string.
    #[must_use]
    pub fn uri_template(&self) -> &str {
        self.template.as_str()
    }

    /// The compiled matcher.
    #[must_use]
    pub const fn matcher(&self) -> &UriTemplate {
        &self.template
    }

    /// One string parameter per placeholder, in declaration order.
    #[must_use]
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// Returns the public descriptor.
    #[must_use]
    pub fn descriptor(&self) -> ResourceTemplateDescriptor {
        ResourceTemplateDescriptor {
            uri_template: self.template.as_str().to_string(),
            name: self.name.clone(),
            description: self.description.clone(),
            mime_type: self.mime_type.clone(),
        }
    }

    /// Matches a concrete URI against this template.
    #[must_use]
    pub fn matches(&self, uri: &str) -> Option<UriParams> {
        self.template.matches(uri)
    }

    /// Turns a match into a concrete resource bound to the extracted values.
    ///
    /// The returned resource keeps the template's name, description and MIME
    /// type, and calls the template handler with `params` on every read.
    #[must_use]
    pub fn materialize(&self, uri: &str, params: UriParams) -> ResourceDefinition {
        let raw: Map<String, Value> = params
            .into_iter()
            .map(|(name, value)| (name, Value::String(value)))
            .collect();
        let args = Arguments::expand(&self.parameters, raw);
        let template_handler = Arc::clone(&self.handler);
        let handler: ResourceFn = Arc::new(move |_args: Arguments| template_handler(args.clone()));

        ResourceDefinition {
            uri: uri.to_string(),
            name: self.name.clone(),
            description: self.description.clone(),
            mime_type: self.mime_type.clone(),
            handler,
        }
    }
}

/// Builder for [`ResourceTemplateDefinition`].
#[must_use]
pub struct ResourceTemplateBuilder {
    uri_template: String,
    name: Option<String>,
    description: Option<String>,
    mime_type: Option<String>,
    handler: Option<ResourceFn>,
}

impl ResourceTemplateBuilder {
    /// Sets the display name (defaults to the template string).
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the description (defaults to the template string).
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the MIME type (defaults to `text/plain`).
    pub fn mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// Sets the handler; it receives one argument per placeholder.
    pub fn handler<F, Fut, B>(mut self, handler: F) -> Self
    where
        F: Fn(Arguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult<B>> + Send + 'static,
        B: Into<ResourceBody> + 'static,
    {
        let handler: ResourceFn = Arc::new(move |args: Arguments| -> BoxFuture<HandlerResult<ResourceBody>> {
            let fut = handler(args);
            Box::pin(async move {
                let body: ResourceBody = fut.await?.into();
                Ok::<_, HandlerError>(body)
            })
        });
        self.handler = Some(handler);
        self
    }

    /// Compiles the template and finishes the definition.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError::Pattern`] if the template does not compile
    /// or declares no placeholder, and
    /// [`CapabilityError::InvalidDefinition`] if no handler was set.
    pub fn build(self) -> CapabilityResult<ResourceTemplateDefinition> {
        let template = UriTemplate::compile(&self.uri_template)?;
        if !template.has_placeholders() {
            return Err(CapabilityError::pattern(
                &self.uri_template,
                "template declares no placeholders",
            ));
        }
        let handler = self.handler.ok_or_else(|| {
            CapabilityError::invalid_definition(format!(
                "resource template '{}' has no handler",
                self.uri_template
            ))
        })?;

        let parameters = template
            .params()
            .iter()
            .map(|name| Parameter::string(name.clone()))
            .collect();

        Ok(ResourceTemplateDefinition {
            name: self.name.unwrap_or_else(|| self.uri_template.clone()),
            description: self.description.unwrap_or_else(|| self.uri_template.clone()),
            mime_type: self
                .mime_type
                .unwrap_or_else(|| DEFAULT_TEMPLATE_MIME_TYPE.to_string()),
            template,
            parameters,
            handler,
        })
    }
}
