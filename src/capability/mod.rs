//! Capability declarations: tools, resources, resource templates, prompts
//! and roots.
//!
//! Each capability is assembled by a builder into an immutable definition
//! that carries its public metadata plus a normalised handler. Definitions
//! are handed to the registries through a flat list of [`Registration`]
//! entries, one per capability, built by the composing code.
//!
//! # Modules
//!
//! - [`uri`] — URI template compilation and matching
//! - [`signature`] — parameter schema inference from function signatures
//! - [`definition`] — parameter, argument and handler types
//! - [`tool`], [`resource`], [`prompt`], [`root`] — definitions and builders
//! - [`error`] — capability error taxonomy

pub mod definition;
pub mod error;
pub mod prompt;
pub mod resource;
pub mod root;
pub mod signature;
pub mod tool;
pub mod uri;

pub use definition::{Arguments, ParamType, Parameter, ResourceBody};
pub use error::{CapabilityError, CapabilityResult, HandlerError, HandlerResult};
pub use prompt::{PromptDefinition, PromptDescriptor};
pub use resource::{
    ReadResourceResult, ResourceDefinition, ResourceDescriptor, ResourceTemplateDefinition,
    ResourceTemplateDescriptor,
};
pub use root::RootDefinition;
pub use tool::{ToolDefinition, ToolDescriptor};
pub use uri::UriTemplate;

/// One entry of a registration list, tagged with its capability kind.
#[derive(Debug, Clone)]
pub enum Registration {
    /// A callable tool.
    Tool(ToolDefinition),
    /// A concrete resource.
    Resource(ResourceDefinition),
    /// A resource template.
    Template(ResourceTemplateDefinition),
    /// A prompt.
    Prompt(PromptDefinition),
    /// A root.
    Root(RootDefinition),
}

impl Registration {
    /// Capability kind, for logs and errors.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Tool(_) => "tool",
            Self::Resource(_) => "resource",
            Self::Template(_) => "resource template",
            Self::Prompt(_) => "prompt",
            Self::Root(_) => "root",
        }
    }

    /// Registry key: name for tools and prompts, URI or template otherwise.
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::Tool(tool) => tool.name(),
            Self::Resource(resource) => resource.uri(),
            Self::Template(template) => template.uri_template(),
            Self::Prompt(prompt) => prompt.name(),
            Self::Root(root) => root.uri(),
        }
    }
}

impl From<ToolDefinition> for Registration {
    fn from(tool: ToolDefinition) -> Self {
        Self::Tool(tool)
    }
}

impl From<ResourceDefinition> for Registration {
    fn from(resource: ResourceDefinition) -> Self {
        Self::Resource(resource)
    }
}

impl From<ResourceTemplateDefinition> for Registration {
    fn from(template: ResourceTemplateDefinition) -> Self {
        Self::Template(template)
    }
}

impl From<PromptDefinition> for Registration {
    fn from(prompt: PromptDefinition) -> Self {
        Self::Prompt(prompt)
    }
}

impl From<RootDefinition> for Registration {
    fn from(root: RootDefinition) -> Self {
        Self::Root(root)
    }
}
