//! Error types for capability registration and dispatch.

use thiserror::Error;

/// Result type for capability operations.
pub type CapabilityResult<T> = Result<T, CapabilityError>;

/// Error produced by a capability's handler function.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Result type returned by handler functions.
pub type HandlerResult<T> = Result<T, HandlerError>;

/// Errors that can occur while registering, resolving or invoking capabilities.
#[derive(Debug, Error)]
pub enum CapabilityError {
    /// No tool is registered under the requested name.
    #[error("Tool not found: {name}")]
    ToolNotFound {
        /// Requested tool name.
        name: String,
    },

    /// Neither a concrete resource nor a template matches the URI.
    #[error("Resource not found: {uri}")]
    ResourceNotFound {
        /// Requested URI.
        uri: String,
    },

    /// No prompt is registered under the requested name.
    #[error("Prompt not found: {name}")]
    PromptNotFound {
        /// Requested prompt name.
        name: String,
    },

    /// The URI template could not be compiled.
    #[error("Invalid URI template '{template}': {message}")]
    Pattern {
        /// The offending template string.
        template: String,
        /// Description of what's wrong.
        message: String,
    },

    /// A parameter schema could not be inferred from the declaration.
    #[error("Could not infer signature: {message}")]
    CouldNotInfer {
        /// Description of what's wrong.
        message: String,
    },

    /// The definition violates a structural invariant.
    #[error("Invalid definition: {message}")]
    InvalidDefinition {
        /// Description of what's wrong.
        message: String,
    },

    /// A capability with the same key already exists (strict registration only).
    #[error("Duplicate {kind} registration: {key}")]
    Duplicate {
        /// Capability kind ("tool", "resource", ...).
        kind: &'static str,
        /// Name or URI that collided.
        key: String,
    },

    /// The handler function failed.
    #[error("Invocation failed: {source}")]
    Invocation {
        /// Error returned by the handler.
        #[source]
        source: HandlerError,
    },
}

impl CapabilityError {
    /// Creates a pattern error for the given template.
    #[must_use]
    pub fn pattern(template: &str, message: impl Into<String>) -> Self {
        Self::Pattern {
            template: template.to_string(),
            message: message.into(),
        }
    }

    /// Creates an inference error.
    #[must_use]
    pub fn could_not_infer(message: impl Into<String>) -> Self {
        Self::CouldNotInfer {
            message: message.into(),
        }
    }

    /// Creates an invalid definition error.
    #[must_use]
    pub fn invalid_definition(message: impl Into<String>) -> Self {
        Self::InvalidDefinition {
            message: message.into(),
        }
    }

    /// Returns `true` for the three "not found" kinds.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::ToolNotFound { .. } | Self::ResourceNotFound { .. } | Self::PromptNotFound { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_display() {
        let err = CapabilityError::ToolNotFound {
            name: "missing".to_string(),
        };
        assert_eq!(err.to_string(), "Tool not found: missing");
        assert!(err.is_not_found());
    }

    #[test]
    fn pattern_error_display() {
        let err = CapabilityError::pattern("file://{a", "unbalanced '{'");
        let msg = err.to_string();
        assert!(msg.contains("file://{a"));
        assert!(msg.contains("unbalanced"));
        assert!(!err.is_not_found());
    }

    #[test]
    fn invocation_keeps_source() {
        let source: HandlerError = "disk on fire".into();
        let err = CapabilityError::Invocation { source };
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().contains("disk on fire"));
    }
}
