//! Root definitions.
//!
//! A root names a URI boundary the server works within, such as a project
//! directory. Roots carry no handler; they are only listed.

use serde::Serialize;

use crate::capability::definition::validate_definition;
use crate::capability::error::CapabilityResult;

/// A declared root, as returned by `roots/list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RootDefinition {
    /// URI of the root, usually `file://`.
    pub uri: String,
    /// Display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl RootDefinition {
    /// Starts a root definition for `uri`.
    pub fn builder(uri: impl Into<String>) -> RootBuilder {
        RootBuilder {
            uri: uri.into(),
            name: None,
        }
    }

    /// URI of the root.
    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }
}

/// Builder for [`RootDefinition`].
#[must_use]
pub struct RootBuilder {
    uri: String,
    name: Option<String>,
}

impl RootBuilder {
    /// Sets the display name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Finishes the definition.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError::InvalidDefinition`](crate::capability::CapabilityError::InvalidDefinition)
    /// if the URI is empty.
    pub fn build(self) -> CapabilityResult<RootDefinition> {
        validate_definition("root", &self.uri, &[])?;
        Ok(RootDefinition {
            uri: self.uri,
            name: self.name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::CapabilityError;
    use serde_json::json;

    #[test]
    fn name_is_omitted_when_unset() {
        let root = RootDefinition::builder("file:///srv/project").build().unwrap();
        assert_eq!(serde_json::to_value(&root).unwrap(), json!({"uri": "file:///srv/project"}));

        let named = RootDefinition::builder("file:///srv/project")
            .name("Project")
            .build()
            .unwrap();
        assert_eq!(
            serde_json::to_value(&named).unwrap(),
            json!({"uri": "file:///srv/project", "name": "Project"})
        );
    }

    #[test]
    fn empty_uri_is_rejected() {
        let err = RootDefinition::builder(" ").build().unwrap_err();
        assert!(matches!(err, CapabilityError::InvalidDefinition { .. }));
    }
}
