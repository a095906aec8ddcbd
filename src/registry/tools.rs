//! Tool registry.

use indexmap::IndexMap;
use serde_json::{Map, Value};
use tracing::warn;

use crate::capability::error::{CapabilityError, CapabilityResult};
use crate::capability::tool::{ToolDefinition, ToolDescriptor};
use crate::mcp::context::Context;
use crate::registry::{insert_with_policy, DuplicatePolicy};

/// Tools keyed by name.
///
/// Calls are independent: two concurrent calls to the same tool are two
/// invocations, with no de-duplication and no locking.
#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: IndexMap<String, ToolDefinition>,
    policy: DuplicatePolicy,
}

impl ToolRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new(policy: DuplicatePolicy) -> Self {
        Self {
            tools: IndexMap::new(),
            policy,
        }
    }

    /// Adds a tool.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError::Duplicate`] under the reject policy.
    pub fn add(&mut self, tool: ToolDefinition) -> CapabilityResult<()> {
        let name = tool.name().to_string();
        insert_with_policy(&mut self.tools, self.policy, "tool", &name, tool)
    }

    /// Public descriptors in registration order.
    #[must_use]
    pub fn list(&self) -> Vec<ToolDescriptor> {
        self.tools.values().map(ToolDefinition::descriptor).collect()
    }

    /// Looks up a tool by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ToolDefinition> {
        self.tools.get(name)
    }

    /// Number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Returns `true` if no tool is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Invokes a tool once.
    ///
    /// A handler failure is reported on the context's error channel (when a
    /// context is given) before being returned.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError::ToolNotFound`] if no tool has this name
    /// and [`CapabilityError::Invocation`] if the handler fails.
    pub async fn call(
        &self,
        name: &str,
        arguments: Map<String, Value>,
        context: Option<Context>,
    ) -> CapabilityResult<Value> {
        let tool = self.tools.get(name).ok_or_else(|| CapabilityError::ToolNotFound {
            name: name.to_string(),
        })?;

        let error_channel = context.clone();
        tool.invoke(arguments, context).await.map_err(|source| {
            warn!(tool = name, error = %source, "Tool invocation failed");
            if let Some(context) = &error_channel {
                context.error(&format!("Tool '{name}' failed: {source}"), None);
            }
            CapabilityError::Invocation { source }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::Parameter;
    use serde_json::json;

    fn mocked(name: &str, result: &'static str) -> ToolDefinition {
        ToolDefinition::builder(name)
            .description("A mocked tool")
            .param(Parameter::string("mockedInput").description("A mocked input"))
            .handler(move |_| async move { Ok(result) })
            .build()
            .unwrap()
    }

    #[test]
    fn list_is_empty_initially() {
        assert!(ToolRegistry::default().list().is_empty());
    }

    #[test]
    fn add_and_list() {
        let mut registry = ToolRegistry::default();
        registry.add(mocked("one", "1")).unwrap();
        registry.add(mocked("two", "2")).unwrap();
        let names: Vec<_> = registry.list().into_iter().map(|t| t.name).collect();
        assert_eq!(names, ["one", "two"]);
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test]
    async fn call_executes_tool() {
        let mut registry = ToolRegistry::default();
        registry.add(mocked("mockedTool", "mocked result")).unwrap();
        let result = registry.call("mockedTool", Map::new(), None).await.unwrap();
        assert_eq!(result, json!("mocked result"));
    }

    #[tokio::test]
    async fn call_unknown_tool_fails() {
        let registry = ToolRegistry::default();
        let err = registry.call("missing", Map::new(), None).await.unwrap_err();
        assert!(matches!(err, CapabilityError::ToolNotFound { name } if name == "missing"));
    }

    #[tokio::test]
    async fn duplicate_overwrites() {
        let mut registry = ToolRegistry::default();
        registry.add(mocked("same", "A")).unwrap();
        registry.add(mocked("same", "B")).unwrap();
        assert_eq!(registry.list().len(), 1);
        let result = registry.call("same", Map::new(), None).await.unwrap();
        assert_eq!(result, json!("B"));
    }

    #[test]
    fn duplicate_rejected_under_strict_policy() {
        let mut registry = ToolRegistry::new(DuplicatePolicy::Reject);
        registry.add(mocked("same", "A")).unwrap();
        assert!(matches!(
            registry.add(mocked("same", "B")),
            Err(CapabilityError::Duplicate { .. })
        ));
    }
}
