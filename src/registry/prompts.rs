//! Prompt registry.

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::capability::error::{CapabilityError, CapabilityResult};
use crate::capability::prompt::{PromptDefinition, PromptDescriptor};
use crate::registry::{insert_with_policy, DuplicatePolicy};

/// Prompts keyed by name.
#[derive(Debug, Default)]
pub struct PromptRegistry {
    prompts: IndexMap<String, PromptDefinition>,
    policy: DuplicatePolicy,
}

impl PromptRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new(policy: DuplicatePolicy) -> Self {
        Self {
            prompts: IndexMap::new(),
            policy,
        }
    }

    /// Adds a prompt.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError::Duplicate`] under the reject policy.
    pub fn add(&mut self, prompt: PromptDefinition) -> CapabilityResult<()> {
        let name = prompt.name().to_string();
        insert_with_policy(&mut self.prompts, self.policy, "prompt", &name, prompt)
    }

    /// Public descriptors in registration order.
    #[must_use]
    pub fn list(&self) -> Vec<PromptDescriptor> {
        self.prompts.values().map(PromptDefinition::descriptor).collect()
    }

    /// Looks up a prompt by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&PromptDefinition> {
        self.prompts.get(name)
    }

    /// Renders a prompt.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError::PromptNotFound`] if no prompt has this
    /// name and [`CapabilityError::Invocation`] if the handler fails.
    pub async fn call(&self, name: &str, arguments: Map<String, Value>) -> CapabilityResult<String> {
        let prompt = self.get(name).ok_or_else(|| CapabilityError::PromptNotFound {
            name: name.to_string(),
        })?;
        prompt
            .render(arguments)
            .await
            .map_err(|source| CapabilityError::Invocation { source })
    }
}
