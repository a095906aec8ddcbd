//! Capability registries.
//!
//! Three registries own the declared capabilities: [`ToolRegistry`],
//! [`ResourceRegistry`] and [`PromptRegistry`]; declared roots sit in a
//! plain [`RootRegistry`] next to them. They grow monotonically at
//! registration time and are then only read and dispatched against; the
//! one exception is the resource registry, which caches resources
//! materialised from templates on first read. There is no unregister
//! operation.
//!
//! Keys are kept in registration order, which is the order of every list
//! result and the order in which templates are tried.

mod prompts;
mod resources;
mod roots;
mod tools;

pub use prompts::PromptRegistry;
pub use resources::ResourceRegistry;
pub use roots::RootRegistry;
pub use tools::ToolRegistry;

use std::sync::Arc;

use indexmap::IndexMap;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::capability::error::{CapabilityError, CapabilityResult};
use crate::capability::Registration;

/// What to do when a key is registered twice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Replace the earlier definition and log a warning (last write wins).
    #[default]
    Overwrite,
    /// Fail the registration with [`CapabilityError::Duplicate`].
    Reject,
}

/// Inserts `value` under `key`, applying the duplicate policy.
fn insert_with_policy<V>(
    map: &mut IndexMap<String, V>,
    policy: DuplicatePolicy,
    kind: &'static str,
    key: &str,
    value: V,
) -> CapabilityResult<()> {
    if map.contains_key(key) {
        match policy {
            DuplicatePolicy::Overwrite => {
                warn!(kind, key, "Duplicate registration, overwriting earlier definition");
            }
            DuplicatePolicy::Reject => {
                return Err(CapabilityError::Duplicate {
                    kind,
                    key: key.to_string(),
                });
            }
        }
    } else {
        debug!(kind, key, "Registered capability");
    }
    map.insert(key.to_string(), value);
    Ok(())
}

/// The registries, populated from a flat registration list.
#[derive(Debug)]
pub struct Registries {
    /// Tool registry.
    pub tools: ToolRegistry,
    /// Resource registry, shared with execution contexts.
    pub resources: Arc<ResourceRegistry>,
    /// Prompt registry.
    pub prompts: PromptRegistry,
    /// Declared roots.
    pub roots: RootRegistry,
}

impl Registries {
    /// Creates empty registries with the given duplicate policy.
    #[must_use]
    pub fn new(policy: DuplicatePolicy) -> Self {
        Self {
            tools: ToolRegistry::new(policy),
            resources: Arc::new(ResourceRegistry::new(policy)),
            prompts: PromptRegistry::new(policy),
            roots: RootRegistry::new(policy),
        }
    }

    /// Routes one registration entry to its registry.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError::Duplicate`] under the reject policy.
    pub fn register(&mut self, registration: Registration) -> CapabilityResult<()> {
        match registration {
            Registration::Tool(tool) => self.tools.add(tool),
            Registration::Resource(resource) => self.resources.add_resource(resource),
            Registration::Template(template) => self.resources.add_template(template),
            Registration::Prompt(prompt) => self.prompts.add(prompt),
            Registration::Root(root) => self.roots.add(root),
        }
    }

    /// Applies a whole registration list in order, stopping at the first error.
    ///
    /// # Errors
    ///
    /// Returns the first registration error.
    pub fn register_all(&mut self, registrations: impl IntoIterator<Item = Registration>) -> CapabilityResult<()> {
        registrations
            .into_iter()
            .try_for_each(|registration| self.register(registration))
    }
}

impl Default for Registries {
    fn default() -> Self {
        Self::new(DuplicatePolicy::default())
    }
}
