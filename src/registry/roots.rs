//! Root registry.

use indexmap::IndexMap;

use crate::capability::error::CapabilityResult;
use crate::capability::root::RootDefinition;
use crate::registry::{insert_with_policy, DuplicatePolicy};

/// Roots keyed by URI.
#[derive(Debug, Default)]
pub struct RootRegistry {
    roots: IndexMap<String, RootDefinition>,
    policy: DuplicatePolicy,
}

impl RootRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new(policy: DuplicatePolicy) -> Self {
        Self {
            roots: IndexMap::new(),
            policy,
        }
    }

    /// Adds a root.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError::Duplicate`](crate::capability::CapabilityError::Duplicate)
    /// under the reject policy.
    pub fn add(&mut self, root: RootDefinition) -> CapabilityResult<()> {
        let uri = root.uri().to_string();
        insert_with_policy(&mut self.roots, self.policy, "root", &uri, root)
    }

    /// Roots in registration order.
    #[must_use]
    pub fn list(&self) -> Vec<RootDefinition> {
        self.roots.values().cloned().collect()
    }
}
