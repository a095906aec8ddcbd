//! Resource registry: concrete resources plus URI templates.
//!
//! Lookup order for a URI:
//!
//! 1. Exact match in the concrete table.
//! 2. First template, in registration order, whose pattern matches. The
//!    result is materialised into the concrete table under the exact URI,
//!    so later reads skip matching.
//! 3. Otherwise [`CapabilityError::ResourceNotFound`].
//!
//! Overlapping templates are not ranked; the earliest registered wins.
//! Materialised entries are never evicted.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use indexmap::IndexMap;
use tracing::debug;

use crate::capability::error::{CapabilityError, CapabilityResult};
use crate::capability::resource::{
    ReadResourceResult, ResourceDefinition, ResourceDescriptor, ResourceTemplateDefinition,
    ResourceTemplateDescriptor,
};
use crate::capability::uri::UriParams;
use crate::registry::{insert_with_policy, DuplicatePolicy};

/// Resources keyed by URI and templates keyed by template string.
///
/// The tables sit behind locks so the registry can be shared with
/// execution contexts; no lock is held while a handler runs.
#[derive(Debug, Default)]
pub struct ResourceRegistry {
    resources: RwLock<IndexMap<String, ResourceDefinition>>,
    templates: RwLock<IndexMap<String, ResourceTemplateDefinition>>,
    policy: DuplicatePolicy,
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

impl ResourceRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new(policy: DuplicatePolicy) -> Self {
        Self {
            resources: RwLock::new(IndexMap::new()),
            templates: RwLock::new(IndexMap::new()),
            policy,
        }
    }

    /// Adds a concrete resource.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError::Duplicate`] under the reject policy.
    pub fn add_resource(&self, resource: ResourceDefinition) -> CapabilityResult<()> {
        let uri = resource.uri().to_string();
        insert_with_policy(&mut write(&self.resources), self.policy, "resource", &uri, resource)
    }

    /// Adds a resource template.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError::Duplicate`] under the reject policy.
    pub fn add_template(&self, template: ResourceTemplateDefinition) -> CapabilityResult<()> {
        let key = template.uri_template().to_string();
        insert_with_policy(
            &mut write(&self.templates),
            self.policy,
            "resource template",
            &key,
            template,
        )
    }

    /// Concrete resources (including materialised ones) in insertion order.
    #[must_use]
    pub fn list_resources(&self) -> Vec<ResourceDescriptor> {
        read(&self.resources)
            .values()
            .map(ResourceDefinition::descriptor)
            .collect()
    }

    /// Templates in registration order.
    #[must_use]
    pub fn list_templates(&self) -> Vec<ResourceTemplateDescriptor> {
        read(&self.templates)
            .values()
            .map(ResourceTemplateDefinition::descriptor)
            .collect()
    }

    /// Finds the first template matching `uri` and the values it extracts.
    #[must_use]
    pub fn match_template(&self, uri: &str) -> Option<(ResourceTemplateDefinition, UriParams)> {
        read(&self.templates)
            .values()
            .find_map(|template| template.matches(uri).map(|params| (template.clone(), params)))
    }

    /// Reads a resource by URI.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError::ResourceNotFound`] if nothing matches and
    /// [`CapabilityError::Invocation`] if the handler fails. A failed read
    /// through a template does not materialise anything.
    pub async fn get(&self, uri: &str) -> CapabilityResult<ReadResourceResult> {
        let exact = read(&self.resources).get(uri).cloned();
        if let Some(resource) = exact {
            return resource
                .read()
                .await
                .map_err(|source| CapabilityError::Invocation { source });
        }

        let (template, params) = self
            .match_template(uri)
            .ok_or_else(|| CapabilityError::ResourceNotFound {
                uri: uri.to_string(),
            })?;

        debug!(
            uri,
            template = template.uri_template(),
            params = ?params,
            "Materialising resource from template"
        );
        let resource = template.materialize(uri, params);
        let result = resource
            .read()
            .await
            .map_err(|source| CapabilityError::Invocation { source })?;

        write(&self.resources)
            .entry(uri.to_string())
            .or_insert(resource);

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::ResourceBody;

    fn resource(uri: &str, text: &'static str) -> ResourceDefinition {
        ResourceDefinition::builder(uri)
            .handler(move || async move { Ok(text) })
            .build()
            .unwrap()
    }

    fn template(pattern: &str, prefix: &'static str) -> ResourceTemplateDefinition {
        ResourceTemplateDefinition::builder(pattern)
            .handler(move |args| async move {
                let values: Vec<String> = args
                    .positional()
                    .iter()
                    .filter_map(|v| v.as_str().map(String::from))
                    .collect();
                Ok(format!("{prefix}:{}", values.join(",")))
            })
            .build()
            .unwrap()
    }

    fn text(result: &ReadResourceResult) -> &str {
        result.contents[0].body.as_text().unwrap()
    }

    #[tokio::test]
    async fn exact_resource_is_read() {
        let registry = ResourceRegistry::default();
        registry.add_resource(resource("file://test1.txt", "Content 1")).unwrap();
        registry.add_resource(resource("file://test2.txt", "Content 2")).unwrap();
        assert_eq!(text(&registry.get("file://test1.txt").await.unwrap()), "Content 1");
        assert_eq!(text(&registry.get("file://test2.txt").await.unwrap()), "Content 2");
    }

    #[tokio::test]
    async fn unknown_uri_is_not_found() {
        let registry = ResourceRegistry::default();
        let err = registry.get("non-existent-uri").await.unwrap_err();
        assert!(matches!(err, CapabilityError::ResourceNotFound { .. }));
    }

    #[tokio::test]
    async fn template_match_materialises() {
        let registry = ResourceRegistry::default();
        registry.add_template(template("file://{folder}/{filename}", "tpl")).unwrap();
        assert!(registry.list_resources().is_empty());

        let result = registry.get("file://documents/report.pdf").await.unwrap();
        assert_eq!(text(&result), "tpl:documents,report.pdf");
        assert_eq!(result.contents[0].mime_type, "text/plain");

        let listed = registry.list_resources();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].uri, "file://documents/report.pdf");
        assert_eq!(registry.list_templates().len(), 1);
    }

    #[tokio::test]
    async fn exact_match_beats_template() {
        let registry = ResourceRegistry::default();
        registry.add_template(template("file://{folder}/{filename}", "tpl")).unwrap();
        registry.add_resource(resource("file://a/b.txt", "concrete")).unwrap();
        let result = registry.get("file://a/b.txt").await.unwrap();
        assert_eq!(text(&result), "concrete");
    }

    #[tokio::test]
    async fn first_registered_template_wins() {
        let registry = ResourceRegistry::default();
        registry.add_template(template("db://{table}/{id}", "first")).unwrap();
        registry.add_template(template("db://{schema}/{name}", "second")).unwrap();
        let result = registry.get("db://users/7").await.unwrap();
        assert_eq!(text(&result), "first:users,7");
        let (matched, params) = registry.match_template("db://users/7").unwrap();
        assert_eq!(matched.uri_template(), "db://{table}/{id}");
        assert_eq!(params["table"], "users");
    }

    #[tokio::test]
    async fn failed_template_read_is_not_cached() {
        let registry = ResourceRegistry::default();
        let failing = ResourceTemplateDefinition::builder("err://{code}")
            .handler(|_| async { Err::<ResourceBody, _>("nope".into()) })
            .build()
            .unwrap();
        registry.add_template(failing).unwrap();
        let err = registry.get("err://500").await.unwrap_err();
        assert!(matches!(err, CapabilityError::Invocation { .. }));
        assert!(registry.list_resources().is_empty());
    }
}
