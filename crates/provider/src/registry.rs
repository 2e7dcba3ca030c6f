//! Resource type registry
//!
//! Built once at startup and owned by the provider.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::{ProviderError, Result};
use crate::resources::resource_configuration::{self, ResourceConfigurationResource};
use crate::resources::workgroup::{self, WorkgroupResource};
use crate::resources::ResourceHandler;
use crate::schema::Schema;

/// One resource type known to the provider
pub struct Registration {
    pub type_name: &'static str,
    pub schema: Schema,
    pub handler: Arc<dyn ResourceHandler>,
}

#[derive(Default)]
pub struct Registry {
    entries: BTreeMap<&'static str, Registration>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every resource type this provider ships
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(workgroup::TYPE_NAME, workgroup::schema(), WorkgroupResource);
        registry.register(
            resource_configuration::TYPE_NAME,
            resource_configuration::schema(),
            ResourceConfigurationResource,
        );
        registry
    }

    /// Add a resource type. A later registration of the same name replaces
    /// the earlier one.
    pub fn register(
        &mut self,
        type_name: &'static str,
        schema: Schema,
        handler: impl ResourceHandler + 'static,
    ) {
        self.entries.insert(
            type_name,
            Registration {
                type_name,
                schema,
                handler: Arc::new(handler),
            },
        );
    }

    pub fn get(&self, type_name: &str) -> Result<&Registration> {
        self.entries
            .get(type_name)
            .ok_or_else(|| ProviderError::UnknownResourceType(type_name.to_string()))
    }

    pub fn type_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.keys().copied()
    }

    pub fn schemas(&self) -> BTreeMap<&'static str, &Schema> {
        self.entries
            .iter()
            .map(|(name, r)| (*name, &r.schema))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_builtin_types() {
        let registry = Registry::builtin();
        assert_eq!(
            registry.type_names().collect::<Vec<_>>(),
            vec!["cirrus_resource_configuration", "cirrus_workgroup"]
        );
        let wg = registry.get("cirrus_workgroup").unwrap();
        assert!(wg.schema.block.attribute("workgroup_name").unwrap().force_new);
    }

    #[test]
    fn test_unknown_type() {
        let err = Registry::builtin().get("cirrus_cluster").err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Config);
        assert_eq!(err.to_string(), "Unknown resource type: cirrus_cluster");
    }
}
