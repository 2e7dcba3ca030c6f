//! Remote management API boundary
//!
//! Transport, request signing and pagination live behind this trait.
//! Implementations report a missing entity as [`Error::NotFound`](crate::Error::NotFound).

use async_trait::async_trait;

use crate::error::Result;
use crate::types::*;

/// Operations the provider issues against the remote management API
#[async_trait]
pub trait CloudApi: Send + Sync {
    // Workgroups

    async fn create_workgroup(&self, input: CreateWorkgroupInput) -> Result<Workgroup>;

    async fn get_workgroup(&self, name: &str) -> Result<Workgroup>;

    async fn update_workgroup(&self, input: UpdateWorkgroupInput) -> Result<Workgroup>;

    async fn delete_workgroup(&self, name: &str) -> Result<Workgroup>;

    // Resource configurations

    async fn create_resource_configuration(
        &self,
        input: CreateResourceConfigurationInput,
    ) -> Result<ResourceConfiguration>;

    async fn get_resource_configuration(&self, id: &str) -> Result<ResourceConfiguration>;

    async fn update_resource_configuration(
        &self,
        input: UpdateResourceConfigurationInput,
    ) -> Result<ResourceConfiguration>;

    async fn delete_resource_configuration(&self, id: &str) -> Result<()>;
}
