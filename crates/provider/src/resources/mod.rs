//! Resource Implementations
//!
//! Implements the CRUD operations for each resource type.

pub mod resource_configuration;
pub mod workgroup;

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use cirrus_common::CloudApi;
use tokio_util::sync::CancellationToken;

use crate::backoff::Backoff;
use crate::config::{ProviderConfig, RetryConfig, Timeouts};
use crate::error::Result;
use crate::schema::Schema;
use crate::state::{make_state, string_value, DynamicValue, ResourceData};

/// Everything a handler needs for one call
#[derive(Clone)]
pub struct Context {
    pub client: Arc<dyn CloudApi>,
    pub timeouts: Timeouts,
    pub waiter: Backoff,
    pub retry: RetryConfig,
    /// Cancelled when the provider is asked to stop
    pub cancel: CancellationToken,
}

impl Context {
    /// Context for operating on a resource described by `schema`
    pub fn new(
        client: Arc<dyn CloudApi>,
        config: &ProviderConfig,
        schema: &Schema,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            client,
            timeouts: config.timeouts.resolve(schema.timeouts.unwrap_or_default()),
            waiter: config.waiter,
            retry: config.retry,
            cancel,
        }
    }
}

/// CRUD operations for one resource type
#[async_trait]
pub trait ResourceHandler: Send + Sync {
    /// Create the resource described by `planned` and return its state
    async fn create(&self, ctx: &Context, planned: &DynamicValue) -> Result<DynamicValue>;

    /// Refresh `state`. `None` means the resource no longer exists.
    async fn read(&self, ctx: &Context, state: &DynamicValue) -> Result<Option<DynamicValue>>;

    /// Move the resource from the prior to the planned state
    async fn update(&self, ctx: &Context, data: &ResourceData) -> Result<DynamicValue>;

    async fn delete(&self, ctx: &Context, state: &DynamicValue) -> Result<()>;

    /// Adopt an existing resource by id
    async fn import(&self, ctx: &Context, id: &str) -> Result<Option<DynamicValue>> {
        self.read(ctx, &make_state(vec![("id", string_value(id))]))
            .await
    }
}

/// Configured tags as an API tag map
pub(crate) fn expand_tags(value: &DynamicValue) -> HashMap<String, String> {
    value
        .attr("tags")
        .as_map()
        .map(|tags| {
            tags.iter()
                .filter_map(|(k, v)| v.as_string().map(|v| (k.clone(), v.to_string())))
                .collect()
        })
        .unwrap_or_default()
}

/// Tags are not echoed by the read APIs; state keeps whatever was configured
pub(crate) fn carry_tags(value: &DynamicValue) -> DynamicValue {
    match value.attr("tags") {
        DynamicValue::Map(tags) if !tags.is_empty() => DynamicValue::Map(tags.clone()),
        _ => DynamicValue::Map(BTreeMap::new()),
    }
}
