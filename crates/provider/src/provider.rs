//! Cirrus Provider Implementation
//!
//! Dispatches the configuration engine's requests to the registered
//! resource handlers and turns their errors into diagnostics.

use std::collections::BTreeMap;
use std::sync::Arc;

use cirrus_common::CloudApi;
use serde::Serialize;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::config::ProviderConfig;
use crate::error::{Diagnostic, ProviderError};
use crate::registry::{Registration, Registry};
use crate::resources::Context;
use crate::schema::{provider_schema, Schema};
use crate::state::{get_optional_string_attr, DynamicValue, ResourceData};

#[derive(Debug, Clone, Serialize)]
pub struct SchemaResponse {
    pub provider: Schema,
    pub resource_schemas: BTreeMap<String, Schema>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PlanResponse {
    pub planned_state: DynamicValue,
    pub requires_replace: Vec<String>,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ApplyResponse {
    /// State after the call. On failure this is the last known state.
    pub new_state: DynamicValue,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReadResponse {
    /// `Null` when the resource no longer exists
    pub new_state: DynamicValue,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportedResource {
    pub type_name: String,
    pub state: DynamicValue,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportResponse {
    pub imported_resources: Vec<ImportedResource>,
    pub diagnostics: Vec<Diagnostic>,
}

fn has_errors(diagnostics: &[Diagnostic]) -> bool {
    diagnostics.iter().any(Diagnostic::is_error)
}

/// Cirrus Provider
pub struct CirrusProvider {
    registry: Registry,
    client: Arc<dyn CloudApi>,
    config: RwLock<ProviderConfig>,
    configured: RwLock<bool>,
    /// Shared by every in-flight operation; cancelled by [`stop`](Self::stop)
    cancel: CancellationToken,
}

impl CirrusProvider {
    pub fn new(registry: Registry, client: Arc<dyn CloudApi>, config: ProviderConfig) -> Self {
        Self {
            registry,
            client,
            config: RwLock::new(config),
            configured: RwLock::new(false),
            cancel: CancellationToken::new(),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    async fn context(&self, registration: &Registration) -> Result<Context, Diagnostic> {
        if !*self.configured.read().await {
            return Err(Diagnostic::error(
                "Provider not configured",
                "The provider must be configured before resources can be managed.",
            ));
        }
        let config = self.config.read().await;
        Ok(Context::new(
            self.client.clone(),
            &config,
            &registration.schema,
            self.cancel.clone(),
        ))
    }

    fn registration(&self, type_name: &str) -> Result<&Registration, Diagnostic> {
        self.registry
            .get(type_name)
            .map_err(|e| Diagnostic::from_error("Unsupported resource type", &e))
    }

    pub fn schema(&self) -> SchemaResponse {
        info!("GetProviderSchema called");

        SchemaResponse {
            provider: provider_schema(),
            resource_schemas: self
                .registry
                .schemas()
                .into_iter()
                .map(|(name, schema)| (name.to_string(), schema.clone()))
                .collect(),
        }
    }

    pub async fn configure(&self, config: &DynamicValue) -> Vec<Diagnostic> {
        info!("ConfigureProvider called");

        let diagnostics = provider_schema().validate(config);
        if has_errors(&diagnostics) {
            return diagnostics;
        }

        {
            let mut current = self.config.write().await;
            if let Some(region) = get_optional_string_attr(config, "region") {
                current.region = region;
            }
            if let Some(endpoint) = get_optional_string_attr(config, "endpoint") {
                current.endpoint = Some(endpoint);
            }
            info!(
                "Provider configured for region {:?} (endpoint {:?})",
                current.region, current.endpoint
            );
        }

        *self.configured.write().await = true;
        diagnostics
    }

    pub fn validate_resource_config(&self, type_name: &str, config: &DynamicValue) -> Vec<Diagnostic> {
        debug!("ValidateResourceConfig called for {}", type_name);

        match self.registry.get(type_name) {
            Ok(registration) => registration.schema.validate(config),
            Err(e) => vec![Diagnostic::from_error("Unsupported resource type", &e)],
        }
    }

    /// Compute the planned state for `proposed`.
    ///
    /// Optional+computed attributes the configuration leaves unset keep
    /// their prior value.
    pub fn plan_resource_change(
        &self,
        type_name: &str,
        prior: &DynamicValue,
        proposed: &DynamicValue,
    ) -> PlanResponse {
        debug!("PlanResourceChange called for {}", type_name);

        let registration = match self.registry.get(type_name) {
            Ok(r) => r,
            Err(e) => {
                return PlanResponse {
                    diagnostics: vec![Diagnostic::from_error("Unsupported resource type", &e)],
                    ..Default::default()
                }
            }
        };

        // Destroy
        if proposed.is_null() {
            return PlanResponse::default();
        }

        let mut diagnostics = registration.schema.validate(proposed);
        if has_errors(&diagnostics) {
            return PlanResponse {
                diagnostics,
                ..Default::default()
            };
        }

        let mut planned = proposed.clone();
        if !prior.is_null() {
            for attr in registration.schema.block.attributes.iter().filter(|a| a.computed) {
                if planned.attr(&attr.name).is_null() {
                    planned.set(&attr.name, prior.attr(&attr.name).clone());
                }
            }
        }

        let requires_replace = registration.schema.requires_replace(prior, &planned);
        if !requires_replace.is_empty() {
            info!("{} requires replacement: {:?}", type_name, requires_replace);
            diagnostics.push(Diagnostic::warning(
                "Resource will be replaced",
                format!(
                    "Changing {} destroys the existing object and creates a new one.",
                    requires_replace.join(", ")
                ),
            ));
            // The replacement is a new object; nothing computed carries over.
            planned = proposed.clone();
        }

        PlanResponse {
            planned_state: planned,
            requires_replace,
            diagnostics,
        }
    }

    /// Create, update or delete depending on which of `prior` and
    /// `planned` are null.
    pub async fn apply_resource_change(
        &self,
        type_name: &str,
        prior: &DynamicValue,
        planned: &DynamicValue,
    ) -> ApplyResponse {
        info!("ApplyResourceChange called for {}", type_name);

        let failed = |diagnostic: Diagnostic| ApplyResponse {
            new_state: prior.clone(),
            diagnostics: vec![diagnostic],
        };
        let registration = match self.registration(type_name) {
            Ok(r) => r,
            Err(diag) => return failed(diag),
        };
        let handler = &registration.handler;
        let ctx = match self.context(registration).await {
            Ok(ctx) => ctx,
            Err(diag) => return failed(diag),
        };

        let (operation, result) = match (prior.is_null(), planned.is_null()) {
            (true, true) => return ApplyResponse::default(),
            (true, false) => ("create", handler.create(&ctx, planned).await),
            (false, true) => (
                "delete",
                handler.delete(&ctx, prior).await.map(|()| DynamicValue::Null),
            ),
            (false, false) => {
                let data = ResourceData::new(prior.clone(), planned.clone());
                ("update", handler.update(&ctx, &data).await)
            }
        };

        match result {
            Ok(new_state) => ApplyResponse {
                new_state,
                diagnostics: Vec::new(),
            },
            Err(e) => {
                error!("Failed to {} {}: {}", operation, type_name, e);
                ApplyResponse {
                    new_state: e.partial_state().cloned().unwrap_or_else(|| prior.clone()),
                    diagnostics: vec![Diagnostic::from_error(
                        format!("Error during {} of {}", operation, type_name),
                        &e,
                    )],
                }
            }
        }
    }

    pub async fn read_resource(&self, type_name: &str, state: &DynamicValue) -> ReadResponse {
        debug!("ReadResource called for {}", type_name);

        let failed = |diagnostic: Diagnostic| ReadResponse {
            new_state: state.clone(),
            diagnostics: vec![diagnostic],
        };
        let registration = match self.registration(type_name) {
            Ok(r) => r,
            Err(diag) => return failed(diag),
        };
        let handler = &registration.handler;
        let ctx = match self.context(registration).await {
            Ok(ctx) => ctx,
            Err(diag) => return failed(diag),
        };

        match handler.read(&ctx, state).await {
            Ok(new_state) => ReadResponse {
                new_state: new_state.unwrap_or_default(),
                diagnostics: Vec::new(),
            },
            Err(e) => failed(Diagnostic::from_error(
                format!("Error reading {}", type_name),
                &e,
            )),
        }
    }

    pub async fn import_resource_state(&self, type_name: &str, id: &str) -> ImportResponse {
        info!("ImportResourceState called for {} ({})", type_name, id);

        let failed = |diagnostic: Diagnostic| ImportResponse {
            imported_resources: Vec::new(),
            diagnostics: vec![diagnostic],
        };
        let registration = match self.registration(type_name) {
            Ok(r) => r,
            Err(diag) => return failed(diag),
        };
        let handler = &registration.handler;
        let ctx = match self.context(registration).await {
            Ok(ctx) => ctx,
            Err(diag) => return failed(diag),
        };

        match handler.import(&ctx, id).await {
            Ok(Some(state)) => ImportResponse {
                imported_resources: vec![ImportedResource {
                    type_name: type_name.to_string(),
                    state,
                }],
                diagnostics: Vec::new(),
            },
            Ok(None) => failed(Diagnostic::from_error(
                "Cannot import non-existent remote object",
                &ProviderError::Api(cirrus_common::Error::not_found(type_name, id)),
            )),
            Err(e) => failed(Diagnostic::from_error(
                format!("Error importing {}", type_name),
                &e,
            )),
        }
    }

    /// Cancel every in-flight wait and retry. Later operations fail fast.
    pub fn stop(&self) {
        info!("StopProvider called");
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::sim::SimulatedCloud;
    use crate::state::{int_value, make_state, string_value};

    fn provider() -> CirrusProvider {
        CirrusProvider::new(
            Registry::builtin(),
            Arc::new(SimulatedCloud::with_settle_polls(0)),
            ProviderConfig::default(),
        )
    }

    fn workgroup(name: &str, namespace: &str) -> DynamicValue {
        make_state(vec![
            ("workgroup_name", string_value(name)),
            ("namespace_name", string_value(namespace)),
        ])
    }

    #[test]
    fn test_schema_lists_resources() {
        let schema = provider().schema();
        assert!(schema.resource_schemas.contains_key("cirrus_workgroup"));
        assert!(schema.resource_schemas.contains_key("cirrus_resource_configuration"));
        assert!(schema.provider.block.attribute("region").is_some());
    }

    #[test]
    fn test_plan_keeps_computed_and_detects_replace() {
        let provider = provider();
        let mut prior = workgroup("wg", "ns");
        prior.set("id", string_value("wg"));
        prior.set("port", int_value(5439));

        let plan = provider.plan_resource_change("cirrus_workgroup", &prior, &workgroup("wg", "ns"));
        assert!(plan.requires_replace.is_empty());
        assert_eq!(plan.planned_state.attr("port"), &int_value(5439));
        assert_eq!(plan.planned_state.attr("id"), &string_value("wg"));

        let plan = provider.plan_resource_change("cirrus_workgroup", &prior, &workgroup("wg", "other"));
        assert_eq!(plan.requires_replace, vec!["namespace_name"]);
        assert!(plan.planned_state.attr("id").is_null());
        assert_eq!(plan.diagnostics.len(), 1);
        assert!(!plan.diagnostics[0].is_error());
    }

    #[test]
    fn test_validate_resource_config() {
        let provider = provider();
        assert!(provider
            .validate_resource_config("cirrus_workgroup", &workgroup("wg", "ns"))
            .is_empty());

        let diags = provider.validate_resource_config(
            "cirrus_resource_configuration",
            &make_state(vec![
                ("name", string_value("rc")),
                ("type", string_value("MULTI")),
            ]),
        );
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].attribute.as_deref(), Some("type"));

        let diags = provider.validate_resource_config("cirrus_cluster", &make_state(vec![]));
        assert_eq!(diags[0].kind, Some(ErrorKind::Config));
    }

    #[test]
    fn test_plan_reports_validation_errors() {
        let plan = provider().plan_resource_change(
            "cirrus_workgroup",
            &DynamicValue::Null,
            &make_state(vec![("workgroup_name", string_value("wg"))]),
        );
        assert_eq!(plan.diagnostics.len(), 1);
        assert_eq!(plan.diagnostics[0].attribute.as_deref(), Some("namespace_name"));
    }

    #[tokio::test]
    async fn test_apply_requires_configure() {
        let provider = provider();
        let resp = provider
            .apply_resource_change("cirrus_workgroup", &DynamicValue::Null, &workgroup("wg", "ns"))
            .await;
        assert_eq!(resp.diagnostics[0].summary, "Provider not configured");

        assert!(provider.configure(&make_state(vec![])).await.is_empty());
        let resp = provider
            .apply_resource_change("cirrus_workgroup", &DynamicValue::Null, &workgroup("wg", "ns"))
            .await;
        assert!(resp.diagnostics.is_empty(), "{:?}", resp.diagnostics);
        assert_eq!(resp.new_state.attr("id"), &string_value("wg"));
    }

    #[tokio::test]
    async fn test_import_missing() {
        let provider = provider();
        provider.configure(&make_state(vec![])).await;
        let resp = provider.import_resource_state("cirrus_workgroup", "ghost").await;
        assert!(resp.imported_resources.is_empty());
        assert_eq!(resp.diagnostics[0].kind, Some(ErrorKind::NotFound));
    }

    #[tokio::test]
    async fn test_unknown_type() {
        let provider = provider();
        let resp = provider
            .read_resource("cirrus_cluster", &make_state(vec![("id", string_value("x"))]))
            .await;
        assert_eq!(resp.diagnostics[0].kind, Some(ErrorKind::Config));
        assert_eq!(resp.new_state.attr("id"), &string_value("x"));
    }
}
