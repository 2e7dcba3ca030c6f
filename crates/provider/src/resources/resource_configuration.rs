//! Service network resource configuration handler

use async_trait::async_trait;
use cirrus_common::{
    ArnResource, CloudApi, CreateResourceConfigurationInput, DnsResource, Error, IpResource,
    ResourceConfiguration, ResourceConfigurationDefinition, ResourceConfigurationStatus,
    ResourceConfigurationType, UpdateResourceConfigurationInput,
};
use tracing::{info, warn};

use super::{carry_tags, expand_tags, Context, ResourceHandler};
use crate::error::{ErrorContext, ProviderError, Result};
use crate::retry::retry_when;
use crate::schema::{
    single_block, string_list, string_map, Attribute, AttributeType, Schema, TimeoutDefaults,
};
use crate::state::{
    bool_value, get_block, get_optional_bool_attr, get_optional_string_attr, get_string_attr,
    get_string_list_attr, list_value, make_state, optional_string_value, string_value,
    DynamicValue, ResourceData,
};
use crate::waiter::{self, ConvergenceSpec, Observed, Phase, WaitError};

pub const TYPE_NAME: &str = "cirrus_resource_configuration";

pub fn schema() -> Schema {
    Schema::v0(vec![
        Attribute::computed("id", AttributeType::String),
        Attribute::computed("arn", AttributeType::String),
        Attribute::required("name", AttributeType::String).force_new(),
        Attribute::optional("resource_gateway_identifier", AttributeType::String).force_new(),
        Attribute::optional_computed("port_ranges", string_list()),
        Attribute::optional_computed("protocol", AttributeType::String)
            .force_new()
            .one_of(&["TCP"]),
        Attribute::optional_computed("type", AttributeType::String)
            .force_new()
            .one_of(&["SINGLE", "GROUP", "CHILD", "ARN"]),
        Attribute::optional(
            "resource_configuration_definition",
            single_block(vec![
                Attribute::optional(
                    "dns_resource",
                    single_block(vec![
                        Attribute::required("domain_name", AttributeType::String),
                        Attribute::required("ip_address_type", AttributeType::String)
                            .one_of(&["IPV4", "IPV6", "DUALSTACK"]),
                    ]),
                ),
                Attribute::optional(
                    "ip_resource",
                    single_block(vec![Attribute::required("ip_address", AttributeType::String)]),
                ),
                Attribute::optional(
                    "arn_resource",
                    single_block(vec![Attribute::required("arn", AttributeType::String)]),
                ),
            ]),
        )
        // The API has no way to clear a definition in place
        .force_new_on_removal(),
        Attribute::optional_computed(
            "allow_association_to_shareable_service_network",
            AttributeType::Bool,
        ),
        Attribute::computed("status", AttributeType::String),
        Attribute::optional("tags", string_map()),
    ])
    .with_timeouts(TimeoutDefaults {
        create: 30 * 60,
        update: 30 * 60,
        delete: 30 * 60,
    })
}

impl Observed for ResourceConfiguration {
    type Status = ResourceConfigurationStatus;

    fn status(&self) -> ResourceConfigurationStatus {
        self.status
    }
}

fn created(status: &ResourceConfigurationStatus) -> Phase {
    use ResourceConfigurationStatus::*;
    match status {
        CreateInProgress => Phase::Pending,
        Active => Phase::Target,
        UpdateInProgress | DeleteInProgress | CreateFailed | UpdateFailed | DeleteFailed => {
            Phase::Unexpected
        }
    }
}

fn updated(status: &ResourceConfigurationStatus) -> Phase {
    use ResourceConfigurationStatus::*;
    match status {
        UpdateInProgress => Phase::Pending,
        Active => Phase::Target,
        CreateInProgress | DeleteInProgress | CreateFailed | UpdateFailed | DeleteFailed => {
            Phase::Unexpected
        }
    }
}

/// Deletion succeeds once the configuration is gone
fn deleted(status: &ResourceConfigurationStatus) -> Phase {
    use ResourceConfigurationStatus::*;
    match status {
        Active | DeleteInProgress => Phase::Pending,
        CreateInProgress | UpdateInProgress | CreateFailed | UpdateFailed | DeleteFailed => {
            Phase::Unexpected
        }
    }
}

async fn find_resource_configuration(
    client: &dyn CloudApi,
    id: &str,
) -> cirrus_common::Result<Option<ResourceConfiguration>> {
    match client.get_resource_configuration(id).await {
        Ok(rc) => Ok(Some(rc)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

fn expand_definition(value: &DynamicValue) -> Option<ResourceConfigurationDefinition> {
    let block = get_block(value, "resource_configuration_definition")?;

    Some(ResourceConfigurationDefinition {
        dns_resource: get_block(block, "dns_resource").map(|dns| DnsResource {
            domain_name: get_string_attr(dns, "domain_name"),
            ip_address_type: get_string_attr(dns, "ip_address_type"),
        }),
        ip_resource: get_block(block, "ip_resource").map(|ip| IpResource {
            ip_address: get_string_attr(ip, "ip_address"),
        }),
        arn_resource: get_block(block, "arn_resource").map(|arn| ArnResource {
            arn: get_string_attr(arn, "arn"),
        }),
    })
}

fn flatten_definition(definition: Option<&ResourceConfigurationDefinition>) -> DynamicValue {
    let Some(definition) = definition else {
        return list_value(vec![]);
    };
    let single = |v: Option<DynamicValue>| list_value(v.into_iter().collect());

    list_value(vec![make_state(vec![
        (
            "dns_resource",
            single(definition.dns_resource.as_ref().map(|dns| {
                make_state(vec![
                    ("domain_name", string_value(&dns.domain_name)),
                    ("ip_address_type", string_value(&dns.ip_address_type)),
                ])
            })),
        ),
        (
            "ip_resource",
            single(
                definition
                    .ip_resource
                    .as_ref()
                    .map(|ip| make_state(vec![("ip_address", string_value(&ip.ip_address))])),
            ),
        ),
        (
            "arn_resource",
            single(
                definition
                    .arn_resource
                    .as_ref()
                    .map(|arn| make_state(vec![("arn", string_value(&arn.arn))])),
            ),
        ),
    ])])
}

pub fn flatten_resource_configuration(
    rc: &ResourceConfiguration,
    config: &DynamicValue,
) -> DynamicValue {
    make_state(vec![
        ("id", string_value(&rc.id)),
        ("arn", string_value(&rc.arn)),
        ("name", string_value(&rc.name)),
        (
            "resource_gateway_identifier",
            optional_string_value(rc.resource_gateway_identifier.as_deref()),
        ),
        (
            "port_ranges",
            list_value(rc.port_ranges.iter().map(string_value).collect()),
        ),
        ("protocol", optional_string_value(rc.protocol.as_deref())),
        ("type", string_value(rc.resource_configuration_type.to_string())),
        (
            "resource_configuration_definition",
            flatten_definition(rc.definition.as_ref()),
        ),
        (
            "allow_association_to_shareable_service_network",
            bool_value(rc.allow_association_to_shareable_service_network),
        ),
        ("status", string_value(rc.status.to_string())),
        ("tags", carry_tags(config)),
    ])
}

pub struct ResourceConfigurationResource;

impl ResourceConfigurationResource {
    async fn wait(
        &self,
        ctx: &Context,
        id: &str,
        spec: ConvergenceSpec<ResourceConfigurationStatus>,
        config: &DynamicValue,
        operation: &str,
    ) -> Result<Option<DynamicValue>> {
        let client = ctx.client.as_ref();
        match waiter::wait(&spec, &ctx.cancel, move || find_resource_configuration(client, id)).await {
            Ok(rc) => Ok(rc.map(|rc| flatten_resource_configuration(&rc, config))),
            Err(failure) => {
                let context = format!("waiting for resource configuration ({}) {}", id, operation);
                match failure.last {
                    Some(rc) => Err(ProviderError::incomplete(
                        flatten_resource_configuration(&rc, config),
                        failure.error,
                    ))
                    .with_context(|| context),
                    None => Err(failure.error).with_context(|| context),
                }
            }
        }
    }
}

#[async_trait]
impl ResourceHandler for ResourceConfigurationResource {
    async fn create(&self, ctx: &Context, planned: &DynamicValue) -> Result<DynamicValue> {
        let name = get_string_attr(planned, "name");
        let resource_configuration_type = match get_optional_string_attr(planned, "type") {
            Some(t) => t.parse::<ResourceConfigurationType>()?,
            None => ResourceConfigurationType::default(),
        };
        let input = CreateResourceConfigurationInput {
            name: name.clone(),
            resource_gateway_identifier: get_optional_string_attr(planned, "resource_gateway_identifier"),
            port_ranges: get_string_list_attr(planned, "port_ranges"),
            protocol: get_optional_string_attr(planned, "protocol"),
            resource_configuration_type,
            definition: expand_definition(planned),
            allow_association_to_shareable_service_network: get_optional_bool_attr(
                planned,
                "allow_association_to_shareable_service_network",
            ),
            tags: expand_tags(planned),
        };

        // Create is not idempotent, so a failed request is never resent
        info!("Creating resource configuration: {}", name);
        let rc = ctx
            .client
            .create_resource_configuration(input)
            .await
            .with_context(|| format!("creating resource configuration ({})", name))?;

        let spec = ConvergenceSpec::new(format!("resource configuration ({})", rc.id), created)
            .timeout(ctx.timeouts.create)
            .backoff(ctx.waiter);
        match self.wait(ctx, &rc.id, spec, planned, "create").await {
            Ok(Some(state)) => Ok(state),
            Ok(None) => Err(ProviderError::incomplete(
                flatten_resource_configuration(&rc, planned),
                WaitError::NotFound {
                    resource: format!("resource configuration ({})", rc.id),
                },
            )),
            Err(e) if e.partial_state().is_some() => Err(e),
            Err(e) => Err(ProviderError::incomplete(
                flatten_resource_configuration(&rc, planned),
                e,
            )),
        }
    }

    async fn read(&self, ctx: &Context, state: &DynamicValue) -> Result<Option<DynamicValue>> {
        let id = get_string_attr(state, "id");
        let found = find_resource_configuration(ctx.client.as_ref(), &id)
            .await
            .with_context(|| format!("reading resource configuration ({})", id))?;

        match found {
            Some(rc) => Ok(Some(flatten_resource_configuration(&rc, state))),
            None => {
                warn!("Resource configuration ({}) not found, removing from state", id);
                Ok(None)
            }
        }
    }

    async fn update(&self, ctx: &Context, data: &ResourceData) -> Result<DynamicValue> {
        let id = data.id();
        let planned = data.planned();

        let mut input = UpdateResourceConfigurationInput {
            id: id.clone(),
            ..Default::default()
        };
        if !data.get("port_ranges").is_null() && data.has_change("port_ranges") {
            input.port_ranges = Some(get_string_list_attr(planned, "port_ranges"));
        }
        if data.has_change("resource_configuration_definition") {
            input.definition = expand_definition(planned);
        }
        let allow = "allow_association_to_shareable_service_network";
        if !data.get(allow).is_null() && data.has_change(allow) {
            input.allow_association_to_shareable_service_network = get_optional_bool_attr(planned, allow);
        }

        if input.port_ranges.is_none()
            && input.definition.is_none()
            && input.allow_association_to_shareable_service_network.is_none()
        {
            return Ok(data.prior().clone());
        }

        info!("Updating resource configuration: {}", id);
        let client = ctx.client.as_ref();
        let request = &input;
        retry_when(
            &format!("updating resource configuration ({})", id),
            &ctx.retry.update,
            &ctx.cancel,
            move || client.update_resource_configuration(request.clone()),
            Error::is_transient,
        )
        .await
        .with_context(|| format!("updating resource configuration ({})", id))?;

        let spec = ConvergenceSpec::new(format!("resource configuration ({})", id), updated)
            .timeout(ctx.timeouts.update)
            .backoff(ctx.waiter);
        match self.wait(ctx, &id, spec, planned, "update").await {
            Ok(Some(state)) => Ok(state),
            Ok(None) => Err(WaitError::NotFound {
                resource: format!("resource configuration ({})", id),
            }
            .into()),
            Err(e) if e.partial_state().is_some() => Err(e),
            Err(e) => Err(ProviderError::incomplete(data.prior().clone(), e)),
        }
    }

    async fn delete(&self, ctx: &Context, state: &DynamicValue) -> Result<()> {
        let id = get_string_attr(state, "id");
        info!("Deleting resource configuration: {}", id);

        let client = ctx.client.as_ref();
        let id_ref = id.as_str();
        let result = retry_when(
            &format!("deleting resource configuration ({})", id),
            &ctx.retry.delete,
            &ctx.cancel,
            move || client.delete_resource_configuration(id_ref),
            Error::is_transient,
        )
        .await;
        match result {
            Ok(()) => {}
            Err(e) if e.is_not_found() => return Ok(()),
            Err(e) => {
                return Err(e).with_context(|| format!("deleting resource configuration ({})", id))
            }
        }

        let spec = ConvergenceSpec::new(format!("resource configuration ({})", id), deleted)
            .until_gone()
            .timeout(ctx.timeouts.delete)
            .backoff(ctx.waiter);
        self.wait(ctx, &id, spec, state, "delete").await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> DynamicValue {
        make_state(vec![
            ("name", string_value("web")),
            ("port_ranges", list_value(vec![string_value("80")])),
            (
                "resource_configuration_definition",
                list_value(vec![make_state(vec![(
                    "dns_resource",
                    list_value(vec![make_state(vec![
                        ("domain_name", string_value("example.com")),
                        ("ip_address_type", string_value("IPV4")),
                    ])]),
                )])]),
            ),
        ])
    }

    #[test]
    fn test_classifiers_cover_every_status() {
        use ResourceConfigurationStatus::*;
        let all = [
            Active,
            CreateInProgress,
            UpdateInProgress,
            DeleteInProgress,
            CreateFailed,
            UpdateFailed,
            DeleteFailed,
        ];
        let phases = |classify: fn(&ResourceConfigurationStatus) -> Phase| {
            all.iter().map(classify).collect::<Vec<_>>()
        };
        use Phase::{Pending as P, Target as T, Unexpected as U};

        assert_eq!(phases(created), vec![T, P, U, U, U, U, U]);
        assert_eq!(phases(updated), vec![T, U, P, U, U, U, U]);
        assert_eq!(phases(deleted), vec![P, U, U, P, U, U, U]);
    }

    #[test]
    fn test_failed_statuses_are_unexpected() {
        use ResourceConfigurationStatus::*;
        for status in [CreateFailed, UpdateFailed, DeleteFailed] {
            assert_eq!(created(&status), Phase::Unexpected);
            assert_eq!(updated(&status), Phase::Unexpected);
            assert_eq!(deleted(&status), Phase::Unexpected);
        }
        assert_eq!(created(&CreateInProgress), Phase::Pending);
        assert_eq!(updated(&CreateInProgress), Phase::Unexpected);
        assert_eq!(deleted(&Active), Phase::Pending);
    }

    #[test]
    fn test_expand_definition() {
        let definition = expand_definition(&config()).unwrap();
        assert_eq!(
            definition.dns_resource,
            Some(DnsResource {
                domain_name: "example.com".into(),
                ip_address_type: "IPV4".into(),
            })
        );
        assert!(definition.ip_resource.is_none());
        assert!(expand_definition(&make_state(vec![])).is_none());
    }

    #[test]
    fn test_definition_survives_flatten() {
        let definition = expand_definition(&config());
        let flattened = make_state(vec![(
            "resource_configuration_definition",
            flatten_definition(definition.as_ref()),
        )]);
        assert_eq!(expand_definition(&flattened), definition);
    }

    #[test]
    fn test_schema_checks_ip_address_type() {
        let mut config = config();
        config.set(
            "resource_configuration_definition",
            list_value(vec![make_state(vec![(
                "dns_resource",
                list_value(vec![make_state(vec![
                    ("domain_name", string_value("example.com")),
                    ("ip_address_type", string_value("IPV5")),
                ])]),
            )])]),
        );
        let diags = schema().validate(&config);
        assert_eq!(diags.len(), 1);
        assert_eq!(
            diags[0].attribute.as_deref(),
            Some("resource_configuration_definition.0.dns_resource.0.ip_address_type")
        );
    }

    #[test]
    fn test_removing_definition_requires_replace() {
        let mut prior = config();
        prior.set("id", string_value("rcfg-1"));

        let mut edited = prior.clone();
        edited.set(
            "resource_configuration_definition",
            list_value(vec![make_state(vec![(
                "ip_resource",
                list_value(vec![make_state(vec![("ip_address", string_value("10.0.0.12"))])]),
            )])]),
        );
        assert!(schema().requires_replace(&prior, &edited).is_empty());

        let mut removed = prior.clone();
        removed.set("resource_configuration_definition", DynamicValue::Null);
        assert_eq!(
            schema().requires_replace(&prior, &removed),
            vec!["resource_configuration_definition"]
        );
    }
}
