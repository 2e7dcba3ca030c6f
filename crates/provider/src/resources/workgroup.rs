//! Serverless workgroup resource handler
//!
//! A workgroup is addressed by its name. Every mutation is followed by a
//! wait for the workgroup to return to `AVAILABLE`; the API accepts only
//! one changed parameter per UpdateWorkgroup call, so an update with
//! several changed attributes becomes a sequence of requests.

use std::time::Duration;

use async_trait::async_trait;
use cirrus_common::{
    CloudApi, ConfigParameter, CreateWorkgroupInput, Endpoint, UpdateWorkgroupInput, Workgroup,
    WorkgroupStatus,
};
use tracing::{debug, info, warn};

use super::{carry_tags, expand_tags, Context, ResourceHandler};
use crate::error::{ErrorContext, ProviderError, Result};
use crate::retry::{conflict_containing, retry_when, validation_containing};
use crate::schema::{
    blocks, string_map, string_set, Attribute, AttributeType, Schema, TimeoutDefaults,
};
use crate::state::{
    bool_value, get_blocks, get_bool_attr, get_optional_bool_attr, get_optional_int_attr,
    get_string_attr, get_string_list_attr, int_value, list_value, make_state,
    optional_string_value, string_set_value, string_value, DynamicValue, ResourceData,
};
use crate::waiter::{self, ConvergenceSpec, Observed, Phase, WaitError, WaitFailure};

pub const TYPE_NAME: &str = "cirrus_workgroup";

const OPERATION_RUNNING: &str = "operation running";
const SNAPSHOT_PENDING: &str = "Wait until at least one snapshot exists and retry";

/// Parameter keys accepted in `config_parameter` blocks
pub const CONFIG_PARAMETER_KEYS: &[&str] = &[
    "auto_mv",
    "datestyle",
    "enable_case_sensitive_identifier",
    "enable_user_activity_logging",
    "query_group",
    "search_path",
    "max_query_cpu_time",
    "max_query_blocks_read",
    "max_scan_row_count",
    "max_query_execution_time",
    "max_query_queue_time",
    "max_query_cpu_usage_percent",
    "max_query_temp_blocks_to_disk",
    "max_join_row_count",
    "max_nested_loop_join_row_count",
    "require_ssl",
    "use_fips_ssl",
];

pub fn schema() -> Schema {
    let network_interface = blocks(vec![
        Attribute::computed("availability_zone", AttributeType::String),
        Attribute::computed("network_interface_id", AttributeType::String),
        Attribute::computed("private_ip_address", AttributeType::String),
        Attribute::computed("subnet_id", AttributeType::String),
    ]);
    let vpc_endpoint = blocks(vec![
        Attribute::computed("network_interface", network_interface),
        Attribute::computed("vpc_endpoint_id", AttributeType::String),
        Attribute::computed("vpc_id", AttributeType::String),
    ]);

    Schema::v0(vec![
        Attribute::computed("id", AttributeType::String),
        Attribute::computed("arn", AttributeType::String),
        Attribute::optional_computed("base_capacity", AttributeType::Number)
            .between(0, i32::MAX.into()),
        Attribute::optional_computed(
            "config_parameter",
            blocks(vec![
                Attribute::required("parameter_key", AttributeType::String)
                    .one_of(CONFIG_PARAMETER_KEYS),
                Attribute::required("parameter_value", AttributeType::String),
            ]),
        ),
        Attribute::computed(
            "endpoint",
            blocks(vec![
                Attribute::computed("address", AttributeType::String),
                Attribute::computed("port", AttributeType::Number),
                Attribute::computed("vpc_endpoint", vpc_endpoint),
            ]),
        ),
        Attribute::optional("enhanced_vpc_routing", AttributeType::Bool),
        Attribute::optional("max_capacity", AttributeType::Number).between(0, i32::MAX.into()),
        Attribute::required("namespace_name", AttributeType::String).force_new(),
        Attribute::optional_computed("port", AttributeType::Number).between(1, 65535),
        Attribute::optional("publicly_accessible", AttributeType::Bool),
        Attribute::optional_computed("security_group_ids", string_set()),
        Attribute::optional_computed("subnet_ids", string_set()),
        Attribute::computed("workgroup_id", AttributeType::String),
        Attribute::required("workgroup_name", AttributeType::String).force_new(),
        Attribute::optional("tags", string_map()),
    ])
    .with_timeouts(TimeoutDefaults {
        create: 20 * 60,
        update: 20 * 60,
        delete: 20 * 60,
    })
}

impl Observed for Workgroup {
    type Status = WorkgroupStatus;

    fn status(&self) -> WorkgroupStatus {
        self.status
    }
}

fn available(status: &WorkgroupStatus) -> Phase {
    match status {
        WorkgroupStatus::Creating | WorkgroupStatus::Modifying => Phase::Pending,
        WorkgroupStatus::Available => Phase::Target,
        WorkgroupStatus::Deleting => Phase::Unexpected,
    }
}

fn deleted(status: &WorkgroupStatus) -> Phase {
    match status {
        WorkgroupStatus::Available | WorkgroupStatus::Modifying | WorkgroupStatus::Deleting => {
            Phase::Pending
        }
        WorkgroupStatus::Creating => Phase::Unexpected,
    }
}

async fn find_workgroup(
    client: &dyn CloudApi,
    name: &str,
) -> cirrus_common::Result<Option<Workgroup>> {
    match client.get_workgroup(name).await {
        Ok(workgroup) => Ok(Some(workgroup)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

async fn wait_available(
    ctx: &Context,
    name: &str,
    timeout: Duration,
) -> std::result::Result<Workgroup, WaitFailure<Workgroup>> {
    let spec = ConvergenceSpec::new(format!("workgroup ({})", name), available)
        .timeout(timeout)
        .backoff(ctx.waiter);
    let client = ctx.client.as_ref();

    match waiter::wait(&spec, &ctx.cancel, move || find_workgroup(client, name)).await? {
        Some(workgroup) => Ok(workgroup),
        None => Err(WaitFailure {
            error: WaitError::NotFound {
                resource: spec.resource().to_string(),
            },
            last: None,
        }),
    }
}

/// Issue one UpdateWorkgroup request and wait for the workgroup to settle
async fn update_workgroup(
    ctx: &Context,
    input: UpdateWorkgroupInput,
    state: &DynamicValue,
) -> Result<Workgroup> {
    let name = input.workgroup_name.clone();
    let what = format!("updating workgroup ({})", name);
    let client = ctx.client.as_ref();
    let request = &input;
    let conflict = conflict_containing(OPERATION_RUNNING);
    let snapshot = validation_containing(SNAPSHOT_PENDING);

    debug!("UpdateWorkgroup request: {:?}", input);
    retry_when(
        &what,
        &ctx.retry.update,
        &ctx.cancel,
        move || client.update_workgroup(request.clone()),
        |e| conflict(e) || snapshot(e),
    )
    .await
    .with_context(|| what.clone())?;

    match wait_available(ctx, &name, ctx.timeouts.update).await {
        Ok(workgroup) => Ok(workgroup),
        Err(failure) => {
            let state = match &failure.last {
                Some(workgroup) => flatten_workgroup(workgroup, state),
                None => state.clone(),
            };
            Err(ProviderError::incomplete(state, failure.error))
                .with_context(|| format!("waiting for workgroup ({}) update", name))
        }
    }
}

/// Requests needed to move from the prior to the planned state, in order.
///
/// Capacity goes first. `base_capacity` may not exceed the current
/// `max_capacity` and `max_capacity` may not drop below the current
/// `base_capacity`, so the order of the two requests depends on the
/// values. A `max_capacity` of 0 in state means "no limit", which the
/// API spells -1. Cases the ordering cannot satisfy, like raising base
/// above an unchanged max, are left for the API to reject.
pub fn plan_updates(data: &ResourceData) -> Result<Vec<UpdateWorkgroupInput>> {
    let planned = data.planned();
    let request = || UpdateWorkgroupInput::new(data.id());
    let base = |v: i64| -> Result<UpdateWorkgroupInput> {
        Ok(UpdateWorkgroupInput {
            base_capacity: Some(to_i32("base_capacity", v)?),
            ..request()
        })
    };
    let max = |v: i64| -> Result<UpdateWorkgroupInput> {
        Ok(UpdateWorkgroupInput {
            max_capacity: Some(to_i32("max_capacity", v)?),
            ..request()
        })
    };

    let (_, new_base) = data.get_int_change("base_capacity");
    let has_base_change = configured_change(data, "base_capacity");
    let (old_max, new_max) = data.get_int_change("max_capacity");
    let has_max_change = old_max != new_max;

    let mut steps = Vec::new();
    if has_max_change && new_max == 0 {
        steps.push(max(-1)?);
    } else if has_base_change && has_max_change && (old_max == 0 || new_base <= old_max) {
        steps.push(base(new_base)?);
        steps.push(max(new_max)?);
    } else if has_base_change && has_max_change {
        steps.push(max(new_max)?);
        steps.push(base(new_base)?);
    } else if has_base_change {
        steps.push(base(new_base)?);
    } else if has_max_change {
        steps.push(max(new_max)?);
    }

    if configured_change(data, "config_parameter") {
        steps.push(UpdateWorkgroupInput {
            config_parameters: Some(expand_config_parameters(planned)),
            ..request()
        });
    }
    if bool_change(data, "enhanced_vpc_routing") {
        steps.push(UpdateWorkgroupInput {
            enhanced_vpc_routing: Some(get_bool_attr(planned, "enhanced_vpc_routing", false)),
            ..request()
        });
    }
    if configured_change(data, "port") {
        steps.push(UpdateWorkgroupInput {
            port: optional_i32(planned, "port")?,
            ..request()
        });
    }
    if bool_change(data, "publicly_accessible") {
        steps.push(UpdateWorkgroupInput {
            publicly_accessible: Some(get_bool_attr(planned, "publicly_accessible", false)),
            ..request()
        });
    }
    if configured_change(data, "security_group_ids") {
        steps.push(UpdateWorkgroupInput {
            security_group_ids: Some(get_string_list_attr(planned, "security_group_ids")),
            ..request()
        });
    }
    if configured_change(data, "subnet_ids") {
        steps.push(UpdateWorkgroupInput {
            subnet_ids: Some(get_string_list_attr(planned, "subnet_ids")),
            ..request()
        });
    }
    Ok(steps)
}

/// The API takes 32-bit integers; state holds i64.
fn to_i32(key: &str, value: i64) -> Result<i32> {
    i32::try_from(value).map_err(|_| {
        ProviderError::InvalidConfig(format!("{} is out of range: {}", key, value))
    })
}

fn optional_i32(value: &DynamicValue, key: &str) -> Result<Option<i32>> {
    get_optional_int_attr(value, key)
        .map(|v| to_i32(key, v))
        .transpose()
}

/// Optional+computed attributes left out of the configuration keep
/// whatever the API reports, so only a configured value counts.
fn configured_change(data: &ResourceData, key: &str) -> bool {
    !data.get(key).is_null() && data.has_set_change(key)
}

fn bool_change(data: &ResourceData, key: &str) -> bool {
    get_bool_attr(data.prior(), key, false) != get_bool_attr(data.planned(), key, false)
}

fn expand_create(planned: &DynamicValue) -> Result<CreateWorkgroupInput> {
    Ok(CreateWorkgroupInput {
        workgroup_name: get_string_attr(planned, "workgroup_name"),
        namespace_name: get_string_attr(planned, "namespace_name"),
        base_capacity: optional_i32(planned, "base_capacity")?,
        // 0 is "unset" for max_capacity
        max_capacity: optional_i32(planned, "max_capacity")?.filter(|v| *v != 0),
        config_parameters: expand_config_parameters(planned),
        enhanced_vpc_routing: get_optional_bool_attr(planned, "enhanced_vpc_routing").filter(|v| *v),
        port: optional_i32(planned, "port")?,
        publicly_accessible: get_optional_bool_attr(planned, "publicly_accessible").filter(|v| *v),
        security_group_ids: get_string_list_attr(planned, "security_group_ids"),
        subnet_ids: get_string_list_attr(planned, "subnet_ids"),
        tags: expand_tags(planned),
    })
}

fn expand_config_parameters(value: &DynamicValue) -> Vec<ConfigParameter> {
    get_blocks(value, "config_parameter")
        .into_iter()
        .map(|block| {
            ConfigParameter::new(
                get_string_attr(block, "parameter_key"),
                get_string_attr(block, "parameter_value"),
            )
        })
        .collect()
}

fn flatten_config_parameters(params: &[ConfigParameter]) -> DynamicValue {
    let mut params = params.to_vec();
    params.sort();
    list_value(
        params
            .iter()
            .map(|p| {
                make_state(vec![
                    ("parameter_key", string_value(&p.parameter_key)),
                    ("parameter_value", string_value(&p.parameter_value)),
                ])
            })
            .collect(),
    )
}

fn flatten_endpoint(endpoint: &Endpoint) -> DynamicValue {
    let vpc_endpoints = endpoint
        .vpc_endpoints
        .iter()
        .map(|vpce| {
            let interfaces = vpce
                .network_interfaces
                .iter()
                .map(|ni| {
                    make_state(vec![
                        ("availability_zone", optional_string_value(ni.availability_zone.as_deref())),
                        ("network_interface_id", optional_string_value(ni.network_interface_id.as_deref())),
                        ("private_ip_address", optional_string_value(ni.private_ip_address.as_deref())),
                        ("subnet_id", optional_string_value(ni.subnet_id.as_deref())),
                    ])
                })
                .collect();
            make_state(vec![
                ("network_interface", list_value(interfaces)),
                ("vpc_endpoint_id", optional_string_value(vpce.vpc_endpoint_id.as_deref())),
                ("vpc_id", optional_string_value(vpce.vpc_id.as_deref())),
            ])
        })
        .collect();

    make_state(vec![
        ("address", optional_string_value(endpoint.address.as_deref())),
        (
            "port",
            endpoint
                .port
                .map(|p| int_value(p as i64))
                .unwrap_or(DynamicValue::Null),
        ),
        ("vpc_endpoint", list_value(vpc_endpoints)),
    ])
}

/// Workgroup state. `config` supplies the attributes the API does not
/// return.
pub fn flatten_workgroup(workgroup: &Workgroup, config: &DynamicValue) -> DynamicValue {
    let endpoint = workgroup.endpoint.as_ref();

    make_state(vec![
        ("id", string_value(&workgroup.workgroup_name)),
        ("arn", string_value(&workgroup.workgroup_arn)),
        (
            "base_capacity",
            workgroup
                .base_capacity
                .map(|v| int_value(v as i64))
                .unwrap_or(DynamicValue::Null),
        ),
        ("config_parameter", flatten_config_parameters(&workgroup.config_parameters)),
        (
            "endpoint",
            list_value(endpoint.map(flatten_endpoint).into_iter().collect()),
        ),
        ("enhanced_vpc_routing", bool_value(workgroup.enhanced_vpc_routing)),
        ("max_capacity", int_value(workgroup.max_capacity.unwrap_or(0) as i64)),
        ("namespace_name", string_value(&workgroup.namespace_name)),
        (
            "port",
            endpoint
                .and_then(|e| e.port)
                .map(|p| int_value(p as i64))
                .unwrap_or(DynamicValue::Null),
        ),
        ("publicly_accessible", bool_value(workgroup.publicly_accessible)),
        ("security_group_ids", string_set_value(&workgroup.security_group_ids)),
        ("subnet_ids", string_set_value(&workgroup.subnet_ids)),
        ("workgroup_id", string_value(&workgroup.workgroup_id)),
        ("workgroup_name", string_value(&workgroup.workgroup_name)),
        ("tags", carry_tags(config)),
    ])
}

pub struct WorkgroupResource;

impl WorkgroupResource {
    async fn refresh(&self, ctx: &Context, name: &str, config: &DynamicValue) -> Result<DynamicValue> {
        match find_workgroup(ctx.client.as_ref(), name)
            .await
            .with_context(|| format!("reading workgroup ({})", name))?
        {
            Some(workgroup) => Ok(flatten_workgroup(&workgroup, config)),
            None => Err(cirrus_common::Error::not_found("workgroup", name))
                .with_context(|| format!("reading workgroup ({})", name)),
        }
    }
}

#[async_trait]
impl ResourceHandler for WorkgroupResource {
    async fn create(&self, ctx: &Context, planned: &DynamicValue) -> Result<DynamicValue> {
        let input = expand_create(planned)?;
        let name = input.workgroup_name.clone();
        info!("Creating workgroup: {}", name);

        let created = ctx
            .client
            .create_workgroup(input)
            .await
            .with_context(|| format!("creating workgroup ({})", name))?;

        // The workgroup exists from here on; failures carry its last state.
        if let Err(failure) = wait_available(ctx, &name, ctx.timeouts.create).await {
            let last = failure.last.as_ref().unwrap_or(&created);
            return Err(ProviderError::incomplete(
                flatten_workgroup(last, planned),
                failure.error,
            ))
            .with_context(|| format!("waiting for workgroup ({}) create", name));
        }

        let state = self.refresh(ctx, &name, planned).await;
        state.map_err(|e| ProviderError::incomplete(flatten_workgroup(&created, planned), e))
    }

    async fn read(&self, ctx: &Context, state: &DynamicValue) -> Result<Option<DynamicValue>> {
        let name = get_string_attr(state, "id");
        let found = find_workgroup(ctx.client.as_ref(), &name)
            .await
            .with_context(|| format!("reading workgroup ({})", name))?;

        match found {
            Some(workgroup) => Ok(Some(flatten_workgroup(&workgroup, state))),
            None => {
                warn!("Workgroup ({}) not found, removing from state", name);
                Ok(None)
            }
        }
    }

    async fn update(&self, ctx: &Context, data: &ResourceData) -> Result<DynamicValue> {
        let name = data.id();
        let steps = plan_updates(data)?;
        info!("Updating workgroup: {} ({} requests)", name, steps.len());

        let mut latest: Option<Workgroup> = None;
        for input in steps {
            let known = latest
                .as_ref()
                .map(|w| flatten_workgroup(w, data.planned()))
                .unwrap_or_else(|| data.prior().clone());

            match update_workgroup(ctx, input, &known).await {
                Ok(workgroup) => latest = Some(workgroup),
                Err(e) if e.partial_state().is_some() || latest.is_none() => return Err(e),
                Err(e) => return Err(ProviderError::incomplete(known, e)),
            }
        }

        self.refresh(ctx, &name, data.planned()).await
    }

    async fn delete(&self, ctx: &Context, state: &DynamicValue) -> Result<()> {
        let name = get_string_attr(state, "id");
        let what = format!("deleting workgroup ({})", name);
        info!("Deleting workgroup: {}", name);

        let client = ctx.client.as_ref();
        let name_ref = name.as_str();
        let deleted_now = retry_when(
            &what,
            &ctx.retry.delete,
            &ctx.cancel,
            move || client.delete_workgroup(name_ref),
            conflict_containing(OPERATION_RUNNING),
        )
        .await;

        match deleted_now {
            Ok(_) => {}
            Err(e) if e.is_not_found() => {
                info!("Workgroup ({}) already deleted", name);
                return Ok(());
            }
            Err(e) => return Err(e).with_context(|| what.clone()),
        }

        let spec = ConvergenceSpec::new(format!("workgroup ({})", name), deleted)
            .until_gone()
            .timeout(ctx.timeouts.delete)
            .backoff(ctx.waiter);
        waiter::wait(&spec, &ctx.cancel, move || find_workgroup(client, name_ref))
            .await
            .map_err(WaitError::from)
            .with_context(|| format!("waiting for workgroup ({}) delete", name))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(base: Option<i64>, max: i64) -> DynamicValue {
        let mut s = make_state(vec![
            ("id", string_value("wg")),
            ("workgroup_name", string_value("wg")),
            ("max_capacity", int_value(max)),
        ]);
        if let Some(base) = base {
            s.set("base_capacity", int_value(base));
        }
        s
    }

    fn capacity_steps(prior: DynamicValue, planned: DynamicValue) -> Vec<(Option<i32>, Option<i32>)> {
        plan_updates(&ResourceData::new(prior, planned))
            .unwrap()
            .into_iter()
            .map(|i| (i.base_capacity, i.max_capacity))
            .collect()
    }

    #[test]
    fn test_classifiers_are_exhaustive() {
        use WorkgroupStatus::*;
        let phases: Vec<_> = [Creating, Available, Modifying, Deleting]
            .iter()
            .map(|s| (available(s), deleted(s)))
            .collect();
        assert_eq!(
            phases,
            vec![
                (Phase::Pending, Phase::Unexpected),
                (Phase::Target, Phase::Pending),
                (Phase::Pending, Phase::Pending),
                (Phase::Unexpected, Phase::Pending),
            ]
        );
    }

    #[test]
    fn test_max_to_zero_removes_limit() {
        assert_eq!(
            capacity_steps(state(Some(32), 256), state(Some(64), 0)),
            vec![(None, Some(-1))]
        );
    }

    #[test]
    fn test_base_then_max_when_base_fits() {
        assert_eq!(
            capacity_steps(state(Some(32), 256), state(Some(128), 512)),
            vec![(Some(128), None), (None, Some(512))]
        );
        // No previous limit
        assert_eq!(
            capacity_steps(state(Some(32), 0), state(Some(512), 1024)),
            vec![(Some(512), None), (None, Some(1024))]
        );
    }

    #[test]
    fn test_max_then_base_when_base_exceeds_old_max() {
        assert_eq!(
            capacity_steps(state(Some(32), 256), state(Some(512), 1024)),
            vec![(None, Some(1024)), (Some(512), None)]
        );
    }

    #[test]
    fn test_single_capacity_change() {
        assert_eq!(
            capacity_steps(state(Some(32), 256), state(Some(64), 256)),
            vec![(Some(64), None)]
        );
        assert_eq!(
            capacity_steps(state(Some(32), 256), state(Some(32), 128)),
            vec![(None, Some(128))]
        );
        // Unconfigured base keeps the remote value
        assert_eq!(
            capacity_steps(state(Some(32), 256), state(None, 256)),
            vec![]
        );
    }

    #[test]
    fn test_one_request_per_parameter() {
        let prior = state(Some(32), 0);
        let mut planned = prior.clone();
        planned.set("publicly_accessible", bool_value(true));
        planned.set("port", int_value(5440));
        planned.set("subnet_ids", string_set_value(&["subnet-a"]));
        planned.set(
            "config_parameter",
            list_value(vec![make_state(vec![
                ("parameter_key", string_value("auto_mv")),
                ("parameter_value", string_value("false")),
            ])]),
        );

        let steps = plan_updates(&ResourceData::new(prior, planned)).unwrap();
        assert_eq!(steps.len(), 4);
        assert!(steps.iter().all(|s| s.parameter_count() == 1));
        assert!(steps[0].config_parameters.is_some());
        assert_eq!(steps[1].port, Some(5440));
        assert_eq!(steps[2].publicly_accessible, Some(true));
        assert_eq!(steps[3].subnet_ids, Some(vec!["subnet-a".to_string()]));
    }

    #[test]
    fn test_expand_create_skips_zero_values() {
        let planned = make_state(vec![
            ("workgroup_name", string_value("wg")),
            ("namespace_name", string_value("ns")),
            ("max_capacity", int_value(0)),
            ("enhanced_vpc_routing", bool_value(false)),
            ("tags", make_state(vec![("team", string_value("data"))])),
        ]);
        let input = expand_create(&planned).unwrap();
        assert_eq!(input.max_capacity, None);
        assert_eq!(input.enhanced_vpc_routing, None);
        assert_eq!(input.tags.get("team").map(String::as_str), Some("data"));
    }

    #[test]
    fn test_schema_rejects_unknown_parameter_key() {
        let config = make_state(vec![
            ("workgroup_name", string_value("wg")),
            ("namespace_name", string_value("ns")),
            (
                "config_parameter",
                list_value(vec![make_state(vec![
                    ("parameter_key", string_value("enable_case_sensitivity_identifier")),
                    ("parameter_value", string_value("true")),
                ])]),
            ),
        ]);
        let diags = schema().validate(&config);
        assert_eq!(diags.len(), 1);
        assert_eq!(
            diags[0].attribute.as_deref(),
            Some("config_parameter.0.parameter_key")
        );
    }

    #[test]
    fn test_out_of_range_capacity_is_rejected() {
        let huge = i64::from(i32::MAX) + 1;

        let err = plan_updates(&ResourceData::new(state(Some(32), 256), state(Some(huge), 256)))
            .unwrap_err();
        assert!(matches!(err, ProviderError::InvalidConfig(_)));
        assert!(err.to_string().contains("base_capacity"));

        let mut planned = state(None, 0);
        planned.set("namespace_name", string_value("ns"));
        planned.set("port", int_value(huge));
        assert!(matches!(
            expand_create(&planned),
            Err(ProviderError::InvalidConfig(_))
        ));

        let diags = schema().validate(&planned);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].attribute.as_deref(), Some("port"));
    }
}
