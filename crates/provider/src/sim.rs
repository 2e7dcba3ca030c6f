//! Simulated remote API
//!
//! In-memory implementation of [`CloudApi`] with deterministic
//! provisioning latency. A mutation moves the entity into an in-progress
//! status that settles after a fixed number of reads. The simulator
//! enforces the same request rules as the real service (one workgroup
//! parameter per update, capacity bounds, no mutation while an operation
//! is running) and supports fault injection for tests.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::fmt;

use async_trait::async_trait;
use cirrus_common::{
    CloudApi, CreateResourceConfigurationInput, CreateWorkgroupInput, Endpoint, Error,
    NetworkInterface, ResourceConfiguration, ResourceConfigurationStatus,
    ResourceConfigurationType, Result, UpdateResourceConfigurationInput, UpdateWorkgroupInput,
    VpcEndpoint, Workgroup, WorkgroupStatus,
};
use parking_lot::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::config::SimulatorConfig;

const ACCOUNT_ID: &str = "123456789012";
const DEFAULT_PORT: i32 = 5439;
const OPERATION_RUNNING: &str =
    "There is an operation running on the workgroup. Try again later.";

/// API operations, for call accounting and fault injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CreateWorkgroup,
    GetWorkgroup,
    UpdateWorkgroup,
    DeleteWorkgroup,
    CreateResourceConfiguration,
    GetResourceConfiguration,
    UpdateResourceConfiguration,
    DeleteResourceConfiguration,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

enum Settle<S> {
    To(S),
    Remove,
}

struct InFlight<S> {
    remaining: u32,
    then: Settle<S>,
}

struct Tracked<T, S> {
    entity: T,
    in_flight: Option<InFlight<S>>,
}

impl<T: Clone, S> Tracked<T, S> {
    fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }
}

enum Observation<T> {
    Present(T),
    Removed,
}

/// Count one read against the entity's in-flight operation and return
/// what the caller sees.
fn observe<T: Clone, S>(
    tracked: &mut Tracked<T, S>,
    stalled: bool,
    apply: impl FnOnce(&mut T, S),
) -> Observation<T> {
    if let Some(in_flight) = tracked.in_flight.as_mut() {
        if !stalled {
            in_flight.remaining = in_flight.remaining.saturating_sub(1);
        }
        if in_flight.remaining == 0 {
            if let Some(done) = tracked.in_flight.take() {
                match done.then {
                    Settle::To(status) => apply(&mut tracked.entity, status),
                    Settle::Remove => return Observation::Removed,
                }
            }
        }
    }
    Observation::Present(tracked.entity.clone())
}

#[derive(Default)]
struct SimState {
    workgroups: BTreeMap<String, Tracked<Workgroup, WorkgroupStatus>>,
    configurations: BTreeMap<String, Tracked<ResourceConfiguration, ResourceConfigurationStatus>>,
    faults: HashMap<Operation, VecDeque<Error>>,
    stalled: HashSet<String>,
    workgroup_overrides: HashMap<String, WorkgroupStatus>,
    failing_configurations: HashSet<String>,
    calls: Vec<Operation>,
    workgroup_updates: Vec<UpdateWorkgroupInput>,
}

impl SimState {
    fn begin(&mut self, op: Operation) -> Result<()> {
        self.calls.push(op);
        match self.faults.get_mut(&op).and_then(VecDeque::pop_front) {
            Some(err) => {
                debug!("Injecting fault into {}: {}", op, err);
                Err(err)
            }
            None => Ok(()),
        }
    }

    /// Status the workgroup's next operation settles into
    fn settle_target(&mut self, name: &str) -> WorkgroupStatus {
        self.workgroup_overrides
            .remove(name)
            .unwrap_or(WorkgroupStatus::Available)
    }
}

/// In-memory remote API
pub struct SimulatedCloud {
    config: SimulatorConfig,
    region: String,
    state: Mutex<SimState>,
}

impl SimulatedCloud {
    pub fn new(config: SimulatorConfig) -> Self {
        Self {
            config,
            region: "us-west-2".to_string(),
            state: Mutex::new(SimState::default()),
        }
    }

    pub fn with_settle_polls(settle_polls: u32) -> Self {
        Self::new(SimulatorConfig { settle_polls })
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    fn in_flight<S>(&self, then: Settle<S>) -> Option<InFlight<S>> {
        match self.config.settle_polls {
            0 => None,
            remaining => Some(InFlight { remaining, then }),
        }
    }

    fn arn(&self, kind: &str, id: &str) -> String {
        format!("arn:cirrus:serverless:{}:{}:{}/{}", self.region, ACCOUNT_ID, kind, id)
    }

    // Fault injection

    /// Fail the next call of `op` with `err`. Faults queue up in order.
    pub fn inject_fault(&self, op: Operation, err: Error) {
        self.state.lock().faults.entry(op).or_default().push_back(err);
    }

    /// Reject the next `count` calls of `op` with an "operation running" conflict
    pub fn inject_conflicts(&self, op: Operation, count: usize) {
        let mut state = self.state.lock();
        let queue = state.faults.entry(op).or_default();
        for _ in 0..count {
            queue.push_back(Error::Conflict(OPERATION_RUNNING.to_string()));
        }
    }

    /// Keep an entity's in-flight operation from ever settling
    pub fn stall(&self, id: &str) {
        self.state.lock().stalled.insert(id.to_string());
    }

    pub fn unstall(&self, id: &str) {
        self.state.lock().stalled.remove(id);
    }

    /// The workgroup's in-flight operation settles into `status`
    pub fn settle_workgroup_as(&self, name: &str, status: WorkgroupStatus) {
        self.state
            .lock()
            .workgroup_overrides
            .insert(name.to_string(), status);
    }

    /// The configuration's next operation ends in a failure status. Before
    /// the configuration exists it is identified by name, afterwards by id.
    pub fn fail_configuration(&self, id: &str) {
        self.state
            .lock()
            .failing_configurations
            .insert(id.to_string());
    }

    /// Delete a workgroup out-of-band
    pub fn remove_workgroup(&self, name: &str) {
        self.state.lock().workgroups.remove(name);
    }

    // Inspection

    pub fn calls(&self) -> Vec<Operation> {
        self.state.lock().calls.clone()
    }

    pub fn call_count(&self, op: Operation) -> usize {
        self.state.lock().calls.iter().filter(|c| **c == op).count()
    }

    /// Accepted UpdateWorkgroup requests, in order
    pub fn workgroup_updates(&self) -> Vec<UpdateWorkgroupInput> {
        self.state.lock().workgroup_updates.clone()
    }

    /// Current workgroup without counting a read
    pub fn peek_workgroup(&self, name: &str) -> Option<Workgroup> {
        self.state
            .lock()
            .workgroups
            .get(name)
            .map(|t| t.entity.clone())
    }

    pub fn peek_resource_configuration(&self, id: &str) -> Option<ResourceConfiguration> {
        self.state
            .lock()
            .configurations
            .get(id)
            .map(|t| t.entity.clone())
    }

    fn endpoint(&self, name: &str, port: i32, subnet_ids: &[String]) -> Endpoint {
        let network_interfaces = subnet_ids
            .iter()
            .enumerate()
            .map(|(i, subnet)| NetworkInterface {
                availability_zone: Some(format!("{}{}", self.region, (b'a' + (i % 3) as u8) as char)),
                network_interface_id: Some(format!("eni-{}", &Uuid::new_v4().simple().to_string()[..17])),
                private_ip_address: Some(format!("10.0.{}.{}", i, 10 + i)),
                subnet_id: Some(subnet.clone()),
            })
            .collect::<Vec<_>>();

        Endpoint {
            address: Some(format!(
                "{}.{}.{}.serverless.cirrus.example",
                name, ACCOUNT_ID, self.region
            )),
            port: Some(port),
            vpc_endpoints: if network_interfaces.is_empty() {
                Vec::new()
            } else {
                vec![VpcEndpoint {
                    vpc_endpoint_id: Some(format!("vpce-{}", &Uuid::new_v4().simple().to_string()[..17])),
                    vpc_id: Some("vpc-0a1b2c3d".to_string()),
                    network_interfaces,
                }]
            },
        }
    }
}

fn validate_capacity(base: Option<i32>, max: Option<i32>) -> Result<()> {
    if let (Some(base), Some(max)) = (base, max) {
        if base > max {
            return Err(Error::Validation(format!(
                "base capacity {} cannot be greater than max capacity {}",
                base, max
            )));
        }
    }
    Ok(())
}

fn validate_port_range(range: &str) -> Result<()> {
    let valid_port = |p: &str| p.parse::<u16>().map(|n| n > 0).unwrap_or(false);
    let ok = match range.split_once('-') {
        Some((lo, hi)) => valid_port(lo) && valid_port(hi) && lo.parse::<u16>().ok() <= hi.parse::<u16>().ok(),
        None => valid_port(range),
    };
    if ok {
        Ok(())
    } else {
        Err(Error::Validation(format!("invalid port range: {}", range)))
    }
}

#[async_trait]
impl CloudApi for SimulatedCloud {
    async fn create_workgroup(&self, input: CreateWorkgroupInput) -> Result<Workgroup> {
        let mut state = self.state.lock();
        state.begin(Operation::CreateWorkgroup)?;

        if input.workgroup_name.is_empty() || input.namespace_name.is_empty() {
            return Err(Error::Validation(
                "workgroup name and namespace name are required".to_string(),
            ));
        }
        if state.workgroups.contains_key(&input.workgroup_name) {
            return Err(Error::AlreadyExists {
                kind: "workgroup".to_string(),
                id: input.workgroup_name,
            });
        }
        validate_capacity(input.base_capacity, input.max_capacity)?;

        let id = Uuid::new_v4().to_string();
        let port = input.port.unwrap_or(DEFAULT_PORT);
        let mut config_parameters = input.config_parameters;
        config_parameters.sort();

        let workgroup = Workgroup {
            workgroup_arn: self.arn("workgroup", &id),
            workgroup_id: id,
            workgroup_name: input.workgroup_name.clone(),
            namespace_name: input.namespace_name,
            status: WorkgroupStatus::Creating,
            base_capacity: Some(input.base_capacity.unwrap_or(128)),
            max_capacity: input.max_capacity,
            config_parameters,
            endpoint: Some(self.endpoint(&input.workgroup_name, port, &input.subnet_ids)),
            enhanced_vpc_routing: input.enhanced_vpc_routing.unwrap_or(false),
            publicly_accessible: input.publicly_accessible.unwrap_or(false),
            security_group_ids: input.security_group_ids,
            subnet_ids: input.subnet_ids,
            creation_date: chrono::Utc::now(),
        };

        let target = state.settle_target(&workgroup.workgroup_name);
        let mut tracked = Tracked {
            entity: workgroup,
            in_flight: self.in_flight(Settle::To(target)),
        };
        if tracked.in_flight.is_none() {
            tracked.entity.status = target;
        }

        let snapshot = tracked.entity.clone();
        state
            .workgroups
            .insert(snapshot.workgroup_name.clone(), tracked);
        debug!("Simulated workgroup {} created", snapshot.workgroup_name);
        Ok(snapshot)
    }

    async fn get_workgroup(&self, name: &str) -> Result<Workgroup> {
        let mut state = self.state.lock();
        state.begin(Operation::GetWorkgroup)?;

        let stalled = state.stalled.contains(name);
        let tracked = state
            .workgroups
            .get_mut(name)
            .ok_or_else(|| Error::not_found("workgroup", name))?;

        match observe(tracked, stalled, |wg, status| wg.status = status) {
            Observation::Present(wg) => Ok(wg),
            Observation::Removed => {
                state.workgroups.remove(name);
                debug!("Simulated workgroup {} deleted", name);
                Err(Error::not_found("workgroup", name))
            }
        }
    }

    async fn update_workgroup(&self, input: UpdateWorkgroupInput) -> Result<Workgroup> {
        let mut state = self.state.lock();
        state.begin(Operation::UpdateWorkgroup)?;

        let name = input.workgroup_name.clone();
        match input.parameter_count() {
            0 => return Err(Error::Validation("no workgroup parameters to update".to_string())),
            1 => {}
            _ => {
                return Err(Error::Validation(
                    "You can't update multiple workgroup parameters in one request.".to_string(),
                ))
            }
        }

        let current = match state.workgroups.get(&name) {
            Some(tracked) if tracked.is_busy() || tracked.entity.status != WorkgroupStatus::Available => {
                return Err(Error::Conflict(OPERATION_RUNNING.to_string()))
            }
            Some(tracked) => &tracked.entity,
            None => return Err(Error::not_found("workgroup", &name)),
        };
        if let Some(base) = input.base_capacity {
            validate_capacity(Some(base), current.max_capacity)?;
        }
        if let Some(max) = input.max_capacity.filter(|max| *max != -1) {
            validate_capacity(current.base_capacity, Some(max))?;
        }

        // Accepted from here on
        let target = state.settle_target(&name);
        let in_flight = self.in_flight(Settle::To(target));
        let tracked = state
            .workgroups
            .get_mut(&name)
            .ok_or_else(|| Error::not_found("workgroup", &name))?;

        let wg = &mut tracked.entity;
        if let Some(base) = input.base_capacity {
            wg.base_capacity = Some(base);
        }
        match input.max_capacity {
            Some(-1) => wg.max_capacity = None,
            Some(max) => wg.max_capacity = Some(max),
            None => {}
        }
        if let Some(mut params) = input.config_parameters.clone() {
            params.sort();
            wg.config_parameters = params;
        }
        if let Some(v) = input.enhanced_vpc_routing {
            wg.enhanced_vpc_routing = v;
        }
        if let Some(v) = input.publicly_accessible {
            wg.publicly_accessible = v;
        }
        if let Some(v) = input.security_group_ids.clone() {
            wg.security_group_ids = v;
        }
        if input.subnet_ids.is_some() || input.port.is_some() {
            if let Some(v) = input.subnet_ids.clone() {
                wg.subnet_ids = v;
            }
            let port = input
                .port
                .or_else(|| wg.endpoint.as_ref().and_then(|e| e.port))
                .unwrap_or(DEFAULT_PORT);
            wg.endpoint = Some(self.endpoint(&wg.workgroup_name, port, &wg.subnet_ids));
        }

        match in_flight {
            Some(in_flight) => {
                wg.status = WorkgroupStatus::Modifying;
                tracked.in_flight = Some(in_flight);
            }
            None => wg.status = target,
        }

        let snapshot = tracked.entity.clone();
        state.workgroup_updates.push(input);
        Ok(snapshot)
    }

    async fn delete_workgroup(&self, name: &str) -> Result<Workgroup> {
        let mut state = self.state.lock();
        state.begin(Operation::DeleteWorkgroup)?;

        let in_flight = self.in_flight(Settle::Remove);
        let tracked = state
            .workgroups
            .get_mut(name)
            .ok_or_else(|| Error::not_found("workgroup", name))?;
        if tracked.is_busy() || tracked.entity.status != WorkgroupStatus::Available {
            return Err(Error::Conflict(OPERATION_RUNNING.to_string()));
        }

        tracked.entity.status = WorkgroupStatus::Deleting;
        let snapshot = tracked.entity.clone();
        match in_flight {
            Some(in_flight) => tracked.in_flight = Some(in_flight),
            None => {
                state.workgroups.remove(name);
            }
        }
        Ok(snapshot)
    }

    async fn create_resource_configuration(
        &self,
        input: CreateResourceConfigurationInput,
    ) -> Result<ResourceConfiguration> {
        let mut state = self.state.lock();
        state.begin(Operation::CreateResourceConfiguration)?;

        if input.name.is_empty() {
            return Err(Error::Validation("name is required".to_string()));
        }
        if state.configurations.values().any(|t| t.entity.name == input.name) {
            return Err(Error::AlreadyExists {
                kind: "resource configuration".to_string(),
                id: input.name,
            });
        }
        if input.resource_configuration_type != ResourceConfigurationType::Group
            && input.definition.is_none()
        {
            return Err(Error::Validation(format!(
                "resource configuration definition is required for type {}",
                input.resource_configuration_type
            )));
        }
        for range in &input.port_ranges {
            validate_port_range(range)?;
        }

        let id = format!("rcfg-{}", &Uuid::new_v4().simple().to_string()[..17]);
        let failing = state.failing_configurations.remove(&input.name);
        let configuration = ResourceConfiguration {
            arn: self.arn("resourceconfiguration", &id),
            id: id.clone(),
            name: input.name,
            resource_gateway_identifier: input.resource_gateway_identifier,
            port_ranges: input.port_ranges,
            protocol: Some(input.protocol.unwrap_or_else(|| "TCP".to_string())),
            resource_configuration_type: input.resource_configuration_type,
            definition: input.definition,
            allow_association_to_shareable_service_network: input
                .allow_association_to_shareable_service_network
                .unwrap_or(true),
            status: ResourceConfigurationStatus::CreateInProgress,
            failure_reason: None,
            created_at: chrono::Utc::now(),
        };

        let then = Settle::To(if failing {
            ResourceConfigurationStatus::CreateFailed
        } else {
            ResourceConfigurationStatus::Active
        });
        let mut tracked = Tracked {
            entity: configuration,
            in_flight: self.in_flight(then),
        };
        if tracked.in_flight.is_none() {
            tracked.entity.status = ResourceConfigurationStatus::Active;
        }

        let snapshot = tracked.entity.clone();
        state.configurations.insert(id, tracked);
        Ok(snapshot)
    }

    async fn get_resource_configuration(&self, id: &str) -> Result<ResourceConfiguration> {
        let mut state = self.state.lock();
        state.begin(Operation::GetResourceConfiguration)?;

        let stalled = state.stalled.contains(id);
        let tracked = state
            .configurations
            .get_mut(id)
            .ok_or_else(|| Error::not_found("resource configuration", id))?;

        let observation = observe(tracked, stalled, |rc, status| {
            if matches!(
                status,
                ResourceConfigurationStatus::CreateFailed
                    | ResourceConfigurationStatus::UpdateFailed
                    | ResourceConfigurationStatus::DeleteFailed
            ) {
                rc.failure_reason = Some(format!("simulated failure ({})", status));
            }
            rc.status = status;
        });
        match observation {
            Observation::Present(rc) => Ok(rc),
            Observation::Removed => {
                state.configurations.remove(id);
                Err(Error::not_found("resource configuration", id))
            }
        }
    }

    async fn update_resource_configuration(
        &self,
        input: UpdateResourceConfigurationInput,
    ) -> Result<ResourceConfiguration> {
        let mut state = self.state.lock();
        state.begin(Operation::UpdateResourceConfiguration)?;

        if let Some(ranges) = &input.port_ranges {
            for range in ranges {
                validate_port_range(range)?;
            }
        }

        let failing = state.failing_configurations.remove(&input.id);
        let then = Settle::To(if failing {
            ResourceConfigurationStatus::UpdateFailed
        } else {
            ResourceConfigurationStatus::Active
        });
        let in_flight = self.in_flight(then);

        let tracked = state
            .configurations
            .get_mut(&input.id)
            .ok_or_else(|| Error::not_found("resource configuration", &input.id))?;
        if tracked.is_busy() || tracked.entity.status != ResourceConfigurationStatus::Active {
            return Err(Error::Conflict(format!(
                "resource configuration {} is {}",
                input.id, tracked.entity.status
            )));
        }

        let rc = &mut tracked.entity;
        if let Some(ranges) = input.port_ranges {
            rc.port_ranges = ranges;
        }
        if let Some(definition) = input.definition {
            rc.definition = Some(definition);
        }
        if let Some(allow) = input.allow_association_to_shareable_service_network {
            rc.allow_association_to_shareable_service_network = allow;
        }

        match in_flight {
            Some(in_flight) => {
                rc.status = ResourceConfigurationStatus::UpdateInProgress;
                tracked.in_flight = Some(in_flight);
            }
            None if failing => rc.status = ResourceConfigurationStatus::UpdateFailed,
            None => {}
        }
        Ok(tracked.entity.clone())
    }

    async fn delete_resource_configuration(&self, id: &str) -> Result<()> {
        let mut state = self.state.lock();
        state.begin(Operation::DeleteResourceConfiguration)?;

        let failing = state.failing_configurations.remove(id);
        let then = if failing {
            Settle::To(ResourceConfigurationStatus::DeleteFailed)
        } else {
            Settle::Remove
        };
        let in_flight = self.in_flight(then);

        let tracked = state
            .configurations
            .get_mut(id)
            .ok_or_else(|| Error::not_found("resource configuration", id))?;
        if tracked.is_busy() {
            return Err(Error::Conflict(format!(
                "resource configuration {} is {}",
                id, tracked.entity.status
            )));
        }

        tracked.entity.status = ResourceConfigurationStatus::DeleteInProgress;
        match in_flight {
            Some(in_flight) => tracked.in_flight = Some(in_flight),
            None if failing => tracked.entity.status = ResourceConfigurationStatus::DeleteFailed,
            None => {
                state.configurations.remove(id);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_input(name: &str) -> CreateWorkgroupInput {
        CreateWorkgroupInput {
            workgroup_name: name.to_string(),
            namespace_name: "analytics".to_string(),
            base_capacity: Some(32),
            max_capacity: Some(256),
            subnet_ids: vec!["subnet-a".to_string(), "subnet-b".to_string()],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_workgroup_settles_after_polls() {
        let cloud = SimulatedCloud::with_settle_polls(3);
        let created = cloud.create_workgroup(create_input("wg")).await.unwrap();
        assert_eq!(created.status, WorkgroupStatus::Creating);

        let statuses: Vec<_> = [
            cloud.get_workgroup("wg").await.unwrap().status,
            cloud.get_workgroup("wg").await.unwrap().status,
            cloud.get_workgroup("wg").await.unwrap().status,
        ]
        .into();
        assert_eq!(
            statuses,
            vec![
                WorkgroupStatus::Creating,
                WorkgroupStatus::Creating,
                WorkgroupStatus::Available
            ]
        );

        let endpoint = cloud.peek_workgroup("wg").unwrap().endpoint.unwrap();
        assert_eq!(endpoint.port, Some(DEFAULT_PORT));
        assert_eq!(endpoint.vpc_endpoints[0].network_interfaces.len(), 2);
    }

    #[tokio::test]
    async fn test_update_rules() {
        let cloud = SimulatedCloud::with_settle_polls(0);
        cloud.create_workgroup(create_input("wg")).await.unwrap();

        let mut both = UpdateWorkgroupInput::new("wg");
        both.base_capacity = Some(64);
        both.max_capacity = Some(512);
        assert!(matches!(
            cloud.update_workgroup(both).await,
            Err(Error::Validation(_))
        ));

        let mut base = UpdateWorkgroupInput::new("wg");
        base.base_capacity = Some(512);
        assert!(matches!(
            cloud.update_workgroup(base).await,
            Err(Error::Validation(_))
        ));

        let mut unlimited = UpdateWorkgroupInput::new("wg");
        unlimited.max_capacity = Some(-1);
        let wg = cloud.update_workgroup(unlimited).await.unwrap();
        assert_eq!(wg.max_capacity, None);
        assert_eq!(cloud.workgroup_updates().len(), 1);
    }

    #[tokio::test]
    async fn test_mutation_rejected_while_busy() {
        let cloud = SimulatedCloud::with_settle_polls(2);
        cloud.create_workgroup(create_input("wg")).await.unwrap();

        let err = cloud.delete_workgroup("wg").await.unwrap_err();
        assert!(err.is_conflict_containing("operation running"));

        cloud.get_workgroup("wg").await.unwrap();
        cloud.get_workgroup("wg").await.unwrap();
        let deleting = cloud.delete_workgroup("wg").await.unwrap();
        assert_eq!(deleting.status, WorkgroupStatus::Deleting);

        cloud.get_workgroup("wg").await.unwrap();
        assert!(cloud.get_workgroup("wg").await.unwrap_err().is_not_found());
        assert!(cloud.peek_workgroup("wg").is_none());
    }

    #[tokio::test]
    async fn test_rejected_update_keeps_settle_override() {
        let cloud = SimulatedCloud::with_settle_polls(1);
        cloud.create_workgroup(create_input("wg")).await.unwrap();
        cloud.settle_workgroup_as("wg", WorkgroupStatus::Deleting);
        let base = |v| UpdateWorkgroupInput {
            base_capacity: Some(v),
            ..UpdateWorkgroupInput::new("wg")
        };

        let busy = cloud.update_workgroup(base(64)).await.unwrap_err();
        assert!(busy.is_conflict_containing("operation running"));
        assert_eq!(
            cloud.get_workgroup("wg").await.unwrap().status,
            WorkgroupStatus::Available
        );

        let invalid = cloud.update_workgroup(base(512)).await.unwrap_err();
        assert!(invalid.is_validation_containing("cannot be greater than max capacity"));
        assert_eq!(cloud.peek_workgroup("wg").unwrap().base_capacity, Some(32));

        let accepted = cloud.update_workgroup(base(64)).await.unwrap();
        assert_eq!(accepted.status, WorkgroupStatus::Modifying);
        assert_eq!(
            cloud.get_workgroup("wg").await.unwrap().status,
            WorkgroupStatus::Deleting
        );
        assert_eq!(cloud.workgroup_updates().len(), 1);
    }

    #[tokio::test]
    async fn test_injected_faults_and_stall() {
        let cloud = SimulatedCloud::with_settle_polls(1);
        cloud.inject_fault(Operation::GetWorkgroup, Error::Throttling("Rate exceeded".into()));
        cloud.create_workgroup(create_input("wg")).await.unwrap();
        cloud.stall("wg");

        assert!(matches!(
            cloud.get_workgroup("wg").await,
            Err(Error::Throttling(_))
        ));
        for _ in 0..5 {
            assert_eq!(
                cloud.get_workgroup("wg").await.unwrap().status,
                WorkgroupStatus::Creating
            );
        }

        cloud.unstall("wg");
        assert_eq!(
            cloud.get_workgroup("wg").await.unwrap().status,
            WorkgroupStatus::Available
        );
        assert_eq!(cloud.call_count(Operation::GetWorkgroup), 7);
    }

    #[tokio::test]
    async fn test_configuration_failure() {
        let cloud = SimulatedCloud::with_settle_polls(1);
        let rc = cloud
            .create_resource_configuration(CreateResourceConfigurationInput {
                name: "web".to_string(),
                port_ranges: vec!["80".to_string(), "8000-8080".to_string()],
                resource_configuration_type: ResourceConfigurationType::Group,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(
            cloud.get_resource_configuration(&rc.id).await.unwrap().status,
            ResourceConfigurationStatus::Active
        );

        cloud.fail_configuration(&rc.id);
        cloud
            .update_resource_configuration(UpdateResourceConfigurationInput {
                id: rc.id.clone(),
                port_ranges: Some(vec!["443".to_string()]),
                ..Default::default()
            })
            .await
            .unwrap();
        let failed = cloud.get_resource_configuration(&rc.id).await.unwrap();
        assert_eq!(failed.status, ResourceConfigurationStatus::UpdateFailed);
        assert!(failed.failure_reason.is_some());
    }

    #[test]
    fn test_port_ranges() {
        assert!(validate_port_range("80").is_ok());
        assert!(validate_port_range("1-65535").is_ok());
        assert!(validate_port_range("0").is_err());
        assert!(validate_port_range("90-80").is_err());
        assert!(validate_port_range("http").is_err());
    }
}
