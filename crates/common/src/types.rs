//! Core types for the remote management API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Workgroup lifecycle status as reported by the API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkgroupStatus {
    Creating,
    Available,
    Modifying,
    Deleting,
}

impl Default for WorkgroupStatus {
    fn default() -> Self {
        Self::Creating
    }
}

impl std::fmt::Display for WorkgroupStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkgroupStatus::Creating => write!(f, "CREATING"),
            WorkgroupStatus::Available => write!(f, "AVAILABLE"),
            WorkgroupStatus::Modifying => write!(f, "MODIFYING"),
            WorkgroupStatus::Deleting => write!(f, "DELETING"),
        }
    }
}

/// A single workgroup configuration parameter
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConfigParameter {
    pub parameter_key: String,
    pub parameter_value: String,
}

impl ConfigParameter {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            parameter_key: key.into(),
            parameter_value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkInterface {
    pub availability_zone: Option<String>,
    pub network_interface_id: Option<String>,
    pub private_ip_address: Option<String>,
    pub subnet_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VpcEndpoint {
    pub vpc_endpoint_id: Option<String>,
    pub vpc_id: Option<String>,
    #[serde(default)]
    pub network_interfaces: Vec<NetworkInterface>,
}

/// Connection endpoint of a workgroup
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub address: Option<String>,
    pub port: Option<i32>,
    #[serde(default)]
    pub vpc_endpoints: Vec<VpcEndpoint>,
}

/// Serverless workgroup as returned by GetWorkgroup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workgroup {
    pub workgroup_arn: String,
    pub workgroup_id: String,
    pub workgroup_name: String,
    pub namespace_name: String,
    pub status: WorkgroupStatus,
    pub base_capacity: Option<i32>,
    pub max_capacity: Option<i32>,
    #[serde(default)]
    pub config_parameters: Vec<ConfigParameter>,
    pub endpoint: Option<Endpoint>,
    #[serde(default)]
    pub enhanced_vpc_routing: bool,
    #[serde(default)]
    pub publicly_accessible: bool,
    #[serde(default)]
    pub security_group_ids: Vec<String>,
    #[serde(default)]
    pub subnet_ids: Vec<String>,
    pub creation_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateWorkgroupInput {
    pub workgroup_name: String,
    pub namespace_name: String,
    pub base_capacity: Option<i32>,
    pub max_capacity: Option<i32>,
    #[serde(default)]
    pub config_parameters: Vec<ConfigParameter>,
    pub enhanced_vpc_routing: Option<bool>,
    pub port: Option<i32>,
    pub publicly_accessible: Option<bool>,
    #[serde(default)]
    pub security_group_ids: Vec<String>,
    #[serde(default)]
    pub subnet_ids: Vec<String>,
    #[serde(default)]
    pub tags: HashMap<String, String>,
}

/// UpdateWorkgroup request. Every field other than the name is optional;
/// the API accepts only one of them per request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateWorkgroupInput {
    pub workgroup_name: String,
    pub base_capacity: Option<i32>,
    /// `-1` removes the limit.
    pub max_capacity: Option<i32>,
    pub config_parameters: Option<Vec<ConfigParameter>>,
    pub enhanced_vpc_routing: Option<bool>,
    pub port: Option<i32>,
    pub publicly_accessible: Option<bool>,
    pub security_group_ids: Option<Vec<String>>,
    pub subnet_ids: Option<Vec<String>>,
}

impl UpdateWorkgroupInput {
    pub fn new(workgroup_name: impl Into<String>) -> Self {
        Self {
            workgroup_name: workgroup_name.into(),
            ..Default::default()
        }
    }

    /// Number of parameters this request changes
    pub fn parameter_count(&self) -> usize {
        [
            self.base_capacity.is_some(),
            self.max_capacity.is_some(),
            self.config_parameters.is_some(),
            self.enhanced_vpc_routing.is_some(),
            self.port.is_some(),
            self.publicly_accessible.is_some(),
            self.security_group_ids.is_some(),
            self.subnet_ids.is_some(),
        ]
        .iter()
        .filter(|set| **set)
        .count()
    }
}

/// Resource configuration lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourceConfigurationStatus {
    Active,
    CreateInProgress,
    UpdateInProgress,
    DeleteInProgress,
    CreateFailed,
    UpdateFailed,
    DeleteFailed,
}

impl std::fmt::Display for ResourceConfigurationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Active => "ACTIVE",
            Self::CreateInProgress => "CREATE_IN_PROGRESS",
            Self::UpdateInProgress => "UPDATE_IN_PROGRESS",
            Self::DeleteInProgress => "DELETE_IN_PROGRESS",
            Self::CreateFailed => "CREATE_FAILED",
            Self::UpdateFailed => "UPDATE_FAILED",
            Self::DeleteFailed => "DELETE_FAILED",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourceConfigurationType {
    Single,
    Group,
    Child,
    Arn,
}

impl Default for ResourceConfigurationType {
    fn default() -> Self {
        Self::Single
    }
}

impl std::str::FromStr for ResourceConfigurationType {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SINGLE" => Ok(Self::Single),
            "GROUP" => Ok(Self::Group),
            "CHILD" => Ok(Self::Child),
            "ARN" => Ok(Self::Arn),
            other => Err(crate::Error::InvalidConfig(format!(
                "unknown resource configuration type: {}",
                other
            ))),
        }
    }
}

impl std::fmt::Display for ResourceConfigurationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Single => write!(f, "SINGLE"),
            Self::Group => write!(f, "GROUP"),
            Self::Child => write!(f, "CHILD"),
            Self::Arn => write!(f, "ARN"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsResource {
    pub domain_name: String,
    pub ip_address_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpResource {
    pub ip_address: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArnResource {
    pub arn: String,
}

/// Exactly one of the members is expected to be set
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceConfigurationDefinition {
    pub dns_resource: Option<DnsResource>,
    pub ip_resource: Option<IpResource>,
    pub arn_resource: Option<ArnResource>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceConfiguration {
    pub id: String,
    pub arn: String,
    pub name: String,
    pub resource_gateway_identifier: Option<String>,
    #[serde(default)]
    pub port_ranges: Vec<String>,
    pub protocol: Option<String>,
    pub resource_configuration_type: ResourceConfigurationType,
    pub definition: Option<ResourceConfigurationDefinition>,
    #[serde(default)]
    pub allow_association_to_shareable_service_network: bool,
    pub status: ResourceConfigurationStatus,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateResourceConfigurationInput {
    pub name: String,
    pub resource_gateway_identifier: Option<String>,
    #[serde(default)]
    pub port_ranges: Vec<String>,
    pub protocol: Option<String>,
    pub resource_configuration_type: ResourceConfigurationType,
    pub definition: Option<ResourceConfigurationDefinition>,
    pub allow_association_to_shareable_service_network: Option<bool>,
    #[serde(default)]
    pub tags: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateResourceConfigurationInput {
    pub id: String,
    pub port_ranges: Option<Vec<String>>,
    pub definition: Option<ResourceConfigurationDefinition>,
    pub allow_association_to_shareable_service_network: Option<bool>,
}
