//! Agent runtimes and runtime endpoints

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{segment, status_enum, ApiError, Client};

status_enum! {
    /// Status of an agent runtime or one of its endpoints
    RuntimeStatus {
        Creating => "CREATING",
        CreateFailed => "CREATE_FAILED",
        Updating => "UPDATING",
        UpdateFailed => "UPDATE_FAILED",
        Ready => "READY",
        Deleting => "DELETING",
    }
}

/// What the runtime executes: a container image or a code bundle in S3
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AgentRuntimeArtifact {
    ContainerConfiguration(ContainerConfiguration),
    CodeConfiguration(CodeConfiguration),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerConfiguration {
    pub container_uri: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeConfiguration {
    pub code: Code,
    pub entry_point: Vec<String>,
    pub runtime: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Code {
    S3(S3Location),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct S3Location {
    pub bucket: String,
    pub prefix: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkConfiguration {
    pub network_mode: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_mode_config: Option<VpcConfig>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VpcConfig {
    pub security_groups: Vec<String>,
    pub subnets: Vec<String>,
}

/// Inbound authorization; shared with gateways
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AuthorizerConfiguration {
    #[serde(rename = "customJWTAuthorizer")]
    CustomJwtAuthorizer(CustomJwtAuthorizerConfiguration),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomJwtAuthorizerConfiguration {
    pub discovery_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_audience: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_clients: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolConfiguration {
    pub server_protocol: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RequestHeaderConfiguration {
    RequestHeaderAllowlist(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadIdentityDetails {
    pub workload_identity_arn: String,
}

/// Mutable part of a runtime, sent on both create and update
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentRuntimeSpec {
    pub agent_runtime_artifact: AgentRuntimeArtifact,
    pub role_arn: String,
    pub network_configuration: NetworkConfiguration,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorizer_configuration: Option<AuthorizerConfiguration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol_configuration: Option<ProtocolConfiguration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment_variables: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_header_configuration: Option<RequestHeaderConfiguration>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAgentRuntimeRequest {
    pub agent_runtime_name: String,
    #[serde(flatten)]
    pub spec: AgentRuntimeSpec,
    pub client_token: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAgentRuntimeRequest {
    #[serde(flatten)]
    pub spec: AgentRuntimeSpec,
    pub client_token: String,
}

/// Create and update both answer with the identity and the new version
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AgentRuntimeSummary {
    pub agent_runtime_arn: String,
    pub agent_runtime_id: String,
    pub agent_runtime_version: String,
    pub status: RuntimeStatus,
    pub workload_identity_details: Option<WorkloadIdentityDetails>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentRuntime {
    pub agent_runtime_arn: String,
    pub agent_runtime_id: String,
    pub agent_runtime_name: String,
    pub agent_runtime_version: String,
    pub agent_runtime_artifact: Option<AgentRuntimeArtifact>,
    #[serde(default)]
    pub role_arn: String,
    #[serde(default)]
    pub network_configuration: Option<NetworkConfiguration>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub authorizer_configuration: Option<AuthorizerConfiguration>,
    #[serde(default)]
    pub protocol_configuration: Option<ProtocolConfiguration>,
    #[serde(default)]
    pub environment_variables: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub request_header_configuration: Option<RequestHeaderConfiguration>,
    #[serde(default)]
    pub workload_identity_details: Option<WorkloadIdentityDetails>,
    #[serde(default)]
    pub status: RuntimeStatus,
    #[serde(default)]
    pub failure_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAgentRuntimeEndpointRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_runtime_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub client_token: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAgentRuntimeEndpointRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_runtime_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub client_token: String,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AgentRuntimeEndpoint {
    pub name: String,
    pub id: Option<String>,
    pub agent_runtime_endpoint_arn: String,
    pub agent_runtime_arn: String,
    pub live_version: Option<String>,
    pub target_version: Option<String>,
    pub description: Option<String>,
    pub status: RuntimeStatus,
    pub failure_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeleteResponse {
    pub status: Option<String>,
}

pub struct RuntimesApi<'a> {
    client: &'a Client,
}

impl<'a> RuntimesApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    pub async fn create(
        &self,
        request: &CreateAgentRuntimeRequest,
    ) -> Result<AgentRuntimeSummary, ApiError> {
        self.client.put("/runtimes/", request).await
    }

    pub async fn get(&self, runtime_id: &str) -> Result<AgentRuntime, ApiError> {
        self.client
            .get(&format!("/runtimes/{}/", segment(runtime_id)))
            .await
    }

    pub async fn update(
        &self,
        runtime_id: &str,
        request: &UpdateAgentRuntimeRequest,
    ) -> Result<AgentRuntimeSummary, ApiError> {
        self.client
            .put(&format!("/runtimes/{}/", segment(runtime_id)), request)
            .await
    }

    pub async fn delete(&self, runtime_id: &str) -> Result<DeleteResponse, ApiError> {
        self.client
            .delete(&format!("/runtimes/{}/", segment(runtime_id)))
            .await
    }

    pub async fn create_endpoint(
        &self,
        runtime_id: &str,
        request: &CreateAgentRuntimeEndpointRequest,
    ) -> Result<AgentRuntimeEndpoint, ApiError> {
        self.client
            .put(
                &format!("/runtimes/{}/runtime-endpoints/", segment(runtime_id)),
                request,
            )
            .await
    }

    pub async fn get_endpoint(
        &self,
        runtime_id: &str,
        name: &str,
    ) -> Result<AgentRuntimeEndpoint, ApiError> {
        self.client
            .get(&endpoint_path(runtime_id, name))
            .await
    }

    pub async fn update_endpoint(
        &self,
        runtime_id: &str,
        name: &str,
        request: &UpdateAgentRuntimeEndpointRequest,
    ) -> Result<AgentRuntimeEndpoint, ApiError> {
        self.client
            .put(&endpoint_path(runtime_id, name), request)
            .await
    }

    pub async fn delete_endpoint(
        &self,
        runtime_id: &str,
        name: &str,
    ) -> Result<DeleteResponse, ApiError> {
        self.client.delete(&endpoint_path(runtime_id, name)).await
    }
}

pub fn endpoint_path(runtime_id: &str, name: &str) -> String {
    format!(
        "/runtimes/{}/runtime-endpoints/{}/",
        segment(runtime_id),
        segment(name)
    )
}
