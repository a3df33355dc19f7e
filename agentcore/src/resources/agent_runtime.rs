//! Agent runtime resource

use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::import::import_state_passthrough_id;
use tfplug::plan_modifier::{RequiresReplaceIfChanged, UseStateForUnknown};
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse,
    ImportResourceStateRequest, ImportResourceStateResponse, ModifyPlanRequest,
    ModifyPlanResponse, ReadResourceRequest, ReadResourceResponse, Resource,
    ResourceSchemaRequest, ResourceSchemaResponse, ResourceWithConfigure,
    ResourceWithImportState, ResourceWithModifyPlan, UpdateResourceRequest,
    UpdateResourceResponse, ValidateResourceConfigRequest, ValidateResourceConfigResponse,
};
use tfplug::schema::{
    AttributeBuilder, AttributeType, NestedBlock, NestedBlockBuilder, Schema, SchemaBuilder,
};
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use tfplug::validator::{StringOneOfValidator, StringPatternValidator};

use super::{
    client_token, missing_identity, not_configured, operation_error, removed_from_state,
    wait_error,
};
use crate::api::runtime::{
    AgentRuntime, AgentRuntimeArtifact, AgentRuntimeSpec, AuthorizerConfiguration, Code,
    CodeConfiguration, ContainerConfiguration, CreateAgentRuntimeRequest,
    CustomJwtAuthorizerConfiguration, NetworkConfiguration, ProtocolConfiguration,
    RequestHeaderConfiguration, RuntimeStatus, S3Location, UpdateAgentRuntimeRequest, VpcConfig,
};
use crate::api::{ApiError, Client};
use crate::flex::{
    exactly_one_block, first_block, get_non_empty, get_string, get_string_map, get_strings,
    has_changes, require_string, resolve_unknowns, variant, ObjectBuilder,
};
use crate::provider_data::AgentCoreProviderData;
use crate::retry::{
    retry_when_message_contains, ECR_PROPAGATION_MESSAGES, IAM_PROPAGATION_MESSAGES,
    PROPAGATION_TIMEOUT,
};
use crate::timeouts::{self, Timeouts};
use crate::waiter::{PollOutcome, StateChangeConf};

const KIND: &str = "Agent Runtime";
const ARTIFACT_VARIANTS: &[&str] = &["container_configuration", "code_configuration"];
const COMPUTED: &[&str] = &[
    "agent_runtime_arn",
    "agent_runtime_id",
    "agent_runtime_version",
    "workload_identity_arn",
    "timeouts",
];

#[derive(Default)]
pub struct AgentRuntimeResource {
    provider_data: Option<AgentCoreProviderData>,
}

impl AgentRuntimeResource {
    pub fn new() -> Self {
        Self::default()
    }
}

fn string_set() -> AttributeType {
    AttributeType::Set(Box::new(AttributeType::String))
}

fn resource_schema() -> Schema {
    SchemaBuilder::new()
        .version(0)
        .description("Manages a Bedrock AgentCore agent runtime")
        .attribute(
            AttributeBuilder::new("agent_runtime_name", AttributeType::String)
                .description("Name of the agent runtime")
                .required()
                .validator(StringPatternValidator::create(
                    "^[a-zA-Z][a-zA-Z0-9_]{0,47}$",
                    "a letter followed by up to 47 letters, digits or underscores",
                ))
                .plan_modifier(RequiresReplaceIfChanged::create())
                .build(),
        )
        .attribute(
            AttributeBuilder::new("role_arn", AttributeType::String)
                .description("IAM role the runtime assumes")
                .required()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("description", AttributeType::String)
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new(
                "environment_variables",
                AttributeType::Map(Box::new(AttributeType::String)),
            )
            .description("Environment variables passed to the runtime")
            .optional()
            .build(),
        )
        .attribute(
            AttributeBuilder::new("agent_runtime_arn", AttributeType::String)
                .computed()
                .plan_modifier(UseStateForUnknown::create())
                .build(),
        )
        .attribute(
            AttributeBuilder::new("agent_runtime_id", AttributeType::String)
                .computed()
                .plan_modifier(UseStateForUnknown::create())
                .build(),
        )
        .attribute(
            AttributeBuilder::new("agent_runtime_version", AttributeType::String)
                .description("Version created by the most recent create or update")
                .computed()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("workload_identity_arn", AttributeType::String)
                .computed()
                .plan_modifier(UseStateForUnknown::create())
                .build(),
        )
        .block(artifact_block())
        .block(
            NestedBlockBuilder::new("network_configuration")
                .min_items(1)
                .max_items(1)
                .attribute(
                    AttributeBuilder::new("network_mode", AttributeType::String)
                        .required()
                        .validator(StringOneOfValidator::create(&["PUBLIC", "VPC"]))
                        .build(),
                )
                .block(vpc_block("network_mode_config"))
                .build(),
        )
        .block(authorizer_block())
        .block(
            NestedBlockBuilder::new("protocol_configuration")
                .max_items(1)
                .attribute(
                    AttributeBuilder::new("server_protocol", AttributeType::String)
                        .required()
                        .validator(StringOneOfValidator::create(&["MCP", "HTTP", "A2A"]))
                        .build(),
                )
                .build(),
        )
        .block(
            NestedBlockBuilder::new("request_header_configuration")
                .max_items(1)
                .attribute(
                    AttributeBuilder::new("request_header_allowlist", string_set())
                        .description("Request headers forwarded to the runtime")
                        .required()
                        .build(),
                )
                .build(),
        )
        .block(timeouts::block(true))
        .build()
}

fn artifact_block() -> NestedBlock {
    NestedBlockBuilder::new("agent_runtime_artifact")
        .description("Container image or code bundle the runtime executes")
        .min_items(1)
        .max_items(1)
        .block(
            NestedBlockBuilder::new("container_configuration")
                .max_items(1)
                .attribute(
                    AttributeBuilder::new("container_uri", AttributeType::String)
                        .required()
                        .build(),
                )
                .build(),
        )
        .block(
            NestedBlockBuilder::new("code_configuration")
                .max_items(1)
                .attribute(
                    AttributeBuilder::new(
                        "entry_point",
                        AttributeType::List(Box::new(AttributeType::String)),
                    )
                    .required()
                    .build(),
                )
                .attribute(
                    AttributeBuilder::new("runtime", AttributeType::String)
                        .required()
                        .build(),
                )
                .block(
                    NestedBlockBuilder::new("code")
                        .min_items(1)
                        .max_items(1)
                        .block(
                            NestedBlockBuilder::new("s3")
                                .min_items(1)
                                .max_items(1)
                                .attribute(
                                    AttributeBuilder::new("bucket", AttributeType::String)
                                        .required()
                                        .build(),
                                )
                                .attribute(
                                    AttributeBuilder::new("prefix", AttributeType::String)
                                        .required()
                                        .build(),
                                )
                                .attribute(
                                    AttributeBuilder::new("version_id", AttributeType::String)
                                        .optional()
                                        .build(),
                                )
                                .build(),
                        )
                        .build(),
                )
                .build(),
        )
        .build()
}

/// Security groups and subnets of a VPC-attached resource
pub(crate) fn vpc_block(name: &str) -> NestedBlock {
    NestedBlockBuilder::new(name)
        .max_items(1)
        .attribute(
            AttributeBuilder::new("security_groups", string_set())
                .required()
                .build(),
        )
        .attribute(AttributeBuilder::new("subnets", string_set()).required().build())
        .build()
}

pub(crate) fn authorizer_block() -> NestedBlock {
    NestedBlockBuilder::new("authorizer_configuration")
        .max_items(1)
        .block(
            NestedBlockBuilder::new("custom_jwt_authorizer")
                .min_items(1)
                .max_items(1)
                .attribute(
                    AttributeBuilder::new("discovery_url", AttributeType::String)
                        .required()
                        .build(),
                )
                .attribute(
                    AttributeBuilder::new("allowed_audience", string_set())
                        .optional()
                        .build(),
                )
                .attribute(
                    AttributeBuilder::new("allowed_clients", string_set())
                        .optional()
                        .build(),
                )
                .build(),
        )
        .build()
}

pub(crate) fn expand_vpc(value: &Dynamic) -> VpcConfig {
    VpcConfig {
        security_groups: get_strings(value, "security_groups").unwrap_or_default(),
        subnets: get_strings(value, "subnets").unwrap_or_default(),
    }
}

pub(crate) fn flatten_vpc(vpc: &VpcConfig) -> Dynamic {
    ObjectBuilder::new()
        .strings("security_groups", Some(vpc.security_groups.clone()))
        .strings("subnets", Some(vpc.subnets.clone()))
        .build()
}

pub(crate) fn expand_authorizer(value: &Dynamic) -> Option<AuthorizerConfiguration> {
    let jwt = first_block(first_block(value, "authorizer_configuration")?, "custom_jwt_authorizer")?;
    Some(AuthorizerConfiguration::CustomJwtAuthorizer(
        CustomJwtAuthorizerConfiguration {
            discovery_url: get_string(jwt, "discovery_url").unwrap_or_default(),
            allowed_audience: get_strings(jwt, "allowed_audience"),
            allowed_clients: get_strings(jwt, "allowed_clients"),
        },
    ))
}

pub(crate) fn flatten_authorizer(authorizer: &AuthorizerConfiguration) -> Dynamic {
    let AuthorizerConfiguration::CustomJwtAuthorizer(jwt) = authorizer;
    ObjectBuilder::new()
        .block(
            "custom_jwt_authorizer",
            Some(
                ObjectBuilder::new()
                    .set("discovery_url", jwt.discovery_url.clone())
                    .strings("allowed_audience", jwt.allowed_audience.clone())
                    .strings("allowed_clients", jwt.allowed_clients.clone())
                    .build(),
            ),
        )
        .build()
}

fn expand_artifact(value: &Dynamic) -> Result<AgentRuntimeArtifact, String> {
    let artifact = first_block(value, "agent_runtime_artifact")
        .ok_or_else(|| "agent_runtime_artifact must be set".to_string())?;

    if let Some(container) = first_block(artifact, "container_configuration") {
        return Ok(AgentRuntimeArtifact::ContainerConfiguration(
            ContainerConfiguration {
                container_uri: require_string(container, "container_uri")?,
            },
        ));
    }

    if let Some(code) = first_block(artifact, "code_configuration") {
        let s3 = first_block(code, "code")
            .and_then(|c| first_block(c, "s3"))
            .ok_or_else(|| "code_configuration.code.s3 must be set".to_string())?;
        return Ok(AgentRuntimeArtifact::CodeConfiguration(CodeConfiguration {
            code: Code::S3(S3Location {
                bucket: require_string(s3, "bucket")?,
                prefix: require_string(s3, "prefix")?,
                version_id: get_non_empty(s3, "version_id"),
            }),
            entry_point: get_strings(code, "entry_point").unwrap_or_default(),
            runtime: require_string(code, "runtime")?,
        }));
    }

    Err("one of container_configuration or code_configuration must be set".to_string())
}

fn flatten_artifact(artifact: &AgentRuntimeArtifact) -> Dynamic {
    match artifact {
        AgentRuntimeArtifact::ContainerConfiguration(container) => ObjectBuilder::new()
            .block(
                "container_configuration",
                Some(
                    ObjectBuilder::new()
                        .set("container_uri", container.container_uri.clone())
                        .build(),
                ),
            )
            .block("code_configuration", None)
            .build(),
        AgentRuntimeArtifact::CodeConfiguration(code) => {
            let Code::S3(s3) = &code.code;
            let code_block = ObjectBuilder::new()
                .strings("entry_point", Some(code.entry_point.clone()))
                .set("runtime", code.runtime.clone())
                .block(
                    "code",
                    Some(
                        ObjectBuilder::new()
                            .block(
                                "s3",
                                Some(
                                    ObjectBuilder::new()
                                        .set("bucket", s3.bucket.clone())
                                        .set("prefix", s3.prefix.clone())
                                        .set("version_id", s3.version_id.clone())
                                        .build(),
                                ),
                            )
                            .build(),
                    ),
                )
                .build();
            ObjectBuilder::new()
                .block("container_configuration", None)
                .block("code_configuration", Some(code_block))
                .build()
        }
    }
}

fn artifact_variant(value: &Dynamic) -> Option<&'static str> {
    first_block(value, "agent_runtime_artifact").and_then(|a| variant(a, ARTIFACT_VARIANTS))
}

fn expand_spec(value: &Dynamic) -> Result<AgentRuntimeSpec, String> {
    let network = first_block(value, "network_configuration")
        .ok_or_else(|| "network_configuration must be set".to_string())?;

    Ok(AgentRuntimeSpec {
        agent_runtime_artifact: expand_artifact(value)?,
        role_arn: require_string(value, "role_arn")?,
        network_configuration: NetworkConfiguration {
            network_mode: require_string(network, "network_mode")?,
            network_mode_config: first_block(network, "network_mode_config").map(expand_vpc),
        },
        description: get_string(value, "description"),
        authorizer_configuration: expand_authorizer(value),
        protocol_configuration: first_block(value, "protocol_configuration").and_then(|p| {
            get_string(p, "server_protocol").map(|server_protocol| ProtocolConfiguration {
                server_protocol,
            })
        }),
        environment_variables: get_string_map(value, "environment_variables"),
        request_header_configuration: first_block(value, "request_header_configuration")
            .and_then(|h| get_strings(h, "request_header_allowlist"))
            .map(RequestHeaderConfiguration::RequestHeaderAllowlist),
    })
}

fn flatten(base: &Dynamic, runtime: &AgentRuntime) -> DynamicValue {
    ObjectBuilder::from_value(base)
        .set("agent_runtime_arn", runtime.agent_runtime_arn.clone())
        .set("agent_runtime_id", runtime.agent_runtime_id.clone())
        .set("agent_runtime_name", runtime.agent_runtime_name.clone())
        .set("agent_runtime_version", runtime.agent_runtime_version.clone())
        .set("role_arn", runtime.role_arn.clone())
        .set("description", runtime.description.clone())
        .string_map(
            "environment_variables",
            runtime.environment_variables.clone(),
        )
        .set(
            "workload_identity_arn",
            runtime
                .workload_identity_details
                .as_ref()
                .map(|d| d.workload_identity_arn.clone()),
        )
        .block(
            "agent_runtime_artifact",
            runtime.agent_runtime_artifact.as_ref().map(flatten_artifact),
        )
        .block(
            "network_configuration",
            runtime.network_configuration.as_ref().map(|network| {
                ObjectBuilder::new()
                    .set("network_mode", network.network_mode.clone())
                    .block(
                        "network_mode_config",
                        network.network_mode_config.as_ref().map(flatten_vpc),
                    )
                    .build()
            }),
        )
        .block(
            "authorizer_configuration",
            runtime
                .authorizer_configuration
                .as_ref()
                .map(flatten_authorizer),
        )
        .block(
            "protocol_configuration",
            runtime.protocol_configuration.as_ref().map(|p| {
                ObjectBuilder::new()
                    .set("server_protocol", p.server_protocol.clone())
                    .build()
            }),
        )
        .block(
            "request_header_configuration",
            runtime.request_header_configuration.as_ref().map(|h| {
                let RequestHeaderConfiguration::RequestHeaderAllowlist(headers) = h;
                ObjectBuilder::new()
                    .strings("request_header_allowlist", Some(headers.clone()))
                    .build()
            }),
        )
        .into_value()
}

async fn status_agent_runtime(
    client: &Client,
    id: &str,
) -> Result<PollOutcome<AgentRuntime>, ApiError> {
    PollOutcome::from_result(client.runtimes().get(id).await, |r| r.status.to_string())
}

fn failure_reason(runtime: &AgentRuntime) -> Option<String> {
    runtime.failure_reason.clone()
}

#[async_trait]
impl Resource for AgentRuntimeResource {
    fn type_name(&self) -> &str {
        "aws_bedrockagentcore_agent_runtime"
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ResourceSchemaRequest,
    ) -> ResourceSchemaResponse {
        ResourceSchemaResponse {
            schema: resource_schema(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        let mut diagnostics = vec![];
        let config = &request.config.value;

        if let Some(artifact) = first_block(config, "agent_runtime_artifact") {
            if !exactly_one_block(artifact, ARTIFACT_VARIANTS) {
                diagnostics.push(
                    Diagnostic::error(
                        "Invalid agent_runtime_artifact",
                        "Exactly one of container_configuration or code_configuration must be set",
                    )
                    .with_attribute(AttributePath::new("agent_runtime_artifact")),
                );
            }
        }

        if let Some(network) = first_block(config, "network_configuration") {
            if get_string(network, "network_mode").as_deref() == Some("VPC")
                && first_block(network, "network_mode_config").is_none()
                && !network.get("network_mode_config").is_unknown()
            {
                diagnostics.push(
                    Diagnostic::error(
                        "Missing network_mode_config",
                        "network_mode_config is required when network_mode is VPC",
                    )
                    .with_attribute(AttributePath::new("network_configuration")),
                );
            }
        }

        ValidateResourceConfigResponse { diagnostics }
    }

    async fn create(&self, ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        let mut diagnostics = vec![];

        let Some(provider_data) = &self.provider_data else {
            diagnostics.push(not_configured());
            return CreateResourceResponse {
                new_state: DynamicValue::null(),
                diagnostics,
            };
        };

        let planned = &request.planned_state.value;
        let name = get_string(planned, "agent_runtime_name").unwrap_or_default();

        let spec = match expand_spec(planned) {
            Ok(spec) => spec,
            Err(e) => {
                diagnostics.push(operation_error("creating", KIND, &name, e));
                return CreateResourceResponse {
                    new_state: DynamicValue::null(),
                    diagnostics,
                };
            }
        };

        let input = CreateAgentRuntimeRequest {
            agent_runtime_name: name.clone(),
            spec,
            client_token: client_token(),
        };
        let client = &provider_data.client;
        let needles = [IAM_PROPAGATION_MESSAGES, ECR_PROPAGATION_MESSAGES].concat();
        let input_ref = &input;
        let created = match retry_when_message_contains(PROPAGATION_TIMEOUT, &needles, move || async move {
            client.runtimes().create(input_ref).await
        })
        .await
        {
            Ok(created) => created,
            Err(e) => {
                diagnostics.push(operation_error("creating", KIND, &name, e));
                return CreateResourceResponse {
                    new_state: DynamicValue::null(),
                    diagnostics,
                };
            }
        };

        let id = created.agent_runtime_id.clone();
        tracing::debug!("Created agent runtime {} ({}), waiting for READY", name, id);

        let timeouts = Timeouts::from_value(planned, Timeouts::default());
        let conf = StateChangeConf::new(
            &[RuntimeStatus::Creating.as_str()],
            &[RuntimeStatus::Ready.as_str()],
            timeouts.create,
        )
        .continuous_target_occurrence(2);

        let id_ref = id.as_str();
        match conf
            .wait_for_state(&ctx, move || status_agent_runtime(client, id_ref))
            .await
        {
            Ok(Some(runtime)) => {
                tracing::info!("Agent runtime {} is ready", id);
                CreateResourceResponse {
                    new_state: flatten(planned, &runtime),
                    diagnostics,
                }
            }
            result => {
                if let Err(e) = &result {
                    diagnostics.push(wait_error("creation", KIND, &id, e, failure_reason));
                } else {
                    diagnostics.push(operation_error(
                        "waiting for creation",
                        KIND,
                        &id,
                        "resource disappeared while being created",
                    ));
                }
                let partial = ObjectBuilder::from_value(planned)
                    .set("agent_runtime_arn", created.agent_runtime_arn.clone())
                    .set("agent_runtime_id", id.clone())
                    .set("agent_runtime_version", created.agent_runtime_version.clone())
                    .build();
                CreateResourceResponse {
                    new_state: DynamicValue::new(resolve_unknowns(partial)),
                    diagnostics,
                }
            }
        }
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let mut diagnostics = vec![];

        let Some(provider_data) = &self.provider_data else {
            diagnostics.push(not_configured());
            return ReadResourceResponse {
                new_state: Some(request.current_state),
                diagnostics,
            };
        };

        let state = &request.current_state.value;
        let Some(id) = get_string(state, "agent_runtime_id") else {
            diagnostics.push(missing_identity(KIND, "agent_runtime_id"));
            return ReadResourceResponse {
                new_state: Some(request.current_state),
                diagnostics,
            };
        };

        match provider_data.client.runtimes().get(&id).await {
            Ok(runtime) => ReadResourceResponse {
                new_state: Some(flatten(state, &runtime)),
                diagnostics,
            },
            Err(e) if e.is_not_found() => {
                removed_from_state(KIND, &id);
                ReadResourceResponse {
                    new_state: None,
                    diagnostics,
                }
            }
            Err(e) => {
                diagnostics.push(operation_error("reading", KIND, &id, e));
                ReadResourceResponse {
                    new_state: Some(request.current_state),
                    diagnostics,
                }
            }
        }
    }

    async fn update(&self, ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let mut diagnostics = vec![];

        let Some(provider_data) = &self.provider_data else {
            diagnostics.push(not_configured());
            return UpdateResourceResponse {
                new_state: request.prior_state,
                diagnostics,
            };
        };

        let prior = &request.prior_state.value;
        let planned = &request.planned_state.value;
        let id = get_string(prior, "agent_runtime_id").unwrap_or_default();

        // Computed values carried over from state
        let carried = ObjectBuilder::from_value(planned)
            .set("agent_runtime_arn", prior.get("agent_runtime_arn").clone())
            .set("agent_runtime_id", id.clone())
            .set(
                "workload_identity_arn",
                prior.get("workload_identity_arn").clone(),
            );

        if !has_changes(&resource_schema().block, prior, planned, COMPUTED) {
            return UpdateResourceResponse {
                new_state: carried
                    .set(
                        "agent_runtime_version",
                        prior.get("agent_runtime_version").clone(),
                    )
                    .into_value(),
                diagnostics,
            };
        }

        let spec = match expand_spec(planned) {
            Ok(spec) => spec,
            Err(e) => {
                diagnostics.push(operation_error("updating", KIND, &id, e));
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    diagnostics,
                };
            }
        };

        let client = &provider_data.client;
        let input = UpdateAgentRuntimeRequest {
            spec,
            client_token: client_token(),
        };
        let updated = match client.runtimes().update(&id, &input).await {
            Ok(updated) => updated,
            Err(e) => {
                diagnostics.push(operation_error("updating", KIND, &id, e));
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    diagnostics,
                };
            }
        };

        let timeouts = Timeouts::from_value(planned, Timeouts::default());
        let conf = StateChangeConf::new(
            &[RuntimeStatus::Updating.as_str()],
            &[RuntimeStatus::Ready.as_str()],
            timeouts.update,
        )
        .continuous_target_occurrence(2);

        let id_ref = id.as_str();
        match conf
            .wait_for_state(&ctx, move || status_agent_runtime(client, id_ref))
            .await
        {
            Ok(Some(runtime)) => {
                tracing::info!(
                    "Agent runtime {} updated to version {}",
                    id,
                    runtime.agent_runtime_version
                );
                UpdateResourceResponse {
                    new_state: flatten(planned, &runtime),
                    diagnostics,
                }
            }
            result => {
                if let Err(e) = &result {
                    diagnostics.push(wait_error("update", KIND, &id, e, failure_reason));
                }
                let partial = carried
                    .set("agent_runtime_version", updated.agent_runtime_version)
                    .build();
                UpdateResourceResponse {
                    new_state: DynamicValue::new(resolve_unknowns(partial)),
                    diagnostics,
                }
            }
        }
    }

    async fn delete(&self, ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let mut diagnostics = vec![];

        let Some(provider_data) = &self.provider_data else {
            diagnostics.push(not_configured());
            return DeleteResourceResponse { diagnostics };
        };

        let prior = &request.prior_state.value;
        let Some(id) = get_string(prior, "agent_runtime_id") else {
            diagnostics.push(missing_identity(KIND, "agent_runtime_id"));
            return DeleteResourceResponse { diagnostics };
        };

        let client = &provider_data.client;
        match client.runtimes().delete(&id).await {
            Ok(_) => {}
            Err(e) if e.is_not_found() => {
                tracing::warn!("Agent runtime {} already deleted", id);
                return DeleteResourceResponse { diagnostics };
            }
            Err(e) => {
                diagnostics.push(operation_error("deleting", KIND, &id, e));
                return DeleteResourceResponse { diagnostics };
            }
        }

        let timeouts = Timeouts::from_value(prior, Timeouts::default());
        let conf = StateChangeConf::new(&[RuntimeStatus::Deleting.as_str()], &[], timeouts.delete);
        let id_ref = id.as_str();
        if let Err(e) = conf
            .wait_for_state(&ctx, move || status_agent_runtime(client, id_ref))
            .await
        {
            diagnostics.push(wait_error("deletion", KIND, &id, &e, failure_reason));
        } else {
            tracing::info!("Agent runtime {} deleted", id);
        }

        DeleteResourceResponse { diagnostics }
    }

    fn as_configure(&mut self) -> Option<&mut dyn ResourceWithConfigure> {
        Some(self)
    }

    fn as_modify_plan(&self) -> Option<&dyn ResourceWithModifyPlan> {
        Some(self)
    }

    fn as_import_state(&self) -> Option<&dyn ResourceWithImportState> {
        Some(self)
    }
}

#[async_trait]
impl ResourceWithConfigure for AgentRuntimeResource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
        let (data, response) = AgentCoreProviderData::from_request(request);
        self.provider_data = data;
        response
    }
}

#[async_trait]
impl ResourceWithModifyPlan for AgentRuntimeResource {
    async fn modify_plan(&self, _ctx: Context, request: ModifyPlanRequest) -> ModifyPlanResponse {
        let mut requires_replace = vec![];

        if !request.prior_state.is_null() && !request.proposed_new_state.is_null() {
            let prior = artifact_variant(&request.prior_state.value);
            let planned = artifact_variant(&request.proposed_new_state.value);
            if prior != planned {
                requires_replace.push(AttributePath::new("agent_runtime_artifact"));
            }
        }

        ModifyPlanResponse {
            planned_state: request.proposed_new_state,
            requires_replace,
            diagnostics: vec![],
        }
    }
}

#[async_trait]
impl ResourceWithImportState for AgentRuntimeResource {
    async fn import_state(
        &self,
        ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let mut response = ImportResourceStateResponse {
            imported_resources: vec![],
            diagnostics: vec![],
        };
        import_state_passthrough_id(
            &ctx,
            AttributePath::new("agent_runtime_id"),
            &request,
            &mut response,
        );
        response
    }
}

#[cfg(test)]
#[path = "./agent_runtime_test.rs"]
mod agent_runtime_test;
