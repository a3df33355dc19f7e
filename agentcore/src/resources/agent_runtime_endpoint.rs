//! Agent runtime endpoint resource
//!
//! An endpoint is a named, addressable pointer at one version of a runtime.
//! Leaving `agent_runtime_version` unset lets the service pick the latest.

use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::import::import_state_composite_id;
use tfplug::plan_modifier::{RequiresReplaceIfChanged, UseStateForUnknown};
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse,
    ImportResourceStateRequest, ImportResourceStateResponse, ReadResourceRequest,
    ReadResourceResponse, Resource, ResourceSchemaRequest, ResourceSchemaResponse,
    ResourceWithConfigure, ResourceWithImportState, UpdateResourceRequest,
    UpdateResourceResponse, ValidateResourceConfigRequest, ValidateResourceConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};

use super::{
    client_token, missing_identity, not_configured, operation_error, removed_from_state,
    wait_error,
};
use crate::api::runtime::{
    AgentRuntimeEndpoint, CreateAgentRuntimeEndpointRequest, RuntimeStatus,
    UpdateAgentRuntimeEndpointRequest,
};
use crate::api::{ApiError, Client};
use crate::flex::{get_string, has_changes, resolve_unknowns, ObjectBuilder};
use crate::provider_data::AgentCoreProviderData;
use crate::timeouts::{self, Timeouts};
use crate::waiter::{PollOutcome, StateChangeConf};

const KIND: &str = "Agent Runtime Endpoint";
const DEFAULT_ENDPOINT: &str = "DEFAULT";
const COMPUTED: &[&str] = &[
    "agent_runtime_endpoint_arn",
    "agent_runtime_arn",
    "live_version",
    "target_version",
    "timeouts",
];

#[derive(Default)]
pub struct AgentRuntimeEndpointResource {
    provider_data: Option<AgentCoreProviderData>,
}

impl AgentRuntimeEndpointResource {
    pub fn new() -> Self {
        Self::default()
    }
}

fn resource_schema() -> Schema {
    SchemaBuilder::new()
        .version(0)
        .description("Manages an endpoint of a Bedrock AgentCore agent runtime")
        .attribute(
            AttributeBuilder::new("agent_runtime_id", AttributeType::String)
                .required()
                .plan_modifier(RequiresReplaceIfChanged::create())
                .build(),
        )
        .attribute(
            AttributeBuilder::new("name", AttributeType::String)
                .required()
                .plan_modifier(RequiresReplaceIfChanged::create())
                .build(),
        )
        .attribute(
            AttributeBuilder::new("agent_runtime_version", AttributeType::String)
                .description("Runtime version to serve; defaults to the latest")
                .optional()
                .computed()
                .plan_modifier(UseStateForUnknown::create())
                .build(),
        )
        .attribute(
            AttributeBuilder::new("description", AttributeType::String)
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("agent_runtime_endpoint_arn", AttributeType::String)
                .computed()
                .plan_modifier(UseStateForUnknown::create())
                .build(),
        )
        .attribute(
            AttributeBuilder::new("agent_runtime_arn", AttributeType::String)
                .computed()
                .plan_modifier(UseStateForUnknown::create())
                .build(),
        )
        .attribute(
            AttributeBuilder::new("live_version", AttributeType::String)
                .computed()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("target_version", AttributeType::String)
                .computed()
                .build(),
        )
        .block(timeouts::block(true))
        .build()
}

fn flatten(base: &Dynamic, endpoint: &AgentRuntimeEndpoint) -> DynamicValue {
    let mut builder = ObjectBuilder::from_value(base)
        .set("name", endpoint.name.clone())
        .set(
            "agent_runtime_endpoint_arn",
            endpoint.agent_runtime_endpoint_arn.clone(),
        )
        .set("agent_runtime_arn", endpoint.agent_runtime_arn.clone())
        .set("live_version", endpoint.live_version.clone())
        .set("target_version", endpoint.target_version.clone())
        .set("description", endpoint.description.clone());

    // Mid-rollout the live version lags; report what the endpoint is moving to
    if let Some(version) = endpoint
        .target_version
        .clone()
        .or_else(|| endpoint.live_version.clone())
    {
        builder = builder.set("agent_runtime_version", version);
    }

    builder.into_value()
}

async fn status_endpoint(
    client: &Client,
    runtime_id: &str,
    name: &str,
) -> Result<PollOutcome<AgentRuntimeEndpoint>, ApiError> {
    PollOutcome::from_result(
        client.runtimes().get_endpoint(runtime_id, name).await,
        |e| e.status.to_string(),
    )
}

fn failure_reason(endpoint: &AgentRuntimeEndpoint) -> Option<String> {
    endpoint.failure_reason.clone()
}

fn identity(value: &Dynamic) -> Option<(String, String)> {
    Some((
        get_string(value, "agent_runtime_id")?,
        get_string(value, "name")?,
    ))
}

#[async_trait]
impl Resource for AgentRuntimeEndpointResource {
    fn type_name(&self) -> &str {
        "aws_bedrockagentcore_agent_runtime_endpoint"
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
        // Every runtime owns a service-managed DEFAULT endpoint
        if get_string(&request.config.value, "name").as_deref() == Some(DEFAULT_ENDPOINT) {
            diagnostics.push(
                Diagnostic::error(
                    "Reserved endpoint name",
                    format!("\"{}\" is managed by the runtime itself", DEFAULT_ENDPOINT),
                )
                .with_attribute(AttributePath::new("name")),
            );
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
        let Some((runtime_id, name)) = identity(planned) else {
            diagnostics.push(missing_identity(KIND, "agent_runtime_id, name"));
            return CreateResourceResponse {
                new_state: DynamicValue::null(),
                diagnostics,
            };
        };

        let input = CreateAgentRuntimeEndpointRequest {
            name: name.clone(),
            agent_runtime_version: get_string(planned, "agent_runtime_version"),
            description: get_string(planned, "description"),
            client_token: client_token(),
        };
        let client = &provider_data.client;
        let created = match client.runtimes().create_endpoint(&runtime_id, &input).await {
            Ok(created) => created,
            Err(e) => {
                diagnostics.push(operation_error("creating", KIND, &name, e));
                return CreateResourceResponse {
                    new_state: DynamicValue::null(),
                    diagnostics,
                };
            }
        };

        let timeouts = Timeouts::from_value(planned, Timeouts::default());
        let conf = StateChangeConf::new(
            &[RuntimeStatus::Creating.as_str()],
            &[RuntimeStatus::Ready.as_str()],
            timeouts.create,
        );
        let (rid, n) = (runtime_id.as_str(), name.as_str());
        match conf
            .wait_for_state(&ctx, move || status_endpoint(client, rid, n))
            .await
        {
            Ok(Some(endpoint)) => {
                tracing::info!("Runtime endpoint {}/{} is ready", runtime_id, name);
                CreateResourceResponse {
                    new_state: flatten(planned, &endpoint),
                    diagnostics,
                }
            }
            result => {
                if let Err(e) = &result {
                    diagnostics.push(wait_error("creation", KIND, &name, e, failure_reason));
                }
                let partial = ObjectBuilder::from_value(planned)
                    .set(
                        "agent_runtime_endpoint_arn",
                        created.agent_runtime_endpoint_arn.clone(),
                    )
                    .set("agent_runtime_arn", created.agent_runtime_arn.clone())
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
        let Some((runtime_id, name)) = identity(state) else {
            diagnostics.push(missing_identity(KIND, "agent_runtime_id, name"));
            return ReadResourceResponse {
                new_state: Some(request.current_state),
                diagnostics,
            };
        };

        match provider_data
            .client
            .runtimes()
            .get_endpoint(&runtime_id, &name)
            .await
        {
            Ok(endpoint) => ReadResourceResponse {
                new_state: Some(flatten(state, &endpoint)),
                diagnostics,
            },
            Err(e) if e.is_not_found() => {
                removed_from_state(KIND, &name);
                ReadResourceResponse {
                    new_state: None,
                    diagnostics,
                }
            }
            Err(e) => {
                diagnostics.push(operation_error("reading", KIND, &name, e));
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
        let Some((runtime_id, name)) = identity(prior) else {
            diagnostics.push(missing_identity(KIND, "agent_runtime_id, name"));
            return UpdateResourceResponse {
                new_state: request.prior_state,
                diagnostics,
            };
        };

        if !has_changes(&resource_schema().block, prior, planned, COMPUTED) {
            let carried = COMPUTED
                .iter()
                .filter(|key| **key != "timeouts")
                .fold(ObjectBuilder::from_value(planned), |builder, key| {
                    builder.set(key, prior.get(key).clone())
                });
            return UpdateResourceResponse {
                new_state: carried.into_value(),
                diagnostics,
            };
        }

        let input = UpdateAgentRuntimeEndpointRequest {
            agent_runtime_version: get_string(planned, "agent_runtime_version"),
            description: get_string(planned, "description"),
            client_token: client_token(),
        };
        let client = &provider_data.client;
        if let Err(e) = client
            .runtimes()
            .update_endpoint(&runtime_id, &name, &input)
            .await
        {
            diagnostics.push(operation_error("updating", KIND, &name, e));
            return UpdateResourceResponse {
                new_state: request.prior_state,
                diagnostics,
            };
        }

        let timeouts = Timeouts::from_value(planned, Timeouts::default());
        let conf = StateChangeConf::new(
            &[RuntimeStatus::Updating.as_str()],
            &[RuntimeStatus::Ready.as_str()],
            timeouts.update,
        );
        let (rid, n) = (runtime_id.as_str(), name.as_str());
        match conf
            .wait_for_state(&ctx, move || status_endpoint(client, rid, n))
            .await
        {
            Ok(Some(endpoint)) => UpdateResourceResponse {
                new_state: flatten(planned, &endpoint),
                diagnostics,
            },
            result => {
                if let Err(e) = &result {
                    diagnostics.push(wait_error("update", KIND, &name, e, failure_reason));
                }
                UpdateResourceResponse {
                    new_state: DynamicValue::new(resolve_unknowns(planned.clone())),
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
        let Some((runtime_id, name)) = identity(prior) else {
            diagnostics.push(missing_identity(KIND, "agent_runtime_id, name"));
            return DeleteResourceResponse { diagnostics };
        };

        let client = &provider_data.client;
        match client.runtimes().delete_endpoint(&runtime_id, &name).await {
            Ok(_) => {}
            Err(e) if e.is_not_found() => {
                tracing::warn!("Runtime endpoint {}/{} already deleted", runtime_id, name);
                return DeleteResourceResponse { diagnostics };
            }
            Err(e) => {
                diagnostics.push(operation_error("deleting", KIND, &name, e));
                return DeleteResourceResponse { diagnostics };
            }
        }

        let timeouts = Timeouts::from_value(prior, Timeouts::default());
        let conf = StateChangeConf::new(&[RuntimeStatus::Deleting.as_str()], &[], timeouts.delete);
        let (rid, n) = (runtime_id.as_str(), name.as_str());
        if let Err(e) = conf
            .wait_for_state(&ctx, move || status_endpoint(client, rid, n))
            .await
        {
            diagnostics.push(wait_error("deletion", KIND, &name, &e, failure_reason));
        }

        DeleteResourceResponse { diagnostics }
    }

    fn as_configure(&mut self) -> Option<&mut dyn ResourceWithConfigure> {
        Some(self)
    }

    fn as_import_state(&self) -> Option<&dyn ResourceWithImportState> {
        Some(self)
    }
}

#[async_trait]
impl ResourceWithConfigure for AgentRuntimeEndpointResource {
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
impl ResourceWithImportState for AgentRuntimeEndpointResource {
    async fn import_state(
        &self,
        ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let mut response = ImportResourceStateResponse {
            imported_resources: vec![],
            diagnostics: vec![],
        };
        import_state_composite_id(&ctx, ',', &["agent_runtime_id", "name"], &request, &mut response);
        response
    }
}

#[cfg(test)]
#[path = "./agent_runtime_endpoint_test.rs"]
mod agent_runtime_endpoint_test;
