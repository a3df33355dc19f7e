//! Gateway resource

use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::import::import_state_passthrough_id;
use tfplug::plan_modifier::{RequiresReplaceIfChanged, UseStateForUnknown};
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse,
    ImportResourceStateRequest, ImportResourceStateResponse, ReadResourceRequest,
    ReadResourceResponse, Resource, ResourceSchemaRequest, ResourceSchemaResponse,
    ResourceWithConfigure, ResourceWithImportState, UpdateResourceRequest,
    UpdateResourceResponse, ValidateResourceConfigRequest, ValidateResourceConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, NestedBlock, NestedBlockBuilder, Schema, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use tfplug::validator::StringOneOfValidator;

use super::agent_runtime::{authorizer_block, expand_authorizer, flatten_authorizer};
use super::{
    client_token, missing_identity, not_configured, operation_error, removed_from_state,
    wait_error,
};
use crate::api::gateway::{
    CreateGatewayRequest, Gateway, GatewayProtocolConfiguration, GatewaySpec, GatewayStatus,
    McpGatewayConfiguration,
};
use crate::api::{ApiError, Client};
use crate::flex::{
    first_block, get_string, get_strings, has_changes, require_string, resolve_unknowns,
    ObjectBuilder,
};
use crate::provider_data::AgentCoreProviderData;
use crate::retry::{retry_when_message_contains, IAM_PROPAGATION_MESSAGES, PROPAGATION_TIMEOUT};
use crate::timeouts::{self, Timeouts};
use crate::waiter::{PollOutcome, StateChangeConf};

const KIND: &str = "Gateway";
const COMPUTED: &[&str] = &[
    "gateway_arn",
    "gateway_id",
    "gateway_url",
    "workload_identity_arn",
    "timeouts",
];

#[derive(Default)]
pub struct GatewayResource {
    provider_data: Option<AgentCoreProviderData>,
}

impl GatewayResource {
    pub fn new() -> Self {
        Self::default()
    }
}

fn computed_string(name: &str) -> tfplug::schema::Attribute {
    AttributeBuilder::new(name, AttributeType::String)
        .computed()
        .plan_modifier(UseStateForUnknown::create())
        .build()
}

fn resource_schema() -> Schema {
    SchemaBuilder::new()
        .version(0)
        .description("Manages a Bedrock AgentCore gateway")
        .attribute(
            AttributeBuilder::new("name", AttributeType::String)
                .required()
                .plan_modifier(RequiresReplaceIfChanged::create())
                .build(),
        )
        .attribute(
            AttributeBuilder::new("role_arn", AttributeType::String)
                .description("IAM role the gateway uses to invoke targets")
                .required()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("protocol_type", AttributeType::String)
                .required()
                .validator(StringOneOfValidator::create(&["MCP"]))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("authorizer_type", AttributeType::String)
                .required()
                .validator(StringOneOfValidator::create(&["CUSTOM_JWT", "AWS_IAM"]))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("description", AttributeType::String)
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("exception_level", AttributeType::String)
                .description("Set to DEBUG to return detailed errors to callers")
                .optional()
                .validator(StringOneOfValidator::create(&["DEBUG"]))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("kms_key_arn", AttributeType::String)
                .optional()
                .plan_modifier(RequiresReplaceIfChanged::create())
                .build(),
        )
        .attribute(computed_string("gateway_arn"))
        .attribute(computed_string("gateway_id"))
        .attribute(computed_string("gateway_url"))
        .attribute(computed_string("workload_identity_arn"))
        .block(authorizer_block())
        .block(protocol_block())
        .block(timeouts::block(true))
        .build()
}

fn protocol_block() -> NestedBlock {
    NestedBlockBuilder::new("protocol_configuration")
        .max_items(1)
        .block(
            NestedBlockBuilder::new("mcp")
                .min_items(1)
                .max_items(1)
                .attribute(
                    AttributeBuilder::new("instructions", AttributeType::String)
                        .optional()
                        .build(),
                )
                .attribute(
                    AttributeBuilder::new("search_type", AttributeType::String)
                        .optional()
                        .validator(StringOneOfValidator::create(&["SEMANTIC"]))
                        .build(),
                )
                .attribute(
                    AttributeBuilder::new(
                        "supported_versions",
                        AttributeType::Set(Box::new(AttributeType::String)),
                    )
                    .optional()
                    .build(),
                )
                .build(),
        )
        .build()
}

fn expand_spec(value: &Dynamic) -> Result<GatewaySpec, String> {
    Ok(GatewaySpec {
        name: require_string(value, "name")?,
        role_arn: require_string(value, "role_arn")?,
        protocol_type: require_string(value, "protocol_type")?,
        authorizer_type: require_string(value, "authorizer_type")?,
        description: get_string(value, "description"),
        protocol_configuration: first_block(value, "protocol_configuration")
            .and_then(|p| first_block(p, "mcp"))
            .map(|mcp| {
                GatewayProtocolConfiguration::Mcp(McpGatewayConfiguration {
                    instructions: get_string(mcp, "instructions"),
                    search_type: get_string(mcp, "search_type"),
                    supported_versions: get_strings(mcp, "supported_versions"),
                })
            }),
        authorizer_configuration: expand_authorizer(value),
        kms_key_arn: get_string(value, "kms_key_arn"),
        exception_level: get_string(value, "exception_level"),
    })
}

fn flatten(base: &Dynamic, gateway: &Gateway) -> DynamicValue {
    ObjectBuilder::from_value(base)
        .set("gateway_arn", gateway.gateway_arn.clone())
        .set("gateway_id", gateway.gateway_id.clone())
        .set("gateway_url", gateway.gateway_url.clone())
        .set("name", gateway.name.clone())
        .set("description", gateway.description.clone())
        .set("role_arn", gateway.role_arn.clone())
        .set("protocol_type", gateway.protocol_type.clone())
        .set("authorizer_type", gateway.authorizer_type.clone())
        .set("kms_key_arn", gateway.kms_key_arn.clone())
        .set("exception_level", gateway.exception_level.clone())
        .set(
            "workload_identity_arn",
            gateway
                .workload_identity_details
                .as_ref()
                .map(|d| d.workload_identity_arn.clone()),
        )
        .block(
            "authorizer_configuration",
            gateway
                .authorizer_configuration
                .as_ref()
                .map(flatten_authorizer),
        )
        .block(
            "protocol_configuration",
            gateway.protocol_configuration.as_ref().map(|protocol| {
                let GatewayProtocolConfiguration::Mcp(mcp) = protocol;
                let mcp = ObjectBuilder::new()
                    .set("instructions", mcp.instructions.clone())
                    .set("search_type", mcp.search_type.clone())
                    .strings("supported_versions", mcp.supported_versions.clone())
                    .build();
                ObjectBuilder::new().block("mcp", Some(mcp)).build()
            }),
        )
        .into_value()
}

async fn status_gateway(client: &Client, id: &str) -> Result<PollOutcome<Gateway>, ApiError> {
    PollOutcome::from_result(client.gateways().get(id).await, |g| g.status.to_string())
}

fn failure_reason(gateway: &Gateway) -> Option<String> {
    Some(gateway.status_reasons.join("; "))
}

#[async_trait]
impl Resource for GatewayResource {
    fn type_name(&self) -> &str {
        "aws_bedrockagentcore_gateway"
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

        if get_string(config, "authorizer_type").as_deref() == Some("CUSTOM_JWT")
            && first_block(config, "authorizer_configuration").is_none()
            && !config.get("authorizer_configuration").is_unknown()
        {
            diagnostics.push(
                Diagnostic::error(
                    "Missing authorizer_configuration",
                    "authorizer_configuration is required when authorizer_type is CUSTOM_JWT",
                )
                .with_attribute(AttributePath::new("authorizer_configuration")),
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
        let name = get_string(planned, "name").unwrap_or_default();

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

        let input = CreateGatewayRequest {
            spec,
            client_token: client_token(),
        };
        let client = &provider_data.client;
        let input_ref = &input;
        let created = match retry_when_message_contains(
            PROPAGATION_TIMEOUT,
            IAM_PROPAGATION_MESSAGES,
            move || async move { client.gateways().create(input_ref).await },
        )
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

        let id = created.gateway_id.clone();
        tracing::debug!("Created gateway {} ({}), waiting for READY", name, id);

        let timeouts = Timeouts::from_value(planned, Timeouts::default());
        let conf = StateChangeConf::new(
            &[GatewayStatus::Creating.as_str()],
            &[GatewayStatus::Ready.as_str()],
            timeouts.create,
        )
        .continuous_target_occurrence(2);

        let id_ref = id.as_str();
        match conf
            .wait_for_state(&ctx, move || status_gateway(client, id_ref))
            .await
        {
            Ok(Some(gateway)) => {
                tracing::info!("Gateway {} is ready at {:?}", id, gateway.gateway_url);
                CreateResourceResponse {
                    new_state: flatten(planned, &gateway),
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
                    .set("gateway_arn", created.gateway_arn.clone())
                    .set("gateway_id", id.clone())
                    .set("gateway_url", created.gateway_url.clone())
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
        let Some(id) = get_string(state, "gateway_id") else {
            diagnostics.push(missing_identity(KIND, "gateway_id"));
            return ReadResourceResponse {
                new_state: Some(request.current_state),
                diagnostics,
            };
        };

        match provider_data.client.gateways().get(&id).await {
            Ok(gateway) => ReadResourceResponse {
                new_state: Some(flatten(state, &gateway)),
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
        let id = get_string(prior, "gateway_id").unwrap_or_default();

        let mut carried = ObjectBuilder::from_value(planned);
        for name in ["gateway_arn", "gateway_id", "gateway_url", "workload_identity_arn"] {
            carried = carried.set(name, prior.get(name).clone());
        }

        if !has_changes(&resource_schema().block, prior, planned, COMPUTED) {
            return UpdateResourceResponse {
                new_state: carried.into_value(),
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
        if let Err(e) = client.gateways().update(&id, &spec).await {
            diagnostics.push(operation_error("updating", KIND, &id, e));
            return UpdateResourceResponse {
                new_state: request.prior_state,
                diagnostics,
            };
        }

        let timeouts = Timeouts::from_value(planned, Timeouts::default());
        let conf = StateChangeConf::new(
            &[GatewayStatus::Updating.as_str()],
            &[GatewayStatus::Ready.as_str()],
            timeouts.update,
        )
        .continuous_target_occurrence(2);

        let id_ref = id.as_str();
        match conf
            .wait_for_state(&ctx, move || status_gateway(client, id_ref))
            .await
        {
            Ok(Some(gateway)) => UpdateResourceResponse {
                new_state: flatten(planned, &gateway),
                diagnostics,
            },
            result => {
                if let Err(e) = &result {
                    diagnostics.push(wait_error("update", KIND, &id, e, failure_reason));
                }
                UpdateResourceResponse {
                    new_state: DynamicValue::new(resolve_unknowns(carried.build())),
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
        let Some(id) = get_string(prior, "gateway_id") else {
            diagnostics.push(missing_identity(KIND, "gateway_id"));
            return DeleteResourceResponse { diagnostics };
        };

        let client = &provider_data.client;
        match client.gateways().delete(&id).await {
            Ok(_) => {}
            Err(e) if e.is_not_found() => {
                tracing::warn!("Gateway {} already deleted", id);
                return DeleteResourceResponse { diagnostics };
            }
            Err(e) => {
                diagnostics.push(operation_error("deleting", KIND, &id, e));
                return DeleteResourceResponse { diagnostics };
            }
        }

        let timeouts = Timeouts::from_value(prior, Timeouts::default());
        let conf = StateChangeConf::new(&[GatewayStatus::Deleting.as_str()], &[], timeouts.delete);
        let id_ref = id.as_str();
        if let Err(e) = conf
            .wait_for_state(&ctx, move || status_gateway(client, id_ref))
            .await
        {
            diagnostics.push(wait_error("deletion", KIND, &id, &e, failure_reason));
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
impl ResourceWithConfigure for GatewayResource {
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
impl ResourceWithImportState for GatewayResource {
    async fn import_state(
        &self,
        ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let mut response = ImportResourceStateResponse {
            imported_resources: vec![],
            diagnostics: vec![],
        };
        import_state_passthrough_id(&ctx, AttributePath::new("gateway_id"), &request, &mut response);
        response
    }
}

#[cfg(test)]
#[path = "./gateway_test.rs"]
mod gateway_test;
