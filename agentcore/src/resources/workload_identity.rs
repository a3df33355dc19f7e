//! Workload identity resource

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
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::types::{AttributePath, Dynamic, DynamicValue};
use tfplug::validator::StringLengthValidator;

use super::{missing_identity, not_configured, operation_error, removed_from_state};
use crate::api::identity::{WorkloadIdentity, WorkloadIdentityRequest};
use crate::flex::{get_string, get_strings, ObjectBuilder};
use crate::provider_data::AgentCoreProviderData;

const KIND: &str = "Workload Identity";

#[derive(Default)]
pub struct WorkloadIdentityResource {
    provider_data: Option<AgentCoreProviderData>,
}

impl WorkloadIdentityResource {
    pub fn new() -> Self {
        Self::default()
    }
}

fn resource_schema() -> Schema {
    SchemaBuilder::new()
        .version(0)
        .description("Manages a Bedrock AgentCore workload identity")
        .attribute(
            AttributeBuilder::new("name", AttributeType::String)
                .required()
                .validator(StringLengthValidator::between(3, 255))
                .plan_modifier(RequiresReplaceIfChanged::create())
                .build(),
        )
        .attribute(
            AttributeBuilder::new(
                "allowed_resource_oauth2_return_urls",
                AttributeType::Set(Box::new(AttributeType::String)),
            )
            .description("URLs the identity may be redirected to after an OAuth2 flow")
            .optional()
            .build(),
        )
        .attribute(
            AttributeBuilder::new("workload_identity_arn", AttributeType::String)
                .computed()
                .plan_modifier(UseStateForUnknown::create())
                .build(),
        )
        .build()
}

fn expand(value: &Dynamic) -> WorkloadIdentityRequest {
    WorkloadIdentityRequest {
        name: get_string(value, "name").unwrap_or_default(),
        allowed_resource_oauth2_return_urls: get_strings(value, "allowed_resource_oauth2_return_urls"),
    }
}

fn flatten(base: &Dynamic, identity: &WorkloadIdentity) -> DynamicValue {
    // An empty list and an unset attribute are the same to the service
    let urls = identity
        .allowed_resource_oauth2_return_urls
        .clone()
        .filter(|urls| !urls.is_empty());
    ObjectBuilder::from_value(base)
        .set("name", identity.name.clone())
        .set("workload_identity_arn", identity.workload_identity_arn.clone())
        .strings("allowed_resource_oauth2_return_urls", urls)
        .into_value()
}

#[async_trait]
impl Resource for WorkloadIdentityResource {
    fn type_name(&self) -> &str {
        "aws_bedrockagentcore_workload_identity"
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
        _request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        ValidateResourceConfigResponse {
            diagnostics: vec![],
        }
    }

    async fn create(&self, _ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        let mut diagnostics = vec![];

        let Some(provider_data) = &self.provider_data else {
            diagnostics.push(not_configured());
            return CreateResourceResponse {
                new_state: DynamicValue::null(),
                diagnostics,
            };
        };

        let planned = &request.planned_state.value;
        let input = expand(planned);
        match provider_data
            .client
            .identity()
            .create_workload_identity(&input)
            .await
        {
            Ok(identity) => CreateResourceResponse {
                new_state: flatten(planned, &identity),
                diagnostics,
            },
            Err(e) => {
                diagnostics.push(operation_error("creating", KIND, &input.name, e));
                CreateResourceResponse {
                    new_state: DynamicValue::null(),
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
        let Some(name) = get_string(state, "name") else {
            diagnostics.push(missing_identity(KIND, "name"));
            return ReadResourceResponse {
                new_state: Some(request.current_state),
                diagnostics,
            };
        };

        match provider_data.client.identity().get_workload_identity(&name).await {
            Ok(identity) => ReadResourceResponse {
                new_state: Some(flatten(state, &identity)),
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

    async fn update(&self, _ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let mut diagnostics = vec![];

        let Some(provider_data) = &self.provider_data else {
            diagnostics.push(not_configured());
            return UpdateResourceResponse {
                new_state: request.prior_state,
                diagnostics,
            };
        };

        let planned = &request.planned_state.value;
        let mut input = expand(planned);
        // Clearing the set has to be sent explicitly
        input
            .allowed_resource_oauth2_return_urls
            .get_or_insert_with(Vec::new);

        match provider_data
            .client
            .identity()
            .update_workload_identity(&input)
            .await
        {
            Ok(identity) => UpdateResourceResponse {
                new_state: flatten(planned, &identity),
                diagnostics,
            },
            Err(e) => {
                diagnostics.push(operation_error("updating", KIND, &input.name, e));
                UpdateResourceResponse {
                    new_state: request.prior_state,
                    diagnostics,
                }
            }
        }
    }

    async fn delete(&self, _ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let mut diagnostics = vec![];

        let Some(provider_data) = &self.provider_data else {
            diagnostics.push(not_configured());
            return DeleteResourceResponse { diagnostics };
        };

        let Some(name) = get_string(&request.prior_state.value, "name") else {
            diagnostics.push(missing_identity(KIND, "name"));
            return DeleteResourceResponse { diagnostics };
        };

        match provider_data.client.identity().delete_workload_identity(&name).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                tracing::warn!("Workload identity {} already deleted", name);
            }
            Err(e) => diagnostics.push(operation_error("deleting", KIND, &name, e)),
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
impl ResourceWithConfigure for WorkloadIdentityResource {
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
impl ResourceWithImportState for WorkloadIdentityResource {
    async fn import_state(
        &self,
        ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let mut response = ImportResourceStateResponse {
            imported_resources: vec![],
            diagnostics: vec![],
        };
        import_state_passthrough_id(&ctx, AttributePath::new("name"), &request, &mut response);
        response
    }
}
