//! Code interpreter resource

use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::import::import_state_passthrough_id;
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse,
    ImportResourceStateRequest, ImportResourceStateResponse, ReadResourceRequest,
    ReadResourceResponse, Resource, ResourceSchemaRequest, ResourceSchemaResponse,
    ResourceWithConfigure, ResourceWithImportState, UpdateResourceRequest,
    UpdateResourceResponse, ValidateResourceConfigRequest, ValidateResourceConfigResponse,
};
use tfplug::types::{AttributePath, Dynamic, DynamicValue};

use super::browser::{expand_network, flatten_network, tool_outcome, tool_schema, validate_network};
use super::{
    client_token, missing_identity, not_configured, operation_error, removed_from_state,
    wait_error,
};
use crate::api::browser::ToolStatus;
use crate::api::code_interpreter::{CodeInterpreter, CreateCodeInterpreterRequest};
use crate::api::{ApiError, Client};
use crate::flex::{get_string, resolve_unknowns, ObjectBuilder};
use crate::provider_data::AgentCoreProviderData;
use crate::timeouts::Timeouts;
use crate::waiter::{PollOutcome, StateChangeConf};

const KIND: &str = "Code Interpreter";

#[derive(Default)]
pub struct CodeInterpreterResource {
    provider_data: Option<AgentCoreProviderData>,
}

impl CodeInterpreterResource {
    pub fn new() -> Self {
        Self::default()
    }
}

fn flatten(base: &Dynamic, interpreter: &CodeInterpreter) -> DynamicValue {
    ObjectBuilder::from_value(base)
        .set("code_interpreter_id", interpreter.code_interpreter_id.clone())
        .set("code_interpreter_arn", interpreter.code_interpreter_arn.clone())
        .set("name", interpreter.name.clone())
        .set("description", interpreter.description.clone())
        .set("execution_role_arn", interpreter.execution_role_arn.clone())
        .block(
            "network_configuration",
            interpreter.network_configuration.as_ref().map(flatten_network),
        )
        .into_value()
}

async fn status_code_interpreter(
    client: &Client,
    id: &str,
) -> Result<PollOutcome<CodeInterpreter>, ApiError> {
    tool_outcome(client.code_interpreters().get(id).await, |c| c.status)
}

fn failure_reason(interpreter: &CodeInterpreter) -> Option<String> {
    interpreter.failure_reason.clone()
}

#[async_trait]
impl Resource for CodeInterpreterResource {
    fn type_name(&self) -> &str {
        "aws_bedrockagentcore_code_interpreter"
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ResourceSchemaRequest,
    ) -> ResourceSchemaResponse {
        ResourceSchemaResponse {
            schema: tool_schema(
                "Manages a Bedrock AgentCore code interpreter",
                "code_interpreter_id",
                "code_interpreter_arn",
                &["PUBLIC", "SANDBOX", "VPC"],
            )
            .build(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        ValidateResourceConfigResponse {
            diagnostics: validate_network(&request.config.value),
        }
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
        let network_configuration = match expand_network(planned) {
            Ok(network) => network,
            Err(e) => {
                diagnostics.push(operation_error("creating", KIND, &name, e));
                return CreateResourceResponse {
                    new_state: DynamicValue::null(),
                    diagnostics,
                };
            }
        };

        let input = CreateCodeInterpreterRequest {
            name: name.clone(),
            network_configuration,
            description: get_string(planned, "description"),
            execution_role_arn: get_string(planned, "execution_role_arn"),
            client_token: client_token(),
        };
        let client = &provider_data.client;
        let created = match client.code_interpreters().create(&input).await {
            Ok(created) => created,
            Err(e) => {
                diagnostics.push(operation_error("creating", KIND, &name, e));
                return CreateResourceResponse {
                    new_state: DynamicValue::null(),
                    diagnostics,
                };
            }
        };

        let id = created.code_interpreter_id.clone();
        tracing::debug!("Created code interpreter {}", id);
        let timeouts = Timeouts::from_value(planned, Timeouts::default());
        let conf = StateChangeConf::new(
            &[ToolStatus::Creating.as_str()],
            &[ToolStatus::Ready.as_str()],
            timeouts.create,
        );
        let id_ref = id.as_str();
        match conf
            .wait_for_state(&ctx, move || status_code_interpreter(client, id_ref))
            .await
        {
            Ok(Some(interpreter)) => CreateResourceResponse {
                new_state: flatten(planned, &interpreter),
                diagnostics,
            },
            result => {
                if let Err(e) = &result {
                    diagnostics.push(wait_error("creation", KIND, &id, e, failure_reason));
                }
                let partial = ObjectBuilder::from_value(planned)
                    .set("code_interpreter_id", id.clone())
                    .set("code_interpreter_arn", created.code_interpreter_arn.clone())
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
        let Some(id) = get_string(state, "code_interpreter_id") else {
            diagnostics.push(missing_identity(KIND, "code_interpreter_id"));
            return ReadResourceResponse {
                new_state: Some(request.current_state),
                diagnostics,
            };
        };

        match status_code_interpreter(&provider_data.client, &id).await {
            Ok(PollOutcome::Found { resource, .. }) => ReadResourceResponse {
                new_state: Some(flatten(state, &resource)),
                diagnostics,
            },
            Ok(PollOutcome::Gone) => {
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

    async fn update(&self, _ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let prior = &request.prior_state.value;
        let new_state = ObjectBuilder::from_value(&request.planned_state.value)
            .set("code_interpreter_id", prior.get("code_interpreter_id").clone())
            .set("code_interpreter_arn", prior.get("code_interpreter_arn").clone())
            .into_value();
        UpdateResourceResponse {
            new_state,
            diagnostics: vec![],
        }
    }

    async fn delete(&self, ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let mut diagnostics = vec![];

        let Some(provider_data) = &self.provider_data else {
            diagnostics.push(not_configured());
            return DeleteResourceResponse { diagnostics };
        };

        let prior = &request.prior_state.value;
        let Some(id) = get_string(prior, "code_interpreter_id") else {
            diagnostics.push(missing_identity(KIND, "code_interpreter_id"));
            return DeleteResourceResponse { diagnostics };
        };

        let client = &provider_data.client;
        match client.code_interpreters().delete(&id).await {
            Ok(_) => {}
            Err(e) if e.is_not_found() => {
                tracing::warn!("Code interpreter {} already deleted", id);
                return DeleteResourceResponse { diagnostics };
            }
            Err(e) => {
                diagnostics.push(operation_error("deleting", KIND, &id, e));
                return DeleteResourceResponse { diagnostics };
            }
        }

        let timeouts = Timeouts::from_value(prior, Timeouts::default());
        let conf = StateChangeConf::new(&[ToolStatus::Deleting.as_str()], &[], timeouts.delete);
        let id_ref = id.as_str();
        if let Err(e) = conf
            .wait_for_state(&ctx, move || status_code_interpreter(client, id_ref))
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
impl ResourceWithConfigure for CodeInterpreterResource {
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
impl ResourceWithImportState for CodeInterpreterResource {
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
            AttributePath::new("code_interpreter_id"),
            &request,
            &mut response,
        );
        response
    }
}

#[cfg(test)]
#[path = "./code_interpreter_test.rs"]
mod code_interpreter_test;
