//! Memory resource

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
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use tfplug::validator::NumberRangeValidator;

use super::{
    client_token, missing_identity, not_configured, operation_error, removed_from_state,
    wait_error,
};
use crate::api::memory::{CreateMemoryRequest, Memory, MemoryStatus, UpdateMemoryRequest};
use crate::api::{ApiError, Client};
use crate::flex::{get_i64, get_string, has_changes, resolve_unknowns, ObjectBuilder};
use crate::provider_data::AgentCoreProviderData;
use crate::retry::{retry_when_message_contains, IAM_PROPAGATION_MESSAGES, PROPAGATION_TIMEOUT};
use crate::timeouts::{self, Timeouts};
use crate::waiter::{PollOutcome, StateChangeConf};

const KIND: &str = "Memory";
const COMPUTED: &[&str] = &["arn", "id", "timeouts"];

#[derive(Default)]
pub struct MemoryResource {
    provider_data: Option<AgentCoreProviderData>,
}

impl MemoryResource {
    pub fn new() -> Self {
        Self::default()
    }
}

fn resource_schema() -> Schema {
    SchemaBuilder::new()
        .version(0)
        .description("Manages a Bedrock AgentCore memory")
        .attribute(
            AttributeBuilder::new("name", AttributeType::String)
                .required()
                .plan_modifier(RequiresReplaceIfChanged::create())
                .build(),
        )
        .attribute(
            AttributeBuilder::new("event_expiry_duration", AttributeType::Number)
                .description("Days short-term events are retained")
                .required()
                .validator(NumberRangeValidator::between(7.0, 365.0))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("encryption_key_arn", AttributeType::String)
                .optional()
                .plan_modifier(RequiresReplaceIfChanged::create())
                .build(),
        )
        .attribute(
            AttributeBuilder::new("memory_execution_role_arn", AttributeType::String)
                .description("Role used by strategies that invoke models")
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("description", AttributeType::String)
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("arn", AttributeType::String)
                .computed()
                .plan_modifier(UseStateForUnknown::create())
                .build(),
        )
        .attribute(
            AttributeBuilder::new("id", AttributeType::String)
                .computed()
                .plan_modifier(UseStateForUnknown::create())
                .build(),
        )
        .block(timeouts::block(true))
        .build()
}

fn flatten(base: &Dynamic, memory: &Memory) -> DynamicValue {
    ObjectBuilder::from_value(base)
        .set("arn", memory.arn.clone())
        .set("id", memory.id.clone())
        .set("name", memory.name.clone())
        .number("event_expiry_duration", Some(memory.event_expiry_duration))
        .set("encryption_key_arn", memory.encryption_key_arn.clone())
        .set(
            "memory_execution_role_arn",
            memory.memory_execution_role_arn.clone(),
        )
        .set("description", memory.description.clone())
        .into_value()
}

pub(crate) async fn status_memory(
    client: &Client,
    id: &str,
) -> Result<PollOutcome<Memory>, ApiError> {
    PollOutcome::from_result(client.memories().get(id).await, |m| m.status.to_string())
}

pub(crate) fn failure_reason(memory: &Memory) -> Option<String> {
    memory.failure_reason.clone()
}

/// Waits until the memory settles in ACTIVE after a create or update
pub(crate) fn active_conf(pending: &[MemoryStatus], timeout: std::time::Duration) -> StateChangeConf {
    let pending: Vec<&str> = pending.iter().map(|s| s.as_str()).collect();
    StateChangeConf::new(&pending, &[MemoryStatus::Active.as_str()], timeout)
}

#[async_trait]
impl Resource for MemoryResource {
    fn type_name(&self) -> &str {
        "aws_bedrockagentcore_memory"
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
        if let Some(days) = request.config.value.get("event_expiry_duration").as_number() {
            if days.fract() != 0.0 {
                diagnostics.push(
                    Diagnostic::error(
                        "Invalid event_expiry_duration",
                        format!("event_expiry_duration must be a whole number of days, got {}", days),
                    )
                    .with_attribute(AttributePath::new("event_expiry_duration")),
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
        let name = get_string(planned, "name").unwrap_or_default();

        let input = CreateMemoryRequest {
            name: name.clone(),
            event_expiry_duration: get_i64(planned, "event_expiry_duration").unwrap_or_default(),
            description: get_string(planned, "description"),
            encryption_key_arn: get_string(planned, "encryption_key_arn"),
            memory_execution_role_arn: get_string(planned, "memory_execution_role_arn"),
            client_token: client_token(),
        };
        let client = &provider_data.client;
        let input_ref = &input;
        let created = match retry_when_message_contains(
            PROPAGATION_TIMEOUT,
            IAM_PROPAGATION_MESSAGES,
            move || async move { client.memories().create(input_ref).await },
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

        let id = created.id.clone();
        tracing::debug!("Created memory {} ({})", name, id);

        let timeouts = Timeouts::from_value(planned, Timeouts::default());
        let conf = active_conf(&[MemoryStatus::Creating], timeouts.create);
        let id_ref = id.as_str();
        match conf
            .wait_for_state(&ctx, move || status_memory(client, id_ref))
            .await
        {
            Ok(Some(memory)) => CreateResourceResponse {
                new_state: flatten(planned, &memory),
                diagnostics,
            },
            result => {
                if let Err(e) = &result {
                    diagnostics.push(wait_error("creation", KIND, &id, e, failure_reason));
                }
                let partial = ObjectBuilder::from_value(planned)
                    .set("arn", created.arn.clone())
                    .set("id", id.clone())
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
        let Some(id) = get_string(state, "id") else {
            diagnostics.push(missing_identity(KIND, "id"));
            return ReadResourceResponse {
                new_state: Some(request.current_state),
                diagnostics,
            };
        };

        match provider_data.client.memories().get(&id).await {
            Ok(memory) => ReadResourceResponse {
                new_state: Some(flatten(state, &memory)),
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
        let id = get_string(prior, "id").unwrap_or_default();
        let carried = ObjectBuilder::from_value(planned)
            .set("arn", prior.get("arn").clone())
            .set("id", id.clone());

        if !has_changes(&resource_schema().block, prior, planned, COMPUTED) {
            return UpdateResourceResponse {
                new_state: carried.into_value(),
                diagnostics,
            };
        }

        let input = UpdateMemoryRequest {
            description: get_string(planned, "description"),
            event_expiry_duration: get_i64(planned, "event_expiry_duration"),
            memory_execution_role_arn: get_string(planned, "memory_execution_role_arn"),
            memory_strategies: None,
            client_token: client_token(),
        };
        let client = &provider_data.client;
        if let Err(e) = client.memories().update(&id, &input).await {
            diagnostics.push(operation_error("updating", KIND, &id, e));
            return UpdateResourceResponse {
                new_state: request.prior_state,
                diagnostics,
            };
        }

        let timeouts = Timeouts::from_value(planned, Timeouts::default());
        let conf = active_conf(
            &[MemoryStatus::Creating, MemoryStatus::Updating],
            timeouts.update,
        );
        let id_ref = id.as_str();
        match conf
            .wait_for_state(&ctx, move || status_memory(client, id_ref))
            .await
        {
            Ok(Some(memory)) => UpdateResourceResponse {
                new_state: flatten(planned, &memory),
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
        let Some(id) = get_string(prior, "id") else {
            diagnostics.push(missing_identity(KIND, "id"));
            return DeleteResourceResponse { diagnostics };
        };

        let client = &provider_data.client;
        match client.memories().delete(&id, &client_token()).await {
            Ok(_) => {}
            Err(e) if e.is_not_found() => {
                tracing::warn!("Memory {} already deleted", id);
                return DeleteResourceResponse { diagnostics };
            }
            Err(e) => {
                diagnostics.push(operation_error("deleting", KIND, &id, e));
                return DeleteResourceResponse { diagnostics };
            }
        }

        let timeouts = Timeouts::from_value(prior, Timeouts::default());
        let conf = StateChangeConf::new(&[MemoryStatus::Deleting.as_str()], &[], timeouts.delete);
        let id_ref = id.as_str();
        if let Err(e) = conf
            .wait_for_state(&ctx, move || status_memory(client, id_ref))
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
impl ResourceWithConfigure for MemoryResource {
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
impl ResourceWithImportState for MemoryResource {
    async fn import_state(
        &self,
        ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let mut response = ImportResourceStateResponse {
            imported_resources: vec![],
            diagnostics: vec![],
        };
        import_state_passthrough_id(&ctx, AttributePath::new("id"), &request, &mut response);
        response
    }
}

#[cfg(test)]
#[path = "./memory_test.rs"]
mod memory_test;
