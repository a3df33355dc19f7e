//! Browser resource, plus the network handling it shares with code interpreters
//!
//! Browsers cannot be modified in place; every argument forces replacement,
//! so update only ever sees a timeouts change.

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

use super::agent_runtime::{expand_vpc, flatten_vpc, vpc_block};
use super::{
    client_token, missing_identity, not_configured, operation_error, removed_from_state,
    wait_error,
};
use crate::api::browser::{
    Browser, CreateBrowserRequest, RecordingConfig, RecordingLocation, ToolNetworkConfiguration,
    ToolStatus,
};
use crate::api::{ApiError, Client};
use crate::flex::{first_block, get_bool, get_string, require_string, resolve_unknowns, ObjectBuilder};
use crate::provider_data::AgentCoreProviderData;
use crate::timeouts::{self, Timeouts};
use crate::waiter::{PollOutcome, StateChangeConf};

const KIND: &str = "Browser";

#[derive(Default)]
pub struct BrowserResource {
    provider_data: Option<AgentCoreProviderData>,
}

impl BrowserResource {
    pub fn new() -> Self {
        Self::default()
    }
}

fn replaced_string(name: &str) -> AttributeBuilder {
    AttributeBuilder::new(name, AttributeType::String).plan_modifier(RequiresReplaceIfChanged::create())
}

/// Attributes common to browsers and code interpreters
pub(crate) fn tool_schema(description: &str, id: &str, arn: &str, modes: &[&str]) -> SchemaBuilder {
    SchemaBuilder::new()
        .version(0)
        .description(description)
        .attribute(replaced_string("name").required().build())
        .attribute(replaced_string("description").optional().build())
        .attribute(
            replaced_string("execution_role_arn")
                .description("Role the tool assumes for outbound calls")
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new(id, AttributeType::String)
                .computed()
                .plan_modifier(UseStateForUnknown::create())
                .build(),
        )
        .attribute(
            AttributeBuilder::new(arn, AttributeType::String)
                .computed()
                .plan_modifier(UseStateForUnknown::create())
                .build(),
        )
        .block(network_block(modes))
        .block(timeouts::block(false))
}

fn network_block(modes: &[&str]) -> NestedBlock {
    NestedBlockBuilder::new("network_configuration")
        .min_items(1)
        .max_items(1)
        .plan_modifier(RequiresReplaceIfChanged::create())
        .attribute(
            AttributeBuilder::new("network_mode", AttributeType::String)
                .required()
                .validator(StringOneOfValidator::create(modes))
                .build(),
        )
        .block(vpc_block("vpc_config"))
        .build()
}

fn resource_schema() -> Schema {
    tool_schema(
        "Manages a Bedrock AgentCore browser",
        "browser_id",
        "browser_arn",
        &["PUBLIC", "VPC"],
    )
    .block(
        NestedBlockBuilder::new("recording")
            .description("Session recording to S3")
            .max_items(1)
            .plan_modifier(RequiresReplaceIfChanged::create())
            .attribute(
                AttributeBuilder::new("enabled", AttributeType::Bool)
                    .optional()
                    .build(),
            )
            .block(
                NestedBlockBuilder::new("s3_location")
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
                    .build(),
            )
            .build(),
    )
    .build()
}

pub(crate) fn validate_network(config: &Dynamic) -> Vec<Diagnostic> {
    let Some(network) = first_block(config, "network_configuration") else {
        return vec![];
    };
    if get_string(network, "network_mode").as_deref() == Some("VPC")
        && first_block(network, "vpc_config").is_none()
        && !network.get("vpc_config").is_unknown()
    {
        return vec![Diagnostic::error(
            "Missing vpc_config",
            "vpc_config is required when network_mode is VPC",
        )
        .with_attribute(AttributePath::new("network_configuration"))];
    }
    vec![]
}

pub(crate) fn expand_network(value: &Dynamic) -> Result<ToolNetworkConfiguration, String> {
    let network = first_block(value, "network_configuration")
        .ok_or_else(|| "network_configuration must be set".to_string())?;
    Ok(ToolNetworkConfiguration {
        network_mode: require_string(network, "network_mode")?,
        vpc_config: first_block(network, "vpc_config").map(expand_vpc),
    })
}

pub(crate) fn flatten_network(network: &ToolNetworkConfiguration) -> Dynamic {
    ObjectBuilder::new()
        .set("network_mode", network.network_mode.clone())
        .block("vpc_config", network.vpc_config.as_ref().map(flatten_vpc))
        .build()
}

/// A tool reported as DELETED is gone
pub(crate) fn tool_outcome<T>(
    result: Result<T, ApiError>,
    status: impl Fn(&T) -> ToolStatus,
) -> Result<PollOutcome<T>, ApiError> {
    match PollOutcome::from_result(result, |t| status(t).to_string())? {
        PollOutcome::Found { status, .. } if status == ToolStatus::Deleted.as_str() => {
            Ok(PollOutcome::Gone)
        }
        outcome => Ok(outcome),
    }
}

fn expand_recording(value: &Dynamic) -> Option<RecordingConfig> {
    let recording = first_block(value, "recording")?;
    Some(RecordingConfig {
        enabled: get_bool(recording, "enabled").unwrap_or(false),
        s3_location: first_block(recording, "s3_location").map(|s3| RecordingLocation {
            bucket: get_string(s3, "bucket").unwrap_or_default(),
            prefix: get_string(s3, "prefix").unwrap_or_default(),
        }),
    })
}

fn flatten(base: &Dynamic, browser: &Browser) -> DynamicValue {
    ObjectBuilder::from_value(base)
        .set("browser_id", browser.browser_id.clone())
        .set("browser_arn", browser.browser_arn.clone())
        .set("name", browser.name.clone())
        .set("description", browser.description.clone())
        .set("execution_role_arn", browser.execution_role_arn.clone())
        .block(
            "network_configuration",
            browser.network_configuration.as_ref().map(flatten_network),
        )
        .block(
            "recording",
            browser.recording.as_ref().map(|r| {
                ObjectBuilder::new()
                    .set("enabled", r.enabled)
                    .block(
                        "s3_location",
                        r.s3_location.as_ref().map(|s3| {
                            ObjectBuilder::new()
                                .set("bucket", s3.bucket.clone())
                                .set("prefix", s3.prefix.clone())
                                .build()
                        }),
                    )
                    .build()
            }),
        )
        .into_value()
}

async fn status_browser(client: &Client, id: &str) -> Result<PollOutcome<Browser>, ApiError> {
    tool_outcome(client.browsers().get(id).await, |b| b.status)
}

fn failure_reason(browser: &Browser) -> Option<String> {
    browser.failure_reason.clone()
}

#[async_trait]
impl Resource for BrowserResource {
    fn type_name(&self) -> &str {
        "aws_bedrockagentcore_browser"
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

        let input = CreateBrowserRequest {
            name: name.clone(),
            network_configuration,
            description: get_string(planned, "description"),
            execution_role_arn: get_string(planned, "execution_role_arn"),
            recording: expand_recording(planned),
            client_token: client_token(),
        };
        let client = &provider_data.client;
        let created = match client.browsers().create(&input).await {
            Ok(created) => created,
            Err(e) => {
                diagnostics.push(operation_error("creating", KIND, &name, e));
                return CreateResourceResponse {
                    new_state: DynamicValue::null(),
                    diagnostics,
                };
            }
        };

        let id = created.browser_id.clone();
        let timeouts = Timeouts::from_value(planned, Timeouts::default());
        let conf = StateChangeConf::new(
            &[ToolStatus::Creating.as_str()],
            &[ToolStatus::Ready.as_str()],
            timeouts.create,
        );
        let id_ref = id.as_str();
        match conf
            .wait_for_state(&ctx, move || status_browser(client, id_ref))
            .await
        {
            Ok(Some(browser)) => CreateResourceResponse {
                new_state: flatten(planned, &browser),
                diagnostics,
            },
            result => {
                if let Err(e) = &result {
                    diagnostics.push(wait_error("creation", KIND, &id, e, failure_reason));
                }
                let partial = ObjectBuilder::from_value(planned)
                    .set("browser_id", id.clone())
                    .set("browser_arn", created.browser_arn.clone())
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
        let Some(id) = get_string(state, "browser_id") else {
            diagnostics.push(missing_identity(KIND, "browser_id"));
            return ReadResourceResponse {
                new_state: Some(request.current_state),
                diagnostics,
            };
        };

        match status_browser(&provider_data.client, &id).await {
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
            .set("browser_id", prior.get("browser_id").clone())
            .set("browser_arn", prior.get("browser_arn").clone())
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
        let Some(id) = get_string(prior, "browser_id") else {
            diagnostics.push(missing_identity(KIND, "browser_id"));
            return DeleteResourceResponse { diagnostics };
        };

        let client = &provider_data.client;
        match client.browsers().delete(&id).await {
            Ok(_) => {}
            Err(e) if e.is_not_found() => {
                tracing::warn!("Browser {} already deleted", id);
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
            .wait_for_state(&ctx, move || status_browser(client, id_ref))
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
impl ResourceWithConfigure for BrowserResource {
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
impl ResourceWithImportState for BrowserResource {
    async fn import_state(
        &self,
        ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let mut response = ImportResourceStateResponse {
            imported_resources: vec![],
            diagnostics: vec![],
        };
        import_state_passthrough_id(&ctx, AttributePath::new("browser_id"), &request, &mut response);
        response
    }
}

#[cfg(test)]
#[path = "./browser_test.rs"]
mod browser_test;
