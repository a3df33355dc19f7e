//! API key credential provider
//!
//! The key comes either from `api_key`, which is stored in state, or from the
//! write-only `api_key_wo`, which never is. A write-only key cannot be diffed,
//! so `api_key_wo_version` must be bumped to push a new one.

use async_trait::async_trait;
use std::collections::HashMap;
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

use super::{missing_identity, not_configured, operation_error, removed_from_state};
use crate::api::identity::{ApiKeyCredentialProvider, ApiKeyCredentialProviderRequest};
use crate::api::ApiError;
use crate::flex::{get_i64, get_non_empty, get_string, ObjectBuilder};
use crate::provider_data::AgentCoreProviderData;

const KIND: &str = "API Key Credential Provider";

#[derive(Default)]
pub struct ApiKeyCredentialProviderResource {
    provider_data: Option<AgentCoreProviderData>,
}

impl ApiKeyCredentialProviderResource {
    pub fn new() -> Self {
        Self::default()
    }
}

/// `[{secret_arn}]`, shared with the OAuth2 provider's client secret
pub(crate) fn secret_arn_type() -> AttributeType {
    AttributeType::List(Box::new(AttributeType::Object(HashMap::from([(
        "secret_arn".to_string(),
        AttributeType::String,
    )]))))
}

fn resource_schema() -> Schema {
    SchemaBuilder::new()
        .version(0)
        .description("Manages a Bedrock AgentCore API key credential provider")
        .attribute(
            AttributeBuilder::new("name", AttributeType::String)
                .required()
                .plan_modifier(RequiresReplaceIfChanged::create())
                .build(),
        )
        .attribute(
            AttributeBuilder::new("api_key", AttributeType::String)
                .description("API key stored in state. Conflicts with api_key_wo")
                .optional()
                .sensitive()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("api_key_wo", AttributeType::String)
                .description("API key that is never persisted. Conflicts with api_key")
                .optional()
                .sensitive()
                .write_only()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("api_key_wo_version", AttributeType::Number)
                .description("Change to push a new api_key_wo")
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("credential_provider_arn", AttributeType::String)
                .computed()
                .plan_modifier(UseStateForUnknown::create())
                .build(),
        )
        .attribute(
            AttributeBuilder::new("api_key_secret_arn", secret_arn_type())
                .computed()
                .plan_modifier(UseStateForUnknown::create())
                .build(),
        )
        .build()
}

/// Checks that exactly one of `secret` and `write_only` is configured and
/// that the version counter only appears alongside the write-only field
pub(crate) fn validate_secret_source(
    config: &Dynamic,
    secret: &str,
    write_only: &str,
    version: &str,
) -> Vec<Diagnostic> {
    let (plain, wo) = (config.get(secret), config.get(write_only));
    if plain.is_unknown() || wo.is_unknown() {
        return vec![];
    }

    let mut diagnostics = vec![];
    match (plain.is_null(), wo.is_null()) {
        (false, false) => diagnostics.push(
            Diagnostic::error(
                "Conflicting configuration arguments",
                format!("Only one of {} or {} can be set", secret, write_only),
            )
            .with_attribute(AttributePath::new(write_only)),
        ),
        (true, true) => diagnostics.push(Diagnostic::error(
            "Missing required argument",
            format!("One of {} or {} must be set", secret, write_only),
        )),
        _ => {}
    }
    if wo.is_null() && !config.get(version).is_null() {
        diagnostics.push(
            Diagnostic::error(
                "Invalid configuration",
                format!("{} requires {}", version, write_only),
            )
            .with_attribute(AttributePath::new(version)),
        );
    }
    diagnostics
}

/// The secret to send: the write-only value from config, otherwise the plan's
pub(crate) fn secret_value(
    config: &Dynamic,
    planned: &Dynamic,
    secret: &str,
    write_only: &str,
) -> Option<String> {
    get_non_empty(config, write_only).or_else(|| get_non_empty(planned, secret))
}

fn flatten(base: &Dynamic, provider: &ApiKeyCredentialProvider) -> Dynamic {
    ObjectBuilder::from_value(base)
        .set("name", provider.name.clone())
        .set("credential_provider_arn", provider.credential_provider_arn.clone())
        .block(
            "api_key_secret_arn",
            provider.api_key_secret_arn.as_ref().map(|secret| {
                ObjectBuilder::new()
                    .set("secret_arn", secret.secret_arn.clone())
                    .build()
            }),
        )
        .set("api_key_wo", Dynamic::Null)
        .build()
}

/// Deleting a provider that is already gone reports AccessDenied
fn already_deleted(error: &ApiError) -> bool {
    match error {
        ApiError::NotFound { .. } => true,
        ApiError::AccessDenied { message } => message.contains("does not exist"),
        _ => false,
    }
}

#[async_trait]
impl Resource for ApiKeyCredentialProviderResource {
    fn type_name(&self) -> &str {
        "aws_bedrockagentcore_api_key_credential_provider"
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
            diagnostics: validate_secret_source(
                &request.config.value,
                "api_key",
                "api_key_wo",
                "api_key_wo_version",
            ),
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
        let name = get_string(planned, "name").unwrap_or_default();
        let Some(api_key) = secret_value(&request.config.value, planned, "api_key", "api_key_wo")
        else {
            diagnostics.push(operation_error(
                "creating",
                KIND,
                &name,
                "one of api_key or api_key_wo must be set",
            ));
            return CreateResourceResponse {
                new_state: DynamicValue::null(),
                diagnostics,
            };
        };

        let input = ApiKeyCredentialProviderRequest {
            name: name.clone(),
            api_key,
        };
        match provider_data
            .client
            .identity()
            .create_api_key_provider(&input)
            .await
        {
            Ok(provider) => CreateResourceResponse {
                new_state: DynamicValue::new(flatten(planned, &provider)),
                diagnostics,
            },
            Err(e) => {
                diagnostics.push(operation_error("creating", KIND, &name, e));
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

        match provider_data.client.identity().get_api_key_provider(&name).await {
            Ok(provider) => ReadResourceResponse {
                new_state: Some(DynamicValue::new(flatten(state, &provider))),
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

        let prior = &request.prior_state.value;
        let planned = &request.planned_state.value;
        let name = get_string(planned, "name").unwrap_or_default();

        let key_changed = get_string(prior, "api_key") != get_string(planned, "api_key");
        let version_changed =
            get_i64(prior, "api_key_wo_version") != get_i64(planned, "api_key_wo_version");
        if !key_changed && !version_changed {
            let new_state = ObjectBuilder::from_value(planned)
                .set("credential_provider_arn", prior.get("credential_provider_arn").clone())
                .set("api_key_secret_arn", prior.get("api_key_secret_arn").clone())
                .into_value();
            return UpdateResourceResponse {
                new_state,
                diagnostics,
            };
        }

        let Some(api_key) = secret_value(&request.config.value, planned, "api_key", "api_key_wo")
        else {
            diagnostics.push(operation_error(
                "updating",
                KIND,
                &name,
                "one of api_key or api_key_wo must be set",
            ));
            return UpdateResourceResponse {
                new_state: request.prior_state,
                diagnostics,
            };
        };

        tracing::debug!("Rotating key for credential provider {}", name);
        let input = ApiKeyCredentialProviderRequest {
            name: name.clone(),
            api_key,
        };
        match provider_data
            .client
            .identity()
            .update_api_key_provider(&input)
            .await
        {
            Ok(provider) => UpdateResourceResponse {
                new_state: DynamicValue::new(flatten(planned, &provider)),
                diagnostics,
            },
            Err(e) => {
                diagnostics.push(operation_error("updating", KIND, &name, e));
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

        match provider_data.client.identity().delete_api_key_provider(&name).await {
            Ok(()) => {}
            Err(e) if already_deleted(&e) => {
                tracing::warn!("API key credential provider {} already deleted", name);
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
impl ResourceWithConfigure for ApiKeyCredentialProviderResource {
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
impl ResourceWithImportState for ApiKeyCredentialProviderResource {
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

#[cfg(test)]
#[path = "./api_key_credential_provider_test.rs"]
mod api_key_credential_provider_test;
