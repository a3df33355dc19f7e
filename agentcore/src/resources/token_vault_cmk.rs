//! Customer managed key for a token vault
//!
//! The vault itself always exists. Creating this resource points it at a KMS
//! key and destroying it hands encryption back to the service managed key.

use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::defaults::StaticDefault;
use tfplug::import::import_state_passthrough_id;
use tfplug::plan_modifier::RequiresReplaceIfChanged;
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse,
    ImportResourceStateRequest, ImportResourceStateResponse, ReadResourceRequest,
    ReadResourceResponse, Resource, ResourceSchemaRequest, ResourceSchemaResponse,
    ResourceWithConfigure, ResourceWithImportState, UpdateResourceRequest,
    UpdateResourceResponse, ValidateResourceConfigRequest, ValidateResourceConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, NestedBlockBuilder, Schema, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use tfplug::validator::StringOneOfValidator;

use super::{missing_identity, not_configured, operation_error, removed_from_state};
use crate::api::identity::{KmsConfiguration, TokenVault};
use crate::flex::{first_block, get_string, require_string, ObjectBuilder};
use crate::provider_data::AgentCoreProviderData;

const KIND: &str = "Token Vault CMK";
const DEFAULT_VAULT: &str = "default";
const CUSTOMER_MANAGED: &str = "CustomerManagedKey";
const SERVICE_MANAGED: &str = "ServiceManagedKey";

#[derive(Default)]
pub struct TokenVaultCmkResource {
    provider_data: Option<AgentCoreProviderData>,
}

impl TokenVaultCmkResource {
    pub fn new() -> Self {
        Self::default()
    }
}

fn resource_schema() -> Schema {
    SchemaBuilder::new()
        .version(0)
        .description("Manages the KMS key that encrypts a Bedrock AgentCore token vault")
        .attribute(
            AttributeBuilder::new("token_vault_id", AttributeType::String)
                .optional()
                .computed()
                .default(StaticDefault::string(DEFAULT_VAULT))
                .plan_modifier(RequiresReplaceIfChanged::create())
                .build(),
        )
        .block(
            NestedBlockBuilder::new("kms_configuration")
                .min_items(1)
                .max_items(1)
                .attribute(
                    AttributeBuilder::new("key_type", AttributeType::String)
                        .required()
                        .validator(StringOneOfValidator::create(&[
                            CUSTOMER_MANAGED,
                            SERVICE_MANAGED,
                        ]))
                        .build(),
                )
                .attribute(
                    AttributeBuilder::new("kms_key_arn", AttributeType::String)
                        .optional()
                        .build(),
                )
                .build(),
        )
        .build()
}

fn validate_kms(config: &Dynamic) -> Vec<Diagnostic> {
    let Some(kms) = first_block(config, "kms_configuration") else {
        return vec![];
    };
    let arn = kms.get("kms_key_arn");
    if arn.is_unknown() {
        return vec![];
    }
    let path = AttributePath::new("kms_configuration")
        .index(0)
        .attribute("kms_key_arn");

    match get_string(kms, "key_type").as_deref() {
        Some(CUSTOMER_MANAGED) if arn.is_null() => vec![Diagnostic::error(
            "Missing kms_key_arn",
            "kms_key_arn is required when key_type is CustomerManagedKey",
        )
        .with_attribute(path)],
        Some(SERVICE_MANAGED) if !arn.is_null() => vec![Diagnostic::error(
            "Unexpected kms_key_arn",
            "kms_key_arn cannot be set when key_type is ServiceManagedKey",
        )
        .with_attribute(path)],
        _ => vec![],
    }
}

fn expand(value: &Dynamic) -> Result<KmsConfiguration, String> {
    let kms = first_block(value, "kms_configuration")
        .ok_or_else(|| "kms_configuration must be set".to_string())?;
    Ok(KmsConfiguration {
        key_type: require_string(kms, "key_type")?,
        kms_key_arn: get_string(kms, "kms_key_arn"),
    })
}

fn flatten(base: &Dynamic, vault: &TokenVault) -> DynamicValue {
    ObjectBuilder::from_value(base)
        .set("token_vault_id", vault.token_vault_id.clone())
        .block(
            "kms_configuration",
            vault.kms_configuration.as_ref().map(|kms| {
                ObjectBuilder::new()
                    .set("key_type", kms.key_type.clone())
                    .set("kms_key_arn", kms.kms_key_arn.clone())
                    .build()
            }),
        )
        .into_value()
}

impl TokenVaultCmkResource {
    async fn apply(
        &self,
        action: &str,
        planned: &Dynamic,
    ) -> Result<DynamicValue, Diagnostic> {
        let vault_id = get_string(planned, "token_vault_id").unwrap_or_else(|| DEFAULT_VAULT.to_string());
        let provider_data = self.provider_data.as_ref().ok_or_else(not_configured)?;
        let kms = expand(planned).map_err(|e| operation_error(action, KIND, &vault_id, e))?;

        let vault = provider_data
            .client
            .identity()
            .set_token_vault_cmk(&vault_id, &kms)
            .await
            .map_err(|e| operation_error(action, KIND, &vault_id, e))?;
        Ok(flatten(planned, &vault))
    }
}

#[async_trait]
impl Resource for TokenVaultCmkResource {
    fn type_name(&self) -> &str {
        "aws_bedrockagentcore_token_vault_cmk"
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
            diagnostics: validate_kms(&request.config.value),
        }
    }

    async fn create(&self, _ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        match self.apply("creating", &request.planned_state.value).await {
            Ok(new_state) => CreateResourceResponse {
                new_state,
                diagnostics: vec![],
            },
            Err(diagnostic) => CreateResourceResponse {
                new_state: DynamicValue::null(),
                diagnostics: vec![diagnostic],
            },
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
        let Some(vault_id) = get_string(state, "token_vault_id") else {
            diagnostics.push(missing_identity(KIND, "token_vault_id"));
            return ReadResourceResponse {
                new_state: Some(request.current_state),
                diagnostics,
            };
        };

        match provider_data.client.identity().get_token_vault(&vault_id).await {
            Ok(vault) => ReadResourceResponse {
                new_state: Some(flatten(state, &vault)),
                diagnostics,
            },
            Err(e) if e.is_not_found() => {
                removed_from_state(KIND, &vault_id);
                ReadResourceResponse {
                    new_state: None,
                    diagnostics,
                }
            }
            Err(e) => {
                diagnostics.push(operation_error("reading", KIND, &vault_id, e));
                ReadResourceResponse {
                    new_state: Some(request.current_state),
                    diagnostics,
                }
            }
        }
    }

    async fn update(&self, _ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        match self.apply("updating", &request.planned_state.value).await {
            Ok(new_state) => UpdateResourceResponse {
                new_state,
                diagnostics: vec![],
            },
            Err(diagnostic) => UpdateResourceResponse {
                new_state: request.prior_state,
                diagnostics: vec![diagnostic],
            },
        }
    }

    async fn delete(&self, _ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let mut diagnostics = vec![];

        let Some(provider_data) = &self.provider_data else {
            diagnostics.push(not_configured());
            return DeleteResourceResponse { diagnostics };
        };

        let vault_id = get_string(&request.prior_state.value, "token_vault_id")
            .unwrap_or_else(|| DEFAULT_VAULT.to_string());
        tracing::info!("Resetting token vault {} to the service managed key", vault_id);

        match provider_data
            .client
            .identity()
            .set_token_vault_cmk(&vault_id, &KmsConfiguration::service_managed())
            .await
        {
            Ok(_) => {}
            Err(e) if e.is_not_found() => {}
            Err(e) => diagnostics.push(operation_error("deleting", KIND, &vault_id, e)),
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
impl ResourceWithConfigure for TokenVaultCmkResource {
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
impl ResourceWithImportState for TokenVaultCmkResource {
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
            AttributePath::new("token_vault_id"),
            &request,
            &mut response,
        );
        response
    }
}
