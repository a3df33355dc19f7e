//! OAuth2 credential provider
//!
//! `oauth2_provider_config` holds exactly one vendor block. The block name
//! picks the wire variant and must agree with `credential_provider_vendor`.

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
use tfplug::validator::StringOneOfValidator;

use super::api_key_credential_provider::{secret_arn_type, secret_value, validate_secret_source};
use super::{missing_identity, not_configured, operation_error, removed_from_state};
use crate::api::identity::{
    AuthorizationServerMetadata, Oauth2ClientConfig, Oauth2CredentialProvider,
    Oauth2CredentialProviderRequest, Oauth2Discovery, Oauth2ProviderConfig, OAUTH2_VENDORS,
};
use crate::api::ApiError;
use crate::flex::{
    exactly_one_block, first_block, get_string, get_strings, has_changes, require_string, variant,
    ObjectBuilder,
};
use crate::provider_data::AgentCoreProviderData;

const KIND: &str = "OAuth2 Credential Provider";

const COMPUTED: &[&str] = &["credential_provider_arn", "callback_url", "client_secret_arn"];

#[derive(Default)]
pub struct Oauth2CredentialProviderResource {
    provider_data: Option<AgentCoreProviderData>,
}

impl Oauth2CredentialProviderResource {
    pub fn new() -> Self {
        Self::default()
    }
}

fn kinds() -> Vec<&'static str> {
    OAUTH2_VENDORS.iter().map(|(kind, _)| *kind).collect()
}

fn vendor_for(kind: &str) -> Option<&'static str> {
    OAUTH2_VENDORS
        .iter()
        .find(|(k, _)| *k == kind)
        .map(|(_, vendor)| *vendor)
}

fn discovery_block() -> NestedBlock {
    NestedBlockBuilder::new("oauth_discovery")
        .description("Either discovery_url or authorization_server_metadata")
        .max_items(1)
        .attribute(
            AttributeBuilder::new("discovery_url", AttributeType::String)
                .optional()
                .build(),
        )
        .block(
            NestedBlockBuilder::new("authorization_server_metadata")
                .max_items(1)
                .attribute(
                    AttributeBuilder::new("issuer", AttributeType::String)
                        .required()
                        .build(),
                )
                .attribute(
                    AttributeBuilder::new("authorization_endpoint", AttributeType::String)
                        .required()
                        .build(),
                )
                .attribute(
                    AttributeBuilder::new("token_endpoint", AttributeType::String)
                        .required()
                        .build(),
                )
                .attribute(
                    AttributeBuilder::new(
                        "response_types",
                        AttributeType::Set(Box::new(AttributeType::String)),
                    )
                    .optional()
                    .build(),
                )
                .build(),
        )
        .build()
}

fn client_block(kind: &str) -> NestedBlock {
    let mut builder = NestedBlockBuilder::new(kind)
        .max_items(1)
        .attribute(
            AttributeBuilder::new("client_id", AttributeType::String)
                .required()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("client_secret", AttributeType::String)
                .optional()
                .sensitive()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("client_secret_wo", AttributeType::String)
                .description("Client secret that is never persisted")
                .optional()
                .sensitive()
                .write_only()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("client_secret_wo_version", AttributeType::Number)
                .optional()
                .build(),
        );
    match kind {
        "custom" => builder = builder.block(discovery_block()),
        "microsoft" => {
            builder = builder.attribute(
                AttributeBuilder::new("tenant_id", AttributeType::String)
                    .optional()
                    .build(),
            )
        }
        _ => {}
    }
    builder.build()
}

fn resource_schema() -> Schema {
    let vendors: Vec<&str> = OAUTH2_VENDORS.iter().map(|(_, vendor)| *vendor).collect();
    let config = kinds().into_iter().fold(
        NestedBlockBuilder::new("oauth2_provider_config")
            .min_items(1)
            .max_items(1),
        |builder, kind| builder.block(client_block(kind)),
    );

    SchemaBuilder::new()
        .version(0)
        .description("Manages a Bedrock AgentCore OAuth2 credential provider")
        .attribute(
            AttributeBuilder::new("name", AttributeType::String)
                .required()
                .plan_modifier(RequiresReplaceIfChanged::create())
                .build(),
        )
        .attribute(
            AttributeBuilder::new("credential_provider_vendor", AttributeType::String)
                .required()
                .validator(StringOneOfValidator::create(&vendors))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("credential_provider_arn", AttributeType::String)
                .computed()
                .plan_modifier(UseStateForUnknown::create())
                .build(),
        )
        .attribute(
            AttributeBuilder::new("callback_url", AttributeType::String)
                .description("Redirect URL to register with the identity provider")
                .computed()
                .plan_modifier(UseStateForUnknown::create())
                .build(),
        )
        .attribute(
            AttributeBuilder::new("client_secret_arn", secret_arn_type())
                .computed()
                .plan_modifier(UseStateForUnknown::create())
                .build(),
        )
        .block(config.build())
        .build()
}

/// The configured vendor block name, e.g. "github"
fn provider_kind(value: &Dynamic) -> Option<&'static str> {
    let kinds = kinds();
    first_block(value, "oauth2_provider_config").and_then(|root| variant(root, &kinds))
}

fn validate_config(config: &Dynamic) -> Vec<Diagnostic> {
    let mut diagnostics = vec![];
    let Some(root) = first_block(config, "oauth2_provider_config") else {
        return diagnostics;
    };
    let root_path = AttributePath::new("oauth2_provider_config").index(0);

    if !exactly_one_block(root, &kinds()) {
        diagnostics.push(
            Diagnostic::error(
                "Invalid oauth2_provider_config",
                format!("Exactly one of {} must be set", kinds().join(", ")),
            )
            .with_attribute(root_path),
        );
        return diagnostics;
    }
    let Some(kind) = provider_kind(config) else {
        return diagnostics;
    };
    let Some(block) = first_block(root, kind) else {
        return diagnostics;
    };
    let block_path = root_path.attribute(kind);

    let vendor = config.get("credential_provider_vendor");
    if let (Some(vendor), Some(expected)) = (vendor.as_string(), vendor_for(kind)) {
        if vendor != expected {
            diagnostics.push(
                Diagnostic::error(
                    "Mismatched credential provider vendor",
                    format!(
                        "credential_provider_vendor is {} but the {} block requires {}",
                        vendor, kind, expected
                    ),
                )
                .with_attribute(AttributePath::new("credential_provider_vendor")),
            );
        }
    }

    diagnostics.extend(
        validate_secret_source(block, "client_secret", "client_secret_wo", "client_secret_wo_version")
            .into_iter()
            .map(|d| d.with_attribute(block_path.clone())),
    );

    if kind == "custom" {
        let discovery = block.get("oauth_discovery");
        let valid = match first_block(block, "oauth_discovery") {
            Some(d) => exactly_one_set(d),
            None => discovery.is_unknown(),
        };
        if !valid {
            diagnostics.push(
                Diagnostic::error(
                    "Invalid oauth_discovery",
                    "custom providers need oauth_discovery with exactly one of discovery_url or authorization_server_metadata",
                )
                .with_attribute(block_path.attribute("oauth_discovery")),
            );
        }
    }

    diagnostics
}

fn exactly_one_set(discovery: &Dynamic) -> bool {
    let url = discovery.get("discovery_url");
    if url.is_unknown() {
        return true;
    }
    let metadata = first_block(discovery, "authorization_server_metadata").is_some();
    url.is_null() == metadata
}

fn expand_discovery(value: &Dynamic) -> Result<Oauth2Discovery, String> {
    if let Some(url) = get_string(value, "discovery_url") {
        return Ok(Oauth2Discovery::DiscoveryUrl(url));
    }
    let metadata = first_block(value, "authorization_server_metadata")
        .ok_or_else(|| "oauth_discovery needs discovery_url or authorization_server_metadata".to_string())?;
    Ok(Oauth2Discovery::AuthorizationServerMetadata(AuthorizationServerMetadata {
        issuer: require_string(metadata, "issuer")?,
        authorization_endpoint: require_string(metadata, "authorization_endpoint")?,
        token_endpoint: require_string(metadata, "token_endpoint")?,
        response_types: get_strings(metadata, "response_types"),
    }))
}

fn flatten_discovery(discovery: &Oauth2Discovery) -> Dynamic {
    match discovery {
        Oauth2Discovery::DiscoveryUrl(url) => ObjectBuilder::new()
            .set("discovery_url", url.clone())
            .block("authorization_server_metadata", None)
            .build(),
        Oauth2Discovery::AuthorizationServerMetadata(m) => ObjectBuilder::new()
            .set("discovery_url", Dynamic::Null)
            .block(
                "authorization_server_metadata",
                Some(
                    ObjectBuilder::new()
                        .set("issuer", m.issuer.clone())
                        .set("authorization_endpoint", m.authorization_endpoint.clone())
                        .set("token_endpoint", m.token_endpoint.clone())
                        .strings("response_types", m.response_types.clone())
                        .build(),
                ),
            )
            .build(),
    }
}

/// Builds the request from the plan, taking write-only secrets from config
fn expand_request(config: &Dynamic, planned: &Dynamic) -> Result<Oauth2CredentialProviderRequest, String> {
    let kind = provider_kind(planned).ok_or_else(|| "oauth2_provider_config must be set".to_string())?;
    let block = first_block(planned, "oauth2_provider_config")
        .and_then(|root| first_block(root, kind))
        .ok_or_else(|| format!("{} must be set", kind))?;
    let null = Dynamic::Null;
    let config_block = first_block(config, "oauth2_provider_config")
        .and_then(|root| first_block(root, kind))
        .unwrap_or(&null);

    let client = Oauth2ClientConfig {
        oauth_discovery: first_block(block, "oauth_discovery")
            .map(expand_discovery)
            .transpose()?,
        client_id: require_string(block, "client_id")?,
        client_secret: secret_value(config_block, block, "client_secret", "client_secret_wo"),
        tenant_id: get_string(block, "tenant_id"),
    };
    let provider_config = Oauth2ProviderConfig::from_kind(kind, client)
        .ok_or_else(|| format!("unsupported provider {}", kind))?;

    Ok(Oauth2CredentialProviderRequest {
        name: require_string(planned, "name")?,
        credential_provider_vendor: get_string(planned, "credential_provider_vendor")
            .unwrap_or_else(|| provider_config.vendor().to_string()),
        oauth2_provider_config_input: provider_config,
    })
}

fn flatten(base: &Dynamic, provider: &Oauth2CredentialProvider) -> DynamicValue {
    let mut builder = ObjectBuilder::from_value(base)
        .set("name", provider.name.clone())
        .set("credential_provider_arn", provider.credential_provider_arn.clone())
        .set("callback_url", provider.callback_url.clone())
        .block(
            "client_secret_arn",
            provider.client_secret_arn.as_ref().map(|secret| {
                ObjectBuilder::new()
                    .set("secret_arn", secret.secret_arn.clone())
                    .build()
            }),
        );
    if let Some(vendor) = &provider.credential_provider_vendor {
        builder = builder.set("credential_provider_vendor", vendor.clone());
    }

    // The secret never comes back, so it is kept from the prior value
    if let Some(output) = &provider.oauth2_provider_config_output {
        let kind = output.kind();
        let client = output.client();
        let prior = first_block(base, "oauth2_provider_config")
            .and_then(|root| first_block(root, kind))
            .cloned()
            .unwrap_or_else(|| ObjectBuilder::new().build());

        let mut block = ObjectBuilder::from_value(&prior)
            .set("client_id", client.client_id.clone())
            .set("client_secret_wo", Dynamic::Null);
        if kind == "microsoft" {
            block = block.set("tenant_id", client.tenant_id.clone());
        }
        if let Some(discovery) = &client.oauth_discovery {
            block = block.block("oauth_discovery", Some(flatten_discovery(discovery)));
        }

        let mut block = Some(block.build());
        let root = kinds().into_iter().fold(ObjectBuilder::new(), |root, k| {
            let value = if k == kind { block.take() } else { None };
            root.block(k, value)
        });
        builder = builder.block("oauth2_provider_config", Some(root.build()));
    }

    builder.into_value()
}

fn already_deleted(error: &ApiError) -> bool {
    match error {
        ApiError::NotFound { .. } => true,
        ApiError::AccessDenied { message } => message.contains("does not exist"),
        _ => false,
    }
}

#[async_trait]
impl Resource for Oauth2CredentialProviderResource {
    fn type_name(&self) -> &str {
        "aws_bedrockagentcore_oauth2_credential_provider"
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
            diagnostics: validate_config(&request.config.value),
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
        let input = match expand_request(&request.config.value, planned) {
            Ok(input) => input,
            Err(e) => {
                diagnostics.push(operation_error("creating", KIND, &name, e));
                return CreateResourceResponse {
                    new_state: DynamicValue::null(),
                    diagnostics,
                };
            }
        };

        match provider_data.client.identity().create_oauth2_provider(&input).await {
            Ok(provider) => CreateResourceResponse {
                new_state: flatten(planned, &provider),
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

        match provider_data.client.identity().get_oauth2_provider(&name).await {
            Ok(provider) => ReadResourceResponse {
                new_state: Some(flatten(state, &provider)),
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

        if !has_changes(&resource_schema().block, prior, planned, COMPUTED) {
            let new_state = COMPUTED
                .iter()
                .fold(ObjectBuilder::from_value(planned), |builder, key| {
                    builder.set(key, prior.get(key).clone())
                })
                .into_value();
            return UpdateResourceResponse {
                new_state,
                diagnostics,
            };
        }

        let input = match expand_request(&request.config.value, planned) {
            Ok(input) => input,
            Err(e) => {
                diagnostics.push(operation_error("updating", KIND, &name, e));
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    diagnostics,
                };
            }
        };

        match provider_data.client.identity().update_oauth2_provider(&input).await {
            Ok(provider) => UpdateResourceResponse {
                new_state: flatten(planned, &provider),
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

        match provider_data.client.identity().delete_oauth2_provider(&name).await {
            Ok(()) => {}
            Err(e) if already_deleted(&e) => {
                tracing::warn!("OAuth2 credential provider {} already deleted", name);
            }
            Err(e) => diagnostics.push(operation_error("deleting", KIND, &name, e)),
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
impl ResourceWithConfigure for Oauth2CredentialProviderResource {
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
impl ResourceWithModifyPlan for Oauth2CredentialProviderResource {
    async fn modify_plan(&self, _ctx: Context, request: ModifyPlanRequest) -> ModifyPlanResponse {
        let mut requires_replace = vec![];

        if !request.prior_state.is_null() && !request.proposed_new_state.is_null() {
            let prior = provider_kind(&request.prior_state.value);
            let planned = provider_kind(&request.proposed_new_state.value);
            if prior.is_some() && planned.is_some() && prior != planned {
                requires_replace.push(AttributePath::new("oauth2_provider_config"));
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
impl ResourceWithImportState for Oauth2CredentialProviderResource {
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
#[path = "./oauth2_credential_provider_test.rs"]
mod oauth2_credential_provider_test;
