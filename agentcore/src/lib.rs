//! Terraform provider for AWS Bedrock AgentCore
//!
//! `AgentCoreProvider` is the composition root: it owns the provider schema,
//! builds the signed control-plane client on configure and lists every
//! resource type in one registry.

pub mod api;
pub mod config;
pub mod flex;
pub mod logging;
pub mod provider_data;
pub mod resources;
pub mod retry;
pub mod timeouts;
pub mod waiter;

use async_trait::async_trait;
use std::sync::Arc;
use tfplug::context::Context;
use tfplug::provider::{
    ConfigureProviderRequest, ConfigureProviderResponse, Provider, ResourceFactory,
    ResourceRegistry,
};
use tfplug::resource::Resource;
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::validator::NumberRangeValidator;

use crate::api::Client;
use crate::config::{ProviderConfig, MAX_RETRIES};
use crate::provider_data::AgentCoreProviderData;
use crate::resources::*;

const RESOURCES: &[(&str, ResourceFactory)] = &[
    ("aws_bedrockagentcore_agent_runtime", factory::<AgentRuntimeResource>),
    ("aws_bedrockagentcore_agent_runtime_endpoint", factory::<AgentRuntimeEndpointResource>),
    ("aws_bedrockagentcore_api_key_credential_provider", factory::<ApiKeyCredentialProviderResource>),
    ("aws_bedrockagentcore_browser", factory::<BrowserResource>),
    ("aws_bedrockagentcore_code_interpreter", factory::<CodeInterpreterResource>),
    ("aws_bedrockagentcore_gateway", factory::<GatewayResource>),
    ("aws_bedrockagentcore_gateway_target", factory::<GatewayTargetResource>),
    ("aws_bedrockagentcore_memory", factory::<MemoryResource>),
    ("aws_bedrockagentcore_memory_strategy", factory::<MemoryStrategyResource>),
    ("aws_bedrockagentcore_oauth2_credential_provider", factory::<Oauth2CredentialProviderResource>),
    ("aws_bedrockagentcore_token_vault_cmk", factory::<TokenVaultCmkResource>),
    ("aws_bedrockagentcore_workload_identity", factory::<WorkloadIdentityResource>),
];

fn factory<R: Resource + Default + 'static>() -> Box<dyn Resource> {
    Box::new(R::default())
}

#[derive(Default)]
pub struct AgentCoreProvider {
    client: Option<Client>,
}

impl AgentCoreProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Skips credential resolution on configure and uses `client` instead
    pub fn with_client(client: Client) -> Self {
        Self {
            client: Some(client),
        }
    }

    fn provider_schema() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("AWS Bedrock AgentCore")
            .attribute(
                AttributeBuilder::new("region", AttributeType::String)
                    .description("AWS region; defaults to AWS_REGION or AWS_DEFAULT_REGION")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("profile", AttributeType::String)
                    .description("Shared config profile; defaults to AWS_PROFILE")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("endpoint", AttributeType::String)
                    .description("Control-plane URL override; defaults to AGENTCORE_ENDPOINT")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("max_retries", AttributeType::Number)
                    .description("Retries for throttled or unavailable responses")
                    .optional()
                    .validator(NumberRangeValidator::between(0.0, f64::from(MAX_RETRIES)))
                    .build(),
            )
            .build()
    }
}

#[async_trait]
impl Provider for AgentCoreProvider {
    fn type_name(&self) -> &str {
        "aws"
    }

    async fn schema(&self, _ctx: Context) -> Schema {
        Self::provider_schema()
    }

    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse {
        logging::init();

        let client = match self.client.clone() {
            Some(client) => client,
            None => {
                let config = match ProviderConfig::from_config(&request.config.value) {
                    Ok(config) => config,
                    Err(diagnostics) => {
                        return ConfigureProviderResponse {
                            diagnostics,
                            provider_data: None,
                        }
                    }
                };
                match config.build_client().await {
                    Ok(client) => client,
                    Err(diagnostic) => {
                        return ConfigureProviderResponse {
                            diagnostics: vec![diagnostic],
                            provider_data: None,
                        }
                    }
                }
            }
        };

        tracing::info!("Bedrock AgentCore provider configured");
        ConfigureProviderResponse {
            diagnostics: vec![],
            provider_data: Some(Arc::new(AgentCoreProviderData::new(client))),
        }
    }

    fn resources(&self) -> ResourceRegistry {
        let mut registry = ResourceRegistry::new();
        for (type_name, factory) in RESOURCES {
            if let Err(e) = registry.register(type_name, *factory) {
                tracing::error!("{}", e);
            }
        }
        registry
    }
}
