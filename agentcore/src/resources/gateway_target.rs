//! Gateway target resource
//!
//! A target is a tool source behind a gateway: a Lambda function with an
//! inline or S3-hosted tool schema, or an OpenAPI/Smithy model. Two unions
//! live in its configuration (what the target is, and how the gateway
//! authenticates to it); switching either union's variant replaces the target.
//!
//! Tool schemas are recursive on the wire. The Terraform schema nests
//! `property` and `items` blocks two levels deep; below that a leaf carries
//! the remaining structure as JSON in `items_json` / `properties_json`.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tfplug::context::Context;
use tfplug::defaults::StaticDefault;
use tfplug::import::import_state_composite_id;
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
    AttributeBuilder, AttributeType, NestedBlock, NestedBlockBuilder, NestingMode, Schema,
    SchemaBuilder,
};
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use tfplug::validator::StringOneOfValidator;

use super::{
    client_token, missing_identity, not_configured, operation_error, removed_from_state,
    wait_error,
};
use crate::api::gateway::{
    ApiKeyCredentialProvider, ApiSchemaConfiguration, CreateGatewayTargetRequest,
    CredentialProvider, GatewayStatus, GatewayTarget, GatewayTargetSpec,
    McpLambdaTargetConfiguration, McpTargetConfiguration, OAuthCredentialProvider,
    S3Configuration, SchemaDefinition, TargetConfiguration, ToolDefinition, ToolSchema,
};
use crate::api::{ApiError, Client};
use crate::flex::{
    blocks, exactly_one_block, first_block, get_bool, get_non_empty, get_string, get_string_map,
    get_strings, has_changes, require_string, resolve_unknowns, variant, ObjectBuilder,
};
use crate::provider_data::AgentCoreProviderData;
use crate::timeouts::{self, Timeouts};
use crate::waiter::{PollOutcome, StateChangeConf};

const KIND: &str = "Gateway Target";
const CREDENTIAL_VARIANTS: &[&str] = &["api_key", "oauth", "gateway_iam_role"];
const MCP_VARIANTS: &[&str] = &["lambda", "open_api_schema", "smithy_model"];
const SOURCE_VARIANTS: &[&str] = &["inline_payload", "s3"];
const SCHEMA_TYPES: &[&str] = &["string", "number", "object", "array", "boolean", "integer"];
const COMPUTED: &[&str] = &["id", "timeouts"];
/// Depth at which tool schema blocks stop nesting and fall back to JSON
const LEAF_DEPTH: u8 = 2;

#[derive(Default)]
pub struct GatewayTargetResource {
    provider_data: Option<AgentCoreProviderData>,
}

impl GatewayTargetResource {
    pub fn new() -> Self {
        Self::default()
    }
}

fn resource_schema() -> Schema {
    SchemaBuilder::new()
        .version(0)
        .description("Manages a target of a Bedrock AgentCore gateway")
        .attribute(
            AttributeBuilder::new("gateway_identifier", AttributeType::String)
                .description("ID or ARN of the gateway")
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
            AttributeBuilder::new("description", AttributeType::String)
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("client_token", AttributeType::String)
                .description("Idempotency token for the create call")
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("id", AttributeType::String)
                .description("Target ID")
                .computed()
                .plan_modifier(UseStateForUnknown::create())
                .build(),
        )
        .block(credential_block())
        .block(target_block())
        .block(timeouts::block(true))
        .build()
}

fn credential_block() -> NestedBlock {
    NestedBlockBuilder::new("credential_provider_configuration")
        .description("How the gateway authenticates to the target")
        .min_items(1)
        .max_items(1)
        .block(
            NestedBlockBuilder::new("api_key")
                .max_items(1)
                .attribute(
                    AttributeBuilder::new("provider_arn", AttributeType::String)
                        .required()
                        .build(),
                )
                .attribute(
                    AttributeBuilder::new("credential_location", AttributeType::String)
                        .optional()
                        .validator(StringOneOfValidator::create(&["HEADER", "QUERY_PARAMETER"]))
                        .build(),
                )
                .attribute(
                    AttributeBuilder::new("credential_parameter_name", AttributeType::String)
                        .optional()
                        .build(),
                )
                .attribute(
                    AttributeBuilder::new("credential_prefix", AttributeType::String)
                        .optional()
                        .build(),
                )
                .build(),
        )
        .block(
            NestedBlockBuilder::new("oauth")
                .max_items(1)
                .attribute(
                    AttributeBuilder::new("provider_arn", AttributeType::String)
                        .required()
                        .build(),
                )
                .attribute(
                    AttributeBuilder::new(
                        "scopes",
                        AttributeType::Set(Box::new(AttributeType::String)),
                    )
                    .required()
                    .build(),
                )
                .attribute(
                    AttributeBuilder::new(
                        "custom_parameters",
                        AttributeType::Map(Box::new(AttributeType::String)),
                    )
                    .optional()
                    .build(),
                )
                .build(),
        )
        .block(NestedBlockBuilder::new("gateway_iam_role").max_items(1).build())
        .build()
}

fn target_block() -> NestedBlock {
    NestedBlockBuilder::new("target_configuration")
        .min_items(1)
        .max_items(1)
        .block(
            NestedBlockBuilder::new("mcp")
                .min_items(1)
                .max_items(1)
                .block(
                    NestedBlockBuilder::new("lambda")
                        .max_items(1)
                        .attribute(
                            AttributeBuilder::new("lambda_arn", AttributeType::String)
                                .required()
                                .build(),
                        )
                        .block(
                            NestedBlockBuilder::new("tool_schema")
                                .min_items(1)
                                .max_items(1)
                                .block(
                                    NestedBlockBuilder::new("inline_payload")
                                        .attribute(
                                            AttributeBuilder::new("name", AttributeType::String)
                                                .required()
                                                .build(),
                                        )
                                        .attribute(
                                            AttributeBuilder::new(
                                                "description",
                                                AttributeType::String,
                                            )
                                            .required()
                                            .build(),
                                        )
                                        .block(schema_definition_block("input_schema", 1))
                                        .block(schema_definition_block("output_schema", 0))
                                        .build(),
                                )
                                .block(s3_block())
                                .build(),
                        )
                        .build(),
                )
                .block(api_schema_block("open_api_schema"))
                .block(api_schema_block("smithy_model"))
                .build(),
        )
        .build()
}

fn s3_block() -> NestedBlock {
    NestedBlockBuilder::new("s3")
        .max_items(1)
        .attribute(
            AttributeBuilder::new("uri", AttributeType::String)
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("bucket_owner_account_id", AttributeType::String)
                .optional()
                .build(),
        )
        .build()
}

fn api_schema_block(name: &str) -> NestedBlock {
    NestedBlockBuilder::new(name)
        .max_items(1)
        .block(
            NestedBlockBuilder::new("inline_payload")
                .max_items(1)
                .attribute(
                    AttributeBuilder::new("payload", AttributeType::String)
                        .required()
                        .build(),
                )
                .build(),
        )
        .block(s3_block())
        .build()
}

fn type_attribute() -> tfplug::schema::Attribute {
    AttributeBuilder::new("type", AttributeType::String)
        .required()
        .validator(StringOneOfValidator::create(SCHEMA_TYPES))
        .build()
}

fn schema_definition_block(name: &str, min_items: i64) -> NestedBlock {
    let builder = NestedBlockBuilder::new(name)
        .min_items(min_items)
        .max_items(1)
        .attribute(type_attribute())
        .attribute(
            AttributeBuilder::new("description", AttributeType::String)
                .optional()
                .build(),
        );
    with_children(builder, 0).build()
}

/// `property` set block at `depth`
fn property_block(depth: u8) -> NestedBlock {
    let builder = NestedBlockBuilder::new("property")
        .nesting(NestingMode::Set)
        .attribute(
            AttributeBuilder::new("name", AttributeType::String)
                .required()
                .build(),
        )
        .attribute(type_attribute())
        .attribute(
            AttributeBuilder::new("description", AttributeType::String)
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("required", AttributeType::Bool)
                .optional()
                .computed()
                .default(StaticDefault::bool(false))
                .build(),
        );
    with_children(builder, depth).build()
}

/// `items` block at `depth`
fn items_block(depth: u8) -> NestedBlock {
    let builder = NestedBlockBuilder::new("items")
        .max_items(1)
        .attribute(type_attribute())
        .attribute(
            AttributeBuilder::new("description", AttributeType::String)
                .optional()
                .build(),
        );
    with_children(builder, depth).build()
}

fn with_children(builder: NestedBlockBuilder, depth: u8) -> NestedBlockBuilder {
    if depth >= LEAF_DEPTH {
        builder
            .attribute(
                AttributeBuilder::new("items_json", AttributeType::String)
                    .description("JSON schema of the array items below this level")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("properties_json", AttributeType::String)
                    .description("JSON object with the properties and required list below this level")
                    .optional()
                    .build(),
            )
    } else {
        builder
            .block(property_block(depth + 1))
            .block(items_block(depth + 1))
    }
}

/// `properties_json` payload
#[derive(Debug, Serialize, Deserialize)]
struct PropertiesJson {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    properties: Option<BTreeMap<String, SchemaDefinition>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    required: Option<Vec<String>>,
}

fn expand_schema(value: &Dynamic, depth: u8) -> Result<SchemaDefinition, String> {
    let mut definition = SchemaDefinition {
        schema_type: require_string(value, "type")?,
        description: get_string(value, "description"),
        ..Default::default()
    };

    if depth >= LEAF_DEPTH {
        if let Some(items) = get_non_empty(value, "items_json") {
            let items: SchemaDefinition = serde_json::from_str(items.trim())
                .map_err(|e| format!("items_json is not a valid schema: {}", e))?;
            definition.items = Some(Box::new(items));
        }
        if let Some(properties) = get_non_empty(value, "properties_json") {
            let parsed: PropertiesJson = serde_json::from_str(properties.trim())
                .map_err(|e| format!("properties_json is not a valid schema: {}", e))?;
            definition.properties = parsed.properties;
            definition.required = parsed.required;
        }
        return Ok(definition);
    }

    if let Some(items) = first_block(value, "items") {
        definition.items = Some(Box::new(expand_schema(items, depth + 1)?));
    }

    let properties = blocks(value, "property");
    if !properties.is_empty() {
        let mut expanded = BTreeMap::new();
        let mut required = vec![];
        for property in properties {
            let name = require_string(property, "name")?;
            if get_bool(property, "required").unwrap_or(false) {
                required.push(name.clone());
            }
            expanded.insert(name, expand_schema(property, depth + 1)?);
        }
        definition.properties = Some(expanded);
        if !required.is_empty() {
            definition.required = Some(required);
        }
    }

    Ok(definition)
}

fn flatten_schema(definition: &SchemaDefinition, depth: u8) -> ObjectBuilder {
    let builder = ObjectBuilder::new()
        .set("type", definition.schema_type.clone())
        .set("description", definition.description.clone());

    if depth >= LEAF_DEPTH {
        let items_json = definition
            .items
            .as_ref()
            .and_then(|items| serde_json::to_string(items).ok());
        let properties_json = if definition.properties.is_some() || definition.required.is_some() {
            serde_json::to_string(&PropertiesJson {
                properties: definition.properties.clone(),
                required: definition.required.clone(),
            })
            .ok()
        } else {
            None
        };
        return builder
            .set("items_json", items_json)
            .set("properties_json", properties_json);
    }

    let required = definition.required.clone().unwrap_or_default();
    let properties = definition
        .properties
        .iter()
        .flatten()
        .map(|(name, property)| {
            flatten_schema(property, depth + 1)
                .set("name", name.clone())
                .set("required", required.contains(name))
                .build()
        })
        .collect();

    builder
        .block(
            "items",
            definition
                .items
                .as_ref()
                .map(|items| flatten_schema(items, depth + 1).build()),
        )
        .block_list("property", properties)
}

fn expand_s3(value: &Dynamic) -> S3Configuration {
    S3Configuration {
        uri: get_string(value, "uri"),
        bucket_owner_account_id: get_string(value, "bucket_owner_account_id"),
    }
}

fn flatten_s3(s3: &S3Configuration) -> Dynamic {
    ObjectBuilder::new()
        .set("uri", s3.uri.clone())
        .set("bucket_owner_account_id", s3.bucket_owner_account_id.clone())
        .build()
}

fn expand_api_schema(value: &Dynamic) -> Result<ApiSchemaConfiguration, String> {
    match variant(value, SOURCE_VARIANTS) {
        Some("inline_payload") => first_block(value, "inline_payload")
            .map(|p| require_string(p, "payload"))
            .transpose()?
            .map(ApiSchemaConfiguration::InlinePayload)
            .ok_or_else(|| "inline_payload must be set".to_string()),
        Some(_) => Ok(ApiSchemaConfiguration::S3(
            first_block(value, "s3").map(expand_s3).unwrap_or_default(),
        )),
        None => Err("one of inline_payload or s3 must be set".to_string()),
    }
}

fn flatten_api_schema(schema: &ApiSchemaConfiguration) -> Dynamic {
    match schema {
        ApiSchemaConfiguration::InlinePayload(payload) => ObjectBuilder::new()
            .block(
                "inline_payload",
                Some(ObjectBuilder::new().set("payload", payload.clone()).build()),
            )
            .block("s3", None)
            .build(),
        ApiSchemaConfiguration::S3(s3) => ObjectBuilder::new()
            .block("inline_payload", None)
            .block("s3", Some(flatten_s3(s3)))
            .build(),
    }
}

fn expand_tool(value: &Dynamic) -> Result<ToolDefinition, String> {
    let input = first_block(value, "input_schema")
        .ok_or_else(|| "input_schema must be set".to_string())?;
    Ok(ToolDefinition {
        name: require_string(value, "name")?,
        description: require_string(value, "description")?,
        input_schema: expand_schema(input, 0)?,
        output_schema: first_block(value, "output_schema")
            .map(|output| expand_schema(output, 0))
            .transpose()?,
    })
}

fn flatten_tool(tool: &ToolDefinition) -> Dynamic {
    ObjectBuilder::new()
        .set("name", tool.name.clone())
        .set("description", tool.description.clone())
        .block("input_schema", Some(flatten_schema(&tool.input_schema, 0).build()))
        .block(
            "output_schema",
            tool.output_schema
                .as_ref()
                .map(|output| flatten_schema(output, 0).build()),
        )
        .build()
}

fn expand_tool_schema(value: &Dynamic) -> Result<ToolSchema, String> {
    match variant(value, SOURCE_VARIANTS) {
        Some("inline_payload") => blocks(value, "inline_payload")
            .into_iter()
            .map(expand_tool)
            .collect::<Result<Vec<_>, _>>()
            .map(ToolSchema::InlinePayload),
        Some(_) => Ok(ToolSchema::S3(
            first_block(value, "s3").map(expand_s3).unwrap_or_default(),
        )),
        None => Err("tool_schema needs inline_payload or s3".to_string()),
    }
}

fn expand_target(value: &Dynamic) -> Result<TargetConfiguration, String> {
    let mcp = first_block(value, "target_configuration")
        .and_then(|t| first_block(t, "mcp"))
        .ok_or_else(|| "target_configuration.mcp must be set".to_string())?;

    let configuration = match variant(mcp, MCP_VARIANTS) {
        Some("lambda") => {
            let lambda = first_block(mcp, "lambda")
                .ok_or_else(|| "lambda must be set".to_string())?;
            let tool_schema = first_block(lambda, "tool_schema")
                .ok_or_else(|| "lambda.tool_schema must be set".to_string())?;
            McpTargetConfiguration::Lambda(McpLambdaTargetConfiguration {
                lambda_arn: require_string(lambda, "lambda_arn")?,
                tool_schema: expand_tool_schema(tool_schema)?,
            })
        }
        Some("open_api_schema") => McpTargetConfiguration::OpenApiSchema(expand_api_schema(
            first_block(mcp, "open_api_schema").unwrap_or(&Dynamic::Null),
        )?),
        Some(_) => McpTargetConfiguration::SmithyModel(expand_api_schema(
            first_block(mcp, "smithy_model").unwrap_or(&Dynamic::Null),
        )?),
        None => {
            return Err("one of lambda, open_api_schema or smithy_model must be set".to_string())
        }
    };

    Ok(TargetConfiguration::Mcp(configuration))
}

fn flatten_target(target: &TargetConfiguration) -> Dynamic {
    let TargetConfiguration::Mcp(mcp) = target;
    let (lambda, open_api, smithy) = match mcp {
        McpTargetConfiguration::Lambda(lambda) => {
            let tool_schema = match &lambda.tool_schema {
                ToolSchema::InlinePayload(tools) => ObjectBuilder::new()
                    .block_list("inline_payload", tools.iter().map(flatten_tool).collect())
                    .block("s3", None),
                ToolSchema::S3(s3) => ObjectBuilder::new()
                    .block_list("inline_payload", vec![])
                    .block("s3", Some(flatten_s3(s3))),
            };
            let lambda = ObjectBuilder::new()
                .set("lambda_arn", lambda.lambda_arn.clone())
                .block("tool_schema", Some(tool_schema.build()))
                .build();
            (Some(lambda), None, None)
        }
        McpTargetConfiguration::OpenApiSchema(schema) => {
            (None, Some(flatten_api_schema(schema)), None)
        }
        McpTargetConfiguration::SmithyModel(schema) => {
            (None, None, Some(flatten_api_schema(schema)))
        }
    };

    ObjectBuilder::new()
        .block(
            "mcp",
            Some(
                ObjectBuilder::new()
                    .block("lambda", lambda)
                    .block("open_api_schema", open_api)
                    .block("smithy_model", smithy)
                    .build(),
            ),
        )
        .build()
}

fn expand_credentials(value: &Dynamic) -> Result<Vec<CredentialProvider>, String> {
    let Some(config) = first_block(value, "credential_provider_configuration") else {
        return Ok(vec![]);
    };

    let provider = match variant(config, CREDENTIAL_VARIANTS) {
        Some("api_key") => {
            let api_key = first_block(config, "api_key").unwrap_or(&Dynamic::Null);
            CredentialProvider::ApiKey(ApiKeyCredentialProvider {
                provider_arn: require_string(api_key, "provider_arn")?,
                credential_location: get_string(api_key, "credential_location"),
                credential_parameter_name: get_string(api_key, "credential_parameter_name"),
                credential_prefix: get_string(api_key, "credential_prefix"),
            })
        }
        Some("oauth") => {
            let oauth = first_block(config, "oauth").unwrap_or(&Dynamic::Null);
            CredentialProvider::OAuth(OAuthCredentialProvider {
                provider_arn: require_string(oauth, "provider_arn")?,
                scopes: get_strings(oauth, "scopes").unwrap_or_default(),
                custom_parameters: get_string_map(oauth, "custom_parameters"),
            })
        }
        Some(_) => CredentialProvider::GatewayIamRole,
        None => {
            return Err(
                "at least one credential provider must be configured: api_key, oauth, or gateway_iam_role"
                    .to_string(),
            )
        }
    };

    Ok(vec![provider])
}

fn flatten_credentials(provider: &CredentialProvider) -> Dynamic {
    let (api_key, oauth, iam) = match provider {
        CredentialProvider::ApiKey(p) => (
            Some(
                ObjectBuilder::new()
                    .set("provider_arn", p.provider_arn.clone())
                    .set("credential_location", p.credential_location.clone())
                    .set("credential_parameter_name", p.credential_parameter_name.clone())
                    .set("credential_prefix", p.credential_prefix.clone())
                    .build(),
            ),
            None,
            None,
        ),
        CredentialProvider::OAuth(p) => (
            None,
            Some(
                ObjectBuilder::new()
                    .set("provider_arn", p.provider_arn.clone())
                    .strings("scopes", Some(p.scopes.clone()))
                    .string_map("custom_parameters", p.custom_parameters.clone())
                    .build(),
            ),
            None,
        ),
        CredentialProvider::GatewayIamRole => (None, None, Some(ObjectBuilder::new().build())),
    };

    ObjectBuilder::new()
        .block("api_key", api_key)
        .block("oauth", oauth)
        .block("gateway_iam_role", iam)
        .build()
}

fn expand_spec(value: &Dynamic) -> Result<GatewayTargetSpec, String> {
    Ok(GatewayTargetSpec {
        name: require_string(value, "name")?,
        target_configuration: expand_target(value)?,
        description: get_string(value, "description"),
        credential_provider_configurations: expand_credentials(value)?,
    })
}

fn flatten(base: &Dynamic, target: &GatewayTarget) -> DynamicValue {
    let mut builder = ObjectBuilder::from_value(base)
        .set("id", target.target_id.clone())
        .set("name", target.name.clone())
        .set("description", target.description.clone());

    if let Some(configuration) = &target.target_configuration {
        builder = builder.block("target_configuration", Some(flatten_target(configuration)));
    }
    if let Some(provider) = target.credential_provider_configurations.first() {
        builder = builder.block(
            "credential_provider_configuration",
            Some(flatten_credentials(provider)),
        );
    }

    builder.into_value()
}

fn target_variant(value: &Dynamic) -> Option<&'static str> {
    first_block(value, "target_configuration")
        .and_then(|t| first_block(t, "mcp"))
        .and_then(|mcp| variant(mcp, MCP_VARIANTS))
}

fn credential_variant(value: &Dynamic) -> Option<&'static str> {
    first_block(value, "credential_provider_configuration")
        .and_then(|c| variant(c, CREDENTIAL_VARIANTS))
}

async fn status_gateway_target(
    client: &Client,
    gateway_id: &str,
    target_id: &str,
) -> Result<PollOutcome<GatewayTarget>, ApiError> {
    PollOutcome::from_result(
        client.gateways().get_target(gateway_id, target_id).await,
        |t| t.status.to_string(),
    )
}

fn failure_reason(target: &GatewayTarget) -> Option<String> {
    Some(target.status_reasons.join("; "))
}

fn wait_conf(pending: GatewayStatus, timeout: std::time::Duration) -> StateChangeConf {
    StateChangeConf::new(&[pending.as_str()], &[GatewayStatus::Ready.as_str()], timeout)
        .continuous_target_occurrence(2)
        .not_found_checks(20)
}

/// Checks the unions below `target_configuration` and the credential block
fn validate_unions(config: &Dynamic, diagnostics: &mut Vec<Diagnostic>) {
    let mut check = |value: &Dynamic, variants: &[&str], path: AttributePath| {
        if !exactly_one_block(value, variants) {
            diagnostics.push(
                Diagnostic::error(
                    "Invalid block combination",
                    format!("Exactly one of {} must be set", variants.join(", ")),
                )
                .with_attribute(path),
            );
        }
    };

    if let Some(credentials) = first_block(config, "credential_provider_configuration") {
        check(
            credentials,
            CREDENTIAL_VARIANTS,
            AttributePath::new("credential_provider_configuration"),
        );
    }

    let Some(mcp) = first_block(config, "target_configuration").and_then(|t| first_block(t, "mcp"))
    else {
        return;
    };
    let mcp_path = AttributePath::new("target_configuration")
        .index(0)
        .attribute("mcp");
    check(mcp, MCP_VARIANTS, mcp_path.clone());

    if let Some(tool_schema) =
        first_block(mcp, "lambda").and_then(|l| first_block(l, "tool_schema"))
    {
        check(
            tool_schema,
            SOURCE_VARIANTS,
            mcp_path.clone().index(0).attribute("lambda"),
        );
    }
    for name in ["open_api_schema", "smithy_model"] {
        if let Some(schema) = first_block(mcp, name) {
            check(schema, SOURCE_VARIANTS, mcp_path.clone().index(0).attribute(name));
        }
    }
}

#[async_trait]
impl Resource for GatewayTargetResource {
    fn type_name(&self) -> &str {
        "aws_bedrockagentcore_gateway_target"
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
        validate_unions(&request.config.value, &mut diagnostics);
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
        let gateway_id = get_string(planned, "gateway_identifier").unwrap_or_default();

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

        let input = CreateGatewayTargetRequest {
            spec,
            client_token: get_non_empty(planned, "client_token").unwrap_or_else(client_token),
        };
        let client = &provider_data.client;
        let created = match client.gateways().create_target(&gateway_id, &input).await {
            Ok(created) => created,
            Err(e) => {
                diagnostics.push(operation_error("creating", KIND, &name, e));
                return CreateResourceResponse {
                    new_state: DynamicValue::null(),
                    diagnostics,
                };
            }
        };

        let target_id = created.target_id.clone();
        tracing::debug!(
            "Created gateway target {} ({}) on gateway {}",
            name,
            target_id,
            gateway_id
        );

        let timeouts = Timeouts::from_value(planned, Timeouts::default());
        let conf = wait_conf(GatewayStatus::Creating, timeouts.create);
        let (gid, tid) = (gateway_id.as_str(), target_id.as_str());
        match conf
            .wait_for_state(&ctx, move || status_gateway_target(client, gid, tid))
            .await
        {
            Ok(Some(target)) => {
                tracing::info!("Gateway target {} is ready", target_id);
                CreateResourceResponse {
                    new_state: flatten(planned, &target),
                    diagnostics,
                }
            }
            result => {
                if let Err(e) = &result {
                    diagnostics.push(wait_error("creation", KIND, &target_id, e, failure_reason));
                } else {
                    diagnostics.push(operation_error(
                        "waiting for creation",
                        KIND,
                        &target_id,
                        "resource disappeared while being created",
                    ));
                }
                let partial = ObjectBuilder::from_value(planned)
                    .set("id", target_id.clone())
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
        let (Some(gateway_id), Some(target_id)) =
            (get_string(state, "gateway_identifier"), get_string(state, "id"))
        else {
            diagnostics.push(missing_identity(KIND, "gateway_identifier, id"));
            return ReadResourceResponse {
                new_state: Some(request.current_state),
                diagnostics,
            };
        };

        match provider_data
            .client
            .gateways()
            .get_target(&gateway_id, &target_id)
            .await
        {
            Ok(target) => ReadResourceResponse {
                new_state: Some(flatten(state, &target)),
                diagnostics,
            },
            Err(e) if e.is_not_found() => {
                removed_from_state(KIND, &target_id);
                ReadResourceResponse {
                    new_state: None,
                    diagnostics,
                }
            }
            Err(e) => {
                diagnostics.push(operation_error("reading", KIND, &target_id, e));
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
        let gateway_id = get_string(prior, "gateway_identifier").unwrap_or_default();
        let target_id = get_string(prior, "id").unwrap_or_default();
        let carried = ObjectBuilder::from_value(planned).set("id", target_id.clone());

        if !has_changes(&resource_schema().block, prior, planned, COMPUTED) {
            return UpdateResourceResponse {
                new_state: carried.into_value(),
                diagnostics,
            };
        }

        let spec = match expand_spec(planned) {
            Ok(spec) => spec,
            Err(e) => {
                diagnostics.push(operation_error("updating", KIND, &target_id, e));
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    diagnostics,
                };
            }
        };

        let client = &provider_data.client;
        if let Err(e) = client
            .gateways()
            .update_target(&gateway_id, &target_id, &spec)
            .await
        {
            diagnostics.push(operation_error("updating", KIND, &target_id, e));
            return UpdateResourceResponse {
                new_state: request.prior_state,
                diagnostics,
            };
        }

        let timeouts = Timeouts::from_value(planned, Timeouts::default());
        let conf = wait_conf(GatewayStatus::Updating, timeouts.update);
        let (gid, tid) = (gateway_id.as_str(), target_id.as_str());
        match conf
            .wait_for_state(&ctx, move || status_gateway_target(client, gid, tid))
            .await
        {
            Ok(Some(target)) => {
                tracing::info!("Gateway target {} updated", target_id);
                UpdateResourceResponse {
                    new_state: flatten(planned, &target),
                    diagnostics,
                }
            }
            result => {
                if let Err(e) = &result {
                    diagnostics.push(wait_error("update", KIND, &target_id, e, failure_reason));
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
        let (Some(gateway_id), Some(target_id)) =
            (get_string(prior, "gateway_identifier"), get_string(prior, "id"))
        else {
            diagnostics.push(missing_identity(KIND, "gateway_identifier, id"));
            return DeleteResourceResponse { diagnostics };
        };

        let client = &provider_data.client;
        match client.gateways().delete_target(&gateway_id, &target_id).await {
            Ok(_) => {}
            Err(e) if e.is_not_found() => {
                tracing::warn!("Gateway target {} already deleted", target_id);
                return DeleteResourceResponse { diagnostics };
            }
            Err(e) => {
                diagnostics.push(operation_error("deleting", KIND, &target_id, e));
                return DeleteResourceResponse { diagnostics };
            }
        }

        let timeouts = Timeouts::from_value(prior, Timeouts::default());
        // READY lingers for a moment after the delete call is accepted
        let conf = StateChangeConf::new(
            &[GatewayStatus::Deleting.as_str(), GatewayStatus::Ready.as_str()],
            &[],
            timeouts.delete,
        );
        let (gid, tid) = (gateway_id.as_str(), target_id.as_str());
        if let Err(e) = conf
            .wait_for_state(&ctx, move || status_gateway_target(client, gid, tid))
            .await
        {
            diagnostics.push(wait_error("deletion", KIND, &target_id, &e, failure_reason));
        } else {
            tracing::info!("Gateway target {} deleted", target_id);
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
impl ResourceWithConfigure for GatewayTargetResource {
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
impl ResourceWithModifyPlan for GatewayTargetResource {
    async fn modify_plan(&self, _ctx: Context, request: ModifyPlanRequest) -> ModifyPlanResponse {
        let mut requires_replace = vec![];

        // Nothing to compare on create or destroy
        if !request.prior_state.is_null() && !request.proposed_new_state.is_null() {
            let prior = &request.prior_state.value;
            let planned = &request.proposed_new_state.value;

            if target_variant(prior) != target_variant(planned) {
                requires_replace.push(AttributePath::new("target_configuration"));
            }
            if credential_variant(prior) != credential_variant(planned) {
                requires_replace.push(AttributePath::new("credential_provider_configuration"));
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
impl ResourceWithImportState for GatewayTargetResource {
    async fn import_state(
        &self,
        ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let mut response = ImportResourceStateResponse {
            imported_resources: vec![],
            diagnostics: vec![],
        };
        import_state_composite_id(&ctx, ',', &["gateway_identifier", "id"], &request, &mut response);
        response
    }
}

#[cfg(test)]
#[path = "./gateway_target_test.rs"]
mod gateway_target_test;
