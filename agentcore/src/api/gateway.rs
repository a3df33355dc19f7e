//! Gateways and gateway targets

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::runtime::{AuthorizerConfiguration, WorkloadIdentityDetails};
use super::{segment, status_enum, ApiError, Client};

status_enum! {
    /// Status of a gateway or gateway target
    GatewayStatus {
        Creating => "CREATING",
        Updating => "UPDATING",
        UpdateUnsuccessful => "UPDATE_UNSUCCESSFUL",
        Deleting => "DELETING",
        Ready => "READY",
        Failed => "FAILED",
        Synchronizing => "SYNCHRONIZING",
        SynchronizeUnsuccessful => "SYNCHRONIZE_UNSUCCESSFUL",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GatewayProtocolConfiguration {
    Mcp(McpGatewayConfiguration),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McpGatewayConfiguration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supported_versions: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewaySpec {
    pub name: String,
    pub role_arn: String,
    pub protocol_type: String,
    pub authorizer_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol_configuration: Option<GatewayProtocolConfiguration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorizer_configuration: Option<AuthorizerConfiguration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kms_key_arn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exception_level: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGatewayRequest {
    #[serde(flatten)]
    pub spec: GatewaySpec,
    pub client_token: String,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Gateway {
    pub gateway_arn: String,
    pub gateway_id: String,
    pub gateway_url: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub role_arn: Option<String>,
    pub protocol_type: Option<String>,
    pub protocol_configuration: Option<GatewayProtocolConfiguration>,
    pub authorizer_type: Option<String>,
    pub authorizer_configuration: Option<AuthorizerConfiguration>,
    pub kms_key_arn: Option<String>,
    pub exception_level: Option<String>,
    pub workload_identity_details: Option<WorkloadIdentityDetails>,
    pub status: GatewayStatus,
    pub status_reasons: Vec<String>,
}

/// What a gateway target fronts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TargetConfiguration {
    Mcp(McpTargetConfiguration),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum McpTargetConfiguration {
    Lambda(McpLambdaTargetConfiguration),
    OpenApiSchema(ApiSchemaConfiguration),
    SmithyModel(ApiSchemaConfiguration),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McpLambdaTargetConfiguration {
    pub lambda_arn: String,
    pub tool_schema: ToolSchema,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ToolSchema {
    InlinePayload(Vec<ToolDefinition>),
    S3(S3Configuration),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ApiSchemaConfiguration {
    InlinePayload(String),
    S3(S3Configuration),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct S3Configuration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket_owner_account_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: SchemaDefinition,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<SchemaDefinition>,
}

/// JSON-schema subset accepted for tool inputs and outputs
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaDefinition {
    #[serde(rename = "type")]
    pub schema_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<SchemaDefinition>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<BTreeMap<String, SchemaDefinition>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
}

/// How a target authenticates outbound calls
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "CredentialProviderConfiguration")]
#[serde(try_from = "CredentialProviderConfiguration")]
pub enum CredentialProvider {
    GatewayIamRole,
    ApiKey(ApiKeyCredentialProvider),
    OAuth(OAuthCredentialProvider),
}

impl CredentialProvider {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::GatewayIamRole => "GATEWAY_IAM_ROLE",
            Self::ApiKey(_) => "API_KEY",
            Self::OAuth(_) => "OAUTH",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyCredentialProvider {
    pub provider_arn: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential_location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential_parameter_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential_prefix: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuthCredentialProvider {
    pub provider_arn: String,
    pub scopes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_parameters: Option<BTreeMap<String, String>>,
}

/// Wire shape: a type discriminator next to an optional payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialProviderConfiguration {
    pub credential_provider_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential_provider: Option<CredentialProviderPayload>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CredentialProviderPayload {
    ApiKeyCredentialProvider(ApiKeyCredentialProvider),
    OauthCredentialProvider(OAuthCredentialProvider),
}

impl From<CredentialProvider> for CredentialProviderConfiguration {
    fn from(provider: CredentialProvider) -> Self {
        let credential_provider_type = provider.kind().to_string();
        let credential_provider = match provider {
            CredentialProvider::GatewayIamRole => None,
            CredentialProvider::ApiKey(p) => Some(CredentialProviderPayload::ApiKeyCredentialProvider(p)),
            CredentialProvider::OAuth(p) => Some(CredentialProviderPayload::OauthCredentialProvider(p)),
        };
        Self {
            credential_provider_type,
            credential_provider,
        }
    }
}

impl TryFrom<CredentialProviderConfiguration> for CredentialProvider {
    type Error = String;

    fn try_from(config: CredentialProviderConfiguration) -> Result<Self, Self::Error> {
        match (config.credential_provider_type.as_str(), config.credential_provider) {
            ("GATEWAY_IAM_ROLE", _) => Ok(Self::GatewayIamRole),
            ("API_KEY", Some(CredentialProviderPayload::ApiKeyCredentialProvider(p))) => {
                Ok(Self::ApiKey(p))
            }
            ("OAUTH", Some(CredentialProviderPayload::OauthCredentialProvider(p))) => {
                Ok(Self::OAuth(p))
            }
            (kind, _) => Err(format!(
                "credential provider type {} does not match its payload",
                kind
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayTargetSpec {
    pub name: String,
    pub target_configuration: TargetConfiguration,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub credential_provider_configurations: Vec<CredentialProvider>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGatewayTargetRequest {
    #[serde(flatten)]
    pub spec: GatewayTargetSpec,
    pub client_token: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayTarget {
    pub target_id: String,
    #[serde(default)]
    pub gateway_arn: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub target_configuration: Option<TargetConfiguration>,
    #[serde(default)]
    pub credential_provider_configurations: Vec<CredentialProvider>,
    #[serde(default)]
    pub status: GatewayStatus,
    #[serde(default)]
    pub status_reasons: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeleteGatewayResponse {
    pub status: GatewayStatus,
}

pub struct GatewaysApi<'a> {
    client: &'a Client,
}

impl<'a> GatewaysApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    pub async fn create(&self, request: &CreateGatewayRequest) -> Result<Gateway, ApiError> {
        self.client.post("/gateways/", request).await
    }

    pub async fn get(&self, gateway_id: &str) -> Result<Gateway, ApiError> {
        self.client.get(&gateway_path(gateway_id)).await
    }

    pub async fn update(&self, gateway_id: &str, spec: &GatewaySpec) -> Result<Gateway, ApiError> {
        self.client.put(&gateway_path(gateway_id), spec).await
    }

    pub async fn delete(&self, gateway_id: &str) -> Result<DeleteGatewayResponse, ApiError> {
        self.client.delete(&gateway_path(gateway_id)).await
    }

    pub async fn create_target(
        &self,
        gateway_id: &str,
        request: &CreateGatewayTargetRequest,
    ) -> Result<GatewayTarget, ApiError> {
        self.client
            .post(&format!("{}targets/", gateway_path(gateway_id)), request)
            .await
    }

    pub async fn get_target(
        &self,
        gateway_id: &str,
        target_id: &str,
    ) -> Result<GatewayTarget, ApiError> {
        self.client.get(&target_path(gateway_id, target_id)).await
    }

    pub async fn update_target(
        &self,
        gateway_id: &str,
        target_id: &str,
        spec: &GatewayTargetSpec,
    ) -> Result<GatewayTarget, ApiError> {
        self.client
            .put(&target_path(gateway_id, target_id), spec)
            .await
    }

    pub async fn delete_target(
        &self,
        gateway_id: &str,
        target_id: &str,
    ) -> Result<DeleteGatewayResponse, ApiError> {
        self.client.delete(&target_path(gateway_id, target_id)).await
    }
}

pub fn gateway_path(gateway_id: &str) -> String {
    format!("/gateways/{}/", segment(gateway_id))
}

pub fn target_path(gateway_id: &str, target_id: &str) -> String {
    format!(
        "/gateways/{}/targets/{}/",
        segment(gateway_id),
        segment(target_id)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn credential_provider_wire_shape() {
        let api_key = CredentialProvider::ApiKey(ApiKeyCredentialProvider {
            provider_arn: "arn:key".to_string(),
            credential_location: Some("HEADER".to_string()),
            credential_parameter_name: Some("X-Api-Key".to_string()),
            credential_prefix: None,
        });
        assert_eq!(
            serde_json::to_value(&api_key).unwrap(),
            json!({
                "credentialProviderType": "API_KEY",
                "credentialProvider": {"apiKeyCredentialProvider": {
                    "providerArn": "arn:key",
                    "credentialLocation": "HEADER",
                    "credentialParameterName": "X-Api-Key"
                }}
            })
        );

        assert_eq!(
            serde_json::to_value(CredentialProvider::GatewayIamRole).unwrap(),
            json!({"credentialProviderType": "GATEWAY_IAM_ROLE"})
        );
    }

    #[test]
    fn credential_provider_decodes_oauth() {
        let decoded: CredentialProvider = serde_json::from_value(json!({
            "credentialProviderType": "OAUTH",
            "credentialProvider": {"oauthCredentialProvider": {
                "providerArn": "arn:oauth",
                "scopes": ["read"]
            }}
        }))
        .unwrap();
        match decoded {
            CredentialProvider::OAuth(p) => {
                assert_eq!(p.provider_arn, "arn:oauth");
                assert_eq!(p.scopes, vec!["read"]);
            }
            other => panic!("unexpected provider {other:?}"),
        }
    }

    #[test]
    fn mismatched_credential_payload_is_rejected() {
        let result: Result<CredentialProvider, _> = serde_json::from_value(json!({
            "credentialProviderType": "API_KEY"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn tool_schema_nests_definitions() {
        let config = TargetConfiguration::Mcp(McpTargetConfiguration::Lambda(
            McpLambdaTargetConfiguration {
                lambda_arn: "arn:lambda".to_string(),
                tool_schema: ToolSchema::InlinePayload(vec![ToolDefinition {
                    name: "lookup".to_string(),
                    description: "Look something up".to_string(),
                    input_schema: SchemaDefinition {
                        schema_type: "object".to_string(),
                        properties: Some(BTreeMap::from([(
                            "id".to_string(),
                            SchemaDefinition {
                                schema_type: "string".to_string(),
                                ..Default::default()
                            },
                        )])),
                        required: Some(vec!["id".to_string()]),
                        ..Default::default()
                    },
                    output_schema: None,
                }]),
            },
        ));

        let value = serde_json::to_value(&config).unwrap();
        let tool = &value["mcp"]["lambda"]["toolSchema"]["inlinePayload"][0];
        assert_eq!(tool["inputSchema"]["type"], "object");
        assert_eq!(tool["inputSchema"]["properties"]["id"]["type"], "string");
        assert!(tool.get("outputSchema").is_none());
    }

    #[test]
    fn gateway_decodes_status_reasons() {
        let gateway: Gateway = serde_json::from_value(json!({
            "gatewayId": "gw-1",
            "gatewayArn": "arn:gw",
            "name": "gw",
            "status": "FAILED",
            "statusReasons": ["role invalid", "quota"]
        }))
        .unwrap();
        assert_eq!(gateway.status, GatewayStatus::Failed);
        assert_eq!(gateway.status_reasons.join("; "), "role invalid; quota");
    }
}
