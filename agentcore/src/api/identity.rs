//! Credential providers, workload identities and the token vault
//!
//! These are synchronous RPC-style calls: every operation is a POST to
//! `/identities/<Operation>` with a JSON body.

use serde::{Deserialize, Serialize};

use super::{ApiError, Client};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretArn {
    pub secret_arn: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyCredentialProviderRequest {
    pub name: String,
    pub api_key: String,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApiKeyCredentialProvider {
    pub name: String,
    pub credential_provider_arn: String,
    pub api_key_secret_arn: Option<SecretArn>,
}

/// Where a custom OAuth2 provider publishes its endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Oauth2Discovery {
    DiscoveryUrl(String),
    AuthorizationServerMetadata(AuthorizationServerMetadata),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationServerMetadata {
    pub issuer: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_types: Option<Vec<String>>,
}

/// Client registration for one vendor; the secret is only ever sent
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Oauth2ClientConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oauth_discovery: Option<Oauth2Discovery>,
    pub client_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Oauth2ProviderConfig {
    CustomOauth2ProviderConfig(Oauth2ClientConfig),
    GoogleOauth2ProviderConfig(Oauth2ClientConfig),
    GithubOauth2ProviderConfig(Oauth2ClientConfig),
    SlackOauth2ProviderConfig(Oauth2ClientConfig),
    SalesforceOauth2ProviderConfig(Oauth2ClientConfig),
    MicrosoftOauth2ProviderConfig(Oauth2ClientConfig),
}

/// Configuration block names paired with the vendor each one requires
pub const OAUTH2_VENDORS: &[(&str, &str)] = &[
    ("custom", "CustomOauth2"),
    ("google", "GoogleOauth2"),
    ("github", "GithubOauth2"),
    ("slack", "SlackOauth2"),
    ("salesforce", "SalesforceOauth2"),
    ("microsoft", "MicrosoftOauth2"),
];

impl Oauth2ProviderConfig {
    /// Builds the variant for a configuration block name
    pub fn from_kind(kind: &str, config: Oauth2ClientConfig) -> Option<Self> {
        Some(match kind {
            "custom" => Self::CustomOauth2ProviderConfig(config),
            "google" => Self::GoogleOauth2ProviderConfig(config),
            "github" => Self::GithubOauth2ProviderConfig(config),
            "slack" => Self::SlackOauth2ProviderConfig(config),
            "salesforce" => Self::SalesforceOauth2ProviderConfig(config),
            "microsoft" => Self::MicrosoftOauth2ProviderConfig(config),
            _ => return None,
        })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::CustomOauth2ProviderConfig(_) => "custom",
            Self::GoogleOauth2ProviderConfig(_) => "google",
            Self::GithubOauth2ProviderConfig(_) => "github",
            Self::SlackOauth2ProviderConfig(_) => "slack",
            Self::SalesforceOauth2ProviderConfig(_) => "salesforce",
            Self::MicrosoftOauth2ProviderConfig(_) => "microsoft",
        }
    }

    pub fn vendor(&self) -> &'static str {
        let kind = self.kind();
        OAUTH2_VENDORS
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, vendor)| *vendor)
            .unwrap_or("CustomOauth2")
    }

    pub fn client(&self) -> &Oauth2ClientConfig {
        match self {
            Self::CustomOauth2ProviderConfig(c)
            | Self::GoogleOauth2ProviderConfig(c)
            | Self::GithubOauth2ProviderConfig(c)
            | Self::SlackOauth2ProviderConfig(c)
            | Self::SalesforceOauth2ProviderConfig(c)
            | Self::MicrosoftOauth2ProviderConfig(c) => c,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Oauth2CredentialProviderRequest {
    pub name: String,
    pub credential_provider_vendor: String,
    pub oauth2_provider_config_input: Oauth2ProviderConfig,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Oauth2CredentialProvider {
    pub name: String,
    pub credential_provider_arn: String,
    pub credential_provider_vendor: Option<String>,
    pub client_secret_arn: Option<SecretArn>,
    pub callback_url: Option<String>,
    pub oauth2_provider_config_output: Option<Oauth2ProviderConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadIdentityRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_resource_oauth2_return_urls: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkloadIdentity {
    pub name: String,
    pub workload_identity_arn: String,
    pub allowed_resource_oauth2_return_urls: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KmsConfiguration {
    pub key_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kms_key_arn: Option<String>,
}

impl KmsConfiguration {
    pub fn service_managed() -> Self {
        Self {
            key_type: "ServiceManagedKey".to_string(),
            kms_key_arn: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TokenVault {
    pub token_vault_id: String,
    pub kms_configuration: Option<KmsConfiguration>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ByName<'a> {
    name: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TokenVaultRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    token_vault_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    kms_configuration: Option<&'a KmsConfiguration>,
}

#[derive(Debug, Default, Deserialize)]
struct Empty {}

pub struct IdentityApi<'a> {
    client: &'a Client,
}

impl<'a> IdentityApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    pub async fn create_api_key_provider(
        &self,
        request: &ApiKeyCredentialProviderRequest,
    ) -> Result<ApiKeyCredentialProvider, ApiError> {
        self.client
            .post("/identities/CreateApiKeyCredentialProvider", request)
            .await
    }

    pub async fn get_api_key_provider(
        &self,
        name: &str,
    ) -> Result<ApiKeyCredentialProvider, ApiError> {
        self.client
            .post("/identities/GetApiKeyCredentialProvider", &ByName { name })
            .await
    }

    pub async fn update_api_key_provider(
        &self,
        request: &ApiKeyCredentialProviderRequest,
    ) -> Result<ApiKeyCredentialProvider, ApiError> {
        self.client
            .post("/identities/UpdateApiKeyCredentialProvider", request)
            .await
    }

    pub async fn delete_api_key_provider(&self, name: &str) -> Result<(), ApiError> {
        let _: Empty = self
            .client
            .post("/identities/DeleteApiKeyCredentialProvider", &ByName { name })
            .await?;
        Ok(())
    }

    pub async fn create_oauth2_provider(
        &self,
        request: &Oauth2CredentialProviderRequest,
    ) -> Result<Oauth2CredentialProvider, ApiError> {
        self.client
            .post("/identities/CreateOauth2CredentialProvider", request)
            .await
    }

    pub async fn get_oauth2_provider(
        &self,
        name: &str,
    ) -> Result<Oauth2CredentialProvider, ApiError> {
        self.client
            .post("/identities/GetOauth2CredentialProvider", &ByName { name })
            .await
    }

    pub async fn update_oauth2_provider(
        &self,
        request: &Oauth2CredentialProviderRequest,
    ) -> Result<Oauth2CredentialProvider, ApiError> {
        self.client
            .post("/identities/UpdateOauth2CredentialProvider", request)
            .await
    }

    pub async fn delete_oauth2_provider(&self, name: &str) -> Result<(), ApiError> {
        let _: Empty = self
            .client
            .post("/identities/DeleteOauth2CredentialProvider", &ByName { name })
            .await?;
        Ok(())
    }

    pub async fn create_workload_identity(
        &self,
        request: &WorkloadIdentityRequest,
    ) -> Result<WorkloadIdentity, ApiError> {
        self.client
            .post("/identities/CreateWorkloadIdentity", request)
            .await
    }

    pub async fn get_workload_identity(&self, name: &str) -> Result<WorkloadIdentity, ApiError> {
        self.client
            .post("/identities/GetWorkloadIdentity", &ByName { name })
            .await
    }

    pub async fn update_workload_identity(
        &self,
        request: &WorkloadIdentityRequest,
    ) -> Result<WorkloadIdentity, ApiError> {
        self.client
            .post("/identities/UpdateWorkloadIdentity", request)
            .await
    }

    pub async fn delete_workload_identity(&self, name: &str) -> Result<(), ApiError> {
        let _: Empty = self
            .client
            .post("/identities/DeleteWorkloadIdentity", &ByName { name })
            .await?;
        Ok(())
    }

    pub async fn get_token_vault(&self, token_vault_id: &str) -> Result<TokenVault, ApiError> {
        self.client
            .post(
                "/identities/get-token-vault",
                &TokenVaultRequest {
                    token_vault_id: Some(token_vault_id),
                    kms_configuration: None,
                },
            )
            .await
    }

    pub async fn set_token_vault_cmk(
        &self,
        token_vault_id: &str,
        kms_configuration: &KmsConfiguration,
    ) -> Result<TokenVault, ApiError> {
        self.client
            .post(
                "/identities/set-token-vault-cmk",
                &TokenVaultRequest {
                    token_vault_id: Some(token_vault_id),
                    kms_configuration: Some(kms_configuration),
                },
            )
            .await
    }
}
