//! Browsers; also home to the types shared with code interpreters

use serde::{Deserialize, Serialize};

use super::runtime::VpcConfig;
use super::{segment, status_enum, ApiError, Client};

status_enum! {
    /// Status of a browser or code interpreter
    ToolStatus {
        Creating => "CREATING",
        CreateFailed => "CREATE_FAILED",
        Ready => "READY",
        Deleting => "DELETING",
        DeleteFailed => "DELETE_FAILED",
        Deleted => "DELETED",
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolNetworkConfiguration {
    pub network_mode: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vpc_config: Option<VpcConfig>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s3_location: Option<RecordingLocation>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingLocation {
    pub bucket: String,
    pub prefix: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBrowserRequest {
    pub name: String,
    pub network_configuration: ToolNetworkConfiguration,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_role_arn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recording: Option<RecordingConfig>,
    pub client_token: String,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Browser {
    pub browser_id: String,
    pub browser_arn: String,
    pub name: String,
    pub description: Option<String>,
    pub execution_role_arn: Option<String>,
    pub network_configuration: Option<ToolNetworkConfiguration>,
    pub recording: Option<RecordingConfig>,
    pub status: ToolStatus,
    pub failure_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeleteToolResponse {
    pub status: ToolStatus,
}

pub struct BrowsersApi<'a> {
    client: &'a Client,
}

impl<'a> BrowsersApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    pub async fn create(&self, request: &CreateBrowserRequest) -> Result<Browser, ApiError> {
        self.client.put("/browsers", request).await
    }

    pub async fn get(&self, browser_id: &str) -> Result<Browser, ApiError> {
        self.client
            .get(&format!("/browsers/{}", segment(browser_id)))
            .await
    }

    pub async fn delete(&self, browser_id: &str) -> Result<DeleteToolResponse, ApiError> {
        self.client
            .delete(&format!("/browsers/{}", segment(browser_id)))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn recording_serializes_location() {
        let request = CreateBrowserRequest {
            name: "web".to_string(),
            network_configuration: ToolNetworkConfiguration {
                network_mode: "PUBLIC".to_string(),
                vpc_config: None,
            },
            description: None,
            execution_role_arn: Some("arn:role".to_string()),
            recording: Some(RecordingConfig {
                enabled: true,
                s3_location: Some(RecordingLocation {
                    bucket: "recordings".to_string(),
                    prefix: "web/".to_string(),
                }),
            }),
            client_token: "t".to_string(),
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["networkConfiguration"], json!({"networkMode": "PUBLIC"}));
        assert_eq!(
            value["recording"],
            json!({"enabled": true, "s3Location": {"bucket": "recordings", "prefix": "web/"}})
        );
    }

    #[test]
    fn deleted_status_decodes() {
        let browser: Browser =
            serde_json::from_value(json!({"browserId": "b-1", "status": "DELETED"})).unwrap();
        assert_eq!(browser.status, ToolStatus::Deleted);
    }
}
