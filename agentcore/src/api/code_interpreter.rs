use serde::{Deserialize, Serialize};

use super::browser::{DeleteToolResponse, ToolNetworkConfiguration, ToolStatus};
use super::{segment, ApiError, Client};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCodeInterpreterRequest {
    pub name: String,
    pub network_configuration: ToolNetworkConfiguration,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_role_arn: Option<String>,
    pub client_token: String,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CodeInterpreter {
    pub code_interpreter_id: String,
    pub code_interpreter_arn: String,
    pub name: String,
    pub description: Option<String>,
    pub execution_role_arn: Option<String>,
    pub network_configuration: Option<ToolNetworkConfiguration>,
    pub status: ToolStatus,
    pub failure_reason: Option<String>,
}

pub struct CodeInterpretersApi<'a> {
    client: &'a Client,
}

impl<'a> CodeInterpretersApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    pub async fn create(
        &self,
        request: &CreateCodeInterpreterRequest,
    ) -> Result<CodeInterpreter, ApiError> {
        self.client.put("/code-interpreters", request).await
    }

    pub async fn get(&self, code_interpreter_id: &str) -> Result<CodeInterpreter, ApiError> {
        self.client
            .get(&format!("/code-interpreters/{}", segment(code_interpreter_id)))
            .await
    }

    pub async fn delete(&self, code_interpreter_id: &str) -> Result<DeleteToolResponse, ApiError> {
        self.client
            .delete(&format!("/code-interpreters/{}", segment(code_interpreter_id)))
            .await
    }
}
