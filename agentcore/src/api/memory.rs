//! Memories and the strategies attached to them

use serde::{Deserialize, Serialize};

use super::{segment, status_enum, ApiError, Client};

status_enum! {
    /// Status of a memory or one of its strategies
    MemoryStatus {
        Creating => "CREATING",
        Updating => "UPDATING",
        Active => "ACTIVE",
        Failed => "FAILED",
        Deleting => "DELETING",
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Memory {
    pub arn: String,
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub encryption_key_arn: Option<String>,
    pub memory_execution_role_arn: Option<String>,
    pub event_expiry_duration: i64,
    pub status: MemoryStatus,
    pub failure_reason: Option<String>,
    pub strategies: Vec<MemoryStrategy>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MemoryStrategy {
    pub strategy_id: String,
    pub name: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub strategy_type: String,
    pub namespaces: Vec<String>,
    pub status: MemoryStatus,
    pub configuration: Option<StrategyConfiguration>,
}

/// Custom strategy configuration as reported by the control plane
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StrategyConfiguration {
    #[serde(rename = "type")]
    pub override_type: Option<String>,
    pub extraction: Option<ExtractionConfiguration>,
    pub consolidation: Option<ConsolidationConfiguration>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptOverride {
    pub append_to_prompt: String,
    pub model_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExtractionConfiguration {
    CustomExtractionConfiguration(CustomExtraction),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CustomExtraction {
    SemanticExtractionOverride(PromptOverride),
    UserPreferenceExtractionOverride(PromptOverride),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConsolidationConfiguration {
    CustomConsolidationConfiguration(CustomConsolidation),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CustomConsolidation {
    SemanticConsolidationOverride(PromptOverride),
    SummaryConsolidationOverride(PromptOverride),
    UserPreferenceConsolidationOverride(PromptOverride),
}

impl ExtractionConfiguration {
    pub fn prompt(&self) -> &PromptOverride {
        match self {
            Self::CustomExtractionConfiguration(
                CustomExtraction::SemanticExtractionOverride(p)
                | CustomExtraction::UserPreferenceExtractionOverride(p),
            ) => p,
        }
    }
}

impl ConsolidationConfiguration {
    pub fn prompt(&self) -> &PromptOverride {
        match self {
            Self::CustomConsolidationConfiguration(
                CustomConsolidation::SemanticConsolidationOverride(p)
                | CustomConsolidation::SummaryConsolidationOverride(p)
                | CustomConsolidation::UserPreferenceConsolidationOverride(p),
            ) => p,
        }
    }
}

/// A strategy to add, tagged by its kind
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MemoryStrategyInput {
    SemanticMemoryStrategy(BuiltInStrategyInput),
    SummaryMemoryStrategy(BuiltInStrategyInput),
    UserPreferenceMemoryStrategy(BuiltInStrategyInput),
    CustomMemoryStrategy(CustomStrategyInput),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuiltInStrategyInput {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespaces: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomStrategyInput {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespaces: Option<Vec<String>>,
    pub configuration: CustomConfigurationInput,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CustomConfigurationInput {
    SemanticOverride(OverrideInput),
    SummaryOverride(OverrideInput),
    UserPreferenceOverride(OverrideInput),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverrideInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extraction: Option<PromptOverride>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consolidation: Option<PromptOverride>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModifyMemoryStrategies {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub add_memory_strategies: Vec<MemoryStrategyInput>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub modify_memory_strategies: Vec<ModifyMemoryStrategyInput>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub delete_memory_strategies: Vec<DeleteMemoryStrategyInput>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModifyMemoryStrategyInput {
    pub memory_strategy_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespaces: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub configuration: Option<ModifyStrategyConfiguration>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModifyStrategyConfiguration {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extraction: Option<ExtractionConfiguration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consolidation: Option<ConsolidationConfiguration>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteMemoryStrategyInput {
    pub memory_strategy_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMemoryRequest {
    pub name: String,
    pub event_expiry_duration: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encryption_key_arn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_execution_role_arn: Option<String>,
    pub client_token: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMemoryRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_expiry_duration: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_execution_role_arn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_strategies: Option<ModifyMemoryStrategies>,
    pub client_token: String,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MemoryEnvelope {
    pub memory: Memory,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeleteMemoryResponse {
    pub memory_id: String,
    pub status: MemoryStatus,
}

pub struct MemoriesApi<'a> {
    client: &'a Client,
}

impl<'a> MemoriesApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    pub async fn create(&self, request: &CreateMemoryRequest) -> Result<Memory, ApiError> {
        let envelope: MemoryEnvelope = self.client.post("/memories/create", request).await?;
        Ok(envelope.memory)
    }

    pub async fn get(&self, memory_id: &str) -> Result<Memory, ApiError> {
        let envelope: MemoryEnvelope = self
            .client
            .get(&format!("/memories/{}/details", segment(memory_id)))
            .await?;
        Ok(envelope.memory)
    }

    pub async fn update(
        &self,
        memory_id: &str,
        request: &UpdateMemoryRequest,
    ) -> Result<Memory, ApiError> {
        let envelope: MemoryEnvelope = self
            .client
            .put(&format!("/memories/{}/update", segment(memory_id)), request)
            .await?;
        Ok(envelope.memory)
    }

    pub async fn delete(
        &self,
        memory_id: &str,
        client_token: &str,
    ) -> Result<DeleteMemoryResponse, ApiError> {
        self.client
            .delete(&format!(
                "/memories/{}/delete?clientToken={}",
                segment(memory_id),
                segment(client_token)
            ))
            .await
    }
}
