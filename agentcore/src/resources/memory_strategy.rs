//! Memory strategy resource
//!
//! Strategies have no API of their own: they are added, modified and removed
//! through UpdateMemory on the parent, and observed in the parent's
//! `strategies` list. A missing memory or a missing strategy both read as gone.

use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::import::import_state_composite_id;
use tfplug::plan_modifier::{RequiresReplaceIfChanged, UseStateForUnknown};
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse,
    ImportResourceStateRequest, ImportResourceStateResponse, ReadResourceRequest,
    ReadResourceResponse, Resource, ResourceSchemaRequest, ResourceSchemaResponse,
    ResourceWithConfigure, ResourceWithImportState, UpdateResourceRequest,
    UpdateResourceResponse, ValidateResourceConfigRequest, ValidateResourceConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, NestedBlock, NestedBlockBuilder, Schema, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use tfplug::validator::StringOneOfValidator;

use super::{client_token, missing_identity, not_configured, operation_error, removed_from_state};
use crate::api::memory::{
    BuiltInStrategyInput, ConsolidationConfiguration, CustomConfigurationInput,
    CustomConsolidation, CustomExtraction, CustomStrategyInput, DeleteMemoryStrategyInput,
    ExtractionConfiguration, MemoryStatus, MemoryStrategy, MemoryStrategyInput,
    ModifyMemoryStrategies, ModifyMemoryStrategyInput, ModifyStrategyConfiguration,
    OverrideInput, PromptOverride, UpdateMemoryRequest,
};
use crate::api::{ApiError, Client};
use crate::flex::{
    first_block, get_string, get_strings, has_changes, require_string, resolve_unknowns,
    ObjectBuilder,
};
use crate::provider_data::AgentCoreProviderData;
use crate::timeouts::{self, Timeouts};
use crate::waiter::{PollOutcome, StateChangeConf, WaitError};

const KIND: &str = "Memory Strategy";
const COMPUTED: &[&str] = &["memory_strategy_id", "timeouts"];
const STRATEGY_TYPES: &[&str] = &["SEMANTIC", "SUMMARIZATION", "USER_PREFERENCE", "CUSTOM"];
const OVERRIDE_TYPES: &[&str] = &[
    "SEMANTIC_OVERRIDE",
    "SUMMARY_OVERRIDE",
    "USER_PREFERENCE_OVERRIDE",
];

#[derive(Default)]
pub struct MemoryStrategyResource {
    provider_data: Option<AgentCoreProviderData>,
}

impl MemoryStrategyResource {
    pub fn new() -> Self {
        Self::default()
    }
}

fn resource_schema() -> Schema {
    SchemaBuilder::new()
        .version(0)
        .description("Manages a strategy of a Bedrock AgentCore memory")
        .attribute(
            AttributeBuilder::new("memory_id", AttributeType::String)
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
            AttributeBuilder::new("type", AttributeType::String)
                .required()
                .validator(StringOneOfValidator::create(STRATEGY_TYPES))
                .plan_modifier(RequiresReplaceIfChanged::create())
                .build(),
        )
        .attribute(
            AttributeBuilder::new("description", AttributeType::String)
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new(
                "namespaces",
                AttributeType::Set(Box::new(AttributeType::String)),
            )
            .description("Namespaces records are written to; the service assigns defaults")
            .optional()
            .computed()
            .plan_modifier(UseStateForUnknown::create())
            .build(),
        )
        .attribute(
            AttributeBuilder::new("memory_strategy_id", AttributeType::String)
                .computed()
                .plan_modifier(UseStateForUnknown::create())
                .build(),
        )
        .block(configuration_block())
        .block(timeouts::block(true))
        .build()
}

fn prompt_block(name: &str) -> NestedBlock {
    NestedBlockBuilder::new(name)
        .max_items(1)
        .attribute(
            AttributeBuilder::new("append_to_prompt", AttributeType::String)
                .required()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("model_id", AttributeType::String)
                .required()
                .build(),
        )
        .build()
}

fn configuration_block() -> NestedBlock {
    NestedBlockBuilder::new("configuration")
        .description("Prompt overrides of a CUSTOM strategy")
        .max_items(1)
        .attribute(
            AttributeBuilder::new("type", AttributeType::String)
                .required()
                .validator(StringOneOfValidator::create(OVERRIDE_TYPES))
                .plan_modifier(RequiresReplaceIfChanged::create())
                .build(),
        )
        .block(prompt_block("consolidation"))
        .block(prompt_block("extraction"))
        .build()
}

fn expand_prompt(value: &Dynamic, key: &str) -> Result<Option<PromptOverride>, String> {
    first_block(value, key)
        .map(|p| {
            Ok(PromptOverride {
                append_to_prompt: require_string(p, "append_to_prompt")?,
                model_id: require_string(p, "model_id")?,
            })
        })
        .transpose()
}

fn expand_override(value: &Dynamic) -> Result<(String, OverrideInput), String> {
    let configuration = first_block(value, "configuration")
        .ok_or_else(|| "configuration must be set for CUSTOM strategies".to_string())?;
    Ok((
        require_string(configuration, "type")?,
        OverrideInput {
            extraction: expand_prompt(configuration, "extraction")?,
            consolidation: expand_prompt(configuration, "consolidation")?,
        },
    ))
}

fn expand_input(value: &Dynamic) -> Result<MemoryStrategyInput, String> {
    let name = require_string(value, "name")?;
    let description = get_string(value, "description");
    let namespaces = get_strings(value, "namespaces");
    let built_in = || BuiltInStrategyInput {
        name: name.clone(),
        description: description.clone(),
        namespaces: namespaces.clone(),
    };

    match require_string(value, "type")?.as_str() {
        "SEMANTIC" => Ok(MemoryStrategyInput::SemanticMemoryStrategy(built_in())),
        "SUMMARIZATION" => Ok(MemoryStrategyInput::SummaryMemoryStrategy(built_in())),
        "USER_PREFERENCE" => Ok(MemoryStrategyInput::UserPreferenceMemoryStrategy(built_in())),
        "CUSTOM" => {
            let (override_type, input) = expand_override(value)?;
            let configuration = match override_type.as_str() {
                "SEMANTIC_OVERRIDE" => CustomConfigurationInput::SemanticOverride(input),
                "SUMMARY_OVERRIDE" => CustomConfigurationInput::SummaryOverride(input),
                "USER_PREFERENCE_OVERRIDE" => {
                    CustomConfigurationInput::UserPreferenceOverride(input)
                }
                other => return Err(format!("unsupported override type {}", other)),
            };
            Ok(MemoryStrategyInput::CustomMemoryStrategy(CustomStrategyInput {
                name,
                description,
                namespaces,
                configuration,
            }))
        }
        other => Err(format!("unsupported strategy type {}", other)),
    }
}

fn expand_modify_configuration(value: &Dynamic) -> Result<Option<ModifyStrategyConfiguration>, String> {
    if get_string(value, "type").as_deref() != Some("CUSTOM") {
        return Ok(None);
    }
    let (override_type, input) = expand_override(value)?;

    let extraction = match (override_type.as_str(), input.extraction) {
        (_, None) => None,
        ("SEMANTIC_OVERRIDE", Some(p)) => Some(CustomExtraction::SemanticExtractionOverride(p)),
        ("USER_PREFERENCE_OVERRIDE", Some(p)) => {
            Some(CustomExtraction::UserPreferenceExtractionOverride(p))
        }
        (other, Some(_)) => return Err(format!("{} does not support extraction", other)),
    };
    let consolidation = input.consolidation.map(|p| match override_type.as_str() {
        "SEMANTIC_OVERRIDE" => CustomConsolidation::SemanticConsolidationOverride(p),
        "SUMMARY_OVERRIDE" => CustomConsolidation::SummaryConsolidationOverride(p),
        _ => CustomConsolidation::UserPreferenceConsolidationOverride(p),
    });

    Ok(Some(ModifyStrategyConfiguration {
        extraction: extraction.map(ExtractionConfiguration::CustomExtractionConfiguration),
        consolidation: consolidation.map(ConsolidationConfiguration::CustomConsolidationConfiguration),
    }))
}

fn flatten_prompt(prompt: &PromptOverride) -> Dynamic {
    ObjectBuilder::new()
        .set("append_to_prompt", prompt.append_to_prompt.clone())
        .set("model_id", prompt.model_id.clone())
        .build()
}

fn flatten(base: &Dynamic, strategy: &MemoryStrategy) -> DynamicValue {
    let configuration = strategy.configuration.as_ref().and_then(|c| {
        c.override_type.as_ref().map(|override_type| {
            ObjectBuilder::new()
                .set("type", override_type.clone())
                .block(
                    "extraction",
                    c.extraction.as_ref().map(|e| flatten_prompt(e.prompt())),
                )
                .block(
                    "consolidation",
                    c.consolidation.as_ref().map(|e| flatten_prompt(e.prompt())),
                )
                .build()
        })
    });

    ObjectBuilder::from_value(base)
        .set("memory_strategy_id", strategy.strategy_id.clone())
        .set("name", strategy.name.clone())
        .set("type", strategy.strategy_type.clone())
        .set("description", strategy.description.clone())
        .strings("namespaces", Some(strategy.namespaces.clone()))
        .block("configuration", configuration)
        .into_value()
}

/// How to pick the strategy out of its memory's list
#[derive(Debug, Clone, Copy)]
enum Lookup<'a> {
    Name(&'a str),
    Id(&'a str),
}

impl Lookup<'_> {
    fn matches(&self, strategy: &MemoryStrategy) -> bool {
        match self {
            Lookup::Name(name) => strategy.name == *name,
            Lookup::Id(id) => strategy.strategy_id == *id,
        }
    }
}

async fn find_strategy(
    client: &Client,
    memory_id: &str,
    lookup: Lookup<'_>,
) -> Result<Option<MemoryStrategy>, ApiError> {
    match client.memories().get(memory_id).await {
        Ok(memory) => Ok(memory
            .strategies
            .into_iter()
            .find(|s| lookup.matches(s))),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

async fn status_strategy(
    client: &Client,
    memory_id: &str,
    lookup: Lookup<'_>,
) -> Result<PollOutcome<MemoryStrategy>, ApiError> {
    Ok(match find_strategy(client, memory_id, lookup).await? {
        Some(strategy) => PollOutcome::Found {
            status: strategy.status.to_string(),
            resource: strategy,
        },
        None => PollOutcome::Gone,
    })
}

fn wait_diagnostic(
    action: &str,
    id: &str,
    err: &WaitError<MemoryStrategy, ApiError>,
) -> Diagnostic {
    operation_error(&format!("waiting for {}", action), KIND, id, err)
}

async fn update_memory(
    client: &Client,
    memory_id: &str,
    strategies: ModifyMemoryStrategies,
) -> Result<(), ApiError> {
    let input = UpdateMemoryRequest {
        memory_strategies: Some(strategies),
        client_token: client_token(),
        ..Default::default()
    };
    client.memories().update(memory_id, &input).await.map(|_| ())
}

#[async_trait]
impl Resource for MemoryStrategyResource {
    fn type_name(&self) -> &str {
        "aws_bedrockagentcore_memory_strategy"
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
        let config = &request.config.value;
        let configuration = first_block(config, "configuration");
        let pending = config.get("configuration").is_unknown();

        match get_string(config, "type").as_deref() {
            Some("CUSTOM") if configuration.is_none() && !pending => diagnostics.push(
                Diagnostic::error(
                    "Missing configuration",
                    "configuration is required when type is CUSTOM",
                )
                .with_attribute(AttributePath::new("configuration")),
            ),
            Some(kind) if kind != "CUSTOM" && configuration.is_some() => diagnostics.push(
                Diagnostic::error(
                    "Unexpected configuration",
                    format!("configuration can only be set when type is CUSTOM, not {}", kind),
                )
                .with_attribute(AttributePath::new("configuration")),
            ),
            _ => {}
        }

        if let Some(configuration) = configuration {
            if get_string(configuration, "type").as_deref() == Some("SUMMARY_OVERRIDE")
                && first_block(configuration, "extraction").is_some()
            {
                diagnostics.push(
                    Diagnostic::error(
                        "Invalid configuration",
                        "SUMMARY_OVERRIDE supports consolidation only",
                    )
                    .with_attribute(
                        AttributePath::new("configuration").index(0).attribute("extraction"),
                    ),
                );
            }
        }

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
        let memory_id = get_string(planned, "memory_id").unwrap_or_default();
        let name = get_string(planned, "name").unwrap_or_default();

        let input = match expand_input(planned) {
            Ok(input) => input,
            Err(e) => {
                diagnostics.push(operation_error("creating", KIND, &name, e));
                return CreateResourceResponse {
                    new_state: DynamicValue::null(),
                    diagnostics,
                };
            }
        };

        let client = &provider_data.client;
        let strategies = ModifyMemoryStrategies {
            add_memory_strategies: vec![input],
            ..Default::default()
        };
        if let Err(e) = update_memory(client, &memory_id, strategies).await {
            diagnostics.push(operation_error("creating", KIND, &name, e));
            return CreateResourceResponse {
                new_state: DynamicValue::null(),
                diagnostics,
            };
        }

        // The id is only known once the strategy shows up on the memory
        let timeouts = Timeouts::from_value(planned, Timeouts::default());
        let conf = StateChangeConf::new(
            &[MemoryStatus::Creating.as_str()],
            &[MemoryStatus::Active.as_str()],
            timeouts.create,
        );
        let (mid, lookup) = (memory_id.as_str(), Lookup::Name(name.as_str()));
        match conf
            .wait_for_state(&ctx, move || status_strategy(client, mid, lookup))
            .await
        {
            Ok(Some(strategy)) => {
                tracing::info!(
                    "Memory strategy {} ({}) is active on {}",
                    name,
                    strategy.strategy_id,
                    memory_id
                );
                CreateResourceResponse {
                    new_state: flatten(planned, &strategy),
                    diagnostics,
                }
            }
            Ok(None) => {
                diagnostics.push(operation_error(
                    "waiting for creation",
                    KIND,
                    &name,
                    "strategy not found on the memory after creation",
                ));
                CreateResourceResponse {
                    new_state: DynamicValue::null(),
                    diagnostics,
                }
            }
            Err(e) => {
                diagnostics.push(wait_diagnostic("creation", &name, &e));
                // Keep the strategy in state when it was at least observed
                let new_state = match e.last() {
                    Some(strategy) => {
                        let partial = ObjectBuilder::from_value(planned)
                            .set("memory_strategy_id", strategy.strategy_id.clone())
                            .build();
                        DynamicValue::new(resolve_unknowns(partial))
                    }
                    None => DynamicValue::null(),
                };
                CreateResourceResponse {
                    new_state,
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
        let (Some(memory_id), Some(id)) = (
            get_string(state, "memory_id"),
            get_string(state, "memory_strategy_id"),
        ) else {
            diagnostics.push(missing_identity(KIND, "memory_id, memory_strategy_id"));
            return ReadResourceResponse {
                new_state: Some(request.current_state),
                diagnostics,
            };
        };

        match find_strategy(&provider_data.client, &memory_id, Lookup::Id(&id)).await {
            Ok(Some(strategy)) => ReadResourceResponse {
                new_state: Some(flatten(state, &strategy)),
                diagnostics,
            },
            Ok(None) => {
                removed_from_state(KIND, &id);
                ReadResourceResponse {
                    new_state: None,
                    diagnostics,
                }
            }
            Err(e) => {
                diagnostics.push(operation_error("reading", KIND, &id, e));
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
        let memory_id = get_string(prior, "memory_id").unwrap_or_default();
        let id = get_string(prior, "memory_strategy_id").unwrap_or_default();

        if !has_changes(&resource_schema().block, prior, planned, COMPUTED) {
            let carried = ObjectBuilder::from_value(planned)
                .set("memory_strategy_id", prior.get("memory_strategy_id").clone());
            return UpdateResourceResponse {
                new_state: carried.into_value(),
                diagnostics,
            };
        }

        let configuration = match expand_modify_configuration(planned) {
            Ok(configuration) => configuration,
            Err(e) => {
                diagnostics.push(operation_error("updating", KIND, &id, e));
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    diagnostics,
                };
            }
        };

        let client = &provider_data.client;
        let strategies = ModifyMemoryStrategies {
            modify_memory_strategies: vec![ModifyMemoryStrategyInput {
                memory_strategy_id: id.clone(),
                description: get_string(planned, "description"),
                namespaces: get_strings(planned, "namespaces"),
                configuration,
            }],
            ..Default::default()
        };
        if let Err(e) = update_memory(client, &memory_id, strategies).await {
            diagnostics.push(operation_error("updating", KIND, &id, e));
            return UpdateResourceResponse {
                new_state: request.prior_state,
                diagnostics,
            };
        }

        let timeouts = Timeouts::from_value(planned, Timeouts::default());
        let conf = StateChangeConf::new(
            &[MemoryStatus::Creating.as_str(), MemoryStatus::Updating.as_str()],
            &[MemoryStatus::Active.as_str()],
            timeouts.update,
        );
        let (mid, lookup) = (memory_id.as_str(), Lookup::Id(id.as_str()));
        match conf
            .wait_for_state(&ctx, move || status_strategy(client, mid, lookup))
            .await
        {
            Ok(Some(strategy)) => UpdateResourceResponse {
                new_state: flatten(planned, &strategy),
                diagnostics,
            },
            result => {
                if let Err(e) = &result {
                    diagnostics.push(wait_diagnostic("update", &id, e));
                }
                let partial = ObjectBuilder::from_value(planned)
                    .set("memory_strategy_id", id.clone())
                    .build();
                UpdateResourceResponse {
                    new_state: DynamicValue::new(resolve_unknowns(partial)),
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
        let (Some(memory_id), Some(id)) = (
            get_string(prior, "memory_id"),
            get_string(prior, "memory_strategy_id"),
        ) else {
            diagnostics.push(missing_identity(KIND, "memory_id, memory_strategy_id"));
            return DeleteResourceResponse { diagnostics };
        };

        let client = &provider_data.client;
        let strategies = ModifyMemoryStrategies {
            delete_memory_strategies: vec![DeleteMemoryStrategyInput {
                memory_strategy_id: id.clone(),
            }],
            ..Default::default()
        };
        match update_memory(client, &memory_id, strategies).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                tracing::warn!("Memory {} already deleted, dropping strategy {}", memory_id, id);
                return DeleteResourceResponse { diagnostics };
            }
            Err(e) => {
                diagnostics.push(operation_error("deleting", KIND, &id, e));
                return DeleteResourceResponse { diagnostics };
            }
        }

        let timeouts = Timeouts::from_value(prior, Timeouts::default());
        let conf = StateChangeConf::new(&[MemoryStatus::Deleting.as_str()], &[], timeouts.delete);
        let (mid, lookup) = (memory_id.as_str(), Lookup::Id(id.as_str()));
        if let Err(e) = conf
            .wait_for_state(&ctx, move || status_strategy(client, mid, lookup))
            .await
        {
            diagnostics.push(wait_diagnostic("deletion", &id, &e));
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
impl ResourceWithConfigure for MemoryStrategyResource {
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
impl ResourceWithImportState for MemoryStrategyResource {
    async fn import_state(
        &self,
        ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let mut response = ImportResourceStateResponse {
            imported_resources: vec![],
            diagnostics: vec![],
        };
        import_state_composite_id(
            &ctx,
            ',',
            &["memory_id", "memory_strategy_id"],
            &request,
            &mut response,
        );
        response
    }
}

#[cfg(test)]
#[path = "./memory_strategy_test.rs"]
mod memory_strategy_test;
