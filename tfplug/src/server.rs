//! In-process provider server
//!
//! Drives a provider through the same sequence Terraform core uses:
//! configure, validate, plan, apply, read and import. Each call instantiates
//! the resource from the registry and hands it the provider data first.

use crate::context::Context;
use crate::plan::{plan_resource_change, PlanAction, PlannedChange};
use crate::provider::{ConfigureProviderRequest, Provider, ResourceRegistry};
use crate::resource::{
    ConfigureResourceRequest, CreateResourceRequest, DeleteResourceRequest,
    ImportResourceStateRequest, ImportResourceStateResponse, ImportedResource,
    ReadResourceRequest, ReadResourceResponse, Resource, ResourceSchemaRequest,
    UpdateResourceRequest, ValidateResourceConfigRequest,
};
use crate::types::{has_errors, AttributePath, ClientCapabilities, Diagnostic, DynamicValue};
use crate::validation::validate_block;
use std::any::Any;
use std::sync::Arc;

/// Result of applying a planned change
#[derive(Debug, Clone)]
pub struct ApplyResult {
    /// Null when the resource no longer exists
    pub new_state: DynamicValue,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct ProviderServer<P: Provider> {
    provider: P,
    registry: ResourceRegistry,
    provider_data: Option<Arc<dyn Any + Send + Sync>>,
}

impl<P: Provider> ProviderServer<P> {
    pub fn new(provider: P) -> Self {
        let registry = provider.resources();
        Self {
            provider,
            registry,
            provider_data: None,
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn resource_types(&self) -> Vec<&str> {
        self.registry.type_names()
    }

    /// Validates the provider block against its schema, then configures
    pub async fn configure(&mut self, ctx: Context, config: DynamicValue) -> Vec<Diagnostic> {
        let schema = self.provider.schema(ctx.clone()).await;
        let mut diagnostics = validate_block(&schema.block, &config.value, &AttributePath::root());
        if has_errors(&diagnostics) {
            return diagnostics;
        }

        let response = self
            .provider
            .configure(
                ctx,
                ConfigureProviderRequest {
                    terraform_version: String::new(),
                    config,
                },
            )
            .await;
        diagnostics.extend(response.diagnostics);
        if !has_errors(&diagnostics) {
            self.provider_data = response.provider_data;
        }
        diagnostics
    }

    /// Creates and configures a resource instance
    pub async fn resource(
        &self,
        ctx: Context,
        type_name: &str,
    ) -> Result<Box<dyn Resource>, Vec<Diagnostic>> {
        let mut resource = self.registry.create(type_name).map_err(|e| {
            vec![Diagnostic::error(
                "Unknown resource type",
                e.to_string(),
            )]
        })?;

        if let Some(configurable) = resource.as_configure() {
            let response = configurable
                .configure(
                    ctx,
                    ConfigureResourceRequest {
                        provider_data: self.provider_data.clone(),
                    },
                )
                .await;
            if has_errors(&response.diagnostics) {
                return Err(response.diagnostics);
            }
        }

        Ok(resource)
    }

    pub async fn validate_resource_config(
        &self,
        ctx: Context,
        type_name: &str,
        config: &DynamicValue,
    ) -> Vec<Diagnostic> {
        let resource = match self.resource(ctx.clone(), type_name).await {
            Ok(resource) => resource,
            Err(diagnostics) => return diagnostics,
        };

        let schema = resource.schema(ctx.clone(), ResourceSchemaRequest).await;
        let mut diagnostics = schema.diagnostics;
        diagnostics.extend(validate_block(
            &schema.schema.block,
            &config.value,
            &AttributePath::root(),
        ));
        if has_errors(&diagnostics) {
            return diagnostics;
        }

        let response = resource
            .validate(
                ctx,
                ValidateResourceConfigRequest {
                    type_name: type_name.to_string(),
                    config: config.clone(),
                    client_capabilities: ClientCapabilities {
                        deferral_allowed: false,
                        write_only_attributes_allowed: true,
                    },
                },
            )
            .await;
        diagnostics.extend(response.diagnostics);
        diagnostics
    }

    pub async fn plan_resource_change(
        &self,
        ctx: Context,
        type_name: &str,
        prior_state: &DynamicValue,
        config: &DynamicValue,
    ) -> PlannedChange {
        match self.resource(ctx.clone(), type_name).await {
            Ok(resource) => plan_resource_change(&ctx, resource.as_ref(), prior_state, config).await,
            Err(diagnostics) => PlannedChange {
                action: PlanAction::NoOp,
                planned_state: prior_state.clone(),
                requires_replace: vec![],
                diagnostics,
            },
        }
    }

    pub async fn apply_resource_change(
        &self,
        ctx: Context,
        type_name: &str,
        prior_state: &DynamicValue,
        change: &PlannedChange,
        config: &DynamicValue,
    ) -> ApplyResult {
        let resource = match self.resource(ctx.clone(), type_name).await {
            Ok(resource) => resource,
            Err(diagnostics) => {
                return ApplyResult {
                    new_state: prior_state.clone(),
                    diagnostics,
                }
            }
        };

        tracing::debug!("applying {:?} to {}", change.action, type_name);

        match change.action {
            PlanAction::NoOp => ApplyResult {
                new_state: prior_state.clone(),
                diagnostics: vec![],
            },
            PlanAction::Create => {
                let response = resource
                    .create(
                        ctx,
                        CreateResourceRequest {
                            type_name: type_name.to_string(),
                            planned_state: change.planned_state.clone(),
                            config: config.clone(),
                        },
                    )
                    .await;
                ApplyResult {
                    new_state: response.new_state,
                    diagnostics: response.diagnostics,
                }
            }
            PlanAction::Update => {
                let response = resource
                    .update(
                        ctx,
                        UpdateResourceRequest {
                            type_name: type_name.to_string(),
                            prior_state: prior_state.clone(),
                            planned_state: change.planned_state.clone(),
                            config: config.clone(),
                        },
                    )
                    .await;
                ApplyResult {
                    new_state: response.new_state,
                    diagnostics: response.diagnostics,
                }
            }
            PlanAction::Delete => {
                let response = resource
                    .delete(
                        ctx,
                        DeleteResourceRequest {
                            type_name: type_name.to_string(),
                            prior_state: prior_state.clone(),
                        },
                    )
                    .await;
                let new_state = if has_errors(&response.diagnostics) {
                    prior_state.clone()
                } else {
                    DynamicValue::null()
                };
                ApplyResult {
                    new_state,
                    diagnostics: response.diagnostics,
                }
            }
            PlanAction::Replace => {
                let deleted = resource
                    .delete(
                        ctx.clone(),
                        DeleteResourceRequest {
                            type_name: type_name.to_string(),
                            prior_state: prior_state.clone(),
                        },
                    )
                    .await;
                if has_errors(&deleted.diagnostics) {
                    return ApplyResult {
                        new_state: prior_state.clone(),
                        diagnostics: deleted.diagnostics,
                    };
                }

                let created = resource
                    .create(
                        ctx,
                        CreateResourceRequest {
                            type_name: type_name.to_string(),
                            planned_state: change.planned_state.clone(),
                            config: config.clone(),
                        },
                    )
                    .await;
                let mut diagnostics = deleted.diagnostics;
                diagnostics.extend(created.diagnostics);
                ApplyResult {
                    new_state: created.new_state,
                    diagnostics,
                }
            }
        }
    }

    pub async fn read_resource(
        &self,
        ctx: Context,
        type_name: &str,
        current_state: &DynamicValue,
    ) -> ReadResourceResponse {
        match self.resource(ctx.clone(), type_name).await {
            Ok(resource) => {
                resource
                    .read(
                        ctx,
                        ReadResourceRequest {
                            type_name: type_name.to_string(),
                            current_state: current_state.clone(),
                        },
                    )
                    .await
            }
            Err(diagnostics) => ReadResourceResponse {
                new_state: Some(current_state.clone()),
                diagnostics,
            },
        }
    }

    /// Parses the import ID, then reads each imported object
    pub async fn import_resource_state(
        &self,
        ctx: Context,
        type_name: &str,
        id: &str,
    ) -> ImportResourceStateResponse {
        let resource = match self.resource(ctx.clone(), type_name).await {
            Ok(resource) => resource,
            Err(diagnostics) => {
                return ImportResourceStateResponse {
                    imported_resources: vec![],
                    diagnostics,
                }
            }
        };

        let Some(importer) = resource.as_import_state() else {
            return ImportResourceStateResponse {
                imported_resources: vec![],
                diagnostics: vec![Diagnostic::error(
                    "Resource Import Not Implemented",
                    format!("{} does not support import", type_name),
                )],
            };
        };

        let imported = importer
            .import_state(
                ctx.clone(),
                ImportResourceStateRequest {
                    type_name: type_name.to_string(),
                    id: id.to_string(),
                    client_capabilities: ClientCapabilities::default(),
                },
            )
            .await;

        let mut diagnostics = imported.diagnostics;
        let mut imported_resources = vec![];
        if has_errors(&diagnostics) {
            return ImportResourceStateResponse {
                imported_resources,
                diagnostics,
            };
        }

        for item in imported.imported_resources {
            let read = resource
                .read(
                    ctx.clone(),
                    ReadResourceRequest {
                        type_name: item.type_name.clone(),
                        current_state: item.state,
                    },
                )
                .await;
            diagnostics.extend(read.diagnostics);
            match read.new_state {
                Some(state) => imported_resources.push(ImportedResource {
                    type_name: item.type_name,
                    state,
                }),
                None => diagnostics.push(Diagnostic::error(
                    "Cannot import non-existent remote object",
                    format!(
                        "While attempting to import an existing object to {}, the provider detected that no object exists with the given id.",
                        type_name
                    ),
                )),
            }
        }

        ImportResourceStateResponse {
            imported_resources,
            diagnostics,
        }
    }
}
