//! tfplug - Terraform Plugin Framework for Rust
//!
//! The framework side of a provider: value model, schemas, the resource
//! traits, framework planning and an in-process server that drives
//! resources the way Terraform core does.

// Core modules
pub mod context;
pub mod error;
pub mod schema;
pub mod types;

// Provider API modules
pub mod provider;
pub mod resource;

// Helper modules
pub mod defaults;
pub mod import;
pub mod plan_modifier;
pub mod validator;

// Framework implementation modules
pub mod plan;
pub mod server;
pub mod validation;

// Re-exports for convenience
pub use context::Context;
pub use error::{Result, TfplugError};
pub use import::{import_state_composite_id, import_state_passthrough_id};
pub use plan::{PlanAction, PlannedChange};
pub use provider::{Provider, ResourceRegistry};
pub use resource::{
    Resource, ResourceWithConfigure, ResourceWithImportState, ResourceWithModifyPlan,
};
pub use schema::{AttributeBuilder, AttributeType, NestedBlockBuilder, Schema, SchemaBuilder};
pub use server::{ApplyResult, ProviderServer};
pub use types::{Diagnostic, Dynamic, DynamicValue};
