//! Provider trait and the resource registry
//!
//! A provider exposes one registry built in a single place; the server
//! instantiates resources from it by type name.

use crate::context::Context;
use crate::error::{Result, TfplugError};
use crate::resource::Resource;
use crate::schema::Schema;
use crate::types::{Diagnostic, DynamicValue};
use async_trait::async_trait;
use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;

#[async_trait]
pub trait Provider: Send + Sync {
    /// Prefix shared by every resource type name (e.g. "aws")
    fn type_name(&self) -> &str;

    /// Schema of the provider configuration block
    async fn schema(&self, ctx: Context) -> Schema;

    /// Called once with the provider block; returns the data handed to every
    /// resource's configure
    async fn configure(
        &mut self,
        ctx: Context,
        request: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse;

    /// All resources this provider manages
    fn resources(&self) -> ResourceRegistry;
}

pub struct ConfigureProviderRequest {
    pub terraform_version: String,
    pub config: DynamicValue,
}

pub struct ConfigureProviderResponse {
    pub diagnostics: Vec<Diagnostic>,
    pub provider_data: Option<Arc<dyn Any + Send + Sync>>,
}

pub type ResourceFactory = fn() -> Box<dyn Resource>;

/// Type name to factory map
#[derive(Clone, Default)]
pub struct ResourceRegistry {
    factories: BTreeMap<String, ResourceFactory>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a factory; a second registration of the same name is an error
    pub fn register(&mut self, type_name: &str, factory: ResourceFactory) -> Result<()> {
        if self.factories.contains_key(type_name) {
            return Err(TfplugError::InvalidConfiguration(format!(
                "resource type {} registered twice",
                type_name
            )));
        }
        self.factories.insert(type_name.to_string(), factory);
        Ok(())
    }

    /// Builder-style register for composition roots
    pub fn with(mut self, type_name: &str, factory: ResourceFactory) -> Result<Self> {
        self.register(type_name, factory)?;
        Ok(self)
    }

    pub fn create(&self, type_name: &str) -> Result<Box<dyn Resource>> {
        self.factories
            .get(type_name)
            .map(|factory| factory())
            .ok_or_else(|| TfplugError::ResourceNotFound(type_name.to_string()))
    }

    pub fn type_names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl std::fmt::Debug for ResourceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceRegistry")
            .field("types", &self.type_names())
            .finish()
    }
}
