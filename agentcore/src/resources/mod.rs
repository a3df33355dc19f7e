//! Resource implementations

pub mod agent_runtime;
pub mod agent_runtime_endpoint;
pub mod api_key_credential_provider;
pub mod browser;
pub mod code_interpreter;
pub mod gateway;
pub mod gateway_target;
pub mod memory;
pub mod memory_strategy;
pub mod oauth2_credential_provider;
pub mod token_vault_cmk;
pub mod workload_identity;

pub use agent_runtime::AgentRuntimeResource;
pub use agent_runtime_endpoint::AgentRuntimeEndpointResource;
pub use api_key_credential_provider::ApiKeyCredentialProviderResource;
pub use browser::BrowserResource;
pub use code_interpreter::CodeInterpreterResource;
pub use gateway::GatewayResource;
pub use gateway_target::GatewayTargetResource;
pub use memory::MemoryResource;
pub use memory_strategy::MemoryStrategyResource;
pub use oauth2_credential_provider::Oauth2CredentialProviderResource;
pub use token_vault_cmk::TokenVaultCmkResource;
pub use workload_identity::WorkloadIdentityResource;

use std::fmt::{Debug, Display};

use tfplug::types::Diagnostic;

use crate::api::ApiError;
use crate::waiter::WaitError;

/// Diagnostic for a failed operation, e.g. "creating Bedrock AgentCore Gateway (my-gw)"
pub(crate) fn operation_error(
    action: &str,
    kind: &str,
    id: &str,
    detail: impl Display,
) -> Diagnostic {
    Diagnostic::error(
        format!("{} Bedrock AgentCore {} ({})", action, kind, id),
        detail.to_string(),
    )
}

/// Diagnostic for a failed wait, with the failure reason of the last
/// observed resource appended when there is one
pub(crate) fn wait_error<T: Debug>(
    action: &str,
    kind: &str,
    id: &str,
    err: &WaitError<T, ApiError>,
    reason: impl Fn(&T) -> Option<String>,
) -> Diagnostic {
    let detail = match err.last().and_then(reason) {
        Some(reason) if !reason.is_empty() => format!("{}: {}", err, reason),
        _ => err.to_string(),
    };
    operation_error(&format!("waiting for {}", action), kind, id, detail)
}

pub(crate) fn not_configured() -> Diagnostic {
    Diagnostic::error(
        "Provider not configured",
        "Provider data was not properly configured",
    )
}

pub(crate) fn missing_identity(kind: &str, attribute: &str) -> Diagnostic {
    Diagnostic::error(
        format!("Missing {} identity", kind),
        format!("\"{}\" is not set in state", attribute),
    )
}

/// Idempotency token sent with a create; generated once per create so
/// retries of the same call reuse it
pub(crate) fn client_token() -> String {
    uuid::Uuid::new_v4().to_string()
}

pub(crate) fn removed_from_state(kind: &str, id: &str) {
    tracing::warn!(
        "Bedrock AgentCore {} ({}) not found, removing from state",
        kind,
        id
    );
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use tfplug::resource::{ConfigureResourceRequest, ResourceWithConfigure};
    use tfplug::types::{Dynamic, DynamicValue};
    use tfplug::Context;

    use crate::api::test_helpers::FakeTransport;
    use crate::provider_data::AgentCoreProviderData;

    pub async fn configured<R: ResourceWithConfigure>(mut resource: R, fake: &FakeTransport) -> R {
        let response = resource
            .configure(
                Context::new(),
                ConfigureResourceRequest {
                    provider_data: Some(Arc::new(AgentCoreProviderData::new(fake.client()))),
                },
            )
            .await;
        assert!(response.diagnostics.is_empty());
        resource
    }

    pub fn value(dynamic: Dynamic) -> DynamicValue {
        DynamicValue::new(dynamic)
    }
}
