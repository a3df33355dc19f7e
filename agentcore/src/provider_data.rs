//! Provider data structure passed to resources

use crate::api::Client;
use tfplug::resource::{ConfigureResourceRequest, ConfigureResourceResponse};
use tfplug::types::Diagnostic;

#[derive(Clone)]
pub struct AgentCoreProviderData {
    pub client: Client,
}

impl AgentCoreProviderData {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Extracts the provider data handed to a resource's configure
    pub fn from_request(
        request: ConfigureResourceRequest,
    ) -> (Option<Self>, ConfigureResourceResponse) {
        let mut diagnostics = vec![];
        let mut data = None;

        match request.provider_data {
            Some(provider_data) => match provider_data.downcast_ref::<AgentCoreProviderData>() {
                Some(provider_data) => data = Some(provider_data.clone()),
                None => diagnostics.push(Diagnostic::error(
                    "Invalid provider data",
                    "Failed to extract AgentCoreProviderData from provider data",
                )),
            },
            None => diagnostics.push(Diagnostic::error(
                "No provider data",
                "No provider data was provided to the resource",
            )),
        }

        (data, ConfigureResourceResponse { diagnostics })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_helpers::FakeTransport;
    use std::sync::Arc;

    #[test]
    fn extracts_matching_data() {
        let data = AgentCoreProviderData::new(FakeTransport::new().client());
        let (extracted, response) = AgentCoreProviderData::from_request(ConfigureResourceRequest {
            provider_data: Some(Arc::new(data)),
        });
        assert!(extracted.is_some());
        assert!(response.diagnostics.is_empty());
    }

    #[test]
    fn rejects_foreign_data() {
        let (extracted, response) = AgentCoreProviderData::from_request(ConfigureResourceRequest {
            provider_data: Some(Arc::new(42u32)),
        });
        assert!(extracted.is_none());
        assert_eq!(response.diagnostics[0].summary, "Invalid provider data");
    }
}
