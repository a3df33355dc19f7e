use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use super::error::ApiError;
use super::{ApiRequest, Transport};
use reqwest::Method;

/// AgentCore control-plane client
#[derive(Clone)]
pub struct Client {
    inner: Arc<dyn Transport>,
}

impl Client {
    pub fn new<T: Transport + 'static>(transport: T) -> Self {
        Self {
            inner: Arc::new(transport),
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.call(Method::GET, path, None).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.call(Method::POST, path, Some(encode(body)?)).await
    }

    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.call(Method::PUT, path, Some(encode(body)?)).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.call(Method::DELETE, path, None).await
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<T, ApiError> {
        let mut request = ApiRequest::new(method, path);
        request.body = body;
        let value = self.inner.send(request).await?;
        serde_json::from_value(value).map_err(|e| {
            tracing::error!("Failed to deserialize response from {}: {}", path, e);
            ApiError::ParseError(e.to_string())
        })
    }

    /// Agent runtimes and their endpoints
    pub fn runtimes(&self) -> crate::api::runtime::RuntimesApi<'_> {
        crate::api::runtime::RuntimesApi::new(self)
    }

    /// Gateways and gateway targets
    pub fn gateways(&self) -> crate::api::gateway::GatewaysApi<'_> {
        crate::api::gateway::GatewaysApi::new(self)
    }

    /// Memories and memory strategies
    pub fn memories(&self) -> crate::api::memory::MemoriesApi<'_> {
        crate::api::memory::MemoriesApi::new(self)
    }

    pub fn browsers(&self) -> crate::api::browser::BrowsersApi<'_> {
        crate::api::browser::BrowsersApi::new(self)
    }

    pub fn code_interpreters(&self) -> crate::api::code_interpreter::CodeInterpretersApi<'_> {
        crate::api::code_interpreter::CodeInterpretersApi::new(self)
    }

    /// Credential providers, workload identities and the token vault
    pub fn identity(&self) -> crate::api::identity::IdentityApi<'_> {
        crate::api::identity::IdentityApi::new(self)
    }
}

fn encode<B: Serialize + ?Sized>(body: &B) -> Result<Value, ApiError> {
    serde_json::to_value(body).map_err(|e| ApiError::ParseError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_helpers::FakeTransport;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Echo {
        gateway_id: String,
    }

    #[tokio::test]
    async fn typed_calls_go_through_the_transport() {
        let fake = FakeTransport::new();
        fake.respond(Method::POST, "/gateways/", serde_json::json!({"gatewayId": "gw-1"}));
        let client = fake.client();

        let echo: Echo = client
            .post("/gateways/", &serde_json::json!({"name": "gw"}))
            .await
            .unwrap();

        assert_eq!(echo.gateway_id, "gw-1");
        let requests = fake.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].body.as_ref().unwrap()["name"], "gw");
    }

    #[tokio::test]
    async fn shape_mismatch_is_a_parse_error() {
        let fake = FakeTransport::new();
        fake.respond(Method::GET, "/gateways/gw-1/", serde_json::json!({"other": 1}));

        let result: Result<Echo, _> = fake.client().get("/gateways/gw-1/").await;
        assert!(matches!(result, Err(ApiError::ParseError(_))));
    }
}
