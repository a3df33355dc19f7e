#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::api::test_helpers::FakeTransport;
    use crate::resources::test_support::{configured, value};
    use reqwest::Method;
    use serde_json::json;
    use tfplug::types::ClientCapabilities;

    const TYPE_NAME: &str = "aws_bedrockagentcore_gateway";
    const GATEWAY_PATH: &str = "/gateways/gw-1/";

    fn jwt_authorizer() -> Dynamic {
        ObjectBuilder::new()
            .block(
                "custom_jwt_authorizer",
                Some(
                    ObjectBuilder::new()
                        .set("discovery_url", "https://idp.example.com/.well-known/openid-configuration")
                        .strings("allowed_clients", Some(vec!["client-a".to_string()]))
                        .build(),
                ),
            )
            .build()
    }

    fn config() -> Dynamic {
        ObjectBuilder::new()
            .set("name", "tools")
            .set("role_arn", "arn:aws:iam::123456789012:role/gateway")
            .set("protocol_type", "MCP")
            .set("authorizer_type", "CUSTOM_JWT")
            .block("authorizer_configuration", Some(jwt_authorizer()))
            .block(
                "protocol_configuration",
                Some(
                    ObjectBuilder::new()
                        .block(
                            "mcp",
                            Some(ObjectBuilder::new().set("search_type", "SEMANTIC").build()),
                        )
                        .build(),
                ),
            )
            .build()
    }

    fn state() -> Dynamic {
        ObjectBuilder::from_value(&config())
            .set("gateway_arn", "arn:gw")
            .set("gateway_id", "gw-1")
            .set("gateway_url", "https://gw-1.gateway.example.com/mcp")
            .set("workload_identity_arn", "arn:wi")
            .build()
    }

    fn gateway_json(status: &str) -> serde_json::Value {
        json!({
            "gatewayArn": "arn:gw",
            "gatewayId": "gw-1",
            "gatewayUrl": "https://gw-1.gateway.example.com/mcp",
            "name": "tools",
            "roleArn": "arn:aws:iam::123456789012:role/gateway",
            "protocolType": "MCP",
            "protocolConfiguration": {"mcp": {"searchType": "SEMANTIC"}},
            "authorizerType": "CUSTOM_JWT",
            "authorizerConfiguration": {"customJWTAuthorizer": {
                "discoveryUrl": "https://idp.example.com/.well-known/openid-configuration",
                "allowedClients": ["client-a"]
            }},
            "workloadIdentityDetails": {"workloadIdentityArn": "arn:wi"},
            "status": status
        })
    }

    fn create_request() -> CreateResourceRequest {
        let planned = ObjectBuilder::from_value(&config())
            .set("gateway_arn", Dynamic::Unknown)
            .set("gateway_id", Dynamic::Unknown)
            .set("gateway_url", Dynamic::Unknown)
            .set("workload_identity_arn", Dynamic::Unknown)
            .build();
        CreateResourceRequest {
            type_name: TYPE_NAME.to_string(),
            planned_state: value(planned),
            config: value(config()),
        }
    }

    #[tokio::test]
    async fn test_custom_jwt_requires_authorizer() {
        let config = ObjectBuilder::from_value(&config())
            .block("authorizer_configuration", None)
            .build();

        let response = GatewayResource::new()
            .validate(
                Context::new(),
                ValidateResourceConfigRequest {
                    type_name: TYPE_NAME.to_string(),
                    config: value(config),
                    client_capabilities: ClientCapabilities::default(),
                },
            )
            .await;

        assert_eq!(response.diagnostics.len(), 1);
        assert_eq!(response.diagnostics[0].summary, "Missing authorizer_configuration");
    }

    #[tokio::test]
    async fn test_iam_authorizer_needs_no_block() {
        let config = ObjectBuilder::from_value(&config())
            .set("authorizer_type", "AWS_IAM")
            .block("authorizer_configuration", None)
            .build();

        let response = GatewayResource::new()
            .validate(
                Context::new(),
                ValidateResourceConfigRequest {
                    type_name: TYPE_NAME.to_string(),
                    config: value(config),
                    client_capabilities: ClientCapabilities::default(),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_retries_role_propagation_then_waits() {
        let fake = FakeTransport::new();
        fake.respond_error(
            Method::POST,
            "/gateways/",
            403,
            "AccessDeniedException",
            "User is not authorized to perform: sts:AssumeRole on resource",
        )
        .respond(Method::POST, "/gateways/", gateway_json("CREATING"))
        .respond(Method::GET, GATEWAY_PATH, gateway_json("CREATING"))
        .respond(Method::GET, GATEWAY_PATH, gateway_json("READY"));
        let resource = configured(GatewayResource::new(), &fake).await;

        let response = resource.create(Context::new(), create_request()).await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        let state = &response.new_state.value;
        assert_eq!(get_string(state, "gateway_id").as_deref(), Some("gw-1"));
        assert_eq!(
            get_string(state, "gateway_url").as_deref(),
            Some("https://gw-1.gateway.example.com/mcp")
        );
        assert_eq!(get_string(state, "workload_identity_arn").as_deref(), Some("arn:wi"));
        assert_eq!(fake.requests_to(Method::POST, "/gateways/").len(), 2);
        assert_eq!(fake.requests_to(Method::GET, GATEWAY_PATH).len(), 3);

        let body = fake.requests_to(Method::POST, "/gateways/")[0].body.clone().unwrap();
        assert_eq!(body["authorizerType"], "CUSTOM_JWT");
        assert_eq!(body["protocolConfiguration"]["mcp"]["searchType"], "SEMANTIC");
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_failure_joins_status_reasons() {
        let fake = FakeTransport::new();
        let mut failed = gateway_json("FAILED");
        failed["statusReasons"] = json!(["role invalid", "quota exceeded"]);
        fake.respond(Method::POST, "/gateways/", gateway_json("CREATING"))
            .respond(Method::GET, GATEWAY_PATH, failed);
        let resource = configured(GatewayResource::new(), &fake).await;

        let response = resource.create(Context::new(), create_request()).await;

        assert_eq!(response.diagnostics.len(), 1);
        assert!(response.diagnostics[0]
            .detail
            .contains("role invalid; quota exceeded"));
        assert_eq!(
            get_string(&response.new_state.value, "gateway_id").as_deref(),
            Some("gw-1")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_sends_full_spec() {
        let fake = FakeTransport::new();
        fake.respond(Method::PUT, GATEWAY_PATH, gateway_json("UPDATING"))
            .respond(Method::GET, GATEWAY_PATH, gateway_json("READY"));
        let resource = configured(GatewayResource::new(), &fake).await;
        let planned = ObjectBuilder::from_value(&state())
            .set("description", "internal tools")
            .build();

        let response = resource
            .update(
                Context::new(),
                UpdateResourceRequest {
                    type_name: TYPE_NAME.to_string(),
                    prior_state: value(state()),
                    planned_state: value(planned.clone()),
                    config: value(planned),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        let body = fake.requests_to(Method::PUT, GATEWAY_PATH)[0].body.clone().unwrap();
        assert_eq!(body["name"], "tools");
        assert_eq!(body["description"], "internal tools");
        assert_eq!(fake.requests_to(Method::GET, GATEWAY_PATH).len(), 2);
    }

    #[tokio::test]
    async fn test_read_missing_gateway_removes_state() {
        let fake = FakeTransport::new();
        fake.respond_error(Method::GET, GATEWAY_PATH, 404, "ResourceNotFoundException", "gone");
        let resource = configured(GatewayResource::new(), &fake).await;

        let response = resource
            .read(
                Context::new(),
                ReadResourceRequest {
                    type_name: TYPE_NAME.to_string(),
                    current_state: value(state()),
                },
            )
            .await;

        assert!(response.new_state.is_none());
        assert!(response.diagnostics.is_empty());
    }

    #[tokio::test]
    async fn test_kms_key_change_requires_replace() {
        let schema = resource_schema();
        let kms = schema.block.attribute("kms_key_arn").unwrap();
        assert_eq!(kms.plan_modifiers.len(), 1);
        assert!(schema
            .block
            .attribute("gateway_url")
            .is_some_and(|a| a.computed && !a.required));
    }
}
