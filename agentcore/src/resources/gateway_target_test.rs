#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::api::test_helpers::FakeTransport;
    use crate::resources::test_support::{configured, value};
    use reqwest::Method;
    use serde_json::json;
    use tfplug::types::ClientCapabilities;

    const TYPE_NAME: &str = "aws_bedrockagentcore_gateway_target";
    const TARGET_PATH: &str = "/gateways/gw-1/targets/tg-1/";

    fn leaf(schema_type: &str) -> ObjectBuilder {
        ObjectBuilder::new().set("type", schema_type)
    }

    /// object { order: object { lines: array<object{ sku }> } }, three levels deep
    fn input_schema() -> Dynamic {
        let lines = leaf("array")
            .set("name", "lines")
            .set("required", true)
            .set(
                "items_json",
                r#"{"type":"object","properties":{"sku":{"type":"string"}}}"#,
            )
            .build();
        let order = leaf("object")
            .set("name", "order")
            .set("required", false)
            .block_list("property", vec![lines])
            .build();
        leaf("object")
            .set("description", "Order lookup input")
            .block_list("property", vec![order])
            .build()
    }

    fn lambda_target(tools: Vec<Dynamic>) -> Dynamic {
        let lambda = ObjectBuilder::new()
            .set("lambda_arn", "arn:aws:lambda:us-east-1:123:function:orders")
            .block(
                "tool_schema",
                Some(ObjectBuilder::new().block_list("inline_payload", tools).build()),
            )
            .build();
        ObjectBuilder::new()
            .block(
                "mcp",
                Some(ObjectBuilder::new().block("lambda", Some(lambda)).build()),
            )
            .build()
    }

    fn tool() -> Dynamic {
        ObjectBuilder::new()
            .set("name", "lookup_order")
            .set("description", "Find an order")
            .block("input_schema", Some(input_schema()))
            .build()
    }

    fn smithy_target() -> Dynamic {
        let smithy = ObjectBuilder::new()
            .block(
                "s3",
                Some(ObjectBuilder::new().set("uri", "s3://models/orders.json").build()),
            )
            .build();
        ObjectBuilder::new()
            .block(
                "mcp",
                Some(ObjectBuilder::new().block("smithy_model", Some(smithy)).build()),
            )
            .build()
    }

    fn iam_credentials() -> Dynamic {
        ObjectBuilder::new()
            .block("gateway_iam_role", Some(ObjectBuilder::new().build()))
            .build()
    }

    fn api_key_credentials() -> Dynamic {
        ObjectBuilder::new()
            .block(
                "api_key",
                Some(
                    ObjectBuilder::new()
                        .set("provider_arn", "arn:key")
                        .set("credential_location", "HEADER")
                        .build(),
                ),
            )
            .build()
    }

    fn config_with(target: Dynamic, credentials: Dynamic) -> Dynamic {
        ObjectBuilder::new()
            .set("gateway_identifier", "gw-1")
            .set("name", "orders")
            .block("target_configuration", Some(target))
            .block("credential_provider_configuration", Some(credentials))
            .build()
    }

    fn state() -> Dynamic {
        ObjectBuilder::from_value(&config_with(lambda_target(vec![tool()]), iam_credentials()))
            .set("id", "tg-1")
            .build()
    }

    fn target_json(status: &str) -> serde_json::Value {
        json!({
            "targetId": "tg-1",
            "gatewayArn": "arn:gw",
            "name": "orders",
            "targetConfiguration": {"mcp": {"smithyModel": {"s3": {"uri": "s3://models/orders.json"}}}},
            "credentialProviderConfigurations": [{"credentialProviderType": "GATEWAY_IAM_ROLE"}],
            "status": status
        })
    }

    async fn validate(config: Dynamic) -> Vec<Diagnostic> {
        GatewayTargetResource::new()
            .validate(
                Context::new(),
                ValidateResourceConfigRequest {
                    type_name: TYPE_NAME.to_string(),
                    config: value(config),
                    client_capabilities: ClientCapabilities::default(),
                },
            )
            .await
            .diagnostics
    }

    #[tokio::test]
    async fn test_schema_nests_two_levels_then_json() {
        let response = GatewayTargetResource::new()
            .schema(Context::new(), ResourceSchemaRequest)
            .await;
        let input = response
            .schema
            .block
            .nested_block("target_configuration")
            .and_then(|b| b.block.nested_block("mcp"))
            .and_then(|b| b.block.nested_block("lambda"))
            .and_then(|b| b.block.nested_block("tool_schema"))
            .and_then(|b| b.block.nested_block("inline_payload"))
            .and_then(|b| b.block.nested_block("input_schema"))
            .unwrap();

        let level1 = input.block.nested_block("property").unwrap();
        assert_eq!(level1.nesting, NestingMode::Set);
        let level2 = level1.block.nested_block("items").unwrap();
        assert!(level2.block.nested_block("property").is_none());
        assert!(level2.block.attribute("items_json").is_some());
        assert!(level2.block.attribute("properties_json").is_some());
    }

    #[test]
    fn test_expand_tool_schema_collects_required_and_leaf_json() {
        let definition = expand_schema(&input_schema(), 0).unwrap();
        assert_eq!(definition.schema_type, "object");
        assert_eq!(definition.required, None);

        let order = &definition.properties.as_ref().unwrap()["order"];
        assert_eq!(order.required, Some(vec!["lines".to_string()]));

        let lines = &order.properties.as_ref().unwrap()["lines"];
        let items = lines.items.as_ref().unwrap();
        assert_eq!(items.schema_type, "object");
        assert_eq!(items.properties.as_ref().unwrap()["sku"].schema_type, "string");
    }

    #[test]
    fn test_flatten_tool_schema_restores_blocks() {
        let definition = expand_schema(&input_schema(), 0).unwrap();
        let flattened = flatten_schema(&definition, 0).build();

        let order = blocks(&flattened, "property")[0];
        assert_eq!(get_string(order, "name").as_deref(), Some("order"));
        assert_eq!(get_bool(order, "required"), Some(false));
        let lines = blocks(order, "property")[0];
        assert_eq!(get_bool(lines, "required"), Some(true));
        let items: SchemaDefinition =
            serde_json::from_str(&get_string(lines, "items_json").unwrap()).unwrap();
        let order_properties = definition.properties.as_ref().unwrap()["order"]
            .properties
            .clone()
            .unwrap();
        assert_eq!(Some(Box::new(items)), order_properties["lines"].items);
        assert!(lines.get("properties_json").is_null());
    }

    #[test]
    fn test_invalid_leaf_json_is_reported() {
        let broken = leaf("array").set("items_json", "{not json").build();
        let err = expand_schema(&broken, LEAF_DEPTH).unwrap_err();
        assert!(err.starts_with("items_json is not a valid schema"));
    }

    #[tokio::test]
    async fn test_validate_accepts_lambda_target() {
        let diagnostics = validate(config_with(lambda_target(vec![tool()]), iam_credentials())).await;
        assert!(diagnostics.is_empty(), "{:?}", diagnostics);
    }

    #[tokio::test]
    async fn test_validate_rejects_two_credential_kinds() {
        let both = ObjectBuilder::from_value(&api_key_credentials())
            .block("gateway_iam_role", Some(ObjectBuilder::new().build()))
            .build();
        let diagnostics = validate(config_with(smithy_target(), both)).await;
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(
            diagnostics[0].attribute.as_ref().map(|p| p.to_string()).as_deref(),
            Some("credential_provider_configuration")
        );
    }

    #[tokio::test]
    async fn test_validate_rejects_empty_api_schema() {
        let empty = ObjectBuilder::new()
            .block(
                "mcp",
                Some(
                    ObjectBuilder::new()
                        .block("open_api_schema", Some(ObjectBuilder::new().build()))
                        .build(),
                ),
            )
            .build();
        let diagnostics = validate(config_with(empty, iam_credentials())).await;
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].detail.contains("inline_payload, s3"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_sends_union_wire_shape() {
        let fake = FakeTransport::new();
        fake.respond(Method::POST, "/gateways/gw-1/targets/", target_json("CREATING"))
            .respond(Method::GET, TARGET_PATH, target_json("READY"));
        let resource = configured(GatewayTargetResource::new(), &fake).await;
        let planned = ObjectBuilder::from_value(&config_with(smithy_target(), api_key_credentials()))
            .set("id", Dynamic::Unknown)
            .set("client_token", "token-1")
            .build();

        let response = resource
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: TYPE_NAME.to_string(),
                    planned_state: value(planned.clone()),
                    config: value(planned),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        assert_eq!(get_string(&response.new_state.value, "id").as_deref(), Some("tg-1"));
        assert_eq!(fake.requests_to(Method::GET, TARGET_PATH).len(), 2);

        let body = fake.requests_to(Method::POST, "/gateways/gw-1/targets/")[0]
            .body
            .clone()
            .unwrap();
        assert_eq!(body["clientToken"], "token-1");
        assert_eq!(
            body["targetConfiguration"]["mcp"]["smithyModel"]["s3"]["uri"],
            "s3://models/orders.json"
        );
        assert_eq!(
            body["credentialProviderConfigurations"][0]["credentialProviderType"],
            "API_KEY"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_failure_reports_status_reasons() {
        let fake = FakeTransport::new();
        let mut failed = target_json("FAILED");
        failed["statusReasons"] = json!(["lambda not found", "retry later"]);
        fake.respond(Method::POST, "/gateways/gw-1/targets/", target_json("CREATING"))
            .respond(Method::GET, TARGET_PATH, failed);
        let resource = configured(GatewayTargetResource::new(), &fake).await;
        let planned = ObjectBuilder::from_value(&config_with(smithy_target(), iam_credentials()))
            .set("id", Dynamic::Unknown)
            .build();

        let response = resource
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: TYPE_NAME.to_string(),
                    planned_state: value(planned.clone()),
                    config: value(planned),
                },
            )
            .await;

        assert_eq!(response.diagnostics.len(), 1);
        assert!(response.diagnostics[0]
            .detail
            .contains("lambda not found; retry later"));
        assert_eq!(get_string(&response.new_state.value, "id").as_deref(), Some("tg-1"));
    }

    #[tokio::test]
    async fn test_read_maps_target_back_to_blocks() {
        let fake = FakeTransport::new();
        fake.respond(Method::GET, TARGET_PATH, target_json("READY"));
        let resource = configured(GatewayTargetResource::new(), &fake).await;

        let response = resource
            .read(
                Context::new(),
                ReadResourceRequest {
                    type_name: TYPE_NAME.to_string(),
                    current_state: value(state()),
                },
            )
            .await;

        let state = response.new_state.unwrap().value;
        assert_eq!(target_variant(&state), Some("smithy_model"));
        assert_eq!(credential_variant(&state), Some("gateway_iam_role"));
        assert_eq!(get_string(&state, "gateway_identifier").as_deref(), Some("gw-1"));
    }

    #[tokio::test]
    async fn test_update_skips_call_without_changes() {
        let fake = FakeTransport::new();
        let resource = configured(GatewayTargetResource::new(), &fake).await;

        let response = resource
            .update(
                Context::new(),
                UpdateResourceRequest {
                    type_name: TYPE_NAME.to_string(),
                    prior_state: value(state()),
                    planned_state: value(state()),
                    config: value(state()),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
        assert_eq!(get_string(&response.new_state.value, "id").as_deref(), Some("tg-1"));
        assert!(fake.requests().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_waits_through_lingering_ready() {
        let fake = FakeTransport::new();
        fake.respond(Method::DELETE, TARGET_PATH, json!({"status": "DELETING"}))
            .respond(Method::GET, TARGET_PATH, target_json("READY"))
            .respond(Method::GET, TARGET_PATH, target_json("DELETING"))
            .respond_error(Method::GET, TARGET_PATH, 404, "ResourceNotFoundException", "gone");
        let resource = configured(GatewayTargetResource::new(), &fake).await;

        let response = resource
            .delete(
                Context::new(),
                DeleteResourceRequest {
                    type_name: TYPE_NAME.to_string(),
                    prior_state: value(state()),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        assert_eq!(fake.requests_to(Method::GET, TARGET_PATH).len(), 3);
    }

    #[tokio::test]
    async fn test_switching_credential_kind_requires_replace() {
        let proposed = ObjectBuilder::from_value(&state())
            .block("credential_provider_configuration", Some(api_key_credentials()))
            .build();

        let response = GatewayTargetResource::new()
            .modify_plan(
                Context::new(),
                ModifyPlanRequest {
                    type_name: TYPE_NAME.to_string(),
                    config: value(proposed.clone()),
                    prior_state: value(state()),
                    proposed_new_state: value(proposed),
                },
            )
            .await;

        assert_eq!(response.requires_replace.len(), 1);
        assert_eq!(
            response.requires_replace[0].to_string(),
            "credential_provider_configuration"
        );
    }

    #[tokio::test]
    async fn test_editing_tools_in_place_keeps_target() {
        let second = ObjectBuilder::from_value(&tool())
            .set("name", "cancel_order")
            .build();
        let proposed = ObjectBuilder::from_value(&state())
            .block("target_configuration", Some(lambda_target(vec![tool(), second])))
            .build();

        let response = GatewayTargetResource::new()
            .modify_plan(
                Context::new(),
                ModifyPlanRequest {
                    type_name: TYPE_NAME.to_string(),
                    config: value(proposed.clone()),
                    prior_state: value(state()),
                    proposed_new_state: value(proposed),
                },
            )
            .await;

        assert!(response.requires_replace.is_empty());
    }

    #[tokio::test]
    async fn test_import_splits_gateway_and_target() {
        let response = GatewayTargetResource::new()
            .import_state(
                Context::new(),
                ImportResourceStateRequest {
                    type_name: TYPE_NAME.to_string(),
                    id: "gw-1,tg-1".to_string(),
                    client_capabilities: ClientCapabilities::default(),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
        let state = &response.imported_resources[0].state.value;
        assert_eq!(get_string(state, "gateway_identifier").as_deref(), Some("gw-1"));
        assert_eq!(get_string(state, "id").as_deref(), Some("tg-1"));
    }
}
