#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::api::test_helpers::FakeTransport;
    use crate::resources::test_support::{configured, value};
    use reqwest::Method;
    use serde_json::json;
    use tfplug::types::ClientCapabilities;

    const RUNTIME_PATH: &str = "/runtimes/rt-1/";

    fn container(uri: &str) -> Dynamic {
        ObjectBuilder::new()
            .block(
                "container_configuration",
                Some(ObjectBuilder::new().set("container_uri", uri).build()),
            )
            .build()
    }

    fn config_with(artifact: Dynamic) -> Dynamic {
        ObjectBuilder::new()
            .set("agent_runtime_name", "support_agent")
            .set("role_arn", "arn:aws:iam::123456789012:role/agent")
            .block("agent_runtime_artifact", Some(artifact))
            .block(
                "network_configuration",
                Some(ObjectBuilder::new().set("network_mode", "PUBLIC").build()),
            )
            .build()
    }

    fn planned_create() -> Dynamic {
        ObjectBuilder::from_value(&config_with(container("123.dkr.ecr/agent:v1")))
            .set("agent_runtime_arn", Dynamic::Unknown)
            .set("agent_runtime_id", Dynamic::Unknown)
            .set("agent_runtime_version", Dynamic::Unknown)
            .set("workload_identity_arn", Dynamic::Unknown)
            .build()
    }

    fn state() -> Dynamic {
        ObjectBuilder::from_value(&config_with(container("123.dkr.ecr/agent:v1")))
            .set("agent_runtime_arn", "arn:aws:bedrock-agentcore:us-east-1:123:runtime/rt-1")
            .set("agent_runtime_id", "rt-1")
            .set("agent_runtime_version", "1")
            .set("workload_identity_arn", "arn:wi")
            .build()
    }

    fn runtime_json(status: &str, version: &str) -> serde_json::Value {
        json!({
            "agentRuntimeArn": "arn:aws:bedrock-agentcore:us-east-1:123:runtime/rt-1",
            "agentRuntimeId": "rt-1",
            "agentRuntimeName": "support_agent",
            "agentRuntimeVersion": version,
            "agentRuntimeArtifact": {"containerConfiguration": {"containerUri": "123.dkr.ecr/agent:v1"}},
            "roleArn": "arn:aws:iam::123456789012:role/agent",
            "networkConfiguration": {"networkMode": "PUBLIC"},
            "workloadIdentityDetails": {"workloadIdentityArn": "arn:wi"},
            "status": status
        })
    }

    fn summary_json(status: &str) -> serde_json::Value {
        json!({
            "agentRuntimeArn": "arn:aws:bedrock-agentcore:us-east-1:123:runtime/rt-1",
            "agentRuntimeId": "rt-1",
            "agentRuntimeVersion": "1",
            "status": status
        })
    }

    async fn validate(config: Dynamic) -> Vec<Diagnostic> {
        AgentRuntimeResource::new()
            .validate(
                Context::new(),
                ValidateResourceConfigRequest {
                    type_name: "aws_bedrockagentcore_agent_runtime".to_string(),
                    config: value(config),
                    client_capabilities: ClientCapabilities::default(),
                },
            )
            .await
            .diagnostics
    }

    #[test]
    fn test_resource_type_name() {
        let resource = AgentRuntimeResource::new();
        assert_eq!(resource.type_name(), "aws_bedrockagentcore_agent_runtime");
    }

    #[tokio::test]
    async fn test_resource_schema() {
        let response = AgentRuntimeResource::new()
            .schema(Context::new(), ResourceSchemaRequest)
            .await;
        let block = &response.schema.block;

        assert!(block.attribute("agent_runtime_name").is_some_and(|a| a.required));
        assert!(block.attribute("agent_runtime_version").is_some_and(|a| a.computed));
        let artifact = block.nested_block("agent_runtime_artifact").unwrap();
        assert_eq!(artifact.min_items, 1);
        assert_eq!(artifact.max_items, 1);
        assert!(block.nested_block("timeouts").is_some());
    }

    #[tokio::test]
    async fn test_validate_accepts_container_artifact() {
        let diagnostics = validate(config_with(container("uri"))).await;
        assert!(diagnostics.is_empty(), "{:?}", diagnostics);
    }

    #[tokio::test]
    async fn test_validate_rejects_two_artifacts() {
        let both = ObjectBuilder::from_value(&container("uri"))
            .block(
                "code_configuration",
                Some(ObjectBuilder::new().set("runtime", "PYTHON_3_12").build()),
            )
            .build();
        let diagnostics = validate(config_with(both)).await;
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].summary, "Invalid agent_runtime_artifact");
    }

    #[tokio::test]
    async fn test_validate_vpc_requires_config() {
        let config = ObjectBuilder::from_value(&config_with(container("uri")))
            .block(
                "network_configuration",
                Some(ObjectBuilder::new().set("network_mode", "VPC").build()),
            )
            .build();
        let diagnostics = validate(config).await;
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].summary, "Missing network_mode_config");
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_waits_for_ready() {
        let fake = FakeTransport::new();
        fake.respond(Method::PUT, "/runtimes/", summary_json("CREATING"))
            .respond(Method::GET, RUNTIME_PATH, runtime_json("CREATING", "1"))
            .respond(Method::GET, RUNTIME_PATH, runtime_json("READY", "1"));
        let resource = configured(AgentRuntimeResource::new(), &fake).await;

        let response = resource
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: "aws_bedrockagentcore_agent_runtime".to_string(),
                    planned_state: value(planned_create()),
                    config: value(config_with(container("123.dkr.ecr/agent:v1"))),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        let state = &response.new_state.value;
        assert_eq!(get_string(state, "agent_runtime_id").as_deref(), Some("rt-1"));
        assert_eq!(get_string(state, "agent_runtime_version").as_deref(), Some("1"));
        assert_eq!(get_string(state, "workload_identity_arn").as_deref(), Some("arn:wi"));
        // CREATING once, then READY twice in a row
        assert_eq!(fake.requests_to(Method::GET, RUNTIME_PATH).len(), 3);

        let body = fake.requests_to(Method::PUT, "/runtimes/")[0].body.clone().unwrap();
        assert_eq!(body["agentRuntimeName"], "support_agent");
        assert_eq!(
            body["agentRuntimeArtifact"]["containerConfiguration"]["containerUri"],
            "123.dkr.ecr/agent:v1"
        );
        assert!(body["clientToken"].is_string());
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_retries_while_role_propagates() {
        let fake = FakeTransport::new();
        fake.respond_error(
            Method::PUT,
            "/runtimes/",
            400,
            "ValidationException",
            "Role validation failed for arn:aws:iam::123456789012:role/agent",
        )
        .respond(Method::PUT, "/runtimes/", summary_json("CREATING"))
        .respond(Method::GET, RUNTIME_PATH, runtime_json("READY", "1"));
        let resource = configured(AgentRuntimeResource::new(), &fake).await;

        let response = resource
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: "aws_bedrockagentcore_agent_runtime".to_string(),
                    planned_state: value(planned_create()),
                    config: value(config_with(container("123.dkr.ecr/agent:v1"))),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        let creates = fake.requests_to(Method::PUT, "/runtimes/");
        assert_eq!(creates.len(), 2);
        assert_eq!(
            creates[0].body.as_ref().unwrap()["clientToken"],
            creates[1].body.as_ref().unwrap()["clientToken"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_failure_keeps_identity() {
        let fake = FakeTransport::new();
        let mut failed = runtime_json("CREATE_FAILED", "1");
        failed["failureReason"] = json!("image not found");
        fake.respond(Method::PUT, "/runtimes/", summary_json("CREATING"))
            .respond(Method::GET, RUNTIME_PATH, failed);
        let resource = configured(AgentRuntimeResource::new(), &fake).await;

        let response = resource
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: "aws_bedrockagentcore_agent_runtime".to_string(),
                    planned_state: value(planned_create()),
                    config: value(config_with(container("123.dkr.ecr/agent:v1"))),
                },
            )
            .await;

        assert_eq!(response.diagnostics.len(), 1);
        assert!(response.diagnostics[0].detail.contains("image not found"));
        let state = &response.new_state.value;
        assert_eq!(get_string(state, "agent_runtime_id").as_deref(), Some("rt-1"));
        assert!(state.get("workload_identity_arn").is_null());
    }

    #[tokio::test]
    async fn test_read_removes_missing_runtime() {
        let fake = FakeTransport::new();
        fake.respond_error(
            Method::GET,
            RUNTIME_PATH,
            404,
            "ResourceNotFoundException",
            "runtime rt-1 not found",
        );
        let resource = configured(AgentRuntimeResource::new(), &fake).await;

        let response = resource
            .read(
                Context::new(),
                ReadResourceRequest {
                    type_name: "aws_bedrockagentcore_agent_runtime".to_string(),
                    current_state: value(state()),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
        assert!(response.new_state.is_none());
    }

    #[tokio::test]
    async fn test_update_without_changes_keeps_version() {
        let fake = FakeTransport::new();
        let resource = configured(AgentRuntimeResource::new(), &fake).await;
        let planned = ObjectBuilder::from_value(&state())
            .set("agent_runtime_version", Dynamic::Unknown)
            .set(
                "timeouts",
                ObjectBuilder::new().set("update", "45m").build(),
            )
            .build();

        let response = resource
            .update(
                Context::new(),
                UpdateResourceRequest {
                    type_name: "aws_bedrockagentcore_agent_runtime".to_string(),
                    prior_state: value(state()),
                    planned_state: value(planned),
                    config: value(config_with(container("123.dkr.ecr/agent:v1"))),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
        assert_eq!(
            get_string(&response.new_state.value, "agent_runtime_version").as_deref(),
            Some("1")
        );
        assert!(fake.requests().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_new_image_bumps_version() {
        let fake = FakeTransport::new();
        fake.respond(Method::PUT, RUNTIME_PATH, summary_json("UPDATING"))
            .respond(Method::GET, RUNTIME_PATH, runtime_json("UPDATING", "2"))
            .respond(Method::GET, RUNTIME_PATH, runtime_json("READY", "2"));
        let resource = configured(AgentRuntimeResource::new(), &fake).await;
        let planned = ObjectBuilder::from_value(&state())
            .block("agent_runtime_artifact", Some(container("123.dkr.ecr/agent:v1")))
            .set("role_arn", "arn:aws:iam::123456789012:role/agent-v2")
            .set("agent_runtime_version", Dynamic::Unknown)
            .build();

        let response = resource
            .update(
                Context::new(),
                UpdateResourceRequest {
                    type_name: "aws_bedrockagentcore_agent_runtime".to_string(),
                    prior_state: value(state()),
                    planned_state: value(planned),
                    config: value(config_with(container("123.dkr.ecr/agent:v1"))),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        assert_eq!(
            get_string(&response.new_state.value, "agent_runtime_version").as_deref(),
            Some("2")
        );
        let body = fake.requests_to(Method::PUT, RUNTIME_PATH)[0].body.clone().unwrap();
        assert_eq!(body["roleArn"], "arn:aws:iam::123456789012:role/agent-v2");
    }

    #[tokio::test]
    async fn test_delete_of_missing_runtime_succeeds() {
        let fake = FakeTransport::new();
        fake.respond_error(
            Method::DELETE,
            RUNTIME_PATH,
            404,
            "ResourceNotFoundException",
            "gone",
        );
        let resource = configured(AgentRuntimeResource::new(), &fake).await;

        let response = resource
            .delete(
                Context::new(),
                DeleteResourceRequest {
                    type_name: "aws_bedrockagentcore_agent_runtime".to_string(),
                    prior_state: value(state()),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
        assert!(fake.requests_to(Method::GET, RUNTIME_PATH).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_waits_until_gone() {
        let fake = FakeTransport::new();
        fake.respond(Method::DELETE, RUNTIME_PATH, json!({"status": "DELETING"}))
            .respond(Method::GET, RUNTIME_PATH, runtime_json("DELETING", "1"))
            .respond_error(Method::GET, RUNTIME_PATH, 404, "ResourceNotFoundException", "gone");
        let resource = configured(AgentRuntimeResource::new(), &fake).await;

        let response = resource
            .delete(
                Context::new(),
                DeleteResourceRequest {
                    type_name: "aws_bedrockagentcore_agent_runtime".to_string(),
                    prior_state: value(state()),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        assert_eq!(fake.requests_to(Method::GET, RUNTIME_PATH).len(), 2);
    }

    #[tokio::test]
    async fn test_switching_artifact_kind_requires_replace() {
        let code = ObjectBuilder::new()
            .block(
                "code_configuration",
                Some(ObjectBuilder::new().set("runtime", "PYTHON_3_12").build()),
            )
            .build();
        let resource = AgentRuntimeResource::new();

        let response = resource
            .modify_plan(
                Context::new(),
                ModifyPlanRequest {
                    type_name: "aws_bedrockagentcore_agent_runtime".to_string(),
                    config: value(config_with(code.clone())),
                    prior_state: value(state()),
                    proposed_new_state: value(config_with(code)),
                },
            )
            .await;

        assert_eq!(response.requires_replace.len(), 1);
        assert_eq!(response.requires_replace[0].to_string(), "agent_runtime_artifact");
    }

    #[tokio::test]
    async fn test_import_sets_runtime_id() {
        let resource = AgentRuntimeResource::new();
        let response = resource
            .import_state(
                Context::new(),
                ImportResourceStateRequest {
                    type_name: "aws_bedrockagentcore_agent_runtime".to_string(),
                    id: "rt-1".to_string(),
                    client_capabilities: ClientCapabilities::default(),
                },
            )
            .await;

        assert_eq!(response.imported_resources.len(), 1);
        assert_eq!(
            get_string(&response.imported_resources[0].state.value, "agent_runtime_id").as_deref(),
            Some("rt-1")
        );
    }
}
