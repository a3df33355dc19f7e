#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::api::test_helpers::FakeTransport;
    use crate::resources::test_support::{configured, value};
    use reqwest::Method;
    use serde_json::json;
    use tfplug::types::ClientCapabilities;

    const TYPE_NAME: &str = "aws_bedrockagentcore_code_interpreter";
    const INTERPRETER_PATH: &str = "/code-interpreters/ci-1";

    fn config() -> Dynamic {
        ObjectBuilder::new()
            .set("name", "sandboxed")
            .block(
                "network_configuration",
                Some(ObjectBuilder::new().set("network_mode", "SANDBOX").build()),
            )
            .build()
    }

    fn state() -> Dynamic {
        ObjectBuilder::from_value(&config())
            .set("code_interpreter_id", "ci-1")
            .set("code_interpreter_arn", "arn:code-interpreter/ci-1")
            .build()
    }

    fn interpreter_json(status: &str) -> serde_json::Value {
        json!({
            "codeInterpreterId": "ci-1",
            "codeInterpreterArn": "arn:code-interpreter/ci-1",
            "name": "sandboxed",
            "networkConfiguration": {"networkMode": "SANDBOX"},
            "status": status
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_in_sandbox_mode() {
        let fake = FakeTransport::new();
        fake.respond(Method::PUT, "/code-interpreters", interpreter_json("CREATING"))
            .respond(Method::GET, INTERPRETER_PATH, interpreter_json("READY"));
        let resource = configured(CodeInterpreterResource::new(), &fake).await;
        let planned = ObjectBuilder::from_value(&config())
            .set("code_interpreter_id", Dynamic::Unknown)
            .set("code_interpreter_arn", Dynamic::Unknown)
            .build();

        let response = resource
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: TYPE_NAME.to_string(),
                    planned_state: value(planned),
                    config: value(config()),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        assert_eq!(
            get_string(&response.new_state.value, "code_interpreter_arn").as_deref(),
            Some("arn:code-interpreter/ci-1")
        );
        let body = fake.requests_to(Method::PUT, "/code-interpreters")[0]
            .body
            .clone()
            .unwrap();
        assert_eq!(body["networkConfiguration"], json!({"networkMode": "SANDBOX"}));
    }

    #[tokio::test]
    async fn test_missing_interpreter_is_removed() {
        let fake = FakeTransport::new();
        fake.respond_error(
            Method::GET,
            INTERPRETER_PATH,
            404,
            "ResourceNotFoundException",
            "no such interpreter",
        );
        let resource = configured(CodeInterpreterResource::new(), &fake).await;

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
    }

    #[tokio::test]
    async fn test_delete_of_missing_interpreter_succeeds() {
        let fake = FakeTransport::new();
        fake.respond_error(
            Method::DELETE,
            INTERPRETER_PATH,
            404,
            "ResourceNotFoundException",
            "no such interpreter",
        );
        let resource = configured(CodeInterpreterResource::new(), &fake).await;

        let response = resource
            .delete(
                Context::new(),
                DeleteResourceRequest {
                    type_name: TYPE_NAME.to_string(),
                    prior_state: value(state()),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
        assert!(fake.requests_to(Method::GET, INTERPRETER_PATH).is_empty());
    }

    #[tokio::test]
    async fn test_import_by_id() {
        let response = CodeInterpreterResource::new()
            .import_state(
                Context::new(),
                ImportResourceStateRequest {
                    type_name: TYPE_NAME.to_string(),
                    id: "ci-1".to_string(),
                    client_capabilities: ClientCapabilities::default(),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
        let state = &response.imported_resources[0].state.value;
        assert_eq!(get_string(state, "code_interpreter_id").as_deref(), Some("ci-1"));
    }
}
