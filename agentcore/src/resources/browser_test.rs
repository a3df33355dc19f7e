#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::api::test_helpers::FakeTransport;
    use crate::resources::test_support::{configured, value};
    use reqwest::Method;
    use serde_json::json;
    use tfplug::types::ClientCapabilities;

    const TYPE_NAME: &str = "aws_bedrockagentcore_browser";
    const BROWSER_PATH: &str = "/browsers/br-1";

    fn network(mode: &str) -> Dynamic {
        ObjectBuilder::new().set("network_mode", mode).build()
    }

    fn config() -> Dynamic {
        let s3 = ObjectBuilder::new()
            .set("bucket", "recordings")
            .set("prefix", "web/")
            .build();
        ObjectBuilder::new()
            .set("name", "web_browser")
            .set("execution_role_arn", "arn:aws:iam::123456789012:role/browser")
            .block("network_configuration", Some(network("PUBLIC")))
            .block(
                "recording",
                Some(
                    ObjectBuilder::new()
                        .set("enabled", true)
                        .block("s3_location", Some(s3))
                        .build(),
                ),
            )
            .build()
    }

    fn state() -> Dynamic {
        ObjectBuilder::from_value(&config())
            .set("browser_id", "br-1")
            .set("browser_arn", "arn:browser/br-1")
            .build()
    }

    fn browser_json(status: &str) -> serde_json::Value {
        json!({
            "browserId": "br-1",
            "browserArn": "arn:browser/br-1",
            "name": "web_browser",
            "executionRoleArn": "arn:aws:iam::123456789012:role/browser",
            "networkConfiguration": {"networkMode": "PUBLIC"},
            "recording": {"enabled": true, "s3Location": {"bucket": "recordings", "prefix": "web/"}},
            "status": status
        })
    }

    #[tokio::test]
    async fn test_vpc_mode_needs_vpc_config() {
        let config = ObjectBuilder::from_value(&config())
            .block("network_configuration", Some(network("VPC")))
            .build();
        let response = BrowserResource::new()
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
        assert_eq!(response.diagnostics[0].summary, "Missing vpc_config");
    }

    #[tokio::test]
    async fn test_every_argument_forces_replacement() {
        let schema = BrowserResource::new()
            .schema(Context::new(), ResourceSchemaRequest)
            .await
            .schema;
        for name in ["name", "description", "execution_role_arn"] {
            let attr = schema.block.attribute(name).unwrap();
            assert_eq!(attr.plan_modifiers.len(), 1, "{}", name);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_waits_for_ready() {
        let fake = FakeTransport::new();
        fake.respond(Method::PUT, "/browsers", browser_json("CREATING"))
            .respond(Method::GET, BROWSER_PATH, browser_json("CREATING"))
            .respond(Method::GET, BROWSER_PATH, browser_json("READY"));
        let resource = configured(BrowserResource::new(), &fake).await;
        let planned = ObjectBuilder::from_value(&config())
            .set("browser_id", Dynamic::Unknown)
            .set("browser_arn", Dynamic::Unknown)
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
            get_string(&response.new_state.value, "browser_id").as_deref(),
            Some("br-1")
        );
        let body = fake.requests_to(Method::PUT, "/browsers")[0].body.clone().unwrap();
        assert_eq!(body["recording"]["s3Location"]["bucket"], "recordings");
        assert!(body["clientToken"].is_string());
        assert_eq!(fake.requests_to(Method::GET, BROWSER_PATH).len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_failure_keeps_identity() {
        let fake = FakeTransport::new();
        let mut failed = browser_json("CREATE_FAILED");
        failed["failureReason"] = json!("bucket not found");
        fake.respond(Method::PUT, "/browsers", browser_json("CREATING"))
            .respond(Method::GET, BROWSER_PATH, failed);
        let resource = configured(BrowserResource::new(), &fake).await;

        let response = resource
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: TYPE_NAME.to_string(),
                    planned_state: value(config()),
                    config: value(config()),
                },
            )
            .await;

        assert_eq!(response.diagnostics.len(), 1);
        assert!(response.diagnostics[0].detail.contains("bucket not found"));
        assert_eq!(
            get_string(&response.new_state.value, "browser_id").as_deref(),
            Some("br-1")
        );
    }

    #[tokio::test]
    async fn test_deleted_status_removes_from_state() {
        let fake = FakeTransport::new();
        fake.respond(Method::GET, BROWSER_PATH, browser_json("DELETED"));
        let resource = configured(BrowserResource::new(), &fake).await;

        let response = resource
            .read(
                Context::new(),
                ReadResourceRequest {
                    type_name: TYPE_NAME.to_string(),
                    current_state: value(state()),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty());
        assert!(response.new_state.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_waits_until_deleted() {
        let fake = FakeTransport::new();
        fake.respond(Method::DELETE, BROWSER_PATH, json!({"status": "DELETING"}))
            .respond(Method::GET, BROWSER_PATH, browser_json("DELETING"))
            .respond(Method::GET, BROWSER_PATH, browser_json("DELETED"));
        let resource = configured(BrowserResource::new(), &fake).await;

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
        assert_eq!(fake.requests_to(Method::GET, BROWSER_PATH).len(), 2);
    }

    #[tokio::test]
    async fn test_update_keeps_identity_without_calls() {
        let fake = FakeTransport::new();
        let resource = configured(BrowserResource::new(), &fake).await;
        let planned = ObjectBuilder::from_value(&config())
            .set("browser_id", Dynamic::Unknown)
            .set("browser_arn", Dynamic::Unknown)
            .build();

        let response = resource
            .update(
                Context::new(),
                UpdateResourceRequest {
                    type_name: TYPE_NAME.to_string(),
                    prior_state: value(state()),
                    planned_state: value(planned),
                    config: value(config()),
                },
            )
            .await;

        assert_eq!(
            get_string(&response.new_state.value, "browser_arn").as_deref(),
            Some("arn:browser/br-1")
        );
        assert!(fake.requests().is_empty());
    }
}
