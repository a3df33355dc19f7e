use agentcore::api::test_helpers::FakeTransport;
use agentcore::flex::{first_block, get_string, ObjectBuilder};
use agentcore::AgentCoreProvider;
use mockito::{Matcher, Server};
use reqwest::Method;
use serde_json::json;
use serial_test::serial;
use tfplug::types::{Dynamic, DynamicValue};
use tfplug::{Context, PlanAction, ProviderServer};

const RUNTIME: &str = "aws_bedrockagentcore_agent_runtime";
const GATEWAY_TARGET: &str = "aws_bedrockagentcore_gateway_target";
const BROWSER: &str = "aws_bedrockagentcore_browser";

async fn server_with(fake: &FakeTransport) -> ProviderServer<AgentCoreProvider> {
    let mut server = ProviderServer::new(AgentCoreProvider::with_client(fake.client()));
    let diagnostics = server
        .configure(Context::new(), DynamicValue::new(ObjectBuilder::new().build()))
        .await;
    assert!(diagnostics.is_empty(), "{:?}", diagnostics);
    server
}

fn runtime_config() -> Dynamic {
    let container = ObjectBuilder::new()
        .set("container_uri", "123456789012.dkr.ecr.us-east-1.amazonaws.com/agent:v1")
        .build();
    ObjectBuilder::new()
        .set("agent_runtime_name", "support_agent")
        .set("role_arn", "arn:aws:iam::123456789012:role/agent")
        .block(
            "agent_runtime_artifact",
            Some(
                ObjectBuilder::new()
                    .block("container_configuration", Some(container))
                    .build(),
            ),
        )
        .block(
            "network_configuration",
            Some(ObjectBuilder::new().set("network_mode", "PUBLIC").build()),
        )
        .build()
}

fn runtime_json(status: &str) -> serde_json::Value {
    json!({
        "agentRuntimeArn": "arn:aws:bedrock-agentcore:us-east-1:123456789012:runtime/rt-1",
        "agentRuntimeId": "rt-1",
        "agentRuntimeName": "support_agent",
        "agentRuntimeVersion": "1",
        "agentRuntimeArtifact": {"containerConfiguration": {
            "containerUri": "123456789012.dkr.ecr.us-east-1.amazonaws.com/agent:v1"
        }},
        "roleArn": "arn:aws:iam::123456789012:role/agent",
        "networkConfiguration": {"networkMode": "PUBLIC"},
        "status": status
    })
}

#[tokio::test(start_paused = true)]
async fn runtime_create_plans_applies_and_reads_back() {
    let fake = FakeTransport::new();
    fake.respond(
        Method::PUT,
        "/runtimes/",
        json!({"agentRuntimeId": "rt-1", "agentRuntimeArn": "arn:runtime/rt-1", "status": "CREATING"}),
    )
    .respond(Method::GET, "/runtimes/rt-1/", runtime_json("CREATING"))
    .respond(Method::GET, "/runtimes/rt-1/", runtime_json("READY"));
    let server = server_with(&fake).await;
    let config = DynamicValue::new(runtime_config());

    let diagnostics = server
        .validate_resource_config(Context::new(), RUNTIME, &config)
        .await;
    assert!(diagnostics.is_empty(), "{:?}", diagnostics);

    let change = server
        .plan_resource_change(Context::new(), RUNTIME, &DynamicValue::null(), &config)
        .await;
    assert_eq!(change.action, PlanAction::Create);
    assert!(change.planned_state.value.get("agent_runtime_id").is_unknown());

    let applied = server
        .apply_resource_change(Context::new(), RUNTIME, &DynamicValue::null(), &change, &config)
        .await;
    assert!(applied.diagnostics.is_empty(), "{:?}", applied.diagnostics);
    assert_eq!(
        get_string(&applied.new_state.value, "agent_runtime_id").as_deref(),
        Some("rt-1")
    );
    // Two consecutive READY polls before the create completes
    assert_eq!(fake.requests_to(Method::GET, "/runtimes/rt-1/").len(), 3);

    let read = server
        .read_resource(Context::new(), RUNTIME, &applied.new_state)
        .await;
    let state = read.new_state.unwrap().value;
    let container = first_block(&state, "agent_runtime_artifact")
        .and_then(|artifact| first_block(artifact, "container_configuration"))
        .unwrap();
    assert_eq!(
        get_string(container, "container_uri").as_deref(),
        Some("123456789012.dkr.ecr.us-east-1.amazonaws.com/agent:v1")
    );
    assert!(get_string(&state, "agent_runtime_version").is_some_and(|v| !v.is_empty()));

    let replan = server
        .plan_resource_change(Context::new(), RUNTIME, &DynamicValue::new(state), &config)
        .await;
    assert_eq!(replan.action, PlanAction::NoOp);
}

#[tokio::test]
async fn runtime_name_pattern_is_enforced() {
    let fake = FakeTransport::new();
    let server = server_with(&fake).await;
    let config = ObjectBuilder::from_value(&runtime_config())
        .set("agent_runtime_name", "support-agent")
        .build();

    let diagnostics = server
        .validate_resource_config(Context::new(), RUNTIME, &DynamicValue::new(config))
        .await;
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(
        diagnostics[0].attribute.as_ref().map(|p| p.to_string()).as_deref(),
        Some("agent_runtime_name")
    );
}

fn target_config(kind: &str, payload: Dynamic) -> Dynamic {
    target_config_with(kind, payload, "gateway_iam_role", ObjectBuilder::new().build())
}

fn target_config_with(kind: &str, payload: Dynamic, credential: &str, settings: Dynamic) -> Dynamic {
    ObjectBuilder::new()
        .set("gateway_identifier", "gw-1")
        .set("name", "orders")
        .block(
            "target_configuration",
            Some(
                ObjectBuilder::new()
                    .block(
                        "mcp",
                        Some(ObjectBuilder::new().block(kind, Some(payload)).build()),
                    )
                    .build(),
            ),
        )
        .block(
            "credential_provider_configuration",
            Some(
                ObjectBuilder::new()
                    .block(credential, Some(settings))
                    .build(),
            ),
        )
        .build()
}

fn s3_payload(uri: &str) -> Dynamic {
    ObjectBuilder::new()
        .block("s3", Some(ObjectBuilder::new().set("uri", uri).build()))
        .build()
}

#[tokio::test]
async fn switching_gateway_target_kind_plans_replace() {
    let fake = FakeTransport::new();
    let server = server_with(&fake).await;
    let prior = ObjectBuilder::from_value(&target_config(
        "smithy_model",
        s3_payload("s3://models/orders.json"),
    ))
    .set("id", "tg-1")
    .build();

    let same_kind = DynamicValue::new(target_config(
        "smithy_model",
        s3_payload("s3://models/orders-v2.json"),
    ));
    let change = server
        .plan_resource_change(
            Context::new(),
            GATEWAY_TARGET,
            &DynamicValue::new(prior.clone()),
            &same_kind,
        )
        .await;
    assert_eq!(change.action, PlanAction::Update);

    let other_kind = DynamicValue::new(target_config(
        "open_api_schema",
        s3_payload("s3://specs/orders.yaml"),
    ));
    let change = server
        .plan_resource_change(
            Context::new(),
            GATEWAY_TARGET,
            &DynamicValue::new(prior),
            &other_kind,
        )
        .await;
    assert_eq!(change.action, PlanAction::Replace);
    assert!(change
        .requires_replace
        .iter()
        .any(|path| path.to_string() == "target_configuration"));
    assert!(fake.requests().is_empty());
}

#[tokio::test]
async fn switching_gateway_target_credentials_plans_replace() {
    let fake = FakeTransport::new();
    let server = server_with(&fake).await;
    let prior = ObjectBuilder::from_value(&target_config(
        "smithy_model",
        s3_payload("s3://models/orders.json"),
    ))
    .set("id", "tg-1")
    .build();
    let api_key = ObjectBuilder::new()
        .set("provider_arn", "arn:aws:bedrock-agentcore:us-east-1:123456789012:token-vault/default/apikeycredentialprovider/orders")
        .set("credential_location", "HEADER")
        .build();
    let config = DynamicValue::new(target_config_with(
        "smithy_model",
        s3_payload("s3://models/orders-v2.json"),
        "api_key",
        api_key,
    ));

    let change = server
        .plan_resource_change(Context::new(), GATEWAY_TARGET, &DynamicValue::new(prior), &config)
        .await;
    assert_eq!(change.action, PlanAction::Replace);
    assert_eq!(
        change
            .requires_replace
            .iter()
            .map(|path| path.to_string())
            .collect::<Vec<_>>(),
        vec!["credential_provider_configuration".to_string()]
    );
}

#[tokio::test]
async fn destroying_an_already_deleted_browser_succeeds() {
    let fake = FakeTransport::new();
    fake.respond_error(
        Method::DELETE,
        "/browsers/br-1",
        404,
        "ResourceNotFoundException",
        "Browser br-1 not found",
    );
    let server = server_with(&fake).await;
    let prior = DynamicValue::new(
        ObjectBuilder::new()
            .set("name", "web")
            .set("browser_id", "br-1")
            .set("browser_arn", "arn:browser/br-1")
            .block(
                "network_configuration",
                Some(ObjectBuilder::new().set("network_mode", "PUBLIC").build()),
            )
            .build(),
    );

    let change = server
        .plan_resource_change(Context::new(), BROWSER, &prior, &DynamicValue::null())
        .await;
    assert_eq!(change.action, PlanAction::Delete);

    let applied = server
        .apply_resource_change(Context::new(), BROWSER, &prior, &change, &DynamicValue::null())
        .await;
    assert!(applied.diagnostics.is_empty(), "{:?}", applied.diagnostics);
    assert!(applied.new_state.is_null());
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn configured_from_environment_signs_requests() {
    let mut mock = Server::new_async().await;
    let get = mock
        .mock("POST", "/identities/GetWorkloadIdentity")
        .match_header(
            "authorization",
            Matcher::Regex("^AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/".to_string()),
        )
        .match_body(Matcher::Json(json!({"name": "agent"})))
        .with_header("content-type", "application/json")
        .with_body(r#"{"name":"agent","workloadIdentityArn":"arn:workload/agent"}"#)
        .create_async()
        .await;

    std::env::set_var("AWS_ACCESS_KEY_ID", "AKIDEXAMPLE");
    std::env::set_var("AWS_SECRET_ACCESS_KEY", "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY");
    std::env::set_var("AWS_EC2_METADATA_DISABLED", "true");

    let mut server = ProviderServer::new(AgentCoreProvider::new());
    let config = ObjectBuilder::new()
        .set("region", "us-east-1")
        .set("endpoint", mock.url())
        .number("max_retries", Some(0))
        .build();
    let diagnostics = server
        .configure(Context::new(), DynamicValue::new(config))
        .await;
    assert!(diagnostics.is_empty(), "{:?}", diagnostics);

    let imported = server
        .import_resource_state(Context::new(), "aws_bedrockagentcore_workload_identity", "agent")
        .await;

    std::env::remove_var("AWS_ACCESS_KEY_ID");
    std::env::remove_var("AWS_SECRET_ACCESS_KEY");
    std::env::remove_var("AWS_EC2_METADATA_DISABLED");

    assert!(imported.diagnostics.is_empty(), "{:?}", imported.diagnostics);
    assert_eq!(
        get_string(&imported.imported_resources[0].state.value, "workload_identity_arn").as_deref(),
        Some("arn:workload/agent")
    );
    get.assert_async().await;
}
