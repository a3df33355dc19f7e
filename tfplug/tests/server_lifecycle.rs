//! Drives a small in-memory provider through ProviderServer

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tfplug::context::Context;
use tfplug::plan_modifier::{RequiresReplaceIfChanged, UseStateForUnknown};
use tfplug::provider::{ConfigureProviderRequest, ConfigureProviderResponse};
use tfplug::resource::*;
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use tfplug::{
    AttributeBuilder, AttributeType, PlanAction, Provider, ProviderServer, ResourceRegistry,
    Schema, SchemaBuilder,
};

type Store = Arc<Mutex<HashMap<String, String>>>;

struct NotesProvider {
    store: Store,
    fail_deletes: bool,
}

#[async_trait]
impl Provider for NotesProvider {
    fn type_name(&self) -> &str {
        "notes"
    }

    async fn schema(&self, _ctx: Context) -> Schema {
        SchemaBuilder::new().build()
    }

    async fn configure(
        &mut self,
        _ctx: Context,
        _request: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse {
        ConfigureProviderResponse {
            diagnostics: vec![],
            provider_data: Some(Arc::new((self.store.clone(), self.fail_deletes))),
        }
    }

    fn resources(&self) -> ResourceRegistry {
        let mut registry = ResourceRegistry::new();
        registry.register("notes_note", note).unwrap();
        registry
    }
}

fn note() -> Box<dyn Resource> {
    Box::new(NoteResource::default())
}

#[derive(Default)]
struct NoteResource {
    store: Option<Store>,
    fail_deletes: bool,
}

impl NoteResource {
    fn store(&self) -> &Store {
        self.store.as_ref().expect("configured")
    }

    fn state(name: &str, body: &str) -> DynamicValue {
        DynamicValue::object(HashMap::from([
            ("name".to_string(), Dynamic::from(name)),
            ("body".to_string(), Dynamic::from(body)),
            ("id".to_string(), Dynamic::from(format!("note-{}", name))),
        ]))
    }
}

#[async_trait]
impl Resource for NoteResource {
    fn type_name(&self) -> &str {
        "notes_note"
    }

    async fn schema(&self, _ctx: Context, _request: ResourceSchemaRequest) -> ResourceSchemaResponse {
        let schema = SchemaBuilder::new()
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .required()
                    .plan_modifier(RequiresReplaceIfChanged::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("body", AttributeType::String)
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
                    .build(),
            )
            .build();
        ResourceSchemaResponse {
            schema,
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        let mut diagnostics = vec![];
        if request.config.value.get("body").as_string() == Some("") {
            diagnostics.push(
                Diagnostic::error("Empty body", "body must not be empty")
                    .with_attribute(AttributePath::new("body")),
            );
        }
        ValidateResourceConfigResponse { diagnostics }
    }

    async fn create(&self, _ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        let planned = &request.planned_state.value;
        let name = planned.get("name").as_string().unwrap_or_default();
        let body = planned.get("body").as_string().unwrap_or_default();
        self.store()
            .lock()
            .unwrap()
            .insert(name.to_string(), body.to_string());
        CreateResourceResponse {
            new_state: Self::state(name, body),
            diagnostics: vec![],
        }
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let name = request
            .current_state
            .value
            .get("name")
            .as_string()
            .unwrap_or_default()
            .to_string();
        let body = self.store().lock().unwrap().get(&name).cloned();
        ReadResourceResponse {
            new_state: body.map(|body| Self::state(&name, &body)),
            diagnostics: vec![],
        }
    }

    async fn update(&self, _ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let planned = &request.planned_state.value;
        let name = planned.get("name").as_string().unwrap_or_default();
        let body = planned.get("body").as_string().unwrap_or_default();
        self.store()
            .lock()
            .unwrap()
            .insert(name.to_string(), body.to_string());
        UpdateResourceResponse {
            new_state: request.planned_state.clone(),
            diagnostics: vec![],
        }
    }

    async fn delete(&self, _ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        if self.fail_deletes {
            return DeleteResourceResponse {
                diagnostics: vec![Diagnostic::error("Delete failed", "store is read-only")],
            };
        }
        let name = request.prior_state.value.get("name").as_string().unwrap_or_default();
        self.store().lock().unwrap().remove(name);
        DeleteResourceResponse {
            diagnostics: vec![],
        }
    }

    fn as_configure(&mut self) -> Option<&mut dyn ResourceWithConfigure> {
        Some(self)
    }
}

#[async_trait]
impl ResourceWithConfigure for NoteResource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
        let data = request
            .provider_data
            .as_ref()
            .and_then(|data| data.downcast_ref::<(Store, bool)>());
        match data {
            Some((store, fail_deletes)) => {
                self.store = Some(store.clone());
                self.fail_deletes = *fail_deletes;
                ConfigureResourceResponse {
                    diagnostics: vec![],
                }
            }
            None => ConfigureResourceResponse {
                diagnostics: vec![Diagnostic::error("Unconfigured", "provider data missing")],
            },
        }
    }
}

fn note_config(name: &str, body: &str) -> DynamicValue {
    DynamicValue::object(HashMap::from([
        ("name".to_string(), Dynamic::from(name)),
        ("body".to_string(), Dynamic::from(body)),
    ]))
}

async fn server(fail_deletes: bool) -> (ProviderServer<NotesProvider>, Store) {
    let store = Store::default();
    let mut server = ProviderServer::new(NotesProvider {
        store: store.clone(),
        fail_deletes,
    });
    assert!(server
        .configure(Context::new(), DynamicValue::null())
        .await
        .is_empty());
    (server, store)
}

#[tokio::test]
async fn create_then_update_in_place() {
    let (server, store) = server(false).await;
    let config = note_config("todo", "milk");

    let change = server
        .plan_resource_change(Context::new(), "notes_note", &DynamicValue::null(), &config)
        .await;
    assert_eq!(change.action, PlanAction::Create);
    assert!(change.planned_state.value.get("id").is_unknown());

    let created = server
        .apply_resource_change(Context::new(), "notes_note", &DynamicValue::null(), &change, &config)
        .await;
    assert!(created.diagnostics.is_empty());
    assert_eq!(created.new_state.value.get("id").as_string(), Some("note-todo"));

    let config = note_config("todo", "eggs");
    let change = server
        .plan_resource_change(Context::new(), "notes_note", &created.new_state, &config)
        .await;
    assert_eq!(change.action, PlanAction::Update);
    // Computed id carries over from state
    assert_eq!(change.planned_state.value.get("id").as_string(), Some("note-todo"));

    server
        .apply_resource_change(Context::new(), "notes_note", &created.new_state, &change, &config)
        .await;
    assert_eq!(store.lock().unwrap().get("todo").map(String::as_str), Some("eggs"));
}

#[tokio::test]
async fn renaming_replaces() {
    let (server, store) = server(false).await;
    store.lock().unwrap().insert("old".to_string(), "x".to_string());
    let prior = NoteResource::state("old", "x");
    let config = note_config("new", "x");

    let change = server
        .plan_resource_change(Context::new(), "notes_note", &prior, &config)
        .await;
    assert_eq!(change.action, PlanAction::Replace);
    assert_eq!(change.requires_replace, vec![AttributePath::new("name")]);

    let applied = server
        .apply_resource_change(Context::new(), "notes_note", &prior, &change, &config)
        .await;
    assert!(applied.diagnostics.is_empty());
    let store = store.lock().unwrap();
    assert!(!store.contains_key("old"));
    assert!(store.contains_key("new"));
}

#[tokio::test]
async fn failed_delete_keeps_prior_state() {
    let (server, _store) = server(true).await;
    let prior = NoteResource::state("old", "x");

    let change = server
        .plan_resource_change(Context::new(), "notes_note", &prior, &DynamicValue::null())
        .await;
    assert_eq!(change.action, PlanAction::Delete);

    let applied = server
        .apply_resource_change(Context::new(), "notes_note", &prior, &change, &DynamicValue::null())
        .await;
    assert_eq!(applied.diagnostics[0].summary, "Delete failed");
    assert_eq!(applied.new_state, prior);
}

#[tokio::test]
async fn read_drops_missing_objects() {
    let (server, _store) = server(false).await;
    let response = server
        .read_resource(Context::new(), "notes_note", &NoteResource::state("gone", "x"))
        .await;
    assert!(response.new_state.is_none());
}

#[tokio::test]
async fn schema_checks_run_before_resource_validation() {
    let (server, _store) = server(false).await;
    let missing_body = DynamicValue::object(HashMap::from([(
        "name".to_string(),
        Dynamic::from("todo"),
    )]));

    let diagnostics = server
        .validate_resource_config(Context::new(), "notes_note", &missing_body)
        .await;
    assert!(!diagnostics.is_empty());

    let diagnostics = server
        .validate_resource_config(Context::new(), "notes_note", &note_config("todo", ""))
        .await;
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].summary, "Empty body");
}

#[tokio::test]
async fn unknown_type_is_reported() {
    let (server, _store) = server(false).await;
    let change = server
        .plan_resource_change(Context::new(), "notes_missing", &DynamicValue::null(), &DynamicValue::null())
        .await;
    assert_eq!(change.diagnostics[0].summary, "Unknown resource type");
}
