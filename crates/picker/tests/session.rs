#![forbid(unsafe_code)]

use std::sync::Arc;
use std::time::Duration;

use teampick_api::{CatalogApi, CatalogError, InProcCatalog, MockApi};
use teampick_core::Entity;
use teampick_picker::{
    option_label, AutocompleteEvent, CommitReason, FieldChange, FieldExtensionRegistry, FieldProps, LoadState,
    PickerOptions, TeamPickerField,
};
use tokio::sync::mpsc;

fn props(options: PickerOptions, stored: Option<&str>) -> FieldProps {
    FieldProps {
        id: "root_owner".into(),
        title: Some("Owner".into()),
        required: true,
        form_data: stored.map(|s| s.to_string()),
        ui_options: options,
        ..Default::default()
    }
}

fn blur(text: &str) -> AutocompleteEvent {
    AutocompleteEvent::InputCommitted { text: text.into(), reason: CommitReason::Blur }
}

fn drain(rx: &mut mpsc::UnboundedReceiver<FieldChange>) -> Vec<FieldChange> {
    let mut out = Vec::new();
    while let Ok(c) = rx.try_recv() { out.push(c); }
    out
}

#[tokio::test]
async fn no_catalog_filter_fetches_groups_only() {
    let api = Arc::new(MockApi::with_items(vec![]));
    let (tx, _rx) = mpsc::unbounded_channel();
    let mut field = TeamPickerField::mount(api.clone(), props(PickerOptions::default(), None), tx);
    field.loaded().await;
    assert_eq!(api.calls(), 1);
    let req = api.last_request().unwrap();
    assert_eq!(serde_json::to_value(&req.filter).unwrap(), serde_json::json!({ "kind": ["Group"] }));
}

#[tokio::test]
async fn empty_catalog_filter_list_keeps_kind_restriction() {
    let api = Arc::new(MockApi::with_items(vec![]));
    let (tx, _rx) = mpsc::unbounded_channel();
    let opts = PickerOptions::from_value(&serde_json::json!({ "catalogFilter": [] })).unwrap();
    let mut field = TeamPickerField::mount(api.clone(), props(opts, None), tx);
    field.loaded().await;
    let req = api.last_request().unwrap();
    assert_eq!(serde_json::to_value(&req.filter).unwrap(), serde_json::json!({ "kind": ["Group"] }));

    let catalog = InProcCatalog::new(vec![Entity::new("Group", None, "ops"), Entity::new("User", None, "jdoe")]);
    let kinds: Vec<String> = catalog.get_entities(req).await.unwrap().items.into_iter().map(|e| e.kind).collect();
    assert_eq!(kinds, vec!["Group".to_string()]);
}

#[tokio::test]
async fn configured_kind_drives_query_input_and_labels() {
    let api = Arc::new(MockApi::with_items(vec![
        Entity::new("System", None, "billing"),
        Entity::new("System", Some("infra"), "search"),
    ]));
    let (tx, mut rx) = mpsc::unbounded_channel();
    let opts = PickerOptions { default_kind: Some("System".into()), ..Default::default() };
    let mut field = TeamPickerField::mount(api.clone(), props(opts.clone(), None), tx);
    field.loaded().await;
    let req = api.last_request().unwrap();
    assert_eq!(serde_json::to_value(&req.filter).unwrap(), serde_json::json!({ "kind": ["System"] }));

    let labels: Vec<String> = field.view().options.into_iter().map(|o| o.label).collect();
    assert_eq!(labels, vec!["billing".to_string(), "infra/search".to_string()]);
    field.handle(blur("payments"));
    assert_eq!(drain(&mut rx), vec![FieldChange::Set("system:default/payments".into())]);
    assert_eq!(option_label("group:default/ops", &opts), "group:ops");
}

#[tokio::test]
async fn timed_out_wait_can_be_retried() {
    let api = Arc::new(MockApi::with_items(vec![Entity::new("Group", None, "ops")]).delayed(Duration::from_millis(50)));
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut field = TeamPickerField::mount(api.clone(), props(PickerOptions::default(), None), tx);
    assert!(tokio::time::timeout(Duration::from_millis(5), field.loaded()).await.is_err());
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(matches!(field.loaded().await, LoadState::Ready(items) if items.len() == 1));
    assert!(!field.view().loading);
    assert_eq!(api.calls(), 1);
    assert_eq!(drain(&mut rx), vec![FieldChange::Set("group:default/ops".into())]);
}

#[tokio::test]
async fn single_candidate_is_auto_selected_once() {
    let api = Arc::new(MockApi::with_items(vec![Entity::new("Group", Some("infra"), "platform")]));
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut field = TeamPickerField::mount(api, props(PickerOptions::default(), None), tx);
    field.loaded().await;
    // A second wait does not re-apply the load.
    field.loaded().await;
    assert_eq!(drain(&mut rx), vec![FieldChange::Set("group:infra/platform".into())]);
    assert!(field.is_disabled());
    assert!(field.view().disabled);
    assert_eq!(field.form_data(), Some("group:infra/platform"));
    // Disabled fields ignore user input.
    assert_eq!(field.handle(AutocompleteEvent::Selected(None)), None);
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn several_candidates_do_not_auto_select() {
    let api = Arc::new(MockApi::with_items(vec![
        Entity::new("Group", None, "a"),
        Entity::new("Group", None, "b"),
    ]));
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut field = TeamPickerField::mount(api, props(PickerOptions::default(), None), tx);
    field.loaded().await;
    assert!(drain(&mut rx).is_empty());
    assert!(!field.is_disabled());
}

#[tokio::test]
async fn failed_fetch_is_exposed() {
    let api = Arc::new(MockApi::failing(CatalogError::Unavailable("catalog down".into())));
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut field = TeamPickerField::mount(api, props(PickerOptions::default(), None), tx);
    let state = field.loaded().await.clone();
    assert_eq!(state, LoadState::Failed(CatalogError::Unavailable("catalog down".into())));
    let view = field.view();
    assert!(!view.loading);
    assert_eq!(view.error.as_deref(), Some("unavailable: catalog down"));
    assert!(view.options.is_empty());
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn unmount_aborts_in_flight_load() {
    let api = Arc::new(
        MockApi::with_items(vec![Entity::new("Group", None, "late")]).delayed(Duration::from_secs(10)),
    );
    let (tx, mut rx) = mpsc::unbounded_channel();
    let field = TeamPickerField::mount(api.clone(), props(PickerOptions::default(), None), tx);
    tokio::time::sleep(Duration::from_millis(20)).await;
    field.unmount();
    tokio::time::sleep(Duration::from_millis(50)).await;
    // The aborted task released its handle on the catalog.
    assert_eq!(Arc::strong_count(&api), 1);
    assert_eq!(rx.recv().await, None);
}

#[tokio::test]
async fn dropping_the_field_aborts_in_flight_load() {
    let api = Arc::new(
        MockApi::with_items(vec![Entity::new("Group", None, "late")]).delayed(Duration::from_secs(10)),
    );
    let (tx, mut rx) = mpsc::unbounded_channel();
    let field = TeamPickerField::mount(api.clone(), props(PickerOptions::default(), None), tx);
    tokio::time::sleep(Duration::from_millis(20)).await;
    drop(field);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(Arc::strong_count(&api), 1);
    assert_eq!(rx.recv().await, None);
}

#[tokio::test]
async fn blur_with_unchanged_text_emits_nothing() {
    let api = Arc::new(MockApi::with_items(vec![]));
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut field = TeamPickerField::mount(api, props(PickerOptions::default(), Some("team-a")), tx);
    field.loaded().await;
    assert_eq!(field.handle(blur("team-a")), None);
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn blur_with_new_text_emits_once() {
    let api = Arc::new(MockApi::with_items(vec![]));
    let (tx, mut rx) = mpsc::unbounded_channel();
    let opts = PickerOptions { default_namespace: Some("platform".into()), ..Default::default() };
    let mut field = TeamPickerField::mount(api, props(opts, Some("group:default/old")), tx);
    field.loaded().await;
    field.handle(AutocompleteEvent::InputChanged("team".into()));
    field.handle(blur("team-b"));
    field.handle(blur("bad/"));
    assert_eq!(
        drain(&mut rx),
        vec![FieldChange::Set("group:platform/team-b".into()), FieldChange::Set("bad/".into())]
    );
    assert_eq!(field.form_data(), Some("bad/"));
}

#[tokio::test]
async fn list_selection_then_clear() {
    let a = Entity::new("Group", None, "a");
    let api = Arc::new(MockApi::with_items(vec![a.clone(), Entity::new("Group", None, "b")]));
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut field = TeamPickerField::mount(api, props(PickerOptions::default(), None), tx);
    field.loaded().await;
    field.handle(AutocompleteEvent::Opened);
    field.handle(AutocompleteEvent::Selected(Some(a)));
    field.handle(AutocompleteEvent::Closed);
    assert_eq!(field.view().value.map(|v| v.label), Some("a".to_string()));
    field.handle(AutocompleteEvent::Selected(None));
    assert_eq!(drain(&mut rx), vec![FieldChange::Set("group:default/a".into()), FieldChange::Cleared]);
    assert_eq!(field.form_data(), None);
}

#[tokio::test]
async fn registry_mounts_by_name() {
    let registry = FieldExtensionRegistry::with_defaults();
    let ext = registry.get("OwnerPicker").unwrap();
    let api = Arc::new(MockApi::with_items(vec![Entity::new("Group", None, "solo")]));
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut field = (ext.mount)(api, props(PickerOptions::default(), None), tx);
    field.loaded().await;
    assert_eq!(drain(&mut rx), vec![FieldChange::Set("group:default/solo".into())]);
}
