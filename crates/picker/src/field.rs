//! Mounted team picker field: one catalog load per mount, auto-selection of a
//! lone candidate, event handling and a render-ready view.

use std::sync::Arc;
use std::time::Instant;

use teampick_api::{CancelHandle, CatalogApi, CatalogError, CatalogResult, EntitiesRequest};
use teampick_core::Entity;
use teampick_filter::{build_catalog_filter, kind_restricted, rank_options, OptionText, RankOpts};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::options::PickerOptions;
use crate::reconcile::{option_label, reconcile, AutocompleteEvent, FieldChange, ReconcileCtx};

/// Props handed over by the host form engine.
#[derive(Debug, Clone, Default)]
pub struct FieldProps {
    pub id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub required: bool,
    /// Previously stored value.
    pub form_data: Option<String>,
    /// Validation errors reported by the host.
    pub raw_errors: Vec<String>,
    pub ui_options: PickerOptions,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadState {
    Pending,
    Ready(Vec<Entity>),
    Failed(CatalogError),
}

impl LoadState {
    pub fn is_pending(&self) -> bool { matches!(self, LoadState::Pending) }

    pub fn entities(&self) -> &[Entity] {
        match self {
            LoadState::Ready(v) => v,
            _ => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionView {
    pub value: String,
    pub label: String,
    pub title: Option<String>,
}

/// Everything a renderer needs for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct PickerView {
    pub id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub required: bool,
    pub loading: bool,
    pub disabled: bool,
    /// Free-solo entry allowed.
    pub free_solo: bool,
    pub value: Option<OptionView>,
    pub options: Vec<OptionView>,
    /// Catalog load failure, for user-visible messaging.
    pub error: Option<String>,
    pub raw_errors: Vec<String>,
}

struct PendingLoad {
    rx: oneshot::Receiver<CatalogResult<Vec<Entity>>>,
    // Aborts the fetch when the field goes away.
    _cancel: CancelHandle,
    started: Instant,
}

pub struct TeamPickerField {
    props: FieldProps,
    state: LoadState,
    disabled: bool,
    pending: Option<PendingLoad>,
    changes: mpsc::UnboundedSender<FieldChange>,
}

impl TeamPickerField {
    /// Mount the field and start its one catalog load. Must run inside a tokio runtime.
    pub fn mount(
        api: Arc<dyn CatalogApi>,
        props: FieldProps,
        changes: mpsc::UnboundedSender<FieldChange>,
    ) -> Self {
        let opts = &props.ui_options;
        if let Some(kinds) = &opts.allowed_kinds {
            debug!(allowed_kinds = ?kinds, "picker: allowedKinds is accepted for compatibility and ignored");
        }
        let kinds = vec![opts.kind().to_string()];
        let filter = kind_restricted(build_catalog_filter(opts.catalog_filter.as_ref()), &kinds);
        info!(field = %props.id, kind = %opts.kind(), queries = filter.queries().len(), "picker: load start");
        let (tx, rx) = oneshot::channel();
        let task = tokio::spawn(async move {
            let res = api.get_entities(EntitiesRequest { filter: Some(filter) }).await.map(|r| r.items);
            let _ = tx.send(res);
        });
        Self {
            props,
            state: LoadState::Pending,
            disabled: false,
            pending: Some(PendingLoad { rx, _cancel: CancelHandle::new(task), started: Instant::now() }),
            changes,
        }
    }

    /// Wait for the load to settle and apply it. Cancel-safe: dropping the
    /// future leaves the load running and a later call picks it up.
    pub async fn loaded(&mut self) -> &LoadState {
        if let Some(p) = self.pending.as_mut() {
            let res = match (&mut p.rx).await {
                Ok(res) => res,
                Err(_) => Err(CatalogError::Internal("load task ended without a result".into())),
            };
            let started = p.started;
            self.pending = None;
            self.apply_load(res, started);
        }
        &self.state
    }

    /// Apply the load result if it has arrived. Returns true once settled.
    pub fn poll_load(&mut self) -> bool {
        let Some(p) = self.pending.as_mut() else { return true };
        let res = match p.rx.try_recv() {
            Ok(res) => res,
            Err(oneshot::error::TryRecvError::Empty) => return false,
            Err(oneshot::error::TryRecvError::Closed) => {
                Err(CatalogError::Internal("load task ended without a result".into()))
            }
        };
        let started = p.started;
        self.pending = None;
        self.apply_load(res, started);
        true
    }

    fn apply_load(&mut self, res: CatalogResult<Vec<Entity>>, started: Instant) {
        let took_ms = started.elapsed().as_millis();
        metrics::histogram!("picker_load_ms", started.elapsed().as_secs_f64() * 1_000.0);
        match res {
            Ok(entities) => {
                metrics::counter!("picker_loads_total", 1u64, "outcome" => "ok");
                info!(field = %self.props.id, entities = entities.len(), took_ms = %took_ms, "picker: load ok");
                let single = match entities.as_slice() {
                    [only] => Some(only.entity_ref().stringify()),
                    _ => None,
                };
                self.state = LoadState::Ready(entities);
                if let Some(value) = single {
                    debug!(field = %self.props.id, value = %value, "picker: single candidate auto-selected");
                    self.disabled = true;
                    self.emit(FieldChange::Set(value));
                }
            }
            Err(e) => {
                metrics::counter!("picker_loads_total", 1u64, "outcome" => "failed");
                warn!(field = %self.props.id, error = %e, took_ms = %took_ms, "picker: load failed");
                self.state = LoadState::Failed(e);
            }
        }
    }

    /// Feed one autocomplete event; returns the change emitted, if any.
    pub fn handle(&mut self, event: AutocompleteEvent) -> Option<FieldChange> {
        if self.disabled {
            debug!(field = %self.props.id, ?event, "picker: disabled; event ignored");
            return None;
        }
        let ctx = ReconcileCtx { stored: self.props.form_data.as_deref(), options: &self.props.ui_options };
        let change = reconcile(&event, ctx)?;
        self.emit(change.clone());
        Some(change)
    }

    fn emit(&mut self, change: FieldChange) {
        metrics::counter!("picker_changes_total", 1u64, "kind" => change.metric_kind());
        self.props.form_data = change.value().map(|s| s.to_string());
        if self.changes.send(change).is_err() {
            debug!(field = %self.props.id, "picker: change receiver closed");
        }
    }

    /// Host re-render with a new stored value.
    pub fn set_form_data(&mut self, value: Option<String>) { self.props.form_data = value; }

    pub fn form_data(&self) -> Option<&str> { self.props.form_data.as_deref() }
    pub fn state(&self) -> &LoadState { &self.state }
    pub fn is_disabled(&self) -> bool { self.disabled }
    pub fn props(&self) -> &FieldProps { &self.props }

    fn option_view(&self, entity: &Entity) -> OptionView {
        let r = entity.entity_ref();
        OptionView {
            label: r.humanize(self.props.ui_options.label_defaults()),
            value: r.stringify(),
            title: entity.metadata.title.clone(),
        }
    }

    pub fn view(&self) -> PickerView {
        let value = self.props.form_data.as_deref().map(|v| OptionView {
            value: v.to_string(),
            label: option_label(v, &self.props.ui_options),
            title: None,
        });
        PickerView {
            id: self.props.id.clone(),
            title: self.props.title.clone(),
            description: self.props.description.clone(),
            required: self.props.required,
            loading: self.state.is_pending(),
            disabled: self.disabled,
            free_solo: self.props.ui_options.allow_arbitrary_values,
            value,
            options: self.state.entities().iter().map(|e| self.option_view(e)).collect(),
            error: match &self.state {
                LoadState::Failed(e) => Some(e.to_string()),
                _ => None,
            },
            raw_errors: self.props.raw_errors.clone(),
        }
    }

    /// Options ranked against the typed input.
    pub fn suggestions(&self, input: &str, limit: Option<usize>) -> Vec<OptionView> {
        let options: Vec<OptionView> = self.state.entities().iter().map(|e| self.option_view(e)).collect();
        let texts: Vec<OptionText> = options
            .iter()
            .map(|o| OptionText { label: o.label.clone(), value: o.value.clone() })
            .collect();
        rank_options(&texts, input, RankOpts { limit, min_score: None })
            .into_iter()
            .filter_map(|h| options.get(h.idx).cloned())
            .collect()
    }

    /// Tear the field down; an unfinished load is aborted and its result dropped.
    pub fn unmount(self) {
        let in_flight = self.pending.is_some();
        info!(field = %self.props.id, in_flight, "picker: unmount");
    }
}
