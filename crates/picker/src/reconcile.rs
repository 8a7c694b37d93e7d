//! Selection reconciliation: maps autocomplete events to form value changes.
//!
//! Pure; the mounted field feeds it events and forwards whatever it returns.

use teampick_core::{Entity, RefResolution};
use tracing::debug;

use crate::options::PickerOptions;

/// How typed text was confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitReason {
    Blur,
    CreateOption,
}

/// Change events produced by the autocomplete surface.
#[derive(Debug, Clone, PartialEq)]
pub enum AutocompleteEvent {
    /// An option was picked from the list, or the selection was cleared (`None`).
    Selected(Option<Entity>),
    /// Free text confirmed by losing focus or by "create option".
    InputCommitted { text: String, reason: CommitReason },
    /// Intermediate keystroke.
    InputChanged(String),
    Opened,
    Closed,
}

/// Value change emitted to the host form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldChange {
    Set(String),
    Cleared,
}

impl FieldChange {
    pub fn value(&self) -> Option<&str> {
        match self {
            FieldChange::Set(v) => Some(v),
            FieldChange::Cleared => None,
        }
    }

    pub(crate) fn metric_kind(&self) -> &'static str {
        match self {
            FieldChange::Set(_) => "set",
            FieldChange::Cleared => "cleared",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ReconcileCtx<'a> {
    /// Value currently stored in the form.
    pub stored: Option<&'a str>,
    pub options: &'a PickerOptions,
}

/// Decide what, if anything, an autocomplete event changes.
pub fn reconcile(event: &AutocompleteEvent, ctx: ReconcileCtx<'_>) -> Option<FieldChange> {
    match event {
        AutocompleteEvent::Selected(Some(entity)) => Some(FieldChange::Set(entity.entity_ref().stringify())),
        AutocompleteEvent::Selected(None) => Some(FieldChange::Cleared),
        AutocompleteEvent::InputCommitted { text, reason } => {
            let value = normalize_input(text, ctx.options).into_value();
            if ctx.stored != Some(text.as_str()) || ctx.options.allow_arbitrary_values {
                Some(FieldChange::Set(value))
            } else {
                debug!(?reason, "picker: committed text equals stored value; no change");
                None
            }
        }
        AutocompleteEvent::InputChanged(_) | AutocompleteEvent::Opened | AutocompleteEvent::Closed => None,
    }
}

/// Normalize typed text into a canonical reference when it parses.
pub fn normalize_input(text: &str, options: &PickerOptions) -> RefResolution {
    RefResolution::resolve(text, options.input_defaults())
}

/// Display label for a stored value; falls back to the raw string.
pub fn option_label(value: &str, options: &PickerOptions) -> String {
    let defaults = options.label_defaults();
    RefResolution::resolve(value, defaults).label(defaults)
}
