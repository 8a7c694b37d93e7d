//! Teampick team picker: a form field that lets a user pick, search or type a
//! reference to a team entity from the catalog.
//!
//! The pieces are split so each can be tested on its own:
//! - [`options`]: the field's `ui:options`,
//! - [`reconcile`]: pure mapping of autocomplete events to value changes,
//! - [`field`]: the mounted field with its one-shot, cancellable catalog load,
//! - [`extension`]: registration under a field name.

#![forbid(unsafe_code)]

pub mod extension;
pub mod field;
pub mod options;
pub mod reconcile;

/// Kind listed when `ui:options` does not say otherwise.
pub const GROUP_KIND: &str = "Group";

pub use extension::{team_picker_extension, FieldExtension, FieldExtensionRegistry, RegistryError, OWNER_PICKER, TEAM_PICKER};
pub use field::{FieldProps, LoadState, OptionView, PickerView, TeamPickerField};
pub use options::{OptionsError, PickerOptions};
pub use reconcile::{normalize_input, option_label, reconcile, AutocompleteEvent, CommitReason, FieldChange, ReconcileCtx};
