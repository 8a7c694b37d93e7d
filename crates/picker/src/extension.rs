//! Named field extensions, so a schema-driven host can find the picker by the
//! name a ui-schema designates (`"ui:field": "TeamPicker"`).

use std::sync::Arc;

use rustc_hash::FxHashMap;
use teampick_api::CatalogApi;
use tokio::sync::mpsc;

use crate::field::{FieldProps, TeamPickerField};
use crate::reconcile::FieldChange;

pub const TEAM_PICKER: &str = "TeamPicker";
/// Older schemas name the same field this way.
pub const OWNER_PICKER: &str = "OwnerPicker";

pub type MountFn = fn(Arc<dyn CatalogApi>, FieldProps, mpsc::UnboundedSender<FieldChange>) -> TeamPickerField;

#[derive(Clone)]
pub struct FieldExtension {
    pub name: &'static str,
    pub mount: MountFn,
    /// JSON schema of the accepted `ui:options`.
    pub options_schema: fn() -> serde_json::Value,
}

impl std::fmt::Debug for FieldExtension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldExtension").field("name", &self.name).finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("field extension already registered: {0}")]
    Duplicate(String),
}

#[derive(Debug, Default)]
pub struct FieldExtensionRegistry {
    by_name: FxHashMap<String, FieldExtension>,
}

impl FieldExtensionRegistry {
    pub fn new() -> Self { Self::default() }

    /// Registry holding the team picker under its name and legacy alias.
    pub fn with_defaults() -> Self {
        let mut r = Self::new();
        for ext in [team_picker_extension(), FieldExtension { name: OWNER_PICKER, ..team_picker_extension() }] {
            r.by_name.insert(ext.name.to_string(), ext);
        }
        r
    }

    pub fn register(&mut self, ext: FieldExtension) -> Result<(), RegistryError> {
        if self.by_name.contains_key(ext.name) {
            return Err(RegistryError::Duplicate(ext.name.to_string()));
        }
        self.by_name.insert(ext.name.to_string(), ext);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&FieldExtension> { self.by_name.get(name) }

    pub fn names(&self) -> Vec<&str> {
        let mut v: Vec<&str> = self.by_name.keys().map(|s| s.as_str()).collect();
        v.sort_unstable();
        v
    }
}

pub fn team_picker_extension() -> FieldExtension {
    FieldExtension { name: TEAM_PICKER, mount: TeamPickerField::mount, options_schema }
}

fn options_schema() -> serde_json::Value {
    let filter_object = serde_json::json!({
        "type": "object",
        "additionalProperties": {
            "anyOf": [
                { "type": "string" },
                { "type": "array", "items": { "type": "string" } },
                { "type": "object", "properties": { "exists": { "type": "boolean" } }, "required": ["exists"] }
            ]
        }
    });
    serde_json::json!({
        "type": "object",
        "properties": {
            "defaultNamespace": { "type": "string", "description": "Namespace assumed for typed names without one" },
            "allowArbitraryValues": { "type": "boolean", "description": "Allow values that are not in the list" },
            "defaultKind": { "type": "string", "description": "Kind to list; defaults to Group" },
            "allowedKinds": { "type": "array", "items": { "type": "string" }, "deprecated": true },
            "catalogFilter": { "anyOf": [filter_object.clone(), { "type": "array", "items": filter_object }] }
        }
    })
}
