//! `ui:options` accepted by the team picker.

use serde::{Deserialize, Serialize};
use teampick_core::RefDefaults;
use teampick_filter::CatalogFilterOption;

use crate::GROUP_KIND;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PickerOptions {
    /// Namespace assumed for free text that omits one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_namespace: Option<String>,
    /// Enables free-solo entry and emits committed text even when unchanged.
    #[serde(default)]
    pub allow_arbitrary_values: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_filter: Option<CatalogFilterOption>,
    /// Legacy; accepted and kept, not used for filtering or selection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_kinds: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_kind: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OptionsError {
    #[error("ui:options must be an object, got {0}")]
    NotAnObject(&'static str),
    #[error("invalid ui:options: {0}")]
    Invalid(String),
}

impl PickerOptions {
    /// Read `ui:options` out of a field's ui-schema. A missing key means defaults.
    pub fn from_ui_schema(ui_schema: &serde_json::Value) -> Result<Self, OptionsError> {
        match ui_schema.get("ui:options") {
            None | Some(serde_json::Value::Null) => Ok(Self::default()),
            Some(v) => Self::from_value(v),
        }
    }

    pub fn from_value(v: &serde_json::Value) -> Result<Self, OptionsError> {
        use serde_json::Value;
        let shape = match v {
            Value::Object(_) => None,
            Value::Array(_) => Some("array"),
            Value::String(_) => Some("string"),
            Value::Number(_) => Some("number"),
            Value::Bool(_) => Some("boolean"),
            Value::Null => Some("null"),
        };
        if let Some(s) = shape { return Err(OptionsError::NotAnObject(s)); }
        serde_json::from_value(v.clone()).map_err(|e| OptionsError::Invalid(e.to_string()))
    }

    /// Kind the picker lists and assumes for bare names.
    /// An empty `defaultKind` counts as unset.
    pub fn kind(&self) -> &str {
        self.default_kind.as_deref().filter(|k| !k.trim().is_empty()).unwrap_or(GROUP_KIND)
    }

    /// Defaults for normalizing typed text; honours `defaultNamespace`.
    pub fn input_defaults(&self) -> RefDefaults<'_> {
        RefDefaults::new(Some(self.kind()), self.default_namespace.as_deref())
    }

    /// Defaults for display labels; always the catalog's default namespace.
    pub fn label_defaults(&self) -> RefDefaults<'_> {
        RefDefaults::new(Some(self.kind()), None)
    }
}
