//! Teampick core types: catalog entities as the picker sees them, plus the
//! entity reference grammar.

#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub mod entity_ref;

pub use entity_ref::{EntityRef, EntityRefError, RefDefaults, RefResolution, DEFAULT_NAMESPACE};

/// Catalog entity record. Owned by the external catalog; read-only here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    #[serde(default)]
    pub api_version: String,
    pub kind: String,
    pub metadata: EntityMeta,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub spec: serde_json::Value,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub relations: Vec<EntityRelation>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct EntityMeta {
    pub name: String,
    /// Absent means the catalog's default namespace.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EntityRelation {
    #[serde(rename = "type")]
    pub kind: String,
    pub target_ref: String,
}

impl Entity {
    /// Minimal entity with the given kind/namespace/name; used by fixtures and mocks.
    pub fn new(kind: &str, namespace: Option<&str>, name: &str) -> Self {
        Self {
            api_version: "backstage.io/v1alpha1".to_string(),
            kind: kind.to_string(),
            metadata: EntityMeta {
                name: name.to_string(),
                namespace: namespace.map(|s| s.to_string()),
                ..Default::default()
            },
            spec: serde_json::Value::Null,
            relations: Vec::new(),
        }
    }

    pub fn name(&self) -> &str { &self.metadata.name }

    pub fn namespace(&self) -> &str {
        self.metadata.namespace.as_deref().filter(|s| !s.is_empty()).unwrap_or(DEFAULT_NAMESPACE)
    }

    /// Fully qualified reference; list selections always carry one.
    pub fn entity_ref(&self) -> EntityRef {
        EntityRef::new(&self.kind, self.namespace(), self.name())
    }

    /// JSON view used for dotted-path filter evaluation; the namespace is
    /// always present.
    pub fn to_json(&self) -> serde_json::Value {
        let mut v = serde_json::to_value(self).unwrap_or(serde_json::Value::Null);
        if let Some(meta) = v.get_mut("metadata").and_then(|m| m.as_object_mut()) {
            meta.insert("namespace".to_string(), serde_json::Value::String(self.namespace().to_string()));
        }
        v
    }
}

pub mod prelude {
    pub use super::{Entity, EntityMeta, EntityRef, EntityRefError, EntityRelation, RefDefaults, RefResolution};
}
