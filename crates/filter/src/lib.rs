//! Teampick filter: turns the picker's declarative `catalogFilter` option into
//! the query shape the catalog lookup expects, and evaluates such queries.

#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize, Serializer};
use smallvec::SmallVec;
use tracing::debug;

mod eval;
mod rank;

pub use rank::{rank_options, Hit, OptionText, RankOpts};

/// Reserved token the catalog query grammar reads as "field must exist".
pub const CATALOG_FILTER_EXISTS: &str = "CATALOG_FILTER_EXISTS";

/// One filter object as written in `ui:options`: field → literal, list of
/// literals, or `{ "exists": true }`.
pub type FilterSpec = BTreeMap<String, serde_json::Value>;

/// `ui:options.catalogFilter`: a single filter object or a list of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CatalogFilterOption {
    Many(Vec<FilterSpec>),
    One(FilterSpec),
}

/// Per-field match criterion in a built query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValue {
    Value(String),
    AnyOf(SmallVec<[String; 4]>),
    Exists,
}

impl Serialize for FilterValue {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        match self {
            FilterValue::Value(v) => s.serialize_str(v),
            FilterValue::AnyOf(vs) => vs.serialize(s),
            FilterValue::Exists => s.serialize_str(CATALOG_FILTER_EXISTS),
        }
    }
}

/// Conjunction of field criteria.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct FilterQuery(pub BTreeMap<String, FilterValue>);

impl FilterQuery {
    pub fn get(&self, field: &str) -> Option<&FilterValue> { self.0.get(field) }
    pub fn contains_key(&self, field: &str) -> bool { self.0.contains_key(field) }
    pub fn insert(&mut self, field: impl Into<String>, value: FilterValue) { self.0.insert(field.into(), value); }
    pub fn len(&self) -> usize { self.0.len() }
    pub fn is_empty(&self) -> bool { self.0.is_empty() }
}

/// Query sent to the catalog. A list is a disjunction of its elements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum EntityFilterQuery {
    Single(FilterQuery),
    Any(Vec<FilterQuery>),
}

impl EntityFilterQuery {
    pub fn queries(&self) -> &[FilterQuery] {
        match self {
            EntityFilterQuery::Single(q) => std::slice::from_ref(q),
            EntityFilterQuery::Any(v) => v.as_slice(),
        }
    }
}

/// Build the catalog query for a `catalogFilter` option. `None` means no filtering.
pub fn build_catalog_filter(option: Option<&CatalogFilterOption>) -> Option<EntityFilterQuery> {
    let built = match option? {
        CatalogFilterOption::One(spec) => EntityFilterQuery::Single(convert_spec(spec)),
        CatalogFilterOption::Many(specs) => EntityFilterQuery::Any(specs.iter().map(convert_spec).collect()),
    };
    debug!(queries = built.queries().len(), "filter: built catalog filter");
    Some(built)
}

fn convert_spec(spec: &FilterSpec) -> FilterQuery {
    FilterQuery(spec.iter().map(|(k, v)| (k.clone(), convert_value(v))).collect())
}

fn convert_value(v: &serde_json::Value) -> FilterValue {
    use serde_json::Value;
    match v {
        Value::Array(items) => FilterValue::AnyOf(items.iter().map(scalar_string).collect()),
        Value::Object(o) if o.get("exists").and_then(Value::as_bool) == Some(true) => FilterValue::Exists,
        other => FilterValue::Value(scalar_string(other)),
    }
}

// Strings keep their content; everything else uses its JSON rendering.
fn scalar_string(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Restrict a query to the given kinds. Elements that already name a `kind`
/// keep it; an absent query or an empty list becomes a bare kind filter.
pub fn kind_restricted(query: Option<EntityFilterQuery>, kinds: &[String]) -> EntityFilterQuery {
    let kind_value = || FilterValue::AnyOf(kinds.iter().cloned().collect());
    let restrict = |mut q: FilterQuery| {
        if !q.contains_key("kind") { q.insert("kind", kind_value()); }
        q
    };
    match query {
        Some(EntityFilterQuery::Single(q)) => EntityFilterQuery::Single(restrict(q)),
        Some(EntityFilterQuery::Any(qs)) if !qs.is_empty() => {
            EntityFilterQuery::Any(qs.into_iter().map(restrict).collect())
        }
        // An empty list would match every entity.
        None | Some(EntityFilterQuery::Any(_)) => {
            debug!("filter: no catalogFilter elements; restricting by kind only");
            EntityFilterQuery::Single(restrict(FilterQuery::default()))
        }
    }
}
