//! In-memory evaluation of catalog filter queries against entities.
//!
//! Field keys are dotted paths into the entity's JSON form. Keys compare
//! case-insensitively and values compare case-insensitively. Map keys that
//! themselves contain dots (label keys such as `backstage.io/team`) are
//! found by trying every split of the remaining path at each level, longest
//! key first.

use serde_json::Value;
use teampick_core::Entity;

use crate::{EntityFilterQuery, FilterQuery, FilterValue};

impl EntityFilterQuery {
    /// True when any element matches. An empty list matches everything.
    pub fn matches(&self, entity: &Entity) -> bool {
        let doc = entity.to_json();
        self.matches_json(&doc)
    }

    pub fn matches_json(&self, doc: &Value) -> bool {
        let qs = self.queries();
        qs.is_empty() || qs.iter().any(|q| q.matches_json(doc))
    }
}

impl FilterQuery {
    pub fn matches(&self, entity: &Entity) -> bool { self.matches_json(&entity.to_json()) }

    pub fn matches_json(&self, doc: &Value) -> bool {
        self.0.iter().all(|(path, want)| field_matches(doc, path, want))
    }
}

fn field_matches(doc: &Value, path: &str, want: &FilterValue) -> bool {
    let segs: Vec<&str> = path.split('.').collect();
    let mut found = Vec::new();
    walk(doc, &segs, &mut found);
    match want {
        FilterValue::Exists => found.iter().any(|v| !v.is_null()),
        FilterValue::Value(w) => any_leaf(&found, |s| s.eq_ignore_ascii_case(w)),
        FilterValue::AnyOf(ws) => any_leaf(&found, |s| ws.iter().any(|w| s.eq_ignore_ascii_case(w))),
    }
}

fn walk<'a>(v: &'a Value, segs: &[&str], out: &mut Vec<&'a Value>) {
    if segs.is_empty() {
        out.push(v);
        return;
    }
    match v {
        Value::Array(items) => {
            for it in items { walk(it, segs, out); }
        }
        Value::Object(map) => {
            for n in (1..=segs.len()).rev() {
                let key = segs[..n].join(".");
                for (_, child) in map.iter().filter(|(k, _)| k.eq_ignore_ascii_case(&key)) {
                    walk(child, &segs[n..], out);
                }
            }
        }
        _ => {}
    }
}

fn any_leaf(found: &[&Value], pred: impl Fn(&str) -> bool) -> bool {
    fn leaf_matches(v: &Value, pred: &dyn Fn(&str) -> bool) -> bool {
        match v {
            Value::String(s) => pred(s),
            Value::Number(n) => pred(&n.to_string()),
            Value::Bool(b) => pred(if *b { "true" } else { "false" }),
            Value::Array(items) => items.iter().any(|it| leaf_matches(it, pred)),
            _ => false,
        }
    }
    found.iter().any(|v| leaf_matches(v, &pred))
}
