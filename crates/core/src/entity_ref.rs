//! Entity reference grammar: `[<kind>:][<namespace>/]<name>`.
//!
//! The canonical form is always fully qualified with kind and namespace
//! lower-cased; the name is kept verbatim.

use std::fmt;

use serde::{Deserialize, Serialize};

pub const DEFAULT_NAMESPACE: &str = "default";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    pub kind: String,
    pub namespace: String,
    pub name: String,
}

/// Defaults applied to the parts a reference string leaves out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefDefaults<'a> {
    pub kind: Option<&'a str>,
    /// `None` means [`DEFAULT_NAMESPACE`].
    pub namespace: Option<&'a str>,
}

impl<'a> RefDefaults<'a> {
    pub fn new(kind: Option<&'a str>, namespace: Option<&'a str>) -> Self { Self { kind, namespace } }

    fn namespace_or_default(&self) -> &'a str { self.namespace.unwrap_or(DEFAULT_NAMESPACE) }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EntityRefError {
    #[error("entity reference \"{0}\" was not on the form [<kind>:][<namespace>/]<name>")]
    Malformed(String),
    #[error("entity reference \"{0}\" had missing or empty kind and no default kind")]
    MissingKind(String),
}

impl EntityRef {
    pub fn new(kind: &str, namespace: &str, name: &str) -> Self {
        Self { kind: kind.to_string(), namespace: namespace.to_string(), name: name.to_string() }
    }

    /// Parse a reference string, filling absent kind/namespace from `defaults`.
    pub fn parse(input: &str, defaults: RefDefaults<'_>) -> Result<Self, EntityRefError> {
        let (kind, namespace, name) = split_ref(input)?;
        let kind = match kind.or(defaults.kind) {
            Some(k) if !k.is_empty() => k,
            _ => return Err(EntityRefError::MissingKind(input.to_string())),
        };
        let namespace = namespace.unwrap_or_else(|| defaults.namespace_or_default());
        Ok(Self::new(kind, namespace, name))
    }

    /// Canonical string form (`kind:namespace/name`).
    pub fn stringify(&self) -> String { self.to_string() }

    /// Short display label: omits the kind when it equals the default kind and
    /// the namespace when it equals the default namespace.
    pub fn humanize(&self, defaults: RefDefaults<'_>) -> String {
        let kind = self.kind.to_lowercase();
        let show_kind = match defaults.kind {
            Some(dk) => dk.to_lowercase() != kind,
            None => true,
        };
        let namespace = self.namespace.to_lowercase();
        let show_ns = namespace != defaults.namespace_or_default().to_lowercase();
        let mut out = String::with_capacity(kind.len() + namespace.len() + self.name.len() + 2);
        if show_kind { out.push_str(&kind); out.push(':'); }
        if show_ns { out.push_str(&namespace); out.push('/'); }
        out.push_str(&self.name);
        out
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}/{}", self.kind.to_lowercase(), self.namespace.to_lowercase(), self.name)
    }
}

// A slash before the first colon means the colon belongs to the name.
fn split_ref(input: &str) -> Result<(Option<&str>, Option<&str>, &str), EntityRefError> {
    let slash = input.find('/');
    let colon = match (input.find(':'), slash) {
        (Some(c), Some(s)) if s < c => None,
        (c, _) => c,
    };
    let kind = colon.map(|c| &input[..c]);
    let after_kind = colon.map(|c| c + 1).unwrap_or(0);
    let namespace = slash.map(|s| &input[after_kind..s]);
    let name_start = slash.map(|s| s + 1).unwrap_or(after_kind);
    let name = &input[name_start..];
    if kind == Some("") || namespace == Some("") || name.is_empty() {
        return Err(EntityRefError::Malformed(input.to_string()));
    }
    Ok((kind, namespace, name))
}

/// Outcome of normalizing user-supplied text into a reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefResolution {
    Parsed(EntityRef),
    /// Free text that is not a reference; kept exactly as typed.
    Opaque(String),
}

impl RefResolution {
    pub fn resolve(input: &str, defaults: RefDefaults<'_>) -> Self {
        match EntityRef::parse(input, defaults) {
            Ok(r) => Self::Parsed(r),
            Err(_) => Self::Opaque(input.to_string()),
        }
    }

    pub fn is_parsed(&self) -> bool { matches!(self, Self::Parsed(_)) }

    /// Value to store in the form: canonical ref, or the original text.
    pub fn into_value(self) -> String {
        match self {
            Self::Parsed(r) => r.stringify(),
            Self::Opaque(s) => s,
        }
    }

    /// Display label: humanized ref, or the original text.
    pub fn label(&self, defaults: RefDefaults<'_>) -> String {
        match self {
            Self::Parsed(r) => r.humanize(defaults),
            Self::Opaque(s) => s.clone(),
        }
    }
}
