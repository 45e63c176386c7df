//! Capabilities a module provides and requirements it declares.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use super::filter::Filter;
use super::version::Version;
use crate::error::{ModGraphError, Result};

/// Well-known capability namespaces.
pub mod namespace {
    /// Module identity, matched by `Require-Bundle`.
    pub const BUNDLE: &str = "osgi.wiring.bundle";
    /// Exported packages, matched by `Import-Package`.
    pub const PACKAGE: &str = "osgi.wiring.package";
    /// Execution environments provided by the platform.
    pub const EXECUTION_ENVIRONMENT: &str = "osgi.ee";
}

/// A typed capability attribute value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum AttrValue {
    String(String),
    Long(i64),
    Version(Version),
    Strings(Vec<String>),
    Versions(Vec<Version>),
}

impl AttrValue {
    /// Convert a raw header attribute using its declared type
    /// (`String`, `Long`, `Version`, `List<String>`, `List<Version>`).
    pub fn typed(ty: Option<&str>, raw: &str) -> Result<Self> {
        let invalid = || ModGraphError::InvalidHeader {
            header: raw.to_string(),
            message: format!("cannot convert to {}", ty.unwrap_or("String")),
        };
        let list = |raw: &str| -> Vec<String> {
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect()
        };

        match ty.map(|t| t.replace(' ', "")).as_deref() {
            None | Some("String") => Ok(AttrValue::String(raw.to_string())),
            Some("Long") => raw
                .trim()
                .parse()
                .map(AttrValue::Long)
                .map_err(|_| invalid()),
            Some("Version") => Ok(AttrValue::Version(Version::parse(raw)?)),
            Some("List") | Some("List<String>") => Ok(AttrValue::Strings(list(raw))),
            Some("List<Version>") => list(raw)
                .iter()
                .map(|v| Version::parse(v))
                .collect::<Result<Vec<_>>>()
                .map(AttrValue::Versions),
            Some(_) => Err(invalid()),
        }
    }

    /// String form, when the value is a plain string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::String(s) => write!(f, "{}", s),
            AttrValue::Long(n) => write!(f, "{}", n),
            AttrValue::Version(v) => write!(f, "{}", v),
            AttrValue::Strings(list) => write!(f, "{}", list.join(",")),
            AttrValue::Versions(list) => {
                let parts: Vec<String> = list.iter().map(Version::to_string).collect();
                write!(f, "{}", parts.join(","))
            }
        }
    }
}

/// A fact a module provides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Capability {
    pub namespace: String,
    pub attributes: BTreeMap<String, AttrValue>,
}

impl Capability {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// Builder-style attribute setter.
    pub fn with(mut self, key: impl Into<String>, value: AttrValue) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    /// Attribute lookup.
    pub fn attribute(&self, key: &str) -> Option<&AttrValue> {
        self.attributes.get(key)
    }
}

/// A need a module declares, satisfied by a capability in the same namespace
/// whose attributes match the filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    pub namespace: String,
    pub filter: Option<Filter>,
    pub optional: bool,
    /// The manifest clause this requirement came from.
    pub source: String,
}

impl Requirement {
    pub fn new(namespace: impl Into<String>, filter: Option<Filter>) -> Self {
        Self {
            namespace: namespace.into(),
            filter,
            optional: false,
            source: String::new(),
        }
    }

    /// Mark the requirement optional.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Record the originating clause.
    pub fn from_clause(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Whether `capability` satisfies this requirement.
    pub fn is_satisfied_by(&self, capability: &Capability) -> bool {
        capability.namespace == self.namespace
            && self
                .filter
                .as_ref()
                .map_or(true, |f| f.matches(&capability.attributes))
    }
}

impl Serialize for Requirement {
    fn serialize<S: serde::Serializer>(
        &self,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut s = serializer.serialize_struct("Requirement", 3)?;
        s.serialize_field("namespace", &self.namespace)?;
        s.serialize_field("filter", &self.filter.as_ref().map(Filter::to_string))?;
        s.serialize_field("optional", &self.optional)?;
        s.end()
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.filter {
            Some(filter) => write!(f, "{}; filter:=\"{}\"", self.namespace, filter)?,
            None => write!(f, "{}", self.namespace)?,
        }
        if self.optional {
            write!(f, "; resolution:=optional")?;
        }
        Ok(())
    }
}
