//! Manifest headers and header clause parsing.
//!
//! [`Headers`] is the key/value map a manifest loader produces. Keys are
//! matched case-insensitively and keep their insertion order.
//! [`parse_clauses`] splits a header value such as
//! `org.a;org.b;version="[1,2)";resolution:=optional, org.c` into clauses
//! of values, attributes and directives.

use std::collections::BTreeMap;

use serde::Serialize;

use super::capability::AttrValue;
use crate::error::{ModGraphError, Result};

/// Header names the module model reads.
pub mod names {
    pub const BUNDLE_SYMBOLIC_NAME: &str = "Bundle-SymbolicName";
    pub const BUNDLE_VERSION: &str = "Bundle-Version";
    pub const BUNDLE_CLASSPATH: &str = "Bundle-ClassPath";
    pub const BUNDLE_LOCALIZATION: &str = "Bundle-Localization";
    pub const BUNDLE_NAME: &str = "Bundle-Name";
    pub const REQUIRE_BUNDLE: &str = "Require-Bundle";
    pub const IMPORT_PACKAGE: &str = "Import-Package";
    pub const EXPORT_PACKAGE: &str = "Export-Package";
    pub const REQUIRE_CAPABILITY: &str = "Require-Capability";
    pub const PROVIDE_CAPABILITY: &str = "Provide-Capability";
    pub const REQUIRED_EXECUTION_ENVIRONMENT: &str = "Bundle-RequiredExecutionEnvironment";
    /// Marks the platform's foundational runtime module.
    pub const SYSTEM_BUNDLE: &str = "Eclipse-SystemBundle";
}

/// Ordered, case-insensitive manifest header map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(k, _)| k.eq_ignore_ascii_case(key))
    }

    /// Value of `key`, if present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.position(key).map(|i| self.entries[i].1.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    /// Insert or replace `key`, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let key = key.into();
        let value = value.into();
        match self.position(&key) {
            Some(i) => Some(std::mem::replace(&mut self.entries[i].1, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.position(key).map(|i| self.entries.remove(i).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (k, v) in iter {
            headers.insert(k, v);
        }
        headers
    }
}

/// A raw attribute: optional declared type plus unquoted value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawAttribute {
    pub ty: Option<String>,
    pub value: String,
}

/// One comma-separated clause of a header value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderClause {
    /// Leading values (names or paths) sharing the clause's parameters.
    pub values: Vec<String>,
    pub attributes: BTreeMap<String, RawAttribute>,
    pub directives: BTreeMap<String, String>,
}

impl HeaderClause {
    /// First value of the clause.
    pub fn value(&self) -> &str {
        self.values.first().map(String::as_str).unwrap_or_default()
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(|a| a.value.as_str())
    }

    pub fn directive(&self, key: &str) -> Option<&str> {
        self.directives.get(key).map(String::as_str)
    }

    /// All attributes converted according to their declared types.
    pub fn typed_attributes(&self) -> Result<BTreeMap<String, AttrValue>> {
        self.attributes
            .iter()
            .map(|(k, a)| Ok((k.clone(), AttrValue::typed(a.ty.as_deref(), &a.value)?)))
            .collect()
    }
}

/// Split `input` on `separator`, ignoring separators inside double quotes.
fn split_unquoted(input: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_quotes = false;
    let mut escaped = false;
    let mut start = 0;
    for (i, c) in input.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            c if c == separator && !in_quotes => {
                parts.push(&input[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&input[start..]);
    parts
}

fn unquote(value: &str) -> String {
    let value = value.trim();
    match value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
    {
        Some(inner) => inner.replace("\\\"", "\"").replace("\\\\", "\\"),
        None => value.to_string(),
    }
}

/// Parse a header value into clauses. A blank value yields no clauses.
pub fn parse_clauses(header: &str, value: &str) -> Result<Vec<HeaderClause>> {
    let invalid = |message: String| ModGraphError::InvalidHeader {
        header: header.to_string(),
        message,
    };

    if value.contains('"') && value.matches('"').count() % 2 != 0 {
        return Err(invalid("unbalanced quotes".to_string()));
    }

    let mut clauses = Vec::new();
    for raw_clause in split_unquoted(value, ',') {
        if raw_clause.trim().is_empty() {
            continue;
        }
        let mut clause = HeaderClause::default();
        for part in split_unquoted(raw_clause, ';') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            let parameter = part.split_once('=');
            if let Some(key) = parameter.and_then(|(key, _)| key.strip_suffix(':')) {
                let val = parameter.map(|(_, v)| v).unwrap_or_default();
                clause
                    .directives
                    .insert(key.trim().to_string(), unquote(val));
            } else if let Some((key, val)) = parameter {
                let (name, ty) = match key.split_once(':') {
                    Some((name, ty)) => (name.trim(), Some(ty.trim().to_string())),
                    None => (key.trim(), None),
                };
                if name.is_empty() {
                    return Err(invalid(format!("attribute without name in '{}'", part)));
                }
                clause.attributes.insert(
                    name.to_string(),
                    RawAttribute {
                        ty,
                        value: unquote(val),
                    },
                );
            } else {
                if !clause.attributes.is_empty() || !clause.directives.is_empty() {
                    return Err(invalid(format!(
                        "value '{}' follows parameters in '{}'",
                        part,
                        raw_clause.trim()
                    )));
                }
                clause.values.push(part.to_string());
            }
        }
        if clause.values.is_empty() {
            return Err(invalid(format!(
                "clause '{}' has no value",
                raw_clause.trim()
            )));
        }
        clauses.push(clause);
    }
    Ok(clauses)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headers_lookup_ignores_case() {
        let mut headers = Headers::new();
        headers.insert("Bundle-SymbolicName", "org.example");
        assert_eq!(headers.get("bundle-symbolicname"), Some("org.example"));
        assert!(headers.contains_key("BUNDLE-SYMBOLICNAME"));
    }

    #[test]
    fn headers_insert_replaces_and_keeps_order() {
        let mut headers: Headers = [("A", "1"), ("B", "2")].into_iter().collect();
        assert_eq!(headers.insert("a", "3"), Some("1".to_string()));
        let keys: Vec<&str> = headers.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["A", "B"]);
        assert_eq!(headers.get("A"), Some("3"));
        assert_eq!(headers.remove("b"), Some("2".to_string()));
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn parses_values_attributes_and_directives() {
        let clauses = parse_clauses(
            "Import-Package",
            r#"org.a;org.b;version="[1.0,2.0)";resolution:=optional, org.c"#,
        )
        .unwrap();
        assert_eq!(clauses.len(), 2);
        assert_eq!(clauses[0].values, vec!["org.a", "org.b"]);
        assert_eq!(clauses[0].attribute("version"), Some("[1.0,2.0)"));
        assert_eq!(clauses[0].directive("resolution"), Some("optional"));
        assert_eq!(clauses[1].value(), "org.c");
    }

    #[test]
    fn typed_attributes_use_declared_types() {
        let clauses = parse_clauses(
            "Provide-Capability",
            r#"osgi.ee;osgi.ee="JavaSE";version:List<Version>="1.8,11""#,
        )
        .unwrap();
        let attrs = clauses[0].typed_attributes().unwrap();
        assert_eq!(
            attrs.get("osgi.ee"),
            Some(&AttrValue::String("JavaSE".into()))
        );
        assert!(matches!(attrs.get("version"), Some(AttrValue::Versions(v)) if v.len() == 2));
    }

    #[test]
    fn quoted_filter_keeps_inner_separators() {
        let clauses = parse_clauses(
            "Require-Capability",
            r#"osgi.ee;filter:="(&(osgi.ee=JavaSE)(version=11))", example.cap"#,
        )
        .unwrap();
        assert_eq!(clauses.len(), 2);
        assert_eq!(
            clauses[0].directive("filter"),
            Some("(&(osgi.ee=JavaSE)(version=11))")
        );
    }

    #[test]
    fn blank_value_yields_no_clauses() {
        assert!(parse_clauses("Export-Package", "  ").unwrap().is_empty());
    }

    #[test]
    fn rejects_parameters_without_value() {
        assert!(parse_clauses("Import-Package", "version=1.0").is_err());
        assert!(parse_clauses("Import-Package", "org.a;version=1;org.b").is_err());
        assert!(parse_clauses("Import-Package", "org.a;version=\"1").is_err());
    }
}
