//! Module descriptors.
//!
//! A [`ModuleDescriptor`] is the immutable record of one installable module:
//! identity, declared requirements, provided capabilities and the id the
//! graph assigned to it. Descriptors are built once from manifest headers
//! and replaced wholesale on update.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::capability::{namespace, AttrValue, Capability, Requirement};
use super::filter::Filter;
use super::header::{names, parse_clauses, HeaderClause, Headers};
use super::version::{Version, VersionRange};
use crate::environment::profile;
use crate::error::{ModGraphError, Result};

/// Graph-assigned module id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ModuleId(pub u64);

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whether a module is the platform's foundational runtime module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    #[default]
    Regular,
}

/// Immutable description of one installed module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleDescriptor {
    id: ModuleId,
    symbolic_name: String,
    version: Version,
    location: PathBuf,
    singleton: bool,
    role: Role,
    requirements: Vec<Requirement>,
    capabilities: Vec<Capability>,
    required_environments: Vec<String>,
    #[serde(skip)]
    headers: Headers,
}

impl ModuleDescriptor {
    /// Build a descriptor from manifest headers.
    ///
    /// Fails with [`ModGraphError::ManifestInvalid`] when the headers carry
    /// no symbolic name, and with a parse error when a header is malformed.
    pub fn from_headers(id: ModuleId, location: &Path, headers: Headers) -> Result<Self> {
        let name_clause = headers
            .get(names::BUNDLE_SYMBOLIC_NAME)
            .map(|v| parse_clauses(names::BUNDLE_SYMBOLIC_NAME, v))
            .transpose()?
            .and_then(|clauses| clauses.into_iter().next())
            .ok_or_else(|| ModGraphError::ManifestInvalid {
                location: location.to_path_buf(),
                message: format!("no {} header", names::BUNDLE_SYMBOLIC_NAME),
            })?;

        let symbolic_name = name_clause.value().to_string();
        let singleton = name_clause
            .directive("singleton")
            .is_some_and(|v| v.eq_ignore_ascii_case("true"));
        let version = headers
            .get(names::BUNDLE_VERSION)
            .map(Version::parse)
            .transpose()?
            .unwrap_or_default();
        let role = match headers.get(names::SYSTEM_BUNDLE) {
            Some(v) if v.trim().eq_ignore_ascii_case("true") => Role::System,
            _ => Role::Regular,
        };

        let mut capabilities = vec![identity_capability(&symbolic_name, &version, &name_clause)?];
        capabilities.extend(exported_packages(&headers, &symbolic_name, &version)?);
        capabilities.extend(provided_capabilities(&headers)?);

        let required_environments: Vec<String> = headers
            .get(names::REQUIRED_EXECUTION_ENVIRONMENT)
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        let mut requirements = required_bundles(&headers)?;
        requirements.extend(imported_packages(&headers)?);
        if let Some(req) = environment_requirement(&required_environments) {
            requirements.push(req);
        }
        requirements.extend(required_capabilities(&headers)?);

        Ok(Self {
            id,
            symbolic_name,
            version,
            location: location.to_path_buf(),
            singleton,
            role,
            requirements,
            capabilities,
            required_environments,
            headers,
        })
    }

    pub fn id(&self) -> ModuleId {
        self.id
    }

    pub fn symbolic_name(&self) -> &str {
        &self.symbolic_name
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    pub fn location(&self) -> &Path {
        &self.location
    }

    pub fn is_singleton(&self) -> bool {
        self.singleton
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn is_system_module(&self) -> bool {
        self.role == Role::System
    }

    pub fn requirements(&self) -> &[Requirement] {
        &self.requirements
    }

    pub fn capabilities(&self) -> &[Capability] {
        &self.capabilities
    }

    /// Effective required execution environments, in declared order.
    pub fn required_environments(&self) -> &[String] {
        &self.required_environments
    }

    /// Effective headers after injection and weaving.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Same module content ignoring the id.
    pub fn same_content(&self, other: &ModuleDescriptor) -> bool {
        self.symbolic_name == other.symbolic_name
            && self.version == other.version
            && self.location == other.location
            && self.role == other.role
            && self.requirements == other.requirements
            && self.capabilities == other.capabilities
    }
}

impl fmt::Display for ModuleDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{} [{}]", self.symbolic_name, self.version, self.id)
    }
}

fn identity_capability(name: &str, version: &Version, clause: &HeaderClause) -> Result<Capability> {
    let mut cap = Capability::new(namespace::BUNDLE);
    cap.attributes.extend(clause.typed_attributes()?);
    Ok(cap
        .with(namespace::BUNDLE, AttrValue::String(name.to_string()))
        .with("bundle-version", AttrValue::Version(version.clone())))
}

fn clauses(headers: &Headers, header: &str) -> Result<Vec<HeaderClause>> {
    match headers.get(header) {
        Some(value) => parse_clauses(header, value),
        None => Ok(Vec::new()),
    }
}

fn is_optional(clause: &HeaderClause) -> bool {
    clause.directive("resolution") == Some("optional")
}

fn exported_packages(headers: &Headers, name: &str, version: &Version) -> Result<Vec<Capability>> {
    let mut caps = Vec::new();
    for clause in clauses(headers, names::EXPORT_PACKAGE)? {
        let package_version = clause
            .attribute("version")
            .or_else(|| clause.attribute("specification-version"))
            .map(Version::parse)
            .transpose()?
            .unwrap_or_default();
        let mut extra = clause.typed_attributes()?;
        extra.remove("version");
        extra.remove("specification-version");

        for package in &clause.values {
            let mut cap = Capability::new(namespace::PACKAGE);
            cap.attributes.extend(extra.clone());
            caps.push(
                cap.with(namespace::PACKAGE, AttrValue::String(package.clone()))
                    .with("version", AttrValue::Version(package_version.clone()))
                    .with("bundle-symbolic-name", AttrValue::String(name.to_string()))
                    .with("bundle-version", AttrValue::Version(version.clone())),
            );
        }
    }
    Ok(caps)
}

fn provided_capabilities(headers: &Headers) -> Result<Vec<Capability>> {
    let mut caps = Vec::new();
    for clause in clauses(headers, names::PROVIDE_CAPABILITY)? {
        let attributes = clause.typed_attributes()?;
        for ns in &clause.values {
            caps.push(Capability {
                namespace: ns.clone(),
                attributes: attributes.clone(),
            });
        }
    }
    Ok(caps)
}

fn with_range(base: Filter, clause: &HeaderClause, attribute: &str) -> Result<Filter> {
    match clause.attribute(attribute) {
        Some(range) => Ok(Filter::And(vec![
            base,
            VersionRange::parse(range)?.to_filter(attribute),
        ])),
        None => Ok(base),
    }
}

fn required_bundles(headers: &Headers) -> Result<Vec<Requirement>> {
    let mut reqs = Vec::new();
    for clause in clauses(headers, names::REQUIRE_BUNDLE)? {
        for name in &clause.values {
            let filter = with_range(
                Filter::equal(namespace::BUNDLE, name),
                &clause,
                "bundle-version",
            )?;
            let mut req = Requirement::new(namespace::BUNDLE, Some(filter)).from_clause(name);
            req.optional = is_optional(&clause);
            reqs.push(req);
        }
    }
    Ok(reqs)
}

fn imported_packages(headers: &Headers) -> Result<Vec<Requirement>> {
    let mut reqs = Vec::new();
    for clause in clauses(headers, names::IMPORT_PACKAGE)? {
        for package in &clause.values {
            // java.* comes from the runtime itself
            if package.starts_with("java.") {
                continue;
            }
            let mut filter = with_range(
                Filter::equal(namespace::PACKAGE, package),
                &clause,
                "version",
            )?;
            if let Some(provider) = clause.attribute("bundle-symbolic-name") {
                filter = Filter::And(vec![
                    filter,
                    Filter::equal("bundle-symbolic-name", provider),
                ]);
            }
            let mut req = Requirement::new(namespace::PACKAGE, Some(filter)).from_clause(package);
            req.optional = is_optional(&clause);
            reqs.push(req);
        }
    }
    Ok(reqs)
}

fn environment_requirement(environments: &[String]) -> Option<Requirement> {
    let mut filters: Vec<Filter> = environments
        .iter()
        .map(|id| profile::requirement_filter(id))
        .collect();
    let filter = match filters.len() {
        0 => return None,
        1 => filters.remove(0),
        _ => Filter::Or(filters),
    };
    Some(
        Requirement::new(namespace::EXECUTION_ENVIRONMENT, Some(filter))
            .from_clause(environments.join(",")),
    )
}

fn required_capabilities(headers: &Headers) -> Result<Vec<Requirement>> {
    let mut reqs = Vec::new();
    for clause in clauses(headers, names::REQUIRE_CAPABILITY)? {
        if clause
            .directive("effective")
            .is_some_and(|e| e != "resolve")
        {
            continue;
        }
        let filter = clause.directive("filter").map(Filter::parse).transpose()?;
        for ns in &clause.values {
            let mut req = Requirement::new(ns.clone(), filter.clone()).from_clause(ns);
            req.optional = is_optional(&clause);
            reqs.push(req);
        }
    }
    Ok(reqs)
}
