//! Module descriptors and the vocabulary they are built from.
//!
//! - [`header`] - Manifest header map and clause parsing
//! - [`version`] - Versions and version ranges
//! - [`filter`] - LDAP-style requirement filters
//! - [`capability`] - Capabilities, requirements and attribute values
//! - [`descriptor`] - The immutable [`ModuleDescriptor`]

pub mod capability;
pub mod descriptor;
pub mod filter;
pub mod header;
pub mod version;

pub use capability::{namespace, AttrValue, Capability, Requirement};
pub use descriptor::{ModuleDescriptor, ModuleId, Role};
pub use filter::Filter;
pub use header::{names, parse_clauses, HeaderClause, Headers};
pub use version::{Version, VersionRange};
