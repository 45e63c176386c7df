//! Execution environment profiles.
//!
//! An execution environment id such as `JavaSE-11` or `OSGi/Minimum-1.2`
//! names a family and a level. Modules require environments by id; the
//! platform provides them as `osgi.ee` capabilities.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::module::{namespace, Filter, Version};

static EE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+?)-(\d+(?:\.\d+){0,2})$").expect("valid EE id pattern"));

/// Split an environment id into its normalised family and level.
pub fn split_id(id: &str) -> (String, Option<Version>) {
    let id = id.trim();
    match EE_ID.captures(id) {
        Some(caps) => {
            let family = normalize_family(&caps[1]);
            let level = Version::parse(&caps[2]).ok();
            (family, level)
        }
        None => (id.to_string(), None),
    }
}

fn normalize_family(family: &str) -> String {
    match family {
        "J2SE" => "JavaSE".to_string(),
        other => other.to_string(),
    }
}

/// Filter matching the `osgi.ee` capability for environment `id`.
pub fn requirement_filter(id: &str) -> Filter {
    let (family, level) = split_id(id);
    match level {
        Some(level) => Filter::And(vec![
            Filter::equal(namespace::EXECUTION_ENVIRONMENT, &family),
            Filter::equal("version", &level.to_string()),
        ]),
        None => Filter::equal(namespace::EXECUTION_ENVIRONMENT, &family),
    }
}

/// A known execution environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionEnvironment {
    pub id: String,
    #[serde(skip)]
    pub family: String,
    #[serde(skip)]
    pub level: Option<Version>,
    /// Packages the environment's runtime provides implicitly.
    #[serde(default)]
    pub system_packages: Vec<String>,
}

impl ExecutionEnvironment {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        let (family, level) = split_id(&id);
        Self {
            id,
            family,
            level,
            system_packages: Vec::new(),
        }
    }

    pub fn with_system_packages<I, S>(mut self, packages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.system_packages = packages.into_iter().map(Into::into).collect();
        self
    }

    /// Recompute `family` and `level` from `id` (after deserialization).
    pub fn normalized(self) -> Self {
        let system_packages = self.system_packages;
        Self::new(self.id).with_system_packages(system_packages)
    }

    /// True when the runtime matches this environment exactly: same family
    /// and same release level. A newer runtime is compatible but not strictly.
    pub fn is_strictly_compatible(&self, runtime: &ProjectRuntime) -> bool {
        match &self.level {
            Some(level) => self.family == runtime.family && level.same_release(&runtime.level),
            None => false,
        }
    }
}

/// The runtime a development project is configured to build against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectRuntime {
    pub family: String,
    pub level: Version,
}

impl ProjectRuntime {
    pub fn new(family: impl Into<String>, level: Version) -> Self {
        Self {
            family: normalize_family(&family.into()),
            level,
        }
    }

    /// Parse a runtime from an environment-style id such as `JavaSE-17`.
    pub fn from_id(id: &str) -> Option<Self> {
        match split_id(id) {
            (family, Some(level)) => Some(Self { family, level }),
            _ => None,
        }
    }
}
