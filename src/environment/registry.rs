//! Execution environment registry and platform properties.
//!
//! The registry tracks the ordered list of known execution environments and
//! whether it changed since platform properties were last pushed to the
//! resolver. Platform properties are derived from that list by the pure
//! [`platform_properties`] function.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::profile::ExecutionEnvironment;
use crate::module::{namespace, parse_clauses, Capability, Version};

/// Property keys of a platform profile.
pub mod keys {
    pub const OS: &str = "osgi.os";
    pub const WS: &str = "osgi.ws";
    pub const ARCH: &str = "osgi.arch";
    pub const NL: &str = "osgi.nl";
    pub const EXECUTION_ENVIRONMENT: &str = "org.osgi.framework.executionenvironment";
    pub const SYSTEM_CAPABILITIES: &str = "org.osgi.framework.system.capabilities";
    pub const SYSTEM_PACKAGES: &str = "org.osgi.framework.system.packages";
    pub const SYSTEM_BUNDLE: &str = "osgi.system.bundle";
}

/// Value of `jre_profile` that opts out of profile discovery.
pub const NO_PROFILE: &str = "none";

/// Where installed execution environment profiles come from.
pub trait ProfileSource: Send + Sync {
    /// Installed profiles in preference order.
    fn installed_profiles(&self) -> Vec<ExecutionEnvironment>;
}

impl<F> ProfileSource for F
where
    F: Fn() -> Vec<ExecutionEnvironment> + Send + Sync,
{
    fn installed_profiles(&self) -> Vec<ExecutionEnvironment> {
        self()
    }
}

/// A fixed profile list, typically from configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticProfiles(pub Vec<ExecutionEnvironment>);

impl StaticProfiles {
    /// Profiles from bare ids.
    pub fn from_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(ids.into_iter().map(ExecutionEnvironment::new).collect())
    }
}

impl ProfileSource for StaticProfiles {
    fn installed_profiles(&self) -> Vec<ExecutionEnvironment> {
        self.0.clone()
    }
}

/// Operating system, windowing system, architecture and locale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformInfo {
    pub os: String,
    pub ws: String,
    pub arch: String,
    pub nl: String,
}

impl Default for PlatformInfo {
    fn default() -> Self {
        let os = match std::env::consts::OS {
            "macos" => "macosx",
            other => other,
        };
        let ws = match os {
            "macosx" => "cocoa",
            "windows" => "win32",
            _ => "gtk",
        };
        Self {
            os: os.to_string(),
            ws: ws.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            nl: "en_US".to_string(),
        }
    }
}

/// One property dictionary handed to the resolver.
pub type PropertyMap = BTreeMap<String, String>;

/// Resolver-consumable platform properties: one map per known environment.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct PlatformProperties {
    pub profiles: Vec<PropertyMap>,
    /// When false, execution environment requirements are not checked.
    pub enforce_environments: bool,
}

/// Capabilities and packages one platform profile provides.
#[derive(Debug, Clone, Default)]
pub struct ProfileCapabilities {
    pub environment: Option<String>,
    pub capabilities: Vec<Capability>,
    pub system_packages: Vec<String>,
}

impl PlatformProperties {
    /// Decode the profile maps into capabilities. Malformed capability
    /// clauses are skipped.
    pub fn profile_capabilities(&self) -> Vec<ProfileCapabilities> {
        self.profiles
            .iter()
            .map(|profile| {
                let capabilities = profile
                    .get(keys::SYSTEM_CAPABILITIES)
                    .and_then(|v| parse_clauses(keys::SYSTEM_CAPABILITIES, v).ok())
                    .unwrap_or_default()
                    .into_iter()
                    .filter_map(|clause| {
                        let attributes = clause.typed_attributes().ok()?;
                        Some(Capability {
                            namespace: clause.value().to_string(),
                            attributes,
                        })
                    })
                    .collect();
                let system_packages = profile
                    .get(keys::SYSTEM_PACKAGES)
                    .map(|v| {
                        v.split(',')
                            .map(str::trim)
                            .filter(|s| !s.is_empty())
                            .map(String::from)
                            .collect()
                    })
                    .unwrap_or_default();
                ProfileCapabilities {
                    environment: profile.get(keys::EXECUTION_ENVIRONMENT).cloned(),
                    capabilities,
                    system_packages,
                }
            })
            .collect()
    }
}

/// Build platform properties for the given environments.
///
/// `None` means no-profile mode: a single base map is produced and
/// environment requirements are not enforced.
pub fn platform_properties(
    environments: Option<&[ExecutionEnvironment]>,
    platform: &PlatformInfo,
    system_module: &str,
) -> PlatformProperties {
    let mut base = PropertyMap::new();
    base.insert(keys::OS.to_string(), platform.os.clone());
    base.insert(keys::WS.to_string(), platform.ws.clone());
    base.insert(keys::ARCH.to_string(), platform.arch.clone());
    base.insert(keys::NL.to_string(), platform.nl.clone());
    base.insert(keys::SYSTEM_BUNDLE.to_string(), system_module.to_string());

    let Some(environments) = environments else {
        return PlatformProperties {
            profiles: vec![base],
            enforce_environments: false,
        };
    };
    if environments.is_empty() {
        return PlatformProperties {
            profiles: vec![base],
            enforce_environments: true,
        };
    }

    let profiles = environments
        .iter()
        .map(|ee| {
            let mut map = base.clone();
            map.insert(keys::EXECUTION_ENVIRONMENT.to_string(), ee.id.clone());
            map.insert(
                keys::SYSTEM_CAPABILITIES.to_string(),
                environment_capability(ee, environments),
            );
            if !ee.system_packages.is_empty() {
                map.insert(
                    keys::SYSTEM_PACKAGES.to_string(),
                    ee.system_packages.join(","),
                );
            }
            map
        })
        .collect();

    PlatformProperties {
        profiles,
        enforce_environments: true,
    }
}

/// `osgi.ee` capability clause for `ee`. A profile also provides every
/// lower level of the same family among the known environments.
fn environment_capability(ee: &ExecutionEnvironment, known: &[ExecutionEnvironment]) -> String {
    let Some(level) = &ee.level else {
        return format!(
            "{ns}; {ns}=\"{}\"",
            ee.id,
            ns = namespace::EXECUTION_ENVIRONMENT
        );
    };
    let versions: BTreeSet<&Version> = known
        .iter()
        .filter(|other| other.family == ee.family)
        .filter_map(|other| other.level.as_ref())
        .filter(|other| *other <= level)
        .collect();
    let versions: Vec<String> = versions.iter().map(|v| v.to_string()).collect();
    format!(
        "{ns}; {ns}=\"{}\"; version:List<Version>=\"{}\"",
        ee.family,
        versions.join(","),
        ns = namespace::EXECUTION_ENVIRONMENT
    )
}

/// Ordered set of known execution environments plus a change flag.
#[derive(Clone)]
pub struct ExecutionEnvironmentRegistry {
    source: Arc<dyn ProfileSource>,
    jre_profile: Option<String>,
    known: Option<Vec<ExecutionEnvironment>>,
    changed: bool,
    no_profile: bool,
}

impl fmt::Debug for ExecutionEnvironmentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionEnvironmentRegistry")
            .field("known", &self.known_ids())
            .field("changed", &self.changed)
            .field("no_profile", &self.no_profile)
            .finish()
    }
}

impl ExecutionEnvironmentRegistry {
    /// Create a registry over `source`. Nothing is read until [`refresh`].
    ///
    /// [`refresh`]: Self::refresh
    pub fn new(source: Arc<dyn ProfileSource>) -> Self {
        Self {
            source,
            jre_profile: None,
            known: None,
            changed: false,
            no_profile: false,
        }
    }

    /// Set the degraded-mode signal consulted when no profiles are found.
    pub fn with_jre_profile(mut self, jre_profile: Option<String>) -> Self {
        self.jre_profile = jre_profile;
        self
    }

    /// Recompute the known environments from the profile source.
    ///
    /// Always marks the registry changed, even when the set is identical.
    pub fn refresh(&mut self) {
        let installed = self.source.installed_profiles();
        self.no_profile =
            installed.is_empty() && self.jre_profile.as_deref() == Some(NO_PROFILE);
        if self.no_profile {
            self.known = None;
        } else {
            self.known = Some(installed);
        }
        self.changed = true;
        tracing::debug!(
            environments = ?self.known_ids(),
            no_profile = self.no_profile,
            "refreshed execution environments"
        );
    }

    /// True until the first refresh, unless in no-profile mode.
    pub fn needs_refresh(&self) -> bool {
        self.known.is_none() && !self.no_profile
    }

    pub fn is_changed(&self) -> bool {
        self.changed
    }

    /// Force the next resolution to recompute properties.
    pub fn mark_changed(&mut self) {
        self.changed = true;
    }

    pub(crate) fn clear_changed(&mut self) {
        self.changed = false;
    }

    pub fn is_no_profile(&self) -> bool {
        self.no_profile
    }

    /// Known environments in preference order.
    pub fn known(&self) -> Option<&[ExecutionEnvironment]> {
        self.known.as_deref()
    }

    pub fn known_ids(&self) -> Vec<String> {
        self.known
            .iter()
            .flatten()
            .map(|ee| ee.id.clone())
            .collect()
    }

    /// Platform properties for the current known set.
    pub fn platform_properties(
        &self,
        platform: &PlatformInfo,
        system_module: &str,
    ) -> PlatformProperties {
        platform_properties(self.known(), platform, system_module)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::AttrValue;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn registry(ids: &[&str]) -> ExecutionEnvironmentRegistry {
        ExecutionEnvironmentRegistry::new(Arc::new(StaticProfiles::from_ids(ids.iter().copied())))
    }

    fn linux() -> PlatformInfo {
        PlatformInfo {
            os: "linux".into(),
            ws: "gtk".into(),
            arch: "x86_64".into(),
            nl: "en_US".into(),
        }
    }

    #[test]
    fn new_registry_needs_refresh() {
        let reg = registry(&["P-11"]);
        assert!(reg.needs_refresh());
        assert!(!reg.is_changed());
        assert!(reg.known().is_none());
    }

    #[test]
    fn refresh_loads_profiles_in_order() {
        let mut reg = registry(&["P-1.8", "P-11"]);
        reg.refresh();
        assert!(!reg.needs_refresh());
        assert!(reg.is_changed());
        assert_eq!(reg.known_ids(), vec!["P-1.8", "P-11"]);
    }

    #[test]
    fn refresh_always_marks_changed() {
        let mut reg = registry(&["P-11"]);
        reg.refresh();
        reg.clear_changed();
        reg.refresh();
        assert!(reg.is_changed());
    }

    #[test]
    fn refresh_reads_source_each_time() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let source = move || {
            counter.fetch_add(1, Ordering::SeqCst);
            vec![ExecutionEnvironment::new("P-11")]
        };
        let mut reg = ExecutionEnvironmentRegistry::new(Arc::new(source));
        reg.refresh();
        reg.refresh();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn empty_source_without_opt_out_is_empty_known_set() {
        let mut reg = registry(&[]);
        reg.refresh();
        assert!(!reg.is_no_profile());
        assert_eq!(reg.known().map(<[_]>::len), Some(0));
    }

    #[test]
    fn empty_source_with_opt_out_enters_no_profile_mode() {
        let mut reg = registry(&[]).with_jre_profile(Some(NO_PROFILE.into()));
        reg.refresh();
        assert!(reg.is_no_profile());
        assert!(reg.known().is_none());
        assert!(!reg.needs_refresh());
        assert!(reg.is_changed());
    }

    #[test]
    fn profiles_installed_later_leave_no_profile_mode() {
        let installed = Arc::new(parking_lot::Mutex::new(Vec::<ExecutionEnvironment>::new()));
        let source = {
            let installed = Arc::clone(&installed);
            move || installed.lock().clone()
        };
        let mut reg = ExecutionEnvironmentRegistry::new(Arc::new(source))
            .with_jre_profile(Some(NO_PROFILE.into()));
        reg.refresh();
        assert!(reg.is_no_profile());

        installed.lock().push(ExecutionEnvironment::new("P-11"));
        reg.refresh();

        assert!(!reg.is_no_profile());
        assert_eq!(reg.known_ids(), vec!["P-11"]);
    }

    #[test]
    fn opt_out_ignored_when_profiles_exist() {
        let mut reg = registry(&["P-11"]).with_jre_profile(Some(NO_PROFILE.into()));
        reg.refresh();
        assert!(!reg.is_no_profile());
        assert_eq!(reg.known_ids(), vec!["P-11"]);
    }

    #[test]
    fn properties_have_one_map_per_environment() {
        let envs = vec![
            ExecutionEnvironment::new("JavaSE-1.8"),
            ExecutionEnvironment::new("JavaSE-11").with_system_packages(["java.xml"]),
        ];
        let props = platform_properties(Some(&envs), &linux(), "org.example.runtime");
        assert!(props.enforce_environments);
        assert_eq!(props.profiles.len(), 2);
        let second = &props.profiles[1];
        assert_eq!(second[keys::OS], "linux");
        assert_eq!(second[keys::EXECUTION_ENVIRONMENT], "JavaSE-11");
        assert_eq!(second[keys::SYSTEM_PACKAGES], "java.xml");
        assert_eq!(second[keys::SYSTEM_BUNDLE], "org.example.runtime");
        assert!(second[keys::SYSTEM_CAPABILITIES].contains("\"1.8.0,11.0.0\""));
        assert!(!props.profiles[0][keys::SYSTEM_CAPABILITIES].contains("11.0.0"));
    }

    #[test]
    fn properties_are_pure() {
        let envs = vec![ExecutionEnvironment::new("P-11")];
        assert_eq!(
            platform_properties(Some(&envs), &linux(), "sys"),
            platform_properties(Some(&envs), &linux(), "sys")
        );
    }

    #[test]
    fn no_profile_properties_disable_enforcement() {
        let props = platform_properties(None, &linux(), "sys");
        assert!(!props.enforce_environments);
        assert_eq!(props.profiles.len(), 1);
        assert!(!props.profiles[0].contains_key(keys::EXECUTION_ENVIRONMENT));
    }

    #[test]
    fn profile_capabilities_decode_environment() {
        let envs = vec![
            ExecutionEnvironment::new("P-1.8"),
            ExecutionEnvironment::new("P-11"),
        ];
        let props = platform_properties(Some(&envs), &linux(), "sys");
        let decoded = props.profile_capabilities();
        assert_eq!(decoded.len(), 2);
        let cap = &decoded[1].capabilities[0];
        assert_eq!(cap.namespace, namespace::EXECUTION_ENVIRONMENT);
        assert_eq!(
            cap.attribute("version"),
            Some(&AttrValue::Versions(vec![
                Version::new(1, 8, 0),
                Version::new(11, 0, 0)
            ]))
        );
        assert_eq!(decoded[1].environment.as_deref(), Some("P-11"));
    }

    #[test]
    fn environment_without_level_provides_its_id() {
        let envs = vec![ExecutionEnvironment::new("Custom")];
        let props = platform_properties(Some(&envs), &linux(), "sys");
        let decoded = props.profile_capabilities();
        assert_eq!(
            decoded[0].capabilities[0].attribute(namespace::EXECUTION_ENVIRONMENT),
            Some(&AttrValue::String("Custom".into()))
        );
    }
}
