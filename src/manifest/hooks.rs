//! Strategy hooks supplied to the graph state at construction.
//!
//! - [`ManifestWeaver`] rewrites headers before a descriptor is built
//!   (development-mode classpath remapping).
//! - [`AuxiliaryData`] observes installs and removals to keep side data.
//!
//! [`StateHooks`] bundles them with the [`ManifestLoader`].

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;

use super::loader::{FsManifestLoader, ManifestLoader};
use crate::module::{names, Headers, ModuleDescriptor, ModuleId};

/// Rewrites manifest headers before a descriptor is built.
pub trait ManifestWeaver: Send + Sync {
    fn weave(&self, headers: &mut Headers, location: &Path);
}

/// Leaves manifests untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoWeaving;

impl ManifestWeaver for NoWeaving {
    fn weave(&self, _headers: &mut Headers, _location: &Path) {}
}

/// Key in development classpath properties that drops the `.` entry.
pub const IGNORE_DOT: &str = "@ignoredot@";

/// Prepends development output folders to `Bundle-ClassPath`.
///
/// Entries are looked up by symbolic name, falling back to the `*` entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DevClasspathWeaver {
    default: Vec<String>,
    entries: HashMap<String, Vec<String>>,
    ignore_dot: bool,
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

impl DevClasspathWeaver {
    pub fn new(default: Vec<String>, entries: HashMap<String, Vec<String>>) -> Self {
        Self {
            default,
            entries,
            ignore_dot: false,
        }
    }

    pub fn ignore_dot(mut self, ignore: bool) -> Self {
        self.ignore_dot = ignore;
        self
    }

    /// Parse `key=value` lines (`#` comments), e.g.
    /// `*=bin` / `org.example=target/classes,lib` / `@ignoredot@=true`.
    pub fn from_properties(text: &str) -> Self {
        let mut weaver = Self::default();
        for line in text.lines().map(str::trim) {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            match key.trim() {
                "*" => weaver.default = split_list(value),
                IGNORE_DOT => weaver.ignore_dot = value.trim().eq_ignore_ascii_case("true"),
                name => {
                    weaver.entries.insert(name.to_string(), split_list(value));
                }
            }
        }
        weaver
    }

    fn entries_for(&self, symbolic_name: &str) -> &[String] {
        self.entries
            .get(symbolic_name)
            .map(Vec::as_slice)
            .unwrap_or(self.default.as_slice())
    }
}

impl ManifestWeaver for DevClasspathWeaver {
    fn weave(&self, headers: &mut Headers, location: &Path) {
        let Some(name) = headers
            .get(names::BUNDLE_SYMBOLIC_NAME)
            .and_then(|v| v.split(';').next())
            .map(|v| v.trim().to_string())
        else {
            return;
        };
        let dev = self.entries_for(&name);
        if dev.is_empty() {
            return;
        }

        let existing = headers
            .get(names::BUNDLE_CLASSPATH)
            .map(split_list)
            .unwrap_or_else(|| vec![".".to_string()]);
        let mut classpath: Vec<String> = dev.to_vec();
        for entry in existing {
            if !classpath.contains(&entry) {
                classpath.push(entry);
            }
        }
        if self.ignore_dot {
            classpath.retain(|e| e != ".");
        }

        tracing::debug!(
            module = %name,
            location = %location.display(),
            classpath = %classpath.join(","),
            "wove development classpath"
        );
        headers.insert(names::BUNDLE_CLASSPATH, classpath.join(","));
    }
}

/// Observes installed and removed descriptors.
pub trait AuxiliaryData: Send + Sync {
    /// Called after `descriptor` is installed from `headers`.
    fn record(&self, descriptor: &ModuleDescriptor, headers: &Headers);

    /// Called after the module with `id` is removed.
    fn discard(&self, id: ModuleId);
}

/// Keeps no auxiliary data.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAuxiliaryData;

impl AuxiliaryData for NoAuxiliaryData {
    fn record(&self, _descriptor: &ModuleDescriptor, _headers: &Headers) {}

    fn discard(&self, _id: ModuleId) {}
}

/// Remembers selected headers of every installed module.
#[derive(Debug, Default)]
pub struct HeaderIndex {
    tracked: Vec<String>,
    entries: Mutex<BTreeMap<ModuleId, Headers>>,
}

impl HeaderIndex {
    /// Track the given header names.
    pub fn new<I, S>(tracked: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tracked: tracked.into_iter().map(Into::into).collect(),
            entries: Mutex::new(BTreeMap::new()),
        }
    }

    /// Tracked headers recorded for `id`.
    pub fn get(&self, id: ModuleId) -> Option<Headers> {
        self.entries.lock().get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl AuxiliaryData for HeaderIndex {
    fn record(&self, descriptor: &ModuleDescriptor, headers: &Headers) {
        let selected: Headers = self
            .tracked
            .iter()
            .filter_map(|key| headers.get(key).map(|v| (key.clone(), v.to_string())))
            .collect();
        self.entries.lock().insert(descriptor.id(), selected);
    }

    fn discard(&self, id: ModuleId) {
        self.entries.lock().remove(&id);
    }
}

/// Loader and hooks used by a graph state.
#[derive(Clone)]
pub struct StateHooks {
    pub loader: Arc<dyn ManifestLoader>,
    pub weaver: Arc<dyn ManifestWeaver>,
    pub auxiliary: Arc<dyn AuxiliaryData>,
}

impl fmt::Debug for StateHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateHooks").finish_non_exhaustive()
    }
}

impl Default for StateHooks {
    fn default() -> Self {
        Self {
            loader: Arc::new(FsManifestLoader),
            weaver: Arc::new(NoWeaving),
            auxiliary: Arc::new(NoAuxiliaryData),
        }
    }
}

impl StateHooks {
    pub fn builder() -> StateHooksBuilder {
        StateHooksBuilder::default()
    }
}

/// Builder for [`StateHooks`]; unset hooks use the defaults.
#[derive(Default)]
pub struct StateHooksBuilder {
    hooks: StateHooks,
}

impl StateHooksBuilder {
    pub fn loader(mut self, loader: Arc<dyn ManifestLoader>) -> Self {
        self.hooks.loader = loader;
        self
    }

    pub fn weaver(mut self, weaver: Arc<dyn ManifestWeaver>) -> Self {
        self.hooks.weaver = weaver;
        self
    }

    pub fn auxiliary(mut self, auxiliary: Arc<dyn AuxiliaryData>) -> Self {
        self.hooks.auxiliary = auxiliary;
        self
    }

    pub fn build(self) -> StateHooks {
        self.hooks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&str, &str)]) -> Headers {
        pairs.iter().copied().collect()
    }

    #[test]
    fn no_weaving_leaves_headers() {
        let mut h = headers(&[("Bundle-SymbolicName", "a")]);
        NoWeaving.weave(&mut h, Path::new("/a"));
        assert_eq!(h, headers(&[("Bundle-SymbolicName", "a")]));
    }

    #[test]
    fn dev_weaver_prepends_entries_to_default_classpath() {
        let weaver = DevClasspathWeaver::from_properties("# dev\n*=bin\n");
        let mut h = headers(&[("Bundle-SymbolicName", "a;singleton:=true")]);
        weaver.weave(&mut h, Path::new("/a"));
        assert_eq!(h.get("Bundle-ClassPath"), Some("bin,."));
    }

    #[test]
    fn dev_weaver_prefers_named_entry_and_dedupes() {
        let weaver =
            DevClasspathWeaver::from_properties("*=bin\norg.example=target/classes,lib.jar");
        let mut h = headers(&[
            ("Bundle-SymbolicName", "org.example"),
            ("Bundle-ClassPath", "lib.jar, ."),
        ]);
        weaver.weave(&mut h, Path::new("/x"));
        assert_eq!(h.get("Bundle-ClassPath"), Some("target/classes,lib.jar,."));
    }

    #[test]
    fn dev_weaver_ignore_dot() {
        let weaver = DevClasspathWeaver::from_properties("*=bin\n@ignoredot@=true");
        let mut h = headers(&[("Bundle-SymbolicName", "a")]);
        weaver.weave(&mut h, Path::new("/a"));
        assert_eq!(h.get("Bundle-ClassPath"), Some("bin"));
    }

    #[test]
    fn dev_weaver_skips_without_entries_or_name() {
        let weaver = DevClasspathWeaver::from_properties("org.other=bin");
        let mut h = headers(&[("Bundle-SymbolicName", "a")]);
        weaver.weave(&mut h, Path::new("/a"));
        assert!(!h.contains_key("Bundle-ClassPath"));

        let weaver = DevClasspathWeaver::from_properties("*=bin");
        let mut h = headers(&[("Bundle-Version", "1")]);
        weaver.weave(&mut h, Path::new("/a"));
        assert!(!h.contains_key("Bundle-ClassPath"));
    }

    #[test]
    fn header_index_records_and_discards() {
        let index = HeaderIndex::new(["Bundle-Localization"]);
        let h = headers(&[
            ("Bundle-SymbolicName", "a"),
            ("Bundle-Localization", "plugin"),
        ]);
        let desc = ModuleDescriptor::from_headers(ModuleId(3), Path::new("/a"), h.clone()).unwrap();
        index.record(&desc, &h);
        assert_eq!(
            index.get(ModuleId(3)).unwrap().get("Bundle-Localization"),
            Some("plugin")
        );
        assert_eq!(index.get(ModuleId(3)).unwrap().len(), 1);
        index.discard(ModuleId(3));
        assert!(index.is_empty());
    }

    #[test]
    fn builder_overrides_selected_hooks() {
        let index = Arc::new(HeaderIndex::new(["X"]));
        let hooks = StateHooks::builder().auxiliary(index.clone()).build();
        let h = headers(&[("Bundle-SymbolicName", "a"), ("X", "1")]);
        let desc = ModuleDescriptor::from_headers(ModuleId(1), Path::new("/a"), h.clone()).unwrap();
        hooks.auxiliary.record(&desc, &h);
        assert_eq!(index.len(), 1);
    }
}
