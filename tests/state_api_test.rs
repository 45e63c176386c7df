//! Integration tests for the module graph state.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread;

use modgraph::environment::{ExecutionEnvironment, ProjectRuntime};
use modgraph::manifest::{
    HeaderIndex, ManifestSource, MemoryManifestLoader, StateHooks, MANIFEST_PATH,
};
use modgraph::module::{names, Headers, ModuleId};
use modgraph::resolver::{Resolution, ResolveRequest, Resolver};
use modgraph::state::{ModuleGraphState, ModuleModel};
use modgraph::{ModGraphError, Result};
use tempfile::TempDir;

fn headers(pairs: &[(&str, &str)]) -> Headers {
    pairs.iter().copied().collect()
}

/// A state reading manifests from the returned in-memory loader.
fn memory_state(
    environments: &[&str],
    development_mode: bool,
) -> (ModuleGraphState, Arc<MemoryManifestLoader>) {
    let loader = Arc::new(MemoryManifestLoader::new());
    let hooks = StateHooks::builder().loader(loader.clone()).build();
    let state = ModuleGraphState::builder()
        .environments(environments.iter().copied())
        .development_mode(development_mode)
        .hooks(hooks)
        .build();
    (state, loader)
}

fn project(runtime: &str) -> ManifestSource {
    ManifestSource::project(ProjectRuntime::from_id(runtime).unwrap())
}

#[test]
fn reinstalling_identical_content_is_idempotent() {
    let (state, loader) = memory_state(&["JavaSE-17"], false);
    let location = Path::new("/ws/a");
    loader.insert(
        location,
        headers(&[
            ("Bundle-SymbolicName", "org.a"),
            ("Bundle-Version", "1.2.0"),
            ("Export-Package", "org.a.api"),
        ]),
    );

    let first = state
        .add_or_update(location, &ManifestSource::Packaged, None)
        .unwrap()
        .unwrap();
    state.resolve(false).unwrap();
    let second = state
        .add_or_update(location, &ManifestSource::Packaged, Some(first.id()))
        .unwrap()
        .unwrap();

    assert_eq!(second.id(), first.id());
    assert!(second.same_content(&first));
    assert_eq!(state.len(), 1);
    assert!(state.resolve(true).unwrap().is_empty());
    assert!(state.is_resolved(first.id()));
}

#[test]
fn updates_keep_the_id_and_leave_others_alone() {
    let (state, loader) = memory_state(&["JavaSE-17"], false);
    let a = Path::new("/ws/a");
    let b = Path::new("/ws/b");
    loader.insert(a, headers(&[("Bundle-SymbolicName", "org.a"), ("Bundle-Version", "1")]));
    loader.insert(b, headers(&[("Bundle-SymbolicName", "org.b"), ("Bundle-Version", "1")]));
    let a_id = state
        .add_or_update(a, &ManifestSource::Packaged, None)
        .unwrap()
        .unwrap()
        .id();
    let b_before = state
        .add_or_update(b, &ManifestSource::Packaged, None)
        .unwrap()
        .unwrap();
    state.resolve(false).unwrap();

    for version in ["2", "3"] {
        loader.insert(
            a,
            headers(&[("Bundle-SymbolicName", "org.a"), ("Bundle-Version", version)]),
        );
        let updated = state
            .add_or_update(a, &ManifestSource::Packaged, Some(a_id))
            .unwrap()
            .unwrap();
        assert_eq!(updated.id(), a_id);
    }

    assert_eq!(state.descriptor(a_id).unwrap().version().to_string(), "3.0.0");
    assert_eq!(state.descriptor(b_before.id()).unwrap(), b_before);

    let delta = state.resolve(true).unwrap();
    let updated: Vec<ModuleId> = delta.updated.iter().map(|e| e.id).collect();
    assert_eq!(updated, [a_id]);
    assert!(!delta.mentions(b_before.id()));
}

#[test]
fn refreshed_environments_force_a_full_pass() {
    let ids = Arc::new(Mutex::new(vec!["JavaSE-1.8".to_string()]));
    let source = {
        let ids = Arc::clone(&ids);
        move || {
            ids.lock()
                .unwrap()
                .iter()
                .map(|id| ExecutionEnvironment::new(id.clone()))
                .collect::<Vec<_>>()
        }
    };
    let state = ModuleGraphState::builder().profiles(Arc::new(source)).build();
    let modern = state
        .install_headers(
            Path::new("/ws/modern"),
            headers(&[
                ("Bundle-SymbolicName", "org.modern"),
                ("Bundle-RequiredExecutionEnvironment", "JavaSE-11"),
            ]),
            None,
        )
        .unwrap()
        .unwrap();
    state.resolve(false).unwrap();
    assert!(!state.is_resolved(modern.id()));

    ids.lock().unwrap().push("JavaSE-11".to_string());
    state.refresh_environments();
    assert!(state.environments_changed());

    let full = state.fork();
    let incremental_delta = state.resolve(true).unwrap();
    let full_delta = full.resolve(false).unwrap();

    assert_eq!(incremental_delta, full_delta);
    assert_eq!(incremental_delta.changed.len(), 1);
    assert!(incremental_delta.changed[0].resolved);
    assert!(state.is_resolved(modern.id()));
    assert!(!state.environments_changed());
}

#[test]
fn removed_ids_are_reported_once_and_never_reused() {
    let state = ModuleGraphState::default();
    let gone = state
        .install_headers(Path::new("/ws/gone"), headers(&[("Bundle-SymbolicName", "gone")]), None)
        .unwrap()
        .unwrap();
    state.resolve(false).unwrap();

    state.remove(gone.id());
    let delta = state.resolve(true).unwrap();
    assert_eq!(delta.removed.len(), 1);
    assert_eq!(delta.removed[0].id, gone.id());
    assert!(!delta.removed[0].resolved);

    let fresh = state
        .install_headers(Path::new("/ws/gone"), headers(&[("Bundle-SymbolicName", "gone")]), None)
        .unwrap()
        .unwrap();
    assert_ne!(fresh.id(), gone.id());

    let delta = state.resolve(true).unwrap();
    assert!(!delta.mentions(gone.id()));
    assert!(!delta.resolved_ids().contains(&gone.id()));
}

#[test]
fn declared_environments_are_never_overridden() {
    let (state, loader) = memory_state(&["JavaSE-1.8", "JavaSE-11"], true);
    let legacy = Path::new("/ws/legacy");
    let capability = Path::new("/ws/capability");
    loader.insert(
        legacy,
        headers(&[
            ("Bundle-SymbolicName", "legacy"),
            ("Bundle-RequiredExecutionEnvironment", "JavaSE-1.8"),
        ]),
    );
    loader.insert(
        capability,
        headers(&[
            ("Bundle-SymbolicName", "capability"),
            ("Require-Capability", "osgi.ee; filter:=\"(osgi.ee=JavaSE)\""),
        ]),
    );

    let legacy = state
        .add_or_update(legacy, &project("JavaSE-11"), None)
        .unwrap()
        .unwrap();
    let capability = state
        .add_or_update(capability, &project("JavaSE-11"), None)
        .unwrap()
        .unwrap();

    assert_eq!(
        legacy.headers().get(names::REQUIRED_EXECUTION_ENVIRONMENT),
        Some("JavaSE-1.8")
    );
    assert_eq!(
        capability.headers().get(names::REQUIRED_EXECUTION_ENVIRONMENT),
        None
    );
}

#[test]
fn injection_scenario_and_removal_delta() {
    let (state, loader) = memory_state(&["P-1.8", "P-11"], true);
    let a = Path::new("/ws/a");
    let b = Path::new("/ws/b");
    loader.insert(a, headers(&[("Bundle-SymbolicName", "a")]));
    loader.insert(
        b,
        headers(&[
            ("Bundle-SymbolicName", "b"),
            ("Bundle-RequiredExecutionEnvironment", "P-1.8"),
        ]),
    );

    let a = state.add_or_update(a, &project("P-11"), None).unwrap().unwrap();
    let b = state.add_or_update(b, &project("P-11"), None).unwrap().unwrap();
    assert_eq!(a.required_environments(), ["P-11"]);
    assert_eq!(b.required_environments(), ["P-1.8"]);

    state.resolve(false).unwrap();
    assert!(state.is_resolved(a.id()));
    assert!(state.is_resolved(b.id()));

    state.remove(a.id());
    let delta = state.resolve(true).unwrap();

    let removed: Vec<ModuleId> = delta.removed.iter().map(|e| e.id).collect();
    assert_eq!(removed, [a.id()]);
    assert!(!delta.mentions(b.id()));
}

#[test]
fn removal_before_the_first_pass_is_reported() {
    let (state, loader) = memory_state(&["P-1.8", "P-11"], true);
    loader.insert("/ws/a", headers(&[("Bundle-SymbolicName", "a")]));
    loader.insert(
        "/ws/b",
        headers(&[
            ("Bundle-SymbolicName", "b"),
            ("Bundle-RequiredExecutionEnvironment", "P-1.8"),
        ]),
    );

    let a = state
        .add_or_update(Path::new("/ws/a"), &project("P-11"), None)
        .unwrap()
        .unwrap();
    let b = state
        .add_or_update(Path::new("/ws/b"), &project("P-11"), None)
        .unwrap()
        .unwrap();
    assert_eq!(a.required_environments(), ["P-11"]);
    assert_eq!(b.required_environments(), ["P-1.8"]);

    state.remove(a.id());
    let delta = state.resolve(true).unwrap();

    let removed: Vec<ModuleId> = delta.removed.iter().map(|e| e.id).collect();
    assert_eq!(removed, [a.id()]);
    assert!(!delta.added.iter().any(|e| e.id == a.id()));
    assert!(!delta.changed.iter().any(|e| e.id == b.id()));
    assert!(state.is_resolved(b.id()));
}

#[test]
fn dirty_environments_widen_a_subset_pass() {
    let ids = Arc::new(Mutex::new(vec!["JavaSE-1.8".to_string()]));
    let source = {
        let ids = Arc::clone(&ids);
        move || {
            ids.lock()
                .unwrap()
                .iter()
                .map(|id| ExecutionEnvironment::new(id.clone()))
                .collect::<Vec<_>>()
        }
    };
    let state = ModuleGraphState::builder().profiles(Arc::new(source)).build();
    state
        .install_headers(Path::new("/ws/other"), headers(&[("Bundle-SymbolicName", "other")]), None)
        .unwrap();
    let modern = state
        .install_headers(
            Path::new("/ws/modern"),
            headers(&[
                ("Bundle-SymbolicName", "org.modern"),
                ("Bundle-RequiredExecutionEnvironment", "JavaSE-11"),
            ]),
            None,
        )
        .unwrap()
        .unwrap();
    state.resolve(false).unwrap();
    assert!(!state.is_resolved(modern.id()));

    ids.lock().unwrap().push("JavaSE-11".to_string());
    state.refresh_environments();

    let full = state.fork();
    let subset_delta = state.resolve_subset(&["other"]).unwrap();
    let full_delta = full.resolve(false).unwrap();

    assert_eq!(subset_delta, full_delta);
    assert_eq!(subset_delta.changed.len(), 1);
    assert_eq!(subset_delta.changed[0].id, modern.id());
    assert!(state.is_resolved(modern.id()));
}

#[test]
fn packaged_modules_are_not_injected() {
    let (state, loader) = memory_state(&["P-11"], true);
    loader.insert("/ws/jar", headers(&[("Bundle-SymbolicName", "jar")]));

    let jar = state
        .add_or_update(Path::new("/ws/jar"), &ManifestSource::Packaged, None)
        .unwrap()
        .unwrap();

    assert!(jar.required_environments().is_empty());
}

#[test]
fn injection_needs_development_mode() {
    let (state, loader) = memory_state(&["P-11"], false);
    loader.insert("/ws/a", headers(&[("Bundle-SymbolicName", "a")]));

    let a = state
        .add_or_update(Path::new("/ws/a"), &project("P-11"), None)
        .unwrap()
        .unwrap();

    assert!(a.required_environments().is_empty());
}

fn write_manifest(dir: &Path, text: &str) {
    fs::create_dir_all(dir.join("META-INF")).unwrap();
    fs::write(dir.join(MANIFEST_PATH), text).unwrap();
}

#[test]
fn deleted_manifest_removes_the_module() {
    let temp = TempDir::new().unwrap();
    let location = temp.path().join("a");
    write_manifest(&location, "Bundle-SymbolicName: org.a\nBundle-Version: 1.0.0\n");
    let state = ModuleGraphState::default();
    let mut model = ModuleModel::packaged(&location);

    let installed = state.add_model(&mut model, false).unwrap();
    assert_eq!(model.descriptor(), Some(installed.id()));
    state.resolve(false).unwrap();

    fs::remove_file(location.join(MANIFEST_PATH)).unwrap();
    assert!(state.add_model(&mut model, true).is_none());
    assert_eq!(model.descriptor(), None);
    assert!(state.is_empty());

    let delta = state.resolve(true).unwrap();
    assert_eq!(delta.removed[0].id, installed.id());
}

#[test]
fn unreadable_manifest_is_an_error() {
    let temp = TempDir::new().unwrap();
    let location = temp.path().join("bad");
    write_manifest(&location, " continuation first\n");
    let state = ModuleGraphState::default();

    let err = state
        .add_or_update(&location, &ManifestSource::Packaged, None)
        .unwrap_err();

    assert!(matches!(err, ModGraphError::ManifestRead { .. }));
    assert!(state.is_empty());
}

#[test]
fn header_index_tracks_installed_modules() {
    let index = Arc::new(HeaderIndex::new(["Bundle-Vendor"]));
    let hooks = StateHooks::builder().auxiliary(index.clone()).build();
    let state = ModuleGraphState::builder().hooks(hooks).build();

    let a = state
        .install_headers(
            Path::new("/ws/a"),
            headers(&[("Bundle-SymbolicName", "a"), ("Bundle-Vendor", "Acme")]),
            None,
        )
        .unwrap()
        .unwrap();
    assert_eq!(index.get(a.id()).unwrap().get("Bundle-Vendor"), Some("Acme"));

    state.remove(a.id());
    assert!(index.is_empty());
}

struct FailingResolver;

impl Resolver for FailingResolver {
    fn resolve(&self, _request: &ResolveRequest<'_>) -> Result<Resolution> {
        Err(ModGraphError::ResolverFailed {
            message: "boom".into(),
        })
    }
}

struct PhantomResolver;

impl Resolver for PhantomResolver {
    fn resolve(&self, _request: &ResolveRequest<'_>) -> Result<Resolution> {
        Ok(Resolution {
            resolved: BTreeSet::from([ModuleId(404)]),
            wires: Vec::new(),
        })
    }
}

#[test]
fn failed_pass_leaves_the_state_untouched() {
    for resolver in [
        Arc::new(FailingResolver) as Arc<dyn Resolver>,
        Arc::new(PhantomResolver) as Arc<dyn Resolver>,
    ] {
        let state = ModuleGraphState::builder().resolver(resolver).build();
        let a = state
            .install_headers(Path::new("/ws/a"), headers(&[("Bundle-SymbolicName", "a")]), None)
            .unwrap()
            .unwrap();

        let err = state.resolve(false).unwrap_err();

        assert!(matches!(err, ModGraphError::ResolverFailed { .. }));
        assert!(!state.is_resolved(a.id()));
        assert!(state.environments_changed());
        assert_eq!(state.unresolved().len(), 1);
    }
}

#[test]
fn concurrent_installs_get_distinct_ids() {
    let state = Arc::new(ModuleGraphState::builder().environments(["JavaSE-17"]).build());
    let handles: Vec<_> = (0..4)
        .map(|worker| {
            let state = Arc::clone(&state);
            thread::spawn(move || {
                (0..10)
                    .map(|n| {
                        let location = PathBuf::from(format!("/ws/{}-{}", worker, n));
                        let name = format!("m{}.{}", worker, n);
                        let id = state
                            .install_headers(
                                &location,
                                headers(&[("Bundle-SymbolicName", name.as_str())]),
                                None,
                            )
                            .unwrap()
                            .unwrap()
                            .id();
                        state.resolve(true).unwrap();
                        id
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let ids: BTreeSet<ModuleId> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();

    assert_eq!(ids.len(), 40);
    assert_eq!(state.len(), 40);
    assert!(state.unresolved().is_empty());
}
