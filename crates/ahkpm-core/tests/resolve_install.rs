//! End-to-end tests for resolution and the installer against an in-memory
//! package source.

use ahkpm_core::pkg::memory::MARKER_FILE;
use ahkpm_core::pkg::{
    DependencySet, InstallMode, Installer, Lockfile, MemorySource, PkgError, ResolveOptions,
    Resolver, LOCKFILE_NAME, MANIFEST_NAME, MODULES_DIR,
};
use std::fs;
use std::path::Path;
use tempfile::{tempdir, TempDir};

fn deps(specs: &[&str]) -> DependencySet {
    DependencySet::from_specifiers(specs).unwrap()
}

/// a@1.0.0 -> c@1.2.3, b@1.0.0 -> c@1.2.3, b@2.0.0 -> c@1.2.4
fn registry() -> MemorySource {
    let source = MemorySource::new();
    source
        .add_revision("github.com/x/a", "a100", deps(&["gh:x/c@1.2.3"]))
        .tag("github.com/x/a", "1.0.0", "a100")
        .add_revision("github.com/x/b", "b100", deps(&["gh:x/c@1.2.3"]))
        .tag("github.com/x/b", "1.0.0", "b100")
        .add_revision("github.com/x/b", "b200", deps(&["gh:x/c@1.2.4"]))
        .tag("github.com/x/b", "2.0.0", "b200")
        .add_revision("github.com/x/c", "c123", DependencySet::new())
        .tag("github.com/x/c", "1.2.3", "c123")
        .add_revision("github.com/x/c", "c124", DependencySet::new())
        .tag("github.com/x/c", "1.2.4", "c124");
    source
}

fn project(dependencies: &str) -> TempDir {
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join(MANIFEST_NAME),
        format!(r#"{{"name": "demo", "dependencies": {dependencies}}}"#),
    )
    .unwrap();
    dir
}

fn read_lockfile(root: &Path) -> Lockfile {
    Lockfile::read_from(&root.join(LOCKFILE_NAME)).unwrap().unwrap()
}

fn marker(root: &Path, relative: &str) -> Option<String> {
    fs::read_to_string(root.join(MODULES_DIR).join(relative).join(MARKER_FILE)).ok()
}

#[test]
fn resolution_is_deterministic() {
    let source = registry();
    let set = deps(&["gh:x/b@1.0.0", "gh:x/a@1.0.0"]);

    let first = Resolver::new(&source).resolve(&set).unwrap().flatten();
    let second = Resolver::new(&source).resolve(&set).unwrap().flatten();
    let parallel = Resolver::new(&source)
        .with_options(ResolveOptions { jobs: 3 })
        .resolve(&set)
        .unwrap()
        .flatten();

    assert_eq!(first, second);
    assert_eq!(first, parallel);
}

#[test]
fn identical_pins_do_not_conflict() {
    let source = registry();
    let tree = Resolver::new(&source)
        .resolve(&deps(&["gh:x/a@1.0.0", "gh:x/b@1.0.0"]))
        .unwrap();

    let c_entries: Vec<_> = tree
        .flatten()
        .into_iter()
        .filter(|d| d.name == "github.com/x/c")
        .collect();
    assert_eq!(c_entries.len(), 2);
    assert_eq!(c_entries[0].sha, c_entries[1].sha);
    assert_eq!(c_entries[0].version, c_entries[1].version);
}

#[test]
fn install_without_lockfile_resolves_whole_manifest() {
    let dir = project(r#"{"gh:x/a": "1.0.0"}"#);
    let installer = Installer::new(registry(), dir.path());

    let summary = installer.install(&deps(&["gh:x/b@1.0.0"])).unwrap();
    assert_eq!(summary.mode, InstallMode::Resolved);
    assert_eq!(summary.materialized, 4);
    assert_eq!(summary.added, ["github.com/x/b"]);

    let lock = read_lockfile(dir.path());
    assert_eq!(lock.dependencies, deps(&["gh:x/a@1.0.0", "gh:x/b@1.0.0"]));
    let paths: Vec<_> = lock.resolved.iter().map(|d| d.install_path.as_str()).collect();
    assert_eq!(
        paths,
        [
            "ahkpm-modules/github.com/x/a",
            "ahkpm-modules/github.com/x/a/ahkpm-modules/github.com/x/c",
            "ahkpm-modules/github.com/x/b",
            "ahkpm-modules/github.com/x/b/ahkpm-modules/github.com/x/c",
        ]
    );

    assert_eq!(
        marker(dir.path(), "github.com/x/a/ahkpm-modules/github.com/x/c").as_deref(),
        Some("github.com/x/c\nc123\n")
    );
    assert!(marker(dir.path(), "github.com/x/b").is_some());

    let manifest = fs::read_to_string(dir.path().join(MANIFEST_NAME)).unwrap();
    assert!(manifest.contains(r#""github.com/x/a": "1.0.0""#));
    assert!(manifest.contains(r#""github.com/x/b": "1.0.0""#));
}

#[test]
fn install_with_no_new_dependencies_trusts_lockfile() {
    let dir = project("{}");
    Installer::new(registry(), dir.path())
        .install(&deps(&["gh:x/a@1.0.0"]))
        .unwrap();
    fs::remove_dir_all(dir.path().join(MODULES_DIR)).unwrap();

    // No tags registered: any attempt to resolve would fail
    let bare = MemorySource::new();
    bare.add_revision("github.com/x/a", "a100", deps(&["gh:x/c@1.2.3"]))
        .add_revision("github.com/x/c", "c123", DependencySet::new());
    let installer = Installer::new(bare, dir.path());

    let summary = installer.install(&DependencySet::new()).unwrap();
    assert_eq!(summary.mode, InstallMode::Lockfile);
    assert_eq!(summary.materialized, 2);
    assert_eq!(installer.source().copies().len(), 2);
    assert!(marker(dir.path(), "github.com/x/a/ahkpm-modules/github.com/x/c").is_some());
}

#[test]
fn install_merges_new_roots_into_lockfile_tree() {
    let dir = project("{}");
    let installer = Installer::new(registry(), dir.path());
    installer.install(&deps(&["gh:x/a@1.0.0"])).unwrap();
    let before = read_lockfile(dir.path());

    installer.install(&deps(&["gh:x/c@1.2.3"])).unwrap();
    let after = read_lockfile(dir.path());

    assert_eq!(after.resolved[..2], before.resolved[..]);
    assert_eq!(after.resolved[2].install_path, "ahkpm-modules/github.com/x/c");
    assert_eq!(after.dependencies.len(), 2);
}

#[test]
fn install_conflict_writes_nothing() {
    let dir = project("{}");
    let manifest_before = fs::read_to_string(dir.path().join(MANIFEST_NAME)).unwrap();
    let installer = Installer::new(registry(), dir.path());

    let err = installer
        .install(&deps(&["gh:x/a@1.0.0", "gh:x/b@2.0.0"]))
        .unwrap_err();

    match err {
        PkgError::DependencyConflict { name, .. } => assert_eq!(name, "github.com/x/c"),
        other => panic!("expected conflict, got {other:?}"),
    }
    assert!(!dir.path().join(LOCKFILE_NAME).exists());
    assert!(!dir.path().join(MODULES_DIR).exists());
    assert_eq!(
        fs::read_to_string(dir.path().join(MANIFEST_NAME)).unwrap(),
        manifest_before
    );
}

#[test]
fn failed_copy_leaves_previous_state_intact() {
    let dir = project("{}");
    let installer = Installer::new(registry(), dir.path());
    installer.install(&deps(&["gh:x/a@1.0.0"])).unwrap();

    let manifest_before = fs::read_to_string(dir.path().join(MANIFEST_NAME)).unwrap();
    let lock_before = fs::read_to_string(dir.path().join(LOCKFILE_NAME)).unwrap();

    installer.source().fail_copies_of("github.com/x/b");
    let err = installer.install(&deps(&["gh:x/b@1.0.0"])).unwrap_err();
    assert!(matches!(err, PkgError::SourceIo { .. }));

    assert_eq!(
        fs::read_to_string(dir.path().join(MANIFEST_NAME)).unwrap(),
        manifest_before
    );
    assert_eq!(
        fs::read_to_string(dir.path().join(LOCKFILE_NAME)).unwrap(),
        lock_before
    );
    assert!(marker(dir.path(), "github.com/x/a").is_some());
    assert!(marker(dir.path(), "github.com/x/b").is_none());

    let leftovers: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| e.file_name().to_string_lossy().starts_with(".ahkpm-modules-staging"))
        .collect();
    assert!(leftovers.is_empty());
}

#[test]
fn update_only_touches_named_roots() {
    let dir = project("{}");
    let source = registry();
    source
        .add_revision("github.com/x/a", "a110", DependencySet::new())
        .tag("github.com/x/a", "1.1.0", "a110");
    let installer = Installer::new(source, dir.path());

    installer
        .install(&deps(&["gh:x/a@1.0.0", "gh:x/b@1.0.0"]))
        .unwrap();
    // Rewrite a's pin as a range so the update has somewhere to go
    fs::write(
        dir.path().join(MANIFEST_NAME),
        r#"{"dependencies": {"github.com/x/a": "^1.0.0", "github.com/x/b": "1.0.0"}}"#,
    )
    .unwrap();
    let before = read_lockfile(dir.path());
    let b_before: Vec<_> = before
        .resolved
        .iter()
        .filter(|d| d.install_path.starts_with("ahkpm-modules/github.com/x/b"))
        .cloned()
        .collect();

    let summary = installer.update(&["gh:x/a"]).unwrap();
    assert_eq!(summary.updated, ["github.com/x/a"]);

    let after = read_lockfile(dir.path());
    let a = after
        .resolved
        .iter()
        .find(|d| d.install_path == "ahkpm-modules/github.com/x/a")
        .unwrap();
    assert_eq!(a.sha, "a110");
    assert!(a.dependencies.is_empty());
    assert!(!after
        .resolved
        .iter()
        .any(|d| d.install_path.starts_with("ahkpm-modules/github.com/x/a/")));

    let b_after: Vec<_> = after
        .resolved
        .iter()
        .filter(|d| d.install_path.starts_with("ahkpm-modules/github.com/x/b"))
        .cloned()
        .collect();
    assert_eq!(b_before, b_after);
    assert!(marker(dir.path(), "github.com/x/a/ahkpm-modules/github.com/x/c").is_none());
}

#[test]
fn update_rejects_unknown_and_ambiguous_targets() {
    let dir = project("{}");
    let installer = Installer::new(registry(), dir.path());
    installer.install(&deps(&["gh:x/a@1.0.0"])).unwrap();

    let err = installer.update(&["gh:x/b"]).unwrap_err();
    assert!(matches!(err, PkgError::NotADirectDependency { ref name } if name == "github.com/x/b"));

    let err = installer.update(&["gh:x/a", "github.com/x/a"]).unwrap_err();
    assert!(matches!(err, PkgError::AmbiguousUpdateTarget { .. }));
}

#[test]
fn uninstall_removes_whole_subtree() {
    let dir = project("{}");
    let installer = Installer::new(registry(), dir.path());
    installer
        .install(&deps(&["gh:x/a@1.0.0", "gh:x/b@1.0.0"]))
        .unwrap();

    let summary = installer.uninstall(&["gh:x/a"]).unwrap();
    assert_eq!(summary.removed, ["github.com/x/a"]);
    assert_eq!(summary.materialized, 2);

    let lock = read_lockfile(dir.path());
    let paths: Vec<_> = lock.resolved.iter().map(|d| d.install_path.as_str()).collect();
    assert_eq!(
        paths,
        [
            "ahkpm-modules/github.com/x/b",
            "ahkpm-modules/github.com/x/b/ahkpm-modules/github.com/x/c",
        ]
    );
    assert_eq!(lock.dependencies, deps(&["gh:x/b@1.0.0"]));
    assert!(!dir.path().join(MODULES_DIR).join("github.com/x/a").exists());

    let manifest = fs::read_to_string(dir.path().join(MANIFEST_NAME)).unwrap();
    assert!(!manifest.contains("github.com/x/a"));
}

#[test]
fn uninstall_of_unknown_package_touches_nothing() {
    let dir = project(r#"{"gh:x/a": "1.0.0"}"#);
    let installer = Installer::new(registry(), dir.path());

    let err = installer.uninstall(&["gh:x/nope"]).unwrap_err();
    assert!(matches!(err, PkgError::NotADirectDependency { .. }));
    assert!(!dir.path().join(LOCKFILE_NAME).exists());
    assert!(!dir.path().join(MODULES_DIR).exists());
}

#[test]
fn bare_name_installs_latest_version() {
    let dir = project("{}");
    let source = registry();
    source
        .add_revision("github.com/x/d", "d1", DependencySet::new())
        .branch("github.com/x/d", "main", "d1");
    let installer = Installer::new(source, dir.path());

    let set = installer
        .dependencies_from_specifiers(["gh:x/b", "gh:x/d", "gh:x/c@1.2.4"])
        .unwrap();
    assert_eq!(
        set,
        deps(&["gh:x/b@^2.0.0", "gh:x/d@branch:main", "gh:x/c@1.2.4"])
    );

    installer.install(&set).unwrap();
    let manifest = fs::read_to_string(dir.path().join(MANIFEST_NAME)).unwrap();
    assert!(manifest.contains(r#""github.com/x/b": "^2.0.0""#));
    assert!(manifest.contains(r#""github.com/x/d": "branch:main""#));
    assert_eq!(
        marker(dir.path(), "github.com/x/b").as_deref(),
        Some("github.com/x/b\nb200\n")
    );
}

#[test]
fn bare_name_lookup_waits_for_every_specifier_to_validate() {
    let dir = project("{}");
    let installer = Installer::new(MemorySource::new(), dir.path());

    // gh:x/a is not registered, so querying it first would give PackageNotFound
    let err = installer
        .dependencies_from_specifiers(["gh:x/a", "gitlab.com/x/b"])
        .unwrap_err();
    assert!(matches!(err, PkgError::InvalidName { .. }));

    let err = installer
        .dependencies_from_specifiers(["gh:x/a"])
        .unwrap_err();
    assert!(matches!(err, PkgError::PackageNotFound { .. }));
}

#[test]
fn invalid_specifier_is_rejected_before_resolution() {
    let err = DependencySet::from_specifiers(["gitlab.com/x/a@1.0.0"]).unwrap_err();
    assert!(matches!(err, PkgError::InvalidName { .. }));

    let err = DependencySet::from_specifiers(["gh:x/a@not a version"]).unwrap_err();
    assert!(matches!(err, PkgError::InvalidVersionSpecifier { .. }));
}
