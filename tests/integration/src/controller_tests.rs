//! Controller scenarios driven through the in-memory mount backend
//!
//! Covers status classification, bulk convergence and point edits with
//! their live effects.

use std::time::Duration;

use mirror_core::{Declaration, Error, MirrorController, PathSet, Status};
use mirror_fs::MirrorPoint;
use mirror_test_utils::{FakeBackend, MirrorTree};
use pretty_assertions::assert_eq;
use rstest::rstest;

fn p(raw: &str) -> MirrorPoint {
    MirrorPoint::parse(raw).unwrap()
}

fn declared(controller: &MirrorController) -> Vec<String> {
    controller.declared().iter().map(|p| p.to_string()).collect()
}

/// Tree with every declared point fully mounted.
fn full_tree(points: &[&str]) -> (MirrorTree, FakeBackend, MirrorController) {
    let tree = MirrorTree::new();
    let backend = FakeBackend::new();
    for raw in points {
        let location = raw.trim_end_matches('/');
        if raw.ends_with('/') {
            tree.source_dir(location);
            tree.target_dir(location);
        } else {
            tree.source_file(location, "source");
            tree.target_file(location, "");
        }
        tree.bind(&backend, location);
    }
    let controller = tree.controller(points, &backend);
    assert_eq!(controller.status(), Status::Full);
    (tree, backend, controller)
}

// =============================================================================
// Status scenarios
// =============================================================================

#[test]
fn test_empty_declaration_and_nothing_mounted_is_none() {
    let tree = MirrorTree::new();
    let backend = FakeBackend::new();
    let controller = tree.controller(&[], &backend);

    assert_eq!(controller.status(), Status::None);
}

#[test]
fn test_declared_directory_mounted_is_full() {
    let (_tree, _backend, controller) = full_tree(&["/a/"]);
    let report = controller.report();
    assert!(report.missing.is_empty());
    assert!(report.unexpected.is_empty());
}

#[test]
fn test_nested_declaration_is_rejected_or_covered() {
    let tree = MirrorTree::new();
    let backend = FakeBackend::new();
    assert!(matches!(
        PathSet::from_points([p("/a/"), p("/a/b")]),
        Err(Error::Conflict { .. })
    ));

    let mut controller = tree.controller(&["/a/"], &backend);
    let changes = controller.insert_point("/a/b", false).unwrap();
    assert!(changes.is_empty());
    assert_eq!(declared(&controller), vec!["/a/"]);
}

#[test]
fn test_partial_mount_all_mounts_only_missing_point() {
    let tree = MirrorTree::new();
    let backend = FakeBackend::new();
    tree.source_dir("/a");
    tree.target_dir("/a");
    tree.bind(&backend, "/a");
    tree.source_file("/c", "content");
    let controller = tree.controller(&["/a/", "/c"], &backend);
    assert_eq!(controller.status(), Status::Partial);

    let report = controller.mount_all().unwrap();

    assert_eq!(report.status, Status::Full);
    assert!(report.is_clean());
    assert_eq!(
        backend.calls(),
        vec![format!(
            "mount {} {}",
            tree.source_path("/c").display(),
            tree.target_path("/c").display()
        )]
    );
    assert!(tree.target_path("/c").is_file());
}

#[test]
fn test_undeclared_mount_blocks_bulk_operations() {
    let tree = MirrorTree::new();
    let backend = FakeBackend::new();
    tree.source_file("/x", "stray");
    tree.target_file("/x", "");
    tree.bind(&backend, "/x");
    let controller = tree.controller(&["/a/"], &backend);

    assert_eq!(controller.status(), Status::Invalid);
    assert_eq!(controller.report().unexpected, vec![p("/x")]);
    assert!(matches!(
        controller.mount_all(),
        Err(Error::StatePrecondition { status: Status::Invalid, .. })
    ));
    assert!(matches!(
        controller.unmount_all(),
        Err(Error::StatePrecondition { status: Status::Invalid, .. })
    ));
    assert!(backend.calls().is_empty());

    let report = controller.force_unmount().unwrap();
    assert!(report.complete);
    assert_eq!(report.status, Status::None);
}

// =============================================================================
// Bulk convergence
// =============================================================================

#[test]
fn test_mount_all_materializes_and_keeps_target_data() {
    let tree = MirrorTree::new();
    let backend = FakeBackend::new();
    tree.target_file("/data/keep.txt", "precious");
    let controller = tree.controller(&["/data/"], &backend);

    let report = controller.mount_all().unwrap();

    assert_eq!(report.status, Status::Full);
    assert!(tree.source_path("/data").is_dir());
    assert_eq!(
        std::fs::read_to_string(tree.target_path("/data/keep.txt")).unwrap(),
        "precious"
    );
    assert!(report.actions.iter().any(|a| a.starts_with("Created directory")));
}

#[test]
fn test_mount_all_twice_refuses_and_keeps_full() {
    let tree = MirrorTree::new();
    let backend = FakeBackend::new();
    let controller = tree.controller(&["/a/", "/b/"], &backend);

    assert_eq!(controller.mount_all().unwrap().status, Status::Full);
    let calls = backend.calls().len();

    assert!(matches!(
        controller.mount_all(),
        Err(Error::StatePrecondition { status: Status::Full, .. })
    ));
    assert_eq!(controller.status(), Status::Full);
    assert_eq!(backend.calls().len(), calls);
}

#[test]
fn test_unmount_all_deepest_first_then_refuses_when_none() {
    let (tree, backend, controller) = full_tree(&["/a/", "/a-b", "/z/"]);

    let report = controller.unmount_all().unwrap();
    assert_eq!(report.status, Status::None);
    assert_eq!(
        backend.calls(),
        vec![
            format!("umount {}", tree.target_path("/z").display()),
            format!("umount {}", tree.target_path("/a-b").display()),
            format!("umount {}", tree.target_path("/a").display()),
        ]
    );

    assert!(matches!(
        controller.unmount_all(),
        Err(Error::StatePrecondition { status: Status::None, .. })
    ));
    assert_eq!(controller.status(), Status::None);
    assert_eq!(backend.calls().len(), 3);
}

#[test]
fn test_mount_failures_are_reported_not_raised() {
    let tree = MirrorTree::new();
    let backend = FakeBackend::new();
    tree.target_dir("/denied");
    backend.fail_mounts_at(tree.target_path("/denied"));
    let controller = tree.controller(&["/ok/", "/denied/"], &backend);

    let report = controller.mount_all().unwrap();

    assert_eq!(report.status, Status::Partial);
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].contains("/denied/"));
    assert!(!report.is_clean());
}

#[test]
fn test_unmount_failures_are_reported_not_raised() {
    let (tree, backend, controller) = full_tree(&["/a/", "/b/"]);
    backend.set_busy(tree.target_path("/b"), 1);

    let report = controller.unmount_all().unwrap();

    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.status, Status::Partial);
    assert_eq!(controller.unmount_all().unwrap().status, Status::None);
}

#[test]
fn test_mount_all_type_conflict_is_per_point() {
    let tree = MirrorTree::new();
    let backend = FakeBackend::new();
    tree.source_file("/clash", "file");
    tree.target_dir("/clash");
    let controller = tree.controller(&["/clash", "/fine/"], &backend);

    let report = controller.mount_all().unwrap();

    assert_eq!(report.status, Status::Partial);
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].contains("clash"));
}

// =============================================================================
// Point insertion
// =============================================================================

#[test]
fn test_insert_while_none_edits_declaration_only() {
    let tree = MirrorTree::new();
    let backend = FakeBackend::new();
    let mut controller = tree.controller(&[], &backend);

    let changes = controller.insert_point("/var/lib/app/", false).unwrap();

    assert_eq!(changes.inserted, vec![p("/var/lib/app/")]);
    assert!(tree.source_path("/var/lib/app").is_dir());
    assert!(tree.target_path("/var/lib/app").is_dir());
    assert!(backend.calls().is_empty());
    assert_eq!(controller.status(), Status::None);
}

#[rstest]
#[case::hinted_directory("/etc/ssh/", None, "/etc/ssh/")]
#[case::existing_source_file("/etc/hostname", Some("source"), "/etc/hostname")]
#[case::existing_target_file("/etc/hostname", Some("target"), "/etc/hostname")]
#[case::nothing_exists("/srv/data", None, "/srv/data/")]
fn test_insert_resolves_kind(#[case] path: &str, #[case] file_in: Option<&str>, #[case] expected: &str) {
    let tree = MirrorTree::new();
    let backend = FakeBackend::new();
    match file_in {
        Some("source") => {
            tree.source_file(path, "x");
        }
        Some(_) => {
            tree.target_file(path, "x");
        }
        None => {}
    }
    let mut controller = tree.controller(&[], &backend);

    let changes = controller.insert_point(path, false).unwrap();
    assert_eq!(changes.inserted, vec![p(expected)]);
}

#[test]
fn test_insert_while_full_subsumes_descendants_live() {
    let (tree, backend, mut controller) = full_tree(&["/x/a", "/x/b/", "/y"]);

    let changes = controller.insert_point("/x/", false).unwrap();

    assert_eq!(changes.inserted, vec![p("/x/")]);
    assert_eq!(changes.removed, vec![p("/x/a"), p("/x/b/")]);
    assert_eq!(
        backend.calls(),
        vec![
            format!("umount {}", tree.target_path("/x/b").display()),
            format!("umount {}", tree.target_path("/x/a").display()),
            format!(
                "mount {} {}",
                tree.source_path("/x").display(),
                tree.target_path("/x").display()
            ),
        ]
    );
    assert_eq!(declared(&controller), vec!["/x/", "/y"]);
    assert_eq!(controller.status(), Status::Full);
}

#[test]
fn test_insert_while_partial_does_not_touch_mounts() {
    let tree = MirrorTree::new();
    let backend = FakeBackend::new();
    tree.source_dir("/a");
    tree.target_dir("/a");
    tree.bind(&backend, "/a");
    let mut controller = tree.controller(&["/a/", "/b/"], &backend);
    assert_eq!(controller.status(), Status::Partial);

    controller.insert_point("/c/", false).unwrap();

    assert!(backend.calls().is_empty());
    assert_eq!(controller.status(), Status::Partial);
}

#[test]
fn test_insert_while_partial_unmounts_live_descendants() {
    let tree = MirrorTree::new();
    let backend = FakeBackend::new();
    tree.source_dir("/x/a");
    tree.target_dir("/x/a");
    tree.bind(&backend, "/x/a");
    let mut controller = tree.controller(&["/x/a/", "/y/"], &backend);
    assert_eq!(controller.status(), Status::Partial);

    let preview = controller.insert_point("/x/", true).unwrap();
    assert!(preview.actions.iter().any(|a| a.contains("Would unmount /x/a/")));
    assert!(!preview.actions.iter().any(|a| a.contains("Would mount")));
    assert!(backend.calls().is_empty());

    let changes = controller.insert_point("/x/", false).unwrap();

    assert_eq!(changes.removed, vec![p("/x/a/")]);
    assert_eq!(
        backend.calls(),
        vec![format!("umount {}", tree.target_path("/x/a").display())]
    );
    assert_eq!(declared(&controller), vec!["/x/", "/y/"]);
    assert_eq!(controller.status(), Status::None);
}

#[test]
fn test_insert_existing_point_is_a_no_op() {
    let tree = MirrorTree::new();
    let backend = FakeBackend::new();
    let mut controller = tree.controller(&["/etc/hosts"], &backend);

    assert!(controller.insert_point("/etc/hosts", false).unwrap().is_empty());
    assert!(matches!(
        controller.insert_point("/etc/hosts/", false),
        Err(Error::Conflict { .. })
    ));
    assert_eq!(declared(&controller), vec!["/etc/hosts"]);
}

#[test]
fn test_insert_dry_run_changes_nothing() {
    let (tree, backend, mut controller) = full_tree(&["/x/a"]);

    let changes = controller.insert_point("/x/", true).unwrap();

    assert_eq!(changes.removed, vec![p("/x/a")]);
    assert!(changes.actions.iter().all(|a| a.starts_with("[dry-run]")));
    assert!(changes.actions.iter().any(|a| a.contains("Would mount /x/")));
    assert_eq!(declared(&controller), vec!["/x/a"]);
    assert!(backend.calls().is_empty());
    assert_eq!(backend.mount_points(), vec![tree.target_path("/x/a")]);
}

#[test]
fn test_insert_type_conflict_leaves_declaration_unchanged() {
    let tree = MirrorTree::new();
    let backend = FakeBackend::new();
    tree.source_file("/p", "file");
    tree.target_dir("/p");
    let mut controller = tree.controller(&[], &backend);

    let err = controller.insert_point("/p", false).unwrap_err();

    assert!(matches!(err, Error::Fs(mirror_fs::Error::TypeConflict { .. })));
    assert!(controller.declared().is_empty());
}

#[cfg(unix)]
#[test]
fn test_insert_symlink_is_unsupported() {
    let tree = MirrorTree::new();
    let backend = FakeBackend::new();
    tree.source_dir("/real");
    std::os::unix::fs::symlink(tree.source_path("/real"), tree.source_path("/link")).unwrap();
    let mut controller = tree.controller(&[], &backend);

    let err = controller.insert_point("/link/", false).unwrap_err();
    assert!(matches!(err, Error::Fs(mirror_fs::Error::SymlinkUnsupported { .. })));
}

#[test]
fn test_insert_live_mount_failure_is_raised() {
    let (tree, backend, mut controller) = full_tree(&["/a/"]);
    tree.target_dir("/b");
    backend.fail_mounts_at(tree.target_path("/b"));

    let err = controller.insert_point("/b/", false).unwrap_err();

    assert!(matches!(err, Error::Mount { .. }));
    assert_eq!(declared(&controller), vec!["/a/", "/b/"]);
    assert_eq!(controller.status(), Status::Partial);
}

// =============================================================================
// Point removal
// =============================================================================

#[test]
fn test_remove_mounted_point_unmounts_first() {
    let (tree, backend, mut controller) = full_tree(&["/a/", "/c"]);

    let changes = controller.remove_point("/a", false).unwrap();

    assert_eq!(changes.removed, vec![p("/a/")]);
    assert_eq!(
        backend.calls(),
        vec![format!("umount {}", tree.target_path("/a").display())]
    );
    assert_eq!(declared(&controller), vec!["/c"]);
    assert_eq!(controller.status(), Status::Full);
}

#[test]
fn test_remove_inside_declared_directory_is_ancestor_conflict() {
    let tree = MirrorTree::new();
    let backend = FakeBackend::new();
    let mut controller = tree.controller(&["/etc/ssh/"], &backend);

    let err = controller.remove_point("/etc/ssh/sshd_config", false).unwrap_err();
    match err {
        Error::AncestorConflict { ancestor, .. } => assert_eq!(ancestor, "/etc/ssh/"),
        other => panic!("expected AncestorConflict, got {:?}", other),
    }
}

#[test]
fn test_remove_parent_removes_each_descendant() {
    let (_tree, backend, mut controller) = full_tree(&["/etc/hosts", "/etc/ssh/", "/var/"]);

    let changes = controller.remove_point("/etc/", false).unwrap();

    assert_eq!(changes.removed, vec![p("/etc/ssh/"), p("/etc/hosts")]);
    assert_eq!(backend.calls().len(), 2);
    assert_eq!(declared(&controller), vec!["/var/"]);
    assert_eq!(controller.status(), Status::Full);
}

#[test]
fn test_remove_unknown_path_is_a_no_op() {
    let tree = MirrorTree::new();
    let backend = FakeBackend::new();
    let mut controller = tree.controller(&["/a/"], &backend);

    assert!(controller.remove_point("/b", false).unwrap().is_empty());
    assert_eq!(declared(&controller), vec!["/a/"]);
}

#[test]
fn test_remove_busy_point_stays_declared() {
    let (tree, backend, mut controller) = full_tree(&["/a/"]);
    backend.set_busy(tree.target_path("/a"), 1);

    let err = controller.remove_point("/a/", false).unwrap_err();

    assert!(matches!(err, Error::Mount { .. }));
    assert_eq!(declared(&controller), vec!["/a/"]);
    assert_eq!(controller.status(), Status::Full);
}

#[test]
fn test_remove_dry_run_changes_nothing() {
    let (_tree, backend, mut controller) = full_tree(&["/a/"]);

    let changes = controller.remove_point("/a/", true).unwrap();

    assert_eq!(changes.removed, vec![p("/a/")]);
    assert!(changes.actions[0].starts_with("[dry-run] Would unmount"));
    assert!(backend.calls().is_empty());
    assert_eq!(declared(&controller), vec!["/a/"]);
}

// =============================================================================
// Construction and caching
// =============================================================================

#[test]
fn test_roots_must_be_absolute_and_distinct() {
    let tree = MirrorTree::new();
    let backend = || Box::new(FakeBackend::new());

    assert!(matches!(
        MirrorController::new("relative", tree.target(), PathSet::new(), backend()),
        Err(Error::InvalidRoots { .. })
    ));
    assert!(matches!(
        MirrorController::new(tree.source(), tree.source(), PathSet::new(), backend()),
        Err(Error::InvalidRoots { .. })
    ));
    // Nested roots are allowed
    assert!(MirrorController::new(tree.source(), tree.source_path("/inner"), PathSet::new(), backend()).is_ok());
}

#[test]
fn test_observation_is_cached_until_invalidated() {
    let tree = MirrorTree::new();
    let backend = FakeBackend::new();
    let controller = tree
        .controller(&["/a/"], &backend)
        .with_cache_ttl(Duration::from_secs(60));

    controller.status();
    controller.report();
    assert_eq!(backend.table_reads(), 1);

    // An external mount is invisible until the cache is dropped
    tree.source_dir("/a");
    tree.target_dir("/a");
    tree.bind(&backend, "/a");
    assert_eq!(controller.status(), Status::None);

    controller.invalidate();
    assert_eq!(controller.status(), Status::Full);
    assert_eq!(backend.table_reads(), 2);
}

#[test]
fn test_mutations_invalidate_cache() {
    let tree = MirrorTree::new();
    let backend = FakeBackend::new();
    let controller = tree
        .controller(&["/a/"], &backend)
        .with_cache_ttl(Duration::from_secs(60));

    assert_eq!(controller.status(), Status::None);
    controller.mount_all().unwrap();
    assert_eq!(controller.status(), Status::Full);
}

#[test]
fn test_declaration_settings_drive_controller() {
    let tree = MirrorTree::new();
    let backend = FakeBackend::new();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mirror.toml");

    let mut declaration = Declaration::new(tree.source(), tree.target());
    declaration.points.insert(p("/a/")).unwrap();
    declaration.settings.cache_ttl_ms = 60_000;
    declaration.save(&path).unwrap();

    let controller =
        MirrorController::from_declaration(Declaration::load(&path).unwrap(), Box::new(backend.clone())).unwrap();
    controller.status();
    controller.status();

    assert_eq!(backend.table_reads(), 1);
    assert_eq!(declared(&controller), vec!["/a/"]);
}
