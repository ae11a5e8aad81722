//! Tests for volume resolution.
//!
//! Validates get-or-create idempotence, conflict detection and
//! push-wide resolution of declared storage.

mod common;

use common::{context, labels, Call, FakeRuntime, COMPONENT};
use devsync::volume::{self, VolumeLookup, VolumeRole};
use devsync::{ComponentSpec, Error, VolumeMount};

// =============================================================================
// Single Role
// =============================================================================

#[tokio::test]
async fn test_resolve_creates_once() {
    let runtime = FakeRuntime::new();
    let ctx = context(&runtime);

    let first = volume::resolve(&ctx, &VolumeRole::ProjectSource).await.unwrap();
    let second = volume::resolve(&ctx, &VolumeRole::ProjectSource).await.unwrap();

    assert!(first.created);
    assert!(!second.created);
    assert_eq!(first.name, second.name);
    assert_eq!(
        runtime.count(|c| matches!(c, Call::CreateVolume(_))),
        1,
        "exactly one create across repeated calls"
    );
    assert!(first.name.starts_with("odo-project-source-frontend-"));
}

#[tokio::test]
async fn test_resolve_reuses_existing_volume() {
    let runtime = FakeRuntime::new();
    runtime.seed_volume(
        "odo-project-source-frontend-zzzz",
        labels(&[("component", COMPONENT), ("type", "projects")]),
    );
    let ctx = context(&runtime);

    let handle = volume::resolve(&ctx, &VolumeRole::ProjectSource).await.unwrap();

    assert_eq!(handle.name, "odo-project-source-frontend-zzzz");
    assert!(runtime.mutations().is_empty());
}

#[tokio::test]
async fn test_resolve_conflict_is_fatal() {
    let runtime = FakeRuntime::new();
    let project = labels(&[("component", COMPONENT), ("type", "projects")]);
    runtime.seed_volume("src-a", project.clone());
    runtime.seed_volume("src-b", project);
    let ctx = context(&runtime);

    let err = volume::resolve(&ctx, &VolumeRole::ProjectSource)
        .await
        .unwrap_err();

    match &err {
        Error::VolumeConflict { component, count, .. } => {
            assert_eq!(component, COMPONENT);
            assert_eq!(*count, 2);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.is_fatal_conflict());
    assert!(runtime.mutations().is_empty(), "no mutation after a conflict");
    assert_eq!(runtime.volumes().len(), 2);
}

#[tokio::test]
async fn test_other_components_volumes_ignored() {
    let runtime = FakeRuntime::new();
    runtime.seed_volume(
        "odo-project-source-backend-aaaa",
        labels(&[("component", "backend"), ("type", "projects")]),
    );
    let ctx = context(&runtime);

    let lookup = volume::lookup(&ctx, &VolumeRole::ProjectSource).await.unwrap();
    assert_eq!(lookup, VolumeLookup::Missing);
}

#[tokio::test]
async fn test_list_failure_is_wrapped() {
    let runtime = FakeRuntime::new();
    runtime.fail_on("list_volumes_by_label");
    let ctx = context(&runtime);

    let err = volume::resolve(&ctx, &VolumeRole::ProjectSource)
        .await
        .unwrap_err();

    match err {
        Error::Runtime {
            operation,
            component,
            ..
        } => {
            assert_eq!(operation, "list_volumes_by_label");
            assert_eq!(component, COMPONENT);
        }
        other => panic!("unexpected error: {other}"),
    }
}

// =============================================================================
// Push-wide Resolution
// =============================================================================

fn with_mount(alias: &str, volume: &str, path: &str) -> ComponentSpec {
    let mut comp = ComponentSpec::new(alias, "busybox");
    comp.volume_mounts.push(VolumeMount {
        name: volume.to_string(),
        container_path: path.to_string(),
    });
    comp
}

#[tokio::test]
async fn test_resolve_all_shares_declared_volumes() {
    let runtime = FakeRuntime::new();
    let ctx = context(&runtime);
    let components = vec![
        with_mount("runtime", "cache", "/cache"),
        with_mount("worker", "cache", "/var/cache"),
    ];

    let resolved = volume::resolve_all(&ctx, &components, true).await.unwrap();

    assert!(resolved.supervisor.is_some());
    assert_eq!(resolved.storage.len(), 1);
    assert!(resolved.storage_volume("cache").unwrap().starts_with("cache-frontend-"));
    // project source + supervisor + one shared storage volume
    assert_eq!(runtime.count(|c| matches!(c, Call::CreateVolume(_))), 3);
}

#[tokio::test]
async fn test_resolve_all_without_run_skips_supervisor() {
    let runtime = FakeRuntime::new();
    let ctx = context(&runtime);

    let resolved = volume::resolve_all(&ctx, &[ComponentSpec::new("runtime", "node:18")], false)
        .await
        .unwrap();

    assert!(resolved.supervisor.is_none());
    assert_eq!(runtime.count(|c| matches!(c, Call::CreateVolume(_))), 1);
}

#[tokio::test]
async fn test_resolve_all_propagates_storage_conflict() {
    let runtime = FakeRuntime::new();
    let storage = labels(&[("component", COMPONENT), ("storage-name", "cache")]);
    runtime.seed_volume("cache-1", storage.clone());
    runtime.seed_volume("cache-2", storage);
    let ctx = context(&runtime);

    let err = volume::resolve_all(&ctx, &[with_mount("runtime", "cache", "/cache")], false)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::VolumeConflict { .. }));
}
