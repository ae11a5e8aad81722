//! Tests for constants module.
//!
//! Label keys and in-container paths are a contract with resources created
//! by earlier pushes; these tests pin their values.

use devsync::constants::*;
use devsync::{PushConfig, SupervisorConfig};

// =============================================================================
// Label Contract
// =============================================================================

#[test]
fn test_label_keys_are_stable() {
    assert_eq!(LABEL_COMPONENT, "component");
    assert_eq!(LABEL_ALIAS, "alias");
    assert_eq!(LABEL_TYPE, "type");
    assert_eq!(LABEL_STORAGE_NAME, "storage-name");
    assert_eq!(PROJECTS_VOLUME_TYPE, "projects");
    assert_eq!(SUPERVISORD_VOLUME_TYPE, "supervisord");
}

#[test]
fn test_label_keys_distinct() {
    let keys = [LABEL_COMPONENT, LABEL_ALIAS, LABEL_TYPE, LABEL_STORAGE_NAME];
    for (i, a) in keys.iter().enumerate() {
        for b in &keys[i + 1..] {
            assert_ne!(a, b);
        }
    }
}

// =============================================================================
// Paths
// =============================================================================

#[test]
fn test_supervisor_paths_live_under_mount() {
    assert!(SUPERVISORD_BINARY_PATH.starts_with(SUPERVISORD_MOUNT_PATH));
    assert!(SUPERVISORD_CONF_FILE.starts_with(SUPERVISORD_MOUNT_PATH));
}

#[test]
fn test_project_mount_is_absolute() {
    assert!(PROJECT_SOURCE_MOUNT_PATH.starts_with('/'));
    assert!(SHELL_PATH.starts_with('/'));
}

#[test]
fn test_defaults_follow_constants() {
    let config = PushConfig::default();
    assert_eq!(config.host_ip, LOCALHOST_IP);
    assert_eq!(config.call_timeout(), DEFAULT_CALL_TIMEOUT);
    assert_eq!(config.exec_timeout(), DEFAULT_EXEC_TIMEOUT);
    assert_eq!(config.supervisor, SupervisorConfig::default());
    assert_eq!(config.supervisor.binary_path, SUPERVISORD_BINARY_PATH);
}

// =============================================================================
// Limits
// =============================================================================

#[test]
fn test_volume_suffix_fits_uuid() {
    assert!(VOLUME_SUFFIX_LEN > 0);
    assert!(VOLUME_SUFFIX_LEN <= 32, "suffix is cut from a simple uuid");
}

#[test]
fn test_exec_deadline_not_shorter_than_call() {
    assert!(DEFAULT_EXEC_TIMEOUT >= DEFAULT_CALL_TIMEOUT);
}
