use serde_json::json;

use crate::utils::{is_subset, plural_str};

#[test]
fn test_is_subset_ignores_server_fields() {
    let desired = json!({"metadata": {"name": "orders"}, "spec": {"replicas": 2}});
    let current = json!({
        "metadata": {"name": "orders", "uid": "uid-1", "resourceVersion": "7"},
        "spec": {"replicas": 2, "progressDeadlineSeconds": 600}
    });
    assert!(is_subset(&desired, &current));
}

#[test]
fn test_is_subset_detects_changes() {
    let current = json!({"spec": {"replicas": 2, "ports": [{"port": 80}, {"port": 81}]}});
    assert!(!is_subset(&json!({"spec": {"replicas": 3}}), &current));
    assert!(!is_subset(&json!({"spec": {"ports": [{"port": 80}]}}), &current));
    assert!(!is_subset(&json!({"spec": {"paused": true}}), &current));
}

#[test]
fn test_is_subset_empty_matches_missing() {
    let current = json!({"spec": {"replicas": 2}});
    assert!(is_subset(&json!({"spec": {"tolerations": [], "nodeSelector": {}}}), &current));
    assert!(is_subset(&json!({"spec": {"tolerations": []}}), &json!({"spec": {"tolerations": null}})));
    assert!(!is_subset(&json!({"spec": {"tolerations": []}}), &json!({"spec": {"tolerations": [{"key": "a"}]}})));
}

#[test]
fn test_plural_str() {
    assert_eq!(plural_str(1, "schedules"), "schedule");
    assert_eq!(plural_str(0, "schedules"), "schedules");
    assert_eq!(plural_str(3, "schedules"), "schedules");
}
