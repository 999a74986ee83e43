// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Reconciliation Tests
 * Target/task reuse, fail-open lookups and creation failures
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use scan_gateway::errors::{GatewayError, ResourceKind};
use scan_gateway::gvm::{EngineCredentials, GmpClient, GvmService};
use scan_gateway::metrics::MetricsCollector;
use scan_gateway::process::{InvocationContext, ScriptedReply, ScriptedRunner};
use std::sync::Arc;
use std::time::Duration;

const EMPTY_TARGETS: &str = r#"<get_targets_response status="200" status_text="OK"></get_targets_response>"#;

const WEB_TARGET: &str = r#"<get_targets_response status="200" status_text="OK">
  <target id="b493b7a8-7489-11df-a3ec-002264764cea">
    <name>web</name>
    <hosts>10.0.0.5</hosts>
  </target>
</get_targets_response>"#;

const TARGET_CREATED: &str = r#"<create_target_response status="201" status_text="OK, resource created" id="b493b7a8-7489-11df-a3ec-002264764cea"/>"#;

const TASKS: &str = r#"<get_tasks_response status="200" status_text="OK">
  <task id="task-1">
    <name>weekly</name>
    <config id="cfg-1"/>
    <target id="tgt-1"/>
    <status>Done</status>
  </task>
</get_tasks_response>"#;

fn service(runner: Arc<ScriptedRunner>, metrics: MetricsCollector) -> GvmService {
    let credentials = EngineCredentials::new("admin", Some("secret".to_string()), "127.0.0.1", "9390");
    let client = GmpClient::new(runner, credentials, Duration::from_secs(30));
    GvmService::new(client, metrics, true)
}

#[tokio::test]
async fn test_second_creation_reuses_the_first() {
    let runner = Arc::new(
        ScriptedRunner::new("gvm-cli")
            .with_reply("<get_targets/>", ScriptedReply::ok(EMPTY_TARGETS))
            .with_reply("<get_targets/>", ScriptedReply::ok(WEB_TARGET))
            .with_reply("<create_target>", ScriptedReply::ok(TARGET_CREATED)),
    );
    let metrics = MetricsCollector::new(true);
    let service = service(runner.clone(), metrics.clone());
    let ctx = InvocationContext::new();

    let first = service.create_target("web", "10.0.0.5", None, &ctx).await.unwrap();
    let second = service.create_target("web", "10.0.0.5", None, &ctx).await.unwrap();

    assert_eq!(first.id, second.id);
    assert!(!first.existed);
    assert!(second.existed);
    assert_eq!(runner.calls_matching("<create_target>"), 1);

    let summary = metrics.get_metrics_summary();
    assert_eq!(summary.resources_created, 1);
    assert_eq!(summary.resources_reused, 1);
}

#[tokio::test]
async fn test_existing_target_issues_no_creation() {
    let runner = Arc::new(ScriptedRunner::new("gvm-cli").with_reply("<get_targets/>", ScriptedReply::ok(WEB_TARGET)));
    let service = service(runner.clone(), MetricsCollector::new(true));

    let reconciled = service
        .create_target("  web ", "10.0.0.5", Some("1-1000"), &InvocationContext::new())
        .await
        .unwrap();

    assert!(reconciled.existed);
    assert_eq!(reconciled.id, "b493b7a8-7489-11df-a3ec-002264764cea");
    assert_eq!(runner.call_count(), 1);
}

#[tokio::test]
async fn test_target_hosts_match_by_containment() {
    let listed = r#"<get_targets_response status="200">
  <target id="t-9"><name>web</name><hosts>10.0.0.4, 10.0.0.5, 10.0.0.6</hosts></target>
</get_targets_response>"#;
    let runner = Arc::new(ScriptedRunner::new("gvm-cli").with_reply("<get_targets/>", ScriptedReply::ok(listed)));
    let service = service(runner.clone(), MetricsCollector::new(true));

    let reconciled = service
        .create_target("web", "10.0.0.5", None, &InvocationContext::new())
        .await
        .unwrap();

    assert_eq!(reconciled.id, "t-9");
    assert!(reconciled.existed);
}

#[tokio::test]
async fn test_failed_lookup_falls_through_to_creation() {
    let runner = Arc::new(
        ScriptedRunner::new("gvm-cli")
            .with_reply("<get_targets/>", ScriptedReply::exit("Failed to connect to gvmd", 1))
            .with_reply("<create_target>", ScriptedReply::ok(TARGET_CREATED)),
    );
    let metrics = MetricsCollector::new(true);
    let service = service(runner.clone(), metrics.clone());

    let reconciled = service
        .create_target("web", "10.0.0.5", None, &InvocationContext::new())
        .await
        .unwrap();

    assert!(!reconciled.existed);
    assert_eq!(runner.calls_matching("<create_target>"), 1);
    assert_eq!(metrics.get_metrics_summary().lookups_failed_open, 1);
}

#[tokio::test]
async fn test_unparseable_lookup_falls_through_to_creation() {
    let runner = Arc::new(
        ScriptedRunner::new("gvm-cli")
            .with_reply("<get_targets/>", ScriptedReply::ok("<get_targets_response><target"))
            .with_reply("<create_target>", ScriptedReply::ok(TARGET_CREATED)),
    );
    let service = service(runner, MetricsCollector::new(true));

    let reconciled = service
        .create_target("web", "10.0.0.5", None, &InvocationContext::new())
        .await
        .unwrap();

    assert!(!reconciled.existed);
}

#[tokio::test]
async fn test_ack_without_id_is_reconciliation_failure() {
    let rejected = r#"<create_target_response status="400" status_text="Target exists already"/>"#;
    let runner = Arc::new(
        ScriptedRunner::new("gvm-cli")
            .with_reply("<get_targets/>", ScriptedReply::ok(EMPTY_TARGETS))
            .with_reply("<create_target>", ScriptedReply::ok(rejected)),
    );
    let service = service(runner, MetricsCollector::new(true));

    let err = service
        .create_target("web", "10.0.0.5", None, &InvocationContext::new())
        .await
        .unwrap_err();

    match err {
        GatewayError::ReconciliationFailed { kind, reason, raw } => {
            assert_eq!(kind, ResourceKind::Target);
            assert!(reason.contains("Target exists already"));
            assert_eq!(raw, rejected);
        }
        other => panic!("expected ReconciliationFailed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_creation_process_failure_carries_output() {
    let runner = Arc::new(
        ScriptedRunner::new("gvm-cli")
            .with_reply("<get_targets/>", ScriptedReply::ok(EMPTY_TARGETS))
            .with_reply("<create_target>", ScriptedReply::exit("Error: No such container: openvas", 125)),
    );
    let service = service(runner, MetricsCollector::new(true));

    let err = service
        .create_target("web", "10.0.0.5", None, &InvocationContext::new())
        .await
        .unwrap_err();

    assert!(matches!(err, GatewayError::ReconciliationFailed { .. }));
    assert_eq!(err.captured_output(), Some("Error: No such container: openvas"));
}

#[tokio::test]
async fn test_task_matching_is_exact() {
    let created = r#"<create_task_response status="201" status_text="OK, resource created" id="task-2"/>"#;
    let runner = Arc::new(
        ScriptedRunner::new("gvm-cli")
            .with_reply("<get_tasks/>", ScriptedReply::ok(TASKS))
            .with_reply("<create_task>", ScriptedReply::ok(created)),
    );
    let service = service(runner.clone(), MetricsCollector::new(true));
    let ctx = InvocationContext::new();

    let reused = service.create_task("weekly", "cfg-1", " tgt-1 ", &ctx).await.unwrap();
    assert_eq!(reused.id, "task-1");
    assert!(reused.existed);

    // Same name against another target is a different task
    let created = service.create_task("weekly", "cfg-1", "tgt-2", &ctx).await.unwrap();
    assert_eq!(created.id, "task-2");
    assert!(!created.existed);
    assert_eq!(runner.calls_matching("<create_task>"), 1);
}

#[tokio::test]
async fn test_concurrent_identical_requests_create_once() {
    let runner = Arc::new(
        ScriptedRunner::new("gvm-cli")
            .with_reply("<get_targets/>", ScriptedReply::ok(EMPTY_TARGETS))
            .with_reply("<get_targets/>", ScriptedReply::ok(WEB_TARGET))
            .with_reply("<create_target>", ScriptedReply::ok(TARGET_CREATED)),
    );
    let service = Arc::new(service(runner.clone(), MetricsCollector::new(true)));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let service = service.clone();
            tokio::spawn(async move {
                service
                    .create_target("web", "10.0.0.5", None, &InvocationContext::new())
                    .await
            })
        })
        .collect();

    let mut created = 0;
    for handle in handles {
        let reconciled = handle.await.unwrap().unwrap();
        assert_eq!(reconciled.id, "b493b7a8-7489-11df-a3ec-002264764cea");
        if !reconciled.existed {
            created += 1;
        }
    }

    assert_eq!(created, 1);
    assert_eq!(runner.calls_matching("<create_target>"), 1);
}

#[tokio::test]
async fn test_missing_password_fails_before_lookup() {
    let runner = Arc::new(ScriptedRunner::new("gvm-cli"));
    let credentials = EngineCredentials::new("admin", None, "127.0.0.1", "9390");
    let client = GmpClient::new(runner.clone(), credentials, Duration::from_secs(30));
    let service = GvmService::new(client, MetricsCollector::new(true), true);

    let err = service
        .create_target("web", "10.0.0.5", None, &InvocationContext::new())
        .await
        .unwrap_err();

    assert!(matches!(err, GatewayError::ConfigurationMissing("GVM_PASSWORD")));
    assert_eq!(runner.call_count(), 0);
}
