// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Process invoker tests against real `sh` children.

#![cfg(unix)]

use scan_gateway::errors::GatewayError;
use scan_gateway::metrics::MetricsCollector;
use scan_gateway::process::{CommandRunner, Invocation, InvocationContext, ProcessInvoker};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

fn sh() -> ProcessInvoker {
    ProcessInvoker::new(Invocation::direct("sh"))
}

fn script(body: &str) -> Vec<String> {
    vec!["-c".to_string(), body.to_string()]
}

#[tokio::test]
async fn test_stdout_and_stderr_are_combined() {
    let output = sh()
        .run(&script("echo to-stdout; echo to-stderr 1>&2"), &InvocationContext::new())
        .await
        .unwrap();

    assert!(output.success);
    assert_eq!(output.exit_code, Some(0));
    assert!(output.output.contains("to-stdout"));
    assert!(output.output.contains("to-stderr"));
}

#[tokio::test]
async fn test_nonzero_exit_keeps_output() {
    let output = sh()
        .run(&script("echo partial results; exit 3"), &InvocationContext::new())
        .await
        .unwrap();

    assert!(!output.success);
    assert_eq!(output.exit_code, Some(3));
    assert_eq!(output.output, "partial results\n");

    let err = output.check().unwrap_err();
    match &err {
        GatewayError::ProcessFailure { exit_code, .. } => assert_eq!(*exit_code, Some(3)),
        other => panic!("expected ProcessFailure, got {:?}", other),
    }
    assert_eq!(err.captured_output(), Some("partial results\n"));
}

#[tokio::test]
async fn test_missing_program_is_process_failure() {
    let metrics = MetricsCollector::new(true);
    let invoker = ProcessInvoker::new(Invocation::direct("/nonexistent/scan-gateway-tool")).with_metrics(metrics.clone());

    let err = invoker.run(&[], &InvocationContext::new()).await.unwrap_err();

    assert!(matches!(err, GatewayError::ProcessFailure { exit_code: None, .. }));
    assert_eq!(metrics.get_metrics_summary().spawn_failures, 1);
}

#[tokio::test]
async fn test_cancellation_terminates_the_child() {
    let token = CancellationToken::new();
    let ctx = InvocationContext::with_cancellation(token.clone());
    let metrics = MetricsCollector::new(true);
    let invoker = sh().with_metrics(metrics.clone());

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        token.cancel();
    });

    let started = Instant::now();
    let err = invoker.run(&script("exec sleep 30"), &ctx).await.unwrap_err();

    assert!(matches!(err, GatewayError::Cancelled { .. }));
    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(metrics.get_metrics_summary().invocations_cancelled, 1);
}

#[tokio::test]
async fn test_deadline_terminates_the_child() {
    let ctx = InvocationContext::with_timeout(Duration::from_millis(200));
    let metrics = MetricsCollector::new(true);
    let invoker = sh().with_metrics(metrics.clone());

    let started = Instant::now();
    let err = invoker.run(&script("exec sleep 30"), &ctx).await.unwrap_err();

    match err {
        GatewayError::DeadlineExceeded { timeout, .. } => assert_eq!(timeout, Duration::from_millis(200)),
        other => panic!("expected DeadlineExceeded, got {:?}", other),
    }
    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(metrics.get_metrics_summary().invocations_timed_out, 1);
}

#[tokio::test]
async fn test_already_cancelled_context_spawns_nothing() {
    let ctx = InvocationContext::new();
    ctx.cancel();

    let metrics = MetricsCollector::new(true);
    let err = sh()
        .with_metrics(metrics.clone())
        .run(&script("echo never"), &ctx)
        .await
        .unwrap_err();

    assert!(matches!(err, GatewayError::Cancelled { .. }));
    assert_eq!(metrics.get_metrics_summary().invocations_total, 0);
}

#[tokio::test]
async fn test_container_exec_wraps_the_program() {
    // echo stands in for the container runtime and prints what it was given
    let invoker = ProcessInvoker::new(Invocation::container_exec("echo", "gvm", "openvas", "gvm-cli"));
    let args = vec!["--xml".to_string(), "<get_version/>".to_string()];

    let output = invoker.run(&args, &InvocationContext::new()).await.unwrap();

    assert_eq!(output.output.trim(), "exec -u gvm openvas gvm-cli --xml <get_version/>");
    assert_eq!(invoker.label(), "gvm-cli (via echo exec)");
}
