// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Metrics Collection & Monitoring
 * Process and reconciliation counters with tracing integration
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary - Enterprise Edition
 */

use crate::errors::ResourceKind;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Metrics collector for external invocations and reconciliation outcomes
#[derive(Debug, Clone)]
pub struct MetricsCollector {
    enabled: bool,
    invocations_total: Arc<AtomicU64>,
    invocations_nonzero_exit: Arc<AtomicU64>,
    spawn_failures: Arc<AtomicU64>,
    invocations_cancelled: Arc<AtomicU64>,
    invocations_timed_out: Arc<AtomicU64>,
    resources_reused: Arc<AtomicU64>,
    resources_created: Arc<AtomicU64>,
    lookups_failed_open: Arc<AtomicU64>,
    http_errors: Arc<AtomicU64>,
}

impl MetricsCollector {
    /// Create a new metrics collector
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            invocations_total: Arc::new(AtomicU64::new(0)),
            invocations_nonzero_exit: Arc::new(AtomicU64::new(0)),
            spawn_failures: Arc::new(AtomicU64::new(0)),
            invocations_cancelled: Arc::new(AtomicU64::new(0)),
            invocations_timed_out: Arc::new(AtomicU64::new(0)),
            resources_reused: Arc::new(AtomicU64::new(0)),
            resources_created: Arc::new(AtomicU64::new(0)),
            lookups_failed_open: Arc::new(AtomicU64::new(0)),
            http_errors: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Record a finished external process
    pub fn record_invocation(&self, program: &str, exit_code: Option<i32>, success: bool, elapsed: Duration) {
        if !self.enabled {
            return;
        }

        self.invocations_total.fetch_add(1, Ordering::Relaxed);
        if !success {
            self.invocations_nonzero_exit.fetch_add(1, Ordering::Relaxed);
        }

        debug!(
            program = program,
            exit_code = ?exit_code,
            success = success,
            duration_ms = elapsed.as_millis(),
            "External process finished"
        );
    }

    /// Record a process that could not be started
    pub fn record_spawn_failure(&self, program: &str) {
        if !self.enabled {
            return;
        }

        self.invocations_total.fetch_add(1, Ordering::Relaxed);
        self.spawn_failures.fetch_add(1, Ordering::Relaxed);

        debug!(program = program, "External process failed to start");
    }

    /// Record a process killed because its request was cancelled
    pub fn record_cancelled(&self, program: &str) {
        if !self.enabled {
            return;
        }

        self.invocations_total.fetch_add(1, Ordering::Relaxed);
        self.invocations_cancelled.fetch_add(1, Ordering::Relaxed);

        info!(program = program, "External process cancelled");
    }

    /// Record a process killed at its deadline
    pub fn record_timeout(&self, program: &str, timeout: Duration) {
        if !self.enabled {
            return;
        }

        self.invocations_total.fetch_add(1, Ordering::Relaxed);
        self.invocations_timed_out.fetch_add(1, Ordering::Relaxed);

        warn!(
            program = program,
            timeout_secs = timeout.as_secs(),
            "External process exceeded its deadline"
        );
    }

    /// Record the outcome of one reconciliation
    pub fn record_reconciliation(&self, kind: ResourceKind, existed: bool) {
        if !self.enabled {
            return;
        }

        if existed {
            self.resources_reused.fetch_add(1, Ordering::Relaxed);
        } else {
            self.resources_created.fetch_add(1, Ordering::Relaxed);
        }

        debug!(kind = %kind, existed = existed, "Reconciliation completed");
    }

    /// Record a lookup failure that was tolerated by proceeding to creation
    pub fn record_lookup_failed_open(&self, kind: ResourceKind) {
        if !self.enabled {
            return;
        }

        self.lookups_failed_open.fetch_add(1, Ordering::Relaxed);

        debug!(kind = %kind, "Lookup failed open");
    }

    /// Record an error response returned to an HTTP caller
    pub fn record_http_error(&self, status_code: u16) {
        if !self.enabled {
            return;
        }

        self.http_errors.fetch_add(1, Ordering::Relaxed);

        debug!(status_code = status_code, "HTTP error response");
    }

    /// Get metrics summary
    pub fn get_metrics_summary(&self) -> MetricsSummary {
        MetricsSummary {
            invocations_total: self.invocations_total.load(Ordering::Relaxed),
            invocations_nonzero_exit: self.invocations_nonzero_exit.load(Ordering::Relaxed),
            spawn_failures: self.spawn_failures.load(Ordering::Relaxed),
            invocations_cancelled: self.invocations_cancelled.load(Ordering::Relaxed),
            invocations_timed_out: self.invocations_timed_out.load(Ordering::Relaxed),
            resources_reused: self.resources_reused.load(Ordering::Relaxed),
            resources_created: self.resources_created.load(Ordering::Relaxed),
            lookups_failed_open: self.lookups_failed_open.load(Ordering::Relaxed),
            http_errors: self.http_errors.load(Ordering::Relaxed),
        }
    }
}

/// Metrics summary for reporting
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct MetricsSummary {
    pub invocations_total: u64,
    pub invocations_nonzero_exit: u64,
    pub spawn_failures: u64,
    pub invocations_cancelled: u64,
    pub invocations_timed_out: u64,
    pub resources_reused: u64,
    pub resources_created: u64,
    pub lookups_failed_open: u64,
    pub http_errors: u64,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new(true)
    }
}
