// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

use super::options::ScanRequest;
use super::presets::PresetRequest;
use crate::config::ScannerConfig;
use crate::errors::GatewayResult;
use crate::metrics::MetricsCollector;
use crate::process::{CommandRunner, Invocation, InvocationContext, ProcessInvoker};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Outcome of one scanner run. A non-zero exit is reported in `error`
/// next to whatever the scanner printed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResult {
    pub target: String,
    pub raw_output: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Scanner path: compile options, run nmap, return raw text
#[derive(Clone)]
pub struct NmapScanner {
    runner: Arc<dyn CommandRunner>,
    scan_timeout: Duration,
}

impl NmapScanner {
    pub fn new(runner: Arc<dyn CommandRunner>, scan_timeout: Duration) -> Self {
        Self {
            runner,
            scan_timeout,
        }
    }

    pub fn from_config(config: &ScannerConfig, metrics: MetricsCollector) -> Self {
        let invoker = ProcessInvoker::new(Invocation::direct(config.nmap_path.clone())).with_metrics(metrics);
        Self::new(Arc::new(invoker), config.scan_timeout())
    }

    /// Run one scan. Validation errors return before anything is spawned.
    pub async fn scan(&self, request: &ScanRequest, ctx: &InvocationContext) -> GatewayResult<ScanResult> {
        let args = request.compile()?;
        let target = args.last().cloned().unwrap_or_default();

        info!(target = %target, arg_count = args.len(), "Starting nmap scan");

        let ctx = ctx.child_with_timeout(self.scan_timeout);
        let output = self.runner.run(&args, &ctx).await?;

        let error = output.exit_error().map(|e| e.to_string());
        if output.success {
            info!(
                target = %target,
                duration_ms = output.elapsed.as_millis(),
                "nmap scan completed"
            );
        } else {
            warn!(target = %target, exit_code = ?output.exit_code, "nmap exited unsuccessfully");
        }

        Ok(ScanResult {
            target,
            raw_output: output.output,
            error,
        })
    }

    pub async fn scan_preset(&self, request: PresetRequest, ctx: &InvocationContext) -> GatewayResult<ScanResult> {
        let request = request.into_scan_request();
        self.scan(&request, ctx).await
    }

    /// Run `nmap --version` and return its first line
    pub async fn probe_version(&self, ctx: &InvocationContext) -> GatewayResult<String> {
        let output = self.runner.run(&["--version".to_string()], ctx).await?;
        let text = output.check()?;
        Ok(text.lines().next().unwrap_or_default().trim().to_string())
    }
}
