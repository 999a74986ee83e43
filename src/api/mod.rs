// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Gateway HTTP API
 * JSON endpoints for nmap scans and OpenVAS/GVM engine operations
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary - Enterprise Edition
 */

pub mod error;
pub mod handlers;

pub use error::ApiError;

use crate::config::AppConfig;
use crate::gvm::GvmService;
use crate::health::{create_health_router, HealthChecker};
use crate::metrics::MetricsCollector;
use crate::nmap::NmapScanner;
use crate::process::InvocationContext;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::error;

/// Shared state for request handlers
pub struct AppState {
    pub scanner: NmapScanner,
    pub gvm: Arc<GvmService>,
    pub metrics: MetricsCollector,
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(
        scanner: NmapScanner,
        gvm: Arc<GvmService>,
        metrics: MetricsCollector,
        request_timeout: Duration,
    ) -> Self {
        Self {
            scanner,
            gvm,
            metrics,
            request_timeout,
        }
    }

    /// Production wiring: nmap invoked directly, gvm-cli through the container runtime
    pub fn from_config(config: &AppConfig, metrics: MetricsCollector) -> Self {
        Self::new(
            NmapScanner::from_config(&config.scanner, metrics.clone()),
            Arc::new(GvmService::from_config(&config.engine, metrics.clone())),
            metrics,
            config.server.request_timeout(),
        )
    }

    /// Fresh context for one request
    pub fn context(&self) -> InvocationContext {
        InvocationContext::with_timeout(self.request_timeout)
    }

    /// Log and count a failed request, then hand back the response error
    pub fn fail(&self, operation: &'static str, err: impl Into<ApiError>) -> ApiError {
        let err = err.into();
        let status = err.status();

        error!(
            operation,
            status = status.as_u16(),
            error = %err.message(),
            "Request failed"
        );
        self.metrics.record_http_error(status.as_u16());

        err
    }
}

/// Create the gateway router, health endpoints included
pub fn create_router(state: Arc<AppState>, health: Arc<HealthChecker>) -> Router {
    Router::new()
        .route("/scan-open-ports", post(handlers::scan_open_ports))
        .route("/scan-preset", post(handlers::scan_preset))
        .route("/openvas/version", get(handlers::engine_version))
        .route("/openvas/configs", get(handlers::list_configs))
        .route(
            "/openvas/targets",
            get(handlers::list_targets).post(handlers::create_target),
        )
        .route(
            "/openvas/tasks",
            get(handlers::list_tasks).post(handlers::create_task),
        )
        .route("/openvas/tasks/start", post(handlers::start_task))
        .route("/openvas/tasks/status", post(handlers::task_status))
        .route(
            "/openvas/tasks/:task_id/status",
            get(handlers::task_status_by_path),
        )
        .route("/openvas/reports", post(handlers::get_report))
        .route(
            "/openvas/reports/:report_id",
            get(handlers::get_report_by_path),
        )
        .route("/metrics", get(handlers::metrics))
        .with_state(state)
        .merge(create_health_router(health))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::GatewayError;
    use crate::gvm::{EngineCredentials, GmpClient};
    use crate::process::{ScriptedReply, ScriptedRunner};

    fn state(engine: Arc<ScriptedRunner>, command_timeout: Duration, request_timeout: Duration) -> AppState {
        let metrics = MetricsCollector::new(true);
        let credentials = EngineCredentials::new("admin", Some("secret".to_string()), "127.0.0.1", "9390");
        let client = GmpClient::new(engine, credentials, command_timeout);
        AppState::new(
            NmapScanner::new(Arc::new(ScriptedRunner::new("nmap")), Duration::from_secs(60)),
            Arc::new(GvmService::new(client, metrics.clone(), true)),
            metrics,
            request_timeout,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_engine_command_timeout_bounds_request_context() {
        let engine = Arc::new(ScriptedRunner::new("gvm-cli").with_fallback(ScriptedReply::Hang));
        let state = state(engine, Duration::from_secs(1), Duration::from_secs(3));

        let err = state.gvm.version(&state.context()).await.unwrap_err();

        match err {
            GatewayError::DeadlineExceeded { timeout, .. } => assert_eq!(timeout, Duration::from_secs(1)),
            other => panic!("expected DeadlineExceeded, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_timeout_wins_when_shorter() {
        let engine = Arc::new(ScriptedRunner::new("gvm-cli").with_fallback(ScriptedReply::Hang));
        let state = state(engine, Duration::from_secs(30), Duration::from_secs(2));

        let err = state.gvm.version(&state.context()).await.unwrap_err();

        match err {
            GatewayError::DeadlineExceeded { timeout, .. } => assert_eq!(timeout, Duration::from_secs(2)),
            other => panic!("expected DeadlineExceeded, got {:?}", other),
        }
    }
}
