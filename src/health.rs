// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Health Check & Monitoring
 * Health endpoints reporting scanner and engine availability
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary - Enterprise Edition
 */

use crate::nmap::NmapScanner;
use crate::process::InvocationContext;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Upper bound for one `nmap --version` probe
const SCANNER_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Health status levels
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "UPPERCASE")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Component health information
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentHealth {
    pub name: String,
    pub status: HealthStatus,
    pub message: Option<String>,
    pub last_check: String,
    pub response_time_ms: Option<u64>,
}

/// Overall health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheckResponse {
    pub status: HealthStatus,
    pub timestamp: String,
    pub uptime_seconds: u64,
    pub version: String,
    pub components: Vec<ComponentHealth>,
}

/// Readiness check response (for Kubernetes)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadinessCheckResponse {
    pub ready: bool,
    pub timestamp: String,
    pub checks: Vec<ComponentHealth>,
}

/// Liveness check response (for Kubernetes)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LivenessCheckResponse {
    pub alive: bool,
    pub timestamp: String,
}

/// Health checker state
#[derive(Clone)]
pub struct HealthChecker {
    start_time: Instant,
    version: String,
    component_checks: Arc<RwLock<Vec<ComponentHealth>>>,
}

impl HealthChecker {
    /// Create a new health checker
    pub fn new(version: String) -> Self {
        Self {
            start_time: Instant::now(),
            version,
            component_checks: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Store a component result, replacing any earlier one with the same name
    pub async fn record(&self, health: ComponentHealth) {
        debug!(
            component = %health.name,
            status = ?health.status,
            "Component health updated"
        );

        let mut checks = self.component_checks.write().await;
        if let Some(existing) = checks.iter_mut().find(|c| c.name == health.name) {
            *existing = health;
        } else {
            checks.push(health);
        }
    }

    /// Engine health is a configuration question: without a password every
    /// engine call fails, while scans keep working
    pub fn check_engine_health(&self, configured: bool) -> ComponentHealth {
        let (status, message) = if configured {
            (HealthStatus::Healthy, None)
        } else {
            (
                HealthStatus::Degraded,
                Some("GVM_PASSWORD is not set; engine endpoints are unavailable".to_string()),
            )
        };

        ComponentHealth {
            name: "engine".to_string(),
            status,
            message,
            last_check: chrono::Utc::now().to_rfc3339(),
            response_time_ms: None,
        }
    }

    /// Check that the scanner binary runs
    pub async fn check_scanner_health(&self, scanner: &NmapScanner) -> ComponentHealth {
        let start = Instant::now();
        let ctx = InvocationContext::with_timeout(SCANNER_PROBE_TIMEOUT);

        let (status, message, response_time_ms) = match scanner.probe_version(&ctx).await {
            Ok(version) => (
                HealthStatus::Healthy,
                Some(version),
                Some(start.elapsed().as_millis() as u64),
            ),
            Err(e) => (HealthStatus::Degraded, Some(format!("nmap unavailable: {}", e)), None),
        };

        ComponentHealth {
            name: "scanner".to_string(),
            status,
            message,
            last_check: chrono::Utc::now().to_rfc3339(),
            response_time_ms,
        }
    }

    /// Run every component check once and store the results
    pub async fn refresh(&self, scanner: &NmapScanner, engine_configured: bool) {
        let scanner_health = self.check_scanner_health(scanner).await;
        self.record(scanner_health).await;
        self.record(self.check_engine_health(engine_configured)).await;
    }

    /// Get overall health status
    pub async fn get_health(&self) -> HealthCheckResponse {
        let components = self.component_checks.read().await.clone();

        let overall_status = if components.iter().any(|c| c.status == HealthStatus::Unhealthy) {
            HealthStatus::Unhealthy
        } else if components.iter().any(|c| c.status == HealthStatus::Degraded) {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        };

        HealthCheckResponse {
            status: overall_status,
            timestamp: chrono::Utc::now().to_rfc3339(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
            version: self.version.clone(),
            components,
        }
    }

    /// Check if service is ready (for Kubernetes readiness probe)
    pub async fn is_ready(&self) -> ReadinessCheckResponse {
        let checks = self.component_checks.read().await.clone();

        let ready = checks
            .iter()
            .all(|c| c.status == HealthStatus::Healthy || c.status == HealthStatus::Degraded);

        ReadinessCheckResponse {
            ready,
            timestamp: chrono::Utc::now().to_rfc3339(),
            checks,
        }
    }

    /// Check if service is alive (for Kubernetes liveness probe)
    pub async fn is_alive(&self) -> LivenessCheckResponse {
        LivenessCheckResponse {
            alive: true,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Start periodic health checks
    pub fn start_periodic_checks(
        self: Arc<Self>,
        interval: Duration,
        scanner: NmapScanner,
        engine_configured: bool,
    ) -> tokio::task::JoinHandle<()> {
        info!(
            interval_secs = interval.as_secs(),
            "Starting periodic health checks"
        );

        tokio::spawn(async move {
            let mut interval_timer = tokio::time::interval(interval);
            interval_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                interval_timer.tick().await;
                self.refresh(&scanner, engine_configured).await;
            }
        })
    }
}

/// Health check handler
async fn health_handler(State(checker): State<Arc<HealthChecker>>) -> impl IntoResponse {
    let health = checker.get_health().await;
    let status_code = match health.status {
        HealthStatus::Healthy => StatusCode::OK,
        HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status_code, Json(health))
}

/// Readiness check handler
async fn readiness_handler(State(checker): State<Arc<HealthChecker>>) -> impl IntoResponse {
    let readiness = checker.is_ready().await;
    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status_code, Json(readiness))
}

/// Liveness check handler
async fn liveness_handler(State(checker): State<Arc<HealthChecker>>) -> impl IntoResponse {
    let liveness = checker.is_alive().await;
    (StatusCode::OK, Json(liveness))
}

/// Create health check router
pub fn create_health_router(checker: Arc<HealthChecker>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/health/ready", get(readiness_handler))
        .route("/health/live", get(liveness_handler))
        .with_state(checker)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::{ScriptedReply, ScriptedRunner};

    #[tokio::test]
    async fn test_health_checker_creation() {
        let checker = HealthChecker::new("1.0.0".to_string());
        let health = checker.get_health().await;
        assert_eq!(health.status, HealthStatus::Healthy);
        assert_eq!(health.version, "1.0.0");
        assert!(health.components.is_empty());
    }

    #[tokio::test]
    async fn test_missing_password_degrades_engine() {
        let checker = HealthChecker::new("1.0.0".to_string());
        checker.record(checker.check_engine_health(false)).await;

        let health = checker.get_health().await;
        assert_eq!(health.status, HealthStatus::Degraded);
        assert_eq!(health.components[0].name, "engine");

        // Degraded still counts as ready
        assert!(checker.is_ready().await.ready);
    }

    #[tokio::test]
    async fn test_refresh_probes_scanner() {
        let runner = Arc::new(
            ScriptedRunner::new("nmap").with_reply("--version", ScriptedReply::ok("Nmap version 7.94\n")),
        );
        let scanner = NmapScanner::new(runner, Duration::from_secs(30));
        let checker = HealthChecker::new("1.0.0".to_string());

        checker.refresh(&scanner, true).await;

        let health = checker.get_health().await;
        assert_eq!(health.status, HealthStatus::Healthy);
        let scanner_health = health.components.iter().find(|c| c.name == "scanner").unwrap();
        assert_eq!(scanner_health.message.as_deref(), Some("Nmap version 7.94"));
    }

    #[tokio::test]
    async fn test_missing_scanner_is_degraded() {
        let runner = Arc::new(ScriptedRunner::new("nmap").with_fallback(ScriptedReply::spawn_failure("not found")));
        let scanner = NmapScanner::new(runner, Duration::from_secs(30));
        let checker = HealthChecker::new("1.0.0".to_string());

        let health = checker.check_scanner_health(&scanner).await;
        assert_eq!(health.status, HealthStatus::Degraded);
        assert!(health.message.unwrap().contains("nmap unavailable"));
    }

    #[tokio::test]
    async fn test_overall_health_status() {
        let checker = HealthChecker::new("1.0.0".to_string());

        let component = |name: &str, status, message: Option<&str>| ComponentHealth {
            name: name.to_string(),
            status,
            message: message.map(str::to_string),
            last_check: chrono::Utc::now().to_rfc3339(),
            response_time_ms: None,
        };
        checker.record(component("component1", HealthStatus::Healthy, None)).await;
        checker
            .record(component("component2", HealthStatus::Unhealthy, Some("Error")))
            .await;

        let health = checker.get_health().await;
        assert_eq!(health.status, HealthStatus::Unhealthy);
        assert!(!checker.is_ready().await.ready);
    }

    #[tokio::test]
    async fn test_liveness_check() {
        let checker = HealthChecker::new("1.0.0".to_string());
        let liveness = checker.is_alive().await;
        assert!(liveness.alive);
    }
}
