// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

use super::error::ApiError;
use super::AppState;
use crate::gvm::{Reconciled, ScanConfig, TargetRecord, TaskRecord};
use crate::metrics::MetricsSummary;
use crate::nmap::{PresetRequest, ScanRequest, ScanResult};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    response::Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Request to reuse or create a scan target
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateTargetBody {
    pub name: String,
    pub hosts: String,
    pub port_range: Option<String>,
}

/// Request to reuse or create a scan task
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateTaskBody {
    pub name: String,
    pub config_id: String,
    pub target_id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TaskIdBody {
    pub task_id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ReportIdBody {
    pub report_id: String,
}

#[derive(Debug, Serialize)]
pub struct VersionResponse {
    pub version_raw: String,
}

#[derive(Debug, Serialize)]
pub struct ConfigsResponse {
    pub configs: Vec<ScanConfig>,
}

#[derive(Debug, Serialize)]
pub struct TargetsResponse {
    pub targets: Vec<TargetRecord>,
}

#[derive(Debug, Serialize)]
pub struct TasksResponse {
    pub tasks: Vec<TaskRecord>,
}

/// Raw engine response for one task
#[derive(Debug, Serialize)]
pub struct TaskResponse {
    pub task_id: String,
    pub response_raw: String,
}

/// Raw engine response for one report
#[derive(Debug, Serialize)]
pub struct ReportResponse {
    pub report_id: String,
    pub response_raw: String,
}

pub async fn scan_open_ports(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ScanRequest>, JsonRejection>,
) -> ApiResult<ScanResult> {
    const OP: &str = "scan_open_ports";
    let Json(request) = payload.map_err(|e| state.fail(OP, e))?;

    let ctx = state.context();
    let result = state.scanner.scan(&request, &ctx).await.map_err(|e| state.fail(OP, e))?;
    Ok(Json(result))
}

pub async fn scan_preset(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<PresetRequest>, JsonRejection>,
) -> ApiResult<ScanResult> {
    const OP: &str = "scan_preset";
    let Json(request) = payload.map_err(|e| state.fail(OP, e))?;

    info!(target = %request.target.trim(), preset = ?request.preset, "Preset scan requested");

    let ctx = state.context();
    let result = state
        .scanner
        .scan_preset(request, &ctx)
        .await
        .map_err(|e| state.fail(OP, e))?;
    Ok(Json(result))
}

pub async fn engine_version(State(state): State<Arc<AppState>>) -> ApiResult<VersionResponse> {
    let ctx = state.context();
    let version_raw = state
        .gvm
        .version(&ctx)
        .await
        .map_err(|e| state.fail("engine_version", e))?;
    Ok(Json(VersionResponse { version_raw }))
}

pub async fn list_configs(State(state): State<Arc<AppState>>) -> ApiResult<ConfigsResponse> {
    let ctx = state.context();
    let configs = state
        .gvm
        .list_configs(&ctx)
        .await
        .map_err(|e| state.fail("list_configs", e))?;
    Ok(Json(ConfigsResponse { configs }))
}

pub async fn list_targets(State(state): State<Arc<AppState>>) -> ApiResult<TargetsResponse> {
    let ctx = state.context();
    let targets = state
        .gvm
        .list_targets(&ctx)
        .await
        .map_err(|e| state.fail("list_targets", e))?;
    Ok(Json(TargetsResponse { targets }))
}

pub async fn create_target(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateTargetBody>, JsonRejection>,
) -> ApiResult<Reconciled> {
    const OP: &str = "create_target";
    let Json(body) = payload.map_err(|e| state.fail(OP, e))?;

    let ctx = state.context();
    let reconciled = state
        .gvm
        .create_target(&body.name, &body.hosts, body.port_range.as_deref(), &ctx)
        .await
        .map_err(|e| state.fail(OP, e))?;
    Ok(Json(reconciled))
}

pub async fn list_tasks(State(state): State<Arc<AppState>>) -> ApiResult<TasksResponse> {
    let ctx = state.context();
    let tasks = state
        .gvm
        .list_tasks(&ctx)
        .await
        .map_err(|e| state.fail("list_tasks", e))?;
    Ok(Json(TasksResponse { tasks }))
}

pub async fn create_task(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateTaskBody>, JsonRejection>,
) -> ApiResult<Reconciled> {
    const OP: &str = "create_task";
    let Json(body) = payload.map_err(|e| state.fail(OP, e))?;

    let ctx = state.context();
    let reconciled = state
        .gvm
        .create_task(&body.name, &body.config_id, &body.target_id, &ctx)
        .await
        .map_err(|e| state.fail(OP, e))?;
    Ok(Json(reconciled))
}

pub async fn start_task(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<TaskIdBody>, JsonRejection>,
) -> ApiResult<TaskResponse> {
    const OP: &str = "start_task";
    let Json(body) = payload.map_err(|e| state.fail(OP, e))?;

    let ctx = state.context();
    let response_raw = state
        .gvm
        .start_task(&body.task_id, &ctx)
        .await
        .map_err(|e| state.fail(OP, e))?;

    info!(task_id = %body.task_id.trim(), "Engine task started");

    Ok(Json(TaskResponse {
        task_id: body.task_id.trim().to_string(),
        response_raw,
    }))
}

pub async fn task_status(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<TaskIdBody>, JsonRejection>,
) -> ApiResult<TaskResponse> {
    let Json(body) = payload.map_err(|e| state.fail("task_status", e))?;
    task_status_for(&state, body.task_id).await
}

pub async fn task_status_by_path(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<String>,
) -> ApiResult<TaskResponse> {
    task_status_for(&state, task_id).await
}

async fn task_status_for(state: &AppState, task_id: String) -> ApiResult<TaskResponse> {
    let ctx = state.context();
    let response_raw = state
        .gvm
        .task_status(&task_id, &ctx)
        .await
        .map_err(|e| state.fail("task_status", e))?;

    Ok(Json(TaskResponse {
        task_id: task_id.trim().to_string(),
        response_raw,
    }))
}

pub async fn get_report(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ReportIdBody>, JsonRejection>,
) -> ApiResult<ReportResponse> {
    let Json(body) = payload.map_err(|e| state.fail("get_report", e))?;
    report_for(&state, body.report_id).await
}

pub async fn get_report_by_path(
    State(state): State<Arc<AppState>>,
    Path(report_id): Path<String>,
) -> ApiResult<ReportResponse> {
    report_for(&state, report_id).await
}

async fn report_for(state: &AppState, report_id: String) -> ApiResult<ReportResponse> {
    let ctx = state.context();
    let response_raw = state
        .gvm
        .get_report(&report_id, &ctx)
        .await
        .map_err(|e| state.fail("get_report", e))?;

    Ok(Json(ReportResponse {
        report_id: report_id.trim().to_string(),
        response_raw,
    }))
}

pub async fn metrics(State(state): State<Arc<AppState>>) -> Json<MetricsSummary> {
    Json(state.metrics.get_metrics_summary())
}
