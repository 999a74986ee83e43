// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

use super::client::GmpClient;
use super::commands::GmpCommand;
use super::markup::{self, ScanConfig, TargetRecord, TaskRecord};
use super::reconcile::{required, NewTarget, NewTask, Reconciled, Reconciler};
use crate::config::EngineConfig;
use crate::errors::GatewayResult;
use crate::metrics::MetricsCollector;
use crate::process::InvocationContext;

/// Engine operations exposed to request handlers
pub struct GvmService {
    client: GmpClient,
    reconciler: Reconciler,
}

impl GvmService {
    pub fn new(client: GmpClient, metrics: MetricsCollector, serialize_reconciliation: bool) -> Self {
        let reconciler = Reconciler::new(client.clone(), metrics, serialize_reconciliation);
        Self { client, reconciler }
    }

    pub fn from_config(engine: &EngineConfig, metrics: MetricsCollector) -> Self {
        let client = GmpClient::from_config(engine, metrics.clone());
        Self::new(client, metrics, engine.serialize_reconciliation)
    }

    /// Whether engine credentials are complete
    pub fn is_configured(&self) -> bool {
        self.client.credentials().has_password()
    }

    /// Raw `get_version` response
    pub async fn version(&self, ctx: &InvocationContext) -> GatewayResult<String> {
        self.client.execute(&GmpCommand::GetVersion, ctx).await
    }

    pub async fn list_configs(&self, ctx: &InvocationContext) -> GatewayResult<Vec<ScanConfig>> {
        let raw = self.client.execute(&GmpCommand::GetConfigs, ctx).await?;
        markup::parse_configs(&raw)
    }

    pub async fn list_targets(&self, ctx: &InvocationContext) -> GatewayResult<Vec<TargetRecord>> {
        let raw = self.client.execute(&GmpCommand::GetTargets, ctx).await?;
        markup::parse_targets(&raw)
    }

    pub async fn list_tasks(&self, ctx: &InvocationContext) -> GatewayResult<Vec<TaskRecord>> {
        let raw = self.client.execute(&GmpCommand::GetTasks, ctx).await?;
        markup::parse_tasks(&raw)
    }

    pub async fn create_target(
        &self,
        name: &str,
        hosts: &str,
        port_range: Option<&str>,
        ctx: &InvocationContext,
    ) -> GatewayResult<Reconciled> {
        let request = NewTarget::new(name, hosts, port_range)?;
        self.reconciler.reconcile(&request, ctx).await
    }

    pub async fn create_task(
        &self,
        name: &str,
        config_id: &str,
        target_id: &str,
        ctx: &InvocationContext,
    ) -> GatewayResult<Reconciled> {
        let request = NewTask::new(name, config_id, target_id)?;
        self.reconciler.reconcile(&request, ctx).await
    }

    /// Raw `start_task` response
    pub async fn start_task(&self, task_id: &str, ctx: &InvocationContext) -> GatewayResult<String> {
        let task_id = required("task_id", task_id)?;
        self.client.execute(&GmpCommand::StartTask { task_id }, ctx).await
    }

    /// Raw detailed `get_tasks` response for one task
    pub async fn task_status(&self, task_id: &str, ctx: &InvocationContext) -> GatewayResult<String> {
        let task_id = required("task_id", task_id)?;
        self.client.execute(&GmpCommand::GetTaskStatus { task_id }, ctx).await
    }

    /// Raw detailed `get_reports` response
    pub async fn get_report(&self, report_id: &str, ctx: &InvocationContext) -> GatewayResult<String> {
        let report_id = required("report_id", report_id)?;
        self.client.execute(&GmpCommand::GetReport { report_id }, ctx).await
    }
}
