// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Engine Resource Reconciler
 * Create-or-reuse for engine targets and tasks
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary - Enterprise Edition
 */

use super::client::GmpClient;
use super::commands::GmpCommand;
use super::markup::{self, TargetRecord, TaskRecord};
use crate::errors::{GatewayError, GatewayResult, ResourceKind};
use crate::metrics::MetricsCollector;
use crate::process::InvocationContext;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{info, warn};

/// A creation request that can be matched against existing engine resources
pub trait Reconcilable: Send + Sync {
    type Record: Send;

    const KIND: ResourceKind;

    /// Root element of the creation acknowledgement
    const ACK_ROOT: &'static str;

    fn list_command(&self) -> GmpCommand;

    fn parse_list(&self, raw: &str) -> GatewayResult<Vec<Self::Record>>;

    fn matches(&self, record: &Self::Record) -> bool;

    fn record_id(record: &Self::Record) -> &str;

    fn create_command(&self) -> GmpCommand;

    /// Key identifying requests that must not race each other in-process
    fn lock_key(&self) -> String;
}

/// Trimmed value, or `MissingRequiredField` when blank
pub(crate) fn required(field: &'static str, value: &str) -> GatewayResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(GatewayError::MissingRequiredField(field));
    }
    Ok(value.to_string())
}

/// Target creation request; matched on name and host containment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTarget {
    name: String,
    hosts: String,
    port_range: Option<String>,
}

impl NewTarget {
    pub fn new(name: &str, hosts: &str, port_range: Option<&str>) -> GatewayResult<Self> {
        Ok(Self {
            name: required("name", name)?,
            hosts: required("hosts", hosts)?,
            port_range: port_range
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(str::to_string),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn hosts(&self) -> &str {
        &self.hosts
    }
}

impl Reconcilable for NewTarget {
    type Record = TargetRecord;

    const KIND: ResourceKind = ResourceKind::Target;
    const ACK_ROOT: &'static str = "create_target_response";

    fn list_command(&self) -> GmpCommand {
        GmpCommand::GetTargets
    }

    fn parse_list(&self, raw: &str) -> GatewayResult<Vec<TargetRecord>> {
        markup::parse_targets(raw)
    }

    // The engine may echo hosts reformatted or expanded, so hosts use containment
    fn matches(&self, record: &TargetRecord) -> bool {
        record.name.trim() == self.name
            && record
                .hosts
                .to_lowercase()
                .contains(&self.hosts.to_lowercase())
    }

    fn record_id(record: &TargetRecord) -> &str {
        &record.id
    }

    fn create_command(&self) -> GmpCommand {
        GmpCommand::CreateTarget {
            name: self.name.clone(),
            hosts: self.hosts.clone(),
            port_range: self.port_range.clone(),
        }
    }

    fn lock_key(&self) -> String {
        format!("{}\u{1f}{}", self.name, self.hosts.to_lowercase())
    }
}

/// Task creation request; matched exactly on (name, config id, target id)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    name: String,
    config_id: String,
    target_id: String,
}

impl NewTask {
    pub fn new(name: &str, config_id: &str, target_id: &str) -> GatewayResult<Self> {
        Ok(Self {
            name: required("name", name)?,
            config_id: required("config_id", config_id)?,
            target_id: required("target_id", target_id)?,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Reconcilable for NewTask {
    type Record = TaskRecord;

    const KIND: ResourceKind = ResourceKind::Task;
    const ACK_ROOT: &'static str = "create_task_response";

    fn list_command(&self) -> GmpCommand {
        GmpCommand::GetTasks
    }

    fn parse_list(&self, raw: &str) -> GatewayResult<Vec<TaskRecord>> {
        markup::parse_tasks(raw)
    }

    fn matches(&self, record: &TaskRecord) -> bool {
        record.name.trim() == self.name
            && record.config_id.trim() == self.config_id
            && record.target_id.trim() == self.target_id
    }

    fn record_id(record: &TaskRecord) -> &str {
        &record.id
    }

    fn create_command(&self) -> GmpCommand {
        GmpCommand::CreateTask {
            name: self.name.clone(),
            config_id: self.config_id.clone(),
            target_id: self.target_id.clone(),
        }
    }

    fn lock_key(&self) -> String {
        format!("{}\u{1f}{}\u{1f}{}", self.name, self.config_id, self.target_id)
    }
}

/// Identifier of a reconciled resource and whether it already existed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reconciled {
    pub id: String,
    pub existed: bool,
}

/// Per-key async locks. Entries nobody holds or waits on are pruned on
/// the next acquisition.
#[derive(Debug, Default)]
pub struct KeyedLocks {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, key: &str) -> OwnedMutexGuard<()> {
        let mutex = {
            let mut locks = self.locks.lock();
            locks.retain(|_, m| Arc::strong_count(m) > 1);
            locks
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        mutex.lock_owned().await
    }

    pub fn len(&self) -> usize {
        self.locks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Create-or-reuse driver for [`Reconcilable`] requests.
///
/// Lookup failures caused by the engine process or unparseable markup are
/// tolerated by proceeding to creation. Without the keyed locks, two
/// concurrent calls for one key can both miss the lookup and both create.
/// Nothing coordinates across processes either way.
pub struct Reconciler {
    client: GmpClient,
    metrics: MetricsCollector,
    locks: Option<KeyedLocks>,
}

impl Reconciler {
    pub fn new(client: GmpClient, metrics: MetricsCollector, serialize: bool) -> Self {
        Self {
            client,
            metrics,
            locks: serialize.then(KeyedLocks::new),
        }
    }

    pub async fn reconcile<R: Reconcilable>(
        &self,
        request: &R,
        ctx: &InvocationContext,
    ) -> GatewayResult<Reconciled> {
        let kind = R::KIND;
        let _guard = match &self.locks {
            Some(locks) => {
                let key = format!("{}:{}", kind, request.lock_key());
                tokio::select! {
                    guard = locks.lock(&key) => Some(guard),
                    interrupt = ctx.interrupted() => {
                        return Err(ctx.interrupt_error(interrupt, format!("{} reconciliation", kind)));
                    }
                }
            }
            None => None,
        };

        if let Some(id) = self.lookup(request, ctx).await? {
            info!(kind = %kind, id = %id, "Reusing existing engine resource");
            self.metrics.record_reconciliation(kind, true);
            return Ok(Reconciled { id, existed: true });
        }

        let raw = self
            .client
            .execute(&request.create_command(), ctx)
            .await
            .map_err(|e| creation_failure(kind, e))?;

        let id = markup::parse_create_ack(&raw, R::ACK_ROOT).map_err(|e| creation_failure(kind, e))?;

        info!(kind = %kind, id = %id, "Created engine resource");
        self.metrics.record_reconciliation(kind, false);

        Ok(Reconciled { id, existed: false })
    }

    /// First matching id in engine order, or `None` on a miss or a
    /// tolerated lookup failure
    async fn lookup<R: Reconcilable>(
        &self,
        request: &R,
        ctx: &InvocationContext,
    ) -> GatewayResult<Option<String>> {
        let kind = R::KIND;
        let listed = self
            .client
            .execute(&request.list_command(), ctx)
            .await
            .and_then(|raw| request.parse_list(&raw));

        match listed {
            Ok(records) => Ok(records
                .iter()
                .find(|record| request.matches(record))
                .map(|record| R::record_id(record).to_string())),
            Err(e @ (GatewayError::ProcessFailure { .. } | GatewayError::ParseFailure { .. })) => {
                warn!(kind = %kind, "Lookup failed, proceeding to creation: {}", e);
                self.metrics.record_lookup_failed_open(kind);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

/// Interruptions and missing configuration keep their own error kinds
fn creation_failure(kind: ResourceKind, err: GatewayError) -> GatewayError {
    match err {
        GatewayError::ProcessFailure { .. } | GatewayError::ParseFailure { .. } => {
            let raw = err.captured_output().unwrap_or_default().to_string();
            GatewayError::ReconciliationFailed {
                kind,
                reason: err.to_string(),
                raw,
            }
        }
        other => other,
    }
}
