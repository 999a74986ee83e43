// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Vulnerability Engine Integration
 * Management-protocol commands, response translation and reconciliation
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary - Enterprise Edition
 */

pub mod client;
pub mod commands;
pub mod markup;
pub mod reconcile;
pub mod service;

pub use client::{EngineCredentials, GmpClient};
pub use commands::GmpCommand;
pub use markup::{ScanConfig, TargetRecord, TaskRecord};
pub use reconcile::{KeyedLocks, NewTarget, NewTask, Reconcilable, Reconciled, Reconciler};
pub use service::GvmService;
