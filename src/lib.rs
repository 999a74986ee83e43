// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Scan Gateway Library
 * Exposes gateway modules for the server binary and tests
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

pub mod api;
pub mod config;
pub mod errors;
pub mod gvm;
pub mod health;
pub mod metrics;
pub mod nmap;
pub mod process;

pub use errors::{GatewayError, GatewayResult};
