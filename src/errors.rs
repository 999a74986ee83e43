// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Gateway Error Types
 * Error taxonomy shared by the scanner path and the engine path
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary - Enterprise Edition
 */

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Engine-side resource kinds that go through create-or-reuse reconciliation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Target,
    Task,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Target => write!(f, "target"),
            ResourceKind::Task => write!(f, "task"),
        }
    }
}

/// Main gateway error type
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Malformed or unrecognized request field
    #[error("Invalid value {value:?} for '{field}': {reason}")]
    InvalidOption {
        field: &'static str,
        value: String,
        reason: String,
    },

    /// Required string field empty after trimming
    #[error("Missing required field: {0}")]
    MissingRequiredField(&'static str),

    /// Required credential absent from process configuration
    #[error("Configuration missing: {0} is not set")]
    ConfigurationMissing(&'static str),

    /// External program could not be started or exited non-zero
    #[error("{program} failed ({}): {reason}; output: {output}", exit_label(.exit_code))]
    ProcessFailure {
        program: String,
        exit_code: Option<i32>,
        reason: String,
        output: String,
    },

    /// Engine markup did not match the expected shape
    #[error("Failed to parse {what}: {reason}; output: {raw}")]
    ParseFailure {
        what: &'static str,
        reason: String,
        raw: String,
    },

    /// Creation after a reuse miss failed or yielded no usable identifier
    #[error("Failed to reconcile {kind}: {reason}; output: {raw}")]
    ReconciliationFailed {
        kind: ResourceKind,
        reason: String,
        raw: String,
    },

    /// Invocation context cancelled before the process completed
    #[error("Operation cancelled before {program} completed")]
    Cancelled { program: String },

    /// Invocation deadline elapsed before the process completed
    #[error("{program} did not complete within {timeout:?}")]
    DeadlineExceeded { program: String, timeout: Duration },

    /// Invalid process-wide configuration
    #[error("Configuration error: {0}")]
    Configuration(String),
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit status {}", code),
        None => "no exit status".to_string(),
    }
}

impl GatewayError {
    pub fn invalid_option(
        field: &'static str,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        GatewayError::InvalidOption {
            field,
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Request validation errors, reported before any process is spawned
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            GatewayError::InvalidOption { .. } | GatewayError::MissingRequiredField(_)
        )
    }

    /// Context ended before the external process finished
    pub fn is_interrupted(&self) -> bool {
        matches!(
            self,
            GatewayError::Cancelled { .. } | GatewayError::DeadlineExceeded { .. }
        )
    }

    /// Raw text captured from the external program, if the error carries any
    pub fn captured_output(&self) -> Option<&str> {
        match self {
            GatewayError::ProcessFailure { output, .. } => Some(output),
            GatewayError::ParseFailure { raw, .. } => Some(raw),
            GatewayError::ReconciliationFailed { raw, .. } => Some(raw),
            _ => None,
        }
    }
}

/// Result type for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_classification() {
        assert!(GatewayError::MissingRequiredField("target").is_client_error());
        assert!(GatewayError::invalid_option("timing", "T9", "bad").is_client_error());
        assert!(!GatewayError::ConfigurationMissing("GVM_PASSWORD").is_client_error());
        assert!(!GatewayError::Cancelled {
            program: "nmap".to_string()
        }
        .is_client_error());
    }

    #[test]
    fn test_process_failure_keeps_output() {
        let err = GatewayError::ProcessFailure {
            program: "docker".to_string(),
            exit_code: Some(1),
            reason: "non-zero exit".to_string(),
            output: "Error: container not running".to_string(),
        };
        assert_eq!(err.captured_output(), Some("Error: container not running"));
        let message = err.to_string();
        assert!(message.contains("exit status 1"));
        assert!(message.contains("container not running"));
    }

    #[test]
    fn test_spawn_failure_message() {
        let err = GatewayError::ProcessFailure {
            program: "nmap".to_string(),
            exit_code: None,
            reason: "No such file or directory".to_string(),
            output: String::new(),
        };
        assert!(err.to_string().contains("no exit status"));
    }
}
