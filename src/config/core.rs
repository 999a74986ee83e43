// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AppConfig {
    #[validate(nested)]
    #[serde(default)]
    pub server: ServerConfig,

    #[validate(nested)]
    #[serde(default)]
    pub scanner: ScannerConfig,

    #[validate(nested)]
    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ServerConfig {
    #[validate(length(min = 1))]
    #[serde(default = "default_server_host")]
    pub host: String,

    #[validate(range(min = 1))]
    #[serde(default = "default_server_port")]
    pub port: u16,

    /// Upper bound for a single HTTP request, scans included
    #[validate(range(min = 1, max = 86400))]
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_true")]
    pub graceful_shutdown: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ScannerConfig {
    #[validate(length(min = 1))]
    #[serde(default = "default_nmap_path")]
    pub nmap_path: String,

    #[validate(range(min = 1, max = 86400))]
    #[serde(default = "default_scan_timeout")]
    pub scan_timeout_secs: u64,
}

/// Connection details for the vulnerability-management engine.
///
/// Loaded once at startup and shared read-only. The password has no default:
/// when it is absent the gateway still starts, and every engine call fails
/// with a configuration error.
#[derive(Clone, Serialize, Deserialize, Validate)]
pub struct EngineConfig {
    #[validate(length(min = 1))]
    #[serde(default = "default_container_runtime")]
    pub container_runtime: String,

    #[validate(length(min = 1))]
    #[serde(default = "default_exec_user")]
    pub exec_user: String,

    #[validate(length(min = 1))]
    #[serde(default = "default_container_name")]
    pub container_name: String,

    #[validate(length(min = 1))]
    #[serde(default = "default_cli_path")]
    pub cli_path: String,

    #[validate(length(min = 1))]
    #[serde(default = "default_username")]
    pub username: String,

    #[serde(default, skip_serializing)]
    pub password: Option<String>,

    #[validate(length(min = 1))]
    #[serde(default = "default_engine_host")]
    pub host: String,

    #[validate(length(min = 1))]
    #[serde(default = "default_engine_port")]
    pub port: String,

    #[validate(range(min = 1, max = 86400))]
    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,

    /// Serialise concurrent create-or-reuse calls that share a matching key
    #[serde(default = "default_true")]
    pub serialize_reconciliation: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub log_json: bool,

    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

impl EngineConfig {
    /// Password exactly as configured, unless it is blank
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref().filter(|p| !p.trim().is_empty())
    }

    pub fn has_password(&self) -> bool {
        self.password().is_some()
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }
}

impl fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineConfig")
            .field("container_runtime", &self.container_runtime)
            .field("exec_user", &self.exec_user)
            .field("container_name", &self.container_name)
            .field("cli_path", &self.cli_path)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("host", &self.host)
            .field("port", &self.port)
            .field("command_timeout_secs", &self.command_timeout_secs)
            .field("serialize_reconciliation", &self.serialize_reconciliation)
            .finish()
    }
}

impl ScannerConfig {
    pub fn scan_timeout(&self) -> Duration {
        Duration::from_secs(self.scan_timeout_secs)
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            scanner: ScannerConfig::default(),
            engine: EngineConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
            request_timeout_secs: default_request_timeout(),
            graceful_shutdown: true,
        }
    }
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            nmap_path: default_nmap_path(),
            scan_timeout_secs: default_scan_timeout(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            container_runtime: default_container_runtime(),
            exec_user: default_exec_user(),
            container_name: default_container_name(),
            cli_path: default_cli_path(),
            username: default_username(),
            password: None,
            host: default_engine_host(),
            port: default_engine_port(),
            command_timeout_secs: default_command_timeout(),
            serialize_reconciliation: true,
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
            metrics_enabled: true,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables with sensible defaults
    ///
    /// Supports the following environment variables:
    /// - SERVER_HOST / SERVER_PORT / REQUEST_TIMEOUT_SECS
    /// - NMAP_PATH / SCAN_TIMEOUT_SECS
    /// - OPENVAS_CONTAINER_NAME, GVM_USERNAME, GVM_PASSWORD, GVM_HOST, GVM_PORT
    /// - CONTAINER_RUNTIME, GVM_EXEC_USER, GVM_CLI_PATH, GVM_COMMAND_TIMEOUT_SECS
    /// - LOG_LEVEL / LOG_JSON
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`AppConfig::from_env`] but reads variables through `lookup`
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = AppConfig::default();
        config.apply_overrides(lookup)?;
        Ok(config)
    }

    /// Apply environment-style overrides on top of the current values.
    /// Empty values are treated as unset.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(host) = get("SERVER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = get("SERVER_PORT") {
            self.server.port = port.trim().parse().context("Invalid SERVER_PORT")?;
        }
        if let Some(timeout) = get("REQUEST_TIMEOUT_SECS") {
            self.server.request_timeout_secs =
                timeout.trim().parse().context("Invalid REQUEST_TIMEOUT_SECS")?;
        }

        if let Some(path) = get("NMAP_PATH") {
            self.scanner.nmap_path = path;
        }
        if let Some(timeout) = get("SCAN_TIMEOUT_SECS") {
            self.scanner.scan_timeout_secs =
                timeout.trim().parse().context("Invalid SCAN_TIMEOUT_SECS")?;
        }

        if let Some(container) = get("OPENVAS_CONTAINER_NAME") {
            self.engine.container_name = container;
        }
        if let Some(username) = get("GVM_USERNAME") {
            self.engine.username = username;
        }
        if let Some(password) = get("GVM_PASSWORD") {
            self.engine.password = Some(password);
        }
        if let Some(host) = get("GVM_HOST") {
            self.engine.host = host;
        }
        if let Some(port) = get("GVM_PORT") {
            self.engine.port = port;
        }
        if let Some(runtime) = get("CONTAINER_RUNTIME") {
            self.engine.container_runtime = runtime;
        }
        if let Some(user) = get("GVM_EXEC_USER") {
            self.engine.exec_user = user;
        }
        if let Some(cli) = get("GVM_CLI_PATH") {
            self.engine.cli_path = cli;
        }
        if let Some(timeout) = get("GVM_COMMAND_TIMEOUT_SECS") {
            self.engine.command_timeout_secs = timeout
                .trim()
                .parse()
                .context("Invalid GVM_COMMAND_TIMEOUT_SECS")?;
        }

        if let Some(level) = get("LOG_LEVEL") {
            self.observability.log_level = level;
        }
        if let Some(json) = get("LOG_JSON") {
            self.observability.log_json = parse_bool(&json).context("Invalid LOG_JSON")?;
        }

        Ok(())
    }
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(anyhow::anyhow!("expected a boolean, got '{}'", other)),
    }
}

fn default_true() -> bool {
    true
}

fn default_server_host() -> String {
    "0.0.0.0".to_string()
}

fn default_server_port() -> u16 {
    8081
}

fn default_request_timeout() -> u64 {
    900
}

fn default_nmap_path() -> String {
    "nmap".to_string()
}

fn default_scan_timeout() -> u64 {
    600
}

fn default_container_runtime() -> String {
    "docker".to_string()
}

fn default_exec_user() -> String {
    "gvm".to_string()
}

fn default_container_name() -> String {
    "openvas".to_string()
}

fn default_cli_path() -> String {
    "gvm-cli".to_string()
}

fn default_username() -> String {
    "admin".to_string()
}

fn default_engine_host() -> String {
    "127.0.0.1".to_string()
}

fn default_engine_port() -> String {
    "9390".to_string()
}

fn default_command_timeout() -> u64 {
    120
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_environment() {
        let config = AppConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.engine.container_name, "openvas");
        assert_eq!(config.engine.username, "admin");
        assert_eq!(config.engine.host, "127.0.0.1");
        assert_eq!(config.engine.port, "9390");
        assert!(config.engine.password.is_none());
        assert!(!config.engine.has_password());
        assert_eq!(config.server.port, 8081);
        assert_eq!(config.scanner.nmap_path, "nmap");
    }

    #[test]
    fn test_environment_overrides() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("GVM_PASSWORD", "s3cret"),
            ("GVM_HOST", "gvmd.internal"),
            ("GVM_PORT", "9391"),
            ("OPENVAS_CONTAINER_NAME", "greenbone"),
            ("SERVER_PORT", "9000"),
            ("LOG_JSON", "true"),
        ]))
        .unwrap();

        assert_eq!(config.engine.password(), Some("s3cret"));
        assert_eq!(config.engine.host, "gvmd.internal");
        assert_eq!(config.engine.port, "9391");
        assert_eq!(config.engine.container_name, "greenbone");
        assert_eq!(config.server.port, 9000);
        assert!(config.observability.log_json);
    }

    #[test]
    fn test_empty_values_fall_back_to_defaults() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("OPENVAS_CONTAINER_NAME", ""),
            ("GVM_PASSWORD", "   "),
        ]))
        .unwrap();
        assert_eq!(config.engine.container_name, "openvas");
        assert!(!config.engine.has_password());
    }

    #[test]
    fn test_password_keeps_surrounding_whitespace() {
        let config = AppConfig::from_lookup(lookup_from(&[("GVM_PASSWORD", " s3cret ")])).unwrap();
        assert_eq!(config.engine.password(), Some(" s3cret "));
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        let result = AppConfig::from_lookup(lookup_from(&[("SERVER_PORT", "eighty")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_debug_redacts_password() {
        let mut engine = EngineConfig::default();
        engine.password = Some("hunter2".to_string());
        let rendered = format!("{:?}", engine);
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("<redacted>"));
    }
}
