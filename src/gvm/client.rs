// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

use super::commands::GmpCommand;
use crate::config::EngineConfig;
use crate::errors::{GatewayError, GatewayResult};
use crate::metrics::MetricsCollector;
use crate::process::{CommandRunner, Invocation, InvocationContext, ProcessInvoker};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Engine login and endpoint, fixed at startup
#[derive(Clone, PartialEq, Eq)]
pub struct EngineCredentials {
    pub username: String,
    password: Option<String>,
    pub host: String,
    pub port: String,
}

impl EngineCredentials {
    pub fn new(
        username: impl Into<String>,
        password: Option<String>,
        host: impl Into<String>,
        port: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.filter(|p| !p.trim().is_empty()),
            host: host.into(),
            port: port.into(),
        }
    }

    pub fn from_config(engine: &EngineConfig) -> Self {
        Self::new(
            engine.username.clone(),
            engine.password().map(str::to_string),
            engine.host.clone(),
            engine.port.clone(),
        )
    }

    pub fn has_password(&self) -> bool {
        self.password.is_some()
    }
}

impl fmt::Debug for EngineCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineCredentials")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("host", &self.host)
            .field("port", &self.port)
            .finish()
    }
}

/// Management-protocol client driven through the gvm-cli program
#[derive(Clone)]
pub struct GmpClient {
    runner: Arc<dyn CommandRunner>,
    credentials: EngineCredentials,
    command_timeout: Duration,
}

impl GmpClient {
    pub fn new(runner: Arc<dyn CommandRunner>, credentials: EngineCredentials, command_timeout: Duration) -> Self {
        Self {
            runner,
            credentials,
            command_timeout,
        }
    }

    /// Client that reaches gvm-cli through `runtime exec` into the engine container
    pub fn from_config(engine: &EngineConfig, metrics: MetricsCollector) -> Self {
        let invocation = Invocation::container_exec(
            engine.container_runtime.clone(),
            engine.exec_user.clone(),
            engine.container_name.clone(),
            engine.cli_path.clone(),
        );
        let invoker = ProcessInvoker::new(invocation).with_metrics(metrics);

        Self::new(
            Arc::new(invoker),
            EngineCredentials::from_config(engine),
            engine.command_timeout(),
        )
    }

    pub fn credentials(&self) -> &EngineCredentials {
        &self.credentials
    }

    fn command_args(&self, password: &str, payload: String) -> Vec<String> {
        vec![
            "--gmp-username".to_string(),
            self.credentials.username.clone(),
            "--gmp-password".to_string(),
            password.to_string(),
            "tls".to_string(),
            "--hostname".to_string(),
            self.credentials.host.clone(),
            "--port".to_string(),
            self.credentials.port.clone(),
            "--xml".to_string(),
            payload,
        ]
    }

    /// Send one command and return the raw response text
    pub async fn execute(&self, command: &GmpCommand, ctx: &InvocationContext) -> GatewayResult<String> {
        let password = self
            .credentials
            .password
            .as_deref()
            .ok_or(GatewayError::ConfigurationMissing("GVM_PASSWORD"))?;

        let ctx = ctx.child_with_timeout(self.command_timeout);

        debug!(command = command.name(), "Sending engine command");

        let args = self.command_args(password, command.to_xml());
        let output = self.runner.run(&args, &ctx).await?;

        debug!(
            command = command.name(),
            success = output.success,
            duration_ms = output.elapsed.as_millis(),
            "Engine command finished"
        );

        output.check()
    }
}
