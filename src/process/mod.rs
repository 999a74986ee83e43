// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - External Process Invocation
 * Runs external tools directly or through a container exec indirection
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary - Enterprise Edition
 */

pub mod invoker;
pub mod scripted;

pub use invoker::ProcessInvoker;
pub use scripted::{ScriptedReply, ScriptedRunner};

use crate::errors::{GatewayError, GatewayResult};
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// How an external program is reached
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    /// `program args...`
    Direct { program: String },

    /// `runtime exec -u user container program args...`
    ContainerExec {
        runtime: String,
        user: String,
        container: String,
        program: String,
    },
}

impl Invocation {
    pub fn direct(program: impl Into<String>) -> Self {
        Invocation::Direct {
            program: program.into(),
        }
    }

    pub fn container_exec(
        runtime: impl Into<String>,
        user: impl Into<String>,
        container: impl Into<String>,
        program: impl Into<String>,
    ) -> Self {
        Invocation::ContainerExec {
            runtime: runtime.into(),
            user: user.into(),
            container: container.into(),
            program: program.into(),
        }
    }

    /// Executable to spawn and its full argument vector
    pub fn command_line(&self, args: &[String]) -> (String, Vec<String>) {
        match self {
            Invocation::Direct { program } => (program.clone(), args.to_vec()),
            Invocation::ContainerExec {
                runtime,
                user,
                container,
                program,
            } => {
                let mut argv = Vec::with_capacity(args.len() + 5);
                argv.push("exec".to_string());
                argv.push("-u".to_string());
                argv.push(user.clone());
                argv.push(container.clone());
                argv.push(program.clone());
                argv.extend(args.iter().cloned());
                (runtime.clone(), argv)
            }
        }
    }

    /// Human-readable name used in errors and logs
    pub fn label(&self) -> String {
        match self {
            Invocation::Direct { program } => program.clone(),
            Invocation::ContainerExec {
                runtime, program, ..
            } => format!("{} (via {} exec)", program, runtime),
        }
    }
}

/// Cancellation and deadline for one external invocation
#[derive(Debug, Clone, Default)]
pub struct InvocationContext {
    cancel: CancellationToken,
    deadline: Option<Instant>,
    budget: Option<Duration>,
}

impl InvocationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            cancel: CancellationToken::new(),
            deadline: Some(Instant::now() + timeout),
            budget: Some(timeout),
        }
    }

    pub fn with_cancellation(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            deadline: None,
            budget: None,
        }
    }

    /// Derive a context that is cancelled with this one and whose deadline is
    /// the earlier of the current deadline and `now + timeout`
    pub fn child_with_timeout(&self, timeout: Duration) -> Self {
        let candidate = Instant::now() + timeout;
        let (deadline, budget) = match self.deadline {
            Some(existing) if existing <= candidate => (existing, self.budget),
            _ => (candidate, Some(timeout)),
        };

        Self {
            cancel: self.cancel.child_token(),
            deadline: Some(deadline),
            budget,
        }
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Total time budget the deadline was derived from
    pub fn budget(&self) -> Option<Duration> {
        self.budget
    }

    /// Resolves when the context is cancelled or its deadline passes
    pub(crate) async fn interrupted(&self) -> Interrupt {
        tokio::select! {
            _ = self.cancel.cancelled() => Interrupt::Cancelled,
            _ = wait_for_deadline(self.deadline) => Interrupt::DeadlineExceeded,
        }
    }

    pub(crate) fn interrupt_error(&self, interrupt: Interrupt, program: String) -> GatewayError {
        match interrupt {
            Interrupt::Cancelled => GatewayError::Cancelled { program },
            Interrupt::DeadlineExceeded => GatewayError::DeadlineExceeded {
                program,
                timeout: self.budget.unwrap_or_default(),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Interrupt {
    Cancelled,
    DeadlineExceeded,
}

async fn wait_for_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}

/// Combined output and exit status of one finished process
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub program: String,
    pub output: String,
    pub exit_code: Option<i32>,
    pub success: bool,
    pub elapsed: Duration,
}

impl ProcessOutput {
    /// Failure to report alongside the output when the exit was non-zero
    pub fn exit_error(&self) -> Option<GatewayError> {
        if self.success {
            return None;
        }

        Some(GatewayError::ProcessFailure {
            program: self.program.clone(),
            exit_code: self.exit_code,
            reason: match self.exit_code {
                Some(_) => "exited with non-zero status".to_string(),
                None => "terminated by signal".to_string(),
            },
            output: self.output.clone(),
        })
    }

    /// Output on success, `ProcessFailure` carrying the output otherwise
    pub fn check(self) -> GatewayResult<String> {
        match self.exit_error() {
            Some(err) => Err(err),
            None => Ok(self.output),
        }
    }
}

/// Capability to run one external command to completion
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Name of the program this runner executes
    fn label(&self) -> String;

    /// Run with `args`, honouring the context's cancellation and deadline.
    ///
    /// A non-zero exit is returned as `Ok` with `success == false`; only
    /// spawn failures and interruptions are errors.
    async fn run(&self, args: &[String], ctx: &InvocationContext) -> GatewayResult<ProcessOutput>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_direct_command_line() {
        let invocation = Invocation::direct("nmap");
        let (program, argv) = invocation.command_line(&strings(&["-T2", "10.0.0.5"]));
        assert_eq!(program, "nmap");
        assert_eq!(argv, strings(&["-T2", "10.0.0.5"]));
        assert_eq!(invocation.label(), "nmap");
    }

    #[test]
    fn test_container_exec_command_line() {
        let invocation = Invocation::container_exec("docker", "gvm", "openvas", "gvm-cli");
        let (program, argv) = invocation.command_line(&strings(&["--xml", "<get_version/>"]));
        assert_eq!(program, "docker");
        assert_eq!(
            argv,
            strings(&["exec", "-u", "gvm", "openvas", "gvm-cli", "--xml", "<get_version/>"])
        );
        assert_eq!(invocation.label(), "gvm-cli (via docker exec)");
    }

    #[test]
    fn test_exit_error_carries_output() {
        let output = ProcessOutput {
            program: "nmap".to_string(),
            output: "Failed to resolve \"nohost\".".to_string(),
            exit_code: Some(1),
            success: false,
            elapsed: Duration::from_millis(5),
        };

        let err = output.exit_error().unwrap();
        assert_eq!(err.captured_output(), Some("Failed to resolve \"nohost\"."));
        assert!(output.check().is_err());
    }

    #[test]
    fn test_successful_output_checks_ok() {
        let output = ProcessOutput {
            program: "nmap".to_string(),
            output: "Nmap done".to_string(),
            exit_code: Some(0),
            success: true,
            elapsed: Duration::from_millis(5),
        };
        assert!(output.exit_error().is_none());
        assert_eq!(output.check().unwrap(), "Nmap done");
    }

    #[tokio::test]
    async fn test_child_context_keeps_earlier_deadline() {
        let parent = InvocationContext::with_timeout(Duration::from_secs(5));
        let child = parent.child_with_timeout(Duration::from_secs(60));
        assert_eq!(child.deadline(), parent.deadline());
        assert_eq!(child.budget(), Some(Duration::from_secs(5)));

        let tighter = parent.child_with_timeout(Duration::from_secs(1));
        assert!(tighter.deadline() < parent.deadline());
        assert_eq!(tighter.budget(), Some(Duration::from_secs(1)));
    }

    #[tokio::test]
    async fn test_parent_cancellation_reaches_child() {
        let parent = InvocationContext::new();
        let child = parent.child_with_timeout(Duration::from_secs(60));
        parent.cancel();
        assert!(child.is_cancelled());
        assert_eq!(child.interrupted().await, Interrupt::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_interrupts() {
        let ctx = InvocationContext::with_timeout(Duration::from_millis(50));
        assert_eq!(ctx.interrupted().await, Interrupt::DeadlineExceeded);
        let err = ctx.interrupt_error(Interrupt::DeadlineExceeded, "nmap".to_string());
        assert!(matches!(
            err,
            GatewayError::DeadlineExceeded { timeout, .. } if timeout == Duration::from_millis(50)
        ));
    }
}
