// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

use super::{CommandRunner, Invocation, InvocationContext, ProcessOutput};
use crate::errors::{GatewayError, GatewayResult};
use crate::metrics::MetricsCollector;
use async_trait::async_trait;
use std::process::{ExitStatus, Stdio};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::time::Instant;
use tracing::debug;

const READ_CHUNK: usize = 8192;

/// Runs an [`Invocation`] as a real OS process
#[derive(Debug, Clone)]
pub struct ProcessInvoker {
    invocation: Invocation,
    metrics: Option<MetricsCollector>,
}

impl ProcessInvoker {
    pub fn new(invocation: Invocation) -> Self {
        Self {
            invocation,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: MetricsCollector) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn invocation(&self) -> &Invocation {
        &self.invocation
    }

    fn spawn_failure(&self, label: String, reason: String) -> GatewayError {
        if let Some(metrics) = &self.metrics {
            metrics.record_spawn_failure(&label);
        }

        GatewayError::ProcessFailure {
            program: label,
            exit_code: None,
            reason,
            output: String::new(),
        }
    }
}

#[async_trait]
impl CommandRunner for ProcessInvoker {
    fn label(&self) -> String {
        self.invocation.label()
    }

    async fn run(&self, args: &[String], ctx: &InvocationContext) -> GatewayResult<ProcessOutput> {
        let label = self.invocation.label();
        if ctx.is_cancelled() {
            return Err(GatewayError::Cancelled { program: label });
        }

        let (program, argv) = self.invocation.command_line(args);

        // Arguments may carry engine credentials; only the count is logged
        debug!(program = %label, arg_count = argv.len(), "Spawning external process");

        let mut cmd = Command::new(&program);
        cmd.args(&argv)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let started = Instant::now();
        let mut child = cmd
            .spawn()
            .map_err(|e| self.spawn_failure(label.clone(), format!("failed to start '{}': {}", program, e)))?;

        let outcome = {
            let collect = collect_output(&mut child);
            tokio::select! {
                result = collect => Ok(result),
                interrupt = ctx.interrupted() => Err(interrupt),
            }
        };

        match outcome {
            Err(interrupt) => {
                if let Err(e) = child.kill().await {
                    debug!(program = %label, "Kill after interruption failed: {}", e);
                }

                let err = ctx.interrupt_error(interrupt, label.clone());
                if let Some(metrics) = &self.metrics {
                    match &err {
                        GatewayError::DeadlineExceeded { timeout, .. } => {
                            metrics.record_timeout(&label, *timeout)
                        }
                        _ => metrics.record_cancelled(&label),
                    }
                }
                Err(err)
            }
            Ok(Err(e)) => Err(self.spawn_failure(label, format!("failed to collect output: {}", e))),
            Ok(Ok((bytes, status))) => {
                let elapsed = started.elapsed();
                let output = ProcessOutput {
                    program: label,
                    output: String::from_utf8_lossy(&bytes).into_owned(),
                    exit_code: status.code(),
                    success: status.success(),
                    elapsed,
                };

                if let Some(metrics) = &self.metrics {
                    metrics.record_invocation(&output.program, output.exit_code, output.success, elapsed);
                }

                Ok(output)
            }
        }
    }
}

/// Drain stdout and stderr into one buffer, then reap the child
async fn collect_output(child: &mut Child) -> std::io::Result<(Vec<u8>, ExitStatus)> {
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let combined = read_interleaved(stdout, stderr).await?;
    let status = child.wait().await?;

    Ok((combined, status))
}

/// Bytes are appended in the order each stream delivers them
async fn read_interleaved<A, B>(first: Option<A>, second: Option<B>) -> std::io::Result<Vec<u8>>
where
    A: AsyncRead + Unpin,
    B: AsyncRead + Unpin,
{
    let mut combined = Vec::new();
    let mut first_buf = vec![0u8; READ_CHUNK];
    let mut second_buf = vec![0u8; READ_CHUNK];

    let mut first_open = first.is_some();
    let mut second_open = second.is_some();
    let mut first = first;
    let mut second = second;

    while first_open || second_open {
        tokio::select! {
            read = read_some(&mut first, &mut first_buf), if first_open => match read? {
                0 => first_open = false,
                n => combined.extend_from_slice(&first_buf[..n]),
            },
            read = read_some(&mut second, &mut second_buf), if second_open => match read? {
                0 => second_open = false,
                n => combined.extend_from_slice(&second_buf[..n]),
            },
        }
    }

    Ok(combined)
}

async fn read_some<R: AsyncRead + Unpin>(reader: &mut Option<R>, buf: &mut [u8]) -> std::io::Result<usize> {
    match reader {
        Some(reader) => reader.read(buf).await,
        None => Ok(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_interleaved_read_keeps_both_streams() {
        let stdout: &[u8] = b"Starting Nmap\n";
        let stderr: &[u8] = b"WARNING: no targets\n";

        let combined = read_interleaved(Some(stdout), Some(stderr)).await.unwrap();
        let text = String::from_utf8(combined).unwrap();
        assert!(text.contains("Starting Nmap"));
        assert!(text.contains("WARNING: no targets"));
        assert_eq!(text.len(), stdout.len() + stderr.len());
    }

    #[tokio::test]
    async fn test_interleaved_read_with_missing_stream() {
        let stdout: &[u8] = b"only stdout";
        let combined = read_interleaved::<&[u8], &[u8]>(Some(stdout), None).await.unwrap();
        assert_eq!(combined, b"only stdout");
    }

    #[tokio::test]
    async fn test_missing_program_is_process_failure() {
        let metrics = MetricsCollector::new(true);
        let invoker = ProcessInvoker::new(Invocation::direct("/nonexistent/scan-gateway-test-binary"))
            .with_metrics(metrics.clone());

        let err = invoker
            .run(&["--version".to_string()], &InvocationContext::new())
            .await
            .unwrap_err();

        assert!(matches!(err, GatewayError::ProcessFailure { exit_code: None, .. }));
        assert_eq!(metrics.get_metrics_summary().spawn_failures, 1);
    }

    #[tokio::test]
    async fn test_cancelled_context_does_not_spawn() {
        let invoker = ProcessInvoker::new(Invocation::direct("/nonexistent/scan-gateway-test-binary"));
        let ctx = InvocationContext::new();
        ctx.cancel();

        let err = invoker.run(&[], &ctx).await.unwrap_err();
        assert!(matches!(err, GatewayError::Cancelled { .. }));
    }
}
