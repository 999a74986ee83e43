// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

use super::{CommandRunner, InvocationContext, ProcessOutput};
use crate::errors::{GatewayError, GatewayResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::Duration;

/// Canned result for one scripted invocation
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    /// Process ran and exited with `code`
    Exit { output: String, code: i32 },
    /// Process could not be started
    SpawnFailure(String),
    /// Process never finishes on its own; waits for cancellation or deadline
    Hang,
}

impl ScriptedReply {
    pub fn ok(output: impl Into<String>) -> Self {
        ScriptedReply::Exit {
            output: output.into(),
            code: 0,
        }
    }

    pub fn exit(output: impl Into<String>, code: i32) -> Self {
        ScriptedReply::Exit {
            output: output.into(),
            code,
        }
    }

    pub fn spawn_failure(reason: impl Into<String>) -> Self {
        ScriptedReply::SpawnFailure(reason.into())
    }
}

struct Rule {
    pattern: String,
    replies: VecDeque<ScriptedReply>,
}

/// In-memory [`CommandRunner`] that answers from scripted replies.
///
/// A rule matches when any argument contains its pattern. Rules are tried in
/// the order they were added. Each rule hands out its replies in order and
/// keeps repeating the last one.
pub struct ScriptedRunner {
    label: String,
    rules: Mutex<Vec<Rule>>,
    fallback: ScriptedReply,
    calls: Mutex<Vec<Vec<String>>>,
}

impl ScriptedRunner {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            rules: Mutex::new(Vec::new()),
            fallback: ScriptedReply::exit("no scripted reply", 1),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_reply(self, pattern: &str, reply: ScriptedReply) -> Self {
        self.push_reply(pattern, reply);
        self
    }

    pub fn with_fallback(mut self, reply: ScriptedReply) -> Self {
        self.fallback = reply;
        self
    }

    /// Queue another reply for `pattern`
    pub fn push_reply(&self, pattern: &str, reply: ScriptedReply) {
        let mut rules = self.rules.lock();
        match rules.iter_mut().find(|r| r.pattern == pattern) {
            Some(rule) => rule.replies.push_back(reply),
            None => rules.push(Rule {
                pattern: pattern.to_string(),
                replies: VecDeque::from([reply]),
            }),
        }
    }

    /// Every argument vector received so far
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Number of calls with an argument containing `pattern`
    pub fn calls_matching(&self, pattern: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|args| args.iter().any(|a| a.contains(pattern)))
            .count()
    }

    fn next_reply(&self, args: &[String]) -> ScriptedReply {
        let mut rules = self.rules.lock();
        let rule = rules
            .iter_mut()
            .find(|r| args.iter().any(|a| a.contains(&r.pattern)));

        match rule {
            Some(rule) if rule.replies.len() > 1 => rule
                .replies
                .pop_front()
                .unwrap_or_else(|| self.fallback.clone()),
            Some(rule) => rule
                .replies
                .front()
                .cloned()
                .unwrap_or_else(|| self.fallback.clone()),
            None => self.fallback.clone(),
        }
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    fn label(&self) -> String {
        self.label.clone()
    }

    async fn run(&self, args: &[String], ctx: &InvocationContext) -> GatewayResult<ProcessOutput> {
        if ctx.is_cancelled() {
            return Err(GatewayError::Cancelled {
                program: self.label.clone(),
            });
        }

        self.calls.lock().push(args.to_vec());

        match self.next_reply(args) {
            ScriptedReply::Exit { output, code } => Ok(ProcessOutput {
                program: self.label.clone(),
                output,
                exit_code: Some(code),
                success: code == 0,
                elapsed: Duration::ZERO,
            }),
            ScriptedReply::SpawnFailure(reason) => Err(GatewayError::ProcessFailure {
                program: self.label.clone(),
                exit_code: None,
                reason,
                output: String::new(),
            }),
            ScriptedReply::Hang => {
                let interrupt = ctx.interrupted().await;
                Err(ctx.interrupt_error(interrupt, self.label.clone()))
            }
        }
    }
}
