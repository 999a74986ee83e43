// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Engine Markup Translator
 * Parses management-protocol XML responses into typed records
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary - Enterprise Edition
 */

use crate::errors::{GatewayError, GatewayResult};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::{Deserialize, Serialize};

/// Minimal owned element tree
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub text: String,
    pub children: Vec<Element>,
}

impl Element {
    fn from_start(start: &BytesStart<'_>) -> Result<Self, quick_xml::Error> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr.unescape_value()?.into_owned();
            attributes.push((key, value));
        }

        Ok(Self {
            name,
            attributes,
            ..Default::default()
        })
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Trimmed text of the first child called `name`, empty when absent
    pub fn child_text(&self, name: &str) -> String {
        self.child(name)
            .map(|c| c.text.trim().to_string())
            .unwrap_or_default()
    }
}

/// Parse `raw` into its root element. Text around the root is ignored.
pub fn parse_document(raw: &str, what: &'static str) -> GatewayResult<Element> {
    let failure = |reason: String| GatewayError::ParseFailure {
        what,
        reason,
        raw: raw.to_string(),
    };

    let mut reader = Reader::from_str(raw);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let finished = match reader.read_event_into(&mut buf) {
            Ok(Event::Start(start)) => {
                let element = Element::from_start(&start).map_err(|e| failure(e.to_string()))?;
                stack.push(element);
                None
            }
            Ok(Event::Empty(start)) => {
                Some(Element::from_start(&start).map_err(|e| failure(e.to_string()))?)
            }
            Ok(Event::End(_)) => Some(
                stack
                    .pop()
                    .ok_or_else(|| failure("closing tag without an open element".to_string()))?,
            ),
            Ok(Event::Text(text)) => {
                if let Some(current) = stack.last_mut() {
                    let text = text.unescape().map_err(|e| failure(e.to_string()))?;
                    current.text.push_str(&text);
                }
                None
            }
            Ok(Event::CData(data)) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&String::from_utf8_lossy(&data));
                }
                None
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(failure(e.to_string())),
            _ => None,
        };

        if let Some(element) = finished {
            match stack.last_mut() {
                Some(parent) => parent.children.push(element),
                None if root.is_none() => root = Some(element),
                None => return Err(failure("more than one root element".to_string())),
            }
        }
        buf.clear();
    }

    if let Some(open) = stack.last() {
        return Err(failure(format!("unexpected end of document inside <{}>", open.name)));
    }

    root.ok_or_else(|| failure("no root element".to_string()))
}

/// Reject responses whose `status` attribute is not 2xx
fn ensure_ok_status(root: &Element, what: &'static str, raw: &str) -> GatewayResult<()> {
    match root.attr("status") {
        Some(status) if !status.trim().starts_with('2') => Err(GatewayError::ParseFailure {
            what,
            reason: status_message(root, "engine rejected the request"),
            raw: raw.to_string(),
        }),
        _ => Ok(()),
    }
}

fn status_message(root: &Element, prefix: &str) -> String {
    match (root.attr("status"), root.attr("status_text")) {
        (Some(status), Some(text)) => format!("{} (status {}: {})", prefix, status, text),
        (Some(status), None) => format!("{} (status {})", prefix, status),
        (None, Some(text)) => format!("{} ({})", prefix, text),
        (None, None) => prefix.to_string(),
    }
}

/// Scan policy from the engine's catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanConfig {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetRecord {
    pub id: String,
    pub name: String,
    pub hosts: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: String,
    pub name: String,
    pub config_id: String,
    pub target_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

fn entry_id(element: &Element) -> Option<String> {
    element
        .attr("id")
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

/// Parse a `get_configs` response
pub fn parse_configs(raw: &str) -> GatewayResult<Vec<ScanConfig>> {
    let root = parse_document(raw, "config list")?;
    ensure_ok_status(&root, "config list", raw)?;

    Ok(root
        .children_named("config")
        .filter_map(|config| {
            let id = entry_id(config)?;
            let comment = config.child_text("comment");
            Some(ScanConfig {
                id,
                name: config.child_text("name"),
                comment: (!comment.is_empty()).then_some(comment),
            })
        })
        .collect())
}

/// Parse a `get_targets` response
pub fn parse_targets(raw: &str) -> GatewayResult<Vec<TargetRecord>> {
    let root = parse_document(raw, "target list")?;
    ensure_ok_status(&root, "target list", raw)?;

    Ok(root
        .children_named("target")
        .filter_map(|target| {
            Some(TargetRecord {
                id: entry_id(target)?,
                name: target.child_text("name"),
                hosts: target.child_text("hosts"),
            })
        })
        .collect())
}

/// Parse a `get_tasks` response
pub fn parse_tasks(raw: &str) -> GatewayResult<Vec<TaskRecord>> {
    let root = parse_document(raw, "task list")?;
    ensure_ok_status(&root, "task list", raw)?;

    Ok(root
        .children_named("task")
        .filter_map(|task| {
            let nested_id = |name: &str| {
                task.child(name)
                    .and_then(|c| c.attr("id"))
                    .map(|id| id.trim().to_string())
                    .unwrap_or_default()
            };
            let status = task.child_text("status");

            Some(TaskRecord {
                id: entry_id(task)?,
                name: task.child_text("name"),
                config_id: nested_id("config"),
                target_id: nested_id("target"),
                status: (!status.is_empty()).then_some(status),
            })
        })
        .collect())
}

/// Extract the assigned id from a creation acknowledgement whose root must
/// be `expected_root`
pub fn parse_create_ack(raw: &str, expected_root: &'static str) -> GatewayResult<String> {
    let root = parse_document(raw, expected_root)?;
    let failure = |reason: String| GatewayError::ParseFailure {
        what: expected_root,
        reason,
        raw: raw.to_string(),
    };

    if root.name != expected_root {
        return Err(failure(format!(
            "expected <{}> but found <{}>",
            expected_root, root.name
        )));
    }

    match entry_id(&root) {
        Some(id) => Ok(id),
        None => Err(failure(status_message(&root, "missing or empty id attribute"))),
    }
}
