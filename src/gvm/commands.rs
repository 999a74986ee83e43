// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

use quick_xml::escape::escape;

/// One management-protocol request, rendered as the `--xml` payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GmpCommand {
    GetVersion,
    GetConfigs,
    GetTargets,
    GetTasks,
    CreateTarget {
        name: String,
        hosts: String,
        port_range: Option<String>,
    },
    CreateTask {
        name: String,
        config_id: String,
        target_id: String,
    },
    StartTask {
        task_id: String,
    },
    GetTaskStatus {
        task_id: String,
    },
    GetReport {
        report_id: String,
    },
}

impl GmpCommand {
    /// Short name used in logs and error messages
    pub fn name(&self) -> &'static str {
        match self {
            GmpCommand::GetVersion => "get_version",
            GmpCommand::GetConfigs => "get_configs",
            GmpCommand::GetTargets => "get_targets",
            GmpCommand::GetTasks | GmpCommand::GetTaskStatus { .. } => "get_tasks",
            GmpCommand::CreateTarget { .. } => "create_target",
            GmpCommand::CreateTask { .. } => "create_task",
            GmpCommand::StartTask { .. } => "start_task",
            GmpCommand::GetReport { .. } => "get_reports",
        }
    }

    pub fn to_xml(&self) -> String {
        match self {
            GmpCommand::GetVersion => "<get_version/>".to_string(),
            GmpCommand::GetConfigs => "<get_configs/>".to_string(),
            GmpCommand::GetTargets => "<get_targets/>".to_string(),
            GmpCommand::GetTasks => "<get_tasks/>".to_string(),
            GmpCommand::CreateTarget {
                name,
                hosts,
                port_range,
            } => {
                let mut xml = format!(
                    "<create_target><name>{}</name><hosts>{}</hosts>",
                    escape(name.as_str()),
                    escape(hosts.as_str())
                );
                if let Some(range) = port_range.as_deref().filter(|r| !r.is_empty()) {
                    xml.push_str(&format!("<port_range>{}</port_range>", escape(range)));
                }
                xml.push_str("</create_target>");
                xml
            }
            GmpCommand::CreateTask {
                name,
                config_id,
                target_id,
            } => format!(
                "<create_task><name>{}</name><config id=\"{}\"/><target id=\"{}\"/></create_task>",
                escape(name.as_str()),
                escape(config_id.as_str()),
                escape(target_id.as_str())
            ),
            GmpCommand::StartTask { task_id } => {
                format!("<start_task task_id=\"{}\"/>", escape(task_id.as_str()))
            }
            GmpCommand::GetTaskStatus { task_id } => format!(
                "<get_tasks task_id=\"{}\" details=\"1\"/>",
                escape(task_id.as_str())
            ),
            GmpCommand::GetReport { report_id } => format!(
                "<get_reports report_id=\"{}\" details=\"1\"/>",
                escape(report_id.as_str())
            ),
        }
    }
}
