// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Scanner Option Compiler
 * Turns a sparse scan request into a deterministic nmap argument vector
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary - Enterprise Edition
 */

use crate::errors::{GatewayError, GatewayResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Timing template, `-T0` (paranoid) through `-T5` (insane)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Timing {
    T0,
    T1,
    #[default]
    T2,
    T3,
    T4,
    T5,
}

impl Timing {
    pub const ALLOWED: &'static [&'static str] = &["T0", "T1", "T2", "T3", "T4", "T5"];

    pub fn parse(token: &str) -> GatewayResult<Self> {
        match token {
            "T0" => Ok(Timing::T0),
            "T1" => Ok(Timing::T1),
            "T2" => Ok(Timing::T2),
            "T3" => Ok(Timing::T3),
            "T4" => Ok(Timing::T4),
            "T5" => Ok(Timing::T5),
            other => Err(GatewayError::invalid_option(
                "timing",
                other,
                format!("must be one of {}", Self::ALLOWED.join(", ")),
            )),
        }
    }

    pub fn token(self) -> &'static str {
        match self {
            Timing::T0 => "T0",
            Timing::T1 => "T1",
            Timing::T2 => "T2",
            Timing::T3 => "T3",
            Timing::T4 => "T4",
            Timing::T5 => "T5",
        }
    }

    pub fn flag(self) -> String {
        format!("-{}", self.token())
    }
}

impl fmt::Display for Timing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Scan technique
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScanMode {
    Ping,
    TcpSyn,
    TcpConnect,
    Udp,
    TcpAck,
    TcpFin,
    TcpNull,
    TcpXmas,
}

impl ScanMode {
    pub const ALLOWED: &'static [&'static str] = &[
        "ping",
        "tcp_syn",
        "tcp_connect",
        "udp",
        "tcp_ack",
        "tcp_fin",
        "tcp_null",
        "tcp_xmas",
    ];

    pub fn parse(token: &str) -> GatewayResult<Self> {
        match token {
            "ping" => Ok(ScanMode::Ping),
            "tcp_syn" => Ok(ScanMode::TcpSyn),
            "tcp_connect" => Ok(ScanMode::TcpConnect),
            "udp" => Ok(ScanMode::Udp),
            "tcp_ack" => Ok(ScanMode::TcpAck),
            "tcp_fin" => Ok(ScanMode::TcpFin),
            "tcp_null" => Ok(ScanMode::TcpNull),
            "tcp_xmas" => Ok(ScanMode::TcpXmas),
            other => Err(GatewayError::invalid_option(
                "scan_type",
                other,
                format!("must be one of {}", Self::ALLOWED.join(", ")),
            )),
        }
    }

    pub fn token(self) -> &'static str {
        match self {
            ScanMode::Ping => "ping",
            ScanMode::TcpSyn => "tcp_syn",
            ScanMode::TcpConnect => "tcp_connect",
            ScanMode::Udp => "udp",
            ScanMode::TcpAck => "tcp_ack",
            ScanMode::TcpFin => "tcp_fin",
            ScanMode::TcpNull => "tcp_null",
            ScanMode::TcpXmas => "tcp_xmas",
        }
    }

    pub fn flag(self) -> &'static str {
        match self {
            ScanMode::Ping => "-sn",
            ScanMode::TcpSyn => "-sS",
            ScanMode::TcpConnect => "-sT",
            ScanMode::Udp => "-sU",
            ScanMode::TcpAck => "-sA",
            ScanMode::TcpFin => "-sF",
            ScanMode::TcpNull => "-sN",
            ScanMode::TcpXmas => "-sX",
        }
    }
}

/// Report format written to stdout. `Normal` is nmap's own default and adds no flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    Normal,
    Xml,
    Json,
    Greppable,
    All,
}

impl OutputFormat {
    pub const ALLOWED: &'static [&'static str] = &["normal", "xml", "json", "greppable", "all"];

    pub fn parse(token: &str) -> GatewayResult<Self> {
        match token {
            "normal" => Ok(OutputFormat::Normal),
            "xml" => Ok(OutputFormat::Xml),
            "json" => Ok(OutputFormat::Json),
            "greppable" => Ok(OutputFormat::Greppable),
            "all" => Ok(OutputFormat::All),
            other => Err(GatewayError::invalid_option(
                "output_format",
                other,
                format!("must be one of {}", Self::ALLOWED.join(", ")),
            )),
        }
    }

    pub fn token(self) -> &'static str {
        match self {
            OutputFormat::Normal => "normal",
            OutputFormat::Xml => "xml",
            OutputFormat::Json => "json",
            OutputFormat::Greppable => "greppable",
            OutputFormat::All => "all",
        }
    }

    pub fn flag(self) -> Option<&'static str> {
        match self {
            OutputFormat::Normal => None,
            OutputFormat::Xml => Some("-oX"),
            OutputFormat::Json => Some("-oJ"),
            OutputFormat::Greppable => Some("-oG"),
            OutputFormat::All => Some("-oA"),
        }
    }
}

/// Evasion options. Unknown keys are rejected at decode time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StealthOptions {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub decoys: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interface: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u8>,
    pub randomize_hosts: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spoof_ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spoof_mac: Option<String>,
    pub fragment_packets: bool,
}

impl StealthOptions {
    fn append_args(&self, args: &mut Vec<String>) -> GatewayResult<()> {
        let decoys: Vec<&str> = self
            .decoys
            .iter()
            .map(|d| d.trim())
            .filter(|d| !d.is_empty())
            .collect();
        if !decoys.is_empty() {
            let joined = decoys.join(",");
            reject_dash("stealth_options.decoys", &joined)?;
            args.push("-D".to_string());
            args.push(joined);
        }

        if let Some(port) = self.source_port {
            args.push("--source-port".to_string());
            args.push(port.to_string());
        }

        if let Some(interface) = non_empty(&self.interface) {
            reject_dash("stealth_options.interface", interface)?;
            args.push("-e".to_string());
            args.push(interface.to_string());
        }

        if let Some(ttl) = self.ttl {
            args.push("--ttl".to_string());
            args.push(ttl.to_string());
        }

        if self.randomize_hosts {
            args.push("--randomize-hosts".to_string());
        }

        if let Some(ip) = non_empty(&self.spoof_ip) {
            reject_dash("stealth_options.spoof_ip", ip)?;
            args.push("-S".to_string());
            args.push(ip.to_string());
        }

        if let Some(mac) = non_empty(&self.spoof_mac) {
            reject_dash("stealth_options.spoof_mac", mac)?;
            args.push("--spoof-mac".to_string());
            args.push(mac.to_string());
        }

        if self.fragment_packets {
            args.push("-f".to_string());
        }

        Ok(())
    }
}

/// Sparse scan options as they arrive on the wire.
///
/// An absent or empty field adds nothing to the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timing: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scan_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ports: Option<String>,
    pub service_detection: bool,
    pub os_detection: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scripts: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_format: Option<String>,
    pub aggressive: bool,
    pub traceroute: bool,
    pub flag_o: bool,
    pub flag_sc: bool,
    pub flag_sv: bool,
    pub flag_traceroute: bool,
    pub flag_a: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stealth_options: Option<StealthOptions>,
}

/// Body of a scan request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRequest {
    #[serde(default)]
    pub target: String,
    #[serde(flatten)]
    pub options: ScanOptions,
}

impl ScanRequest {
    pub fn new(target: impl Into<String>, options: ScanOptions) -> Self {
        Self {
            target: target.into(),
            options,
        }
    }

    pub fn compile(&self) -> GatewayResult<Vec<String>> {
        compile_args(&self.options, &self.target)
    }
}

/// Compile `options` and `target` into an nmap argument vector.
///
/// The timing flag is always first and the trimmed target always last.
/// Validation happens before anything is emitted, so a failure never
/// yields a partial vector.
pub fn compile_args(options: &ScanOptions, target: &str) -> GatewayResult<Vec<String>> {
    let target = target.trim();
    if target.is_empty() {
        return Err(GatewayError::MissingRequiredField("target"));
    }
    reject_dash("target", target)?;

    let timing = match non_empty(&options.timing) {
        Some(token) => Timing::parse(token)?,
        None => Timing::default(),
    };
    let mode = non_empty(&options.scan_type).map(ScanMode::parse).transpose()?;
    let output = non_empty(&options.output_format)
        .map(OutputFormat::parse)
        .transpose()?;

    let mut args = vec![timing.flag()];

    if let Some(mode) = mode {
        args.push(mode.flag().to_string());
    }

    if let Some(ports) = non_empty(&options.ports) {
        if ports.eq_ignore_ascii_case("all") {
            args.push("-p-".to_string());
        } else {
            // nmap consumes the value after -p verbatim, so "-1024" is a range
            args.push("-p".to_string());
            args.push(ports.to_string());
        }
    }

    if options.service_detection || options.flag_sv {
        args.push("-sV".to_string());
    }

    if options.os_detection || options.flag_o {
        args.push("-O".to_string());
    }

    if let Some(scripts) = non_empty(&options.scripts) {
        reject_dash("scripts", scripts)?;
        args.push("--script".to_string());
        args.push(scripts.to_string());
    }

    // "-" keeps the report on stdout so the target is not taken as a filename
    if let Some(flag) = output.and_then(OutputFormat::flag) {
        args.push(flag.to_string());
        args.push("-".to_string());
    }

    if options.flag_sc {
        args.push("-sC".to_string());
    }

    if options.flag_traceroute {
        args.push("--traceroute".to_string());
    }

    let aggressive = options.flag_a || options.aggressive;
    if aggressive {
        args.push("-A".to_string());
    }

    if options.traceroute && !options.flag_traceroute && !aggressive {
        args.push("--traceroute".to_string());
    }

    if let Some(stealth) = &options.stealth_options {
        stealth.append_args(&mut args)?;
    }

    args.push(target.to_string());
    Ok(args)
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn reject_dash(field: &'static str, value: &str) -> GatewayResult<()> {
    if value.starts_with('-') {
        return Err(GatewayError::invalid_option(
            field,
            value,
            "must not start with '-'",
        ));
    }
    Ok(())
}
