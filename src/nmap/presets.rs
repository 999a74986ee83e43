// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

use super::options::{ScanMode, ScanOptions, ScanRequest, StealthOptions, Timing};
use serde::{Deserialize, Serialize};

/// Timing used by presets that let the caller pick one
const QUICK_PRESET_TIMING: Timing = Timing::T4;

/// How hard a stealth preset tries to stay under the radar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StealthLevel {
    Low,
    #[default]
    Medium,
    High,
    Maximum,
}

impl StealthLevel {
    fn timing(self) -> Timing {
        match self {
            StealthLevel::Low => Timing::T3,
            StealthLevel::Medium => Timing::T2,
            StealthLevel::High => Timing::T1,
            StealthLevel::Maximum => Timing::T0,
        }
    }

    fn ttl(self) -> Option<u8> {
        match self {
            StealthLevel::Low => None,
            StealthLevel::Medium => Some(64),
            StealthLevel::High => Some(128),
            StealthLevel::Maximum => Some(255),
        }
    }

    fn decoys(self) -> &'static [&'static str] {
        match self {
            StealthLevel::Low => &[],
            StealthLevel::Medium => &["RND:5", "ME"],
            StealthLevel::High => &["RND:10", "8.8.8.8", "ME"],
            StealthLevel::Maximum => &["RND:15", "8.8.8.8", "1.1.1.1", "ME"],
        }
    }
}

fn default_stealth_scan_type() -> String {
    ScanMode::TcpSyn.token().to_string()
}

fn default_true() -> bool {
    true
}

/// Named scan recipes that expand into regular [`ScanOptions`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "preset", rename_all = "snake_case")]
pub enum ScanPreset {
    PingSweep,
    CommonPorts,
    ServiceDetection,
    VulnScan,
    Comprehensive {
        #[serde(default)]
        include_vuln: bool,
    },
    NetworkDiscovery,
    Stealth {
        #[serde(default, alias = "stealth_level")]
        level: StealthLevel,
        #[serde(default = "default_stealth_scan_type")]
        scan_type: String,
        #[serde(default = "default_true")]
        use_decoys: bool,
        #[serde(default)]
        fragment_packets: bool,
    },
}

impl ScanPreset {
    /// Whether a caller-supplied timing replaces the preset's own
    pub fn accepts_timing_override(&self) -> bool {
        !matches!(self, ScanPreset::Comprehensive { .. } | ScanPreset::Stealth { .. })
    }

    /// Expand into scan options. `timing` is honoured only when
    /// [`accepts_timing_override`](Self::accepts_timing_override) holds.
    pub fn expand(&self, timing: Option<&str>) -> ScanOptions {
        let override_timing = timing
            .map(str::trim)
            .filter(|t| !t.is_empty() && self.accepts_timing_override())
            .map(str::to_string);
        let quick_timing = || Some(override_timing.clone().unwrap_or_else(|| QUICK_PRESET_TIMING.token().to_string()));

        match self {
            ScanPreset::PingSweep => ScanOptions {
                timing: quick_timing(),
                scan_type: Some(ScanMode::Ping.token().to_string()),
                ..Default::default()
            },
            ScanPreset::CommonPorts => ScanOptions {
                timing: quick_timing(),
                scan_type: Some(ScanMode::TcpSyn.token().to_string()),
                ports: Some("1-1000".to_string()),
                service_detection: true,
                ..Default::default()
            },
            ScanPreset::ServiceDetection => ScanOptions {
                timing: quick_timing(),
                scan_type: Some(ScanMode::TcpSyn.token().to_string()),
                service_detection: true,
                os_detection: true,
                ..Default::default()
            },
            ScanPreset::VulnScan => ScanOptions {
                timing: quick_timing(),
                scan_type: Some(ScanMode::TcpSyn.token().to_string()),
                service_detection: true,
                scripts: Some("vuln".to_string()),
                ..Default::default()
            },
            ScanPreset::Comprehensive { include_vuln } => ScanOptions {
                timing: Some(Timing::T3.token().to_string()),
                scan_type: Some(ScanMode::TcpSyn.token().to_string()),
                ports: Some("1-65535".to_string()),
                service_detection: true,
                os_detection: true,
                scripts: Some(if *include_vuln { "default,vuln" } else { "default" }.to_string()),
                output_format: Some("xml".to_string()),
                ..Default::default()
            },
            ScanPreset::NetworkDiscovery => ScanOptions {
                timing: quick_timing(),
                scan_type: Some(ScanMode::Ping.token().to_string()),
                ports: Some("22,80,443,3389,8080".to_string()),
                ..Default::default()
            },
            ScanPreset::Stealth {
                level,
                scan_type,
                use_decoys,
                fragment_packets,
            } => {
                let decoys = if *use_decoys {
                    level.decoys().iter().map(|d| d.to_string()).collect()
                } else {
                    Vec::new()
                };
                let stealth = StealthOptions {
                    decoys,
                    ttl: level.ttl(),
                    fragment_packets: *fragment_packets,
                    ..Default::default()
                };

                ScanOptions {
                    timing: Some(level.timing().token().to_string()),
                    scan_type: Some(scan_type.clone()),
                    stealth_options: (stealth != StealthOptions::default()).then_some(stealth),
                    ..Default::default()
                }
            }
        }
    }
}

/// Body of a preset scan request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresetRequest {
    #[serde(default)]
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timing: Option<String>,
    #[serde(flatten)]
    pub preset: ScanPreset,
}

impl PresetRequest {
    pub fn into_scan_request(self) -> ScanRequest {
        let options = self.preset.expand(self.timing.as_deref());
        ScanRequest::new(self.target, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(preset: ScanPreset, timing: Option<&str>) -> Vec<String> {
        ScanRequest::new("10.0.0.0/24", preset.expand(timing))
            .compile()
            .unwrap()
    }

    #[test]
    fn test_ping_sweep_defaults_to_t4() {
        assert_eq!(compile(ScanPreset::PingSweep, None), vec!["-T4", "-sn", "10.0.0.0/24"]);
    }

    #[test]
    fn test_caller_timing_overrides_quick_preset() {
        assert_eq!(
            compile(ScanPreset::CommonPorts, Some("T3")),
            vec!["-T3", "-sS", "-p", "1-1000", "-sV", "10.0.0.0/24"]
        );
    }

    #[test]
    fn test_comprehensive_keeps_own_timing() {
        assert_eq!(
            compile(ScanPreset::Comprehensive { include_vuln: true }, Some("T5")),
            vec![
                "-T3", "-sS", "-p", "1-65535", "-sV", "-O", "--script", "default,vuln", "-oX",
                "-", "10.0.0.0/24"
            ]
        );
    }

    #[test]
    fn test_network_discovery_ports() {
        assert_eq!(
            compile(ScanPreset::NetworkDiscovery, None),
            vec!["-T4", "-sn", "-p", "22,80,443,3389,8080", "10.0.0.0/24"]
        );
    }

    #[test]
    fn test_stealth_levels() {
        let high = ScanPreset::Stealth {
            level: StealthLevel::High,
            scan_type: "tcp_fin".to_string(),
            use_decoys: true,
            fragment_packets: true,
        };
        assert_eq!(
            compile(high, Some("T5")),
            vec![
                "-T1", "-sF", "-D", "RND:10,8.8.8.8,ME", "--ttl", "128", "-f", "10.0.0.0/24"
            ]
        );

        let low = ScanPreset::Stealth {
            level: StealthLevel::Low,
            scan_type: "tcp_syn".to_string(),
            use_decoys: true,
            fragment_packets: false,
        };
        assert_eq!(compile(low, None), vec!["-T3", "-sS", "10.0.0.0/24"]);
    }

    #[test]
    fn test_stealth_without_decoys() {
        let options = ScanPreset::Stealth {
            level: StealthLevel::Maximum,
            scan_type: "tcp_null".to_string(),
            use_decoys: false,
            fragment_packets: false,
        }
        .expand(None);

        let stealth = options.stealth_options.unwrap();
        assert!(stealth.decoys.is_empty());
        assert_eq!(stealth.ttl, Some(255));
    }

    #[test]
    fn test_preset_request_decoding() {
        let request: PresetRequest = serde_json::from_str(
            r#"{"target": "10.0.0.5", "preset": "stealth", "level": "maximum"}"#,
        )
        .unwrap();

        match &request.preset {
            ScanPreset::Stealth {
                level,
                scan_type,
                use_decoys,
                ..
            } => {
                assert_eq!(*level, StealthLevel::Maximum);
                assert_eq!(scan_type, "tcp_syn");
                assert!(*use_decoys);
            }
            other => panic!("unexpected preset {:?}", other),
        }

        let args = request.into_scan_request().compile().unwrap();
        assert_eq!(args[0], "-T0");
        assert_eq!(args.last().map(String::as_str), Some("10.0.0.5"));
    }

    #[test]
    fn test_stealth_level_field_name_accepted() {
        let request: PresetRequest = serde_json::from_str(
            r#"{"target": "10.0.0.5", "preset": "stealth", "stealth_level": "high"}"#,
        )
        .unwrap();

        assert!(matches!(
            request.preset,
            ScanPreset::Stealth { level: StealthLevel::High, .. }
        ));
        assert_eq!(request.into_scan_request().compile().unwrap()[0], "-T1");
    }

    #[test]
    fn test_unknown_preset_rejected() {
        let result: Result<PresetRequest, _> =
            serde_json::from_str(r#"{"target": "10.0.0.5", "preset": "full_send"}"#);
        assert!(result.is_err());
    }
}
