// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

use anyhow::{Context, Result};
use validator::Validate;

use super::core::AppConfig;

pub struct ConfigValidator;

#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

impl ConfigValidator {
    pub fn validate_app_config(config: &AppConfig) -> Result<()> {
        config.validate()
            .context("Configuration validation failed")?;

        Self::validate_engine_config(config)?;
        Self::validate_observability_config(config)?;

        Ok(())
    }

    fn validate_engine_config(config: &AppConfig) -> Result<()> {
        let engine = &config.engine;

        engine
            .port
            .trim()
            .parse::<u16>()
            .map_err(|_| anyhow::anyhow!("Engine port must be a number between 1 and 65535"))?;

        for (name, value) in [
            ("container runtime", &engine.container_runtime),
            ("container name", &engine.container_name),
            ("exec user", &engine.exec_user),
        ] {
            if value.trim().starts_with('-') {
                return Err(anyhow::anyhow!("Engine {} cannot start with '-'", name));
            }
        }

        Ok(())
    }

    fn validate_observability_config(config: &AppConfig) -> Result<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        let level = config.observability.log_level.to_lowercase();

        // Directive strings like "scan_gateway=debug" are passed to EnvFilter as-is
        if !level.contains('=') && !valid_levels.contains(&level.as_str()) {
            return Err(anyhow::anyhow!(
                "Invalid log level '{}'. Must be one of: {:?}",
                config.observability.log_level,
                valid_levels
            ));
        }

        Ok(())
    }

    pub fn generate_validation_report(config: &AppConfig) -> ValidationReport {
        let mut report = ValidationReport::default();

        if let Err(e) = Self::validate_app_config(config) {
            report.errors.push(format!("{:#}", e));
        }

        if !config.engine.has_password() {
            report.warnings.push(
                "GVM_PASSWORD is not set; engine endpoints will report a configuration error"
                    .to_string(),
            );
        }

        if config.scanner.scan_timeout_secs < 30 {
            report.warnings.push(format!(
                "Scan timeout of {}s is short for service or OS detection",
                config.scanner.scan_timeout_secs
            ));
        }

        if config.server.request_timeout_secs < config.scanner.scan_timeout_secs {
            report.warnings.push(format!(
                "Request timeout of {}s is shorter than the scan timeout of {}s; long scans will be cut off",
                config.server.request_timeout_secs, config.scanner.scan_timeout_secs
            ));
        }

        report
    }
}
