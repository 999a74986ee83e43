// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

pub mod core;
pub mod loader;
pub mod validation;

pub use core::{AppConfig, EngineConfig, ObservabilityConfig, ScannerConfig, ServerConfig};

pub use loader::{ConfigFormat, ConfigLoader};

pub use validation::{ConfigValidator, ValidationReport};

use anyhow::Result;
use std::path::Path;

/// Load configuration from `config_path` when given, otherwise from the
/// environment alone. The result is always validated.
pub fn load_app_config(config_path: Option<&Path>) -> Result<AppConfig> {
    let config = match config_path {
        Some(path) => ConfigLoader::new(path)?.load_config()?,
        None => {
            let config = AppConfig::from_env()?;
            ConfigValidator::validate_app_config(&config)?;
            config
        }
    };

    Ok(config)
}
