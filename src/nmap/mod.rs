// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

pub mod options;
pub mod presets;
pub mod scanner;

pub use options::{compile_args, OutputFormat, ScanMode, ScanOptions, ScanRequest, StealthOptions, Timing};
pub use presets::{PresetRequest, ScanPreset, StealthLevel};
pub use scanner::{NmapScanner, ScanResult};
