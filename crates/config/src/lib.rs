//! Configuration loader for benchmark runs
//!
//! Loads and parses TOML configuration files

use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::fs;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum SourceKind {
    #[serde(rename = "synthetic")]
    Synthetic,
    #[serde(rename = "image_dir")]
    ImageDir,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum PatternKind {
    #[serde(rename = "gradient")]
    Gradient,
    #[serde(rename = "checker")]
    Checker,
}

impl Default for PatternKind {
    fn default() -> Self {
        PatternKind::Gradient
    }
}

/// Identity of the run: who measured, under which benchmark phase, with
/// which model. These strings go verbatim into the persisted record.
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityConfig {
    pub platform: String,
    pub phase: String,
    #[serde(default = "default_model")]
    pub model: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub kind: SourceKind,
    #[serde(default = "default_frame_width")]
    pub width: u32,
    #[serde(default = "default_frame_height")]
    pub height: u32,
    #[serde(default)]
    pub pattern: PatternKind,
    /// Directory of still images, required for kind = "image_dir"
    pub dir: Option<String>,
    #[serde(default = "default_loop_frames")]
    pub loop_frames: bool,
}

/// One named stage of the per-frame workload. Which stages exist is
/// platform-specific: a discrete GPU lists h2d/d2h transfer stages, a
/// unified-memory platform does not.
#[derive(Debug, Clone, Deserialize)]
pub struct StageConfig {
    pub name: String,
    /// Simulated busy time for the synthetic workload, in milliseconds
    #[serde(default = "default_busy_ms")]
    pub busy_ms: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunBudget {
    #[serde(default = "default_duration_seconds")]
    pub duration_seconds: u64,
    /// 0 means no frame limit; the duration governs
    #[serde(default)]
    pub max_frames: u64,
    #[serde(default = "default_max_consecutive_errors")]
    pub max_consecutive_errors: u32,
    #[serde(default = "default_stats_print_interval")]
    pub stats_print_interval: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SamplingConfig {
    #[serde(default = "default_sampling_enable")]
    pub enable: bool,
    #[serde(default = "default_sampling_interval_ms")]
    pub interval_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_record_path")]
    pub record_path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    pub identity: IdentityConfig,
    pub source: SourceConfig,
    pub stages: Vec<StageConfig>,
    #[serde(default)]
    pub run: RunBudget,
    #[serde(default)]
    pub sampling: SamplingConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

// Default value functions
fn default_model() -> String {
    "yolov8n".to_string()
}
fn default_frame_width() -> u32 {
    640
}
fn default_frame_height() -> u32 {
    480
}
fn default_loop_frames() -> bool {
    true
}
fn default_busy_ms() -> f64 {
    1.0
}
fn default_duration_seconds() -> u64 {
    30
}
fn default_max_consecutive_errors() -> u32 {
    10
}
fn default_stats_print_interval() -> u64 {
    30
}
fn default_sampling_enable() -> bool {
    true
}
fn default_sampling_interval_ms() -> u64 {
    500
}
fn default_record_path() -> String {
    "results/run.json".to_string()
}

impl Default for RunBudget {
    fn default() -> Self {
        Self {
            duration_seconds: default_duration_seconds(),
            max_frames: 0,
            max_consecutive_errors: default_max_consecutive_errors(),
            stats_print_interval: default_stats_print_interval(),
        }
    }
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            enable: default_sampling_enable(),
            interval_ms: default_sampling_interval_ms(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            record_path: default_record_path(),
        }
    }
}

pub fn load_config(path: &str) -> Result<RunConfig> {
    let content = fs::read_to_string(path)
        .map_err(|e| anyhow!("Failed to read config file '{}': {}", path, e))?;

    let config: RunConfig = toml::from_str(&content)
        .map_err(|e| anyhow!("Failed to parse config file '{}': {}", path, e))?;

    validate(&config)?;
    Ok(config)
}

fn validate(config: &RunConfig) -> Result<()> {
    if config.identity.platform.is_empty() {
        return Err(anyhow!("identity.platform must not be empty"));
    }
    if config.identity.phase.is_empty() {
        return Err(anyhow!("identity.phase must not be empty"));
    }
    if config.stages.is_empty() {
        return Err(anyhow!("at least one stage must be configured"));
    }
    if config.run.duration_seconds == 0 && config.run.max_frames == 0 {
        return Err(anyhow!(
            "run budget is unbounded: set duration_seconds or max_frames"
        ));
    }
    if config.source.kind == SourceKind::ImageDir && config.source.dir.is_none() {
        return Err(anyhow!("source.dir is required for kind = \"image_dir\""));
    }
    Ok(())
}
