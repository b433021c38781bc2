//! TOML configuration.
//!
//! Every section is optional; a missing section (or a missing config file,
//! via [`Config::minimal`]) falls back to the documented defaults.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub sampling: SamplingConfig,
    #[serde(default)]
    pub parser: ParserConfig,
    #[serde(default)]
    pub streams: StreamsConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

impl Config {
    /// All-defaults configuration, used when no config file exists.
    pub fn minimal() -> Self {
        Self::default()
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScanConfig {
    /// Ceiling applied to each category's file list, in discovery order.
    #[serde(default = "default_max_files_per_category")]
    pub max_files_per_category: usize,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default)]
    pub follow_symlinks: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_files_per_category: default_max_files_per_category(),
            exclude_globs: Vec::new(),
            follow_symlinks: false,
        }
    }
}

fn default_max_files_per_category() -> usize {
    20
}

#[derive(Debug, Deserialize, Clone)]
pub struct SamplingConfig {
    #[serde(default = "default_structure_lines")]
    pub structure_lines: usize,
    #[serde(default = "default_chunk_chars")]
    pub chunk_chars: usize,
    #[serde(default = "default_config_max_chars")]
    pub config_max_chars: usize,
    #[serde(default = "default_substructure_entries")]
    pub substructure_entries: usize,
    #[serde(default = "default_max_samples_per_bundle")]
    pub max_samples_per_bundle: usize,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            structure_lines: default_structure_lines(),
            chunk_chars: default_chunk_chars(),
            config_max_chars: default_config_max_chars(),
            substructure_entries: default_substructure_entries(),
            max_samples_per_bundle: default_max_samples_per_bundle(),
        }
    }
}

fn default_structure_lines() -> usize {
    50
}
fn default_chunk_chars() -> usize {
    3000
}
fn default_config_max_chars() -> usize {
    2000
}
fn default_substructure_entries() -> usize {
    3
}
fn default_max_samples_per_bundle() -> usize {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct ParserConfig {
    #[serde(default = "default_max_records")]
    pub max_records: usize,
    /// Analysis texts at or below this length never produce a fallback record.
    #[serde(default = "default_fallback_floor")]
    pub fallback_floor: usize,
    #[serde(default = "default_fallback_prefix_chars")]
    pub fallback_prefix_chars: usize,
    /// Example lines kept per data-discovery pattern.
    #[serde(default = "default_max_examples")]
    pub max_examples: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            max_records: default_max_records(),
            fallback_floor: default_fallback_floor(),
            fallback_prefix_chars: default_fallback_prefix_chars(),
            max_examples: default_max_examples(),
        }
    }
}

fn default_max_records() -> usize {
    5
}
fn default_fallback_floor() -> usize {
    100
}
fn default_fallback_prefix_chars() -> usize {
    200
}
fn default_max_examples() -> usize {
    3
}

#[derive(Debug, Deserialize, Clone)]
pub struct StreamsConfig {
    #[serde(default = "default_max_files_per_feature")]
    pub max_files_per_feature: usize,
    #[serde(default = "default_min_file_bytes")]
    pub min_file_bytes: u64,
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,
    #[serde(default = "default_min_content_chars")]
    pub min_content_chars: usize,
    #[serde(default = "default_max_images")]
    pub max_images: usize,
    #[serde(default = "default_max_binary_docs")]
    pub max_binary_docs: usize,
    #[serde(default = "default_max_logs")]
    pub max_logs: usize,
    #[serde(default = "default_log_read_bytes")]
    pub log_read_bytes: usize,
}

impl Default for StreamsConfig {
    fn default() -> Self {
        Self {
            max_files_per_feature: default_max_files_per_feature(),
            min_file_bytes: default_min_file_bytes(),
            max_file_bytes: default_max_file_bytes(),
            min_content_chars: default_min_content_chars(),
            max_images: default_max_images(),
            max_binary_docs: default_max_binary_docs(),
            max_logs: default_max_logs(),
            log_read_bytes: default_log_read_bytes(),
        }
    }
}

fn default_max_files_per_feature() -> usize {
    5
}
fn default_min_file_bytes() -> u64 {
    100
}
fn default_max_file_bytes() -> u64 {
    50_000
}
fn default_min_content_chars() -> usize {
    50
}
fn default_max_images() -> usize {
    10
}
fn default_max_binary_docs() -> usize {
    5
}
fn default_max_logs() -> usize {
    10
}
fn default_log_read_bytes() -> usize {
    50_000
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    #[serde(default = "default_output_root")]
    pub root: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            root: default_output_root(),
        }
    }
}

fn default_output_root() -> PathBuf {
    PathBuf::from("./knowledge_library")
}

#[derive(Debug, Deserialize, Clone)]
pub struct AnalysisConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    /// Model used for image requests; falls back to `model`.
    #[serde(default)]
    pub vision_model: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            vision_model: None,
            url: None,
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout_secs(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}
fn default_timeout_secs() -> u64 {
    120
}
fn default_max_tokens() -> u32 {
    4096
}
fn default_temperature() -> f32 {
    0.1
}

impl AnalysisConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

/// Load `path` if it exists, otherwise fall back to [`Config::minimal`].
pub fn load_or_default(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        tracing::debug!("no config at {}, using defaults", path.display());
        Ok(Config::minimal())
    }
}

pub fn validate(config: &Config) -> Result<()> {
    if config.scan.max_files_per_category == 0 {
        anyhow::bail!("scan.max_files_per_category must be > 0");
    }

    if config.sampling.chunk_chars == 0 || config.sampling.structure_lines == 0 {
        anyhow::bail!("sampling.chunk_chars and sampling.structure_lines must be > 0");
    }
    if config.sampling.substructure_entries == 0 {
        anyhow::bail!("sampling.substructure_entries must be > 0");
    }
    if config.sampling.max_samples_per_bundle == 0 {
        anyhow::bail!("sampling.max_samples_per_bundle must be > 0");
    }

    if config.parser.max_records == 0 {
        anyhow::bail!("parser.max_records must be > 0");
    }

    if config.streams.min_file_bytes >= config.streams.max_file_bytes {
        anyhow::bail!("streams.min_file_bytes must be < streams.max_file_bytes");
    }

    match config.analysis.provider.as_str() {
        "disabled" | "openai" | "ollama" => {}
        other => anyhow::bail!(
            "Unknown analysis provider: '{}'. Must be disabled, openai, or ollama.",
            other
        ),
    }

    if config.analysis.is_enabled() && config.analysis.model.is_none() {
        anyhow::bail!(
            "analysis.model must be specified when provider is '{}'",
            config.analysis.provider
        );
    }

    Ok(())
}
