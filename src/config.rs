use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::errors::{WebScoutError, WebScoutResult};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ExploreConfig {
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub stuck: StuckConfig,
    #[serde(default)]
    pub normalizer: NormalizerConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
}

/// Element scoring weights. These are policy constants, not derived truths:
/// hosts tune them per target application and tests pin their own fixtures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    #[serde(default = "default_weight_button")]
    pub weight_button: i64,
    #[serde(default = "default_weight_link")]
    pub weight_link: i64,
    #[serde(default = "default_weight_input")]
    pub weight_input: i64,
    #[serde(default = "default_weight_select")]
    pub weight_select: i64,
    #[serde(default = "default_weight_textarea")]
    pub weight_textarea: i64,
    #[serde(default = "default_weight_generic")]
    pub weight_generic: i64,
    /// Bonus for a non-empty visible text or aria-label.
    #[serde(default = "default_bonus_labeled")]
    pub bonus_labeled: i64,
    /// Bonus for input fields whose type suits synthetic data generation.
    #[serde(default = "default_bonus_input_affinity")]
    pub bonus_input_affinity: i64,
    /// Input types eligible for the affinity bonus (and for `type` actions).
    #[serde(default = "default_affinity_types")]
    pub affinity_types: Vec<String>,
}

fn default_weight_button() -> i64 {
    40
}
fn default_weight_link() -> i64 {
    30
}
fn default_weight_input() -> i64 {
    35
}
fn default_weight_select() -> i64 {
    25
}
fn default_weight_textarea() -> i64 {
    25
}
fn default_weight_generic() -> i64 {
    10
}
fn default_bonus_labeled() -> i64 {
    10
}
fn default_bonus_input_affinity() -> i64 {
    15
}
fn default_affinity_types() -> Vec<String> {
    vec!["email".into(), "text".into(), "search".into()]
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weight_button: default_weight_button(),
            weight_link: default_weight_link(),
            weight_input: default_weight_input(),
            weight_select: default_weight_select(),
            weight_textarea: default_weight_textarea(),
            weight_generic: default_weight_generic(),
            bonus_labeled: default_bonus_labeled(),
            bonus_input_affinity: default_bonus_input_affinity(),
            affinity_types: default_affinity_types(),
        }
    }
}

impl ScoringConfig {
    pub fn tag_weight(&self, tag: &str) -> i64 {
        match tag {
            "button" => self.weight_button,
            "a" => self.weight_link,
            "input" => self.weight_input,
            "select" => self.weight_select,
            "textarea" => self.weight_textarea,
            _ => self.weight_generic,
        }
    }

    pub fn has_affinity(&self, input_type: &str) -> bool {
        self.affinity_types.iter().any(|t| t == input_type)
    }
}

/// Recovery escalation thresholds over the session's stuck counter.
/// Scroll is the base recovery below `back_after`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StuckConfig {
    #[serde(default = "default_back_after")]
    pub back_after: u32,
    #[serde(default = "default_exhaust_after")]
    pub exhaust_after: u32,
}

fn default_back_after() -> u32 {
    3
}
fn default_exhaust_after() -> u32 {
    5
}

impl Default for StuckConfig {
    fn default() -> Self {
        Self {
            back_after: default_back_after(),
            exhaust_after: default_exhaust_after(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizerConfig {
    /// Query parameters dropped by exact name.
    #[serde(default = "default_drop_params")]
    pub drop_params: Vec<String>,
    /// Query parameters dropped by prefix match (e.g. "utm_").
    #[serde(default = "default_drop_param_prefixes")]
    pub drop_param_prefixes: Vec<String>,
    /// Minimum rendered size (px) below which an element is ignored.
    #[serde(default = "default_min_element_size")]
    pub min_element_size: f64,
    /// Upper bound on candidates considered per step.
    #[serde(default = "default_max_candidates")]
    pub max_candidates: usize,
}

fn default_drop_params() -> Vec<String> {
    vec![
        "gclid".into(),
        "fbclid".into(),
        "msclkid".into(),
        "ref".into(),
        "sessionid".into(),
    ]
}
fn default_drop_param_prefixes() -> Vec<String> {
    vec!["utm_".into()]
}
fn default_min_element_size() -> f64 {
    4.0
}
fn default_max_candidates() -> usize {
    30
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            drop_params: default_drop_params(),
            drop_param_prefixes: default_drop_param_prefixes(),
            min_element_size: default_min_element_size(),
            max_candidates: default_max_candidates(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Default step budget for autonomous runs.
    #[serde(default = "default_max_steps")]
    pub max_steps: u32,
    /// Terminal sessions older than this are eligible for sweep().
    #[serde(default = "default_retention_minutes")]
    pub retention_minutes: u32,
}

fn default_max_steps() -> u32 {
    25
}
fn default_retention_minutes() -> u32 {
    60
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            retention_minutes: default_retention_minutes(),
        }
    }
}

fn resolve_config_path() -> WebScoutResult<PathBuf> {
    if let Ok(exe) = std::env::current_exe() {
        if let Some(parent) = exe.parent() {
            let candidate = parent.join("webscout.toml");
            if candidate.exists() {
                tracing::debug!(path = %candidate.display(), "config found next to executable");
                return Ok(candidate);
            }
        }
    }

    let cwd = std::env::current_dir()?;
    let candidate = cwd.join("webscout.toml");
    if candidate.exists() {
        tracing::debug!(path = %candidate.display(), "config found in working directory");
        return Ok(candidate);
    }

    Err(WebScoutError::Config(
        "webscout.toml not found next to executable or in working directory".into(),
    ))
}

pub fn load_config() -> WebScoutResult<ExploreConfig> {
    let path = resolve_config_path()?;
    load_config_from(&path)
}

pub fn load_config_from(path: &std::path::Path) -> WebScoutResult<ExploreConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: ExploreConfig = toml::from_str(&content)?;
    tracing::info!(path = %path.display(), "config loaded");
    Ok(config)
}

pub fn save_config_to(config: &ExploreConfig, path: &std::path::Path) -> WebScoutResult<()> {
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    tracing::info!(path = %path.display(), "config saved");
    Ok(())
}
