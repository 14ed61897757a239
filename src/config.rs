use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub harvest: HarvestConfig,
    #[serde(default)]
    pub budget: BudgetConfig,
    #[serde(default)]
    pub backends: BackendsConfig,
    #[serde(default)]
    pub stream: StreamConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HarvestConfig {
    /// Maximum posts scanned per channel before the cutoff check stops us.
    #[serde(default = "default_post_scan_limit")]
    pub post_scan_limit: usize,
    /// Maximum comments scanned from the channel-wide feed.
    #[serde(default = "default_comment_scan_limit")]
    pub comment_scan_limit: usize,
    /// How many comments make it into the reference corpus.
    #[serde(default = "default_comment_sample")]
    pub comment_sample: usize,
    /// Bound on "load more" placeholder expansions per comment tree.
    #[serde(default = "default_more_expansions")]
    pub more_expansions: usize,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            post_scan_limit: default_post_scan_limit(),
            comment_scan_limit: default_comment_scan_limit(),
            comment_sample: default_comment_sample(),
            more_expansions: default_more_expansions(),
        }
    }
}

fn default_post_scan_limit() -> usize {
    100
}
fn default_comment_scan_limit() -> usize {
    500
}
fn default_comment_sample() -> usize {
    10
}
fn default_more_expansions() -> usize {
    8
}

#[derive(Debug, Deserialize, Clone)]
pub struct BudgetConfig {
    /// Token ceiling a rendered prompt must fit under.
    #[serde(default = "default_max_input_tokens")]
    pub max_input_tokens: usize,
    /// Per-item character cap applied on the first truncating attempt.
    #[serde(default = "default_initial_item_cap")]
    pub initial_item_cap: usize,
    /// Floor below which the per-item cap never shrinks.
    #[serde(default = "default_min_item_cap")]
    pub min_item_cap: usize,
    /// Truncating attempts before the fitter gives up.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            max_input_tokens: default_max_input_tokens(),
            initial_item_cap: default_initial_item_cap(),
            min_item_cap: default_min_item_cap(),
            max_attempts: default_max_attempts(),
        }
    }
}

fn default_max_input_tokens() -> usize {
    8000
}
fn default_initial_item_cap() -> usize {
    500
}
fn default_min_item_cap() -> usize {
    50
}
fn default_max_attempts() -> u32 {
    3
}

#[derive(Debug, Deserialize, Clone)]
pub struct BackendsConfig {
    #[serde(default)]
    pub openai: OpenAiConfig,
    #[serde(default)]
    pub claude: ClaudeConfig,
    #[serde(default)]
    pub ollama: OllamaConfig,
    /// Per-request timeout applied to every backend call.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for BackendsConfig {
    fn default() -> Self {
        Self {
            openai: OpenAiConfig::default(),
            claude: ClaudeConfig::default(),
            ollama: OllamaConfig::default(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    120
}

#[derive(Debug, Deserialize, Clone)]
pub struct OpenAiConfig {
    #[serde(default = "default_openai_model")]
    pub model: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            model: default_openai_model(),
        }
    }
}

fn default_openai_model() -> String {
    "gpt-4o".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ClaudeConfig {
    #[serde(default = "default_claude_model")]
    pub model: String,
    #[serde(default = "default_claude_max_tokens")]
    pub max_tokens: u32,
}

impl Default for ClaudeConfig {
    fn default() -> Self {
        Self {
            model: default_claude_model(),
            max_tokens: default_claude_max_tokens(),
        }
    }
}

fn default_claude_model() -> String {
    "claude-sonnet-4-5-20250929".to_string()
}
fn default_claude_max_tokens() -> u32 {
    4096
}

#[derive(Debug, Deserialize, Clone)]
pub struct OllamaConfig {
    #[serde(default = "default_ollama_url")]
    pub url: String,
    #[serde(default = "default_ollama_model")]
    pub model: String,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            url: default_ollama_url(),
            model: default_ollama_model(),
        }
    }
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}
fn default_ollama_model() -> String {
    "gemma3:12b".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct StreamConfig {
    /// Default windowed rate: items per minute.
    #[serde(default = "default_per_minute")]
    pub per_minute: u32,
    /// Seconds between live-feed polls when the source has nothing new.
    #[serde(default = "default_poll_secs")]
    pub poll_secs: u64,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            per_minute: default_per_minute(),
            poll_secs: default_poll_secs(),
        }
    }
}

fn default_per_minute() -> u32 {
    30
}
fn default_poll_secs() -> u64 {
    2
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

/// Load configuration from a TOML file, falling back to defaults when the
/// file does not exist. Model ids and the Ollama URL can be overridden via
/// `OPENAI_SUMMARY_MODEL`, `CLAUDE_SUMMARY_MODEL`, `OLLAMA_MODEL`, and
/// `OLLAMA_URL`.
pub fn load_config(path: &Path) -> Result<Config> {
    let mut config: Config = if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content).with_context(|| "Failed to parse config file")?
    } else {
        Config::default()
    };

    if let Ok(model) = std::env::var("OPENAI_SUMMARY_MODEL") {
        config.backends.openai.model = model;
    }
    if let Ok(model) = std::env::var("CLAUDE_SUMMARY_MODEL") {
        config.backends.claude.model = model;
    }
    if let Ok(model) = std::env::var("OLLAMA_MODEL") {
        config.backends.ollama.model = model;
    }
    if let Ok(url) = std::env::var("OLLAMA_URL") {
        config.backends.ollama.url = url;
    }

    // Validate harvest
    if config.harvest.post_scan_limit == 0 {
        anyhow::bail!("harvest.post_scan_limit must be > 0");
    }
    if config.harvest.comment_scan_limit == 0 {
        anyhow::bail!("harvest.comment_scan_limit must be > 0");
    }

    // Validate budget
    if config.budget.max_input_tokens == 0 {
        anyhow::bail!("budget.max_input_tokens must be > 0");
    }
    if config.budget.max_attempts == 0 {
        anyhow::bail!("budget.max_attempts must be >= 1");
    }
    if config.budget.min_item_cap == 0 || config.budget.min_item_cap > config.budget.initial_item_cap
    {
        anyhow::bail!(
            "budget.min_item_cap must be in 1..=initial_item_cap ({})",
            config.budget.initial_item_cap
        );
    }

    // Validate stream
    if config.stream.per_minute == 0 {
        anyhow::bail!("stream.per_minute must be > 0");
    }

    Ok(config)
}
