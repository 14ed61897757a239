//! Summarization backend dispatch.
//!
//! Defines the [`Backend`] strategy enum and [`summarize`], the single entry
//! point that renders the corpus for the chosen backend, runs the budget
//! fitting loop, invokes the provider over blocking HTTP, and normalizes
//! every outcome into a [`SummaryResult`]:
//! - **OpenAI** — chat completions with one flattened `[n]`-referenced prompt.
//! - **Claude** — messages API with discrete labeled text blocks and an
//!   instruction to cite by label; its (label → URL) references are
//!   normalized into the same ordered shape the other path uses.
//! - **Ollama** — local `/api/chat` with the flattened prompt.
//!
//! No error crosses this boundary: a missing credential degrades to an
//! "unavailable" result, anything else to an "error" result carrying the
//! diagnostic.

use std::time::Duration;

use clap::ValueEnum;
use tracing::{debug, warn};

use crate::budget::{estimate_tokens, BudgetFitter};
use crate::config::{BackendsConfig, ClaudeConfig, Config, OllamaConfig, OpenAiConfig};
use crate::corpus::ReferenceCorpus;
use crate::error::DigestError;
use crate::models::SummaryResult;
use crate::prompt::{RenderStyle, Rendering};

const SYSTEM_PROMPT: &str = "You are a helpful assistant that summarizes Reddit content. \
    Include key themes, notable discussions, and overall sentiment. \
    Use numbered references [n] when mentioning specific posts or comments.";

const CITE_INSTRUCTION: &str = "Provide a comprehensive summary of this Reddit content. \
    Reference specific posts and comments by their labels (e.g. Post 1, Comment 2).";

/// Interchangeable summarization strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// OpenAI chat completions.
    #[value(name = "openai")]
    OpenAi,
    /// Anthropic messages with labeled content blocks.
    Claude,
    /// Local Ollama chat.
    Ollama,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::OpenAi => "openai",
            Backend::Claude => "claude",
            Backend::Ollama => "ollama",
        }
    }

    fn style(&self) -> RenderStyle {
        match self {
            Backend::Claude => RenderStyle::Blocks,
            Backend::OpenAi | Backend::Ollama => RenderStyle::Flat,
        }
    }

    fn model<'a>(&self, backends: &'a BackendsConfig) -> &'a str {
        match self {
            Backend::OpenAi => &backends.openai.model,
            Backend::Claude => &backends.claude.model,
            Backend::Ollama => &backends.ollama.model,
        }
    }

    /// Environment variable holding the backend's credential, if it needs
    /// one.
    fn credential_var(&self) -> Option<&'static str> {
        match self {
            Backend::OpenAi => Some("OPENAI_API_KEY"),
            Backend::Claude => Some("ANTHROPIC_API_KEY"),
            Backend::Ollama => None,
        }
    }
}

/// Summarize the corpus with the chosen backend. Always returns a
/// [`SummaryResult`]; failure classes are encoded in its `error` field.
pub fn summarize(
    config: &Config,
    corpus: &ReferenceCorpus,
    subject: &str,
    backend: Backend,
) -> SummaryResult {
    summarize_with(config, corpus, subject, backend, |var| {
        std::env::var(var).ok()
    })
}

/// [`summarize`] with an injected credential lookup, so the missing-key
/// path is testable without touching process environment.
fn summarize_with(
    config: &Config,
    corpus: &ReferenceCorpus,
    subject: &str,
    backend: Backend,
    lookup: impl Fn(&str) -> Option<String>,
) -> SummaryResult {
    let model = backend.model(&config.backends).to_string();
    let name = backend.as_str();

    // Empty for Ollama, which authenticates nothing.
    let credential = match backend.credential_var() {
        Some(var) => match lookup(var).filter(|key| !key.is_empty()) {
            Some(key) => key,
            None => return SummaryResult::unavailable(name, &model, &format!("{var} not set")),
        },
        None => String::new(),
    };

    let mut fitter = BudgetFitter::new(&config.budget, &model);

    loop {
        // Pre-flight fitting consumes no backend call.
        let rendering = match fitter.fit(corpus, subject, backend.style()) {
            Ok(rendering) => rendering,
            Err(err) => return SummaryResult::failure(name, &model, &err.to_string()),
        };
        debug!(
            backend = name,
            model = %model,
            tokens = estimate_tokens(&model, &rendering.full_text()),
            "requesting summary"
        );

        let references = rendering.references().to_vec();
        let completion = match (backend, rendering) {
            (Backend::OpenAi, Rendering::Flat(prompt)) => complete_openai(
                &config.backends.openai,
                config.backends.timeout_secs,
                &prompt.text,
                &credential,
            ),
            (Backend::Ollama, Rendering::Flat(prompt)) => {
                complete_ollama(&config.backends.ollama, config.backends.timeout_secs, &prompt.text)
            }
            (Backend::Claude, Rendering::Blocks(blocks)) => complete_claude(
                &config.backends.claude,
                config.backends.timeout_secs,
                &blocks.blocks,
                &credential,
            ),
            // Backend::style keeps shape and backend aligned.
            _ => unreachable!("rendering shape does not match backend"),
        };

        match completion {
            Ok(summary) => return SummaryResult::ok(name, &model, summary, references),
            Err(DigestError::BackendUnavailable(reason)) => {
                return SummaryResult::unavailable(name, &model, &reason);
            }
            Err(DigestError::TransientProvider(reason)) => {
                warn!(backend = name, reason = %reason, "provider rejected request, retrying truncated");
                if let Err(exhausted) = fitter.note_rejection() {
                    return SummaryResult::failure(name, &model, &exhausted.to_string());
                }
            }
            Err(err) => return SummaryResult::failure(name, &model, &err.to_string()),
        }
    }
}

fn http_client(timeout_secs: u64) -> Result<reqwest::blocking::Client, DigestError> {
    reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| DigestError::Provider(format!("failed to build HTTP client: {e}")))
}

/// Classify a non-success provider response: size/rate-limit-shaped
/// rejections are transient (they feed the truncation loop), everything
/// else is terminal.
fn classify_rejection(api: &str, status: reqwest::StatusCode, body: &str) -> DigestError {
    let rate_limited = status.as_u16() == 429
        || status.as_u16() == 413
        || body.contains("rate_limit_exceeded")
        || body.contains("rate_limit_error")
        || body.contains("Request too large");
    if rate_limited {
        DigestError::TransientProvider(format!("{api} rejected request ({status}): {body}"))
    } else {
        DigestError::Provider(format!("{api} error {status}: {body}"))
    }
}

// ============ OpenAI ============

fn complete_openai(
    config: &OpenAiConfig,
    timeout_secs: u64,
    prompt: &str,
    api_key: &str,
) -> Result<String, DigestError> {
    let client = http_client(timeout_secs)?;
    let body = serde_json::json!({
        "model": config.model,
        "messages": [
            {"role": "system", "content": SYSTEM_PROMPT},
            {"role": "user", "content": prompt},
        ],
    });

    let response = client
        .post("https://api.openai.com/v1/chat/completions")
        .header("Authorization", format!("Bearer {api_key}"))
        .json(&body)
        .send()
        .map_err(|e| DigestError::Provider(format!("OpenAI request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let body_text = response.text().unwrap_or_default();
        return Err(classify_rejection("OpenAI", status, &body_text));
    }

    let json: serde_json::Value = response
        .json()
        .map_err(|e| DigestError::Provider(format!("invalid OpenAI response: {e}")))?;
    let content = json
        .pointer("/choices/0/message/content")
        .and_then(|c| c.as_str())
        .ok_or_else(|| DigestError::Provider("invalid OpenAI response: missing content".into()))?;

    non_empty(content, "OpenAI")
}

// ============ Claude ============

fn complete_claude(
    config: &ClaudeConfig,
    timeout_secs: u64,
    blocks: &[String],
    api_key: &str,
) -> Result<String, DigestError> {
    let client = http_client(timeout_secs)?;
    let mut content: Vec<serde_json::Value> = blocks
        .iter()
        .map(|text| serde_json::json!({"type": "text", "text": text}))
        .collect();
    content.push(serde_json::json!({"type": "text", "text": CITE_INSTRUCTION}));

    let body = serde_json::json!({
        "model": config.model,
        "max_tokens": config.max_tokens,
        "messages": [{"role": "user", "content": content}],
    });

    let response = client
        .post("https://api.anthropic.com/v1/messages")
        .header("x-api-key", api_key)
        .header("anthropic-version", "2023-06-01")
        .json(&body)
        .send()
        .map_err(|e| DigestError::Provider(format!("Claude request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let body_text = response.text().unwrap_or_default();
        return Err(classify_rejection("Claude", status, &body_text));
    }

    let json: serde_json::Value = response
        .json()
        .map_err(|e| DigestError::Provider(format!("invalid Claude response: {e}")))?;
    let text = json
        .pointer("/content/0/text")
        .and_then(|t| t.as_str())
        .ok_or_else(|| DigestError::Provider("invalid Claude response: missing text".into()))?;

    non_empty(text, "Claude")
}

// ============ Ollama ============

fn complete_ollama(
    config: &OllamaConfig,
    timeout_secs: u64,
    prompt: &str,
) -> Result<String, DigestError> {
    let client = http_client(timeout_secs)?;
    let body = serde_json::json!({
        "model": config.model,
        "messages": [
            {"role": "system", "content": SYSTEM_PROMPT},
            {"role": "user", "content": prompt},
        ],
        "stream": false,
    });

    let response = client
        .post(format!("{}/api/chat", config.url))
        .json(&body)
        .send()
        .map_err(|e| {
            // A local server we cannot reach is an availability problem,
            // not a request failure.
            DigestError::BackendUnavailable(format!(
                "cannot reach Ollama at {} (is it running?): {e}",
                config.url
            ))
        })?;

    let status = response.status();
    if !status.is_success() {
        let body_text = response.text().unwrap_or_default();
        return Err(classify_rejection("Ollama", status, &body_text));
    }

    let json: serde_json::Value = response
        .json()
        .map_err(|e| DigestError::Provider(format!("invalid Ollama response: {e}")))?;
    let content = json
        .pointer("/message/content")
        .and_then(|c| c.as_str())
        .ok_or_else(|| DigestError::Provider("invalid Ollama response: missing content".into()))?;

    non_empty(content, "Ollama")
}

fn non_empty(text: &str, api: &str) -> Result<String, DigestError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(DigestError::Provider(format!("{api} returned an empty completion")));
    }
    Ok(trimmed.to_string())
}
