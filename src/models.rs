//! Core data models used throughout Thread Digest.
//!
//! These types represent the posts, comments, and summary results that flow
//! through the harvesting and summarization pipeline.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Author string substituted when the source reports no author.
pub const DELETED_AUTHOR: &str = "[deleted]";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Post,
    Comment,
}

/// A harvested post or comment. Immutable once harvested, except for the
/// derived `clean_body`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentItem {
    pub kind: ItemKind,
    /// Source-side identifier (e.g. the Reddit base36 id).
    pub source_id: String,
    /// Posts only; comments carry no title.
    pub title: Option<String>,
    /// Body text. May be empty, never absent.
    pub body: String,
    /// Cleaned body (lowercased, stopwords removed) when cleaning is on.
    pub clean_body: Option<String>,
    pub score: i64,
    pub url: String,
    pub created_at: DateTime<Utc>,
    /// Author name, or [`DELETED_AUTHOR`] when removed.
    pub author: String,
    /// Comment count as reported by the source. Zero for comments.
    pub num_comments: u64,
}

impl ContentItem {
    /// The text to render into prompts: the cleaned body when one was
    /// derived, otherwise the raw body.
    pub fn text(&self) -> &str {
        self.clean_body.as_deref().unwrap_or(&self.body)
    }
}

/// A single cutoff instant. Items created before the cutoff are excluded.
#[derive(Debug, Clone, Copy)]
pub struct TimeWindow {
    pub cutoff: DateTime<Utc>,
}

impl TimeWindow {
    /// Window covering the last `hours` hours ending now.
    pub fn last_hours(hours: i64) -> Self {
        Self {
            cutoff: Utc::now() - Duration::hours(hours),
        }
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.cutoff
    }
}

/// A citable reference: a human-readable label paired with the item's URL.
///
/// The flattened prompt path labels references by their corpus index
/// (`"1"`, `"2"`, ...); the block path labels them `"Post k"` / `"Comment k"`.
/// Both paths keep the list in corpus order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reference {
    pub label: String,
    pub url: String,
}

/// Everything fetched for one channel and window, posts and comments in
/// feed order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Harvest {
    pub posts: Vec<ContentItem>,
    pub comments: Vec<ContentItem>,
}

impl Harvest {
    pub fn is_empty(&self) -> bool {
        self.posts.is_empty() && self.comments.is_empty()
    }
}

/// Terminal output of one fit-and-summarize run.
#[derive(Debug, Clone)]
pub struct SummaryResult {
    /// Generated summary prose. Empty when `error` is set.
    pub summary: String,
    /// References in corpus order.
    pub references: Vec<Reference>,
    /// Backend identifier (`"openai"`, `"claude"`, `"ollama"`).
    pub backend: String,
    /// Model identifier the backend was invoked with.
    pub model: String,
    /// Human-readable diagnostic when the run did not produce a summary.
    pub error: Option<String>,
}

impl SummaryResult {
    pub fn ok(backend: &str, model: &str, summary: String, references: Vec<Reference>) -> Self {
        Self {
            summary,
            references,
            backend: backend.to_string(),
            model: model.to_string(),
            error: None,
        }
    }

    /// Backend could not be used at all (missing credential, unreachable
    /// local server). Carries no partial summary text.
    pub fn unavailable(backend: &str, model: &str, reason: &str) -> Self {
        Self {
            summary: String::new(),
            references: Vec::new(),
            backend: backend.to_string(),
            model: model.to_string(),
            error: Some(format!("backend unavailable: {reason}")),
        }
    }

    /// Any other failure, with a diagnostic in place of a summary.
    pub fn failure(backend: &str, model: &str, diagnostic: &str) -> Self {
        Self {
            summary: String::new(),
            references: Vec::new(),
            backend: backend.to_string(),
            model: model.to_string(),
            error: Some(diagnostic.to_string()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}
