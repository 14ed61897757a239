//! # Thread Digest
//!
//! A Reddit harvesting and summarization pipeline.
//!
//! Thread Digest pulls recent posts and comments from a subreddit, optionally
//! completes threads whose discussion is still active, builds a
//! reference-indexed corpus, fits it into a model's token budget, and asks an
//! interchangeable LLM backend (OpenAI, Claude, or a local Ollama) for a
//! summary with numbered citations. A separate streaming mode tails a
//! channel's live comment feed at a bounded rate.
//!
//! Module map:
//! - [`models`] - posts, comments, time windows, summary results
//! - [`source`] / [`connector_reddit`] - the content source abstraction and
//!   its Reddit implementation
//! - [`harvest`] - windowed collection with early-exit scans and thread
//!   completion
//! - [`clean`] / [`filter`] - text normalization and topic filtering
//! - [`corpus`] / [`prompt`] - reference indexing and prompt rendering
//! - [`budget`] / [`summarize`] - token budget fitting and backend dispatch
//! - [`footnotes`] - reference sections appended to summaries
//! - [`stream`] - the rate-limited live emitter
//! - [`output`] - saving summaries and raw harvests
//! - [`config`] - TOML configuration with environment overrides

pub mod budget;
pub mod clean;
pub mod config;
pub mod connector_reddit;
pub mod corpus;
pub mod error;
pub mod filter;
pub mod footnotes;
pub mod harvest;
pub mod models;
pub mod output;
pub mod prompt;
pub mod source;
pub mod stream;
pub mod summarize;
