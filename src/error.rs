//! Failure taxonomy for the harvest-and-summarize pipeline.
//!
//! Every class here degrades to a reported value at the component boundary:
//! the harvester and dispatcher never let an error escape as a panic or an
//! unhandled propagation. `Traversal` in particular is always recovered
//! locally during thread-completion detection.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DigestError {
    /// Channel or user not found at the content source. Non-fatal; the
    /// caller reports it and proceeds to the next channel.
    #[error("source unavailable: {0}")]
    SourceUnavailable(String),

    /// The fitting loop exhausted its attempts while the rendered prompt
    /// was still over budget. Terminal for the request.
    #[error("budget exceeded after {attempts} attempts ({estimated} tokens over a {budget} token budget)")]
    BudgetExceeded {
        attempts: u32,
        estimated: usize,
        budget: usize,
    },

    /// Missing credential or configuration for the chosen backend. Other
    /// backends remain usable.
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Remote size/rate rejection. Triggers truncation and retry; becomes
    /// terminal once attempts run out.
    #[error("transient provider error: {0}")]
    TransientProvider(String),

    /// Any other provider failure (network fault, malformed response,
    /// empty completion). Terminal for the request.
    #[error("provider error: {0}")]
    Provider(String),

    /// Comment-tree walk failure during thread-completion detection.
    #[error("comment tree traversal failed: {0}")]
    Traversal(String),
}
