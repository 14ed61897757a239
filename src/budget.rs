//! Token-budget estimation and the adaptive fitting loop.
//!
//! [`estimate_tokens`] is a cheap chars-per-token heuristic keyed by model
//! family, with a generic fallback for unrecognized models. [`BudgetFitter`]
//! drives the truncation loop as an explicit state machine:
//!
//! ```text
//! Attempting ──fits──▶ Succeeded
//!     │ over budget
//!     ▼
//! Truncating ──cap left──▶ Attempting   (cap: unlimited → 500 → 250 → ...)
//!     │ attempts exhausted
//!     ▼
//!   Failed (BudgetExceeded)
//! ```
//!
//! Two triggers feed the same loop: a local pre-flight overflow (detected
//! before any network call) and a remote size/rate rejection reported via
//! [`BudgetFitter::note_rejection`] after a call was spent. Cap reduction is
//! multiplicative halving with a floor; fast to converge, not optimal.

use tracing::info;

use crate::config::BudgetConfig;
use crate::corpus::ReferenceCorpus;
use crate::error::DigestError;
use crate::prompt::{render, RenderStyle, Rendering};

/// Chars-per-token ratios by model-name prefix. Rough but cheap; the point
/// is a pre-flight estimate, not an exact count.
const MODEL_RATIOS: &[(&str, f64)] = &[
    ("gpt-", 4.0),
    ("o1", 4.0),
    ("claude-", 3.6),
    ("gemma", 4.2),
    ("llama", 4.2),
];

const GENERIC_CHARS_PER_TOKEN: f64 = 4.0;

/// Estimate token count for `text` under `model`. Unrecognized models fall
/// back to the generic ratio.
pub fn estimate_tokens(model: &str, text: &str) -> usize {
    let ratio = MODEL_RATIOS
        .iter()
        .find(|(prefix, _)| model.starts_with(prefix))
        .map(|(_, ratio)| *ratio)
        .unwrap_or(GENERIC_CHARS_PER_TOKEN);
    (text.chars().count() as f64 / ratio).ceil() as usize
}

/// A backend's size ceiling and the current per-item truncation cap.
#[derive(Debug, Clone, Copy)]
pub struct PromptBudget {
    pub max_tokens: usize,
    /// `None` means unlimited (attempt 0).
    pub item_cap: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FitState {
    Attempting,
    Truncating,
    Succeeded,
    Failed,
}

/// Iterative budget fitter. One instance lives for the duration of a
/// summarize request, so truncation state carries across both pre-flight
/// rebuilds and remote-rejection retries.
#[derive(Debug)]
pub struct BudgetFitter {
    model: String,
    max_tokens: usize,
    initial_cap: usize,
    min_cap: usize,
    max_attempts: u32,
    cap: Option<usize>,
    attempts: u32,
    last_estimate: usize,
}

impl BudgetFitter {
    pub fn new(config: &BudgetConfig, model: &str) -> Self {
        Self {
            model: model.to_string(),
            max_tokens: config.max_input_tokens,
            initial_cap: config.initial_item_cap,
            min_cap: config.min_item_cap,
            max_attempts: config.max_attempts,
            cap: None,
            attempts: 0,
            last_estimate: 0,
        }
    }

    pub fn budget(&self) -> PromptBudget {
        PromptBudget {
            max_tokens: self.max_tokens,
            item_cap: self.cap,
        }
    }

    /// Render the corpus under the current cap, shrinking until the
    /// pre-flight estimate fits. Content already within budget comes back
    /// untruncated. No network call is consumed here.
    pub fn fit(
        &mut self,
        corpus: &ReferenceCorpus,
        subject: &str,
        style: RenderStyle,
    ) -> Result<Rendering, DigestError> {
        let mut state = FitState::Attempting;
        let mut rendering = None;

        loop {
            match state {
                FitState::Attempting => {
                    let candidate = render(corpus, subject, self.cap, style);
                    self.last_estimate = estimate_tokens(&self.model, &candidate.full_text());
                    state = if self.last_estimate <= self.max_tokens {
                        rendering = Some(candidate);
                        FitState::Succeeded
                    } else if self.can_shrink() {
                        FitState::Truncating
                    } else {
                        FitState::Failed
                    };
                }
                FitState::Truncating => {
                    self.shrink();
                    state = FitState::Attempting;
                }
                FitState::Succeeded => {
                    return Ok(rendering.expect("succeeded state always holds a rendering"));
                }
                FitState::Failed => {
                    return Err(self.exceeded());
                }
            }
        }
    }

    /// A remote size/rate rejection arrived after a call was spent. Shrink
    /// for the next attempt, or report terminal exhaustion.
    pub fn note_rejection(&mut self) -> Result<(), DigestError> {
        if !self.can_shrink() {
            return Err(self.exceeded());
        }
        self.shrink();
        Ok(())
    }

    fn can_shrink(&self) -> bool {
        self.attempts < self.max_attempts
    }

    fn shrink(&mut self) {
        self.attempts += 1;
        self.cap = Some(match self.cap {
            None => self.initial_cap,
            Some(cap) => (cap / 2).max(self.min_cap),
        });
        info!(
            attempt = self.attempts,
            cap = self.cap,
            estimated = self.last_estimate,
            budget = self.max_tokens,
            "reducing per-item content cap"
        );
    }

    fn exceeded(&self) -> DigestError {
        DigestError::BudgetExceeded {
            attempts: self.attempts,
            estimated: self.last_estimate,
            budget: self.max_tokens,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ContentItem, Harvest, ItemKind};
    use chrono::Utc;

    fn corpus_with_body(chars: usize) -> ReferenceCorpus {
        let harvest = Harvest {
            posts: vec![ContentItem {
                kind: ItemKind::Post,
                source_id: "p0".into(),
                title: Some("t".into()),
                body: "x".repeat(chars),
                clean_body: None,
                score: 0,
                url: "https://www.reddit.com/p0".into(),
                created_at: Utc::now(),
                author: "a".into(),
                num_comments: 0,
            }],
            comments: Vec::new(),
        };
        ReferenceCorpus::from_harvest(&harvest, 10)
    }

    fn config(max_tokens: usize, max_attempts: u32) -> BudgetConfig {
        BudgetConfig {
            max_input_tokens: max_tokens,
            initial_item_cap: 500,
            min_item_cap: 50,
            max_attempts,
        }
    }

    #[test]
    fn test_estimate_recognizes_model_families() {
        let text = "x".repeat(400);
        assert_eq!(estimate_tokens("gpt-4o", &text), 100);
        assert_eq!(estimate_tokens("claude-sonnet-4-5", &text), 112);
        // Unrecognized model falls back to the generic ratio.
        assert_eq!(estimate_tokens("mystery-model", &text), 100);
    }

    #[test]
    fn test_fit_is_noop_within_budget() {
        let corpus = corpus_with_body(200);
        let mut fitter = BudgetFitter::new(&config(8000, 3), "gpt-4o");
        let rendering = fitter.fit(&corpus, "rust", RenderStyle::Flat).unwrap();
        // Full body present, no ellipsis, cap untouched.
        assert!(rendering.full_text().contains(&"x".repeat(200)));
        assert!(fitter.budget().item_cap.is_none());
    }

    #[test]
    fn test_fit_truncates_then_succeeds() {
        // 4000-char body ≈ 1000 tokens; 200-token budget forces capping.
        let corpus = corpus_with_body(4000);
        let mut fitter = BudgetFitter::new(&config(200, 3), "gpt-4o");
        let rendering = fitter.fit(&corpus, "rust", RenderStyle::Flat).unwrap();
        assert_eq!(fitter.budget().item_cap, Some(500));
        assert!(rendering.full_text().contains("..."));
    }

    #[test]
    fn test_caps_halve_per_attempt_with_floor() {
        let corpus = corpus_with_body(100_000);
        let mut fitter = BudgetFitter::new(&config(10, 6), "gpt-4o");
        let err = fitter.fit(&corpus, "rust", RenderStyle::Flat).unwrap_err();
        // 500 → 250 → 125 → 62 → 50 → 50: halved each attempt, floored.
        match err {
            DigestError::BudgetExceeded { attempts, .. } => assert_eq!(attempts, 6),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(fitter.budget().item_cap, Some(50));
    }

    #[test]
    fn test_exhaustion_after_max_attempts() {
        // One item estimating ~500 tokens against a 100-token budget with
        // max_attempts = 2: caps 500 then 250, both still over, terminal.
        let corpus = corpus_with_body(2000);
        let mut fitter = BudgetFitter::new(
            &BudgetConfig {
                max_input_tokens: 100,
                initial_item_cap: 500,
                min_item_cap: 50,
                max_attempts: 2,
            },
            "gpt-4o",
        );
        let err = fitter.fit(&corpus, "rust", RenderStyle::Flat).unwrap_err();
        assert!(matches!(
            err,
            DigestError::BudgetExceeded { attempts: 2, .. }
        ));
    }

    #[test]
    fn test_remote_rejection_consumes_attempts() {
        let corpus = corpus_with_body(100);
        let mut fitter = BudgetFitter::new(&config(8000, 2), "gpt-4o");
        fitter.fit(&corpus, "rust", RenderStyle::Flat).unwrap();

        assert!(fitter.note_rejection().is_ok());
        assert_eq!(fitter.budget().item_cap, Some(500));
        assert!(fitter.note_rejection().is_ok());
        assert_eq!(fitter.budget().item_cap, Some(250));
        // Third rejection exhausts the budget loop.
        assert!(matches!(
            fitter.note_rejection(),
            Err(DigestError::BudgetExceeded { .. })
        ));
    }
}
