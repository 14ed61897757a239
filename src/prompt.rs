//! Prompt rendering for the two backend input shapes.
//!
//! Conversational backends (OpenAI, Ollama) take one flattened text prompt
//! with bracketed numeric references `[n]`. The structured-citation backend
//! (Claude) takes discrete labeled blocks (`Post k` / `Comment k`) plus an
//! instruction to cite by label. Both renderings assign reference indices
//! strictly increasing from 1 in corpus order and honor an optional per-item
//! character cap imposed by the budget fitter.

use crate::corpus::ReferenceCorpus;
use crate::models::{ItemKind, Reference};

/// Which input shape to render for the target backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStyle {
    /// One text prompt with `[n]` references.
    Flat,
    /// Discrete labeled content blocks.
    Blocks,
}

/// A rendering of the corpus, ready for the provider call and for size
/// estimation.
#[derive(Debug, Clone)]
pub enum Rendering {
    Flat(RenderedPrompt),
    Blocks(RenderedBlocks),
}

impl Rendering {
    pub fn references(&self) -> &[Reference] {
        match self {
            Rendering::Flat(p) => &p.references,
            Rendering::Blocks(b) => &b.references,
        }
    }

    /// The full text a provider will see, for token estimation.
    pub fn full_text(&self) -> String {
        match self {
            Rendering::Flat(p) => p.text.clone(),
            Rendering::Blocks(b) => b.blocks.join("\n"),
        }
    }
}

/// Flattened prompt plus its references, labeled by corpus index.
#[derive(Debug, Clone)]
pub struct RenderedPrompt {
    pub text: String,
    pub references: Vec<Reference>,
}

/// Labeled content blocks plus their (label, URL) references.
#[derive(Debug, Clone)]
pub struct RenderedBlocks {
    pub blocks: Vec<String>,
    pub references: Vec<Reference>,
}

pub fn render(corpus: &ReferenceCorpus, subject: &str, cap: Option<usize>, style: RenderStyle) -> Rendering {
    match style {
        RenderStyle::Flat => Rendering::Flat(render_flat(corpus, subject, cap)),
        RenderStyle::Blocks => Rendering::Blocks(render_blocks(corpus, subject, cap)),
    }
}

/// Render the corpus as one prompt with `- [n] ...` entries.
pub fn render_flat(corpus: &ReferenceCorpus, subject: &str, cap: Option<usize>) -> RenderedPrompt {
    let mut parts: Vec<String> = vec![
        format!("Summarize the following content from r/{subject}."),
        "Include key themes, notable discussions, and overall sentiment.".to_string(),
        "When mentioning specific posts or comments, use numbered references [n].".to_string(),
        String::new(),
        "POSTS:".to_string(),
    ];

    let mut in_comments = false;
    for (index, item) in corpus.indexed() {
        if item.kind == ItemKind::Comment && !in_comments {
            in_comments = true;
            parts.push(String::new());
            parts.push("COMMENTS (sample):".to_string());
        }
        match item.kind {
            ItemKind::Post => {
                parts.push(format!("- [{index}] {}", item.title.as_deref().unwrap_or("")));
                if !item.text().is_empty() {
                    parts.push(format!("  Content: {}", truncate(item.text(), cap)));
                }
            }
            ItemKind::Comment => {
                parts.push(format!("- [{index}] {}", truncate(item.text(), cap)));
            }
        }
    }

    RenderedPrompt {
        text: parts.join("\n"),
        references: corpus.numbered_references(),
    }
}

/// Render the corpus as one labeled block per item.
pub fn render_blocks(corpus: &ReferenceCorpus, subject: &str, cap: Option<usize>) -> RenderedBlocks {
    let references = corpus.labeled_references();
    let mut blocks = vec![format!("Content from r/{subject}:")];

    for (item, reference) in corpus.items().iter().zip(references.iter()) {
        let mut lines = vec![format!("{}:", reference.label)];
        if let Some(title) = item.title.as_deref() {
            lines.push(format!("Title: {title}"));
        }
        lines.push(format!("Content: {}", truncate(item.text(), cap)));
        lines.push(format!("Posted: {}", item.created_at.format("%Y-%m-%d %H:%M:%S UTC")));
        blocks.push(lines.join("\n"));
    }

    RenderedBlocks { blocks, references }
}

/// Truncate to `cap` characters, appending an ellipsis when anything was
/// dropped. Char-boundary safe.
fn truncate(text: &str, cap: Option<usize>) -> String {
    match cap {
        Some(cap) if text.chars().count() > cap => {
            let mut out: String = text.chars().take(cap).collect();
            out.push_str("...");
            out
        }
        _ => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ContentItem, Harvest};
    use chrono::Utc;

    fn item(kind: ItemKind, id: &str, body: &str) -> ContentItem {
        ContentItem {
            kind,
            source_id: id.to_string(),
            title: (kind == ItemKind::Post).then(|| format!("Title {id}")),
            body: body.to_string(),
            clean_body: None,
            score: 0,
            url: format!("https://www.reddit.com/{id}"),
            created_at: Utc::now(),
            author: "a".into(),
            num_comments: 0,
        }
    }

    fn corpus() -> ReferenceCorpus {
        let harvest = Harvest {
            posts: vec![item(ItemKind::Post, "p0", "post body text")],
            comments: vec![
                item(ItemKind::Comment, "c0", "first comment"),
                item(ItemKind::Comment, "c1", "second comment"),
            ],
        };
        ReferenceCorpus::from_harvest(&harvest, 10)
    }

    #[test]
    fn test_flat_numbers_run_through_sections() {
        let rendered = render_flat(&corpus(), "rust", None);
        assert!(rendered.text.contains("- [1] Title p0"));
        assert!(rendered.text.contains("- [2] first comment"));
        assert!(rendered.text.contains("- [3] second comment"));
        assert!(rendered.text.contains("POSTS:"));
        assert!(rendered.text.contains("COMMENTS (sample):"));
        assert_eq!(rendered.references.len(), 3);
        assert_eq!(rendered.references[1].label, "2");
    }

    #[test]
    fn test_flat_untruncated_without_cap() {
        let rendered = render_flat(&corpus(), "rust", None);
        assert!(rendered.text.contains("post body text"));
        assert!(!rendered.text.contains("post body text..."));
    }

    #[test]
    fn test_flat_cap_truncates_bodies() {
        let rendered = render_flat(&corpus(), "rust", Some(5));
        assert!(rendered.text.contains("- [2] first..."));
        assert!(rendered.text.contains("Content: post ..."));
    }

    #[test]
    fn test_blocks_labeled_per_kind() {
        let rendered = render_blocks(&corpus(), "rust", None);
        // Preamble block plus one block per item.
        assert_eq!(rendered.blocks.len(), 4);
        assert!(rendered.blocks[1].starts_with("Post 1:"));
        assert!(rendered.blocks[2].starts_with("Comment 1:"));
        assert!(rendered.blocks[3].starts_with("Comment 2:"));
        assert_eq!(rendered.references[0].label, "Post 1");
        assert_eq!(rendered.references[2].url, "https://www.reddit.com/c1");
    }

    #[test]
    fn test_truncate_multibyte_safe() {
        assert_eq!(truncate("héllo wörld", Some(4)), "héll...");
        assert_eq!(truncate("short", Some(10)), "short");
    }
}
