//! The reference corpus: the ordered, indexed set of citable items.
//!
//! Corpus order is the stable input to all downstream indexing: posts first
//! in feed order, then a capped sample of comments, also in feed order.
//! Reference index `i` always denotes the `i`-th corpus element, 1-based.

use crate::models::{ContentItem, Harvest, ItemKind, Reference};

#[derive(Debug, Clone)]
pub struct ReferenceCorpus {
    items: Vec<ContentItem>,
}

impl ReferenceCorpus {
    /// Build the corpus from a harvest: every post, then the first
    /// `comment_sample` comments. No re-sorting.
    pub fn from_harvest(harvest: &Harvest, comment_sample: usize) -> Self {
        let mut items = harvest.posts.clone();
        items.extend(harvest.comments.iter().take(comment_sample).cloned());
        Self { items }
    }

    pub fn items(&self) -> &[ContentItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items paired with their 1-based reference index, in corpus order.
    pub fn indexed(&self) -> impl Iterator<Item = (usize, &ContentItem)> {
        self.items.iter().enumerate().map(|(i, item)| (i + 1, item))
    }

    /// References in corpus order, labeled `Post k` / `Comment k` with the
    /// counter restarting per kind.
    pub fn labeled_references(&self) -> Vec<Reference> {
        let mut post_counter = 0usize;
        let mut comment_counter = 0usize;
        self.items
            .iter()
            .map(|item| {
                let label = match item.kind {
                    ItemKind::Post => {
                        post_counter += 1;
                        format!("Post {post_counter}")
                    }
                    ItemKind::Comment => {
                        comment_counter += 1;
                        format!("Comment {comment_counter}")
                    }
                };
                Reference {
                    label,
                    url: item.url.clone(),
                }
            })
            .collect()
    }

    /// References labeled by corpus index, the shape the flattened `[n]`
    /// prompt path uses.
    pub fn numbered_references(&self) -> Vec<Reference> {
        self.indexed()
            .map(|(i, item)| Reference {
                label: i.to_string(),
                url: item.url.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn item(kind: ItemKind, id: &str) -> ContentItem {
        ContentItem {
            kind,
            source_id: id.to_string(),
            title: (kind == ItemKind::Post).then(|| id.to_string()),
            body: String::new(),
            clean_body: None,
            score: 0,
            url: format!("https://www.reddit.com/{id}"),
            created_at: Utc::now(),
            author: "a".into(),
            num_comments: 0,
        }
    }

    fn harvest(posts: usize, comments: usize) -> Harvest {
        Harvest {
            posts: (0..posts)
                .map(|i| item(ItemKind::Post, &format!("p{i}")))
                .collect(),
            comments: (0..comments)
                .map(|i| item(ItemKind::Comment, &format!("c{i}")))
                .collect(),
        }
    }

    #[test]
    fn test_posts_first_then_capped_comments() {
        let corpus = ReferenceCorpus::from_harvest(&harvest(2, 15), 10);
        assert_eq!(corpus.len(), 12);
        assert_eq!(corpus.items()[0].source_id, "p0");
        assert_eq!(corpus.items()[1].source_id, "p1");
        assert_eq!(corpus.items()[2].source_id, "c0");
        assert_eq!(corpus.items()[11].source_id, "c9");
    }

    #[test]
    fn test_indices_strictly_increasing_from_one() {
        let corpus = ReferenceCorpus::from_harvest(&harvest(3, 4), 10);
        let indices: Vec<usize> = corpus.indexed().map(|(i, _)| i).collect();
        assert_eq!(indices, vec![1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn test_labeled_references_restart_per_kind() {
        let corpus = ReferenceCorpus::from_harvest(&harvest(2, 2), 10);
        let labels: Vec<String> = corpus
            .labeled_references()
            .into_iter()
            .map(|r| r.label)
            .collect();
        assert_eq!(labels, vec!["Post 1", "Post 2", "Comment 1", "Comment 2"]);
    }

    #[test]
    fn test_numbered_references_match_corpus_order() {
        let corpus = ReferenceCorpus::from_harvest(&harvest(1, 2), 10);
        let refs = corpus.numbered_references();
        assert_eq!(refs.len(), 3);
        assert_eq!(refs[0].label, "1");
        assert_eq!(refs[0].url, "https://www.reddit.com/p0");
        assert_eq!(refs[2].label, "3");
        assert_eq!(refs[2].url, "https://www.reddit.com/c1");
    }
}
