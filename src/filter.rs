//! Topic filtering over a harvest.
//!
//! Case-insensitive substring matching against post titles/bodies and
//! comment bodies. Posts match if either their title or body contains any
//! topic; comments match on body alone.

use crate::models::Harvest;

pub fn filter_by_topics(harvest: Harvest, topics: &[String]) -> Harvest {
    if topics.is_empty() {
        return harvest;
    }
    let lowered: Vec<String> = topics.iter().map(|t| t.to_lowercase()).collect();

    let contains_topic =
        |text: &str| -> bool { lowered.iter().any(|t| text.to_lowercase().contains(t)) };

    let posts = harvest
        .posts
        .into_iter()
        .filter(|post| {
            post.title.as_deref().map(contains_topic).unwrap_or(false)
                || contains_topic(post.text())
        })
        .collect();
    let comments = harvest
        .comments
        .into_iter()
        .filter(|comment| contains_topic(comment.text()))
        .collect();

    Harvest { posts, comments }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ContentItem, ItemKind};
    use chrono::Utc;

    fn post(title: &str, body: &str) -> ContentItem {
        ContentItem {
            kind: ItemKind::Post,
            source_id: "p".into(),
            title: Some(title.into()),
            body: body.into(),
            clean_body: None,
            score: 0,
            url: String::new(),
            created_at: Utc::now(),
            author: "a".into(),
            num_comments: 0,
        }
    }

    fn comment(body: &str) -> ContentItem {
        ContentItem {
            kind: ItemKind::Comment,
            source_id: "c".into(),
            title: None,
            body: body.into(),
            clean_body: None,
            score: 0,
            url: String::new(),
            created_at: Utc::now(),
            author: "a".into(),
            num_comments: 0,
        }
    }

    #[test]
    fn test_no_topics_passes_everything() {
        let harvest = Harvest {
            posts: vec![post("Anything", "at all")],
            comments: vec![comment("untouched")],
        };
        let filtered = filter_by_topics(harvest, &[]);
        assert_eq!(filtered.posts.len(), 1);
        assert_eq!(filtered.comments.len(), 1);
    }

    #[test]
    fn test_matches_title_or_body_case_insensitive() {
        let harvest = Harvest {
            posts: vec![
                post("Rust 1.80 released", ""),
                post("Unrelated", "but rust shows up here"),
                post("Nothing", "relevant"),
            ],
            comments: vec![comment("I love RUST"), comment("python only")],
        };
        let filtered = filter_by_topics(harvest, &["rust".to_string()]);
        assert_eq!(filtered.posts.len(), 2);
        assert_eq!(filtered.comments.len(), 1);
    }
}
