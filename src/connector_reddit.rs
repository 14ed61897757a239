//! Reddit content source.
//!
//! Implements [`ContentSource`] against Reddit's public JSON endpoints
//! (`/r/<channel>/new.json`, `hot.json`, `comments.json`, and per-post
//! comment pages). No OAuth; requests carry a descriptive User-Agent as the
//! public API asks. Listing parsing is factored into free functions so it
//! can be tested against captured JSON without a network.

use std::collections::HashSet;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::DigestError;
use crate::models::{ContentItem, ItemKind, DELETED_AUTHOR};
use crate::source::{CommentLeaf, CommentNode, ContentSource, FeedOrder, MoreComments};

const DEFAULT_BASE: &str = "https://www.reddit.com";
const USER_AGENT: &str = concat!("thread-digest/", env!("CARGO_PKG_VERSION"));

pub struct RedditSource {
    client: reqwest::blocking::Client,
    base: String,
    /// Delay between polls of the live comment feed.
    poll_interval: Duration,
}

impl RedditSource {
    pub fn new(timeout_secs: u64, poll_secs: u64) -> Result<Self, DigestError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| DigestError::SourceUnavailable(format!("HTTP client: {e}")))?;
        Ok(Self {
            client,
            base: DEFAULT_BASE.to_string(),
            poll_interval: Duration::from_secs(poll_secs),
        })
    }

    #[cfg(test)]
    fn with_base(mut self, base: &str) -> Self {
        self.base = base.to_string();
        self
    }

    fn get_json(&self, path: &str) -> Result<Value, DigestError> {
        let url = format!("{}{}", self.base, path);
        debug!(%url, "fetching");
        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| DigestError::SourceUnavailable(format!("request to {url} failed: {e}")))?;

        let status = response.status();
        if status.as_u16() == 404 {
            return Err(DigestError::SourceUnavailable(format!("not found: {url}")));
        }
        if !status.is_success() {
            return Err(DigestError::SourceUnavailable(format!(
                "{url} returned {status}"
            )));
        }
        response
            .json()
            .map_err(|e| DigestError::SourceUnavailable(format!("invalid JSON from {url}: {e}")))
    }
}

impl ContentSource for RedditSource {
    fn posts(
        &self,
        channel: &str,
        order: FeedOrder,
        limit: usize,
    ) -> Result<Vec<ContentItem>, DigestError> {
        let json = self.get_json(&format!(
            "/r/{channel}/{}.json?limit={limit}&raw_json=1",
            order.as_str()
        ))?;
        parse_listing(&json, &self.base)
    }

    fn comments(&self, channel: &str, limit: usize) -> Result<Vec<ContentItem>, DigestError> {
        let json = self.get_json(&format!("/r/{channel}/comments.json?limit={limit}&raw_json=1"))?;
        parse_listing(&json, &self.base)
    }

    fn comment_tree(&self, post_id: &str) -> Result<Vec<CommentNode>, DigestError> {
        let json = self.get_json(&format!("/comments/{post_id}.json?raw_json=1"))?;
        // Response is a two-element array: the post listing, then the
        // comment listing.
        let comments = json
            .get(1)
            .ok_or_else(|| DigestError::Traversal(format!("no comment listing for {post_id}")))?;
        Ok(parse_comment_forest(comments))
    }

    fn expand_more(
        &self,
        post_id: &str,
        more: &MoreComments,
    ) -> Result<Vec<CommentNode>, DigestError> {
        if more.children.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<String> = more.children.iter().map(|c| format!("t1_{c}")).collect();
        let json = self.get_json(&format!("/api/info.json?id={}&raw_json=1", ids.join(",")))?;
        let children = match json.pointer("/data/children").and_then(Value::as_array) {
            Some(children) => children,
            None => {
                warn!(post_id, "placeholder expansion returned no children");
                return Ok(Vec::new());
            }
        };
        // Flat leaves; info.json does not nest replies.
        Ok(children
            .iter()
            .filter_map(|child| child.get("data"))
            .map(|data| {
                CommentNode::Comment(CommentLeaf {
                    created_at: parse_created(data),
                    replies: Vec::new(),
                })
            })
            .collect())
    }

    fn stream_comments<'a>(
        &'a self,
        channel: &str,
    ) -> Result<Box<dyn Iterator<Item = Result<ContentItem, DigestError>> + 'a>, DigestError> {
        // Probe once so a bad channel fails at setup instead of mid-stream.
        let initial = self.comments(channel, 100)?;
        Ok(Box::new(CommentStream {
            source: self,
            channel: channel.to_string(),
            seen: initial.iter().map(|c| c.source_id.clone()).collect(),
            pending: Vec::new(),
        }))
    }
}

/// Polling iterator over a channel's live comment feed. Seeds its seen set
/// from the comments present at setup, then yields only comments that arrive
/// afterwards, oldest first.
struct CommentStream<'a> {
    source: &'a RedditSource,
    channel: String,
    seen: HashSet<String>,
    pending: Vec<ContentItem>,
}

impl Iterator for CommentStream<'_> {
    type Item = Result<ContentItem, DigestError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.pending.pop() {
                return Some(Ok(item));
            }
            std::thread::sleep(self.source.poll_interval);
            let batch = match self.source.comments(&self.channel, 100) {
                Ok(batch) => batch,
                Err(err) => return Some(Err(err)),
            };
            // Feed is newest-first; pop() drains from the back, so the
            // oldest unseen comment comes out first.
            self.pending = batch
                .into_iter()
                .filter(|c| self.seen.insert(c.source_id.clone()))
                .collect();
        }
    }
}

// ============ Listing parsing ============

fn parse_created(data: &Value) -> DateTime<Utc> {
    let epoch = data
        .get("created_utc")
        .and_then(Value::as_f64)
        .unwrap_or(0.0);
    Utc.timestamp_opt(epoch as i64, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

fn parse_author(data: &Value) -> String {
    match data.get("author").and_then(Value::as_str) {
        Some(author) if !author.is_empty() => author.to_string(),
        _ => DELETED_AUTHOR.to_string(),
    }
}

fn parse_url(data: &Value, base: &str) -> String {
    data.get("permalink")
        .and_then(Value::as_str)
        .map(|p| format!("{base}{p}"))
        .unwrap_or_default()
}

fn str_field(data: &Value, key: &str) -> String {
    data.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Parse one `{"kind": "t3"|"t1", "data": {...}}` child into a content item.
pub fn parse_child(child: &Value, base: &str) -> Option<ContentItem> {
    let kind = match child.get("kind").and_then(Value::as_str) {
        Some("t3") => ItemKind::Post,
        Some("t1") => ItemKind::Comment,
        _ => return None,
    };
    let data = child.get("data")?;

    let (title, body) = match kind {
        ItemKind::Post => (
            Some(str_field(data, "title")),
            str_field(data, "selftext"),
        ),
        ItemKind::Comment => (None, str_field(data, "body")),
    };

    Some(ContentItem {
        kind,
        source_id: str_field(data, "id"),
        title,
        body,
        clean_body: None,
        score: data.get("score").and_then(Value::as_i64).unwrap_or(0),
        url: parse_url(data, base),
        created_at: parse_created(data),
        author: parse_author(data),
        num_comments: data
            .get("num_comments")
            .and_then(Value::as_u64)
            .unwrap_or(0),
    })
}

/// Parse a Reddit listing into content items, preserving feed order.
pub fn parse_listing(json: &Value, base: &str) -> Result<Vec<ContentItem>, DigestError> {
    let children = json
        .pointer("/data/children")
        .and_then(Value::as_array)
        .ok_or_else(|| DigestError::SourceUnavailable("malformed listing response".into()))?;
    Ok(children.iter().filter_map(|c| parse_child(c, base)).collect())
}

/// Parse a comment listing into a forest, keeping `more` placeholders.
pub fn parse_comment_forest(json: &Value) -> Vec<CommentNode> {
    let children = match json.pointer("/data/children").and_then(Value::as_array) {
        Some(children) => children,
        None => return Vec::new(),
    };
    children.iter().filter_map(parse_comment_node).collect()
}

fn parse_comment_node(child: &Value) -> Option<CommentNode> {
    let data = child.get("data")?;
    match child.get("kind").and_then(Value::as_str) {
        Some("t1") => {
            // "replies" is an empty string when there are none.
            let replies = match data.get("replies") {
                Some(replies) if replies.is_object() => parse_comment_forest(replies),
                _ => Vec::new(),
            };
            Some(CommentNode::Comment(CommentLeaf {
                created_at: parse_created(data),
                replies,
            }))
        }
        Some("more") => {
            let children = data
                .get("children")
                .and_then(Value::as_array)
                .map(|ids| {
                    ids.iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default();
            Some(CommentNode::More(MoreComments { children }))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn post_listing() -> Value {
        json!({
            "data": {
                "children": [
                    {
                        "kind": "t3",
                        "data": {
                            "id": "abc123",
                            "title": "A post",
                            "selftext": "body text",
                            "score": 42,
                            "permalink": "/r/rust/comments/abc123/a_post/",
                            "created_utc": 1_700_000_000.0,
                            "author": "alice",
                            "num_comments": 7
                        }
                    },
                    {
                        "kind": "t3",
                        "data": {
                            "id": "def456",
                            "title": "Deleted author",
                            "selftext": "",
                            "score": 1,
                            "permalink": "/r/rust/comments/def456/x/",
                            "created_utc": 1_699_999_000.0,
                            "author": null,
                            "num_comments": 0
                        }
                    }
                ]
            }
        })
    }

    #[test]
    fn test_parse_post_listing() {
        let items = parse_listing(&post_listing(), "https://www.reddit.com").unwrap();
        assert_eq!(items.len(), 2);

        let first = &items[0];
        assert_eq!(first.kind, ItemKind::Post);
        assert_eq!(first.source_id, "abc123");
        assert_eq!(first.title.as_deref(), Some("A post"));
        assert_eq!(first.body, "body text");
        assert_eq!(first.score, 42);
        assert_eq!(
            first.url,
            "https://www.reddit.com/r/rust/comments/abc123/a_post/"
        );
        assert_eq!(first.author, "alice");
        assert_eq!(first.num_comments, 7);
        assert!(first.created_at > items[1].created_at);
    }

    #[test]
    fn test_null_author_becomes_deleted() {
        let items = parse_listing(&post_listing(), "https://www.reddit.com").unwrap();
        assert_eq!(items[1].author, DELETED_AUTHOR);
    }

    #[test]
    fn test_parse_comment_listing() {
        let json = json!({
            "data": {
                "children": [
                    {
                        "kind": "t1",
                        "data": {
                            "id": "c1",
                            "body": "a comment",
                            "score": 3,
                            "permalink": "/r/rust/comments/abc123/a_post/c1/",
                            "created_utc": 1_700_000_100.0,
                            "author": "bob"
                        }
                    }
                ]
            }
        });

        let items = parse_listing(&json, "https://www.reddit.com").unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].kind, ItemKind::Comment);
        assert_eq!(items[0].title, None);
        assert_eq!(items[0].body, "a comment");
    }

    #[test]
    fn test_malformed_listing_is_an_error() {
        assert!(parse_listing(&json!({"oops": true}), "x").is_err());
    }

    #[test]
    fn test_parse_comment_forest_with_nesting_and_more() {
        let json = json!({
            "data": {
                "children": [
                    {
                        "kind": "t1",
                        "data": {
                            "created_utc": 1_700_000_000.0,
                            "replies": {
                                "data": {
                                    "children": [
                                        {
                                            "kind": "t1",
                                            "data": {
                                                "created_utc": 1_700_000_200.0,
                                                "replies": ""
                                            }
                                        }
                                    ]
                                }
                            }
                        }
                    },
                    {
                        "kind": "more",
                        "data": { "children": ["x1", "x2"] }
                    }
                ]
            }
        });

        let forest = parse_comment_forest(&json);
        assert_eq!(forest.len(), 2);
        match &forest[0] {
            CommentNode::Comment(leaf) => {
                assert_eq!(leaf.replies.len(), 1);
                assert!(matches!(leaf.replies[0], CommentNode::Comment(_)));
            }
            other => panic!("expected comment, got {other:?}"),
        }
        match &forest[1] {
            CommentNode::More(more) => assert_eq!(more.children, vec!["x1", "x2"]),
            other => panic!("expected more placeholder, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_endpoint_is_source_unavailable() {
        // Unroutable base; connection fails fast.
        let source = RedditSource::new(1, 1).unwrap().with_base("http://127.0.0.1:9");
        let err = source.posts("rust", FeedOrder::New, 10).unwrap_err();
        assert!(matches!(err, DigestError::SourceUnavailable(_)));
    }
}
