//! Content source abstraction.
//!
//! Defines the [`ContentSource`] trait that the harvester and streamer
//! consume. A source enumerates posts and comments for a channel in strictly
//! descending chronological order ("newest first") and exposes each post's
//! comment tree, including unexpanded "more available" placeholder nodes.
//!
//! The built-in Reddit implementation lives in
//! [`connector_reddit`](crate::connector_reddit).

use crate::error::DigestError;
use crate::models::ContentItem;
use chrono::{DateTime, Utc};

/// Listing order for a channel's post feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum FeedOrder {
    /// Newest first, strictly descending by creation instant.
    New,
    /// Ranked by the source's popularity heuristic. Not chronological, so
    /// the early-exit window scan does not apply.
    Hot,
}

impl FeedOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedOrder::New => "new",
            FeedOrder::Hot => "hot",
        }
    }
}

/// One node in a post's comment tree.
#[derive(Debug, Clone)]
pub enum CommentNode {
    Comment(CommentLeaf),
    /// Placeholder standing in for comments the source did not inline.
    More(MoreComments),
}

/// A materialized comment with its direct replies.
#[derive(Debug, Clone)]
pub struct CommentLeaf {
    pub created_at: DateTime<Utc>,
    pub replies: Vec<CommentNode>,
}

/// Identifiers of comments hidden behind a "load more" placeholder.
#[derive(Debug, Clone)]
pub struct MoreComments {
    pub children: Vec<String>,
}

/// A time-ordered feed of posts and comments for a channel.
///
/// Ordering contract: `posts` with [`FeedOrder::New`] and `comments` MUST
/// yield items strictly newest-first. The harvester's early-exit cutoff scan
/// relies on this; a source that resurfaces edited or pinned items out of
/// order would cause valid items to be skipped.
pub trait ContentSource {
    /// Posts for the channel in the given order, at most `limit` of them.
    fn posts(
        &self,
        channel: &str,
        order: FeedOrder,
        limit: usize,
    ) -> Result<Vec<ContentItem>, DigestError>;

    /// The channel-wide comment feed, newest first, at most `limit` items.
    fn comments(&self, channel: &str, limit: usize) -> Result<Vec<ContentItem>, DigestError>;

    /// Top-level comment forest for one post, with `More` placeholders
    /// wherever the source elided replies.
    fn comment_tree(&self, post_id: &str) -> Result<Vec<CommentNode>, DigestError>;

    /// Expand one placeholder into its hidden comments. Implementations may
    /// return flat leaves (no reply nesting).
    fn expand_more(
        &self,
        post_id: &str,
        more: &MoreComments,
    ) -> Result<Vec<CommentNode>, DigestError>;

    /// Unbounded live comment feed for the channel, oldest-unseen first.
    /// Blocks between polls; the emitter bounds it by pacing, duration, and
    /// cancellation.
    fn stream_comments<'a>(
        &'a self,
        channel: &str,
    ) -> Result<Box<dyn Iterator<Item = Result<ContentItem, DigestError>> + 'a>, DigestError>;
}
