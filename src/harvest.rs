//! Time-windowed content harvesting.
//!
//! [`fetch_window`] pulls posts and comments from a [`ContentSource`] and
//! keeps only items inside the cutoff window. The `new`-ordered feeds are
//! scanned with an early exit: the first item older than the cutoff ends the
//! scan, so we never page past the window. Hot-ordered feeds are not
//! chronological and get a full scan-and-filter instead.
//!
//! Thread-completion mode decides membership by a post's latest activity
//! rather than its creation instant: the comment tree is walked with an
//! explicit worklist, "load more" placeholders are expanded up to a bound,
//! and any traversal fault is swallowed in favor of the best timestamp seen
//! so far.

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::clean::clean_text;
use crate::config::HarvestConfig;
use crate::error::DigestError;
use crate::models::{ContentItem, Harvest, TimeWindow};
use crate::source::{CommentNode, ContentSource, FeedOrder};

/// Per-run harvesting switches.
#[derive(Debug, Clone)]
pub struct HarvestOptions {
    pub order: FeedOrder,
    /// Judge posts by latest comment activity instead of creation time.
    pub thread_completion: bool,
    /// Derive a cleaned body for each harvested item.
    pub clean: bool,
}

impl Default for HarvestOptions {
    fn default() -> Self {
        Self {
            order: FeedOrder::New,
            thread_completion: false,
            clean: true,
        }
    }
}

/// Fetch all posts and comments for `channel` inside `window`.
///
/// Posts come first from the post feed, comments from the channel-wide
/// comment feed, both kept in feed order. Caps come from config: at most
/// `post_scan_limit` posts and `comment_scan_limit` comments are examined.
pub fn fetch_window(
    source: &dyn ContentSource,
    channel: &str,
    window: TimeWindow,
    config: &HarvestConfig,
    options: &HarvestOptions,
) -> Result<Harvest, DigestError> {
    let mut posts = Vec::new();
    for post in source.posts(channel, options.order, config.post_scan_limit)? {
        let include = if options.thread_completion {
            window.contains(latest_activity(source, &post, config.more_expansions))
        } else {
            window.contains(post.created_at)
        };

        if !include {
            // The new feed is strictly descending, so the first stale post
            // ends the scan. Hot ranking is not chronological; keep looking.
            if options.order == FeedOrder::New && !options.thread_completion {
                break;
            }
            continue;
        }
        posts.push(derive_clean(post, options.clean));
    }

    let mut comments = Vec::new();
    for comment in source.comments(channel, config.comment_scan_limit)? {
        if !window.contains(comment.created_at) {
            break;
        }
        comments.push(derive_clean(comment, options.clean));
    }

    debug!(
        channel,
        posts = posts.len(),
        comments = comments.len(),
        "harvest complete"
    );
    Ok(Harvest { posts, comments })
}

fn derive_clean(mut item: ContentItem, clean: bool) -> ContentItem {
    if clean {
        item.clean_body = Some(clean_text(&item.body));
    }
    item
}

/// Latest creation instant across a post and its whole comment tree.
///
/// Walks the tree iteratively with an explicit stack. Placeholders are
/// expanded at most `max_expansions` times, then treated as exhausted.
/// Traversal faults are never fatal: the best timestamp found so far is
/// returned, falling back to the post's own instant.
pub fn latest_activity(
    source: &dyn ContentSource,
    post: &ContentItem,
    max_expansions: usize,
) -> DateTime<Utc> {
    let mut latest = post.created_at;

    // A post with no comments is judged by its own timestamp.
    if post.num_comments == 0 {
        return latest;
    }

    let mut work: Vec<CommentNode> = match source.comment_tree(&post.source_id) {
        Ok(forest) => forest,
        Err(err) => {
            warn!(post = %post.source_id, error = %err, "comment tree unavailable");
            return latest;
        }
    };

    let mut expansions = 0usize;
    while let Some(node) = work.pop() {
        match node {
            CommentNode::Comment(leaf) => {
                if leaf.created_at > latest {
                    latest = leaf.created_at;
                }
                work.extend(leaf.replies);
            }
            CommentNode::More(more) => {
                if expansions >= max_expansions {
                    continue;
                }
                expansions += 1;
                match source.expand_more(&post.source_id, &more) {
                    Ok(children) => work.extend(children),
                    Err(err) => {
                        warn!(post = %post.source_id, error = %err, "placeholder expansion failed");
                    }
                }
            }
        }
    }

    latest
}
