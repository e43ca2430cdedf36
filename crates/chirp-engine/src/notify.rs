//! Outbound notification seam. Actual delivery (email and the like) lives
//! outside this service; the engine only emits events. Delivery runs
//! fire-and-forget after the graph mutation committed and its failure
//! never rolls the mutation back.

use anyhow::Result;
use serde::Serialize;

use crate::store::{TweetId, UserId};

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeedEvent {
    Followed { follower: UserId, followed: UserId },
    RepliedTo { parent_author: UserId, reply: TweetId },
    Liked { user: UserId, tweet: TweetId },
}

pub trait Notifier: Send + Sync {
    fn deliver(&self, event: &FeedEvent) -> Result<()>;
}

/// Writes events to the log instead of delivering them anywhere.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn deliver(&self, event: &FeedEvent) -> Result<()> {
        tracing::info!(event = %serde_json::to_string(event)?, "notification");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_serialize_with_kind_tag() -> Result<()> {
        let event = FeedEvent::Followed { follower: 1, followed: 2 };
        let json = serde_json::to_string(&event)?;
        assert!(json.contains("\"kind\":\"followed\""));
        assert!(json.contains("\"follower\":1"));
        Ok(())
    }
}
