//! View projection: converts graph state into the externally observable
//! shape. Viewer-relative fields are computed per call from an explicit
//! viewer id, never stored on the entities.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::GraphError;
use crate::store::{ChirpStore, Tables, Tweet, TweetId, User, UserId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserView {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub follower_count: u64,
    pub followed_count: u64,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            follower_count: user.follower_count,
            followed_count: user.followed_count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TweetView {
    pub id: TweetId,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub user: UserView,
    pub reply_count: u64,
    pub like_count: u64,
    pub is_liked: bool,
    /// Parent summary, one level deep. Nested views carry no further
    /// ancestors.
    pub in_reply_to_status: Option<Box<TweetView>>,
    pub retweet_status: Option<Box<TweetView>>,
}

/// Project one tweet. `nest` controls whether the direct ancestors are
/// attached; nested projections always pass `false`, which bounds the
/// view depth to one level no matter how deep the thread is.
fn project(tables: &Tables, tweet: &Tweet, viewer: Option<UserId>, nest: bool) -> Option<TweetView> {
    let author = tables.users.get(&tweet.author_id)?;
    let fans = tables.fans_of.get(&tweet.id);
    let is_liked = match viewer {
        Some(v) => fans.is_some_and(|f| f.contains(&v)),
        None => false,
    };

    let resolve = |id: TweetId| {
        tables
            .tweets
            .get(&id)
            .and_then(|parent| project(tables, parent, viewer, false))
            .map(Box::new)
    };
    let (in_reply_to_status, retweet_status) = if nest {
        (
            tweet.in_reply_to_id.and_then(resolve),
            tweet.retweet_of_id.and_then(resolve),
        )
    } else {
        (None, None)
    };

    Some(TweetView {
        id: tweet.id,
        text: tweet.text.clone(),
        timestamp: tweet.created_at,
        user: UserView::from(author),
        reply_count: tweet.reply_count,
        like_count: fans.map_or(0, |f| f.len() as u64),
        is_liked,
        in_reply_to_status,
        retweet_status,
    })
}

impl ChirpStore {
    pub fn project_user(&self, id: UserId) -> Result<UserView, GraphError> {
        let tables = self.tables.read().unwrap();
        tables
            .users
            .get(&id)
            .map(UserView::from)
            .ok_or(GraphError::UserNotFound(id))
    }

    pub fn project_tweet(&self, id: TweetId, viewer: Option<UserId>) -> Result<TweetView, GraphError> {
        let tables = self.tables.read().unwrap();
        let tweet = tables.tweets.get(&id).ok_or(GraphError::TweetNotFound(id))?;
        project(&tables, tweet, viewer, true).ok_or(GraphError::TweetNotFound(id))
    }

    /// Project a batch under one read lock, preserving input order.
    pub fn project_tweets(&self, tweets: &[Tweet], viewer: Option<UserId>) -> Vec<TweetView> {
        let tables = self.tables.read().unwrap();
        tweets
            .iter()
            .filter_map(|t| tables.tweets.get(&t.id))
            .filter_map(|t| project(&tables, t, viewer, true))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn test_is_liked_is_viewer_relative() -> Result<()> {
        let store = ChirpStore::in_memory();
        let author = store.create_user("author", "author@example.com")?.id;
        let liker = store.create_user("liker", "liker@example.com")?.id;
        let other = store.create_user("other", "other@example.com")?.id;
        let tweet = store.post(author, "hello")?;
        store.like(liker, tweet.id)?;

        let for_liker = store.project_tweet(tweet.id, Some(liker))?;
        let for_other = store.project_tweet(tweet.id, Some(other))?;
        let anonymous = store.project_tweet(tweet.id, None)?;
        assert!(for_liker.is_liked);
        assert!(!for_other.is_liked);
        assert!(!anonymous.is_liked);
        // Only the viewer-relative field differs.
        assert_eq!(for_liker.like_count, 1);
        assert_eq!(for_other.like_count, 1);
        Ok(())
    }

    #[test]
    fn test_nesting_stops_after_one_level() -> Result<()> {
        let store = ChirpStore::in_memory();
        let author = store.create_user("author", "author@example.com")?.id;
        let root = store.post(author, "root")?;
        let mid = store.reply(author, "mid", root.id)?;
        let tip = store.reply(author, "tip", mid.id)?;

        let view = store.project_tweet(tip.id, None)?;
        let parent = view.in_reply_to_status.expect("parent view");
        assert_eq!(parent.id, mid.id);
        assert!(parent.in_reply_to_status.is_none());
        assert!(parent.retweet_status.is_none());
        Ok(())
    }

    #[test]
    fn test_retweet_projects_source_summary() -> Result<()> {
        let store = ChirpStore::in_memory();
        let author = store.create_user("author", "author@example.com")?.id;
        let source = store.post(author, "original")?;
        let share = store.retweet(author, None, source.id)?;

        let view = store.project_tweet(share.id, None)?;
        let nested = view.retweet_status.expect("source view");
        assert_eq!(nested.id, source.id);
        assert_eq!(nested.text, "original");
        assert!(view.in_reply_to_status.is_none());
        Ok(())
    }

    #[test]
    fn test_user_view_carries_counters() -> Result<()> {
        let store = ChirpStore::in_memory();
        let a = store.create_user("a", "a@example.com")?.id;
        let b = store.create_user("b", "b@example.com")?.id;
        store.follow(a, b)?;
        let view = store.project_user(b)?;
        assert_eq!(view.follower_count, 1);
        assert_eq!(view.followed_count, 0);
        Ok(())
    }

    #[test]
    fn test_batch_projection_preserves_order() -> Result<()> {
        let store = ChirpStore::in_memory();
        let reader = store.create_user("reader", "reader@example.com")?.id;
        let author = store.create_user("author", "author@example.com")?.id;
        store.follow(reader, author)?;
        store.post(author, "one")?;
        store.post(author, "two")?;

        let feed = store.home_timeline(reader)?;
        let views = store.project_tweets(&feed, Some(reader));
        let ids: Vec<_> = views.iter().map(|v| v.id).collect();
        let expected: Vec<_> = feed.iter().map(|t| t.id).collect();
        assert_eq!(ids, expected);
        Ok(())
    }
}
