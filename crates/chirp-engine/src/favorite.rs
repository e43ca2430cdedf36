//! Favorite index: the many-to-many "liked" relation between users and
//! tweets.
//!
//! A tweet's favorite count is computed from the mark relation on demand
//! and never cached on the tweet row.

use crate::error::GraphError;
use crate::store::{ChirpStore, Tweet, TweetId, UserId};

impl ChirpStore {
    /// Mark a tweet as favorite. Returns `Ok(false)` when the mark
    /// already exists.
    pub fn like(&self, user: UserId, tweet: TweetId) -> Result<bool, GraphError> {
        let mut tables = self.tables.write().unwrap();
        if !tables.users.contains_key(&user) {
            return Err(GraphError::UserNotFound(user));
        }
        if !tables.tweets.contains_key(&tweet) {
            return Err(GraphError::TweetNotFound(tweet));
        }

        let inserted = tables.fans_of.entry(tweet).or_default().insert(user);
        if !inserted {
            return Ok(false);
        }
        tables.favorites_of.entry(user).or_default().push(tweet);
        drop(tables);

        self.mark_dirty();
        tracing::debug!(user, tweet, "favorite marked");
        Ok(true)
    }

    /// Remove a favorite mark. A missing mark is a no-op.
    pub fn unlike(&self, user: UserId, tweet: TweetId) -> bool {
        let mut tables = self.tables.write().unwrap();
        let removed = tables
            .fans_of
            .get_mut(&tweet)
            .is_some_and(|fans| fans.remove(&user));
        if !removed {
            return false;
        }
        if let Some(marks) = tables.favorites_of.get_mut(&user) {
            marks.retain(|id| *id != tweet);
        }
        drop(tables);

        self.mark_dirty();
        tracing::debug!(user, tweet, "favorite removed");
        true
    }

    pub fn has_liked(&self, user: UserId, tweet: TweetId) -> bool {
        let tables = self.tables.read().unwrap();
        tables
            .fans_of
            .get(&tweet)
            .is_some_and(|fans| fans.contains(&user))
    }

    /// Tweets the user has marked, in mark order.
    pub fn list_favorites_of(&self, user: UserId) -> Result<Vec<Tweet>, GraphError> {
        let tables = self.tables.read().unwrap();
        if !tables.users.contains_key(&user) {
            return Err(GraphError::UserNotFound(user));
        }
        Ok(tables
            .favorites_of
            .get(&user)
            .into_iter()
            .flatten()
            .filter_map(|id| tables.tweets.get(id).cloned())
            .collect())
    }

    /// Number of marks on a tweet, computed from the relation.
    pub fn favorite_count(&self, tweet: TweetId) -> Result<u64, GraphError> {
        let tables = self.tables.read().unwrap();
        if !tables.tweets.contains_key(&tweet) {
            return Err(GraphError::TweetNotFound(tweet));
        }
        Ok(tables.fans_of.get(&tweet).map_or(0, |fans| fans.len() as u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    fn store_with_tweet() -> Result<(ChirpStore, UserId, TweetId)> {
        let store = ChirpStore::in_memory();
        let author = store.create_user("author", "author@example.com")?;
        let reader = store.create_user("reader", "reader@example.com")?;
        let tweet = store.post(author.id, "hello")?;
        Ok((store, reader.id, tweet.id))
    }

    #[test]
    fn test_like_then_unlike_round_trips() -> Result<()> {
        let (store, user, tweet) = store_with_tweet()?;
        let before = store.favorite_count(tweet)?;
        assert!(store.like(user, tweet)?);
        assert!(store.has_liked(user, tweet));
        assert_eq!(store.favorite_count(tweet)?, before + 1);
        assert!(store.unlike(user, tweet));
        assert!(!store.has_liked(user, tweet));
        assert_eq!(store.favorite_count(tweet)?, before);
        Ok(())
    }

    #[test]
    fn test_duplicate_like_counts_once() -> Result<()> {
        let (store, user, tweet) = store_with_tweet()?;
        assert!(store.like(user, tweet)?);
        assert!(!store.like(user, tweet)?);
        assert_eq!(store.favorite_count(tweet)?, 1);
        store.unlike(user, tweet);
        assert_eq!(store.favorite_count(tweet)?, 0);
        Ok(())
    }

    #[test]
    fn test_unlike_without_mark_is_noop() -> Result<()> {
        let (store, user, tweet) = store_with_tweet()?;
        assert!(!store.unlike(user, tweet));
        assert_eq!(store.favorite_count(tweet)?, 0);
        Ok(())
    }

    #[test]
    fn test_like_validates_both_ids() -> Result<()> {
        let (store, user, tweet) = store_with_tweet()?;
        assert_eq!(store.like(99, tweet), Err(GraphError::UserNotFound(99)));
        assert_eq!(store.like(user, 99), Err(GraphError::TweetNotFound(99)));
        Ok(())
    }

    #[test]
    fn test_favorites_list_in_mark_order() -> Result<()> {
        let (store, user, first) = store_with_tweet()?;
        let author = store.get_tweet(first)?.author_id;
        let second = store.post(author, "again")?;
        store.like(user, second.id)?;
        store.like(user, first)?;
        let ids: Vec<TweetId> = store.list_favorites_of(user)?.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![second.id, first]);
        Ok(())
    }
}
