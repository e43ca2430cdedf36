//! Content thread graph: the self-referential reply/retweet relations
//! among tweets.
//!
//! Parents are plain foreign keys, never object references, and a new
//! tweet can only point at tweets that already exist, so reply chains are
//! acyclic by construction.

use crate::error::GraphError;
use crate::store::{ChirpStore, Tweet, TweetId, UserId};

impl ChirpStore {
    /// Create a root tweet.
    pub fn post(&self, author: UserId, text: &str) -> Result<Tweet, GraphError> {
        let mut tables = self.tables.write().unwrap();
        if !tables.users.contains_key(&author) {
            return Err(GraphError::InvalidReference(author));
        }
        let tweet = tables.insert_tweet(author, text, None, None);
        drop(tables);

        self.mark_dirty();
        tracing::debug!(tweet = tweet.id, author, "tweet posted");
        Ok(tweet)
    }

    /// Create a reply and bump the parent's `reply_count` in the same
    /// critical section.
    pub fn reply(&self, author: UserId, text: &str, parent: TweetId) -> Result<Tweet, GraphError> {
        let mut tables = self.tables.write().unwrap();
        if !tables.users.contains_key(&author) {
            return Err(GraphError::InvalidReference(author));
        }
        if !tables.tweets.contains_key(&parent) {
            return Err(GraphError::TweetNotFound(parent));
        }
        let tweet = tables.insert_tweet(author, text, Some(parent), None);
        if let Some(p) = tables.tweets.get_mut(&parent) {
            p.reply_count += 1;
        }
        drop(tables);

        self.mark_dirty();
        tracing::debug!(tweet = tweet.id, parent, "reply posted");
        Ok(tweet)
    }

    /// Share an existing tweet, optionally with commentary. The source
    /// tweet's counters are left untouched.
    pub fn retweet(
        &self,
        author: UserId,
        text: Option<&str>,
        source: TweetId,
    ) -> Result<Tweet, GraphError> {
        let mut tables = self.tables.write().unwrap();
        if !tables.users.contains_key(&author) {
            return Err(GraphError::InvalidReference(author));
        }
        if !tables.tweets.contains_key(&source) {
            return Err(GraphError::TweetNotFound(source));
        }
        let tweet = tables.insert_tweet(author, text.unwrap_or(""), None, Some(source));
        drop(tables);

        self.mark_dirty();
        tracing::debug!(tweet = tweet.id, source, "retweet posted");
        Ok(tweet)
    }

    /// All replies to a tweet, creation time ascending.
    pub fn list_replies(&self, id: TweetId) -> Result<Vec<Tweet>, GraphError> {
        let tables = self.tables.read().unwrap();
        if !tables.tweets.contains_key(&id) {
            return Err(GraphError::TweetNotFound(id));
        }
        Ok(tables
            .replies_to
            .get(&id)
            .into_iter()
            .flatten()
            .filter_map(|rid| tables.tweets.get(rid).cloned())
            .collect())
    }

    /// Resolve the tweet's direct ancestor (reply parent or retweet
    /// source), one level. Root tweets have none.
    pub fn thread_ancestor(&self, id: TweetId) -> Result<Option<Tweet>, GraphError> {
        let tables = self.tables.read().unwrap();
        let tweet = tables.tweets.get(&id).ok_or(GraphError::TweetNotFound(id))?;
        let parent = tweet.in_reply_to_id.or(tweet.retweet_of_id);
        Ok(parent.and_then(|pid| tables.tweets.get(&pid).cloned()))
    }

    /// Walk the ancestor chain iteratively, oldest last, stopping after
    /// `limit` hops. Chains can be arbitrarily deep; the walk is a loop
    /// over ids, never a recursion.
    pub fn ancestor_chain(&self, id: TweetId, limit: usize) -> Result<Vec<Tweet>, GraphError> {
        let tables = self.tables.read().unwrap();
        let mut current = tables
            .tweets
            .get(&id)
            .ok_or(GraphError::TweetNotFound(id))?;

        let mut chain = Vec::new();
        while chain.len() < limit {
            let parent = match current.in_reply_to_id.or(current.retweet_of_id) {
                Some(pid) => pid,
                None => break,
            };
            match tables.tweets.get(&parent) {
                Some(p) => {
                    chain.push(p.clone());
                    current = p;
                }
                None => break,
            }
        }
        Ok(chain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    fn store_with_author() -> Result<(ChirpStore, UserId)> {
        let store = ChirpStore::in_memory();
        let user = store.create_user("author", "author@example.com")?;
        Ok((store, user.id))
    }

    #[test]
    fn test_post_creates_root_tweet() -> Result<()> {
        let (store, author) = store_with_author()?;
        let tweet = store.post(author, "hello")?;
        assert_eq!(tweet.author_id, author);
        assert_eq!(tweet.in_reply_to_id, None);
        assert_eq!(tweet.retweet_of_id, None);
        assert_eq!(tweet.reply_count, 0);
        assert_eq!(store.get_tweet(tweet.id)?, tweet);
        Ok(())
    }

    #[test]
    fn test_post_with_unknown_author_fails() {
        let store = ChirpStore::in_memory();
        assert_eq!(store.post(7, "x"), Err(GraphError::InvalidReference(7)));
    }

    #[test]
    fn test_reply_increments_parent_count_and_links_back() -> Result<()> {
        let (store, author) = store_with_author()?;
        let parent = store.post(author, "parent")?;
        let reply = store.reply(author, "child", parent.id)?;
        assert_eq!(reply.in_reply_to_id, Some(parent.id));
        assert_eq!(store.get_tweet(parent.id)?.reply_count, 1);
        // The reply resolves back to its parent.
        assert_eq!(store.thread_ancestor(reply.id)?.map(|t| t.id), Some(parent.id));
        Ok(())
    }

    #[test]
    fn test_reply_to_missing_tweet_fails() -> Result<()> {
        let (store, author) = store_with_author()?;
        assert_eq!(
            store.reply(author, "x", 99),
            Err(GraphError::TweetNotFound(99))
        );
        Ok(())
    }

    #[test]
    fn test_retweet_links_source_without_counting() -> Result<()> {
        let (store, author) = store_with_author()?;
        let source = store.post(author, "original")?;
        let share = store.retweet(author, None, source.id)?;
        assert_eq!(share.retweet_of_id, Some(source.id));
        assert_eq!(share.text, "");
        // Source counters are untouched by shares.
        assert_eq!(store.get_tweet(source.id)?.reply_count, 0);
        let quoted = store.retweet(author, Some("look at this"), source.id)?;
        assert_eq!(quoted.text, "look at this");
        Ok(())
    }

    #[test]
    fn test_retweet_of_missing_tweet_fails() -> Result<()> {
        let (store, author) = store_with_author()?;
        assert_eq!(
            store.retweet(author, None, 99),
            Err(GraphError::TweetNotFound(99))
        );
        Ok(())
    }

    #[test]
    fn test_replies_list_in_creation_order() -> Result<()> {
        let (store, author) = store_with_author()?;
        let parent = store.post(author, "parent")?;
        let r1 = store.reply(author, "first", parent.id)?;
        let r2 = store.reply(author, "second", parent.id)?;
        let r3 = store.reply(author, "third", parent.id)?;
        let ids: Vec<TweetId> = store.list_replies(parent.id)?.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![r1.id, r2.id, r3.id]);
        assert_eq!(store.get_tweet(parent.id)?.reply_count, 3);
        Ok(())
    }

    #[test]
    fn test_ancestor_chain_is_bounded() -> Result<()> {
        let (store, author) = store_with_author()?;
        let mut tip = store.post(author, "root")?;
        for i in 0..50 {
            tip = store.reply(author, &format!("level {i}"), tip.id)?;
        }
        let chain = store.ancestor_chain(tip.id, 10)?;
        assert_eq!(chain.len(), 10);
        let full = store.ancestor_chain(tip.id, 1000)?;
        assert_eq!(full.len(), 50);
        assert_eq!(full.last().map(|t| t.text.clone()), Some("root".to_string()));
        Ok(())
    }

    #[test]
    fn test_root_tweet_has_no_ancestor() -> Result<()> {
        let (store, author) = store_with_author()?;
        let tweet = store.post(author, "root")?;
        assert_eq!(store.thread_ancestor(tweet.id)?, None);
        Ok(())
    }
}
