//! Home timeline assembly: a join of the follow graph against the tweet
//! table, newest first.

use crate::error::GraphError;
use crate::store::{ChirpStore, Tweet, UserId};

impl ChirpStore {
    /// Tweets authored by the accounts `user` follows, `created_at`
    /// descending, ties broken by id descending. Runs entirely under the
    /// read lock and is safe to call concurrently with any mutation.
    /// An empty feed is a valid result.
    pub fn home_timeline(&self, user: UserId) -> Result<Vec<Tweet>, GraphError> {
        let tables = self.tables.read().unwrap();
        if !tables.users.contains_key(&user) {
            return Err(GraphError::UserNotFound(user));
        }

        let mut feed: Vec<Tweet> = Vec::new();
        if let Some(followed) = tables.followed_by.get(&user) {
            for author in followed {
                if let Some(ids) = tables.by_author.get(author) {
                    feed.extend(ids.iter().filter_map(|id| tables.tweets.get(id).cloned()));
                }
            }
        }
        feed.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(feed)
    }
}
