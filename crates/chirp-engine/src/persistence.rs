use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::store::{Tweet, TweetId, User, UserId};

/// On-disk image of the graph. Only entities and relations are stored;
/// secondary indices and anything else derivable is rebuilt on load.
#[derive(Serialize, Deserialize, Default)]
pub struct FeedSnapshot {
    pub users: Vec<User>,
    pub tweets: Vec<Tweet>,
    /// (follower_id, followed_id)
    pub follows: Vec<(UserId, UserId)>,
    /// (user_id, tweet_id), in mark order per user
    pub favorites: Vec<(UserId, TweetId)>,
    pub next_user_id: UserId,
    pub next_tweet_id: TweetId,
}

impl FeedSnapshot {
    pub fn save_to_file(&self, path: &Path) -> std::io::Result<()> {
        let data = bincode::serialize(self).map_err(std::io::Error::other)?;
        fs::write(path, data)?;
        Ok(())
    }

    /// A missing file loads as an empty snapshot.
    pub fn load_from_file(path: &Path) -> std::io::Result<Self> {
        if !path.exists() {
            return Ok(FeedSnapshot::default());
        }

        let data = fs::read(path)?;
        let snapshot = bincode::deserialize(&data).map_err(std::io::Error::other)?;
        Ok(snapshot)
    }
}
