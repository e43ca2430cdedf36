use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::GraphError;
use crate::persistence::FeedSnapshot;

pub type UserId = u64;
pub type TweetId = u64;

const SNAPSHOT_FILE: &str = "feed.bin";
const DEFAULT_AUTO_SAVE_THRESHOLD: usize = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    /// Cached cardinality of the edges where this user is followed.
    pub follower_count: u64,
    /// Cached cardinality of the edges where this user is follower.
    pub followed_count: u64,
}

/// A tweet is immutable after creation except for `reply_count`, which is
/// maintained in the same critical section as the reply that bumps it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tweet {
    pub id: TweetId,
    pub author_id: UserId,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub in_reply_to_id: Option<TweetId>,
    pub retweet_of_id: Option<TweetId>,
    pub reply_count: u64,
}

/// Entity tables plus the secondary indices derived from them. Everything
/// here is guarded by the single `RwLock` in [`ChirpStore`], so one write
/// lock acquisition is one atomic unit across tables, indices and counters.
pub(crate) struct Tables {
    pub(crate) users: BTreeMap<UserId, User>,
    pub(crate) tweets: BTreeMap<TweetId, Tweet>,
    /// follower -> followed. The follow relation's source of truth,
    /// together with its mirror below.
    pub(crate) followed_by: HashMap<UserId, HashSet<UserId>>,
    /// followed -> followers.
    pub(crate) followers_of: HashMap<UserId, HashSet<UserId>>,
    /// author -> tweet ids in creation order.
    pub(crate) by_author: HashMap<UserId, Vec<TweetId>>,
    /// parent tweet -> reply ids in creation order.
    pub(crate) replies_to: HashMap<TweetId, Vec<TweetId>>,
    /// tweet -> users who marked it as favorite.
    pub(crate) fans_of: HashMap<TweetId, HashSet<UserId>>,
    /// user -> marked tweet ids in mark order.
    pub(crate) favorites_of: HashMap<UserId, Vec<TweetId>>,
    pub(crate) next_user_id: UserId,
    pub(crate) next_tweet_id: TweetId,
}

impl Tables {
    fn empty() -> Self {
        Self {
            users: BTreeMap::new(),
            tweets: BTreeMap::new(),
            followed_by: HashMap::new(),
            followers_of: HashMap::new(),
            by_author: HashMap::new(),
            replies_to: HashMap::new(),
            fans_of: HashMap::new(),
            favorites_of: HashMap::new(),
            next_user_id: 1,
            next_tweet_id: 1,
        }
    }

    /// Rebuild the full table set from a persisted snapshot. Only the
    /// relations are persisted; every secondary index is derived here, so
    /// a loaded store can never start with a diverged index.
    fn from_snapshot(snapshot: FeedSnapshot) -> Self {
        let mut tables = Self::empty();
        tables.next_user_id = snapshot.next_user_id.max(1);
        tables.next_tweet_id = snapshot.next_tweet_id.max(1);

        for user in snapshot.users {
            tables.users.insert(user.id, user);
        }
        // BTreeMap iteration is id order, which equals creation order.
        for tweet in snapshot.tweets {
            tables.tweets.insert(tweet.id, tweet);
        }
        for tweet in tables.tweets.values() {
            tables.by_author.entry(tweet.author_id).or_default().push(tweet.id);
            if let Some(parent) = tweet.in_reply_to_id {
                tables.replies_to.entry(parent).or_default().push(tweet.id);
            }
        }
        for (follower, followed) in snapshot.follows {
            tables.followed_by.entry(follower).or_default().insert(followed);
            tables.followers_of.entry(followed).or_default().insert(follower);
        }
        for (user, tweet) in snapshot.favorites {
            tables.fans_of.entry(tweet).or_default().insert(user);
            tables.favorites_of.entry(user).or_default().push(tweet);
        }

        tables
    }

    fn to_snapshot(&self) -> FeedSnapshot {
        let mut follows = Vec::new();
        for (follower, followed_set) in &self.followed_by {
            for followed in followed_set {
                follows.push((*follower, *followed));
            }
        }
        let mut favorites = Vec::new();
        for (user, tweet_ids) in &self.favorites_of {
            for tweet in tweet_ids {
                favorites.push((*user, *tweet));
            }
        }

        FeedSnapshot {
            users: self.users.values().cloned().collect(),
            tweets: self.tweets.values().cloned().collect(),
            follows,
            favorites,
            next_user_id: self.next_user_id,
            next_tweet_id: self.next_tweet_id,
        }
    }

    /// Insert a tweet row and keep the author and reply indices in step.
    /// Callers validate references and hold the write lock.
    pub(crate) fn insert_tweet(
        &mut self,
        author_id: UserId,
        text: &str,
        in_reply_to_id: Option<TweetId>,
        retweet_of_id: Option<TweetId>,
    ) -> Tweet {
        let id = self.next_tweet_id;
        self.next_tweet_id += 1;

        let tweet = Tweet {
            id,
            author_id,
            text: text.to_string(),
            created_at: Utc::now(),
            in_reply_to_id,
            retweet_of_id,
            reply_count: 0,
        };
        self.tweets.insert(id, tweet.clone());
        self.by_author.entry(author_id).or_default().push(id);
        if let Some(parent) = in_reply_to_id {
            self.replies_to.entry(parent).or_default().push(id);
        }
        tweet
    }
}

/// Shared social graph store. Request handlers on any number of threads
/// operate on it through `&self`; mutations take the write lock for the
/// whole compound operation, reads see a consistent snapshot under the
/// read lock.
pub struct ChirpStore {
    pub(crate) tables: RwLock<Tables>,
    storage_path: Option<PathBuf>,
    dirty_count: AtomicUsize,
    auto_save_threshold: usize,
}

impl ChirpStore {
    /// Open a durable store rooted at `storage_path`, loading the snapshot
    /// if one exists.
    pub fn open(storage_path: &str) -> Result<Self> {
        let path = PathBuf::from(storage_path);
        std::fs::create_dir_all(&path)?;

        let snapshot = FeedSnapshot::load_from_file(&path.join(SNAPSHOT_FILE))?;
        let auto_save_threshold = std::env::var("FEED_AUTOSAVE_THRESHOLD")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_AUTO_SAVE_THRESHOLD);

        Ok(Self {
            tables: RwLock::new(Tables::from_snapshot(snapshot)),
            storage_path: Some(path),
            dirty_count: AtomicUsize::new(0),
            auto_save_threshold,
        })
    }

    /// Ephemeral store with no backing file.
    pub fn in_memory() -> Self {
        Self {
            tables: RwLock::new(Tables::empty()),
            storage_path: None,
            dirty_count: AtomicUsize::new(0),
            auto_save_threshold: usize::MAX,
        }
    }

    /// Write the current tables to disk. The snapshot is built under the
    /// read lock; the file write happens after it is released.
    pub fn save(&self) -> Result<()> {
        let path = match &self.storage_path {
            Some(p) => p,
            None => return Ok(()),
        };
        let snapshot = {
            let tables = self.tables.read().unwrap();
            tables.to_snapshot()
        };
        snapshot.save_to_file(&path.join(SNAPSHOT_FILE))?;
        self.dirty_count.store(0, Ordering::Relaxed);
        Ok(())
    }

    /// Record one committed mutation and auto-save once enough have
    /// accumulated. Saving is best effort and never fails the mutation
    /// that triggered it.
    pub(crate) fn mark_dirty(&self) {
        let dirty = self.dirty_count.fetch_add(1, Ordering::Relaxed) + 1;
        if dirty >= self.auto_save_threshold {
            if let Err(e) = self.save() {
                tracing::warn!("snapshot save failed: {e}");
            }
        }
    }

    pub fn create_user(&self, username: &str, email: &str) -> Result<User, GraphError> {
        let mut tables = self.tables.write().unwrap();
        if tables.users.values().any(|u| u.username == username) {
            return Err(GraphError::AlreadyExists(format!("username {username}")));
        }
        if tables.users.values().any(|u| u.email == email) {
            return Err(GraphError::AlreadyExists(format!("email {email}")));
        }

        let id = tables.next_user_id;
        tables.next_user_id += 1;
        let user = User {
            id,
            username: username.to_string(),
            email: email.to_string(),
            created_at: Utc::now(),
            follower_count: 0,
            followed_count: 0,
        };
        tables.users.insert(id, user.clone());
        drop(tables);

        self.mark_dirty();
        tracing::debug!(user = id, "user created");
        Ok(user)
    }

    pub fn get_user(&self, id: UserId) -> Result<User, GraphError> {
        let tables = self.tables.read().unwrap();
        tables.users.get(&id).cloned().ok_or(GraphError::UserNotFound(id))
    }

    pub fn list_users(&self) -> Vec<User> {
        let tables = self.tables.read().unwrap();
        tables.users.values().cloned().collect()
    }

    pub fn get_tweet(&self, id: TweetId) -> Result<Tweet, GraphError> {
        let tables = self.tables.read().unwrap();
        tables.tweets.get(&id).cloned().ok_or(GraphError::TweetNotFound(id))
    }
}
