//! Follow graph: the directed follower/followed relation over users.
//!
//! Edge mutation and the two cached counters move inside one write-lock
//! critical section, so `followed_count(u)` always equals the number of
//! edges with `u` as follower and `follower_count(u)` the number with `u`
//! as followed.

use crate::error::GraphError;
use crate::store::{ChirpStore, User, UserId};

impl ChirpStore {
    /// Insert a follow edge. Returns `Ok(false)` without touching any
    /// counter when the edge already exists.
    pub fn follow(&self, follower: UserId, followed: UserId) -> Result<bool, GraphError> {
        if follower == followed {
            return Err(GraphError::SelfFollow);
        }

        let mut tables = self.tables.write().unwrap();
        if !tables.users.contains_key(&follower) {
            return Err(GraphError::UserNotFound(follower));
        }
        if !tables.users.contains_key(&followed) {
            return Err(GraphError::UserNotFound(followed));
        }

        let inserted = tables.followed_by.entry(follower).or_default().insert(followed);
        if !inserted {
            return Ok(false);
        }
        tables.followers_of.entry(followed).or_default().insert(follower);
        if let Some(user) = tables.users.get_mut(&follower) {
            user.followed_count += 1;
        }
        if let Some(user) = tables.users.get_mut(&followed) {
            user.follower_count += 1;
        }
        drop(tables);

        self.mark_dirty();
        tracing::debug!(follower, followed, "follow edge created");
        Ok(true)
    }

    /// Remove a follow edge. A missing edge is a no-op and leaves the
    /// counters untouched.
    pub fn unfollow(&self, follower: UserId, followed: UserId) -> bool {
        let mut tables = self.tables.write().unwrap();
        let removed = tables
            .followed_by
            .get_mut(&follower)
            .is_some_and(|set| set.remove(&followed));
        if !removed {
            return false;
        }
        if let Some(set) = tables.followers_of.get_mut(&followed) {
            set.remove(&follower);
        }
        if let Some(user) = tables.users.get_mut(&follower) {
            user.followed_count = user.followed_count.saturating_sub(1);
        }
        if let Some(user) = tables.users.get_mut(&followed) {
            user.follower_count = user.follower_count.saturating_sub(1);
        }
        drop(tables);

        self.mark_dirty();
        tracing::debug!(follower, followed, "follow edge removed");
        true
    }

    pub fn is_following(&self, follower: UserId, followed: UserId) -> bool {
        let tables = self.tables.read().unwrap();
        tables
            .followed_by
            .get(&follower)
            .is_some_and(|set| set.contains(&followed))
    }

    /// Users following `id`. No ordering guarantee.
    pub fn list_followers(&self, id: UserId) -> Result<Vec<User>, GraphError> {
        let tables = self.tables.read().unwrap();
        if !tables.users.contains_key(&id) {
            return Err(GraphError::UserNotFound(id));
        }
        Ok(tables
            .followers_of
            .get(&id)
            .into_iter()
            .flatten()
            .filter_map(|uid| tables.users.get(uid).cloned())
            .collect())
    }

    /// Users that `id` follows. No ordering guarantee.
    pub fn list_followed(&self, id: UserId) -> Result<Vec<User>, GraphError> {
        let tables = self.tables.read().unwrap();
        if !tables.users.contains_key(&id) {
            return Err(GraphError::UserNotFound(id));
        }
        Ok(tables
            .followed_by
            .get(&id)
            .into_iter()
            .flatten()
            .filter_map(|uid| tables.users.get(uid).cloned())
            .collect())
    }
}
