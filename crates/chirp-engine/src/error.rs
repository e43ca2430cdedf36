use thiserror::Error;

use crate::store::{TweetId, UserId};

/// Errors surfaced by graph operations. Idempotent operations (follow,
/// unfollow, like, unlike) never fail on redundant calls; only invalid
/// references and self-follow attempts are reported.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("user {0} does not exist")]
    UserNotFound(UserId),

    #[error("tweet {0} does not exist")]
    TweetNotFound(TweetId),

    #[error("users cannot follow themselves")]
    SelfFollow,

    #[error("author {0} does not exist")]
    InvalidReference(UserId),

    #[error("{0} already exists")]
    AlreadyExists(String),
}
