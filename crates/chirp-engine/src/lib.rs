//! Chirp: a social graph engine.
//!
//! Users follow one another, post short messages that can be replied to or
//! reshared, and mark tweets as favorites. The store keeps the denormalized
//! counters consistent with the underlying relations and assembles home
//! timelines from the follow graph. Request routing, auth and delivery of
//! notifications live outside this crate.

pub mod error;
pub mod favorite;
pub mod follow;
pub mod notify;
pub mod persistence;
pub mod server;
pub mod store;
pub mod thread;
pub mod timeline;
pub mod view;

pub use error::GraphError;
pub use store::{ChirpStore, Tweet, TweetId, User, UserId};
pub use view::{TweetView, UserView};
